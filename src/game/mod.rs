// Demo scenes built on the physics world
//
// - Tumbler: an edge ground with columns of stacked boxes, used by the
//   benchmark binary and the long-running stability tests

pub mod tumbler;

pub use tumbler::{Tumbler, TumblerConfig};
