//! 2D rigid-body physics with a broad phase, contact islands, sleeping and a
//! sequential-impulse solver.
//!
//! ```no_run
//! use glam::Vec2;
//! use tumble2d::engine::physics::{BodyDef, FixtureDef, PhysicsWorld};
//!
//! # fn main() -> tumble2d::engine::physics::PhysicsResult<()> {
//! let mut world = PhysicsWorld::new();
//! let ground = world.create_body(BodyDef::new_static())?;
//! world.create_fixture(ground, "ground", FixtureDef::edge(Vec2::new(-10.0, 0.0), Vec2::new(10.0, 0.0))?)?;
//!
//! let crate_box = world.create_body(BodyDef::new_dynamic().position(0.0, 4.0))?;
//! world.create_fixture(crate_box, "fix1", FixtureDef::box_shape(0.5, 0.5)?)?;
//!
//! for _ in 0..60 {
//!     world.step(1.0 / 60.0, false)?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod engine;
pub mod game;
