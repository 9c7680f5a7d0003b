// Rigid-body physics: broad phase, narrow phase, islands and the contact solver

pub mod aabb;
pub mod body;
mod broad_phase;
pub mod collision;
pub mod command;
pub mod config;
pub mod contact;
pub mod dynamic_tree;
pub mod error;
pub mod fixture;
pub mod handle;
mod island;
pub mod manifold;
pub mod shape;
mod solver;
mod world;

pub use aabb::{Aabb, RayCastInput, RayCastOutput};
pub use body::{Body, BodyDef, BodyHandle, BodyType, SleepState};
pub use broad_phase::BroadPhase;
pub use collision::{CollisionFilter, ContactEvent, ContactEventQueue};
pub use command::BodyCommand;
pub use config::{PhysicsConfig, MAX_POLYGON_VERTICES, POLYGON_RADIUS};
pub use contact::Contact;
pub use error::{PhysicsError, PhysicsResult};
pub use fixture::{Fixture, FixtureDef, FixtureHandle};
pub use handle::{Arena, Handle};
pub use manifold::{Manifold, ManifoldPoint, ManifoldType, WorldManifold};
pub use shape::{EdgeShape, MassData, PolygonShape, Shape, ShapeKind};
pub use world::{PhysicsWorld, RayHit, StepStats};
