use glam::Vec2;

use super::aabb::Aabb;
use super::body::BodyHandle;
use super::collision::CollisionFilter;
use super::error::{invalid, PhysicsResult};
use super::handle::Handle;
use super::shape::{EdgeShape, MassData, PolygonShape, Shape};
use crate::core::math::Transform;

/// Handle to identify fixtures
pub type FixtureHandle = Handle<Fixture>;

/// Builder describing a fixture before it is attached to a body
#[derive(Debug, Clone)]
pub struct FixtureDef {
    shape: Shape,
    density: f32,
    friction: f32,
    restitution: f32,
    sensor: bool,
    filter: CollisionFilter,
}

impl FixtureDef {
    /// Create a fixture definition around an existing shape
    pub fn new(shape: impl Into<Shape>) -> Self {
        Self {
            shape: shape.into(),
            density: 1.0,
            friction: 0.2,
            restitution: 0.0,
            sensor: false,
            filter: CollisionFilter::default(),
        }
    }

    /// Create a box-shaped fixture centred on the body origin
    pub fn box_shape(half_width: f32, half_height: f32) -> PhysicsResult<Self> {
        Ok(Self::new(PolygonShape::new_box(half_width, half_height)?))
    }

    /// Create a fixture from the convex hull of `points`
    pub fn convex_hull(points: &[Vec2]) -> PhysicsResult<Self> {
        Ok(Self::new(PolygonShape::new(points)?))
    }

    /// Create a two-sided edge fixture
    pub fn edge(v1: Vec2, v2: Vec2) -> PhysicsResult<Self> {
        Ok(Self::new(EdgeShape::new(v1, v2)?))
    }

    /// Set density (mass is derived from shape area)
    pub fn density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    /// Set friction coefficient (0.0 = no friction)
    pub fn friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    /// Set restitution/bounciness (0.0 = no bounce, 1.0 = perfect bounce)
    pub fn restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    /// Make this a sensor (detects overlap but doesn't cause physical response)
    pub fn sensor(mut self, is_sensor: bool) -> Self {
        self.sensor = is_sensor;
        self
    }

    /// Mark the fixture as solid (`true`) or as a sensor (`false`)
    pub fn hard(self, hard: bool) -> Self {
        self.sensor(!hard)
    }

    /// Set the collision layer and mask
    pub fn filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn layer_mask(self, layer: u32, mask: u32) -> Self {
        self.filter(CollisionFilter::new(layer, mask))
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Reject material values the solver can't use
    pub fn validate(&self) -> PhysicsResult<()> {
        if !self.density.is_finite() || self.density <= 0.0 {
            return Err(invalid(format!(
                "fixture density must be positive, got {}",
                self.density
            )));
        }
        if !self.friction.is_finite() || self.friction < 0.0 {
            return Err(invalid(format!(
                "fixture friction must be non-negative, got {}",
                self.friction
            )));
        }
        if !self.restitution.is_finite() || self.restitution < 0.0 {
            return Err(invalid(format!(
                "fixture restitution must be non-negative, got {}",
                self.restitution
            )));
        }
        Ok(())
    }
}

/// A shape bound to a body with material properties
#[derive(Debug, Clone)]
pub struct Fixture {
    pub(crate) id: String,
    pub(crate) body: BodyHandle,
    pub(crate) shape: Shape,
    pub(crate) density: f32,
    pub(crate) friction: f32,
    pub(crate) restitution: f32,
    pub(crate) sensor: bool,
    pub(crate) filter: CollisionFilter,

    /// World-space bounds, refreshed whenever the body moves
    pub(crate) aabb: Aabb,

    /// Broad-phase proxy, `None` while detached
    pub(crate) proxy: Option<usize>,
}

impl Fixture {
    pub(crate) fn new(id: &str, body: BodyHandle, def: FixtureDef, xf: &Transform) -> Self {
        let aabb = def.shape.compute_aabb(xf);
        Self {
            id: id.to_string(),
            body,
            shape: def.shape,
            density: def.density,
            friction: def.friction,
            restitution: def.restitution,
            sensor: def.sensor,
            filter: def.filter,
            aabb,
            proxy: None,
        }
    }

    /// String identifier, unique within the owning body
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn body(&self) -> BodyHandle {
        self.body
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn density(&self) -> f32 {
        self.density
    }

    pub fn friction(&self) -> f32 {
        self.friction
    }

    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    pub fn is_sensor(&self) -> bool {
        self.sensor
    }

    pub fn filter(&self) -> CollisionFilter {
        self.filter
    }

    /// Cached world-space bounding box
    pub fn aabb(&self) -> Aabb {
        self.aabb
    }

    pub fn mass_data(&self) -> MassData {
        self.shape.compute_mass(self.density)
    }

    pub fn test_point(&self, xf: &Transform, p: Vec2) -> bool {
        self.shape.test_point(xf, p)
    }

    pub(crate) fn synchronize(&mut self, xf: &Transform) {
        self.aabb = self.shape.compute_aabb(xf);
    }
}
