use glam::Vec2;

use super::error::{invalid, PhysicsResult};
use super::fixture::FixtureHandle;
use super::handle::Handle;
use super::shape::MassData;
use crate::core::math::{cross_sv, is_finite_vec, Rot, Transform};

/// Handle to identify rigid bodies
pub type BodyHandle = Handle<Body>;

/// How a body participates in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BodyType {
    /// Never moves, infinite mass
    #[default]
    Static,
    /// Moves by its own velocity, unaffected by contacts or gravity
    Kinematic,
    /// Fully simulated
    Dynamic,
}

/// Sleep state of a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SleepState {
    Awake,
    Sleeping,
}

/// Position and angle of the centre of mass over one step
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(crate) struct Sweep {
    pub local_center: Vec2,
    pub c0: Vec2,
    pub c: Vec2,
    pub a0: f32,
    pub a: f32,
}

/// Builder for creating rigid bodies
#[derive(Debug, Clone)]
pub struct BodyDef {
    pub(crate) body_type: BodyType,
    pub(crate) position: Vec2,
    pub(crate) angle: f32,
    pub(crate) linear_velocity: Vec2,
    pub(crate) angular_velocity: f32,
    pub(crate) linear_damping: f32,
    pub(crate) angular_damping: f32,
    pub(crate) gravity_scale: f32,
    pub(crate) fixed_rotation: bool,
    pub(crate) sleeping_allowed: bool,
    pub(crate) awake: bool,
    pub(crate) user_data: u64,
}

impl BodyDef {
    pub fn new(body_type: BodyType) -> Self {
        Self {
            body_type,
            position: Vec2::ZERO,
            angle: 0.0,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            gravity_scale: 1.0,
            fixed_rotation: false,
            sleeping_allowed: true,
            awake: true,
            user_data: 0,
        }
    }

    /// Create a new fixed (static) body definition
    pub fn new_static() -> Self {
        Self::new(BodyType::Static)
    }

    /// Create a new kinematic body definition
    pub fn new_kinematic() -> Self {
        Self::new(BodyType::Kinematic)
    }

    /// Create a new dynamic body definition
    pub fn new_dynamic() -> Self {
        Self::new(BodyType::Dynamic)
    }

    /// Set the initial position of the body origin
    pub fn position(mut self, x: f32, y: f32) -> Self {
        self.position = Vec2::new(x, y);
        self
    }

    /// Set the initial rotation in radians
    pub fn angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    pub fn linear_velocity(mut self, x: f32, y: f32) -> Self {
        self.linear_velocity = Vec2::new(x, y);
        self
    }

    pub fn angular_velocity(mut self, angvel: f32) -> Self {
        self.angular_velocity = angvel;
        self
    }

    pub fn damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    /// Set the gravity scale (1.0 = normal gravity, 0.0 = no gravity)
    pub fn gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = scale;
        self
    }

    /// Lock rotation
    pub fn fixed_rotation(mut self, fixed: bool) -> Self {
        self.fixed_rotation = fixed;
        self
    }

    /// Set whether the body can sleep when inactive
    pub fn sleeping_allowed(mut self, allowed: bool) -> Self {
        self.sleeping_allowed = allowed;
        self
    }

    pub fn awake(mut self, awake: bool) -> Self {
        self.awake = awake;
        self
    }

    /// Opaque id of the owning entity
    pub fn user_data(mut self, user_data: u64) -> Self {
        self.user_data = user_data;
        self
    }

    pub fn validate(&self) -> PhysicsResult<()> {
        if !is_finite_vec(self.position) || !self.angle.is_finite() {
            return Err(invalid("body transform must be finite"));
        }
        if !is_finite_vec(self.linear_velocity) || !self.angular_velocity.is_finite() {
            return Err(invalid("body velocity must be finite"));
        }
        if !(self.linear_damping >= 0.0 && self.angular_damping >= 0.0)
            || !self.linear_damping.is_finite()
            || !self.angular_damping.is_finite()
        {
            return Err(invalid("body damping must be finite and non-negative"));
        }
        if !self.gravity_scale.is_finite() {
            return Err(invalid("gravity scale must be finite"));
        }
        Ok(())
    }
}

impl Default for BodyDef {
    fn default() -> Self {
        Self::new_static()
    }
}

/// A rigid body owned by the world
#[derive(Debug, Clone)]
pub struct Body {
    pub(crate) body_type: BodyType,
    pub(crate) xf: Transform,
    pub(crate) sweep: Sweep,

    pub(crate) linear_velocity: Vec2,
    pub(crate) angular_velocity: f32,
    pub(crate) force: Vec2,
    pub(crate) torque: f32,

    pub(crate) mass: f32,
    pub(crate) inv_mass: f32,
    /// Rotational inertia about the centre of mass
    pub(crate) inertia: f32,
    pub(crate) inv_inertia: f32,

    pub(crate) linear_damping: f32,
    pub(crate) angular_damping: f32,
    pub(crate) gravity_scale: f32,

    pub(crate) fixed_rotation: bool,
    pub(crate) sleeping_allowed: bool,
    pub(crate) awake: bool,
    pub(crate) sleep_time: f32,

    /// Owned fixtures in creation order
    pub(crate) fixtures: Vec<FixtureHandle>,
    pub(crate) user_data: u64,
}

impl Body {
    pub(crate) fn new(def: &BodyDef) -> Self {
        let xf = Transform::new(def.position, def.angle);
        let dynamic_like = def.body_type != BodyType::Static;
        let mut body = Self {
            body_type: def.body_type,
            xf,
            sweep: Sweep {
                local_center: Vec2::ZERO,
                c0: xf.p,
                c: xf.p,
                a0: def.angle,
                a: def.angle,
            },
            linear_velocity: if dynamic_like {
                def.linear_velocity
            } else {
                Vec2::ZERO
            },
            angular_velocity: if dynamic_like {
                def.angular_velocity
            } else {
                0.0
            },
            force: Vec2::ZERO,
            torque: 0.0,
            mass: 0.0,
            inv_mass: 0.0,
            inertia: 0.0,
            inv_inertia: 0.0,
            linear_damping: def.linear_damping,
            angular_damping: def.angular_damping,
            gravity_scale: def.gravity_scale,
            fixed_rotation: def.fixed_rotation,
            sleeping_allowed: def.sleeping_allowed,
            awake: def.awake && dynamic_like,
            sleep_time: 0.0,
            fixtures: Vec::new(),
            user_data: def.user_data,
        };
        if !body.sleeping_allowed && dynamic_like {
            body.awake = true;
        }
        body.reset_mass_data(std::iter::empty());
        body
    }

    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    pub fn is_static(&self) -> bool {
        self.body_type == BodyType::Static
    }

    pub fn is_dynamic(&self) -> bool {
        self.body_type == BodyType::Dynamic
    }

    /// World transform of the body origin
    pub fn transform(&self) -> Transform {
        self.xf
    }

    /// World position of the body origin
    pub fn position(&self) -> Vec2 {
        self.xf.p
    }

    pub fn angle(&self) -> f32 {
        self.sweep.a
    }

    /// World position of the centre of mass
    pub fn world_center(&self) -> Vec2 {
        self.sweep.c
    }

    /// Centre of mass relative to the body origin
    pub fn local_center(&self) -> Vec2 {
        self.sweep.local_center
    }

    pub fn linear_velocity(&self) -> Vec2 {
        self.linear_velocity
    }

    pub fn angular_velocity(&self) -> f32 {
        self.angular_velocity
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    /// Rotational inertia about the centre of mass
    pub fn inertia(&self) -> f32 {
        self.inertia
    }

    pub fn inv_inertia(&self) -> f32 {
        self.inv_inertia
    }

    pub fn is_fixed_rotation(&self) -> bool {
        self.fixed_rotation
    }

    pub fn is_sleeping_allowed(&self) -> bool {
        self.sleeping_allowed
    }

    pub fn is_awake(&self) -> bool {
        self.awake
    }

    pub fn sleep_state(&self) -> SleepState {
        if self.awake {
            SleepState::Awake
        } else {
            SleepState::Sleeping
        }
    }

    /// Seconds the body has spent below the sleep tolerances
    pub fn sleep_time(&self) -> f32 {
        self.sleep_time
    }

    pub fn fixtures(&self) -> &[FixtureHandle] {
        &self.fixtures
    }

    pub fn user_data(&self) -> u64 {
        self.user_data
    }

    pub fn linear_damping(&self) -> f32 {
        self.linear_damping
    }

    pub fn angular_damping(&self) -> f32 {
        self.angular_damping
    }

    pub fn gravity_scale(&self) -> f32 {
        self.gravity_scale
    }

    /// Velocity of a world point attached to the body
    pub fn velocity_at_point(&self, world_point: Vec2) -> Vec2 {
        self.linear_velocity + cross_sv(self.angular_velocity, world_point - self.sweep.c)
    }

    /// Recompute mass, centre of mass and inertia from fixture contributions
    ///
    /// Static and kinematic bodies get zero inverse mass. A dynamic body with
    /// no massive fixtures falls back to unit mass so the solver never divides
    /// by zero.
    pub(crate) fn reset_mass_data(&mut self, parts: impl Iterator<Item = MassData>) {
        self.mass = 0.0;
        self.inv_mass = 0.0;
        self.inertia = 0.0;
        self.inv_inertia = 0.0;
        self.sweep.local_center = Vec2::ZERO;

        if self.body_type != BodyType::Dynamic {
            self.sweep.c0 = self.xf.p;
            self.sweep.c = self.xf.p;
            self.sweep.a0 = self.sweep.a;
            return;
        }

        let mut local_center = Vec2::ZERO;
        let mut inertia = 0.0;
        for md in parts {
            self.mass += md.mass;
            local_center += md.mass * md.center;
            inertia += md.inertia;
        }

        if self.mass > 0.0 {
            self.inv_mass = 1.0 / self.mass;
            local_center *= self.inv_mass;
        } else {
            self.mass = 1.0;
            self.inv_mass = 1.0;
        }

        if inertia > 0.0 && !self.fixed_rotation {
            // Shift from the body origin to the centre of mass
            self.inertia = inertia - self.mass * local_center.dot(local_center);
            if self.inertia > 0.0 {
                self.inv_inertia = 1.0 / self.inertia;
            } else {
                self.inertia = 0.0;
            }
        }

        let old_center = self.sweep.c;
        self.sweep.local_center = local_center;
        self.sweep.c = self.xf.apply(local_center);
        self.sweep.c0 = self.sweep.c;

        // Keep the velocity of the origin unchanged
        self.linear_velocity += cross_sv(self.angular_velocity, self.sweep.c - old_center);
    }

    /// Rebuild the origin transform from the centre-of-mass sweep
    pub(crate) fn synchronize_transform(&mut self) {
        self.xf.q = Rot::new(self.sweep.a);
        self.xf.p = self.sweep.c - self.xf.q.apply(self.sweep.local_center);
    }

    pub(crate) fn set_transform(&mut self, position: Vec2, angle: f32) {
        self.xf = Transform::new(position, angle);
        self.sweep.c = self.xf.apply(self.sweep.local_center);
        self.sweep.a = angle;
        self.sweep.c0 = self.sweep.c;
        self.sweep.a0 = angle;
    }

    pub(crate) fn set_awake(&mut self, awake: bool) {
        if self.body_type == BodyType::Static {
            return;
        }
        if awake {
            self.awake = true;
            self.sleep_time = 0.0;
        } else {
            self.awake = false;
            self.sleep_time = 0.0;
            self.linear_velocity = Vec2::ZERO;
            self.angular_velocity = 0.0;
            self.force = Vec2::ZERO;
            self.torque = 0.0;
        }
    }

    /// Whether contacts between these two bodies can be generated at all
    pub(crate) fn should_collide(&self, other: &Body) -> bool {
        self.body_type == BodyType::Dynamic || other.body_type == BodyType::Dynamic
    }

    pub(crate) fn is_finite(&self) -> bool {
        is_finite_vec(self.sweep.c)
            && self.sweep.a.is_finite()
            && is_finite_vec(self.linear_velocity)
            && self.angular_velocity.is_finite()
    }
}
