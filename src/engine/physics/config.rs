// Simulation tuning parameters

use glam::Vec2;
use std::f32::consts::PI;

use super::error::{invalid, PhysicsResult};

/// Skin thickness around polygons and edges, keeps resting contacts alive
pub const POLYGON_RADIUS: f32 = 0.01;

/// Maximum number of vertices on a convex polygon
pub const MAX_POLYGON_VERTICES: usize = 8;

/// Tuning parameters for the world step
///
/// Defaults follow the usual fixed-timestep settings for metre-scale worlds.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsConfig {
    /// Gravity acceleration applied to dynamic bodies
    pub gravity: Vec2,

    /// Sequential-impulse iterations per step
    pub velocity_iterations: u32,

    /// Position correction iterations per step
    pub position_iterations: u32,

    /// Reuse last step's impulses as the initial guess
    pub warm_starting: bool,

    /// Solve two-point manifolds as a 2x2 LCP instead of point by point
    pub block_solver: bool,

    /// Fraction of penetration removed per position iteration
    pub baumgarte: f32,

    /// Allowed penetration, keeps contacts stable
    pub linear_slop: f32,

    /// Cap on position correction per iteration
    pub max_linear_correction: f32,

    /// Cap on the distance a body can move in one step
    pub max_translation: f32,

    /// Cap on the rotation of a body in one step (radians)
    pub max_rotation: f32,

    /// Relative normal speed below which contacts are treated as inelastic
    pub restitution_threshold: f32,

    /// Bodies slower than this are candidates for sleep
    pub linear_sleep_tolerance: f32,

    /// Bodies rotating slower than this (rad/s) are candidates for sleep
    pub angular_sleep_tolerance: f32,

    /// Seconds an island must stay below the tolerances before sleeping
    pub time_to_sleep: f32,

    /// Margin added around fixture AABBs in the broad phase
    pub aabb_margin: f32,

    /// Global switch for sleeping
    pub sleeping_enabled: bool,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, -9.8),
            velocity_iterations: 8,
            position_iterations: 3,
            warm_starting: true,
            block_solver: true,
            baumgarte: 0.2,
            linear_slop: 0.005,
            max_linear_correction: 0.2,
            max_translation: 2.0,
            max_rotation: 0.5 * PI,
            restitution_threshold: 1.0,
            linear_sleep_tolerance: 0.01,
            angular_sleep_tolerance: 2.0 / 180.0 * PI,
            time_to_sleep: 0.5,
            aabb_margin: 0.1,
            sleeping_enabled: true,
        }
    }
}

impl PhysicsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_iterations(mut self, velocity: u32, position: u32) -> Self {
        self.velocity_iterations = velocity;
        self.position_iterations = position;
        self
    }

    pub fn with_warm_starting(mut self, enabled: bool) -> Self {
        self.warm_starting = enabled;
        self
    }

    pub fn with_block_solver(mut self, enabled: bool) -> Self {
        self.block_solver = enabled;
        self
    }

    pub fn with_sleeping(mut self, enabled: bool) -> Self {
        self.sleeping_enabled = enabled;
        self
    }

    pub fn with_time_to_sleep(mut self, seconds: f32) -> Self {
        self.time_to_sleep = seconds;
        self
    }

    pub fn with_sleep_tolerances(mut self, linear: f32, angular: f32) -> Self {
        self.linear_sleep_tolerance = linear;
        self.angular_sleep_tolerance = angular;
        self
    }

    /// Check that every parameter is usable by the solver
    pub fn validate(&self) -> PhysicsResult<()> {
        if !self.gravity.is_finite() {
            return Err(invalid("gravity must be finite"));
        }
        if self.velocity_iterations == 0 {
            return Err(invalid("velocity iterations must be at least 1"));
        }
        if !(self.baumgarte > 0.0 && self.baumgarte <= 1.0) {
            return Err(invalid("baumgarte factor must be in (0, 1]"));
        }

        let non_negative = [
            ("linear slop", self.linear_slop),
            ("max linear correction", self.max_linear_correction),
            ("max translation", self.max_translation),
            ("max rotation", self.max_rotation),
            ("restitution threshold", self.restitution_threshold),
            ("linear sleep tolerance", self.linear_sleep_tolerance),
            ("angular sleep tolerance", self.angular_sleep_tolerance),
            ("time to sleep", self.time_to_sleep),
            ("aabb margin", self.aabb_margin),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("{name} must be finite and non-negative")));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::physics::error::PhysicsError;

    #[test]
    fn test_default_config_is_valid() {
        let config = PhysicsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.velocity_iterations, 8);
        assert_eq!(config.position_iterations, 3);
    }

    #[test]
    fn test_builder_methods() {
        let config = PhysicsConfig::new()
            .with_gravity(Vec2::new(0.0, -20.0))
            .with_iterations(4, 2)
            .with_sleeping(false)
            .with_time_to_sleep(1.0);

        assert_eq!(config.gravity, Vec2::new(0.0, -20.0));
        assert_eq!(config.velocity_iterations, 4);
        assert_eq!(config.position_iterations, 2);
        assert!(!config.sleeping_enabled);
        assert_eq!(config.time_to_sleep, 1.0);
    }

    #[test]
    fn test_rejects_bad_values() {
        let config = PhysicsConfig::new().with_gravity(Vec2::new(f32::NAN, 0.0));
        assert!(matches!(
            config.validate(),
            Err(PhysicsError::InvalidConfiguration(_))
        ));

        let config = PhysicsConfig::new().with_iterations(0, 3);
        assert!(config.validate().is_err());

        let config = PhysicsConfig::new().with_time_to_sleep(-1.0);
        assert!(config.validate().is_err());
    }
}
