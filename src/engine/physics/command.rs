// Deferred body mutations, applied in call order at the start of a step

use glam::Vec2;

use super::body::{BodyHandle, BodyType};
use super::error::{invalid, PhysicsResult};
use crate::core::math::is_finite_vec;

/// A state change requested for one body
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyCommand {
    SetBodyType(BodyType),
    SetFixedRotation(bool),
    SetSleepingAllowed(bool),
    Wake,
    Sleep,
    SetLinearVelocity(Vec2),
    SetAngularVelocity(f32),
    SetTransform { position: Vec2, angle: f32 },

    /// Force in newtons, `point` in world space (centre of mass when `None`)
    ApplyForce { force: Vec2, point: Option<Vec2> },
    ApplyTorque(f32),
    ApplyLinearImpulse { impulse: Vec2, point: Option<Vec2> },
}

impl BodyCommand {
    /// Reject non-finite inputs before they can reach the solver
    pub fn validate(&self) -> PhysicsResult<()> {
        let finite = match *self {
            BodyCommand::SetLinearVelocity(v) => is_finite_vec(v),
            BodyCommand::SetAngularVelocity(w) | BodyCommand::ApplyTorque(w) => w.is_finite(),
            BodyCommand::SetTransform { position, angle } => {
                is_finite_vec(position) && angle.is_finite()
            }
            BodyCommand::ApplyForce { force: v, point }
            | BodyCommand::ApplyLinearImpulse { impulse: v, point } => {
                is_finite_vec(v) && point.map_or(true, is_finite_vec)
            }
            BodyCommand::SetBodyType(_)
            | BodyCommand::SetFixedRotation(_)
            | BodyCommand::SetSleepingAllowed(_)
            | BodyCommand::Wake
            | BodyCommand::Sleep => true,
        };
        if finite {
            Ok(())
        } else {
            Err(invalid(format!("non-finite value in {self:?}")))
        }
    }

    /// Whether this command should wake a sleeping body
    pub fn wakes_body(&self) -> bool {
        match *self {
            BodyCommand::Wake
            | BodyCommand::ApplyForce { .. }
            | BodyCommand::ApplyTorque(_)
            | BodyCommand::ApplyLinearImpulse { .. }
            | BodyCommand::SetBodyType(_) => true,
            BodyCommand::SetLinearVelocity(v) => v.length_squared() > 0.0,
            BodyCommand::SetAngularVelocity(w) => w * w > 0.0,
            BodyCommand::SetSleepingAllowed(allowed) => !allowed,
            BodyCommand::SetFixedRotation(_)
            | BodyCommand::SetTransform { .. }
            | BodyCommand::Sleep => false,
        }
    }
}

/// FIFO of pending body commands
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: Vec<(BodyHandle, BodyCommand)>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn push(&mut self, body: BodyHandle, command: BodyCommand) -> PhysicsResult<()> {
        command.validate()?;
        self.pending.push((body, command));
        Ok(())
    }

    /// Take every pending command, oldest first
    pub fn take(&mut self) -> Vec<(BodyHandle, BodyCommand)> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::physics::error::PhysicsError;

    #[test]
    fn test_non_finite_commands_rejected() {
        let mut queue = CommandQueue::new();
        let body = BodyHandle::new(0, 0);

        let err = queue
            .push(body, BodyCommand::SetLinearVelocity(Vec2::new(f32::NAN, 0.0)))
            .unwrap_err();
        assert!(matches!(err, PhysicsError::InvalidConfiguration(_)));

        assert!(queue
            .push(
                body,
                BodyCommand::ApplyForce {
                    force: Vec2::X,
                    point: Some(Vec2::new(0.0, f32::INFINITY)),
                },
            )
            .is_err());
        assert!(queue.is_empty(), "Rejected commands must not be queued");
    }

    #[test]
    fn test_commands_keep_call_order() {
        let mut queue = CommandQueue::new();
        let a = BodyHandle::new(0, 0);
        let b = BodyHandle::new(1, 0);
        queue.push(a, BodyCommand::Wake).unwrap();
        queue.push(b, BodyCommand::SetFixedRotation(true)).unwrap();
        queue.push(a, BodyCommand::Sleep).unwrap();

        let taken = queue.take();
        assert_eq!(
            taken,
            vec![
                (a, BodyCommand::Wake),
                (b, BodyCommand::SetFixedRotation(true)),
                (a, BodyCommand::Sleep),
            ]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_wake_rules() {
        assert!(BodyCommand::ApplyTorque(1.0).wakes_body());
        assert!(!BodyCommand::SetLinearVelocity(Vec2::ZERO).wakes_body());
        assert!(BodyCommand::SetLinearVelocity(Vec2::X).wakes_body());
        assert!(BodyCommand::SetSleepingAllowed(false).wakes_body());
        assert!(!BodyCommand::SetSleepingAllowed(true).wakes_body());
    }
}
