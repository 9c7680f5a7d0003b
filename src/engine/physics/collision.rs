use super::body::BodyHandle;
use super::fixture::FixtureHandle;

/// Layer/mask collision filter
///
/// Two fixtures interact when either one's layer intersects the other's mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollisionFilter {
    /// Bits this fixture lives on
    pub layer: u32,

    /// Bits this fixture collides with
    pub mask: u32,
}

impl CollisionFilter {
    /// Interacts with everything
    pub const ALL: Self = Self {
        layer: u32::MAX,
        mask: u32::MAX,
    };

    /// Interacts with nothing
    pub const NONE: Self = Self { layer: 0, mask: 0 };

    pub fn new(layer: u32, mask: u32) -> Self {
        Self { layer, mask }
    }

    /// Check whether two filters allow a contact
    pub fn should_collide(&self, other: &CollisionFilter) -> bool {
        (self.layer & other.mask) != 0 || (other.layer & self.mask) != 0
    }
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// Contact begin/end notifications for game logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactEvent {
    /// Two fixtures started touching
    Started {
        fixture_a: FixtureHandle,
        fixture_b: FixtureHandle,
        body_a: BodyHandle,
        body_b: BodyHandle,
        sensor: bool,
    },

    /// Two fixtures stopped touching, or one of them was destroyed
    Stopped {
        fixture_a: FixtureHandle,
        fixture_b: FixtureHandle,
        body_a: BodyHandle,
        body_b: BodyHandle,
        sensor: bool,
    },
}

impl ContactEvent {
    pub fn fixtures(&self) -> (FixtureHandle, FixtureHandle) {
        match *self {
            ContactEvent::Started {
                fixture_a,
                fixture_b,
                ..
            }
            | ContactEvent::Stopped {
                fixture_a,
                fixture_b,
                ..
            } => (fixture_a, fixture_b),
        }
    }

    pub fn is_started(&self) -> bool {
        matches!(self, ContactEvent::Started { .. })
    }
}

/// Events collected during a step, cleared when the next step begins
#[derive(Debug, Default)]
pub struct ContactEventQueue {
    events: Vec<ContactEvent>,
}

impl ContactEventQueue {
    pub fn new() -> Self {
        Self {
            events: Vec::with_capacity(32), // Pre-allocate for common case
        }
    }

    /// Clear all events (call at start of physics step)
    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn events(&self) -> &[ContactEvent] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<ContactEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn push(&mut self, event: ContactEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_layer_and_mask_collide() {
        // Ground and boxes in the tumbler scene use layer 2, mask 2
        let a = CollisionFilter::new(2, 2);
        let b = CollisionFilter::new(2, 2);
        assert!(a.should_collide(&b));
    }

    #[test]
    fn test_disjoint_filters_do_not_collide() {
        let a = CollisionFilter::new(0b01, 0b01);
        let b = CollisionFilter::new(0b10, 0b10);
        assert!(!a.should_collide(&b), "Disjoint layers/masks must not collide");
        assert!(!CollisionFilter::NONE.should_collide(&CollisionFilter::ALL));
    }

    #[test]
    fn test_one_sided_interest_is_enough() {
        // A only lives on bit 1, B only wants bit 1
        let a = CollisionFilter::new(0b01, 0);
        let b = CollisionFilter::new(0, 0b01);
        assert!(a.should_collide(&b));
        assert!(b.should_collide(&a), "Filter check must be symmetric");
    }
}
