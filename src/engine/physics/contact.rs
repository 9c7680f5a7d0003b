// Contact lifetime: creation from broad-phase pairs, manifold updates, removal

use std::collections::HashSet;

use super::body::{Body, BodyHandle};
use super::broad_phase::BroadPhase;
use super::collision::{ContactEvent, ContactEventQueue};
use super::fixture::{Fixture, FixtureHandle};
use super::handle::Arena;
use super::manifold::{collide, Manifold, WorldManifold};

/// Persistent pairing of two fixtures whose fat boxes overlap
#[derive(Debug, Clone)]
pub struct Contact {
    pub(crate) fixture_a: FixtureHandle,
    pub(crate) fixture_b: FixtureHandle,
    pub(crate) body_a: BodyHandle,
    pub(crate) body_b: BodyHandle,

    pub(crate) manifold: Manifold,

    /// Mixed material values
    pub(crate) friction: f32,
    pub(crate) restitution: f32,

    pub(crate) touching: bool,
    pub(crate) sensor: bool,

    /// Set when a fixture's filter changed, re-checked on the next update
    pub(crate) needs_filtering: bool,
}

impl Contact {
    pub(crate) fn new(
        fixture_a: FixtureHandle,
        fix_a: &Fixture,
        fixture_b: FixtureHandle,
        fix_b: &Fixture,
    ) -> Self {
        Self {
            fixture_a,
            fixture_b,
            body_a: fix_a.body,
            body_b: fix_b.body,
            manifold: Manifold::default(),
            friction: mix_friction(fix_a.friction, fix_b.friction),
            restitution: mix_restitution(fix_a.restitution, fix_b.restitution),
            touching: false,
            sensor: fix_a.sensor || fix_b.sensor,
            needs_filtering: false,
        }
    }

    pub fn fixture_a(&self) -> FixtureHandle {
        self.fixture_a
    }

    pub fn fixture_b(&self) -> FixtureHandle {
        self.fixture_b
    }

    pub fn body_a(&self) -> BodyHandle {
        self.body_a
    }

    pub fn body_b(&self) -> BodyHandle {
        self.body_b
    }

    pub fn manifold(&self) -> &Manifold {
        &self.manifold
    }

    pub fn friction(&self) -> f32 {
        self.friction
    }

    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    /// Shapes overlap (within their skins) as of the last update
    pub fn is_touching(&self) -> bool {
        self.touching
    }

    pub fn is_sensor(&self) -> bool {
        self.sensor
    }

    /// Whether the solver should act on this contact
    pub(crate) fn is_solid_touching(&self) -> bool {
        self.touching && !self.sensor
    }

    pub fn involves_fixture(&self, fixture: FixtureHandle) -> bool {
        self.fixture_a == fixture || self.fixture_b == fixture
    }

    pub fn involves_body(&self, body: BodyHandle) -> bool {
        self.body_a == body || self.body_b == body
    }

    /// World-space points and normal for the current body transforms
    pub fn world_manifold(&self, bodies: &Arena<Body>, fixtures: &Arena<Fixture>) -> WorldManifold {
        let parts = (
            bodies.get(self.body_a),
            bodies.get(self.body_b),
            fixtures.get(self.fixture_a),
            fixtures.get(self.fixture_b),
        );
        match parts {
            (Some(ba), Some(bb), Some(fa), Some(fb)) => WorldManifold::new(
                &self.manifold,
                &ba.xf,
                fa.shape.radius(),
                &bb.xf,
                fb.shape.radius(),
            ),
            _ => WorldManifold::default(),
        }
    }

    fn event(&self, started: bool) -> ContactEvent {
        if started {
            ContactEvent::Started {
                fixture_a: self.fixture_a,
                fixture_b: self.fixture_b,
                body_a: self.body_a,
                body_b: self.body_b,
                sensor: self.sensor,
            }
        } else {
            ContactEvent::Stopped {
                fixture_a: self.fixture_a,
                fixture_b: self.fixture_b,
                body_a: self.body_a,
                body_b: self.body_b,
                sensor: self.sensor,
            }
        }
    }
}

/// Geometric mean, so a frictionless surface stays frictionless
fn mix_friction(a: f32, b: f32) -> f32 {
    (a * b).sqrt()
}

fn mix_restitution(a: f32, b: f32) -> f32 {
    a.max(b)
}

fn pair_key(a: FixtureHandle, b: FixtureHandle) -> (FixtureHandle, FixtureHandle) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

enum Outcome {
    Keep,
    Destroy,
}

/// Owns every contact, kept in creation order
#[derive(Debug, Default)]
pub struct ContactManager {
    contacts: Vec<Contact>,
    pairs: HashSet<(FixtureHandle, FixtureHandle)>,
}

impl ContactManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub(crate) fn contacts_mut(&mut self) -> &mut [Contact] {
        &mut self.contacts
    }

    pub fn contains_pair(&self, a: FixtureHandle, b: FixtureHandle) -> bool {
        self.pairs.contains(&pair_key(a, b))
    }

    /// Create a contact for a new broad-phase pair unless filtering rejects it
    pub(crate) fn add_pair(
        &mut self,
        a: FixtureHandle,
        b: FixtureHandle,
        bodies: &Arena<Body>,
        fixtures: &Arena<Fixture>,
    ) {
        let (a, b) = pair_key(a, b);
        if self.pairs.contains(&(a, b)) {
            return;
        }

        let (Some(fix_a), Some(fix_b)) = (fixtures.get(a), fixtures.get(b)) else {
            return;
        };
        if fix_a.body == fix_b.body {
            return;
        }
        let (Some(body_a), Some(body_b)) = (bodies.get(fix_a.body), bodies.get(fix_b.body)) else {
            return;
        };
        if !body_a.should_collide(body_b) || !fix_a.filter.should_collide(&fix_b.filter) {
            return;
        }

        self.pairs.insert((a, b));
        self.contacts.push(Contact::new(a, fix_a, b, fix_b));
    }

    /// Update every contact's manifold, destroying those whose fat boxes separated
    pub(crate) fn collide(
        &mut self,
        bodies: &mut Arena<Body>,
        fixtures: &Arena<Fixture>,
        broad_phase: &BroadPhase,
        events: &mut ContactEventQueue,
    ) {
        let contacts = std::mem::take(&mut self.contacts);
        let mut kept = Vec::with_capacity(contacts.len());

        for mut contact in contacts {
            match update_contact(&mut contact, bodies, fixtures, broad_phase, events) {
                Outcome::Keep => kept.push(contact),
                Outcome::Destroy => {
                    self.pairs.remove(&(contact.fixture_a, contact.fixture_b));
                    if contact.touching {
                        events.push(contact.event(false));
                    }
                }
            }
        }

        self.contacts = kept;
    }

    /// Re-run filtering for every contact on `fixture` at the next update
    pub(crate) fn flag_for_filtering(&mut self, fixture: FixtureHandle) {
        for contact in self
            .contacts
            .iter_mut()
            .filter(|c| c.involves_fixture(fixture))
        {
            contact.needs_filtering = true;
        }
    }

    /// Remove every contact matching `pred`, reporting touching ones as stopped
    ///
    /// Returns the bodies on the other side of removed solid contacts.
    pub(crate) fn destroy_where(
        &mut self,
        events: &mut ContactEventQueue,
        mut pred: impl FnMut(&Contact) -> bool,
    ) -> Vec<BodyHandle> {
        let mut touched = Vec::new();
        let pairs = &mut self.pairs;
        self.contacts.retain(|contact| {
            if !pred(contact) {
                return true;
            }
            pairs.remove(&(contact.fixture_a, contact.fixture_b));
            if contact.touching {
                events.push(contact.event(false));
                if !contact.sensor {
                    touched.push(contact.body_a);
                    touched.push(contact.body_b);
                }
            }
            false
        });
        touched
    }

    pub(crate) fn destroy_for_fixture(
        &mut self,
        fixture: FixtureHandle,
        events: &mut ContactEventQueue,
    ) -> Vec<BodyHandle> {
        self.destroy_where(events, |c| c.involves_fixture(fixture))
    }

    pub(crate) fn destroy_for_body(
        &mut self,
        body: BodyHandle,
        events: &mut ContactEventQueue,
    ) -> Vec<BodyHandle> {
        self.destroy_where(events, |c| c.involves_body(body))
    }
}

fn update_contact(
    contact: &mut Contact,
    bodies: &mut Arena<Body>,
    fixtures: &Arena<Fixture>,
    broad_phase: &BroadPhase,
    events: &mut ContactEventQueue,
) -> Outcome {
    let (Some(fix_a), Some(fix_b)) = (
        fixtures.get(contact.fixture_a),
        fixtures.get(contact.fixture_b),
    ) else {
        return Outcome::Destroy;
    };
    let (Some(body_a), Some(body_b)) = (bodies.get(contact.body_a), bodies.get(contact.body_b))
    else {
        return Outcome::Destroy;
    };

    if contact.needs_filtering {
        if !body_a.should_collide(body_b) || !fix_a.filter.should_collide(&fix_b.filter) {
            return Outcome::Destroy;
        }
        contact.needs_filtering = false;
    }

    // Neither side can move, keep the previous result
    let active_a = body_a.awake && !body_a.is_static();
    let active_b = body_b.awake && !body_b.is_static();
    if !active_a && !active_b {
        return Outcome::Keep;
    }

    let (Some(proxy_a), Some(proxy_b)) = (fix_a.proxy, fix_b.proxy) else {
        return Outcome::Destroy;
    };
    if !broad_phase.test_overlap(proxy_a, proxy_b) {
        return Outcome::Destroy;
    }

    let was_touching = contact.touching;
    let manifold = collide(&fix_a.shape, &body_a.xf, &fix_b.shape, &body_b.xf);

    if contact.sensor {
        contact.touching = !manifold.is_empty();
        contact.manifold = Manifold::default();
    } else {
        let old = contact.manifold;
        let mut manifold = manifold;
        for point in manifold.points_mut() {
            point.normal_impulse = 0.0;
            point.tangent_impulse = 0.0;
            if let Some(prev) = old.points().iter().find(|p| p.id == point.id) {
                point.normal_impulse = prev.normal_impulse;
                point.tangent_impulse = prev.tangent_impulse;
            }
        }
        contact.touching = !manifold.is_empty();
        contact.manifold = manifold;
    }

    if contact.touching != was_touching {
        if !contact.sensor {
            if let Some(body) = bodies.get_mut(contact.body_a) {
                body.set_awake(true);
            }
            if let Some(body) = bodies.get_mut(contact.body_b) {
                body.set_awake(true);
            }
        }
        events.push(contact.event(contact.touching));
    }

    Outcome::Keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::math::Transform;
    use crate::engine::physics::body::BodyDef;
    use crate::engine::physics::fixture::FixtureDef;
    use glam::Vec2;

    struct Scene {
        bodies: Arena<Body>,
        fixtures: Arena<Fixture>,
        broad_phase: BroadPhase,
        contacts: ContactManager,
        events: ContactEventQueue,
    }

    impl Scene {
        fn new() -> Self {
            Self {
                bodies: Arena::new(),
                fixtures: Arena::new(),
                broad_phase: BroadPhase::new(0.1),
                contacts: ContactManager::new(),
                events: ContactEventQueue::new(),
            }
        }

        fn add(&mut self, body_def: BodyDef, fixture_def: FixtureDef) -> (BodyHandle, FixtureHandle) {
            let body = self.bodies.insert(Body::new(&body_def));
            let xf = self.bodies.get(body).unwrap().xf;
            let fixture = self
                .fixtures
                .insert(Fixture::new("fix1", body, fixture_def, &xf));
            let aabb = self.fixtures.get(fixture).unwrap().aabb;
            let proxy = self.broad_phase.create_proxy(aabb, fixture);
            self.fixtures.get_mut(fixture).unwrap().proxy = Some(proxy);
            self.bodies.get_mut(body).unwrap().fixtures.push(fixture);
            (body, fixture)
        }

        fn move_body(&mut self, body: BodyHandle, position: Vec2) {
            let b = self.bodies.get_mut(body).unwrap();
            b.set_transform(position, 0.0);
            let xf: Transform = b.xf;
            for &fh in &b.fixtures.clone() {
                let fixture = self.fixtures.get_mut(fh).unwrap();
                fixture.synchronize(&xf);
                let aabb = fixture.aabb;
                if let Some(proxy) = fixture.proxy {
                    self.broad_phase.move_proxy(proxy, aabb);
                }
            }
        }

        fn update(&mut self) {
            let mut new_pairs = Vec::new();
            self.broad_phase.update_pairs(|a, b| new_pairs.push((a, b)));
            for (a, b) in new_pairs {
                self.contacts.add_pair(a, b, &self.bodies, &self.fixtures);
            }
            self.contacts.collide(
                &mut self.bodies,
                &self.fixtures,
                &self.broad_phase,
                &mut self.events,
            );
        }
    }

    fn ground_def() -> FixtureDef {
        FixtureDef::edge(Vec2::new(-5.0, 0.0), Vec2::new(5.0, 0.0)).unwrap()
    }

    fn box_def() -> FixtureDef {
        FixtureDef::box_shape(0.5, 0.5).unwrap()
    }

    #[test]
    fn test_touching_contact_reports_started() {
        let mut scene = Scene::new();
        scene.add(BodyDef::new_static(), ground_def());
        scene.add(BodyDef::new_dynamic().position(0.0, 0.5), box_def());

        scene.update();
        assert_eq!(scene.contacts.len(), 1);
        let contact = &scene.contacts.contacts()[0];
        assert!(contact.is_touching());
        assert_eq!(contact.manifold().point_count(), 2);

        let events = scene.events.drain();
        assert_eq!(events.len(), 1);
        assert!(events[0].is_started());
    }

    #[test]
    fn test_separation_destroys_contact_and_reports_stopped() {
        let mut scene = Scene::new();
        scene.add(BodyDef::new_static(), ground_def());
        let (body, _) = scene.add(BodyDef::new_dynamic().position(0.0, 0.5), box_def());
        scene.update();
        scene.events.clear();

        scene.move_body(body, Vec2::new(0.0, 5.0));
        scene.update();
        assert!(scene.contacts.is_empty());
        let events = scene.events.events();
        assert_eq!(events.len(), 1);
        assert!(!events[0].is_started());
    }

    #[test]
    fn test_static_pairs_are_ignored() {
        let mut scene = Scene::new();
        scene.add(BodyDef::new_static(), ground_def());
        scene.add(BodyDef::new_static().position(0.0, 0.5), box_def());
        scene.update();
        assert!(scene.contacts.is_empty(), "Static bodies never collide with each other");
    }

    #[test]
    fn test_filter_rejects_pair() {
        let mut scene = Scene::new();
        scene.add(BodyDef::new_static(), ground_def().layer_mask(0b01, 0b01));
        scene.add(
            BodyDef::new_dynamic().position(0.0, 0.5),
            box_def().layer_mask(0b10, 0b10),
        );
        scene.update();
        assert!(scene.contacts.is_empty());
    }

    #[test]
    fn test_warm_start_impulses_survive_update() {
        let mut scene = Scene::new();
        scene.add(BodyDef::new_static(), ground_def());
        scene.add(BodyDef::new_dynamic().position(0.0, 0.5), box_def());
        scene.update();

        for point in scene.contacts.contacts_mut()[0].manifold.points_mut() {
            point.normal_impulse = 1.5;
        }
        scene.update();

        let contact = &scene.contacts.contacts()[0];
        for point in contact.manifold().points() {
            assert_eq!(point.normal_impulse, 1.5);
        }
    }

    #[test]
    fn test_sensor_touches_without_manifold() {
        let mut scene = Scene::new();
        scene.add(BodyDef::new_static(), ground_def().sensor(true));
        scene.add(BodyDef::new_dynamic().position(0.0, 0.5), box_def());
        scene.update();

        let contact = &scene.contacts.contacts()[0];
        assert!(contact.is_touching());
        assert!(contact.is_sensor());
        assert!(contact.manifold().is_empty());
        assert!(!contact.is_solid_touching());
    }

    #[test]
    fn test_destroy_for_body_reports_touching_contacts() {
        let mut scene = Scene::new();
        let (ground, _) = scene.add(BodyDef::new_static(), ground_def());
        let (body, _) = scene.add(BodyDef::new_dynamic().position(0.0, 0.5), box_def());
        scene.update();
        scene.events.clear();

        let touched = scene.contacts.destroy_for_body(body, &mut scene.events);
        assert!(scene.contacts.is_empty());
        assert!(touched.contains(&ground));
        assert_eq!(scene.events.events().len(), 1);
    }

    #[test]
    fn test_material_mixing() {
        assert!((mix_friction(0.2, 0.8) - 0.4).abs() < 1e-6);
        assert_eq!(mix_friction(0.0, 1.0), 0.0);
        assert_eq!(mix_restitution(0.1, 0.6), 0.6);
    }
}
