use glam::Vec2;

use super::aabb::{Aabb, RayCastInput};
use super::body::{Body, BodyDef, BodyHandle, BodyType};
use super::broad_phase::BroadPhase;
use super::collision::{CollisionFilter, ContactEvent, ContactEventQueue};
use super::command::{BodyCommand, CommandQueue};
use super::config::PhysicsConfig;
use super::contact::{Contact, ContactManager};
use super::error::{invalid, PhysicsError, PhysicsResult};
use super::fixture::{Fixture, FixtureDef, FixtureHandle};
use super::handle::Arena;
use super::island::{
    advance_sleep_timer, build_islands, solve_island, wake_kinematic_contacts, Island, TimeStep,
};
use super::manifold::WorldManifold;
use super::shape::MassData;
use crate::core::math::cross;

/// Closest fixture hit by a ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub fixture: FixtureHandle,
    pub body: BodyHandle,
    pub point: Vec2,
    pub normal: Vec2,
    /// Position along the ray, `origin + fraction * direction`
    pub fraction: f32,
}

/// Counters from the last step, mostly for logging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepStats {
    pub awake_bodies: usize,
    pub contacts: usize,
    pub touching_contacts: usize,
    pub islands_solved: usize,
    pub islands_slept: usize,
    /// Sleeping bodies woken by an awake kinematic body they touch
    pub kinematic_wakes: usize,
    pub tree_height: i32,
}

/// Physics world that owns every body, fixture and contact
///
/// Creating and destroying bodies or fixtures takes effect immediately.
/// Body state changes (type, velocity, sleep, forces) are queued and applied
/// in call order when the next step begins, so a step always sees a
/// consistent snapshot.
pub struct PhysicsWorld {
    config: PhysicsConfig,

    bodies: Arena<Body>,
    fixtures: Arena<Fixture>,

    broad_phase: BroadPhase,
    contact_manager: ContactManager,

    /// Body mutations waiting for the next step
    commands: CommandQueue,

    /// Contact begin/end events since the current step began
    contact_events: ContactEventQueue,

    /// Inverse of the previous step's dt, scales warm starting
    inv_dt0: f32,

    stats: StepStats,
}

impl PhysicsWorld {
    /// Create a new physics world with default settings
    pub fn new() -> Self {
        Self::build(PhysicsConfig::default())
    }

    /// Create a physics world with custom settings
    pub fn with_config(config: PhysicsConfig) -> PhysicsResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: PhysicsConfig) -> Self {
        Self {
            broad_phase: BroadPhase::new(config.aabb_margin),
            config,
            bodies: Arena::new(),
            fixtures: Arena::new(),
            contact_manager: ContactManager::new(),
            commands: CommandQueue::new(),
            contact_events: ContactEventQueue::new(),
            inv_dt0: 0.0,
            stats: StepStats::default(),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn set_gravity(&mut self, gravity: Vec2) -> PhysicsResult<()> {
        if !gravity.is_finite() {
            return Err(invalid("gravity must be finite"));
        }
        self.config.gravity = gravity;
        Ok(())
    }

    pub fn gravity(&self) -> Vec2 {
        self.config.gravity
    }

    // ------------------------------------------------------------------
    // Bodies and fixtures
    // ------------------------------------------------------------------

    /// Add a body; it has no fixtures and, if dynamic, unit fallback mass
    pub fn create_body(&mut self, def: BodyDef) -> PhysicsResult<BodyHandle> {
        def.validate()?;
        let handle = self.bodies.insert(Body::new(&def));
        log::debug!("Created {:?} body {:?}", def.body_type, handle);
        Ok(handle)
    }

    /// Remove a body, its fixtures and every contact referencing it
    pub fn destroy_body(&mut self, handle: BodyHandle) -> PhysicsResult<()> {
        let body = self.bodies.remove(handle).ok_or(PhysicsError::UnknownBody)?;

        for fixture_handle in &body.fixtures {
            if let Some(fixture) = self.fixtures.remove(*fixture_handle) {
                if let Some(proxy) = fixture.proxy {
                    self.broad_phase.destroy_proxy(proxy);
                }
            }
        }

        let touched = self
            .contact_manager
            .destroy_for_body(handle, &mut self.contact_events);
        self.wake_bodies(&touched);

        log::debug!(
            "Destroyed body {:?} with {} fixtures",
            handle,
            body.fixtures.len()
        );
        Ok(())
    }

    /// Attach a fixture to a body
    ///
    /// Fails without touching the body when the definition is invalid or
    /// `id` is already used on this body. Recomputes the body's mass.
    pub fn create_fixture(
        &mut self,
        body_handle: BodyHandle,
        id: &str,
        def: FixtureDef,
    ) -> PhysicsResult<FixtureHandle> {
        def.validate()?;
        let body = self.bodies.get(body_handle).ok_or(PhysicsError::UnknownBody)?;
        if self.fixture_by_id(body_handle, id).is_some() {
            return Err(PhysicsError::DuplicateFixtureId { id: id.to_string() });
        }

        let fixture = Fixture::new(id, body_handle, def, &body.xf);
        let aabb = fixture.aabb;
        let handle = self.fixtures.insert(fixture);
        let proxy = self.broad_phase.create_proxy(aabb, handle);
        if let Some(fixture) = self.fixtures.get_mut(handle) {
            fixture.proxy = Some(proxy);
        }

        if let Some(body) = self.bodies.get_mut(body_handle) {
            body.fixtures.push(handle);
        }
        self.reset_mass_data(body_handle);
        if let Some(body) = self.bodies.get_mut(body_handle) {
            body.set_awake(true);
        }

        log::debug!("Created fixture '{}' {:?} on body {:?}", id, handle, body_handle);
        Ok(handle)
    }

    /// Detach and drop a fixture, recomputing the owner's mass
    pub fn destroy_fixture(&mut self, handle: FixtureHandle) -> PhysicsResult<()> {
        let fixture = self.fixtures.remove(handle).ok_or(PhysicsError::UnknownFixture)?;
        if let Some(proxy) = fixture.proxy {
            self.broad_phase.destroy_proxy(proxy);
        }

        let touched = self
            .contact_manager
            .destroy_for_fixture(handle, &mut self.contact_events);
        self.wake_bodies(&touched);

        if let Some(body) = self.bodies.get_mut(fixture.body) {
            body.fixtures.retain(|f| *f != handle);
            body.set_awake(true);
        }
        self.reset_mass_data(fixture.body);

        log::debug!("Destroyed fixture '{}' {:?}", fixture.id, handle);
        Ok(())
    }

    /// Look up a fixture by its string id on one body
    pub fn fixture_by_id(&self, body: BodyHandle, id: &str) -> Option<FixtureHandle> {
        self.bodies.get(body)?.fixtures.iter().copied().find(|f| {
            self.fixtures
                .get(*f)
                .is_some_and(|fixture| fixture.id == id)
        })
    }

    /// Change a fixture's layer/mask; existing contacts are re-filtered next step
    pub fn set_collision_filter(
        &mut self,
        handle: FixtureHandle,
        filter: CollisionFilter,
    ) -> PhysicsResult<()> {
        let fixture = self
            .fixtures
            .get_mut(handle)
            .ok_or(PhysicsError::UnknownFixture)?;
        fixture.filter = filter;
        if let Some(proxy) = fixture.proxy {
            self.broad_phase.touch_proxy(proxy);
        }
        self.contact_manager.flag_for_filtering(handle);
        Ok(())
    }

    fn reset_mass_data(&mut self, handle: BodyHandle) {
        let Self { bodies, fixtures, .. } = self;
        let Some(body) = bodies.get_mut(handle) else {
            return;
        };
        let parts: Vec<MassData> = body
            .fixtures
            .iter()
            .filter_map(|f| fixtures.get(*f))
            .map(Fixture::mass_data)
            .collect();
        body.reset_mass_data(parts.into_iter());
    }

    fn synchronize_fixtures(&mut self, handle: BodyHandle) {
        let Self {
            bodies,
            fixtures,
            broad_phase,
            ..
        } = self;
        let Some(body) = bodies.get(handle) else {
            return;
        };
        for fixture_handle in &body.fixtures {
            if let Some(fixture) = fixtures.get_mut(*fixture_handle) {
                fixture.synchronize(&body.xf);
                if let Some(proxy) = fixture.proxy {
                    broad_phase.move_proxy(proxy, fixture.aabb);
                }
            }
        }
    }

    fn touch_fixtures(&mut self, handle: BodyHandle) {
        let Some(body) = self.bodies.get(handle) else {
            return;
        };
        for fixture_handle in &body.fixtures {
            if let Some(proxy) = self.fixtures.get(*fixture_handle).and_then(|f| f.proxy) {
                self.broad_phase.touch_proxy(proxy);
            }
        }
    }

    fn wake_bodies(&mut self, handles: &[BodyHandle]) {
        for handle in handles {
            if let Some(body) = self.bodies.get_mut(*handle) {
                body.set_awake(true);
            }
        }
    }

    // ------------------------------------------------------------------
    // Queued body operations
    // ------------------------------------------------------------------

    /// Queue a command for `body`, validated now and applied next step
    pub fn queue(&mut self, body: BodyHandle, command: BodyCommand) -> PhysicsResult<()> {
        if !self.bodies.contains(body) {
            return Err(PhysicsError::UnknownBody);
        }
        self.commands.push(body, command)
    }

    pub fn set_body_type(&mut self, body: BodyHandle, body_type: BodyType) -> PhysicsResult<()> {
        self.queue(body, BodyCommand::SetBodyType(body_type))
    }

    pub fn set_fixed_rotation(&mut self, body: BodyHandle, fixed: bool) -> PhysicsResult<()> {
        self.queue(body, BodyCommand::SetFixedRotation(fixed))
    }

    /// `false` pins the body awake until re-enabled
    pub fn set_sleeping_allowed(&mut self, body: BodyHandle, allowed: bool) -> PhysicsResult<()> {
        self.queue(body, BodyCommand::SetSleepingAllowed(allowed))
    }

    /// Wake the body and every body in its island
    pub fn wake_body(&mut self, body: BodyHandle) -> PhysicsResult<()> {
        self.queue(body, BodyCommand::Wake)
    }

    /// Put the body's whole island to sleep
    pub fn put_to_sleep(&mut self, body: BodyHandle) -> PhysicsResult<()> {
        self.queue(body, BodyCommand::Sleep)
    }

    pub fn set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec2) -> PhysicsResult<()> {
        self.queue(body, BodyCommand::SetLinearVelocity(velocity))
    }

    pub fn set_angular_velocity(&mut self, body: BodyHandle, omega: f32) -> PhysicsResult<()> {
        self.queue(body, BodyCommand::SetAngularVelocity(omega))
    }

    pub fn set_transform(
        &mut self,
        body: BodyHandle,
        position: Vec2,
        angle: f32,
    ) -> PhysicsResult<()> {
        self.queue(body, BodyCommand::SetTransform { position, angle })
    }

    /// Apply a force at a world point, accumulated until the end of the next step
    pub fn apply_force(&mut self, body: BodyHandle, force: Vec2, point: Vec2) -> PhysicsResult<()> {
        self.queue(
            body,
            BodyCommand::ApplyForce {
                force,
                point: Some(point),
            },
        )
    }

    pub fn apply_force_to_center(&mut self, body: BodyHandle, force: Vec2) -> PhysicsResult<()> {
        self.queue(body, BodyCommand::ApplyForce { force, point: None })
    }

    pub fn apply_torque(&mut self, body: BodyHandle, torque: f32) -> PhysicsResult<()> {
        self.queue(body, BodyCommand::ApplyTorque(torque))
    }

    /// Instantly change velocity by `impulse / mass` at a world point
    pub fn apply_linear_impulse(
        &mut self,
        body: BodyHandle,
        impulse: Vec2,
        point: Vec2,
    ) -> PhysicsResult<()> {
        self.queue(
            body,
            BodyCommand::ApplyLinearImpulse {
                impulse,
                point: Some(point),
            },
        )
    }

    pub fn apply_linear_impulse_to_center(
        &mut self,
        body: BodyHandle,
        impulse: Vec2,
    ) -> PhysicsResult<()> {
        self.queue(
            body,
            BodyCommand::ApplyLinearImpulse {
                impulse,
                point: None,
            },
        )
    }

    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    /// Apply every queued command now, in call order
    pub fn flush_commands(&mut self) {
        for (handle, command) in self.commands.take() {
            self.apply_command(handle, command);
        }
    }

    fn apply_command(&mut self, handle: BodyHandle, command: BodyCommand) {
        let Some(body) = self.bodies.get_mut(handle) else {
            log::warn!("Dropping {:?} for destroyed body {:?}", command, handle);
            return;
        };

        match command {
            BodyCommand::SetBodyType(body_type) => self.apply_body_type(handle, body_type),
            BodyCommand::SetFixedRotation(fixed) => {
                if body.fixed_rotation == fixed {
                    return;
                }
                body.fixed_rotation = fixed;
                body.angular_velocity = 0.0;
                self.reset_mass_data(handle);
            }
            BodyCommand::SetSleepingAllowed(allowed) => {
                body.sleeping_allowed = allowed;
                if allowed {
                    body.sleep_time = 0.0;
                } else {
                    body.set_awake(true);
                }
            }
            BodyCommand::Wake => self.wake_island(handle),
            BodyCommand::Sleep => self.sleep_island(handle),
            BodyCommand::SetLinearVelocity(v) => {
                if body.is_static() {
                    return;
                }
                if command.wakes_body() {
                    body.set_awake(true);
                }
                body.linear_velocity = v;
            }
            BodyCommand::SetAngularVelocity(w) => {
                if body.is_static() {
                    return;
                }
                if command.wakes_body() {
                    body.set_awake(true);
                }
                body.angular_velocity = w;
            }
            BodyCommand::SetTransform { position, angle } => {
                body.set_transform(position, angle);
                self.synchronize_fixtures(handle);

                // Whatever rested on the body has lost its support
                let neighbours: Vec<BodyHandle> = self
                    .contact_manager
                    .contacts()
                    .iter()
                    .filter(|c| c.is_touching() && c.involves_body(handle))
                    .map(|c| if c.body_a == handle { c.body_b } else { c.body_a })
                    .collect();
                self.wake_bodies(&neighbours);
            }
            BodyCommand::ApplyForce { force, point } => {
                if !body.is_dynamic() {
                    return;
                }
                body.set_awake(true);
                let point = point.unwrap_or(body.sweep.c);
                body.force += force;
                body.torque += cross(point - body.sweep.c, force);
            }
            BodyCommand::ApplyTorque(torque) => {
                if !body.is_dynamic() {
                    return;
                }
                body.set_awake(true);
                body.torque += torque;
            }
            BodyCommand::ApplyLinearImpulse { impulse, point } => {
                if !body.is_dynamic() {
                    return;
                }
                body.set_awake(true);
                let point = point.unwrap_or(body.sweep.c);
                body.linear_velocity += body.inv_mass * impulse;
                body.angular_velocity += body.inv_inertia * cross(point - body.sweep.c, impulse);
            }
        }
    }

    fn apply_body_type(&mut self, handle: BodyHandle, body_type: BodyType) {
        let Some(body) = self.bodies.get_mut(handle) else {
            return;
        };
        if body.body_type == body_type {
            return;
        }
        let previous = body.body_type;
        body.body_type = body_type;

        if body_type != BodyType::Dynamic {
            body.linear_velocity = Vec2::ZERO;
            body.angular_velocity = 0.0;
        }
        body.force = Vec2::ZERO;
        body.torque = 0.0;
        if body_type == BodyType::Static {
            body.awake = false;
            body.sleep_time = 0.0;
        } else {
            body.set_awake(true);
        }
        self.reset_mass_data(handle);

        // Contacts were filtered with the old type
        let touched = self
            .contact_manager
            .destroy_for_body(handle, &mut self.contact_events);
        self.wake_bodies(&touched);
        self.touch_fixtures(handle);

        log::debug!("Body {:?} changed from {:?} to {:?}", handle, previous, body_type);
    }

    /// Island containing `handle`, or `None` for static and kinematic bodies
    fn island_of(&self, handle: BodyHandle) -> Option<Island> {
        build_islands(&self.bodies, self.contact_manager.contacts())
            .into_iter()
            .find(|island| island.contains(handle))
    }

    fn wake_island(&mut self, handle: BodyHandle) {
        let members = match self.island_of(handle) {
            Some(island) => island.bodies,
            None => vec![handle],
        };
        self.wake_bodies(&members);
    }

    fn sleep_island(&mut self, handle: BodyHandle) {
        let members = match self.island_of(handle) {
            Some(island) => island.bodies,
            None => vec![handle],
        };
        let pinned = members
            .iter()
            .any(|h| self.bodies.get(*h).is_some_and(|b| !b.sleeping_allowed));
        if pinned {
            log::debug!("Island of {:?} has a pinned body, staying awake", handle);
            return;
        }
        for member in members {
            if let Some(body) = self.bodies.get_mut(member) {
                body.set_awake(false);
            }
        }
    }

    // ------------------------------------------------------------------
    // Stepping
    // ------------------------------------------------------------------

    /// Advance the simulation by `dt` seconds
    ///
    /// Queued commands are applied first, even when paused. A paused step
    /// does nothing else.
    pub fn step(&mut self, dt: f32, paused: bool) -> PhysicsResult<()> {
        self.contact_events.clear();
        self.flush_commands();
        if paused {
            return Ok(());
        }
        if !dt.is_finite() || dt < 0.0 {
            return Err(invalid(format!("time step must be finite and non-negative, got {dt}")));
        }
        if dt == 0.0 {
            return Ok(());
        }

        let step = TimeStep {
            dt,
            dt_ratio: self.inv_dt0 * dt,
        };
        let mut stats = StepStats::default();

        // Broad phase: new pairs become contacts
        {
            let Self {
                broad_phase,
                contact_manager,
                bodies,
                fixtures,
                ..
            } = self;
            broad_phase.update_pairs(|a, b| contact_manager.add_pair(a, b, bodies, fixtures));
        }

        // Narrow phase
        self.contact_manager.collide(
            &mut self.bodies,
            &self.fixtures,
            &self.broad_phase,
            &mut self.contact_events,
        );

        stats.kinematic_wakes =
            wake_kinematic_contacts(&mut self.bodies, self.contact_manager.contacts());

        // Islands
        let islands = build_islands(&self.bodies, self.contact_manager.contacts());
        let mut moved: Vec<BodyHandle> = Vec::new();
        for island in &islands {
            if !island.is_awake(&self.bodies) {
                continue;
            }
            for handle in &island.bodies {
                if let Some(body) = self.bodies.get_mut(*handle) {
                    if !body.awake {
                        body.set_awake(true);
                    }
                }
            }

            let slept = solve_island(
                island,
                &mut self.bodies,
                &self.fixtures,
                self.contact_manager.contacts_mut(),
                &self.config,
                step,
            );
            stats.islands_solved += 1;
            if slept {
                stats.islands_slept += 1;
            }
            moved.extend_from_slice(&island.bodies);
        }

        moved.extend(self.integrate_kinematic_bodies(dt));

        // Must run before fixtures sync into the tree
        if let Some((handle, _)) = self.bodies.iter().find(|(_, b)| !b.is_finite()) {
            return Err(PhysicsError::InvalidState(format!(
                "body {handle:?} has a non-finite position or velocity"
            )));
        }

        for handle in moved {
            self.synchronize_fixtures(handle);
        }

        for (_, body) in self.bodies.iter_mut() {
            body.force = Vec2::ZERO;
            body.torque = 0.0;
        }

        self.inv_dt0 = 1.0 / dt;

        stats.awake_bodies = self.bodies.iter().filter(|(_, b)| b.awake).count();
        stats.contacts = self.contact_manager.len();
        stats.touching_contacts = self
            .contact_manager
            .contacts()
            .iter()
            .filter(|c| c.is_touching())
            .count();
        stats.tree_height = self.broad_phase.tree_height();
        self.stats = stats;
        log::trace!("Step stats: {:?}", stats);

        Ok(())
    }

    /// Move kinematic bodies by their own velocity, outside any island
    fn integrate_kinematic_bodies(&mut self, h: f32) -> Vec<BodyHandle> {
        let lin_tol_sqr = self.config.linear_sleep_tolerance * self.config.linear_sleep_tolerance;
        let ang_tol_sqr = self.config.angular_sleep_tolerance * self.config.angular_sleep_tolerance;
        let mut moved = Vec::new();

        for (handle, body) in self.bodies.iter_mut() {
            if body.body_type != BodyType::Kinematic || !body.awake {
                continue;
            }
            body.sweep.c0 = body.sweep.c;
            body.sweep.a0 = body.sweep.a;
            body.sweep.c += h * body.linear_velocity;
            body.sweep.a += h * body.angular_velocity;
            body.synchronize_transform();
            moved.push(handle);

            if self.config.sleeping_enabled
                && advance_sleep_timer(body, h, lin_tol_sqr, ang_tol_sqr)
                && body.sleep_time >= self.config.time_to_sleep
            {
                body.set_awake(false);
            }
        }
        moved
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle)
    }

    #[cfg(test)]
    pub(crate) fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies.get_mut(handle)
    }

    pub fn fixture(&self, handle: FixtureHandle) -> Option<&Fixture> {
        self.fixtures.get(handle)
    }

    /// Bodies in creation-slot order
    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &Body)> {
        self.bodies.iter()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn fixture_count(&self) -> usize {
        self.fixtures.len()
    }

    pub fn awake_body_count(&self) -> usize {
        self.bodies.iter().filter(|(_, b)| b.awake).count()
    }

    pub fn contacts(&self) -> &[Contact] {
        self.contact_manager.contacts()
    }

    pub fn world_manifold(&self, contact: &Contact) -> WorldManifold {
        contact.world_manifold(&self.bodies, &self.fixtures)
    }

    pub fn broad_phase(&self) -> &BroadPhase {
        &self.broad_phase
    }

    pub fn last_step_stats(&self) -> StepStats {
        self.stats
    }

    /// Contact events since the current step began
    pub fn contact_events(&self) -> &[ContactEvent] {
        self.contact_events.events()
    }

    pub fn drain_contact_events(&mut self) -> Vec<ContactEvent> {
        self.contact_events.drain()
    }

    /// Visit fixtures whose bounding box overlaps `aabb`; return false to stop
    pub fn query_aabb(&self, aabb: &Aabb, mut callback: impl FnMut(FixtureHandle) -> bool) {
        self.broad_phase.query(aabb, |handle| {
            match self.fixtures.get(handle) {
                Some(fixture) if fixture.aabb.overlaps(aabb) => callback(handle),
                _ => true,
            }
        });
    }

    /// Fixtures whose shape contains `point`
    pub fn query_point(&self, point: Vec2) -> Vec<FixtureHandle> {
        let mut hits = Vec::new();
        let aabb = Aabb::new(point, point);
        self.query_aabb(&aabb, |handle| {
            let inside = self.fixtures.get(handle).is_some_and(|fixture| {
                self.bodies
                    .get(fixture.body)
                    .is_some_and(|body| fixture.test_point(&body.xf, point))
            });
            if inside {
                hits.push(handle);
            }
            true
        });
        hits.sort();
        hits
    }

    /// Closest solid fixture hit along `origin + t * direction`, `t` in `[0, max_fraction]`
    pub fn ray_cast(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_fraction: f32,
        filter: CollisionFilter,
    ) -> Option<RayHit> {
        let input = RayCastInput {
            p1: origin,
            p2: origin + direction,
            max_fraction,
        };
        let mut closest: Option<RayHit> = None;

        self.broad_phase.ray_cast(&input, |sub_input, handle| {
            let Some(fixture) = self.fixtures.get(handle) else {
                return -1.0;
            };
            if fixture.sensor || !fixture.filter.should_collide(&filter) {
                return -1.0;
            }
            let Some(body) = self.bodies.get(fixture.body) else {
                return -1.0;
            };
            match fixture.shape.ray_cast(sub_input, &body.xf) {
                Some(output) => {
                    closest = Some(RayHit {
                        fixture: handle,
                        body: fixture.body,
                        point: origin + output.fraction * direction,
                        normal: output.normal,
                        fraction: output.fraction,
                    });
                    // Clip the ray so only closer hits are reported next
                    output.fraction
                }
                None => -1.0,
            }
        });

        closest
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}
