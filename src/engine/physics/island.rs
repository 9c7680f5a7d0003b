// Islands: contact-connected groups of dynamic bodies, solved and put to sleep together

use std::collections::HashMap;

use super::body::{Body, BodyHandle, BodyType};
use super::config::PhysicsConfig;
use super::contact::Contact;
use super::fixture::Fixture;
use super::handle::Arena;
use super::solver::{ContactInput, ContactSolver, SolverBody};

/// Disjoint-set forest with path halving and union by rank
#[derive(Debug, Clone)]
pub(crate) struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    pub fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

/// Dynamic bodies linked by touching solid contacts
///
/// Static and kinematic bodies take part in an island's contacts but never
/// link two islands together.
#[derive(Debug, Clone, Default)]
pub(crate) struct Island {
    /// Dynamic members in arena order
    pub bodies: Vec<BodyHandle>,

    /// Indices into the contact list, in creation order
    pub contacts: Vec<usize>,
}

impl Island {
    pub fn is_awake(&self, bodies: &Arena<Body>) -> bool {
        self.bodies
            .iter()
            .any(|h| bodies.get(*h).is_some_and(|b| b.awake))
    }

    pub fn contains(&self, body: BodyHandle) -> bool {
        self.bodies.contains(&body)
    }
}

/// Partition every dynamic body into islands
///
/// Sleeping bodies are included so that one awake member can wake the rest.
/// Output order follows the first member's arena slot, which keeps solving
/// deterministic.
pub(crate) fn build_islands(bodies: &Arena<Body>, contacts: &[Contact]) -> Vec<Island> {
    let mut dense = vec![usize::MAX; bodies.capacity()];
    let mut members = Vec::new();
    for (handle, body) in bodies.iter() {
        if body.body_type == BodyType::Dynamic {
            dense[handle.index() as usize] = members.len();
            members.push(handle);
        }
    }

    let lookup = |handle: BodyHandle| -> Option<usize> {
        bodies.get(handle)?;
        match dense.get(handle.index() as usize) {
            Some(&i) if i != usize::MAX => Some(i),
            _ => None,
        }
    };

    let mut sets = UnionFind::new(members.len());
    for contact in contacts.iter().filter(|c| c.is_solid_touching()) {
        if let (Some(a), Some(b)) = (lookup(contact.body_a), lookup(contact.body_b)) {
            sets.union(a, b);
        }
    }

    let mut island_of_root = vec![usize::MAX; members.len()];
    let mut island_of_member = vec![0; members.len()];
    let mut islands: Vec<Island> = Vec::new();
    for (i, handle) in members.iter().enumerate() {
        let root = sets.find(i);
        if island_of_root[root] == usize::MAX {
            island_of_root[root] = islands.len();
            islands.push(Island::default());
        }
        let island = island_of_root[root];
        island_of_member[i] = island;
        islands[island].bodies.push(*handle);
    }

    for (index, contact) in contacts.iter().enumerate() {
        if !contact.is_solid_touching() {
            continue;
        }
        let member = lookup(contact.body_a).or_else(|| lookup(contact.body_b));
        if let Some(m) = member {
            islands[island_of_member[m]].contacts.push(index);
        }
    }

    islands
}

/// Wake dynamic bodies touching an awake kinematic body
///
/// Kinematic bodies never join an island, so they can't wake one through
/// union-find. Each touched body's sleep timer is also held at or below the
/// kinematic body's, so it can't fall asleep while being carried.
/// Returns how many sleeping bodies were woken.
pub(crate) fn wake_kinematic_contacts(bodies: &mut Arena<Body>, contacts: &[Contact]) -> usize {
    let mut woken = 0;
    for contact in contacts.iter().filter(|c| c.is_solid_touching()) {
        for (driver, other) in [
            (contact.body_a, contact.body_b),
            (contact.body_b, contact.body_a),
        ] {
            let Some(kinematic) = bodies.get(driver) else {
                continue;
            };
            if kinematic.body_type != BodyType::Kinematic || !kinematic.awake {
                continue;
            }
            let sleep_time = kinematic.sleep_time;

            let Some(body) = bodies.get_mut(other) else {
                continue;
            };
            if body.body_type != BodyType::Dynamic {
                continue;
            }
            if !body.awake {
                body.set_awake(true);
                woken += 1;
                log::debug!("Kinematic body {:?} woke {:?}", driver, other);
            }
            body.sleep_time = body.sleep_time.min(sleep_time);
        }
    }
    woken
}

/// Per-step values shared by every island solve
#[derive(Debug, Clone, Copy)]
pub(crate) struct TimeStep {
    pub dt: f32,
    /// `dt * inv_dt0`, scales warm-start impulses when dt changes
    pub dt_ratio: f32,
}

/// Integrate, solve contacts and evaluate sleep for one awake island
///
/// Returns true when the island was put to sleep.
pub(crate) fn solve_island(
    island: &Island,
    bodies: &mut Arena<Body>,
    fixtures: &Arena<Fixture>,
    contacts: &mut [Contact],
    config: &PhysicsConfig,
    step: TimeStep,
) -> bool {
    let h = step.dt;

    let mut index_of: HashMap<BodyHandle, usize> = HashMap::with_capacity(island.bodies.len());
    let mut solver_bodies: Vec<SolverBody> = Vec::with_capacity(island.bodies.len() + 1);

    for &handle in &island.bodies {
        let Some(body) = bodies.get_mut(handle) else {
            continue;
        };
        body.sweep.c0 = body.sweep.c;
        body.sweep.a0 = body.sweep.a;

        let mut v = body.linear_velocity;
        let mut w = body.angular_velocity;
        v += h * body.inv_mass * (body.gravity_scale * body.mass * config.gravity + body.force);
        w += h * body.inv_inertia * body.torque;

        // Pade approximation of exp(-h * damping), stable for large damping
        v *= 1.0 / (1.0 + h * body.linear_damping);
        w *= 1.0 / (1.0 + h * body.angular_damping);

        index_of.insert(handle, solver_bodies.len());
        solver_bodies.push(SolverBody {
            c: body.sweep.c,
            a: body.sweep.a,
            v,
            w,
            inv_mass: body.inv_mass,
            inv_i: body.inv_inertia,
            local_center: body.sweep.local_center,
        });
    }
    let member_count = solver_bodies.len();

    let mut inputs = Vec::with_capacity(island.contacts.len());
    for &ci in &island.contacts {
        let contact = &contacts[ci];
        let mut slot = |handle: BodyHandle| -> Option<usize> {
            if let Some(&i) = index_of.get(&handle) {
                return Some(i);
            }
            // Static or kinematic neighbour: read-only, never written back
            let body = bodies.get(handle)?;
            let i = solver_bodies.len();
            solver_bodies.push(SolverBody {
                c: body.sweep.c,
                a: body.sweep.a,
                v: body.linear_velocity,
                w: body.angular_velocity,
                inv_mass: 0.0,
                inv_i: 0.0,
                local_center: body.sweep.local_center,
            });
            index_of.insert(handle, i);
            Some(i)
        };
        let (Some(index_a), Some(index_b)) = (slot(contact.body_a), slot(contact.body_b)) else {
            continue;
        };
        let (Some(fix_a), Some(fix_b)) = (
            fixtures.get(contact.fixture_a),
            fixtures.get(contact.fixture_b),
        ) else {
            continue;
        };
        inputs.push(ContactInput {
            contact: ci,
            index_a,
            index_b,
            radius_a: fix_a.shape.radius(),
            radius_b: fix_b.shape.radius(),
        });
    }

    let mut solver = ContactSolver::new(config, step.dt_ratio, &inputs, contacts, &solver_bodies);
    if config.warm_starting {
        solver.warm_start(&mut solver_bodies);
    }
    for _ in 0..config.velocity_iterations {
        solver.solve_velocity_constraints(&mut solver_bodies);
    }
    solver.store_impulses(contacts);

    // Integrate positions, clamping large motions
    for sb in &mut solver_bodies[..member_count] {
        let translation = h * sb.v;
        if translation.length_squared() > config.max_translation * config.max_translation {
            sb.v *= config.max_translation / translation.length();
        }
        let rotation = h * sb.w;
        if rotation * rotation > config.max_rotation * config.max_rotation {
            sb.w *= config.max_rotation / rotation.abs();
        }
        sb.c += h * sb.v;
        sb.a += h * sb.w;
    }

    let mut position_solved = false;
    for _ in 0..config.position_iterations {
        if solver.solve_position_constraints(config, &mut solver_bodies) {
            position_solved = true;
            break;
        }
    }

    for &handle in &island.bodies {
        let (Some(&i), Some(body)) = (index_of.get(&handle), bodies.get_mut(handle)) else {
            continue;
        };
        let sb = &solver_bodies[i];
        body.sweep.c = sb.c;
        body.sweep.a = sb.a;
        body.linear_velocity = sb.v;
        body.angular_velocity = sb.w;
        body.synchronize_transform();
    }

    if !config.sleeping_enabled {
        return false;
    }

    let lin_tol_sqr = config.linear_sleep_tolerance * config.linear_sleep_tolerance;
    let ang_tol_sqr = config.angular_sleep_tolerance * config.angular_sleep_tolerance;
    let mut min_sleep_time = f32::MAX;
    for &handle in &island.bodies {
        let Some(body) = bodies.get_mut(handle) else {
            continue;
        };
        if advance_sleep_timer(body, h, lin_tol_sqr, ang_tol_sqr) {
            min_sleep_time = min_sleep_time.min(body.sleep_time);
        } else {
            min_sleep_time = 0.0;
        }
    }

    if min_sleep_time >= config.time_to_sleep && position_solved {
        for &handle in &island.bodies {
            if let Some(body) = bodies.get_mut(handle) {
                body.set_awake(false);
            }
        }
        log::debug!("Island of {} bodies fell asleep", island.bodies.len());
        return true;
    }
    false
}

/// Accumulate time below the sleep tolerances
///
/// Returns false and resets the timer when the body is pinned awake or moving.
pub(crate) fn advance_sleep_timer(body: &mut Body, h: f32, lin_tol_sqr: f32, ang_tol_sqr: f32) -> bool {
    if !body.sleeping_allowed
        || body.angular_velocity * body.angular_velocity > ang_tol_sqr
        || body.linear_velocity.length_squared() > lin_tol_sqr
    {
        body.sleep_time = 0.0;
        false
    } else {
        body.sleep_time += h;
        true
    }
}
