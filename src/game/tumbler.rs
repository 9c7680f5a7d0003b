// Box-stack scene: edge ground plus columns of falling boxes

use glam::Vec2;

use crate::engine::physics::{
    BodyDef, BodyHandle, FixtureDef, PhysicsResult, PhysicsWorld,
};

/// Column positions, filled left to right as `columns` grows
pub const COLUMN_XS: [f32; 5] = [0.0, -10.0, -5.0, 5.0, 10.0];

/// Layer and mask shared by every fixture in the scene
pub const SCENE_LAYER: u32 = 2;

/// Shape of the stack to build
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TumblerConfig {
    /// Number of box columns (1..=5)
    pub columns: usize,
    /// Boxes per column
    pub rows: usize,
    /// Keep every box awake for the whole run
    ///
    /// Off by default so the stack can settle and sleep. The classic
    /// box-stack benchmark pins every box, pass `--pin-awake` to the
    /// binary to measure that workload.
    pub pin_awake: bool,
}

impl Default for TumblerConfig {
    fn default() -> Self {
        Self {
            columns: 1,
            rows: 15,
            pin_awake: false,
        }
    }
}

/// Handles to the bodies that make up a built scene
#[derive(Debug, Clone)]
pub struct Tumbler {
    pub ground: BodyHandle,
    /// Boxes column by column, bottom to top
    pub boxes: Vec<BodyHandle>,
}

impl Tumbler {
    /// Populate `world` with the ground and box columns
    ///
    /// Body state changes are queued, so the first step applies them.
    pub fn build(world: &mut PhysicsWorld, config: TumblerConfig) -> PhysicsResult<Self> {
        let columns = config.columns.min(COLUMN_XS.len());

        let ground = world.create_body(BodyDef::new_static())?;
        world.create_fixture(
            ground,
            "fix1",
            FixtureDef::edge(Vec2::new(-40.0, 0.0), Vec2::new(40.0, 0.0))?
                .layer_mask(SCENE_LAYER, SCENE_LAYER),
        )?;
        world.create_fixture(
            ground,
            "fix2",
            FixtureDef::edge(Vec2::new(10.0, 0.0), Vec2::new(10.0, 10.0))?
                .layer_mask(SCENE_LAYER, SCENE_LAYER),
        )?;

        let mut boxes = Vec::with_capacity(columns * config.rows);
        for &x in &COLUMN_XS[..columns] {
            for i in 0..config.rows {
                let y = 0.55 + 1.1 * i as f32;
                let body = world.create_body(BodyDef::new_dynamic().position(x, y))?;
                world.set_fixed_rotation(body, false)?;
                world.create_fixture(
                    body,
                    "fix1",
                    FixtureDef::box_shape(0.5, 0.5)?.layer_mask(SCENE_LAYER, SCENE_LAYER),
                )?;
                world.wake_body(body)?;
                if config.pin_awake {
                    world.set_sleeping_allowed(body, false)?;
                }
                boxes.push(body);
            }
        }

        world.wake_body(ground)?;

        log::info!(
            "Built tumbler: {} columns x {} rows ({} boxes)",
            columns,
            config.rows,
            boxes.len()
        );

        Ok(Self { ground, boxes })
    }

    /// Step `ticks` times with a fixed `dt`
    pub fn run(world: &mut PhysicsWorld, ticks: usize, dt: f32) -> PhysicsResult<()> {
        for _ in 0..ticks {
            world.step(dt, false)?;
        }
        Ok(())
    }

    pub fn sleeping_boxes(&self, world: &PhysicsWorld) -> usize {
        self.boxes
            .iter()
            .filter(|b| world.body(**b).is_some_and(|body| !body.is_awake()))
            .count()
    }

    /// Total kinetic energy of the boxes
    pub fn kinetic_energy(&self, world: &PhysicsWorld) -> f32 {
        self.boxes
            .iter()
            .filter_map(|b| world.body(*b))
            .map(|body| {
                0.5 * body.mass() * body.linear_velocity().length_squared()
                    + 0.5 * body.inertia() * body.angular_velocity() * body.angular_velocity()
            })
            .sum()
    }

    /// Lowest box centre, used to detect tunneling through the ground
    pub fn lowest_box(&self, world: &PhysicsWorld) -> f32 {
        self.boxes
            .iter()
            .filter_map(|b| world.body(*b))
            .map(|body| body.position().y)
            .fold(f32::INFINITY, f32::min)
    }
}
