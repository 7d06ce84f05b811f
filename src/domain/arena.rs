// Static arena geometry and the fixed-step physics/collision engine.
//
// The engine only reports geometric contact; elimination policy lives with
// the caller, which applies removals through the registry.

use crate::domain::registry::EntityRegistry;
use crate::domain::state::{BallId, TankId};
use crate::domain::tuning::{ProjectileTuning, TankTuning};

pub const ARENA_WIDTH: f32 = 800.0;
pub const ARENA_HEIGHT: f32 = 600.0;
const WALL_THICKNESS: f32 = 20.0;

/// Tank spawn slots, indexed by join order.
const SPAWN_SLOTS: [(f32, f32); 4] = [
    (150.0, 150.0),
    (650.0, 150.0),
    (150.0, 450.0),
    (650.0, 450.0),
];

/// Axis-aligned wall rectangle. Immutable for the session lifetime.
#[derive(Debug, Clone, Copy)]
pub struct Wall {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Wall {
    const fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// Geometric contact between a projectile and a tank, reported per step.
#[derive(Debug, Clone, Copy)]
pub struct Contact {
    pub ball_id: BallId,
    pub tank_id: TankId,
}

/// Everything one `step` observed that the caller may want to act on.
#[derive(Default)]
pub struct StepEvents {
    pub hits: Vec<Contact>,
    /// Projectiles whose lifetime ran out or that escaped the playfield.
    pub expired: Vec<BallId>,
}

pub struct Arena {
    walls: Vec<Wall>,
    bounds: Wall,
    tank_tuning: TankTuning,
    projectile_tuning: ProjectileTuning,
}

impl Arena {
    pub fn new(tank_tuning: TankTuning, projectile_tuning: ProjectileTuning) -> Self {
        Self {
            walls: single_map(),
            bounds: Wall::new(0.0, 0.0, ARENA_WIDTH, ARENA_HEIGHT),
            tank_tuning,
            projectile_tuning,
        }
    }

    /// Spawn position for a tank joining while `existing` tanks are alive.
    pub fn spawn_slot(&self, existing: usize) -> (f32, f32) {
        SPAWN_SLOTS[existing % SPAWN_SLOTS.len()]
    }

    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    /// Spawns a projectile at the tank's muzzle point, launched along its
    /// facing at the tuned speed. Returns None when the tank is gone.
    pub fn fire(&self, registry: &mut EntityRegistry, tank_id: TankId) -> Option<BallId> {
        let tank = registry.tank(tank_id)?;
        let (dir_x, dir_y) = tank.facing();
        let muzzle = self.tank_tuning.radius + self.projectile_tuning.radius;
        let (x, y) = (tank.x + dir_x * muzzle, tank.y + dir_y * muzzle);
        let (vx, vy) = (
            dir_x * self.projectile_tuning.speed,
            dir_y * self.projectile_tuning.speed,
        );
        Some(registry.create_projectile(x, y, vx, vy, self.projectile_tuning.life_time))
    }

    /// Advances every projectile body by one fixed timestep, bouncing them
    /// elastically off walls, then reports tank contacts and expiries.
    /// Nothing is removed here.
    pub fn step(&self, registry: &mut EntityRegistry, dt: f32) -> StepEvents {
        let mut events = StepEvents::default();
        let ball_radius = self.projectile_tuning.radius;

        for ball in registry.projectiles_mut() {
            ball.x += ball.vx * dt;
            ball.y += ball.vy * dt;
            for wall in &self.walls {
                bounce(ball, wall, ball_radius);
            }
            ball.ttl -= dt;
            if ball.ttl <= 0.0 || !self.bounds.contains(ball.x, ball.y) {
                events.expired.push(ball.id);
            }
        }

        // Contact detection after integration (naive O(B*T); at most 4 tanks).
        let hit_radius = self.tank_tuning.radius + ball_radius;
        let hit_radius_sq = hit_radius * hit_radius;
        for ball in registry.projectiles() {
            for tank in registry.tanks() {
                let dx = tank.x - ball.x;
                let dy = tank.y - ball.y;
                if dx * dx + dy * dy <= hit_radius_sq {
                    events.hits.push(Contact {
                        ball_id: ball.id,
                        tank_id: tank.id,
                    });
                    break;
                }
            }
        }

        events
    }
}

/// Single built-in map: four boundary walls plus a central block.
fn single_map() -> Vec<Wall> {
    vec![
        Wall::new(0.0, 0.0, ARENA_WIDTH, WALL_THICKNESS),
        Wall::new(0.0, ARENA_HEIGHT - WALL_THICKNESS, ARENA_WIDTH, ARENA_HEIGHT),
        Wall::new(0.0, 0.0, WALL_THICKNESS, ARENA_HEIGHT),
        Wall::new(ARENA_WIDTH - WALL_THICKNESS, 0.0, ARENA_WIDTH, ARENA_HEIGHT),
        Wall::new(350.0, 250.0, 450.0, 350.0),
    ]
}

/// Elastic circle-vs-AABB response: reflect the velocity along the dominant
/// separation axis and push the body out of the wall.
fn bounce(ball: &mut crate::domain::state::Projectile, wall: &Wall, radius: f32) {
    let closest_x = ball.x.clamp(wall.min_x, wall.max_x);
    let closest_y = ball.y.clamp(wall.min_y, wall.max_y);
    let dx = ball.x - closest_x;
    let dy = ball.y - closest_y;
    if dx * dx + dy * dy >= radius * radius {
        return;
    }

    if dx == 0.0 && dy == 0.0 {
        // Center ended up inside the wall; reverse outright.
        ball.vx = -ball.vx;
        ball.vy = -ball.vy;
    } else if dx.abs() >= dy.abs() && dx != 0.0 {
        ball.vx = -ball.vx;
        ball.x = closest_x + radius * dx.signum();
    } else {
        ball.vy = -ball.vy;
        ball.y = closest_y + radius * dy.signum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::TankInput;

    fn arena() -> Arena {
        Arena::new(TankTuning::default(), ProjectileTuning::default())
    }

    fn registry_with_tank(id: u64, x: f32, y: f32) -> EntityRegistry {
        let mut reg = EntityRegistry::new();
        reg.create_tank(id, x, y).unwrap();
        reg
    }

    #[test]
    fn map_encloses_the_playfield_with_an_interior_obstacle() {
        let arena = arena();
        let walls = arena.walls();
        assert!(walls.iter().any(|w| w.min_y == 0.0 && w.max_y == WALL_THICKNESS));
        assert!(walls.iter().any(|w| w.min_y == ARENA_HEIGHT - WALL_THICKNESS));
        assert!(walls.iter().any(|w| w.min_x == 0.0 && w.max_x == WALL_THICKNESS));
        assert!(walls.iter().any(|w| w.min_x == ARENA_WIDTH - WALL_THICKNESS));
        // At least one obstacle clear of the boundary, and no wall covering
        // a spawn slot.
        assert!(walls.iter().any(|w| {
            w.min_x > WALL_THICKNESS && w.max_x < ARENA_WIDTH - WALL_THICKNESS
        }));
        for i in 0..4 {
            let (x, y) = arena.spawn_slot(i);
            assert!(!walls.iter().any(|w| w.contains(x, y)));
        }
    }

    #[test]
    fn fire_spawns_at_muzzle_along_facing() {
        let arena = arena();
        let mut reg = registry_with_tank(1, 400.0, 400.0);
        // Facing of rot=0 is (0, -1): straight up.
        let ball_id = arena.fire(&mut reg, 1).unwrap();
        let ball = reg.projectiles().find(|b| b.id == ball_id).unwrap();
        assert!((ball.x - 400.0).abs() < 1e-3);
        assert!(ball.y < 400.0);
        assert!(ball.vy < 0.0);
        assert_eq!(ball.vx, 0.0);
    }

    #[test]
    fn fire_for_missing_tank_is_none() {
        let arena = arena();
        let mut reg = EntityRegistry::new();
        assert!(arena.fire(&mut reg, 99).is_none());
    }

    #[test]
    fn projectiles_bounce_off_boundary_walls() {
        let arena = arena();
        let mut reg = EntityRegistry::new();
        // Heading straight at the left wall.
        reg.create_projectile(40.0, 300.0, -400.0, 0.0, 10.0);
        let dt = 1.0 / 30.0;
        for _ in 0..10 {
            arena.step(&mut reg, dt);
        }
        let ball = reg.projectiles().next().unwrap();
        assert!(ball.vx > 0.0, "velocity should have reflected");
        assert!(ball.x > WALL_THICKNESS);
    }

    #[test]
    fn contact_is_reported_but_nothing_removed() {
        let arena = arena();
        let mut reg = registry_with_tank(1, 400.0, 400.0);
        reg.create_projectile(400.0, 430.0, 0.0, -100.0, 10.0);
        let events = arena.step(&mut reg, 1.0 / 30.0);
        assert_eq!(events.hits.len(), 1);
        assert_eq!(events.hits[0].tank_id, 1);
        // Removal is the caller's decision.
        assert_eq!(reg.tank_count(), 1);
        assert_eq!(reg.projectile_count(), 1);
    }

    #[test]
    fn expired_lifetimes_are_reported() {
        let arena = arena();
        let mut reg = EntityRegistry::new();
        let id = reg.create_projectile(400.0, 400.0, 0.0, 0.0, 0.01);
        let events = arena.step(&mut reg, 1.0 / 30.0);
        assert_eq!(events.expired, vec![id]);
    }

    #[test]
    fn stepping_is_deterministic() {
        let run = || {
            let arena = arena();
            let mut reg = registry_with_tank(1, 150.0, 150.0);
            let dt = 1.0 / 30.0;
            for i in 0..120 {
                let beta = (i % 40) as f32;
                let fired = reg
                    .tank_mut(1)
                    .unwrap()
                    .apply_input(TankInput {
                        beta,
                        fire: i % 20 == 0,
                        ..Default::default()
                    });
                if fired {
                    arena.fire(&mut reg, 1);
                }
                arena.step(&mut reg, dt);
            }
            let tank = reg.tank(1).unwrap();
            let mut balls: Vec<_> = reg
                .projectiles()
                .map(|b| (b.id, b.x.to_bits(), b.y.to_bits()))
                .collect();
            balls.sort();
            (tank.rot.to_bits(), balls)
        };
        assert_eq!(run(), run());
    }
}
