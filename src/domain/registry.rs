// Entity registry: the ownership boundary between connection identity and
// simulated bodies.
//
// The registry owns the bodies themselves, so removing a registry entry and
// removing the physics body are the same mutation. Tank ids double as the
// owning connection's id (one tank per connection, exclusive); projectile ids
// come from a monotonic allocator and are never reused within a session.

use std::collections::HashMap;

use crate::domain::state::{BallId, Projectile, Shape, Tank, TankId, TankInput};

#[derive(Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// The connection already owns a live tank.
    TankExists,
}

#[derive(Default)]
pub struct EntityRegistry {
    tanks: HashMap<TankId, Tank>,
    projectiles: HashMap<BallId, Projectile>,
    next_ball_id: u64,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            tanks: HashMap::new(),
            projectiles: HashMap::new(),
            next_ball_id: 1,
        }
    }

    /// Creates a tank owned by `conn_id` at the given spawn position. The
    /// shape variant is assigned from how many tanks already exist.
    pub fn create_tank(&mut self, conn_id: u64, x: f32, y: f32) -> Result<TankId, RegistryError> {
        if self.tanks.contains_key(&conn_id) {
            return Err(RegistryError::TankExists);
        }
        let shape = Shape::for_join_order(self.tanks.len());
        self.tanks.insert(
            conn_id,
            Tank {
                id: conn_id,
                x,
                y,
                rot: 0.0,
                shape,
                last_input: TankInput::default(),
            },
        );
        Ok(conn_id)
    }

    pub fn remove_tank(&mut self, tank_id: TankId) -> Option<Tank> {
        self.tanks.remove(&tank_id)
    }

    pub fn tank(&self, tank_id: TankId) -> Option<&Tank> {
        self.tanks.get(&tank_id)
    }

    pub fn tank_mut(&mut self, tank_id: TankId) -> Option<&mut Tank> {
        self.tanks.get_mut(&tank_id)
    }

    pub fn create_projectile(&mut self, x: f32, y: f32, vx: f32, vy: f32, ttl: f32) -> BallId {
        let id = self.next_ball_id;
        self.next_ball_id = self.next_ball_id.wrapping_add(1);
        self.projectiles.insert(id, Projectile { id, x, y, vx, vy, ttl });
        id
    }

    pub fn remove_projectile(&mut self, ball_id: BallId) -> Option<Projectile> {
        self.projectiles.remove(&ball_id)
    }

    pub fn tanks(&self) -> impl Iterator<Item = &Tank> {
        self.tanks.values()
    }

    pub fn projectiles(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.values()
    }

    pub fn projectiles_mut(&mut self) -> impl Iterator<Item = &mut Projectile> {
        self.projectiles.values_mut()
    }

    pub fn tank_count(&self) -> usize {
        self.tanks.len()
    }

    pub fn projectile_count(&self) -> usize {
        self.projectiles.len()
    }

    /// Drops every body at once. Used on session teardown.
    pub fn clear(&mut self) {
        self.tanks.clear();
        self.projectiles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_tank_per_connection() {
        let mut reg = EntityRegistry::new();
        assert_eq!(reg.create_tank(7, 0.0, 0.0), Ok(7));
        assert_eq!(reg.create_tank(7, 0.0, 0.0), Err(RegistryError::TankExists));
        assert_eq!(reg.tank_count(), 1);
    }

    #[test]
    fn shapes_assigned_by_existing_count() {
        let mut reg = EntityRegistry::new();
        reg.create_tank(1, 0.0, 0.0).unwrap();
        reg.create_tank(2, 0.0, 0.0).unwrap();
        assert_eq!(reg.tank(1).unwrap().shape, Shape::Square);
        assert_eq!(reg.tank(2).unwrap().shape, Shape::Pentagon);
    }

    #[test]
    fn projectile_ids_are_never_reused() {
        let mut reg = EntityRegistry::new();
        let a = reg.create_projectile(0.0, 0.0, 1.0, 0.0, 1.0);
        reg.remove_projectile(a);
        let b = reg.create_projectile(0.0, 0.0, 1.0, 0.0, 1.0);
        assert_ne!(a, b);
    }

    #[test]
    fn clear_removes_everything() {
        let mut reg = EntityRegistry::new();
        reg.create_tank(1, 0.0, 0.0).unwrap();
        reg.create_projectile(0.0, 0.0, 1.0, 0.0, 1.0);
        reg.clear();
        assert_eq!(reg.tank_count(), 0);
        assert_eq!(reg.projectile_count(), 0);
    }
}
