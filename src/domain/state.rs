// Domain-level simulation bodies and input/snapshot types.

use std::f32::consts::PI;

/// Tank identifiers are the owning connection's id, so a controller can key
/// its input messages by the client id it received in the welcome reply.
pub type TankId = u64;
pub type BallId = u64;

/// One device-orientation sample plus the fire flag, as reported by a
/// controller. Angles are in degrees, straight off the device API.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TankInput {
    pub alpha: f32,
    pub beta: f32,
    pub gamma: f32,
    pub fire: bool,
}

/// Visual shape variant, assigned by join order and cycled once all four are
/// taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Square,
    Pentagon,
    Decagon,
    Circle,
}

impl Shape {
    /// Shape for a tank joining while `existing` tanks are already alive.
    pub fn for_join_order(existing: usize) -> Self {
        match existing % 4 {
            0 => Shape::Square,
            1 => Shape::Pentagon,
            2 => Shape::Decagon,
            _ => Shape::Circle,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Shape::Square => "square",
            Shape::Pentagon => "pentagon",
            Shape::Decagon => "decagon",
            Shape::Circle => "circle",
        }
    }
}

pub struct Tank {
    pub id: TankId,
    pub x: f32,
    pub y: f32,
    /// Facing in radians. Driven by deltas between orientation samples, so
    /// absolute azimuth drifts; only relative turning matters for gameplay.
    pub rot: f32,
    pub shape: Shape,
    /// Last applied sample. Rotation deltas and the fire edge are computed
    /// against it.
    pub last_input: TankInput,
}

impl Tank {
    /// Applies an orientation sample, rotating by the beta delta against the
    /// previous sample scaled to radians. Returns true when the fire flag
    /// transitioned false -> true; held fire does not re-trigger.
    pub fn apply_input(&mut self, input: TankInput) -> bool {
        let fired = input.fire && !self.last_input.fire;
        self.rot += (input.beta - self.last_input.beta) * (PI / 180.0);
        self.last_input = input;
        fired
    }

    /// Forward unit vector for the current facing.
    pub fn facing(&self) -> (f32, f32) {
        (self.rot.sin(), -self.rot.cos())
    }
}

pub struct Projectile {
    pub id: BallId,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// Seconds of life left before the body is reported expired.
    pub ttl: f32,
}

#[derive(Debug, Clone)]
pub struct TankSnapshot {
    pub id: TankId,
    pub shape: Shape,
    pub x: f32,
    pub y: f32,
    pub rot: f32,
}

#[derive(Debug, Clone)]
pub struct BallSnapshot {
    pub id: BallId,
    pub x: f32,
    pub y: f32,
}

impl From<&Tank> for TankSnapshot {
    fn from(t: &Tank) -> Self {
        Self {
            id: t.id,
            shape: t.shape,
            x: t.x,
            y: t.y,
            rot: t.rot,
        }
    }
}

impl From<&Projectile> for BallSnapshot {
    fn from(p: &Projectile) -> Self {
        Self {
            id: p.id,
            x: p.x,
            y: p.y,
        }
    }
}
