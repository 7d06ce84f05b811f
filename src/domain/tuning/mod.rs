// Gameplay tuning, separate from runtime/server configuration.

pub mod projectile;
pub mod tank;

pub use projectile::ProjectileTuning;
pub use tank::TankTuning;
