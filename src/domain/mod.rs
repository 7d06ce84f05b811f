// Domain layer: core simulation types and rules.

pub mod arena;
pub mod registry;
pub mod state;
pub mod tuning;

pub use arena::{Arena, Contact, StepEvents};
pub use registry::{EntityRegistry, RegistryError};
pub use state::{BallId, BallSnapshot, Projectile, Shape, Tank, TankId, TankInput, TankSnapshot};
