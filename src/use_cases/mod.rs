// Use cases layer: application workflows for the party server.

pub mod input;
pub mod party;
pub mod session;
pub mod types;

pub use input::InputBuffer;
pub use party::{PartyError, PartyHandle, PartyRegistry, PartySettings};
pub use session::{SessionSettings, session_task};
pub use types::{Outbound, Role, SessionEvent, SessionState, WorldSnapshot};
