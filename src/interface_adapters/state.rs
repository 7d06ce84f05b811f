use crate::interface_adapters::clients::directory::DirectoryClient;
use crate::use_cases::PartyRegistry;
use std::sync::Arc;

pub struct AppState {
    // Owns the set of active party session actors.
    pub party_registry: Arc<PartyRegistry>,
    // External party-code directory; absent in standalone deployments.
    pub directory: Option<Arc<DirectoryClient>>,
    // Base URL baked into the join link the display renders as a QR code.
    pub public_base_url: Arc<str>,
}
