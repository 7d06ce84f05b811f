// Party orchestration: code lookup, session spawning, teardown cleanup.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{RwLock, mpsc, watch};
use tracing::info;

use crate::use_cases::session::{SessionSettings, session_task};
use crate::use_cases::types::{SessionEvent, SessionState};

/// Errors returned by party registry operations.
#[derive(Debug, PartialEq, Eq)]
pub enum PartyError {
    /// A party already holds this code.
    CodeTaken,
}

/// Shared configuration for spawning party sessions.
#[derive(Debug, Clone, Copy)]
pub struct PartySettings {
    /// Capacity for inbound session events.
    pub event_channel_capacity: usize,
    /// Hard cap on concurrent connections per party (display included).
    pub max_connections: usize,
    /// Fixed tick settings handed to each session actor.
    pub session: SessionSettings,
}

/// Per-party channels and capacity accounting.
#[derive(Clone)]
pub struct PartyHandle {
    /// Durable identifier for the session.
    pub party_id: Arc<str>,
    /// Human-shareable code clients use to target this party.
    pub code: Arc<str>,
    /// Sender for events into the party's session actor.
    pub event_tx: mpsc::Sender<SessionEvent>,
    /// Watch sender holding the session lifecycle state.
    pub session_state_tx: watch::Sender<SessionState>,
    /// Live connection count, for the pre-handshake capacity check.
    connections: Arc<AtomicUsize>,
    max_connections: usize,
}

impl PartyHandle {
    /// Reserves a connection slot, failing once the party is full. Must be
    /// paired with `release_slot` on every connection exit path.
    pub fn try_reserve_slot(&self) -> bool {
        self.connections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.max_connections).then_some(n + 1)
            })
            .is_ok()
    }

    pub fn release_slot(&self) {
        let _ = self
            .connections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    pub fn is_closed(&self) -> bool {
        *self.session_state_tx.borrow() == SessionState::Closed
    }
}

/// Thread-safe registry mapping party codes to live sessions. This is the
/// lookup store the shareable code resolves through; dropping an entry is
/// what makes a code dead for new joins.
pub struct PartyRegistry {
    settings: PartySettings,
    parties: RwLock<HashMap<String, PartyHandle>>,
}

impl PartyRegistry {
    pub fn new(settings: PartySettings) -> Self {
        Self {
            settings,
            parties: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a new party under the given code and spawns its session
    /// actor. Codes are caller-generated; collisions are rejected so the
    /// caller can retry with a fresh one.
    pub async fn create_party(
        &self,
        party_id: String,
        code: String,
    ) -> Result<PartyHandle, PartyError> {
        let mut parties = self.parties.write().await;
        if parties.contains_key(&code) {
            return Err(PartyError::CodeTaken);
        }

        let (event_tx, event_rx) =
            mpsc::channel::<SessionEvent>(self.settings.event_channel_capacity);
        let (session_state_tx, _session_state_rx) = watch::channel(SessionState::Open);

        // Spawn the authoritative session loop for this party.
        tokio::spawn(session_task(
            event_rx,
            session_state_tx.clone(),
            self.settings.session,
        ));

        let party = PartyHandle {
            party_id: Arc::from(party_id.as_str()),
            code: Arc::from(code.as_str()),
            event_tx,
            session_state_tx,
            connections: Arc::new(AtomicUsize::new(0)),
            max_connections: self.settings.max_connections,
        };

        parties.insert(code, party.clone());
        info!(party_id = %party.party_id, code = %party.code, "party created");
        Ok(party)
    }

    /// Returns a live party for the provided code. Closed parties are
    /// unreachable even if the watcher has not swept them yet.
    pub async fn get_party(&self, code: &str) -> Option<PartyHandle> {
        let parties = self.parties.read().await;
        parties.get(code).filter(|p| !p.is_closed()).cloned()
    }

    /// Drops the code mapping; subsequent joins see "not found".
    pub async fn remove_party(&self, code: &str) -> Option<PartyHandle> {
        let mut parties = self.parties.write().await;
        parties.remove(code)
    }

    pub async fn party_count(&self) -> usize {
        self.parties.read().await.len()
    }
}
