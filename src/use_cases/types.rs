// Use-case level inputs/outputs for the session actor.

use crate::domain::{BallSnapshot, TankId, TankInput, TankSnapshot};
use tokio::sync::mpsc;

/// Role a connection holds after its `init` handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Display,
    Controller,
}

/// Events flowing from connection tasks into a party's session actor.
#[derive(Debug)]
pub enum SessionEvent {
    /// A socket finished its upgrade and registered its outbound channel.
    Connect {
        conn_id: u64,
        outbound: mpsc::Sender<Outbound>,
    },
    /// The client sent `init`; the actor assigns a role and replies.
    Join { conn_id: u64 },
    /// A controller input sample, already sanitized at the boundary.
    Input {
        conn_id: u64,
        tank_id: TankId,
        input: TankInput,
    },
    /// The socket closed or errored.
    Disconnect { conn_id: u64 },
}

/// Frames the session actor pushes to one connection task.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// Welcome reply after role assignment.
    Welcome { actor: Role, client_id: u64 },
    /// Per-tick world snapshot; only ever sent to the display.
    Snapshot(WorldSnapshot),
    /// Teardown notice; the connection task closes the socket after it.
    SessionEnded { reason: &'static str },
}

/// State of everything the display needs to render, for one tick.
#[derive(Debug, Clone)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub tanks: Vec<TankSnapshot>,
    pub balls: Vec<BallSnapshot>,
}

/// Lifecycle of a party session, published on a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    /// Terminal: the display disconnected and the session tore down.
    Closed,
}
