// The authoritative per-party session actor.
//
// One task owns every piece of mutable session state: the connection set,
// the entity registry, the input buffer, and the arena. Connection tasks
// only parse and forward events, so no lock guards any of this. Each tick,
// strictly in order: drain pending events, apply buffered input, step the
// arena, resolve removals, push one snapshot to the display.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::domain::tuning::{ProjectileTuning, TankTuning};
use crate::domain::{Arena, EntityRegistry};
use crate::use_cases::input::InputBuffer;
use crate::use_cases::types::{Outbound, Role, SessionEvent, SessionState, WorldSnapshot};

#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    /// Fixed timestep for the game loop (~30 Hz).
    pub tick_interval: Duration,
    pub tank_tuning: TankTuning,
    pub projectile_tuning: ProjectileTuning,
}

struct Connection {
    outbound: mpsc::Sender<Outbound>,
    /// Assigned once on `init`, immutable afterwards.
    role: Option<Role>,
}

enum Flow {
    Continue,
    /// The display is gone; the whole session ends.
    Teardown,
}

pub async fn session_task(
    mut event_rx: mpsc::Receiver<SessionEvent>,
    session_state_tx: watch::Sender<SessionState>,
    settings: SessionSettings,
) {
    let arena = Arena::new(settings.tank_tuning, settings.projectile_tuning);
    let mut registry = EntityRegistry::new();
    let mut inputs = InputBuffer::new();
    let mut connections: HashMap<u64, Connection> = HashMap::new();
    let mut display: Option<u64> = None;
    let mut tick: u64 = 0;

    let dt = settings.tick_interval.as_secs_f32();
    let mut interval = tokio::time::interval(settings.tick_interval);

    'session: loop {
        interval.tick().await;

        // Drain everything that arrived since the last tick.
        loop {
            match event_rx.try_recv() {
                Ok(ev) => {
                    if let Flow::Teardown = handle_event(
                        ev,
                        &arena,
                        &mut registry,
                        &mut inputs,
                        &mut connections,
                        &mut display,
                    ) {
                        teardown(&mut connections, &mut registry, &mut inputs, &session_state_tx);
                        break 'session;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    // The party handle is gone; nothing can reach us anymore.
                    teardown(&mut connections, &mut registry, &mut inputs, &session_state_tx);
                    break 'session;
                }
            }
        }

        // Apply the staged input to live tanks. Entries whose tank is gone
        // are an expected race with elimination and are skipped.
        for (&tank_id, &input) in inputs.entries() {
            let fired = match registry.tank_mut(tank_id) {
                Some(tank) => tank.apply_input(input),
                None => continue,
            };
            if fired {
                if let Some(ball_id) = arena.fire(&mut registry, tank_id) {
                    debug!(tank_id, ball_id, "projectile fired");
                }
            }
        }

        // Step the world, then resolve removals before the tick ends so the
        // next snapshot can never contain a struck tank.
        let events = arena.step(&mut registry, dt);
        for hit in &events.hits {
            registry.remove_projectile(hit.ball_id);
            if registry.remove_tank(hit.tank_id).is_some() {
                inputs.remove(hit.tank_id);
                info!(tank_id = hit.tank_id, ball_id = hit.ball_id, "tank eliminated");
            }
        }
        for ball_id in events.expired {
            registry.remove_projectile(ball_id);
        }

        tick += 1;

        // Snapshot goes to the display only; skip the work when none is
        // live. try_send keeps the loop from ever waiting on the transport.
        if let Some(conn) = display.and_then(|id| connections.get(&id)) {
            let snapshot = WorldSnapshot {
                tick,
                tanks: registry.tanks().map(Into::into).collect(),
                balls: registry.projectiles().map(Into::into).collect(),
            };
            if conn.outbound.try_send(Outbound::Snapshot(snapshot)).is_err() {
                // Slow display; the next tick's snapshot supersedes this one.
                debug!(tick, "display outbound full; snapshot dropped");
            }
        }
    }
}

fn handle_event(
    ev: SessionEvent,
    arena: &Arena,
    registry: &mut EntityRegistry,
    inputs: &mut InputBuffer,
    connections: &mut HashMap<u64, Connection>,
    display: &mut Option<u64>,
) -> Flow {
    match ev {
        SessionEvent::Connect { conn_id, outbound } => {
            connections.insert(
                conn_id,
                Connection {
                    outbound,
                    role: None,
                },
            );
            Flow::Continue
        }
        SessionEvent::Join { conn_id } => {
            let Some(conn) = connections.get_mut(&conn_id) else {
                return Flow::Continue;
            };
            if conn.role.is_some() {
                warn!(conn_id, "duplicate init ignored");
                return Flow::Continue;
            }

            let role = if display.is_none() {
                *display = Some(conn_id);
                Role::Display
            } else {
                Role::Controller
            };

            if role == Role::Controller {
                let (x, y) = arena.spawn_slot(registry.tank_count());
                match registry.create_tank(conn_id, x, y) {
                    Ok(tank_id) => info!(conn_id, tank_id, "controller joined"),
                    // Unreachable while roles gate tank creation; keep the
                    // session alive regardless.
                    Err(e) => warn!(conn_id, error = ?e, "tank creation failed"),
                }
            } else {
                info!(conn_id, "display joined");
            }

            conn.role = Some(role);
            let _ = conn.outbound.try_send(Outbound::Welcome {
                actor: role,
                client_id: conn_id,
            });
            Flow::Continue
        }
        SessionEvent::Input {
            conn_id,
            tank_id,
            input,
        } => {
            if tank_id != conn_id {
                warn!(conn_id, tank_id, "input for a foreign tank dropped");
                return Flow::Continue;
            }
            let is_controller = connections
                .get(&conn_id)
                .is_some_and(|c| c.role == Some(Role::Controller));
            // Input for an eliminated tank is an expected race; drop it.
            if is_controller && registry.tank(tank_id).is_some() {
                inputs.set(tank_id, input);
            }
            Flow::Continue
        }
        SessionEvent::Disconnect { conn_id } => {
            let Some(conn) = connections.remove(&conn_id) else {
                return Flow::Continue;
            };
            match conn.role {
                Some(Role::Display) => {
                    info!(conn_id, "display disconnected");
                    Flow::Teardown
                }
                Some(Role::Controller) => {
                    registry.remove_tank(conn_id);
                    inputs.remove(conn_id);
                    info!(conn_id, "controller disconnected");
                    Flow::Continue
                }
                None => {
                    debug!(conn_id, "connection closed before init");
                    Flow::Continue
                }
            }
        }
    }
}

/// Full session teardown: notify everyone still connected, clear the world,
/// and flip the state watch so the party registry invalidates the code.
fn teardown(
    connections: &mut HashMap<u64, Connection>,
    registry: &mut EntityRegistry,
    inputs: &mut InputBuffer,
    session_state_tx: &watch::Sender<SessionState>,
) {
    for (_, conn) in connections.drain() {
        let _ = conn.outbound.try_send(Outbound::SessionEnded {
            reason: "display disconnected",
        });
    }
    registry.clear();
    inputs.clear();
    let _ = session_state_tx.send(SessionState::Closed);
    info!("session closed");
}
