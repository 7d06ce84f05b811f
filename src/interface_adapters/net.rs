use crate::domain::TankInput;
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::protocol::{
    ClientMessage,
    EndPayload,
    ErrorPayload,
    ServerMessage,
    WelcomePayload,
    snapshot_messages,
};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::rng::{party_code, rand_id};
use crate::use_cases::{Outbound, PartyError, PartyHandle, Role, SessionEvent, SessionState};

use futures_util::SinkExt;

use axum::{
    Error,
    extract::{
        Json,
        Query,
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    EventsClosed,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const OUTBOUND_CHANNEL_CAPACITY: usize = 64;
const CODE_ALLOC_ATTEMPTS: usize = 8;

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

#[derive(Debug, serde::Serialize)]
struct PartyCreateResponse {
    // The shareable code controllers and the display join with.
    code: String,
}

#[derive(Debug, serde::Deserialize)]
pub struct PartyQuery {
    // The party code the client wants to join.
    #[serde(default)]
    code: Option<String>,
}

pub async fn create_party_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    // Codes are short, so retry a few times on the unlikely collision.
    for _ in 0..CODE_ALLOC_ATTEMPTS {
        let code = party_code();
        match state
            .party_registry
            .create_party(rand_id().to_string(), code.clone())
            .await
        {
            Ok(party) => {
                spawn_teardown_watcher(state.clone(), party);
                return (StatusCode::CREATED, Json(PartyCreateResponse { code })).into_response();
            }
            Err(PartyError::CodeTaken) => continue,
        }
    }

    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse {
            error: "could not allocate a party code".to_string(),
        }),
    )
        .into_response()
}

/// Sweeps the party once its session reaches the terminal state: the code
/// mapping is dropped (new joins see "not found") and the external directory
/// is told to invalidate the code.
pub fn spawn_teardown_watcher(state: Arc<AppState>, party: PartyHandle) {
    let mut state_rx = party.session_state_tx.subscribe();
    tokio::spawn(async move {
        if state_rx
            .wait_for(|s| *s == SessionState::Closed)
            .await
            .is_err()
        {
            // All senders gone without a Closed: treat as closed anyway.
            warn!(code = %party.code, "session state channel dropped");
        }

        state.party_registry.remove_party(&party.code).await;
        info!(code = %party.code, "party removed");

        if let Some(directory) = &state.directory {
            if let Err(e) = directory.invalidate(&party.code).await {
                // Non-fatal: the in-process mapping is already gone.
                warn!(code = %party.code, error = ?e, "directory invalidation failed");
            }
        }
    });
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<PartyQuery>,
) -> impl IntoResponse {
    let Some(code) = query.code.filter(|c| !c.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "code is required".to_string(),
            }),
        )
            .into_response();
    };
    let code = code.trim().to_ascii_uppercase();

    let Some(party) = state.party_registry.get_party(&code).await else {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "party not found".to_string(),
            }),
        )
            .into_response();
    };

    // Capacity is enforced here, before the websocket handshake completes.
    if !party.try_reserve_slot() {
        return (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse {
                error: "the party is full".to_string(),
            }),
        )
            .into_response();
    }

    let join_url = format!("{}/{}", state.public_base_url, code);
    // A failed upgrade never reaches handle_socket; the reserved slot still
    // has to come back.
    let reserved = party.clone();
    ws.on_failed_upgrade(move |_| reserved.release_slot())
        .on_upgrade(move |socket| handle_socket(socket, party, join_url))
        .into_response()
}

struct ConnCtx {
    conn_id: u64,
    event_tx: mpsc::Sender<SessionEvent>,
    outbound_rx: mpsc::Receiver<Outbound>,
    join_url: String,
    // Learned when the welcome passes through on its way to the client.
    role: Option<Role>,

    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,

    invalid_json: u32,

    last_input_full_log: Instant,
    last_invalid_input_log: Instant,

    close_frame: Option<CloseFrame>,
}

async fn handle_socket(mut socket: WebSocket, party: PartyHandle, join_url: String) {
    let conn_id = rand_id();
    let span = info_span!("conn", conn_id, code = %party.code);

    async {
        let mut ctx = match bootstrap_connection(conn_id, &party, join_url).await {
            Ok(ctx) => ctx,
            Err(e) => {
                error!(error = ?e, "failed to register connection");
                let _ = socket
                    .send(Message::Close(Some(CloseFrame {
                        code: close_code::POLICY,
                        reason: "session unavailable".into(),
                    })))
                    .await;
                let _ = socket.close().await;
                party.release_slot();
                return;
            }
        };

        info!("client connected");

        if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
            warn!(error = ?e, "client loop exited with error");
        }

        disconnect_cleanup(&ctx).await;
        party.release_slot();
    }
    .instrument(span)
    .await
}

async fn bootstrap_connection(
    conn_id: u64,
    party: &PartyHandle,
    join_url: String,
) -> Result<ConnCtx, NetError> {
    let (outbound_tx, outbound_rx) = mpsc::channel::<Outbound>(OUTBOUND_CHANNEL_CAPACITY);

    // Register with the session actor before reading anything from the
    // socket, so a following `init` always finds the connection tracked.
    party
        .event_tx
        .send(SessionEvent::Connect {
            conn_id,
            outbound: outbound_tx,
        })
        .await
        .map_err(|_| NetError::EventsClosed)?;

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        conn_id,
        event_tx: party.event_tx.clone(),
        outbound_rx,
        join_url,
        role: None,

        msgs_in: 0,
        msgs_out: 0,
        bytes_in: 0,
        bytes_out: 0,

        invalid_json: 0,

        last_input_full_log: now,
        last_invalid_input_log: now,

        close_frame: None,
    })
}

enum LoopControl {
    Continue,
    Disconnect,
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let conn_id = ctx.conn_id;

    // Split borrows so `tokio::select!` can hold them concurrently.
    let ConnCtx {
        event_tx,
        outbound_rx,
        join_url,
        role,
        msgs_in,
        msgs_out,
        bytes_in,
        bytes_out,
        invalid_json,
        last_input_full_log,
        last_invalid_input_log,
        close_frame,
        ..
    } = ctx;

    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            // Incoming Message from Client
            incoming = socket.recv() => {
                match handle_incoming_ws(
                    socket,
                    incoming,
                    conn_id,
                    event_tx,
                    *role,
                    msgs_in,
                    bytes_in,
                    invalid_json,
                    last_input_full_log,
                    last_invalid_input_log,
                    close_frame,
                ).await {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing frame from the session actor
            out = outbound_rx.recv() => {
                match out {
                    Some(frame) => match forward_outbound(
                        frame,
                        socket,
                        conn_id,
                        join_url,
                        role,
                        msgs_out,
                        bytes_out,
                        close_frame,
                    ).await {
                        Ok(LoopControl::Continue) => false,
                        Ok(LoopControl::Disconnect) => true,
                        Err(e) => {
                            fatal = Some(e);
                            true
                        }
                    },
                    None => {
                        // The session actor is gone; nothing more will arrive.
                        warn!(conn_id, "session channel closed; disconnecting");
                        true
                    }
                }
            }
        };

        if disconnect {
            // Best effort; the peer may already be gone.
            if let Err(err) = socket.send(Message::Close(close_frame.take())).await {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Some(err) = fatal { Err(err) } else { Ok(()) }
}

fn sanitize_input(input: TankInput) -> Option<TankInput> {
    if !input.alpha.is_finite() || !input.beta.is_finite() || !input.gamma.is_finite() {
        return None;
    }
    Some(input)
}

#[allow(clippy::too_many_arguments)]
async fn handle_incoming_ws(
    socket: &mut WebSocket,
    incoming: Option<Result<Message, Error>>,
    conn_id: u64,
    event_tx: &mpsc::Sender<SessionEvent>,
    role: Option<Role>,
    msgs_in: &mut u64,
    bytes_in: &mut u64,
    invalid_json: &mut u32,
    last_input_full_log: &mut Instant,
    last_invalid_input_log: &mut Instant,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                *msgs_in += 1;
                *bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Init) => {
                        // Role assignment happens in the session actor; the
                        // welcome comes back through the outbound channel.
                        event_tx
                            .send(SessionEvent::Join { conn_id })
                            .await
                            .map_err(|_| NetError::EventsClosed)?;
                        Ok(LoopControl::Continue)
                    }
                    Ok(ClientMessage::Input(payload)) => {
                        if role != Some(Role::Controller) {
                            // Input before the welcome, or from the display.
                            if should_log(last_invalid_input_log) {
                                warn!(conn_id, "input from a non-controller ignored");
                            }
                            return Ok(LoopControl::Continue);
                        }

                        let Ok(tank_id) = payload.tank_id.parse::<u64>() else {
                            if should_log(last_invalid_input_log) {
                                warn!(conn_id, tank_id = %payload.tank_id, "unparseable tankID");
                            }
                            let _ = send_message(
                                socket,
                                &ServerMessage::Err(ErrorPayload {
                                    error: "invalid tankID".to_string(),
                                }),
                            )
                            .await;
                            return Ok(LoopControl::Continue);
                        };

                        let Some(input) = sanitize_input(payload.input.into()) else {
                            if should_log(last_invalid_input_log) {
                                warn!(conn_id, "invalid input values (NaN/inf); dropping");
                            }
                            return Ok(LoopControl::Continue);
                        };

                        match event_tx.try_send(SessionEvent::Input {
                            conn_id,
                            tank_id,
                            input,
                        }) {
                            Ok(()) => Ok(LoopControl::Continue),
                            Err(mpsc::error::TrySendError::Full(_evt)) => {
                                if should_log(last_input_full_log) {
                                    warn!(conn_id, "event channel full; dropping input");
                                }
                                Ok(LoopControl::Continue)
                            }
                            Err(mpsc::error::TrySendError::Closed(_evt)) => {
                                Err(NetError::EventsClosed)
                            }
                        }
                    }
                    Ok(ClientMessage::Err(payload)) => {
                        // Client-side errors are logged, never routed further.
                        warn!(conn_id, error = %payload.error, "client reported error");
                        Ok(LoopControl::Continue)
                    }
                    Err(parse_err) => {
                        *invalid_json += 1;
                        if should_log(last_invalid_input_log) {
                            warn!(
                                conn_id,
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        let _ = send_message(
                            socket,
                            &ServerMessage::Err(ErrorPayload {
                                error: "malformed message".to_string(),
                            }),
                        )
                        .await;

                        if *invalid_json > MAX_INVALID_JSON {
                            *close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }

                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                *close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(conn_id, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(conn_id, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn forward_outbound(
    out: Outbound,
    socket: &mut WebSocket,
    conn_id: u64,
    join_url: &str,
    role: &mut Option<Role>,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    match out {
        Outbound::Welcome { actor, client_id } => {
            *role = Some(actor);
            // The display gets the join URL to render as a QR code.
            let qr = (actor == Role::Display).then(|| join_url.to_string());
            let msg = ServerMessage::Welcome(WelcomePayload {
                actor: actor.into(),
                client_id: client_id.to_string(),
                qr,
            });
            let bytes = send_message(socket, &msg).await?;
            *msgs_out += 1;
            *bytes_out += bytes as u64;
            Ok(LoopControl::Continue)
        }
        Outbound::Snapshot(snapshot) => {
            let (mov, ball) = snapshot_messages(&snapshot);
            for msg in [mov, ball] {
                let bytes = send_message(socket, &msg).await?;
                *msgs_out += 1;
                *bytes_out += bytes as u64;
            }
            Ok(LoopControl::Continue)
        }
        Outbound::SessionEnded { reason } => {
            info!(conn_id, reason, "session ended; disconnecting client");
            let msg = ServerMessage::End(EndPayload {
                reason: reason.to_string(),
            });
            let bytes = send_message(socket, &msg).await?;
            *msgs_out += 1;
            *bytes_out += bytes as u64;
            *close_frame = Some(CloseFrame {
                code: close_code::NORMAL,
                reason: "session ended".into(),
            });
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn disconnect_cleanup(ctx: &ConnCtx) {
    // Best effort: on teardown the session actor may already be gone.
    if ctx
        .event_tx
        .send(SessionEvent::Disconnect {
            conn_id: ctx.conn_id,
        })
        .await
        .is_err()
    {
        debug!(conn_id = ctx.conn_id, "session already closed");
    }

    debug!(
        conn_id = ctx.conn_id,
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        invalid_json = ctx.invalid_json,
        "connection stats"
    );
    info!(conn_id = ctx.conn_id, "client disconnected");
}
