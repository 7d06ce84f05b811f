// Wire protocol DTOs and conversions for the party game server.
//
// Closed tagged unions over the message kinds; unknown tags fail to parse at
// the boundary and are answered with an `err` reply instead of being routed.

use crate::domain::{BallSnapshot, TankInput, TankSnapshot};
use crate::use_cases::{Role, WorldSnapshot};
use serde::{Deserialize, Serialize};

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Welcome reply after role assignment.
    #[serde(rename = "wlcm")]
    Welcome(WelcomePayload),
    // Batched tank states for one tick; display only.
    #[serde(rename = "mov")]
    Mov(Vec<TankStateDto>),
    // Batched projectile states for one tick; display only.
    #[serde(rename = "ball")]
    Ball(Vec<BallStateDto>),
    #[serde(rename = "err")]
    Err(ErrorPayload),
    // Teardown notice sent to controllers when the display disconnects.
    #[serde(rename = "end")]
    End(EndPayload),
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    // Handshake: triggers role assignment.
    #[serde(rename = "init")]
    Init,
    // Orientation/fire sample sent by controllers after the welcome.
    #[serde(rename = "input")]
    Input(InputPayload),
    // Client-reported error; logged, never routed.
    #[serde(rename = "err")]
    Err(ErrorPayload),
}

/// Role names as the clients render them.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorDto {
    Display,
    Controller,
}

impl From<Role> for ActorDto {
    fn from(role: Role) -> Self {
        match role {
            Role::Display => ActorDto::Display,
            Role::Controller => ActorDto::Controller,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WelcomePayload {
    pub actor: ActorDto,
    #[serde(rename = "clientID")]
    pub client_id: String,
    /// Join URL for the display to render as a QR code; absent for
    /// controllers.
    pub qr: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputPayload {
    #[serde(rename = "tankID")]
    pub tank_id: String,
    pub input: TankInputDto,
}

/// Device-orientation angles plus the fire flag.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TankInputDto {
    #[serde(default)]
    pub a: f32,
    #[serde(default)]
    pub b: f32,
    #[serde(default)]
    pub g: f32,
    #[serde(default)]
    pub fire: bool,
}

impl From<TankInputDto> for TankInput {
    fn from(dto: TankInputDto) -> Self {
        Self {
            alpha: dto.a,
            beta: dto.b,
            gamma: dto.g,
            fire: dto.fire,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndPayload {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Vector2Dto {
    pub x: f32,
    pub y: f32,
}

/// Flattened tank state for wire transmission in `mov` batches.
#[derive(Debug, Clone, Serialize)]
pub struct TankStateDto {
    #[serde(rename = "tankID")]
    pub tank_id: String,
    pub shape: String,
    pub position: Vector2Dto,
    pub angle: f32,
}

impl From<&TankSnapshot> for TankStateDto {
    fn from(tank: &TankSnapshot) -> Self {
        Self {
            tank_id: tank.id.to_string(),
            shape: tank.shape.as_str().to_string(),
            position: Vector2Dto {
                x: tank.x,
                y: tank.y,
            },
            angle: tank.rot,
        }
    }
}

/// Flattened projectile state for wire transmission in `ball` batches.
#[derive(Debug, Clone, Serialize)]
pub struct BallStateDto {
    #[serde(rename = "ballID")]
    pub ball_id: String,
    pub position: Vector2Dto,
}

impl From<&BallSnapshot> for BallStateDto {
    fn from(ball: &BallSnapshot) -> Self {
        Self {
            ball_id: ball.id.to_string(),
            position: Vector2Dto {
                x: ball.x,
                y: ball.y,
            },
        }
    }
}

/// The two per-tick display messages built from one snapshot.
pub fn snapshot_messages(snapshot: &WorldSnapshot) -> (ServerMessage, ServerMessage) {
    (
        ServerMessage::Mov(snapshot.tanks.iter().map(TankStateDto::from).collect()),
        ServerMessage::Ball(snapshot.balls.iter().map(BallStateDto::from).collect()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_parses_without_payload() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"init"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Init));
    }

    #[test]
    fn input_parses_with_partial_angles() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"input","data":{"tankID":"42","input":{"b":15.5,"fire":true}}}"#,
        )
        .unwrap();
        let ClientMessage::Input(payload) = msg else {
            panic!("expected input");
        };
        assert_eq!(payload.tank_id, "42");
        let input: TankInput = payload.input.into();
        assert_eq!(input.beta, 15.5);
        assert_eq!(input.alpha, 0.0);
        assert!(input.fire);
    }

    #[test]
    fn unknown_tags_fail_to_parse() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"warp","data":{}}"#).is_err());
    }

    #[test]
    fn welcome_serializes_with_client_field_names() {
        let msg = ServerMessage::Welcome(WelcomePayload {
            actor: ActorDto::Display,
            client_id: "7".to_string(),
            qr: Some("http://example/ABCDEF".to_string()),
        });
        let txt = serde_json::to_string(&msg).unwrap();
        assert!(txt.contains(r#""type":"wlcm""#));
        assert!(txt.contains(r#""actor":"display""#));
        assert!(txt.contains(r#""clientID":"7""#));
    }
}
