use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use stealth_mode_rust_server::command::{parse_chat_line, parse_line};
use stealth_mode_rust_server::config_store::ConfigStore;
use stealth_mode_rust_server::constants::{TICK_MS, TICK_RATE};
use stealth_mode_rust_server::engine::{now_ms, StealthMode};
use stealth_mode_rust_server::registry::InMemoryRegistry;
use stealth_mode_rust_server::types::{
    Audience, GameEvent, ModeNotice, Participant, ParticipantId, TransmitList,
};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use tracing_subscriber::prelude::*;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

type SharedState = Arc<Mutex<ServerState>>;

#[derive(Clone)]
struct ClientContext {
    tx: mpsc::Sender<OutboundMessage>,
    participant: Option<ParticipantId>,
}

#[derive(Clone, Debug)]
enum OutboundMessage {
    Text(String),
    Close { code: u16, reason: String },
}

struct ServerState {
    clients: HashMap<String, ClientContext>,
    registry: InMemoryRegistry,
    mode: StealthMode,
    ticks: u64,
}

impl ServerState {
    fn new(mode: StealthMode) -> Self {
        Self {
            clients: HashMap::new(),
            registry: InMemoryRegistry::default(),
            mode,
            ticks: 0,
        }
    }
}

#[derive(Debug, PartialEq)]
enum ParsedClientMessage {
    Hello { participant: Option<ParticipantId> },
    Chat { text: String },
    Ping { t: f64 },
}

#[derive(Debug, Deserialize)]
struct CommandRequest {
    #[serde(default)]
    caller: Option<ParticipantId>,
    line: String,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_tracing();

    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);
    let seed = std::env::var("STEALTH_SEED")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or_else(now_ms);

    let store = ConfigStore::from_env();
    info!(path = %store.path().display(), "loading stealth config");
    let state = Arc::new(Mutex::new(ServerState::new(StealthMode::load(store, seed))));
    start_tick_loop(state.clone());

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/state", get(state_handler))
        .route("/api/roster", post(roster_handler))
        .route("/api/event", post(event_handler))
        .route("/api/command", post(command_handler))
        .route("/api/transmit", post(transmit_handler))
        .route("/ws", get(ws_handler))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    info!(port, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let guard = state.lock().await;
    if let Err(err) = guard.mode.save_config() {
        warn!(error = %err, "failed to save config on shutdown");
    }
    info!("server stopped");
    Ok(())
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn state_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let guard = state.lock().await;
    let snapshot = guard.mode.snapshot(&guard.registry, now_ms());
    Json(json!({
        "generatedAt": chrono::Utc::now().to_rfc3339(),
        "participants": guard.registry.len(),
        "mode": snapshot,
    }))
}

async fn roster_handler(
    State(state): State<SharedState>,
    Json(participants): Json<Vec<Participant>>,
) -> impl IntoResponse {
    let mut guard = state.lock().await;
    let count = participants.len();
    for participant in participants {
        guard.registry.upsert(participant);
    }
    debug!(count, total = guard.registry.len(), "roster updated");
    Json(json!({ "ok": true, "participants": guard.registry.len() }))
}

async fn event_handler(
    State(state): State<SharedState>,
    Json(event): Json<GameEvent>,
) -> impl IntoResponse {
    let mut guard = state.lock().await;
    let state = &mut *guard;
    if let GameEvent::PlayerDisconnect { participant } = &event {
        state.registry.remove(*participant);
    }
    state.mode.handle_event(&mut state.registry, &event, now_ms());
    Json(json!({ "ok": true }))
}

async fn command_handler(
    State(state): State<SharedState>,
    Json(request): Json<CommandRequest>,
) -> impl IntoResponse {
    let command = match parse_line(&request.line) {
        Some(Ok(command)) => command,
        Some(Err(err)) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "ok": false, "error": err.to_string() })),
            );
        }
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "ok": false, "error": "not a stealth command" })),
            );
        }
    };

    let mut guard = state.lock().await;
    let state = &mut *guard;
    match state
        .mode
        .execute(&mut state.registry, request.caller, command)
    {
        Ok(()) => (StatusCode::OK, Json(json!({ "ok": true }))),
        Err(err) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "ok": false, "error": err.to_string() })),
        ),
    }
}

async fn transmit_handler(
    State(state): State<SharedState>,
    Json(mut lists): Json<Vec<TransmitList>>,
) -> impl IntoResponse {
    let guard = state.lock().await;
    let filtered = guard
        .mode
        .filter_transmit(&guard.registry, &mut lists, now_ms());
    Json(json!({ "filtered": filtered, "lists": lists }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedState, socket: WebSocket) {
    let client_id = make_id("client");
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(256);

    {
        let mut guard = state.lock().await;
        guard.clients.insert(
            client_id.clone(),
            ClientContext {
                tx: tx.clone(),
                participant: None,
            },
        );
    }
    debug!(client = %client_id, "client connected");

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let should_close = matches!(outbound, OutboundMessage::Close { .. });
            let result = match outbound {
                OutboundMessage::Text(payload) => {
                    ws_sender.send(Message::Text(payload.into())).await
                }
                OutboundMessage::Close { code, reason } => {
                    let frame = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    ws_sender.send(Message::Close(Some(frame))).await
                }
            };
            if result.is_err() || should_close {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };

        match message {
            Message::Text(raw) => {
                handle_client_message(&state, &client_id, raw.as_str()).await;
            }
            Message::Binary(raw) => {
                if let Ok(text) = std::str::from_utf8(&raw) {
                    handle_client_message(&state, &client_id, text).await;
                } else {
                    send_error_to_client(&state, &client_id, "invalid utf8 message").await;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    state.lock().await.clients.remove(&client_id);
    debug!(client = %client_id, "client disconnected");
    drop(tx);
    let _ = writer.await;
}

async fn handle_client_message(state: &SharedState, client_id: &str, raw: &str) {
    let Some(message) = parse_client_message(raw) else {
        send_error_to_client(state, client_id, "invalid message").await;
        return;
    };

    let mut guard = state.lock().await;
    match message {
        ParsedClientMessage::Hello { participant } => {
            if let Some(client) = guard.clients.get_mut(client_id) {
                client.participant = participant;
            }
            let snapshot = guard.mode.snapshot(&guard.registry, now_ms());
            send_to_client(
                &mut guard,
                client_id,
                &json!({ "type": "welcome", "clientId": client_id, "mode": snapshot }),
            );
        }
        ParsedClientMessage::Chat { text } => {
            let caller = guard
                .clients
                .get(client_id)
                .and_then(|client| client.participant);
            match parse_chat_line(&text) {
                Some(Ok(command)) => {
                    let state = &mut *guard;
                    // Failures are queued as notices for the caller.
                    let _ = state.mode.execute(&mut state.registry, caller, command);
                }
                Some(Err(err)) => {
                    send_to_client(
                        &mut guard,
                        client_id,
                        &json!({ "type": "error", "message": err.to_string() }),
                    );
                }
                None => {}
            }
        }
        ParsedClientMessage::Ping { t } => {
            send_to_client(&mut guard, client_id, &json!({ "type": "pong", "t": t }));
        }
    }
}

fn start_tick_loop(state: SharedState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            tick(&mut guard);
        }
    });
}

fn tick(state: &mut ServerState) {
    state.ticks += 1;
    for notice in state.mode.drain_notices() {
        deliver_notice(state, &notice);
    }

    if state.ticks % u64::from(TICK_RATE) == 0 && !state.clients.is_empty() {
        let snapshot = state.mode.snapshot(&state.registry, now_ms());
        broadcast(state, &json!({ "type": "state", "mode": snapshot }));
    }
}

fn deliver_notice(state: &mut ServerState, notice: &ModeNotice) {
    let payload = json!({ "type": "notice", "message": notice.message });
    match notice.audience {
        Audience::All => {
            info!(message = %notice.message, "broadcast");
            broadcast(state, &payload);
        }
        Audience::Participant(id) => {
            let targets: Vec<String> = state
                .clients
                .iter()
                .filter(|(_, client)| client.participant == Some(id))
                .map(|(client_id, _)| client_id.clone())
                .collect();
            for client_id in targets {
                send_to_client(state, &client_id, &payload);
            }
        }
        Audience::Console => info!(message = %notice.message, "console reply"),
    }
}

fn send_to_client(state: &mut ServerState, client_id: &str, message: &Value) {
    let Some(client) = state.clients.get(client_id) else {
        return;
    };
    if client
        .tx
        .try_send(OutboundMessage::Text(message.to_string()))
        .is_err()
    {
        disconnect_client(state, client_id);
    }
}

fn broadcast(state: &mut ServerState, message: &Value) {
    let payload = message.to_string();
    let failed: Vec<String> = state
        .clients
        .iter()
        .filter(|(_, client)| {
            client
                .tx
                .try_send(OutboundMessage::Text(payload.clone()))
                .is_err()
        })
        .map(|(client_id, _)| client_id.clone())
        .collect();
    for client_id in failed {
        disconnect_client(state, &client_id);
    }
}

fn disconnect_client(state: &mut ServerState, client_id: &str) {
    if let Some(client) = state.clients.remove(client_id) {
        warn!(client = %client_id, "dropping slow client");
        let _ = client.tx.try_send(OutboundMessage::Close {
            code: 1013,
            reason: "send queue overflow".to_string(),
        });
    }
}

async fn send_error_to_client(state: &SharedState, client_id: &str, message: &str) {
    let mut guard = state.lock().await;
    send_to_client(
        &mut guard,
        client_id,
        &json!({ "type": "error", "message": message }),
    );
}

fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    match object.get("type")?.as_str()? {
        "hello" => {
            let participant = match object.get("participant") {
                None | Some(Value::Null) => None,
                Some(raw) => Some(ParticipantId(u32::try_from(raw.as_u64()?).ok()?)),
            };
            Some(ParsedClientMessage::Hello { participant })
        }
        "chat" => {
            let text = object.get("text")?.as_str()?.to_string();
            Some(ParsedClientMessage::Chat { text })
        }
        "ping" => {
            let t = object.get("t")?.as_f64()?;
            if !t.is_finite() {
                return None;
            }
            Some(ParsedClientMessage::Ping { t })
        }
        _ => None,
    }
}

fn make_id(prefix: &str) -> String {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{seq}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hello_with_and_without_participant() {
        assert_eq!(
            parse_client_message(r#"{"type":"hello","participant":4}"#),
            Some(ParsedClientMessage::Hello {
                participant: Some(ParticipantId(4))
            })
        );
        assert_eq!(
            parse_client_message(r#"{"type":"hello"}"#),
            Some(ParsedClientMessage::Hello { participant: None })
        );
        assert_eq!(
            parse_client_message(r#"{"type":"hello","participant":-1}"#),
            None
        );
    }

    #[test]
    fn parse_chat_requires_text() {
        assert_eq!(
            parse_client_message(r#"{"type":"chat","text":"!set bob"}"#),
            Some(ParsedClientMessage::Chat {
                text: "!set bob".to_string()
            })
        );
        assert_eq!(parse_client_message(r#"{"type":"chat"}"#), None);
    }

    #[test]
    fn parse_ping_requires_number() {
        assert_eq!(
            parse_client_message(r#"{"type":"ping","t":12.5}"#),
            Some(ParsedClientMessage::Ping { t: 12.5 })
        );
        assert_eq!(parse_client_message(r#"{"type":"ping","t":"x"}"#), None);
        assert_eq!(parse_client_message("not json"), None);
    }

    #[test]
    fn command_request_caller_is_optional() {
        let request: CommandRequest =
            serde_json::from_str(r#"{"line":"stealth_random"}"#).expect("parses");
        assert_eq!(request.caller, None);
        let request: CommandRequest =
            serde_json::from_str(r#"{"caller":3,"line":"!set @me"}"#).expect("parses");
        assert_eq!(request.caller, Some(ParticipantId(3)));
    }

    #[test]
    fn participant_notice_reaches_only_bound_clients() {
        let store = ConfigStore::new(std::env::temp_dir().join("stealth-server-test.json"));
        let mut state = ServerState::new(StealthMode::new(Default::default(), store, 1));
        let (bound_tx, mut bound_rx) = mpsc::channel(4);
        let (other_tx, mut other_rx) = mpsc::channel(4);
        state.clients.insert(
            "a".to_string(),
            ClientContext {
                tx: bound_tx,
                participant: Some(ParticipantId(2)),
            },
        );
        state.clients.insert(
            "b".to_string(),
            ClientContext {
                tx: other_tx,
                participant: None,
            },
        );

        deliver_notice(
            &mut state,
            &ModeNotice {
                audience: Audience::Participant(ParticipantId(2)),
                message: "hi".to_string(),
            },
        );
        assert!(matches!(bound_rx.try_recv(), Ok(OutboundMessage::Text(_))));
        assert!(other_rx.try_recv().is_err());
    }
}
