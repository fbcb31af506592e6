//! WebSocket upgrade handling, command dispatch and the idle watchdog (§4.5).

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::stream::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::controller::Controller;
use crate::gateway::sink::WebSocketSink;
use crate::gateway::subscriber::{parse_liveview_start, protocol_message, CommandMessage, CMD_LIVEVIEW_START, CMD_LIVEVIEW_STOP};
use crate::gateway::AppState;

const IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(1);
const IDLE_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn ws_handler(State(state): State<AppState>, headers: HeaderMap, ws: WebSocketUpgrade) -> Response {
    let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());
    if !state.config.origins.allows(origin) {
        return (StatusCode::FORBIDDEN, "origin not allowed").into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Everything a single WebSocket connection's lifetime needs: at most one
/// active controller, its cancellation trigger and its join handle.
struct ActiveSession {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (sender, mut receiver) = socket.split();
    let sink = WebSocketSink::new(Arc::new(Mutex::new(sender)));
    let controller = Controller::new(state.rest.clone());

    // Every controller this subscriber ever spawns descends from the
    // process-wide shutdown token, so cancelling that token on SIGINT tears
    // down in-flight streams instead of only stopping new upgrades (§4.5).
    let subscriber_token = state.shutdown.child_token();

    let mut last_activity = Instant::now();
    let mut active: Option<ActiveSession> = None;

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        last_activity = Instant::now();
                        if !dispatch(&text, &controller, &sink, &mut active, &subscriber_token).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
            _ = tokio::time::sleep(IDLE_CHECK_INTERVAL) => {
                let controller_active = active.as_ref().map(|a| !a.task.is_finished()).unwrap_or(false);
                if !controller_active && last_activity.elapsed() >= IDLE_TIMEOUT {
                    info!("subscriber idle for 10s with no active controller, closing");
                    break;
                }
            }
            _ = subscriber_token.cancelled(), if active.is_none() => {
                info!("shutdown requested, closing idle subscriber");
                break;
            }
        }
    }

    if let Some(session) = active.take() {
        session.cancel.cancel();
        let _ = session.task.await;
    }
}

/// Parses and applies one inbound command. Returns `false` when the
/// subscriber should be closed (malformed frame, unknown command, or a
/// recognized command used outside its valid state).
async fn dispatch(
    text: &str,
    controller: &Controller,
    sink: &WebSocketSink,
    active: &mut Option<ActiveSession>,
    subscriber_token: &CancellationToken,
) -> bool {
    let command = match serde_json::from_str::<CommandMessage>(text) {
        Ok(cmd) => cmd,
        Err(err) => {
            warn!(%err, "malformed subscriber command");
            return false;
        }
    };

    match command.command.as_str() {
        CMD_LIVEVIEW_START => {
            if active.is_some() {
                warn!("liveview:start received while a controller is already active");
                return false;
            }
            let request = match parse_liveview_start(&command.data) {
                Ok(request) => request,
                Err(err) => {
                    warn!(%err, "invalid liveview:start payload");
                    return false;
                }
            };

            let cancel = subscriber_token.child_token();
            let mut stream_sink = sink.clone();
            let controller = controller.clone();
            let task_cancel = cancel.clone();
            let task = tokio::spawn(async move {
                if let Err(err) = controller.run(request, &mut stream_sink, task_cancel).await {
                    warn!(%err, "controller exited");
                }
            });
            *active = Some(ActiveSession { cancel, task });

            let _ = sink
                .send_text(protocol_message(CMD_LIVEVIEW_START, "Liveview started"))
                .await;
        }
        CMD_LIVEVIEW_STOP => {
            let session = match active.take() {
                Some(session) => session,
                None => {
                    warn!("liveview:stop received with no active controller");
                    return false;
                }
            };
            session.cancel.cancel();
            let _ = session.task.await;
            let _ = sink
                .send_text(protocol_message(CMD_LIVEVIEW_STOP, "Liveview stopped"))
                .await;
        }
        other => {
            warn!(command = other, "unknown subscriber command");
            return false;
        }
    }

    true
}
