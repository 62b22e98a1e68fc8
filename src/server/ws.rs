use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::IntoResponse;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::Rejection;
use crate::server::AppState;
use crate::session::{Session, Step};

type WsSink = SplitSink<WebSocket, Message>;
type WsStream = SplitStream<WebSocket>;

/// HTTP handler that upgrades the connection to WebSocket.
pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, addr, state))
}

enum Inbound {
    Submission(String),
    Rejected(Rejection),
    Closed { clean: bool },
    Shutdown,
}

/// Drive one worker connection: send a job, wait for the submission,
/// repeat. Any failure ends the loop; dropping the session requeues the
/// job it still holds.
async fn handle_socket(socket: WebSocket, addr: SocketAddr, state: AppState) {
    let conn_id = uuid::Uuid::new_v4();
    let worker = addr.to_string();
    let shutdown = state.shutdown_token();
    let (mut sink, mut stream) = socket.split();

    let mut session = Session::new(worker.clone(), state.coordinator.clone(), state.filter);
    let mut step = session.connect();
    tracing::info!(conn_id = %conn_id, worker = %worker, "New client connected to job server");

    let clean = loop {
        match step {
            Step::Send(job) => {
                let msg = Message::Text(job.as_str().into());
                if let Err(e) = send_with_timeout(&mut sink, msg, state.io_timeout).await {
                    tracing::debug!(conn_id = %conn_id, error = %e, "Failed to send job");
                    break false;
                }
            }
            Step::Finished => {
                let _ = send_with_timeout(&mut sink, Message::Close(None), state.io_timeout).await;
                break true;
            }
        }

        let payload = match next_submission(&mut stream, &mut sink, &state, &shutdown).await {
            Inbound::Submission(payload) => payload,
            Inbound::Rejected(rejection) => {
                tracing::warn!(conn_id = %conn_id, worker = %worker, reason = %rejection, "Submission rejected");
                let _ = send_with_timeout(&mut sink, Message::Close(None), state.io_timeout).await;
                break true;
            }
            Inbound::Closed { clean } => break clean,
            Inbound::Shutdown => {
                let _ = send_with_timeout(&mut sink, Message::Close(None), state.io_timeout).await;
                break true;
            }
        };

        // Hashing and the response file write block; run them off the runtime
        let responses = state.sink.clone();
        let handled = tokio::task::spawn_blocking(move || {
            let outcome = session.on_message(&payload, responses.as_ref());
            (session, outcome)
        })
        .await;
        let outcome = match handled {
            Ok((returned, outcome)) => {
                session = returned;
                outcome
            }
            Err(e) => {
                // The session was dropped with the task, which requeued its job
                tracing::error!(conn_id = %conn_id, worker = %worker, error = %e, "Submission handling failed");
                return;
            }
        };

        match outcome {
            Ok(next) => step = next,
            Err(rejection) => {
                tracing::warn!(conn_id = %conn_id, worker = %worker, reason = %rejection, "Submission rejected");
                let _ = send_with_timeout(&mut sink, Message::Close(None), state.io_timeout).await;
                break true;
            }
        }
    };

    session.close(clean);
}

/// Wait for the next text frame, pinging while idle. Gives up once
/// `io_timeout` passes without a submission; ping/pong traffic keeps the
/// link alive but does not extend the deadline.
async fn next_submission(
    stream: &mut WsStream,
    sink: &mut WsSink,
    state: &AppState,
    shutdown: &CancellationToken,
) -> Inbound {
    let deadline = Instant::now() + state.io_timeout;
    let mut ping = tokio::time::interval_at(Instant::now() + state.ping_interval, state.ping_interval);

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let text = text.as_str();
                    if text.is_empty() {
                        return Inbound::Rejected(Rejection::EmptyPayload);
                    }
                    return Inbound::Submission(text.to_owned());
                }
                Some(Ok(Message::Binary(_))) => return Inbound::Rejected(Rejection::NonTextFrame),
                Some(Ok(Message::Close(_))) => return Inbound::Closed { clean: true },
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "WebSocket receive error");
                    return Inbound::Closed { clean: false };
                }
                None => return Inbound::Closed { clean: false },
            },
            _ = ping.tick() => {
                if send_with_timeout(sink, Message::Ping(Default::default()), state.io_timeout).await.is_err() {
                    return Inbound::Closed { clean: false };
                }
            }
            _ = sleep_until(deadline) => {
                tracing::debug!("Receive timed out");
                return Inbound::Closed { clean: false };
            }
            _ = shutdown.cancelled() => return Inbound::Shutdown,
        }
    }
}

async fn send_with_timeout(
    sink: &mut WsSink,
    msg: Message,
    timeout: Duration,
) -> Result<(), String> {
    match tokio::time::timeout(timeout, sink.send(msg)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("send timed out".to_string()),
    }
}
