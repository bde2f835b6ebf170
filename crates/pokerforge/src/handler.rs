//! Per-connection task: command loop, push delivery, and liveness.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`]. One `select!` loop multiplexes:
//!   1. inbound frames → decode → [`ConnectionLifecycle::handle`] → reply
//!   2. queued pushes from the subscriber table → socket
//!   3. the ping ticker
//!   4. the liveness deadline (last inbound frame + timeout)

use std::sync::Arc;

use pokerforge_fanout::outbox;
use pokerforge_protocol::{ClientMessage, Codec, ServerMessage};
use pokerforge_transport::{Connection, Frame, WebSocketConnection};
use tokio::sync::mpsc::Receiver;
use tokio::time::{Instant, MissedTickBehavior};

use crate::lifecycle::ConnectionLifecycle;
use crate::server::ServerState;
use crate::PokerforgeError;

/// Why the command loop ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    PeerClosed,
    TimedOut,
}

/// Handles a single connection from accept to close.
///
/// The lifecycle is closed on every exit path (including `?` and panics)
/// because it detaches itself on drop.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), PokerforgeError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (tx, mut pushes) = outbox(state.config.outbox_capacity);
    let mut lifecycle =
        ConnectionLifecycle::new(Arc::clone(&state.coordinator), conn_id, tx);

    let exit = serve(&conn, &state, &mut lifecycle, &mut pushes).await?;
    lifecycle.close();

    match exit {
        Exit::PeerClosed => {
            tracing::info!(%conn_id, "connection closed cleanly");
        }
        Exit::TimedOut => {
            tracing::info!(%conn_id, "connection timed out");
            if let Err(e) = conn.close().await {
                tracing::debug!(%conn_id, error = %e, "close after timeout failed");
            }
        }
    }
    Ok(())
}

async fn serve<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    lifecycle: &mut ConnectionLifecycle,
    pushes: &mut Receiver<ServerMessage>,
) -> Result<Exit, PokerforgeError> {
    let liveness = state.config.liveness;
    let mut probe = tokio::time::interval_at(
        Instant::now() + liveness.ping_interval,
        liveness.ping_interval,
    );
    probe.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_seen = Instant::now();

    loop {
        tokio::select! {
            frame = conn.recv() => {
                let data = match frame? {
                    Some(Frame::Data(data)) => data,
                    Some(Frame::Pong) => {
                        last_seen = Instant::now();
                        continue;
                    }
                    None => return Ok(Exit::PeerClosed),
                };
                last_seen = Instant::now();

                let reply = match state.codec.decode::<ClientMessage>(&data) {
                    Ok(msg) => lifecycle.handle(msg),
                    Err(e) => lifecycle.malformed(&e),
                };
                send(conn, &state.codec, &reply).await?;
            }

            Some(push) = pushes.recv() => {
                lifecycle.observe_push(&push);
                send(conn, &state.codec, &push).await?;
            }

            _ = probe.tick() => {
                conn.ping(&[]).await?;
            }

            _ = tokio::time::sleep_until(last_seen + liveness.timeout) => {
                return Ok(Exit::TimedOut);
            }
        }
    }
}

async fn send(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    msg: &ServerMessage,
) -> Result<(), PokerforgeError> {
    let bytes = codec.encode(msg)?;
    conn.send(&bytes).await?;
    Ok(())
}
