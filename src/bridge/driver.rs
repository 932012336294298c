//! Session driver: runs one bridge session to completion.
//!
//! The driver owns both legs and feeds their events into the session state
//! machine. It is generic over the legs so the same loop serves real sockets
//! and in-memory test doubles.

use std::fmt::Display;
use std::future::Future;

use futures_util::{Sink, SinkExt, Stream, StreamExt};

use crate::bridge::frame::{BridgeFrame, LegEvent};
use crate::bridge::session::{BridgeSession, Disposition, Side};
use crate::observability::metrics;

/// Why the upstream leg could not be established.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("cannot resolve upstream: {0}")]
    Resolve(#[from] crate::registry::RegistryError),

    #[error("upstream handshake timed out after {0}ms")]
    HandshakeTimeout(u64),

    #[error("upstream handshake failed: {0}")]
    Handshake(String),
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub closed_by: Option<Side>,
    pub upstream_opened: bool,
    pub to_upstream: u64,
    pub to_client: u64,
    pub dropped: u64,
}

/// Run a session until either leg closes.
///
/// `connect` is polled concurrently with the client leg, so client frames
/// that arrive during the handshake are queued rather than lost.
pub async fn run_session<CT, CR, C, UT, UR>(
    mut session: BridgeSession,
    mut client_tx: CT,
    mut client_rx: CR,
    connect: C,
) -> SessionOutcome
where
    CT: Sink<BridgeFrame> + Unpin,
    CT::Error: Display,
    CR: Stream<Item = LegEvent> + Unpin,
    C: Future<Output = Result<(UT, UR), BridgeError>>,
    UT: Sink<BridgeFrame> + Unpin,
    UT::Error: Display,
    UR: Stream<Item = LegEvent> + Unpin,
{
    let id = session.id();
    let endpoint = session.endpoint().to_string();
    let mut counters = Counters::default();

    metrics::record_bridge_session(&endpoint, 1.0);
    tracing::info!(session_id = %id, endpoint = %endpoint, state = "connecting", "Bridge session accepted");

    // Connecting: race the handshake against client traffic.
    tokio::pin!(connect);
    let upstream = loop {
        tokio::select! {
            result = &mut connect => match result {
                Ok(legs) => break Some(legs),
                Err(e) => {
                    tracing::warn!(session_id = %id, endpoint = %endpoint, side = %Side::Upstream, error = %e, "Upstream connect failed");
                    session.on_close(Side::Upstream);
                    let _ = client_tx.close().await;
                    break None;
                }
            },
            event = client_rx.next() => {
                match event.unwrap_or(LegEvent::Closed) {
                    LegEvent::Frame(frame) => {
                        session.on_frame(Side::Client, frame);
                        tracing::trace!(session_id = %id, pending = session.pending_len(), "Buffered client frame");
                    }
                    LegEvent::Control => {}
                    LegEvent::Closed => {
                        tracing::info!(session_id = %id, side = %Side::Client, "Client left before upstream opened");
                        session.on_close(Side::Client);
                        break None;
                    }
                    LegEvent::Error(e) => {
                        tracing::warn!(session_id = %id, side = %Side::Client, error = %e, "Client leg failed before upstream opened");
                        session.on_close(Side::Client);
                        break None;
                    }
                }
            }
        }
    };

    let Some((mut upstream_tx, mut upstream_rx)) = upstream else {
        return finish(session, counters, false);
    };

    // Open: flush the queue in arrival order, then relay.
    let pending = session.on_upstream_open();
    tracing::info!(session_id = %id, endpoint = %endpoint, flushed = pending.len(), state = "open", "Upstream opened");
    for frame in pending {
        if let Err(e) = upstream_tx.send(frame).await {
            tracing::warn!(session_id = %id, side = %Side::Upstream, error = %e, "Flush to upstream failed");
            session.record_drop();
            session.on_close(Side::Upstream);
            let _ = client_tx.close().await;
            return finish(session, counters, true);
        }
        counters.to_upstream += 1;
    }

    loop {
        let (from, event) = tokio::select! {
            event = client_rx.next() => (Side::Client, event.unwrap_or(LegEvent::Closed)),
            event = upstream_rx.next() => (Side::Upstream, event.unwrap_or(LegEvent::Closed)),
        };

        match event {
            LegEvent::Frame(frame) => {
                let Disposition::Forward(frame) = session.on_frame(from, frame) else {
                    continue;
                };
                let sent = match from {
                    Side::Client => upstream_tx.send(frame).await.map_err(|e| e.to_string()),
                    Side::Upstream => client_tx.send(frame).await.map_err(|e| e.to_string()),
                };
                match sent {
                    Ok(()) => match from {
                        Side::Client => counters.to_upstream += 1,
                        Side::Upstream => counters.to_client += 1,
                    },
                    Err(e) => {
                        // The target leg is gone: the frame is lost and the session ends.
                        let target = from.other();
                        tracing::warn!(session_id = %id, side = %target, error = %e, "Dropped frame, target leg not open");
                        session.record_drop();
                        session.on_close(target);
                        close_leg(target, &mut client_tx, &mut upstream_tx).await;
                        close_leg(from, &mut client_tx, &mut upstream_tx).await;
                        break;
                    }
                }
            }
            LegEvent::Control => {}
            LegEvent::Closed => {
                tracing::info!(session_id = %id, side = %from, "Leg closed");
                if session.on_close(from) {
                    close_leg(from.other(), &mut client_tx, &mut upstream_tx).await;
                }
                break;
            }
            LegEvent::Error(e) => {
                tracing::warn!(session_id = %id, side = %from, error = %e, "Leg failed");
                if session.on_close(from) {
                    close_leg(from.other(), &mut client_tx, &mut upstream_tx).await;
                }
                break;
            }
        }
    }

    finish(session, counters, true)
}

#[derive(Debug, Default)]
struct Counters {
    to_upstream: u64,
    to_client: u64,
}

async fn close_leg<CT, UT>(side: Side, client_tx: &mut CT, upstream_tx: &mut UT)
where
    CT: Sink<BridgeFrame> + Unpin,
    UT: Sink<BridgeFrame> + Unpin,
{
    // Close errors mean the leg is already gone.
    match side {
        Side::Client => {
            let _ = client_tx.close().await;
        }
        Side::Upstream => {
            let _ = upstream_tx.close().await;
        }
    }
}

fn finish(session: BridgeSession, counters: Counters, upstream_opened: bool) -> SessionOutcome {
    metrics::record_bridge_session(session.endpoint(), -1.0);

    let outcome = SessionOutcome {
        closed_by: session.closed_by(),
        upstream_opened,
        to_upstream: counters.to_upstream,
        to_client: counters.to_client,
        dropped: session.dropped(),
    };
    tracing::info!(
        session_id = %session.id(),
        endpoint = %session.endpoint(),
        closed_by = outcome.closed_by.map(Side::as_str).unwrap_or("none"),
        to_upstream = outcome.to_upstream,
        to_client = outcome.to_client,
        dropped = outcome.dropped,
        state = "closed",
        "Bridge session closed"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use futures_util::{sink, stream};

    fn text(s: &str) -> BridgeFrame {
        BridgeFrame::Text(s.to_string())
    }

    /// A sink that records frames and whether it was closed.
    fn recording_sink(
        log: Arc<Mutex<Vec<BridgeFrame>>>,
    ) -> impl Sink<BridgeFrame, Error = std::convert::Infallible> + Unpin {
        Box::pin(sink::unfold(log, |log, frame: BridgeFrame| async move {
            log.lock().unwrap().push(frame);
            Ok::<_, std::convert::Infallible>(log)
        }))
    }

    fn delayed(event: LegEvent, ms: u64) -> impl Stream<Item = LegEvent> {
        stream::once(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            event
        })
    }

    #[tokio::test]
    async fn test_frames_sent_during_handshake_arrive_in_order() {
        let upstream_log = Arc::new(Mutex::new(Vec::new()));
        let client_log = Arc::new(Mutex::new(Vec::new()));

        // Two frames before the upstream opens (at 50ms), one after, close at 200ms.
        let client_rx = Box::pin(
            stream::iter(vec![LegEvent::Frame(text("1")), LegEvent::Frame(text("2"))])
                .chain(delayed(LegEvent::Frame(text("3")), 100))
                .chain(delayed(LegEvent::Closed, 100)),
        );

        let up_log = upstream_log.clone();
        let connect = async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, BridgeError>((recording_sink(up_log), Box::pin(stream::pending::<LegEvent>())))
        };

        let outcome = run_session(
            BridgeSession::new("/ws/voice"),
            recording_sink(client_log.clone()),
            client_rx,
            connect,
        )
        .await;

        assert_eq!(*upstream_log.lock().unwrap(), vec![text("1"), text("2"), text("3")]);
        assert!(client_log.lock().unwrap().is_empty());
        assert_eq!(outcome.closed_by, Some(Side::Client));
        assert!(outcome.upstream_opened);
        assert_eq!(outcome.to_upstream, 3);
        assert_eq!(outcome.dropped, 0);
    }

    #[tokio::test]
    async fn test_upstream_frames_reach_client_and_upstream_close_ends_session() {
        let client_log = Arc::new(Mutex::new(Vec::new()));

        let upstream_rx = Box::pin(
            stream::iter(vec![LegEvent::Frame(text("a")), LegEvent::Control, LegEvent::Frame(text("b"))])
                .chain(stream::iter(vec![LegEvent::Closed])),
        );
        let connect = async move {
            Ok::<_, BridgeError>((recording_sink(Arc::new(Mutex::new(Vec::new()))), upstream_rx))
        };

        let outcome = run_session(
            BridgeSession::new("/ws/conversation"),
            recording_sink(client_log.clone()),
            Box::pin(stream::pending::<LegEvent>()),
            connect,
        )
        .await;

        assert_eq!(*client_log.lock().unwrap(), vec![text("a"), text("b")]);
        assert_eq!(outcome.closed_by, Some(Side::Upstream));
        assert_eq!(outcome.to_client, 2);
    }

    #[tokio::test]
    async fn test_failed_handshake_ends_session() {
        let connect = async {
            Err::<(
                std::pin::Pin<Box<dyn Sink<BridgeFrame, Error = std::convert::Infallible>>>,
                std::pin::Pin<Box<dyn Stream<Item = LegEvent>>>,
            ), _>(BridgeError::Handshake("refused".into()))
        };

        let outcome = run_session(
            BridgeSession::new("/ws/voice"),
            recording_sink(Arc::new(Mutex::new(Vec::new()))),
            Box::pin(stream::pending::<LegEvent>()),
            connect,
        )
        .await;

        assert_eq!(outcome.closed_by, Some(Side::Upstream));
        assert!(!outcome.upstream_opened);
    }

    #[tokio::test]
    async fn test_client_leaving_during_handshake_abandons_connect() {
        let client_rx = Box::pin(stream::iter(vec![
            LegEvent::Frame(text("early")),
            LegEvent::Closed,
        ]));
        let connect = async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, BridgeError>((
                recording_sink(Arc::new(Mutex::new(Vec::new()))),
                Box::pin(stream::pending::<LegEvent>()),
            ))
        };

        let start = std::time::Instant::now();
        let outcome = run_session(
            BridgeSession::new("/ws/voice"),
            recording_sink(Arc::new(Mutex::new(Vec::new()))),
            client_rx,
            connect,
        )
        .await;

        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(outcome.closed_by, Some(Side::Client));
        assert!(!outcome.upstream_opened);
        assert_eq!(outcome.dropped, 1);
    }
}
