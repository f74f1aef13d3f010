//! rosbridge WebSocket client: the bridge's only connection to the ROS 2 bus.
//!
//! [`BusLink`] owns a single background transport task that:
//!
//! 1. dials the rosbridge server and registers one `subscribe` op per
//!    monitored topic plus an `advertise` op for the `/cmd_vel` publish
//!    handle;
//! 2. decodes every inbound `{"op":"publish","topic":…,"msg":…}` frame and
//!    writes the result into the [`StateStore`] – decode-and-write only,
//!    nothing in the receive path blocks;
//! 3. drains an unbounded outbound queue fed by [`BusLink::publish`], so
//!    request handlers never wait on the socket;
//! 4. reconnects with a fixed backoff when the link drops. Reads keep
//!    serving the last (possibly stale) snapshots meanwhile.
//!
//! Delivery of published commands is best-effort: frames queued while the
//! link is down are discarded on reconnect rather than replayed, because a
//! stale velocity command is worse than a lost one.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message,
};
use tracing::{debug, info, warn};

use roverlink_types::{BridgeError, Float32Msg, Odometry, PoseWithCovariance, Twist};

use crate::state::StateStore;

/// Velocity command topic: published to by the gate, echoed back to us.
pub const CMD_VEL_TOPIC: &str = "/cmd_vel";
/// Raw wheel-odometry pose (`geometry_msgs/msg/PoseWithCovariance`).
pub const POSE_TOPIC: &str = "/pose_odom";
/// EKF-fused estimate (`nav_msgs/msg/Odometry`).
pub const POSE_FUSION_TOPIC: &str = "/odometry/filtered";
/// Motor current (`std_msgs/msg/Float32`).
pub const CURRENT_TOPIC: &str = "/current";

/// Topics mirrored into the [`StateStore`].
const MONITORED_TOPICS: [&str; 4] =
    [CMD_VEL_TOPIC, POSE_TOPIC, POSE_FUSION_TOPIC, CURRENT_TOPIC];

/// Delay between reconnect attempts after the link drops.
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Handle to the bus transport. Clone it cheaply – all clones feed the same
/// outbound queue and the same background task.
#[derive(Clone, Debug)]
pub struct BusLink {
    outbound: mpsc::UnboundedSender<String>,
}

impl BusLink {
    /// Open the link: spawns the transport task and returns immediately.
    ///
    /// The task keeps retrying the rosbridge server forever, so a bridge
    /// started before the robot stack is up degrades to serving zero-value
    /// snapshots instead of failing.
    pub fn connect(url: impl Into<String>, store: Arc<StateStore>) -> Self {
        let (outbound, rx) = mpsc::unbounded_channel();
        let url = url.into();
        tokio::spawn(run_transport(url, store, rx));
        Self { outbound }
    }

    /// A link with no transport attached. Published frames accumulate in the
    /// returned receiver instead of going to a socket – used for offline
    /// diagnostics and tests.
    pub fn detached() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        (Self { outbound }, rx)
    }

    /// Fire-and-forget publish of a velocity command to `/cmd_vel`.
    ///
    /// Enqueues the frame for the transport task and returns immediately: no
    /// acknowledgement, no retry, no backpressure. If the transport task is
    /// gone the frame is dropped with a log line.
    pub fn publish(&self, command: Twist) {
        let frame = publish_frame(CMD_VEL_TOPIC, &command);
        if self.outbound.send(frame).is_err() {
            warn!(topic = CMD_VEL_TOPIC, "bus transport gone; command dropped");
        }
    }
}

// ---------------------------------------------------------------------------
// rosbridge frame construction
// ---------------------------------------------------------------------------

fn subscribe_frame(topic: &str) -> String {
    json!({ "op": "subscribe", "topic": topic }).to_string()
}

fn advertise_frame(topic: &str, msg_type: &str) -> String {
    json!({ "op": "advertise", "topic": topic, "type": msg_type }).to_string()
}

fn publish_frame(topic: &str, command: &Twist) -> String {
    json!({ "op": "publish", "topic": topic, "msg": command }).to_string()
}

// ---------------------------------------------------------------------------
// Transport task
// ---------------------------------------------------------------------------

async fn run_transport(
    url: String,
    store: Arc<StateStore>,
    mut outbound: mpsc::UnboundedReceiver<String>,
) {
    loop {
        match connect_async(url.as_str()).await {
            Ok((ws, _)) => {
                info!(url = %url, "connected to rosbridge");
                match drive_link(ws, &store, &mut outbound).await {
                    Ok(()) => {
                        // All BusLink handles dropped; nothing left to serve.
                        info!(url = %url, "bus link closed");
                        return;
                    }
                    Err(e) => warn!(url = %url, error = %e, "bus link dropped"),
                }
            }
            Err(e) => warn!(url = %url, error = %e, "rosbridge connect failed"),
        }

        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

/// Drive one established connection until it fails or every [`BusLink`]
/// handle is dropped.
async fn drive_link(
    ws: WsStream,
    store: &StateStore,
    outbound: &mut mpsc::UnboundedReceiver<String>,
) -> Result<(), BridgeError> {
    // Commands queued while disconnected are stale by the time the link
    // comes back; discard them now, before anything can be flushed to the
    // robot. The drain must happen here – after the connection is
    // established – or a command enqueued during the backoff sleep would
    // survive and be replayed.
    while outbound.try_recv().is_ok() {}

    let (mut ws_tx, mut ws_rx) = ws.split();

    for topic in MONITORED_TOPICS {
        ws_tx
            .send(Message::Text(subscribe_frame(topic).into()))
            .await
            .map_err(|e| BridgeError::Transport(format!("subscribe {topic}: {e}")))?;
    }
    ws_tx
        .send(Message::Text(
            advertise_frame(CMD_VEL_TOPIC, "geometry_msgs/msg/Twist").into(),
        ))
        .await
        .map_err(|e| BridgeError::Transport(format!("advertise {CMD_VEL_TOPIC}: {e}")))?;

    loop {
        tokio::select! {
            frame = outbound.recv() => {
                match frame {
                    Some(frame) => {
                        ws_tx
                            .send(Message::Text(frame.into()))
                            .await
                            .map_err(|e| BridgeError::Transport(format!("publish: {e}")))?;
                    }
                    // Every sender dropped: the bridge is shutting down.
                    None => return Ok(()),
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = route_frame(text.as_str(), store) {
                            debug!(error = %e, "dropping undecodable bus frame");
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        return Err(BridgeError::Transport("connection closed".to_string()));
                    }
                    Some(Err(e)) => {
                        return Err(BridgeError::Transport(e.to_string()));
                    }
                    _ => {}
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound frame decoding
// ---------------------------------------------------------------------------

/// Decode one inbound rosbridge frame and write the payload into the store.
///
/// This is the per-channel subscription callback: decode-and-write only.
/// Non-`publish` ops (rosbridge status chatter) and unmonitored topics are
/// normal and silently skipped; a payload on a monitored topic that fails to
/// decode is reported as [`BridgeError::Decode`] so the caller can log it –
/// a bad publisher must never take the receive loop down.
fn route_frame(text: &str, store: &StateStore) -> Result<(), BridgeError> {
    let Ok(frame) = serde_json::from_str::<Value>(text) else {
        debug!("ignoring non-JSON bus frame");
        return Ok(());
    };
    if frame.get("op").and_then(Value::as_str) != Some("publish") {
        return Ok(());
    }
    let topic = frame.get("topic").and_then(Value::as_str).unwrap_or("");
    let Some(msg) = frame.get("msg") else {
        debug!(topic, "publish frame without msg");
        return Ok(());
    };

    match topic {
        CMD_VEL_TOPIC => serde_json::from_value::<Twist>(msg.clone())
            .map(|twist| store.record_cmd_vel(twist))
            .map_err(|e| decode_error(topic, e)),
        POSE_TOPIC => serde_json::from_value::<PoseWithCovariance>(msg.clone())
            .map(|pose| store.record_pose(pose))
            .map_err(|e| decode_error(topic, e)),
        POSE_FUSION_TOPIC => serde_json::from_value::<Odometry>(msg.clone())
            .map(|odom| store.record_pose_fusion(odom))
            .map_err(|e| decode_error(topic, e)),
        CURRENT_TOPIC => serde_json::from_value::<Float32Msg>(msg.clone())
            .map(|reading| store.record_current(reading.data))
            .map_err(|e| decode_error(topic, e)),
        other => {
            debug!(topic = other, "frame on unmonitored topic");
            Ok(())
        }
    }
}

fn decode_error(topic: &str, e: serde_json::Error) -> BridgeError {
    BridgeError::Decode {
        topic: topic.to_string(),
        details: e.to_string(),
    }
}
