//! [`GatewayServer`] – axum router mapping the dashboard's HTTP surface onto
//! StateStore reads, CommandGate writes, and ProcessSupervisor calls.
//!
//! No handler blocks longer than a snapshot clone, a channel enqueue, or a
//! spawn/signal syscall. There is deliberately no command-staleness timeout:
//! a client that stops sending commands leaves the robot at its last
//! commanded velocity until a new command or an external watchdog intervenes.
//! Deployments must pair the bridge with such a watchdog.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info};

use roverlink_middleware::{CommandGate, StateStore};
use roverlink_supervisor::ProcessSupervisor;
use roverlink_types::BridgeError;

/// Default TCP port, matching the original deployment.
pub const DEFAULT_PORT: u16 = 1880;

/// Shared per-request context. Cloned per handler invocation; all clones
/// point at the same store, gate, and supervisor.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<StateStore>,
    pub gate: CommandGate,
    pub supervisor: ProcessSupervisor,
}

/// HTTP gateway for the bridge.
pub struct GatewayServer {
    state: AppState,
    port: u16,
}

impl GatewayServer {
    pub fn new(store: Arc<StateStore>, gate: CommandGate, supervisor: ProcessSupervisor) -> Self {
        Self {
            state: AppState {
                store,
                gate,
                supervisor,
            },
            port: DEFAULT_PORT,
        }
    }

    /// Override the listening port (builder-style).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Bind and serve until the listener fails.
    pub async fn run(self) -> Result<(), BridgeError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| BridgeError::Transport(format!("bind error on {addr}: {e}")))?;

        info!(port = self.port, "gateway listening");

        axum::serve(listener, router(self.state))
            .await
            .map_err(|e| BridgeError::Transport(format!("gateway server error: {e}")))
    }
}

/// Build the route table.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/get_cmd_vel", get(get_cmd_vel))
        .route("/get_pose", get(get_pose))
        .route("/get_pose_fusion", get(get_pose_fusion))
        .route("/get_current", get(get_current))
        .route("/set_cmd_vel", post(set_cmd_vel))
        .route("/launch_ros_command", post(launch_ros_command))
        .route("/kill_mapping_scripts", post(kill_mapping_scripts))
        .route("/kill_pos_scripts", post(kill_pos_scripts))
        .route("/check_processes", get(check_processes))
        .route("/check_processes_pos", get(check_processes_pos))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Read endpoints: StateStore only, never fail
// ---------------------------------------------------------------------------

async fn get_cmd_vel(State(state): State<AppState>) -> Json<Value> {
    let twist = state.store.cmd_vel();
    Json(json!(twist))
}

async fn get_pose(State(state): State<AppState>) -> Json<Value> {
    // The dashboard only plots the planar position; collapse the full
    // PoseWithCovariance snapshot to {position:{x,y}}.
    let pose = state.store.pose();
    Json(json!({
        "position": { "x": pose.pose.position.x, "y": pose.pose.position.y }
    }))
}

async fn get_pose_fusion(State(state): State<AppState>) -> Json<Value> {
    let odom = state.store.pose_fusion();
    Json(json!({
        "position": {
            "x": odom.pose.pose.position.x,
            "y": odom.pose.pose.position.y
        }
    }))
}

async fn get_current(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "current": state.store.current() }))
}

// ---------------------------------------------------------------------------
// Velocity command
// ---------------------------------------------------------------------------

/// Body of `POST /set_cmd_vel`. Both fields are required; a missing or
/// non-numeric field is rejected by the JSON extractor before the gate runs.
#[derive(Debug, Deserialize)]
struct SetCmdVelRequest {
    linear_x: f64,
    angular_z: f64,
}

async fn set_cmd_vel(
    State(state): State<AppState>,
    Json(req): Json<SetCmdVelRequest>,
) -> Json<Value> {
    state.gate.send(req.linear_x, req.angular_z);
    Json(json!({ "status": "success" }))
}

// ---------------------------------------------------------------------------
// Process control plane
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct LaunchCommandRequest {
    command: String,
}

async fn launch_ros_command(
    State(state): State<AppState>,
    Json(req): Json<LaunchCommandRequest>,
) -> Json<Value> {
    match state.supervisor.launch(&req.command).await {
        Ok(()) => Json(json!({ "status": "success" })),
        Err(e) => {
            error!(command = %req.command, error = %e, "worker launch failed");
            Json(json!({ "status": "error", "message": e.to_string() }))
        }
    }
}

async fn kill_mapping_scripts(State(state): State<AppState>) -> Json<Value> {
    // Matching zero processes is a normal outcome, so teardown cannot fail.
    state.supervisor.kill_mapping().await;
    Json(json!({ "status": "success" }))
}

async fn kill_pos_scripts(State(state): State<AppState>) -> Json<Value> {
    state.supervisor.kill_positioning().await;
    Json(json!({ "status": "success" }))
}

async fn check_processes(State(state): State<AppState>) -> Json<Value> {
    let status = state.supervisor.mapping_status().await;
    Json(json!({
        "rpm_processor": status.rpm_processor,
        "odometry": status.odometry
    }))
}

async fn check_processes_pos(State(state): State<AppState>) -> Json<Value> {
    let status = state.supervisor.positioning_status().await;
    Json(json!({
        "rpm_processor": status.rpm_processor,
        "odometry": status.odometry,
        "fusion": status.fusion
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
