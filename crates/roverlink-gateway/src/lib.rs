//! `roverlink-gateway` – the HTTP/JSON control surface of the bridge.
//!
//! Boots an axum server (default port `1880`) that:
//!
//! 1. **Serves** read endpoints backed purely by the
//!    [`StateStore`][roverlink_middleware::StateStore] – no bus interaction
//!    on the request path, so readers never block and never fail (they see
//!    the zero-value snapshot until bus traffic arrives).
//!
//! 2. **Accepts** planar velocity commands on `/set_cmd_vel`, clamped through
//!    the [`CommandGate`][roverlink_middleware::CommandGate] and published to
//!    the bus fire-and-forget.
//!
//! 3. **Drives** the worker-process control plane (`/launch_ros_command`,
//!    `/kill_mapping_scripts`, `/kill_pos_scripts`, `/check_processes`,
//!    `/check_processes_pos`) via the
//!    [`ProcessSupervisor`][roverlink_supervisor::ProcessSupervisor].
//!
//! Write endpoints always answer HTTP 200 with a `{status, message?}`
//! envelope; clients must inspect the `status` field. Only malformed JSON
//! bodies are rejected at the HTTP layer, before any component runs.

pub mod server;

pub use server::{AppState, DEFAULT_PORT, GatewayServer};
