//! `roverlink-middleware` – the bridge's nervous system.
//!
//! Routes asynchronous data between the rosbridge bus and the HTTP gateway
//! without caring about who is asking.
//!
//! # Modules
//!
//! - [`state`] – per-channel latest-value snapshot store; one writer, many
//!   concurrent readers, no torn reads.
//! - [`bus`] – rosbridge WebSocket client owning all subscriptions and the
//!   `/cmd_vel` publish handle.
//! - [`gate`] – velocity clamping between the gateway and the bus.

pub mod bus;
pub mod gate;
pub mod state;

pub use bus::BusLink;
pub use gate::{CommandGate, MAX_ANGULAR_VEL, MAX_LINEAR_VEL, clamp_planar};
pub use state::StateStore;
