//! Velocity clamping between the HTTP gateway and the bus.
//!
//! The bridge only ever issues planar commands: forward/backward speed on
//! `linear.x` and turn rate on `angular.z`. Both are saturated to the
//! robot's physical ceilings before anything reaches the bus.

use roverlink_types::{Twist, Vector3};
use tracing::debug;

use crate::bus::BusLink;

/// Maximum forward/backward speed in m/s (hardware limit of the drive base).
pub const MAX_LINEAR_VEL: f64 = 0.22;

/// Maximum turn rate in rad/s.
pub const MAX_ANGULAR_VEL: f64 = 2.84;

/// Saturate a planar command to the velocity ceilings.
///
/// Pure and total: any finite input produces a bounded, valid [`Twist`].
/// The unused components (`linear.y`, `linear.z`, `angular.x`, `angular.y`)
/// are pinned to zero.
pub fn clamp_planar(linear_x: f64, angular_z: f64) -> Twist {
    Twist {
        linear: Vector3 {
            x: linear_x.clamp(-MAX_LINEAR_VEL, MAX_LINEAR_VEL),
            y: 0.0,
            z: 0.0,
        },
        angular: Vector3 {
            x: 0.0,
            y: 0.0,
            z: angular_z.clamp(-MAX_ANGULAR_VEL, MAX_ANGULAR_VEL),
        },
    }
}

/// Validates and clamps incoming velocity commands, then hands them to the
/// bus for best-effort publication.
#[derive(Clone)]
pub struct CommandGate {
    link: BusLink,
}

impl CommandGate {
    pub fn new(link: BusLink) -> Self {
        Self { link }
    }

    /// Clamp and publish a planar velocity command.
    ///
    /// Returns the clamped command that was actually published. Publication
    /// is fire-and-forget; delivery is not guaranteed.
    pub fn send(&self, linear_x: f64, angular_z: f64) -> Twist {
        let command = clamp_planar(linear_x, angular_z);
        debug!(
            linear_x = command.linear.x,
            angular_z = command.angular.z,
            "publishing velocity command"
        );
        self.link.publish(command);
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus;

    #[test]
    fn in_range_input_passes_through_unchanged() {
        let t = clamp_planar(0.1, -1.0);
        assert_eq!(t.linear.x, 0.1);
        assert_eq!(t.angular.z, -1.0);
    }

    #[test]
    fn out_of_range_input_saturates_at_nearest_bound() {
        let t = clamp_planar(5.0, -10.0);
        assert_eq!(t.linear.x, MAX_LINEAR_VEL);
        assert_eq!(t.angular.z, -MAX_ANGULAR_VEL);

        let t = clamp_planar(-0.5, 3.0);
        assert_eq!(t.linear.x, -MAX_LINEAR_VEL);
        assert_eq!(t.angular.z, MAX_ANGULAR_VEL);
    }

    #[test]
    fn boundary_values_are_preserved_exactly() {
        let t = clamp_planar(MAX_LINEAR_VEL, -MAX_ANGULAR_VEL);
        assert_eq!(t.linear.x, MAX_LINEAR_VEL);
        assert_eq!(t.angular.z, -MAX_ANGULAR_VEL);
    }

    #[test]
    fn off_axis_components_are_always_zero() {
        let t = clamp_planar(0.2, 1.0);
        assert_eq!(t.linear.y, 0.0);
        assert_eq!(t.linear.z, 0.0);
        assert_eq!(t.angular.x, 0.0);
        assert_eq!(t.angular.y, 0.0);
    }

    #[tokio::test]
    async fn send_publishes_clamped_command_to_the_link() {
        let (link, mut outbound) = BusLink::detached();
        let gate = CommandGate::new(link);

        let published = gate.send(5.0, -10.0);
        assert_eq!(published.linear.x, MAX_LINEAR_VEL);
        assert_eq!(published.angular.z, -MAX_ANGULAR_VEL);

        let frame = outbound.recv().await.expect("frame must be enqueued");
        let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(json["op"], "publish");
        assert_eq!(json["topic"], bus::CMD_VEL_TOPIC);
        assert_eq!(json["msg"]["linear"]["x"], MAX_LINEAR_VEL);
        assert_eq!(json["msg"]["angular"]["z"], -MAX_ANGULAR_VEL);
    }
}
