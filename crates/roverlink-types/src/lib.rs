//! `roverlink-types` – shared message and error types for the RoverLink bridge.
//!
//! The structs here mirror the ROS 2 message shapes the bridge speaks over
//! rosbridge JSON (`geometry_msgs/msg/Twist`, `geometry_msgs/msg/PoseWithCovariance`,
//! `nav_msgs/msg/Odometry`, `std_msgs/msg/Float32`). Every field carries
//! `#[serde(default)]` so a partially-populated frame decodes into a
//! zero-filled value instead of failing – a read endpoint must never error
//! just because a publisher omitted a sub-message.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 3-component vector, `geometry_msgs/msg/Vector3`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Velocity command / echo, `geometry_msgs/msg/Twist`.
///
/// The zero value (`Twist::default()`) is the documented snapshot state
/// before any bus traffic arrives.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Twist {
    pub linear: Vector3,
    pub angular: Vector3,
}

/// `geometry_msgs/msg/Point`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// `geometry_msgs/msg/Quaternion`.
///
/// Defaults to the all-zero quaternion rather than identity: the bridge
/// reports "no pose received yet" the same way the original deployment did.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

/// `geometry_msgs/msg/Pose`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Pose {
    pub position: Point3,
    pub orientation: Quaternion,
}

/// `geometry_msgs/msg/PoseWithCovariance` – the raw wheel-odometry pose
/// published on `/pose_odom`.
///
/// The covariance is a row-major 6x6 matrix. It is kept as a `Vec<f64>`
/// because serde's fixed-size array impls stop at 32 elements.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseWithCovariance {
    pub pose: Pose,
    pub covariance: Vec<f64>,
}

/// `geometry_msgs/msg/TwistWithCovariance`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TwistWithCovariance {
    pub twist: Twist,
    pub covariance: Vec<f64>,
}

/// ROS time stamp, `builtin_interfaces/msg/Time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Stamp {
    pub sec: i32,
    pub nanosec: u32,
}

/// `std_msgs/msg/Header`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Header {
    pub frame_id: String,
    pub stamp: Stamp,
}

/// Fused pose + twist estimate, `nav_msgs/msg/Odometry`, published on
/// `/odometry/filtered` by the EKF fusion node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Odometry {
    pub header: Header,
    pub pose: PoseWithCovariance,
    pub twist: TwistWithCovariance,
}

/// `std_msgs/msg/Float32` – carries the motor current reading on `/current`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Float32Msg {
    pub data: f64,
}

/// Global error type spanning bus transport, frame decoding, process
/// supervision, and configuration loading.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("bus transport error: {0}")]
    Transport(String),

    #[error("frame decode error on {topic}: {details}")]
    Decode { topic: String, details: String },

    #[error("failed to spawn process: {0}")]
    Spawn(String),

    #[error("configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twist_default_is_all_zero() {
        let t = Twist::default();
        assert_eq!(t.linear, Vector3::default());
        assert_eq!(t.angular, Vector3::default());
        assert_eq!(t.linear.x, 0.0);
        assert_eq!(t.angular.z, 0.0);
    }

    #[test]
    fn twist_decodes_from_rosbridge_msg() {
        let json = r#"{"linear":{"x":0.22,"y":0.0,"z":0.0},"angular":{"x":0.0,"y":0.0,"z":-1.5}}"#;
        let t: Twist = serde_json::from_str(json).unwrap();
        assert!((t.linear.x - 0.22).abs() < f64::EPSILON);
        assert!((t.angular.z - (-1.5)).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_odometry_frame_decodes_with_defaults() {
        // rosbridge publishers routinely omit covariance blocks; the bridge
        // must decode whatever arrives and zero-fill the rest.
        let json = r#"{"header":{"frame_id":"odom"},"pose":{"pose":{"position":{"x":1.5,"y":-0.25}}}}"#;
        let odom: Odometry = serde_json::from_str(json).unwrap();
        assert_eq!(odom.header.frame_id, "odom");
        assert_eq!(odom.header.stamp, Stamp::default());
        assert!((odom.pose.pose.position.x - 1.5).abs() < f64::EPSILON);
        assert!((odom.pose.pose.position.y - (-0.25)).abs() < f64::EPSILON);
        assert!(odom.pose.covariance.is_empty());
        assert_eq!(odom.twist, TwistWithCovariance::default());
    }

    #[test]
    fn pose_with_covariance_decodes_full_matrix() {
        let json = format!(
            r#"{{"pose":{{"position":{{"x":2.0,"y":3.0,"z":0.0}},"orientation":{{"x":0.0,"y":0.0,"z":0.7,"w":0.7}}}},"covariance":[{}]}}"#,
            vec!["0.1"; 36].join(",")
        );
        let p: PoseWithCovariance = serde_json::from_str(&json).unwrap();
        assert_eq!(p.covariance.len(), 36);
        assert!((p.pose.orientation.w - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn bridge_error_display() {
        let err = BridgeError::Decode {
            topic: "/pose_odom".to_string(),
            details: "missing field".to_string(),
        };
        assert!(err.to_string().contains("/pose_odom"));

        let err2 = BridgeError::Spawn("bash not found".to_string());
        assert!(err2.to_string().contains("bash not found"));
    }
}
