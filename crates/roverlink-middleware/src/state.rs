//! Latest-value snapshot store, one independently guarded cell per monitored
//! bus channel.
//!
//! Each channel has exactly one writer (its subscription callback in
//! [`bus`][crate::bus]) and arbitrarily many readers (HTTP request handlers).
//! A write replaces the snapshot wholesale; a read clones the most recently
//! completed write, or the zero value if nothing has arrived yet. Because
//! every channel owns its own lock, contention on one channel never stalls
//! access to another, and the memory bound is O(channels), not O(message
//! rate) – no history is kept.

use std::sync::{PoisonError, RwLock};

use roverlink_types::{Odometry, PoseWithCovariance, Twist};

/// A single latest-value cell.
///
/// The critical section on both sides is a clone; readers never observe a
/// half-replaced value. A poisoned lock is recovered rather than propagated
/// so a panicking writer cannot wedge every future read.
#[derive(Debug, Default)]
pub struct Slot<T> {
    cell: RwLock<T>,
}

impl<T: Clone + Default> Slot<T> {
    /// Replace the snapshot wholesale. Total: never blocks on readers beyond
    /// the lock handoff, never fails.
    pub fn store(&self, value: T) {
        *self.cell.write().unwrap_or_else(PoisonError::into_inner) = value;
    }

    /// Clone out the most recently completed write, or `T::default()` if no
    /// write has occurred.
    pub fn load(&self) -> T {
        self.cell
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Snapshot store for every channel the bridge mirrors from the bus.
///
/// Created once at startup with zero values and shared behind an `Arc`
/// between the bus transport task (writer) and the HTTP handlers (readers).
#[derive(Debug, Default)]
pub struct StateStore {
    cmd_vel: Slot<Twist>,
    pose: Slot<PoseWithCovariance>,
    pose_fusion: Slot<Odometry>,
    current: Slot<f64>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest `/cmd_vel` echo.
    pub fn record_cmd_vel(&self, twist: Twist) {
        self.cmd_vel.store(twist);
    }

    pub fn cmd_vel(&self) -> Twist {
        self.cmd_vel.load()
    }

    /// Record the latest raw wheel-odometry pose from `/pose_odom`.
    pub fn record_pose(&self, pose: PoseWithCovariance) {
        self.pose.store(pose);
    }

    pub fn pose(&self) -> PoseWithCovariance {
        self.pose.load()
    }

    /// Record the latest fused estimate from `/odometry/filtered`.
    pub fn record_pose_fusion(&self, odometry: Odometry) {
        self.pose_fusion.store(odometry);
    }

    pub fn pose_fusion(&self) -> Odometry {
        self.pose_fusion.load()
    }

    /// Record the latest motor-current reading from `/current`.
    pub fn record_current(&self, amps: f64) {
        self.current.store(amps);
    }

    pub fn current(&self) -> f64 {
        self.current.load()
    }
}
