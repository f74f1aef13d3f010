//! `roverlink-supervisor` – start/stop/poll the external worker processes
//! (mapping, odometry estimation, sensor fusion) that the dashboard manages.
//!
//! Supervision is deliberately loose: processes are addressed by substring
//! match against their invocation string (`pkill -f` / `pgrep -f`), not by
//! PID ownership. That lets the bridge tear down workers it did not launch
//! itself (e.g. survivors of a previous bridge instance), at the accepted
//! cost that an unrelated process sharing a matching substring gets killed
//! too. Liveness answers are inherently racy; callers must tolerate stale
//! results.

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use roverlink_types::BridgeError;

/// Environment-activation prefix prepended to every launched command, so
/// workers see the ROS distro and the workspace overlay.
pub const DEFAULT_SETUP_PREFIX: &str =
    "source /opt/ros/humble/setup.bash && source ~/ros2_ws/install/setup.bash";

/// The fixed, named collection of worker-process patterns the supervisor is
/// allowed to kill and query. Defined in configuration; these defaults match
/// the deployed robot stack.
#[derive(Debug, Clone)]
pub struct ProcessSet {
    /// Killed by the mapping teardown endpoint.
    pub mapping: Vec<String>,
    /// Killed by the positioning teardown endpoint. A superset of `mapping`:
    /// positioning teardown also clears stale fusion nodes left over from
    /// earlier sessions.
    pub positioning: Vec<String>,
    /// Liveness probe for the wheel-RPM processor.
    pub rpm_probe: String,
    /// Liveness probe for the odometry estimator.
    pub odometry_probe: String,
    /// Liveness probe for the EKF sensor-fusion node.
    pub fusion_probe: String,
}

impl Default for ProcessSet {
    fn default() -> Self {
        Self {
            mapping: vec!["rpm_processor.py".to_string(), "odometry.py".to_string()],
            positioning: vec![
                "rpm_processor.py".to_string(),
                "odometry.py".to_string(),
                "ekf_node".to_string(),
                "sensors_fusion_launch.py".to_string(),
                "rpm_processor".to_string(),
                "pose_odometry_estimation".to_string(),
            ],
            rpm_probe: "rpm_processor.py".to_string(),
            odometry_probe: "odometry.py".to_string(),
            fusion_probe: "ekf_node".to_string(),
        }
    }
}

/// Liveness snapshot for the mapping workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingStatus {
    pub rpm_processor: bool,
    pub odometry: bool,
}

/// Liveness snapshot for the positioning workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositioningStatus {
    pub rpm_processor: bool,
    pub odometry: bool,
    pub fusion: bool,
}

/// Starts, stops, and polls named external OS processes.
///
/// Carries no mutable registry: every operation goes straight to the OS, so
/// there is nothing to lock and nothing to get out of sync – at the price of
/// the raciness documented on [`is_running`][Self::is_running].
#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    setup_prefix: Option<String>,
    processes: ProcessSet,
}

impl ProcessSupervisor {
    pub fn new(setup_prefix: Option<String>, processes: ProcessSet) -> Self {
        Self {
            setup_prefix,
            processes,
        }
    }

    pub fn processes(&self) -> &ProcessSet {
        &self.processes
    }

    /// Spawn a detached shell running `command`, prefixed with the
    /// environment-activation script when one is configured.
    ///
    /// Only the spawn syscall is awaited; the worker's lifecycle is not
    /// tracked. A spawn failure is reported, not fatal to the bridge.
    pub async fn launch(&self, command: &str) -> Result<(), BridgeError> {
        let full_command = match &self.setup_prefix {
            Some(prefix) => format!("{prefix} && {command}"),
            None => command.to_string(),
        };
        info!(command, "launching worker process");

        Command::new("bash")
            .arg("-c")
            .arg(&full_command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| BridgeError::Spawn(e.to_string()))?;
        Ok(())
    }

    /// Send SIGTERM to every process whose invocation string matches any of
    /// `patterns`. Matching zero processes is a normal outcome, never an
    /// error; so is a missing `pkill` binary (logged and ignored).
    pub async fn stop(&self, patterns: &[String]) {
        for pattern in patterns {
            match Command::new("pkill").arg("-f").arg(pattern).output().await {
                Ok(out) if out.status.success() => {
                    info!(pattern = %pattern, "terminated matching processes");
                }
                Ok(_) => debug!(pattern = %pattern, "no matching process"),
                Err(e) => warn!(pattern = %pattern, error = %e, "pkill failed to run"),
            }
        }
    }

    /// Whether at least one process matches `pattern` right now.
    ///
    /// Racy by nature: the process may exit (or start) between this check
    /// and whatever the caller does next.
    pub async fn is_running(&self, pattern: &str) -> bool {
        Command::new("pgrep")
            .arg("-f")
            .arg(pattern)
            .output()
            .await
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    /// Tear down the mapping workers.
    pub async fn kill_mapping(&self) {
        self.stop(&self.processes.mapping).await;
    }

    /// Tear down the positioning workers (superset teardown, see
    /// [`ProcessSet::positioning`]).
    pub async fn kill_positioning(&self) {
        self.stop(&self.processes.positioning).await;
    }

    pub async fn mapping_status(&self) -> MappingStatus {
        MappingStatus {
            rpm_processor: self.is_running(&self.processes.rpm_probe).await,
            odometry: self.is_running(&self.processes.odometry_probe).await,
        }
    }

    pub async fn positioning_status(&self) -> PositioningStatus {
        PositioningStatus {
            rpm_processor: self.is_running(&self.processes.rpm_probe).await,
            odometry: self.is_running(&self.processes.odometry_probe).await,
            fusion: self.is_running(&self.processes.fusion_probe).await,
        }
    }
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new(Some(DEFAULT_SETUP_PREFIX.to_string()), ProcessSet::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn bare_supervisor() -> ProcessSupervisor {
        // No setup prefix: the ROS overlay scripts do not exist on CI hosts.
        ProcessSupervisor::new(None, ProcessSet::default())
    }

    #[tokio::test]
    async fn stop_with_no_matching_process_is_not_an_error() {
        let sup = bare_supervisor();
        sup.stop(&["roverlink_no_such_process_pattern".to_string()])
            .await;
    }

    #[tokio::test]
    async fn is_running_is_false_for_unmatched_pattern() {
        let sup = bare_supervisor();
        assert!(!sup.is_running("roverlink_no_such_process_pattern").await);
    }

    #[tokio::test]
    async fn launch_then_probe_then_stop() {
        let sup = bare_supervisor();
        // Unique marker so the pattern cannot collide with anything else on
        // the host. The marker rides in the shell's invocation string.
        let marker = format!("rl_sup_probe_{}", std::process::id());
        sup.launch(&format!("sleep 30; : {marker}"))
            .await
            .expect("spawn must succeed");

        // Allow for process-startup latency.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(sup.is_running(&marker).await, "worker should be running");

        sup.stop(&[marker.clone()]).await;
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!sup.is_running(&marker).await, "worker should be gone");
    }

    #[test]
    fn default_process_set_matches_deployment() {
        let set = ProcessSet::default();
        assert_eq!(set.mapping.len(), 2);
        assert_eq!(set.positioning.len(), 6);
        // Positioning teardown must cover everything mapping teardown does.
        for p in &set.mapping {
            assert!(set.positioning.contains(p));
        }
        assert_eq!(set.fusion_probe, "ekf_node");
    }
}
