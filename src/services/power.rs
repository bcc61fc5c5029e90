//! Drives the container-orchestration CLI (`docker compose`) for a
//! service's start/stop/restart/down/status lifecycle, serialized per
//! service under a process-wide guard.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Start,
    Stop,
    Restart,
    Down,
}

impl PowerAction {
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "start" => Some(Self::Start),
            "stop" => Some(Self::Stop),
            "restart" => Some(Self::Restart),
            "down" => Some(Self::Down),
            _ => None,
        }
    }

    fn compose_args(self) -> &'static [&'static str] {
        match self {
            PowerAction::Start => &["up", "-d"],
            PowerAction::Stop => &["stop"],
            PowerAction::Restart => &["restart"],
            PowerAction::Down => &["down"],
        }
    }
}

#[derive(Debug, Error)]
pub enum PowerError {
    #[error("service '{0}' already has an action in flight")]
    InFlight(String),

    #[error("io error launching container CLI: {0}")]
    Io(#[from] std::io::Error),

    #[error("container CLI exited with status {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },
}

/// Process-wide set of services with an in-flight power action, serializing
/// concurrent start/stop/restart/down calls against the same service.
#[derive(Default)]
pub struct PowerGuard {
    in_flight: Mutex<HashSet<String>>,
}

impl PowerGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn acquire(&self, service: &str) -> Result<(), PowerError> {
        let mut guard = self.in_flight.lock().unwrap();
        if !guard.insert(service.to_string()) {
            return Err(PowerError::InFlight(service.to_string()));
        }
        Ok(())
    }

    fn release(&self, service: &str) {
        self.in_flight.lock().unwrap().remove(service);
    }

    pub async fn run_action(
        &self,
        service_dir: &Path,
        service: &str,
        action: PowerAction,
    ) -> Result<String, PowerError> {
        self.acquire(service)?;
        let result = run_compose(service_dir, action.compose_args()).await;
        self.release(service);
        result
    }
}

async fn run_compose(service_dir: &Path, args: &[&str]) -> Result<String, PowerError> {
    let output = Command::new("docker")
        .arg("compose")
        .args(args)
        .current_dir(service_dir)
        .output()
        .await?;

    if !output.status.success() {
        return Err(PowerError::CommandFailed {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// `GET .../status`: `docker compose ps --status running` with any output
/// meaning the service is up.
pub async fn status(service_dir: &Path) -> Result<super::ServiceStatus, PowerError> {
    let output = Command::new("docker")
        .arg("compose")
        .args(["ps", "--status", "running", "-q"])
        .current_dir(service_dir)
        .output()
        .await?;

    if !output.status.success() {
        return Err(PowerError::CommandFailed {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    if output.stdout.iter().all(u8::is_ascii_whitespace) {
        Ok(super::ServiceStatus::Down)
    } else {
        Ok(super::ServiceStatus::Up)
    }
}
