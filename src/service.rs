use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::process::Command;
use tracing::{debug, info, warn};

/// State of a systemd unit as far as the UI cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    Active,
    Inactive,
    NotInstalled,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub status: ServiceState,
    pub running: bool,
}

impl ServiceStatus {
    fn new(status: ServiceState) -> Self {
        ServiceStatus {
            running: status == ServiceState::Active,
            status,
        }
    }
}

/// Query the state of a systemd service.
///
/// Any failure to reach systemctl reads as an error state rather than
/// propagating; a monitoring page has to render something either way.
pub fn service_status(service_name: &str) -> ServiceStatus {
    match query_service_status(service_name) {
        Ok(status) => status,
        Err(e) => {
            warn!("Failed to query status of {}: {}", service_name, e);
            ServiceStatus::new(ServiceState::Error)
        }
    }
}

/// True if the service process is currently active.
pub fn service_running(service_name: &str) -> bool {
    service_status(service_name).running
}

fn query_service_status(service_name: &str) -> Result<ServiceStatus> {
    // Check the unit exists at all before asking about its state
    let output = Command::new("systemctl")
        .arg("list-unit-files")
        .arg(format!("{}.service", service_name))
        .output()
        .context("Failed to execute systemctl list-unit-files")?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.contains(service_name) {
        return Ok(ServiceStatus::new(ServiceState::NotInstalled));
    }

    let output = Command::new("systemctl")
        .arg("is-active")
        .arg(service_name)
        .output()
        .context("Failed to execute systemctl is-active")?;

    let state_text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    debug!("systemctl is-active {} -> {}", service_name, state_text);

    let state = match state_text.as_str() {
        "active" => ServiceState::Active,
        "failed" => ServiceState::Error,
        _ => ServiceState::Inactive,
    };
    Ok(ServiceStatus::new(state))
}

/// Restart a systemd service. Needs the web user to hold the matching
/// sudo/polkit permission, same as the original deployment.
pub fn restart_service(service_name: &str) -> Result<()> {
    info!("Restarting service {}", service_name);

    let output = Command::new("systemctl")
        .arg("restart")
        .arg(service_name)
        .output()
        .context("Failed to execute systemctl restart")?;

    if !output.status.success() {
        let err = String::from_utf8_lossy(&output.stderr);
        warn!("Failed to restart {}: {}", service_name, err);
        return Err(anyhow::anyhow!("Restart failed: {}", err));
    }

    Ok(())
}
