// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Worker Supervisor (C7)
//!
//! Owns one native worker subprocess: spawns it with `--host`/`--port`,
//! polls `GET /health` until it responds or a startup deadline elapses, and
//! tears it down on [`WorkerSupervisor::stop`] with a terminate-then-kill
//! sequence. Each [`crate::infrastructure::worker::pool::WorkerPool`]
//! instance owns exactly one supervisor.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::sleep;
use tracing::{info, warn};

use fdo_domain::CoreError;

const HEALTH_POLL_INTERVAL: Duration = Duration::from_millis(200);
const STARTUP_TIMEOUT: Duration = Duration::from_secs(30);
const STOP_GRACE_PERIOD: Duration = Duration::from_secs(3);

pub struct WorkerSupervisor {
    executable: PathBuf,
    working_dir: PathBuf,
    bind_host: String,
    port: u16,
    client: reqwest::Client,
    child: Option<Child>,
}

impl WorkerSupervisor {
    pub fn new(executable: PathBuf, working_dir: PathBuf, bind_host: impl Into<String>, port: u16) -> Self {
        Self {
            executable,
            working_dir,
            bind_host: bind_host.into(),
            port,
            client: reqwest::Client::new(),
            child: None,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.bind_host, self.port)
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Spawns the worker and blocks until its health endpoint answers or the
    /// startup timeout elapses, whichever comes first.
    pub async fn start(&mut self) -> Result<(), CoreError> {
        if self.child.is_some() {
            return Ok(());
        }

        let child = Command::new(&self.executable)
            .arg("--host")
            .arg(&self.bind_host)
            .arg("--port")
            .arg(self.port.to_string())
            .current_dir(&self.working_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CoreError::io(format!("failed to spawn worker at {}: {e}", self.executable.display())))?;
        self.child = Some(child);

        let deadline = tokio::time::Instant::now() + STARTUP_TIMEOUT;
        while tokio::time::Instant::now() < deadline {
            if self.health_check().await {
                info!("worker on port {} became healthy", self.port);
                return Ok(());
            }
            sleep(HEALTH_POLL_INTERVAL).await;
        }

        self.stop().await;
        Err(CoreError::worker_reported(format!("worker on port {} failed to become healthy within {STARTUP_TIMEOUT:?}", self.port)))
    }

    /// Sends a terminate signal, waits [`STOP_GRACE_PERIOD`], then force-kills
    /// if the process is still alive.
    pub async fn stop(&mut self) {
        let Some(mut child) = self.child.take() else { return };

        #[cfg(unix)]
        if let Some(id) = child.id() {
            // SAFETY: `id` names a process we spawned and still hold a handle to.
            unsafe { libc::kill(id as libc::pid_t, libc::SIGTERM) };
        }

        match tokio::time::timeout(STOP_GRACE_PERIOD, child.wait()).await {
            Ok(_) => info!("worker on port {} exited cleanly", self.port),
            Err(_) => {
                warn!("worker on port {} did not exit within grace period, killing", self.port);
                let _ = child.kill().await;
            }
        }
    }

    pub async fn health_check(&self) -> bool {
        self.client
            .get(format!("{}/health", self.base_url()))
            .timeout(Duration::from_millis(500))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

impl Drop for WorkerSupervisor {
    fn drop(&mut self) {
        // `kill_on_drop` on the spawned Command guarantees the OS process is
        // reaped even if `stop` was never awaited.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_formats_host_and_port() {
        let supervisor = WorkerSupervisor::new(PathBuf::from("/bin/true"), PathBuf::from("/tmp"), "127.0.0.1", 9100);
        assert_eq!(supervisor.base_url(), "http://127.0.0.1:9100");
    }

    #[tokio::test]
    async fn health_check_against_nothing_listening_is_false() {
        let supervisor = WorkerSupervisor::new(PathBuf::from("/bin/true"), PathBuf::from("/tmp"), "127.0.0.1", 1);
        assert!(!supervisor.health_check().await);
    }
}
