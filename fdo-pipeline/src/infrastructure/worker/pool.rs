// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Worker Pool (C8)
//!
//! Provisions N isolated [`WorkerSupervisor`]s, load-balances requests across
//! the idle-and-healthy ones, and runs a background health-monitor task that
//! detects stuck requests, restarts crashed instances (bounded), and trips a
//! per-instance circuit breaker after repeated failures.
//!
//! Per-instance state is the domain's [`WorkerInstance`] value object; this
//! module only adds the concurrency and process-supervision wrapper
//! ([`PoolWorker`]) the pool needs to keep that state consistent under
//! concurrent dispatch.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use fdo_domain::{CoreError, WorkerInstance, WorkerState};

use crate::infrastructure::config::PoolConfig;
use crate::infrastructure::worker::supervisor::WorkerSupervisor;

const REQUEST_TIMEOUT_CHECK: Duration = Duration::from_secs(30);

/// One supervised worker process plus the mutable state the pool tracks for
/// it. `supervisor` and `state` are locked independently: dispatch only ever
/// touches `state`, while `supervisor` is locked for the duration of a
/// start/stop/health-check call.
pub struct PoolWorker {
    supervisor: tokio::sync::Mutex<WorkerSupervisor>,
    state: Mutex<WorkerInstance>,
}

impl PoolWorker {
    pub fn id(&self) -> usize {
        self.state.lock().id
    }

    pub fn base_url(&self) -> String {
        self.state.lock().base_url()
    }

    pub fn is_processing(&self) -> bool {
        self.state.lock().is_processing
    }

    fn mark_claimed(&self) {
        let mut state = self.state.lock();
        state.is_processing = true;
        state.request_started_at = Some(Instant::now());
    }

    fn release(&self, success: bool, circuit_breaker_threshold: u32) {
        let mut state = self.state.lock();
        let was_open = state.circuit_breaker_open;
        if success {
            state.record_success();
            if was_open {
                info!("circuit breaker closed for worker {} (successful request)", state.id);
            }
        } else {
            state.record_failure(circuit_breaker_threshold);
            if !was_open && state.circuit_breaker_open {
                warn!(
                    "circuit breaker opened for worker {} ({} consecutive failures)",
                    state.id, state.consecutive_failures
                );
            }
        }
    }

    pub fn snapshot(&self) -> WorkerInstance {
        self.state.lock().clone()
    }
}

#[derive(Debug, Clone)]
pub struct PoolStatus {
    pub pool_size: usize,
    pub instances_healthy: usize,
    pub total_requests: u64,
    pub failed_requests: u64,
    pub total_restarts: u32,
    pub instances: Vec<WorkerInstance>,
}

pub struct WorkerPool {
    instances: Vec<Arc<PoolWorker>>,
    cursor: AtomicUsize,
    config: PoolConfig,
    pool_root: PathBuf,
    shutdown: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
    health_monitor: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Provisions and starts every instance; fails loudly if fewer than
    /// ⌈size/2⌉ instances became healthy.
    pub async fn start(config: PoolConfig, pool_root: PathBuf) -> Result<Arc<Self>, CoreError> {
        tokio::fs::create_dir_all(&pool_root).await.map_err(|e| CoreError::io(format!("creating pool root: {e}")))?;

        let mut instances = Vec::with_capacity(config.size);
        let mut healthy_count = 0;

        for i in 0..config.size {
            let working_dir = provision_directory(&pool_root, i, &config.executable_path).await?;
            let port = config.base_port + i as u16;
            let mut supervisor = WorkerSupervisor::new(config.executable_path.clone(), working_dir.clone(), "127.0.0.1", port);

            let mut state = WorkerInstance::new(i, port, working_dir);
            match supervisor.start().await {
                Ok(()) => {
                    healthy_count += 1;
                    state.state = WorkerState::Healthy;
                }
                Err(e) => {
                    error!("worker {i} failed to start: {e}");
                    state.state = WorkerState::Crashed;
                }
            }

            instances.push(Arc::new(PoolWorker {
                supervisor: tokio::sync::Mutex::new(supervisor),
                state: Mutex::new(state),
            }));
        }

        let required = config.size.div_ceil(2);
        if healthy_count < required {
            for instance in &instances {
                instance.supervisor.lock().await.stop().await;
            }
            let _ = tokio::fs::remove_dir_all(&pool_root).await;
            return Err(CoreError::worker_reported(format!(
                "pool startup failed: only {healthy_count}/{} instances became healthy (needed {required})",
                config.size
            )));
        }

        info!("worker pool started: {healthy_count}/{} instances healthy", config.size);

        let pool = Arc::new(Self {
            instances,
            cursor: AtomicUsize::new(0),
            config,
            pool_root,
            shutdown: Arc::new(AtomicBool::new(false)),
            shutdown_notify: Arc::new(Notify::new()),
            health_monitor: Mutex::new(None),
        });

        let monitor_pool = Arc::clone(&pool);
        let handle = tokio::spawn(async move { monitor_pool.health_monitor_loop().await });
        *pool.health_monitor.lock() = Some(handle);

        Ok(pool)
    }

    pub fn circuit_breaker_threshold(&self) -> u32 {
        self.config.circuit_breaker_threshold
    }

    /// One round-robin pass for an instance that is healthy, has a closed
    /// circuit, and is not already processing a request.
    pub fn get_healthy_instance(&self) -> Option<Arc<PoolWorker>> {
        let len = self.instances.len();
        for _ in 0..len {
            let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % len;
            let instance = &self.instances[idx];
            let eligible = instance.state.lock().is_dispatchable();
            if eligible {
                instance.mark_claimed();
                return Some(Arc::clone(instance));
            }
        }
        None
    }

    /// Retries [`Self::get_healthy_instance`] on a short backoff until an
    /// instance is available or `timeout` elapses.
    pub async fn get_healthy_instance_async(&self, timeout: Duration) -> Option<Arc<PoolWorker>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(instance) = self.get_healthy_instance() {
                return Some(instance);
            }
            if Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    pub fn release(&self, instance: &PoolWorker, success: bool) {
        instance.release(success, self.config.circuit_breaker_threshold);
    }

    pub fn status(&self) -> PoolStatus {
        let snapshots: Vec<_> = self.instances.iter().map(|i| i.snapshot()).collect();
        PoolStatus {
            pool_size: self.instances.len(),
            instances_healthy: snapshots.iter().filter(|s| s.state == WorkerState::Healthy).count(),
            total_requests: snapshots.iter().map(|s| s.total_requests).sum(),
            failed_requests: snapshots.iter().map(|s| s.failed_requests).sum(),
            total_restarts: snapshots.iter().map(|s| s.restart_count).sum(),
            instances: snapshots,
        }
    }

    async fn restart_instance(&self, instance: &Arc<PoolWorker>) -> bool {
        let restart_count = {
            let mut state = instance.state.lock();
            if state.restart_count >= self.config.max_restart_attempts {
                error!("max restart attempts reached for worker {}", state.id);
                return false;
            }
            state.state = WorkerState::Restarting;
            state.restart_count += 1;
            state.restart_count
        };

        info!("restarting worker {} (attempt {restart_count})", instance.id());

        let mut supervisor = instance.supervisor.lock().await;
        supervisor.stop().await;
        tokio::time::sleep(Duration::from_secs(self.config.restart_delay_secs)).await;

        match supervisor.start().await {
            Ok(()) => {
                let mut state = instance.state.lock();
                state.state = WorkerState::Healthy;
                state.consecutive_failures = 0;
                state.circuit_breaker_open = false;
                info!("worker {} restarted successfully", instance.id());
                true
            }
            Err(e) => {
                error!("failed to restart worker {}: {e}", instance.id());
                instance.state.lock().state = WorkerState::Crashed;
                false
            }
        }
    }

    async fn health_monitor_loop(self: Arc<Self>) {
        let interval = Duration::from_secs(self.config.health_interval_secs);
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = self.shutdown_notify.notified() => break,
            }
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }
            self.perform_health_checks().await;
        }
    }

    async fn perform_health_checks(&self) {
        for instance in self.instances.clone() {
            let stuck = {
                let state = instance.state.lock();
                state.is_processing.then_some(state.request_started_at).flatten().map(|started| started.elapsed())
            };
            if let Some(elapsed) = stuck {
                if elapsed > REQUEST_TIMEOUT_CHECK {
                    warn!("request timeout on worker {}: running for {:.1}s", instance.id(), elapsed.as_secs_f64());
                    {
                        let mut state = instance.state.lock();
                        state.is_processing = false;
                        state.request_started_at = None;
                        state.state = WorkerState::Unhealthy;
                        state.consecutive_failures += 1;
                    }
                    self.restart_instance(&instance).await;
                    continue;
                }
            }

            let healthy = instance.supervisor.lock().await.health_check().await;
            if healthy {
                let mut state = instance.state.lock();
                state.state = WorkerState::Healthy;
                state.last_health_check = Some(Instant::now());
                if state.circuit_breaker_open {
                    state.circuit_breaker_open = false;
                    state.consecutive_failures = 0;
                    info!("circuit breaker closed for worker {} (health check passed)", state.id);
                }
            } else {
                instance.state.lock().state = WorkerState::Crashed;
                warn!("health check failed for worker {}", instance.id());
                self.restart_instance(&instance).await;
            }
        }
    }

    pub async fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.shutdown_notify.notify_one();
        if let Some(handle) = self.health_monitor.lock().take() {
            let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        }

        let stops = self.instances.iter().map(|i| async move { i.supervisor.lock().await.stop().await });
        futures::future::join_all(stops).await;

        if let Err(e) = tokio::fs::remove_dir_all(&self.pool_root).await {
            warn!("failed to clean up pool root {}: {e}", self.pool_root.display());
        }
        info!("worker pool stopped");
    }
}

async fn provision_directory(pool_root: &Path, index: usize, executable: &Path) -> Result<PathBuf, CoreError> {
    let dir = pool_root.join(format!("worker_{index}"));
    tokio::fs::create_dir_all(&dir).await.map_err(|e| CoreError::io(format!("provisioning worker directory: {e}")))?;

    let Some(bin_dir) = executable.parent() else { return Ok(dir) };
    let Ok(mut entries) = tokio::fs::read_dir(bin_dir).await else { return Ok(dir) };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let Ok(file_type) = entry.file_type().await else { continue };
        if !file_type.is_file() {
            continue;
        }
        let dst = dir.join(entry.file_name());
        if dst.exists() {
            continue;
        }
        if std::os::unix::fs::symlink(entry.path(), &dst).is_err() {
            let _ = tokio::fs::copy(entry.path(), &dst).await;
        }
    }

    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker(state: WorkerInstance) -> PoolWorker {
        PoolWorker {
            supervisor: tokio::sync::Mutex::new(WorkerSupervisor::new(
                PathBuf::from("/bin/true"),
                PathBuf::from("/tmp"),
                "127.0.0.1",
                state.port,
            )),
            state: Mutex::new(state),
        }
    }

    #[test]
    fn release_on_failure_opens_circuit_at_threshold() {
        let mut state = WorkerInstance::new(0, 9100, PathBuf::from("/tmp"));
        state.state = WorkerState::Healthy;
        state.is_processing = true;
        state.request_started_at = Some(Instant::now());
        let instance = worker(state);

        instance.release(false, 3);
        instance.release(false, 3);
        assert!(!instance.snapshot().circuit_breaker_open);
        instance.release(false, 3);
        assert!(instance.snapshot().circuit_breaker_open);
        assert!(!instance.is_processing());
    }

    #[test]
    fn release_on_success_resets_failure_streak() {
        let mut state = WorkerInstance::new(0, 9100, PathBuf::from("/tmp"));
        state.state = WorkerState::Healthy;
        state.circuit_breaker_open = true;
        state.consecutive_failures = 2;
        state.is_processing = true;
        state.request_started_at = Some(Instant::now());
        let instance = worker(state);

        instance.release(true, 3);
        let snapshot = instance.snapshot();
        assert_eq!(snapshot.consecutive_failures, 0);
        assert!(!snapshot.circuit_breaker_open);
    }
}
