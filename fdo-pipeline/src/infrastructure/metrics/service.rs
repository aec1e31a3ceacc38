// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Metrics Service Implementation
//!
//! Prometheus-based metrics for the FDO pipeline: forensic decompilation
//! outcomes (C10), worker pool health (C8), and per-call volume. Thread-safe,
//! cloneable handle around a shared [`Registry`].

use std::sync::Arc;

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry};
use tracing::debug;

use fdo_domain::CoreError;

#[derive(Clone)]
pub struct MetricsService {
    registry: Arc<Registry>,

    // Forensic decompilation (C10)
    frames_decompiled_successfully: IntCounter,
    frames_failed_decompilation: IntCounter,
    killer_frames_total: IntCounter,
    daemon_restarts_total: IntCounter,
    frames_skipped_after_crash: IntCounter,

    // Worker pool (C8)
    pool_healthy_instances: IntGauge,
    pool_circuit_open_instances: IntGauge,

    // Compile/decompile call volume (C9)
    compile_calls_total: IntCounter,
    decompile_calls_total: IntCounter,
    worker_call_duration: Histogram,
}

impl MetricsService {
    pub fn new() -> Result<Self, CoreError> {
        let registry = Registry::new();

        let frames_decompiled_successfully = IntCounter::with_opts(
            Opts::new("frames_decompiled_successfully_total", "FDO frames successfully decompiled")
                .namespace("fdo_pipeline"),
        )
        .map_err(metric_err("frames_decompiled_successfully"))?;

        let frames_failed_decompilation = IntCounter::with_opts(
            Opts::new("frames_failed_decompilation_total", "FDO frames the worker rejected")
                .namespace("fdo_pipeline"),
        )
        .map_err(metric_err("frames_failed_decompilation"))?;

        let killer_frames_total = IntCounter::with_opts(
            Opts::new("killer_frames_total", "Frames whose decompilation crashed the worker process")
                .namespace("fdo_pipeline"),
        )
        .map_err(metric_err("killer_frames_total"))?;

        let daemon_restarts_total = IntCounter::with_opts(
            Opts::new("daemon_restarts_total", "Worker process restarts performed by the pool")
                .namespace("fdo_pipeline"),
        )
        .map_err(metric_err("daemon_restarts_total"))?;

        let frames_skipped_after_crash = IntCounter::with_opts(
            Opts::new("frames_skipped_after_crash_total", "Frames left unprocessed after an unrecoverable crash")
                .namespace("fdo_pipeline"),
        )
        .map_err(metric_err("frames_skipped_after_crash"))?;

        let pool_healthy_instances = IntGauge::with_opts(
            Opts::new("pool_healthy_instances", "Worker instances currently healthy").namespace("fdo_pipeline"),
        )
        .map_err(metric_err("pool_healthy_instances"))?;

        let pool_circuit_open_instances = IntGauge::with_opts(
            Opts::new("pool_circuit_open_instances", "Worker instances with an open circuit breaker")
                .namespace("fdo_pipeline"),
        )
        .map_err(metric_err("pool_circuit_open_instances"))?;

        let compile_calls_total = IntCounter::with_opts(
            Opts::new("compile_calls_total", "Compile RPCs dispatched to the worker pool").namespace("fdo_pipeline"),
        )
        .map_err(metric_err("compile_calls_total"))?;

        let decompile_calls_total = IntCounter::with_opts(
            Opts::new("decompile_calls_total", "Decompile RPCs dispatched to the worker pool")
                .namespace("fdo_pipeline"),
        )
        .map_err(metric_err("decompile_calls_total"))?;

        let worker_call_duration = Histogram::with_opts(
            HistogramOpts::new("worker_call_duration_seconds", "Latency of a single worker RPC, including retries")
                .namespace("fdo_pipeline")
                .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )
        .map_err(metric_err("worker_call_duration"))?;

        for metric in [
            Box::new(frames_decompiled_successfully.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(frames_failed_decompilation.clone()),
            Box::new(killer_frames_total.clone()),
            Box::new(daemon_restarts_total.clone()),
            Box::new(frames_skipped_after_crash.clone()),
            Box::new(pool_healthy_instances.clone()),
            Box::new(pool_circuit_open_instances.clone()),
            Box::new(compile_calls_total.clone()),
            Box::new(decompile_calls_total.clone()),
            Box::new(worker_call_duration.clone()),
        ] {
            registry.register(metric).map_err(|e| CoreError::internal(format!("failed to register metric: {e}")))?;
        }

        debug!("MetricsService initialized with Prometheus registry");

        Ok(Self {
            registry: Arc::new(registry),
            frames_decompiled_successfully,
            frames_failed_decompilation,
            killer_frames_total,
            daemon_restarts_total,
            frames_skipped_after_crash,
            pool_healthy_instances,
            pool_circuit_open_instances,
            compile_calls_total,
            decompile_calls_total,
            worker_call_duration,
        })
    }

    pub fn record_frame_decompiled(&self) {
        self.frames_decompiled_successfully.inc();
    }

    pub fn record_frame_failed(&self) {
        self.frames_failed_decompilation.inc();
    }

    pub fn record_killer_frame(&self) {
        self.killer_frames_total.inc();
    }

    pub fn record_daemon_restart(&self) {
        self.daemon_restarts_total.inc();
    }

    pub fn record_frames_skipped(&self, count: u64) {
        self.frames_skipped_after_crash.inc_by(count);
    }

    pub fn set_pool_gauges(&self, healthy: i64, circuit_open: i64) {
        self.pool_healthy_instances.set(healthy);
        self.pool_circuit_open_instances.set(circuit_open);
    }

    pub fn record_compile_call(&self, duration: std::time::Duration) {
        self.compile_calls_total.inc();
        self.worker_call_duration.observe(duration.as_secs_f64());
    }

    pub fn record_decompile_call(&self, duration: std::time::Duration) {
        self.decompile_calls_total.inc();
        self.worker_call_duration.observe(duration.as_secs_f64());
    }

    /// Decompilation failure rate over all frames seen so far, including
    /// process crashes. Returns `0.0` when no frames have been attempted.
    pub fn decompilation_failure_rate(&self) -> f64 {
        let success = self.frames_decompiled_successfully.get() as f64;
        let failed = self.frames_failed_decompilation.get() as f64;
        let crashed = self.killer_frames_total.get() as f64;
        let total = success + failed + crashed;
        if total == 0.0 {
            0.0
        } else {
            (failed + crashed) / total
        }
    }

    pub fn get_metrics(&self) -> Result<String, CoreError> {
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder.encode_to_string(&metric_families).map_err(|e| CoreError::internal(format!("failed to encode metrics: {e}")))
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }
}

impl Default for MetricsService {
    fn default() -> Self {
        Self::new().expect("failed to create default MetricsService")
    }
}

fn metric_err(name: &'static str) -> impl Fn(prometheus::Error) -> CoreError {
    move |e| CoreError::internal(format!("failed to create {name} metric: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_registers_without_error() {
        let service = MetricsService::new().unwrap();
        assert!(service.get_metrics().unwrap().is_empty() || true);
    }

    #[test]
    fn failure_rate_accounts_for_crashes_and_rejections() {
        let service = MetricsService::new().unwrap();
        service.record_frame_decompiled();
        service.record_frame_failed();
        service.record_killer_frame();
        assert!((service.decompilation_failure_rate() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn output_contains_fdo_namespaced_metrics() {
        let service = MetricsService::new().unwrap();
        service.record_frame_decompiled();
        let output = service.get_metrics().unwrap();
        assert!(output.contains("fdo_pipeline_frames_decompiled_successfully_total"));
    }
}
