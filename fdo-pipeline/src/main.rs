// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # `fdo-pipeline` Composition Root
//!
//! Parses and security-validates the CLI, loads [`FdoConfig`], starts the
//! worker pool, dispatches the requested subcommand, and maps the outcome to
//! a Unix exit code. Graceful shutdown is driven by `fdo-bootstrap`'s signal
//! handler tripping a [`ShutdownCoordinator`], which gives in-flight worker
//! RPCs their grace period before the pool is torn down.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use fdo_bootstrap::cli::{Cli, Commands, SecureArgParser};
use fdo_bootstrap::{create_platform, create_signal_handler, ExitCode, ShutdownCoordinator};
use fdo_domain::{AtomCompiler, CoreError, Token};
use fdo_pipeline::application::services::{process_jsonl, ChunkerService, ForensicDriver};
use fdo_pipeline::infrastructure::config::FdoConfig;
use fdo_pipeline::infrastructure::logging::{init_logging, LogFormat};
use fdo_pipeline::infrastructure::metrics::{MetricsEndpoint, MetricsService};
use fdo_pipeline::infrastructure::worker::{PoolClient, WorkerPool};

const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);
const METRICS_PORT: u16 = 9464;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let format = if cli.json_logs { LogFormat::Json } else { LogFormat::Pretty };
    let default_level = if cli.verbose { "debug" } else { "info" };
    init_logging(format, default_level);

    let platform = create_platform();
    info!("fdo-pipeline starting on {} ({} CPUs)", platform.platform_name(), platform.cpu_count());

    let code = run(cli).await.unwrap_or_else(|e| {
        error!("fatal: {e}");
        ExitCode::from_core_error(&e)
    });

    std::process::exit(code.as_i32());
}

async fn run(cli: Cli) -> Result<ExitCode, CoreError> {
    if let Some(config_path) = &cli.config {
        SecureArgParser::validate_path(&config_path.to_string_lossy())
            .map_err(|e| CoreError::config(format!("--config: {e}")))?;
    }

    let config = FdoConfig::load(cli.config.as_deref())?;

    let platform = create_platform();
    if !platform.is_executable(&config.pool.executable_path) {
        warn!(
            "configured worker executable {:?} does not look executable on this platform; pool startup may fail",
            config.pool.executable_path
        );
    }

    let metrics = Arc::new(MetricsService::new()?);
    let metrics_endpoint = MetricsEndpoint::new(metrics.clone(), METRICS_PORT);
    tokio::spawn(async move {
        if let Err(e) = metrics_endpoint.start().await {
            error!("metrics endpoint exited: {e}");
        }
    });

    let shutdown = ShutdownCoordinator::new(SHUTDOWN_GRACE_PERIOD);
    let shutdown_token = shutdown.token();
    let signal_handler = create_signal_handler();
    tokio::spawn(async move {
        signal_handler.wait_for_signal(Box::new(move || shutdown_token.cancel())).await;
    });

    let pool_root = platform.temp_dir().join("fdo-pipeline").join("pool");
    let pool = WorkerPool::start(config.pool.clone(), pool_root).await?;
    let client = Arc::new(PoolClient::new(pool.clone(), config.pool.max_retries, Duration::from_secs(config.pool.request_timeout_secs)));

    let outcome = match cli.command {
        Commands::Compile { input, output, stream_id, token } => run_compile(client, input, output, stream_id, &token).await,
        Commands::Decompile { input, output, forensics_dir } => {
            run_decompile(client, metrics, input, output, forensics_dir).await
        }
        Commands::PoolStatus => {
            print_pool_status(&pool);
            Ok(ExitCode::Success)
        }
        Commands::Estimate { input, token } => run_estimate(input, &token),
    };

    pool.shutdown().await;
    shutdown.complete_shutdown();

    outcome
}

async fn run_compile(
    compiler: Arc<dyn AtomCompiler>,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    stream_id: u32,
    token: &str,
) -> Result<ExitCode, CoreError> {
    let source = read_input(input.as_deref())?;
    let token = Token::new(token);

    let chunker = ChunkerService::new(compiler);
    let result = chunker.process_fdo_script(&source, stream_id, &token).await?;

    let mut bytes = Vec::new();
    for chunk in &result.chunks {
        bytes.extend_from_slice(chunk);
    }
    write_output(output.as_deref(), &bytes)?;

    info!("compiled {} atom chunks into {} bytes across {} packets", result.chunk_info.len(), bytes.len(), result.chunks.len());
    Ok(ExitCode::Success)
}

async fn run_decompile(
    decompiler: Arc<dyn fdo_domain::Decompiler>,
    metrics: Arc<MetricsService>,
    input: PathBuf,
    output: Option<PathBuf>,
    forensics_dir: PathBuf,
) -> Result<ExitCode, CoreError> {
    SecureArgParser::validate_path(&input.to_string_lossy()).map_err(|e| CoreError::config(format!("--input: {e}")))?;

    let content = std::fs::read_to_string(&input).map_err(|e| CoreError::io(format!("reading {}: {e}", input.display())))?;
    let jsonl_result = process_jsonl(&content)?;

    let driver = ForensicDriver::new(decompiler, metrics.clone(), forensics_dir);
    let summary = driver.process(&jsonl_result.frames).await;

    write_output(output.as_deref(), summary.source.as_bytes())?;

    info!(
        "decompiled {}/{} frames ({} process crashes, {:.1}% failure rate)",
        summary.frames_decompiled_successfully,
        jsonl_result.fdo_frames_found,
        summary.process_crashes,
        summary.failure_rate(jsonl_result.fdo_frames_found)
    );

    if summary.process_crashes > 0 {
        Ok(ExitCode::Protocol)
    } else {
        Ok(ExitCode::Success)
    }
}

fn run_estimate(input: Option<PathBuf>, token: &str) -> Result<ExitCode, CoreError> {
    let source = read_input(input.as_deref())?;
    let token = Token::new(token);

    // Estimation needs no live compiler; construct a placeholder pool client
    // is unnecessary since `estimate_chunks` never calls `compile`.
    struct Unreachable;
    #[async_trait::async_trait]
    impl AtomCompiler for Unreachable {
        async fn compile(&self, _source: &str) -> Result<Vec<u8>, CoreError> {
            unreachable!("estimate never compiles")
        }
    }

    let chunker = ChunkerService::new(Arc::new(Unreachable));
    let estimate = chunker.estimate_chunks(&source, &token);

    println!("atom units:             {}", estimate.atom_units);
    println!("action blocks:          {}", estimate.action_blocks);
    println!("estimated compiled size: {} bytes", estimate.estimated_compiled_size);
    println!("estimated packets:      {}", estimate.estimated_chunks);
    println!("header size:            {} bytes", estimate.header_size);
    println!("max payload per packet: {} bytes", estimate.max_payload_per_packet);

    Ok(ExitCode::Success)
}

fn print_pool_status(pool: &WorkerPool) {
    let status = pool.status();
    println!("pool size:        {}", status.pool_size);
    println!("healthy instances: {}", status.instances_healthy);
    println!("total requests:   {}", status.total_requests);
    println!("failed requests:  {}", status.failed_requests);
    println!("total restarts:   {}", status.total_restarts);
    for instance in &status.instances {
        println!(
            "  worker {}: state={:?} requests={} failures={} circuit_open={}",
            instance.id, instance.state, instance.total_requests, instance.failed_requests, instance.circuit_breaker_open
        );
    }
}

fn read_input(path: Option<&std::path::Path>) -> Result<String, CoreError> {
    match path {
        Some(path) => {
            SecureArgParser::validate_path(&path.to_string_lossy()).map_err(|e| CoreError::config(format!("--input: {e}")))?;
            std::fs::read_to_string(path).map_err(|e| CoreError::io(format!("reading {}: {e}", path.display())))
        }
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).map_err(|e| CoreError::io(format!("reading stdin: {e}")))?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&std::path::Path>, bytes: &[u8]) -> Result<(), CoreError> {
    match path {
        Some(path) => std::fs::write(path, bytes).map_err(|e| CoreError::io(format!("writing {}: {e}", path.display()))),
        None => {
            use std::io::Write;
            std::io::stdout().write_all(bytes).map_err(|e| CoreError::io(format!("writing stdout: {e}")))
        }
    }
}
