// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pool Client With Retry (C9)
//!
//! Turns a logical compile/decompile call into up to `max_retries` attempts
//! across distinct [`crate::infrastructure::worker::PoolWorker`]s: acquire an idle instance, run the RPC
//! under a timeout, and on failure record the instance's distress (bumping
//! `consecutive_failures`, tripping its circuit breaker at threshold) before
//! retrying elsewhere on an exponential, jittered backoff. The instance's
//! `is_processing` flag is cleared on every exit path.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, warn};

use fdo_domain::{AtomCompiler, CoreError, Decompiler};

use crate::infrastructure::worker::pool::WorkerPool;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct PoolClient {
    pool: Arc<WorkerPool>,
    http: reqwest::Client,
    max_retries: u32,
    request_timeout: Duration,
}

impl PoolClient {
    pub fn new(pool: Arc<WorkerPool>, max_retries: u32, request_timeout: Duration) -> Self {
        Self { pool, http: reqwest::Client::new(), max_retries, request_timeout }
    }

    async fn execute<T, F>(&self, path: &str, build_request: F) -> Result<T, CoreError>
    where
        F: Fn(&reqwest::Client, &str) -> reqwest::RequestBuilder,
        T: ParseResponse,
    {
        let mut attempted = HashSet::new();
        let mut last_error: Option<CoreError> = None;

        for attempt in 0..self.max_retries {
            let Some(instance) = self.pool.get_healthy_instance_async(ACQUIRE_TIMEOUT).await else {
                return Err(CoreError::resource_cap(format!(
                    "no healthy worker available after {:?} wait (attempted {} instances)",
                    ACQUIRE_TIMEOUT,
                    attempted.len()
                )));
            };

            if !attempted.insert(instance.id()) {
                self.pool.release(&instance, false);
                continue;
            }

            let url = format!("{}{path}", instance.base_url());
            debug!("executing RPC on worker {} (attempt {}/{})", instance.id(), attempt + 1, self.max_retries);

            let outcome = tokio::time::timeout(self.request_timeout, build_request(&self.http, &url).send())
                .await
                .map_err(|_| CoreError::transport(format!("RPC to worker {} timed out after {:?}", instance.id(), self.request_timeout)))
                .and_then(|r| r.map_err(|e| CoreError::transport(e.to_string())));

            let result = match outcome {
                Ok(response) => T::from_response(response).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(value) => {
                    self.pool.release(&instance, true);
                    debug!("RPC succeeded on worker {}", instance.id());
                    return Ok(value);
                }
                Err(e) => {
                    self.pool.release(&instance, false);
                    warn!("RPC failed on worker {}: {e}", instance.id());
                    last_error = Some(e);

                    if attempt + 1 < self.max_retries {
                        let backoff = jittered_backoff(attempt);
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }

        Err(CoreError::transport(format!(
            "all {} retry attempts failed across {} instances: {}",
            self.max_retries,
            attempted.len(),
            last_error.map(|e| e.to_string()).unwrap_or_else(|| "no underlying error recorded".to_string())
        )))
    }
}

/// Exponential backoff with base `0.1 * 2^attempt` seconds, jittered by ±25%
/// so concurrently-failing callers don't retry in lockstep.
fn jittered_backoff(attempt: u32) -> Duration {
    let base_secs = 0.1 * 2f64.powi(attempt as i32);
    let jitter: f64 = rand::rng().random_range(0.75..=1.25);
    Duration::from_secs_f64(base_secs * jitter)
}

#[async_trait]
trait ParseResponse: Sized {
    async fn from_response(response: reqwest::Response) -> Result<Self, CoreError>;
}

#[async_trait]
impl ParseResponse for Vec<u8> {
    async fn from_response(response: reqwest::Response) -> Result<Self, CoreError> {
        if !response.status().is_success() {
            return Err(worker_error(response).await);
        }
        response.bytes().await.map(|b| b.to_vec()).map_err(|e| CoreError::transport(e.to_string()))
    }
}

#[async_trait]
impl ParseResponse for String {
    async fn from_response(response: reqwest::Response) -> Result<Self, CoreError> {
        if !response.status().is_success() {
            return Err(worker_error(response).await);
        }
        response.text().await.map_err(|e| CoreError::transport(e.to_string()))
    }
}

async fn worker_error(response: reqwest::Response) -> CoreError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = fdo_domain::normalize_worker_error_message(&body);
    CoreError::worker_reported_full(message, Some(status.as_u16().to_string()), None, None, None, None)
}

#[async_trait]
impl AtomCompiler for PoolClient {
    async fn compile(&self, source: &str) -> Result<Vec<u8>, CoreError> {
        let source = source.to_string();
        self.execute("/compile", move |client, url| {
            client.post(url).header("Content-Type", "text/plain").body(source.clone())
        })
        .await
    }
}

#[async_trait]
impl Decompiler for PoolClient {
    async fn decompile(&self, data: &[u8]) -> Result<String, CoreError> {
        let data = data.to_vec();
        self.execute("/decompile", move |client, url| {
            client.post(url).header("Content-Type", "application/octet-stream").body(data.clone())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially_in_expectation() {
        let short = jittered_backoff(0);
        let long = jittered_backoff(3);
        assert!(short < Duration::from_secs(1));
        assert!(long > short);
    }
}
