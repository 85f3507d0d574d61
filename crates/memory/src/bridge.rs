// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP bridge to the episodic memory service.
//!
//! Remote calls retry with exponential backoff under a per-request
//! deadline. When the service is unreachable the bridge marks it
//! unhealthy, serves from the local vector store for the next health
//! window, then re-probes in the background.

use crate::vector::VectorStore;
use golem_core::Clock;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("memory service request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("memory service request timed out")]
    Timeout,
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub base_url: String,
    pub max_retries: u32,
    pub backoff: Vec<Duration>,
    pub request_timeout: Duration,
    pub health_check_interval: Duration,
    /// Also store remotely-accepted facts in the local store, so a
    /// later outage still recalls them.
    pub mirror_to_local: bool,
}

impl BridgeConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            max_retries: 3,
            backoff: vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
            ],
            request_timeout: Duration::from_secs(10),
            health_check_interval: Duration::from_secs(60),
            mirror_to_local: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Requests served by the remote service.
    pub remote: u64,
    /// Requests served by the local fallback.
    pub fallback: u64,
    /// Individual HTTP attempts, including retries.
    pub attempts: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreResult {
    pub success: bool,
    pub stored: usize,
    pub fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecallResult {
    pub success: bool,
    pub results: Vec<String>,
    pub fallback: bool,
}

enum Health {
    Unknown,
    Healthy,
    Unhealthy { since: Instant, probe_inflight: bool },
}

pub struct MemoryBridge<C: Clock> {
    config: BridgeConfig,
    client: reqwest::Client,
    fallback: Arc<VectorStore>,
    clock: C,
    health: Arc<Mutex<Health>>,
    stats: Mutex<BridgeStats>,
}

impl<C: Clock> MemoryBridge<C> {
    pub fn new(config: BridgeConfig, fallback: Arc<VectorStore>, clock: C) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            fallback,
            clock,
            health: Arc::new(Mutex::new(Health::Unknown)),
            stats: Mutex::new(BridgeStats::default()),
        }
    }

    pub fn stats(&self) -> BridgeStats {
        *self.stats.lock()
    }

    /// Store facts for a world. Never fails: the local store absorbs
    /// whatever the service cannot take.
    pub async fn store(&self, world_id: Uuid, facts: &[String], metadata: Value) -> StoreResult {
        if self.remote_allowed() {
            let body = json!({"world_id": world_id, "facts": facts, "metadata": metadata});
            match self.request(reqwest::Method::POST, "/remember", Some(&body)).await {
                Ok(reply) => {
                    self.note_remote_success();
                    let stored = reply
                        .get("facts_stored")
                        .and_then(Value::as_u64)
                        .unwrap_or(facts.len() as u64) as usize;
                    if self.config.mirror_to_local {
                        self.fallback.store(world_id, facts, &[], self.clock.epoch_ms()).await;
                    }
                    return StoreResult { success: true, stored, fallback: false };
                }
                Err(e) => self.note_remote_failure("remember", &e),
            }
        }
        let stored = self.fallback.store(world_id, facts, &[], self.clock.epoch_ms()).await;
        self.stats.lock().fallback += 1;
        StoreResult { success: true, stored, fallback: true }
    }

    /// Recall up to `limit` memories for a world.
    pub async fn recall(&self, world_id: Uuid, query: &str, limit: usize) -> RecallResult {
        if self.remote_allowed() {
            let body = json!({"world_id": world_id, "query": query, "limit": limit});
            match self.request(reqwest::Method::POST, "/recall", Some(&body)).await {
                Ok(reply) => {
                    self.note_remote_success();
                    let results = reply
                        .get("results")
                        .and_then(Value::as_array)
                        .map(|items| {
                            items
                                .iter()
                                .filter_map(Value::as_str)
                                .map(String::from)
                                .collect()
                        })
                        .unwrap_or_default();
                    return RecallResult { success: true, results, fallback: false };
                }
                Err(e) => self.note_remote_failure("recall", &e),
            }
        }
        let results = self.fallback.search(world_id, query, limit).await;
        self.stats.lock().fallback += 1;
        RecallResult { success: true, results, fallback: true }
    }

    /// Drop everything known about a world, remotely and locally.
    pub async fn clear_world(&self, world_id: Uuid) {
        if self.remote_allowed() {
            let path = format!("/clear_world/{world_id}");
            match self.request(reqwest::Method::DELETE, &path, None).await {
                Ok(_) => self.note_remote_success(),
                Err(e) => self.note_remote_failure("clear_world", &e),
            }
        }
        self.fallback.clear_world(world_id);
    }

    /// Probe the service and cache the verdict.
    pub async fn health_check(&self) -> bool {
        match self.request(reqwest::Method::GET, "/health", None).await {
            Ok(reply) if reply.get("ok").and_then(Value::as_bool) == Some(true) => {
                *self.health.lock() = Health::Healthy;
                true
            }
            _ => {
                self.mark_unhealthy();
                false
            }
        }
    }

    /// Whether this request should try the service at all. Within the
    /// unhealthy window everything goes straight to the fallback; once
    /// the window lapses a background probe is issued (best-effort)
    /// while requests keep falling back.
    fn remote_allowed(&self) -> bool {
        let mut health = self.health.lock();
        match &mut *health {
            Health::Unhealthy { since, probe_inflight } => {
                if self.clock.now().duration_since(*since) >= self.config.health_check_interval
                    && !*probe_inflight
                {
                    *probe_inflight = true;
                    self.spawn_probe();
                }
                false
            }
            _ => true,
        }
    }

    fn note_remote_success(&self) {
        self.stats.lock().remote += 1;
        *self.health.lock() = Health::Healthy;
    }

    fn note_remote_failure(&self, op: &str, error: &MemoryError) {
        tracing::warn!(op, error = %error, "memory service unavailable, using local store");
        self.mark_unhealthy();
    }

    fn mark_unhealthy(&self) {
        *self.health.lock() =
            Health::Unhealthy { since: self.clock.now(), probe_inflight: false };
    }

    fn spawn_probe(&self) {
        let client = self.client.clone();
        let url = format!("{}/health", self.config.base_url);
        let health = Arc::clone(&self.health);
        let timeout = self.config.request_timeout;
        let clock = self.clock.clone();
        tokio::spawn(async move {
            let probe = async {
                let reply: Value = client.get(&url).send().await?.error_for_status()?.json().await?;
                Ok::<Value, reqwest::Error>(reply)
            };
            let ok = matches!(
                tokio::time::timeout(timeout, probe).await,
                Ok(Ok(reply)) if reply.get("ok").and_then(Value::as_bool) == Some(true)
            );
            *health.lock() = if ok {
                Health::Healthy
            } else {
                Health::Unhealthy { since: clock.now(), probe_inflight: false }
            };
        });
    }

    /// One logical request: retries with backoff, each attempt bounded
    /// by the per-request deadline. Dropping the in-flight future on
    /// timeout cancels the underlying request.
    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, MemoryError> {
        let url = format!("{}{}", self.config.base_url, path);
        let attempts = self.config.max_retries.max(1);
        let mut last = MemoryError::Timeout;
        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self
                    .config
                    .backoff
                    .get((attempt - 1) as usize)
                    .copied()
                    .unwrap_or_else(|| Duration::from_secs(4));
                tokio::time::sleep(delay).await;
            }
            self.stats.lock().attempts += 1;

            let mut request = self.client.request(method.clone(), &url);
            if let Some(body) = body {
                request = request.json(body);
            }
            let attempt_fut = async {
                let response = request.send().await?.error_for_status()?;
                response.json::<Value>().await
            };
            match tokio::time::timeout(self.config.request_timeout, attempt_fut).await {
                Err(_) => last = MemoryError::Timeout,
                Ok(Err(e)) => last = MemoryError::Http(e),
                Ok(Ok(reply)) => return Ok(reply),
            }
        }
        Err(last)
    }
}

#[cfg(test)]
#[path = "bridge_tests.rs"]
mod tests;
