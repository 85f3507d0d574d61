// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Skill synthesis pipeline: `CodeRequest` → brain → sanitizer →
//! admission pipeline → skill library.

use golem_core::{Clock, Signal, SignalKind, SignalSink};
use golem_library::SkillLibrary;
use golem_mind::{Brain, ChatTransport};
use golem_sandbox::{sanitize, SafetySandwich, DEFAULT_TIMEOUT_MS};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("code generation failed: {0}")]
    Brain(#[from] golem_mind::BrainError),
    #[error("admission rejected {name}: {reasoning}")]
    Rejected { name: String, reasoning: String },
    #[error(transparent)]
    Library(#[from] golem_library::LibraryError),
}

/// Payload of a `CodeRequest` signal.
#[derive(Debug, Clone, Deserialize)]
pub struct CodeRequest {
    pub name: String,
    pub prompt: String,
    #[serde(default)]
    pub test: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

pub struct SkillSynthesizer<T: ChatTransport + 'static, C: Clock> {
    brain: Arc<Brain<T, C>>,
    sandwich: Arc<SafetySandwich>,
    library: Arc<SkillLibrary<C>>,
    sink: Option<SignalSink>,
    clock: C,
    world_id: Uuid,
}

impl<T: ChatTransport + 'static, C: Clock> SkillSynthesizer<T, C> {
    pub fn new(
        brain: Arc<Brain<T, C>>,
        sandwich: Arc<SafetySandwich>,
        library: Arc<SkillLibrary<C>>,
        sink: Option<SignalSink>,
        clock: C,
        world_id: Uuid,
    ) -> Self {
        Self { brain, sandwich, library, sink, clock, world_id }
    }

    /// Run one request through the whole pipeline.
    pub async fn handle(&self, request: CodeRequest) -> Result<(), SynthesisError> {
        let code = match self.brain.code(&request.prompt, self.world_id).await {
            Ok(code) => code,
            Err(e) => {
                self.emit_failed(&request.name, &e.to_string());
                return Err(e.into());
            }
        };
        self.emit(SignalKind::CodeGenerated, json!({"name": request.name}));

        let sanitized = sanitize(&code, DEFAULT_TIMEOUT_MS);
        let verdict = self.sandwich.validate(&sanitized, request.test.as_deref()).await;
        if !verdict.valid {
            tracing::warn!(skill = %request.name, reasoning = %verdict.reasoning, "generated skill rejected");
            self.emit_failed(&request.name, &verdict.reasoning);
            return Err(SynthesisError::Rejected {
                name: request.name,
                reasoning: verdict.reasoning,
            });
        }

        self.library
            .add(&request.name, &sanitized, &request.description, &request.tags)
            .await?;
        tracing::info!(skill = %request.name, "synthesized skill admitted");
        Ok(())
    }

    /// Spawn the pump that feeds `CodeRequest` signals to this
    /// synthesizer. The returned sender is what gets subscribed.
    pub fn spawn_pump(self: Arc<Self>) -> mpsc::UnboundedSender<Signal> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Signal>();
        tokio::spawn(async move {
            while let Some(signal) = rx.recv().await {
                let request = match serde_json::from_value::<CodeRequest>(signal.payload.clone()) {
                    Ok(request) => request,
                    Err(e) => {
                        tracing::warn!(error = %e, "malformed code request payload");
                        continue;
                    }
                };
                if let Err(e) = self.handle(request).await {
                    tracing::warn!(error = %e, "skill synthesis failed");
                }
            }
        });
        tx
    }

    fn emit(&self, kind: SignalKind, payload: serde_json::Value) {
        if let Some(sink) = &self.sink {
            sink(Signal::new(kind, payload, self.clock.epoch_ms()));
        }
    }

    fn emit_failed(&self, name: &str, error: &str) {
        self.emit(SignalKind::SkillFailed, json!({"name": name, "error": error}));
    }
}

#[cfg(test)]
#[path = "synthesis_tests.rs"]
mod tests;
