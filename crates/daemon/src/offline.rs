// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stand-in transport for daemons launched without a provider. Every
//! request fails, so the brain degrades to its disconnected sentinel
//! and the self-prompter pauses itself.

use async_trait::async_trait;
use golem_mind::{ChatMessage, ChatTransport, TransportError};

#[derive(Clone, Default)]
pub struct OfflineTransport;

#[async_trait]
impl ChatTransport for OfflineTransport {
    async fn chat(&self, _messages: &[ChatMessage]) -> Result<String, TransportError> {
        Err(TransportError("no LLM transport configured".to_string()))
    }
}
