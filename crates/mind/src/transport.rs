// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opaque chat transport. The brain neither knows nor cares which
//! provider sits behind it.

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Whatever the provider client reported; never shown to users.
#[derive(Debug, thiserror::Error)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, TransportError>;
}

#[async_trait]
impl<T: ChatTransport + ?Sized> ChatTransport for std::sync::Arc<T> {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, TransportError> {
        self.as_ref().chat(messages).await
    }
}

/// Scripted transport for tests: pops replies in order and records
/// every request it saw.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeTransport {
    replies: parking_lot::Mutex<std::collections::VecDeque<Result<String, String>>>,
    pub requests: parking_lot::Mutex<Vec<Vec<ChatMessage>>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeTransport {
    pub fn new() -> Self {
        Self {
            replies: parking_lot::Mutex::new(std::collections::VecDeque::new()),
            requests: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().push_back(Ok(reply.into()));
    }

    pub fn push_error(&self, error: impl Into<String>) {
        self.replies.lock().push_back(Err(error.into()));
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl ChatTransport for FakeTransport {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, TransportError> {
        self.requests.lock().push(messages.to_vec());
        match self.replies.lock().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(error)) => Err(TransportError(error)),
            None => Ok(String::new()),
        }
    }
}
