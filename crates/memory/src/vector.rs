// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory vector store used when the memory service is unreachable.
//!
//! Records are partitioned by world id; a recall for one world can
//! never surface another world's records.

use async_trait::async_trait;
use golem_core::MemoryRecord;
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

/// Produces an embedding for a piece of text.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Vec<f32>;
}

/// Deterministic feature-hashing embedder. No network, no model: each
/// lowercase token bumps a hashed bucket. Good enough for the fallback
/// store to rank exact and near-exact matches.
pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dims];
        for token in text.to_lowercase().split_whitespace() {
            let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
            for byte in token.bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
            }
            vector[(hash % self.dims as u64) as usize] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

pub struct VectorStore {
    embedder: Box<dyn Embedder>,
    records: Mutex<HashMap<Uuid, Vec<MemoryRecord>>>,
}

impl VectorStore {
    pub fn new(embedder: Box<dyn Embedder>) -> Self {
        Self { embedder, records: Mutex::new(HashMap::new()) }
    }

    pub async fn store(&self, world_id: Uuid, facts: &[String], tags: &[String], ts: u64) -> usize {
        let mut stored = 0;
        for fact in facts {
            let embedding = self.embedder.embed(fact).await;
            let mut record = MemoryRecord::new(world_id, fact, ts);
            record.tags = tags.to_vec();
            record.embedding = Some(embedding);
            self.records.lock().entry(world_id).or_default().push(record);
            stored += 1;
        }
        stored
    }

    /// Top-`limit` records for the world by cosine similarity.
    pub async fn search(&self, world_id: Uuid, query: &str, limit: usize) -> Vec<String> {
        let query_vec = self.embedder.embed(query).await;
        let records = self.records.lock();
        let Some(world) = records.get(&world_id) else {
            return Vec::new();
        };
        let mut scored: Vec<(f32, &MemoryRecord)> = world
            .iter()
            .filter_map(|r| {
                let embedding = r.embedding.as_ref()?;
                Some((cosine(&query_vec, embedding), r))
            })
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().take(limit).map(|(_, r)| r.text.clone()).collect()
    }

    pub fn clear_world(&self, world_id: Uuid) {
        self.records.lock().remove(&world_id);
    }

    pub fn len(&self, world_id: Uuid) -> usize {
        self.records.lock().get(&world_id).map(Vec::len).unwrap_or(0)
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    // Embeddings are normalized at creation, so the dot product is the
    // cosine.
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
#[path = "vector_tests.rs"]
mod tests;
