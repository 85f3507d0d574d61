// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk skill catalog with an in-memory cache.
//!
//! One process-wide async lock covers both the files and the cache, so
//! after any operation returns they agree. No other component touches
//! skill files directly.

use crate::optimize::SkillOptimizer;
use golem_core::{
    parse_skill_file, render_skill_file, valid_skill_name, Clock, Signal, SignalKind, SignalSink,
    Skill,
};
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Failures tolerated before a skill is blacklisted.
pub const MAX_RETRIES: u32 = 3;

/// Days a skill may go unoptimized before heavy use re-triggers the
/// optimizer.
const OPTIMIZE_STALE_DAYS: u64 = 7;
const OPTIMIZE_USE_THRESHOLD: u64 = 10;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Codec(#[from] golem_core::SkillCodecError),
    #[error("unknown skill: {0}")]
    UnknownSkill(String),
}

/// Entry for a skill removed from the live catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlacklistEntry {
    pub skill_name: String,
    pub failure_count: u32,
    pub first_failure_ts: u64,
}

/// What `mark_failure` decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// Below the retry ceiling; skill stays live.
    Retained,
    /// Fatal error class; removed immediately.
    BlacklistedFatal,
    /// Retry ceiling reached; removed.
    BlacklistedRetries,
}

/// Hook invoked after a successful `add`, while the library lock is
/// still held. Receives the previous file bytes, if the skill existed.
pub trait AddObserver: Send + Sync {
    fn skill_added(&self, name: &str, previous: Option<&[u8]>);
}

#[derive(Debug, Clone)]
pub struct LibraryConfig {
    /// Directory holding `<name>.skill` files; `generated/` lives under it.
    pub library_dir: PathBuf,
    /// Reject missing headers / malformed metadata instead of defaulting.
    pub strict_metadata: bool,
}

struct Inner {
    cache: HashMap<String, Skill>,
    /// Recorded file path per skill; rollback asks us, never guesses.
    paths: HashMap<String, PathBuf>,
    blacklist: HashMap<String, BlacklistEntry>,
    failures: HashMap<String, u32>,
}

pub struct SkillLibrary<C: Clock> {
    config: LibraryConfig,
    clock: C,
    sink: Option<SignalSink>,
    optimizer: parking_lot::Mutex<Option<Arc<dyn SkillOptimizer>>>,
    add_observer: parking_lot::Mutex<Option<Arc<dyn AddObserver>>>,
    inner: Mutex<Inner>,
}

impl<C: Clock> SkillLibrary<C> {
    /// Open the library, creating directories and loading every skill
    /// file into the cache.
    pub async fn open(config: LibraryConfig, clock: C) -> Result<Self, LibraryError> {
        tokio::fs::create_dir_all(config.library_dir.join("generated")).await?;

        let mut cache = HashMap::new();
        let mut paths = HashMap::new();
        for dir in [config.library_dir.clone(), config.library_dir.join("generated")] {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("skill") {
                    continue;
                }
                let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(String::from)
                else {
                    continue;
                };
                let text = tokio::fs::read_to_string(&path).await?;
                match parse_skill_file(&name, &text, config.strict_metadata) {
                    Ok(skill) => {
                        cache.insert(name.clone(), skill);
                        paths.insert(name, path);
                    }
                    Err(e) => tracing::warn!(skill = %name, error = %e, "skipping unreadable skill file"),
                }
            }
        }
        tracing::info!(skills = cache.len(), "skill library loaded");

        Ok(Self {
            config,
            clock,
            sink: None,
            optimizer: parking_lot::Mutex::new(None),
            add_observer: parking_lot::Mutex::new(None),
            inner: Mutex::new(Inner {
                cache,
                paths,
                blacklist: HashMap::new(),
                failures: HashMap::new(),
            }),
        })
    }

    pub fn with_sink(mut self, sink: SignalSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn set_optimizer(&self, optimizer: Arc<dyn SkillOptimizer>) {
        *self.optimizer.lock() = Some(optimizer);
    }

    pub fn set_add_observer(&self, observer: Arc<dyn AddObserver>) {
        *self.add_observer.lock() = Some(observer);
    }

    /// Add or update a skill. Version becomes `prev + 1`; usage
    /// counters and creation time survive the update.
    pub async fn add(
        &self,
        name: &str,
        code: &str,
        description: &str,
        tags: &[String],
    ) -> Result<Skill, LibraryError> {
        if !valid_skill_name(name) {
            return Err(golem_core::SkillCodecError::InvalidName(name.to_string()).into());
        }
        let now = self.clock.epoch_ms();
        let mut inner = self.inner.lock().await;

        let mut skill = Skill::new(name, code, description, tags.iter().cloned().collect());
        match inner.cache.get(name) {
            Some(prev) => {
                skill.metadata.version = prev.metadata.version + 1;
                skill.metadata.success_count = prev.metadata.success_count;
                skill.metadata.created_at = prev.metadata.created_at;
                skill.metadata.last_optimized = prev.metadata.last_optimized;
                skill.metadata.last_used = prev.metadata.last_used;
            }
            None => skill.metadata.created_at = now,
        }

        let path = self.config.library_dir.join(format!("{name}.skill"));
        let previous = match tokio::fs::read(&path).await {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        tokio::fs::write(&path, render_skill_file(&skill)).await?;
        inner.cache.insert(name.to_string(), skill.clone());
        inner.paths.insert(name.to_string(), path);
        // A fresh version gets a fresh record.
        inner.failures.remove(name);
        inner.blacklist.remove(name);

        let observer = self.add_observer.lock().clone();
        if let Some(observer) = observer {
            observer.skill_added(name, previous.as_deref());
        }
        Ok(skill)
    }

    /// Cache read. Blacklisted skills are invisible.
    pub async fn get(&self, name: &str) -> Option<Skill> {
        let inner = self.inner.lock().await;
        if inner.blacklist.contains_key(name) {
            return None;
        }
        inner.cache.get(name).cloned()
    }

    /// Record a successful use; may schedule (never block on) an
    /// optimization pass.
    pub async fn mark_success(&self, name: &str) -> Result<(), LibraryError> {
        let now = self.clock.epoch_ms();
        let mut inner = self.inner.lock().await;
        let Some(skill) = inner.cache.get_mut(name) else {
            return Err(LibraryError::UnknownSkill(name.to_string()));
        };
        skill.metadata.success_count += 1;
        skill.metadata.last_used = Some(now);

        let stale_before = now.saturating_sub(OPTIMIZE_STALE_DAYS * 24 * 60 * 60 * 1000);
        let due = skill.metadata.success_count >= OPTIMIZE_USE_THRESHOLD
            && skill.metadata.last_optimized.map(|t| t < stale_before).unwrap_or(true);
        if due {
            // Stamp before scheduling so repeated successes don't pile
            // up optimizer runs.
            skill.metadata.last_optimized = Some(now);
        }
        let snapshot = skill.clone();
        self.persist(&mut inner, &snapshot).await?;
        drop(inner);

        if due {
            let optimizer = self.optimizer.lock().clone();
            if let Some(optimizer) = optimizer {
                let skill = snapshot;
                tokio::spawn(async move {
                    if let Err(e) = optimizer.optimize(skill).await {
                        tracing::warn!(error = %e, "skill optimization failed");
                    }
                });
            }
        }
        Ok(())
    }

    /// Record a failed use. Fatal error classes blacklist immediately;
    /// others blacklist at `MAX_RETRIES`. Emits `SkillFailed` either way.
    pub async fn mark_failure(
        &self,
        name: &str,
        error: &str,
    ) -> Result<FailureDisposition, LibraryError> {
        let now = self.clock.epoch_ms();
        let disposition = {
            let mut inner = self.inner.lock().await;
            if is_fatal_error(error) {
                Self::blacklist_entry(&mut inner, name, 1, now);
                FailureDisposition::BlacklistedFatal
            } else {
                let count = inner.failures.entry(name.to_string()).or_insert(0);
                *count += 1;
                let count = *count;
                if count >= MAX_RETRIES {
                    Self::blacklist_entry(&mut inner, name, count, now);
                    FailureDisposition::BlacklistedRetries
                } else {
                    FailureDisposition::Retained
                }
            }
        };
        if let Some(sink) = &self.sink {
            sink(Signal::new(
                SignalKind::SkillFailed,
                json!({"name": name, "error": error}),
                now,
            ));
        }
        Ok(disposition)
    }

    fn blacklist_entry(inner: &mut Inner, name: &str, failure_count: u32, now: u64) {
        inner.cache.remove(name);
        let entry = inner
            .blacklist
            .entry(name.to_string())
            .or_insert(BlacklistEntry {
                skill_name: name.to_string(),
                failure_count: 0,
                first_failure_ts: now,
            });
        entry.failure_count = entry.failure_count.max(failure_count);
        tracing::warn!(skill = name, failures = entry.failure_count, "skill blacklisted");
    }

    /// Best text-match against `name | description | tags`, ties broken
    /// by success count. Zero-score skills never match.
    pub async fn search(&self, query: &str) -> Option<Skill> {
        let inner = self.inner.lock().await;
        let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        if terms.is_empty() {
            return None;
        }
        inner
            .cache
            .values()
            .filter(|s| !inner.blacklist.contains_key(&s.name))
            .map(|s| {
                let haystack = format!(
                    "{} {} {}",
                    s.name.to_lowercase(),
                    s.description.to_lowercase(),
                    s.tags.iter().map(String::as_str).collect::<Vec<_>>().join(" ").to_lowercase(),
                );
                let score = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
                (score, s)
            })
            .filter(|(score, _)| *score > 0)
            .max_by_key(|(score, s)| (*score, s.metadata.success_count))
            .map(|(_, s)| s.clone())
    }

    /// Newline list of `- name: description (used Nx)`.
    pub async fn summary(&self) -> String {
        let inner = self.inner.lock().await;
        let mut skills: Vec<&Skill> = inner
            .cache
            .values()
            .filter(|s| !inner.blacklist.contains_key(&s.name))
            .collect();
        skills.sort_by(|a, b| a.name.cmp(&b.name));
        skills.iter().map(|s| s.summary_line()).collect::<Vec<_>>().join("\n")
    }

    /// Replace a skill's code in the `generated/` directory without
    /// bumping version history.
    pub async fn hot_swap(
        &self,
        name: &str,
        code: &str,
        description: &str,
    ) -> Result<(), LibraryError> {
        let mut inner = self.inner.lock().await;
        let Some(skill) = inner.cache.get_mut(name) else {
            return Err(LibraryError::UnknownSkill(name.to_string()));
        };
        skill.code = code.to_string();
        skill.description = description.to_string();
        skill.metadata.generated = true;
        let snapshot = skill.clone();

        let path = self.config.library_dir.join("generated").join(format!("{name}.skill"));
        tokio::fs::write(&path, render_skill_file(&snapshot)).await?;
        inner.paths.insert(name.to_string(), path);
        Ok(())
    }

    pub async fn is_blacklisted(&self, name: &str) -> bool {
        self.inner.lock().await.blacklist.contains_key(name)
    }

    pub async fn clear_blacklist(&self, name: &str) {
        let mut inner = self.inner.lock().await;
        inner.blacklist.remove(name);
        inner.failures.remove(name);
    }

    /// The file path recorded for a skill, for the rollback manager.
    pub async fn recorded_path(&self, name: &str) -> Option<PathBuf> {
        self.inner.lock().await.paths.get(name).cloned()
    }

    /// Overwrite a skill file with backup bytes and refresh the cache.
    /// Only the rollback manager calls this.
    pub async fn restore(&self, name: &str, bytes: &[u8]) -> Result<(), LibraryError> {
        let mut inner = self.inner.lock().await;
        let path = inner
            .paths
            .get(name)
            .cloned()
            .ok_or_else(|| LibraryError::UnknownSkill(name.to_string()))?;
        tokio::fs::write(&path, bytes).await?;
        let text = String::from_utf8_lossy(bytes).to_string();
        let skill = parse_skill_file(name, &text, self.config.strict_metadata)?;
        inner.cache.insert(name.to_string(), skill);
        inner.failures.remove(name);
        Ok(())
    }

    /// Non-blacklisted skills, for context assembly.
    pub async fn catalog(&self) -> Vec<Skill> {
        let inner = self.inner.lock().await;
        inner
            .cache
            .values()
            .filter(|s| !inner.blacklist.contains_key(&s.name))
            .cloned()
            .collect()
    }

    async fn persist(&self, inner: &mut Inner, skill: &Skill) -> Result<(), LibraryError> {
        let path = inner
            .paths
            .get(&skill.name)
            .cloned()
            .unwrap_or_else(|| self.config.library_dir.join(format!("{}.skill", skill.name)));
        tokio::fs::write(&path, render_skill_file(skill)).await?;
        inner.paths.insert(skill.name.clone(), path);
        Ok(())
    }
}

/// Reference/syntax/type errors mean the code itself is broken; no
/// amount of retrying fixes that.
fn is_fatal_error(error: &str) -> bool {
    const FATAL_MARKERS: [&str; 5] =
        ["referenceerror", "syntaxerror", "typeerror", "not defined", "unexpected token"];
    let lowered = error.to_lowercase();
    FATAL_MARKERS.iter().any(|m| lowered.contains(m))
}

/// Visible for the rollback manager's default layout.
pub(crate) fn backup_file(backups_dir: &Path, name: &str) -> PathBuf {
    backups_dir.join(format!("{name}.bak"))
}

#[cfg(test)]
#[path = "library_tests.rs"]
mod tests;
