// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Skill model and the annotated on-disk header codec.
//!
//! A skill file is UTF-8: a leading `/** ... */` block carrying
//! `@description`, `@tags` and `@metadata` lines, then the body.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SkillCodecError {
    #[error("invalid skill name {0:?}: must be a filesystem-safe identifier")]
    InvalidName(String),
    #[error("missing header block in skill {0:?}")]
    MissingHeader(String),
    #[error("malformed @metadata JSON in skill {name:?}: {source}")]
    Metadata {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Metadata persisted in the `@metadata` header line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillMetadata {
    pub success_count: u64,
    pub created_at: u64,
    pub last_optimized: Option<u64>,
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<u64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub generated: bool,
}

impl Default for SkillMetadata {
    fn default() -> Self {
        Self {
            success_count: 0,
            created_at: 0,
            last_optimized: None,
            version: 1,
            last_used: None,
            generated: false,
        }
    }
}

/// A stored unit of code implementing a game-level capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    pub code: String,
    pub description: String,
    pub tags: BTreeSet<String>,
    pub metadata: SkillMetadata,
}

impl Skill {
    pub fn new(name: &str, code: &str, description: &str, tags: BTreeSet<String>) -> Self {
        Self {
            name: name.to_string(),
            code: code.to_string(),
            description: description.to_string(),
            tags,
            metadata: SkillMetadata::default(),
        }
    }

    /// One catalog line: `- name: description (used Nx)`.
    pub fn summary_line(&self) -> String {
        format!(
            "- {}: {} (used {}x)",
            self.name, self.description, self.metadata.success_count
        )
    }
}

/// Skill names become file names, so only a conservative identifier
/// alphabet is accepted.
pub fn valid_skill_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Render a skill to its on-disk form.
pub fn render_skill_file(skill: &Skill) -> String {
    let tags: Vec<&str> = skill.tags.iter().map(String::as_str).collect();
    let metadata = serde_json::to_string(&skill.metadata).unwrap_or_else(|_| "{}".to_string());
    format!(
        "/**\n * @description {}\n * @tags {}\n * @metadata {}\n */\n{}\n",
        skill.description,
        tags.join(","),
        metadata,
        skill.code.trim_end(),
    )
}

/// Parse a skill file.
///
/// Missing header lines default; malformed metadata JSON warns and
/// continues. `strict` (debug builds of the pipeline) turns both into
/// hard errors.
pub fn parse_skill_file(
    name: &str,
    text: &str,
    strict: bool,
) -> Result<Skill, SkillCodecError> {
    if !valid_skill_name(name) {
        return Err(SkillCodecError::InvalidName(name.to_string()));
    }

    let trimmed = text.trim_start();
    let (header, body) = match extract_header(trimmed) {
        Some(parts) => parts,
        None if strict => return Err(SkillCodecError::MissingHeader(name.to_string())),
        None => ("", trimmed),
    };

    let mut description = String::new();
    let mut tags = BTreeSet::new();
    let mut metadata = SkillMetadata::default();

    for line in header.lines() {
        let line = line.trim_start_matches([' ', '*']).trim();
        if let Some(rest) = line.strip_prefix("@description ") {
            description = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("@tags ") {
            tags = rest
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
        } else if let Some(rest) = line.strip_prefix("@metadata ") {
            match serde_json::from_str::<SkillMetadata>(rest.trim()) {
                Ok(parsed) => metadata = parsed,
                Err(source) if strict => {
                    return Err(SkillCodecError::Metadata { name: name.to_string(), source })
                }
                Err(source) => {
                    tracing::warn!(skill = name, error = %source, "malformed @metadata, using defaults");
                }
            }
        }
    }

    Ok(Skill {
        name: name.to_string(),
        code: body.trim_start_matches('\n').trim_end().to_string(),
        description,
        tags,
        metadata,
    })
}

/// Split a leading `/** ... */` block from the body.
fn extract_header(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix("/**")?;
    let end = rest.find("*/")?;
    Some((&rest[..end], &rest[end + 2..]))
}

#[cfg(test)]
#[path = "skill_tests.rs"]
mod tests;
