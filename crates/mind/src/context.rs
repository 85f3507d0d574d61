// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Strategic context assembly for planning requests.
//!
//! Sections in order: tools, strategy, reflexes, memory snapshot. The
//! bundle never exceeds its word budget; truncation is leaf-first, so
//! the tools list shrinks before anything strategic is touched.

/// Health at or below which the agent is considered under stress:
/// fewer tools, no memory snapshot.
const STRESS_HEALTH: f64 = 10.0;

const TOP_SKILLS: usize = 10;
const TOP_SKILLS_STRESSED: usize = 3;

#[derive(Debug, Clone)]
pub struct SkillEntry {
    pub name: String,
    pub description: String,
    pub success_count: u64,
    /// Trials-weighted rate when the rollback manager knows one.
    pub success_rate: Option<f64>,
}

impl SkillEntry {
    fn render(&self) -> String {
        match self.success_rate {
            Some(rate) => format!(
                "- {}: {} ({:.0}% success, used {}x)",
                self.name,
                self.description,
                rate * 100.0,
                self.success_count
            ),
            None => format!("- {}: {} (used {}x)", self.name, self.description, self.success_count),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StrategyInfo {
    pub id: String,
    pub step: String,
}

#[derive(Debug, Clone, Default)]
pub struct BotStatus {
    pub health: f64,
    pub death_count: u32,
    pub known_locations: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ContextInputs {
    pub query: String,
    /// Primitive action list; always present.
    pub primitives: Vec<String>,
    pub skills: Vec<SkillEntry>,
    pub strategy: Option<StrategyInfo>,
    pub reflexes: Vec<String>,
    pub status: BotStatus,
    /// Soft word budget derived from the model context window.
    pub word_budget: usize,
}

/// The assembled bundle handed to the brain.
#[derive(Debug, Clone)]
pub struct ContextBundle {
    pub query: String,
    pub text: String,
}

impl ContextInputs {
    pub fn assemble(self) -> ContextBundle {
        let stressed = self.status.health <= STRESS_HEALTH;
        let top_k = if stressed { TOP_SKILLS_STRESSED } else { TOP_SKILLS };

        let mut skills = self.matched_skills();
        skills.truncate(top_k);

        let mut sections = Sections::default();
        sections.tools_primitives = self.primitives.clone();
        sections.tools_skills = skills.iter().map(SkillEntry::render).collect();
        sections.strategy = self
            .strategy
            .as_ref()
            .map(|s| format!("Active strategy: {} (step: {})", s.id, s.step));
        sections.reflexes = self.reflexes.clone();
        if !stressed {
            sections.memory = Some(self.memory_snapshot());
        }

        sections.fit(self.word_budget);
        ContextBundle { query: self.query, text: sections.render() }
    }

    /// Skills whose name/description matches the query, best first.
    fn matched_skills(&self) -> Vec<SkillEntry> {
        let terms: Vec<String> =
            self.query.split_whitespace().map(str::to_lowercase).collect();
        let mut scored: Vec<(usize, &SkillEntry)> = self
            .skills
            .iter()
            .map(|s| {
                let haystack = format!("{} {}", s.name, s.description).to_lowercase();
                let score = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
                (score, s)
            })
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| {
            b.0.cmp(&a.0).then(b.1.success_count.cmp(&a.1.success_count))
        });
        scored.into_iter().map(|(_, s)| s.clone()).collect()
    }

    fn memory_snapshot(&self) -> String {
        let mut lines = vec![format!("Deaths so far: {}", self.status.death_count)];
        if !self.status.known_locations.is_empty() {
            lines.push(format!("Known locations: {}", self.status.known_locations.join("; ")));
        }
        lines.join("\n")
    }
}

#[derive(Default)]
struct Sections {
    tools_primitives: Vec<String>,
    tools_skills: Vec<String>,
    strategy: Option<String>,
    reflexes: Vec<String>,
    memory: Option<String>,
}

impl Sections {
    fn word_count(&self) -> usize {
        self.render().split_whitespace().count()
    }

    /// Trim leaves until the bundle fits: learned-skill lines first,
    /// then reflexes, then the memory snapshot, then primitives. The
    /// strategy line is never dropped.
    fn fit(&mut self, budget: usize) {
        if budget == 0 {
            return;
        }
        while self.word_count() > budget {
            if self.tools_skills.pop().is_some() {
                continue;
            }
            if self.reflexes.pop().is_some() {
                continue;
            }
            if self.memory.take().is_some() {
                continue;
            }
            if self.tools_primitives.pop().is_some() {
                continue;
            }
            break;
        }
    }

    fn render(&self) -> String {
        let mut out = String::from("## Tools\n");
        for p in &self.tools_primitives {
            out.push_str("- ");
            out.push_str(p);
            out.push('\n');
        }
        for s in &self.tools_skills {
            out.push_str(s);
            out.push('\n');
        }
        if let Some(strategy) = &self.strategy {
            out.push_str("\n## Strategy\n");
            out.push_str(strategy);
            out.push('\n');
        }
        if !self.reflexes.is_empty() {
            out.push_str("\n## Reflexes\n");
            for r in &self.reflexes {
                out.push_str("- ");
                out.push_str(r);
                out.push('\n');
            }
        }
        if let Some(memory) = &self.memory {
            out.push_str("\n## Memory\n");
            out.push_str(memory);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
