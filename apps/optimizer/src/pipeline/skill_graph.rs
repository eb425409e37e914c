//! Job-title → skill lookup over an exported knowledge-graph snapshot.
//!
//! The snapshot maps each job title to the raw requirement strings attached to it
//! in the graph; each string is a comma-separated list of skills. Ranking:
//! 1. split every string on `,` and count occurrences of each skill
//! 2. pick a minimum count at a quantile of the sorted counts; the larger the
//!    vocabulary, the higher the quantile (40% below 20 skills up to 95% at 400+)
//! 3. keep skills at or above that count, most frequent first

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::pipeline::{BranchError, SkillGraph};

#[derive(Debug, Default)]
pub struct SnapshotSkillGraph {
    jobs: HashMap<String, Vec<String>>,
}

impl SnapshotSkillGraph {
    pub fn from_json(json: &str) -> Result<Self, BranchError> {
        Ok(Self {
            jobs: serde_json::from_str(json)?,
        })
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, BranchError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await?;
        let graph = Self::from_json(&json)?;
        info!(
            "Loaded skill graph snapshot from {} ({} jobs)",
            path.display(),
            graph.jobs.len()
        );
        Ok(graph)
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }
}

#[async_trait]
impl SkillGraph for SnapshotSkillGraph {
    async fn skills_for(&self, job_name: &str) -> Result<Vec<String>, BranchError> {
        match self.jobs.get(job_name.trim()) {
            Some(requirements) => Ok(rank_skills(requirements)),
            None => {
                info!("No skills recorded for job '{job_name}'");
                Ok(Vec::new())
            }
        }
    }
}

/// Percentage of the ascending count list at which the minimum count is read.
fn quantile_percent(distinct: usize) -> usize {
    match distinct {
        0..=19 => 40,
        20..=49 => 60,
        50..=99 => 70,
        100..=199 => 80,
        200..=399 => 90,
        _ => 95,
    }
}

pub fn rank_skills(requirements: &[String]) -> Vec<String> {
    // First-seen order is kept so equal counts rank deterministically.
    let mut counted: Vec<(String, usize)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for skill in requirements
        .iter()
        .flat_map(|group| group.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        match positions.get(skill) {
            Some(&i) => counted[i].1 += 1,
            None => {
                positions.insert(skill.to_string(), counted.len());
                counted.push((skill.to_string(), 1));
            }
        }
    }

    if counted.is_empty() {
        return Vec::new();
    }

    let mut counts: Vec<usize> = counted.iter().map(|(_, c)| *c).collect();
    counts.sort_unstable();
    let index = counts.len() * quantile_percent(counts.len()) / 100;
    let threshold = counts.get(index).copied().unwrap_or(counts[counts.len() - 1]);
    debug!(
        "Ranking {} distinct skills, quantile index {index}, minimum count {threshold}",
        counts.len()
    );

    let mut kept: Vec<(String, usize)> = counted
        .into_iter()
        .filter(|(_, c)| *c >= threshold)
        .collect();
    kept.sort_by(|a, b| b.1.cmp(&a.1));
    kept.into_iter().map(|(skill, _)| skill).collect()
}
