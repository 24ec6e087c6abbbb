//! Result Merger: joins generated candidates with their analyses by `id`.
//!
//! A merged record exists only for ids present on both sides. A generated id with no
//! analysis becomes a `MergeGap`; an analysis whose id was never generated is ignored.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::simulation::models::{AnalysisRecord, GenerationRecord, MergedRecord};

/// A generated record that received no analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeGap {
    pub id: String,
    pub name: String,
}

impl MergeGap {
    pub fn warning(&self) -> String {
        format!("Could not find analysis for candidate {} ({})", self.name, self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergeOutcome {
    pub merged: Vec<MergedRecord>,
    pub gaps: Vec<MergeGap>,
}

/// What a run does when the merge leaves gaps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Keep the matched subset and report gaps as warnings.
    #[default]
    Lenient,
    /// Fail the run when any generated record went unanalyzed.
    Strict,
}

impl FromStr for MergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lenient" => Ok(MergePolicy::Lenient),
            "strict" => Ok(MergePolicy::Strict),
            other => Err(format!("unknown merge policy '{other}' (expected lenient|strict)")),
        }
    }
}

/// Merges in the order of `generated`. First analysis with an equal id wins.
pub fn merge(generated: &[GenerationRecord], analyzed: &[AnalysisRecord]) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    for record in generated {
        match analyzed.iter().find(|a| a.id == record.id) {
            Some(analysis) => outcome.merged.push(merge_pair(record, analysis)),
            None => {
                let gap = MergeGap {
                    id: record.id.clone(),
                    name: record.name.clone(),
                };
                warn!("{}", gap.warning());
                outcome.gaps.push(gap);
            }
        }
    }

    for analysis in analyzed {
        if !generated.iter().any(|g| g.id == analysis.id) {
            warn!("Ignoring analysis for unknown candidate id '{}'", analysis.id);
        }
    }

    outcome
}

fn merge_pair(record: &GenerationRecord, analysis: &AnalysisRecord) -> MergedRecord {
    let mut fields = into_fields(record);
    fields.extend(into_fields(analysis));
    fields.remove("id");

    MergedRecord {
        id: record.id.clone(),
        fields,
    }
}

fn into_fields<T: Serialize>(value: &T) -> Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}
