//! Records produced and consumed by the simulation stages.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::structured::validate::ensure_unique_ids;
use crate::structured::StructuredOutput;

/// Upper bound for every analysis score.
pub const MAX_SCORE: u8 = 10;

// ────────────────────────────────────────────────────────────────────────────
// Request
// ────────────────────────────────────────────────────────────────────────────

/// How much material the generation stage should write per candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationDepth {
    /// Two candidates with full CV text and verbatim transcripts.
    #[default]
    Deep,
    /// Three candidates with CV summaries and short transcripts.
    Quick,
}

/// A candidate archetype the generation prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateProfile {
    pub id: &'static str,
    pub vibe: &'static str,
    pub brief: &'static str,
}

impl SimulationDepth {
    pub fn profiles(self) -> &'static [CandidateProfile] {
        match self {
            SimulationDepth::Deep => &[
                CandidateProfile {
                    id: "A",
                    vibe: "Strong Match",
                    brief: "The Strong Fit: competent, good communicator, clear experience.",
                },
                CandidateProfile {
                    id: "B",
                    vibe: "Risky / Weak",
                    brief: "The Risk/Bad Fit: maybe nervous, maybe lying, maybe technical but rude, or lacking specific key skills.",
                },
            ],
            SimulationDepth::Quick => &[
                CandidateProfile {
                    id: "A",
                    vibe: "The Unicorn",
                    brief: "High skills, great culture fit.",
                },
                CandidateProfile {
                    id: "B",
                    vibe: "The Stretch",
                    brief: "Good attitude, missing some key tech skills.",
                },
                CandidateProfile {
                    id: "C",
                    vibe: "The Red Flag",
                    brief: "Good paper resume, but arrogant/evasive in interview.",
                },
            ],
        }
    }

    /// Name of the CV attribute the generation stage writes.
    pub fn cv_field(self) -> &'static str {
        match self {
            SimulationDepth::Deep => "cv_text",
            SimulationDepth::Quick => "cv_summary",
        }
    }

    pub fn generation_max_tokens(self) -> u32 {
        match self {
            SimulationDepth::Deep => 8000,
            SimulationDepth::Quick => 4000,
        }
    }
}

fn default_level() -> String {
    "Senior/Lead".to_string()
}

/// Request body for one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub job_title: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub depth: SimulationDepth,
}

impl SimulationRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.job_title.trim().is_empty() {
            return Err("job_title cannot be empty".to_string());
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Generation stage output
// ────────────────────────────────────────────────────────────────────────────

/// A generated candidate. Everything beyond `id` and `name` is free-form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl GenerationRecord {
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedScenario {
    pub job_description: String,
    pub candidates: Vec<GenerationRecord>,
}

impl StructuredOutput for GeneratedScenario {
    const STAGE: &'static str = "generation";

    fn check(&self) -> Result<(), String> {
        if self.job_description.trim().is_empty() {
            return Err("job_description is empty".to_string());
        }
        if self.candidates.is_empty() {
            return Err("no candidates generated".to_string());
        }
        ensure_unique_ids(self.candidates.iter().map(|c| c.id.as_str()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Analysis stage output
// ────────────────────────────────────────────────────────────────────────────

/// Integer scores, each 0 – 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub role_fit_score: u8,
    pub comm_score: u8,
    pub tech_score: u8,
    pub culture_score: u8,
}

impl ScoreCard {
    pub fn named(&self) -> [(&'static str, u8); 4] {
        [
            ("role_fit_score", self.role_fit_score),
            ("comm_score", self.comm_score),
            ("tech_score", self.tech_score),
            ("culture_score", self.culture_score),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: String,
    #[serde(flatten)]
    pub scores: ScoreCard,
    pub verdict: String,
    pub reasoning: String,
    /// Anything else the analyst returned, e.g. red flags or follow-up questions.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisBatch {
    pub analyses: Vec<AnalysisRecord>,
}

impl StructuredOutput for AnalysisBatch {
    const STAGE: &'static str = "analysis";

    // Repeated ids are tolerated here: the merger takes the first.
    fn check(&self) -> Result<(), String> {
        for analysis in &self.analyses {
            if analysis.id.trim().is_empty() {
                return Err("analysis with blank id".to_string());
            }
            for (name, score) in analysis.scores.named() {
                if score > MAX_SCORE {
                    return Err(format!(
                        "{name} for '{}' is {score}, expected 0-{MAX_SCORE}",
                        analysis.id
                    ));
                }
            }
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Merged output
// ────────────────────────────────────────────────────────────────────────────

/// Union of a generated candidate and its analysis. Analysis fields win on collision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl MergedRecord {
    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn score(&self, key: &str) -> Option<u8> {
        self.fields
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|s| u8::try_from(s).ok())
    }

    pub fn name(&self) -> &str {
        self.text("name").unwrap_or(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structured::extract_and_validate;

    const DEEP_SCENARIO: &str = r#"```json
    {
        "job_description": "Senior Infrastructure Engineer. Responsibilities: ...",
        "candidates": [
            {"id": "A", "name": "Dana Reyes", "vibe": "Strong Match", "cv_text": "EXPERIENCE...", "transcript": "Recruiter: Hi"},
            {"id": "B", "name": "Sam Okafor", "vibe": "Risky / Weak", "cv_text": "...", "transcript": "..."}
        ]
    }
    ```"#;

    #[test]
    fn test_scenario_keeps_free_form_attributes() {
        let scenario: GeneratedScenario = extract_and_validate(DEEP_SCENARIO).unwrap();
        assert_eq!(scenario.candidates.len(), 2);
        let a = &scenario.candidates[0];
        assert_eq!(a.id, "A");
        assert_eq!(a.name, "Dana Reyes");
        assert_eq!(a.attribute_str("vibe"), Some("Strong Match"));
        assert_eq!(a.attribute_str("cv_text"), Some("EXPERIENCE..."));
        assert!(!a.attributes.contains_key("id"));
    }

    #[test]
    fn test_candidate_without_id_is_rejected() {
        let raw = r#"{"job_description": "JD", "candidates": [{"name": "No Id"}]}"#;
        let err = extract_and_validate::<GeneratedScenario>(raw).unwrap_err();
        assert_eq!(err.stage, "generation");
        assert!(err.reason.contains("id"), "{}", err.reason);
    }

    #[test]
    fn test_duplicate_candidate_ids_rejected() {
        let raw = r#"{"job_description": "JD", "candidates": [
            {"id": "A", "name": "One"}, {"id": "A", "name": "Two"}
        ]}"#;
        let err = extract_and_validate::<GeneratedScenario>(raw).unwrap_err();
        assert_eq!(err.reason, "duplicate id 'A'");
    }

    #[test]
    fn test_empty_candidate_list_rejected() {
        let raw = r#"{"job_description": "JD", "candidates": []}"#;
        assert!(extract_and_validate::<GeneratedScenario>(raw).is_err());
    }

    #[test]
    fn test_analysis_parses_flat_scores() {
        let raw = r#"{"analyses": [{
            "id": "A", "role_fit_score": 9, "comm_score": 8, "tech_score": 9,
            "culture_score": 7, "verdict": "Strong Hire", "reasoning": "Solid."
        }]}"#;
        let batch: AnalysisBatch = extract_and_validate(raw).unwrap();
        assert_eq!(batch.analyses[0].scores.comm_score, 8);
        assert_eq!(batch.analyses[0].verdict, "Strong Hire");
    }

    #[test]
    fn test_analysis_keeps_unmodelled_fields() {
        let raw = r#"{"analyses": [{
            "id": "A", "role_fit_score": 9, "comm_score": 8, "tech_score": 9,
            "culture_score": 7, "verdict": "Hire", "reasoning": "Solid.",
            "red_flags": ["short tenure"]
        }]}"#;
        let batch: AnalysisBatch = extract_and_validate(raw).unwrap();
        let extra = &batch.analyses[0].extra;
        assert_eq!(extra.len(), 1);
        assert_eq!(extra["red_flags"][0], "short tenure");
    }

    #[test]
    fn test_analysis_score_out_of_range_rejected() {
        let raw = r#"{"analyses": [{
            "id": "A", "role_fit_score": 11, "comm_score": 8, "tech_score": 9,
            "culture_score": 7, "verdict": "Strong Hire", "reasoning": "Solid."
        }]}"#;
        let err = extract_and_validate::<AnalysisBatch>(raw).unwrap_err();
        assert_eq!(err.stage, "analysis");
        assert!(err.reason.contains("role_fit_score"), "{}", err.reason);
    }

    #[test]
    fn test_analysis_missing_score_rejected() {
        let raw = r#"{"analyses": [{
            "id": "A", "role_fit_score": 5, "comm_score": 8, "tech_score": 9,
            "verdict": "Hire", "reasoning": "..."
        }]}"#;
        assert!(extract_and_validate::<AnalysisBatch>(raw).is_err());
    }

    #[test]
    fn test_request_defaults() {
        let request: SimulationRequest =
            serde_json::from_str(r#"{"job_title": "Senior Infrastructure Engineer"}"#).unwrap();
        assert_eq!(request.level, "Senior/Lead");
        assert_eq!(request.depth, SimulationDepth::Deep);
        assert!(request.requirements.is_none());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_blank_job_title_invalid() {
        let request: SimulationRequest =
            serde_json::from_str(r#"{"job_title": "  ", "depth": "quick"}"#).unwrap();
        assert_eq!(request.depth, SimulationDepth::Quick);
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_depth_profiles() {
        assert_eq!(SimulationDepth::Deep.profiles().len(), 2);
        assert_eq!(SimulationDepth::Quick.profiles().len(), 3);
        assert_eq!(SimulationDepth::Quick.cv_field(), "cv_summary");
        assert_eq!(SimulationDepth::Deep.generation_max_tokens(), 8000);
    }
}
