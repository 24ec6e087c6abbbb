//! Prompt builders for the two LLM stages of a simulation.

use serde_json::json;

use crate::llm_client::prompts::STABLE_ID_INSTRUCTION;
use crate::simulation::models::{GeneratedScenario, SimulationDepth, SimulationRequest};
use crate::simulation::prompts::{
    ANALYSIS_PROMPT_TEMPLATE, DEEP_DETAIL_INSTRUCTION, GENERATION_PROMPT_TEMPLATE,
    QUICK_DETAIL_INSTRUCTION, REFERENCE_CONTEXT_HEADER,
};

/// The analysis prompt only sees the head of the job description.
pub const JD_PROMPT_CHARS: usize = 2000;
/// Reference material beyond this many characters is dropped from the generation prompt.
pub const REFERENCE_PROMPT_CHARS: usize = 6000;

/// Builds the generation prompt. `reference` is text from the extraction collaborator, if any.
pub fn build_generation_prompt(request: &SimulationRequest, reference: Option<&str>) -> String {
    let depth = request.depth;
    let profiles = depth.profiles();

    let profile_lines = profiles
        .iter()
        .map(|p| format!("   - Candidate {} ({}): {}", p.id, p.vibe, p.brief))
        .collect::<Vec<_>>()
        .join("\n");

    let example_candidates = profiles
        .iter()
        .map(|p| {
            json!({
                "id": p.id,
                "name": "Name",
                "vibe": p.vibe,
                depth.cv_field(): "...",
                "transcript": "Recruiter: ...\nCandidate: ...",
            })
        })
        .collect::<Vec<_>>();
    let output_example = serde_json::to_string_pretty(&json!({
        "job_description": "Full JD text...",
        "candidates": example_candidates,
    }))
    .unwrap_or_default();

    let reference_context = reference
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| {
            format!(
                "{REFERENCE_CONTEXT_HEADER}\n\"\"\"\n{}\n\"\"\"\n",
                truncate_chars(text, REFERENCE_PROMPT_CHARS)
            )
        })
        .unwrap_or_default();

    let detail_instruction = match depth {
        SimulationDepth::Deep => DEEP_DETAIL_INSTRUCTION,
        SimulationDepth::Quick => QUICK_DETAIL_INSTRUCTION,
    };

    // Structural slots first, recruiter-supplied text last.
    GENERATION_PROMPT_TEMPLATE
        .replace("{candidate_count}", &profiles.len().to_string())
        .replace("{profiles}", &profile_lines)
        .replace("{detail_instruction}", detail_instruction)
        .replace("{id_instruction}", STABLE_ID_INSTRUCTION)
        .replace("{cv_field}", depth.cv_field())
        .replace("{output_example}", &output_example)
        .replace("{level}", non_empty_or(&request.level, "Unspecified"))
        .replace("{industry}", non_empty_or(&request.industry, "Unspecified"))
        .replace(
            "{requirements}",
            non_empty_or(request.requirements.as_deref().unwrap_or(""), "None specified"),
        )
        .replace("{job_title}", request.job_title.trim())
        .replace("{reference_context}", &reference_context)
}

/// Builds the analysis prompt from a validated scenario.
pub fn build_analysis_prompt(scenario: &GeneratedScenario) -> String {
    let candidates_json = serde_json::to_string(&scenario.candidates).unwrap_or_default();

    let example = scenario
        .candidates
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "role_fit_score": 0,
                "comm_score": 0,
                "tech_score": 0,
                "culture_score": 0,
                "verdict": "Strong Hire | Hire | No Hire",
                "reasoning": "...",
            })
        })
        .collect::<Vec<_>>();
    let output_example =
        serde_json::to_string_pretty(&json!({ "analyses": example })).unwrap_or_default();

    ANALYSIS_PROMPT_TEMPLATE
        .replace("{candidate_count}", &scenario.candidates.len().to_string())
        .replace(
            "{job_description}",
            truncate_chars(&scenario.job_description, JD_PROMPT_CHARS),
        )
        .replace("{id_instruction}", STABLE_ID_INSTRUCTION)
        .replace("{output_example}", &output_example)
        // Last: candidate text may itself contain brace placeholders.
        .replace("{candidates_json}", &candidates_json)
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    let value = value.trim();
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

/// First `max` characters of `text`, cut on a char boundary.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::models::GenerationRecord;
    use serde_json::Map;

    fn request(depth: SimulationDepth) -> SimulationRequest {
        SimulationRequest {
            job_title: "Senior Infrastructure Engineer".to_string(),
            industry: "Enterprise IT".to_string(),
            level: "Senior/Lead".to_string(),
            requirements: Some("Quest Migration, Active Directory, VMware".to_string()),
            depth,
        }
    }

    fn candidate(id: &str, name: &str) -> GenerationRecord {
        let mut attributes = Map::new();
        attributes.insert("vibe".to_string(), "Strong Match".into());
        GenerationRecord {
            id: id.to_string(),
            name: name.to_string(),
            attributes,
        }
    }

    #[test]
    fn test_generation_prompt_fills_every_placeholder() {
        let prompt = build_generation_prompt(&request(SimulationDepth::Deep), None);
        assert!(prompt.contains("Role: Senior Infrastructure Engineer"));
        assert!(prompt.contains("Key Reqs: Quest Migration"));
        assert!(prompt.contains("VERBATIM SCRIPT"));
        assert!(prompt.contains("\"cv_text\""));
        for placeholder in ["{job_title}", "{profiles}", "{output_example}", "{cv_field}"] {
            assert!(!prompt.contains(placeholder), "{placeholder} left in prompt");
        }
    }

    #[test]
    fn test_quick_depth_asks_for_three_candidates() {
        let prompt = build_generation_prompt(&request(SimulationDepth::Quick), None);
        assert!(prompt.contains("Create 3 distinct candidates"));
        assert!(prompt.contains("The Red Flag"));
        assert!(prompt.contains("\"cv_summary\""));
    }

    #[test]
    fn test_reference_context_included_only_when_present() {
        let without = build_generation_prompt(&request(SimulationDepth::Deep), Some("   "));
        assert!(!without.contains(REFERENCE_CONTEXT_HEADER));

        let with = build_generation_prompt(
            &request(SimulationDepth::Deep),
            Some("Must hold a security clearance."),
        );
        assert!(with.contains(REFERENCE_CONTEXT_HEADER));
        assert!(with.contains("Must hold a security clearance."));
    }

    #[test]
    fn test_missing_requirements_fallback() {
        let mut req = request(SimulationDepth::Deep);
        req.requirements = None;
        let prompt = build_generation_prompt(&req, None);
        assert!(prompt.contains("Key Reqs: None specified"));
    }

    #[test]
    fn test_analysis_prompt_truncates_job_description() {
        let scenario = GeneratedScenario {
            job_description: "x".repeat(JD_PROMPT_CHARS + 500),
            candidates: vec![candidate("A", "Dana"), candidate("B", "Sam")],
        };
        let prompt = build_analysis_prompt(&scenario);
        assert!(prompt.contains(&"x".repeat(JD_PROMPT_CHARS)));
        assert!(!prompt.contains(&"x".repeat(JD_PROMPT_CHARS + 1)));
        assert!(prompt.contains("Analyze these 2 candidates"));
        assert!(prompt.contains("\"name\":\"Dana\""));
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
