// All LLM prompt constants for the Simulation module.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for scenario generation.
pub const GENERATION_SYSTEM: &str = "You are a Hiring Simulation Engine. \
    You write detailed, life-like recruitment scenarios for testing hiring workflows. \
    You MUST respond with valid JSON only, matching the requested structure exactly.";

/// Scenario generation prompt template.
/// Replace: {job_title}, {industry}, {level}, {requirements}, {candidate_count},
///          {profiles}, {detail_instruction}, {cv_field}, {output_example},
///          {reference_context}, {id_instruction}
pub const GENERATION_PROMPT_TEMPLATE: &str = r#"Generate a detailed, life-like recruitment scenario.

PARAMETERS:
- Role: {job_title}
- Industry: {industry}
- Level: {level}
- Key Reqs: {requirements}
{reference_context}
TASK:
1. Job Description (JD): Write a professional JD with Responsibilities and Requirements.
2. Create {candidate_count} distinct candidates:
{profiles}

DETAIL LEVEL:
{detail_instruction}

{id_instruction}

OUTPUT JSON STRUCTURE (the `{cv_field}` and `transcript` values are plain text with \n line breaks):
{output_example}"#;

/// Detail instruction for `SimulationDepth::Deep`.
pub const DEEP_DETAIL_INSTRUCTION: &str = "\
- CV: Do NOT summarize. Write the FULL TEXT of a resume. List companies, dates, bullet points of projects, and skills. It must look like a text-dump of a PDF.
- TRANSCRIPT: Do NOT summarize. Write a VERBATIM SCRIPT of the interview.
    - Include \"Umm\", \"Uh\", pauses, and interruptions to make it realistic.
    - The Recruiter should ask deep technical questions based on the requirements.
    - The Candidate should give long, multi-sentence answers (or struggle significantly).
    - Length: At least 20-30 exchanges per candidate.";

/// Detail instruction for `SimulationDepth::Quick`.
pub const QUICK_DETAIL_INSTRUCTION: &str = "\
- CV: A brief CV summary.
- TRANSCRIPT: A dialogue transcript of approximately 400 words per candidate.";

/// Prefix for optional reference material pulled from an uploaded document.
pub const REFERENCE_CONTEXT_HEADER: &str =
    "- Reference material supplied by the recruiter (use it to ground the JD):";

/// System prompt for candidate analysis.
pub const ANALYSIS_SYSTEM: &str = "You are a rigorous hiring analyst. \
    You score candidates strictly against the job description using the evidence in their CV and interview transcript. \
    You MUST respond with valid JSON only.";

/// Candidate analysis prompt template.
/// Replace: {candidate_count}, {job_description}, {candidates_json}, {id_instruction},
///          {output_example}
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyze these {candidate_count} candidates against the Job Description.

JOB DESCRIPTION: {job_description}

CANDIDATE DATA: {candidates_json}

TASK:
Return a JSON with detailed scoring. Every score is an integer from 0 to 10.
Produce exactly one analysis per candidate.

{id_instruction}

OUTPUT JSON:
{output_example}"#;
