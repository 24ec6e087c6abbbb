// Hiring Simulation workload: one job description plus a handful of synthetic candidates,
// generated in one LLM call, scored in a second, merged by candidate id.
// All LLM calls go through llm_client, no direct Anthropic calls here.

pub mod handlers;
pub mod merge;
pub mod models;
pub mod prompts;
pub mod report;
pub mod scenario;
