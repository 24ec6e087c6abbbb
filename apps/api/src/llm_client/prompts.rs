// Shared prompt constants.
// Each workload that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// Instruction appended to every prompt whose output is merged by `id`.
pub const STABLE_ID_INSTRUCTION: &str = "\
    CRITICAL: Every record MUST carry the exact `id` value given in the input or the example. \
    Never rename, renumber, or omit an `id`. Ids are matched verbatim downstream.";
