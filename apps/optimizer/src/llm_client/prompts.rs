// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// Default system prompt for every chat-completion call.
pub const ASSISTANT_SYSTEM: &str = "You are a helpful assistant";

/// Appended to prompts whose output is consumed verbatim by code.
pub const BARE_OUTPUT_INSTRUCTION: &str =
    "禁止在回复时在内容前后说其他任何话语（如“我明白了”等），只输出要求的内容本身。";

/// Appended to prompts that must not fabricate facts about the candidate.
pub const NO_FABRICATION_INSTRUCTION: &str =
    "严格依据给出的信息作答，不得编造简历中不存在的经历、数据或其他虚假信息。";
