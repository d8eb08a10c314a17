// System prompts that are not specific to one feature.
// Feature modules keep their own prompts.rs alongside them.

/// System prompt for plain-text answers with no decoration.
pub const PLAIN_TEXT_SYSTEM: &str = "You are an experienced technical interviewer. \
    Respond with plain text only. \
    Do NOT use markdown, numbering, quotation marks, or any preamble.";
