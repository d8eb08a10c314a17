// Interview core: question generation, answer evaluation, score aggregation.
// All completion calls go through llm_client::CompletionService.

pub mod aggregator;
pub mod evaluator;
pub mod prompts;
pub mod question_generator;

pub use aggregator::aggregate;
pub use evaluator::{
    fallback_evaluation, parse_evaluation, EvaluationContext, EvaluationPipeline,
    EvaluationProgress, ParseOutcome,
};
pub use question_generator::QuestionGenerator;

/// Truncates to at most `limit` characters, appending "..." when anything was cut.
/// Counts chars, not bytes, so multi-byte text never splits mid-codepoint.
pub(crate) fn truncate_chars(text: &str, limit: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => format!("{}...", text[..byte_idx].trim_end()),
        None => text.to_string(),
    }
}
