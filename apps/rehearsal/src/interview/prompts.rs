// Prompt constants for question generation and answer evaluation.
// Reuses cross-cutting fragments from llm_client::prompts.

/// Question generation template.
/// Replace: {question_type}, {type_guidance}, {job_role}, {experience_level},
///          {job_description}, {resume_section}
pub const QUESTION_PROMPT_TEMPLATE: &str = r#"Act as a technical interviewer. Generate one {question_type} question for a {job_role} position.

Experience level: {experience_level}
Job description: {job_description}
{resume_section}
QUESTION GUIDANCE:
{type_guidance}

Return only the question text. Keep it clean and simple without any formatting or additional text."#;

pub const INTRODUCTION_GUIDANCE: &str =
    "Open the interview. Ask the candidate to introduce themselves in a way that connects their background to this role.";

pub const APTITUDE_GUIDANCE: &str =
    "Ask a reasoning or estimation question that can be answered verbally in a few minutes, without specialist knowledge.";

pub const TECHNICAL_GUIDANCE: &str =
    "Ask a conceptual question about a technology, tool, or practice named in the job description, calibrated to the experience level.";

pub const CODING_GUIDANCE: &str =
    "Ask for a small, self-contained function the candidate can write in a code editor within five minutes. State inputs and expected output.";

/// System prompt for answer evaluation; enforces JSON-only output.
pub const EVALUATION_SYSTEM: &str = "You are a demanding interviewer scoring a single interview answer. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Answer evaluation template.
/// Replace: {job_role}, {experience_level}, {question_type}, {question}, {answer},
///          {code_section}, {code_score_field}, {code_flaws_field}
pub const EVALUATION_PROMPT_TEMPLATE: &str = r#"{job_role} ({experience_level}) interview, {question_type} question.
Q: {question}
A: {answer}
{code_section}
Score the answer strictly. Return a JSON object with this EXACT schema:
{
  "scores": {
    "technical": <integer 0-100>,
    "communication": <integer 0-100>,
    "problem_solving": <integer 0-100>{code_score_field}
  },
  "review": {
    "strengths": ["short strength"],
    "technical_flaws": ["short flaw"],
    "communication_flaws": ["short flaw"],
    "problem_solving_flaws": ["short flaw"],{code_flaws_field}
    "verdict": "one-sentence verdict"
  }
}

Keep every list to at most 2 entries of under 12 words each."#;

pub const CODE_SCORE_FIELD: &str = ",\n    \"code_quality\": <integer 0-100>";

pub const CODE_FLAWS_FIELD: &str = "\n    \"code_flaws\": [\"short flaw\"],";
