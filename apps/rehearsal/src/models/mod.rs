pub mod evaluation;
pub mod record;
pub mod session;

pub use evaluation::{
    AggregateReport, Category, CategoryAverages, CategoryScores, Evaluation, EvaluationSource,
};
pub use record::{InterviewRecord, RecordEntry};
pub use session::{
    InterviewRequest, InterviewSession, QuestionResponse, QuestionType, SessionStatus,
    QUESTION_COUNT,
};
