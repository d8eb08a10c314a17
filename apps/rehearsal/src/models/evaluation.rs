use serde::{Deserialize, Serialize};

/// Scoring dimension of an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Technical,
    Communication,
    ProblemSolving,
    CodeQuality,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Technical,
        Category::Communication,
        Category::ProblemSolving,
        Category::CodeQuality,
    ];

    /// Fixed weight in the overall score. Weights sum to 1.0 and are never renormalized.
    pub fn weight(&self) -> f64 {
        match self {
            Category::Technical => 0.35,
            Category::Communication => 0.25,
            Category::ProblemSolving => 0.25,
            Category::CodeQuality => 0.15,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Technical => "Technical",
            Category::Communication => "Communication",
            Category::ProblemSolving => "Problem Solving",
            Category::CodeQuality => "Code Quality",
        }
    }
}

/// Per-answer scores, each in 0..=100. `code_quality` is set only for answers with code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryScores {
    pub technical: u32,
    pub communication: u32,
    pub problem_solving: u32,
    pub code_quality: Option<u32>,
}

impl CategoryScores {
    pub fn get(&self, category: Category) -> Option<u32> {
        match category {
            Category::Technical => Some(self.technical),
            Category::Communication => Some(self.communication),
            Category::ProblemSolving => Some(self.problem_solving),
            Category::CodeQuality => self.code_quality,
        }
    }
}

/// Where an evaluation came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvaluationSource {
    Model,
    Fallback { reason: String },
}

/// Scored judgment of a single answered question. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub scores: CategoryScores,
    pub strengths: Vec<String>,
    /// Ordered technical, communication, problem solving, then code flaws.
    pub weaknesses: Vec<String>,
    pub narrative_feedback: String,
    pub source: EvaluationSource,
}

impl Evaluation {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, EvaluationSource::Fallback { .. })
    }
}

/// Mean category scores across a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryAverages {
    pub technical: f64,
    pub communication: f64,
    pub problem_solving: f64,
    /// `None` when no evaluated answer carried code.
    pub code_quality: Option<f64>,
}

impl CategoryAverages {
    pub fn get(&self, category: Category) -> Option<f64> {
        match category {
            Category::Technical => Some(self.technical),
            Category::Communication => Some(self.communication),
            Category::ProblemSolving => Some(self.problem_solving),
            Category::CodeQuality => self.code_quality,
        }
    }
}

/// Session-level combination of every evaluation. Derived, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub overall_score: u32, // 0 – 100
    pub category_scores: CategoryAverages,
    pub top_strengths: Vec<String>,
    pub top_improvements: Vec<String>,
    pub per_question: Vec<Evaluation>,
}
