use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MathTopic {
    Arithmetic,
    Algebra,
    Geometry,
    Calculus,
    Statistics,
}

impl MathTopic {
    pub const ALL: [MathTopic; 5] = [
        MathTopic::Arithmetic,
        MathTopic::Algebra,
        MathTopic::Geometry,
        MathTopic::Calculus,
        MathTopic::Statistics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MathTopic::Arithmetic => "arithmetic",
            MathTopic::Algebra => "algebra",
            MathTopic::Geometry => "geometry",
            MathTopic::Calculus => "calculus",
            MathTopic::Statistics => "statistics",
        }
    }
}

impl std::fmt::Display for MathTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generated multiple-choice question. Instances are produced only by the
/// content boundary, which validates option count and answer range before
/// they reach any session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_option_index: usize,
    pub explanation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

/// One transcript entry. `id` is monotonic within a session and exists for
/// display keying only; ordering semantics come from transcript position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: MessageRole,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
