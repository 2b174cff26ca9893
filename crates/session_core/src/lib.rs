use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use gemini_integration::{ContentService, GenerationError, SolveError};
use shared::domain::{ChatMessage, Difficulty, MathTopic, MessageId, MessageRole, QuizQuestion};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Null collaborator for constructing controllers without a backend; every
/// request fails.
pub struct MissingContentService;

#[async_trait]
impl ContentService for MissingContentService {
    async fn generate_quiz(
        &self,
        _topic: MathTopic,
        _difficulty: Difficulty,
    ) -> Result<Vec<QuizQuestion>, GenerationError> {
        Err(GenerationError::Unavailable)
    }

    async fn solve(&self, _problem: &str) -> Result<String, SolveError> {
        Err(SolveError::Unavailable)
    }
}

/// Session state of a running quiz. Only reachable through `QuizPhase::Active`,
/// so `current_index` is always a valid index into a non-empty `questions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveQuiz {
    pub topic: MathTopic,
    pub difficulty: Difficulty,
    pub questions: Vec<QuizQuestion>,
    pub current_index: usize,
    pub selected_option: Option<usize>,
    pub answer_revealed: bool,
    pub score: u32,
}

impl ActiveQuiz {
    pub fn current_question(&self) -> &QuizQuestion {
        &self.questions[self.current_index]
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn is_last_question(&self) -> bool {
        self.current_index + 1 == self.questions.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedQuiz {
    pub topic: MathTopic,
    pub difficulty: Difficulty,
    pub total_questions: usize,
    pub score: u32,
}

impl FinishedQuiz {
    pub fn percentage(&self) -> u32 {
        if self.total_questions == 0 {
            return 0;
        }
        ((self.score as f64 / self.total_questions as f64) * 100.0).round() as u32
    }
}

/// Explicit quiz lifecycle. Field combinations that the session invariants
/// forbid are unrepresentable: only `Active` carries a selection or a score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizPhase {
    Unconfigured,
    Loading {
        topic: MathTopic,
        difficulty: Difficulty,
    },
    Active(ActiveQuiz),
    Finished(FinishedQuiz),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSnapshot {
    pub phase: QuizPhase,
    pub last_error: Option<String>,
}

struct QuizControllerState {
    generation: u64,
    phase: QuizPhase,
    last_error: Option<String>,
}

/// Owns the lifecycle of one quiz session. Operations are total: a call that
/// is invalid for the current phase is a logged no-op, never an error. The
/// presentation layer observes state via `snapshot` after each call.
pub struct QuizController {
    content: Arc<dyn ContentService>,
    inner: Mutex<QuizControllerState>,
}

impl QuizController {
    pub fn new(content: Arc<dyn ContentService>) -> Self {
        Self {
            content,
            inner: Mutex::new(QuizControllerState {
                generation: 0,
                phase: QuizPhase::Unconfigured,
                last_error: None,
            }),
        }
    }

    /// Resets the session and requests a fresh question set. Accepted from any
    /// phase; a start issued while a previous load is still in flight
    /// supersedes it, and the stale response is discarded by generation tag.
    pub async fn start_quiz(&self, topic: MathTopic, difficulty: Difficulty) {
        let generation = {
            let mut inner = self.inner.lock().await;
            inner.generation += 1;
            inner.phase = QuizPhase::Loading { topic, difficulty };
            inner.last_error = None;
            inner.generation
        };

        debug!(%topic, %difficulty, generation, "starting quiz session");
        let outcome = self.content.generate_quiz(topic, difficulty).await;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            debug!(
                generation,
                current = inner.generation,
                "discarding quiz response for a superseded session"
            );
            return;
        }

        match outcome {
            Ok(questions) if questions.is_empty() => {
                // Defense against non-validating ContentService impls; the
                // core never enters Active with nothing to show.
                warn!(%topic, %difficulty, "quiz generation returned an empty question set");
                inner.phase = QuizPhase::Unconfigured;
                inner.last_error = Some(GenerationError::Empty.to_string());
            }
            Ok(questions) => {
                debug!(count = questions.len(), "quiz session is active");
                inner.phase = QuizPhase::Active(ActiveQuiz {
                    topic,
                    difficulty,
                    questions,
                    current_index: 0,
                    selected_option: None,
                    answer_revealed: false,
                    score: 0,
                });
            }
            Err(err) => {
                warn!(%topic, %difficulty, error = %err, "quiz generation failed");
                inner.phase = QuizPhase::Unconfigured;
                inner.last_error = Some(err.to_string());
            }
        }
    }

    /// Marks an option as selected. Ignored outside `Active`, after the
    /// answer is revealed, or for an out-of-range index.
    pub async fn select_option(&self, index: usize) {
        let mut inner = self.inner.lock().await;
        let QuizPhase::Active(active) = &mut inner.phase else {
            return;
        };
        if active.answer_revealed || index >= active.current_question().options.len() {
            return;
        }
        active.selected_option = Some(index);
    }

    /// Scores the current selection against the correct index and reveals the
    /// answer. Ignored without a selection; idempotent once revealed.
    pub async fn check_answer(&self) {
        let mut inner = self.inner.lock().await;
        let QuizPhase::Active(active) = &mut inner.phase else {
            return;
        };
        if active.answer_revealed {
            return;
        }
        let Some(selected) = active.selected_option else {
            return;
        };
        if selected == active.current_question().correct_option_index {
            active.score += 1;
        }
        active.answer_revealed = true;
    }

    /// Advances past a revealed answer, finishing the session from the last
    /// question. Ignored before the answer is revealed.
    pub async fn next_question(&self) {
        let mut inner = self.inner.lock().await;
        let QuizPhase::Active(active) = &mut inner.phase else {
            return;
        };
        if !active.answer_revealed {
            return;
        }
        if active.is_last_question() {
            let finished = FinishedQuiz {
                topic: active.topic,
                difficulty: active.difficulty,
                total_questions: active.questions.len(),
                score: active.score,
            };
            debug!(score = finished.score, total = finished.total_questions, "quiz finished");
            inner.phase = QuizPhase::Finished(finished);
        } else {
            active.current_index += 1;
            active.selected_option = None;
            active.answer_revealed = false;
        }
    }

    /// Discards the session from any phase. A response still in flight is
    /// orphaned by the generation bump.
    pub async fn restart(&self) {
        let mut inner = self.inner.lock().await;
        inner.generation += 1;
        inner.phase = QuizPhase::Unconfigured;
        inner.last_error = None;
    }

    pub async fn snapshot(&self) -> QuizSnapshot {
        let inner = self.inner.lock().await;
        QuizSnapshot {
            phase: inner.phase.clone(),
            last_error: inner.last_error.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    RejectedEmpty,
    RejectedBusy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSnapshot {
    pub messages: Vec<ChatMessage>,
    pub pending_request: bool,
    pub last_error: Option<String>,
}

struct ChatControllerState {
    generation: u64,
    next_message_id: i64,
    messages: Vec<ChatMessage>,
    pending_request: bool,
    last_error: Option<String>,
}

impl ChatControllerState {
    fn push_message(&mut self, role: MessageRole, text: String) {
        let id = MessageId(self.next_message_id);
        self.next_message_id += 1;
        self.messages.push(ChatMessage {
            id,
            role,
            text,
            created_at: Utc::now(),
        });
    }
}

/// Owns the solver transcript. At most one solve request is in flight at a
/// time; further submissions are rejected, not queued, so each assistant
/// message lands directly after the user message that triggered it.
pub struct ChatController {
    content: Arc<dyn ContentService>,
    inner: Mutex<ChatControllerState>,
}

impl ChatController {
    pub fn new(content: Arc<dyn ContentService>) -> Self {
        Self {
            content,
            inner: Mutex::new(ChatControllerState {
                generation: 0,
                next_message_id: 1,
                messages: Vec::new(),
                pending_request: false,
                last_error: None,
            }),
        }
    }

    pub async fn submit(&self, problem_text: &str) -> SubmitOutcome {
        let problem = problem_text.trim();
        if problem.is_empty() {
            return SubmitOutcome::RejectedEmpty;
        }

        let generation = {
            let mut inner = self.inner.lock().await;
            if inner.pending_request {
                debug!("rejecting submission while a solve request is in flight");
                return SubmitOutcome::RejectedBusy;
            }
            inner.push_message(MessageRole::User, problem.to_string());
            inner.pending_request = true;
            inner.last_error = None;
            inner.generation
        };

        let outcome = self.content.solve(problem).await;

        let mut inner = self.inner.lock().await;
        // The flag belongs to this request whatever happened meanwhile; only
        // the payload is subject to the generation check.
        inner.pending_request = false;
        if inner.generation != generation {
            debug!(
                generation,
                current = inner.generation,
                "discarding solve response for a cleared transcript"
            );
            return SubmitOutcome::Accepted;
        }
        match outcome {
            Ok(solution) => inner.push_message(MessageRole::Assistant, solution),
            Err(err) => {
                warn!(error = %err, "solve request failed");
                inner.last_error = Some(err.to_string());
            }
        }
        SubmitOutcome::Accepted
    }

    /// Empties the transcript unconditionally. The in-flight request, if any,
    /// is not cancelled; its response is discarded by the generation bump.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.generation += 1;
        inner.messages.clear();
        inner.last_error = None;
    }

    pub async fn snapshot(&self) -> ChatSnapshot {
        let inner = self.inner.lock().await;
        ChatSnapshot {
            messages: inner.messages.clone(),
            pending_request: inner.pending_request,
            last_error: inner.last_error.clone(),
        }
    }
}

#[cfg(test)]
#[path = "tests/quiz_tests.rs"]
mod quiz_tests;

#[cfg(test)]
#[path = "tests/chat_tests.rs"]
mod chat_tests;
