use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::domain::{Difficulty, MathTopic, QuizQuestion};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_QUESTIONS_PER_QUIZ: usize = 5;
const JSON_MIME_TYPE: &str = "application/json";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("content backend unavailable")]
    Unavailable,
    #[error("invalid content endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("quiz generation request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("quiz generation response carried no text part")]
    MissingText,
    #[error("quiz payload is not valid JSON: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("quiz payload failed validation: {0}")]
    InvalidQuestion(String),
    #[error("quiz generation produced no questions")]
    Empty,
}

#[derive(Debug, Error)]
pub enum SolveError {
    #[error("content backend unavailable")]
    Unavailable,
    #[error("invalid content endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("solve request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("solve response carried no text part")]
    MissingText,
}

/// Request/response boundary to the content-generation backend. Session
/// controllers hold this as a trait object and never observe backend state
/// beyond the returned values.
#[async_trait]
pub trait ContentService: Send + Sync {
    async fn generate_quiz(
        &self,
        topic: MathTopic,
        difficulty: Difficulty,
    ) -> Result<Vec<QuizQuestion>, GenerationError>;

    async fn solve(&self, problem: &str) -> Result<String, SolveError>;
}

#[derive(Debug, Clone)]
pub struct GeminiOptions {
    pub api_key: String,
    pub model: String,
    pub api_base_url: String,
    pub questions_per_quiz: usize,
}

impl GeminiOptions {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            questions_per_quiz: DEFAULT_QUESTIONS_PER_QUIZ,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, or None when the model
    /// returned nothing usable.
    fn first_candidate_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect::<Vec<_>>()
            .join("");
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Quiz question as the model emits it. Field names match the JSON the
/// prompt pins down; `validate_questions` converts into the domain type.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestionPayload {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer_index: i64,
    #[serde(default)]
    pub explanation: String,
}

pub fn validate_questions(
    payload: Vec<QuizQuestionPayload>,
) -> Result<Vec<QuizQuestion>, GenerationError> {
    if payload.is_empty() {
        return Err(GenerationError::Empty);
    }

    let mut questions = Vec::with_capacity(payload.len());
    for (position, item) in payload.into_iter().enumerate() {
        if item.question.trim().is_empty() {
            return Err(GenerationError::InvalidQuestion(format!(
                "question {position} has a blank prompt"
            )));
        }
        if item.options.len() < 2 {
            return Err(GenerationError::InvalidQuestion(format!(
                "question {position} has {} options, need at least 2",
                item.options.len()
            )));
        }
        if item.options.iter().any(|option| option.trim().is_empty()) {
            return Err(GenerationError::InvalidQuestion(format!(
                "question {position} has a blank option"
            )));
        }
        let correct_option_index = usize::try_from(item.correct_answer_index)
            .ok()
            .filter(|index| *index < item.options.len())
            .ok_or_else(|| {
                GenerationError::InvalidQuestion(format!(
                    "question {position} has correctAnswerIndex {} out of range for {} options",
                    item.correct_answer_index,
                    item.options.len()
                ))
            })?;

        questions.push(QuizQuestion {
            prompt: item.question,
            options: item.options,
            correct_option_index,
            explanation: item.explanation,
        });
    }

    Ok(questions)
}

/// Models sometimes wrap JSON-mode output in a markdown code fence; strip it
/// before parsing.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(stripped) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let stripped = stripped.strip_prefix("json").unwrap_or(stripped);
    stripped
        .strip_suffix("```")
        .unwrap_or(stripped)
        .trim()
}

fn build_quiz_prompt(topic: MathTopic, difficulty: Difficulty, count: usize) -> String {
    format!(
        "Generate {count} multiple-choice math questions on the topic of {topic} \
at {difficulty} difficulty. Respond with a JSON array only, no surrounding prose. \
Each element must have exactly these fields: \"question\" (string), \"options\" \
(array of 4 distinct answer strings), \"correctAnswerIndex\" (0-based integer into \
options), and \"explanation\" (string explaining why the correct answer is right)."
    )
}

fn build_solve_prompt(problem: &str) -> String {
    format!(
        "You are a patient math tutor. Solve the following problem step by step. \
Begin each section with a line starting with '#', and mark key intermediate \
results and the final answer with **bold**.\n\nProblem:\n{problem}"
    )
}

/// HTTP client for the Google Generative Language API.
pub struct GeminiContentService {
    http: Client,
    options: GeminiOptions,
}

impl GeminiContentService {
    pub fn new(options: GeminiOptions) -> Self {
        Self {
            http: Client::new(),
            options,
        }
    }

    fn endpoint(&self) -> Result<Url, url::ParseError> {
        let mut base = self.options.api_base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let mut url =
            Url::parse(&base)?.join(&format!("models/{}:generateContent", self.options.model))?;
        url.query_pairs_mut().append_pair("key", &self.options.api_key);
        Ok(url)
    }

    async fn post_generate(
        &self,
        url: Url,
        request: &GenerateContentRequest<'_>,
    ) -> Result<GenerateContentResponse, reqwest::Error> {
        self.http
            .post(url)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[async_trait]
impl ContentService for GeminiContentService {
    async fn generate_quiz(
        &self,
        topic: MathTopic,
        difficulty: Difficulty,
    ) -> Result<Vec<QuizQuestion>, GenerationError> {
        let prompt = build_quiz_prompt(topic, difficulty, self.options.questions_per_quiz);
        let request = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: &prompt }],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: JSON_MIME_TYPE,
            }),
        };

        debug!(%topic, %difficulty, model = %self.options.model, "requesting quiz generation");
        let response = self.post_generate(self.endpoint()?, &request).await?;
        let text = response
            .first_candidate_text()
            .ok_or(GenerationError::MissingText)?;

        let payload: Vec<QuizQuestionPayload> = serde_json::from_str(strip_code_fence(&text))?;
        let questions = validate_questions(payload).map_err(|err| {
            warn!(%topic, %difficulty, error = %err, "rejected quiz payload");
            err
        })?;
        debug!(count = questions.len(), "quiz generation complete");
        Ok(questions)
    }

    async fn solve(&self, problem: &str) -> Result<String, SolveError> {
        let prompt = build_solve_prompt(problem);
        let request = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: &prompt }],
            }],
            generation_config: None,
        };

        debug!(model = %self.options.model, "requesting solution");
        let response = self.post_generate(self.endpoint()?, &request).await?;
        response.first_candidate_text().ok_or(SolveError::MissingText)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
