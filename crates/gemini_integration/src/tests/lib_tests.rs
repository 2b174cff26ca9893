use super::*;

use std::sync::Arc;

use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone)]
struct ServerState {
    status: StatusCode,
    body: Value,
    requests: Arc<Mutex<Vec<(String, Value)>>>,
}

async fn handle_generate_content(
    State(state): State<ServerState>,
    RawQuery(query): RawQuery,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state
        .requests
        .lock()
        .await
        .push((query.unwrap_or_default(), body));
    (state.status, Json(state.body.clone()))
}

async fn spawn_content_server(
    status: StatusCode,
    body: Value,
) -> (String, Arc<Mutex<Vec<(String, Value)>>>) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = ServerState {
        status,
        body,
        requests: requests.clone(),
    };
    let app = Router::new()
        .route("/models/*model_call", post(handle_generate_content))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), requests)
}

fn test_service(server_url: String) -> GeminiContentService {
    GeminiContentService::new(GeminiOptions {
        api_key: "test-key".into(),
        model: "gemini-test".into(),
        api_base_url: server_url,
        questions_per_quiz: 3,
    })
}

fn candidate_body(text: &str) -> Value {
    json!({
        "candidates": [
            { "content": { "parts": [ { "text": text } ] } }
        ]
    })
}

fn sample_payload() -> Vec<QuizQuestionPayload> {
    vec![QuizQuestionPayload {
        question: "What is 2 + 2?".into(),
        options: vec!["3".into(), "4".into(), "5".into(), "6".into()],
        correct_answer_index: 1,
        explanation: "2 + 2 = 4.".into(),
    }]
}

#[test]
fn validate_questions_rejects_empty_payload() {
    let err = validate_questions(Vec::new()).expect_err("empty payload must fail");
    assert!(matches!(err, GenerationError::Empty));
}

#[test]
fn validate_questions_rejects_blank_option() {
    let mut payload = sample_payload();
    payload[0].options[2] = "   ".into();

    let err = validate_questions(payload).expect_err("blank option must fail");
    assert!(matches!(err, GenerationError::InvalidQuestion(_)));
}

#[test]
fn validate_questions_rejects_too_few_options() {
    let mut payload = sample_payload();
    payload[0].options.truncate(1);

    let err = validate_questions(payload).expect_err("single option must fail");
    assert!(matches!(err, GenerationError::InvalidQuestion(_)));
}

#[test]
fn validate_questions_rejects_out_of_range_answer_index() {
    let mut payload = sample_payload();
    payload[0].correct_answer_index = 4;

    let err = validate_questions(payload).expect_err("index past options must fail");
    assert!(matches!(err, GenerationError::InvalidQuestion(_)));
}

#[test]
fn validate_questions_rejects_negative_answer_index() {
    let mut payload = sample_payload();
    payload[0].correct_answer_index = -1;

    let err = validate_questions(payload).expect_err("negative index must fail");
    assert!(matches!(err, GenerationError::InvalidQuestion(_)));
}

#[test]
fn validate_questions_maps_payload_fields() {
    let questions = validate_questions(sample_payload()).expect("valid payload");

    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].prompt, "What is 2 + 2?");
    assert_eq!(questions[0].options.len(), 4);
    assert_eq!(questions[0].correct_option_index, 1);
    assert_eq!(questions[0].explanation, "2 + 2 = 4.");
}

#[test]
fn strip_code_fence_unwraps_json_fence() {
    assert_eq!(strip_code_fence("```json\n[1, 2]\n```"), "[1, 2]");
    assert_eq!(strip_code_fence("```\n[]\n```"), "[]");
    assert_eq!(strip_code_fence("  [1]  "), "[1]");
}

#[test]
fn quiz_prompt_pins_payload_shape() {
    let prompt = build_quiz_prompt(MathTopic::Geometry, Difficulty::Hard, 7);

    assert!(prompt.contains("7"));
    assert!(prompt.contains("geometry"));
    assert!(prompt.contains("hard"));
    assert!(prompt.contains("correctAnswerIndex"));
}

#[tokio::test]
async fn generate_quiz_round_trip() {
    let quiz_json = json!([
        {
            "question": "What is 3 * 3?",
            "options": ["6", "9", "12", "3"],
            "correctAnswerIndex": 1,
            "explanation": "3 * 3 = 9."
        }
    ]);
    let (server_url, requests) =
        spawn_content_server(StatusCode::OK, candidate_body(&quiz_json.to_string())).await;
    let service = test_service(server_url);

    let questions = service
        .generate_quiz(MathTopic::Algebra, Difficulty::Medium)
        .await
        .expect("quiz generation should succeed");

    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].correct_option_index, 1);

    let requests = requests.lock().await;
    assert_eq!(requests.len(), 1);
    let (query, body) = &requests[0];
    assert!(query.contains("key=test-key"));
    assert_eq!(
        body["generationConfig"]["responseMimeType"],
        "application/json"
    );
    let prompt = body["contents"][0]["parts"][0]["text"]
        .as_str()
        .expect("prompt text");
    assert!(prompt.contains("algebra"));
    assert!(prompt.contains("medium"));
}

#[tokio::test]
async fn generate_quiz_accepts_fenced_payload() {
    let fenced = "```json\n[{\"question\":\"1+1?\",\"options\":[\"2\",\"3\"],\
\"correctAnswerIndex\":0,\"explanation\":\"sum\"}]\n```";
    let (server_url, _requests) =
        spawn_content_server(StatusCode::OK, candidate_body(fenced)).await;
    let service = test_service(server_url);

    let questions = service
        .generate_quiz(MathTopic::Arithmetic, Difficulty::Easy)
        .await
        .expect("fenced payload should parse");

    assert_eq!(questions[0].options, vec!["2", "3"]);
}

#[tokio::test]
async fn generate_quiz_treats_empty_array_as_error() {
    let (server_url, _requests) =
        spawn_content_server(StatusCode::OK, candidate_body("[]")).await;
    let service = test_service(server_url);

    let err = service
        .generate_quiz(MathTopic::Calculus, Difficulty::Easy)
        .await
        .expect_err("empty quiz must be an error");

    assert!(matches!(err, GenerationError::Empty));
}

#[tokio::test]
async fn generate_quiz_maps_http_failure_to_transport_error() {
    let (server_url, _requests) =
        spawn_content_server(StatusCode::INTERNAL_SERVER_ERROR, json!({})).await;
    let service = test_service(server_url);

    let err = service
        .generate_quiz(MathTopic::Algebra, Difficulty::Medium)
        .await
        .expect_err("server error must surface");

    assert!(matches!(err, GenerationError::Transport(_)));
}

#[tokio::test]
async fn solve_round_trip_returns_candidate_text() {
    let (server_url, requests) = spawn_content_server(
        StatusCode::OK,
        candidate_body("# Step 1\nFactor the expression.\n**x = 2**"),
    )
    .await;
    let service = test_service(server_url);

    let solution = service
        .solve("Solve x^2 - 4x + 4 = 0")
        .await
        .expect("solve should succeed");

    assert!(solution.contains("**x = 2**"));

    let requests = requests.lock().await;
    let (_query, body) = &requests[0];
    assert!(body["generationConfig"].is_null());
    let prompt = body["contents"][0]["parts"][0]["text"]
        .as_str()
        .expect("prompt text");
    assert!(prompt.contains("x^2 - 4x + 4 = 0"));
}

#[tokio::test]
async fn solve_without_candidates_is_missing_text() {
    let (server_url, _requests) =
        spawn_content_server(StatusCode::OK, json!({ "candidates": [] })).await;
    let service = test_service(server_url);

    let err = service
        .solve("2 + 2")
        .await
        .expect_err("empty candidates must fail");

    assert!(matches!(err, SolveError::MissingText));
}
