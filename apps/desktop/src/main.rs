mod config;
mod render;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use gemini_integration::{ContentService, GeminiContentService};
use session_core::{
    ActiveQuiz, ChatController, FinishedQuiz, QuizController, QuizPhase, SubmitOutcome,
};
use shared::domain::{Difficulty, MathTopic, MessageRole};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Parser, Debug)]
struct Args {
    /// Overrides the API key from assistant.toml or the environment.
    #[arg(long)]
    api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Solver,
    Quiz,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let mut settings = config::load_settings();
    if let Some(api_key) = args.api_key {
        settings.gemini_api_key = api_key;
    }
    if settings.gemini_api_key.is_empty() {
        anyhow::bail!("no API key configured; set GEMINI_API_KEY or pass --api-key");
    }

    info!(model = %settings.gemini_model, "starting math assistant");
    let content: Arc<dyn ContentService> =
        Arc::new(GeminiContentService::new(settings.into_gemini_options()));
    let chat = ChatController::new(content.clone());
    let quiz = QuizController::new(content);

    println!("Math assistant ready. Type a problem to solve it, /quiz to practice, /quit to exit.");

    let mut mode = Mode::Solver;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        match input {
            "/quit" => break,
            "/solver" => {
                mode = Mode::Solver;
                println!("Solver mode. Type a problem.");
            }
            "/quiz" => {
                mode = Mode::Quiz;
                print_quiz_intro();
            }
            _ => match mode {
                Mode::Solver => handle_solver_input(&chat, input).await,
                Mode::Quiz => handle_quiz_input(&quiz, input).await,
            },
        }
    }

    Ok(())
}

async fn handle_solver_input(chat: &ChatController, input: &str) {
    if input == "/clear" {
        chat.clear().await;
        println!("Transcript cleared.");
        return;
    }

    println!("Solving...");
    match chat.submit(input).await {
        SubmitOutcome::RejectedEmpty => return,
        SubmitOutcome::RejectedBusy => {
            println!("A solve request is already in flight; wait for it to finish.");
            return;
        }
        SubmitOutcome::Accepted => {}
    }

    let snapshot = chat.snapshot().await;
    if let Some(error) = snapshot.last_error {
        println!("Solve failed ({error}). Submit the problem again to retry.");
        return;
    }
    if let Some(message) = snapshot
        .messages
        .iter()
        .rev()
        .find(|message| message.role == MessageRole::Assistant)
    {
        println!("{}", render::render_ansi(&message.text));
    }
}

async fn handle_quiz_input(quiz: &QuizController, input: &str) {
    if input == "/restart" {
        quiz.restart().await;
        print_quiz_intro();
        return;
    }

    let snapshot = quiz.snapshot().await;
    match snapshot.phase {
        QuizPhase::Unconfigured => start_from_input(quiz, input).await,
        QuizPhase::Loading { .. } => println!("Still generating questions..."),
        QuizPhase::Active(active) => handle_active_input(quiz, &active, input).await,
        QuizPhase::Finished(finished) => {
            if input == "again" {
                quiz.restart().await;
                print_quiz_intro();
            } else {
                print_finished(&finished);
                println!("Type 'again' for a new quiz or /solver to go back.");
            }
        }
    }
}

async fn start_from_input(quiz: &QuizController, input: &str) {
    let mut words = input.split_whitespace();
    let Some(topic) = words.next().and_then(parse_topic) else {
        println!("Unknown topic. Choose one of: {}.", topic_list());
        return;
    };
    // Difficulty is optional; medium when omitted.
    let difficulty = match words.next() {
        Some(word) => match parse_difficulty(word) {
            Some(difficulty) => difficulty,
            None => {
                println!("Unknown difficulty. Choose easy, medium or hard.");
                return;
            }
        },
        None => Difficulty::default(),
    };

    println!("Generating a {difficulty} {topic} quiz...");
    quiz.start_quiz(topic, difficulty).await;

    let snapshot = quiz.snapshot().await;
    if let Some(error) = snapshot.last_error {
        println!("Could not create the quiz ({error}). Pick a topic to try again.");
        return;
    }
    if let QuizPhase::Active(active) = snapshot.phase {
        print_question(&active);
    }
}

async fn handle_active_input(quiz: &QuizController, active: &ActiveQuiz, input: &str) {
    match input {
        "check" => {
            quiz.check_answer().await;
            let QuizPhase::Active(after) = quiz.snapshot().await.phase else {
                return;
            };
            if !after.answer_revealed {
                println!(
                    "Select an option first (1-{}).",
                    after.current_question().options.len()
                );
                return;
            }
            print_reveal(&after);
        }
        "next" => {
            if !active.answer_revealed {
                println!("Check your answer before moving on.");
                return;
            }
            quiz.next_question().await;
            match quiz.snapshot().await.phase {
                QuizPhase::Active(next) => print_question(&next),
                QuizPhase::Finished(finished) => {
                    print_finished(&finished);
                    println!("Type 'again' for a new quiz or /solver to go back.");
                }
                _ => {}
            }
        }
        _ => {
            if active.answer_revealed {
                println!("Answer already revealed; type 'next'.");
                return;
            }
            match input.parse::<usize>() {
                Ok(number) if number >= 1 => {
                    quiz.select_option(number - 1).await;
                    let QuizPhase::Active(after) = quiz.snapshot().await.phase else {
                        return;
                    };
                    match after.selected_option {
                        Some(index) if index == number - 1 => println!(
                            "Selected {}) {}",
                            option_label(index),
                            after.current_question().options[index]
                        ),
                        _ => println!(
                            "That option does not exist; pick 1-{}.",
                            after.current_question().options.len()
                        ),
                    }
                }
                _ => println!("Enter an option number, 'check', 'next', or /restart."),
            }
        }
    }
}

fn parse_topic(word: &str) -> Option<MathTopic> {
    let word = word.to_lowercase();
    MathTopic::ALL
        .iter()
        .copied()
        .find(|topic| topic.as_str() == word)
}

fn parse_difficulty(word: &str) -> Option<Difficulty> {
    let word = word.to_lowercase();
    Difficulty::ALL
        .iter()
        .copied()
        .find(|difficulty| difficulty.as_str() == word)
}

fn topic_list() -> String {
    MathTopic::ALL
        .iter()
        .map(|topic| topic.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn option_label(index: usize) -> char {
    (b'A' + index as u8) as char
}

fn print_quiz_intro() {
    println!("Quiz mode. Topics: {}.", topic_list());
    println!(
        "Start with '<topic> [easy|medium|hard]' (difficulty defaults to medium), \
or /solver to go back."
    );
}

fn print_question(active: &ActiveQuiz) {
    let question = active.current_question();
    println!();
    println!(
        "Question {}/{} [{} / {}]",
        active.current_index + 1,
        active.total_questions(),
        active.topic,
        active.difficulty
    );
    println!("{}", question.prompt);
    for (index, option) in question.options.iter().enumerate() {
        println!("  {}) {}", option_label(index), option);
    }
    println!(
        "Pick an option (1-{}), then type 'check'.",
        question.options.len()
    );
}

fn print_reveal(active: &ActiveQuiz) {
    let question = active.current_question();
    let Some(selected) = active.selected_option else {
        return;
    };
    if selected == question.correct_option_index {
        println!("Correct! Score: {}", active.score);
    } else {
        println!(
            "Incorrect. The answer is {}) {}.",
            option_label(question.correct_option_index),
            question.options[question.correct_option_index]
        );
    }
    println!("Explanation: {}", question.explanation);
    println!("Type 'next' to continue.");
}

fn print_finished(finished: &FinishedQuiz) {
    println!();
    println!(
        "Quiz complete! You answered {}/{} correctly ({}%).",
        finished.score,
        finished.total_questions,
        finished.percentage()
    );
}
