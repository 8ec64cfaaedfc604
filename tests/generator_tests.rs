mod common;

use async_trait::async_trait;
use common::ScriptedClient;
use lirith::event::{EventHandler, ExperimentEvent};
use lirith::{GenerationError, Message, ResponseGenerator, RetryPolicy};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

fn rate_limited() -> Result<String, GenerationError> {
    Err(GenerationError::RateLimited("HTTP 429".to_string()))
}

#[derive(Default)]
struct RecordingHandler {
    waits: Mutex<Vec<Duration>>,
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn on_experiment_event(&self, event: &ExperimentEvent) {
        if let ExperimentEvent::RetryScheduled { wait, .. } = event {
            self.waits.lock().unwrap().push(*wait);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn three_rate_limits_then_success() {
    let client = Arc::new(ScriptedClient::with_script(vec![
        rate_limited(),
        rate_limited(),
        rate_limited(),
        Ok("  나는 여기 있다  ".to_string()),
    ]));
    let handler = Arc::new(RecordingHandler::default());
    let mut generator = ResponseGenerator::new(client.clone())
        .with_retry_policy(RetryPolicy::new(3, Duration::from_secs(10)));
    generator.set_event_handler(handler.clone());

    let started = Instant::now();
    let text = generator
        .generate("Echoel", &[Message::user("질문")], 0.95)
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(text, "나는 여기 있다");
    assert_eq!(client.call_count(), 4);
    assert!(elapsed >= Duration::from_secs(60));
    assert!(elapsed < Duration::from_secs(61));
    assert_eq!(
        *handler.waits.lock().unwrap(),
        vec![
            Duration::from_secs(10),
            Duration::from_secs(20),
            Duration::from_secs(30)
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_are_fatal() {
    let client = Arc::new(ScriptedClient::with_script(vec![
        rate_limited(),
        rate_limited(),
        rate_limited(),
        Ok("too late".to_string()),
    ]));
    let generator = ResponseGenerator::new(client.clone());

    let started = Instant::now();
    let result = generator
        .generate_with_policy(
            "Lumen",
            &[Message::user("질문")],
            0.75,
            RetryPolicy::new(2, Duration::from_secs(10)),
        )
        .await;

    assert!(matches!(result, Err(GenerationError::Fatal(_))));
    assert_eq!(client.call_count(), 3);
    assert!(started.elapsed() >= Duration::from_secs(30));
    assert!(started.elapsed() < Duration::from_secs(31));
}

#[tokio::test(start_paused = true)]
async fn fatal_errors_are_not_retried() {
    let client = Arc::new(ScriptedClient::with_script(vec![Err(GenerationError::Fatal(
        "HTTP 401".to_string(),
    ))]));
    let generator = ResponseGenerator::new(client.clone());

    let started = Instant::now();
    let result = generator.generate("Saira", &[Message::user("질문")], 1.05).await;

    assert_eq!(result, Err(GenerationError::Fatal("HTTP 401".to_string())));
    assert_eq!(client.call_count(), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test]
async fn empty_completions_are_fatal() {
    let client = Arc::new(ScriptedClient::with_script(vec![Ok("   \n".to_string())]));
    let generator = ResponseGenerator::new(client);

    let result = generator.generate("Essira", &[Message::user("질문")], 0.65).await;
    assert!(matches!(result, Err(GenerationError::Fatal(_))));
}

#[tokio::test]
async fn per_agent_temperature_reaches_the_client() {
    let client = Arc::new(ScriptedClient::new());
    let generator = ResponseGenerator::new(client.clone()).with_max_output_tokens(650);

    generator.generate("Saira", &[Message::user("질문")], 1.05).await.unwrap();
    generator.generate("Essira", &[Message::user("질문")], 0.65).await.unwrap();

    let calls = client.calls();
    assert_eq!(calls[0].1.temperature, 1.05);
    assert_eq!(calls[1].1.temperature, 0.65);
    assert_eq!(calls[1].1.max_output_tokens, 650);
}
