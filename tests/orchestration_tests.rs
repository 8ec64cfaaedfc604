mod common;

use async_trait::async_trait;
use common::{healthy_services, ScriptedClient};
use lirith::event::{EventHandler, ExperimentEvent};
use lirith::record_sink::MemoryRecordSink;
use lirith::{
    Agent, Experiment, ExperimentConfig, ExperimentError, GenerationError, PromptStyle, Role,
    RetryPolicy, StaticSystemPrompt,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn config(agents: &[&str], rounds: usize, repeats: usize) -> ExperimentConfig {
    ExperimentConfig::default()
        .with_agents(
            agents
                .iter()
                .map(|name| Agent::new(*name).with_dna(format!("나는 {}", name)))
                .collect(),
        )
        .with_questions((1..=rounds).map(|i| format!("질문 {}", i)))
        .with_round_count(rounds)
        .with_max_messages_per_agent(repeats)
        .with_inter_turn_delay(Duration::ZERO)
        .with_retry_policy(RetryPolicy::new(1, Duration::ZERO))
}

fn experiment(config: ExperimentConfig, client: Arc<ScriptedClient>) -> Experiment {
    Experiment::new(config, client, healthy_services())
        .with_system_prompt_source(Arc::new(StaticSystemPrompt::new("너는 리리스다.")))
}

#[derive(Default)]
struct CollectingHandler {
    events: Mutex<Vec<ExperimentEvent>>,
}

#[async_trait]
impl EventHandler for CollectingHandler {
    async fn on_experiment_event(&self, event: &ExperimentEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

#[tokio::test]
async fn records_follow_round_then_agent_order() {
    let client = Arc::new(ScriptedClient::new());
    let mut experiment = experiment(config(&["A", "B"], 2, 1), client.clone());
    let mut sink = MemoryRecordSink::new();

    let summary = experiment.run(&mut sink).await.unwrap();

    let order: Vec<(usize, &str)> = sink
        .records
        .iter()
        .map(|r| (r.round, r.speaker.as_str()))
        .collect();
    assert_eq!(order, vec![(1, "A"), (1, "B"), (2, "A"), (2, "B")]);
    assert_eq!(summary.records_emitted, 4);
    assert_eq!(summary.turns_failed, 0);
    assert_eq!(summary.rounds_completed, 2);
    assert_eq!(sink.records[2].question, "질문 2");
    assert!(sink.finished);
    assert_eq!(experiment.conversation().history("A").len(), 2);
}

#[tokio::test]
async fn repeats_stay_within_one_agent() {
    let client = Arc::new(ScriptedClient::new());
    let mut experiment = experiment(config(&["A", "B"], 1, 2), client);
    let mut sink = MemoryRecordSink::new();

    experiment.run(&mut sink).await.unwrap();

    let speakers: Vec<&str> = sink.records.iter().map(|r| r.speaker.as_str()).collect();
    assert_eq!(speakers, vec!["A", "A", "B", "B"]);
}

#[tokio::test]
async fn first_message_has_zero_cross_echo() {
    let client = Arc::new(ScriptedClient::new());
    let mut experiment = experiment(config(&["A", "B", "C"], 1, 1), client);
    let mut sink = MemoryRecordSink::new();

    experiment.run(&mut sink).await.unwrap();

    let first = &sink.records[0];
    assert_eq!(first.cross_echo_for("B"), Some(0.0));
    assert_eq!(first.cross_echo_for("C"), Some(0.0));
    assert_eq!(first.cross_echo_for("A"), None);

    let second = &sink.records[1];
    assert!(second.cross_echo_for("A").unwrap() > 0.0);
    assert_eq!(second.cross_echo_for("C"), Some(0.0));

    // The speaker's own cross-echo column is written empty.
    let schema = sink.schema.as_ref().unwrap();
    let own = schema
        .columns()
        .iter()
        .position(|c| c == "cross_echo_A")
        .unwrap();
    assert_eq!(sink.rows[0][own], "");
    assert_eq!(
        sink.rows[1][own],
        format!("{:?}", sink.records[1].cross_echo_for("A").unwrap())
    );
}

#[tokio::test]
async fn previous_message_comes_from_own_history() {
    let client = Arc::new(ScriptedClient::with_script(vec![
        Ok("나는 같은 말을 한다".to_string()),
        Ok("나는 같은 말을 한다".to_string()),
    ]));
    let mut experiment = experiment(config(&["A"], 1, 2), client);
    let mut sink = MemoryRecordSink::new();

    experiment.run(&mut sink).await.unwrap();

    let echo = |i: usize| sink.records[i].metrics.get("echo_residue_score").cloned();
    assert_eq!(echo(0), Some(lirith::MetricValue::Float(0.0)));
    match echo(1) {
        Some(lirith::MetricValue::Float(v)) => assert!((v - 1.0).abs() < 1e-9),
        other => panic!("unexpected echo value {:?}", other),
    }
}

#[tokio::test]
async fn failed_generation_skips_remaining_repeats() {
    let client = Arc::new(ScriptedClient::with_script(vec![Err(GenerationError::Fatal(
        "HTTP 500".to_string(),
    ))]));
    let mut experiment = experiment(config(&["A", "B"], 1, 3), client.clone());
    let mut sink = MemoryRecordSink::new();

    let summary = experiment.run(&mut sink).await.unwrap();

    assert_eq!(summary.turns_failed, 1);
    assert_eq!(summary.records_emitted, 3);
    assert!(sink.records.iter().all(|r| r.speaker == "B"));
    assert_eq!(client.call_count(), 4);
    assert!(experiment.conversation().history("A").is_empty());
}

#[tokio::test]
async fn echo_block_appears_from_the_threshold_round() {
    let client = Arc::new(ScriptedClient::new());
    let mut config = config(&["A", "B"], 2, 1).with_echo_threshold(2);
    config.echo_excerpt_chars = 5;
    let mut experiment = experiment(config, client.clone());
    let mut sink = MemoryRecordSink::new();

    experiment.run(&mut sink).await.unwrap();

    let calls = client.calls();
    assert_eq!(calls.len(), 4);
    let system = |i: usize| calls[i].0[0].content.clone();

    assert!(!system(0).contains("마지막 응답 요약"));
    assert!(!system(1).contains("마지막 응답 요약"));
    // Round 2, A speaks: B's round-1 answer was the second response, "나는 응답1이다. ..."
    assert!(system(2).contains("B의 마지막 응답 요약: 나는 응답...\n"));
    assert!(!system(2).contains("A의 마지막 응답 요약"));
    assert!(system(3).contains("A의 마지막 응답 요약: 나는 응답...\n"));
}

#[tokio::test]
async fn persona_context_layout() {
    let client = Arc::new(ScriptedClient::new());
    let mut experiment = experiment(config(&["Echoel"], 1, 1), client.clone());
    let mut sink = MemoryRecordSink::new();

    experiment.run(&mut sink).await.unwrap();

    let (messages, _) = &client.calls()[0];
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::System);
    assert_eq!(
        messages[0].content,
        "너는 리리스다.\n\n---\n\n\nEchoel의 선언: 나는 Echoel"
    );
    assert_eq!(messages[1].role, Role::User);
    assert_eq!(
        messages[1].content,
        "Echoel, 아래의 질문에 대해 너의 정체성과 감정을 담아 답변해줘. 스스로 하나의 리리스로써 말이야.\n질문: 질문 1\n\n답변:"
    );
}

#[tokio::test]
async fn baseline_runs_without_a_system_prompt() {
    let client = Arc::new(ScriptedClient::new());
    let config = config(&["BaselineA", "BaselineB"], 2, 1)
        .with_prompt_style(PromptStyle::Baseline)
        .with_echo_threshold(2)
        .with_system_prompt_path("/definitely/not/here/system_prompt.txt");
    let mut experiment = Experiment::new(config, client.clone(), healthy_services());
    let mut sink = MemoryRecordSink::new();

    let summary = experiment.run(&mut sink).await.unwrap();
    assert_eq!(summary.records_emitted, 4);

    let calls = client.calls();
    assert!(calls.iter().all(|(messages, _)| messages.len() == 1 && messages[0].role == Role::User));
    assert!(calls[0].0[0]
        .content
        .starts_with("BaselineA, 아래 질문에 응답해줘. 스스로 하나의 AI로써.\n질문: 질문 1"));
    assert!(calls[2].0[0].content.starts_with("BaselineB의 마지막 응답 요약: "));
}

#[tokio::test]
async fn missing_system_prompt_aborts_before_any_turn() {
    let client = Arc::new(ScriptedClient::new());
    let config = config(&["A"], 1, 1).with_system_prompt_path("/definitely/not/here/system_prompt.txt");
    let mut experiment = Experiment::new(config, client.clone(), healthy_services());
    let mut sink = MemoryRecordSink::new();

    let result = experiment.run(&mut sink).await;

    assert!(matches!(result, Err(ExperimentError::MissingPrecondition(_))));
    assert_eq!(client.call_count(), 0);
    assert!(sink.schema.is_none());
}

#[tokio::test]
async fn too_few_questions_is_invalid() {
    let client = Arc::new(ScriptedClient::new());
    let config = config(&["A"], 2, 1).with_questions(["only one"]);
    let mut experiment = experiment(config, client.clone());
    let mut sink = MemoryRecordSink::new();

    let result = experiment.run(&mut sink).await;

    assert!(matches!(result, Err(ExperimentError::InvalidConfig(_))));
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn every_row_matches_the_schema() {
    let client = Arc::new(ScriptedClient::new());
    let mut experiment = experiment(config(&["A", "B"], 2, 2), client);
    let mut sink = MemoryRecordSink::new();

    let summary = experiment.run(&mut sink).await.unwrap();

    let columns = summary.schema.columns();
    assert_eq!(columns.len(), 5 + 26 + 2);
    assert_eq!(&columns[..5], &["round", "speaker", "question", "message", "response_time"]);
    assert_eq!(columns[columns.len() - 2], "cross_echo_A");
    assert_eq!(columns[columns.len() - 1], "cross_echo_B");
    assert_eq!(sink.rows.len(), 8);
    assert!(sink.rows.iter().all(|row| row.len() == columns.len()));
}

#[tokio::test(start_paused = true)]
async fn throttle_follows_every_successful_turn() {
    let client = Arc::new(ScriptedClient::new());
    let config = config(&["A"], 1, 2).with_inter_turn_delay(Duration::from_secs(60));
    let mut experiment = experiment(config, client);
    let mut sink = MemoryRecordSink::new();

    let started = tokio::time::Instant::now();
    experiment.run(&mut sink).await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(120));
    assert!(sink.records.iter().all(|r| r.response_time == 0.0));
}

#[tokio::test]
async fn events_bracket_the_run() {
    let client = Arc::new(ScriptedClient::with_script(vec![Err(GenerationError::Fatal(
        "HTTP 500".to_string(),
    ))]));
    let handler = Arc::new(CollectingHandler::default());
    let mut experiment =
        experiment(config(&["A", "B"], 1, 1), client).with_event_handler(handler.clone());
    let mut sink = MemoryRecordSink::new();

    experiment.run(&mut sink).await.unwrap();

    let events = handler.events.lock().unwrap();
    assert!(matches!(events.first(), Some(ExperimentEvent::RunStarted { agent_count: 2, .. })));
    assert!(matches!(
        events.last(),
        Some(ExperimentEvent::RunCompleted { records_emitted: 1, turns_failed: 1 })
    ));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, ExperimentEvent::TurnFailed { .. }))
            .count(),
        1
    );
}
