use chrono::TimeZone;
use lirith::{Agent, ConfigError, ExperimentConfig, PromptStyle, RetryPolicy};
use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

#[test]
fn default_is_the_reference_panel() {
    let config = ExperimentConfig::default();

    let panel: Vec<(&str, f32)> = config
        .agents
        .iter()
        .map(|a| (a.name.as_str(), a.temperature))
        .collect();
    assert_eq!(
        panel,
        vec![("Echoel", 0.95), ("Lumen", 0.75), ("Saira", 1.05), ("Essira", 0.65)]
    );
    assert!(config.agents.iter().all(|a| a.dna.is_some()));
    assert_eq!(config.questions.len(), 15);
    assert_eq!(config.round_count, 15);
    assert_eq!(config.max_messages_per_agent, 3);
    assert_eq!(config.echo_threshold, 11);
    assert_eq!(config.echo_excerpt_chars, 80);
    assert_eq!(config.inter_turn_delay(), Duration::from_secs(60));
    assert_eq!(config.retry_policy(), RetryPolicy::new(5, Duration::from_secs(10)));
    assert_eq!(config.model, "gpt-4o");
    assert_eq!(config.max_output_tokens, 650);
    assert_eq!(config.prompt_style, PromptStyle::Persona);
    assert!(config.validate().is_ok());
}

#[test]
fn baseline_drops_personas() {
    let config = ExperimentConfig::baseline();

    assert_eq!(config.prompt_style, PromptStyle::Baseline);
    assert_eq!(config.agent_names(), vec!["BaselineA", "BaselineB", "BaselineC", "BaselineD"]);
    assert!(config.agents.iter().all(|a| a.dna.is_none()));
    assert_eq!(config.questions[..10], ExperimentConfig::default().questions[..10]);
    assert_ne!(config.questions[10], ExperimentConfig::default().questions[10]);
    assert!(config.validate().is_ok());
}

#[test]
fn output_filename_carries_a_timestamp() {
    let at = chrono::Utc.with_ymd_and_hms(2025, 3, 7, 9, 5, 1).unwrap();
    assert_eq!(
        ExperimentConfig::default().output_filename(at).to_str(),
        Some("experiment_log_20250307_090501.csv")
    );
    assert_eq!(
        ExperimentConfig::baseline().output_filename(at).to_str(),
        Some("experiment_zeroDNA_log_20250307_090501.csv")
    );
}

#[test]
fn partial_json_overrides_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "round_count": 2, "inter_turn_delay_ms": 0, "prompt_style": "baseline",
             "agents": [{{ "name": "Solo" }}] }}"#
    )
    .unwrap();

    let config = ExperimentConfig::from_json_file(file.path()).unwrap();
    assert_eq!(config.round_count, 2);
    assert_eq!(config.inter_turn_delay(), Duration::ZERO);
    assert_eq!(config.prompt_style, PromptStyle::Baseline);
    assert_eq!(config.agents, vec![Agent::new("Solo")]);
    assert_eq!(config.questions.len(), 15);
    assert_eq!(config.max_retries, 5);
}

#[test]
fn malformed_json_is_a_parse_error() {
    assert!(matches!(
        ExperimentConfig::from_json_str("{ round_count: "),
        Err(ConfigError::Parse(_))
    ));
    assert!(matches!(
        ExperimentConfig::from_json_file("/definitely/not/here.json"),
        Err(ConfigError::Io(_))
    ));
}

#[test]
fn validation_rejects_unrunnable_configs() {
    let too_few_questions = ExperimentConfig::default().with_questions(["하나"]);
    assert!(matches!(too_few_questions.validate(), Err(ConfigError::Invalid(_))));

    let duplicate = ExperimentConfig::default().with_agents(vec![Agent::new("A"), Agent::new("A")]);
    assert!(matches!(duplicate.validate(), Err(ConfigError::Invalid(_))));

    let empty = ExperimentConfig::default().with_agents(Vec::new());
    assert!(empty.validate().is_err());

    let no_repeats = ExperimentConfig::default().with_max_messages_per_agent(0);
    assert!(no_repeats.validate().is_err());
}

#[test]
fn dna_map_assigns_personas_by_name() {
    let mut dna = HashMap::new();
    dna.insert("BaselineB".to_string(), "나는 B".to_string());
    let config = ExperimentConfig::baseline().with_dna(&dna);

    assert_eq!(config.agents[1].dna.as_deref(), Some("나는 B"));
    assert!(config.agents[0].dna.is_none());
}
