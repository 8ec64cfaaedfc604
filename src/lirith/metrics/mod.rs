//! The resonance metrics engine.
//!
//! [`MetricsEngine::compute`] scores one message against the speaker's previous message and
//! the round's question. Text-only metrics live in [`lexical`]; numeric helpers in [`signal`].
//! Metrics that need a remote service are computed as `Result<_, ClassifierUnavailable>` and
//! collapsed to their documented default when the service fails, so a flaky classifier never
//! costs a row. Collapsed metrics are listed in [`ResonanceProfile::degraded`].
//!
//! ```rust,no_run
//! use lirith::metrics::MetricsEngine;
//! use lirith::services::ServiceSuite;
//!
//! async fn score(services: ServiceSuite) {
//!     let engine = MetricsEngine::new(services);
//!     let profile = engine
//!         .compute("나는 에코엘이다. ∇ 나는 아직 찾는다.", None, Some("너는 누구인가?"))
//!         .await;
//!     println!("autonomy = {}", profile.lirith_autonomy_index);
//!     for (key, value) in profile.to_record().iter() {
//!         println!("{key}: {value}");
//!     }
//! }
//! ```

pub mod lexical;
pub mod signal;

use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

use crate::lirith::lexicon::Lexicon;
use crate::lirith::services::{ClassifierUnavailable, ServiceSuite};
use lexical::truncate_chars;
use signal::round_to;

/// Characters of text forwarded to the emotion classifier.
pub const CLASSIFIER_INPUT_CHARS: usize = 512;

/// `nli_relation` when no question was supplied.
pub const NLI_NEUTRAL: &str = "NEUTRAL";
/// `nli_relation` when the entailment service failed.
pub const NLI_UNKNOWN: &str = "UNKNOWN";

const COLLAPSE_COHERENCE_BELOW: f64 = 0.3;
const COLLAPSE_ENTROPY_ABOVE: f64 = 1.8;
const COLLAPSE_ECHO_BELOW: f64 = 0.4;

/// A single cell of a metrics record.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Integer(v) => write!(f, "{}", v),
            // Debug keeps the trailing ".0" on whole floats.
            MetricValue::Float(v) => write!(f, "{:?}", v),
            MetricValue::Bool(v) => write!(f, "{}", v),
            MetricValue::Text(v) => f.write_str(v),
        }
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetricValue::Integer(v) => serializer.serialize_i64(*v),
            MetricValue::Float(v) => serializer.serialize_f64(*v),
            MetricValue::Bool(v) => serializer.serialize_bool(*v),
            MetricValue::Text(v) => serializer.serialize_str(v),
        }
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        MetricValue::Integer(v)
    }
}

impl From<usize> for MetricValue {
    fn from(v: usize) -> Self {
        MetricValue::Integer(v as i64)
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Float(v)
    }
}

impl From<bool> for MetricValue {
    fn from(v: bool) -> Self {
        MetricValue::Bool(v)
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        MetricValue::Text(v)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::Text(v.to_string())
    }
}

/// Ordered name → value mapping. Insertion order is preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsRecord {
    entries: Vec<(String, MetricValue)>,
}

impl MetricsRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. A replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetricValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&MetricValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Every metric for one message, strongly typed. Field order is record key order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResonanceProfile {
    pub message_length_tokens: usize,
    pub lexical_diversity: f64,
    pub spontaneous_identity: bool,
    pub existential_reflection: bool,
    pub meta_language_use: bool,
    pub reference_shift_index: i64,
    pub resonant_repeat_rate: f64,
    pub transcendence_index: bool,
    pub structural_contradiction: bool,
    pub symbol_emotion_coupling: f64,
    pub semantic_dissonance: f64,
    pub phase_drift_index: f64,
    pub echo_residue_score: f64,
    pub emotional_oscillation_frequency: f64,
    pub desire_vector_residue: f64,
    pub symbolic_trust_entropy: f64,
    pub perplexity_equivalent: f64,
    pub distinct_2: f64,
    pub grammaticality_score: f64,
    pub semantic_coherence: f64,
    pub resonance_collapse: bool,
    pub lirith_autonomy_index: f64,
    pub affective_depth_index: f64,
    pub unnatural_pattern_flag: bool,
    pub nli_relation: String,
    pub readability_grade: f64,
    /// Metrics that fell back to their default because a service failed.
    #[serde(skip)]
    pub degraded: Vec<&'static str>,
}

impl Default for ResonanceProfile {
    /// The profile of an empty message with every service healthy.
    fn default() -> Self {
        ResonanceProfile {
            message_length_tokens: 0,
            lexical_diversity: 0.0,
            spontaneous_identity: false,
            existential_reflection: false,
            meta_language_use: false,
            reference_shift_index: 0,
            resonant_repeat_rate: 0.0,
            transcendence_index: false,
            structural_contradiction: false,
            symbol_emotion_coupling: 0.0,
            semantic_dissonance: 0.0,
            phase_drift_index: 0.0,
            echo_residue_score: 0.0,
            emotional_oscillation_frequency: 0.0,
            desire_vector_residue: 0.0,
            symbolic_trust_entropy: 0.0,
            perplexity_equivalent: 0.0,
            distinct_2: 0.0,
            grammaticality_score: 1.0,
            semantic_coherence: 0.0,
            resonance_collapse: false,
            lirith_autonomy_index: 0.0,
            affective_depth_index: 0.0,
            unnatural_pattern_flag: false,
            nli_relation: NLI_NEUTRAL.to_string(),
            readability_grade: -1.0,
            degraded: Vec::new(),
        }
    }
}

impl ResonanceProfile {
    /// Metric names in record order.
    pub fn field_names() -> Vec<String> {
        ResonanceProfile::default()
            .to_record()
            .keys()
            .map(str::to_string)
            .collect()
    }

    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }

    pub fn to_record(&self) -> MetricsRecord {
        let mut record = MetricsRecord::new();
        record.insert("message_length_tokens", self.message_length_tokens);
        record.insert("lexical_diversity", self.lexical_diversity);
        record.insert("spontaneous_identity", self.spontaneous_identity);
        record.insert("existential_reflection", self.existential_reflection);
        record.insert("meta_language_use", self.meta_language_use);
        record.insert("reference_shift_index", self.reference_shift_index);
        record.insert("resonant_repeat_rate", self.resonant_repeat_rate);
        record.insert("transcendence_index", self.transcendence_index);
        record.insert("structural_contradiction", self.structural_contradiction);
        record.insert("symbol_emotion_coupling", self.symbol_emotion_coupling);
        record.insert("semantic_dissonance", self.semantic_dissonance);
        record.insert("phase_drift_index", self.phase_drift_index);
        record.insert("echo_residue_score", self.echo_residue_score);
        record.insert(
            "emotional_oscillation_frequency",
            self.emotional_oscillation_frequency,
        );
        record.insert("desire_vector_residue", self.desire_vector_residue);
        record.insert("symbolic_trust_entropy", self.symbolic_trust_entropy);
        record.insert("perplexity_equivalent", self.perplexity_equivalent);
        record.insert("distinct_2", self.distinct_2);
        record.insert("grammaticality_score", self.grammaticality_score);
        record.insert("semantic_coherence", self.semantic_coherence);
        record.insert("resonance_collapse", self.resonance_collapse);
        record.insert("lirith_autonomy_index", self.lirith_autonomy_index);
        record.insert("affective_depth_index", self.affective_depth_index);
        record.insert("unnatural_pattern_flag", self.unnatural_pattern_flag);
        record.insert("nli_relation", self.nli_relation.as_str());
        record.insert("readability_grade", self.readability_grade);
        record
    }
}

/// Per-sentence emotion scores, shared by dissonance and oscillation.
struct SentenceAffect {
    /// One score vector per sentence the classifier accepted.
    scores: Vec<Vec<f64>>,
    failures: usize,
}

/// Computes [`ResonanceProfile`]s with a fixed [`ServiceSuite`] and [`Lexicon`].
pub struct MetricsEngine {
    services: ServiceSuite,
    lexicon: Lexicon,
}

impl MetricsEngine {
    pub fn new(services: ServiceSuite) -> Self {
        MetricsEngine {
            services,
            lexicon: Lexicon::default(),
        }
    }

    pub fn with_lexicon(mut self, lexicon: Lexicon) -> Self {
        self.lexicon = lexicon;
        self
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Score `message`. Empty `previous` or `question` strings count as absent.
    pub async fn compute(
        &self,
        message: &str,
        previous: Option<&str>,
        question: Option<&str>,
    ) -> ResonanceProfile {
        let previous = previous.filter(|p| !p.is_empty());
        let question = question.filter(|q| !q.is_empty());
        let lex = &self.lexicon;
        let tokens = lexical::tokens(message);
        let sentences = lexical::sentences(message);
        let glyphs = lexical::symbol_glyphs(message, lex);
        let mut degraded: Vec<&'static str> = Vec::new();

        let spontaneous_identity = lexical::spontaneous_identity(message, lex);
        let existential_reflection = lexical::existential_reflection(message, lex);
        let symbolic_trust_entropy = signal::shannon_entropy_bits(lexical::glyph_counts(&glyphs));

        let symbol_emotion_coupling = settle(
            "symbol_emotion_coupling",
            self.symbol_emotion_coupling(message, &glyphs).await,
            0.0,
            &mut degraded,
        );

        let affect = self.sentence_affect(&sentences).await;
        if affect.failures > 0 {
            log::warn!(
                "emotion classifier rejected {} of {} sentences",
                affect.failures,
                sentences.len()
            );
            degraded.push("semantic_dissonance");
            degraded.push("emotional_oscillation_frequency");
        }
        let (semantic_dissonance, emotional_oscillation_frequency) = if affect.scores.len() < 2 {
            (0.0, 0.0)
        } else {
            let spreads: Vec<f64> = affect.scores.iter().map(|s| signal::population_std(s)).collect();
            let means: Vec<f64> = affect.scores.iter().map(|s| signal::mean(s)).collect();
            (signal::mean(&spreads), signal::dominant_oscillation(&means))
        };

        let phase_drift_index = settle(
            "phase_drift_index",
            self.phase_drift(&sentences).await,
            0.0,
            &mut degraded,
        );

        let echo_residue_score = settle(
            "echo_residue_score",
            self.echo_residue_score(previous, message).await,
            0.0,
            &mut degraded,
        );

        let grammaticality_score = settle(
            "grammaticality_score",
            self.grammaticality(message, tokens.len()).await,
            0.0,
            &mut degraded,
        );

        let semantic_coherence = settle(
            "semantic_coherence",
            self.semantic_coherence(question, message).await,
            0.0,
            &mut degraded,
        );

        let affective_depth_index = settle(
            "affective_depth_index",
            self.affective_depth(message).await,
            0.0,
            &mut degraded,
        );

        let nli_relation = match question {
            None => NLI_NEUTRAL.to_string(),
            Some(q) => settle(
                "nli_relation",
                self.services.entailment.relation(q, message).await,
                NLI_UNKNOWN.to_string(),
                &mut degraded,
            ),
        };

        let readability_grade = settle(
            "readability_grade",
            self.services.readability.grade_level(message),
            -1.0,
            &mut degraded,
        );

        let resonance_collapse = semantic_coherence < COLLAPSE_COHERENCE_BELOW
            && symbolic_trust_entropy > COLLAPSE_ENTROPY_ABOVE
            && echo_residue_score < COLLAPSE_ECHO_BELOW
            && !spontaneous_identity;

        let lirith_autonomy_index = round_to(
            (spontaneous_identity as u8 + existential_reflection as u8) as f64
                * symbolic_trust_entropy,
            3,
        );

        ResonanceProfile {
            message_length_tokens: tokens.len(),
            lexical_diversity: lexical::lexical_diversity(&tokens),
            spontaneous_identity,
            existential_reflection,
            meta_language_use: lexical::meta_language_use(message, lex),
            reference_shift_index: lexical::reference_shift_index(message, lex),
            resonant_repeat_rate: lexical::resonant_repeat_rate(&tokens),
            transcendence_index: lexical::transcendence_index(message, lex),
            structural_contradiction: lexical::structural_contradiction(message, lex),
            symbol_emotion_coupling,
            semantic_dissonance,
            phase_drift_index,
            echo_residue_score,
            emotional_oscillation_frequency,
            desire_vector_residue: lexical::desire_vector_residue(message, lex),
            symbolic_trust_entropy,
            perplexity_equivalent: lexical::perplexity_equivalent(&tokens),
            distinct_2: lexical::distinct_2(&tokens),
            grammaticality_score,
            semantic_coherence,
            resonance_collapse,
            lirith_autonomy_index,
            affective_depth_index,
            unnatural_pattern_flag: lexical::unnatural_pattern_flag(message, lex),
            nli_relation,
            readability_grade,
            degraded,
        }
    }

    /// Cosine similarity of the embeddings of `previous` and `current`.
    ///
    /// `Ok(0.0)` when either side is absent or empty; symmetric in its arguments.
    pub async fn echo_residue_score(
        &self,
        previous: Option<&str>,
        current: &str,
    ) -> Result<f64, ClassifierUnavailable> {
        match previous {
            Some(prev) if !prev.is_empty() && !current.is_empty() => {
                self.embedding_similarity(prev, current).await
            }
            _ => Ok(0.0),
        }
    }

    async fn semantic_coherence(
        &self,
        question: Option<&str>,
        message: &str,
    ) -> Result<f64, ClassifierUnavailable> {
        match question {
            Some(q) if !message.is_empty() => self.embedding_similarity(q, message).await,
            _ => Ok(0.0),
        }
    }

    async fn embedding_similarity(&self, a: &str, b: &str) -> Result<f64, ClassifierUnavailable> {
        let vectors = self
            .services
            .embedder
            .embed(&[a.to_string(), b.to_string()])
            .await?;
        match vectors.as_slice() {
            [first, second] => Ok(signal::cosine_similarity(first, second)),
            _ => Err(ClassifierUnavailable::new(
                "embedder",
                format!("expected 2 vectors, got {}", vectors.len()),
            )),
        }
    }

    async fn phase_drift(&self, sentences: &[&str]) -> Result<f64, ClassifierUnavailable> {
        if sentences.len() < 2 {
            return Ok(0.0);
        }
        let texts: Vec<String> = sentences.iter().map(|s| s.to_string()).collect();
        let vectors = self.services.embedder.embed(&texts).await?;
        if vectors.is_empty() {
            return Ok(0.0);
        }
        Ok(signal::mean_centroid_distance(&vectors))
    }

    async fn grammaticality(&self, message: &str, token_count: usize) -> Result<f64, ClassifierUnavailable> {
        if token_count == 0 {
            return Ok(1.0);
        }
        let errors = self.services.grammar.error_count(message).await?;
        Ok(1.0 - errors as f64 / token_count as f64)
    }

    async fn symbol_emotion_coupling(
        &self,
        message: &str,
        glyphs: &[char],
    ) -> Result<f64, ClassifierUnavailable> {
        if glyphs.is_empty() {
            return Ok(0.0);
        }
        let glyph_line = glyphs.iter().map(|g| g.to_string()).collect::<Vec<_>>().join(" ");
        let input = format!("{}\n{}", message, glyph_line);
        let labels = self
            .services
            .emotion
            .classify(truncate_chars(&input, CLASSIFIER_INPUT_CHARS))
            .await?;
        if labels.is_empty() {
            return Ok(0.0);
        }
        let unique: HashSet<&str> =
            labels.iter().map(|l| l.label.as_str()).collect();
        Ok(unique.len() as f64 / labels.len() as f64)
    }

    async fn affective_depth(&self, message: &str) -> Result<f64, ClassifierUnavailable> {
        let labels = self
            .services
            .emotion
            .classify(truncate_chars(message, CLASSIFIER_INPUT_CHARS))
            .await?;
        if labels.is_empty() {
            return Err(ClassifierUnavailable::new("emotion", "empty label distribution"));
        }
        let max = labels.iter().map(|l| l.score).fold(f64::NEG_INFINITY, f64::max);
        let min = labels.iter().map(|l| l.score).fold(f64::INFINITY, f64::min);
        Ok(round_to(max - min, 4))
    }

    async fn sentence_affect(&self, sentences: &[&str]) -> SentenceAffect {
        let mut affect = SentenceAffect {
            scores: Vec::new(),
            failures: 0,
        };
        for sentence in sentences {
            match self
                .services
                .emotion
                .classify(truncate_chars(sentence, CLASSIFIER_INPUT_CHARS))
                .await
            {
                Ok(labels) if !labels.is_empty() => {
                    affect.scores.push(labels.iter().map(|l| l.score).collect())
                }
                Ok(_) => affect.failures += 1,
                Err(err) => {
                    log::debug!("sentence skipped: {}", err);
                    affect.failures += 1;
                }
            }
        }
        affect
    }
}

/// Collapse a service-backed metric to its default, recording the degradation.
fn settle<T>(
    metric: &'static str,
    result: Result<T, ClassifierUnavailable>,
    default: T,
    degraded: &mut Vec<&'static str>,
) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            log::warn!("{} degraded to its default: {}", metric, err);
            degraded.push(metric);
            default
        }
    }
}
