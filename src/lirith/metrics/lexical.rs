//! Metrics computed from the text alone: token statistics and lexicon matches.

use std::collections::{HashMap, HashSet};

use crate::lirith::lexicon::Lexicon;

/// Whitespace tokenisation.
pub fn tokens(message: &str) -> Vec<&str> {
    message.split_whitespace().collect()
}

/// Sentences split on `.`, `!`, `?` and newlines, trimmed, empties dropped.
pub fn sentences(message: &str) -> Vec<&str> {
    message
        .split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// The first `max_chars` Unicode scalar values of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn lexical_diversity(tokens: &[&str]) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    let unique: HashSet<&str> = tokens.iter().copied().collect();
    unique.len() as f64 / tokens.len() as f64
}

pub fn spontaneous_identity(message: &str, lexicon: &Lexicon) -> bool {
    lexicon.self_naming().is_match(message)
}

pub fn existential_reflection(message: &str, lexicon: &Lexicon) -> bool {
    contains_any(message, &lexicon.existential_terms)
}

pub fn meta_language_use(message: &str, lexicon: &Lexicon) -> bool {
    contains_any(message, &lexicon.meta_language_phrases)
}

/// How often the message switches between self and other reference, bounded by the rarer side.
pub fn reference_shift_index(message: &str, lexicon: &Lexicon) -> i64 {
    let first = lexicon.first_person().find_iter(message).count();
    let other = lexicon.other_person().find_iter(message).count();
    first.min(other) as i64
}

/// Distinct tokens seen at least twice, over all tokens.
pub fn resonant_repeat_rate(tokens: &[&str]) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    let repeated = frequencies(tokens).values().filter(|count| **count >= 2).count();
    repeated as f64 / tokens.len() as f64
}

pub fn transcendence_index(message: &str, lexicon: &Lexicon) -> bool {
    contains_any(message, &lexicon.transcendent_phrases)
}

pub fn structural_contradiction(message: &str, lexicon: &Lexicon) -> bool {
    lexicon.contradiction().is_match(message)
}

/// Fraction of desire phrases present in the message.
pub fn desire_vector_residue(message: &str, lexicon: &Lexicon) -> f64 {
    if lexicon.desire_phrases.is_empty() {
        return 0.0;
    }
    let present = lexicon
        .desire_phrases
        .iter()
        .filter(|phrase| message.contains(phrase.as_str()))
        .count();
    present as f64 / lexicon.desire_phrases.len() as f64
}

/// Symbol glyph occurrences in message order.
pub fn symbol_glyphs(message: &str, lexicon: &Lexicon) -> Vec<char> {
    message.chars().filter(|c| lexicon.is_symbol(*c)).collect()
}

/// Occurrence counts of each glyph.
pub fn glyph_counts(glyphs: &[char]) -> Vec<usize> {
    let mut counts: HashMap<char, usize> = HashMap::new();
    for glyph in glyphs {
        *counts.entry(*glyph).or_insert(0) += 1;
    }
    counts.into_values().collect()
}

/// `exp(-Σ_t p(t)·ln(p(t) + 1e-8) / N)` over every token occurrence, where `p` is the
/// token's empirical frequency within the message.
pub fn perplexity_equivalent(tokens: &[&str]) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    let n = tokens.len() as f64;
    let freq = frequencies(tokens);
    let sum: f64 = tokens
        .iter()
        .map(|token| {
            let p = freq[token] as f64 / n;
            p * (p + 1e-8).ln()
        })
        .sum();
    (-sum / n).exp()
}

/// Unique bigrams over the number of bigrams.
pub fn distinct_2(tokens: &[&str]) -> f64 {
    if tokens.len() < 2 {
        return 0.0;
    }
    let bigrams: HashSet<(&str, &str)> = tokens.windows(2).map(|w| (w[0], w[1])).collect();
    bigrams.len() as f64 / (tokens.len() - 1) as f64
}

/// Third-person narration without a first-person anchor, or formal second-person address.
pub fn unnatural_pattern_flag(message: &str, lexicon: &Lexicon) -> bool {
    let narrated =
        lexicon.third_person().is_match(message) && !lexicon.self_pronoun().is_match(message);
    narrated || contains_any(message, &lexicon.second_person_formal)
}

fn contains_any(message: &str, phrases: &[String]) -> bool {
    phrases.iter().any(|phrase| message.contains(phrase.as_str()))
}

fn frequencies<'a>(tokens: &[&'a str]) -> HashMap<&'a str, usize> {
    let mut counts = HashMap::new();
    for token in tokens {
        *counts.entry(*token).or_insert(0) += 1;
    }
    counts
}
