//! Local Flesch–Kincaid grade level.
//!
//! `0.39 · (words / sentences) + 11.8 · (syllables / words) − 15.59`, rounded to one decimal.
//! Latin words count syllables as vowel groups (a trailing silent `e` is dropped, every word
//! has at least one). Each precomposed Hangul block is one syllable.

use crate::lirith::services::{ClassifierUnavailable, ReadabilityScorer};

/// The reference [`ReadabilityScorer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FleschKincaid;

impl ReadabilityScorer for FleschKincaid {
    fn grade_level(&self, text: &str) -> Result<f64, ClassifierUnavailable> {
        let words: Vec<String> = text
            .split_whitespace()
            .map(|w| w.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
            .filter(|w| !w.is_empty())
            .collect();
        if words.is_empty() {
            return Err(ClassifierUnavailable::new("readability", "text has no words"));
        }

        let sentences = text
            .split(['.', '!', '?'])
            .filter(|s| s.chars().any(char::is_alphanumeric))
            .count()
            .max(1);
        let syllables: usize = words.iter().map(|w| syllable_count(w)).sum();

        let words_per_sentence = words.len() as f64 / sentences as f64;
        let syllables_per_word = syllables as f64 / words.len() as f64;
        let grade = 0.39 * words_per_sentence + 11.8 * syllables_per_word - 15.59;
        Ok((grade * 10.0).round() / 10.0)
    }
}

fn is_hangul_syllable(c: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

fn syllable_count(word: &str) -> usize {
    let hangul = word.chars().filter(|c| is_hangul_syllable(*c)).count();
    let latin: String = word
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    let mut groups = 0;
    let mut previous_vowel = false;
    for c in latin.chars() {
        let vowel = matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
        if vowel && !previous_vowel {
            groups += 1;
        }
        previous_vowel = vowel;
    }
    if latin.ends_with('e') && !latin.ends_with("le") && groups > 1 {
        groups -= 1;
    }
    if !latin.is_empty() {
        groups = groups.max(1);
    }

    (hangul + groups).max(1)
}
