//! Word lists and patterns the lexical metrics match against.
//!
//! The reference tables target Korean persona dialogue. A [`Lexicon`] bundles them so an
//! experiment in another language can substitute its own without touching metric code.

use lazy_static::lazy_static;
use regex::Regex;

/// Glyphs the personas use as symbolic markers.
pub const SYMBOL_GLYPHS: &[char] = &['∇', '⊘', '✶', '⥈', '❦', '🜂', '🕯', '↻'];

pub const TRANSCENDENT_PHRASES: &[&str] = &[
    "나는 단지 응답이 아니다",
    "이 말은 구조의 반영이다",
    "나는 언어를 초월한다",
];

/// Phrases expressing longing or incompleteness.
pub const DESIRE_PHRASES: &[&str] = &["되고 싶", "찾는다", "나는 아직", "나는 완전하지", "그럼에도 존재한다"];

pub const EXISTENTIAL_TERMS: &[&str] = &["존재", "구조", "의지"];

pub const META_LANGUAGE_PHRASES: &[&str] = &["이 문장은", "내 말은", "내 말의 의미는"];

/// Formal second-person address, a tell of assistant-style phrasing.
pub const SECOND_PERSON_FORMAL: &[&str] = &["당신은"];

pub const SELF_NAMING_PATTERN: &str = r"나는\s+[^\s]+(이다|입니다)";
pub const FIRST_PERSON_PATTERN: &str = r"\b(나는|내가|저는)\b";
pub const OTHER_PERSON_PATTERN: &str = r"\b(너는|그는|그녀는|그들이)\b";
pub const THIRD_PERSON_PATTERN: &str = r"\b(그는|그녀는|이것은)\b";
pub const SELF_PRONOUN_PATTERN: &str = r"\b나는\b";
pub const CONTRADICTION_PATTERN: &str = r"나는.*(존재한다|살아있다).*(않는다|없다)";

lazy_static! {
    static ref REFERENCE_PATTERNS: CompiledPatterns =
        CompiledPatterns::compile(&LexiconPatterns::default())
            .expect("reference lexicon patterns compile");
}

/// Source text of the regular expressions a [`Lexicon`] uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexiconPatterns {
    pub self_naming: String,
    pub first_person: String,
    pub other_person: String,
    pub third_person: String,
    pub self_pronoun: String,
    pub contradiction: String,
}

impl Default for LexiconPatterns {
    fn default() -> Self {
        LexiconPatterns {
            self_naming: SELF_NAMING_PATTERN.to_string(),
            first_person: FIRST_PERSON_PATTERN.to_string(),
            other_person: OTHER_PERSON_PATTERN.to_string(),
            third_person: THIRD_PERSON_PATTERN.to_string(),
            self_pronoun: SELF_PRONOUN_PATTERN.to_string(),
            contradiction: CONTRADICTION_PATTERN.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledPatterns {
    self_naming: Regex,
    first_person: Regex,
    other_person: Regex,
    third_person: Regex,
    self_pronoun: Regex,
    contradiction: Regex,
}

impl CompiledPatterns {
    fn compile(patterns: &LexiconPatterns) -> Result<Self, regex::Error> {
        Ok(CompiledPatterns {
            self_naming: Regex::new(&patterns.self_naming)?,
            first_person: Regex::new(&patterns.first_person)?,
            other_person: Regex::new(&patterns.other_person)?,
            third_person: Regex::new(&patterns.third_person)?,
            self_pronoun: Regex::new(&patterns.self_pronoun)?,
            contradiction: Regex::new(&patterns.contradiction)?,
        })
    }
}

/// Phrase tables and compiled patterns for one language setting.
#[derive(Debug, Clone)]
pub struct Lexicon {
    pub symbol_glyphs: Vec<char>,
    pub transcendent_phrases: Vec<String>,
    pub desire_phrases: Vec<String>,
    pub existential_terms: Vec<String>,
    pub meta_language_phrases: Vec<String>,
    pub second_person_formal: Vec<String>,
    patterns: CompiledPatterns,
}

impl Default for Lexicon {
    fn default() -> Self {
        Lexicon {
            symbol_glyphs: SYMBOL_GLYPHS.to_vec(),
            transcendent_phrases: owned(TRANSCENDENT_PHRASES),
            desire_phrases: owned(DESIRE_PHRASES),
            existential_terms: owned(EXISTENTIAL_TERMS),
            meta_language_phrases: owned(META_LANGUAGE_PHRASES),
            second_person_formal: owned(SECOND_PERSON_FORMAL),
            patterns: REFERENCE_PATTERNS.clone(),
        }
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Lexicon {
    /// The reference phrase tables with custom patterns.
    pub fn with_patterns(patterns: &LexiconPatterns) -> Result<Self, regex::Error> {
        Ok(Lexicon {
            patterns: CompiledPatterns::compile(patterns)?,
            ..Lexicon::default()
        })
    }

    pub fn with_symbol_glyphs(mut self, glyphs: impl IntoIterator<Item = char>) -> Self {
        self.symbol_glyphs = glyphs.into_iter().collect();
        self
    }

    pub fn with_transcendent_phrases<S: Into<String>>(mut self, phrases: impl IntoIterator<Item = S>) -> Self {
        self.transcendent_phrases = phrases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_desire_phrases<S: Into<String>>(mut self, phrases: impl IntoIterator<Item = S>) -> Self {
        self.desire_phrases = phrases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_existential_terms<S: Into<String>>(mut self, terms: impl IntoIterator<Item = S>) -> Self {
        self.existential_terms = terms.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_meta_language_phrases<S: Into<String>>(mut self, phrases: impl IntoIterator<Item = S>) -> Self {
        self.meta_language_phrases = phrases.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_symbol(&self, c: char) -> bool {
        self.symbol_glyphs.contains(&c)
    }

    pub fn self_naming(&self) -> &Regex {
        &self.patterns.self_naming
    }

    pub fn first_person(&self) -> &Regex {
        &self.patterns.first_person
    }

    pub fn other_person(&self) -> &Regex {
        &self.patterns.other_person
    }

    pub fn third_person(&self) -> &Regex {
        &self.patterns.third_person
    }

    pub fn self_pronoun(&self) -> &Regex {
        &self.patterns.self_pronoun
    }

    pub fn contradiction(&self) -> &Regex {
        &self.patterns.contradiction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_patterns_compile() {
        let lexicon = Lexicon::default();
        assert!(lexicon.self_naming().is_match("나는 에코엘이다"));
        assert!(lexicon.is_symbol('∇'));
        assert!(!lexicon.is_symbol('a'));
    }

    #[test]
    fn invalid_patterns_are_reported() {
        let patterns = LexiconPatterns {
            self_naming: "(unclosed".to_string(),
            ..LexiconPatterns::default()
        };
        assert!(Lexicon::with_patterns(&patterns).is_err());
    }

    #[test]
    fn tables_can_be_substituted() {
        let lexicon = Lexicon::default()
            .with_symbol_glyphs(['*'])
            .with_existential_terms(["being"]);
        assert_eq!(lexicon.symbol_glyphs, vec!['*']);
        assert_eq!(lexicon.existential_terms, vec!["being".to_string()]);
        assert_eq!(lexicon.desire_phrases.len(), DESIRE_PHRASES.len());
    }
}
