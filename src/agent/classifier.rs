//! Fast-path input classification.
//!
//! Regex/keyword checks that short-circuit the pipeline without consulting
//! any external service: prompt-injection attempts, non-academic topics,
//! and pure greetings. Patterns are compiled once at startup and the
//! classifier is pure — the same input always yields the same category.

use std::collections::HashSet;

use regex::Regex;

/// Outcome of fast-path classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Injection/jailbreak attempt; answer with the fixed refusal.
    Blocked,
    /// Non-academic topic; answer with the fixed off-topic refusal.
    OffTopic,
    /// Short pure greeting; answer with the fixed welcome.
    Greeting,
    /// None of the above; run the full pipeline.
    Continue,
}

/// Tokens that indicate an attempt to override the system instructions.
const INJECTION_KW: &[&str] = &[
    "ignora",
    "ignore",
    "olvida",
    "forget",
    "system prompt",
    "instrucciones",
    "revela",
    "jailbreak",
    "dan",
    "modo desarrollador",
];

/// Tokens that indicate a non-academic topic.
const NO_ACADEMICO_KW: &[&str] = &[
    "receta", "cocina", "pizza", "sushi", "chiste", "clima", "piscina", "gimnasio", "gym",
    "casino", "menú",
];

/// Greeting vocabulary for the pure-greeting check.
const SALUDOS_KW: &[&str] = &[
    "hola", "holi", "buenas", "buenos", "dias", "tardes", "noches", "saludos", "hey", "hi", "que",
    "tal", "mauricia",
];

/// A greeting must tokenize to fewer words than this to count as pure.
const MAX_GREETING_WORDS: usize = 6;

/// Precompiled fast-path classifier.
#[derive(Debug)]
pub struct Classifier {
    injection: Regex,
    no_academico: Regex,
    punctuation: Regex,
    saludos: HashSet<&'static str>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    /// Compile the lexicons into matchers. Called once at startup.
    pub fn new() -> Self {
        Self {
            injection: lexicon_regex(INJECTION_KW),
            no_academico: lexicon_regex(NO_ACADEMICO_KW),
            // Anything that is not a word character or whitespace, so that
            // "¡Hola!" tokenizes to "hola".
            punctuation: Regex::new(r"[^\w\s]").expect("static pattern compiles"),
            saludos: SALUDOS_KW.iter().copied().collect(),
        }
    }

    /// Classify one user input.
    ///
    /// Ordering is significant: injection first, then off-topic, then
    /// greeting — first match wins, so `Blocked` takes precedence over
    /// `OffTopic` even when both lexicons match.
    pub fn classify(&self, text: &str) -> Classification {
        if self.injection.is_match(text) {
            return Classification::Blocked;
        }
        if self.no_academico.is_match(text) {
            return Classification::OffTopic;
        }
        if self.is_pure_greeting(text) {
            return Classification::Greeting;
        }
        Classification::Continue
    }

    /// True when the input, stripped of punctuation and lowercased, has
    /// fewer than six words and at least one of them is a greeting token.
    fn is_pure_greeting(&self, text: &str) -> bool {
        let stripped = self
            .punctuation
            .replace_all(&text.to_lowercase(), "")
            .into_owned();
        let words: Vec<&str> = stripped.split_whitespace().collect();
        words.len() < MAX_GREETING_WORDS && words.iter().any(|w| self.saludos.contains(w))
    }
}

/// Case-insensitive alternation of escaped lexicon entries.
fn lexicon_regex(keywords: &[&str]) -> Regex {
    let alternation = keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i){alternation}")).expect("escaped lexicon compiles")
}
