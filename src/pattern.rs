use std::{fmt::Display, sync::Arc};

use crate::{
    fsm::{ReError, RegexNFA},
    matching::{Matcher, Matches},
    parser::Token,
};

/// A compiled pattern. Cloning is cheap and every clone, like every
/// `Matcher` created from it, shares the same automaton.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    nfa: Arc<RegexNFA>,
}

impl Pattern {
    pub fn compile(pattern: &str) -> Result<Pattern, ReError> {
        let nfa = RegexNFA::new(pattern)?;
        Ok(Pattern {
            source: pattern.to_string(),
            nfa: Arc::new(nfa),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn tokens(&self) -> &[Token] {
        self.nfa.tokens()
    }

    pub fn matcher(&self, text: &str) -> Matcher {
        Matcher::new(Arc::clone(&self.nfa), text)
    }

    /// Whether the whole of `text` matches.
    pub fn matches(&self, text: &str) -> bool {
        self.matcher(text).matches()
    }

    pub fn find_iter(&self, text: &str) -> Matches {
        Matches::new(self.matcher(text))
    }

    pub fn render(&self) -> String {
        self.nfa.render()
    }
}

impl Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}
