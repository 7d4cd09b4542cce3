use std::{collections::HashSet, iter::FusedIterator, sync::Arc};

use itertools::Itertools;
use log::{debug, trace};

use crate::fsm::{ReError, RegexNFA};

#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Span {
    pub start: usize,
    pub end: usize,
}

/// A partial match in flight: the vertex it sits on and the text offset of
/// the first character it consumed.
#[derive(Debug, Clone, Copy)]
struct MatchState {
    vertex: usize,
    start: Option<usize>,
}

fn is_full_match(nfa: &RegexNFA, text: &[char]) -> bool {
    let mut current = nfa.epsilon_closure([nfa.start()]);
    for &c in text {
        current = nfa.epsilon_closure(
            current
                .iter()
                .filter(|&&state| nfa.accepts(state, c))
                .map(|&state| state + 1),
        );
        if current.is_empty() {
            return false;
        }
    }
    current.contains(&nfa.accept())
}

fn start_states(nfa: &RegexNFA) -> impl Iterator<Item = MatchState> {
    nfa.epsilon_closure([nfa.start()])
        .into_iter()
        .map(|vertex| MatchState {
            vertex,
            start: None,
        })
}

/// Every span of `text` the automaton accepts, overlapping and empty ones
/// included. A new attempt starts at each position.
fn search(nfa: &RegexNFA, text: &[char]) -> HashSet<Span> {
    let accept = nfa.accept();
    let mut spans: HashSet<Span> = HashSet::new();
    let mut live: Vec<MatchState> = start_states(nfa).collect();

    for i in 0..=text.len() {
        trace!("position {}: {} live states", i, live.len());
        let mut next: Vec<MatchState> = Vec::new();
        for state in live {
            if state.vertex == accept {
                spans.insert(Span {
                    start: state.start.unwrap_or(i),
                    end: i,
                });
                continue;
            }
            let c = match text.get(i) {
                Some(&c) if nfa.accepts(state.vertex, c) => c,
                _ => continue,
            };
            let start = state.start.unwrap_or(i);
            trace!("{} at {} advances from {}", c, i, state.vertex);
            for vertex in nfa.epsilon_closure([state.vertex + 1]) {
                if vertex == accept {
                    spans.insert(Span { start, end: i + 1 });
                } else {
                    next.push(MatchState {
                        vertex,
                        start: Some(start),
                    });
                }
            }
        }
        next.extend(start_states(nfa));
        live = next
            .into_iter()
            .unique_by(|state| (state.vertex, state.start))
            .collect();
    }
    spans
}

/// Orders spans leftmost first and, at equal starts, longest first. Unless
/// `keep_all_overlaps` is set, a span is dropped when it shares its start
/// with the retained span before it or starts before that span ends.
fn select_matches(spans: HashSet<Span>, keep_all_overlaps: bool) -> Vec<Span> {
    let mut selected: Vec<Span> = spans
        .into_iter()
        .sorted_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)))
        .collect();
    if !keep_all_overlaps {
        selected.dedup_by(|next, current| current.end > next.start || current.start == next.start);
    }
    selected
}

/// Runs a compiled pattern over one text. Results are computed lazily by
/// `find` or up front by `find_matches`, then walked with a cursor.
#[derive(Debug, Clone)]
pub struct Matcher {
    nfa: Arc<RegexNFA>,
    text: Vec<char>,
    matches: Option<Vec<Span>>,
    cursor: Option<usize>,
}

impl Matcher {
    pub(crate) fn new(nfa: Arc<RegexNFA>, text: &str) -> Matcher {
        Matcher {
            nfa,
            text: text.chars().collect(),
            matches: None,
            cursor: None,
        }
    }

    /// Whether the whole text matches. On success the current match is the
    /// entire text.
    pub fn matches(&mut self) -> bool {
        let matched = is_full_match(&self.nfa, &self.text);
        if matched {
            self.matches = Some(vec![Span {
                start: 0,
                end: self.text.len(),
            }]);
            self.cursor = Some(0);
        } else {
            self.matches = None;
            self.cursor = None;
        }
        matched
    }

    /// Computes the matches to iterate over and rewinds the cursor. Returns
    /// how many there are.
    pub fn find_matches(&mut self, all_matches: bool) -> usize {
        let selected = select_matches(search(&self.nfa, &self.text), all_matches);
        debug!(
            "found {} matches over {} chars (all matches: {})",
            selected.len(),
            self.text.len(),
            all_matches
        );
        let count = selected.len();
        self.matches = Some(selected);
        self.cursor = None;
        count
    }

    /// Advances to the next match, computing the greedy non-overlapping
    /// matches on first use.
    pub fn find(&mut self) -> bool {
        if self.matches.is_none() {
            self.find_matches(false);
        }
        let count = self.matches.as_ref().map_or(0, Vec::len);
        let next = self.cursor.map_or(0, |cursor| (cursor + 1).min(count));
        self.cursor = Some(next);
        next < count
    }

    fn current(&self) -> Result<Span, ReError> {
        match (&self.matches, self.cursor) {
            (Some(matches), Some(cursor)) if !matches.is_empty() => {
                Ok(matches[cursor.min(matches.len() - 1)])
            }
            _ => Err(ReError::IllegalState),
        }
    }

    pub fn start(&self) -> Result<usize, ReError> {
        Ok(self.current()?.start)
    }

    pub fn end(&self) -> Result<usize, ReError> {
        Ok(self.current()?.end)
    }

    pub fn group(&self) -> Result<String, ReError> {
        let span = self.current()?;
        Ok(self.text[span.start..span.end].iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    start: usize,
    end: usize,
    text: String,
}

impl Match {
    pub fn new(start: usize, end: usize, text: String) -> Self {
        Match { start, end, text }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn span(&self) -> (usize, usize) {
        (self.start, self.end)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Greedy, non-overlapping matches of a pattern in one text.
#[derive(Debug)]
pub struct Matches {
    matcher: Matcher,
}

impl Matches {
    pub(crate) fn new(matcher: Matcher) -> Matches {
        Matches { matcher }
    }
}

impl Iterator for Matches {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        if !self.matcher.find() {
            return None;
        }
        let span = self.matcher.current().ok()?;
        let text = self.matcher.group().ok()?;
        Some(Match::new(span.start, span.end, text))
    }
}

impl FusedIterator for Matches {}
