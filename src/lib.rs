//! A small regular-expression engine. Patterns compile to a token sequence
//! plus a graph of epsilon transitions between token positions, which is
//! then simulated over the text one character at a time.
//!
//! ```
//! let pattern = epsilon_regex::compile("(A*B|AC)D").unwrap();
//! assert!(pattern.matches("AAAABD"));
//!
//! let spans: Vec<_> = epsilon_regex::compile("dog")
//!     .unwrap()
//!     .find_iter("my dog is the best dog")
//!     .map(|m| m.span())
//!     .collect();
//! assert_eq!(spans, vec![(3, 6), (19, 22)]);
//! ```

pub mod bounds;
pub mod fsm;
pub mod graph;
pub mod matching;
pub mod parser;
pub mod pattern;

pub use fsm::{ReError, RegexNFA};
pub use matching::{Match, Matcher, Matches};
pub use parser::{tokenize, Operator, ParserError, Token};
pub use pattern::Pattern;

pub fn compile(pattern: &str) -> Result<Pattern, ReError> {
    Pattern::compile(pattern)
}
