use std::{collections::HashSet, error::Error, fmt::Display};

use log::debug;

use crate::{
    graph::DirectedGraph,
    parser::{tokenize, Operator, ParserError, Token},
};

type State = usize;

/// A compiled pattern: the token sequence and the epsilon transitions
/// between token positions. Vertex `tokens.len()` is the accept state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegexNFA {
    tokens: Vec<Token>,
    transitions: DirectedGraph,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReError {
    ParsingFailed(ParserError),
    /// A match accessor was used before any successful match attempt.
    IllegalState,
}

impl Display for ReError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParsingFailed(err) => write!(f, "failed to parse: {}", err),
            Self::IllegalState => write!(f, "no match available, call matches() or find() first"),
        }
    }
}

impl Error for ReError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ParsingFailed(err) => Some(err),
            Self::IllegalState => None,
        }
    }
}

impl From<ParserError> for ReError {
    fn from(err: ParserError) -> Self {
        ReError::ParsingFailed(err)
    }
}

impl RegexNFA {
    pub fn new(pattern: &str) -> Result<RegexNFA, ParserError> {
        RegexNFA::from_tokens(tokenize(pattern)?)
    }

    pub fn from_tokens(tokens: Vec<Token>) -> Result<RegexNFA, ParserError> {
        let transitions = build_transitions(&tokens)?;
        Ok(RegexNFA {
            tokens,
            transitions,
        })
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn transitions(&self) -> &DirectedGraph {
        &self.transitions
    }

    pub fn start(&self) -> State {
        0
    }

    pub fn accept(&self) -> State {
        self.tokens.len()
    }

    /// Whether the token at `state` consumes `c`. The accept state consumes
    /// nothing.
    pub fn accepts(&self, state: State, c: char) -> bool {
        self.tokens
            .get(state)
            .map_or(false, |token| token.matches(c))
    }

    pub fn epsilon_closure<I>(&self, states: I) -> Vec<State>
    where
        I: IntoIterator<Item = State>,
    {
        self.transitions.reachable_from_all(states)
    }

    /// Convert the automaton to Graphviz dot code for debugging purposes.
    /// Solid edges consume a character, dashed edges are epsilon transitions.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let opts = "[fillcolor=\"#EEEEEE\" fontcolor=\"#888888\"]";
        for (state, token) in self.tokens.iter().enumerate() {
            let label = escape_label(&token.to_string());
            if state == self.start() {
                out += &format!("node_{}[label=\"{}\"][fillcolor=green]\n", state, label);
            } else {
                out += &format!("node_{}[label=\"{}\"]{}\n", state, label, opts);
            }
        }
        out += &format!(
            "node_{}[label=\"{}\" shape=doublecircle]\n",
            self.accept(),
            self.accept()
        );

        for (state, token) in self.tokens.iter().enumerate() {
            if let Token::Operator(_) = token {
                continue;
            }
            out += &format!(
                "node_{} -> node_{}[label=\"{}\"]\n",
                state,
                state + 1,
                escape_label(&token.to_string())
            );
        }
        let mut seen: HashSet<(State, State)> = HashSet::new();
        for (from, to) in self.transitions.edges() {
            if seen.insert((from, to)) {
                out += &format!("node_{} -> node_{}[style=dashed]\n", from, to);
            }
        }

        let opts = "node [shape=circle style=filled fillcolor=\"#4385f5\" fontcolor=\"#FFFFFF\" \
        color=white penwidth=5.0 margin=0.1 width=0.5 height=0.5 fixedsize=true]";
        format!(
            "digraph G {{  rankdir=\"LR\" graph [fontname = \"Courier New\"];
                node [fontname = \"verdana\", style = rounded];
                edge [fontname = \"verdana\"];
                {{\n{}\n{}\n}}}}",
            opts, out
        )
    }
}

fn escape_label(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Builds the epsilon transitions over `0..=tokens.len()`.
///
/// Groups and alternatives are resolved with a stack of `(` and `|`
/// positions. When a `)` closes a group containing `|`, the group's `(`
/// gets an edge into every alternative and every `|` gets an edge to the
/// `)`. Quantifiers become edges around the atom or group that precedes
/// them, and tokens that consume no input get an edge to their successor.
pub fn build_transitions(tokens: &[Token]) -> Result<DirectedGraph, ParserError> {
    let mut graph = DirectedGraph::new(tokens.len() + 1);
    let mut operators: Vec<State> = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        let mut lp = i;
        match token {
            Token::Operator(Operator::OpenParen | Operator::Or) => operators.push(i),
            Token::Operator(Operator::CloseParen) => {
                let top = operators
                    .pop()
                    .ok_or(ParserError::MalformedGroupExpression(i))?;
                match tokens[top] {
                    Token::Operator(Operator::Or) => {
                        let mut alternatives = vec![top];
                        lp = operators
                            .pop()
                            .ok_or(ParserError::MalformedGroupExpression(top))?;
                        while tokens[lp].is_operator(Operator::Or) {
                            alternatives.push(lp);
                            lp = operators
                                .pop()
                                .ok_or(ParserError::MalformedGroupExpression(lp))?;
                        }
                        for or in alternatives {
                            graph.add_edge(lp, or + 1);
                            graph.add_edge(or, i);
                        }
                    }
                    Token::Operator(Operator::OpenParen) => lp = top,
                    _ => return Err(ParserError::MalformedGroupExpression(top)),
                }
            }
            _ => {}
        }

        match tokens.get(i + 1) {
            Some(Token::Operator(Operator::Star)) => {
                graph.add_edge(lp, i + 1);
                graph.add_edge(i + 1, lp);
            }
            Some(Token::Operator(Operator::Plus)) => graph.add_edge(i + 1, lp),
            Some(Token::Operator(Operator::Optional)) => graph.add_edge(lp, i + 1),
            _ => {}
        }

        if let Token::Operator(
            Operator::OpenParen
            | Operator::CloseParen
            | Operator::Star
            | Operator::Optional
            | Operator::Plus,
        ) = token
        {
            graph.add_edge(i, i + 1);
        }
    }

    if let Some(&unclosed) = operators.last() {
        return Err(ParserError::MalformedGroupExpression(unclosed));
    }
    debug!(
        "built {} epsilon transitions over {} states",
        graph.edge_count(),
        graph.vertex_count()
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges(pattern: &str) -> Vec<(usize, usize)> {
        let nfa = RegexNFA::new(pattern).unwrap();
        let mut edges: Vec<(usize, usize)> = nfa.transitions().edges().collect();
        edges.sort();
        edges
    }

    #[test]
    fn test_star_edges() {
        // ( a * )
        assert_eq!(
            edges("a*"),
            vec![(0, 1), (1, 2), (2, 1), (2, 3), (3, 4)]
        );
    }

    #[test]
    fn test_plus_edges() {
        // ( a + )
        assert_eq!(edges("a+"), vec![(0, 1), (2, 1), (2, 3), (3, 4)]);
    }

    #[test]
    fn test_optional_edges() {
        // ( a ? )
        assert_eq!(edges("a?"), vec![(0, 1), (1, 2), (2, 3), (3, 4)]);
    }

    #[test]
    fn test_group_star_loops_to_open_paren() {
        // ( ( a b ) * )
        let nfa = RegexNFA::new("(ab)*").unwrap();
        let graph = nfa.transitions();
        assert!(graph.successors(1).contains(&5));
        assert!(graph.successors(5).contains(&1));
    }

    #[test]
    fn test_multiway_alternation() {
        // ( a | b | c )
        let nfa = RegexNFA::new("a|b|c").unwrap();
        let graph = nfa.transitions();
        let mut from_open = graph.successors(0).to_vec();
        from_open.sort();
        assert_eq!(from_open, vec![1, 3, 5]);
        assert_eq!(graph.successors(2), &[6]);
        assert_eq!(graph.successors(4), &[6]);
        assert_eq!(graph.successors(6), &[7]);
    }

    #[test]
    fn test_epsilon_closure_of_start() {
        let nfa = RegexNFA::new("a*").unwrap();
        assert_eq!(nfa.epsilon_closure([nfa.start()]), vec![0, 1, 2, 3, 4]);
        let nfa = RegexNFA::new("ab").unwrap();
        assert_eq!(nfa.epsilon_closure([nfa.start()]), vec![0, 1]);
    }

    #[test]
    fn test_accept_state_consumes_nothing() {
        let nfa = RegexNFA::new("a").unwrap();
        assert_eq!(nfa.accept(), 3);
        assert!(nfa.accepts(1, 'a'));
        assert!(!nfa.accepts(0, 'a'));
        assert!(!nfa.accepts(nfa.accept(), 'a'));
    }

    #[test]
    fn test_malformed_groups() {
        let close = Token::Operator(Operator::CloseParen);
        let open = Token::Operator(Operator::OpenParen);
        let or = Token::Operator(Operator::Or);
        assert_eq!(
            RegexNFA::from_tokens(vec![close.clone()]),
            Err(ParserError::MalformedGroupExpression(0))
        );
        assert_eq!(
            RegexNFA::from_tokens(vec![or.clone(), close.clone()]),
            Err(ParserError::MalformedGroupExpression(0))
        );
        assert_eq!(
            RegexNFA::from_tokens(vec![open.clone(), Token::Literal('a')]),
            Err(ParserError::MalformedGroupExpression(0))
        );
        assert!(RegexNFA::from_tokens(vec![open, or, close]).is_ok());
    }

    #[test]
    fn test_parse_errors_surface() {
        assert_eq!(
            RegexNFA::new("[z-a]"),
            Err(ParserError::InvalidCharacterRange(3))
        );
        let err: ReError = ParserError::UnmatchedOperator(1).into();
        assert_eq!(err, ReError::ParsingFailed(ParserError::UnmatchedOperator(1)));
        assert!(err.source().is_some());
        assert!(ReError::IllegalState.source().is_none());
    }

    #[test]
    fn test_render() {
        let nfa = RegexNFA::new("a|b*").unwrap();
        let dot = nfa.render();
        assert!(dot.starts_with("digraph G"));
        assert!(dot.contains("node_1 -> node_2[label=\"a\"]"));
        assert!(dot.contains("node_0 -> node_3[style=dashed]"));
        assert!(dot.contains("node_6[label=\"6\" shape=doublecircle]"));
    }
}
