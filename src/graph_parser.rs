use std::collections::HashSet;

use tracing::debug;
use winnow::ascii::{space0, space1, till_line_ending};
use winnow::combinator::{alt, delimited, opt, preceded, repeat};
use winnow::prelude::*;
use winnow::token::{take_till, take_until, take_while};

use crate::graph_ast::*;

pub(crate) const START_STATE: &str = "_start";
pub(crate) const END_STATE: &str = "_end";
const PSEUDO_STATE: &str = "[*]";

/// Statement keywords this renderer does not draw; their lines are skipped.
const IGNORED_KEYWORDS: &[&str] = &[
    "subgraph", "end", "classDef", "class", "style", "linkStyle", "click", "note", "Note",
];

/// Parse flowchart or state diagram source.
///
/// Best effort: any line the grammar cannot make sense of is skipped, so a
/// single typo never discards the rest of the diagram.
pub fn parse_graph(input: &str) -> FlowDiagram {
    let mut stmts = statements(input);
    let (kind, direction) = stmts
        .next()
        .and_then(|first| header.parse(first).ok())
        .unwrap_or((FlowKind::Flowchart, Direction::TopDown));

    let mut builder = FlowBuilder::new(kind, direction);
    for stmt in stmts {
        let first_word = stmt.split_whitespace().next().unwrap_or("");
        if IGNORED_KEYWORDS.contains(&first_word) {
            debug!(statement = stmt, "skipping unsupported statement");
            continue;
        }
        match flow_line.parse(stmt) {
            Ok(line) => builder.apply(line),
            Err(_) => debug!(statement = stmt, "skipping malformed statement"),
        }
    }
    builder.finish()
}

/// Split source into trimmed, non-empty, non-comment statements.
/// Statements end at a newline or at a `;` outside brackets and quotes.
fn statements(input: &str) -> impl Iterator<Item = &str> {
    input
        .lines()
        .flat_map(split_statements)
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.starts_with("%%"))
}

fn split_statements(line: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut start = 0;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quote = !in_quote,
            '[' | '(' | '{' if !in_quote => depth += 1,
            ']' | ')' | '}' if !in_quote => depth = depth.saturating_sub(1),
            ';' if !in_quote && depth == 0 => {
                parts.push(&line[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&line[start..]);
    parts
}

/// Find the delimiter that closes the one at `s[0]`.
///
/// Only `open`/`close` change the depth, and delimiters inside double quotes
/// are ignored, so `[[a]]`, `[/a/]`, `((a))` and `["[x] y"]` all resolve to
/// their outermost closer. Returns the byte index of the closer.
pub fn find_closing(s: &str, open: char, close: char) -> Option<usize> {
    if !s.starts_with(open) {
        return None;
    }
    let mut depth = 0usize;
    let mut in_quote = false;
    for (i, c) in s.char_indices() {
        if c == '"' {
            in_quote = !in_quote;
            continue;
        }
        if in_quote {
            continue;
        }
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

#[derive(Debug, Clone, PartialEq)]
struct NodeToken {
    id: String,
    shape: Option<(NodeShape, String)>,
}

#[derive(Debug, Clone, PartialEq)]
struct Link {
    stroke: Stroke,
    head: bool,
    label: Option<String>,
}

#[derive(Debug, PartialEq)]
enum FlowLine {
    Chain {
        groups: Vec<Vec<NodeToken>>,
        links: Vec<Link>,
        trailing: Option<String>,
    },
    Direction(Direction),
    StateDecl(NodeToken),
}

fn header(input: &mut &str) -> winnow::Result<(FlowKind, Direction)> {
    alt((
        (
            alt(("flowchart", "graph")),
            opt(preceded(space1, direction)),
            space0,
        )
            .map(|(_, dir, _)| (FlowKind::Flowchart, dir.unwrap_or(Direction::TopDown))),
        (alt(("stateDiagram-v2", "stateDiagram")), space0)
            .map(|_| (FlowKind::State, Direction::TopDown)),
    ))
    .parse_next(input)
}

fn direction(input: &mut &str) -> winnow::Result<Direction> {
    alt((
        "TD".value(Direction::TopDown),
        "TB".value(Direction::TopDown),
        "BT".value(Direction::BottomUp),
        "LR".value(Direction::LeftRight),
        "RL".value(Direction::RightLeft),
    ))
    .parse_next(input)
}

fn flow_line(input: &mut &str) -> winnow::Result<FlowLine> {
    alt((
        preceded(("direction", space1), direction).map(FlowLine::Direction),
        state_decl.map(FlowLine::StateDecl),
        chain,
    ))
    .parse_next(input)
}

/// `state "Long name" as Id` or `state Id`.
fn state_decl(input: &mut &str) -> winnow::Result<NodeToken> {
    "state".parse_next(input)?;
    space1.parse_next(input)?;
    let aliased = opt((
        delimited('"', take_till(0.., '"'), '"'),
        space1,
        "as",
        space1,
        identifier,
    ))
    .parse_next(input)?;
    let token = match aliased {
        Some((label, _, _, _, id)) => NodeToken {
            id: id.to_string(),
            shape: Some((NodeShape::RoundedRectangle, label.trim().to_string())),
        },
        None => NodeToken {
            id: identifier.parse_next(input)?.to_string(),
            shape: None,
        },
    };
    space0.parse_next(input)?;
    Ok(token)
}

fn chain(input: &mut &str) -> winnow::Result<FlowLine> {
    let mut groups = vec![node_group.parse_next(input)?];
    let mut links = Vec::new();
    while let Some((link, group)) =
        opt((preceded(space0, link), preceded(space0, node_group))).parse_next(input)?
    {
        links.push(link);
        groups.push(group);
    }
    space0.parse_next(input)?;
    let trailing = opt(preceded((':', space0), till_line_ending)).parse_next(input)?;
    Ok(FlowLine::Chain {
        groups,
        links,
        trailing: trailing.map(|t: &str| t.trim().to_string()),
    })
}

/// `A` or `A & B & C`.
fn node_group(input: &mut &str) -> winnow::Result<Vec<NodeToken>> {
    let first = node_token.parse_next(input)?;
    let rest: Vec<NodeToken> =
        repeat(0.., preceded((space0, '&', space0), node_token)).parse_next(input)?;
    let mut group = vec![first];
    group.extend(rest);
    Ok(group)
}

fn identifier<'s>(input: &mut &'s str) -> winnow::Result<&'s str> {
    take_while(1.., |c: char| c.is_alphanumeric() || c == '_').parse_next(input)
}

fn node_token(input: &mut &str) -> winnow::Result<NodeToken> {
    let id = alt((PSEUDO_STATE, identifier)).parse_next(input)?;
    let shape = opt(shape_span).parse_next(input)?;
    Ok(NodeToken {
        id: id.to_string(),
        shape,
    })
}

fn shape_span(input: &mut &str) -> winnow::Result<(NodeShape, String)> {
    let (open, close) = match input.chars().next() {
        Some('[') => ('[', ']'),
        Some('(') => ('(', ')'),
        Some('{') => ('{', '}'),
        _ => return Err(winnow::error::ParserError::from_input(input)),
    };
    let Some(end) = find_closing(input, open, close) else {
        return Err(winnow::error::ParserError::from_input(input));
    };
    let span = &input[..=end];
    *input = &input[end + 1..];
    Ok(classify_shape(span))
}

/// Map a balanced delimiter span such as `[[x]]` to its shape and label.
fn classify_shape(span: &str) -> (NodeShape, String) {
    let double = |open: &str, close: &str| {
        span.len() >= open.len() + close.len() && span.starts_with(open) && span.ends_with(close)
    };
    let (shape, inner) = if double("[[", "]]") {
        (NodeShape::Subroutine, &span[2..span.len() - 2])
    } else if double("[/", "/]") || double("[\\", "\\]") || double("[/", "\\]") || double("[\\", "/]") {
        (NodeShape::Parallelogram, &span[2..span.len() - 2])
    } else if double("((", "))") {
        (NodeShape::Circle, &span[2..span.len() - 2])
    } else if double("([", "])") {
        (NodeShape::RoundedRectangle, &span[2..span.len() - 2])
    } else if double("{{", "}}") {
        (NodeShape::Diamond, &span[2..span.len() - 2])
    } else {
        let inner = &span[1..span.len() - 1];
        let shape = match span.as_bytes()[0] {
            b'(' => NodeShape::RoundedRectangle,
            b'{' => NodeShape::Diamond,
            _ => NodeShape::Rectangle,
        };
        (shape, inner)
    };
    (shape, unquote(inner.trim()).to_string())
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}

fn link(input: &mut &str) -> winnow::Result<Link> {
    alt((arrow_link, text_link)).parse_next(input)
}

/// `-->`, `-.->`, `==>`, `--->`, `---`, ... with an optional `|label|`.
fn arrow_link(input: &mut &str) -> winnow::Result<Link> {
    let run = take_while(1.., ['-', '=', '.']).parse_next(input)?;
    let head = opt('>').parse_next(input)?.is_some();
    if run.starts_with('.') || (!head && run.len() < 3) {
        return Err(winnow::error::ParserError::from_input(input));
    }
    let bare = delimited('|', take_till(0.., '|'), '|');
    let label = opt(preceded(space0, alt((quoted_pipe_label, bare)))).parse_next(input)?;
    Ok(Link {
        stroke: stroke_of(run),
        head,
        label: label.map(|l: &str| l.trim().to_string()).filter(|l| !l.is_empty()),
    })
}

/// `|"text"|`, which may itself contain `|`.
fn quoted_pipe_label<'i>(input: &mut &'i str) -> winnow::Result<&'i str> {
    delimited("|\"", take_until(0.., "\"|"), "\"|").parse_next(input)
}

/// `-- text -->` or `-- text ---`.
fn text_link(input: &mut &str) -> winnow::Result<Link> {
    "-- ".parse_next(input)?;
    let (text, head) = alt((
        (take_until(1.., " -->"), " -->".value(true)),
        (take_until(1.., " ---"), " ---".value(false)),
    ))
    .parse_next(input)?;
    Ok(Link {
        stroke: Stroke::Solid,
        head,
        label: Some(text.trim().to_string()),
    })
}

fn stroke_of(run: &str) -> Stroke {
    if run.contains('.') {
        Stroke::Dotted
    } else if run.contains('=') {
        Stroke::Thick
    } else {
        Stroke::Solid
    }
}

struct FlowBuilder {
    kind: FlowKind,
    direction: Direction,
    nodes: Vec<Node>,
    explicit: HashSet<String>,
    edges: Vec<Edge>,
}

impl FlowBuilder {
    fn new(kind: FlowKind, direction: Direction) -> Self {
        Self {
            kind,
            direction,
            nodes: Vec::new(),
            explicit: HashSet::new(),
            edges: Vec::new(),
        }
    }

    fn default_shape(&self) -> NodeShape {
        match self.kind {
            FlowKind::Flowchart => NodeShape::Rectangle,
            FlowKind::State => NodeShape::RoundedRectangle,
        }
    }

    fn apply(&mut self, line: FlowLine) {
        match line {
            FlowLine::Direction(direction) => self.direction = direction,
            FlowLine::StateDecl(token) => {
                self.register(token, START_STATE);
            }
            FlowLine::Chain {
                groups,
                links,
                trailing,
            } => self.apply_chain(groups, links, trailing),
        }
    }

    fn apply_chain(&mut self, groups: Vec<Vec<NodeToken>>, links: Vec<Link>, trailing: Option<String>) {
        if links.is_empty() {
            for token in groups.into_iter().flatten() {
                let id = self.register(token, START_STATE);
                if let Some(text) = trailing.as_ref().filter(|t| !t.is_empty()) {
                    self.describe(&id, text);
                }
            }
            return;
        }

        let last = links.len() - 1;
        for (i, link) in links.into_iter().enumerate() {
            let from_ids: Vec<String> = groups[i]
                .iter()
                .map(|t| self.register(t.clone(), START_STATE))
                .collect();
            let to_ids: Vec<String> = groups[i + 1]
                .iter()
                .map(|t| self.register(t.clone(), END_STATE))
                .collect();
            let label = match (&link.label, &trailing) {
                (None, Some(text)) if i == last && !text.is_empty() => Some(text.clone()),
                _ => link.label.clone(),
            };
            for from in &from_ids {
                for to in &to_ids {
                    self.edges.push(Edge {
                        from: from.clone(),
                        to: to.clone(),
                        label: label.clone(),
                        stroke: link.stroke,
                        head: link.head,
                    });
                }
            }
        }
    }

    /// Register a node and return its resolved id. `[*]` resolves to the
    /// start or end pseudo-state depending on which side of a link it sits.
    fn register(&mut self, token: NodeToken, pseudo: &str) -> String {
        if token.id == PSEUDO_STATE {
            let label = if pseudo == START_STATE { "●" } else { "◉" };
            return self.register(
                NodeToken {
                    id: pseudo.to_string(),
                    shape: Some((NodeShape::Circle, label.to_string())),
                },
                pseudo,
            );
        }

        let default_shape = self.default_shape();
        let id = token.id;
        let explicit = token.shape.is_some();
        let (shape, label) = token
            .shape
            .map(|(shape, label)| {
                let label = if label.is_empty() { id.clone() } else { label };
                (shape, label)
            })
            .unwrap_or_else(|| (default_shape, id.clone()));

        match self.nodes.iter_mut().find(|n| n.id == id) {
            Some(existing) => {
                if explicit && !self.explicit.contains(&id) {
                    existing.shape = shape;
                    existing.label = label;
                    self.explicit.insert(id.clone());
                }
            }
            None => {
                self.nodes.push(Node {
                    id: id.clone(),
                    label,
                    shape,
                });
                if explicit {
                    self.explicit.insert(id.clone());
                }
            }
        }
        id
    }

    fn describe(&mut self, id: &str, text: &str) {
        if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
            node.label = text.to_string();
            self.explicit.insert(id.to_string());
        }
    }

    fn finish(self) -> FlowDiagram {
        let FlowBuilder {
            kind,
            direction,
            nodes,
            mut edges,
            ..
        } = self;
        let before = edges.len();
        edges.retain(|e| {
            nodes.iter().any(|n| n.id == e.from) && nodes.iter().any(|n| n.id == e.to)
        });
        if edges.len() != before {
            debug!(dropped = before - edges.len(), "dropped edges with dangling endpoints");
        }
        FlowDiagram {
            kind,
            direction,
            nodes,
            edges,
        }
    }
}
