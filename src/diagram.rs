use crate::ast::SequenceDiagram;
use crate::error::{Error, Result};
use crate::graph_ast::{FlowDiagram, FlowKind};
use crate::graph_layout::GraphLayout;
use crate::layout::SequenceLayout;
use crate::{graph_layout, graph_parser, layout, parser};

const FLOW_KEYWORDS: &[&str] = &["graph", "flowchart"];
const STATE_KEYWORDS: &[&str] = &["stateDiagram-v2", "stateDiagram"];
const SEQUENCE_KEYWORD: &str = "sequenceDiagram";
const FENCE: &str = "```";
const FENCE_TAG: &str = "mermaid";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramKind {
    Flowchart,
    Sequence,
    State,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Diagram {
    Flow(FlowDiagram),
    Sequence(SequenceDiagram),
}

impl Diagram {
    pub fn kind(&self) -> DiagramKind {
        match self {
            Diagram::Flow(flow) => match flow.kind {
                FlowKind::Flowchart => DiagramKind::Flowchart,
                FlowKind::State => DiagramKind::State,
            },
            Diagram::Sequence(_) => DiagramKind::Sequence,
        }
    }

    /// Number of drawable elements: nodes plus edges, or participants plus messages.
    pub fn element_count(&self) -> usize {
        match self {
            Diagram::Flow(flow) => flow.nodes.len() + flow.edges.len(),
            Diagram::Sequence(seq) => seq.participants.len() + seq.messages.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiagramLayout {
    Flow(GraphLayout),
    Sequence(SequenceLayout),
}

impl DiagramLayout {
    pub fn compute(diagram: &Diagram, max_width: usize) -> Self {
        match diagram {
            Diagram::Flow(flow) => DiagramLayout::Flow(graph_layout::compute(flow, max_width)),
            Diagram::Sequence(seq) => DiagramLayout::Sequence(layout::compute(seq, max_width)),
        }
    }

    pub fn width(&self) -> usize {
        match self {
            DiagramLayout::Flow(l) => l.width,
            DiagramLayout::Sequence(l) => l.width,
        }
    }

    pub fn height(&self) -> usize {
        match self {
            DiagramLayout::Flow(l) => l.height,
            DiagramLayout::Sequence(l) => l.height,
        }
    }
}

/// Classify diagram text by its first word.
pub fn detect_kind(source: &str) -> Option<DiagramKind> {
    let first = source
        .trim_start()
        .split(|c: char| c.is_whitespace() || c == ';')
        .next()
        .unwrap_or("");
    if FLOW_KEYWORDS.contains(&first) {
        Some(DiagramKind::Flowchart)
    } else if STATE_KEYWORDS.contains(&first) {
        Some(DiagramKind::State)
    } else if first == SEQUENCE_KEYWORD {
        Some(DiagramKind::Sequence)
    } else {
        None
    }
}

/// Return the diagram text itself, or the body of the first ```` ```mermaid ````
/// block when the input is a larger document.
pub fn extract_source(input: &str) -> Option<&str> {
    if detect_kind(input).is_some() {
        return Some(input);
    }

    let mut offset = 0;
    let mut body_start = None;
    for line in input.split_inclusive('\n') {
        let trimmed = line.trim();
        match body_start {
            None => {
                if let Some(tag) = trimmed.strip_prefix(FENCE) {
                    if tag.trim() == FENCE_TAG {
                        body_start = Some(offset + line.len());
                    }
                }
            }
            Some(start) => {
                if trimmed.starts_with(FENCE) {
                    return Some(&input[start..offset]);
                }
            }
        }
        offset += line.len();
    }
    // An unterminated block runs to the end of the document.
    body_start.map(|start| &input[start..])
}

pub fn parse(input: &str) -> Result<Diagram> {
    let source = extract_source(input).ok_or_else(|| match input.split_whitespace().next() {
        Some(word) if !input.contains(FENCE) => Error::UnknownDiagram {
            found: word.to_string(),
        },
        _ => Error::NoDiagram,
    })?;

    let diagram = match detect_kind(source) {
        Some(DiagramKind::Sequence) => Diagram::Sequence(parser::parse_sequence(source)),
        Some(DiagramKind::Flowchart | DiagramKind::State) => {
            Diagram::Flow(graph_parser::parse_graph(source))
        }
        None => {
            let found = source.split_whitespace().next().unwrap_or("(empty)");
            return Err(Error::UnknownDiagram {
                found: found.to_string(),
            });
        }
    };

    if diagram.element_count() == 0 {
        return Err(Error::EmptyDiagram);
    }
    Ok(diagram)
}
