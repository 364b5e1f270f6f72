use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    Flowchart,
    State,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    TopDown,
    BottomUp,
    LeftRight,
    RightLeft,
}

impl Direction {
    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::LeftRight | Direction::RightLeft)
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Direction::TopDown => "TD",
            Direction::BottomUp => "BT",
            Direction::LeftRight => "LR",
            Direction::RightLeft => "RL",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowDiagram {
    pub kind: FlowKind,
    pub direction: Direction,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl FlowDiagram {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub shape: NodeShape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeShape {
    Rectangle,
    RoundedRectangle,
    Diamond,
    Circle,
    Parallelogram,
    Subroutine,
}

impl NodeShape {
    /// Opening and closing delimiters in flowchart syntax.
    pub fn delimiters(self) -> (&'static str, &'static str) {
        match self {
            NodeShape::Rectangle => ("[", "]"),
            NodeShape::RoundedRectangle => ("(", ")"),
            NodeShape::Diamond => ("{", "}"),
            NodeShape::Circle => ("((", "))"),
            NodeShape::Parallelogram => ("[/", "/]"),
            NodeShape::Subroutine => ("[[", "]]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub label: Option<String>,
    pub stroke: Stroke,
    pub head: bool,
}

impl Edge {
    pub fn is_dashed(&self) -> bool {
        self.stroke == Stroke::Dotted
    }

    pub fn is_thick(&self) -> bool {
        self.stroke == Stroke::Thick
    }

    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stroke {
    Solid,
    Dotted,
    Thick,
}

impl Stroke {
    fn arrow_token(self, head: bool) -> &'static str {
        match (self, head) {
            (Stroke::Solid, true) => "-->",
            (Stroke::Solid, false) => "---",
            (Stroke::Dotted, true) => "-.->",
            (Stroke::Dotted, false) => "-.-",
            (Stroke::Thick, true) => "==>",
            (Stroke::Thick, false) => "===",
        }
    }
}

/// Canonical source form. Parsing the output yields an equal diagram.
impl fmt::Display for FlowDiagram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // State diagrams are written in flowchart syntax; only the kind is lost.
        writeln!(f, "flowchart {}", self.direction.keyword())?;
        for node in &self.nodes {
            let (open, close) = node.shape.delimiters();
            writeln!(f, "    {}{open}\"{}\"{close}", node.id, node.label)?;
        }
        for edge in &self.edges {
            let arrow = edge.stroke.arrow_token(edge.head);
            match &edge.label {
                Some(label) => writeln!(f, "    {} {arrow}|\"{label}\"| {}", edge.from, edge.to)?,
                None => writeln!(f, "    {} {arrow} {}", edge.from, edge.to)?,
            }
        }
        Ok(())
    }
}
