use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::canvas::{Canvas, Frame, Paint};
use crate::diagram::{Diagram, DiagramLayout};
use crate::graph_layout::assign_ranks;
use crate::theme::Theme;
use crate::{graph_renderer, renderer};

/// Extra frame periods the finished diagram stays on screen.
pub const HOLD_FRAMES: usize = 2;

/// One drawable piece of a diagram, by index into its node, edge,
/// participant or message list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    Node(usize),
    Edge(usize),
    Participant(usize),
    Message(usize),
}

/// Order in which elements appear. Each node (participant) is followed by
/// every pending edge (message) whose endpoints are now all visible.
pub fn reveal_order(diagram: &Diagram) -> Vec<Element> {
    let mut order = Vec::with_capacity(diagram.element_count());
    match diagram {
        Diagram::Flow(flow) => {
            let ranks = assign_ranks(flow);
            let mut nodes: Vec<usize> = (0..flow.nodes.len()).collect();
            // Stable: nodes of one rank keep source order.
            nodes.sort_by_key(|&i| ranks.get(&flow.nodes[i].id).copied().unwrap_or(0));

            let mut visible: HashSet<&str> = HashSet::new();
            let mut pending: Vec<usize> = (0..flow.edges.len()).collect();
            for i in nodes {
                order.push(Element::Node(i));
                visible.insert(flow.nodes[i].id.as_str());
                pending.retain(|&e| {
                    let edge = &flow.edges[e];
                    let ready = visible.contains(edge.from.as_str()) && visible.contains(edge.to.as_str());
                    if ready {
                        order.push(Element::Edge(e));
                    }
                    !ready
                });
            }
            if !pending.is_empty() {
                debug!(edges = pending.len(), "edges left unrevealed");
            }
        }
        Diagram::Sequence(seq) => {
            let mut visible: HashSet<&str> = HashSet::new();
            let mut next = 0;
            for (i, participant) in seq.participants.iter().enumerate() {
                order.push(Element::Participant(i));
                visible.insert(participant.id.as_str());
                while let Some(message) = seq.messages.get(next) {
                    if !(visible.contains(message.from.as_str()) && visible.contains(message.to.as_str())) {
                        break;
                    }
                    order.push(Element::Message(next));
                    next += 1;
                }
            }
        }
    }
    order
}

/// A laid-out diagram plus the colors to draw it with.
pub struct Scene<'a> {
    diagram: &'a Diagram,
    layout: &'a DiagramLayout,
    theme: &'a Theme,
    color: bool,
    order: Vec<Element>,
}

impl<'a> Scene<'a> {
    pub fn new(diagram: &'a Diagram, layout: &'a DiagramLayout, theme: &'a Theme, color: bool) -> Self {
        Self {
            diagram,
            layout,
            theme,
            color,
            order: reveal_order(diagram),
        }
    }

    pub fn order(&self) -> &[Element] {
        &self.order
    }

    pub fn blank_canvas(&self) -> Canvas {
        Canvas::new(self.layout.width(), self.layout.height())
    }

    /// Paint for the `ordinal`-th revealed element. Outlines and connectors
    /// share one palette cycle; box labels use the foreground and connector
    /// labels the accent.
    fn paint(&self, element: Element, ordinal: usize) -> Paint {
        if !self.color {
            return Paint::default();
        }
        let text = match element {
            Element::Node(_) | Element::Participant(_) => self.theme.foreground,
            Element::Edge(_) | Element::Message(_) => self.theme.accent,
        };
        Paint {
            line: Some(self.theme.node_color(ordinal)),
            text: Some(text),
        }
    }

    fn draw(&self, canvas: &mut Canvas, element: Element, paint: Paint) {
        match (self.diagram, self.layout, element) {
            (Diagram::Flow(flow), DiagramLayout::Flow(layout), Element::Node(i)) => {
                let Some(node) = flow.nodes.get(i) else {
                    return;
                };
                if let Some(pos) = layout.positions.get(&node.id) {
                    graph_renderer::draw_node(canvas, node, pos, paint);
                }
            }
            (Diagram::Flow(flow), DiagramLayout::Flow(layout), Element::Edge(i)) => {
                if let Some(edge) = flow.edges.get(i) {
                    graph_renderer::draw_edge(canvas, edge, layout, paint);
                }
            }
            (Diagram::Sequence(seq), DiagramLayout::Sequence(layout), Element::Participant(i)) => {
                if let Some(participant) = seq.participants.get(i) {
                    let lifeline = self.color.then_some(self.theme.line);
                    renderer::draw_participant(canvas, participant, layout, paint, lifeline);
                }
            }
            (Diagram::Sequence(seq), DiagramLayout::Sequence(layout), Element::Message(i)) => {
                if let Some(message) = seq.messages.get(i) {
                    renderer::draw_message(canvas, i, message, layout, paint);
                }
            }
            _ => debug!(?element, "element does not belong to this diagram"),
        }
    }

    /// Draw every element in reveal order, calling `after` once each.
    fn reveal(&self, canvas: &mut Canvas, mut after: impl FnMut(&Canvas)) {
        for (ordinal, &element) in self.order.iter().enumerate() {
            self.draw(canvas, element, self.paint(element, ordinal));
            after(canvas);
        }
    }

    /// The whole diagram drawn in one pass.
    pub fn render_static(&self) -> Frame {
        let mut canvas = self.blank_canvas();
        self.reveal(&mut canvas, |_| {});
        canvas.freeze()
    }
}

/// Materialized frames of a progressive reveal: an empty canvas, then one
/// frame per element.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSequence {
    pub frames: Vec<Frame>,
    pub fps: u32,
    pub hold_frames: usize,
}

impl AnimationSequence {
    pub fn build(scene: &Scene<'_>, fps: u32) -> Self {
        let mut canvas = scene.blank_canvas();
        let mut frames = Vec::with_capacity(scene.order().len() + 1);
        frames.push(canvas.freeze());
        scene.reveal(&mut canvas, |c| frames.push(c.freeze()));
        debug!(frames = frames.len(), fps, "animation built");
        Self {
            frames,
            fps,
            hold_frames: HOLD_FRAMES,
        }
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Serializable form with the held final frame repeated `hold_frames` times.
    pub fn to_record(&self, theme: &str, color: bool) -> FramesRecord {
        let payload = |f: &Frame| if color { f.to_ansi() } else { f.to_plain() };
        let mut frames: Vec<String> = self.frames.iter().map(payload).collect();
        if let Some(last) = self.frames.last() {
            frames.extend(std::iter::repeat_n(payload(last), self.hold_frames));
        }
        FramesRecord {
            frame_count: frames.len(),
            fps: self.fps,
            theme: theme.to_string(),
            frames,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramesRecord {
    pub frame_count: usize,
    pub fps: u32,
    pub theme: String,
    pub frames: Vec<String>,
}
