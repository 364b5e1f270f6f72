use std::collections::HashMap;

use tracing::debug;

use crate::display_width::display_width;
use crate::graph_ast::*;

/// Cell rectangle occupied by a node or participant box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

impl Position {
    pub fn center_x(&self) -> usize {
        self.x + self.w / 2
    }

    pub fn center_y(&self) -> usize {
        self.y + self.h / 2
    }

    pub fn right(&self) -> usize {
        self.x + self.w - 1
    }

    pub fn bottom(&self) -> usize {
        self.y + self.h - 1
    }

    pub fn overlaps(&self, other: &Position) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphLayout {
    pub positions: HashMap<String, Position>,
    pub width: usize,
    pub height: usize,
    pub direction: Direction,
}

pub const BOX_HEIGHT: usize = 3;
pub const MIN_NODE_WIDTH: usize = 5;
pub const MAX_NODE_WIDTH: usize = 24;
const MIN_SHRUNK_WIDTH: usize = 3;
const LABEL_PADDING: usize = 4;
const RANK_GAP: usize = 3;
const NODE_GAP: usize = 3;
const RANK_GAP_LR: usize = 6;
const NODE_GAP_LR: usize = 1;
const MIN_GAP: usize = 1;
/// Room past the last rank for edges that loop back, and beside the boxes
/// for edges that skip a rank.
const EDGE_MARGIN: usize = 2;
/// Room to the right for the self-loop marker.
const SELF_LOOP_MARGIN: usize = 2;

/// Rank every node with a Kahn sweep: each round takes all nodes whose
/// remaining in-degree is zero. Nodes the sweep never reaches (they sit on
/// or behind a cycle) land in the highest rank that was assigned.
pub fn assign_ranks(diagram: &FlowDiagram) -> HashMap<String, usize> {
    let index: HashMap<&str, usize> = diagram
        .nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();
    let mut in_degree = vec![0usize; diagram.nodes.len()];
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); diagram.nodes.len()];
    for edge in diagram.edges.iter().filter(|e| !e.is_self_loop()) {
        if let (Some(&from), Some(&to)) = (index.get(edge.from.as_str()), index.get(edge.to.as_str())) {
            in_degree[to] += 1;
            successors[from].push(to);
        }
    }

    let mut ranks: HashMap<String, usize> = HashMap::new();
    let mut current: Vec<usize> = (0..diagram.nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut rank = 0;
    while !current.is_empty() {
        let mut next = Vec::new();
        for &i in &current {
            ranks.insert(diagram.nodes[i].id.clone(), rank);
            for &s in &successors[i] {
                in_degree[s] -= 1;
                if in_degree[s] == 0 {
                    next.push(s);
                }
            }
        }
        next.sort_unstable();
        current = next;
        rank += 1;
    }

    let max_rank = ranks.values().copied().max().unwrap_or(0);
    for node in &diagram.nodes {
        if !ranks.contains_key(&node.id) {
            debug!(node = %node.id, rank = max_rank, "node unreachable by topological sweep");
            ranks.insert(node.id.clone(), max_rank);
        }
    }
    ranks
}

pub fn node_width(label: &str) -> usize {
    (display_width(label) + LABEL_PADDING).clamp(MIN_NODE_WIDTH, MAX_NODE_WIDTH)
}

pub fn compute(diagram: &FlowDiagram, max_width: usize) -> GraphLayout {
    let ranks = assign_ranks(diagram);
    let rank_count = ranks.values().copied().max().map_or(0, |r| r + 1);
    let mut ranks_nodes: Vec<Vec<&Node>> = vec![Vec::new(); rank_count];
    for node in &diagram.nodes {
        ranks_nodes[ranks[&node.id]].push(node);
    }

    let (mut positions, mut width, mut height) = if diagram.direction.is_horizontal() {
        layout_lr(&ranks_nodes, &diagram.edges, max_width)
    } else {
        layout_td(&ranks_nodes, max_width)
    };

    let loops_back = diagram
        .edges
        .iter()
        .any(|e| !e.is_self_loop() && ranks[&e.from] >= ranks[&e.to]);
    if loops_back {
        if diagram.direction.is_horizontal() {
            width += EDGE_MARGIN;
        } else {
            height += EDGE_MARGIN;
        }
    }
    // Edges that jump over a rank run along a lane past the boxes in between.
    let skips_rank = diagram.edges.iter().any(|e| ranks[&e.to] > ranks[&e.from] + 1);
    if skips_rank {
        if diagram.direction.is_horizontal() {
            height += EDGE_MARGIN;
        } else {
            width += EDGE_MARGIN;
        }
    }
    if diagram.edges.iter().any(Edge::is_self_loop) {
        width += SELF_LOOP_MARGIN;
    }

    match diagram.direction {
        Direction::BottomUp => {
            for pos in positions.values_mut() {
                pos.y = height - pos.y - pos.h;
            }
        }
        Direction::RightLeft => {
            for pos in positions.values_mut() {
                pos.x = width - pos.x - pos.w;
            }
        }
        Direction::TopDown | Direction::LeftRight => {}
    }

    debug!(ranks = rank_count, width, height, "flow layout computed");
    GraphLayout {
        positions,
        width,
        height,
        direction: diagram.direction,
    }
}

/// Squeeze a row of boxes into `max_width`: first shrink the gap, then the
/// boxes. Returns the gap to use.
fn fit_row(widths: &mut [usize], gap: usize, max_width: usize) -> usize {
    let row_width = |widths: &[usize], gap: usize| widths.iter().sum::<usize>() + gap * widths.len().saturating_sub(1);
    let mut gap = gap;
    while gap > MIN_GAP && row_width(widths, gap) > max_width {
        gap -= 1;
    }
    if row_width(widths, gap) > max_width && !widths.is_empty() {
        let available = max_width.saturating_sub(gap * (widths.len() - 1));
        let cap = (available / widths.len()).max(MIN_SHRUNK_WIDTH);
        for w in widths.iter_mut() {
            *w = (*w).min(cap);
        }
    }
    gap
}

fn layout_td(ranks_nodes: &[Vec<&Node>], max_width: usize) -> (HashMap<String, Position>, usize, usize) {
    let mut rows: Vec<(Vec<usize>, usize)> = Vec::new();
    for rank_nodes in ranks_nodes {
        let mut widths: Vec<usize> = rank_nodes.iter().map(|n| node_width(&n.label)).collect();
        let gap = fit_row(&mut widths, NODE_GAP, max_width);
        rows.push((widths, gap));
    }

    let row_total = |(widths, gap): &(Vec<usize>, usize)| {
        widths.iter().sum::<usize>() + gap * widths.len().saturating_sub(1)
    };
    let width = rows.iter().map(row_total).max().unwrap_or(0);
    let mid = width / 2;

    let mut positions = HashMap::new();
    let mut y = 0;
    for (rank_nodes, row) in ranks_nodes.iter().zip(&rows) {
        let (widths, gap) = row;
        let mut x = mid.saturating_sub(row_total(row) / 2);
        for (node, &w) in rank_nodes.iter().zip(widths) {
            positions.insert(node.id.clone(), Position { x, y, w, h: BOX_HEIGHT });
            x += w + gap;
        }
        y += BOX_HEIGHT + RANK_GAP;
    }
    let height = (ranks_nodes.len() * (BOX_HEIGHT + RANK_GAP)).saturating_sub(RANK_GAP);
    (positions, width, height)
}

fn layout_lr(
    ranks_nodes: &[Vec<&Node>],
    edges: &[Edge],
    max_width: usize,
) -> (HashMap<String, Position>, usize, usize) {
    let label_gap = edges
        .iter()
        .filter_map(|e| e.label.as_deref())
        .map(|l| display_width(l) + LABEL_PADDING)
        .max()
        .unwrap_or(0);
    let rank_gap = RANK_GAP_LR.max(label_gap);

    let mut columns: Vec<usize> = ranks_nodes
        .iter()
        .map(|nodes| nodes.iter().map(|n| node_width(&n.label)).max().unwrap_or(0))
        .collect();
    let rank_gap = fit_row(&mut columns, rank_gap, max_width);

    let column_height = |count: usize| (count * (BOX_HEIGHT + NODE_GAP_LR)).saturating_sub(NODE_GAP_LR);
    let height = ranks_nodes.iter().map(|nodes| column_height(nodes.len())).max().unwrap_or(0);
    let mid = height / 2;

    let mut positions = HashMap::new();
    let mut x = 0;
    for (rank_nodes, &column_width) in ranks_nodes.iter().zip(&columns) {
        let mut y = mid.saturating_sub(column_height(rank_nodes.len()) / 2);
        for node in rank_nodes {
            let w = node_width(&node.label).min(column_width);
            positions.insert(
                node.id.clone(),
                Position {
                    x: x + (column_width - w) / 2,
                    y,
                    w,
                    h: BOX_HEIGHT,
                },
            );
            y += BOX_HEIGHT + NODE_GAP_LR;
        }
        x += column_width + rank_gap;
    }
    let width = x.saturating_sub(rank_gap);
    (positions, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_parser::parse_graph;
    use pretty_assertions::assert_eq;

    fn layout_of(src: &str) -> (FlowDiagram, GraphLayout) {
        let diagram = parse_graph(src);
        let layout = compute(&diagram, 80);
        (diagram, layout)
    }

    fn assert_no_overlap(layout: &GraphLayout) {
        let all: Vec<(&String, &Position)> = layout.positions.iter().collect();
        for (i, (a, pa)) in all.iter().enumerate() {
            for (b, pb) in &all[i + 1..] {
                assert!(!pa.overlaps(pb), "{a} overlaps {b}: {pa:?} {pb:?}");
            }
        }
    }

    #[test]
    fn ranks_linear_chain() {
        let diagram = parse_graph("graph TD; A-->B; B-->C");
        let ranks = assign_ranks(&diagram);
        assert_eq!(ranks["A"], 0);
        assert_eq!(ranks["B"], 1);
        assert_eq!(ranks["C"], 2);
    }

    #[test]
    fn ranks_respect_every_edge() {
        let diagram = parse_graph(
            "graph TD\n A --> B\n A --> C\n B --> D\n C --> D\n D --> E\n A --> E\n F --> C\n",
        );
        let ranks = assign_ranks(&diagram);
        for edge in &diagram.edges {
            assert!(ranks[&edge.from] < ranks[&edge.to], "{} -> {}", edge.from, edge.to);
        }
        assert_eq!(ranks["E"], 3);
    }

    #[test]
    fn ranks_terminate_on_cycle() {
        let diagram = parse_graph("graph TD\n S --> A\n A --> B\n B --> C\n C --> A\n");
        let ranks = assign_ranks(&diagram);
        assert_eq!(ranks.len(), 4);
        assert_eq!(ranks["S"], 0);
        assert_eq!(ranks["A"], 0);
        assert_eq!(ranks["C"], 0);
    }

    #[test]
    fn ranks_pure_cycle_all_zero() {
        let diagram = parse_graph("graph TD\n A --> B\n B --> A\n");
        let ranks = assign_ranks(&diagram);
        assert_eq!((ranks["A"], ranks["B"]), (0, 0));
    }

    #[test]
    fn ranks_ignore_self_loops() {
        let diagram = parse_graph("graph TD\n A --> A\n A --> B\n");
        let ranks = assign_ranks(&diagram);
        assert_eq!((ranks["A"], ranks["B"]), (0, 1));
    }

    #[test]
    fn td_chain_stacks_on_shared_center() {
        let (_, layout) = layout_of("graph TD\n A[Start] --> B[End]\n");
        let a = layout.positions["A"];
        let b = layout.positions["B"];
        assert_eq!(a, Position { x: 0, y: 0, w: 9, h: 3 });
        assert_eq!(b, Position { x: 1, y: 6, w: 7, h: 3 });
        assert_eq!(a.center_x(), b.center_x());
        assert_eq!((layout.width, layout.height), (9, 9));
    }

    #[test]
    fn td_rank_is_centered() {
        let (_, layout) = layout_of("graph TD\n A --> B\n A --> C\n");
        assert_eq!(layout.positions["B"], Position { x: 0, y: 6, w: 5, h: 3 });
        assert_eq!(layout.positions["C"], Position { x: 8, y: 6, w: 5, h: 3 });
        assert_eq!(layout.positions["A"].x, 4);
        assert_eq!(layout.width, 13);
    }

    #[test]
    fn lr_ranks_become_columns() {
        let (_, layout) = layout_of("graph LR\n A --> B\n");
        assert_eq!(layout.positions["A"], Position { x: 0, y: 0, w: 5, h: 3 });
        assert_eq!(layout.positions["B"], Position { x: 11, y: 0, w: 5, h: 3 });
        assert_eq!((layout.width, layout.height), (16, 3));
    }

    #[test]
    fn bottom_up_mirrors_top_down() {
        let (_, td) = layout_of("graph TD\n A --> B\n");
        let (_, bt) = layout_of("graph BT\n A --> B\n");
        assert_eq!(bt.positions["A"].y, td.positions["B"].y);
        assert_eq!(bt.positions["B"].y, td.positions["A"].y);
    }

    #[test]
    fn right_left_mirrors_left_right() {
        let (_, rl) = layout_of("graph RL\n A --> B\n");
        assert!(rl.positions["A"].x > rl.positions["B"].x);
    }

    #[test]
    fn label_width_is_capped() {
        let label = "x".repeat(100);
        let (_, layout) = layout_of(&format!("graph TD\n A[{label}]\n"));
        assert_eq!(layout.positions["A"].w, MAX_NODE_WIDTH);
    }

    #[test]
    fn wide_rank_fits_max_width() {
        let src = "graph TD\n R --> A1[aaaaaaaaaa]\n R --> A2[bbbbbbbbbb]\n R --> A3[cccccccccc]\n R --> A4[dddddddddd]\n";
        let diagram = parse_graph(src);
        let layout = compute(&diagram, 30);
        assert!(layout.width <= 30, "width {}", layout.width);
        for pos in layout.positions.values() {
            assert!(pos.x + pos.w <= 30, "{pos:?}");
        }
        assert_no_overlap(&layout);
    }

    #[test]
    fn no_overlaps_in_mixed_graph() {
        for dir in ["TD", "BT", "LR", "RL"] {
            let (_, layout) = layout_of(&format!(
                "graph {dir}\n A --> B & C & D\n B --> E\n C --> E\n E --> A\n F\n"
            ));
            assert_no_overlap(&layout);
        }
    }

    #[test]
    fn rank_skip_adds_cross_margin() {
        let (_, plain) = layout_of("graph TD\n A --> B\n B --> C\n");
        let (_, skip) = layout_of("graph TD\n A --> B\n B --> C\n A --> C\n");
        assert_eq!(skip.width, plain.width + EDGE_MARGIN);
        assert_eq!(skip.height, plain.height);

        let (_, lr) = layout_of("graph LR\n A --> B\n B --> C\n A --> C\n");
        assert_eq!(lr.height, BOX_HEIGHT + EDGE_MARGIN);
    }

    #[test]
    fn back_edge_adds_margin() {
        let (_, plain) = layout_of("graph TD\n A --> B\n");
        let (_, cyclic) = layout_of("graph TD\n A --> B\n B --> A\n");
        assert_eq!(cyclic.height, BOX_HEIGHT + EDGE_MARGIN);
        assert_eq!(plain.height, 2 * BOX_HEIGHT + RANK_GAP);
    }
}
