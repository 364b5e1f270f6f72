use crossterm::style::Color;
use tracing::debug;

use crate::canvas::*;
use crate::display_width::{display_width, truncate};
use crate::graph_ast::*;
use crate::graph_layout::{GraphLayout, Position};

const MAX_EDGE_LABEL: usize = 20;
const SELF_LOOP: char = '↺';

type Point = (isize, isize);

/// Direction edges travel in, with screen axes folded into a main axis
/// (along the flow) and a cross axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Down,
    Up,
    Right,
    Left,
}

impl Flow {
    fn of(direction: Direction) -> Self {
        match direction {
            Direction::TopDown => Flow::Down,
            Direction::BottomUp => Flow::Up,
            Direction::LeftRight => Flow::Right,
            Direction::RightLeft => Flow::Left,
        }
    }

    fn is_vertical(self) -> bool {
        matches!(self, Flow::Down | Flow::Up)
    }

    fn sign(self) -> isize {
        match self {
            Flow::Down | Flow::Right => 1,
            Flow::Up | Flow::Left => -1,
        }
    }

    fn point(self, main: isize, cross: isize) -> Point {
        if self.is_vertical() {
            (cross, main)
        } else {
            (main, cross)
        }
    }

    /// Near side, far side and cross-axis center of a box.
    fn span(self, pos: &Position) -> (isize, isize, isize) {
        let (start, end, center) = if self.is_vertical() {
            (pos.y, pos.bottom(), pos.center_x())
        } else {
            (pos.x, pos.right(), pos.center_y())
        };
        let (start, end, center) = (start as isize, end as isize, center as isize);
        if self.sign() > 0 {
            (start, end, center)
        } else {
            (end, start, center)
        }
    }
}

pub fn draw_node(canvas: &mut Canvas, node: &Node, pos: &Position, paint: Paint) {
    let (x, y) = (pos.x as isize, pos.y as isize);
    let right = pos.right() as isize;
    let bottom = pos.bottom() as isize;
    let middle = pos.center_y() as isize;
    let mut text_x = x + 1;
    let mut text_width = pos.w.saturating_sub(2);

    match node.shape {
        NodeShape::Rectangle => canvas.draw_box(x, y, pos.w, pos.h, BoxStyle::Square, paint.line),
        NodeShape::RoundedRectangle => {
            canvas.draw_box(x, y, pos.w, pos.h, BoxStyle::Rounded, paint.line)
        }
        NodeShape::Circle => {
            canvas.draw_box(x, y, pos.w, pos.h, BoxStyle::Rounded, paint.line);
            canvas.set(x, middle, '(', paint.line);
            canvas.set(right, middle, ')', paint.line);
        }
        NodeShape::Diamond => canvas.draw_diamond(x, y, pos.w, pos.h, paint.line),
        NodeShape::Parallelogram => {
            canvas.draw_box(x, y, pos.w, pos.h, BoxStyle::Square, paint.line);
            for row in y..=bottom {
                canvas.set(x, row, '╱', paint.line);
                canvas.set(right, row, '╱', paint.line);
            }
        }
        NodeShape::Subroutine => {
            canvas.draw_box(x, y, pos.w, pos.h, BoxStyle::Square, paint.line);
            for bar in [x + 1, right - 1] {
                canvas.set(bar, y, '┬', paint.line);
                for row in (y + 1)..bottom {
                    canvas.set(bar, row, '│', paint.line);
                }
                canvas.set(bar, bottom, '┴', paint.line);
            }
            text_x = x + 2;
            text_width = pos.w.saturating_sub(4);
        }
    }

    canvas.write_centered(text_x, middle, text_width, &node.label, paint.text);
}

/// Draw one edge between two laid-out nodes. `paint.text` colors the label.
pub fn draw_edge(canvas: &mut Canvas, edge: &Edge, layout: &GraphLayout, paint: Paint) {
    let (Some(from), Some(to)) = (layout.positions.get(&edge.from), layout.positions.get(&edge.to)) else {
        debug!(from = %edge.from, to = %edge.to, "edge endpoint has no position");
        return;
    };
    if edge.is_self_loop() {
        draw_self_loop(canvas, from, paint.line);
        return;
    }

    let flow = Flow::of(layout.direction);
    let sign = flow.sign();
    let (_, source_far, sc) = flow.span(from);
    let (target_near, target_far, tc) = flow.span(to);
    let origin = flow.point(source_far, sc);
    let exit = source_far + sign;
    let entry = target_near - sign;

    let back = (entry - exit) * sign < 0;
    let bypass = if back { None } else { bypass_lane(flow, layout, from, to) };
    let (route, target) = if let Some(lane) = bypass {
        // Along the source's gap, down the lane beside the boxes in between,
        // and back along the target's gap.
        (
            vec![(exit, sc), (exit, lane), (entry, lane), (entry, tc)],
            flow.point(target_near, tc),
        )
    } else if !back {
        let route = if sc == tc {
            vec![(exit, sc), (entry, tc)]
        } else {
            let mid = exit + (entry - exit) / 2;
            vec![(exit, sc), (mid, sc), (mid, tc), (entry, tc)]
        };
        (route, flow.point(target_near, tc))
    } else {
        // Out through the far side, along a lane past both boxes and back in
        // through the target's far side, one cell off center so the reverse
        // edge of a pair keeps its own column.
        let tc = tc + 1;
        let entry = target_far + sign;
        let lane = if sign > 0 { exit.max(entry) + 1 } else { exit.min(entry) - 1 };
        (
            vec![(exit, sc), (lane, sc), (lane, tc), (entry, tc)],
            flow.point(target_far, tc),
        )
    };

    let mut points = vec![origin];
    points.extend(route.iter().map(|&(main, cross)| flow.point(main, cross)));
    points.push(target);
    stroke_path(canvas, &trace(&points), edge, paint.line);

    if let Some(label) = &edge.label {
        if bypass.is_some() {
            draw_bypass_label(canvas, flow, &route, label, paint.text);
        } else {
            draw_edge_label(canvas, flow, &route, back, label, paint.text);
        }
    }
}

/// Cross-axis lane one cell clear of every box in the ranks strictly
/// between `from` and `to`, or `None` when the two are neighbours.
fn bypass_lane(flow: Flow, layout: &GraphLayout, from: &Position, to: &Position) -> Option<isize> {
    let main = |pos: &Position| {
        let (near, far, _) = flow.span(pos);
        (near.min(far), near.max(far))
    };
    let overlaps = |a: (isize, isize), b: (isize, isize)| a.0 <= b.1 && b.0 <= a.1;
    let (source, target) = (main(from), main(to));
    let between = (source.1.min(target.1) + 1, source.0.max(target.0) - 1);

    let (_, _, sc) = flow.span(from);
    let (_, _, tc) = flow.span(to);
    layout
        .positions
        .values()
        .filter(|pos| {
            let span = main(pos);
            overlaps(span, between) && !overlaps(span, source) && !overlaps(span, target)
        })
        .map(|pos| (if flow.is_vertical() { pos.right() } else { pos.bottom() }) as isize)
        .max()
        .map(|edge| edge.max(sc).max(tc) + 2)
}

/// Label of a bypass edge, in the source's gap just past the turn toward
/// the lane.
fn draw_bypass_label(canvas: &mut Canvas, flow: Flow, route: &[(isize, isize)], label: &str, color: Option<Color>) {
    let [(exit, sc), (_, lane), ..] = *route else {
        return;
    };
    let text = truncate(label, MAX_EDGE_LABEL);
    let half = display_width(&text) as isize / 2;
    let (x, y) = if flow.is_vertical() {
        ((sc + lane) / 2 - half, exit + flow.sign())
    } else {
        (exit + flow.sign() * (half + 1) - half, lane - 1)
    };
    canvas.write_text(x, y, &text, color);
}

/// Every cell visited by an axis-aligned polyline, in order.
fn trace(points: &[Point]) -> Vec<Point> {
    let Some(&first) = points.first() else {
        return Vec::new();
    };
    let mut cells = vec![first];
    let mut cur = first;
    for &next in &points[1..] {
        while cur != next {
            if cur.0 != next.0 {
                cur.0 += (next.0 - cur.0).signum();
            } else {
                cur.1 += (next.1 - cur.1).signum();
            }
            cells.push(cur);
        }
    }
    cells
}

fn step_dir(from: Point, to: Point) -> u8 {
    if to.0 > from.0 {
        DIR_R
    } else if to.0 < from.0 {
        DIR_L
    } else if to.1 > from.1 {
        DIR_D
    } else {
        DIR_U
    }
}

fn stroke_glyph(conn: u8, stroke: Stroke) -> char {
    let vertical = conn == DIR_U | DIR_D;
    let horizontal = conn == DIR_L | DIR_R;
    match stroke {
        Stroke::Dotted if vertical => '┊',
        Stroke::Dotted if horizontal => '╌',
        Stroke::Thick if vertical => '║',
        Stroke::Thick if horizontal => '═',
        _ => connections_to_char(conn).unwrap_or('┼'),
    }
}

fn arrowhead(dir: u8) -> char {
    match dir {
        DIR_D => '▼',
        DIR_U => '▲',
        DIR_R => '►',
        _ => '◄',
    }
}

/// `cells` runs from the source border to the target border; both ends
/// are only joined, never overwritten.
fn stroke_path(canvas: &mut Canvas, cells: &[Point], edge: &Edge, color: Option<Color>) {
    if cells.len() < 3 {
        return;
    }
    let last = cells.len() - 1;
    canvas.connect(cells[0].0, cells[0].1, step_dir(cells[0], cells[1]));

    for i in 1..last {
        let (x, y) = cells[i];
        let glyph = if i == last - 1 && edge.head {
            arrowhead(step_dir(cells[i], cells[last]))
        } else {
            let conn = step_dir(cells[i], cells[i - 1]) | step_dir(cells[i], cells[i + 1]);
            stroke_glyph(conn, edge.stroke)
        };
        canvas.set_merge(x, y, glyph, color);
    }

    if !edge.head {
        let (x, y) = cells[last];
        canvas.connect(x, y, step_dir(cells[last], cells[last - 1]));
    }
}

fn draw_edge_label(
    canvas: &mut Canvas,
    flow: Flow,
    route: &[(isize, isize)],
    back: bool,
    label: &str,
    color: Option<Color>,
) {
    let text = truncate(label, MAX_EDGE_LABEL);
    let half = display_width(&text) as isize / 2;

    let (x, y) = if flow.is_vertical() {
        match *route {
            // Straight run: on the run itself, halfway down.
            [(m0, c), (m1, _)] => (c - half, (m0 + m1) / 2),
            // Above the crossing segment.
            [_, (m, c0), (_, c1), _] => {
                let row = if m > 0 { m - 1 } else { m + 1 };
                ((c0 + c1) / 2 - half, row)
            }
            _ => return,
        }
    } else {
        let (Some(&(start, row)), Some(&(end, _))) = (route.first(), route.get(if back { 1 } else { route.len() - 1 }))
        else {
            return;
        };
        ((start + end) / 2 - half, row - 1)
    };
    canvas.write_text(x, y, &text, color);
}

fn draw_self_loop(canvas: &mut Canvas, pos: &Position, color: Option<Color>) {
    let beside = pos.x + pos.w;
    let x = if beside < canvas.width() {
        beside as isize
    } else {
        pos.x as isize - 1
    };
    canvas.set(x, pos.y as isize, SELF_LOOP, color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_layout::compute;
    use crate::graph_parser::parse_graph;
    use pretty_assertions::assert_eq;

    fn render_input(input: &str) -> String {
        let diagram = parse_graph(input);
        let layout = compute(&diagram, 80);
        let mut canvas = Canvas::new(layout.width, layout.height);
        for node in &diagram.nodes {
            draw_node(&mut canvas, node, &layout.positions[&node.id], Paint::default());
        }
        for edge in &diagram.edges {
            draw_edge(&mut canvas, edge, &layout, Paint::default());
        }
        canvas.freeze().to_plain()
    }

    #[test]
    fn render_rectangle() {
        let expected = "\
┌───────┐
│ Hello │
└───────┘";
        assert_eq!(render_input("graph TD\n    A[Hello]\n"), expected);
    }

    #[test]
    fn render_rounded() {
        let expected = "\
╭───────╮
│ Hello │
╰───────╯";
        assert_eq!(render_input("graph TD\n    A(Hello)\n"), expected);
    }

    #[test]
    fn render_circle() {
        let expected = "\
╭───────╮
( Hello )
╰───────╯";
        assert_eq!(render_input("graph TD\n    A((Hello))\n"), expected);
    }

    #[test]
    fn render_diamond() {
        let expected = "\
╱───────╲
│ Hello │
╲───────╱";
        assert_eq!(render_input("graph TD\n    A{Hello}\n"), expected);
    }

    #[test]
    fn render_parallelogram() {
        let expected = "\
╱────╱
╱ In ╱
╱────╱";
        assert_eq!(render_input("graph TD\n    A[/In/]\n"), expected);
    }

    #[test]
    fn render_subroutine() {
        let expected = "\
┌┬──┬┐
││Go││
└┴──┴┘";
        assert_eq!(render_input("graph TD\n    A[[Go]]\n"), expected);
    }

    #[test]
    fn render_td_chain() {
        let expected = "\
┌───┐
│ A │
└─┬─┘
  │
  │
  ▼
┌───┐
│ B │
└─┬─┘
  │
  │
  ▼
┌───┐
│ C │
└───┘";
        assert_eq!(render_input("graph TD; A-->B; B-->C"), expected);
    }

    #[test]
    fn render_td_fan_out() {
        let expected = concat!(
            "    ┌───┐\n",
            "    │ A │\n",
            "    └─┬─┘\n",
            "      │\n",
            "  ┌───┴───┐\n",
            "  ▼       ▼\n",
            "┌───┐   ┌───┐\n",
            "│ B │   │ C │\n",
            "└───┘   └───┘",
        );
        assert_eq!(render_input("graph TD\n    A --> B\n    A --> C\n"), expected);
    }

    #[test]
    fn render_lr_edge_label() {
        let expected = "\
┌───┐  yes  ┌───┐
│ A ├──────►│ B │
└───┘       └───┘";
        assert_eq!(render_input("graph LR\n    A -->|yes| B\n"), expected);
    }

    #[test]
    fn render_td_label_on_run() {
        let expected = "\
┌───┐
│ A │
└─┬─┘
  │
 go
  ▼
┌───┐
│ B │
└───┘";
        assert_eq!(render_input("graph TD\n    A -->|go| B\n"), expected);
    }

    #[test]
    fn render_dotted_and_thick_strokes() {
        let dotted = render_input("graph TD\n    A -.-> B\n");
        assert_eq!(dotted.lines().nth(3), Some("  ┊"));
        assert_eq!(dotted.lines().nth(5), Some("  ▼"));

        let thick = render_input("graph TD\n    A === B\n");
        let lines: Vec<&str> = thick.lines().collect();
        assert_eq!(&lines[3..6], &["  ║", "  ║", "  ║"]);
        assert_eq!(lines[6], "┌─┴─┐");
    }

    #[test]
    fn render_bottom_up_points_up() {
        let output = render_input("graph BT\n    A --> B\n");
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[1], "│ B │");
        assert_eq!(lines[3], "  ▲");
        assert_eq!(lines[7], "│ A │");
        assert_eq!(lines[6], "┌─┴─┐");
    }

    #[test]
    fn render_right_left_points_left() {
        let output = render_input("graph RL\n    A --> B\n");
        assert_eq!(output.lines().nth(1), Some("│ B │◄─────┤ A │"));
    }

    #[test]
    fn render_reverse_pair_loops_below() {
        let expected = "\
┌───┐   ┌───┐
│ A │   │ B │
└─┬─┘   └─┬─┘
  │▲      │▲
  └┴──────┴┘";
        assert_eq!(render_input("graph TD\n    A --> B\n    B --> A\n"), expected);
    }

    #[test]
    fn render_rank_skip_goes_around() {
        let expected = "\
┌───┐
│ A │
└─┬─┘
  ├───┐
  │   │
  ▼   │
┌───┐ │
│ B │ │
└─┬─┘ │
  │   │
  │   │
  ▼───┘
┌───┐
│ C │
└───┘";
        assert_eq!(render_input("graph TD\n A --> B\n B --> C\n A --> C\n"), expected);
    }

    #[test]
    fn render_rank_skip_left_right() {
        let output = render_input("graph LR\n A --> B\n B --> C\n A --> C\n");
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[1], "│ A ├┬────►│ B ├─────►│ C │");
        assert_eq!(lines[4], "     └───────────────┘");
    }

    #[test]
    fn render_self_loop_marker() {
        let output = render_input("graph TD\n    A --> A\n");
        assert_eq!(output.lines().next(), Some("┌───┐↺"));
    }

    #[test]
    fn render_never_panics_on_tiny_boxes() {
        let diagram = parse_graph("graph TD\n R --> A[aaaaaaaaaaaa] & B((bbbbbbbbbbbb)) & C{cccccccccccc} & D[[dddddddddddd]]\n");
        let layout = compute(&diagram, 10);
        let mut canvas = Canvas::new(layout.width, layout.height);
        for node in &diagram.nodes {
            draw_node(&mut canvas, node, &layout.positions[&node.id], Paint::default());
        }
        for edge in &diagram.edges {
            draw_edge(&mut canvas, edge, &layout, Paint::default());
        }
        let frame = canvas.freeze();
        assert_eq!(frame.width(), layout.width);
        assert!(frame.to_plain().lines().count() <= layout.height);
    }
}
