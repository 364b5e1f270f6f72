use std::collections::HashMap;

use tracing::debug;

use crate::ast::*;
use crate::display_width::display_width;
use crate::graph_layout::{BOX_HEIGHT, Position};

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceLayout {
    /// Header box of every participant.
    pub positions: HashMap<String, Position>,
    pub column_width: usize,
    pub width: usize,
    pub height: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    LeftToRight,
    RightToLeft,
    SelfLoop,
}

const MIN_COLUMN_WIDTH: usize = 12;
const MIN_BOX_WIDTH: usize = 3;
const LABEL_PADDING: usize = 4;
/// Columns between a lifeline and the text of a message to itself.
pub const SELF_TEXT_OFFSET: usize = 2;
/// Rows per message: text, connector, spacer.
pub const MESSAGE_ROW_SPACING: usize = 3;

impl SequenceLayout {
    pub fn lifeline_x(&self, id: &str) -> Option<usize> {
        self.positions.get(id).map(Position::center_x)
    }

    /// First row below the header boxes.
    pub fn timeline_top(&self) -> usize {
        BOX_HEIGHT
    }

    /// Row of the connector line for message `index`. Its text sits one row above.
    pub fn message_row(&self, index: usize) -> usize {
        self.timeline_top() + 2 + index * MESSAGE_ROW_SPACING
    }

    pub fn direction(&self, message: &Message) -> Option<Direction> {
        let from = self.lifeline_x(&message.from)?;
        let to = self.lifeline_x(&message.to)?;
        Some(match from.cmp(&to) {
            std::cmp::Ordering::Less => Direction::LeftToRight,
            std::cmp::Ordering::Greater => Direction::RightToLeft,
            std::cmp::Ordering::Equal => Direction::SelfLoop,
        })
    }
}

/// Give every participant an equal-width column, in declaration order.
pub fn compute(diagram: &SequenceDiagram, max_width: usize) -> SequenceLayout {
    let count = diagram.participants.len();
    let column_width = column_width(diagram, max_width);

    let mut positions = HashMap::new();
    for (i, participant) in diagram.participants.iter().enumerate() {
        let w = (display_width(&participant.label) + LABEL_PADDING)
            .min(column_width.saturating_sub(2))
            .max(MIN_BOX_WIDTH);
        let center = i * column_width + column_width / 2;
        positions.insert(
            participant.id.clone(),
            Position {
                x: center.saturating_sub(w / 2),
                y: 0,
                w,
                h: BOX_HEIGHT,
            },
        );
    }

    let width = count * column_width;
    let height = BOX_HEIGHT + 1 + diagram.messages.len() * MESSAGE_ROW_SPACING;
    debug!(participants = count, column_width, width, height, "sequence layout computed");
    SequenceLayout {
        positions,
        column_width,
        width,
        height,
    }
}

fn column_width(diagram: &SequenceDiagram, max_width: usize) -> usize {
    let count = diagram.participants.len().max(1);
    let widest_label = diagram
        .participants
        .iter()
        .map(|p| display_width(&p.label) + LABEL_PADDING)
        .max()
        .unwrap_or(0);
    let widest_message = diagram
        .messages
        .iter()
        .filter_map(|m| {
            let from = diagram.index_of(&m.from)?;
            let to = diagram.index_of(&m.to)?;
            let text = display_width(&m.text);
            if from == to {
                // Self messages write right of their own lifeline only.
                return Some(2 * (text + SELF_TEXT_OFFSET + 1));
            }
            Some((text + LABEL_PADDING).div_ceil(from.abs_diff(to)))
        })
        .max()
        .unwrap_or(0);

    let wanted = MIN_COLUMN_WIDTH.max(widest_label).max(widest_message);
    wanted.min((max_width / count).max(MIN_BOX_WIDTH + 2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_sequence;
    use pretty_assertions::assert_eq;

    #[test]
    fn equal_columns_in_declaration_order() {
        let d = parse_sequence("sequenceDiagram\nparticipant A\nparticipant B\nA->>B: hello");
        let layout = compute(&d, 80);
        assert_eq!(layout.column_width, MIN_COLUMN_WIDTH);
        assert_eq!(layout.positions["A"], Position { x: 4, y: 0, w: 5, h: 3 });
        assert_eq!(layout.positions["B"], Position { x: 16, y: 0, w: 5, h: 3 });
        assert_eq!(layout.lifeline_x("A"), Some(6));
        assert_eq!(layout.lifeline_x("B"), Some(18));
        assert_eq!((layout.width, layout.height), (24, 7));
    }

    #[test]
    fn message_rows_are_fixed_slots() {
        let d = parse_sequence("sequenceDiagram\nA->>B: one\nB->>A: two\n");
        let layout = compute(&d, 80);
        assert_eq!(layout.message_row(0), 5);
        assert_eq!(layout.message_row(1), 8);
        assert_eq!(layout.height, 10);
    }

    #[test]
    fn long_message_widens_columns() {
        let d = parse_sequence("sequenceDiagram\nA->>B: a rather long message text\n");
        let layout = compute(&d, 200);
        assert_eq!(layout.column_width, 30);
    }

    #[test]
    fn columns_fit_max_width() {
        let d = parse_sequence("sequenceDiagram\nA->>B: x\nB->>C: y\nC->>D: z\nD->>E: w\n");
        let layout = compute(&d, 40);
        assert!(layout.width <= 40);
        assert_eq!(layout.column_width, 8);
    }

    #[test]
    fn direction_from_columns() {
        let d = parse_sequence("sequenceDiagram\nA->>B: r\nB->>A: l\nA->>A: s\n");
        let layout = compute(&d, 80);
        assert_eq!(layout.direction(&d.messages[0]), Some(Direction::LeftToRight));
        assert_eq!(layout.direction(&d.messages[1]), Some(Direction::RightToLeft));
        assert_eq!(layout.direction(&d.messages[2]), Some(Direction::SelfLoop));
    }

    #[test]
    fn self_message_text_fits_own_column() {
        let d = parse_sequence("sequenceDiagram\nA->>A: think\n");
        let layout = compute(&d, 80);
        assert_eq!(layout.column_width, 16);
    }
}
