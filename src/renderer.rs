use crossterm::style::Color;
use tracing::debug;

use crate::ast::*;
use crate::canvas::*;
use crate::display_width::truncate;
use crate::layout::*;

const LIFELINE: char = '┆';
const SOLID_LINE: char = '─';
const DASHED_LINE: char = '╌';
const SELF_LOOP_ARM: isize = 4;

/// Header box plus the participant's lifeline down to the bottom of the canvas.
pub fn draw_participant(
    canvas: &mut Canvas,
    participant: &Participant,
    layout: &SequenceLayout,
    paint: Paint,
    lifeline: Option<Color>,
) {
    let Some(pos) = layout.positions.get(&participant.id) else {
        debug!(participant = %participant.id, "participant has no position");
        return;
    };
    let (x, y) = (pos.x as isize, pos.y as isize);
    let center = pos.center_x() as isize;
    let bottom = pos.bottom() as isize;

    canvas.draw_box(x, y, pos.w, pos.h, BoxStyle::Square, paint.line);
    canvas.write_centered(x + 1, pos.center_y() as isize, pos.w.saturating_sub(2), &participant.label, paint.text);
    canvas.connect(center, bottom, DIR_D);

    let top = layout.timeline_top() as isize;
    let last = layout.height as isize - 1;
    if last >= top {
        canvas.vline(center, top, last, LIFELINE, lifeline);
    }
}

pub fn draw_message(canvas: &mut Canvas, index: usize, message: &Message, layout: &SequenceLayout, paint: Paint) {
    let (Some(from), Some(to), Some(direction)) = (
        layout.lifeline_x(&message.from),
        layout.lifeline_x(&message.to),
        layout.direction(message),
    ) else {
        debug!(from = %message.from, to = %message.to, "message endpoint has no lifeline");
        return;
    };
    let (from, to) = (from as isize, to as isize);
    let row = layout.message_row(index) as isize;
    let line = if message.is_dashed() { DASHED_LINE } else { SOLID_LINE };

    if direction == Direction::SelfLoop {
        draw_self_message(canvas, from, row, message, layout, paint, line);
        return;
    }

    let step = if direction == Direction::LeftToRight { 1 } else { -1 };
    let end = to - step;
    canvas.hline(from + step, end, row, line, paint.line);
    if let Some(head) = head_char(message.arrow.head, direction) {
        canvas.set(end, row, head, paint.line);
    }

    let left = from.min(to);
    let span = from.abs_diff(to);
    canvas.write_centered(left + 2, row - 1, span.saturating_sub(3), &message.text, paint.text);
}

fn draw_self_message(
    canvas: &mut Canvas,
    center: isize,
    row: isize,
    message: &Message,
    layout: &SequenceLayout,
    paint: Paint,
    line: char,
) {
    let arm_end = center + SELF_LOOP_ARM;

    let text_x = center + SELF_TEXT_OFFSET as isize;
    let room = (layout.column_width - layout.column_width / 2).saturating_sub(SELF_TEXT_OFFSET + 1);
    canvas.write_text(text_x, row - 1, &truncate(&message.text, room), paint.text);

    // outgoing arm ──┐
    canvas.hline(center + 1, arm_end - 1, row, line, paint.line);
    canvas.set(arm_end, row, '┐', paint.line);

    // return arm ◄─┘
    let back = row + 1;
    canvas.hline(center + 2, arm_end - 1, back, line, paint.line);
    canvas.set(arm_end, back, '┘', paint.line);
    let head = head_char(message.arrow.head, Direction::RightToLeft).unwrap_or(line);
    canvas.set(center + 1, back, head, paint.line);
}

fn head_char(head: ArrowHead, direction: Direction) -> Option<char> {
    let rightward = direction == Direction::LeftToRight;
    match head {
        ArrowHead::None => None,
        ArrowHead::Arrowhead if rightward => Some('►'),
        ArrowHead::Arrowhead => Some('◄'),
        ArrowHead::Cross => Some('×'),
        ArrowHead::Open if rightward => Some(')'),
        ArrowHead::Open => Some('('),
    }
}
