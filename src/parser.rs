use tracing::debug;
use winnow::ascii::{space0, space1, till_line_ending};
use winnow::combinator::{alt, opt, preceded};
use winnow::prelude::*;
use winnow::token::take_while;

use crate::ast::*;

#[derive(Debug, PartialEq)]
enum Statement {
    ParticipantDecl(Participant),
    Message(Message),
}

/// Parse sequence diagram source. Lines that are not participant
/// declarations or messages are skipped.
pub fn parse_sequence(input: &str) -> SequenceDiagram {
    let mut diagram = SequenceDiagram {
        participants: Vec::new(),
        messages: Vec::new(),
    };

    let lines = input
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("%%"))
        .skip_while(|l| !l.starts_with("sequenceDiagram"))
        .skip(1);

    for line in lines {
        match statement.parse(line) {
            Ok(Statement::ParticipantDecl(p)) => {
                if diagram.index_of(&p.id).is_none() {
                    diagram.participants.push(p);
                }
            }
            Ok(Statement::Message(m)) => {
                for id in [&m.from, &m.to] {
                    if diagram.index_of(id).is_none() {
                        diagram.participants.push(Participant {
                            id: id.clone(),
                            label: id.clone(),
                        });
                    }
                }
                diagram.messages.push(m);
            }
            Err(_) => debug!(line, "skipping unsupported sequence statement"),
        }
    }

    diagram
}

fn statement(input: &mut &str) -> winnow::Result<Statement> {
    alt((
        participant_decl.map(Statement::ParticipantDecl),
        message.map(Statement::Message),
    ))
    .parse_next(input)
}

fn participant_decl(input: &mut &str) -> winnow::Result<Participant> {
    alt(("participant", "actor")).parse_next(input)?;
    space1.parse_next(input)?;
    let id = identifier.parse_next(input)?;

    let alias = opt(preceded((space1, "as", space1), till_line_ending)).parse_next(input)?;
    space0.parse_next(input)?;

    let id = id.to_string();
    let label = alias
        .map(|s: &str| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| id.clone());
    Ok(Participant { id, label })
}

fn message(input: &mut &str) -> winnow::Result<Message> {
    let from = identifier.parse_next(input)?;
    space0.parse_next(input)?;
    let arr = arrow.parse_next(input)?;
    // Activation shorthands are accepted but not drawn.
    opt(alt(('+', '-'))).parse_next(input)?;
    space0.parse_next(input)?;
    let to = identifier.parse_next(input)?;
    space0.parse_next(input)?;
    let text = opt(preceded((':', space0), till_line_ending)).parse_next(input)?;

    Ok(Message {
        from: from.to_string(),
        to: to.to_string(),
        arrow: arr,
        text: text.map(|t: &str| t.trim().to_string()).unwrap_or_default(),
    })
}

fn arrow(input: &mut &str) -> winnow::Result<Arrow> {
    let line_style = alt((
        "--".value(LineStyle::Dotted),
        "-".value(LineStyle::Solid),
    ))
    .parse_next(input)?;

    let head = alt((
        ">>".value(ArrowHead::Arrowhead),
        ">".value(ArrowHead::None),
        "x".value(ArrowHead::Cross),
        ")".value(ArrowHead::Open),
    ))
    .parse_next(input)?;

    Ok(Arrow { line_style, head })
}

fn identifier<'s>(input: &mut &'s str) -> winnow::Result<&'s str> {
    take_while(1.., |c: char| c.is_alphanumeric() || c == '_').parse_next(input)
}
