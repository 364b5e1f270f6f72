pub mod animation;
pub mod ast;
pub mod canvas;
pub mod config;
pub mod diagram;
pub mod display_width;
pub mod error;
pub mod graph_ast;
pub mod graph_layout;
pub mod graph_parser;
pub mod graph_renderer;
pub mod layout;
pub mod parser;
pub mod player;
pub mod renderer;
pub mod theme;

use animation::{AnimationSequence, Scene};
use canvas::Frame;
use config::{DEFAULT_WIDTH, RenderConfig};
use diagram::DiagramLayout;

pub use error::{Error, Result};

/// Plain static render at the default width.
pub fn render(input: &str) -> Result<String> {
    render_with_options(input, None)
}

pub fn render_with_options(input: &str, max_width: Option<usize>) -> Result<String> {
    let config = RenderConfig {
        width: max_width.unwrap_or(DEFAULT_WIDTH),
        color: false,
        ..RenderConfig::default()
    };
    render_static(input, &config).map(|frame| frame.to_plain())
}

/// The finished diagram as a single frame.
pub fn render_static(input: &str, config: &RenderConfig) -> Result<Frame> {
    let diagram = diagram::parse(input)?;
    let layout = DiagramLayout::compute(&diagram, config.width);
    Ok(Scene::new(&diagram, &layout, config.theme, config.color).render_static())
}

/// Every frame of the progressive reveal.
pub fn animate(input: &str, config: &RenderConfig) -> Result<AnimationSequence> {
    let diagram = diagram::parse(input)?;
    let layout = DiagramLayout::compute(&diagram, config.width);
    let scene = Scene::new(&diagram, &layout, config.theme, config.color);
    Ok(AnimationSequence::build(&scene, config.fps))
}

/// The reveal as one JSON record: frame count, fps, theme name and payloads.
pub fn frames_json(input: &str, config: &RenderConfig) -> Result<String> {
    let record = animate(input, config)?.to_record(config.theme.name, config.color);
    Ok(serde_json::to_string(&record)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn render_unknown_diagram_type_returns_error() {
        let err = render("classDiagram\n  Foo\n").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("unknown diagram type"), "got: {msg}");
        assert!(msg.contains("classDiagram"), "got: {msg}");
    }

    #[test]
    fn render_empty_input_returns_error() {
        assert!(render("").is_err());
    }

    #[test]
    fn render_sequence_diagram_works() {
        let output = render("sequenceDiagram\n    Alice->>Bob: Hello\n").unwrap();
        assert!(output.contains("Alice"));
        assert!(output.contains('►'));
    }

    #[test]
    fn render_graph_diagram_works() {
        let output = render("graph TD\n    A --> B\n").unwrap();
        assert!(output.contains('▼'));
    }

    #[test]
    fn render_state_diagram_works() {
        let output = render("stateDiagram-v2\n    [*] --> Idle\n    Idle --> [*]\n").unwrap();
        assert!(output.contains("Idle"));
        assert!(output.contains('●'));
    }

    #[test]
    fn render_from_markdown_block() {
        let doc = "# Notes\n\n```mermaid\ngraph LR\n    A --> B\n```\n";
        assert!(render(doc).unwrap().contains('►'));
    }

    #[test]
    fn frames_json_counts_held_frames() {
        let config = RenderConfig {
            color: false,
            ..RenderConfig::default()
        };
        let json = frames_json("graph TD; A-->B; B-->C", &config).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["frame_count"], 8);
        assert_eq!(value["fps"], 12);
        assert_eq!(value["theme"], "default");
        assert_eq!(value["frames"].as_array().map(Vec::len), Some(8));
    }

    #[test]
    fn render_respects_max_width() {
        let src = "graph TD\n R --> A[alpha alpha] & B[beta beta] & C[gamma gamma] & D[delta delta]\n";
        let output = render_with_options(src, Some(40)).unwrap();
        for line in output.lines() {
            assert!(display_width::display_width(line) <= 40, "{line}");
        }
    }
}
