use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use signal_hook::consts::{SIGINT, SIGTERM};
use tracing::Level;

use mermate::config::{DEFAULT_FPS, DEFAULT_WIDTH, OutputMode, RenderConfig};
use mermate::player::{PlaybackOutcome, Player};

/// Exit status after playback was cut short by a signal.
const INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(
    name = "mermate",
    version,
    about = "Render Mermaid diagrams as animated terminal text (flowchart, sequence, state)"
)]
struct Cli {
    /// Input file (reads from stdin if not provided)
    file: Option<PathBuf>,

    /// What to write to stdout
    #[arg(long, short = 'm', value_enum, default_value_t = OutputMode::Animate)]
    mode: OutputMode,

    /// Color theme (default, dracula, nord, mono)
    #[arg(long, short = 't', default_value = "default")]
    theme: String,

    /// Frames per second, clamped to 1-60
    #[arg(long, default_value_t = DEFAULT_FPS)]
    fps: u32,

    /// Maximum output width in columns
    #[arg(long, short = 'w', default_value_t = DEFAULT_WIDTH)]
    width: usize,

    /// Write plain text without color escapes
    #[arg(long)]
    no_color: bool,

    /// Log more to stderr (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let input = read_input(cli.file.as_deref())?;
    let config = RenderConfig::new(cli.mode, &cli.theme, cli.fps, cli.width, !cli.no_color)?;

    match config.mode {
        OutputMode::Static => {
            let frame = mermate::render_static(&input, &config)?;
            let text = if config.color { frame.to_ansi() } else { frame.to_plain() };
            println!("{text}");
        }
        OutputMode::Frames => {
            println!("{}", mermate::frames_json(&input, &config)?);
        }
        OutputMode::Animate => {
            let sequence = mermate::animate(&input, &config)?;
            let cancel = Arc::new(AtomicBool::new(false));
            for signal in [SIGINT, SIGTERM] {
                signal_hook::flag::register(signal, Arc::clone(&cancel))
                    .context("failed to install signal handler")?;
            }

            let mut stdout = io::stdout().lock();
            let outcome = Player::new()
                .with_background(config.color.then_some(config.theme.background))
                .play(&sequence, &mut stdout, &cancel)
                .context("failed to write to terminal")?;
            writeln!(stdout)?;
            if outcome == PlaybackOutcome::Interrupted {
                return Ok(ExitCode::from(INTERRUPTED));
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ERROR: {e:#}");
            ExitCode::FAILURE
        }
    }
}
