use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::style::{Attribute, Color, ResetColor, SetAttribute, SetBackgroundColor};
use crossterm::terminal::{Clear, ClearType};
use crossterm::{execute, queue};
use tracing::{info, warn};

use crate::animation::AnimationSequence;
use crate::canvas::Frame;

/// Waits out one frame period.
pub trait Pacer {
    fn wait(&mut self, delay: Duration);
}

/// Blocks the calling thread for the whole delay.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn wait(&mut self, delay: Duration) {
        thread::sleep(delay);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Completed,
    Interrupted,
}

/// Hides the cursor while alive. Dropping it shows the cursor again and
/// resets colors and attributes, whichever way playback ends.
struct TerminalGuard<'a, W: Write> {
    out: &'a mut W,
}

impl<'a, W: Write> TerminalGuard<'a, W> {
    fn acquire(out: &'a mut W) -> io::Result<Self> {
        let guard = Self { out };
        execute!(guard.out, Hide)?;
        Ok(guard)
    }
}

impl<W: Write> Drop for TerminalGuard<'_, W> {
    fn drop(&mut self) {
        let _ = execute!(self.out, ResetColor, SetAttribute(Attribute::Reset), Show);
    }
}

pub struct Player<P: Pacer = ThreadPacer> {
    pacer: P,
    background: Option<Color>,
}

impl Player<ThreadPacer> {
    pub fn new() -> Self {
        Self::with_pacer(ThreadPacer)
    }
}

impl Default for Player<ThreadPacer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Pacer> Player<P> {
    pub fn with_pacer(pacer: P) -> Self {
        Self { pacer, background: None }
    }

    /// Paint the screen with `color` before the first frame.
    pub fn with_background(mut self, color: Option<Color>) -> Self {
        self.background = color;
        self
    }

    pub fn pacer(&self) -> &P {
        &self.pacer
    }

    /// Play every frame in place, then hold the last one. `cancel` is checked
    /// before each frame and each hold period.
    pub fn play<W: Write>(
        &mut self,
        sequence: &AnimationSequence,
        out: &mut W,
        cancel: &AtomicBool,
    ) -> io::Result<PlaybackOutcome> {
        let delay = frame_delay(sequence.fps);
        info!(frames = sequence.frames.len(), fps = sequence.fps, "playback started");

        let guard = TerminalGuard::acquire(out)?;
        if let Some(color) = self.background {
            queue!(guard.out, SetBackgroundColor(color))?;
        }
        queue!(guard.out, Clear(ClearType::All))?;

        for (i, frame) in sequence.frames.iter().enumerate() {
            if cancel.load(Ordering::SeqCst) {
                warn!(frame = i, "playback interrupted");
                return Ok(PlaybackOutcome::Interrupted);
            }
            queue!(guard.out, MoveTo(0, 0))?;
            guard.out.write_all(frame.to_ansi().as_bytes())?;
            guard.out.flush()?;
            self.pacer.wait(delay);
        }

        for _ in 0..sequence.hold_frames {
            if cancel.load(Ordering::SeqCst) {
                warn!("playback interrupted during hold");
                return Ok(PlaybackOutcome::Interrupted);
            }
            self.pacer.wait(delay);
        }

        let below = sequence.frames.last().map_or(0, Frame::height);
        queue!(guard.out, MoveTo(0, u16::try_from(below).unwrap_or(u16::MAX)))?;
        guard.out.flush()?;
        info!("playback finished");
        Ok(PlaybackOutcome::Completed)
    }
}

pub fn frame_delay(fps: u32) -> Duration {
    Duration::from_millis(1000 / u64::from(fps.max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Recorder {
        waits: Vec<Duration>,
    }

    impl Pacer for Recorder {
        fn wait(&mut self, delay: Duration) {
            self.waits.push(delay);
        }
    }

    #[test]
    fn frame_delay_from_fps() {
        assert_eq!(frame_delay(10), Duration::from_millis(100));
        assert_eq!(frame_delay(0), Duration::from_millis(1000));
    }

    #[test]
    fn empty_sequence_still_holds() {
        let sequence = AnimationSequence {
            frames: Vec::new(),
            fps: 20,
            hold_frames: 2,
        };
        let mut player = Player::with_pacer(Recorder::default());
        let mut out = Vec::new();
        let outcome = player.play(&sequence, &mut out, &AtomicBool::new(false)).unwrap();
        assert_eq!(outcome, PlaybackOutcome::Completed);
        assert_eq!(player.pacer().waits, vec![Duration::from_millis(50); 2]);
    }
}
