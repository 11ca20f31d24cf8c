use std::time::{Duration, Instant};

use log::debug;

use crate::input::{command_for, Command};
use crate::scheduler::{Epoch, FrameThrottle};
use crate::session::{RunState, Session, StepOutcome};
use crate::store::HighScoreStore;
use crate::term::TermManager;

/// How long a frame waits for input before checking the tick clock.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Drives a [`Session`] from the terminal: one frame per input poll, at most
/// one tick per frame.
pub struct SnakeGame<S> {
    term: TermManager,
    session: Session<S>,
    throttle: FrameThrottle,
    epoch: Option<Epoch>,
}

impl<S: HighScoreStore> SnakeGame<S> {
    pub fn new(term: TermManager, session: Session<S>) -> Self {
        SnakeGame { term, session, throttle: FrameThrottle::new(), epoch: None }
    }

    /// Plays until the player quits. The terminal is restored even when
    /// drawing fails.
    pub fn run(&mut self) -> crossterm::Result<()> {
        self.term.setup()?;
        let res = self.play();
        self.term.restore()?;
        res
    }

    fn play(&mut self) -> crossterm::Result<()> {
        self.redraw()?;

        loop {
            for key_ev in self.term.read_key_events(FRAME_INTERVAL)? {
                match command_for(&key_ev) {
                    Some(Command::Quit) => return Ok(()),
                    Some(cmd) => self.apply(cmd)?,
                    None => {}
                }
            }

            self.frame(Instant::now())?;
        }
    }

    fn apply(&mut self, cmd: Command) -> crossterm::Result<()> {
        match cmd {
            Command::Start => {
                if self.session.start() {
                    self.epoch = Some(self.throttle.restart(Instant::now()));
                    self.redraw()?;
                }
            }
            Command::TogglePause => {
                if self.session.toggle_pause() {
                    self.term.draw_overlay(&self.session.snapshot())?;
                }
            }
            Command::Turn(dir) => {
                if self.session.set_direction(dir) {
                    debug!("Heading {:?}", self.session.direction());
                }
            }
            Command::Quit => {}
        }

        Ok(())
    }

    /// Ticks when the current speed interval has elapsed, else does nothing.
    fn frame(&mut self, now: Instant) -> crossterm::Result<()> {
        let interval = Duration::from_millis(self.session.speed_ms());
        if !tick_due(&mut self.throttle, self.epoch, self.session.state(), now, interval) {
            return Ok(());
        }

        match self.session.update() {
            StepOutcome::Moved(mov) | StepOutcome::Ate(mov) => {
                self.term.draw_move(&mov, &self.session.snapshot())
            }
            StepOutcome::Crashed(collision) => {
                debug!(
                    "Loop stopped after {:?}, score {} best {}",
                    collision,
                    self.session.score(),
                    self.session.high_score()
                );
                self.epoch = None;
                let snap = self.session.snapshot();
                if !collision.is_win() {
                    self.term.draw_crash(&snap)?;
                }
                self.term.draw_overlay(&snap)
            }
            StepOutcome::Ignored => Ok(()),
        }
    }

    fn redraw(&mut self) -> crossterm::Result<()> {
        let snap = self.session.snapshot();
        self.term.draw_board(&snap)?;
        self.term.draw_overlay(&snap)
    }
}

/// Whether this frame ticks. Only a running session with a live loop consults
/// the clock; paused frames leave it alone, so resuming ticks at once if overdue.
fn tick_due(
    throttle: &mut FrameThrottle,
    epoch: Option<Epoch>,
    state: RunState,
    now: Instant,
    interval: Duration,
) -> bool {
    match epoch {
        Some(epoch) if state == RunState::Running => throttle.poll(epoch, now, interval),
        _ => false,
    }
}
