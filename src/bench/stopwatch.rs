//! Timing Window
//!
//! A pausable stopwatch. Every transition closes the current segment at the
//! same instant it opens the next one, so running plus paused time always
//! equals the wall-clock time since start.

use std::time::{Duration, Instant};

/// Stopwatch misuse
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TimingError {
    #[error("timing window paused twice")]
    AlreadyPaused,

    #[error("timing window resumed while running")]
    NotPaused,

    #[error("correctness hook attempted while the timing window is running")]
    HookWhileRunning,
}

/// Totals of a stopped window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowTotals {
    pub running: Duration,
    pub paused: Duration,
    pub wall: Duration,
    pub pauses: u64,
    pub resumes: u64,
}

#[derive(Debug)]
pub struct Stopwatch {
    started: Instant,
    last: Instant,
    running: bool,
    running_total: Duration,
    paused_total: Duration,
    pauses: u64,
    resumes: u64,
}

impl Stopwatch {
    /// Starts a running window
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            last: now,
            running: true,
            running_total: Duration::ZERO,
            paused_total: Duration::ZERO,
            pauses: 0,
            resumes: 0,
        }
    }

    pub fn pause(&mut self) -> Result<(), TimingError> {
        if !self.running {
            return Err(TimingError::AlreadyPaused);
        }
        self.close_segment(Instant::now());
        self.running = false;
        self.pauses += 1;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), TimingError> {
        if self.running {
            return Err(TimingError::NotPaused);
        }
        self.close_segment(Instant::now());
        self.running = true;
        self.resumes += 1;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Fails unless the window is paused
    pub fn ensure_paused(&self) -> Result<(), TimingError> {
        if self.running {
            return Err(TimingError::HookWhileRunning);
        }
        Ok(())
    }

    pub fn pauses(&self) -> u64 {
        self.pauses
    }

    pub fn resumes(&self) -> u64 {
        self.resumes
    }

    /// Running time so far, including the open segment
    pub fn elapsed(&self) -> Duration {
        if self.running {
            self.running_total + self.last.elapsed()
        } else {
            self.running_total
        }
    }

    /// Closes the window; a paused window may be stopped
    pub fn stop(mut self) -> WindowTotals {
        let now = Instant::now();
        self.close_segment(now);
        WindowTotals {
            running: self.running_total,
            paused: self.paused_total,
            wall: now - self.started,
            pauses: self.pauses,
            resumes: self.resumes,
        }
    }

    fn close_segment(&mut self, now: Instant) {
        let segment = now - self.last;
        if self.running {
            self.running_total += segment;
        } else {
            self.paused_total += segment;
        }
        self.last = now;
    }
}
