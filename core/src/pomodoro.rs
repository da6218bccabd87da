//! Work/break cycle behind the desktop pomodoro widget.
//!
//! The timer is driven by the host calling [`Pomodoro::tick`] with elapsed
//! seconds, so it stays deterministic and owns no scheduler of its own.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Work,
    ShortBreak,
    LongBreak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroDurations {
    pub work_secs: u32,
    pub short_break_secs: u32,
    pub long_break_secs: u32,
    /// Completed work sessions between long breaks.
    pub long_break_every: u32,
}

impl Default for PomodoroDurations {
    fn default() -> Self {
        Self {
            work_secs: 25 * 60,
            short_break_secs: 5 * 60,
            long_break_secs: 15 * 60,
            long_break_every: 4,
        }
    }
}

impl PomodoroDurations {
    fn of(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Work => self.work_secs,
            Phase::ShortBreak => self.short_break_secs,
            Phase::LongBreak => self.long_break_secs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pomodoro {
    durations: PomodoroDurations,
    phase: Phase,
    remaining_secs: u32,
    active: bool,
    completed_work_sessions: u32,
}

impl Pomodoro {
    pub fn new(durations: PomodoroDurations) -> Self {
        Self {
            durations,
            phase: Phase::Work,
            remaining_secs: durations.work_secs,
            active: false,
            completed_work_sessions: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn completed_work_sessions(&self) -> u32 {
        self.completed_work_sessions
    }

    pub fn start(&mut self) {
        self.active = true;
    }

    pub fn pause(&mut self) {
        self.active = false;
    }

    /// Stop and refill the current phase.
    pub fn reset(&mut self) {
        self.active = false;
        self.remaining_secs = self.durations.of(self.phase);
    }

    /// Finish the current phase now. Returns the phase that was completed.
    pub fn skip(&mut self) -> Phase {
        self.complete()
    }

    /// Count down by `elapsed_secs` while active. Returns the completed phase
    /// when the countdown reaches zero; the timer then stops on the next one.
    pub fn tick(&mut self, elapsed_secs: u32) -> Option<Phase> {
        if !self.active {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(elapsed_secs);
        if self.remaining_secs == 0 {
            Some(self.complete())
        } else {
            None
        }
    }

    /// `mm:ss` rendering of the remaining time.
    pub fn display(&self) -> String {
        format!("{:02}:{:02}", self.remaining_secs / 60, self.remaining_secs % 60)
    }

    fn complete(&mut self) -> Phase {
        let finished = self.phase;
        self.active = false;
        self.phase = match finished {
            Phase::Work => {
                self.completed_work_sessions += 1;
                let every = self.durations.long_break_every.max(1);
                if self.completed_work_sessions % every == 0 {
                    Phase::LongBreak
                } else {
                    Phase::ShortBreak
                }
            }
            Phase::ShortBreak | Phase::LongBreak => Phase::Work,
        };
        self.remaining_secs = self.durations.of(self.phase);
        finished
    }
}

impl Default for Pomodoro {
    fn default() -> Self {
        Self::new(PomodoroDurations::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paused_timer_does_not_count_down() {
        let mut timer = Pomodoro::default();
        assert_eq!(timer.tick(60), None);
        assert_eq!(timer.display(), "25:00");
        timer.start();
        timer.tick(61);
        assert_eq!(timer.display(), "23:59");
        timer.pause();
        timer.tick(600);
        assert_eq!(timer.remaining_secs(), 25 * 60 - 61);
    }

    #[test]
    fn work_completion_moves_to_short_break_and_stops() {
        let mut timer = Pomodoro::default();
        timer.start();
        assert_eq!(timer.tick(25 * 60), Some(Phase::Work));
        assert_eq!(timer.phase(), Phase::ShortBreak);
        assert_eq!(timer.remaining_secs(), 5 * 60);
        assert!(!timer.is_active());
        assert_eq!(timer.completed_work_sessions(), 1);
    }

    #[test]
    fn every_fourth_work_session_earns_a_long_break() {
        let mut timer = Pomodoro::default();
        let mut breaks = Vec::new();
        for _ in 0..4 {
            timer.skip();
            breaks.push(timer.phase());
            timer.skip();
            assert_eq!(timer.phase(), Phase::Work);
        }
        assert_eq!(
            breaks,
            [Phase::ShortBreak, Phase::ShortBreak, Phase::ShortBreak, Phase::LongBreak]
        );
        assert_eq!(timer.completed_work_sessions(), 4);
    }

    #[test]
    fn reset_refills_current_phase() {
        let mut timer = Pomodoro::default();
        timer.skip();
        timer.start();
        timer.tick(100);
        timer.reset();
        assert!(!timer.is_active());
        assert_eq!(timer.phase(), Phase::ShortBreak);
        assert_eq!(timer.remaining_secs(), 5 * 60);
    }
}
