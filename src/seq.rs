use tracing::debug;

use crate::{Millis, DEFAULT_BPM, MAX_BPM, MAX_STEPS, MIN_BPM, MIN_STEPS};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockState {
    Stopped,
    Playing,
}

/// Step interval for a quarter-note tempo, one step being a sixteenth note.
pub fn step_interval_ms(bpm: u16) -> Millis {
    15_000 / Millis::from(bpm)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaybackState {
    is_playing: bool,
    current_step: usize,
    pattern_length: usize,
    bpm: u16,
    step_interval_ms: Millis,
    last_step_time_ms: Millis,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            current_step: 0,
            pattern_length: MAX_STEPS,
            bpm: DEFAULT_BPM,
            step_interval_ms: step_interval_ms(DEFAULT_BPM),
            last_step_time_ms: 0,
        }
    }
}

impl PlaybackState {
    pub fn state(&self) -> ClockState {
        if self.is_playing {
            ClockState::Playing
        } else {
            ClockState::Stopped
        }
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn pattern_length(&self) -> usize {
        self.pattern_length
    }

    pub fn bpm(&self) -> u16 {
        self.bpm
    }

    pub fn step_interval_ms(&self) -> Millis {
        self.step_interval_ms
    }

    pub fn last_step_time_ms(&self) -> Millis {
        self.last_step_time_ms
    }

    /// Advances the playhead by one step once a full interval has passed since
    /// the last step. Returns true if the step changed.
    ///
    /// At most one step is taken per call, however late the call is.
    pub fn update(&mut self, now: Millis) -> bool {
        if !self.is_playing {
            return false;
        }
        if now.saturating_sub(self.last_step_time_ms) < self.step_interval_ms {
            return false;
        }
        self.current_step = (self.current_step + 1) % self.pattern_length;
        self.last_step_time_ms = now;
        debug!(step = self.current_step, now, "step");
        true
    }

    /// Starting rewinds to the first step. Stopping keeps the playhead where
    /// it is, unlike [`PlaybackState::stop`].
    pub fn toggle_play(&mut self, now: Millis) {
        self.is_playing = !self.is_playing;
        if self.is_playing {
            self.current_step = 0;
            self.last_step_time_ms = now;
        }
    }

    pub fn stop(&mut self) {
        self.is_playing = false;
        self.current_step = 0;
    }

    pub fn set_bpm(&mut self, bpm: u16) {
        self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
        self.step_interval_ms = step_interval_ms(self.bpm);
    }

    pub fn adjust_bpm(&mut self, delta: i16) {
        let bpm = (i32::from(self.bpm) + i32::from(delta)).clamp(MIN_BPM.into(), MAX_BPM.into());
        self.set_bpm(bpm as u16);
    }

    /// Sets the number of active steps. A playhead that falls outside the new
    /// length restarts at step 0.
    pub fn set_pattern_length(&mut self, length: usize) {
        self.pattern_length = length.clamp(MIN_STEPS, MAX_STEPS);
        if self.current_step >= self.pattern_length {
            self.current_step = 0;
        }
    }

    pub fn adjust_pattern_length(&mut self, delta: i8) {
        let length = (self.pattern_length as isize + isize::from(delta)).max(0);
        self.set_pattern_length(length as usize);
    }
}
