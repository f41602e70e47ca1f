use std::io;

use thiserror::Error;
use tracing::{info, warn};

use crate::audio::Activity;
use crate::engine::{self, Sequencer, Triggers};
use crate::files::Storage;
use crate::pattern::{Cursor, Move, Pattern};
use crate::sampler::{LoadError, Output, SampleBank};
use crate::seq::PlaybackState;
use crate::{Millis, DEFAULT_VOLUME, NUM_INSTRUMENTS};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] io::Error),
    #[error("no .wav files found in {0}")]
    NoMediaFound(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    MoveCursor(Move),
    ToggleStep,
    TogglePlay,
    Stop,
    AdjustBpm(i16),
    AdjustLength(i8),
    /// Loads the previous (-1) or next (+1) file into the cursor's track.
    CycleSample(i8),
    AssignSample(usize, usize),
    Clear,
    TriggerTrack(usize),
    SetVolume(u8),
    Quit,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub pattern: Pattern,
    pub cursor: Cursor,
    pub playback: PlaybackState,
    pub track_names: [String; NUM_INSTRUMENTS],
    pub track_slots: [usize; NUM_INSTRUMENTS],
    pub activity: Activity,
}

pub struct App<S, O> {
    seq: Sequencer,
    bank: SampleBank<O>,
    storage: S,
    files: Vec<String>,
    // Position in `files` of the sample each track last loaded.
    track_files: [usize; NUM_INSTRUMENTS],
    volume: u8,
    should_stop: bool,
}

impl<S: Storage, O: Output> App<S, O> {
    pub fn start(storage: S, output: O) -> Result<Self, SessionError> {
        Self::with_bank(storage, SampleBank::new(output))
    }

    pub fn with_bank(storage: S, bank: SampleBank<O>) -> Result<Self, SessionError> {
        let files = storage.list_wav()?;
        if files.is_empty() {
            return Err(SessionError::NoMediaFound(storage.location()));
        }
        info!(files = files.len(), "found samples");

        let mut app = Self {
            seq: Sequencer::new(Pattern::new()),
            bank,
            storage,
            files,
            track_files: [0; NUM_INSTRUMENTS],
            volume: DEFAULT_VOLUME,
            should_stop: false,
        };

        for track in 0..NUM_INSTRUMENTS {
            let index = track % app.files.len();
            app.track_files[track] = index;
            if track < app.files.len() {
                if let Err(err) = app.load_into(track, index) {
                    warn!(track, %err, "unable to load initial sample");
                }
            }
            app.seq.tracks.assign(track, track);
        }
        app.set_volume(DEFAULT_VOLUME);
        Ok(app)
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.seq
    }

    pub fn set_pattern(&mut self, pattern: Pattern) {
        self.seq.pattern = pattern;
    }

    pub fn set_bpm(&mut self, bpm: u16) {
        self.seq.playback.set_bpm(bpm);
    }

    pub fn set_volume(&mut self, level: u8) {
        self.volume = level;
        self.bank.set_master_volume(level);
    }

    pub fn bank(&self) -> &SampleBank<O> {
        &self.bank
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn should_stop(&self) -> bool {
        self.should_stop
    }

    /// Applies a command. Only sample loading can fail; a failed load leaves
    /// the previously loaded sample in place.
    pub fn take(&mut self, action: Action, now: Millis) -> Result<(), LoadError> {
        match action {
            Action::MoveCursor(m) => {
                let length = self.seq.playback.pattern_length();
                self.seq.cursor.move_to(m, length);
            }
            Action::ToggleStep => {
                let Cursor { row, col } = self.seq.cursor;
                self.seq.pattern.toggle_step(row, col);
            }
            Action::TogglePlay => {
                self.seq.playback.toggle_play(now);
                if !self.seq.playback.is_playing() {
                    self.bank.stop_all();
                }
            }
            Action::Stop => {
                self.seq.playback.stop();
                self.bank.stop_all();
            }
            Action::AdjustBpm(delta) => self.seq.playback.adjust_bpm(delta),
            Action::AdjustLength(delta) => self.seq.adjust_pattern_length(delta),
            Action::CycleSample(direction) => {
                let track = self.seq.cursor.row;
                self.cycle_track_sample(track, direction)?;
            }
            Action::AssignSample(track, slot) => self.seq.tracks.assign(track, slot),
            Action::Clear => self.seq.pattern.clear(),
            Action::TriggerTrack(track) => self.trigger_track(track),
            Action::SetVolume(level) => self.set_volume(level),
            Action::Quit => self.should_stop = true,
        }
        Ok(())
    }

    pub fn tick(&mut self, now: Millis) -> Triggers {
        let (seq, triggers) = engine::tick(self.seq, now);
        self.seq = seq;
        engine::dispatch(&triggers, &mut self.bank);
        triggers
    }

    pub fn trigger_track(&mut self, track: usize) {
        if track >= NUM_INSTRUMENTS {
            return;
        }
        self.bank.trigger(self.seq.tracks.slot(track), track);
    }

    /// Moves `track` to the previous or next file in the listing, loads it
    /// into the track's own slot and previews it.
    ///
    /// The listing position moves even if loading fails, so the next call
    /// skips past an unreadable file.
    pub fn cycle_track_sample(&mut self, track: usize, direction: i8) -> Result<(), LoadError> {
        if track >= NUM_INSTRUMENTS {
            return Ok(());
        }
        let count = self.files.len() as isize;
        let index = (self.track_files[track] as isize + isize::from(direction)).rem_euclid(count);
        self.track_files[track] = index as usize;

        self.load_into(track, index as usize)?;
        self.seq.tracks.assign(track, track);
        self.bank.trigger(track, track);
        Ok(())
    }

    fn load_into(&mut self, slot: usize, file_index: usize) -> Result<(), LoadError> {
        let name = &self.files[file_index];
        let reader = match self.storage.open(name) {
            Ok(reader) => reader,
            Err(err) => {
                warn!(name = %name, %err, "unable to open sample");
                return Err(LoadError::Decode(err.into()));
            }
        };
        self.bank.load(slot, name, reader)
    }

    pub fn snapshot(&mut self) -> Snapshot {
        let mut track_names: [String; NUM_INSTRUMENTS] = Default::default();
        let mut track_slots = [0; NUM_INSTRUMENTS];
        for track in 0..NUM_INSTRUMENTS {
            let slot = self.seq.tracks.slot(track);
            track_slots[track] = slot;
            track_names[track] = match self.bank.slot(slot) {
                Some(sample) if sample.is_loaded() => sample.name().to_string(),
                _ => (track + 1).to_string(),
            };
        }
        Snapshot {
            pattern: self.seq.pattern,
            cursor: self.seq.cursor,
            playback: self.seq.playback,
            track_names,
            track_slots,
            activity: self.bank.output_mut().activity(),
        }
    }
}
