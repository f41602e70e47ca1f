//! Couples the step clock, the pattern and the sample bank.

use tracing::trace;

use crate::pattern::{Cursor, Pattern};
use crate::sampler::{Output, SampleBank};
use crate::seq::PlaybackState;
use crate::{Millis, MAX_SAMPLES, NUM_INSTRUMENTS};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackAssignment {
    slots: [usize; NUM_INSTRUMENTS],
}

impl Default for TrackAssignment {
    fn default() -> Self {
        let mut slots = [0; NUM_INSTRUMENTS];
        for (track, slot) in slots.iter_mut().enumerate() {
            *slot = track;
        }
        Self { slots }
    }
}

impl TrackAssignment {
    pub fn slot(&self, track: usize) -> usize {
        self.slots[track]
    }

    /// Points `track` at `slot`. Out of range values are ignored.
    pub fn assign(&mut self, track: usize, slot: usize) {
        if track < NUM_INSTRUMENTS && slot < MAX_SAMPLES {
            self.slots[track] = slot;
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TriggerEvent {
    pub track: usize,
    pub slot: usize,
}

impl TriggerEvent {
    pub fn channel(&self) -> usize {
        self.track
    }
}

pub type Triggers = Vec<TriggerEvent>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sequencer {
    pub pattern: Pattern,
    pub playback: PlaybackState,
    pub cursor: Cursor,
    pub tracks: TrackAssignment,
}

impl Sequencer {
    pub fn new(pattern: Pattern) -> Self {
        Self {
            pattern,
            ..Self::default()
        }
    }

    pub fn set_pattern_length(&mut self, length: usize) {
        self.playback.set_pattern_length(length);
        self.cursor.clamp_to_length(self.playback.pattern_length());
    }

    pub fn adjust_pattern_length(&mut self, delta: i8) {
        self.playback.adjust_pattern_length(delta);
        self.cursor.clamp_to_length(self.playback.pattern_length());
    }

    pub fn triggers_at_playhead(&self) -> Triggers {
        let step = self.playback.current_step();
        self.pattern
            .active_at(step)
            .map(|track| TriggerEvent {
                track,
                slot: self.tracks.slot(track),
            })
            .collect()
    }
}

/// Advances the clock to `now` and returns the new state together with the
/// samples to fire. No events are produced unless the step changed.
pub fn tick(mut seq: Sequencer, now: Millis) -> (Sequencer, Triggers) {
    if !seq.playback.update(now) {
        return (seq, Triggers::new());
    }
    let triggers = seq.triggers_at_playhead();
    trace!(step = seq.playback.current_step(), ?triggers, "dispatch");
    (seq, triggers)
}

pub fn dispatch<O: Output>(triggers: &[TriggerEvent], bank: &mut SampleBank<O>) {
    for event in triggers {
        bank.trigger(event.slot, event.channel());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::tests::{Call, RecordingOutput};
    use crate::wav::tests::WavBuilder;
    use std::io::Cursor as IoCursor;

    fn started(pattern: Pattern) -> Sequencer {
        let mut seq = Sequencer::new(pattern);
        seq.playback.toggle_play(0);
        seq
    }

    #[test]
    fn no_events_before_interval() {
        let seq = started(Pattern::with_default_groove());
        let (next, triggers) = tick(seq, 100);
        assert!(triggers.is_empty());
        assert_eq!(next, seq);
    }

    #[test]
    fn fires_active_tracks_on_step_change() {
        let seq = started(Pattern::with_default_groove());
        let (seq, triggers) = tick(seq, 125);
        assert_eq!(seq.playback.current_step(), 1);
        assert_eq!(triggers, vec![TriggerEvent { track: 2, slot: 2 }]);

        let (seq, triggers) = tick(seq, 250);
        assert_eq!(seq.playback.current_step(), 2);
        assert_eq!(
            triggers,
            vec![
                TriggerEvent { track: 1, slot: 1 },
                TriggerEvent { track: 2, slot: 2 }
            ]
        );
    }

    #[test]
    fn uses_track_assignment() {
        let mut pattern = Pattern::new();
        pattern.set_step(0, 1, true);
        pattern.set_step(3, 1, true);
        let mut seq = started(pattern);
        seq.tracks.assign(0, 9);
        seq.tracks.assign(3, 9);
        let (_, triggers) = tick(seq, 125);
        assert_eq!(
            triggers,
            vec![
                TriggerEvent { track: 0, slot: 9 },
                TriggerEvent { track: 3, slot: 9 }
            ]
        );
        assert_eq!(triggers[1].channel(), 3);
    }

    #[test]
    fn sees_edits_made_before_the_step() {
        let mut seq = started(Pattern::new());
        let (next, triggers) = tick(seq, 125);
        assert!(triggers.is_empty());
        seq = next;

        seq.pattern.toggle_step(1, 2);
        let (_, triggers) = tick(seq, 250);
        assert_eq!(triggers, vec![TriggerEvent { track: 1, slot: 1 }]);
    }

    #[test]
    fn stopped_sequencer_is_silent() {
        let seq = Sequencer::new(Pattern::with_default_groove());
        let (_, triggers) = tick(seq, 10_000);
        assert!(triggers.is_empty());
    }

    #[test]
    fn bits_beyond_length_are_not_played() {
        let mut pattern = Pattern::new();
        pattern.set_step(0, 3, true);
        let mut seq = started(pattern);
        seq.set_pattern_length(3);

        let mut now = 0;
        for _ in 0..6 {
            now += 125;
            let (next, triggers) = tick(seq, now);
            assert!(triggers.is_empty());
            seq = next;
        }
        assert!(seq.pattern.step(0, 3));
    }

    #[test]
    fn length_change_clamps_cursor() {
        let mut seq = Sequencer::default();
        seq.cursor.col = 7;
        seq.adjust_pattern_length(-2);
        assert_eq!(seq.playback.pattern_length(), 6);
        assert_eq!(seq.cursor.col, 5);
    }

    #[test]
    fn assignment_ignores_out_of_range() {
        let mut tracks = TrackAssignment::default();
        tracks.assign(NUM_INSTRUMENTS, 1);
        tracks.assign(0, MAX_SAMPLES);
        assert_eq!(tracks, TrackAssignment::default());
        assert_eq!(tracks.slot(3), 3);
    }

    #[test]
    fn dispatch_triggers_bank() {
        let mut bank = SampleBank::new(RecordingOutput::default());
        let wav = WavBuilder::new(16, 22050).data(vec![0; 8]).build();
        bank.load(2, "c.wav", IoCursor::new(wav)).unwrap();

        let triggers = vec![
            TriggerEvent { track: 0, slot: 0 },
            TriggerEvent { track: 2, slot: 2 },
            TriggerEvent { track: 3, slot: 2 },
        ];
        dispatch(&triggers, &mut bank);
        assert_eq!(
            bank.output().calls,
            vec![
                Call::Play {
                    channel: 2,
                    len: 4,
                    sample_rate: 22050
                },
                Call::Play {
                    channel: 3,
                    len: 4,
                    sample_rate: 22050
                },
            ]
        );
    }
}
