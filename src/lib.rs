pub mod app;
pub mod audio;
pub mod engine;
pub mod files;
pub mod input;
pub mod pattern;
pub mod sampler;
pub mod seq;
pub mod view;
pub mod wav;

pub const NUM_INSTRUMENTS: usize = 4;
pub const MAX_STEPS: usize = 8;
pub const MIN_STEPS: usize = 1;

pub const MAX_SAMPLES: usize = 16;

pub const DEFAULT_BPM: u16 = 120;
pub const MIN_BPM: u16 = 60;
pub const MAX_BPM: u16 = 240;
pub const BPM_STEP: i16 = 5;

pub const DISPLAY_NAME_LEN: usize = 8;
pub const DEFAULT_VOLUME: u8 = 200;

// Concurrent voices in the output device. Must not be smaller than the number
// of tracks, otherwise one track could cut off another.
pub const MAX_CHANNELS: usize = 4;
const _: () = assert!(MAX_CHANNELS >= NUM_INSTRUMENTS);

/// Largest sample (in 16-bit values) a single bank slot will hold.
pub const DEFAULT_SAMPLE_LIMIT: usize = 8 * 1024 * 1024;

pub type Millis = u64;
