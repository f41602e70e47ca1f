use std::io::{Read, Seek};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::audio::Activity;
use crate::wav::{DecodeError, WavReader};
use crate::{DEFAULT_SAMPLE_LIMIT, DISPLAY_NAME_LEN, MAX_SAMPLES};

pub type Buffer = Vec<i16>;

/// Handle to a slot's decoded PCM. The slot is the only owner that can replace
/// it; voices rendering the buffer hold it until they finish.
pub type SampleBuffer = Arc<Buffer>;

const DEFAULT_SAMPLE_RATE: u32 = 22050;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("sample slot {0} out of range")]
    SlotOutOfRange(usize),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

#[derive(Clone, Debug)]
pub struct VoiceRequest {
    pub channel: usize,
    pub buffer: SampleBuffer,
    pub sample_rate: u32,
}

/// The audio device the bank plays through. Implementations must not block.
pub trait Output {
    fn play_voice(&mut self, voice: VoiceRequest);
    fn stop_all_voices(&mut self);
    fn set_master_volume(&mut self, level: u8);

    fn activity(&mut self) -> Activity {
        Activity::default()
    }
}

impl<O: Output + ?Sized> Output for Box<O> {
    fn play_voice(&mut self, voice: VoiceRequest) {
        (**self).play_voice(voice)
    }

    fn stop_all_voices(&mut self) {
        (**self).stop_all_voices()
    }

    fn set_master_volume(&mut self, level: u8) {
        (**self).set_master_volume(level)
    }

    fn activity(&mut self) -> Activity {
        (**self).activity()
    }
}

#[derive(Clone, Debug)]
pub struct Sample {
    buffer: Option<SampleBuffer>,
    sample_rate: u32,
    name: String,
}

impl Default for Sample {
    fn default() -> Self {
        Self {
            buffer: None,
            sample_rate: DEFAULT_SAMPLE_RATE,
            name: String::new(),
        }
    }
}

impl Sample {
    pub fn is_loaded(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn buffer(&self) -> Option<&SampleBuffer> {
        self.buffer.as_ref()
    }

    pub fn len(&self) -> usize {
        self.buffer.as_ref().map_or(0, |b| b.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

pub struct SampleBank<O> {
    slots: Vec<Sample>,
    output: O,
    sample_limit: usize,
}

impl<O: Output> SampleBank<O> {
    pub fn new(output: O) -> Self {
        Self {
            slots: vec![Sample::default(); MAX_SAMPLES],
            output,
            sample_limit: DEFAULT_SAMPLE_LIMIT,
        }
    }

    /// Caps the number of samples a single slot may hold. Larger files fail to
    /// load with an allocation error.
    pub fn with_sample_limit(mut self, limit: usize) -> Self {
        self.sample_limit = limit;
        self
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, index: usize) -> Option<&Sample> {
        self.slots.get(index)
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    /// Decodes `reader` into slot `index`.
    ///
    /// The slot is only touched once decoding has fully succeeded; on error it
    /// keeps its previous buffer, name and sample rate.
    pub fn load<R: Read + Seek>(
        &mut self,
        index: usize,
        name: &str,
        reader: R,
    ) -> Result<(), LoadError> {
        if index >= self.slots.len() {
            return Err(LoadError::SlotOutOfRange(index));
        }

        let wav = WavReader::new(reader).map_err(|err| {
            warn!(slot = index, name, %err, "unable to read wav header");
            err
        })?;
        let spec = wav.spec();
        let samples = wav.read_samples(self.sample_limit).map_err(|err| {
            warn!(slot = index, name, %err, "unable to decode samples");
            err
        })?;

        info!(
            slot = index,
            name,
            samples = samples.len(),
            sample_rate = spec.sample_rate,
            bits = spec.bits_per_sample,
            channels = spec.channels,
            "loaded sample"
        );

        // Dropping the old sample releases the previous buffer.
        self.slots[index] = Sample {
            buffer: Some(Arc::new(samples)),
            sample_rate: spec.sample_rate,
            name: display_name(name),
        };
        Ok(())
    }

    pub fn trigger(&mut self, index: usize, channel: usize) {
        let Some(sample) = self.slots.get(index) else {
            warn!(slot = index, "trigger: slot out of range");
            return;
        };
        let Some(buffer) = &sample.buffer else {
            warn!(slot = index, "trigger: slot not loaded");
            return;
        };
        debug!(slot = index, channel, "trigger");
        self.output.play_voice(VoiceRequest {
            channel,
            buffer: buffer.clone(),
            sample_rate: sample.sample_rate,
        });
    }

    pub fn stop_all(&mut self) {
        self.output.stop_all_voices();
    }

    pub fn set_master_volume(&mut self, level: u8) {
        self.output.set_master_volume(level);
    }
}

/// Short name shown next to a track: no leading `/`, no extension, at most
/// `DISPLAY_NAME_LEN` characters.
pub fn display_name(name: &str) -> String {
    let name = name.strip_prefix('/').unwrap_or(name);
    let name = match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    };
    name.chars().take(DISPLAY_NAME_LEN).collect()
}
