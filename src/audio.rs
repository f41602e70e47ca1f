use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use atomic_float::AtomicF32;
use basedrop::{Collector, Shared};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use ringbuf::{Consumer, Producer, RingBuffer};
use tracing::{error, info, warn};
use triple_buffer::TripleBuffer;

use crate::sampler::{Output, SampleBuffer, VoiceRequest};
use crate::{DEFAULT_VOLUME, MAX_CHANNELS};

const COMMAND_QUEUE_SIZE: usize = 64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Activity {
    pub channels: [bool; MAX_CHANNELS],
}

impl Activity {
    pub fn is_active(&self, channel: usize) -> bool {
        self.channels[channel % MAX_CHANNELS]
    }
}

pub enum VoiceCommand {
    Play {
        channel: usize,
        buffer: Shared<SampleBuffer>,
        sample_rate: u32,
    },
    StopAll,
}

pub fn volume_to_gain(level: u8) -> f32 {
    f32::from(level) / f32::from(u8::MAX)
}

struct Voice {
    buffer: Shared<SampleBuffer>,
    position: f64,
    ratio: f64,
}

impl Voice {
    fn next(&mut self) -> Option<f32> {
        let pos = self.position as usize;
        let sample = *self.buffer.get(pos)?;
        self.position += self.ratio;
        Some(f32::from(sample) / 32768.0)
    }
}

/// Renders voices on the audio thread. Commands arrive through a lock-free
/// queue, so the order in which samples were triggered is preserved.
pub struct Mixer {
    consumer: Consumer<VoiceCommand>,
    voices: [Option<Voice>; MAX_CHANNELS],
    volume: Arc<AtomicF32>,
    activity: triple_buffer::Input<Activity>,
    device_rate: f64,
}

impl Mixer {
    pub fn new(
        consumer: Consumer<VoiceCommand>,
        volume: Arc<AtomicF32>,
        activity: triple_buffer::Input<Activity>,
        device_rate: u32,
    ) -> Self {
        Self {
            consumer,
            voices: Default::default(),
            volume,
            activity,
            device_rate: f64::from(device_rate),
        }
    }

    fn run_commands(&mut self) {
        while let Some(cmd) = self.consumer.pop() {
            match cmd {
                VoiceCommand::Play {
                    channel,
                    buffer,
                    sample_rate,
                } => {
                    if sample_rate == 0 {
                        continue;
                    }
                    // Replaces whatever was playing on this channel only.
                    self.voices[channel % MAX_CHANNELS] = Some(Voice {
                        buffer,
                        position: 0.0,
                        ratio: f64::from(sample_rate) / self.device_rate,
                    });
                }
                VoiceCommand::StopAll => {
                    for voice in self.voices.iter_mut() {
                        *voice = None;
                    }
                }
            }
        }
    }

    pub fn render<T>(&mut self, data: &mut [T], channels: usize)
    where
        T: SizedSample + FromSample<f32>,
    {
        self.run_commands();
        let gain = self.volume.load(Ordering::Relaxed);

        for frame in data.chunks_mut(channels.max(1)) {
            let mut mix = 0.0;
            for slot in self.voices.iter_mut() {
                if let Some(voice) = slot {
                    match voice.next() {
                        Some(sample) => mix += sample,
                        None => *slot = None,
                    }
                }
            }
            let value = T::from_sample((mix * gain).clamp(-1.0, 1.0));
            for out in frame.iter_mut() {
                *out = value;
            }
        }

        let activity = self.activity.input_buffer();
        for (active, voice) in activity.channels.iter_mut().zip(self.voices.iter()) {
            *active = voice.is_some();
        }
        self.activity.publish();
    }
}

pub struct CpalOutput {
    _stream: cpal::Stream,
    producer: Producer<VoiceCommand>,
    collector: Collector,
    volume: Arc<AtomicF32>,
    activity: triple_buffer::Output<Activity>,
}

impl CpalOutput {
    pub fn open() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("no output device available"))?;
        let supported = device.default_output_config()?;
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();
        info!(
            device = %device.name().unwrap_or_default(),
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            ?sample_format,
            "opening output device"
        );

        let (producer, consumer) = RingBuffer::<VoiceCommand>::new(COMMAND_QUEUE_SIZE).split();
        let volume = Arc::new(AtomicF32::new(volume_to_gain(DEFAULT_VOLUME)));
        let (activity_in, activity_out) = TripleBuffer::new(&Activity::default()).split();
        let mixer = Mixer::new(consumer, volume.clone(), activity_in, config.sample_rate.0);

        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, mixer)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, mixer)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, mixer)?,
            other => return Err(anyhow!("unsupported sample format {:?}", other)),
        };
        stream.play()?;

        Ok(Self {
            _stream: stream,
            producer,
            collector: Collector::new(),
            volume,
            activity: activity_out,
        })
    }

    fn send(&mut self, cmd: VoiceCommand) {
        // Buffers dropped by the audio thread are freed here, not in the callback.
        self.collector.collect();
        if self.producer.push(cmd).is_err() {
            warn!("voice queue full, dropping command");
        }
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut mixer: Mixer,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = usize::from(config.channels);
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| mixer.render(data, channels),
        |err| error!(%err, "output stream error"),
        None,
    )?;
    Ok(stream)
}

impl Output for CpalOutput {
    fn play_voice(&mut self, voice: VoiceRequest) {
        let buffer = Shared::new(&self.collector.handle(), voice.buffer);
        self.send(VoiceCommand::Play {
            channel: voice.channel,
            buffer,
            sample_rate: voice.sample_rate,
        });
    }

    fn stop_all_voices(&mut self) {
        self.send(VoiceCommand::StopAll);
    }

    fn set_master_volume(&mut self, level: u8) {
        self.volume.store(volume_to_gain(level), Ordering::Relaxed);
    }

    fn activity(&mut self) -> Activity {
        read_activity(&mut self.collector, &mut self.activity)
    }
}

// Called once per frame, so buffers of voices that finished or were replaced
// are released even when nothing new is triggered.
fn read_activity(
    collector: &mut Collector,
    activity: &mut triple_buffer::Output<Activity>,
) -> Activity {
    collector.collect();
    *activity.read()
}

#[derive(Default)]
pub struct NullOutput {}

impl Output for NullOutput {
    fn play_voice(&mut self, _voice: VoiceRequest) {}
    fn stop_all_voices(&mut self) {}
    fn set_master_volume(&mut self, _level: u8) {}
}
