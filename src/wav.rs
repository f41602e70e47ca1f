//! Minimal RIFF/WAVE decoder producing signed 16-bit PCM.
//!
//! Only 8-bit and 16-bit payloads are accepted. The `fmt ` chunk must directly
//! follow the container header; every other chunk may appear in any order and
//! is skipped until the `data` chunk is found.

use std::io::{self, ErrorKind, Read, Seek, SeekFrom};

use thiserror::Error;
use tracing::debug;

const RIFF_TAG: &[u8; 4] = b"RIFF";
const WAVE_TAG: &[u8; 4] = b"WAVE";
const FMT_TAG: &[u8; 4] = b"fmt ";
const DATA_TAG: &[u8; 4] = b"data";

// RIFF header (12) + fmt chunk header (8) + core fmt fields (16)
const HEADER_LEN: usize = 36;
const CORE_FMT_LEN: u32 = 16;

// Even, so a 16-bit sample never straddles two reads.
const READ_CHUNK: usize = 4096;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid wav file: {0}")]
    Format(&'static str),
    #[error("no data chunk found")]
    NoDataChunk,
    #[error("unsupported bit depth: {0}")]
    UnsupportedBitDepth(u16),
    #[error("unable to allocate a buffer for {0} samples")]
    Allocation(usize),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WavSpec {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl WavSpec {
    pub fn bytes_per_sample(&self) -> usize {
        usize::from(self.bits_per_sample / 8)
    }
}

pub struct WavReader<R> {
    reader: R,
    spec: WavSpec,
    data_size: u32,
}

impl<R: Read + Seek> WavReader<R> {
    pub fn new(mut reader: R) -> Result<Self, DecodeError> {
        let mut header = [0u8; HEADER_LEN];
        read_exact_or(&mut reader, &mut header, "truncated header")?;

        if &header[0..4] != RIFF_TAG {
            return Err(DecodeError::Format("missing RIFF tag"));
        }
        if &header[8..12] != WAVE_TAG {
            return Err(DecodeError::Format("missing WAVE tag"));
        }
        if &header[12..16] != FMT_TAG {
            return Err(DecodeError::Format("missing fmt chunk"));
        }

        let fmt_len = u32_le(&header[16..20]);
        if fmt_len < CORE_FMT_LEN {
            return Err(DecodeError::Format("fmt chunk too short"));
        }
        let spec = WavSpec {
            channels: u16_le(&header[22..24]),
            sample_rate: u32_le(&header[24..28]),
            bits_per_sample: u16_le(&header[34..36]),
        };
        if spec.sample_rate == 0 {
            return Err(DecodeError::Format("invalid sample rate"));
        }
        if spec.channels == 0 {
            return Err(DecodeError::Format("invalid channel count"));
        }
        if fmt_len > CORE_FMT_LEN {
            reader.seek(SeekFrom::Current(i64::from(fmt_len - CORE_FMT_LEN)))?;
        }

        match spec.bits_per_sample {
            8 | 16 => {}
            bits => return Err(DecodeError::UnsupportedBitDepth(bits)),
        }

        let data_size = find_data_chunk(&mut reader)?;
        debug!(
            sample_rate = spec.sample_rate,
            bits = spec.bits_per_sample,
            channels = spec.channels,
            data_size,
            "wav header"
        );

        Ok(Self {
            reader,
            spec,
            data_size,
        })
    }

    pub fn spec(&self) -> WavSpec {
        self.spec
    }

    /// Number of samples in the payload. Trailing bytes that do not make up a
    /// whole sample are not counted.
    pub fn len(&self) -> usize {
        self.data_size as usize / self.spec.bytes_per_sample()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the payload into a newly allocated buffer of at most `limit`
    /// samples, converting 8-bit unsigned audio to signed 16-bit.
    pub fn read_samples(mut self, limit: usize) -> Result<Vec<i16>, DecodeError> {
        let len = self.len();
        if len > limit {
            return Err(DecodeError::Allocation(len));
        }
        let mut samples = Vec::new();
        samples
            .try_reserve_exact(len)
            .map_err(|_| DecodeError::Allocation(len))?;

        let bytes_per_sample = self.spec.bytes_per_sample();
        let mut remaining = len * bytes_per_sample;
        let mut chunk = [0u8; READ_CHUNK];
        while remaining > 0 {
            let n = usize::min(remaining, chunk.len());
            read_exact_or(&mut self.reader, &mut chunk[..n], "truncated data chunk")?;
            if bytes_per_sample == 2 {
                samples.extend(
                    chunk[..n]
                        .chunks_exact(2)
                        .map(|b| i16::from_le_bytes([b[0], b[1]])),
                );
            } else {
                samples.extend(chunk[..n].iter().map(|&b| widen_u8(b)));
            }
            remaining -= n;
        }
        Ok(samples)
    }
}

#[derive(Clone, Debug)]
pub struct Wav {
    pub spec: WavSpec,
    pub samples: Vec<i16>,
}

pub fn decode<R: Read + Seek>(reader: R) -> Result<Wav, DecodeError> {
    let wav = WavReader::new(reader)?;
    let spec = wav.spec();
    let samples = wav.read_samples(usize::MAX)?;
    Ok(Wav { spec, samples })
}

fn find_data_chunk<R: Read + Seek>(reader: &mut R) -> Result<u32, DecodeError> {
    let mut chunk = [0u8; 8];
    loop {
        match reader.read_exact(&mut chunk) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
                return Err(DecodeError::NoDataChunk)
            }
            Err(err) => return Err(err.into()),
        }
        let size = u32_le(&chunk[4..8]);
        if &chunk[0..4] == DATA_TAG {
            if size == 0 {
                return Err(DecodeError::NoDataChunk);
            }
            return Ok(size);
        }
        reader.seek(SeekFrom::Current(i64::from(size)))?;
    }
}

fn read_exact_or<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    reason: &'static str,
) -> Result<(), DecodeError> {
    reader.read_exact(buf).map_err(|err| match err.kind() {
        ErrorKind::UnexpectedEof => DecodeError::Format(reason),
        _ => DecodeError::Io(err),
    })
}

// Centers the unsigned 8-bit range on zero and scales it to 16 bits.
fn widen_u8(b: u8) -> i16 {
    (i16::from(b) - 128) << 8
}

fn u16_le(b: &[u8]) -> u16 {
    u16::from_le_bytes([b[0], b[1]])
}

fn u32_le(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}
