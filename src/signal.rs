//! Signal sources: synthetic phasor generator and stereo-PCM file decoder.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use num_complex::Complex64;
use thiserror::Error;

/// Fixed-size container prefix skipped by the decoder.
pub const PCM_HEADER_BYTES: usize = 44;

/// Bytes per stereo frame: two little-endian i16 channels.
const FRAME_BYTES: usize = 4;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is {len} bytes, shorter than the 44-byte header", path.display())]
    TooShort { path: PathBuf, len: u64 },

    #[error("read error in {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A decoded signal plus the number of whole frames it came from.
#[derive(Debug, Clone)]
pub struct DecodedSignal {
    pub samples: Vec<Complex64>,
    pub frames: usize,
}

/// Unit-circle phasor at the fundamental plus a 10% second harmonic.
///
/// Sample k is cos(2πk/n) + 0.1·cos(4πk/n) in the real part and the matching
/// sines in the imaginary part, so the spectrum has known non-trivial content
/// concentrated in bins 1 and 2.
pub fn synthetic_signal(n: usize) -> Vec<Complex64> {
    use std::f64::consts::TAU;
    (0..n)
        .map(|k| {
            let t = k as f64 / n as f64;
            let re = (TAU * t).cos() + 0.1 * (2.0 * TAU * t).cos();
            let im = (TAU * t).sin() + 0.1 * (2.0 * TAU * t).sin();
            Complex64::new(re, im)
        })
        .collect()
}

/// Decode a stereo 16-bit PCM file into complex samples.
///
/// Skips the fixed 44-byte prefix without inspecting it, then reads whole
/// 4-byte frames until EOF: left channel to the real part, right channel to
/// the imaginary part, each normalized by 32768. A trailing partial frame is
/// dropped. The declared format inside the prefix is never validated; this
/// is a fixed-offset reinterpretation, not a container parser.
pub fn decode_stereo_pcm(path: &Path) -> Result<DecodedSignal, SignalError> {
    let file = File::open(path).map_err(|source| SignalError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let len = file.metadata().map_err(|source| SignalError::Read {
        path: path.to_path_buf(),
        source,
    })?
    .len();
    if len < PCM_HEADER_BYTES as u64 {
        return Err(SignalError::TooShort {
            path: path.to_path_buf(),
            len,
        });
    }

    let mut reader = BufReader::new(file);
    let mut header = [0u8; PCM_HEADER_BYTES];
    reader.read_exact(&mut header).map_err(|source| SignalError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let payload = len as usize - PCM_HEADER_BYTES;
    let mut samples = Vec::with_capacity(payload / FRAME_BYTES);
    let mut frame = [0u8; FRAME_BYTES];
    loop {
        match reader.read_exact(&mut frame) {
            Ok(()) => {
                let left = i16::from_le_bytes([frame[0], frame[1]]);
                let right = i16::from_le_bytes([frame[2], frame[3]]);
                samples.push(Complex64::new(
                    f64::from(left) / 32768.0,
                    f64::from(right) / 32768.0,
                ));
            }
            // Clean EOF or a trailing partial frame: stop, keep whole frames only.
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(source) => {
                return Err(SignalError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }

    let frames = samples.len();
    tracing::debug!(frames, payload, "decoded stereo PCM payload");
    Ok(DecodedSignal { samples, frames })
}
