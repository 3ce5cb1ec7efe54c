//! WAV file sources and sinks, and the clip stitcher built on them.
//!
//! Decoding and encoding are left to `hound`; this module only moves the
//! samples through streams. A [`FileStack`] concatenates recorded clips and
//! silences into one output file, passing everything through a processor
//! [`Stack`] on the way.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::{debug, info};

use crate::dsp::Stack;
use crate::error::{StreamError, WavError};
use crate::stream::{Slice, Stream, StreamSender};

/// Seconds of audio per decoded slice.
const CHUNK_SECONDS: usize = 2;

/// Prefix marking a silence entry in a clip list.
const SILENCE_PREFIX: &str = "silence:";

/// Sample rate and channel layout of a WAV stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl From<WavSpec> for WavFormat {
    fn from(spec: WavSpec) -> Self {
        WavFormat {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
        }
    }
}

type Samples = Box<dyn Iterator<Item = Result<f64, hound::Error>> + Send>;

/// Open `path` and return its format and normalized `[-1, 1]` samples.
fn open_samples(path: &Path) -> Result<(WavFormat, Samples), WavError> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let samples: Samples = match spec.sample_format {
        SampleFormat::Float => Box::new(reader.into_samples::<f32>().map(|s| s.map(f64::from))),
        SampleFormat::Int => {
            let scale = 2f64.powi(i32::from(spec.bits_per_sample) - 1);
            Box::new(reader.into_samples::<i32>().map(move |s| s.map(|v| f64::from(v) / scale)))
        }
    };
    Ok((spec.into(), samples))
}

/// Send `samples` in slices of `chunk_len`. Returns `false` once the consumer is gone.
fn pump(tx: &StreamSender, samples: Samples, chunk_len: usize, channels: usize) -> Result<bool, WavError> {
    let mut chunk = Vec::with_capacity(chunk_len);
    for sample in samples {
        chunk.push(sample?);
        if chunk.len() == chunk_len {
            let full = std::mem::replace(&mut chunk, Vec::with_capacity(chunk_len));
            if tx.send(Slice::from_vec_with_channels(full, channels)).is_err() {
                return Ok(false);
            }
        }
    }
    if !chunk.is_empty() && tx.send(Slice::from_vec_with_channels(chunk, channels)).is_err() {
        return Ok(false);
    }
    Ok(true)
}

/// Stream the samples of one WAV file, `chunk_frames` frames per slice.
pub fn read_wav(path: impl AsRef<Path>, chunk_frames: usize) -> Result<(WavFormat, Stream), WavError> {
    let path = path.as_ref().to_path_buf();
    let (format, samples) = open_samples(&path)?;
    let channels = usize::from(format.channels);
    let chunk_len = chunk_frames.max(1) * channels;
    let (tx, stream) = Stream::channel();
    crate::stream::spawn_task("wav-read", move || {
        if let Err(err) = pump(&tx, samples, chunk_len, channels) {
            let _ = tx.fail(StreamError::Task(format!("{}: {err}", path.display())));
        }
    });
    Ok((format, stream))
}

/// Drain `stream` into a 16-bit PCM WAV file. Returns the number of samples written.
pub fn write_wav(stream: Stream, path: impl AsRef<Path>, format: WavFormat) -> Result<usize, WavError> {
    let spec = WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path.as_ref(), spec)?;
    let mut written = 0usize;
    stream.drain(|slice| -> Result<(), WavError> {
        for &s in slice.iter() {
            writer.write_sample((s.clamp(-1.0, 1.0) * f64::from(i16::MAX)) as i16)?;
        }
        written += slice.len();
        Ok(())
    })?;
    writer.finalize()?;
    Ok(written)
}

// ── Clip lists ──────────────────────────────────────────────

/// One entry of a stitched recording.
#[derive(Debug, Clone, PartialEq)]
pub enum ClipEntry {
    File(PathBuf),
    /// That many tenth-second gaps, the unit of the render's `gap_tenths`.
    Gap(usize),
    /// Silence of the given length in seconds.
    Silence(f64),
}

impl FromStr for ClipEntry {
    type Err = WavError;

    /// `"silence:<n>"` is `n` tenth-second gaps, `"silence:<seconds>"` with a
    /// fractional value is a pause in seconds, anything else a file path.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(value) = s.strip_prefix(SILENCE_PREFIX).map(str::trim) else {
            return Ok(ClipEntry::File(PathBuf::from(s)));
        };
        if let Ok(tenths) = value.parse::<usize>() {
            return Ok(ClipEntry::Gap(tenths));
        }
        value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(ClipEntry::Silence)
            .ok_or_else(|| WavError::BadClip(s.to_string()))
    }
}

/// A list of clips rendered into a single output file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileStack {
    pub output: PathBuf,
    pub clips: Vec<ClipEntry>,
}

impl FileStack {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        FileStack {
            output: output.into(),
            clips: Vec::new(),
        }
    }

    pub fn add_file(&mut self, path: impl Into<PathBuf>) {
        self.clips.push(ClipEntry::File(path.into()));
    }

    pub fn add_silence(&mut self, seconds: f64) {
        self.clips.push(ClipEntry::Silence(seconds));
    }

    /// Parse and append a clip-list entry.
    pub fn add_entry(&mut self, entry: &str) -> Result<(), WavError> {
        self.clips.push(entry.parse()?);
        Ok(())
    }

    /// Format of the first file clip; every other file must match it.
    fn output_format(&self) -> Result<WavFormat, WavError> {
        let first = self.clips.iter().find_map(|c| match c {
            ClipEntry::File(path) => Some(path),
            ClipEntry::Gap(_) | ClipEntry::Silence(_) => None,
        });
        let path = first.ok_or_else(|| WavError::NoInput(self.output.clone()))?;
        Ok(WavReader::open(path)?.spec().into())
    }

    /// Stream every clip in order; each file is followed by `gap_tenths`
    /// tenth-second silences.
    fn source(&self, format: WavFormat, gap_tenths: usize) -> Stream {
        let clips = self.clips.clone();
        let (tx, stream) = Stream::channel();
        crate::stream::spawn_task("file-stack", move || {
            if let Err(err) = feed_clips(&tx, &clips, format, gap_tenths) {
                let _ = tx.fail(StreamError::Task(err.to_string()));
            }
        });
        stream
    }

    /// Render every clip through `stack` into [`FileStack::output`].
    /// Returns the number of samples written.
    pub fn render(&self, gap_tenths: usize, stack: Stack) -> Result<usize, WavError> {
        let format = self.output_format()?;
        debug!(
            "rendering {} clips to {} at {} Hz x{}",
            self.clips.len(),
            self.output.display(),
            format.sample_rate,
            format.channels
        );
        let stream = stack.apply(self.source(format, gap_tenths));
        let written = write_wav(stream, &self.output, format)?;
        info!("file {} written", self.output.display());
        Ok(written)
    }
}

fn silence_slice(frames: usize, channels: usize) -> Slice {
    Slice::with_channels(frames * channels, channels)
}

/// Producer loop behind [`FileStack::render`]. Stops quietly if the consumer goes away.
fn feed_clips(tx: &StreamSender, clips: &[ClipEntry], format: WavFormat, gap_tenths: usize) -> Result<(), WavError> {
    let channels = usize::from(format.channels);
    let rate = format.sample_rate as usize;
    let chunk_len = CHUNK_SECONDS * rate * channels;
    let gap_frames = rate / 10;

    for clip in clips {
        match clip {
            ClipEntry::Gap(tenths) => {
                for _ in 0..*tenths {
                    if tx.send(silence_slice(gap_frames, channels)).is_err() {
                        return Ok(());
                    }
                }
            }
            ClipEntry::Silence(seconds) => {
                let frames = (rate as f64 * seconds) as usize;
                if frames > 0 && tx.send(silence_slice(frames, channels)).is_err() {
                    return Ok(());
                }
            }
            ClipEntry::File(path) => {
                let (found, samples) = open_samples(path)?;
                if found != format {
                    return Err(WavError::FormatMismatch {
                        path: path.clone(),
                        expected_rate: format.sample_rate,
                        expected_channels: format.channels,
                        rate: found.sample_rate,
                        channels: found.channels,
                    });
                }
                if !pump(tx, samples, chunk_len, channels)? {
                    return Ok(());
                }
                for _ in 0..gap_tenths {
                    if tx.send(silence_slice(gap_frames, channels)).is_err() {
                        return Ok(());
                    }
                }
            }
        }
    }
    Ok(())
}
