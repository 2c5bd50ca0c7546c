//! Audio output using rodio
//!
//! One output stream per backend. Each voice keeps its clip's encoded bytes
//! and builds a fresh [`Sink`] + [`Decoder`] on every start, so a start
//! always begins at the top of the clip. Dropping the sink silences it.

use super::{AudioBackend, Blocked, PlayStart, Playing, Voice};
use crate::source::SoundSource;
use crate::{Result, SoundError};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::io::Cursor;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Backend playing through the default system output device
pub struct RodioBackend {
    _stream: OutputStream,
    handle: OutputStreamHandle,
}

impl RodioBackend {
    /// Open the default output device
    pub fn new() -> Result<Self> {
        let (stream, handle) = OutputStream::try_default().map_err(|e| {
            SoundError::AudioDeviceError(format!("Failed to create audio stream: {}", e))
        })?;
        Ok(Self {
            _stream: stream,
            handle,
        })
    }
}

impl AudioBackend for RodioBackend {
    fn name(&self) -> &'static str {
        "rodio"
    }

    fn open(&mut self, key: &str, source: &SoundSource) -> Result<Box<dyn Voice>> {
        let bytes = source.read_bytes()?;
        // Reject undecodable clips at load time rather than on every start.
        Decoder::new(Cursor::new(Arc::clone(&bytes)))
            .map_err(|e| SoundError::DecodeError(format!("{}: {}", source, e)))?;
        debug!(key, %source, size = bytes.len(), "rodio voice opened");

        Ok(Box::new(RodioVoice {
            bytes,
            handle: self.handle.clone(),
            sink: None,
            volume: 1.0,
            looping: false,
            clock: PlayClock::default(),
        }))
    }
}

/// Wall-clock position tracking for a voice
#[derive(Debug, Default, Clone, Copy)]
struct PlayClock {
    banked: Duration,
    resumed_at: Option<Instant>,
}

impl PlayClock {
    fn resume(&mut self, now: Instant) {
        if self.resumed_at.is_none() {
            self.resumed_at = Some(now);
        }
    }

    fn pause(&mut self, now: Instant) {
        if let Some(at) = self.resumed_at.take() {
            self.banked += now.saturating_duration_since(at);
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn elapsed(&self, now: Instant) -> Duration {
        self.banked
            + self
                .resumed_at
                .map(|at| now.saturating_duration_since(at))
                .unwrap_or_default()
    }
}

struct RodioVoice {
    bytes: Arc<[u8]>,
    handle: OutputStreamHandle,
    sink: Option<Sink>,
    volume: f32,
    looping: bool,
    clock: PlayClock,
}

impl Voice for RodioVoice {
    fn start(&mut self) -> PlayStart {
        if self.bytes.is_empty() {
            return Err(Blocked::new("voice was released"));
        }
        if let Some(sink) = &self.sink {
            if sink.is_paused() && !sink.empty() {
                sink.play();
                self.clock.resume(Instant::now());
                return Ok(Playing);
            }
        }
        let sink = Sink::try_new(&self.handle)
            .map_err(|e| Blocked::new(format!("audio sink unavailable: {}", e)))?;
        let decoder = Decoder::new(Cursor::new(Arc::clone(&self.bytes)))
            .map_err(|e| Blocked::new(format!("clip could not be decoded: {}", e)))?;

        sink.set_volume(self.volume);
        if self.looping {
            sink.append(decoder.repeat_infinite());
        } else {
            sink.append(decoder);
        }
        // Replacing the previous sink drops it, which silences it.
        self.sink = Some(sink);
        self.clock.reset();
        self.clock.resume(Instant::now());
        Ok(Playing)
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
        self.clock.pause(Instant::now());
    }

    fn rewind(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.clock.reset();
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        if let Some(sink) = &self.sink {
            sink.set_volume(volume);
        }
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn position(&self) -> Duration {
        self.clock.elapsed(Instant::now())
    }

    fn is_active(&self) -> bool {
        self.sink
            .as_ref()
            .is_some_and(|sink| !sink.is_paused() && !sink.empty())
    }

    fn release(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.bytes = Arc::from(Vec::new());
        self.clock.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_clip(millis: u32) -> SoundSource {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
            let samples = spec.sample_rate * millis / 1000;
            for n in 0..samples {
                let t = n as f32 / spec.sample_rate as f32;
                let sample = (t * 440.0 * std::f32::consts::TAU).sin() * 0.2;
                writer
                    .write_sample((sample * i16::MAX as f32) as i16)
                    .expect("write sample");
            }
            writer.finalize().expect("finalize wav");
        }
        SoundSource::bytes("tone", cursor.into_inner())
    }

    fn try_backend() -> Option<RodioBackend> {
        match RodioBackend::new() {
            Ok(backend) => Some(backend),
            Err(err) => {
                eprintln!("Skipping rodio backend test (audio backend unavailable): {}", err);
                None
            }
        }
    }

    #[test]
    fn test_play_clock_banks_paused_time() {
        let t0 = Instant::now();
        let mut clock = PlayClock::default();
        clock.resume(t0);
        clock.pause(t0 + Duration::from_millis(300));
        assert_eq!(clock.elapsed(t0 + Duration::from_secs(5)), Duration::from_millis(300));

        clock.resume(t0 + Duration::from_secs(1));
        assert_eq!(
            clock.elapsed(t0 + Duration::from_millis(1200)),
            Duration::from_millis(500)
        );

        clock.reset();
        assert_eq!(clock.elapsed(t0 + Duration::from_secs(9)), Duration::ZERO);
    }

    #[test]
    fn test_undecodable_clip_rejected() {
        let Some(mut backend) = try_backend() else {
            return;
        };
        let garbage = SoundSource::bytes("garbage", vec![0x42u8; 128]);
        assert!(matches!(
            backend.open("click", &garbage),
            Err(SoundError::DecodeError(_))
        ));
    }

    #[test]
    fn test_voice_start_pause_rewind() {
        let Some(mut backend) = try_backend() else {
            return;
        };
        let mut voice = backend.open("click", &wav_clip(500)).expect("open wav");
        voice.set_volume(0.0);

        assert_eq!(voice.start(), Ok(Playing));
        assert!(voice.is_active());

        voice.pause();
        assert!(!voice.is_active());

        voice.rewind();
        assert_eq!(voice.position(), Duration::ZERO);
        assert!(!voice.is_active());
    }

    #[test]
    fn test_start_after_pause_resumes_sink() {
        let Some(mut backend) = try_backend() else {
            return;
        };
        let mut voice = backend.open("ambient", &wav_clip(2000)).expect("open wav");
        voice.set_volume(0.0);
        voice.set_looping(true);

        assert_eq!(voice.start(), Ok(Playing));
        voice.pause();
        let paused_at = voice.position();
        assert_eq!(voice.start(), Ok(Playing));
        assert!(voice.is_active());
        assert!(voice.position() >= paused_at);
    }

    #[test]
    fn test_released_voice_refuses_start() {
        let Some(mut backend) = try_backend() else {
            return;
        };
        let mut voice = backend.open("hover", &wav_clip(100)).expect("open wav");
        voice.release();
        assert!(voice.start().is_err());
    }
}
