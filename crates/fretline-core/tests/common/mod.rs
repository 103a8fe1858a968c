#![allow(dead_code)]

use fretline_core::{NoteSource, SessionConfig, TransportController};
use fretline_domain_exercise::ExerciseDefinition;
use fretline_ports::audio::{AudioError, AudioOutputPort, AudioRenderCallback, AudioStreamHandle};
use fretline_ports::sound::{Sound, SoundPort, SoundTrigger};
use fretline_ports::types::{AudioConfig, DeviceId, SampleTime};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

pub const SAMPLE_RATE: u32 = 48_000;
/// At 120 BPM and 48 kHz.
pub const SAMPLES_PER_BEAT: usize = 24_000;
pub const BLOCK: usize = 480;

pub fn approx(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

pub fn test_config() -> SessionConfig {
    SessionConfig {
        initial_tempo_bpm: 120.0,
        sample_rate_hz: SAMPLE_RATE,
        seed: Some(7),
        ..SessionConfig::default()
    }
}

type CallbackSlot = Arc<Mutex<Option<Box<dyn AudioRenderCallback>>>>;

/// Output that keeps the render callback and lets the test pull audio by hand.
#[derive(Clone, Default)]
pub struct ManualOutput {
    slot: CallbackSlot,
    stream_sample: Arc<Mutex<SampleTime>>,
}

impl ManualOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Renders `frames` frames in blocks of `BLOCK`. Returns false when no
    /// stream is open.
    pub fn pump(&self, frames: usize) -> bool {
        let mut slot = self.slot.lock();
        let Some(cb) = slot.as_mut() else {
            return false;
        };
        let mut left = vec![0.0f32; BLOCK];
        let mut right = vec![0.0f32; BLOCK];
        let mut remaining = frames;
        let mut stream_sample = self.stream_sample.lock();
        while remaining > 0 {
            let n = remaining.min(BLOCK);
            cb.render(*stream_sample, &mut left[..n], &mut right[..n]);
            *stream_sample += n as u64;
            remaining -= n;
        }
        true
    }

    pub fn pump_beats(&self, beats: f64) -> bool {
        self.pump((beats * SAMPLES_PER_BEAT as f64).round() as usize)
    }
}

struct ManualStream {
    slot: CallbackSlot,
}

impl AudioStreamHandle for ManualStream {
    fn close(self: Box<Self>) {
        self.slot.lock().take();
    }
}

impl AudioOutputPort for ManualOutput {
    fn open_output(
        &self,
        _device_id: Option<&DeviceId>,
        _config: AudioConfig,
        cb: Box<dyn AudioRenderCallback>,
    ) -> Result<Box<dyn AudioStreamHandle>, AudioError> {
        *self.slot.lock() = Some(cb);
        Ok(Box::new(ManualStream {
            slot: self.slot.clone(),
        }))
    }
}

/// Output whose device never comes up.
#[derive(Clone, Default)]
pub struct FailingOutput {
    pub attempts: Arc<AtomicU32>,
}

impl AudioOutputPort for FailingOutput {
    fn open_output(
        &self,
        _device_id: Option<&DeviceId>,
        _config: AudioConfig,
        _cb: Box<dyn AudioRenderCallback>,
    ) -> Result<Box<dyn AudioStreamHandle>, AudioError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AudioError::DeviceUnavailable("no device in test".to_string()))
    }
}

/// Instrument that only remembers what it was asked to play.
#[derive(Default)]
pub struct RecordingSound {
    pub triggers: Mutex<Vec<(SoundTrigger, SampleTime)>>,
    pub sample_rate_hz: AtomicU32,
}

impl RecordingSound {
    pub fn notes(&self) -> Vec<(String, SampleTime)> {
        self.triggers
            .lock()
            .iter()
            .filter_map(|(trigger, at)| match &trigger.sound {
                Sound::Note { label } => Some((label.clone(), *at)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, sound: &Sound) -> usize {
        self.triggers
            .lock()
            .iter()
            .filter(|(trigger, _)| &trigger.sound == sound)
            .count()
    }
}

impl SoundPort for RecordingSound {
    fn set_sample_rate(&self, sample_rate_hz: u32) {
        self.sample_rate_hz.store(sample_rate_hz, Ordering::SeqCst);
    }

    fn trigger(&self, trigger: &SoundTrigger, at: SampleTime) {
        self.triggers.lock().push((trigger.clone(), at));
    }

    fn render(&self, _frames: usize, _out_l: &mut [f32], _out_r: &mut [f32]) {}
}

pub struct Rig {
    pub controller: TransportController,
    pub output: ManualOutput,
    pub sound: Arc<RecordingSound>,
}

pub fn rig(config: SessionConfig, source: NoteSource) -> Rig {
    let output = ManualOutput::new();
    let sound = Arc::new(RecordingSound::default());
    let controller =
        TransportController::new(config, source, Box::new(output.clone()), sound.clone())
            .expect("valid config");
    Rig {
        controller,
        output,
        sound,
    }
}

pub fn fixed_source(definition: &ExerciseDefinition) -> NoteSource {
    NoteSource::fixed(fretline_core::FixedExercise::new(definition).expect("valid exercise"))
}
