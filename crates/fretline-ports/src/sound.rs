use crate::types::*;
use serde::{Deserialize, Serialize};

/// What the external instrument should play.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Sound {
    /// Plucked note, label is a scientific pitch name such as "C4".
    Note { label: String },
    Kick,
    Snare,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DurationHint {
    /// Roughly an eighth note.
    Short,
    /// Roughly a sixteenth note.
    VeryShort,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundTrigger {
    pub sound: Sound,
    pub duration: DurationHint,
}

impl SoundTrigger {
    pub fn note(label: impl Into<String>) -> Self {
        Self {
            sound: Sound::Note {
                label: label.into(),
            },
            duration: DurationHint::Short,
        }
    }

    pub fn kick() -> Self {
        Self {
            sound: Sound::Kick,
            duration: DurationHint::Short,
        }
    }

    pub fn snare() -> Self {
        Self {
            sound: Sound::Snare,
            duration: DurationHint::VeryShort,
        }
    }
}

/// Thread model:
/// - trigger/render are called from the audio thread (must be realtime-safe)
/// - set_sample_rate is called once before the stream starts
pub trait SoundPort: Send + Sync {
    fn set_sample_rate(&self, sample_rate_hz: u32);

    /// Start `trigger` at absolute stream sample `at`.
    fn trigger(&self, trigger: &SoundTrigger, at: SampleTime);

    /// Called by audio thread: render frames to out_l/out_r (additive)
    fn render(&self, frames: usize, out_l: &mut [f32], out_r: &mut [f32]);
}
