use crate::note_source::{ProceduralStream, WindowBeats};
use fretline_domain_exercise::MAX_FRET;
use fretline_domain_view::ProjectionConfig;
use fretline_ports::types::{AudioConfig, DeviceId};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub initial_tempo_bpm: f64,
    /// Scheduler ticks per quarter note.
    pub ppq: u32,
    pub sample_rate_hz: u32,
    pub buffer_size_frames: Option<u32>,
    pub output_device: Option<String>,
    /// Where the hit line sits, as a percentage of the track width.
    pub hit_line_percent: f64,
    pub view_lead_in_beats: f64,
    pub view_tail_beats: f64,
    pub activation_threshold_beats: f64,
    pub audio_fine_tune_beats: f64,
    pub lookahead_margin_beats: f64,
    pub trail_margin_beats: f64,
    pub max_fret: u8,
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_tempo_bpm: 90.0,
            ppq: 192,
            sample_rate_hz: 48_000,
            buffer_size_frames: None,
            output_device: None,
            hit_line_percent: 12.0,
            view_lead_in_beats: 6.0,
            view_tail_beats: 1.0,
            activation_threshold_beats: 0.1,
            audio_fine_tune_beats: 0.02,
            lookahead_margin_beats: 4.0,
            trail_margin_beats: 4.0,
            max_fret: 5,
            seed: None,
        }
    }
}

impl SessionConfig {
    pub fn from_json_str(data: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(data).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_path(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_json_str(&data)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ppq == 0 {
            return Err(ConfigError::Invalid("ppq must be positive".to_string()));
        }
        if self.sample_rate_hz == 0 {
            return Err(ConfigError::Invalid(
                "sample_rate_hz must be positive".to_string(),
            ));
        }
        if !self.initial_tempo_bpm.is_finite() {
            return Err(ConfigError::Invalid(
                "initial_tempo_bpm must be finite".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.hit_line_percent) {
            return Err(ConfigError::Invalid(format!(
                "hit_line_percent {} outside 0..=100",
                self.hit_line_percent
            )));
        }
        if !self.view_lead_in_beats.is_finite() || self.view_lead_in_beats <= 0.0 {
            return Err(ConfigError::Invalid(
                "view_lead_in_beats must be positive".to_string(),
            ));
        }
        if self.max_fret > MAX_FRET {
            return Err(ConfigError::Invalid(format!(
                "max_fret {} above {MAX_FRET}",
                self.max_fret
            )));
        }
        let non_negative = [
            ("view_tail_beats", self.view_tail_beats),
            ("activation_threshold_beats", self.activation_threshold_beats),
            ("audio_fine_tune_beats", self.audio_fine_tune_beats),
            ("lookahead_margin_beats", self.lookahead_margin_beats),
            ("trail_margin_beats", self.trail_margin_beats),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a non-negative number"
                )));
            }
        }

        // a note must outlive its audio trigger
        let window = self.window();
        let required = self.view_tail_beats + self.activation_threshold_beats;
        if window.trail < required {
            return Err(ConfigError::Invalid(format!(
                "trail window {} narrower than tail + activation radius {required}",
                window.trail
            )));
        }
        Ok(())
    }

    pub fn window(&self) -> WindowBeats {
        WindowBeats {
            lookahead: self.view_lead_in_beats + self.lookahead_margin_beats,
            trail: self.view_tail_beats + self.trail_margin_beats,
        }
    }

    pub fn projection(&self) -> ProjectionConfig {
        ProjectionConfig {
            view_lead_in_beats: self.view_lead_in_beats,
            activation_threshold_beats: self.activation_threshold_beats,
            fine_tune_beats: self.audio_fine_tune_beats,
        }
    }

    pub fn first_procedural_entry_beat(&self) -> f64 {
        (self.view_lead_in_beats - 2.0).max(2.0)
    }

    pub fn procedural_stream(&self) -> ProceduralStream {
        let first = self.first_procedural_entry_beat();
        match self.seed {
            Some(seed) => ProceduralStream::seeded(first, self.max_fret, seed),
            None => ProceduralStream::from_entropy(first, self.max_fret),
        }
    }

    pub fn audio_config(&self) -> AudioConfig {
        AudioConfig {
            sample_rate_hz: self.sample_rate_hz,
            channels: 2,
            buffer_size_frames: self.buffer_size_frames,
        }
    }

    pub fn output_device_id(&self) -> Option<DeviceId> {
        self.output_device.clone().map(DeviceId)
    }
}
