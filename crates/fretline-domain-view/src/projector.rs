use fretline_domain_exercise::{Note, NoteId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectionConfig {
    /// Beats between the hit line and the far edge of the track (position 1.0).
    pub view_lead_in_beats: f64,
    pub activation_threshold_beats: f64,
    /// Perceptual latency correction, shared with audio scheduling.
    pub fine_tune_beats: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ViewMode {
    Running {
        current_beat: f64,
        hit_line_offset_beats: f64,
    },
    /// Layout shown before a session starts; nothing moves, nothing is active.
    /// `total_beats` excludes the lead-in; entry beats are shifted back by
    /// `lead_in_beats` to their authored position.
    Stopped { total_beats: f64, lead_in_beats: f64 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreviewRecord {
    pub id: NoteId,
    pub label: String,
    pub string_index: Option<u8>,
    pub fret: Option<u8>,
    /// 0 = on the hit line, negative = past it. Not clamped.
    pub position: f64,
    pub is_active: bool,
    pub distance_to_hit: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviewFrame {
    pub records: Vec<PreviewRecord>,
    pub has_active_note: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct WindowProjector {
    cfg: ProjectionConfig,
}

impl WindowProjector {
    pub fn new(cfg: ProjectionConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> ProjectionConfig {
        self.cfg
    }

    /// Beat at which the note's leading edge reaches the hit line.
    pub fn target_edge_beat(&self, note: &Note, hit_line_offset_beats: f64) -> f64 {
        note.entry_beat() - hit_line_offset_beats - self.cfg.fine_tune_beats
    }

    pub fn is_active(&self, distance_to_hit: f64) -> bool {
        distance_to_hit.abs() <= self.cfg.activation_threshold_beats
    }

    pub fn project(&self, notes: &[Note], mode: ViewMode) -> PreviewFrame {
        match mode {
            ViewMode::Running {
                current_beat,
                hit_line_offset_beats,
            } => self.project_running(notes, current_beat, hit_line_offset_beats),
            ViewMode::Stopped {
                total_beats,
                lead_in_beats,
            } => project_static(notes, total_beats, lead_in_beats),
        }
    }

    fn project_running(
        &self,
        notes: &[Note],
        current_beat: f64,
        hit_line_offset_beats: f64,
    ) -> PreviewFrame {
        let lead_in = self.cfg.view_lead_in_beats;
        let mut has_active_note = false;

        let records = notes
            .iter()
            .map(|note| {
                let distance_to_hit =
                    self.target_edge_beat(note, hit_line_offset_beats) - current_beat;
                let is_active = self.is_active(distance_to_hit);
                has_active_note |= is_active;

                let position = if lead_in > 0.0 {
                    distance_to_hit / lead_in
                } else {
                    0.0
                };

                record(note, position, is_active, distance_to_hit)
            })
            .collect();

        PreviewFrame {
            records,
            has_active_note,
        }
    }
}

fn project_static(notes: &[Note], total_beats: f64, lead_in_beats: f64) -> PreviewFrame {
    let records = notes
        .iter()
        .map(|note| {
            let authored_beat = note.entry_beat() - lead_in_beats;
            let position = if total_beats.is_finite() && total_beats > 0.0 {
                (authored_beat / total_beats).clamp(0.0, 1.0)
            } else {
                0.0
            };
            record(note, position, false, authored_beat)
        })
        .collect();

    PreviewFrame {
        records,
        has_active_note: false,
    }
}

fn record(note: &Note, position: f64, is_active: bool, distance_to_hit: f64) -> PreviewRecord {
    PreviewRecord {
        id: note.id(),
        label: note.label().to_string(),
        string_index: note.string_index(),
        fret: note.fret(),
        position,
        is_active,
        distance_to_hit,
    }
}
