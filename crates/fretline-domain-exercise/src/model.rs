use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NoteId(pub u64);

/// A note that is live in the practice window.
///
/// `entry_beat` is the beat at which the note's target event happens. It is
/// fixed at construction; the fields are read-only from outside the crate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
    id: NoteId,
    label: String,
    string_index: Option<u8>,
    fret: Option<u8>,
    entry_beat: f64,
}

impl Note {
    pub fn new(
        id: NoteId,
        label: impl Into<String>,
        string_index: Option<u8>,
        fret: Option<u8>,
        entry_beat: f64,
    ) -> Self {
        Self {
            id,
            label: label.into(),
            string_index,
            fret,
            entry_beat,
        }
    }

    pub fn id(&self) -> NoteId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn string_index(&self) -> Option<u8> {
        self.string_index
    }

    pub fn fret(&self) -> Option<u8> {
        self.fret
    }

    pub fn entry_beat(&self) -> f64 {
        self.entry_beat
    }
}

/// Authored note inside an exercise, timing in beats from the start of the piece.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExerciseNote {
    pub label: String,
    /// 0 = high E ... 5 = low E, `None` when the note is not tied to a string.
    pub string_index: Option<u8>,
    pub fret: Option<u8>,
    pub entry_beat: f64,
    /// Sustain length; carried for hosts, the engine ignores it.
    #[serde(default)]
    pub duration_beats: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExerciseDefinition {
    pub id: String,
    pub name: String,
    /// Beats spanned by the piece, lead-in excluded.
    pub total_beats: f64,
    #[serde(default)]
    pub lead_in_beats: Option<f64>,
    pub notes: Vec<ExerciseNote>,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ExerciseError {
    #[error("total beats must be positive and finite, got {0}")]
    InvalidTotalBeats(f64),
    #[error("lead-in must be non-negative and finite, got {0}")]
    InvalidLeadIn(f64),
    #[error("note {index} has invalid entry beat {beat}")]
    InvalidEntryBeat { index: usize, beat: f64 },
    #[error("note {index} starts before the note preceding it")]
    OutOfOrder { index: usize },
}

impl ExerciseDefinition {
    pub fn lead_in(&self) -> f64 {
        self.lead_in_beats.unwrap_or(0.0)
    }

    pub fn validate(&self) -> Result<(), ExerciseError> {
        if !self.total_beats.is_finite() || self.total_beats <= 0.0 {
            return Err(ExerciseError::InvalidTotalBeats(self.total_beats));
        }
        let lead_in = self.lead_in();
        if !lead_in.is_finite() || lead_in < 0.0 {
            return Err(ExerciseError::InvalidLeadIn(lead_in));
        }

        let mut previous = f64::NEG_INFINITY;
        for (index, note) in self.notes.iter().enumerate() {
            if !note.entry_beat.is_finite() || note.entry_beat < 0.0 {
                return Err(ExerciseError::InvalidEntryBeat {
                    index,
                    beat: note.entry_beat,
                });
            }
            if note.entry_beat < previous {
                return Err(ExerciseError::OutOfOrder { index });
            }
            previous = note.entry_beat;
        }
        Ok(())
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}
