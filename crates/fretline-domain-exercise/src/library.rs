use crate::model::{ExerciseDefinition, ExerciseNote};

fn note(label: &str, string_index: u8, fret: u8, entry_beat: f64) -> ExerciseNote {
    ExerciseNote {
        label: label.to_string(),
        string_index: Some(string_index),
        fret: Some(fret),
        entry_beat,
        duration_beats: None,
    }
}

/// Ascending fifths from the open high E down to the low E string.
pub fn basic_exercise() -> ExerciseDefinition {
    ExerciseDefinition {
        id: "basic-ascending-open-fifths".to_string(),
        name: "Ascending Fifths (Open to Low E)".to_string(),
        total_beats: 8.0,
        lead_in_beats: Some(0.0),
        notes: vec![
            note("E4", 0, 0, 1.0),
            note("C4", 2, 5, 2.75),
            note("G3", 3, 0, 4.0),
            note("A3", 4, 2, 5.5),
            note("E3", 5, 0, 6.75),
        ],
    }
}
