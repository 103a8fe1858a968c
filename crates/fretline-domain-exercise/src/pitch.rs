/// Open-string MIDI pitches, lane 0 = high E down to lane 5 = low E.
pub const STANDARD_TUNING: [u8; 6] = [64, 59, 55, 50, 45, 40];

/// Highest fret on a standard neck.
pub const MAX_FRET: u8 = 24;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

pub fn lane_count() -> usize {
    STANDARD_TUNING.len()
}

/// MIDI pitch for a fretted string, `None` for a lane outside the tuning.
pub fn pitch_for(string_index: u8, fret: u8) -> Option<u8> {
    let base = *STANDARD_TUNING.get(string_index as usize)?;
    base.checked_add(fret)
}

/// Scientific pitch name: 60 -> "C4", 61 -> "C#4".
pub fn midi_to_label(midi: u8) -> String {
    let name = NOTE_NAMES[(midi % 12) as usize];
    let octave = (midi / 12) as i32 - 1;
    format!("{name}{octave}")
}
