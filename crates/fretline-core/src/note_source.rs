use fretline_domain_exercise::{
    lane_count, midi_to_label, pitch_for, ExerciseDefinition, ExerciseError, Note, NoteId,
    MAX_FRET,
};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// How far around the current beat notes are kept live.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowBeats {
    pub lookahead: f64,
    pub trail: f64,
}

/// Receives window changes as they happen inside `ensure_window`.
pub trait NoteSink {
    fn note_entered(&mut self, note: &Note);

    fn note_pruned(&mut self, _note: &Note) {}
}

/// A pre-authored piece. Entry beats are shifted by the lead-in.
#[derive(Clone, Debug)]
pub struct FixedExercise {
    notes: Vec<Note>,
    total_beats: f64,
    lead_in_beats: f64,
    exposed: bool,
}

impl FixedExercise {
    pub fn new(definition: &ExerciseDefinition) -> Result<Self, ExerciseError> {
        definition.validate()?;
        let lead_in_beats = definition.lead_in();
        let notes = definition
            .notes
            .iter()
            .enumerate()
            .map(|(index, note)| {
                Note::new(
                    NoteId(index as u64),
                    note.label.clone(),
                    note.string_index,
                    note.fret,
                    lead_in_beats + note.entry_beat,
                )
            })
            .collect();

        Ok(Self {
            notes,
            total_beats: definition.total_beats,
            lead_in_beats,
            exposed: false,
        })
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn total_beats(&self) -> f64 {
        self.total_beats
    }

    pub fn lead_in_beats(&self) -> f64 {
        self.lead_in_beats
    }
}

/// Endless random notes, one per beat.
pub struct ProceduralStream {
    rng: Box<dyn RngCore + Send>,
    first_entry_beat: f64,
    next_entry_beat: f64,
    max_fret: u8,
    next_id: u64,
}

impl ProceduralStream {
    pub fn new(first_entry_beat: f64, max_fret: u8, rng: Box<dyn RngCore + Send>) -> Self {
        Self {
            rng,
            first_entry_beat,
            next_entry_beat: first_entry_beat,
            max_fret: max_fret.min(MAX_FRET),
            next_id: 0,
        }
    }

    pub fn seeded(first_entry_beat: f64, max_fret: u8, seed: u64) -> Self {
        Self::new(
            first_entry_beat,
            max_fret,
            Box::new(StdRng::seed_from_u64(seed)),
        )
    }

    pub fn from_entropy(first_entry_beat: f64, max_fret: u8) -> Self {
        Self::new(first_entry_beat, max_fret, Box::new(StdRng::from_entropy()))
    }

    pub fn next_entry_beat(&self) -> f64 {
        self.next_entry_beat
    }

    fn rewind(&mut self) {
        self.next_entry_beat = self.first_entry_beat;
    }

    // ids keep counting across rewinds so a restarted run never reuses one
    fn next_note(&mut self) -> Note {
        let string_index = self.rng.gen_range(0..lane_count()) as u8;
        let fret = self.rng.gen_range(0..=self.max_fret);
        let label = pitch_for(string_index, fret)
            .map(midi_to_label)
            .unwrap_or_default();

        let note = Note::new(
            NoteId(self.next_id),
            label,
            Some(string_index),
            Some(fret),
            self.next_entry_beat,
        );
        self.next_id += 1;
        self.next_entry_beat += 1.0;
        note
    }
}

#[derive(Clone, Copy, Debug)]
pub struct StaticLayout<'a> {
    pub notes: &'a [Note],
    /// Authored length, lead-in excluded.
    pub total_beats: f64,
    pub lead_in_beats: f64,
}

pub enum NoteSourceKind {
    Fixed(FixedExercise),
    Procedural(ProceduralStream),
}

/// Produces the notes for a session and owns the live set.
pub struct NoteSource {
    kind: NoteSourceKind,
    live: Vec<Note>,
}

impl NoteSource {
    pub fn fixed(exercise: FixedExercise) -> Self {
        Self {
            kind: NoteSourceKind::Fixed(exercise),
            live: Vec::new(),
        }
    }

    pub fn procedural(stream: ProceduralStream) -> Self {
        Self {
            kind: NoteSourceKind::Procedural(stream),
            live: Vec::new(),
        }
    }

    pub fn kind(&self) -> &NoteSourceKind {
        &self.kind
    }

    pub fn live_notes(&self) -> &[Note] {
        &self.live
    }

    pub fn clear(&mut self) {
        self.live.clear();
    }

    /// Rewinds the generation cursor; the next `ensure_window` starts over.
    pub fn reset(&mut self) {
        match &mut self.kind {
            NoteSourceKind::Fixed(exercise) => exercise.exposed = false,
            NoteSourceKind::Procedural(stream) => stream.rewind(),
        }
    }

    /// Notes shown while stopped, with the piece length and lead-in the
    /// static layout is scaled by. Procedural sources have nothing to show
    /// before they run.
    pub fn static_layout(&self) -> StaticLayout<'_> {
        match &self.kind {
            NoteSourceKind::Fixed(exercise) => StaticLayout {
                notes: exercise.notes(),
                total_beats: exercise.total_beats(),
                lead_in_beats: exercise.lead_in_beats(),
            },
            NoteSourceKind::Procedural(_) => StaticLayout {
                notes: &[],
                total_beats: 0.0,
                lead_in_beats: 0.0,
            },
        }
    }

    /// Materializes notes up to `current_beat + lookahead`, then drops notes
    /// older than `current_beat - trail`. Every new note reaches `sink`
    /// before this returns. Returns whether the live set changed.
    pub fn ensure_window(
        &mut self,
        current_beat: f64,
        window: WindowBeats,
        sink: &mut dyn NoteSink,
    ) -> bool {
        let Self { kind, live } = self;
        let mut changed = false;

        match kind {
            NoteSourceKind::Fixed(exercise) => {
                if !exercise.exposed {
                    exercise.exposed = true;
                    for note in &exercise.notes {
                        live.push(note.clone());
                        sink.note_entered(note);
                        changed = true;
                    }
                }
            }
            NoteSourceKind::Procedural(stream) => {
                while stream.next_entry_beat < current_beat + window.lookahead {
                    let note = stream.next_note();
                    tracing::trace!(id = %note.id(), beat = note.entry_beat(), label = note.label(), "note entered");
                    sink.note_entered(&note);
                    live.push(note);
                    changed = true;
                }
            }
        }

        let min_beat = current_beat - window.trail;
        let before = live.len();
        live.retain(|note| {
            if note.entry_beat() < min_beat {
                sink.note_pruned(note);
                false
            } else {
                true
            }
        });

        changed || live.len() != before
    }
}
