use crate::beat_clock::BeatClock;
use crate::scheduler::SharedScheduler;
use fretline_domain_exercise::{Note, NoteId};
use fretline_ports::sound::SoundTrigger;
use fretline_ports::types::ScheduleHandle;
use std::collections::HashMap;

/// Sole owner of every scheduler handle a session registers: one per live
/// note plus the metronome pattern.
pub struct ScheduleBridge {
    scheduler: SharedScheduler,
    fine_tune_beats: f64,
    note_handles: HashMap<NoteId, ScheduleHandle>,
    pattern: Option<ScheduleHandle>,
}

impl ScheduleBridge {
    pub fn new(scheduler: SharedScheduler, fine_tune_beats: f64) -> Self {
        Self {
            scheduler,
            fine_tune_beats,
            note_handles: HashMap::new(),
            pattern: None,
        }
    }

    pub fn fine_tune_beats(&self) -> f64 {
        self.fine_tune_beats
    }

    pub fn trigger_beat(&self, note: &Note, hit_line_offset_beats: f64) -> f64 {
        (note.entry_beat() - hit_line_offset_beats - self.fine_tune_beats).max(0.0)
    }

    /// Registers the audio trigger for `note`. A note that already has one
    /// is left alone and `None` is returned.
    pub fn schedule_note(
        &mut self,
        note: &Note,
        clock: &BeatClock,
        hit_line_offset_beats: f64,
    ) -> Option<ScheduleHandle> {
        if self.note_handles.contains_key(&note.id()) {
            tracing::warn!(id = %note.id(), "note already scheduled");
            return None;
        }

        let trigger_beat = self.trigger_beat(note, hit_line_offset_beats);
        let at = clock.beats_to_sample_time(trigger_beat);
        let handle = self
            .scheduler
            .lock()
            .schedule_once(at, SoundTrigger::note(note.label()));
        tracing::trace!(id = %note.id(), %handle, trigger_beat, at, "note scheduled");

        self.note_handles.insert(note.id(), handle);
        Some(handle)
    }

    /// Starts the kick/snare pattern, one hit per beat from beat 0.
    pub fn start_pattern(&mut self) {
        self.clear_pattern();
        let mut scheduler = self.scheduler.lock();
        let interval = scheduler.ppq() as f64;
        let handle = scheduler.schedule_repeat(
            interval,
            0.0,
            vec![SoundTrigger::kick(), SoundTrigger::snare()],
        );
        self.pattern = Some(handle);
    }

    pub fn clear_pattern(&mut self) {
        if let Some(handle) = self.pattern.take() {
            self.scheduler.lock().clear(handle);
        }
    }

    /// Forgets the handle of a note that left the window. Its trigger has
    /// already fired or been skipped, so nothing is cancelled.
    pub fn release(&mut self, id: NoteId) {
        self.note_handles.remove(&id);
    }

    /// Cancels every outstanding handle. Returns how many were held.
    pub fn cancel_all(&mut self) -> usize {
        let mut scheduler = self.scheduler.lock();
        let mut count = 0;
        for (_, handle) in self.note_handles.drain() {
            scheduler.clear(handle);
            count += 1;
        }
        if let Some(handle) = self.pattern.take() {
            scheduler.clear(handle);
            count += 1;
        }
        count
    }

    pub fn handle_for(&self, id: NoteId) -> Option<ScheduleHandle> {
        self.note_handles.get(&id).copied()
    }

    pub fn has_pattern(&self) -> bool {
        self.pattern.is_some()
    }

    pub fn registration_count(&self) -> usize {
        self.note_handles.len() + usize::from(self.pattern.is_some())
    }
}
