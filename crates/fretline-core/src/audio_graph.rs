use crate::scheduler::{DueTrigger, SharedScheduler};
use fretline_ports::audio::AudioRenderCallback;
use fretline_ports::sound::SoundPort;
use fretline_ports::types::SampleTime;
use std::sync::Arc;

/// Render callback handed to the audio output: advances the session's
/// scheduler once per block and forwards every due trigger to the sound
/// collaborator at its exact frame.
pub struct PracticeGraph {
    scheduler: SharedScheduler,
    sound: Arc<dyn SoundPort>,
    due: Vec<DueTrigger>,
}

impl PracticeGraph {
    pub fn new(scheduler: SharedScheduler, sound: Arc<dyn SoundPort>) -> Self {
        Self {
            scheduler,
            sound,
            due: Vec::with_capacity(64),
        }
    }
}

impl AudioRenderCallback for PracticeGraph {
    fn render(&mut self, sample_time_start: SampleTime, out_l: &mut [f32], out_r: &mut [f32]) {
        let frames = out_l.len().min(out_r.len());
        out_l.fill(0.0);
        out_r.fill(0.0);

        self.due.clear();
        self.scheduler.lock().advance(frames, &mut self.due);

        let mut cursor = 0usize;
        for due in &self.due {
            let at = due.offset.min(frames);
            if at > cursor {
                self.sound
                    .render(at - cursor, &mut out_l[cursor..at], &mut out_r[cursor..at]);
                cursor = at;
            }
            self.sound
                .trigger(&due.trigger, sample_time_start.saturating_add(at as u64));
        }

        if cursor < frames {
            self.sound.render(
                frames - cursor,
                &mut out_l[cursor..frames],
                &mut out_r[cursor..frames],
            );
        }
    }
}
