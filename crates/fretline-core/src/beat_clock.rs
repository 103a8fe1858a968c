use crate::scheduler::SharedScheduler;
use fretline_ports::types::SampleTime;

pub const TEMPO_MIN_BPM: u32 = 40;
pub const TEMPO_MAX_BPM: u32 = 200;
pub const DEFAULT_TEMPO_BPM: u32 = 90;

const SIXTEENTHS_PER_BEAT: f64 = 4.0;
const BEATS_PER_BAR: u64 = 4;

/// Integer BPM in [40, 200]; `None` for input that is not a finite number.
pub fn clamp_tempo(bpm: f64) -> Option<u32> {
    if !bpm.is_finite() {
        return None;
    }
    let rounded = bpm.round().clamp(TEMPO_MIN_BPM as f64, TEMPO_MAX_BPM as f64);
    Some(rounded as u32)
}

/// Snaps to the sixteenth-note grid; negative beats snap to 0.
pub fn quantize_to_sixteenths(beats: f64) -> f64 {
    (beats.max(0.0) * SIXTEENTHS_PER_BEAT).round() / SIXTEENTHS_PER_BEAT
}

/// `bars:quarters:sixteenths` in 4/4, e.g. beat 5.25 -> "1:1:1".
pub fn format_position(beats: f64) -> String {
    let sixteenths = (beats.max(0.0) * SIXTEENTHS_PER_BEAT).round() as u64;
    let per_bar = BEATS_PER_BAR * SIXTEENTHS_PER_BEAT as u64;
    let bars = sixteenths / per_bar;
    let remainder = sixteenths % per_bar;
    let quarters = remainder / SIXTEENTHS_PER_BEAT as u64;
    let sixteenth = remainder % SIXTEENTHS_PER_BEAT as u64;
    format!("{bars}:{quarters}:{sixteenth}")
}

/// Musical time for one session.
///
/// The current beat is read from the scheduler's tick counter. Beat to
/// sample conversion is anchored at an origin that is moved whenever the
/// tempo changes, so beats scheduled after a change line up with the
/// timeline that has already elapsed. Triggers registered before the change
/// keep their sample time.
pub struct BeatClock {
    scheduler: SharedScheduler,
    sample_rate_hz: u32,
    tempo_bpm: u32,
    origin_sample: f64,
}

impl BeatClock {
    pub fn new(scheduler: SharedScheduler, tempo_bpm: f64) -> Self {
        let tempo_bpm = clamp_tempo(tempo_bpm).unwrap_or(DEFAULT_TEMPO_BPM);
        let sample_rate_hz = {
            let mut guard = scheduler.lock();
            guard.set_bpm(tempo_bpm as f64);
            guard.sample_rate_hz()
        };
        Self {
            scheduler,
            sample_rate_hz,
            tempo_bpm,
            origin_sample: 0.0,
        }
    }

    pub fn scheduler(&self) -> &SharedScheduler {
        &self.scheduler
    }

    pub fn tempo_bpm(&self) -> u32 {
        self.tempo_bpm
    }

    pub fn samples_per_beat(&self) -> f64 {
        self.sample_rate_hz as f64 * 60.0 / self.tempo_bpm as f64
    }

    /// Returns true when the stored tempo changed. Non-finite input is ignored.
    pub fn set_tempo(&mut self, bpm: f64) -> bool {
        let Some(next) = clamp_tempo(bpm) else {
            tracing::debug!(bpm, "ignoring non-finite tempo");
            return false;
        };
        if next == self.tempo_bpm {
            return false;
        }

        let mut scheduler = self.scheduler.lock();
        let beat_now = scheduler.ticks() / scheduler.ppq() as f64;
        let sample_now = scheduler.now_sample() as f64;
        scheduler.set_bpm(next as f64);
        drop(scheduler);

        self.tempo_bpm = next;
        self.origin_sample = sample_now - beat_now * self.samples_per_beat();
        tracing::debug!(tempo_bpm = next, "tempo changed");
        true
    }

    /// Run-relative sample time of `beats`, snapped to sixteenths.
    pub fn beats_to_sample_time(&self, beats: f64) -> SampleTime {
        let snapped = quantize_to_sixteenths(beats);
        let sample = self.origin_sample + snapped * self.samples_per_beat();
        sample.max(0.0).round() as SampleTime
    }

    pub fn read_current_beat(&self) -> f64 {
        let scheduler = self.scheduler.lock();
        scheduler.ticks() / scheduler.ppq() as f64
    }

    /// Back to beat 0. Only meaningful while the scheduler is stopped.
    pub fn reset(&mut self) {
        self.scheduler.lock().rewind();
        self.origin_sample = 0.0;
    }
}
