use fretline_ports::sound::SoundTrigger;
use fretline_ports::types::{SampleTime, ScheduleHandle, Tick};
use parking_lot::Mutex;
use std::sync::Arc;

/// Shared between the control thread (registration, clock reads) and the
/// audio thread (advancing time).
pub type SharedScheduler = Arc<Mutex<PracticeScheduler>>;

#[derive(Clone, Debug, PartialEq)]
pub struct DueTrigger {
    /// Frame offset inside the block being rendered.
    pub offset: usize,
    pub handle: ScheduleHandle,
    pub trigger: SoundTrigger,
}

#[derive(Clone, Debug)]
struct OneShot {
    handle: ScheduleHandle,
    at: SampleTime,
    trigger: SoundTrigger,
}

#[derive(Clone, Debug)]
struct Repeat {
    handle: ScheduleHandle,
    origin_tick: Tick,
    interval_ticks: Tick,
    next_tick: Tick,
    pattern: Vec<SoundTrigger>,
    step: usize,
}

/// Transport clock plus callback registry.
///
/// Time is kept twice: a run-relative sample counter for one-shot triggers,
/// and a fractional tick counter (at `ppq` ticks per quarter) that advances at
/// the current tempo. One-shots are pinned to samples, so a tempo change does
/// not move them; repeats are pinned to ticks and follow the tempo.
#[derive(Debug)]
pub struct PracticeScheduler {
    ppq: u32,
    sample_rate_hz: u32,
    bpm: f64,
    running: bool,
    now_sample: SampleTime,
    position_ticks: Tick,
    next_handle: u64,
    one_shots: Vec<OneShot>,
    repeats: Vec<Repeat>,
}

impl PracticeScheduler {
    pub fn new(ppq: u32, sample_rate_hz: u32, bpm: f64) -> Self {
        Self {
            ppq: ppq.max(1),
            sample_rate_hz: sample_rate_hz.max(1),
            bpm,
            running: false,
            now_sample: 0,
            position_ticks: 0.0,
            next_handle: 1,
            one_shots: Vec::new(),
            repeats: Vec::new(),
        }
    }

    pub fn shared(self) -> SharedScheduler {
        Arc::new(Mutex::new(self))
    }

    pub fn ppq(&self) -> u32 {
        self.ppq
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn set_bpm(&mut self, bpm: f64) {
        self.bpm = bpm;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Back to tick 0 / sample 0. Registrations are kept; repeats restart
    /// their cycle from their origin.
    pub fn rewind(&mut self) {
        self.now_sample = 0;
        self.position_ticks = 0.0;
        for repeat in &mut self.repeats {
            repeat.next_tick = repeat.origin_tick;
            repeat.step = 0;
        }
    }

    pub fn ticks(&self) -> Tick {
        self.position_ticks
    }

    pub fn now_sample(&self) -> SampleTime {
        self.now_sample
    }

    pub fn ticks_per_sample(&self) -> f64 {
        self.bpm * self.ppq as f64 / (60.0 * self.sample_rate_hz as f64)
    }

    /// Registers a one-shot at run-relative sample `at`. A time already in
    /// the past is never fired; the handle is returned but nothing is pending.
    pub fn schedule_once(&mut self, at: SampleTime, trigger: SoundTrigger) -> ScheduleHandle {
        let handle = self.allocate_handle();
        if at < self.now_sample {
            tracing::trace!(%handle, at, now = self.now_sample, "one-shot in the past, skipped");
            return handle;
        }
        self.one_shots.push(OneShot {
            handle,
            at,
            trigger,
        });
        handle
    }

    /// Registers a repeating pattern that fires every `interval_ticks`
    /// starting at `origin_tick`, cycling through `pattern`.
    pub fn schedule_repeat(
        &mut self,
        interval_ticks: Tick,
        origin_tick: Tick,
        pattern: Vec<SoundTrigger>,
    ) -> ScheduleHandle {
        let handle = self.allocate_handle();
        if pattern.is_empty() {
            return handle;
        }
        let interval_ticks = interval_ticks.max(1.0);
        let next_tick = if origin_tick >= self.position_ticks {
            origin_tick
        } else {
            let cycles = ((self.position_ticks - origin_tick) / interval_ticks).ceil();
            origin_tick + cycles * interval_ticks
        };
        self.repeats.push(Repeat {
            handle,
            origin_tick,
            interval_ticks,
            next_tick,
            pattern,
            step: 0,
        });
        handle
    }

    /// Returns true when something was actually removed.
    pub fn clear(&mut self, handle: ScheduleHandle) -> bool {
        let before = self.one_shots.len() + self.repeats.len();
        self.one_shots.retain(|shot| shot.handle != handle);
        self.repeats.retain(|repeat| repeat.handle != handle);
        before != self.one_shots.len() + self.repeats.len()
    }

    pub fn pending_count(&self) -> usize {
        self.one_shots.len() + self.repeats.len()
    }

    pub fn is_pending(&self, handle: ScheduleHandle) -> bool {
        self.one_shots.iter().any(|shot| shot.handle == handle)
            || self.repeats.iter().any(|repeat| repeat.handle == handle)
    }

    pub fn pending_time(&self, handle: ScheduleHandle) -> Option<SampleTime> {
        self.one_shots
            .iter()
            .find(|shot| shot.handle == handle)
            .map(|shot| shot.at)
    }

    /// Moves the clock forward by one audio block and collects everything
    /// that falls inside it, ordered by frame offset. Does nothing while
    /// stopped.
    pub fn advance(&mut self, frames: usize, due: &mut Vec<DueTrigger>) {
        if !self.running || frames == 0 {
            return;
        }

        let start_sample = self.now_sample;
        let end_sample = start_sample.saturating_add(frames as u64);
        let first = due.len();

        let mut idx = 0;
        while idx < self.one_shots.len() {
            if self.one_shots[idx].at < end_sample {
                let shot = self.one_shots.swap_remove(idx);
                due.push(DueTrigger {
                    offset: shot.at.saturating_sub(start_sample) as usize,
                    handle: shot.handle,
                    trigger: shot.trigger,
                });
            } else {
                idx += 1;
            }
        }

        let ticks_per_sample = self.ticks_per_sample();
        let start_tick = self.position_ticks;
        let end_tick = start_tick + frames as f64 * ticks_per_sample;
        if ticks_per_sample > 0.0 {
            for repeat in &mut self.repeats {
                while repeat.next_tick < end_tick {
                    let offset = if repeat.next_tick <= start_tick {
                        0
                    } else {
                        ((repeat.next_tick - start_tick) / ticks_per_sample).ceil() as usize
                    };
                    due.push(DueTrigger {
                        offset: offset.min(frames - 1),
                        handle: repeat.handle,
                        trigger: repeat.pattern[repeat.step].clone(),
                    });
                    repeat.step = (repeat.step + 1) % repeat.pattern.len();
                    repeat.next_tick += repeat.interval_ticks;
                }
            }
        }

        due[first..].sort_by_key(|trigger| trigger.offset);
        self.now_sample = end_sample;
        self.position_ticks = end_tick;
    }

    fn allocate_handle(&mut self) -> ScheduleHandle {
        let handle = ScheduleHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }
}
