use fretline_ports::audio::{AudioError, AudioOutputPort, AudioRenderCallback, AudioStreamHandle};
use fretline_ports::sound::{SoundPort, SoundTrigger};
use fretline_ports::types::{AudioConfig, DeviceId, SampleTime};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Stands in for the instrument: queues every trigger so the frame loop can
/// log it. Renders silence.
#[derive(Default)]
pub struct LoggingSound {
    sample_rate_hz: AtomicU32,
    pending: Mutex<Vec<(SoundTrigger, SampleTime)>>,
}

impl LoggingSound {
    pub fn drain(&self) -> Vec<(SoundTrigger, SampleTime)> {
        std::mem::take(&mut *self.pending.lock())
    }
}

impl SoundPort for LoggingSound {
    fn set_sample_rate(&self, sample_rate_hz: u32) {
        self.sample_rate_hz.store(sample_rate_hz, Ordering::Relaxed);
    }

    fn trigger(&self, trigger: &SoundTrigger, at: SampleTime) {
        self.pending.lock().push((trigger.clone(), at));
    }

    fn render(&self, _frames: usize, _out_l: &mut [f32], _out_r: &mut [f32]) {}
}

const OFFLINE_BLOCK_FRAMES: usize = 256;

/// Pulls the render callback at wall-clock pace without touching a device.
#[derive(Default)]
pub struct OfflineOutput;

struct OfflineStream {
    stop: Arc<AtomicBool>,
    join_handle: Option<thread::JoinHandle<()>>,
}

impl AudioStreamHandle for OfflineStream {
    fn close(mut self: Box<Self>) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}

impl AudioOutputPort for OfflineOutput {
    fn open_output(
        &self,
        _device_id: Option<&DeviceId>,
        config: AudioConfig,
        mut cb: Box<dyn AudioRenderCallback>,
    ) -> Result<Box<dyn AudioStreamHandle>, AudioError> {
        if config.sample_rate_hz == 0 {
            return Err(AudioError::UnsupportedConfig("sample rate 0".to_string()));
        }
        let frames = config
            .buffer_size_frames
            .map(|f| f as usize)
            .unwrap_or(OFFLINE_BLOCK_FRAMES)
            .max(1);
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();

        let join_handle = thread::Builder::new()
            .name("fretline-offline".to_string())
            .spawn(move || {
                let mut left = vec![0.0f32; frames];
                let mut right = vec![0.0f32; frames];
                let started = Instant::now();
                let mut sample_time: SampleTime = 0;

                while !thread_stop.load(Ordering::Relaxed) {
                    cb.render(sample_time, &mut left, &mut right);
                    sample_time += frames as u64;

                    let due = Duration::from_secs_f64(
                        sample_time as f64 / config.sample_rate_hz as f64,
                    );
                    if let Some(wait) = due.checked_sub(started.elapsed()) {
                        thread::sleep(wait);
                    }
                }
            })
            .map_err(|e| AudioError::Backend(e.to_string()))?;

        tracing::info!(frames, "offline output running");
        Ok(Box::new(OfflineStream {
            stop,
            join_handle: Some(join_handle),
        }))
    }
}
