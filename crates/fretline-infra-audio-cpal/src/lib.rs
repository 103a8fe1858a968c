use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    BufferSize, FromSample, SampleFormat, SampleRate, SizedSample, StreamConfig,
    SupportedStreamConfigRange,
};
use fretline_ports::audio::{AudioError, AudioOutputPort, AudioRenderCallback, AudioStreamHandle};
use fretline_ports::types::{AudioConfig, DeviceId, SampleTime};
use std::sync::mpsc;
use std::thread;

/// Output on the default cpal host. Each stream lives on its own thread so
/// the non-`Send` cpal stream never leaves it.
pub struct CpalAudioOutputPort;

impl CpalAudioOutputPort {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CpalAudioOutputPort {
    fn default() -> Self {
        Self::new()
    }
}

pub struct CpalAudioStreamHandle {
    stop_tx: mpsc::Sender<()>,
    join_handle: Option<thread::JoinHandle<()>>,
}

impl AudioStreamHandle for CpalAudioStreamHandle {
    fn close(mut self: Box<Self>) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}

impl AudioOutputPort for CpalAudioOutputPort {
    fn open_output(
        &self,
        device_id: Option<&DeviceId>,
        config: AudioConfig,
        cb: Box<dyn AudioRenderCallback>,
    ) -> Result<Box<dyn AudioStreamHandle>, AudioError> {
        let device_id = device_id.cloned();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let join_handle = thread::Builder::new()
            .name("fretline-audio".to_string())
            .spawn(move || {
                let stream = match open_stream(device_id.as_ref(), config, cb) {
                    Ok(stream) => stream,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                let _ = stop_rx.recv();
                drop(stream);
                tracing::debug!("audio stream closed");
            })
            .map_err(|e| AudioError::Backend(e.to_string()))?;

        ready_rx
            .recv()
            .map_err(|e| AudioError::Backend(e.to_string()))??;

        Ok(Box::new(CpalAudioStreamHandle {
            stop_tx,
            join_handle: Some(join_handle),
        }))
    }
}

fn find_device(host: &cpal::Host, device_id: Option<&DeviceId>) -> Result<cpal::Device, AudioError> {
    let Some(wanted) = device_id else {
        return host
            .default_output_device()
            .ok_or_else(|| AudioError::DeviceUnavailable("no default output device".to_string()));
    };

    let devices = host
        .output_devices()
        .map_err(|e| AudioError::Backend(e.to_string()))?;
    for device in devices {
        if device.name().map(|name| name == wanted.0).unwrap_or(false) {
            return Ok(device);
        }
    }
    Err(AudioError::DeviceNotFound(wanted.to_string()))
}

fn open_stream(
    device_id: Option<&DeviceId>,
    desired: AudioConfig,
    cb: Box<dyn AudioRenderCallback>,
) -> Result<cpal::Stream, AudioError> {
    let host = cpal::default_host();
    let device = find_device(&host, device_id)?;

    let mut supported = device
        .supported_output_configs()
        .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;
    let chosen = select_supported_config(&mut supported, desired)?;
    let sample_format = chosen.sample_format();
    let mut config = chosen.config();
    config.buffer_size = match desired.buffer_size_frames {
        Some(frames) => BufferSize::Fixed(frames),
        None => BufferSize::Default,
    };

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, cb),
        SampleFormat::I16 => build_stream::<i16>(&device, &config, cb),
        SampleFormat::U16 => build_stream::<u16>(&device, &config, cb),
        other => {
            return Err(AudioError::UnsupportedConfig(format!(
                "sample format {other:?}"
            )))
        }
    }?;

    stream
        .play()
        .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;
    tracing::info!(
        device = device.name().unwrap_or_default(),
        sample_rate_hz = config.sample_rate.0,
        channels = config.channels,
        ?sample_format,
        "audio stream playing"
    );
    Ok(stream)
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut cb: Box<dyn AudioRenderCallback>,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let initial_frames = match config.buffer_size {
        BufferSize::Fixed(frames) => frames as usize,
        BufferSize::Default => 8192,
    };
    let mut left = vec![0.0f32; initial_frames];
    let mut right = vec![0.0f32; initial_frames];
    let mut sample_time: SampleTime = 0;

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _info: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels.max(1);
                if frames > left.len() {
                    left.resize(frames, 0.0);
                    right.resize(frames, 0.0);
                }
                cb.render(sample_time, &mut left[..frames], &mut right[..frames]);
                write_interleaved(data, channels, &left[..frames], &right[..frames]);
                sample_time = sample_time.saturating_add(frames as u64);
            },
            |err| tracing::warn!(error = %err, "audio stream error"),
            None,
        )
        .map_err(|e| AudioError::Backend(e.to_string()))
}

fn select_supported_config(
    supported: &mut dyn Iterator<Item = SupportedStreamConfigRange>,
    desired: AudioConfig,
) -> Result<cpal::SupportedStreamConfig, AudioError> {
    let mut best: Option<(u8, cpal::SupportedStreamConfig)> = None;

    for range in supported {
        if range.channels() != desired.channels {
            continue;
        }
        let rate = desired.sample_rate_hz;
        if rate < range.min_sample_rate().0 || rate > range.max_sample_rate().0 {
            continue;
        }

        let score = match range.sample_format() {
            SampleFormat::F32 => 3,
            SampleFormat::I16 => 2,
            SampleFormat::U16 => 1,
            _ => continue,
        };
        if best.as_ref().map_or(true, |(best_score, _)| score > *best_score) {
            best = Some((score, range.with_sample_rate(SampleRate(rate))));
        }
    }

    best.map(|(_, config)| config).ok_or_else(|| {
        AudioError::UnsupportedConfig(format!(
            "no {}-channel output at {} Hz",
            desired.channels, desired.sample_rate_hz
        ))
    })
}

/// Writes planar stereo into an interleaved device buffer. Mono devices get
/// the average of both sides; extra channels are silent.
pub fn write_interleaved<T>(data: &mut [T], channels: usize, left: &[f32], right: &[f32])
where
    T: FromSample<f32> + Copy,
{
    if channels == 0 {
        return;
    }
    let silence = T::from_sample_(0.0f32);
    for (frame, out) in data.chunks_exact_mut(channels).enumerate() {
        let l = left.get(frame).copied().unwrap_or(0.0).clamp(-1.0, 1.0);
        let r = right.get(frame).copied().unwrap_or(0.0).clamp(-1.0, 1.0);
        if channels == 1 {
            out[0] = T::from_sample_((l + r) * 0.5);
            continue;
        }
        out[0] = T::from_sample_(l);
        out[1] = T::from_sample_(r);
        for sample in &mut out[2..] {
            *sample = silence;
        }
    }
}
