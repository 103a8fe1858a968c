use crate::audio_graph::PracticeGraph;
use crate::beat_clock::{format_position, BeatClock};
use crate::config::{ConfigError, SessionConfig};
use crate::ipc::{Command, Event, EventSubscriber, SessionState};
use crate::note_source::{NoteSink, NoteSource, WindowBeats};
use crate::schedule_bridge::ScheduleBridge;
use crate::scheduler::{PracticeScheduler, SharedScheduler};
use fretline_domain_exercise::Note;
use fretline_domain_view::{GeometryCalibrator, PreviewFrame, ViewMode, WindowProjector};
use fretline_ports::audio::{AudioError, AudioOutputPort, AudioStreamHandle};
use fretline_ports::sound::SoundPort;
use rtrb::{Producer, RingBuffer};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("audio unavailable: {0}")]
    AudioUnavailable(#[from] AudioError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Routes window changes into the bridge with the calibration in force at
/// the moment the note enters.
struct BridgeSink<'a> {
    bridge: &'a mut ScheduleBridge,
    clock: &'a BeatClock,
    hit_line_offset_beats: f64,
}

impl NoteSink for BridgeSink<'_> {
    fn note_entered(&mut self, note: &Note) {
        self.bridge
            .schedule_note(note, self.clock, self.hit_line_offset_beats);
    }

    fn note_pruned(&mut self, note: &Note) {
        tracing::trace!(id = %note.id(), "note pruned");
        self.bridge.release(note.id());
    }
}

/// One practice session: owns its clock, live notes, handle registry and
/// audio stream. Several controllers can run side by side.
pub struct TransportController {
    config: SessionConfig,
    window: WindowBeats,
    state: SessionState,
    audio_port: Box<dyn AudioOutputPort>,
    sound: Arc<dyn SoundPort>,
    audio_stream: Option<Box<dyn AudioStreamHandle>>,
    clock: BeatClock,
    source: NoteSource,
    bridge: ScheduleBridge,
    projector: WindowProjector,
    calibrator: GeometryCalibrator,
    current_beat: f64,
    preview: PreviewFrame,
    subscribers: Vec<Producer<Event>>,
    last_transport_emit: Option<Instant>,
}

impl TransportController {
    pub fn new(
        config: SessionConfig,
        source: NoteSource,
        audio_port: Box<dyn AudioOutputPort>,
        sound: Arc<dyn SoundPort>,
    ) -> Result<Self, TransportError> {
        config.validate()?;

        let scheduler = PracticeScheduler::new(
            config.ppq,
            config.sample_rate_hz,
            config.initial_tempo_bpm,
        )
        .shared();
        let clock = BeatClock::new(scheduler.clone(), config.initial_tempo_bpm);
        let bridge = ScheduleBridge::new(scheduler, config.audio_fine_tune_beats);
        let projector = WindowProjector::new(config.projection());
        let calibrator = GeometryCalibrator::new(config.hit_line_percent, config.view_lead_in_beats);

        let mut controller = Self {
            window: config.window(),
            config,
            state: SessionState::Stopped,
            audio_port,
            sound,
            audio_stream: None,
            clock,
            source,
            bridge,
            projector,
            calibrator,
            current_beat: 0.0,
            preview: PreviewFrame::default(),
            subscribers: Vec::new(),
            last_transport_emit: None,
        };
        controller.refresh_preview();
        Ok(controller)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn tempo_bpm(&self) -> u32 {
        self.clock.tempo_bpm()
    }

    pub fn current_beat(&self) -> f64 {
        self.current_beat
    }

    pub fn position_label(&self) -> String {
        format_position(self.current_beat)
    }

    pub fn hit_line_offset_beats(&self) -> f64 {
        self.calibrator.offset_beats()
    }

    pub fn live_notes(&self) -> &[Note] {
        self.source.live_notes()
    }

    pub fn preview(&self) -> &PreviewFrame {
        &self.preview
    }

    pub fn bridge(&self) -> &ScheduleBridge {
        &self.bridge
    }

    pub fn scheduler(&self) -> &SharedScheduler {
        self.clock.scheduler()
    }

    pub fn subscribe(&mut self, capacity: usize) -> EventSubscriber {
        let (producer, consumer) = RingBuffer::new(capacity.max(1));
        self.subscribers.push(producer);
        EventSubscriber::new(consumer)
    }

    pub fn handle_command(&mut self, cmd: Command) -> Result<(), TransportError> {
        match cmd {
            Command::Start => self.start()?,
            Command::Stop => self.stop(),
            Command::Toggle => self.toggle()?,
            Command::SetTempo { bpm } => {
                self.set_tempo(bpm);
            }
            Command::AdjustTempo { delta } => {
                self.adjust_tempo(delta);
            }
            Command::MeasuredWidth {
                note_width_percent_of_track,
            } => {
                self.on_measured_width(note_width_percent_of_track);
            }
        }
        Ok(())
    }

    /// Starts a fresh run from beat 0. Waits for the audio output first; if
    /// it cannot be opened nothing else is touched and the session stays
    /// stopped. Calling this while running restarts the run.
    pub fn start(&mut self) -> Result<(), TransportError> {
        if self.is_running() {
            self.stop();
        }

        if let Err(err) = self.ensure_output() {
            tracing::warn!(error = %err, "audio output unavailable, session not started");
            return Err(err.into());
        }

        let stray = self.bridge.cancel_all();
        if stray > 0 {
            tracing::debug!(stray, "cancelled stray registrations");
        }
        self.source.clear();
        self.source.reset();
        self.clock.reset();
        self.current_beat = 0.0;

        self.source.ensure_window(
            0.0,
            self.window,
            &mut BridgeSink {
                bridge: &mut self.bridge,
                clock: &self.clock,
                hit_line_offset_beats: self.calibrator.offset_beats(),
            },
        );
        self.bridge.start_pattern();
        self.clock.scheduler().lock().start();
        self.state = SessionState::Running;

        tracing::info!(
            tempo_bpm = self.clock.tempo_bpm(),
            notes = self.source.live_notes().len(),
            "session started"
        );
        self.emit_session_state();
        self.refresh_preview();
        self.emit_preview();
        self.emit_transport(true);
        Ok(())
    }

    /// Stops the clock, rewinds to beat 0 and cancels every outstanding
    /// registration.
    pub fn stop(&mut self) {
        if !self.is_running() {
            return;
        }

        self.clock.scheduler().lock().stop();
        self.clock.reset();
        self.current_beat = 0.0;
        let cancelled = self.bridge.cancel_all();
        self.state = SessionState::Stopped;

        tracing::info!(cancelled, "session stopped");
        self.emit_session_state();
        self.refresh_preview();
        self.emit_preview();
        self.emit_transport(true);
    }

    pub fn toggle(&mut self) -> Result<(), TransportError> {
        if self.is_running() {
            self.stop();
            Ok(())
        } else {
            self.start()
        }
    }

    /// Applies to scheduling decisions made from now on; triggers already
    /// registered keep their time.
    pub fn set_tempo(&mut self, bpm: f64) -> bool {
        let changed = self.clock.set_tempo(bpm);
        if changed {
            self.emit_session_state();
        }
        changed
    }

    pub fn adjust_tempo(&mut self, delta: i32) -> bool {
        self.set_tempo(self.clock.tempo_bpm() as f64 + delta as f64)
    }

    /// Renderer feedback: token width as a percentage of the track.
    pub fn on_measured_width(&mut self, note_width_percent_of_track: f64) -> bool {
        let changed = self.calibrator.on_measured_width(note_width_percent_of_track);
        if changed {
            tracing::debug!(
                offset_beats = self.calibrator.offset_beats(),
                "hit line calibration changed"
            );
            self.refresh_preview();
            self.emit_preview();
        }
        changed
    }

    /// Per-frame poll. Reads the clock, tops up the note window and pushes a
    /// fresh preview to subscribers. No-op while stopped.
    pub fn tick(&mut self) {
        if !self.is_running() {
            return;
        }

        self.current_beat = self.clock.read_current_beat().max(self.current_beat);
        self.source.ensure_window(
            self.current_beat,
            self.window,
            &mut BridgeSink {
                bridge: &mut self.bridge,
                clock: &self.clock,
                hit_line_offset_beats: self.calibrator.offset_beats(),
            },
        );

        self.refresh_preview();
        self.emit_preview();
        self.emit_transport(false);
    }

    /// Stops the session and closes the audio stream.
    pub fn shutdown(&mut self) {
        self.stop();
        if let Some(stream) = self.audio_stream.take() {
            stream.close();
        }
    }

    fn ensure_output(&mut self) -> Result<(), AudioError> {
        if self.audio_stream.is_some() {
            return Ok(());
        }

        self.sound.set_sample_rate(self.config.sample_rate_hz);
        let graph = PracticeGraph::new(self.clock.scheduler().clone(), self.sound.clone());
        let device_id = self.config.output_device_id();
        let stream = self.audio_port.open_output(
            device_id.as_ref(),
            self.config.audio_config(),
            Box::new(graph),
        )?;

        tracing::info!(sample_rate_hz = self.config.sample_rate_hz, "audio output ready");
        self.audio_stream = Some(stream);
        Ok(())
    }

    fn refresh_preview(&mut self) {
        self.preview = if self.is_running() {
            self.projector.project(
                self.source.live_notes(),
                ViewMode::Running {
                    current_beat: self.current_beat,
                    hit_line_offset_beats: self.calibrator.offset_beats(),
                },
            )
        } else {
            let layout = self.source.static_layout();
            self.projector.project(
                layout.notes,
                ViewMode::Stopped {
                    total_beats: layout.total_beats,
                    lead_in_beats: layout.lead_in_beats,
                },
            )
        };
    }

    fn emit(&mut self, event: Event) {
        self.subscribers.retain(|producer| !producer.is_abandoned());
        for producer in &mut self.subscribers {
            // a full ring drops the event rather than stall the frame loop
            let _ = producer.push(event.clone());
        }
    }

    fn emit_session_state(&mut self) {
        self.emit(Event::SessionStateUpdated {
            state: self.state,
            tempo_bpm: self.clock.tempo_bpm(),
        });
    }

    fn emit_preview(&mut self) {
        self.emit(Event::PreviewUpdated {
            frame: self.preview.clone(),
        });
    }

    fn emit_transport(&mut self, force: bool) {
        let now = Instant::now();
        if !force {
            if let Some(last) = self.last_transport_emit {
                if now.duration_since(last) < Duration::from_millis(33) {
                    return;
                }
            }
        }
        self.emit(Event::TransportUpdated {
            beat: self.current_beat,
            position: format_position(self.current_beat),
            running: self.is_running(),
        });
        self.last_transport_emit = Some(now);
    }
}

impl Drop for TransportController {
    fn drop(&mut self) {
        self.bridge.cancel_all();
        if let Some(stream) = self.audio_stream.take() {
            stream.close();
        }
    }
}
