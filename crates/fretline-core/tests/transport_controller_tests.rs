mod common;

use common::*;
use fretline_core::{Command, Event, NoteSource, SessionState, TransportController, TransportError};
use fretline_domain_exercise::{basic_exercise, ExerciseDefinition, ExerciseNote, NoteId};
use fretline_ports::sound::Sound;
use pretty_assertions::assert_eq;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn single_note_exercise(label: &str, beat: f64) -> ExerciseDefinition {
    ExerciseDefinition {
        id: "single".to_string(),
        name: "Single".to_string(),
        total_beats: 8.0,
        lead_in_beats: None,
        notes: vec![ExerciseNote {
            label: label.to_string(),
            string_index: Some(0),
            fret: Some(0),
            entry_beat: beat,
            duration_beats: None,
        }],
    }
}

fn procedural_rig() -> Rig {
    let config = test_config();
    let source = NoteSource::procedural(config.procedural_stream());
    rig(config, source)
}

#[test]
fn note_activates_when_its_edge_reaches_the_hit_line() {
    let config = fretline_core::SessionConfig {
        audio_fine_tune_beats: 0.0,
        hit_line_percent: 20.0,
        ..test_config()
    };
    let mut r = rig(config, fixed_source(&single_note_exercise("E4", 4.0)));

    // span 80%, half width 8% -> 0.6 / 1.1 beats
    assert!(r.controller.on_measured_width(16.0));
    let offset = r.controller.hit_line_offset_beats();
    assert!(approx(offset, 0.6 / 1.1, 1e-9));

    r.controller.start().expect("start");
    r.output.pump_beats(3.0);
    r.controller.tick();
    let record = &r.controller.preview().records[0];
    assert!(approx(record.distance_to_hit, 4.0 - offset - 3.0, 1e-6));
    assert!(!record.is_active);

    r.output.pump_beats(0.5);
    r.controller.tick();
    assert!(r.controller.preview().records[0].is_active);
    assert!(r.controller.preview().has_active_note);

    // trigger beat 3.4545 snaps to 3.5
    r.output.pump(BLOCK);
    assert_eq!(r.sound.notes(), vec![("E4".to_string(), 84_000)]);
}

#[test]
fn restarts_never_double_trigger() {
    let mut r = rig(test_config(), fixed_source(&basic_exercise()));

    r.controller.start().expect("start");
    r.output.pump_beats(0.5);
    r.controller.start().expect("restart");
    r.output.pump_beats(0.5);
    r.controller.stop();
    assert_eq!(r.controller.bridge().registration_count(), 0);
    assert_eq!(r.controller.scheduler().lock().pending_count(), 0);

    r.controller.start().expect("start again");
    r.output.pump_beats(1.5);

    // E4 at 1.0 minus fine tune snaps back to beat 1 of the third run
    assert_eq!(r.sound.notes(), vec![("E4".to_string(), 48_000)]);
}

#[test]
fn audio_failure_leaves_session_stopped() {
    let output = FailingOutput::default();
    let sound = Arc::new(RecordingSound::default());
    let mut controller = TransportController::new(
        test_config(),
        fixed_source(&basic_exercise()),
        Box::new(output.clone()),
        sound,
    )
    .expect("controller");
    let mut events = controller.subscribe(16);

    let err = controller.start().unwrap_err();
    assert!(matches!(err, TransportError::AudioUnavailable(_)));
    assert_eq!(controller.state(), SessionState::Stopped);
    assert_eq!(controller.bridge().registration_count(), 0);
    assert_eq!(controller.scheduler().lock().pending_count(), 0);
    assert!(controller.live_notes().is_empty());
    assert!(events.drain().is_empty());

    assert!(controller.handle_command(Command::Toggle).is_err());
    assert_eq!(output.attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn stopped_fixed_exercise_shows_static_layout() {
    let mut r = rig(test_config(), fixed_source(&basic_exercise()));

    let frame = r.controller.preview().clone();
    assert_eq!(frame.records.len(), 5);
    assert!(!frame.has_active_note);
    let g3 = frame
        .records
        .iter()
        .find(|record| record.label == "G3")
        .expect("G3");
    assert_eq!(g3.position, 0.5);
    assert_eq!(g3.distance_to_hit, 4.0);

    r.controller.start().expect("start");
    r.controller.stop();
    assert_eq!(r.controller.preview(), &frame);
}

#[test]
fn static_layout_ignores_lead_in() {
    let mut definition = basic_exercise();
    definition.lead_in_beats = Some(2.0);
    let mut r = rig(test_config(), fixed_source(&definition));

    let frame = r.controller.preview().clone();
    let g3 = frame
        .records
        .iter()
        .find(|record| record.label == "G3")
        .expect("G3");
    assert_eq!(g3.position, 0.5);

    r.controller.start().expect("start");
    r.controller.stop();
    assert_eq!(r.controller.preview(), &frame);
}

#[test]
fn procedural_restart_triggers_first_note_once() {
    let mut r = procedural_rig();

    r.controller.start().expect("start");
    r.output.pump_beats(0.5);
    r.controller.stop();
    r.controller.start().expect("start again");
    r.output.pump_beats(4.5);

    // first entry at beat 4 minus fine tune snaps to beat 4 of the second run
    let notes = r.sound.notes();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].1, 12_000 + 96_000);
}

#[test]
fn stopped_procedural_preview_is_empty() {
    let r = procedural_rig();
    assert!(r.controller.preview().records.is_empty());
}

#[test]
fn procedural_window_grows_with_the_clock() {
    let mut r = procedural_rig();
    r.controller.start().expect("start");

    // first entry at beat 4, lookahead 10
    assert_eq!(r.controller.live_notes().len(), 6);
    assert_eq!(r.controller.bridge().registration_count(), 7);

    r.output.pump_beats(1.9);
    r.controller.tick();
    assert!(approx(r.controller.current_beat(), 1.9, 1e-6));

    let notes = r.controller.live_notes();
    assert_eq!(notes.len(), 8);
    for (index, pair) in notes.windows(2).enumerate() {
        assert_eq!(pair[1].entry_beat() - pair[0].entry_beat(), 1.0, "at {index}");
        assert_eq!(pair[1].id().0, pair[0].id().0 + 1);
    }
    assert_eq!(r.controller.bridge().registration_count(), 9);
}

#[test]
fn tempo_change_mid_run_keeps_registered_triggers() {
    let mut r = rig(test_config(), fixed_source(&basic_exercise()));
    r.controller.start().expect("start");

    let handle = r
        .controller
        .bridge()
        .handle_for(NoteId(2))
        .expect("G3 handle");
    let before = r.controller.scheduler().lock().pending_time(handle);
    assert_eq!(before, Some(96_000));

    assert!(r.controller.set_tempo(60.0));
    assert_eq!(r.controller.scheduler().lock().pending_time(handle), before);
}

#[test]
fn calibration_only_affects_later_notes() {
    let mut r = procedural_rig();
    r.controller.start().expect("start");
    let handle = r.controller.bridge().handle_for(NoteId(0)).expect("handle");
    let before = r.controller.scheduler().lock().pending_time(handle);

    assert!(r.controller.on_measured_width(20.0));
    assert_eq!(r.controller.scheduler().lock().pending_time(handle), before);
}

#[test]
fn tempo_commands_clamp_and_ignore_garbage() {
    let mut r = procedural_rig();
    let mut events = r.controller.subscribe(16);

    r.controller
        .handle_command(Command::AdjustTempo { delta: 5 })
        .expect("adjust");
    assert_eq!(r.controller.tempo_bpm(), 125);
    r.controller
        .handle_command(Command::SetTempo { bpm: 500.0 })
        .expect("set");
    assert_eq!(r.controller.tempo_bpm(), 200);
    r.controller
        .handle_command(Command::SetTempo { bpm: f64::NAN })
        .expect("set");
    assert_eq!(r.controller.tempo_bpm(), 200);

    assert_eq!(
        events.drain(),
        vec![
            Event::SessionStateUpdated {
                state: SessionState::Stopped,
                tempo_bpm: 125,
            },
            Event::SessionStateUpdated {
                state: SessionState::Stopped,
                tempo_bpm: 200,
            },
        ]
    );
}

#[test]
fn start_and_stop_notify_subscribers() {
    let mut r = procedural_rig();
    let mut events = r.controller.subscribe(32);

    r.controller.handle_command(Command::Toggle).expect("toggle");
    assert!(r.controller.is_running());
    let started = events.drain();
    assert_eq!(
        started.first(),
        Some(&Event::SessionStateUpdated {
            state: SessionState::Running,
            tempo_bpm: 120,
        })
    );
    assert!(started.iter().any(|event| matches!(event, Event::PreviewUpdated { .. })));
    assert!(started.contains(&Event::TransportUpdated {
        beat: 0.0,
        position: "0:0:0".to_string(),
        running: true,
    }));

    r.controller.handle_command(Command::Toggle).expect("toggle");
    assert_eq!(r.controller.state(), SessionState::Stopped);
    assert!(events.drain().contains(&Event::SessionStateUpdated {
        state: SessionState::Stopped,
        tempo_bpm: 120,
    }));
}

#[test]
fn tick_is_inert_while_stopped() {
    let mut r = procedural_rig();
    let mut events = r.controller.subscribe(8);
    r.controller.tick();
    assert!(events.drain().is_empty());
    assert_eq!(r.controller.current_beat(), 0.0);
}

#[test]
fn dropped_subscriber_is_pruned_without_affecting_others() {
    let mut r = procedural_rig();
    let dropped = r.controller.subscribe(4);
    let mut kept = r.controller.subscribe(64);
    drop(dropped);

    r.controller.start().expect("start");
    assert!(!kept.drain().is_empty());
}

#[test]
fn controllers_are_independent() {
    let mut a = procedural_rig();
    let mut b = rig(test_config(), fixed_source(&basic_exercise()));

    a.controller.start().expect("start a");
    a.output.pump_beats(0.9);
    a.controller.tick();
    a.controller.set_tempo(60.0);

    assert_eq!(b.controller.state(), SessionState::Stopped);
    assert_eq!(b.controller.tempo_bpm(), 120);
    assert_eq!(b.controller.scheduler().lock().ticks(), 0.0);
    assert!(!b.output.pump_beats(1.0));
    assert_eq!(b.sound.count(&Sound::Kick), 0);

    b.controller.start().expect("start b");
    assert_eq!(a.controller.bridge().registration_count(), 8);
    assert!(a.sound.count(&Sound::Kick) >= 1);
}

#[test]
fn shutdown_closes_the_stream() {
    let mut r = procedural_rig();
    r.controller.start().expect("start");
    assert!(r.output.is_open());

    r.controller.shutdown();
    assert!(!r.output.is_open());
    assert_eq!(r.controller.state(), SessionState::Stopped);
}

#[test]
fn sound_gets_sample_rate_before_stream_opens() {
    let mut r = procedural_rig();
    r.controller.start().expect("start");
    assert_eq!(r.sound.sample_rate_hz.load(Ordering::SeqCst), SAMPLE_RATE);
}
