mod host;

use anyhow::{Context, Result};
use fretline_core::{
    Command, Event, FixedExercise, NoteSource, SessionConfig, TransportController,
};
use fretline_domain_exercise::{basic_exercise, ExerciseDefinition};
use fretline_infra_audio_cpal::CpalAudioOutputPort;
use fretline_ports::audio::AudioOutputPort;
use host::{LoggingSound, OfflineOutput};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

const FRAME_INTERVAL: Duration = Duration::from_millis(16);

struct CliOptions {
    config: Option<PathBuf>,
    exercise: Option<ExerciseChoice>,
    tempo: Option<f64>,
    note_width: Option<f64>,
    seconds: f64,
    offline: bool,
    json: bool,
}

enum ExerciseChoice {
    Basic,
    File(PathBuf),
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        let mut options = Self {
            config: None,
            exercise: None,
            tempo: None,
            note_width: None,
            seconds: 16.0,
            offline: false,
            json: false,
        };
        let mut i = 1;

        while i < args.len() {
            match args[i].as_str() {
                "--config" | "-c" => options.config = Some(PathBuf::from(value(&args, &mut i)?)),
                "--exercise" | "-e" => {
                    let name = value(&args, &mut i)?;
                    options.exercise = Some(match name {
                        "basic" => ExerciseChoice::Basic,
                        path => ExerciseChoice::File(PathBuf::from(path)),
                    });
                }
                "--tempo" | "-t" => {
                    options.tempo = Some(value(&args, &mut i)?.parse().context("--tempo")?)
                }
                "--note-width" => {
                    options.note_width =
                        Some(value(&args, &mut i)?.parse().context("--note-width")?)
                }
                "--seconds" | "-s" => {
                    options.seconds = value(&args, &mut i)?.parse().context("--seconds")?
                }
                "--offline" => options.offline = true,
                "--json" => options.json = true,
                "--help" | "-h" => {
                    print_help(args.first().map(String::as_str).unwrap_or("fretline"));
                    std::process::exit(0);
                }
                other => anyhow::bail!("unknown option: {other} (use --help)"),
            }
            i += 1;
        }

        Ok(options)
    }
}

fn value<'a>(args: &'a [String], i: &mut usize) -> Result<&'a str> {
    let flag = &args[*i];
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .with_context(|| format!("{flag} requires a value"))
}

fn print_help(program: &str) {
    eprintln!("fretline - headless guitar rhythm trainer");
    eprintln!();
    eprintln!("Usage: {program} [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config PATH       Session config (JSON)");
    eprintln!("  -e, --exercise NAME     'basic' or a path to an exercise JSON; random notes if omitted");
    eprintln!("  -t, --tempo BPM         Initial tempo (clamped to 40..200)");
    eprintln!("      --note-width PCT    Token width reported by the renderer, % of track");
    eprintln!("  -s, --seconds N         Run time before stopping (default 16)");
    eprintln!("      --offline           Drive the clock without an audio device");
    eprintln!("      --json              Print events as JSON lines");
    eprintln!("  -h, --help              Print this help message");
    eprintln!();
    eprintln!("Logging is controlled with RUST_LOG, e.g. RUST_LOG=fretline_core=debug");
}

fn load_exercise(choice: &ExerciseChoice) -> Result<ExerciseDefinition> {
    match choice {
        ExerciseChoice::Basic => Ok(basic_exercise()),
        ExerciseChoice::File(path) => {
            let data = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
        }
    }
}

fn main() -> Result<()> {
    let cli = CliOptions::parse()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => SessionConfig::from_json_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SessionConfig::default(),
    };
    if let Some(tempo) = cli.tempo {
        config.initial_tempo_bpm = tempo;
    }

    let source = match &cli.exercise {
        Some(choice) => {
            let definition = load_exercise(choice)?;
            tracing::info!(exercise = %definition.name, "loaded exercise");
            NoteSource::fixed(FixedExercise::new(&definition).context("invalid exercise")?)
        }
        None => NoteSource::procedural(config.procedural_stream()),
    };

    let sound = Arc::new(LoggingSound::default());
    let output: Box<dyn AudioOutputPort> = if cli.offline {
        Box::new(OfflineOutput::default())
    } else {
        Box::new(CpalAudioOutputPort::new())
    };

    let mut controller = TransportController::new(config, source, output, sound.clone())
        .context("failed to initialize session")?;
    let mut events = controller.subscribe(256);

    if let Some(width) = cli.note_width {
        controller.handle_command(Command::MeasuredWidth {
            note_width_percent_of_track: width,
        })?;
    }
    controller
        .handle_command(Command::Start)
        .context("failed to start session")?;

    let run_for = Duration::from_secs_f64(cli.seconds.max(0.0));
    let started = Instant::now();
    while started.elapsed() < run_for {
        controller.tick();

        for (trigger, at) in sound.drain() {
            tracing::info!(sound = ?trigger.sound, duration = ?trigger.duration, at, "trigger");
        }
        for event in events.drain() {
            print_event(&event, cli.json)?;
        }

        std::thread::sleep(FRAME_INTERVAL);
    }

    controller.shutdown();
    for event in events.drain() {
        print_event(&event, cli.json)?;
    }
    Ok(())
}

fn print_event(event: &Event, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }

    match event {
        Event::SessionStateUpdated { state, tempo_bpm } => {
            println!("state {state:?} @ {tempo_bpm} bpm");
        }
        Event::TransportUpdated { position, .. } => {
            println!("position {position}");
        }
        Event::PreviewUpdated { frame } => {
            for record in frame.records.iter().filter(|record| record.is_active) {
                println!(
                    "  hit {} (string {:?}, fret {:?}) {:+.3}",
                    record.label, record.string_index, record.fret, record.distance_to_hit
                );
            }
        }
    }
    Ok(())
}
