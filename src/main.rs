use std::time::{Duration, Instant};

use gazelog_common::{GazeLogError, RenderSink};
use gazelog_log::loader::LogLoader;
use gazelog_log::recorder::Recorder;
use gazelog_replay::cursor::ReplayCursor;
use gazelog_replay::smoother::PositionSmoother;

mod demo;
mod session;

use demo::{ConsoleSink, ForwardProjector, PanelField, ScriptedSource};
use session::SessionConfig;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    let cmd = args.get(1).map(|s| s.as_str()).unwrap_or("demo");

    let seconds = parse_flag_value(&args, "--seconds").unwrap_or(3);
    let tick_ms = parse_flag_value(&args, "--tick-ms").unwrap_or(16);
    let file_index = parse_flag_value(&args, "--file").map(|v| v as u32);
    let config = match parse_flag_string(&args, "--config") {
        Some(path) => session::load_session_config(&path)?,
        None => SessionConfig::default(),
    };

    match cmd {
        "record" => run_record(&config, seconds, tick_ms)?,
        "replay" => run_replay(&config, file_index, tick_ms)?,
        "demo" => {
            run_record(&config, seconds, tick_ms)?;
            run_replay(&config, file_index, tick_ms)?;
        }
        _ => {
            eprintln!("Usage: gazelog [record|replay|demo] [--config <file.toml>]");
            eprintln!("       [--seconds <n>] [--tick-ms <ms>] [--file <index>]");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn parse_flag_value(args: &[String], flag: &str) -> Option<u64> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}

fn parse_flag_string(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|v| v.clone())
}

/// Record a scripted gaze sweep against the demo panel room. The clock is
/// synthetic, so the whole session writes as fast as samples encode.
fn run_record(config: &SessionConfig, seconds: u64, tick_ms: u64) -> anyhow::Result<()> {
    println!("=== gazelog record ===");

    let mut recorder = Recorder::new(config.recorder_config());
    let scene = PanelField::demo_room();
    let projector = ForwardProjector;
    let duration = seconds as f64;
    let mut source = ScriptedSource::new(duration);

    recorder.start_recording()?;

    let tick = tick_ms as f64 / 1000.0;
    let ticks = (duration / tick).ceil() as u64;
    let mut drained = 0;
    for i in 0..ticks {
        let now = i as f64 * tick;
        source.emit(now, 4);
        drained += recorder.tick(now, &mut source, Some(&scene), &projector);
    }

    let written = recorder.stop_recording()?;
    println!("drained {drained} samples; final flush wrote {written} records\n");
    Ok(())
}

/// Replay the recorded file against the wall clock, printing gaze target
/// changes and blink edges as they play back.
fn run_replay(
    config: &SessionConfig,
    file_index: Option<u32>,
    tick_ms: u64,
) -> anyhow::Result<()> {
    println!("=== gazelog replay ===");

    let mut replay_config = config.replay_config();
    if let Some(index) = file_index {
        replay_config.file_index = index;
    }

    let loader = LogLoader::new(config.naming(), config.load_options());
    let mut cursor = ReplayCursor::new(loader, replay_config);
    if !cursor.initialize() {
        return Err(GazeLogError::NotReady(
            "no records to replay; run `gazelog record` first".to_string(),
        )
        .into());
    }

    let mut smoother = PositionSmoother::new(config.smoother_config());
    let mut sink = ConsoleSink::new();

    let clock = Instant::now();
    cursor.toggle_replay(clock.elapsed().as_secs_f64());

    let count = cursor.loader().len();
    loop {
        let now = clock.elapsed().as_secs_f64();
        if let Some(record) = cursor.tick(now) {
            let record = record.clone();
            let view = smoother.update(&record);
            sink.present(Some(&record), &view);
        }
        if cursor.index() + 1 >= count {
            break;
        }
        std::thread::sleep(Duration::from_millis(tick_ms));
    }

    let telemetry = cursor.telemetry(clock.elapsed().as_secs_f64());
    println!(
        "replayed {} of {} records in {:.2}s (drift {:+.3}s)\n",
        telemetry.index + 1,
        telemetry.count,
        telemetry.elapsed,
        telemetry.drift,
    );
    Ok(())
}
