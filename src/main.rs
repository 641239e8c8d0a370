use piano_roll::config::Config;
use piano_roll::console_display::ConsoleDisplay;
use piano_roll::display::{Framebuffer, Rotation};
use piano_roll::history::{SegmentBuf, SegmentEvent};
use piano_roll::roll::PianoRoll;
use piano_roll::session::{self, SessionReader, SessionWriter};
use piano_roll::simulator::{self, Simulator};
use piano_roll::types::*;

use clap::Parser;
use crossbeam_channel::{bounded, TryRecvError};
use log::{debug, error, info, warn};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

/// Segments kept for redraw. Only the last few hundred ms are ever walked.
const HISTORY_LEN: usize = 64;

#[derive(Parser)]
#[command(name = "piano-roll")]
#[command(about = "Scrolling piano-roll display for a live pitch detector")]
struct Cli {
    /// Panel width in pixels (before rotation)
    #[arg(long, default_value_t = 160)]
    width: usize,

    /// Panel height in pixels (before rotation)
    #[arg(long, default_value_t = 128)]
    height: usize,

    /// Panel rotation in quarter turns clockwise (0-3)
    #[arg(long, default_value_t = 0)]
    rotation: u8,

    /// JSON config file (frequency range, segment timing, palette)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Refresh rate of the roll (Hz)
    #[arg(long, default_value_t = 50)]
    fps: u32,

    /// Simulator demo: "scale" (default), "melody", or "chords"
    #[arg(long, default_value = "scale")]
    demo: String,

    /// Replay a recorded JSONL session instead of running the simulator
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Record received segments to a JSONL session file
    #[arg(long)]
    record: Option<PathBuf>,

    /// Mirror the roll in the terminal
    #[arg(long)]
    console: bool,

    /// Terminal mirror refresh rate (Hz)
    #[arg(long, default_value_t = 10)]
    display_hz: u32,

    /// Terminal mirror width in characters
    #[arg(long, default_value_t = 80)]
    columns: usize,

    /// Stop after this many seconds (0 = run until the source ends)
    #[arg(long, default_value_t = 0)]
    seconds: u64,

    /// Write the final frame as a PPM image
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path).unwrap_or_else(|| {
            warn!("Using default config");
            Config::default()
        }),
        None => Config::default(),
    };
    let range = config.pitch_range();
    let clock = SessionClock::new();

    info!("═══════════════════════════════════════════════");
    info!("  PIANO ROLL v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "  Panel: {}x{} rot {}  @ {} Hz",
        cli.width, cli.height, cli.rotation, cli.fps
    );
    info!(
        "  Pitch rows: {}..{} ({:.1}-{:.1} Hz)",
        range.min(),
        range.max(),
        config.freq_min_hz,
        config.freq_max_hz
    );
    match &cli.replay {
        Some(path) => info!("  Source: replay {:?}", path),
        None => info!("  Source: simulator \"{}\"", cli.demo),
    }
    info!("═══════════════════════════════════════════════");

    // Channel: segment source → render loop
    let (tx, rx) = bounded::<SegmentEvent>(256);

    let source = match &cli.replay {
        Some(path) => {
            let file = match File::open(path) {
                Ok(f) => f,
                Err(e) => {
                    error!("Cannot open {:?}: {}", path, e);
                    return;
                }
            };
            let reader = match SessionReader::open(BufReader::new(file)) {
                Ok(r) => r,
                Err(e) => {
                    error!("Cannot replay {:?}: {}", path, e);
                    return;
                }
            };
            reader.header.check_range(range);
            let events = reader.read_all();
            info!("Replaying {} segments", events.len());
            let replay_clock = clock.clone();
            let delay = config.min_segment_duration_ms;
            thread::Builder::new().name("replay".into()).spawn(move || {
                let schedule = session::rebase(&events, replay_clock.now_ms(), delay, range);
                let total = schedule.len();
                match simulator::play(&replay_clock, &tx, schedule) {
                    Some(sent) => info!("Replay finished: {} segments sent", sent),
                    None => warn!(
                        "Replay stopped early: display hung up before {} segments were sent",
                        total
                    ),
                }
            })
        }
        None => {
            if !simulator::DEMOS.contains(&cli.demo.as_str()) {
                warn!("Unknown demo \"{}\", playing \"scale\"", cli.demo);
            }
            let sim_clock = clock.clone();
            let sim_config = config.clone();
            let demo = cli.demo.clone();
            thread::Builder::new().name("simulator".into()).spawn(move || {
                Simulator::new(sim_clock, tx, &sim_config).run(&demo);
            })
        }
    };
    let source = match source {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to start segment source: {}", e);
            return;
        }
    };

    let mut recorder = match &cli.record {
        Some(path) => match SessionWriter::create(path, &config) {
            Ok(w) => Some(w),
            Err(e) => {
                error!("Cannot record to {:?}: {}", path, e);
                None
            }
        },
        None => None,
    };

    let fb = Framebuffer::with_rotation(
        cli.width,
        cli.height,
        Rotation::from_quarter_turns(cli.rotation),
    );
    let mut roll = PianoRoll::new(fb, &config);
    roll.clear(clock.now_ms());

    let mut console = cli.console.then(|| ConsoleDisplay::new(cli.columns));
    let console_every = (cli.fps / cli.display_hz.max(1)).max(1) as u64;

    let mut history: SegmentBuf<HISTORY_LEN> = SegmentBuf::new();
    let mut last_offset: Millis = 0;
    let tick_ms = (1000 / cli.fps.max(1)) as Millis;
    let deadline = (cli.seconds > 0).then(|| clock.now_ms() + cli.seconds * 1000);
    let mut drain_until: Option<Millis> = None;
    let mut ticks: u64 = 0;
    let mut notes_drawn: u64 = 0;

    loop {
        let now = clock.now_ms();
        if deadline.is_some_and(|d| now >= d) || drain_until.is_some_and(|d| now >= d) {
            break;
        }

        loop {
            match rx.try_recv() {
                Ok(event) => {
                    history.push(event.segment);
                    last_offset = event.offset;
                    if let Some(w) = recorder.as_mut() {
                        if let Err(e) = w.write(&event) {
                            error!("Recording failed, stopping: {}", e);
                            recorder = None;
                        }
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if drain_until.is_none() && deadline.is_none() {
                        // let the last notes scroll into view, then stop
                        info!("Segment source finished");
                        drain_until = Some(now + config.msec_on_screen);
                    }
                    break;
                }
            }
        }

        let tick = roll.render(now, last_offset, &history);
        ticks += 1;
        notes_drawn += tick.notes_drawn as u64;
        if ticks % 500 == 0 {
            debug!(
                "{} ticks, {} note repaints, epoch {}, window {}px",
                ticks, notes_drawn, tick.epoch, tick.draw_in_pixels
            );
        }

        if let Some(c) = console.as_mut() {
            if ticks % console_every == 0 {
                c.show(roll.display());
            }
        }

        let spent = clock.now_ms() - now;
        if spent < tick_ms {
            thread::sleep(Duration::from_millis(tick_ms - spent));
        } else {
            debug!("Tick took {}ms (budget {}ms)", spent, tick_ms);
        }
    }

    if let Some(mut w) = recorder {
        match w.flush() {
            Ok(()) => info!("Recorded {} segments", w.count()),
            Err(e) => error!("Failed to flush recording: {}", e),
        }
    }

    if let Some(path) = &cli.snapshot {
        match roll.display().write_ppm(path) {
            Ok(()) => info!("Snapshot written to {:?}", path),
            Err(e) => error!("Failed to write snapshot {:?}: {}", path, e),
        }
    }

    // Dropping the receiver stops the simulator on its next send
    drop(rx);
    if source.join().is_err() {
        warn!("Segment source thread panicked");
    }
    info!("Rendered {} ticks", ticks);
}
