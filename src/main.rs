use std::fs::File;
use std::io;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use crossterm::event::{self, Event};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::Terminal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use pocketseq::app::{Action, App, SessionError, Snapshot};
use pocketseq::audio::{CpalOutput, NullOutput};
use pocketseq::files::DirStorage;
use pocketseq::pattern::Pattern;
use pocketseq::sampler::Output;
use pocketseq::{input, view, Millis, DEFAULT_BPM, DEFAULT_VOLUME};

const POLL_INTERVAL: Duration = Duration::from_millis(1);
const FRAME_INTERVAL: Duration = Duration::from_millis(50);

type Session = App<DirStorage, Box<dyn Output>>;

#[derive(Parser)]
#[command(version, about = "A four track sample step sequencer.")]
struct Cli {
    /// Directory holding the .wav samples.
    #[arg(default_value = ".")]
    dir: Utf8PathBuf,
    /// Initial tempo in beats per minute.
    #[arg(long, default_value_t = DEFAULT_BPM)]
    bpm: u16,
    /// Initial master volume, 0 to 255.
    #[arg(long, default_value_t = DEFAULT_VOLUME)]
    volume: u8,
    /// Start with an empty pattern.
    #[arg(long)]
    blank: bool,
    /// Write logs to this file. Logging is off otherwise, since the terminal
    /// is taken by the grid.
    #[arg(long)]
    log_file: Option<Utf8PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;
    info!(dir = %cli.dir, "starting");

    let session = start(&cli);

    let _guard = TerminalGuard::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    terminal.clear()?;

    match session {
        Ok(app) => run(&mut terminal, app),
        Err(err) => {
            error!(%err, "session halted");
            halt(&mut terminal, &err.to_string())
        }
    }
}

fn init_logging(path: Option<&Utf8Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file =
        File::create(path).with_context(|| format!("unable to create log file {}", path))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn open_output() -> Box<dyn Output> {
    match CpalOutput::open() {
        Ok(output) => Box::new(output),
        Err(err) => {
            warn!(%err, "no audio output, running silent");
            Box::new(NullOutput::default())
        }
    }
}

fn start(cli: &Cli) -> Result<Session, SessionError> {
    let storage = DirStorage::new(&cli.dir)?;
    let mut app = App::start(storage, open_output())?;
    app.set_bpm(cli.bpm);
    app.set_volume(cli.volume);
    if !cli.blank {
        app.set_pattern(Pattern::with_default_groove());
    }
    Ok(app)
}

struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        io::stdout().execute(EnterAlternateScreen)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = io::stdout().execute(LeaveAlternateScreen);
    }
}

fn run<B: Backend>(terminal: &mut Terminal<B>, mut app: Session) -> Result<()> {
    let clock = Instant::now();
    let mut next_frame = clock;
    let mut drawn: Option<Snapshot> = None;

    while !app.should_stop() {
        let now = clock.elapsed().as_millis() as Millis;

        if event::poll(POLL_INTERVAL)? {
            match event::read()? {
                Event::Key(key) => {
                    if let Some(action) = input::handle_key(key) {
                        if let Err(err) = app.take(action, now) {
                            warn!(?action, %err, "command failed");
                        }
                    }
                }
                Event::Resize(..) => drawn = None,
                _ => {}
            }
        }

        app.tick(now);

        if Instant::now() >= next_frame {
            let snapshot = app.snapshot();
            if drawn.as_ref() != Some(&snapshot) {
                terminal.draw(|f| view::render(&snapshot, f))?;
                drawn = Some(snapshot);
            }
            next_frame = Instant::now() + FRAME_INTERVAL;
        }
    }

    info!("quit");
    Ok(())
}

fn halt<B: Backend>(terminal: &mut Terminal<B>, message: &str) -> Result<()> {
    loop {
        terminal.draw(|f| view::render_error(message, f))?;
        if let Event::Key(key) = event::read()? {
            if input::handle_key(key) == Some(Action::Quit) {
                return Ok(());
            }
        }
    }
}
