use crate::audio::{AudioOutput, NullOutput, OutputDevice, SymphoniaDecoder};
use crate::config::{self, Settings};
use crate::display::{LogDisplay, TerminalDisplay};
use crate::input::KeyboardInput;
use crate::library::{self, TagReader};
use crate::session::{Session, SessionOptions, SessionReport};
use crate::ui;
use anyhow::{Context, Result, bail};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "LCDPLAY_LOG";

#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    pub paths: Vec<PathBuf>,
    pub null_output: bool,
    pub plain: bool,
    pub device: Option<String>,
}

pub fn run(options: AppOptions) -> Result<SessionReport> {
    let settings = config::load_settings()?;
    init_logging(&settings, options.plain)?;
    if !config::settings_path()?.exists() {
        // First run: leave an editable copy of the defaults behind.
        if let Err(err) = config::save_settings(&settings) {
            warn!(error = %err, "could not write default settings");
        }
    }

    let playlist = library::playlist_from_args(&options.paths);
    if playlist.is_empty() {
        bail!("no playable tracks in the given paths");
    }
    info!(tracks = playlist.len(), "playlist loaded");

    // The device has to stay open until the session is over.
    let device = if options.null_output {
        None
    } else {
        let requested = options.device.as_deref().or(settings.output_device.as_deref());
        let device = OutputDevice::open(requested).context("startup failed")?;
        info!(device = device.name(), "audio output ready");
        Some(device)
    };
    let output: Arc<dyn AudioOutput> = match &device {
        Some(device) => Arc::new(device.output(settings.output_queue_depth)),
        None => Arc::new(NullOutput::new()),
    };

    let mut session = Session::new(
        playlist,
        Arc::new(SymphoniaDecoder::new()),
        output,
        Box::new(TagReader),
        SessionOptions::from_settings(&settings),
    );
    let mut input = KeyboardInput;

    let report = if options.plain {
        let mut display = LogDisplay::new(settings.row_width);
        session.run(&mut input, &mut display)?
    } else {
        let terminal = ui::enter_terminal()?;
        let mut display = TerminalDisplay::new(terminal, settings.row_width);
        let result = session.run(&mut input, &mut display);
        let mut terminal = display.into_terminal();
        ui::restore_terminal(&mut terminal)?;
        result?
    };

    drop(device);
    Ok(report)
}

fn init_logging(settings: &Settings, plain: bool) -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(settings.log_filter.as_str()));

    if plain {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|err| anyhow::anyhow!("failed to install logger: {err}"))?;
        return Ok(());
    }

    // The panel owns the screen, so everything else goes to a file.
    config::ensure_config_dir()?;
    let path = config::log_path()?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install logger: {err}"))?;
    Ok(())
}
