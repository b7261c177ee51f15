//! Command-line parsing and session bootstrap.
//!
//! Startup order matters for the terminal: it is taken over before the
//! service connection is attempted, so every failure after that point must
//! hand it back before the diagnostic is printed.

#[cfg(test)]
mod tests;

use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use crate::bus::{EventBus, TerminationReason};
use crate::core::config::{path_display, Config, ConfigError, ResolvedWorkspace};
use crate::core::context::AppContext;
use crate::handlers;
use crate::logging;
use crate::producers::{ServicePushProducer, TerminalInputProducer, TimerProducer};
use crate::service::{ChatService, Connected, LoopbackService, ReplayService, ServiceError};
use crate::ui::renderer::{Renderer, TerminalRenderer};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_DESCRIBE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(version = VERSION)]
#[command(about = "A terminal chat client for team workspaces")]
#[command(
    long_about = "Parley is a full-screen terminal chat client. Keys, service notifications \
and timer ticks all flow through one event queue that a single loop drains in order.\n\n\
Controls:\n\
  i                 Compose a message (Enter sends, Esc returns)\n\
  /                 Filter channels (Enter jumps to the first match)\n\
  j/k, Up/Down      Move between channels\n\
  g/G               First/last channel\n\
  PgUp/PgDn         Scroll messages\n\
  q, Ctrl+C         Quit"
)]
pub struct Args {
    /// Read configuration from this file instead of the default location
    #[arg(short = 'c', long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Workspace to open (defaults to the configured default)
    #[arg(short = 'w', long, value_name = "NAME")]
    pub workspace: Option<String>,

    /// Log at info level instead of warn
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Write diagnostic logs to this file
    #[arg(short = 'l', long, value_name = "PATH")]
    pub log: Option<PathBuf>,
}

#[derive(Debug)]
pub enum StartupError {
    Config(ConfigError),
    Logging { path: PathBuf, source: io::Error },
    Terminal(io::Error),
    Service(ServiceError),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Config(err) => write!(f, "{err}"),
            StartupError::Logging { path, source } => {
                write!(f, "Cannot open log file {}: {source}", path_display(path))
            }
            StartupError::Terminal(err) => write!(f, "Terminal unavailable: {err}"),
            StartupError::Service(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StartupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StartupError::Config(err) => Some(err),
            StartupError::Logging { source, .. } => Some(source),
            StartupError::Terminal(err) => Some(err),
            StartupError::Service(err) => Some(err),
        }
    }
}

impl From<ConfigError> for StartupError {
    fn from(err: ConfigError) -> Self {
        StartupError::Config(err)
    }
}

impl From<ServiceError> for StartupError {
    fn from(err: ServiceError) -> Self {
        StartupError::Service(err)
    }
}

/// Parses arguments, runs the session, and returns the process exit code.
pub fn main() -> i32 {
    let args = Args::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("parley: failed to start async runtime: {err}");
            return 1;
        }
    };

    match runtime.block_on(run(args)) {
        Ok(reason) => {
            if let TerminationReason::Fatal(message) = &reason {
                eprintln!("parley: {message}");
            }
            reason.exit_code()
        }
        Err(err) => {
            eprintln!("parley: {err}");
            1
        }
    }
}

pub(crate) fn load_config(args: &Args) -> Result<Config, ConfigError> {
    match &args.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
}

/// Local user name for transports that do not authenticate.
fn local_user(workspace: &ResolvedWorkspace) -> String {
    workspace
        .settings
        .display_name
        .clone()
        .or_else(|| std::env::var("USER").ok())
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "me".to_string())
}

pub(crate) fn service_for(workspace: &ResolvedWorkspace) -> Box<dyn ChatService> {
    let user = local_user(workspace);
    if workspace.settings.replay.is_some() {
        Box::new(ReplayService::new(user))
    } else {
        Box::new(LoopbackService::new(user))
    }
}

async fn run(args: Args) -> Result<TerminationReason, StartupError> {
    let config = load_config(&args)?;
    let workspace = config.resolve_workspace(args.workspace.as_deref())?;

    let debug = args.debug || config.debug;
    if let Some(path) = args.log.clone().or_else(|| config.log_file.clone()) {
        logging::init(Some(path.as_path()), debug)
            .map_err(|source| StartupError::Logging { path, source })?;
    }
    info!(
        version = VERSION,
        workspace = %workspace.name,
        "Starting session"
    );

    let mut renderer = TerminalRenderer::stdout().map_err(StartupError::Terminal)?;

    let Connected {
        connection,
        notifications,
    } = match service_for(&workspace).connect(&workspace).await {
        Ok(connected) => connected,
        Err(err) => {
            let _ = renderer.restore();
            return Err(err.into());
        }
    };

    let tick = config.tick_interval();
    let mut context = AppContext::new(Arc::new(config), workspace.name.clone())
        .with_connection(connection);
    if let Ok(size) = renderer.size() {
        context.view.term_width = size.width;
        context.view.term_height = size.height;
    }

    let mut bus = EventBus::new(context);
    bus.subscribe(TerminalInputProducer::crossterm())
        .subscribe(ServicePushProducer::new(notifications))
        .subscribe(TimerProducer::new(tick));
    handlers::register_defaults(&mut bus);
    bus.set_renderer(renderer);

    let termination = bus.run().await;
    Ok(termination.reason)
}
