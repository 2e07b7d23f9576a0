//! gridlock-server
//!
//! Usage: gridlock-server [CONFIG] | --write-default-config

use gridlock::persistence::MemoryGateway;
use gridlock::server;
use gridlock::settings::Settings;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Setup tracing to stdout, or to a daily file when a log directory is set.
/// The guard must live as long as the process.
fn init_tracing(settings: &Settings) -> WorkerGuard {
    let (writer, guard) = match &settings.logging.directory {
        Some(dir) => tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "gridlock.log")),
        None => tracing_appender::non_blocking(io::stdout()),
    };

    let mut filter = EnvFilter::from_default_env();
    for directive in settings.logging.filter.split(',').filter(|d| !d.trim().is_empty()) {
        match directive.trim().parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("Warning: ignoring log directive {:?}: {}", directive, e),
        }
    }

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(filter)
        .with_ansi(settings.logging.directory.is_none())
        .init();
    guard
}

fn main() -> io::Result<()> {
    let arg = std::env::args().nth(1);

    if arg.as_deref() == Some("--write-default-config") {
        let path = Settings::default().save().map_err(io::Error::other)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let config = arg.map(PathBuf::from);
    let settings = Settings::load(config.as_deref()).map_err(io::Error::other)?;
    let _guard = init_tracing(&settings);

    tracing::info!(
        bind = %settings.server.bind,
        grid = %format!("{}x{}", settings.grid.width, settings.grid.height),
        "GRIDLOCK starting up"
    );

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(server::serve(&settings, Arc::new(MemoryGateway::new())));
    if let Err(e) = &result {
        tracing::error!(error = %e, "Server stopped");
    }
    result
}
