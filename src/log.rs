static INIT: std::sync::Once = std::sync::Once::new();

pub const LOG_ENV: &str = "POPUP_AUTH_LOG";
pub const LOG_PATH_ENV: &str = "POPUP_AUTH_LOG_PATH";

#[cfg(not(target_arch = "wasm32"))]
fn init_tracing_subscriber() {
    use std::io;
    use std::{env, fs};
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::from("off"));
    let b = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false);

    let log_file = env::var(LOG_PATH_ENV).ok().and_then(|p| {
        fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&p)
            .map_err(|e| eprintln!("cannot open log file {p}: {e}"))
            .ok()
    });
    let result = match log_file {
        Some(f) => b.with_writer(f).try_init(),
        None => b.with_writer(io::stderr).try_init(),
    };
    if let Err(e) = result {
        eprintln!("tracing subscriber already set: {e}");
    }
}

#[cfg(target_arch = "wasm32")]
fn init_tracing_subscriber() {
    use tracing_subscriber::fmt::format::Pretty;
    use tracing_subscriber::prelude::*;
    use tracing_web::{MakeWebConsoleWriter, performance_layer};

    // No std::time in the browser.
    let console_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .without_time()
        .with_writer(MakeWebConsoleWriter::new());
    let timing_layer = performance_layer().with_details_from_fields(Pretty::default());

    if let Err(e) = tracing_subscriber::registry()
        .with(console_layer)
        .with(timing_layer)
        .try_init()
    {
        tracing::debug!("Tracing subscriber already set: {e}");
    }
}

/// Installs the process-wide tracing subscriber. Later calls are no-ops.
pub fn set_global_logger() {
    INIT.call_once(|| {
        init_tracing_subscriber();
        tracing::debug!("Logger initialized");
    });
}
