//! Calcprobe library entry point exposing shared modules.

use std::env;
use std::io;

pub mod config;
pub mod driver;
pub mod markup;
pub mod operations;
pub mod suite;

/// Initialize global tracing subscribers using environment configuration.
///
/// `CALCPROBE_LOG` overrides the default filter and `CALCPROBE_LOG_STYLE`
/// controls ANSI output. The default keeps harness progress visible while
/// silencing the HTTP client internals.
pub fn init_tracing() {
    let env_filter = env::var("CALCPROBE_LOG")
        .ok()
        .and_then(|value| tracing_subscriber::EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| {
            tracing_subscriber::EnvFilter::new("info,reqwest=warn,hyper=warn,hyper_util=warn")
        });
    let mut fmt_builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stdout)
        .with_ansi(false)
        .with_target(false);

    if let Ok(style) = env::var("CALCPROBE_LOG_STYLE") {
        match style.to_ascii_lowercase().as_str() {
            "never" => {}
            "always" => fmt_builder = fmt_builder.with_ansi(true),
            _ => {}
        }
    }

    fmt_builder.init();
}
