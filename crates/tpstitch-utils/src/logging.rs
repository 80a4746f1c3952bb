use std::io::IsTerminal;

/// Install the global `tracing` subscriber for a command line tool.
///
/// Logs go to stderr. The `default_level` applies unless the `TPSTITCH_LOG` environment variable
/// provides an [EnvFilter](tracing_subscriber::EnvFilter) directive. ANSI colors are only used when
/// stderr is a terminal.
pub fn init_tracing(default_level: tracing::Level) {
    let use_color = std::io::stderr().is_terminal();

    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var("TPSTITCH_LOG")
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(use_color)
        .with_writer(std::io::stderr)
        .init();
}
