use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Map the number of `-v` flags to a level for our own crates.
pub fn level_for(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the stderr subscriber. `RUST_LOG` overrides the `-v` level.
pub fn init(verbose: u8) {
    let level = level_for(verbose);
    let default_filter = format!("recipebox={level},recipebox_core={level}");
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
