//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system from the `RUST_LOG` environment variable
pub fn init() {
    env_logger::init();
}

/// Initialize the logging system with an explicit filter such as `"info"`
/// or `"scene_engine=debug"`.
///
/// `RUST_LOG` still takes precedence when it is set.
///
/// # Errors
///
/// Returns an error if a global logger has already been installed.
pub fn init_with_level(filter: &str) -> Result<(), log::SetLoggerError> {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(filter);
    if let Ok(env_filter) = std::env::var("RUST_LOG") {
        builder.parse_filters(&env_filter);
    }
    builder.try_init()
}
