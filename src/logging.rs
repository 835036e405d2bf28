//! Logging bootstrap shared by the binaries.

use flexi_logger::{colored_default_format, Logger};

/// Console logging at the level from `RUST_LOG`, defaulting to info.
pub fn setup_logging() -> std::result::Result<(), Box<dyn std::error::Error>> {
    Logger::try_with_env_or_str("info")?
        .format(colored_default_format)
        .start()?;
    Ok(())
}
