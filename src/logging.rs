use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Setup console logging for the inspection binary and ad-hoc debugging.
///
/// The filter honours `RUST_LOG` when set; otherwise `debug_mode` selects
/// between debug and info level.
///
/// # Errors
///
/// Fails if a global subscriber has already been installed.
pub fn setup_logging(debug_mode: bool) -> Result<()> {
    let default_level = if debug_mode { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()?;

    tracing::debug!("logging initialized: debug={}", debug_mode);
    Ok(())
}
