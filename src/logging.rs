//! ## Logging Configuration
//!
//! This module sets up logging automatically at program startup using the `ctor` crate.
//! Logging behavior is controlled by the `DEBUG_CHURN_PIPELINE` environment variable:
//!
//! - **Disabled** (default): If the variable is unset, empty, or explicitly set to `"0"` or `"false"`,
//!   no logging will be initialized.
//! - **Enabled**: Any other value enables logging with a maximum log level of `DEBUG`.
//!
//! Binaries that want INFO-level output without the debug switch call [`init_default`].
//!
//! ### Usage Example
//!
//! ```sh
//! export DEBUG_CHURN_PIPELINE=true
//! ```

use ctor::ctor;
use tracing::Level;

/// Environment variable that switches on debug logging.
pub const DEBUG_ENV_VAR: &str = "DEBUG_CHURN_PIPELINE";

fn debug_enabled(value: Option<&str>) -> bool {
    value.map_or(false, |v| !(v == "0" || v == "false" || v.is_empty()))
}

#[ctor]
fn set_debug_level() {
    if debug_enabled(std::env::var(DEBUG_ENV_VAR).ok().as_deref()) {
        let _ = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .try_init();
    }
}

/// Installs an INFO-level subscriber unless one is already active.
pub fn init_default() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .try_init();
}
