// Logging setup. The level is decided once, from the active site and the
// command line, and installed before any command runs.

use crate::config::Site;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Logging configuration for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    pub level: Level,
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings { level: Level::INFO }
    }
}

impl LogSettings {
    /// `debug` and `verbose` sites log at debug level, anything else at info.
    /// `verbose` forces debug regardless of the site.
    pub fn for_site(site: Option<&Site>, verbose: bool) -> Self {
        let site_debug = site
            .map(|s| level_is_debug(&s.log_level))
            .unwrap_or(false);
        if verbose || site_debug {
            LogSettings {
                level: Level::DEBUG,
            }
        } else {
            LogSettings::default()
        }
    }

    /// Filter directive for this crate and its dependencies. Dependencies
    /// stay at warn so HTTP internals do not flood debug output.
    pub fn directive(&self) -> String {
        format!("warn,dcron_cli={}", self.level.to_string().to_lowercase())
    }

    /// Install the global subscriber. `RUST_LOG` overrides the computed level.
    pub fn init(&self) -> anyhow::Result<()> {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directive()));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))
    }
}

fn level_is_debug(log_level: &str) -> bool {
    matches!(
        log_level.to_ascii_lowercase().as_str(),
        "debug" | "verbose"
    )
}
