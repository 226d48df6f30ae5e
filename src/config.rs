use std::time::Duration;

use chrono::NaiveDate;
use clap::Args;

/// Connection and runtime settings, read from flags or the environment.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,

    /// Pool size
    #[arg(long, env = "ROSTER_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,

    /// Upper bound for a single store read, in seconds
    #[arg(long, env = "ROSTER_READ_TIMEOUT_SECS", default_value_t = 10)]
    pub read_timeout_secs: u64,

    /// Evaluate as of this date instead of today (YYYY-MM-DD)
    #[arg(long, global = true)]
    pub as_of: Option<NaiveDate>,

    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Settings {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs.max(1))
    }

    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "scout_roster_insights=debug,info"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        settings: Settings,
    }

    #[test]
    fn defaults_apply_when_only_url_given() {
        let harness = Harness::parse_from(["test", "--database-url", "postgres://localhost/scouts"]);
        assert_eq!(harness.settings.max_connections, 5);
        assert_eq!(harness.settings.read_timeout(), Duration::from_secs(10));
        assert!(harness.settings.as_of.is_none());
        assert_eq!(harness.settings.default_log_filter(), "info");
    }

    #[test]
    fn as_of_parses_iso_date() {
        let harness = Harness::parse_from([
            "test",
            "--database-url",
            "postgres://localhost/scouts",
            "--as-of",
            "2026-03-15",
            "--read-timeout-secs",
            "0",
        ]);
        assert_eq!(harness.settings.as_of, NaiveDate::from_ymd_opt(2026, 3, 15));
        assert_eq!(harness.settings.read_timeout(), Duration::from_secs(1));
    }
}
