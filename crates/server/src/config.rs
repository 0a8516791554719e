//! Runtime configuration (§ Configuration of the design).
//!
//! Loaded via the `config` crate: defaults, overridden by environment
//! variables prefixed `REPLAY_` (e.g. `REPLAY_BIND_ADDR`), overridden in
//! turn by explicit CLI flags. Grounded on the teacher's
//! `ServerConfig::default()` + CLI-override pattern in `cli/src/main.rs`,
//! generalized to a three-layer merge since this system has more
//! independent knobs than the teacher's single bind address.

use serde::Deserialize;

/// Resolved configuration for one `replay-server` process.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayConfig {
    /// Address the HTTP listener binds to.
    pub bind_addr: String,
    /// Path to the CSV catalogue source.
    pub catalogue_source: String,
    /// Column name holding the event timestamp, in milliseconds.
    pub timestamp_column: String,
    /// Scheduler tick period, in milliseconds.
    pub publish_tick_millis: u64,
    /// Idle-session TTL, in milliseconds, before the eviction sweep reclaims it.
    pub session_ttl_millis: u64,
    /// How often the eviction sweep runs, in milliseconds.
    pub eviction_sweep_millis: u64,
    /// Bounded outbound channel capacity per session.
    pub outbound_capacity: usize,
}

impl ReplayConfig {
    /// Load configuration: defaults, then `REPLAY_*` environment
    /// variables, then the given CLI overrides (each optional, applied
    /// only when present).
    pub fn load(overrides: ConfigOverrides) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("bind_addr", "0.0.0.0:8080")?
            .set_default("catalogue_source", "catalogue.csv")?
            .set_default("timestamp_column", "timestamp_millis")?
            .set_default("publish_tick_millis", 1i64)?
            .set_default("session_ttl_millis", 3_600_000i64)?
            .set_default("eviction_sweep_millis", 30_000i64)?
            .set_default("outbound_capacity", 1024i64)?
            .add_source(config::Environment::with_prefix("REPLAY"));

        if let Some(v) = overrides.bind_addr {
            builder = builder.set_override("bind_addr", v)?;
        }
        if let Some(v) = overrides.catalogue_source {
            builder = builder.set_override("catalogue_source", v)?;
        }
        if let Some(v) = overrides.publish_tick_millis {
            builder = builder.set_override("publish_tick_millis", v as i64)?;
        }
        if let Some(v) = overrides.session_ttl_millis {
            builder = builder.set_override("session_ttl_millis", v as i64)?;
        }
        if let Some(v) = overrides.outbound_capacity {
            builder = builder.set_override("outbound_capacity", v as i64)?;
        }

        builder.build()?.try_deserialize()
    }
}

/// CLI-supplied overrides, applied over environment and defaults.
#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub bind_addr: Option<String>,
    pub catalogue_source: Option<String>,
    pub publish_tick_millis: Option<u64>,
    pub session_ttl_millis: Option<u64>,
    pub outbound_capacity: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_overrides_them() {
        let config = ReplayConfig::load(ConfigOverrides::default()).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.publish_tick_millis, 1);
        assert_eq!(config.session_ttl_millis, 3_600_000);
        assert_eq!(config.outbound_capacity, 1024);
    }

    #[test]
    fn cli_override_wins_over_default() {
        let config = ReplayConfig::load(ConfigOverrides {
            bind_addr: Some("127.0.0.1:9000".to_string()),
            outbound_capacity: Some(64),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.outbound_capacity, 64);
    }
}
