use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::model::{DEFAULT_OCCUPANCY_POLICY, OccupancyPolicy};

/// Process configuration, read from `INNKEEP_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub metrics_port: Option<u16>,
    /// JSON array of rooms to seed the in-memory room directory with.
    pub rooms_file: Option<PathBuf>,
    pub occupancy: OccupancyPolicy,
    /// Zero disables the built-in sweeper; `POST /auto-complete` still works.
    pub sweep_interval: Duration,
    /// WAL appends between compactions.
    pub compact_threshold: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            metrics_port: None,
            rooms_file: None,
            occupancy: DEFAULT_OCCUPANCY_POLICY,
            sweep_interval: Duration::from_secs(3600),
            compact_threshold: 1000,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut cfg = Self::default();
        if let Some(v) = get("INNKEEP_BIND") {
            cfg.bind = v;
        }
        if let Some(v) = parsed(&get, "INNKEEP_PORT")? {
            cfg.port = v;
        }
        if let Some(v) = get("INNKEEP_DATA_DIR") {
            cfg.data_dir = PathBuf::from(v);
        }
        cfg.metrics_port = parsed(&get, "INNKEEP_METRICS_PORT")?;
        cfg.rooms_file = get("INNKEEP_ROOMS_FILE").map(PathBuf::from);
        if let Some(v) = parsed(&get, "INNKEEP_OCCUPANCY")? {
            cfg.occupancy = v;
        }
        if let Some(secs) = parsed::<u64>(&get, "INNKEEP_SWEEP_INTERVAL_SECS")? {
            cfg.sweep_interval = Duration::from_secs(secs);
        }
        if let Some(v) = parsed(&get, "INNKEEP_COMPACT_THRESHOLD")? {
            cfg.compact_threshold = v;
        }
        Ok(cfg)
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join("reservations.wal")
    }
}

fn parsed<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|raw| raw.parse::<T>().map_err(|e| format!("{key}={raw}: {e}")))
        .transpose()
}
