// Runtime configuration: one row, id 0, seeded in init.

use serde_json::Value;
use spacetimedb::{reducer, table, ReducerContext, SpacetimeType, Table};
use thiserror::Error;

use crate::authorized_worker;
use crate::clock;

/// Singleton key of the config row
pub const CONFIG_ID: u32 = 0;

/// Who earns match points
#[derive(SpacetimeType, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuestPoints {
    /// Players without an account are recorded with 0 points
    AccountsOnly,
    Everyone,
}

/// Tunables for the Blitz calendar, eliminations and payouts
#[table(name = game_config, public)]
#[derive(Clone, Debug, PartialEq)]
pub struct GameConfig {
    #[primary_key]
    pub id: u32,

    /// Local minutes after midnight when the Blitz lobby opens
    pub lobby_open_minute: u32,

    /// Local minutes after midnight when the Blitz starts
    pub start_minute: u32,

    /// IANA zone of the Blitz calendar
    pub time_zone: String,

    /// Seconds between elimination checks
    pub elimination_interval_secs: u64,

    /// Two players go per tick while more than this many are active
    pub double_elimination_above: u32,

    /// Blitz pool per rank, rank 1 first
    pub rank_points: Vec<u32>,

    /// Cadence of the internal scheduler rows
    pub scheduler_interval_secs: u64,

    pub guest_points: GuestPoints,

    pub notify_title: String,
    pub notify_body: String,
    pub notify_url: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            id: CONFIG_ID,
            lobby_open_minute: 19 * 60 + 45,
            start_minute: 20 * 60,
            time_zone: "Europe/Stockholm".to_string(),
            elimination_interval_secs: 300,
            double_elimination_above: 10,
            rank_points: vec![10, 5, 3],
            scheduler_interval_secs: 60,
            guest_points: GuestPoints::AccountsOnly,
            notify_title: "Kvällsblitz".to_string(),
            notify_body: "Om 15 minuter börjar kvällsblitz, gå med nu!!".to_string(),
            notify_url: "https://12-an.vercel.app".to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid JSON: {0}")]
    Json(String),

    #[error("expected a JSON object of overrides")]
    NotAnObject,

    #[error("unknown config key '{0}'")]
    UnknownKey(String),

    #[error("bad value for '{key}': expected {expected}")]
    BadValue { key: String, expected: &'static str },

    #[error("{0}")]
    Invalid(&'static str),
}

fn as_u32(key: &str, value: &Value) -> Result<u32, ConfigError> {
    value
        .as_u64()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| ConfigError::BadValue { key: key.to_string(), expected: "a non-negative integer" })
}

fn as_u64(key: &str, value: &Value) -> Result<u64, ConfigError> {
    value
        .as_u64()
        .ok_or_else(|| ConfigError::BadValue { key: key.to_string(), expected: "a non-negative integer" })
}

fn as_string(key: &str, value: &Value) -> Result<String, ConfigError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ConfigError::BadValue { key: key.to_string(), expected: "a string" })
}

impl GameConfig {
    /// Current config, or the defaults if the row is missing
    pub fn load(ctx: &ReducerContext) -> GameConfig {
        ctx.db.game_config().id().find(&CONFIG_ID).unwrap_or_default()
    }

    /// Apply a partial JSON object. Nothing changes unless every key is valid.
    /// Returns the keys that were applied.
    pub fn apply_overrides(&mut self, json: &str) -> Result<Vec<String>, ConfigError> {
        let parsed: Value = serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))?;
        let Value::Object(overrides) = parsed else {
            return Err(ConfigError::NotAnObject);
        };

        let mut next = self.clone();
        for (key, value) in &overrides {
            match key.as_str() {
                "lobby_open_minute" => next.lobby_open_minute = as_u32(key, value)?,
                "start_minute" => next.start_minute = as_u32(key, value)?,
                "time_zone" => next.time_zone = as_string(key, value)?,
                "elimination_interval_secs" => next.elimination_interval_secs = as_u64(key, value)?,
                "double_elimination_above" => next.double_elimination_above = as_u32(key, value)?,
                "rank_points" => {
                    let items = value
                        .as_array()
                        .ok_or_else(|| ConfigError::BadValue { key: key.clone(), expected: "an array of integers" })?;
                    next.rank_points = items.iter().map(|v| as_u32(key, v)).collect::<Result<_, _>>()?;
                }
                "scheduler_interval_secs" => next.scheduler_interval_secs = as_u64(key, value)?,
                "guest_points" => {
                    next.guest_points = match value.as_str() {
                        Some("accounts_only") => GuestPoints::AccountsOnly,
                        Some("everyone") => GuestPoints::Everyone,
                        _ => {
                            return Err(ConfigError::BadValue {
                                key: key.clone(),
                                expected: "\"accounts_only\" or \"everyone\"",
                            })
                        }
                    };
                }
                "notify_title" => next.notify_title = as_string(key, value)?,
                "notify_body" => next.notify_body = as_string(key, value)?,
                "notify_url" => next.notify_url = as_string(key, value)?,
                _ => return Err(ConfigError::UnknownKey(key.clone())),
            }
        }

        next.validate()?;
        *self = next;
        Ok(overrides.keys().cloned().collect())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.start_minute >= 24 * 60 || self.lobby_open_minute >= 24 * 60 {
            return Err(ConfigError::Invalid("minutes must fall within one day"));
        }
        if self.lobby_open_minute > self.start_minute {
            return Err(ConfigError::Invalid("lobby must open before the start"));
        }
        if self.elimination_interval_secs == 0 || self.scheduler_interval_secs == 0 {
            return Err(ConfigError::Invalid("intervals must be positive"));
        }
        if clock::parse_zone(&self.time_zone).is_none() {
            return Err(ConfigError::Invalid("time_zone must be an IANA zone name"));
        }
        if self.rank_points.is_empty() {
            return Err(ConfigError::Invalid("rank_points needs at least one rank"));
        }
        Ok(())
    }
}

/// Seed the config row if missing
pub fn ensure_config(ctx: &ReducerContext) -> GameConfig {
    if let Some(existing) = ctx.db.game_config().id().find(&CONFIG_ID) {
        return existing;
    }
    let config = GameConfig::default();
    ctx.db.game_config().insert(config.clone());
    log::info!("[CONFIG] seeded defaults");
    config
}

/// Apply JSON overrides to the live config (authorized workers only)
#[reducer]
pub fn update_config(ctx: &ReducerContext, overrides: String) -> Result<(), String> {
    if ctx.db.authorized_worker().identity().find(&ctx.sender).is_none() {
        log::warn!("[CONFIG] unauthorized update attempt by {}", ctx.sender);
        return Err("Unauthorized".to_string());
    }

    let mut config = ensure_config(ctx);
    let applied = config.apply_overrides(&overrides).map_err(|e| e.to_string())?;
    ctx.db.game_config().id().update(config.clone());
    log::info!("[CONFIG] updated keys={:?}", applied);

    if changes_schedule(&applied) {
        crate::restart_schedules(ctx, &config);
    }
    Ok(())
}

/// Scheduled rows carry their interval, so a new cadence needs fresh rows
pub fn changes_schedule(applied: &[String]) -> bool {
    applied.iter().any(|key| key == "scheduler_interval_secs")
}
