//! Typed configuration stored as JSON in `app_settings`.

use anyhow::{Context, Result};
use r2d2_sqlite::rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::OffsetDateTime;

use crate::entitlements::ResourceLimits;
use crate::errors::CozyError;
use crate::pomodoro::PomodoroDurations;
use crate::wallpaper::{WallpaperSelection, DEFAULT_ROTATION_INTERVAL};

const SETTINGS_KEY: &str = "cozy.settings";

pub const DEFAULT_TRIAL_DAYS: u32 = 14;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationDefaults {
    pub enabled: bool,
    pub interval_ms: u64,
}

impl RotationDefaults {
    /// Fresh selection state for a newly opened mood view.
    pub fn selection(&self) -> Result<WallpaperSelection, CozyError> {
        WallpaperSelection::new(self.enabled, Duration::from_millis(self.interval_ms))
    }
}

impl Default for RotationDefaults {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: DEFAULT_ROTATION_INTERVAL.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreSettings {
    /// Caps applied to the free tier and restored on downgrade.
    pub free_limits: ResourceLimits,
    pub trial_days: u32,
    pub rotation: RotationDefaults,
    pub pomodoro: PomodoroDurations,
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            free_limits: ResourceLimits::default(),
            trial_days: DEFAULT_TRIAL_DAYS,
            rotation: RotationDefaults::default(),
            pomodoro: PomodoroDurations::default(),
        }
    }
}

/// Read settings, falling back to defaults when nothing is stored yet.
/// Zero trial or rotation values in a stored document are replaced by their
/// defaults.
pub fn load_settings(conn: &Connection) -> Result<CoreSettings> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM app_settings WHERE key = ?1",
            params![SETTINGS_KEY],
            |row| row.get(0),
        )
        .optional()?;

    let Some(raw) = value else {
        return Ok(CoreSettings::default());
    };
    let mut settings: CoreSettings =
        serde_json::from_str(&raw).context("stored core settings are not valid JSON")?;
    if settings.trial_days == 0 {
        log::warn!("stored trial_days is zero; using {DEFAULT_TRIAL_DAYS}");
        settings.trial_days = DEFAULT_TRIAL_DAYS;
    }
    if settings.rotation.interval_ms == 0 {
        let fallback = RotationDefaults::default().interval_ms;
        log::warn!("stored rotation.interval_ms is zero; using {fallback}");
        settings.rotation.interval_ms = fallback;
    }
    Ok(settings)
}

pub fn save_settings(conn: &Connection, settings: &CoreSettings) -> Result<()> {
    if settings.trial_days == 0 {
        return Err(CozyError::invalid("trial_days must be at least one").into());
    }
    if settings.rotation.interval_ms == 0 {
        return Err(CozyError::invalid("rotation.interval_ms must be positive").into());
    }
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let payload = serde_json::to_string(settings)?;
    conn.execute(
        "INSERT INTO app_settings (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![SETTINGS_KEY, payload, now],
    )?;
    Ok(())
}
