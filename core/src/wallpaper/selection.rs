use std::time::Duration;

use super::catalog::{Catalog, WallpaperItem};
use crate::entitlements::PremiumGate;
use crate::errors::CozyError;
use crate::mood::Mood;

pub const DEFAULT_ROTATION_INTERVAL: Duration = Duration::from_millis(30_000);

/// Selection pointer plus rotation preferences for one mood view.
///
/// The index always refers to the *filtered* catalog. Reads go through a
/// modulo so a catalog that shrank after a downgrade never indexes out of
/// range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WallpaperSelection {
    current_index: usize,
    rotation_enabled: bool,
    rotation_interval: Duration,
}

impl WallpaperSelection {
    pub fn new(rotation_enabled: bool, rotation_interval: Duration) -> Result<Self, CozyError> {
        let mut selection = Self {
            current_index: 0,
            rotation_enabled,
            rotation_interval: DEFAULT_ROTATION_INTERVAL,
        };
        selection.set_rotation_interval(rotation_interval)?;
        Ok(selection)
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn rotation_enabled(&self) -> bool {
        self.rotation_enabled
    }

    pub fn rotation_interval(&self) -> Duration {
        self.rotation_interval
    }

    pub fn current<'c, G>(&self, catalog: &'c Catalog, mood: Mood, gate: &G) -> Option<&'c WallpaperItem>
    where
        G: PremiumGate + ?Sized,
    {
        let available = catalog.available(mood, gate);
        if available.is_empty() {
            return None;
        }
        Some(available[self.current_index % available.len()])
    }

    /// Step to the next item, wrapping. Catalogs of one item or fewer stay put.
    pub fn advance<G>(&mut self, catalog: &Catalog, mood: Mood, gate: &G) -> bool
    where
        G: PremiumGate + ?Sized,
    {
        let len = catalog.available(mood, gate).len();
        if len <= 1 {
            return false;
        }
        self.current_index = (self.current_index + 1) % len;
        true
    }

    /// Point at `id` within the filtered catalog. A miss leaves the index
    /// untouched and returns `false`; stale UIs hit this after tier changes.
    pub fn select_by_id<G>(&mut self, catalog: &Catalog, mood: Mood, gate: &G, id: &str) -> bool
    where
        G: PremiumGate + ?Sized,
    {
        match catalog.available(mood, gate).iter().position(|item| item.id == id) {
            Some(index) => {
                self.current_index = index;
                true
            }
            None => false,
        }
    }

    pub fn reset_on_mood_change(&mut self) {
        self.current_index = 0;
    }

    pub fn set_rotation_enabled(&mut self, enabled: bool) {
        self.rotation_enabled = enabled;
    }

    pub fn set_rotation_interval(&mut self, interval: Duration) -> Result<(), CozyError> {
        if interval.is_zero() {
            return Err(CozyError::invalid("rotation interval must be positive"));
        }
        self.rotation_interval = interval;
        Ok(())
    }
}

impl Default for WallpaperSelection {
    fn default() -> Self {
        Self {
            current_index: 0,
            rotation_enabled: true,
            rotation_interval: DEFAULT_ROTATION_INTERVAL,
        }
    }
}
