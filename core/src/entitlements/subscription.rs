//! Plain data describing a user's plan.
//!
//! These types carry no behaviour beyond lookups; the rules that mutate them
//! live in [`super::EntitlementManager`]. Everything here is serde friendly so
//! that repositories can persist a [`Subscription`] as a single JSON payload.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::errors::CozyError;

pub const DEFAULT_FREE_TASKS: u32 = 10;
pub const DEFAULT_FREE_NOTES: u32 = 5;
pub const DEFAULT_FREE_DESKTOPS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Premium,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Premium => "premium",
        }
    }
}

/// Countable, limit-gated entities a desktop can own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Notes,
    Tasks,
    Desktops,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [ResourceKind::Notes, ResourceKind::Tasks, ResourceKind::Desktops];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Notes => "notes",
            ResourceKind::Tasks => "tasks",
            ResourceKind::Desktops => "desktops",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = CozyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "notes" => Ok(ResourceKind::Notes),
            "tasks" => Ok(ResourceKind::Tasks),
            "desktops" => Ok(ResourceKind::Desktops),
            other => Err(CozyError::invalid(format!("unknown resource kind: {other}"))),
        }
    }
}

/// A numeric cap or the unbounded sentinel. Serialised as a number or `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<u32>", into = "Option<u32>")]
pub enum Limit {
    Finite(u32),
    Unbounded,
}

impl Limit {
    pub fn allows(&self, current: u32) -> bool {
        match self {
            Limit::Finite(cap) => current < *cap,
            Limit::Unbounded => true,
        }
    }

    pub fn remaining(&self, current: u32) -> Limit {
        match self {
            Limit::Finite(cap) => Limit::Finite(cap.saturating_sub(current)),
            Limit::Unbounded => Limit::Unbounded,
        }
    }
}

impl From<Option<u32>> for Limit {
    fn from(value: Option<u32>) -> Self {
        value.map(Limit::Finite).unwrap_or(Limit::Unbounded)
    }
}

impl From<Limit> for Option<u32> {
    fn from(value: Limit) -> Self {
        match value {
            Limit::Finite(cap) => Some(cap),
            Limit::Unbounded => None,
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Finite(cap) => write!(f, "{cap}"),
            Limit::Unbounded => f.write_str("unlimited"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub tasks: Limit,
    pub notes: Limit,
    pub desktops: Limit,
}

impl ResourceLimits {
    pub fn finite(tasks: u32, notes: u32, desktops: u32) -> Self {
        Self {
            tasks: Limit::Finite(tasks),
            notes: Limit::Finite(notes),
            desktops: Limit::Finite(desktops),
        }
    }

    pub fn unbounded() -> Self {
        Self {
            tasks: Limit::Unbounded,
            notes: Limit::Unbounded,
            desktops: Limit::Unbounded,
        }
    }

    pub fn get(&self, kind: ResourceKind) -> Limit {
        match kind {
            ResourceKind::Tasks => self.tasks,
            ResourceKind::Notes => self.notes,
            ResourceKind::Desktops => self.desktops,
        }
    }
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self::finite(DEFAULT_FREE_TASKS, DEFAULT_FREE_NOTES, DEFAULT_FREE_DESKTOPS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PremiumFeature {
    ExclusiveMusic,
    PremiumWallpapers,
    AdvancedCustomization,
    PrioritySupport,
}

impl FromStr for PremiumFeature {
    type Err = CozyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "exclusiveMusic" | "exclusive_music" => Ok(PremiumFeature::ExclusiveMusic),
            "premiumWallpapers" | "premium_wallpapers" => Ok(PremiumFeature::PremiumWallpapers),
            "advancedCustomization" | "advanced_customization" => {
                Ok(PremiumFeature::AdvancedCustomization)
            }
            "prioritySupport" | "priority_support" => Ok(PremiumFeature::PrioritySupport),
            other => Err(CozyError::invalid(format!("unknown premium feature: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumFeatures {
    pub exclusive_music: bool,
    pub premium_wallpapers: bool,
    pub advanced_customization: bool,
    pub priority_support: bool,
}

impl PremiumFeatures {
    pub fn all() -> Self {
        Self {
            exclusive_music: true,
            premium_wallpapers: true,
            advanced_customization: true,
            priority_support: true,
        }
    }

    pub fn get(&self, feature: PremiumFeature) -> bool {
        match feature {
            PremiumFeature::ExclusiveMusic => self.exclusive_music,
            PremiumFeature::PremiumWallpapers => self.premium_wallpapers,
            PremiumFeature::AdvancedCustomization => self.advanced_customization,
            PremiumFeature::PrioritySupport => self.priority_support,
        }
    }
}

/// Persisted plan state for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(rename = "type")]
    pub tier: Tier,
    pub limits: ResourceLimits,
    pub premium_features: PremiumFeatures,
    #[serde(default)]
    pub trial_used: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub trial_end_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub is_first_login: bool,
}

impl Subscription {
    /// Fresh free plan as handed out on a first login.
    pub fn free(limits: ResourceLimits) -> Self {
        Self {
            tier: Tier::Free,
            limits,
            premium_features: PremiumFeatures::default(),
            trial_used: false,
            trial_end_date: None,
            is_first_login: true,
        }
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::free(ResourceLimits::default())
    }
}
