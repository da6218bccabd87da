//! Version 1 of the command surface the UI shell invokes.
//!
//! Commands accept the loosely typed values a frontend sends (string keys,
//! plain integers), parse them into the core's enums and return
//! JSON-friendly payloads. Errors are flattened to strings for the bridge.

use std::sync::Arc;

use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::entitlements::{Limit, PremiumFeature, PremiumFeatures, ResourceKind, Tier};
use crate::mood::{Mood, MusicGenre};
use crate::session::Session;
use crate::wallpaper::{Catalog, WallpaperItem};

/// Shared state injected into each command.
#[derive(Clone)]
pub struct ApiState {
    pub session: Arc<Session>,
    pub catalog: Arc<Catalog>,
}

#[derive(Debug, Serialize)]
pub struct ResourceLimitView {
    pub kind: ResourceKind,
    pub limit: Limit,
}

#[derive(Debug, Serialize)]
pub struct PlanStatusView {
    pub tier: Tier,
    pub is_premium: bool,
    pub trial_used: bool,
    pub trial_end_date: Option<String>,
    pub is_first_login: bool,
    pub limits: Vec<ResourceLimitView>,
    pub features: PremiumFeatures,
}

/// Snapshot of the current plan for badges and plan pickers.
pub fn plan_status(state: &ApiState) -> PlanStatusView {
    let entitlements = state.session.entitlements();
    let mgr = entitlements.read();
    let subscription = mgr.subscription();
    PlanStatusView {
        tier: subscription.tier,
        is_premium: mgr.is_premium(),
        trial_used: subscription.trial_used,
        trial_end_date: subscription
            .trial_end_date
            .and_then(|end| end.format(&Rfc3339).ok()),
        is_first_login: subscription.is_first_login,
        limits: ResourceKind::ALL
            .iter()
            .map(|kind| ResourceLimitView {
                kind: *kind,
                limit: mgr.limit(*kind),
            })
            .collect(),
        features: subscription.premium_features,
    }
}

#[derive(Debug, Serialize)]
pub struct CreateCheck {
    pub kind: ResourceKind,
    pub allowed: bool,
    pub limit: Limit,
    pub remaining: Limit,
    pub message: Option<String>,
}

/// Ask whether one more `kind` may be created given `current_count`.
pub fn check_create(state: &ApiState, kind: &str, current_count: u32) -> Result<CreateCheck, String> {
    let kind = kind.parse::<ResourceKind>().map_err(|e| e.to_string())?;
    let entitlements = state.session.entitlements();
    let mgr = entitlements.read();
    let verdict = mgr.ensure_can_create(kind, current_count);
    Ok(CreateCheck {
        kind,
        allowed: verdict.is_ok(),
        limit: mgr.limit(kind),
        remaining: mgr.remaining(kind, current_count),
        message: verdict.err().map(|e| e.to_string()),
    })
}

pub fn upgrade_plan(state: &ApiState) -> Result<PlanStatusView, String> {
    state.session.upgrade().map_err(|e| e.to_string())?;
    Ok(plan_status(state))
}

/// Callers must have collected the user's confirmation first.
pub fn downgrade_plan(state: &ApiState) -> Result<PlanStatusView, String> {
    state.session.downgrade().map_err(|e| e.to_string())?;
    Ok(plan_status(state))
}

/// Start a premium trial; `days` defaults to the configured trial length.
pub fn start_trial(state: &ApiState, days: Option<u32>) -> Result<PlanStatusView, String> {
    let now = OffsetDateTime::now_utc();
    let days = days.unwrap_or(state.session.settings().trial_days);
    state
        .session
        .start_trial_days(days, now)
        .map_err(|e| e.to_string())?;
    Ok(plan_status(state))
}

pub fn premium_feature(state: &ApiState, feature: &str) -> Result<bool, String> {
    let feature = feature.parse::<PremiumFeature>().map_err(|e| e.to_string())?;
    Ok(state.session.has_premium_feature(feature))
}

#[derive(Debug, Serialize)]
pub struct MoodView {
    pub id: &'static str,
    pub emoji: &'static str,
    pub color: &'static str,
    pub default_music: MusicGenre,
}

pub fn list_moods() -> Vec<MoodView> {
    Mood::ALL
        .iter()
        .map(|mood| MoodView {
            id: mood.id(),
            emoji: mood.emoji(),
            color: mood.color(),
            default_music: mood.default_music(),
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct WallpaperListView {
    pub mood: Mood,
    pub available: Vec<WallpaperItem>,
    /// Ids shown with a lock badge in the picker.
    pub locked: Vec<String>,
}

/// Wallpapers for a mood split by what the current tier unlocks.
pub fn list_wallpapers(state: &ApiState, mood: &str) -> Result<WallpaperListView, String> {
    let mood = mood.parse::<Mood>().map_err(|e| e.to_string())?;
    let gate = state.session.entitlements();
    let available: Vec<WallpaperItem> = state
        .catalog
        .available(mood, &gate)
        .into_iter()
        .cloned()
        .collect();
    let locked = state
        .catalog
        .all(mood)
        .iter()
        .filter(|item| !available.iter().any(|open| open.id == item.id))
        .map(|item| item.id.clone())
        .collect();
    Ok(WallpaperListView {
        mood,
        available,
        locked,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::CoreSettings;
    use crate::store::MemorySubscriptionRepository;

    fn state() -> ApiState {
        let repo = Arc::new(MemorySubscriptionRepository::new());
        let session = Session::open(repo, CoreSettings::default(), None, OffsetDateTime::now_utc()).unwrap();
        ApiState {
            session: Arc::new(session),
            catalog: Arc::new(Catalog::builtin()),
        }
    }

    #[test]
    fn check_create_reports_limit_message() {
        let state = state();
        let ok = check_create(&state, "notes", 4).unwrap();
        assert!(ok.allowed);
        assert_eq!(ok.remaining, Limit::Finite(1));

        let blocked = check_create(&state, "notes", 5).unwrap();
        assert!(!blocked.allowed);
        assert_eq!(blocked.message.as_deref(), Some("Free plan is limited to 5 notes"));
    }

    #[test]
    fn unknown_string_keys_are_rejected() {
        let state = state();
        assert!(check_create(&state, "folders", 0).unwrap_err().contains("unknown resource kind"));
        assert!(list_wallpapers(&state, "sleepy").unwrap_err().contains("unknown mood"));
        assert!(premium_feature(&state, "teleport").unwrap_err().contains("unknown premium feature"));
    }

    #[test]
    fn plan_changes_flow_through_status() {
        let state = state();
        let status = upgrade_plan(&state).unwrap();
        assert!(status.is_premium);
        assert!(status.limits.iter().all(|view| view.limit == Limit::Unbounded));
        assert!(premium_feature(&state, "premiumWallpapers").unwrap());

        let status = downgrade_plan(&state).unwrap();
        assert!(!status.is_premium);
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["limits"][0], serde_json::json!({ "kind": "notes", "limit": 5 }));
    }

    #[test]
    fn status_read_during_plan_changes_is_consistent() {
        let state = state();
        std::thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..200 {
                    state.session.upgrade().unwrap();
                    state.session.downgrade().unwrap();
                }
            });
            for _ in 0..200 {
                let status = plan_status(&state);
                let unbounded = status.limits.iter().all(|view| view.limit == Limit::Unbounded);
                assert_eq!(status.is_premium, unbounded);
                assert_eq!(status.tier == Tier::Premium, unbounded);
            }
        });
    }

    #[test]
    fn trial_status_carries_end_date() {
        let state = state();
        let status = start_trial(&state, None).unwrap();
        assert!(status.is_premium);
        assert!(status.trial_used);
        assert!(status.trial_end_date.is_some());
        assert!(start_trial(&state, Some(0)).is_err());
    }

    #[test]
    fn wallpaper_listing_marks_locked_items() {
        let state = state();
        let listing = list_wallpapers(&state, "energetic").unwrap();
        assert_eq!(listing.available.len(), 1);
        assert_eq!(
            listing.locked,
            ["energetic-video-1", "energetic-video-2", "energetic-video-3"]
        );
        upgrade_plan(&state).unwrap();
        assert!(list_wallpapers(&state, "energetic").unwrap().locked.is_empty());
    }

    #[test]
    fn moods_are_listed_in_fixed_order() {
        let ids: Vec<&str> = list_moods().iter().map(|view| view.id).collect();
        assert_eq!(ids, ["happy", "focused", "relaxed", "energetic", "creative", "calm"]);
    }
}
