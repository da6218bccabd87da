//! Per-user session wiring around the entitlement manager.
//!
//! The session is the caller the core expects: it loads and saves the
//! subscription through an injected repository, performs the trial-expiry
//! check explicitly, records plan changes in the audit log and tells every
//! open wallpaper view when the tier changes so it can re-filter.

use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::runtime::Handle;

use crate::db::DbPool;
use crate::entitlements::{
    EntitlementManager, Limit, PremiumFeature, PremiumGate, ResourceKind, Subscription, Tier,
};
use crate::errors::CozyError;
use crate::logging::{record_event, AuditEvent};
use crate::mood::Mood;
use crate::pomodoro::Pomodoro;
use crate::settings::CoreSettings;
use crate::store::SubscriptionRepository;
use crate::wallpaper::rotation::RotatorRef;
use crate::wallpaper::{Catalog, SharedGate, WallpaperRotator};

const AUDIT_MODULE: &str = "plan";

/// Cloneable, lock-guarded handle to the session's entitlement manager.
#[derive(Clone)]
pub struct SharedEntitlements(Arc<RwLock<EntitlementManager>>);

impl SharedEntitlements {
    fn new(manager: EntitlementManager) -> Self {
        Self(Arc::new(RwLock::new(manager)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, EntitlementManager> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, EntitlementManager> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PremiumGate for SharedEntitlements {
    fn is_premium(&self) -> bool {
        self.read().is_premium()
    }
}

pub struct Session {
    repo: Arc<dyn SubscriptionRepository>,
    audit: Option<DbPool>,
    settings: CoreSettings,
    entitlements: SharedEntitlements,
    views: Mutex<Vec<RotatorRef>>,
}

impl Session {
    /// Load the user's subscription, creating the free plan on a first login,
    /// then downgrade if a trial ended before `now`.
    pub fn open(
        repo: Arc<dyn SubscriptionRepository>,
        settings: CoreSettings,
        audit: Option<DbPool>,
        now: OffsetDateTime,
    ) -> Result<Self> {
        let stored = repo.load()?;
        let first_login = stored.is_none();
        let manager = match stored {
            Some(subscription) => EntitlementManager::new(subscription, settings.free_limits),
            None => EntitlementManager::free(settings.free_limits),
        };
        if first_login {
            repo.save(manager.subscription())?;
        }

        let session = Self {
            repo,
            audit,
            settings,
            entitlements: SharedEntitlements::new(manager),
            views: Mutex::new(Vec::new()),
        };
        if first_login {
            session.audit(
                AuditEvent::info(AUDIT_MODULE, "PLN-0001", "first login detected")
                    .explain("New users always start on the free plan"),
            );
        }
        session.check_trial_expiry(now)?;
        Ok(session)
    }

    pub fn settings(&self) -> &CoreSettings {
        &self.settings
    }

    /// Gate handle for components that only need to ask "is premium".
    pub fn entitlements(&self) -> SharedEntitlements {
        self.entitlements.clone()
    }

    pub fn subscription(&self) -> Subscription {
        self.entitlements.read().subscription().clone()
    }

    pub fn tier(&self) -> Tier {
        self.entitlements.read().tier()
    }

    pub fn is_premium(&self) -> bool {
        self.entitlements.read().is_premium()
    }

    pub fn can_create_more(&self, kind: ResourceKind, current_count: u32) -> bool {
        self.entitlements.read().can_create_more(kind, current_count)
    }

    pub fn ensure_can_create(&self, kind: ResourceKind, current_count: u32) -> Result<(), CozyError> {
        self.entitlements.read().ensure_can_create(kind, current_count)
    }

    pub fn limit(&self, kind: ResourceKind) -> Limit {
        self.entitlements.read().limit(kind)
    }

    pub fn remaining(&self, kind: ResourceKind, current_count: u32) -> Limit {
        self.entitlements.read().remaining(kind, current_count)
    }

    pub fn has_premium_feature(&self, feature: PremiumFeature) -> bool {
        self.entitlements.read().has_premium_feature(feature)
    }

    pub fn is_first_login(&self) -> bool {
        self.entitlements.read().is_first_login()
    }

    pub fn reset_first_login_flag(&self) -> Result<()> {
        self.transition(|mgr| {
            mgr.reset_first_login_flag();
            Ok(())
        })
    }

    pub fn upgrade(&self) -> Result<()> {
        self.transition(|mgr| {
            mgr.upgrade();
            Ok(())
        })?;
        self.audit(AuditEvent::info(AUDIT_MODULE, "PLN-0002", "upgraded to premium"));
        Ok(())
    }

    /// The user has already confirmed by the time this is called.
    pub fn downgrade(&self) -> Result<()> {
        self.transition(|mgr| {
            mgr.downgrade();
            Ok(())
        })?;
        self.audit(AuditEvent::info(AUDIT_MODULE, "PLN-0003", "downgraded to free"));
        Ok(())
    }

    /// Start a trial of the configured length.
    pub fn start_trial(&self, now: OffsetDateTime) -> Result<OffsetDateTime> {
        self.start_trial_days(self.settings.trial_days, now)
    }

    pub fn start_trial_days(&self, duration_days: u32, now: OffsetDateTime) -> Result<OffsetDateTime> {
        let end = self.transition(|mgr| mgr.start_trial_at(duration_days, now))?;
        self.audit(
            AuditEvent::info(AUDIT_MODULE, "PLN-0004", "premium trial started").data(json!({
                "days": duration_days,
                "ends_at": end.format(&Rfc3339).ok(),
            })),
        );
        Ok(end)
    }

    /// Downgrade if a trial has run out by `now`. Returns whether it did.
    pub fn check_trial_expiry(&self, now: OffsetDateTime) -> Result<bool> {
        let expired = self.transition(|mgr| {
            if !mgr.is_trial_expired(now) {
                return Ok(None);
            }
            let ended_at = mgr.trial_end_date();
            mgr.downgrade();
            Ok(Some(ended_at))
        })?;
        let Some(ended_at) = expired else {
            return Ok(false);
        };
        self.audit(
            AuditEvent::warn(AUDIT_MODULE, "PLN-0005", "premium trial expired")
                .explain("Trial end date passed; reverted to the free plan")
                .data(json!({ "ended_at": ended_at.and_then(|t| t.format(&Rfc3339).ok()) })),
        );
        Ok(true)
    }

    /// Open a wallpaper view gated by this session's tier. The view is told
    /// about every later tier change for as long as the caller keeps it.
    pub fn open_wallpaper_view(
        &self,
        catalog: Arc<Catalog>,
        mood: Mood,
        runtime: Handle,
    ) -> Result<WallpaperRotator> {
        let selection = self.settings.rotation.selection()?;
        let gate: SharedGate = Arc::new(self.entitlements.clone());
        let view = WallpaperRotator::new(catalog, mood, gate, selection, runtime);
        let mut views = self.views.lock().unwrap_or_else(PoisonError::into_inner);
        views.retain(RotatorRef::is_open);
        views.push(view.watcher());
        Ok(view)
    }

    /// Pomodoro timer using the configured durations.
    pub fn new_pomodoro(&self) -> Pomodoro {
        Pomodoro::new(self.settings.pomodoro)
    }

    /// Apply `change` to a copy, persist it, then commit. Nothing is saved
    /// when the change leaves the subscription as it was. Views are notified
    /// after the write lock is released since they read the tier back.
    fn transition<T>(
        &self,
        change: impl FnOnce(&mut EntitlementManager) -> Result<T, CozyError>,
    ) -> Result<T> {
        let (out, before, after) = {
            let mut guard = self.entitlements.write();
            let mut next = guard.clone();
            let out = change(&mut next)?;
            if next.subscription() == guard.subscription() {
                return Ok(out);
            }
            self.repo
                .save(next.subscription())
                .map_err(|err| anyhow!("failed to persist subscription: {err:#}"))?;
            let before = guard.tier();
            *guard = next;
            (out, before, guard.tier())
        };
        if before != after {
            log::info!("tier changed from {} to {}", before.as_str(), after.as_str());
            self.notify_views();
        }
        Ok(out)
    }

    fn notify_views(&self) {
        let mut views = self.views.lock().unwrap_or_else(PoisonError::into_inner);
        views.retain(|view| view.notify_entitlement_change());
    }

    fn audit(&self, event: AuditEvent<'_>) {
        let Some(pool) = &self.audit else {
            log::info!("[{}] {}", event.module, event.message);
            return;
        };
        match pool.get() {
            Ok(conn) => {
                if let Err(err) = record_event(&conn, &event) {
                    log::warn!("failed to record audit event: {err}");
                }
            }
            Err(err) => log::warn!("audit log unavailable: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_db;
    use crate::entitlements::ResourceLimits;
    use crate::logging::recent_events;
    use crate::store::{MemorySubscriptionRepository, SqliteSubscriptionRepository};
    use crate::wallpaper::RotationState;
    use std::sync::Barrier;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2026-05-01 10:00 UTC);

    fn open_memory(repo: Arc<MemorySubscriptionRepository>) -> Session {
        Session::open(repo, CoreSettings::default(), None, NOW).unwrap()
    }

    #[test]
    fn first_login_persists_free_defaults() {
        let repo = Arc::new(MemorySubscriptionRepository::new());
        let session = open_memory(repo.clone());
        assert!(!session.is_premium());
        assert!(session.is_first_login());
        let stored = repo.stored().unwrap();
        assert_eq!(stored.tier, Tier::Free);
        assert_eq!(stored.limits, ResourceLimits::finite(10, 5, 3));
    }

    #[test]
    fn plan_changes_are_saved() {
        let repo = Arc::new(MemorySubscriptionRepository::new());
        let session = open_memory(repo.clone());
        session.upgrade().unwrap();
        assert_eq!(repo.stored().unwrap().tier, Tier::Premium);
        assert!(session.can_create_more(ResourceKind::Notes, 99));
        session.downgrade().unwrap();
        assert_eq!(repo.stored().unwrap().limits, ResourceLimits::default());
        session.reset_first_login_flag().unwrap();
        assert!(!repo.stored().unwrap().is_first_login);
    }

    #[test]
    fn expired_trial_downgrades_on_open() {
        let mut mgr = EntitlementManager::free(ResourceLimits::default());
        mgr.start_trial_at(14, datetime!(2026-04-01 10:00 UTC)).unwrap();
        let repo = Arc::new(MemorySubscriptionRepository::with(mgr.subscription().clone()));

        let session = open_memory(repo.clone());
        assert!(!session.is_premium());
        assert_eq!(session.subscription().trial_end_date, None);
        assert!(session.subscription().trial_used);
        assert_eq!(repo.stored().unwrap().tier, Tier::Free);
    }

    #[test]
    fn running_trial_survives_open_until_checked_later() {
        let repo = Arc::new(MemorySubscriptionRepository::new());
        let session = open_memory(repo);
        let end = session.start_trial(NOW).unwrap();
        assert_eq!(end, datetime!(2026-05-15 10:00 UTC));
        assert!(session.is_premium());
        assert!(!session.check_trial_expiry(datetime!(2026-05-10 10:00 UTC)).unwrap());
        assert!(session.check_trial_expiry(end).unwrap());
        assert!(!session.is_premium());
    }

    #[test]
    fn zero_day_trial_changes_nothing() {
        let repo = Arc::new(MemorySubscriptionRepository::new());
        let session = open_memory(repo.clone());
        assert!(session.start_trial_days(0, NOW).is_err());
        assert_eq!(repo.stored().unwrap().tier, Tier::Free);
    }

    #[test]
    fn audit_events_land_in_event_log() {
        let pool = init_memory_db().unwrap();
        let repo = Arc::new(SqliteSubscriptionRepository::new(pool.clone(), "dana"));
        let session = Session::open(repo, CoreSettings::default(), Some(pool.clone()), NOW).unwrap();
        session.upgrade().unwrap();
        session.downgrade().unwrap();

        let conn = pool.get().unwrap();
        let codes: Vec<String> = recent_events(&conn, "plan", 10)
            .unwrap()
            .into_iter()
            .filter_map(|event| event.code)
            .collect();
        assert!(codes.contains(&"PLN-0001".to_string()));
        assert!(codes.contains(&"PLN-0002".to_string()));
        assert!(codes.contains(&"PLN-0003".to_string()));
    }

    #[test]
    fn custom_free_limits_are_restored_on_downgrade() {
        let mut settings = CoreSettings::default();
        settings.free_limits = ResourceLimits::finite(1, 2, 1);
        let repo = Arc::new(MemorySubscriptionRepository::new());
        let session = Session::open(repo, settings, None, NOW).unwrap();
        assert!(!session.can_create_more(ResourceKind::Notes, 2));
        session.upgrade().unwrap();
        session.downgrade().unwrap();
        assert_eq!(session.limit(ResourceKind::Notes), Limit::Finite(2));
        assert!(matches!(
            session.ensure_can_create(ResourceKind::Tasks, 1),
            Err(CozyError::LimitReached { .. })
        ));
    }

    #[test]
    fn pomodoro_uses_configured_durations() {
        let mut settings = CoreSettings::default();
        settings.pomodoro.work_secs = 50 * 60;
        let repo = Arc::new(MemorySubscriptionRepository::new());
        let session = Session::open(repo, settings, None, NOW).unwrap();
        assert_eq!(session.new_pomodoro().display(), "50:00");
    }

    #[tokio::test(start_paused = true)]
    async fn downgrade_refilters_open_views() {
        let repo = Arc::new(MemorySubscriptionRepository::new());
        let session = open_memory(repo);
        session.upgrade().unwrap();
        let view = session
            .open_wallpaper_view(Arc::new(Catalog::builtin()), Mood::Happy, Handle::current())
            .unwrap();
        assert_eq!(view.rotation_state(), RotationState::Running);
        for _ in 0..3 {
            view.advance();
        }
        assert_eq!(view.current_index(), 3);

        session.downgrade().unwrap();
        assert_eq!(view.current_index(), 0);
        assert_eq!(view.current().unwrap().id, "happy-1");
        assert_eq!(view.rotation_state(), RotationState::Stopped);

        session.upgrade().unwrap();
        assert_eq!(view.rotation_state(), RotationState::Running);
        assert_eq!(view.available().len(), 4);
    }

    #[test]
    fn upgrade_after_trial_end_is_not_undone_by_expiry_check() {
        let repo = Arc::new(MemorySubscriptionRepository::new());
        let session = open_memory(repo.clone());
        let end = session.start_trial(NOW).unwrap();
        session.upgrade().unwrap();
        assert_eq!(session.subscription().trial_end_date, None);

        assert!(!session.check_trial_expiry(end).unwrap());
        assert!(session.is_premium());
        assert_eq!(repo.stored().unwrap().tier, Tier::Premium);
    }

    #[test]
    fn concurrent_upgrade_and_expiry_check_keep_premium() {
        for _ in 0..500 {
            let repo = Arc::new(MemorySubscriptionRepository::new());
            let session = open_memory(repo.clone());
            let end = session.start_trial(NOW).unwrap();
            let barrier = Barrier::new(2);
            std::thread::scope(|scope| {
                scope.spawn(|| {
                    barrier.wait();
                    session.check_trial_expiry(end).unwrap();
                });
                scope.spawn(|| {
                    barrier.wait();
                    session.upgrade().unwrap();
                });
            });
            assert!(session.is_premium());
            assert_eq!(session.subscription().trial_end_date, None);
            assert_eq!(repo.stored().unwrap().tier, Tier::Premium);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn closed_views_are_pruned() {
        let repo = Arc::new(MemorySubscriptionRepository::new());
        let session = open_memory(repo);
        let view = session
            .open_wallpaper_view(Arc::new(Catalog::builtin()), Mood::Calm, Handle::current())
            .unwrap();
        drop(view);
        session.upgrade().unwrap();
        assert!(session.views.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reopening_views_does_not_accumulate_dead_handles() {
        let repo = Arc::new(MemorySubscriptionRepository::new());
        let session = open_memory(repo);
        let catalog = Arc::new(Catalog::builtin());
        for _ in 0..10 {
            let view = session
                .open_wallpaper_view(catalog.clone(), Mood::Calm, Handle::current())
                .unwrap();
            drop(view);
        }
        let _kept = session
            .open_wallpaper_view(catalog, Mood::Calm, Handle::current())
            .unwrap();
        assert_eq!(session.views.lock().unwrap().len(), 1);
    }
}
