//! Capability checks and plan transitions for a single session.
//!
//! The manager never stores resource counts. Callers pass the number of notes,
//! tasks or desktops they currently hold and get an answer back, which keeps
//! this type free of any coupling to the collections themselves.

use time::{Duration, OffsetDateTime};

use super::subscription::{
    Limit, PremiumFeature, PremiumFeatures, ResourceKind, ResourceLimits, Subscription, Tier,
};
use crate::errors::CozyError;

#[derive(Debug, Clone, PartialEq)]
pub struct EntitlementManager {
    subscription: Subscription,
    free_limits: ResourceLimits,
}

impl EntitlementManager {
    /// Wrap a loaded subscription. `free_limits` are the caps restored on
    /// downgrade.
    pub fn new(subscription: Subscription, free_limits: ResourceLimits) -> Self {
        Self {
            subscription,
            free_limits,
        }
    }

    /// Session-start state: free tier with the given caps.
    pub fn free(free_limits: ResourceLimits) -> Self {
        Self::new(Subscription::free(free_limits), free_limits)
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    pub fn tier(&self) -> Tier {
        self.subscription.tier
    }

    pub fn is_premium(&self) -> bool {
        self.subscription.tier == Tier::Premium
    }

    pub fn can_create_more(&self, kind: ResourceKind, current_count: u32) -> bool {
        self.limit(kind).allows(current_count)
    }

    /// Like [`Self::can_create_more`] but reports the cap that was hit.
    pub fn ensure_can_create(&self, kind: ResourceKind, current_count: u32) -> Result<(), CozyError> {
        let limit = self.limit(kind);
        if limit.allows(current_count) {
            Ok(())
        } else {
            Err(CozyError::LimitReached { kind, limit })
        }
    }

    pub fn limit(&self, kind: ResourceKind) -> Limit {
        if self.is_premium() {
            return Limit::Unbounded;
        }
        self.subscription.limits.get(kind)
    }

    pub fn remaining(&self, kind: ResourceKind, current_count: u32) -> Limit {
        self.limit(kind).remaining(current_count)
    }

    pub fn has_premium_feature(&self, feature: PremiumFeature) -> bool {
        self.is_premium() && self.subscription.premium_features.get(feature)
    }

    pub fn upgrade(&mut self) {
        self.subscription.tier = Tier::Premium;
        self.subscription.trial_used = true;
        self.subscription.trial_end_date = None;
        self.subscription.limits = ResourceLimits::unbounded();
        self.subscription.premium_features = PremiumFeatures::all();
    }

    /// Confirmation is the caller's job; this always applies.
    pub fn downgrade(&mut self) {
        self.subscription.tier = Tier::Free;
        self.subscription.trial_end_date = None;
        self.subscription.limits = self.free_limits;
        self.subscription.premium_features = PremiumFeatures::default();
    }

    pub fn start_trial(&mut self, duration_days: u32) -> Result<OffsetDateTime, CozyError> {
        self.start_trial_at(duration_days, OffsetDateTime::now_utc())
    }

    /// Start a premium trial ending `duration_days` after `now`. Returns the
    /// end date. Nothing reverts it automatically; see [`Self::is_trial_expired`].
    pub fn start_trial_at(
        &mut self,
        duration_days: u32,
        now: OffsetDateTime,
    ) -> Result<OffsetDateTime, CozyError> {
        if duration_days == 0 {
            return Err(CozyError::invalid("trial duration must be at least one day"));
        }
        let end = now
            .checked_add(Duration::days(i64::from(duration_days)))
            .ok_or_else(|| CozyError::invalid(format!("trial of {duration_days} days is out of range")))?;
        self.upgrade();
        self.subscription.trial_end_date = Some(end);
        Ok(end)
    }

    pub fn trial_used(&self) -> bool {
        self.subscription.trial_used
    }

    pub fn trial_end_date(&self) -> Option<OffsetDateTime> {
        self.subscription.trial_end_date
    }

    pub fn is_trial_expired(&self, now: OffsetDateTime) -> bool {
        match self.subscription.trial_end_date {
            Some(end) => self.is_premium() && now >= end,
            None => false,
        }
    }

    pub fn is_first_login(&self) -> bool {
        self.subscription.is_first_login
    }

    pub fn reset_first_login_flag(&mut self) {
        self.subscription.is_first_login = false;
    }
}
