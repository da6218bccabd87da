use super::EntitlementManager;

/// Read-only "is the user premium right now" query consumed by the wallpaper
/// engine. It never mutates entitlement state.
pub trait PremiumGate {
    fn is_premium(&self) -> bool;
}

impl<F> PremiumGate for F
where
    F: Fn() -> bool,
{
    fn is_premium(&self) -> bool {
        self()
    }
}

impl PremiumGate for bool {
    fn is_premium(&self) -> bool {
        *self
    }
}

impl PremiumGate for EntitlementManager {
    fn is_premium(&self) -> bool {
        EntitlementManager::is_premium(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entitlements::ResourceLimits;

    fn gated<G: PremiumGate + ?Sized>(gate: &G) -> bool {
        gate.is_premium()
    }

    #[test]
    fn fixed_flags_and_closures_answer_directly() {
        assert!(gated(&true));
        assert!(!gated(&false));
        assert!(gated(&|| true));
    }

    #[test]
    fn manager_answers_with_its_tier() {
        let mut mgr = EntitlementManager::free(ResourceLimits::default());
        assert!(!gated(&mgr));
        mgr.upgrade();
        assert!(gated(&mgr));
    }
}
