//! Subscription tiers and the per-resource limits they impose.

pub mod gate;
pub mod manager;
pub mod subscription;

pub use gate::PremiumGate;
pub use manager::EntitlementManager;
pub use subscription::{
    Limit, PremiumFeature, PremiumFeatures, ResourceKind, ResourceLimits, Subscription, Tier,
};
