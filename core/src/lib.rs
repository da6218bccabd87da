//! Core library for the Cozy Hours mood desktop.
//!
//! Module map:
//! - [`entitlements`] holds the free/premium tiers and the resource-count gate.
//! - [`wallpaper`] filters the per-mood catalog by tier and drives rotation.
//! - [`mood`] is the closed set of emotional states and their metadata.
//! - [`session`] wires both to persistence, trial expiry and the audit log.
//! - [`store`] defines the subscription repository seam and its backends.
//! - [`api`] exposes the string-keyed command surface for the UI shell.
//! - [`db`], [`settings`], [`logging`] and [`errors`] are the supporting stack.
//! - [`pomodoro`] implements the work/break cycle of the timer widget.

pub mod api;
pub mod db;
pub mod entitlements;
pub mod errors;
pub mod logging;
pub mod mood;
pub mod pomodoro;
pub mod session;
pub mod settings;
pub mod store;
pub mod wallpaper;

pub use errors::CozyError;
