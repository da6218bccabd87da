//! Timer-driven wallpaper rotation for one open mood view.
//!
//! A [`WallpaperRotator`] owns the selection state behind a mutex and, while
//! rotation is enabled and the filtered catalog has more than one entry, a
//! tokio interval task that advances the selection once per tick. Stopping
//! aborts the task; starting again always begins a fresh countdown.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::catalog::{Catalog, WallpaperItem};
use super::selection::WallpaperSelection;
use crate::entitlements::PremiumGate;
use crate::errors::CozyError;
use crate::mood::Mood;

pub type SharedGate = Arc<dyn PremiumGate + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationState {
    Stopped,
    Running,
}

struct View {
    mood: Mood,
    selection: WallpaperSelection,
}

struct Inner {
    catalog: Arc<Catalog>,
    gate: SharedGate,
    runtime: Handle,
    view: Mutex<View>,
    timer: Mutex<Option<JoinHandle<()>>>,
    current_tx: watch::Sender<Option<WallpaperItem>>,
}

pub struct WallpaperRotator {
    inner: Arc<Inner>,
}

impl WallpaperRotator {
    /// Open a view on `mood`. If rotation is enabled and there is more than
    /// one wallpaper to show, the timer starts immediately on `runtime`.
    pub fn new(
        catalog: Arc<Catalog>,
        mood: Mood,
        gate: SharedGate,
        selection: WallpaperSelection,
        runtime: Handle,
    ) -> Self {
        let initial = selection.current(&catalog, mood, &*gate).cloned();
        let (current_tx, _) = watch::channel(initial);
        let inner = Arc::new(Inner {
            catalog,
            gate,
            runtime,
            view: Mutex::new(View { mood, selection }),
            timer: Mutex::new(None),
            current_tx,
        });
        inner.sync_timer(false);
        Self { inner }
    }

    pub fn mood(&self) -> Mood {
        self.inner.view().mood
    }

    pub fn available(&self) -> Vec<WallpaperItem> {
        let mood = self.mood();
        self.inner
            .catalog
            .available(mood, &*self.inner.gate)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn current(&self) -> Option<WallpaperItem> {
        let view = self.inner.view();
        view.selection
            .current(&self.inner.catalog, view.mood, &*self.inner.gate)
            .cloned()
    }

    pub fn current_index(&self) -> usize {
        self.inner.view().selection.current_index()
    }

    pub fn advance(&self) {
        self.inner.tick();
    }

    pub fn select_by_id(&self, id: &str) -> bool {
        let mut view = self.inner.view();
        let mood = view.mood;
        let hit = view
            .selection
            .select_by_id(&self.inner.catalog, mood, &*self.inner.gate, id);
        if hit {
            self.inner.publish(&view);
        }
        hit
    }

    /// Switch the view to another mood and reset the selection.
    pub fn set_mood(&self, mood: Mood) {
        {
            let mut view = self.inner.view();
            view.mood = mood;
            view.selection.reset_on_mood_change();
            self.inner.publish(&view);
        }
        self.inner.sync_timer(false);
    }

    pub fn reset_on_mood_change(&self) {
        let mut view = self.inner.view();
        view.selection.reset_on_mood_change();
        self.inner.publish(&view);
    }

    /// Re-filter after the tier changed: reset to the first item and start
    /// or stop the timer depending on how many items remain.
    pub fn on_entitlement_change(&self) {
        self.inner.on_entitlement_change();
    }

    pub fn set_rotation_enabled(&self, enabled: bool) {
        self.inner.view().selection.set_rotation_enabled(enabled);
        self.inner.sync_timer(false);
    }

    /// Takes effect immediately: a running timer is restarted with the new
    /// period.
    pub fn set_rotation_interval(&self, interval: Duration) -> Result<(), CozyError> {
        self.inner.view().selection.set_rotation_interval(interval)?;
        self.inner.sync_timer(true);
        Ok(())
    }

    pub fn rotation_enabled(&self) -> bool {
        self.inner.view().selection.rotation_enabled()
    }

    pub fn rotation_interval(&self) -> Duration {
        self.inner.view().selection.rotation_interval()
    }

    pub fn rotation_state(&self) -> RotationState {
        let timer = self.inner.timer();
        match timer.as_ref() {
            Some(handle) if !handle.is_finished() => RotationState::Running,
            _ => RotationState::Stopped,
        }
    }

    /// Receiver that observes the displayed wallpaper, including timer ticks.
    pub fn subscribe(&self) -> watch::Receiver<Option<WallpaperItem>> {
        self.inner.current_tx.subscribe()
    }

    pub(crate) fn watcher(&self) -> RotatorRef {
        RotatorRef(Arc::downgrade(&self.inner))
    }
}

/// Weak handle the session keeps so it can push tier changes to open views
/// without keeping them alive.
#[derive(Clone)]
pub(crate) struct RotatorRef(Weak<Inner>);

impl RotatorRef {
    pub(crate) fn is_open(&self) -> bool {
        self.0.strong_count() > 0
    }

    /// Returns `false` once the view has been closed.
    pub(crate) fn notify_entitlement_change(&self) -> bool {
        match self.0.upgrade() {
            Some(inner) => {
                inner.on_entitlement_change();
                true
            }
            None => false,
        }
    }
}

impl Inner {
    fn view(&self) -> MutexGuard<'_, View> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn timer(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, view: &View) {
        let next = view
            .selection
            .current(&self.catalog, view.mood, &*self.gate)
            .cloned();
        self.current_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    /// One index step, serialised with every other view mutation.
    fn tick(&self) {
        let mut view = self.view();
        let mood = view.mood;
        if view.selection.advance(&self.catalog, mood, &*self.gate) {
            log::trace!("wallpaper advanced to {} for {}", view.selection.current_index(), mood.id());
            self.publish(&view);
        }
    }

    fn on_entitlement_change(self: &Arc<Self>) {
        {
            let mut view = self.view();
            view.selection.reset_on_mood_change();
            self.publish(&view);
        }
        self.sync_timer(false);
    }

    /// Bring the timer in line with the current state. With `restart`, a
    /// running timer is replaced even if it should keep running.
    ///
    /// Lock order is timer then view, so the decision and the spawn or abort
    /// happen under one timer guard.
    fn sync_timer(self: &Arc<Self>, restart: bool) {
        let mut timer = self.timer();
        let (should_run, period, mood) = {
            let view = self.view();
            let len = self.catalog.available(view.mood, &*self.gate).len();
            (
                view.selection.rotation_enabled() && len > 1,
                view.selection.rotation_interval(),
                view.mood,
            )
        };

        let running = timer.as_ref().is_some_and(|handle| !handle.is_finished());
        if running && (restart || !should_run) {
            if let Some(handle) = timer.take() {
                handle.abort();
            }
            log::debug!("wallpaper rotation stopped for {}", mood.id());
        }

        let running = timer.as_ref().is_some_and(|handle| !handle.is_finished());
        if should_run && !running {
            let weak = Arc::downgrade(self);
            *timer = Some(self.runtime.spawn(run_rotation(weak, period)));
            log::debug!(
                "wallpaper rotation started for {} every {}ms",
                mood.id(),
                period.as_millis()
            );
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let timer = self.timer.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = timer.take() {
            handle.abort();
        }
    }
}

async fn run_rotation(inner: Weak<Inner>, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.tick();
    }
}
