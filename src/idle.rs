//! Idle-timeout watchdog that forces logout after a period of inactivity.
//!
//! DESIGN
//! ======
//! One pending timer task at a time. Every recognized activity event moves
//! `last_active` to now and replaces the pending timer with one that fires at
//! `last_active + window`. Cancel and reschedule happen under a single lock,
//! and each timer carries the generation it was scheduled under: a timer
//! that wakes after being superseded sees a newer generation and does
//! nothing, so there are never duplicate firings.
//!
//! When the timer fires the monitor stops itself and runs the idle callback
//! (normally the shared logout sequence). It is started again after the
//! next successful login.

#[cfg(test)]
#[path = "idle_test.rs"]
mod idle_test;

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::auth::{LogoutHandler, LogoutReason};

pub const DEFAULT_IDLE_WINDOW: Duration = Duration::from_secs(5 * 60);

/// User input that counts as activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    PointerMove,
    PointerDown,
    KeyDown,
    TouchStart,
    Scroll,
}

type IdleCallback = Arc<dyn Fn() + Send + Sync>;

struct IdleState {
    running: bool,
    last_active: Instant,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

struct Inner {
    window: Duration,
    on_idle: IdleCallback,
    state: Mutex<IdleState>,
}

/// Cloning shares the same monitor.
#[derive(Clone)]
pub struct IdleMonitor {
    inner: Arc<Inner>,
}

impl IdleMonitor {
    pub fn new(window: Duration, on_idle: impl Fn() + Send + Sync + 'static) -> Self {
        let state = IdleState { running: false, last_active: Instant::now(), generation: 0, pending: None };
        Self { inner: Arc::new(Inner { window, on_idle: Arc::new(on_idle), state: Mutex::new(state) }) }
    }

    /// Monitor whose timeout runs the logout sequence.
    pub fn with_logout(window: Duration, logout: LogoutHandler) -> Self {
        Self::new(window, move || {
            logout.force_logout(LogoutReason::IdleTimeout);
        })
    }

    pub fn window(&self) -> Duration {
        self.inner.window
    }

    /// Begin watching. Counts as activity. Must be called inside a tokio runtime.
    pub fn start(&self) {
        let mut state = self.lock();
        state.running = true;
        state.last_active = Instant::now();
        schedule(&self.inner, &mut state);
        tracing::debug!(window_secs = self.inner.window.as_secs(), "idle monitor started");
    }

    /// Stop watching and cancel the pending timer.
    pub fn stop(&self) {
        let mut state = self.lock();
        state.running = false;
        state.generation += 1;
        if let Some(handle) = state.pending.take() {
            handle.abort();
        }
        tracing::debug!("idle monitor stopped");
    }

    /// Record user activity and push the deadline out. Ignored while stopped.
    pub fn record_activity(&self, kind: ActivityKind) {
        let mut state = self.lock();
        if !state.running {
            return;
        }
        state.last_active = Instant::now();
        schedule(&self.inner, &mut state);
        tracing::trace!(?kind, "activity");
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    pub fn last_active(&self) -> Instant {
        self.lock().last_active
    }

    /// When the pending timer will fire, if running.
    pub fn deadline(&self) -> Option<Instant> {
        let state = self.lock();
        if !state.running {
            return None;
        }
        state.last_active.checked_add(self.inner.window)
    }

    /// Whether the idle window has elapsed since the last activity.
    pub fn is_idle(&self) -> bool {
        self.lock().last_active.elapsed() >= self.inner.window
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, IdleState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn schedule(inner: &Arc<Inner>, state: &mut IdleState) {
    if let Some(handle) = state.pending.take() {
        handle.abort();
    }
    state.generation += 1;
    let generation = state.generation;
    let Some(deadline) = state.last_active.checked_add(inner.window) else {
        tracing::warn!(window_secs = inner.window.as_secs(), "idle window out of range; timer not armed");
        return;
    };
    let weak = Arc::downgrade(inner);
    state.pending = Some(tokio::spawn(async move {
        tokio::time::sleep_until(deadline).await;
        fire(&weak, generation);
    }));
}

fn fire(weak: &Weak<Inner>, generation: u64) {
    let Some(inner) = weak.upgrade() else {
        return;
    };
    let callback = {
        let mut state = inner.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.running || state.generation != generation {
            return;
        }
        state.running = false;
        state.pending = None;
        inner.on_idle.clone()
    };
    tracing::info!(window_secs = inner.window.as_secs(), "idle timeout reached");
    callback();
}
