use foundation::time::Millis;
use runtime::activity::ActivityLog;
use runtime::timer::DebounceTimer;
use serde::Serialize;
use serde_json::{Value, json};

use crate::engine::{PointEngine, VertexAttribute};

/// Debounce before hiding the overlay after the selection is cleared.
pub const CLEAR_DELAY_MS: u64 = 125;
/// Debounce before showing the overlay for a new selection.
pub const SHOW_DELAY_MS: u64 = 250;
/// Grace period after the pointer leaves an ephemeral overlay.
pub const DISMISS_DELAY_MS: u64 = 500;

pub const OVERLAY_CATEGORY: &str = "instagram_overlay";

/// Deferred overlay work held by the selection timer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OverlayAction {
    /// Show or hide the overlay for whatever is current when it fires.
    Show,
    /// Clear the current point (pointer left an ephemeral overlay).
    Dismiss,
}

/// Redraw policy for [`SelectionState::set_current`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Redraw {
    /// Skip when unchanged; draw when changed.
    #[default]
    Auto,
    /// Apply and draw even when the point is unchanged.
    Force,
    /// Apply when changed but leave drawing to the caller.
    Suppress,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionPhase {
    Idle,
    Hovering,
    Pinned,
}

/// Argument to [`SelectionState::set_persistent`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Persist {
    /// Click semantics: pin unless this exact point is already pinned.
    Toggle(usize),
    Set(bool),
}

impl Persist {
    /// Interprets loosely-typed input from the UI shell.
    ///
    /// Index-like values toggle; anything else sets by truthiness.
    pub fn from_json(v: &Value) -> Self {
        match parse_point_index(v) {
            Some(i) => Persist::Toggle(i),
            None => Persist::Set(truthy(v)),
        }
    }
}

impl From<Option<usize>> for Persist {
    fn from(index: Option<usize>) -> Self {
        match index {
            Some(i) => Persist::Toggle(i),
            None => Persist::Set(false),
        }
    }
}

/// Result of [`SelectionState::set_current`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CurrentChange {
    Unchanged,
    /// The overlay update was (re)scheduled on the timer.
    Scheduled,
    /// The caller must update the overlay now.
    ShowNow,
}

/// Current / persistent point selection.
///
/// Invariant: `persistent` implies `current.is_some()`.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    current: Option<usize>,
    persistent: bool,
    source: String,
    timer: DebounceTimer<OverlayAction>,
    leave_guard_armed: bool,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn phase(&self) -> SelectionPhase {
        match (self.current, self.persistent) {
            (None, _) => SelectionPhase::Idle,
            (Some(_), false) => SelectionPhase::Hovering,
            (Some(_), true) => SelectionPhase::Pinned,
        }
    }

    pub fn timer(&self) -> &DebounceTimer<OverlayAction> {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut DebounceTimer<OverlayAction> {
        &mut self.timer
    }

    /// Sets the current point and schedules the overlay update.
    ///
    /// An empty `source` keeps the previous provenance tag.
    pub fn set_current<E: PointEngine>(
        &mut self,
        engine: &mut E,
        cur: Option<usize>,
        redraw: Redraw,
        immediate: bool,
        source: &str,
        now: Millis,
    ) -> CurrentChange {
        if !source.is_empty() {
            self.source = source.to_string();
        }
        if cur == self.current && redraw != Redraw::Force {
            return CurrentChange::Unchanged;
        }
        if cur.is_none() {
            self.persistent = false;
        }

        write_stroke(engine, self.current, cur);
        if redraw != Redraw::Suppress {
            engine.trigger_draw();
        }
        tracing::debug!(old = ?self.current, new = ?cur, source = %self.source, "current point");
        self.current = cur;
        if cur.is_some() {
            self.leave_guard_armed = true;
        }

        if immediate {
            self.timer.cancel_pending();
            return CurrentChange::ShowNow;
        }
        let delay = if cur.is_none() {
            CLEAR_DELAY_MS
        } else {
            SHOW_DELAY_MS
        };
        self.timer.schedule(now, delay, OverlayAction::Show);
        CurrentChange::Scheduled
    }

    /// Persistence that `arg` would produce, without applying it.
    pub fn persistence_target(&self, arg: Persist) -> bool {
        match arg {
            Persist::Toggle(index) => !self.persistent || Some(index) != self.current,
            Persist::Set(value) => value,
        }
    }

    /// Applies `arg` and logs `pin_overlay` on an actual transition.
    ///
    /// Pinning with no current point is ignored.
    pub fn set_persistent<L: ActivityLog>(
        &mut self,
        arg: Persist,
        source: Option<&str>,
        log: &mut L,
    ) -> bool {
        let target = self.persistence_target(arg) && self.current.is_some();
        if target != self.persistent {
            log.log_activity(
                "pin_overlay",
                source.unwrap_or("map"),
                json!({}),
                OVERLAY_CATEGORY,
            );
            self.persistent = target;
        }
        self.persistent
    }

    /// True once a point has been current, the pointer left the map, and
    /// nothing is pinned.
    pub fn should_clear_on_map_leave(&self) -> bool {
        self.leave_guard_armed && !self.persistent && self.current.is_some()
    }

    pub fn take_due(&mut self, now: Millis) -> Option<OverlayAction> {
        self.timer.poll(now)
    }
}

/// Clears the stroke on `old` and sets it on `new`, every vertex of each.
fn write_stroke<E: PointEngine>(engine: &mut E, old: Option<usize>, new: Option<usize>) {
    let vpf = engine.vertices_per_feature();
    let stroke = engine.source_buffer_mut(VertexAttribute::Stroke);
    for (index, value) in [(old, 0.0), (new, 1.0)] {
        let Some(index) = index else {
            continue;
        };
        let Some(start) = index.checked_mul(vpf).filter(|s| *s < stroke.len()) else {
            continue;
        };
        let end = (start + vpf).min(stroke.len());
        stroke[start..end].fill(value);
    }
    engine.update_source_buffer(VertexAttribute::Stroke);
}

/// Loose integer parsing for indices coming from the UI shell.
///
/// Numbers truncate toward zero; strings use their leading digits. Negative,
/// non-finite and non-numeric input is "no selection".
pub fn parse_point_index(v: &Value) -> Option<usize> {
    match v {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                return usize::try_from(u).ok();
            }
            let f = n.as_f64()?.trunc();
            (f.is_finite() && f >= 0.0).then_some(f as usize)
        }
        Value::String(s) => {
            let s = s.trim_start();
            let s = s.strip_prefix('+').unwrap_or(s);
            let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
            s[..end].parse().ok()
        }
        _ => None,
    }
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
