use foundation::time::Millis;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
struct Pending<A> {
    id: TimerId,
    deadline: Millis,
    action: A,
}

/// Single-slot cancellable timer.
///
/// At most one action is pending at any time: scheduling a new action always
/// cancels the previous one first (last-write-wins). The host drives time by
/// calling [`DebounceTimer::poll`]; nothing fires on its own.
#[derive(Debug, Clone)]
pub struct DebounceTimer<A> {
    next_id: u64,
    pending: Option<Pending<A>>,
    scheduled: u64,
    cancelled: u64,
}

impl<A> Default for DebounceTimer<A> {
    fn default() -> Self {
        Self {
            next_id: 0,
            pending: None,
            scheduled: 0,
            cancelled: 0,
        }
    }
}

impl<A> DebounceTimer<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, now: Millis, delay_ms: u64, action: A) -> TimerId {
        self.cancel_pending();
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.scheduled += 1;
        self.pending = Some(Pending {
            id,
            deadline: now.after(delay_ms),
            action,
        });
        id
    }

    /// Drops the pending action, if any. Returns `true` if one was dropped.
    pub fn cancel_pending(&mut self) -> bool {
        if self.pending.take().is_some() {
            self.cancelled += 1;
            return true;
        }
        false
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_id(&self) -> Option<TimerId> {
        self.pending.as_ref().map(|p| p.id)
    }

    pub fn deadline(&self) -> Option<Millis> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    pub fn pending_action(&self) -> Option<&A> {
        self.pending.as_ref().map(|p| &p.action)
    }

    /// Returns the pending action once `now` reaches its deadline.
    pub fn poll(&mut self, now: Millis) -> Option<A> {
        if self.pending.as_ref()?.deadline > now {
            return None;
        }
        self.pending.take().map(|p| p.action)
    }

    /// Total number of `schedule` calls so far.
    pub fn scheduled_count(&self) -> u64 {
        self.scheduled
    }

    pub fn cancelled_count(&self) -> u64 {
        self.cancelled
    }
}
