/// Milliseconds since the Unix epoch, as carried by data rows.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EpochMs(pub i64);

/// Host clock reading in milliseconds.
///
/// Only differences between readings are meaningful; event timestamps,
/// timer deadlines and the click/pan window all use this timebase.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Millis(pub u64);

impl Millis {
    pub fn after(self, delay_ms: u64) -> Self {
        Millis(self.0.saturating_add(delay_ms))
    }
}

/// Half-open `[min, max)` date filter; a missing bound is unbounded.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DateWindow {
    pub min: Option<EpochMs>,
    pub max: Option<EpochMs>,
}

impl DateWindow {
    pub fn forever() -> Self {
        Self::default()
    }

    pub fn new(min: Option<EpochMs>, max: Option<EpochMs>) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, t: EpochMs) -> bool {
        self.min.is_none_or(|min| t >= min) && self.max.is_none_or(|max| t < max)
    }
}

#[cfg(test)]
mod tests {
    use super::{DateWindow, EpochMs, Millis};

    #[test]
    fn window_is_half_open() {
        let w = DateWindow::new(Some(EpochMs(10)), Some(EpochMs(20)));
        assert!(!w.contains(EpochMs(9)));
        assert!(w.contains(EpochMs(10)));
        assert!(w.contains(EpochMs(19)));
        assert!(!w.contains(EpochMs(20)));
    }

    #[test]
    fn missing_bounds_are_open() {
        assert!(DateWindow::forever().contains(EpochMs(i64::MIN)));
        let w = DateWindow::new(None, Some(EpochMs(0)));
        assert!(w.contains(EpochMs(-5)));
        assert!(!w.contains(EpochMs(0)));
    }

    #[test]
    fn millis_after_saturates() {
        assert_eq!(Millis(5).after(10), Millis(15));
        assert_eq!(Millis(u64::MAX).after(1), Millis(u64::MAX));
    }
}
