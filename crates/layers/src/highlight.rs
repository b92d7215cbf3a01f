use serde::{Deserialize, Serialize};

/// Z-order bucket of a hover candidate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Top,
    Other,
}

/// Points currently under the pointer, split by tier.
///
/// Ordering contract:
/// - Within a tier, indices keep hover (insertion) order.
/// - An index belongs to at most one tier at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HighlightTracker {
    top: Vec<usize>,
    other: Vec<usize>,
}

impl HighlightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a pointer enter (`is_over`) or leave for `index` on `tier`.
    ///
    /// Entering on one tier drops the index from the other tier. Returns
    /// `true` if either set changed.
    pub fn set_hover(&mut self, index: usize, tier: Tier, is_over: bool) -> bool {
        let mut changed = false;
        if !is_over || tier != Tier::Top {
            changed |= remove(&mut self.top, index);
        }
        if !is_over || tier != Tier::Other {
            changed |= remove(&mut self.other, index);
        }
        if is_over {
            let set = match tier {
                Tier::Top => &mut self.top,
                Tier::Other => &mut self.other,
            };
            if !set.contains(&index) {
                set.push(index);
                changed = true;
            }
        }
        changed
    }

    /// First still-hovered top-tier index, else first other-tier index.
    pub fn highlighted(&self) -> Option<usize> {
        self.top.first().or(self.other.first()).copied()
    }

    pub fn tier(&self, tier: Tier) -> &[usize] {
        match tier {
            Tier::Top => &self.top,
            Tier::Other => &self.other,
        }
    }

    pub fn clear(&mut self) {
        self.top.clear();
        self.other.clear();
    }
}

fn remove(set: &mut Vec<usize>, index: usize) -> bool {
    match set.iter().position(|i| *i == index) {
        Some(pos) => {
            set.remove(pos);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{HighlightTracker, Tier};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn first_hovered_in_tier_wins() {
        let mut h = HighlightTracker::new();
        h.set_hover(2, Tier::Top, true);
        assert_eq!(h.highlighted(), Some(2));
        h.set_hover(4, Tier::Top, true);
        assert_eq!(h.highlighted(), Some(2));
        h.set_hover(2, Tier::Top, false);
        assert_eq!(h.highlighted(), Some(4));
        h.set_hover(4, Tier::Top, false);
        assert_eq!(h.highlighted(), None);
    }

    #[test]
    fn top_tier_beats_other_tier() {
        let mut h = HighlightTracker::new();
        h.set_hover(1, Tier::Other, true);
        h.set_hover(7, Tier::Top, true);
        assert_eq!(h.highlighted(), Some(7));
        h.set_hover(7, Tier::Top, false);
        assert_eq!(h.highlighted(), Some(1));
    }

    #[test]
    fn tier_change_moves_membership() {
        let mut h = HighlightTracker::new();
        h.set_hover(3, Tier::Other, true);
        h.set_hover(3, Tier::Top, true);
        assert_eq!(h.tier(Tier::Top), &[3]);
        assert!(h.tier(Tier::Other).is_empty());
        h.set_hover(3, Tier::Other, true);
        assert!(h.tier(Tier::Top).is_empty());
        assert_eq!(h.tier(Tier::Other), &[3]);
    }

    #[test]
    fn repeated_enter_is_not_duplicated() {
        let mut h = HighlightTracker::new();
        assert!(h.set_hover(5, Tier::Top, true));
        assert!(!h.set_hover(5, Tier::Top, true));
        assert_eq!(h.tier(Tier::Top), &[5]);
        assert!(!h.set_hover(9, Tier::Other, false));
    }

    #[test]
    fn no_index_is_in_both_tiers() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut h = HighlightTracker::new();
        for _ in 0..2000 {
            let index = rng.gen_range(0..8usize);
            let tier = if rng.gen_bool(0.5) { Tier::Top } else { Tier::Other };
            h.set_hover(index, tier, rng.gen_bool(0.5));
            for i in h.tier(Tier::Top) {
                assert!(!h.tier(Tier::Other).contains(i));
            }
        }
    }
}
