use foundation::time::EpochMs;
use serde::Deserialize;

use crate::dataset::PointDataset;
use crate::engine::{PointEngine, VertexAttribute};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationError {
    NonPositiveRange(i64),
    NonPositiveBinWidth(i64),
}

impl std::fmt::Display for AnimationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnimationError::NonPositiveRange(v) => write!(f, "animation range must be > 0 (got {v})"),
            AnimationError::NonPositiveBinWidth(v) => {
                write!(f, "animation bin width must be > 0 (got {v})")
            }
        }
    }
}

impl std::error::Error for AnimationError {}

/// Cycle used to fold timestamps into bins.
///
/// E.g. `range_ms` of one week and `bin_width_ms` of one day folds a year of
/// posts onto the seven weekdays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationWindow {
    start: EpochMs,
    range_ms: i64,
    bin_width_ms: i64,
}

impl AnimationWindow {
    pub fn new(start: EpochMs, range_ms: i64, bin_width_ms: i64) -> Result<Self, AnimationError> {
        if range_ms <= 0 {
            return Err(AnimationError::NonPositiveRange(range_ms));
        }
        if bin_width_ms <= 0 {
            return Err(AnimationError::NonPositiveBinWidth(bin_width_ms));
        }
        Ok(Self {
            start,
            range_ms,
            bin_width_ms,
        })
    }

    /// `floor(((t - start) mod range) / bin_width)`; timestamps before
    /// `start` wrap around the cycle.
    pub fn bin_of(&self, t: EpochMs) -> i64 {
        t.0.wrapping_sub(self.start.0).rem_euclid(self.range_ms) / self.bin_width_ms
    }
}

/// Playback position supplied by the timeline driver for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AnimationFrame {
    pub num_bins: i64,
    pub step: i64,
    /// Number of consecutive bins shown at once, starting at `step`.
    pub substeps: i64,
    #[serde(default)]
    pub opacity: Option<f32>,
}

impl AnimationFrame {
    pub fn is_active(&self, bin: i64) -> bool {
        in_animation_bin(bin, self.num_bins, self.step, self.substeps)
    }
}

/// True if `bin` lies in `[step, step + substeps)`, wrapping over `num_bins`.
pub fn in_animation_bin(bin: i64, num_bins: i64, step: i64, substeps: i64) -> bool {
    if num_bins <= 0 || bin < 0 || bin >= num_bins {
        return false;
    }
    (bin - step).rem_euclid(num_bins) < substeps
}

/// One bin id per displayed point.
pub fn compute_bins(dataset: &PointDataset, window: &AnimationWindow) -> Vec<i64> {
    dataset
        .displayed()
        .iter()
        .map(|r| window.bin_of(r.posted_date))
        .collect()
}

/// Writes `target_opacity` to every vertex of active points and 0 elsewhere.
pub fn apply_frame<E, F>(engine: &mut E, bins: &[i64], is_active: F, target_opacity: f32)
where
    E: PointEngine,
    F: Fn(i64) -> bool,
{
    let vpf = engine.vertices_per_feature().max(1);
    let opacity = engine.source_buffer_mut(VertexAttribute::FillOpacity);
    for (vertices, bin) in opacity.chunks_mut(vpf).zip(bins) {
        vertices.fill(if is_active(*bin) { target_opacity } else { 0.0 });
    }
    engine.update_source_buffer(VertexAttribute::FillOpacity);
}

/// Resets every vertex of the first `num_points` points to `base_opacity`.
pub fn reset_opacity<E: PointEngine>(engine: &mut E, num_points: usize, base_opacity: f32) {
    let vpf = engine.vertices_per_feature();
    let opacity = engine.source_buffer_mut(VertexAttribute::FillOpacity);
    let end = (num_points * vpf).min(opacity.len());
    opacity[..end].fill(base_opacity);
    engine.update_source_buffer(VertexAttribute::FillOpacity);
}

/// Bin assignment for one animation session.
#[derive(Debug, Clone, Default)]
pub struct AnimationBinner {
    bins: Option<Vec<i64>>,
}

impl AnimationBinner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.bins.is_some()
    }

    pub fn bins(&self) -> Option<&[i64]> {
        self.bins.as_deref()
    }

    pub fn compute(&mut self, dataset: &PointDataset, window: &AnimationWindow) {
        self.bins = Some(compute_bins(dataset, window));
    }

    /// Applies one frame. Returns `false` when no session is active.
    pub fn apply_frame<E: PointEngine>(
        &self,
        engine: &mut E,
        frame: &AnimationFrame,
        target_opacity: f32,
    ) -> bool {
        let Some(bins) = self.bins.as_deref() else {
            return false;
        };
        apply_frame(engine, bins, |bin| frame.is_active(bin), target_opacity);
        true
    }

    /// Ends the session and restores the uniform base opacity.
    pub fn stop<E: PointEngine>(&mut self, engine: &mut E, num_points: usize, base_opacity: f32) {
        self.bins = None;
        reset_opacity(engine, num_points, base_opacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::PointRecord;
    use crate::engine::{PointStyle, SoftwareEngine};
    use foundation::math::{LonLat, Vec2};

    const DAY_MS: i64 = 86_400_000;
    const WEEK_MS: i64 = 7 * DAY_MS;

    fn dataset(dates: &[i64]) -> PointDataset {
        let records = dates
            .iter()
            .map(|d| PointRecord {
                longitude: 0.0,
                latitude: 0.0,
                posted_date: EpochMs(*d),
                caption: String::new(),
                image_url: String::new(),
            })
            .collect();
        PointDataset::from_records(records, 1000)
    }

    fn engine(points: usize, opacity: f32) -> SoftwareEngine {
        let mut e = SoftwareEngine::new(Vec2::new(100.0, 100.0), LonLat::default(), 1.0)
            .with_vertices_per_feature(4);
        e.set_points(
            &vec![LonLat::default(); points],
            &PointStyle {
                fill_color: [1.0, 0.0, 0.0],
                fill_opacity: opacity,
                stroke_color: [0.0; 3],
                stroke_opacity: 1.0,
                stroke_width: 5.0,
                stroke: false,
                radius: 5.0,
            },
        );
        e
    }

    #[test]
    fn weekday_bins() {
        let w = AnimationWindow::new(EpochMs(0), WEEK_MS, DAY_MS).unwrap();
        assert_eq!(w.bin_of(EpochMs(100_000_000)), 1);
        assert_eq!(w.bin_of(EpochMs(WEEK_MS + 3 * DAY_MS)), 3);
        assert_eq!(w.bin_of(EpochMs(-1)), 6);
    }

    #[test]
    fn rejects_degenerate_windows() {
        assert_eq!(
            AnimationWindow::new(EpochMs(0), 0, DAY_MS),
            Err(AnimationError::NonPositiveRange(0))
        );
        assert_eq!(
            AnimationWindow::new(EpochMs(0), WEEK_MS, -1),
            Err(AnimationError::NonPositiveBinWidth(-1))
        );
    }

    #[test]
    fn active_window_wraps() {
        assert!(in_animation_bin(2, 7, 2, 1));
        assert!(!in_animation_bin(3, 7, 2, 1));
        assert!(in_animation_bin(0, 7, 6, 2));
        assert!(in_animation_bin(6, 7, 6, 2));
        assert!(!in_animation_bin(1, 7, 6, 2));
        assert!(!in_animation_bin(7, 7, 0, 7));
        assert!(!in_animation_bin(-1, 7, 0, 7));
    }

    #[test]
    fn frame_rewrites_every_vertex() {
        let ds = dataset(&[0, DAY_MS, 2 * DAY_MS]);
        let mut e = engine(3, 0.1);
        let mut binner = AnimationBinner::new();
        binner.compute(&ds, &AnimationWindow::new(EpochMs(0), WEEK_MS, DAY_MS).unwrap());
        assert_eq!(binner.bins(), Some(&[0, 1, 2][..]));

        let frame = AnimationFrame {
            num_bins: 7,
            step: 1,
            substeps: 1,
            opacity: None,
        };
        assert!(binner.apply_frame(&mut e, &frame, 0.6));
        assert_eq!(
            e.source_buffer(VertexAttribute::FillOpacity),
            &[0.0, 0.0, 0.0, 0.0, 0.6, 0.6, 0.6, 0.6, 0.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn stop_resets_uniformly() {
        let ds = dataset(&[0, DAY_MS, 2 * DAY_MS]);
        let mut e = engine(3, 0.1);
        let mut binner = AnimationBinner::new();
        binner.compute(&ds, &AnimationWindow::new(EpochMs(0), WEEK_MS, DAY_MS).unwrap());
        let hidden = AnimationFrame {
            num_bins: 7,
            step: 5,
            substeps: 1,
            opacity: None,
        };
        binner.apply_frame(&mut e, &hidden, 0.6);
        assert!(e.source_buffer(VertexAttribute::FillOpacity).iter().all(|o| *o == 0.0));

        binner.stop(&mut e, ds.num_points(), 0.35);
        assert!(!binner.is_active());
        assert!(e.source_buffer(VertexAttribute::FillOpacity).iter().all(|o| *o == 0.35));
        assert!(!binner.apply_frame(&mut e, &hidden, 0.6));
    }
}
