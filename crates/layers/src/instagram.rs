use foundation::math::{LonLat, Vec2};
use foundation::time::{DateWindow, EpochMs, Millis};
use runtime::activity::ActivityLog;
use serde::Serialize;
use serde_json::json;

use crate::animation::{AnimationBinner, AnimationError, AnimationFrame, AnimationWindow};
use crate::dataset::{DatasetError, PointDataset, PointTable};
use crate::engine::{PointEngine, PointStyle, VertexAttribute};
use crate::highlight::{HighlightTracker, Tier};
use crate::layer::{LayerId, MapLayer};
use crate::overlay::{CardContent, OverlayCard, OverlayControls, place_overlay};
use crate::params::{LayerConfig, MapParams, PARAM_CHANGED_KEYS, parse_hex_color};
use crate::selection::{
    CurrentChange, DISMISS_DELAY_MS, OVERLAY_CATEGORY, OverlayAction, Persist, Redraw,
    SelectionPhase, SelectionState,
};

pub const DATAKEY: &str = "instagram";

/// Duration of the "center on map" transition.
pub const CENTER_TRANSITION_MS: u64 = 1000;

/// Serializable view of the layer's interaction state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerState {
    pub current_point: Option<usize>,
    pub current_point_source: String,
    pub persistent_current_point: bool,
    pub phase: SelectionPhase,
    pub in_points: HighlightTracker,
    pub default_opacity: f32,
    pub point_color: [f32; 3],
    pub stroke_color: [f32; 3],
    pub num_points: usize,
    pub animating: bool,
    pub overlay: OverlayCard,
}

/// Post layer: hover highlighting, click-to-pin selection, the detail
/// overlay and animated time binning.
///
/// All handlers run on the host's UI loop. Deferred work lives in the
/// selection timer and only runs from [`InstagramLayer::tick`].
pub struct InstagramLayer<E, L> {
    id: LayerId,
    engine: E,
    log: L,
    config: LayerConfig,
    params: MapParams,
    max_points: usize,
    table: Option<PointTable>,
    dataset: Option<PointDataset>,
    highlight: HighlightTracker,
    selection: SelectionState,
    binner: AnimationBinner,
    card: OverlayCard,
    last_pointer_down: Option<Millis>,
    last_pan: Option<Millis>,
    clock: Millis,
}

impl<E: PointEngine, L: ActivityLog> InstagramLayer<E, L> {
    pub fn new(id: u64, engine: E, log: L, config: LayerConfig) -> Self {
        let max_points = config.max_points;
        Self {
            id: LayerId(id),
            engine,
            log,
            config,
            params: MapParams::default(),
            max_points,
            table: None,
            dataset: None,
            highlight: HighlightTracker::new(),
            selection: SelectionState::new(),
            binner: AnimationBinner::new(),
            card: OverlayCard::new(),
            last_pointer_down: None,
            last_pan: None,
            clock: Millis(0),
        }
    }

    /// Replaces the source table. Takes effect on the next parameter update.
    pub fn set_table(&mut self, table: PointTable) {
        self.table = Some(table);
    }

    pub fn load_table_json(&mut self, raw: &str) -> Result<(), DatasetError> {
        self.table = Some(PointTable::from_json(raw)?);
        Ok(())
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut L {
        &mut self.log
    }

    pub fn dataset(&self) -> Option<&PointDataset> {
        self.dataset.as_ref()
    }

    pub fn highlight(&self) -> &HighlightTracker {
        &self.highlight
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn card(&self) -> &OverlayCard {
        &self.card
    }

    pub fn current_point(&self) -> Option<usize> {
        self.selection.current()
    }

    pub fn is_persistent(&self) -> bool {
        self.selection.is_persistent()
    }

    /// Sets the current point; an empty `source` keeps the previous tag.
    ///
    /// Indices without a record in the current dataset mean "no selection".
    pub fn set_current_point(
        &mut self,
        cur: Option<usize>,
        redraw: Redraw,
        immediate: bool,
        source: &str,
        now: Millis,
    ) -> Option<usize> {
        self.clock = self.clock.max(now);
        let cur = cur.filter(|i| {
            let known = self.dataset.as_ref().is_some_and(|d| d.record(*i).is_some());
            if !known {
                tracing::debug!(index = *i, "ignoring out-of-range point");
            }
            known
        });
        let change =
            self.selection
                .set_current(&mut self.engine, cur, redraw, immediate, source, now);
        if change == CurrentChange::ShowNow {
            self.show_overlay(false);
        }
        self.selection.current()
    }

    pub fn set_persistent(&mut self, arg: Persist, source: Option<&str>) -> bool {
        self.selection.set_persistent(arg, source, &mut self.log)
    }

    /// Pointer entered (`over`) or left the point at `index` on `tier`.
    ///
    /// Entering a point that is currently invisible counts as leaving it.
    pub fn highlight_point(&mut self, index: usize, tier: Tier, over: bool, now: Millis) {
        let over = over && self.is_point_visible(index);
        self.highlight.set_hover(index, tier, over);
        if !self.selection.is_persistent() {
            let highlighted = self.highlight.highlighted();
            self.set_current_point(highlighted, Redraw::Auto, false, "map", now);
        }
    }

    fn is_point_visible(&self, index: usize) -> bool {
        let vpf = self.engine.vertices_per_feature();
        index
            .checked_mul(vpf)
            .and_then(|start| {
                self.engine
                    .source_buffer(VertexAttribute::FillOpacity)
                    .get(start)
            })
            .is_some_and(|o| *o != 0.0)
    }

    pub fn pointer_down(&mut self, now: Millis) {
        self.clock = self.clock.max(now);
        self.last_pointer_down = Some(now);
    }

    /// Handles a click on the map surface.
    ///
    /// Returns `true` if the click was consumed and should not propagate.
    /// Clicks that end a pan gesture are ignored.
    pub fn click(&mut self, now: Millis) -> bool {
        self.clock = self.clock.max(now);
        if let (Some(down), Some(pan)) = (self.last_pointer_down, self.last_pan)
            && down < pan
        {
            tracing::debug!(?down, ?pan, "click suppressed by pan");
            return false;
        }
        if !self.engine.is_visible() {
            self.set_current_point(None, Redraw::Force, true, "map", now);
            return false;
        }

        let index = self.highlight.highlighted();
        let pin = self.selection.persistence_target(Persist::from(index));
        if !pin {
            self.selection
                .set_persistent(Persist::Set(false), None, &mut self.log);
        }
        let change =
            self.selection
                .set_current(&mut self.engine, index, Redraw::Force, true, "map", now);
        if pin {
            self.selection
                .set_persistent(Persist::Set(true), None, &mut self.log);
        }
        if change == CurrentChange::ShowNow {
            self.show_overlay(false);
        }
        true
    }

    /// Records a pan so a trailing click can be told apart; a pinned overlay
    /// follows its point. A zero `screen_delta` is not a pan.
    pub fn pan(&mut self, screen_delta: Option<Vec2>, now: Millis) {
        if screen_delta.is_some_and(Vec2::is_zero) {
            return;
        }
        self.clock = self.clock.max(now);
        self.last_pan = Some(now);
        if self.selection.is_persistent() && self.selection.current().is_some() {
            self.show_overlay(true);
        }
    }

    /// Pointer left the whole map surface.
    pub fn map_pointer_leave(&mut self, now: Millis) {
        if self.selection.should_clear_on_map_leave() {
            self.set_current_point(None, Redraw::Auto, false, "", now);
        }
    }

    pub fn overlay_pointer_enter(&mut self) {
        if self.card.controls == OverlayControls::Ephemeral {
            self.selection.timer_mut().cancel_pending();
        }
    }

    pub fn overlay_pointer_leave(&mut self, now: Millis) {
        if self.card.controls == OverlayControls::Ephemeral {
            self.clock = self.clock.max(now);
            self.selection
                .timer_mut()
                .schedule(now, DISMISS_DELAY_MS, OverlayAction::Dismiss);
        }
    }

    /// Close button of a pinned overlay.
    pub fn overlay_close(&mut self, now: Millis) {
        if self.card.controls == OverlayControls::Pinned {
            self.set_current_point(None, Redraw::Force, true, "", now);
        }
    }

    /// Overlay image finished loading (`ok`) or failed.
    pub fn image_loaded(&mut self, ok: bool) {
        if !self.card.finish_image(ok) {
            return;
        }
        let source = self.selection.source();
        let url = self.card.image.orig_url.clone().unwrap_or_default();
        let payload = if ok {
            json!({"source": source, "imageUrl": self.card.image.image_url, "url": url})
        } else {
            json!({"source": source, "url": url})
        };
        self.log
            .log_activity("show_overlay", "map", payload, OVERLAY_CATEGORY);
    }

    /// Centers the map on the current point, or the point the overlay last showed.
    pub fn center_on_map(&mut self) -> bool {
        let Some(index) = self.selection.current().or(self.card.point) else {
            return false;
        };
        let Some(record) = self.dataset.as_ref().and_then(|d| d.record(index)) else {
            return false;
        };
        self.engine
            .transition(record.position(), CENTER_TRANSITION_MS);
        true
    }

    /// Runs deferred overlay work that is due at `now`.
    pub fn tick(&mut self, now: Millis) {
        self.clock = self.clock.max(now);
        match self.selection.take_due(now) {
            Some(OverlayAction::Show) => self.show_overlay(false),
            Some(OverlayAction::Dismiss) => {
                self.set_current_point(None, Redraw::Force, true, "", now);
            }
            None => {}
        }
    }

    /// Shows, moves or hides the overlay for the current point.
    ///
    /// With `only_move` the content and controls are left untouched.
    pub fn show_overlay(&mut self, only_move: bool) {
        let current = self.selection.current();
        let record = current.and_then(|i| self.dataset.as_ref()?.record(i).map(|r| (i, r)));
        let Some((index, record)) = record else {
            if self.card.hide() {
                self.log.log_activity(
                    "hide_overlay",
                    "map",
                    json!({"url": null}),
                    OVERLAY_CATEGORY,
                );
            }
            return;
        };

        let projected = self.engine.gcs_to_display(record.position());
        self.card.geometry = Some(place_overlay(projected, self.engine.viewport_size()));
        self.card.point = Some(index);
        if only_move {
            return;
        }

        let pinned = self.selection.is_persistent();
        self.card.content = Some(CardContent::for_record(record, pinned));
        self.card.controls = if pinned {
            OverlayControls::Pinned
        } else {
            OverlayControls::Ephemeral
        };
        if self.card.request_image(&record.image_url) {
            tracing::debug!(index, url = %record.image_url, "loading overlay image");
        }
    }

    fn point_style(&self) -> PointStyle {
        PointStyle {
            fill_color: parse_hex_color(&self.config.point_color),
            fill_opacity: self.base_opacity(),
            stroke_color: parse_hex_color(&self.config.stroke_color),
            stroke_opacity: 1.0,
            stroke_width: self.config.stroke_width,
            stroke: false,
            radius: self.config.radius,
        }
    }

    fn base_opacity(&self) -> f32 {
        self.params.base_opacity(self.config.default_opacity)
    }
}

impl<E: PointEngine, L: ActivityLog> MapLayer for InstagramLayer<E, L> {
    type State = LayerState;

    fn id(&self) -> LayerId {
        self.id
    }

    fn datakey(&self) -> &str {
        DATAKEY
    }

    fn param_changed_keys(&self) -> &'static [&'static str] {
        PARAM_CHANGED_KEYS
    }

    fn update_map_params(&mut self, params: &MapParams) {
        self.params = params.clone();
        let window = params.date_window().unwrap_or_else(|err| {
            tracing::warn!(%err, "ignoring date filter");
            DateWindow::forever()
        });
        if let Some(max) = params.max_points.filter(|m| *m > 0) {
            self.max_points = max;
        }
        self.dataset = self.table.as_ref().and_then(|t| {
            PointDataset::from_table(t, window, self.max_points)
                .inspect_err(|err| tracing::warn!(%err, "point data unavailable"))
                .ok()
        });
        self.highlight.clear();

        let visible = params.is_visible() && self.dataset.is_some();
        self.engine.set_visible(visible);
        if !visible {
            return;
        }

        let positions: Vec<LonLat> = self
            .dataset
            .as_ref()
            .map(|d| d.displayed().iter().map(|r| r.position()).collect())
            .unwrap_or_default();
        let style = self.point_style();
        self.engine.set_points(&positions, &style);
        tracing::debug!(points = positions.len(), "updated post layer");
        let now = self.clock;
        self.set_current_point(None, Redraw::Suppress, false, "", now);
    }

    fn bin_for_animation(
        &mut self,
        start: EpochMs,
        range_ms: i64,
        bin_width_ms: i64,
    ) -> Result<(), AnimationError> {
        let window = AnimationWindow::new(start, range_ms, bin_width_ms)?;
        match &self.dataset {
            Some(dataset) => self.binner.compute(dataset, &window),
            None => self.binner = AnimationBinner::new(),
        }
        Ok(())
    }

    fn animate_frame(&mut self, frame: &AnimationFrame) {
        let opacity = self.params.animation_opacity(frame.opacity);
        self.binner.apply_frame(&mut self.engine, frame, opacity);
    }

    fn animate_stop(&mut self) {
        let Some(num_points) = self.dataset.as_ref().map(PointDataset::num_points) else {
            return;
        };
        let base = self.base_opacity();
        self.binner.stop(&mut self.engine, num_points, base);
    }

    fn internal_state(&self) -> LayerState {
        LayerState {
            current_point: self.selection.current(),
            current_point_source: self.selection.source().to_string(),
            persistent_current_point: self.selection.is_persistent(),
            phase: self.selection.phase(),
            in_points: self.highlight.clone(),
            default_opacity: self.config.default_opacity,
            point_color: parse_hex_color(&self.config.point_color),
            stroke_color: parse_hex_color(&self.config.stroke_color),
            num_points: self.dataset.as_ref().map_or(0, PointDataset::num_points),
            animating: self.binner.is_active(),
            overlay: self.card.clone(),
        }
    }
}
