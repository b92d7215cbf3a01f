//! Scripted interaction replay for the post layer.
//!
//! A script is a JSON array of timestamped UI events. Each event is fed to an
//! [`InstagramLayer`] backed by the software engine; activity records are
//! written as JSON lines as they are produced.

use std::io::Write;

use foundation::math::{LonLat, Vec2};
use foundation::time::{EpochMs, Millis};
use layers::MapLayer;
use layers::animation::{AnimationError, AnimationFrame};
use layers::dataset::DatasetError;
use layers::engine::SoftwareEngine;
use layers::highlight::Tier;
use layers::instagram::InstagramLayer;
use layers::params::{MapParams, ParamsError};
use layers::selection::{Persist, Redraw, parse_point_index};
use runtime::activity::ActivityRecorder;
use serde::Deserialize;
use serde_json::Value;

pub type ReplayLayer = InstagramLayer<SoftwareEngine, ActivityRecorder>;

#[derive(Debug)]
pub enum ReplayError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Dataset(DatasetError),
    Params(ParamsError),
    Animation(AnimationError),
}

impl std::fmt::Display for ReplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplayError::Io(e) => write!(f, "io error: {e}"),
            ReplayError::Json(e) => write!(f, "invalid json: {e}"),
            ReplayError::Dataset(e) => write!(f, "{e}"),
            ReplayError::Params(e) => write!(f, "{e}"),
            ReplayError::Animation(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ReplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReplayError::Io(e) => Some(e),
            ReplayError::Json(e) => Some(e),
            ReplayError::Dataset(e) => Some(e),
            ReplayError::Params(e) => Some(e),
            ReplayError::Animation(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ReplayError {
    fn from(e: std::io::Error) -> Self {
        ReplayError::Io(e)
    }
}

impl From<serde_json::Error> for ReplayError {
    fn from(e: serde_json::Error) -> Self {
        ReplayError::Json(e)
    }
}

impl From<DatasetError> for ReplayError {
    fn from(e: DatasetError) -> Self {
        ReplayError::Dataset(e)
    }
}

impl From<ParamsError> for ReplayError {
    fn from(e: ParamsError) -> Self {
        ReplayError::Params(e)
    }
}

impl From<AnimationError> for ReplayError {
    fn from(e: AnimationError) -> Self {
        ReplayError::Animation(e)
    }
}

/// One scripted UI event. `at` is the host clock in milliseconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptEvent {
    Hover {
        at: u64,
        index: usize,
        #[serde(default)]
        tier: Tier,
        over: bool,
    },
    PointerDown {
        at: u64,
    },
    Click {
        at: u64,
    },
    Pan {
        at: u64,
        #[serde(default)]
        dx: f64,
        #[serde(default)]
        dy: f64,
    },
    MapLeave {
        at: u64,
    },
    OverlayEnter,
    OverlayLeave {
        at: u64,
    },
    OverlayClose {
        at: u64,
    },
    ImageLoad {
        ok: bool,
    },
    CenterOnMap,
    Tick {
        at: u64,
    },
    /// Loosely typed selection, as a UI shell would send it.
    Select {
        at: u64,
        point: Value,
        #[serde(default)]
        immediate: bool,
        #[serde(default)]
        source: String,
    },
    Persist {
        value: Value,
        #[serde(default)]
        source: Option<String>,
    },
    Params {
        params: MapParams,
    },
    BinForAnimation {
        start: i64,
        range_ms: i64,
        bin_width_ms: i64,
    },
    AnimateFrame {
        num_bins: i64,
        step: i64,
        substeps: i64,
        #[serde(default)]
        opacity: Option<f32>,
    },
    AnimateStop,
}

pub fn parse_script(raw: &str) -> Result<Vec<ScriptEvent>, ReplayError> {
    Ok(serde_json::from_str(raw)?)
}

/// Feeds `events` to `layer`, writing activity records to `out` as JSON lines.
pub fn run_script<W: Write>(
    layer: &mut ReplayLayer,
    events: &[ScriptEvent],
    out: &mut W,
) -> Result<(), ReplayError> {
    for event in events {
        apply(layer, event)?;
        for activity in layer.log_mut().drain() {
            serde_json::to_writer(&mut *out, &activity)?;
            out.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn apply(layer: &mut ReplayLayer, event: &ScriptEvent) -> Result<(), ReplayError> {
    tracing::debug!(?event, "replay");
    match event {
        ScriptEvent::Hover {
            at,
            index,
            tier,
            over,
        } => layer.highlight_point(*index, *tier, *over, Millis(*at)),
        ScriptEvent::PointerDown { at } => layer.pointer_down(Millis(*at)),
        ScriptEvent::Click { at } => {
            layer.click(Millis(*at));
        }
        ScriptEvent::Pan { at, dx, dy } => {
            let delta = Vec2::new(*dx, *dy);
            let engine = layer.engine_mut();
            let center = engine.center();
            // Dragging right moves the view west.
            let scale = engine.px_per_degree();
            engine.pan_to(LonLat::new(
                center.lon() - delta.x / scale,
                center.lat() + delta.y / scale,
            ));
            layer.pan(Some(delta), Millis(*at));
        }
        ScriptEvent::MapLeave { at } => layer.map_pointer_leave(Millis(*at)),
        ScriptEvent::OverlayEnter => layer.overlay_pointer_enter(),
        ScriptEvent::OverlayLeave { at } => layer.overlay_pointer_leave(Millis(*at)),
        ScriptEvent::OverlayClose { at } => layer.overlay_close(Millis(*at)),
        ScriptEvent::ImageLoad { ok } => layer.image_loaded(*ok),
        ScriptEvent::CenterOnMap => {
            layer.center_on_map();
        }
        ScriptEvent::Tick { at } => layer.tick(Millis(*at)),
        ScriptEvent::Select {
            at,
            point,
            immediate,
            source,
        } => {
            layer.set_current_point(
                parse_point_index(point),
                Redraw::Auto,
                *immediate,
                source,
                Millis(*at),
            );
        }
        ScriptEvent::Persist { value, source } => {
            layer.set_persistent(Persist::from_json(value), source.as_deref());
        }
        ScriptEvent::Params { params } => {
            // Surface bad dates here; the layer itself would just ignore them.
            params.date_window()?;
            layer.update_map_params(params);
        }
        ScriptEvent::BinForAnimation {
            start,
            range_ms,
            bin_width_ms,
        } => layer.bin_for_animation(EpochMs(*start), *range_ms, *bin_width_ms)?,
        ScriptEvent::AnimateFrame {
            num_bins,
            step,
            substeps,
            opacity,
        } => layer.animate_frame(&AnimationFrame {
            num_bins: *num_bins,
            step: *step,
            substeps: *substeps,
            opacity: *opacity,
        }),
        ScriptEvent::AnimateStop => layer.animate_stop(),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use layers::params::LayerConfig;
    use pretty_assertions::assert_eq;

    const TABLE: &str = r#"{
        "columns": {"longitude": 0, "latitude": 1, "posted_date": 2, "caption": 3, "image_url": 4},
        "data": [
            [0.0, 0.0, 0, "a", "https://instagram.com/p/a/"],
            [2.0, 2.0, 86400000, "b", "https://instagram.com/p/b/"]
        ]
    }"#;

    fn layer() -> ReplayLayer {
        let engine = SoftwareEngine::new(Vec2::new(800.0, 600.0), LonLat::default(), 10.0);
        let mut layer =
            InstagramLayer::new(1, engine, ActivityRecorder::new(), LayerConfig::default());
        layer.load_table_json(TABLE).unwrap();
        layer
    }

    fn lines(out: &[u8]) -> Vec<Value> {
        String::from_utf8_lossy(out)
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn replays_hover_pin_and_unpin() {
        let script = parse_script(
            r#"[
                {"type": "params", "params": {}},
                {"type": "hover", "at": 0, "index": 1, "over": true},
                {"type": "pointer_down", "at": 5},
                {"type": "click", "at": 10},
                {"type": "image_load", "ok": true},
                {"type": "persist", "value": "1", "source": "overlay"}
            ]"#,
        )
        .unwrap();
        let mut layer = layer();
        let mut out = Vec::new();
        run_script(&mut layer, &script, &mut out).unwrap();

        let records = lines(&out);
        let names: Vec<_> = records.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["pin_overlay", "show_overlay", "pin_overlay"]);
        assert_eq!(records[2]["source"], "overlay");
        assert_eq!(records[1]["category"], "instagram_overlay");
        assert!(!layer.is_persistent());
        assert_eq!(layer.current_point(), Some(1));
    }

    #[test]
    fn loose_select_coerces_garbage_to_none() {
        let script = parse_script(
            r#"[
                {"type": "params", "params": {}},
                {"type": "select", "at": 0, "point": "1", "immediate": true, "source": "list"},
                {"type": "select", "at": 5, "point": "nope", "immediate": true}
            ]"#,
        )
        .unwrap();
        let mut layer = layer();
        run_script(&mut layer, &script[..2], &mut Vec::new()).unwrap();
        assert_eq!(layer.current_point(), Some(1));
        assert_eq!(layer.selection().source(), "list");
        run_script(&mut layer, &script[2..], &mut Vec::new()).unwrap();
        assert_eq!(layer.current_point(), None);
    }

    #[test]
    fn pan_moves_view_and_suppresses_click() {
        let script = parse_script(
            r#"[
                {"type": "params", "params": {}},
                {"type": "hover", "at": 0, "index": 0, "over": true},
                {"type": "pointer_down", "at": 5},
                {"type": "pan", "at": 8, "dx": 100.0},
                {"type": "click", "at": 10}
            ]"#,
        )
        .unwrap();
        let mut layer = layer();
        run_script(&mut layer, &script, &mut Vec::new()).unwrap();
        assert!(!layer.is_persistent());
        assert_eq!(layer.engine().center(), LonLat::new(-10.0, 0.0));
    }

    #[test]
    fn invalid_animation_window_is_reported() {
        let script =
            parse_script(r#"[{"type": "bin_for_animation", "start": 0, "range_ms": 0, "bin_width_ms": 1}]"#)
                .unwrap();
        let err = run_script(&mut layer(), &script, &mut Vec::new()).unwrap_err();
        assert!(matches!(
            err,
            ReplayError::Animation(AnimationError::NonPositiveRange(0))
        ));
    }

    #[test]
    fn bad_param_dates_are_reported() {
        let script = parse_script(
            r#"[{"type": "params", "params": {"display-date_min": "yesterday"}}]"#,
        )
        .unwrap();
        let err = run_script(&mut layer(), &script, &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("display-date_min"));
    }
}
