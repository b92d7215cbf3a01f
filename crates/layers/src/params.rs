use chrono::{DateTime, NaiveDate, NaiveDateTime};
use foundation::time::{DateWindow, EpochMs};
use serde::{Deserialize, Serialize};

/// Parameter keys that require [`crate::MapLayer::update_map_params`] when changed.
pub const PARAM_CHANGED_KEYS: &[&str] = &[
    "data-opacity",
    "display-date_min",
    "display-date_max",
    "show-instagram-data",
];

/// Opacity used when neither the parameters nor the config supply one.
pub const DEFAULT_OPACITY: f32 = 0.1;

/// Flat display-parameter mapping, polled by the layer on update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapParams {
    #[serde(rename = "data-opacity", skip_serializing_if = "Option::is_none")]
    pub data_opacity: Option<f32>,
    #[serde(rename = "inst-opacity", skip_serializing_if = "Option::is_none")]
    pub inst_opacity: Option<f32>,
    #[serde(rename = "display-date_min", skip_serializing_if = "Option::is_none")]
    pub date_min: Option<String>,
    #[serde(rename = "display-date_max", skip_serializing_if = "Option::is_none")]
    pub date_max: Option<String>,
    #[serde(rename = "display-max-points", skip_serializing_if = "Option::is_none")]
    pub max_points: Option<usize>,
    #[serde(rename = "show-instagram-data", skip_serializing_if = "Option::is_none")]
    pub show_data: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamsError {
    InvalidDate { key: &'static str, value: String },
    Json(String),
}

impl std::fmt::Display for ParamsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamsError::InvalidDate { key, value } => {
                write!(f, "invalid date for {key}: {value:?}")
            }
            ParamsError::Json(msg) => write!(f, "invalid map parameters: {msg}"),
        }
    }
}

impl std::error::Error for ParamsError {}

impl MapParams {
    pub fn from_json(raw: &str) -> Result<Self, ParamsError> {
        serde_json::from_str(raw).map_err(|e| ParamsError::Json(e.to_string()))
    }

    pub fn is_visible(&self) -> bool {
        self.show_data != Some(false)
    }

    pub fn date_window(&self) -> Result<DateWindow, ParamsError> {
        let min = parse_bound("display-date_min", self.date_min.as_deref())?;
        let max = parse_bound("display-date_max", self.date_max.as_deref())?;
        Ok(DateWindow::new(min, max))
    }

    /// Opacity for points outside of an animation.
    ///
    /// A positive `data-opacity` overrides `inst-opacity`.
    pub fn base_opacity(&self, fallback: f32) -> f32 {
        positive(self.data_opacity)
            .or(positive(self.inst_opacity))
            .unwrap_or(fallback)
    }

    /// Opacity for points inside the active animation bins.
    pub fn animation_opacity(&self, frame_opacity: Option<f32>) -> f32 {
        match positive(self.data_opacity) {
            Some(o) => (o * 1.5).min(1.0),
            None => frame_opacity.unwrap_or(DEFAULT_OPACITY),
        }
    }
}

fn positive(v: Option<f32>) -> Option<f32> {
    v.filter(|o| *o > 0.0)
}

fn parse_bound(key: &'static str, raw: Option<&str>) -> Result<Option<EpochMs>, ParamsError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    parse_utc_ms(raw)
        .map(Some)
        .ok_or_else(|| ParamsError::InvalidDate {
            key,
            value: raw.to_string(),
        })
}

/// Parses an ISO-8601 date or date-time; values without an offset are UTC.
pub fn parse_utc_ms(raw: &str) -> Option<EpochMs> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(EpochMs(dt.timestamp_millis()));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(EpochMs(dt.and_utc().timestamp_millis()));
        }
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(EpochMs(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis()))
}

/// Static layer configuration supplied at construction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    pub default_opacity: f32,
    pub max_points: usize,
    pub point_color: String,
    pub stroke_color: String,
    pub stroke_width: f32,
    pub radius: f32,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            default_opacity: DEFAULT_OPACITY,
            max_points: 50_000,
            point_color: "#FF0000".to_string(),
            stroke_color: "#E69F00".to_string(),
            stroke_width: 5.0,
            radius: 5.0,
        }
    }
}

/// Parses `#RRGGBB` (or `RRGGBB`) into normalized RGB; invalid input is black.
pub fn parse_hex_color(raw: &str) -> [f32; 3] {
    let hex = raw.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return [0.0; 3];
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map(|v| v as f32 / 255.0)
            .unwrap_or(0.0)
    };
    [channel(0), channel(2), channel(4)]
}
