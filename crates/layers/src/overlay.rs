//! Screen-anchored detail card for the current point.
//!
//! Placement is a pure function of the projected point and the viewport.
//! [`OverlayCard`] is the state a UI shell renders; it mirrors the card's
//! CSS-class-addressed sub-elements listed in [`classes`].

use chrono::{DateTime, Utc};
use foundation::bounds::Aabb2;
use foundation::math::{Vec2, format_lat_lon};
use serde::Serialize;

use crate::dataset::PointRecord;

/// CSS classes of the overlay sub-elements. UI shells must keep these names.
pub mod classes {
    pub const OVERLAY: &str = "ga-instagram-overlay";
    pub const DATE: &str = "ga-instagram-overlay-date";
    pub const CAPTION: &str = "ga-instagram-overlay-caption";
    pub const POSITION: &str = "ga-instagram-overlay-position";
    pub const LINK: &str = "ga-instagram-overlay-link";
    pub const TITLE_BAR: &str = "ga-instagram-overlay-title-bar";
    pub const ARROW: &str = "ga-instagram-overlay-arrow";
    pub const CLOSE_BUTTON: &str = "ga-instagram-overlay-close-button";
    pub const GOTO: &str = "ga-instagram-overlay-goto";
    pub const IMAGE: &str = "ga-instagram-overlay-image";
}

/// Inward offset of the card when the point is on screen.
pub const INSIDE_OFFSET_PX: f64 = 10.0;
/// Shift of the anchoring center toward the upper right.
pub const CENTER_BIAS_PX: f64 = 5.0;

/// Distance of the card from one viewport edge.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalAnchor {
    Left(f64),
    Right(f64),
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAnchor {
    Top(f64),
    Bottom(f64),
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct OverlayGeometry {
    /// Projected point, clamped to the viewport.
    #[serde(serialize_with = "vec2_as_array")]
    pub position: Vec2,
    /// Rotation in radians of the arrow toward an off-screen point.
    pub arrow_angle: Option<f64>,
    pub horizontal: HorizontalAnchor,
    pub vertical: VerticalAnchor,
}

fn vec2_as_array<S: serde::Serializer>(v: &Vec2, s: S) -> Result<S::Ok, S::Error> {
    [v.x, v.y].serialize(s)
}

impl OverlayGeometry {
    pub fn is_clamped(&self) -> bool {
        self.arrow_angle.is_some()
    }
}

/// Places the card for a point projected to `projected` in a `viewport`.
pub fn place_overlay(projected: Vec2, viewport: Vec2) -> OverlayGeometry {
    let bounds = Aabb2::from_size(viewport);
    let (position, arrow_angle, offset) = if bounds.contains(projected) {
        (projected, None, INSIDE_OFFSET_PX)
    } else {
        let position = bounds.clamp(projected);
        let overflow = projected - position;
        (position, Some(overflow.angle()), 0.0)
    };

    let center = bounds.center();
    let ctr_x = center.x + CENTER_BIAS_PX;
    let ctr_y = center.y - CENTER_BIAS_PX;
    let horizontal = if position.x < ctr_x {
        HorizontalAnchor::Left(position.x + offset)
    } else {
        HorizontalAnchor::Right(bounds.width() - position.x + offset)
    };
    let vertical = if position.y < ctr_y {
        VerticalAnchor::Top(position.y + offset)
    } else {
        VerticalAnchor::Bottom(bounds.height() - position.y + offset)
    };

    OverlayGeometry {
        position,
        arrow_angle,
        horizontal,
        vertical,
    }
}

/// Text shown on the card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardContent {
    pub date: String,
    pub caption: String,
    pub position: String,
    /// Full-precision position, used as the tooltip.
    pub position_title: String,
    pub url: String,
    pub title_bar_visible: bool,
}

impl CardContent {
    pub fn for_record(record: &PointRecord, pinned: bool) -> Self {
        Self {
            date: format_posted_date(record.posted_date.0),
            caption: record.caption.clone(),
            position: format_lat_lon(record.position(), false),
            position_title: format_lat_lon(record.position(), true),
            url: record.image_url.clone(),
            title_bar_visible: pinned,
        }
    }
}

/// `YYYY Mon D HH:mm` in UTC.
pub fn format_posted_date(epoch_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms)
        .map(|dt| dt.format("%Y %b %-d %H:%M").to_string())
        .unwrap_or_default()
}

/// Image URL for a post link: one trailing `/` removed, medium size.
pub fn media_url(post_url: &str) -> String {
    let base = post_url.strip_suffix('/').unwrap_or(post_url);
    format!("{base}/media?size=m")
}

/// Interactive controls bound to the card.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayControls {
    #[default]
    Unbound,
    /// Hovering the card holds it open; leaving it dismisses after a delay.
    Ephemeral,
    /// Close button and "center on map" action.
    Pinned,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageState {
    #[default]
    Empty,
    Loading,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImageSlot {
    /// Post URL the image was requested for.
    pub orig_url: Option<String>,
    pub image_url: Option<String>,
    pub state: ImageState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverlayCard {
    pub visible: bool,
    /// Point the card was last placed for; survives clearing the selection.
    pub point: Option<usize>,
    pub geometry: Option<OverlayGeometry>,
    pub content: Option<CardContent>,
    pub controls: OverlayControls,
    pub image: ImageSlot,
}

impl OverlayCard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hides the card. Returns `true` if it was visible.
    pub fn hide(&mut self) -> bool {
        std::mem::replace(&mut self.visible, false)
    }

    /// Starts loading the image for `url` unless it is already the card's image.
    ///
    /// Returns `true` when a new load started; the card stays hidden until
    /// the load settles.
    pub fn request_image(&mut self, url: &str) -> bool {
        if self.image.orig_url.as_deref() == Some(url) {
            self.visible = true;
            return false;
        }
        self.visible = false;
        self.image = ImageSlot {
            orig_url: Some(url.to_string()),
            image_url: Some(media_url(url)),
            state: ImageState::Loading,
        };
        true
    }

    /// Settles a pending image load. Returns `false` if nothing was loading.
    pub fn finish_image(&mut self, ok: bool) -> bool {
        if self.image.state != ImageState::Loading {
            return false;
        }
        self.image.state = if ok {
            ImageState::Loaded
        } else {
            ImageState::Failed
        };
        self.visible = true;
        true
    }
}
