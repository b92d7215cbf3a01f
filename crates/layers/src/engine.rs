use foundation::math::{LonLat, Vec2};

/// Per-vertex attributes the interaction layer rewrites directly.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    FillOpacity,
    Stroke,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointStyle {
    pub fill_color: [f32; 3],
    pub fill_opacity: f32,
    pub stroke_color: [f32; 3],
    pub stroke_opacity: f32,
    pub stroke_width: f32,
    pub stroke: bool,
    pub radius: f32,
}

/// Point feature layer plus the map services it needs.
///
/// Every feature occupies exactly `vertices_per_feature()` consecutive
/// vertices in each attribute buffer; the count is uniform across the layer.
pub trait PointEngine {
    /// Replaces the feature data. Attribute buffers are rebuilt from `style`.
    fn set_points(&mut self, positions: &[LonLat], style: &PointStyle);
    fn set_visible(&mut self, visible: bool);
    fn is_visible(&self) -> bool;
    fn vertices_per_feature(&self) -> usize;
    fn source_buffer(&self, attr: VertexAttribute) -> &[f32];
    fn source_buffer_mut(&mut self, attr: VertexAttribute) -> &mut [f32];
    /// Uploads a buffer previously modified through `source_buffer_mut`.
    fn update_source_buffer(&mut self, attr: VertexAttribute);
    fn gcs_to_display(&self, pt: LonLat) -> Vec2;
    fn viewport_size(&self) -> Vec2;
    fn trigger_draw(&mut self);
    fn transition(&mut self, center: LonLat, duration_ms: u64);
}

/// CPU-side engine with a linear lon/lat to pixel view.
///
/// Keeps attribute buffers in memory and counts draws and uploads, which is
/// all the interaction layer observes.
#[derive(Debug, Clone)]
pub struct SoftwareEngine {
    vertices_per_feature: usize,
    viewport: Vec2,
    center: LonLat,
    px_per_degree: f64,
    visible: bool,
    positions: Vec<LonLat>,
    fill_opacity: Vec<f32>,
    stroke: Vec<f32>,
    draw_count: u64,
    upload_count: u64,
    transitions: Vec<(LonLat, u64)>,
}

impl SoftwareEngine {
    /// Triangle point sprites use 3 vertices per feature.
    pub const TRIANGLE_VERTICES: usize = 3;

    pub fn new(viewport: Vec2, center: LonLat, px_per_degree: f64) -> Self {
        Self {
            vertices_per_feature: Self::TRIANGLE_VERTICES,
            viewport,
            center,
            px_per_degree,
            visible: true,
            positions: Vec::new(),
            fill_opacity: Vec::new(),
            stroke: Vec::new(),
            draw_count: 0,
            upload_count: 0,
            transitions: Vec::new(),
        }
    }

    pub fn with_vertices_per_feature(mut self, vpf: usize) -> Self {
        self.vertices_per_feature = vpf.max(1);
        self
    }

    pub fn center(&self) -> LonLat {
        self.center
    }

    pub fn px_per_degree(&self) -> f64 {
        self.px_per_degree
    }

    /// Moves the view without an animated transition (a pan).
    pub fn pan_to(&mut self, center: LonLat) {
        self.center = center;
    }

    pub fn draw_count(&self) -> u64 {
        self.draw_count
    }

    pub fn upload_count(&self) -> u64 {
        self.upload_count
    }

    pub fn transitions(&self) -> &[(LonLat, u64)] {
        &self.transitions
    }

    pub fn positions(&self) -> &[LonLat] {
        &self.positions
    }

    /// Opacity of the first vertex of `feature`, if it exists.
    pub fn feature_opacity(&self, feature: usize) -> Option<f32> {
        let start = feature.checked_mul(self.vertices_per_feature)?;
        self.fill_opacity.get(start).copied()
    }

    pub fn feature_stroked(&self, feature: usize) -> bool {
        feature
            .checked_mul(self.vertices_per_feature)
            .and_then(|start| self.stroke.get(start))
            .is_some_and(|s| *s > 0.0)
    }
}

impl PointEngine for SoftwareEngine {
    fn set_points(&mut self, positions: &[LonLat], style: &PointStyle) {
        let vertices = positions.len() * self.vertices_per_feature;
        self.positions = positions.to_vec();
        self.fill_opacity = vec![style.fill_opacity; vertices];
        self.stroke = vec![if style.stroke { 1.0 } else { 0.0 }; vertices];
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn vertices_per_feature(&self) -> usize {
        self.vertices_per_feature
    }

    fn source_buffer(&self, attr: VertexAttribute) -> &[f32] {
        match attr {
            VertexAttribute::FillOpacity => &self.fill_opacity,
            VertexAttribute::Stroke => &self.stroke,
        }
    }

    fn source_buffer_mut(&mut self, attr: VertexAttribute) -> &mut [f32] {
        match attr {
            VertexAttribute::FillOpacity => &mut self.fill_opacity,
            VertexAttribute::Stroke => &mut self.stroke,
        }
    }

    fn update_source_buffer(&mut self, _attr: VertexAttribute) {
        self.upload_count += 1;
    }

    fn gcs_to_display(&self, pt: LonLat) -> Vec2 {
        // Screen y grows downward.
        Vec2::new(
            self.viewport.x * 0.5 + (pt.lon() - self.center.lon()) * self.px_per_degree,
            self.viewport.y * 0.5 - (pt.lat() - self.center.lat()) * self.px_per_degree,
        )
    }

    fn viewport_size(&self) -> Vec2 {
        self.viewport
    }

    fn trigger_draw(&mut self) {
        self.draw_count += 1;
    }

    fn transition(&mut self, center: LonLat, duration_ms: u64) {
        self.transitions.push((center, duration_ms));
        self.center = center;
    }
}
