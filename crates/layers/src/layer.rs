use foundation::time::EpochMs;

use crate::animation::{AnimationError, AnimationFrame};
use crate::params::MapParams;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LayerId(pub u64);

/// Capabilities the map shell drives on every data layer.
pub trait MapLayer {
    /// Snapshot returned by [`MapLayer::internal_state`].
    type State;

    fn id(&self) -> LayerId;

    /// Name of the dataset this layer renders.
    fn datakey(&self) -> &str;

    /// Parameter keys whose change requires [`MapLayer::update_map_params`].
    fn param_changed_keys(&self) -> &'static [&'static str];

    fn update_map_params(&mut self, params: &MapParams);

    /// Precomputes time bins for an animation session.
    ///
    /// `range_ms` is the animation cycle and `bin_width_ms` the width of one bin.
    fn bin_for_animation(
        &mut self,
        start: EpochMs,
        range_ms: i64,
        bin_width_ms: i64,
    ) -> Result<(), AnimationError>;

    fn animate_frame(&mut self, frame: &AnimationFrame);

    /// Stops any animation and shows the unanimated data.
    fn animate_stop(&mut self);

    fn internal_state(&self) -> Self::State;
}
