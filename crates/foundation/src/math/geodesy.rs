/// Geographic coordinate in degrees: `x` is longitude, `y` is latitude.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct LonLat {
    pub x: f64,
    pub y: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { x: lon, y: lat }
    }

    pub fn lon(&self) -> f64 {
        self.x
    }

    pub fn lat(&self) -> f64 {
        self.y
    }
}

/// Human-readable latitude/longitude, e.g. `40.713°N 74.006°W`.
///
/// `precise` switches from 3 to 6 decimals.
pub fn format_lat_lon(pt: LonLat, precise: bool) -> String {
    let digits = if precise { 6 } else { 3 };
    let ns = if pt.lat() < 0.0 { 'S' } else { 'N' };
    let ew = if pt.lon() < 0.0 { 'W' } else { 'E' };
    format!(
        "{:.*}°{ns} {:.*}°{ew}",
        digits,
        pt.lat().abs(),
        digits,
        pt.lon().abs()
    )
}

#[cfg(test)]
mod tests {
    use super::{LonLat, format_lat_lon};

    #[test]
    fn formats_hemispheres() {
        let p = LonLat::new(-74.006, 40.7128);
        assert_eq!(format_lat_lon(p, false), "40.713°N 74.006°W");
        assert_eq!(format_lat_lon(p, true), "40.712800°N 74.006000°W");
        assert_eq!(
            format_lat_lon(LonLat::new(151.2093, -33.8688), false),
            "33.869°S 151.209°E"
        );
    }
}
