use std::collections::BTreeMap;

use foundation::math::LonLat;
use foundation::time::{DateWindow, EpochMs};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const COL_LONGITUDE: &str = "longitude";
pub const COL_LATITUDE: &str = "latitude";
pub const COL_POSTED_DATE: &str = "posted_date";
pub const COL_CAPTION: &str = "caption";
pub const COL_IMAGE_URL: &str = "image_url";

const REQUIRED_COLUMNS: [&str; 5] = [
    COL_LONGITUDE,
    COL_LATITUDE,
    COL_POSTED_DATE,
    COL_CAPTION,
    COL_IMAGE_URL,
];

/// Raw tabular point data as delivered by the data endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointTable {
    pub columns: BTreeMap<String, usize>,
    pub data: Vec<Vec<Value>>,
}

impl PointTable {
    pub fn from_json(raw: &str) -> Result<Self, DatasetError> {
        serde_json::from_str(raw).map_err(|e| DatasetError::Json(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetError {
    MissingColumn(&'static str),
    Json(String),
}

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetError::MissingColumn(name) => write!(f, "point table has no {name:?} column"),
            DatasetError::Json(msg) => write!(f, "invalid point table: {msg}"),
        }
    }
}

impl std::error::Error for DatasetError {}

/// One post, immutable once loaded into a dataset snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct PointRecord {
    pub longitude: f64,
    pub latitude: f64,
    pub posted_date: EpochMs,
    pub caption: String,
    pub image_url: String,
}

impl PointRecord {
    pub fn position(&self) -> LonLat {
        LonLat::new(self.longitude, self.latitude)
    }
}

/// Date-filtered snapshot of the point table.
///
/// Replaced wholesale when the filter changes; never mutated in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointDataset {
    records: Vec<PointRecord>,
    columns: BTreeMap<String, usize>,
    num_points: usize,
}

impl PointDataset {
    pub fn from_table(
        table: &PointTable,
        window: DateWindow,
        max_points: usize,
    ) -> Result<Self, DatasetError> {
        let mut idx = [0usize; 5];
        for (slot, name) in idx.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = *table
                .columns
                .get(name)
                .ok_or(DatasetError::MissingColumn(name))?;
        }
        let [lon, lat, date, caption, url] = idx;

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for row in &table.data {
            let parsed = (|| {
                Some(PointRecord {
                    longitude: number(row.get(lon)?)?,
                    latitude: number(row.get(lat)?)?,
                    posted_date: EpochMs(number(row.get(date)?)? as i64),
                    caption: text(row.get(caption)),
                    image_url: text(row.get(url)),
                })
            })();
            match parsed {
                Some(r) if window.contains(r.posted_date) => records.push(r),
                Some(_) => {}
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::warn!(skipped, "skipped malformed point rows");
        }

        let num_points = records.len().min(max_points);
        Ok(Self {
            records,
            columns: table.columns.clone(),
            num_points,
        })
    }

    pub fn from_records(records: Vec<PointRecord>, max_points: usize) -> Self {
        let columns = REQUIRED_COLUMNS
            .iter()
            .enumerate()
            .map(|(i, c)| (c.to_string(), i))
            .collect();
        let num_points = records.len().min(max_points);
        Self {
            records,
            columns,
            num_points,
        }
    }

    /// Points handed to the renderer: `min(len, max_points)`.
    pub fn num_points(&self) -> usize {
        self.num_points
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, index: usize) -> Option<&PointRecord> {
        self.records.get(index)
    }

    pub fn displayed(&self) -> &[PointRecord] {
        &self.records[..self.num_points]
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.get(name).copied()
    }
}

fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite())
}

fn text(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> PointTable {
        PointTable::from_json(
            &json!({
                "columns": {"posted_date": 0, "longitude": 1, "latitude": 2,
                            "caption": 3, "image_url": 4},
                "data": [
                    [1000, -73.9, 40.7, "first", "http://x/p/a/"],
                    [2000, "-73.8", "40.6", null, "http://x/p/b/"],
                    [3000, "bad", 40.5, "broken", "http://x/p/c/"],
                    [4000, -73.7, 40.4, "late", "http://x/p/d/"]
                ]
            })
            .to_string(),
        )
        .unwrap()
    }

    #[test]
    fn loads_and_skips_malformed_rows() {
        let ds = PointDataset::from_table(&table(), DateWindow::forever(), 100).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.num_points(), 3);
        let r = ds.record(1).unwrap();
        assert_eq!(r.position(), LonLat::new(-73.8, 40.6));
        assert_eq!(r.caption, "");
        assert_eq!(ds.column("latitude"), Some(2));
        assert!(ds.record(3).is_none());
    }

    #[test]
    fn filters_by_window_and_caps_points() {
        let w = DateWindow::new(Some(EpochMs(2000)), Some(EpochMs(4000)));
        let ds = PointDataset::from_table(&table(), w, 100).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.record(0).unwrap().posted_date, EpochMs(2000));

        let capped = PointDataset::from_table(&table(), DateWindow::forever(), 2).unwrap();
        assert_eq!(capped.len(), 3);
        assert_eq!(capped.num_points(), 2);
        assert_eq!(capped.displayed().len(), 2);
    }

    #[test]
    fn missing_column_is_an_error() {
        let mut t = table();
        t.columns.remove("image_url");
        assert_eq!(
            PointDataset::from_table(&t, DateWindow::forever(), 10),
            Err(DatasetError::MissingColumn("image_url"))
        );
    }
}
