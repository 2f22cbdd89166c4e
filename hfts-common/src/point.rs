use std::sync::Arc;

use crate::error::{HfError, Result};

/// One sample of a named series. The name is shared, not borrowed, so points
/// outlive the batch they were built from.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub name: Arc<str>,
    pub value: f64,
    pub timestamp: i64,
}

impl Point {
    pub fn new(name: impl Into<Arc<str>>, value: f64, timestamp: i64) -> Self {
        Point {
            name: name.into(),
            value,
            timestamp,
        }
    }
}

/// Columnar form of a same-named batch.
#[derive(Debug, Clone, PartialEq)]
pub struct PointBatch {
    pub name: Arc<str>,
    pub timestamps: Vec<i64>,
    pub values: Vec<f64>,
}

impl PointBatch {
    pub fn new(name: impl Into<Arc<str>>, timestamps: Vec<i64>, values: Vec<f64>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(HfError::SchemaMismatch {
                timestamps: timestamps.len(),
                values: values.len(),
            });
        }
        Ok(PointBatch {
            name: name.into(),
            timestamps,
            values,
        })
    }

    /// Splits points into columns. Returns `None` for an empty slice; fails if
    /// the points carry more than one series name.
    pub fn from_points(points: &[Point]) -> Result<Option<Self>> {
        let Some(first) = points.first() else {
            return Ok(None);
        };

        let mut timestamps = Vec::with_capacity(points.len());
        let mut values = Vec::with_capacity(points.len());
        for p in points {
            if p.name != first.name {
                return Err(HfError::MixedBatch {
                    expected: first.name.to_string(),
                    found: p.name.to_string(),
                });
            }
            timestamps.push(p.timestamp);
            values.push(p.value);
        }

        Ok(Some(PointBatch {
            name: Arc::clone(&first.name),
            timestamps,
            values,
        }))
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn into_points(self) -> Vec<Point> {
        let name = self.name;
        self.timestamps
            .into_iter()
            .zip(self.values)
            .map(|(timestamp, value)| Point {
                name: Arc::clone(&name),
                value,
                timestamp,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_names_are_rejected() {
        let points = vec![Point::new("a", 1.0, 1), Point::new("b", 2.0, 2)];
        assert!(matches!(PointBatch::from_points(&points), Err(HfError::MixedBatch { .. })));
    }

    #[test]
    fn columns_zip_back_into_points() {
        let points: Vec<Point> = (0..5).map(|i| Point::new("cpu", i as f64 * 0.5, 100 + i)).collect();
        let batch = PointBatch::from_points(&points).unwrap().unwrap();
        assert_eq!(batch.timestamps, vec![100, 101, 102, 103, 104]);
        assert_eq!(batch.into_points(), points);
    }
}
