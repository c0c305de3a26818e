//! Landmarks read from a JSON file instead of a model.

use faceratio_core::{DetectorError, LandmarkSet, LandmarkSource, Point};
use image::RgbImage;
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPoint {
    /// `[x, y]` or `[x, y, z]`; depth is ignored.
    Array(Vec<f64>),
    Object { x: f64, y: f64 },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFile {
    Wrapped { landmarks: Vec<RawPoint> },
    Bare(Vec<RawPoint>),
}

/// Precomputed normalized landmarks, e.g. exported from another detector.
#[derive(Debug, Clone)]
pub struct LandmarkFile {
    set: LandmarkSet,
}

impl LandmarkFile {
    pub fn open(path: &Path) -> Result<Self, DetectorError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| DetectorError::Source(format!("{}: {e}", path.display())))?;
        let file = Self::from_json_str(&text)?;
        tracing::info!(path = %path.display(), points = file.set.len(), "loaded landmark file");
        Ok(file)
    }

    pub fn from_json_str(text: &str) -> Result<Self, DetectorError> {
        let raw: RawFile = serde_json::from_str(text).map_err(|e| {
            DetectorError::Source(format!(
                "expected {{\"landmarks\": [[x, y], ...]}} or a point array: {e}"
            ))
        })?;
        let raw = match raw {
            RawFile::Wrapped { landmarks } => landmarks,
            RawFile::Bare(points) => points,
        };

        let points = raw
            .into_iter()
            .enumerate()
            .map(|(i, p)| {
                let point = match p {
                    RawPoint::Array(v) if v.len() == 2 || v.len() == 3 => Point::new(v[0], v[1]),
                    RawPoint::Array(v) => {
                        return Err(DetectorError::Source(format!(
                            "point {i} has {} coordinates, expected 2 or 3",
                            v.len()
                        )))
                    }
                    RawPoint::Object { x, y } => Point::new(x, y),
                };
                if !point.x.is_finite() || !point.y.is_finite() {
                    return Err(DetectorError::Source(format!(
                        "point {i} is not finite"
                    )));
                }
                Ok(point)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            set: LandmarkSet::new(points),
        })
    }
}

impl LandmarkSource for LandmarkFile {
    fn detect(&mut self, _image: &RgbImage) -> Result<Option<LandmarkSet>, DetectorError> {
        if self.set.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.set.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> Option<LandmarkSet> {
        let mut source = LandmarkFile::from_json_str(text).unwrap();
        source.detect(&RgbImage::new(4, 4)).unwrap()
    }

    #[test]
    fn test_wrapped_pairs() {
        let set = detect(r#"{"landmarks": [[0.1, 0.2], [0.3, 0.4, -0.02]]}"#).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(1), Some(Point::new(0.3, 0.4)));
    }

    #[test]
    fn test_bare_objects() {
        let set = detect(r#"[{"x": 0.5, "y": 0.25}]"#).unwrap();
        assert_eq!(set.get(0), Some(Point::new(0.5, 0.25)));
    }

    #[test]
    fn test_empty_means_no_face() {
        assert!(detect(r#"{"landmarks": []}"#).is_none());
        assert!(detect("[]").is_none());
    }

    #[test]
    fn test_rejects_bad_points() {
        assert!(matches!(
            LandmarkFile::from_json_str("[[0.1]]"),
            Err(DetectorError::Source(_))
        ));
        assert!(matches!(
            LandmarkFile::from_json_str(r#"{"points": []}"#),
            Err(DetectorError::Source(_))
        ));
    }

    #[test]
    fn test_open_missing_file() {
        let err = LandmarkFile::open(Path::new("/nonexistent/landmarks.json")).unwrap_err();
        assert!(matches!(err, DetectorError::Source(_)));
        assert!(err.to_string().starts_with("landmark source: "));
        assert!(err.to_string().contains("/nonexistent/landmarks.json"));
    }
}
