//! faceratio-core: facial proportion metrics from landmark geometry.
//!
//! Resolves named anatomical landmarks from a detector's output, derives a
//! fixed battery of normalized ratios (thirds, fifths, symmetry, feature
//! indices) and classifies them against reference ranges.

pub mod detector;
pub mod face_detector;
pub mod geometry;
pub mod ideal;
pub mod landmarks;
pub mod metrics;
pub mod types;

pub use detector::{DetectorError, FaceMeshDetector, LandmarkSource};
pub use face_detector::FaceDetector;
pub use ideal::{evaluate, Evaluation, IdealRange, IdealTable, IdealTableError, Status};
pub use landmarks::{Landmark, LandmarkError, LandmarkScheme, Landmarks};
pub use metrics::{extract_metrics, roll_deg, FacialMetrics};
pub use types::{FaceBox, LandmarkSet, Point};

/// File name of the face landmark model inside the model directory.
pub const FACE_MESH_MODEL_FILE: &str = "face_landmark.onnx";

/// File name of the SCRFD face detection model inside the model directory.
pub const FACE_DETECTOR_MODEL_FILE: &str = "det_10g.onnx";

/// Default model directory: `$XDG_DATA_HOME/faceratio/models`.
pub fn default_model_dir() -> std::path::PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            std::path::PathBuf::from(home).join(".local/share")
        })
        .join("faceratio/models")
}
