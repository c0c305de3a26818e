//! Landmark sources, including the MediaPipe face-mesh model via ONNX Runtime.
//!
//! The face-mesh model regresses 468 (or 478 with iris refinement) 3D points
//! from a 192×192 RGB face crop, plus a face presence logit. The crop comes
//! from the most confident SCRFD box, enlarged by a quarter of its size on
//! every side, so faces far smaller than the photo still fill the input.

use crate::face_detector::FaceDetector;
use crate::types::{FaceBox, LandmarkSet, Point};
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

// --- Named constants (no magic numbers) ---
const MESH_INPUT_SIZE: u32 = 192;
const MESH_MIN_POINTS: usize = 468;
const MESH_VALUES_PER_POINT: usize = 3;
/// Crop side relative to the larger side of the face box.
const MESH_CROP_SCALE: f32 = 1.5;
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0}, place the ONNX model there or set FACERATIO_MODEL_DIR")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("landmark source: {0}")]
    Source(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Anything that turns an image into one face's landmarks.
pub trait LandmarkSource {
    /// Landmarks of the face in `image`, or `None` when no face was found.
    fn detect(&mut self, image: &RgbImage) -> Result<Option<LandmarkSet>, DetectorError>;
}

/// Metadata for coordinate de-mapping after letterbox resize.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct LetterboxInfo {
    pub(crate) scale: f32,
    pub(crate) pad_x: f32,
    pub(crate) pad_y: f32,
    pub(crate) new_w: u32,
    pub(crate) new_h: u32,
}

impl LetterboxInfo {
    /// Fit `width × height` inside a centred `size × size` model input.
    pub(crate) fn fit(width: u32, height: u32, size: u32) -> Self {
        let side = size as f32;
        let scale = (side / width as f32).min(side / height as f32);
        let new_w = ((width as f32 * scale).round() as u32).clamp(1, size);
        let new_h = ((height as f32 * scale).round() as u32).clamp(1, size);
        Self {
            scale,
            pad_x: ((size - new_w) / 2) as f32,
            pad_y: ((size - new_h) / 2) as f32,
            new_w,
            new_h,
        }
    }

    /// Pixel of the resized image under input pixel `(x, y)`, `None` in the padding.
    pub(crate) fn resized_pixel(&self, x: u32, y: u32) -> Option<(u32, u32)> {
        let (pad_x, pad_y) = (self.pad_x as u32, self.pad_y as u32);
        if x < pad_x || y < pad_y || x >= pad_x + self.new_w || y >= pad_y + self.new_h {
            return None;
        }
        Some((x - pad_x, y - pad_y))
    }

    /// Map a model-input coordinate back to the letterboxed image.
    pub(crate) fn to_source(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Region of the photo fed to the mesh model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CropRegion {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl CropRegion {
    /// Square of [`MESH_CROP_SCALE`] times the larger box side, centred on
    /// the face and clipped to the image.
    fn around(face: &FaceBox, image_w: u32, image_h: u32) -> Option<Self> {
        let (cx, cy) = face.center();
        let half = face.width.max(face.height) * MESH_CROP_SCALE / 2.0;
        if !(half > 0.0 && cx.is_finite() && cy.is_finite()) {
            return None;
        }

        let x0 = (cx - half).floor().max(0.0) as u32;
        let y0 = (cy - half).floor().max(0.0) as u32;
        let x1 = ((cx + half).ceil().max(0.0) as u32).min(image_w);
        let y1 = ((cy + half).ceil().max(0.0) as u32).min(image_h);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Self {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }
}

/// Output tensor positions: mesh, and face presence when the model has one.
type OutputIndices = (usize, Option<usize>);

/// Two-stage MediaPipe-style landmarker: SCRFD face box, then face mesh on the crop.
pub struct FaceMeshDetector {
    faces: FaceDetector,
    session: Session,
    output_names: Vec<String>,
    min_confidence: f32,
}

impl FaceMeshDetector {
    /// Load the SCRFD face detector and the face landmark ONNX model.
    pub fn load(
        face_model_path: &Path,
        mesh_model_path: &Path,
        intra_threads: usize,
    ) -> Result<Self, DetectorError> {
        let faces = FaceDetector::load(face_model_path, intra_threads)?;

        if !mesh_model_path.exists() {
            return Err(DetectorError::ModelNotFound(mesh_model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(intra_threads.max(1))?
            .commit_from_file(mesh_model_path)?;

        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();

        tracing::info!(
            path = %mesh_model_path.display(),
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?output_names,
            "loaded face mesh model"
        );

        if output_names.is_empty() {
            return Err(DetectorError::InferenceFailed(
                "face mesh model has no outputs".to_string(),
            ));
        }

        Ok(Self {
            faces,
            session,
            output_names,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        })
    }

    /// Minimum face box score and face presence probability for a detection to count.
    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.faces = self.faces.with_min_confidence(min_confidence);
        self.min_confidence = min_confidence;
        self
    }

    /// Letterbox an RGB crop into a NHWC float tensor in `[0, 1]`.
    fn preprocess(image: &RgbImage) -> (Array4<f32>, LetterboxInfo) {
        let letterbox = LetterboxInfo::fit(image.width(), image.height(), MESH_INPUT_SIZE);
        let resized = imageops::resize(image, letterbox.new_w, letterbox.new_h, FilterType::Triangle);

        let size = MESH_INPUT_SIZE as usize;
        let tensor = Array4::from_shape_fn((1, size, size, 3), |(_, y, x, c)| {
            letterbox
                .resized_pixel(x as u32, y as u32)
                .map_or(0.0, |(rx, ry)| f32::from(resized.get_pixel(rx, ry)[c]) / 255.0)
        });

        (tensor, letterbox)
    }
}

impl LandmarkSource for FaceMeshDetector {
    fn detect(&mut self, image: &RgbImage) -> Result<Option<LandmarkSet>, DetectorError> {
        let faces = self.faces.detect(image)?;
        let Some(face) = faces.first() else {
            tracing::debug!(threshold = self.min_confidence, "no face box above threshold");
            return Ok(None);
        };
        if faces.len() > 1 {
            tracing::info!(faces = faces.len(), "several faces detected, measuring the most confident one");
        }

        let Some(crop) = CropRegion::around(face, image.width(), image.height()) else {
            tracing::debug!(?face, "face box lies outside the image");
            return Ok(None);
        };
        tracing::debug!(?face, ?crop, "face mesh crop");

        let face_img = imageops::crop_imm(image, crop.x, crop.y, crop.width, crop.height).to_image();
        let (input, letterbox) = Self::preprocess(&face_img);
        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut tensors: Vec<Vec<f32>> = Vec::with_capacity(self.output_names.len());
        for name in &self.output_names {
            let (_, data) = outputs[name.as_str()]
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectorError::InferenceFailed(format!("output {name}: {e}")))?;
            tensors.push(data.to_vec());
        }

        let lengths: Vec<usize> = tensors.iter().map(Vec::len).collect();
        let (mesh_idx, score_idx) = discover_outputs(&lengths).ok_or_else(|| {
            DetectorError::InferenceFailed(format!(
                "no output holds {MESH_MIN_POINTS}×{MESH_VALUES_PER_POINT} landmark values (output sizes {lengths:?})"
            ))
        })?;

        match score_idx {
            Some(idx) => {
                let presence = sigmoid(tensors[idx][0]);
                tracing::debug!(presence, threshold = self.min_confidence, "face presence");
                if presence < self.min_confidence {
                    return Ok(None);
                }
            }
            None => tracing::debug!("face mesh model has no presence output, trusting the face box"),
        }

        let set = decode_mesh(
            &tensors[mesh_idx],
            &letterbox,
            &crop,
            image.width(),
            image.height(),
        );
        tracing::debug!(points = set.len(), "decoded face mesh");
        Ok(Some(set))
    }
}

/// Pick the mesh tensor (largest, ≥ 468×3 values, multiple of 3) and the
/// single-value presence tensor by size.
fn discover_outputs(lengths: &[usize]) -> Option<OutputIndices> {
    let mesh = lengths
        .iter()
        .enumerate()
        .filter(|(_, &len)| {
            len >= MESH_MIN_POINTS * MESH_VALUES_PER_POINT && len % MESH_VALUES_PER_POINT == 0
        })
        .max_by_key(|(_, &len)| len)
        .map(|(i, _)| i)?;
    let score = lengths.iter().position(|&len| len == 1);
    Some((mesh, score))
}

/// Map `[x, y, z, x, y, z, ...]` in model-input pixels to normalized image
/// coordinates, through the letterbox and then the crop offset.
fn decode_mesh(
    values: &[f32],
    letterbox: &LetterboxInfo,
    crop: &CropRegion,
    width: u32,
    height: u32,
) -> LandmarkSet {
    let points = values
        .chunks_exact(MESH_VALUES_PER_POINT)
        .map(|v| {
            let (x, y) = letterbox.to_source(v[0], v[1]);
            Point::new(
                (f64::from(x) + f64::from(crop.x)) / f64::from(width),
                (f64::from(y) + f64::from(crop.y)) / f64::from(height),
            )
        })
        .collect();
    LandmarkSet::new(points)
}

fn sigmoid(logit: f32) -> f32 {
    1.0 / (1.0 + (-logit).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face_box(x: f32, y: f32, w: f32, h: f32) -> FaceBox {
        FaceBox {
            x,
            y,
            width: w,
            height: h,
            confidence: 0.9,
        }
    }

    #[test]
    fn test_letterbox_landscape() {
        let lb = LetterboxInfo::fit(640, 480, MESH_INPUT_SIZE);
        assert!((lb.scale - 0.3).abs() < 1e-6);
        assert_eq!((lb.new_w, lb.new_h), (192, 144));
        assert_eq!((lb.pad_x, lb.pad_y), (0.0, 24.0));
        assert_eq!(lb.resized_pixel(0, 23), None);
        assert_eq!(lb.resized_pixel(5, 24), Some((5, 0)));
        assert_eq!(lb.resized_pixel(5, 168), None);
    }

    #[test]
    fn test_letterbox_portrait() {
        let lb = LetterboxInfo::fit(300, 600, MESH_INPUT_SIZE);
        assert_eq!((lb.new_w, lb.new_h), (96, 192));
        assert_eq!((lb.pad_x, lb.pad_y), (48.0, 0.0));
        let (x, y) = lb.to_source(48.0 + 96.0, 192.0);
        assert!((x - 300.0).abs() < 1e-3 && (y - 600.0).abs() < 1e-3);
    }

    #[test]
    fn test_crop_is_enlarged_square_around_face() {
        let crop = CropRegion::around(&face_box(400.0, 300.0, 200.0, 240.0), 1000, 1000).unwrap();
        // Centre (500, 420), side 360.
        assert_eq!(
            crop,
            CropRegion {
                x: 320,
                y: 240,
                width: 360,
                height: 360
            }
        );
    }

    #[test]
    fn test_crop_is_clipped_to_image() {
        let crop = CropRegion::around(&face_box(-20.0, 10.0, 100.0, 100.0), 200, 120).unwrap();
        assert_eq!((crop.x, crop.y), (0, 0));
        assert_eq!((crop.width, crop.height), (105, 120));
    }

    #[test]
    fn test_degenerate_crop_is_rejected() {
        assert!(CropRegion::around(&face_box(10.0, 10.0, 0.0, 0.0), 100, 100).is_none());
        assert!(CropRegion::around(&face_box(500.0, 500.0, 20.0, 20.0), 100, 100).is_none());
        assert!(CropRegion::around(&face_box(f32::NAN, 0.0, 20.0, 20.0), 100, 100).is_none());
    }

    #[test]
    fn test_small_face_in_large_photo_fills_mesh_input() {
        // A 400 px face in a 4000×3000 group photo.
        let face = face_box(1800.0, 1200.0, 400.0, 400.0);
        let crop = CropRegion::around(&face, 4000, 3000).unwrap();
        assert_eq!((crop.width, crop.height), (600, 600));

        let lb = LetterboxInfo::fit(crop.width, crop.height, MESH_INPUT_SIZE);
        let face_in_input = face.width * lb.scale;
        assert!((face_in_input - 128.0).abs() < 1e-3, "face spans {face_in_input} px");
    }

    #[test]
    fn test_decode_mesh_maps_through_crop_and_letterbox() {
        let (w, h) = (1000u32, 800u32);
        let crop = CropRegion {
            x: 300,
            y: 200,
            width: 200,
            height: 400,
        };
        let lb = LetterboxInfo::fit(crop.width, crop.height, MESH_INPUT_SIZE);

        // Crop centre (100, 200) is image point (400, 400).
        let lx = 100.0 * lb.scale + lb.pad_x;
        let ly = 200.0 * lb.scale + lb.pad_y;
        let set = decode_mesh(&[lx, ly, 0.0, lb.pad_x, lb.pad_y, 0.0], &lb, &crop, w, h);

        assert_eq!(set.len(), 2);
        let centre = set.get(0).unwrap();
        assert!((centre.x - 0.4).abs() < 1e-4, "x = {}", centre.x);
        assert!((centre.y - 0.5).abs() < 1e-4, "y = {}", centre.y);
        // Crop origin.
        let origin = set.get(1).unwrap();
        assert!((origin.x - 0.3).abs() < 1e-6 && (origin.y - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_discover_outputs() {
        assert_eq!(discover_outputs(&[1404, 1]), Some((0, Some(1))));
        assert_eq!(discover_outputs(&[1, 1434, 1404]), Some((1, Some(0))));
        assert_eq!(discover_outputs(&[1404]), Some((0, None)));
        assert_eq!(discover_outputs(&[10, 1]), None);
        // Not a multiple of three.
        assert_eq!(discover_outputs(&[1405, 1]), None);
    }

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(10.0) > 0.99);
        assert!(sigmoid(-10.0) < 0.01);
    }

    #[test]
    fn test_preprocess_pads_with_zero_and_scales_pixels() {
        let image = RgbImage::from_pixel(100, 50, image::Rgb([255, 0, 51]));
        let (tensor, lb) = FaceMeshDetector::preprocess(&image);
        assert_eq!(tensor.shape(), &[1, 192, 192, 3]);
        assert_eq!((lb.pad_x, lb.pad_y), (0.0, 48.0));

        // Padding rows stay zero.
        assert_eq!(tensor[[0, 0, 0, 0]], 0.0);
        // Image rows carry the normalized colour.
        assert!((tensor[[0, 96, 96, 0]] - 1.0).abs() < 1e-6);
        assert!(tensor[[0, 96, 96, 1]].abs() < 1e-6);
        assert!((tensor[[0, 96, 96, 2]] - 0.2).abs() < 1e-6);
    }
}
