//! SCRFD face detector via ONNX Runtime.
//!
//! Finds face boxes so the mesh model can run on a tight crop. Uses the
//! 3-stride anchor-free decoding of SCRFD with NMS post-processing.

use crate::detector::{DetectorError, LetterboxInfo};
use crate::types::FaceBox;
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;

// --- Named constants (no magic numbers) ---
const SCRFD_INPUT_SIZE: u32 = 640;
const SCRFD_MEAN: f32 = 127.5;
const SCRFD_STD: f32 = 128.0;
const SCRFD_NMS_THRESHOLD: f32 = 0.4;
const SCRFD_STRIDES: [usize; 3] = [8, 16, 32];
const SCRFD_ANCHORS_PER_CELL: usize = 2;
/// Score and bbox tensors per stride; keypoint tensors, when present, are unused.
const SCRFD_MIN_OUTPUTS: usize = 6;

/// Output tensor indices for one stride: (score_idx, bbox_idx).
type StrideOutputIndices = (usize, usize);

/// SCRFD-based face detector.
pub struct FaceDetector {
    session: Session,
    /// Per-stride output indices [(score, bbox)] for strides [8, 16, 32].
    stride_indices: [StrideOutputIndices; 3],
    min_confidence: f32,
}

impl FaceDetector {
    /// Load the SCRFD ONNX model from the given path.
    pub fn load(model_path: &Path, intra_threads: usize) -> Result<Self, DetectorError> {
        if !model_path.exists() {
            return Err(DetectorError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(intra_threads.max(1))?
            .commit_from_file(model_path)?;

        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();

        tracing::info!(
            path = %model_path.display(),
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?output_names,
            "loaded SCRFD model"
        );

        if output_names.len() < SCRFD_MIN_OUTPUTS {
            return Err(DetectorError::InferenceFailed(format!(
                "SCRFD model requires at least {SCRFD_MIN_OUTPUTS} outputs (3 strides × score/bbox), got {}",
                output_names.len()
            )));
        }

        let stride_indices = discover_output_indices(&output_names);
        tracing::debug!(?stride_indices, "SCRFD output tensor mapping");

        Ok(Self {
            session,
            stride_indices,
            min_confidence: crate::detector::DEFAULT_MIN_CONFIDENCE,
        })
    }

    /// Minimum box score for a detection to count.
    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// Detect faces, returning boxes in image pixels sorted by confidence.
    pub fn detect(&mut self, image: &RgbImage) -> Result<Vec<FaceBox>, DetectorError> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(Vec::new());
        }

        let (input, letterbox) = Self::preprocess(image);
        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut all_detections = Vec::new();
        for (stride_pos, &stride) in SCRFD_STRIDES.iter().enumerate() {
            let (score_idx, bbox_idx) = self.stride_indices[stride_pos];

            let (_, scores) = outputs[score_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectorError::InferenceFailed(format!("scores stride {stride}: {e}")))?;
            let (_, bboxes) = outputs[bbox_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectorError::InferenceFailed(format!("bboxes stride {stride}: {e}")))?;

            all_detections.extend(decode_stride(
                scores,
                bboxes,
                stride,
                &letterbox,
                self.min_confidence,
            ));
        }

        let faces = nms(all_detections, SCRFD_NMS_THRESHOLD);
        tracing::debug!(faces = faces.len(), "SCRFD detections");
        Ok(faces)
    }

    /// Letterbox an RGB image into a NCHW tensor normalized to the SCRFD input distribution.
    fn preprocess(image: &RgbImage) -> (Array4<f32>, LetterboxInfo) {
        let letterbox = LetterboxInfo::fit(image.width(), image.height(), SCRFD_INPUT_SIZE);
        let resized = imageops::resize(image, letterbox.new_w, letterbox.new_h, FilterType::Triangle);

        let size = SCRFD_INPUT_SIZE as usize;
        let tensor = Array4::from_shape_fn((1, 3, size, size), |(_, c, y, x)| {
            // Padding normalizes to 0.0.
            let pixel = letterbox
                .resized_pixel(x as u32, y as u32)
                .map_or(SCRFD_MEAN, |(rx, ry)| f32::from(resized.get_pixel(rx, ry)[c]));
            (pixel - SCRFD_MEAN) / SCRFD_STD
        });

        (tensor, letterbox)
    }
}

/// Discover output tensor ordering by name.
///
/// SCRFD exports either name tensors "score_8", "bbox_16", ... or use
/// generic numeric names. Unrecognized names fall back to the standard
/// positional ordering: [0-2] = scores, [3-5] = bboxes (strides 8, 16, 32).
fn discover_output_indices(names: &[String]) -> [StrideOutputIndices; 3] {
    let find = |prefix: &str, stride: usize| -> Option<usize> {
        let target = format!("{prefix}_{stride}");
        names.iter().position(|n| n == &target)
    };

    let named: Option<Vec<StrideOutputIndices>> = SCRFD_STRIDES
        .iter()
        .map(|&stride| Some((find("score", stride)?, find("bbox", stride)?)))
        .collect();

    match named {
        Some(indices) => {
            tracing::info!("SCRFD: using name-based output tensor mapping");
            [indices[0], indices[1], indices[2]]
        }
        None => {
            tracing::info!(
                ?names,
                "SCRFD: output names not recognized, using positional mapping [0-2]=scores, [3-5]=bboxes"
            );
            [(0, 3), (1, 4), (2, 5)]
        }
    }
}

/// Decode detections for a single stride level, in source-image pixels.
fn decode_stride(
    scores: &[f32],
    bboxes: &[f32],
    stride: usize,
    letterbox: &LetterboxInfo,
    threshold: f32,
) -> Vec<FaceBox> {
    let grid_w = SCRFD_INPUT_SIZE as usize / stride;
    let grid_h = SCRFD_INPUT_SIZE as usize / stride;
    let num_anchors = grid_h * grid_w * SCRFD_ANCHORS_PER_CELL;
    let step = stride as f32;

    let mut detections = Vec::new();
    for idx in 0..num_anchors {
        let score = scores.get(idx).copied().unwrap_or(0.0);
        if score < threshold {
            continue;
        }
        let Some(offsets) = bboxes.get(idx * 4..idx * 4 + 4) else {
            continue;
        };

        let anchor_idx = idx / SCRFD_ANCHORS_PER_CELL;
        let anchor_x = (anchor_idx % grid_w) as f32 * step;
        let anchor_y = (anchor_idx / grid_w) as f32 * step;

        let (x1, y1) = letterbox.to_source(anchor_x - offsets[0] * step, anchor_y - offsets[1] * step);
        let (x2, y2) = letterbox.to_source(anchor_x + offsets[2] * step, anchor_y + offsets[3] * step);

        detections.push(FaceBox {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
            confidence: score,
        });
    }
    detections
}

/// Non-Maximum Suppression, returning the survivors by descending confidence.
fn nms(mut detections: Vec<FaceBox>, iou_threshold: f32) -> Vec<FaceBox> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<FaceBox> = Vec::new();
    for det in detections {
        if keep.iter().all(|k| iou(k, &det) <= iou_threshold) {
            keep.push(det);
        }
    }
    keep
}

/// Intersection-over-Union between two boxes.
fn iou(a: &FaceBox, b: &FaceBox) -> f32 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.width).min(b.x + b.width);
    let y2 = (a.y + a.height).min(b.y + b.height);

    let inter_area = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union_area = a.area() + b.area() - inter_area;

    if union_area > 0.0 {
        inter_area / union_area
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_box(x: f32, y: f32, w: f32, h: f32, conf: f32) -> FaceBox {
        FaceBox {
            x,
            y,
            width: w,
            height: h,
            confidence: conf,
        }
    }

    #[test]
    fn test_iou() {
        let a = make_box(0.0, 0.0, 10.0, 10.0, 1.0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
        assert!(iou(&a, &make_box(20.0, 20.0, 10.0, 10.0, 1.0)).abs() < 1e-6);
        // Overlap 5x10 = 50, union 150.
        let b = make_box(5.0, 0.0, 10.0, 10.0, 1.0);
        assert!((iou(&a, &b) - 50.0 / 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_nms_suppresses_overlapping() {
        let detections = vec![
            make_box(5.0, 5.0, 100.0, 100.0, 0.8),
            make_box(200.0, 200.0, 50.0, 50.0, 0.7),
            make_box(0.0, 0.0, 100.0, 100.0, 0.9),
        ];
        let result = nms(detections, 0.4);
        assert_eq!(result.len(), 2);
        assert!((result[0].confidence - 0.9).abs() < 1e-6);
        assert!((result[1].confidence - 0.7).abs() < 1e-6);
        assert!(nms(Vec::new(), 0.4).is_empty());
    }

    #[test]
    fn test_decode_stride_maps_through_letterbox() {
        // 1280×960 source: scale 0.5, 80 px of vertical padding.
        let letterbox = LetterboxInfo::fit(1280, 960, SCRFD_INPUT_SIZE);
        assert_eq!((letterbox.pad_x, letterbox.pad_y), (0.0, 80.0));

        let stride = 32;
        let grid_w = 640 / stride;
        let anchors = grid_w * grid_w * SCRFD_ANCHORS_PER_CELL;
        let mut scores = vec![0.0f32; anchors];
        let mut bboxes = vec![0.0f32; anchors * 4];

        // Anchor cell (x=10, y=8) → input centre (320, 256); box ±2 strides.
        let idx = (8 * grid_w + 10) * SCRFD_ANCHORS_PER_CELL;
        scores[idx] = 0.9;
        scores[idx + 1] = 0.3;
        bboxes[idx * 4..idx * 4 + 4].copy_from_slice(&[2.0, 2.0, 2.0, 2.0]);

        let faces = decode_stride(&scores, &bboxes, stride, &letterbox, 0.5);
        assert_eq!(faces.len(), 1);
        let face = faces[0];
        // Input (256, 192)..(384, 320) → source (512, 224)..(768, 480).
        assert!((face.x - 512.0).abs() < 1e-3, "x = {}", face.x);
        assert!((face.y - 224.0).abs() < 1e-3, "y = {}", face.y);
        assert!((face.width - 256.0).abs() < 1e-3);
        assert!((face.height - 256.0).abs() < 1e-3);
        assert_eq!(face.confidence, 0.9);
    }

    #[test]
    fn test_decode_stride_respects_threshold() {
        let letterbox = LetterboxInfo::fit(640, 640, SCRFD_INPUT_SIZE);
        let anchors = 20 * 20 * SCRFD_ANCHORS_PER_CELL;
        let scores = vec![0.4f32; anchors];
        let bboxes = vec![1.0f32; anchors * 4];
        assert!(decode_stride(&scores, &bboxes, 32, &letterbox, 0.5).is_empty());
        assert_eq!(decode_stride(&scores, &bboxes, 32, &letterbox, 0.4).len(), anchors);
    }

    #[test]
    fn test_discover_output_indices() {
        let named: Vec<String> = [
            "bbox_8", "kps_8", "score_8", "bbox_16", "kps_16", "score_16", "bbox_32", "kps_32",
            "score_32",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(discover_output_indices(&named), [(2, 0), (5, 3), (8, 6)]);

        let numeric: Vec<String> = (0..9).map(|i: usize| i.to_string()).collect();
        assert_eq!(discover_output_indices(&numeric), [(0, 3), (1, 4), (2, 5)]);
    }

    #[test]
    fn test_preprocess_normalizes_and_pads() {
        let image = RgbImage::from_pixel(640, 320, image::Rgb([255, 127, 0]));
        let (tensor, letterbox) = FaceDetector::preprocess(&image);
        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert_eq!(letterbox.pad_y, 160.0);

        // Padding row.
        assert_eq!(tensor[[0, 0, 0, 0]], 0.0);
        // Image rows, per channel.
        assert!((tensor[[0, 0, 320, 320]] - (255.0 - 127.5) / 128.0).abs() < 1e-6);
        assert!((tensor[[0, 1, 320, 320]] - (127.0 - 127.5) / 128.0).abs() < 1e-6);
        assert!((tensor[[0, 2, 320, 320]] - (0.0 - 127.5) / 128.0).abs() < 1e-6);
    }
}
