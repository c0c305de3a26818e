//! Named anatomical landmarks and their mapping onto detector output.
//!
//! Extraction code only ever asks for a [`Landmark`]; which slot of the
//! detector's output holds that point is decided by a [`LandmarkScheme`].
//! Swapping to a different landmark model means remapping keys here.

use crate::types::{LandmarkSet, Point};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LandmarkError {
    #[error("detector returned an empty landmark set")]
    Empty,
    #[error("landmark `{0}` is not mapped by the landmark scheme")]
    Unmapped(Landmark),
    #[error("landmark `{key}` maps to index {index}, but only {len} points were detected")]
    MissingPoint {
        key: Landmark,
        index: usize,
        len: usize,
    },
}

/// Logical landmark keys consumed by the metric extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Landmark {
    Chin,
    ForeheadTop,
    JawLeft,
    JawRight,
    /// Between the eyebrows.
    Glabella,
    /// Columella base, where the nose meets the upper lip.
    NasalBase,
    EyeLeftInner,
    EyeLeftOuter,
    EyeRightInner,
    EyeRightOuter,
    EyeLeftTop,
    EyeLeftBottom,
    EyeRightTop,
    EyeRightBottom,
    BrowLeftPeak,
    BrowRightPeak,
    NasalTip,
    AlaLeft,
    AlaRight,
    LipTop,
    LipBottom,
    LipLeft,
    LipRight,
    CupidLeft,
    CupidRight,
    Mento,
    MalarLeft,
    MalarRight,
}

impl Landmark {
    pub const COUNT: usize = 28;

    pub const ALL: [Landmark; Self::COUNT] = [
        Landmark::Chin,
        Landmark::ForeheadTop,
        Landmark::JawLeft,
        Landmark::JawRight,
        Landmark::Glabella,
        Landmark::NasalBase,
        Landmark::EyeLeftInner,
        Landmark::EyeLeftOuter,
        Landmark::EyeRightInner,
        Landmark::EyeRightOuter,
        Landmark::EyeLeftTop,
        Landmark::EyeLeftBottom,
        Landmark::EyeRightTop,
        Landmark::EyeRightBottom,
        Landmark::BrowLeftPeak,
        Landmark::BrowRightPeak,
        Landmark::NasalTip,
        Landmark::AlaLeft,
        Landmark::AlaRight,
        Landmark::LipTop,
        Landmark::LipBottom,
        Landmark::LipLeft,
        Landmark::LipRight,
        Landmark::CupidLeft,
        Landmark::CupidRight,
        Landmark::Mento,
        Landmark::MalarLeft,
        Landmark::MalarRight,
    ];

    /// Position of this key in [`Landmark::ALL`].
    pub const fn ordinal(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Landmark::Chin => "chin",
            Landmark::ForeheadTop => "forehead_top",
            Landmark::JawLeft => "jaw_left",
            Landmark::JawRight => "jaw_right",
            Landmark::Glabella => "glabella",
            Landmark::NasalBase => "nasal_base",
            Landmark::EyeLeftInner => "eye_left_inner",
            Landmark::EyeLeftOuter => "eye_left_outer",
            Landmark::EyeRightInner => "eye_right_inner",
            Landmark::EyeRightOuter => "eye_right_outer",
            Landmark::EyeLeftTop => "eye_left_top",
            Landmark::EyeLeftBottom => "eye_left_bottom",
            Landmark::EyeRightTop => "eye_right_top",
            Landmark::EyeRightBottom => "eye_right_bottom",
            Landmark::BrowLeftPeak => "brow_left_peak",
            Landmark::BrowRightPeak => "brow_right_peak",
            Landmark::NasalTip => "nasal_tip",
            Landmark::AlaLeft => "ala_left",
            Landmark::AlaRight => "ala_right",
            Landmark::LipTop => "lip_top",
            Landmark::LipBottom => "lip_bottom",
            Landmark::LipLeft => "lip_left",
            Landmark::LipRight => "lip_right",
            Landmark::CupidLeft => "cupid_left",
            Landmark::CupidRight => "cupid_right",
            Landmark::Mento => "mento",
            Landmark::MalarLeft => "malar_left",
            Landmark::MalarRight => "malar_right",
        }
    }
}

impl fmt::Display for Landmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// MediaPipe Face Mesh indices (468-point topology, also valid for the
/// 478-point refined variant), in [`Landmark::ALL`] order.
const MEDIAPIPE_FACE_MESH: [usize; Landmark::COUNT] = [
    152, // chin
    10,  // forehead_top
    234, // jaw_left
    454, // jaw_right
    9,   // glabella
    2,   // nasal_base
    133, // eye_left_inner
    33,  // eye_left_outer
    362, // eye_right_inner
    263, // eye_right_outer
    159, // eye_left_top
    145, // eye_left_bottom
    386, // eye_right_top
    374, // eye_right_bottom
    66,  // brow_left_peak
    296, // brow_right_peak
    4,   // nasal_tip
    129, // ala_left
    358, // ala_right
    13,  // lip_top
    14,  // lip_bottom
    61,  // lip_left
    291, // lip_right
    37,  // cupid_left
    267, // cupid_right
    175, // mento
    116, // malar_left
    345, // malar_right
];

/// Maps each [`Landmark`] to an index into a detector's ordered output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandmarkScheme {
    indices: [Option<usize>; Landmark::COUNT],
}

impl LandmarkScheme {
    /// A scheme with no keys mapped.
    pub fn empty() -> Self {
        Self {
            indices: [None; Landmark::COUNT],
        }
    }

    pub fn mediapipe_face_mesh() -> Self {
        Self {
            indices: MEDIAPIPE_FACE_MESH.map(Some),
        }
    }

    /// Replace the index of each key in `overrides`, keeping the rest.
    pub fn with_overrides(mut self, overrides: &BTreeMap<Landmark, usize>) -> Self {
        for (&key, &index) in overrides {
            self.indices[key.ordinal()] = Some(index);
        }
        self
    }

    pub fn index(&self, key: Landmark) -> Option<usize> {
        self.indices[key.ordinal()]
    }
}

impl Default for LandmarkScheme {
    fn default() -> Self {
        Self::mediapipe_face_mesh()
    }
}

/// Pixel-space view over one face's landmarks.
#[derive(Debug, Clone, Copy)]
pub struct Landmarks<'a> {
    set: &'a LandmarkSet,
    scheme: &'a LandmarkScheme,
    width: u32,
    height: u32,
}

impl<'a> Landmarks<'a> {
    pub fn new(
        set: &'a LandmarkSet,
        scheme: &'a LandmarkScheme,
        width: u32,
        height: u32,
    ) -> Result<Self, LandmarkError> {
        if set.is_empty() {
            return Err(LandmarkError::Empty);
        }
        Ok(Self {
            set,
            scheme,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Resolve `key` to `(x * width, y * height)`.
    pub fn point(&self, key: Landmark) -> Result<Point, LandmarkError> {
        let index = self.scheme.index(key).ok_or(LandmarkError::Unmapped(key))?;
        let p = self.set.get(index).ok_or(LandmarkError::MissingPoint {
            key,
            index,
            len: self.set.len(),
        })?;
        Ok(Point::new(
            p.x * f64::from(self.width),
            p.y * f64::from(self.height),
        ))
    }

    /// Every key with its pixel position, in [`Landmark::ALL`] order.
    pub fn resolve_all(&self) -> Result<Vec<(Landmark, Point)>, LandmarkError> {
        Landmark::ALL
            .iter()
            .map(|&key| Ok((key, self.point(key)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh_of(n: usize) -> LandmarkSet {
        LandmarkSet::new(
            (0..n)
                .map(|i| Point::new(i as f64 / 1000.0, 0.5))
                .collect(),
        )
    }

    #[test]
    fn test_all_is_in_ordinal_order() {
        for (i, key) in Landmark::ALL.iter().enumerate() {
            assert_eq!(key.ordinal(), i, "{key}");
        }
    }

    #[test]
    fn test_names_match_serde() {
        for key in Landmark::ALL {
            let json = serde_json::to_string(&key).unwrap();
            assert_eq!(json, format!("\"{}\"", key.name()));
        }
    }

    #[test]
    fn test_mediapipe_indices() {
        let scheme = LandmarkScheme::mediapipe_face_mesh();
        assert_eq!(scheme.index(Landmark::Chin), Some(152));
        assert_eq!(scheme.index(Landmark::Glabella), Some(9));
        assert_eq!(scheme.index(Landmark::MalarRight), Some(345));
        assert!(Landmark::ALL.iter().all(|&k| scheme.index(k).unwrap() < 468));
    }

    #[test]
    fn test_point_scales_by_image_size() {
        let set = mesh_of(468);
        let scheme = LandmarkScheme::default();
        let lm = Landmarks::new(&set, &scheme, 1000, 200).unwrap();
        let chin = lm.point(Landmark::Chin).unwrap();
        assert!((chin.x - 152.0).abs() < 1e-9);
        assert!((chin.y - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_set_is_rejected() {
        let set = LandmarkSet::default();
        let scheme = LandmarkScheme::default();
        let err = Landmarks::new(&set, &scheme, 10, 10).unwrap_err();
        assert_eq!(err, LandmarkError::Empty);
    }

    #[test]
    fn test_missing_point() {
        let set = mesh_of(68);
        let scheme = LandmarkScheme::default();
        let lm = Landmarks::new(&set, &scheme, 10, 10).unwrap();
        assert_eq!(lm.point(Landmark::NasalTip).unwrap().x, 4.0 / 1000.0 * 10.0);
        assert_eq!(
            lm.point(Landmark::Chin).unwrap_err(),
            LandmarkError::MissingPoint {
                key: Landmark::Chin,
                index: 152,
                len: 68
            }
        );
    }

    #[test]
    fn test_unmapped_and_overrides() {
        let set = mesh_of(30);
        let mut overrides = BTreeMap::new();
        overrides.insert(Landmark::Chin, 7);
        let scheme = LandmarkScheme::empty().with_overrides(&overrides);
        let lm = Landmarks::new(&set, &scheme, 1000, 1000).unwrap();

        assert!((lm.point(Landmark::Chin).unwrap().x - 7.0).abs() < 1e-9);
        assert_eq!(
            lm.point(Landmark::Mento).unwrap_err(),
            LandmarkError::Unmapped(Landmark::Mento)
        );
        assert!(lm.resolve_all().is_err());
    }

    #[test]
    fn test_resolve_all() {
        let set = mesh_of(468);
        let scheme = LandmarkScheme::default();
        let lm = Landmarks::new(&set, &scheme, 100, 100).unwrap();
        let all = lm.resolve_all().unwrap();
        assert_eq!(all.len(), Landmark::COUNT);
        assert_eq!(all[0].0, Landmark::Chin);
    }
}
