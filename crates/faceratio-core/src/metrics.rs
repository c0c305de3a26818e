//! Facial proportion metrics derived from resolved landmarks.
//!
//! Extraction runs in three stages: every named point is resolved once into
//! [`Anchors`], raw geometric quantities are computed into [`Measurements`],
//! and the rounded [`FacialMetrics`] record is built from those in one step.

use crate::geometry::{angle_deg, dist, guarded_div, midpoint, relative_diff_pct, round_to};
use crate::landmarks::{Landmark, LandmarkError, Landmarks};
use crate::types::Point;
use serde::{Deserialize, Serialize};

/// Decimal places for pixel and percentage quantities.
const PX_DECIMALS: i32 = 1;
/// Decimal places for dimensionless indices.
const INDEX_DECIMALS: i32 = 3;

/// Proportion metrics for one face. Built once by [`extract_metrics`].
///
/// Values are already rounded; the rounding is part of the serialized
/// output, not just of the display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FacialMetrics {
    pub face_width_px: f64,
    pub face_height_px: f64,
    /// Height / width. An oval face sits around 1.3.
    pub facial_index: f64,

    /// Forehead top → glabella, as % of the three thirds.
    pub third_upper_pct: f64,
    /// Glabella → nasal base.
    pub third_middle_pct: f64,
    /// Nasal base → chin.
    pub third_lower_pct: f64,

    /// Jaw → outer canthus (left side of the image).
    pub fifth_1_pct: f64,
    pub fifth_2_pct: f64,
    /// Intercanthal distance.
    pub fifth_3_pct: f64,
    pub fifth_4_pct: f64,
    pub fifth_5_pct: f64,

    pub eye_left_width_px: f64,
    pub eye_right_width_px: f64,
    /// Relative width difference; 0 is perfectly symmetric.
    pub eye_symmetry_pct: f64,
    pub interpupillary_dist_px: f64,

    /// Brow peak → outer canthus of the same side.
    pub brow_left_height_px: f64,
    pub brow_right_height_px: f64,
    pub brow_symmetry_pct: f64,

    pub nasal_width_px: f64,
    /// Nasal tip → nasal base.
    pub nasal_height_px: f64,
    pub nasal_index: f64,

    pub lip_width_px: f64,
    /// Vertical aperture between the lip midpoints.
    pub lip_height_px: f64,
    pub lip_index: f64,
    /// Upper / lower vermilion height.
    pub upper_lower_lip_ratio: f64,

    /// Share of the lower third taken by the chin (mento → chin).
    pub chin_projection_pct: f64,

    /// Mean vertical offset across bilateral landmark pairs.
    pub global_asymmetry_px: f64,
}

impl FacialMetrics {
    pub const FIELD_COUNT: usize = 27;

    /// Field names in declaration (and serialization) order.
    pub const FIELD_NAMES: [&'static str; Self::FIELD_COUNT] = [
        "face_width_px",
        "face_height_px",
        "facial_index",
        "third_upper_pct",
        "third_middle_pct",
        "third_lower_pct",
        "fifth_1_pct",
        "fifth_2_pct",
        "fifth_3_pct",
        "fifth_4_pct",
        "fifth_5_pct",
        "eye_left_width_px",
        "eye_right_width_px",
        "eye_symmetry_pct",
        "interpupillary_dist_px",
        "brow_left_height_px",
        "brow_right_height_px",
        "brow_symmetry_pct",
        "nasal_width_px",
        "nasal_height_px",
        "nasal_index",
        "lip_width_px",
        "lip_height_px",
        "lip_index",
        "upper_lower_lip_ratio",
        "chin_projection_pct",
        "global_asymmetry_px",
    ];

    /// Every field as `(name, value)`, in declaration order.
    pub fn fields(&self) -> [(&'static str, f64); Self::FIELD_COUNT] {
        let values = [
            self.face_width_px,
            self.face_height_px,
            self.facial_index,
            self.third_upper_pct,
            self.third_middle_pct,
            self.third_lower_pct,
            self.fifth_1_pct,
            self.fifth_2_pct,
            self.fifth_3_pct,
            self.fifth_4_pct,
            self.fifth_5_pct,
            self.eye_left_width_px,
            self.eye_right_width_px,
            self.eye_symmetry_pct,
            self.interpupillary_dist_px,
            self.brow_left_height_px,
            self.brow_right_height_px,
            self.brow_symmetry_pct,
            self.nasal_width_px,
            self.nasal_height_px,
            self.nasal_index,
            self.lip_width_px,
            self.lip_height_px,
            self.lip_index,
            self.upper_lower_lip_ratio,
            self.chin_projection_pct,
            self.global_asymmetry_px,
        ];
        std::array::from_fn(|i| (Self::FIELD_NAMES[i], values[i]))
    }

    /// Look a field up by its serialized name.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields()
            .into_iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    pub fn is_field(name: &str) -> bool {
        Self::FIELD_NAMES.contains(&name)
    }

    pub fn thirds(&self) -> [f64; 3] {
        [
            self.third_upper_pct,
            self.third_middle_pct,
            self.third_lower_pct,
        ]
    }

    pub fn fifths(&self) -> [f64; 5] {
        [
            self.fifth_1_pct,
            self.fifth_2_pct,
            self.fifth_3_pct,
            self.fifth_4_pct,
            self.fifth_5_pct,
        ]
    }

    /// Pretty-printed `field → value` JSON object.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Every landmark the extractor reads, resolved to pixel space once.
struct Anchors {
    forehead: Point,
    glabella: Point,
    nasal_base: Point,
    chin: Point,
    jaw_left: Point,
    jaw_right: Point,
    eye_left_outer: Point,
    eye_left_inner: Point,
    eye_right_inner: Point,
    eye_right_outer: Point,
    eye_left_top: Point,
    eye_left_bottom: Point,
    eye_right_top: Point,
    eye_right_bottom: Point,
    brow_left: Point,
    brow_right: Point,
    nasal_tip: Point,
    ala_left: Point,
    ala_right: Point,
    lip_top: Point,
    lip_bottom: Point,
    lip_left: Point,
    lip_right: Point,
    cupid_left: Point,
    mento: Point,
    malar_left: Point,
    malar_right: Point,
}

impl Anchors {
    fn resolve(lm: &Landmarks<'_>) -> Result<Self, LandmarkError> {
        Ok(Self {
            forehead: lm.point(Landmark::ForeheadTop)?,
            glabella: lm.point(Landmark::Glabella)?,
            nasal_base: lm.point(Landmark::NasalBase)?,
            chin: lm.point(Landmark::Chin)?,
            jaw_left: lm.point(Landmark::JawLeft)?,
            jaw_right: lm.point(Landmark::JawRight)?,
            eye_left_outer: lm.point(Landmark::EyeLeftOuter)?,
            eye_left_inner: lm.point(Landmark::EyeLeftInner)?,
            eye_right_inner: lm.point(Landmark::EyeRightInner)?,
            eye_right_outer: lm.point(Landmark::EyeRightOuter)?,
            eye_left_top: lm.point(Landmark::EyeLeftTop)?,
            eye_left_bottom: lm.point(Landmark::EyeLeftBottom)?,
            eye_right_top: lm.point(Landmark::EyeRightTop)?,
            eye_right_bottom: lm.point(Landmark::EyeRightBottom)?,
            brow_left: lm.point(Landmark::BrowLeftPeak)?,
            brow_right: lm.point(Landmark::BrowRightPeak)?,
            nasal_tip: lm.point(Landmark::NasalTip)?,
            ala_left: lm.point(Landmark::AlaLeft)?,
            ala_right: lm.point(Landmark::AlaRight)?,
            lip_top: lm.point(Landmark::LipTop)?,
            lip_bottom: lm.point(Landmark::LipBottom)?,
            lip_left: lm.point(Landmark::LipLeft)?,
            lip_right: lm.point(Landmark::LipRight)?,
            cupid_left: lm.point(Landmark::CupidLeft)?,
            mento: lm.point(Landmark::Mento)?,
            malar_left: lm.point(Landmark::MalarLeft)?,
            malar_right: lm.point(Landmark::MalarRight)?,
        })
    }

    /// Left/right pairs compared for global asymmetry.
    fn bilateral_pairs(&self) -> [(Point, Point); 5] {
        [
            (self.eye_left_outer, self.eye_right_outer),
            (self.ala_left, self.ala_right),
            (self.malar_left, self.malar_right),
            (self.lip_left, self.lip_right),
            (self.brow_left, self.brow_right),
        ]
    }
}

/// Unrounded quantities, one per output field.
struct Measurements {
    face_width: f64,
    face_height: f64,
    thirds: [f64; 3],
    fifths: [f64; 5],
    eye_left_width: f64,
    eye_right_width: f64,
    interpupillary: f64,
    brow_left_height: f64,
    brow_right_height: f64,
    nasal_width: f64,
    nasal_height: f64,
    lip_width: f64,
    lip_height: f64,
    upper_lip: f64,
    lower_lip: f64,
    chin_height: f64,
    lower_third: f64,
    global_asymmetry: f64,
}

impl Measurements {
    fn from_anchors(a: &Anchors) -> Self {
        let thirds = [
            dist(a.forehead, a.glabella),
            dist(a.glabella, a.nasal_base),
            dist(a.nasal_base, a.chin),
        ];

        // Outer fifths are horizontal offsets, not distances: no roll correction.
        let fifths = [
            a.eye_left_outer.x - a.jaw_left.x,
            dist(a.eye_left_outer, a.eye_left_inner),
            dist(a.eye_left_inner, a.eye_right_inner),
            dist(a.eye_right_inner, a.eye_right_outer),
            a.jaw_right.x - a.eye_right_outer.x,
        ];

        let pupil_left = Point::new(
            (a.eye_left_outer.x + a.eye_left_inner.x) / 2.0,
            (a.eye_left_top.y + a.eye_left_bottom.y) / 2.0,
        );
        let pupil_right = Point::new(
            (a.eye_right_outer.x + a.eye_right_inner.x) / 2.0,
            (a.eye_right_top.y + a.eye_right_bottom.y) / 2.0,
        );

        let lip_mid_y = midpoint(a.lip_top, a.lip_bottom).y;

        let pairs = a.bilateral_pairs();
        let global_asymmetry = pairs
            .iter()
            .map(|(left, right)| (left.y - right.y).abs())
            .sum::<f64>()
            / pairs.len() as f64;

        Self {
            face_width: dist(a.jaw_left, a.jaw_right),
            face_height: dist(a.forehead, a.chin),
            thirds,
            fifths,
            eye_left_width: dist(a.eye_left_outer, a.eye_left_inner),
            eye_right_width: dist(a.eye_right_outer, a.eye_right_inner),
            interpupillary: dist(pupil_left, pupil_right),
            brow_left_height: dist(a.brow_left, a.eye_left_outer),
            brow_right_height: dist(a.brow_right, a.eye_right_outer),
            nasal_width: dist(a.ala_left, a.ala_right),
            nasal_height: dist(a.nasal_tip, a.nasal_base),
            lip_width: dist(a.lip_left, a.lip_right),
            lip_height: dist(a.lip_top, a.lip_bottom),
            upper_lip: (a.cupid_left.y - a.lip_top.y).abs(),
            lower_lip: (a.lip_bottom.y - lip_mid_y).abs(),
            chin_height: dist(a.mento, a.chin),
            lower_third: dist(a.nasal_base, a.chin),
            global_asymmetry,
        }
    }

    fn into_metrics(self) -> FacialMetrics {
        let px = |v: f64| round_to(v, PX_DECIMALS);
        let index = |v: f64| round_to(v, INDEX_DECIMALS);

        let [third_upper_pct, third_middle_pct, third_lower_pct] = percentages(self.thirds);
        let [fifth_1_pct, fifth_2_pct, fifth_3_pct, fifth_4_pct, fifth_5_pct] =
            percentages(self.fifths);

        FacialMetrics {
            face_width_px: px(self.face_width),
            face_height_px: px(self.face_height),
            facial_index: index(guarded_div(self.face_height, self.face_width)),

            third_upper_pct,
            third_middle_pct,
            third_lower_pct,

            fifth_1_pct,
            fifth_2_pct,
            fifth_3_pct,
            fifth_4_pct,
            fifth_5_pct,

            eye_left_width_px: px(self.eye_left_width),
            eye_right_width_px: px(self.eye_right_width),
            eye_symmetry_pct: px(relative_diff_pct(self.eye_left_width, self.eye_right_width)),
            interpupillary_dist_px: px(self.interpupillary),

            brow_left_height_px: px(self.brow_left_height),
            brow_right_height_px: px(self.brow_right_height),
            brow_symmetry_pct: px(relative_diff_pct(
                self.brow_left_height,
                self.brow_right_height,
            )),

            nasal_width_px: px(self.nasal_width),
            nasal_height_px: px(self.nasal_height),
            nasal_index: index(guarded_div(self.nasal_width, self.nasal_height)),

            lip_width_px: px(self.lip_width),
            lip_height_px: px(self.lip_height),
            lip_index: index(guarded_div(self.lip_width, self.lip_height)),
            upper_lower_lip_ratio: index(guarded_div(self.upper_lip, self.lower_lip)),

            chin_projection_pct: px(guarded_div(self.chin_height, self.lower_third) * 100.0),

            global_asymmetry_px: px(self.global_asymmetry),
        }
    }
}

/// Compute the full metric record for one face.
///
/// Pure: the same landmarks and image size always give a bit-identical
/// record. Degenerate (coincident) landmarks produce large but finite
/// ratios instead of errors.
pub fn extract_metrics(landmarks: &Landmarks<'_>) -> Result<FacialMetrics, LandmarkError> {
    let anchors = Anchors::resolve(landmarks)?;
    Ok(Measurements::from_anchors(&anchors).into_metrics())
}

/// Tilt of the outer-canthus line against the horizontal, in `[0, 90]` degrees.
///
/// Fifths and global asymmetry assume a level face; callers use this to
/// flag photos where that assumption is off.
pub fn roll_deg(landmarks: &Landmarks<'_>) -> Result<f64, LandmarkError> {
    let left = landmarks.point(Landmark::EyeLeftOuter)?;
    let right = landmarks.point(Landmark::EyeRightOuter)?;
    let horizontal = Point::new(left.x + 1.0, left.y);
    let angle = angle_deg(right, left, horizontal);
    Ok(angle.min(180.0 - angle))
}

/// Each part as a one-decimal percentage of the parts' sum.
///
/// Parts are rounded independently. When that drifts the group total more
/// than one step away from 100, the part that was rounded furthest in the
/// direction of the drift is moved back by one step.
fn percentages<const N: usize>(parts: [f64; N]) -> [f64; N] {
    const STEP: f64 = 0.1;

    let total: f64 = parts.iter().sum();
    let raw = parts.map(|p| guarded_div(p, total) * 100.0);
    let mut rounded = raw.map(|p| round_to(p, PX_DECIMALS));

    let raw_sum: f64 = raw.iter().sum();
    let drift = rounded.iter().sum::<f64>() - 100.0;
    if (raw_sum - 100.0).abs() > 1e-3 || drift.abs() <= STEP + 1e-6 {
        return rounded;
    }

    let direction = drift.signum();
    let mut worst = 0;
    for i in 1..N {
        if (rounded[i] - raw[i]) * direction > (rounded[worst] - raw[worst]) * direction {
            worst = i;
        }
    }
    rounded[worst] = round_to(rounded[worst] - direction * STEP, PX_DECIMALS);
    rounded
}
