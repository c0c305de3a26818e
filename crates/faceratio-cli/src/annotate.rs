//! Landmark overlay on a copy of the source photo.

use crate::text;
use ab_glyph::FontVec;
use faceratio_core::geometry::midpoint;
use faceratio_core::{Landmark, LandmarkError, Landmarks, Point};
use image::{Rgb, RgbImage};
use imageproc::drawing;

const DOT_COLOR: Rgb<u8> = Rgb([255, 200, 0]);
const DOT_RADIUS: i32 = 2;
const THIRDS_COLOR: Rgb<u8> = Rgb([80, 80, 255]);
const THIRDS_RADIUS: i32 = 4;
const GUIDE_COLOR: Rgb<u8> = Rgb([180, 180, 180]);
const WIDTH_COLOR: Rgb<u8> = Rgb([0, 200, 255]);
const LABEL_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Landmarks bounding the facial thirds, top to bottom.
const THIRDS: [Landmark; 4] = [
    Landmark::ForeheadTop,
    Landmark::Glabella,
    Landmark::NasalBase,
    Landmark::Chin,
];

/// Draw every mapped landmark, the thirds guides and the face-width line.
/// Thirds are labelled only when a font is available.
pub fn annotate(
    image: &RgbImage,
    landmarks: &Landmarks<'_>,
    font: Option<&FontVec>,
) -> Result<RgbImage, LandmarkError> {
    let mut img = image.clone();

    let jaw_left = landmarks.point(Landmark::JawLeft)?;
    let jaw_right = landmarks.point(Landmark::JawRight)?;
    let thirds = THIRDS
        .iter()
        .map(|&key| landmarks.point(key))
        .collect::<Result<Vec<_>, _>>()?;

    let (x0, x1) = (jaw_left.x.min(jaw_right.x), jaw_left.x.max(jaw_right.x));
    for p in &thirds {
        drawing::draw_line_segment_mut(
            &mut img,
            (x0 as f32, p.y as f32),
            (x1 as f32, p.y as f32),
            GUIDE_COLOR,
        );
    }

    for (_, p) in landmarks.resolve_all()? {
        drawing::draw_filled_circle_mut(&mut img, pixel(p), DOT_RADIUS, DOT_COLOR);
    }
    for &p in &thirds {
        drawing::draw_filled_circle_mut(&mut img, pixel(p), THIRDS_RADIUS, THIRDS_COLOR);
    }

    if let Some(font) = font {
        let scale = (img.height() as f32 / 50.0).clamp(12.0, 48.0);
        for (name, pair) in ["Upper third", "Middle third", "Lower third"]
            .iter()
            .zip(thirds.windows(2))
        {
            let x = pair[1].x.max(pair[0].x) as i32 + 5;
            let y = midpoint(pair[0], pair[1]).y as i32;
            text::draw_outlined(&mut img, font, scale, x, y, LABEL_COLOR, name);
        }
    }

    // Two px wide.
    for dy in [0.0, 1.0] {
        drawing::draw_line_segment_mut(
            &mut img,
            (jaw_left.x as f32, (jaw_left.y + dy) as f32),
            (jaw_right.x as f32, (jaw_right.y + dy) as f32),
            WIDTH_COLOR,
        );
    }

    tracing::debug!(width = img.width(), height = img.height(), "annotated image");
    Ok(img)
}

fn pixel(p: Point) -> (i32, i32) {
    (p.x.round() as i32, p.y.round() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use faceratio_core::{LandmarkScheme, LandmarkSet};

    const BACKGROUND: Rgb<u8> = Rgb([10, 10, 10]);

    /// MediaPipe-indexed mesh on a 200×200 canvas; unused keys sit in the corner.
    fn mesh() -> LandmarkSet {
        let mut points = vec![Point::new(0.02, 0.02); 468];
        points[10] = Point::new(0.5, 0.1); // forehead_top
        points[9] = Point::new(0.5, 0.35); // glabella
        points[2] = Point::new(0.5, 0.6); // nasal_base
        points[152] = Point::new(0.5, 0.9); // chin
        points[234] = Point::new(0.2, 0.5); // jaw_left
        points[454] = Point::new(0.8, 0.5); // jaw_right
        LandmarkSet::new(points)
    }

    #[test]
    fn test_annotation_layers() {
        let set = mesh();
        let scheme = LandmarkScheme::default();
        let lm = Landmarks::new(&set, &scheme, 200, 200).unwrap();
        let source = RgbImage::from_pixel(200, 200, BACKGROUND);

        let img = annotate(&source, &lm, None).unwrap();

        assert_eq!(img.dimensions(), (200, 200));
        assert_eq!(*img.get_pixel(100, 100), WIDTH_COLOR);
        assert_eq!(*img.get_pixel(100, 101), WIDTH_COLOR);
        assert_eq!(*img.get_pixel(100, 180), THIRDS_COLOR);
        assert_eq!(*img.get_pixel(4, 4), DOT_COLOR);
        assert_eq!(*img.get_pixel(60, 70), GUIDE_COLOR);
        assert_eq!(*img.get_pixel(190, 10), BACKGROUND);
        // The source is left untouched.
        assert_eq!(*source.get_pixel(100, 100), BACKGROUND);
    }

    #[test]
    fn test_unmapped_landmark_is_an_error() {
        let set = mesh();
        let scheme = LandmarkScheme::empty();
        let lm = Landmarks::new(&set, &scheme, 200, 200).unwrap();
        let source = RgbImage::new(200, 200);
        assert_eq!(
            annotate(&source, &lm, None).unwrap_err(),
            LandmarkError::Unmapped(Landmark::JawLeft)
        );
    }
}
