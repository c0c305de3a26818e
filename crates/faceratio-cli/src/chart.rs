//! Two-panel bar chart of the facial thirds and fifths against their ideals.

use crate::text;
use ab_glyph::FontVec;
use faceratio_core::FacialMetrics;
use image::{Rgb, RgbImage};
use imageproc::drawing;
use imageproc::rect::Rect;

pub const CHART_WIDTH: u32 = 1500;
pub const CHART_HEIGHT: u32 = 600;

const BACKGROUND: Rgb<u8> = Rgb([0x1a, 0x1a, 0x2e]);
const PANEL: Rgb<u8> = Rgb([0x16, 0x21, 0x3e]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const RED: Rgb<u8> = Rgb([0xe9, 0x45, 0x60]);
const BLUE: Rgb<u8> = Rgb([0x0f, 0x34, 0x60]);
const PURPLE: Rgb<u8> = Rgb([0x53, 0x34, 0x83]);

const MARGIN: u32 = 30;
const PLOT_PAD_LEFT: u32 = 50;
const PLOT_PAD_RIGHT: u32 = 30;
const PLOT_PAD_TOP: u32 = 60;
const PLOT_PAD_BOTTOM: u32 = 50;
/// Fraction of each bar slot left empty, split between both sides.
const SLOT_GAP: f32 = 0.4;
const DASH: u32 = 10;
const DASH_GAP: u32 = 6;

const IDEAL_THIRD_PCT: f64 = 33.3;
const IDEAL_FIFTH_PCT: f64 = 20.0;

struct Series<'a, const N: usize> {
    title: &'a str,
    labels: [&'a str; N],
    values: [f64; N],
    colors: [Rgb<u8>; N],
    ideal: f64,
}

/// Plot area of one panel, in canvas pixels.
#[derive(Debug, Clone, Copy)]
struct Panel {
    left: u32,
    top: u32,
    width: u32,
    height: u32,
}

impl Panel {
    /// Panel `index` of two, side by side.
    fn new(index: u32) -> Self {
        let panel_w = (CHART_WIDTH - 3 * MARGIN) / 2;
        let left = MARGIN + index * (panel_w + MARGIN);
        Self {
            left,
            top: MARGIN,
            width: panel_w,
            height: CHART_HEIGHT - 2 * MARGIN,
        }
    }

    fn plot_left(&self) -> u32 {
        self.left + PLOT_PAD_LEFT
    }

    fn plot_width(&self) -> u32 {
        self.width - PLOT_PAD_LEFT - PLOT_PAD_RIGHT
    }

    fn plot_top(&self) -> u32 {
        self.top + PLOT_PAD_TOP
    }

    fn baseline(&self) -> u32 {
        self.top + self.height - PLOT_PAD_BOTTOM
    }

    fn plot_height(&self) -> u32 {
        self.baseline() - self.plot_top()
    }

    /// Left edge and width of bar `i` of `n`.
    fn bar_span(&self, i: usize, n: usize) -> (u32, u32) {
        let slot = self.plot_width() as f32 / n as f32;
        let x = self.plot_left() as f32 + slot * i as f32 + slot * SLOT_GAP / 2.0;
        (x.round() as u32, (slot * (1.0 - SLOT_GAP)).round() as u32)
    }

    /// Canvas row for `value` on an axis running from 0 to `axis_max`.
    fn row(&self, value: f64, axis_max: f64) -> u32 {
        let h = (value / axis_max * f64::from(self.plot_height())).round();
        let h = h.clamp(0.0, f64::from(self.plot_height())) as u32;
        self.baseline() - h
    }
}

/// Render the thirds and fifths panels. Titles and value labels need a font.
pub fn render(metrics: &FacialMetrics, font: Option<&FontVec>) -> RgbImage {
    let mut img = RgbImage::from_pixel(CHART_WIDTH, CHART_HEIGHT, BACKGROUND);

    draw_panel(
        &mut img,
        Panel::new(0),
        &Series {
            title: "Facial thirds (% of face height)",
            labels: ["Upper", "Middle", "Lower"],
            values: metrics.thirds(),
            colors: [RED, BLUE, PURPLE],
            ideal: IDEAL_THIRD_PCT,
        },
        font,
    );
    draw_panel(
        &mut img,
        Panel::new(1),
        &Series {
            title: "Facial fifths (% of face width)",
            labels: ["1", "2", "3", "4", "5"],
            values: metrics.fifths(),
            colors: [RED, BLUE, PURPLE, BLUE, RED],
            ideal: IDEAL_FIFTH_PCT,
        },
        font,
    );

    img
}

fn draw_panel<const N: usize>(
    img: &mut RgbImage,
    panel: Panel,
    series: &Series<'_, N>,
    font: Option<&FontVec>,
) {
    drawing::draw_filled_rect_mut(
        img,
        Rect::at(panel.left as i32, panel.top as i32).of_size(panel.width, panel.height),
        PANEL,
    );

    let axis_max = axis_max(&series.values, series.ideal);
    let baseline = panel.baseline();

    for (i, (&value, &color)) in series.values.iter().zip(&series.colors).enumerate() {
        let (x, w) = panel.bar_span(i, N);
        let top = panel.row(value, axis_max);
        if top < baseline {
            let rect = Rect::at(x as i32, top as i32).of_size(w, baseline - top);
            drawing::draw_filled_rect_mut(img, rect, color);
            drawing::draw_hollow_rect_mut(img, rect, WHITE);
        }

        if let Some(font) = font {
            let cx = (x + w / 2) as i32;
            text::draw_centered(img, font, 18.0, cx, top as i32 - 24, WHITE, &format!("{value:.1}%"));
            text::draw_centered(img, font, 18.0, cx, baseline as i32 + 10, WHITE, series.labels[i]);
        }
    }

    // Axis.
    drawing::draw_line_segment_mut(
        img,
        (panel.plot_left() as f32, baseline as f32),
        ((panel.plot_left() + panel.plot_width()) as f32, baseline as f32),
        WHITE,
    );

    let ideal_row = panel.row(series.ideal, axis_max);
    draw_dashed_hline(img, panel.plot_left(), panel.plot_left() + panel.plot_width(), ideal_row);

    if let Some(font) = font {
        text::draw_centered(
            img,
            font,
            24.0,
            (panel.left + panel.width / 2) as i32,
            (panel.top + 16) as i32,
            WHITE,
            series.title,
        );
        text::draw_outlined(
            img,
            font,
            16.0,
            (panel.plot_left() + 4) as i32,
            ideal_row as i32 - 20,
            WHITE,
            &format!("Ideal ({:.0}%)", series.ideal),
        );
    }
}

/// Axis top: a quarter above the larger of the tallest bar and the ideal.
fn axis_max(values: &[f64], ideal: f64) -> f64 {
    let max = values.iter().copied().fold(ideal, f64::max);
    if max > 0.0 {
        max * 1.25
    } else {
        1.0
    }
}

fn draw_dashed_hline(img: &mut RgbImage, x0: u32, x1: u32, y: u32) {
    let mut x = x0;
    while x < x1 {
        let end = (x + DASH).min(x1);
        drawing::draw_line_segment_mut(img, (x as f32, y as f32), (end as f32, y as f32), WHITE);
        x = end + DASH_GAP;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> FacialMetrics {
        serde_json::from_value(serde_json::Value::Object(
            FacialMetrics::FIELD_NAMES
                .iter()
                .map(|name| {
                    let v = match *name {
                        "third_upper_pct" => 30.0,
                        "third_middle_pct" => 35.0,
                        "third_lower_pct" => 35.0,
                        "fifth_1_pct" | "fifth_5_pct" => 18.0,
                        "fifth_2_pct" | "fifth_4_pct" => 20.0,
                        "fifth_3_pct" => 24.0,
                        _ => 1.0,
                    };
                    (name.to_string(), serde_json::json!(v))
                })
                .collect(),
        ))
        .unwrap()
    }

    fn bar_centre(panel: Panel, i: usize, n: usize, value: f64, axis: f64) -> (u32, u32) {
        let (x, w) = panel.bar_span(i, n);
        let top = panel.row(value, axis);
        (x + w / 2, (top + panel.baseline()) / 2)
    }

    #[test]
    fn test_chart_dimensions_and_background() {
        let img = render(&metrics(), None);
        assert_eq!(img.dimensions(), (CHART_WIDTH, CHART_HEIGHT));
        assert_eq!(*img.get_pixel(5, 5), BACKGROUND);
        let panel = Panel::new(1);
        assert_eq!(*img.get_pixel(panel.left + 5, panel.top + 5), PANEL);
    }

    #[test]
    fn test_bar_colors() {
        let m = metrics();
        let img = render(&m, None);

        let thirds = Panel::new(0);
        let axis = axis_max(&m.thirds(), IDEAL_THIRD_PCT);
        for (i, (value, color)) in m.thirds().iter().zip([RED, BLUE, PURPLE]).enumerate() {
            let (x, y) = bar_centre(thirds, i, 3, *value, axis);
            assert_eq!(*img.get_pixel(x, y), color, "third {i}");
        }

        let fifths = Panel::new(1);
        let axis = axis_max(&m.fifths(), IDEAL_FIFTH_PCT);
        let (x, y) = bar_centre(fifths, 2, 5, m.fifth_3_pct, axis);
        assert_eq!(*img.get_pixel(x, y), PURPLE);
    }

    #[test]
    fn test_taller_value_gives_taller_bar() {
        let panel = Panel::new(0);
        let axis = axis_max(&[30.0, 35.0], 33.3);
        assert!(panel.row(35.0, axis) < panel.row(30.0, axis));
        assert_eq!(panel.row(0.0, axis), panel.baseline());
        assert_eq!(panel.row(axis * 2.0, axis), panel.plot_top());
    }

    #[test]
    fn test_ideal_line_is_dashed() {
        let m = metrics();
        let img = render(&m, None);
        let panel = Panel::new(0);
        let row = panel.row(IDEAL_THIRD_PCT, axis_max(&m.thirds(), IDEAL_THIRD_PCT));
        let x0 = panel.plot_left();
        assert_eq!(*img.get_pixel(x0 + 2, row), WHITE);
        assert_ne!(*img.get_pixel(x0 + DASH + DASH_GAP / 2, row), WHITE);
    }

    #[test]
    fn test_axis_max_handles_all_zero() {
        assert_eq!(axis_max(&[0.0, 0.0], 0.0), 1.0);
        assert_eq!(axis_max(&[10.0, 40.0], 20.0), 50.0);
    }
}
