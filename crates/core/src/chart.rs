use crate::domain::price::PriceSeries;
use anyhow::Context;
use plotters::prelude::*;
use std::io::Cursor;

pub const CHART_WIDTH: u32 = 800;
pub const CHART_HEIGHT: u32 = 400;
const MARGIN: u32 = 20;

pub const BACKGROUND: RGBColor = WHITE;
pub const PRICE_LINE: RGBColor = RGBColor(31, 119, 180);
const FRAME: RGBColor = RGBColor(200, 200, 200);

/// Draw the close prices as a line chart and encode it as PNG.
///
/// No text is drawn, so rendering needs no system fonts. The output is a pure function of the
/// closes.
pub fn render_price_chart(series: &PriceSeries) -> anyhow::Result<Vec<u8>> {
    let closes: Vec<f64> = series.closes().collect();
    anyhow::ensure!(!closes.is_empty(), "cannot chart an empty series");

    let (y_min, y_max) = price_range(&closes);
    let x_max = closes.len().saturating_sub(1).max(1);

    let mut pixels = vec![0u8; (CHART_WIDTH * CHART_HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (CHART_WIDTH, CHART_HEIGHT))
            .into_drawing_area();
        root.fill(&BACKGROUND)
            .map_err(|e| anyhow::anyhow!("chart fill failed: {e}"))?;

        let mut chart = ChartBuilder::on(&root)
            .margin(MARGIN)
            .build_cartesian_2d(0usize..x_max, y_min..y_max)
            .map_err(|e| anyhow::anyhow!("chart layout failed: {e}"))?;

        chart
            .plotting_area()
            .draw(&Rectangle::new(
                [(0usize, y_min), (x_max, y_max)],
                ShapeStyle::from(&FRAME).stroke_width(1),
            ))
            .map_err(|e| anyhow::anyhow!("chart frame failed: {e}"))?;

        chart
            .draw_series(LineSeries::new(
                closes.iter().enumerate().map(|(i, c)| (i, *c)),
                ShapeStyle::from(&PRICE_LINE).stroke_width(2),
            ))
            .map_err(|e| anyhow::anyhow!("chart line failed: {e}"))?;

        root.present()
            .map_err(|e| anyhow::anyhow!("chart present failed: {e}"))?;
    }

    encode_png(pixels)
}

/// Vertical range with 5% headroom; flat series get a band around the price.
fn price_range(closes: &[f64]) -> (f64, f64) {
    let min = closes.iter().copied().fold(f64::INFINITY, f64::min);
    let max = closes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    if span <= f64::EPSILON * max.abs().max(1.0) {
        let pad = (max.abs() * 0.05).max(1.0);
        return (min - pad, max + pad);
    }
    (min - span * 0.05, max + span * 0.05)
}

fn encode_png(pixels: Vec<u8>) -> anyhow::Result<Vec<u8>> {
    let img = image::RgbImage::from_raw(CHART_WIDTH, CHART_HEIGHT, pixels)
        .context("chart buffer does not match canvas size")?;
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .context("failed to encode chart as PNG")?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price::PriceObservation;
    use chrono::{Duration, NaiveDate};

    fn series(closes: &[f64]) -> PriceSeries {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let obs = closes
            .iter()
            .enumerate()
            .map(|(i, c)| PriceObservation::new(base + Duration::days(i as i64), *c))
            .collect();
        PriceSeries::new("TEST", obs).unwrap()
    }

    fn decode(png: &[u8]) -> image::RgbImage {
        image::load_from_memory_with_format(png, image::ImageFormat::Png)
            .unwrap()
            .to_rgb8()
    }

    fn is_line(p: &image::Rgb<u8>) -> bool {
        let [r, g, b] = p.0;
        b > 120 && b as i32 - r as i32 > 60 && b as i32 - g as i32 > 10
    }

    /// Mean row of line pixels inside a column band.
    fn line_row(img: &image::RgbImage, x_from: u32, x_to: u32) -> f64 {
        let mut rows = Vec::new();
        for x in x_from..x_to {
            for y in 0..img.height() {
                if is_line(img.get_pixel(x, y)) {
                    rows.push(y as f64);
                }
            }
        }
        assert!(!rows.is_empty(), "no line pixels in columns {x_from}..{x_to}");
        rows.iter().sum::<f64>() / rows.len() as f64
    }

    #[test]
    fn produces_png_of_fixed_size() {
        let png = render_price_chart(&series(&[100.0, 105.0, 99.0])).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let img = decode(&png);
        assert_eq!((img.width(), img.height()), (CHART_WIDTH, CHART_HEIGHT));
        assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn rising_series_ends_higher_on_canvas() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let img = decode(&render_price_chart(&series(&closes)).unwrap());
        let left = line_row(&img, 40, 80);
        let right = line_row(&img, 720, 760);
        assert!(right < left, "left row {left}, right row {right}");
    }

    #[test]
    fn flat_series_draws_mid_height_line() {
        let img = decode(&render_price_chart(&series(&[50.0, 50.0, 50.0])).unwrap());
        let row = line_row(&img, 300, 500);
        let mid = CHART_HEIGHT as f64 / 2.0;
        assert!((row - mid).abs() < 20.0, "row {row}");
    }

    #[test]
    fn same_series_renders_same_pixels() {
        let s = series(&[10.0, 12.0, 11.0, 15.0, 9.0]);
        let a = decode(&render_price_chart(&s).unwrap());
        let b = decode(&render_price_chart(&s).unwrap());
        assert_eq!(a.as_raw(), b.as_raw());
    }
}
