// SPDX-License-Identifier: Apache-2.0

use genecache_model::FrequencyTable;
use image::{Rgb, RgbImage};
use std::f64::consts::TAU;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartError(pub String);

impl Display for ChartError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "chart rendering failed: {}", self.0)
    }
}

impl std::error::Error for ChartError {}

impl From<png::EncodingError> for ChartError {
    fn from(value: png::EncodingError) -> Self {
        Self(value.to_string())
    }
}

/// Turns a frequency table into PNG bytes.
pub trait ChartRenderer: Send + Sync {
    fn render(&self, title: &str, table: &FrequencyTable) -> Result<Vec<u8>, ChartError>;
}

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const UNLABELED: Rgb<u8> = Rgb([190, 190, 190]);
const PALETTE: [Rgb<u8>; 10] = [
    Rgb([31, 119, 180]),
    Rgb([255, 127, 14]),
    Rgb([44, 160, 44]),
    Rgb([214, 39, 40]),
    Rgb([148, 103, 189]),
    Rgb([140, 86, 75]),
    Rgb([227, 119, 194]),
    Rgb([127, 127, 127]),
    Rgb([188, 189, 34]),
    Rgb([23, 190, 207]),
];
const SWATCH: u32 = 14;
const SWATCH_STEP: u32 = 22;

/// Pie chart with a swatch legend column.
///
/// Pixels carry no text; the title and every labeled bucket are written as
/// PNG `iTXt` chunks (`Title`, `Bucket 0`, ...), in table order.
#[derive(Debug, Clone)]
pub struct PieChartRenderer {
    pub width: u32,
    pub height: u32,
}

impl Default for PieChartRenderer {
    fn default() -> Self {
        Self {
            width: 640,
            height: 400,
        }
    }
}

fn slice_color(index: usize, label: &str) -> Rgb<u8> {
    if label.is_empty() {
        UNLABELED
    } else {
        PALETTE[index % PALETTE.len()]
    }
}

impl PieChartRenderer {
    fn draw(&self, table: &FrequencyTable) -> RgbImage {
        let mut img = RgbImage::from_pixel(self.width, self.height, BACKGROUND);
        let total = table.total();
        if total == 0 {
            return img;
        }

        // Cumulative end fraction of each slice, clockwise from twelve o'clock.
        let mut ends = Vec::with_capacity(table.len());
        let mut running = 0_u64;
        for (i, (label, count)) in table.iter().enumerate() {
            running += count;
            ends.push((running as f64 / total as f64, slice_color(i, label)));
        }

        let diameter = self.height.min(self.width);
        let radius = f64::from(diameter) / 2.0 - 10.0;
        let center = f64::from(diameter) / 2.0;
        for y in 0..diameter {
            for x in 0..diameter {
                let dx = f64::from(x) + 0.5 - center;
                let dy = f64::from(y) + 0.5 - center;
                if dx * dx + dy * dy > radius * radius {
                    continue;
                }
                let fraction = dx.atan2(-dy).rem_euclid(TAU) / TAU;
                if let Some((_, color)) = ends.iter().find(|(end, _)| fraction < *end) {
                    img.put_pixel(x, y, *color);
                }
            }
        }

        let legend_x = diameter + 20;
        let mut row = 0_u32;
        for (i, (label, count)) in table.iter().enumerate() {
            if count == 0 || label.is_empty() {
                continue;
            }
            let top = 20 + row * SWATCH_STEP;
            row += 1;
            for y in top..(top + SWATCH).min(self.height) {
                for x in legend_x..(legend_x + SWATCH).min(self.width) {
                    img.put_pixel(x, y, slice_color(i, label));
                }
            }
        }
        img
    }
}

impl ChartRenderer for PieChartRenderer {
    fn render(&self, title: &str, table: &FrequencyTable) -> Result<Vec<u8>, ChartError> {
        if self.width == 0 || self.height == 0 {
            return Err(ChartError("chart dimensions must be > 0".to_string()));
        }
        let img = self.draw(table);
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
            encoder.set_color(png::ColorType::Rgb);
            encoder.set_depth(png::BitDepth::Eight);
            encoder.add_itxt_chunk("Title".to_string(), title.to_string())?;
            for (i, (label, count)) in table.iter().enumerate() {
                if label.is_empty() {
                    continue;
                }
                encoder.add_itxt_chunk(format!("Bucket {i}"), format!("{label}: {count}"))?;
            }
            let mut writer = encoder.write_header()?;
            writer.write_image_data(img.as_raw())?;
            writer.finish()?;
        }
        Ok(out)
    }
}
