//! Owned figures rendered to raster files.
//!
//! Every plotting step builds its own [`Figure`] and saves it explicitly;
//! nothing is drawn onto a shared surface. Rendering goes through the
//! `plotters` bitmap backend, which produces identical bytes for identical
//! figures. Captions, axis descriptions and legends need a font backend and
//! are only drawn when the `ttf` feature is enabled.

use std::{ops::Range, path::Path};

use plotters::{chart::SeriesAnno, prelude::*};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Output size in pixels.
pub const CANVAS: (u32, u32) = (640, 480);

const MARKER_SIZE: u32 = 4;
const LINE_WIDTH: u32 = 2;
const DASH: f64 = 0.025;
const GAP: f64 = 0.015;

const VIRIDIS: [(u8, u8, u8); 5] = [
    (0x44, 0x01, 0x54),
    (0x3b, 0x52, 0x8b),
    (0x21, 0x91, 0x8c),
    (0x5e, 0xc9, 0x62),
    (0xfd, 0xe7, 0x25),
];

/// Raster encoding of a saved figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Lossless PNG.
    Png,
    /// Baseline JPEG.
    Jpeg,
}

impl ImageFormat {
    /// Format implied by the extension of `path`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("png") => Ok(Self::Png),
            Some("jpg" | "jpeg") => Ok(Self::Jpeg),
            _ => Err(AnalysisError::Plot(format!(
                "{} has no png/jpg extension",
                path.display()
            ))),
        }
    }
}

/// Corner holding the legend box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LegendPosition {
    /// Top left corner.
    #[default]
    UpperLeft,
    /// Top right corner.
    UpperRight,
    /// Bottom right corner.
    LowerRight,
}

/// One layer of a figure.
#[derive(Debug, Clone)]
pub enum Series {
    /// Filled circles, each with its own colour.
    Scatter {
        /// `(x, y, colour)` per marker.
        points: Vec<(f64, f64, RGBColor)>,
        /// Legend entry.
        label: Option<String>,
    },
    /// Polyline through the points in order.
    Line {
        /// Vertices.
        points: Vec<(f64, f64)>,
        /// Stroke colour.
        color: RGBColor,
        /// Draw as dashes instead of a solid stroke.
        dashed: bool,
        /// Legend entry.
        label: Option<String>,
    },
}

impl Series {
    fn points(&self) -> Box<dyn Iterator<Item = (f64, f64)> + '_> {
        match self {
            Self::Scatter { points, .. } => Box::new(points.iter().map(|&(x, y, _)| (x, y))),
            Self::Line { points, .. } => Box::new(points.iter().copied()),
        }
    }

    fn label(&self) -> Option<&str> {
        match self {
            Self::Scatter { label, .. } | Self::Line { label, .. } => label.as_deref(),
        }
    }
}

/// A single chart: title, axis descriptions, ranges and layers.
#[derive(Debug, Clone)]
pub struct Figure {
    /// Caption drawn above the chart.
    pub title: String,
    /// Horizontal axis description.
    pub x_label: String,
    /// Vertical axis description.
    pub y_label: String,
    /// Fixed horizontal range; fitted to the data when `None`.
    pub x_range: Option<Range<f64>>,
    /// Fixed vertical range; fitted to the data when `None`.
    pub y_range: Option<Range<f64>>,
    /// Where labelled series are listed.
    pub legend: LegendPosition,
    /// Layers in drawing order.
    pub series: Vec<Series>,
}

impl Figure {
    /// Empty figure titled `title`.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            x_label: String::new(),
            y_label: String::new(),
            x_range: None,
            y_range: None,
            legend: LegendPosition::default(),
            series: Vec::new(),
        }
    }

    /// Sets both axis descriptions.
    #[must_use]
    pub fn axes(mut self, x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
        self.x_label = x_label.into();
        self.y_label = y_label.into();
        self
    }

    /// Pins the visible ranges.
    #[must_use]
    pub fn ranges(mut self, x: Range<f64>, y: Range<f64>) -> Self {
        self.x_range = Some(x);
        self.y_range = Some(y);
        self
    }

    /// Moves the legend.
    #[must_use]
    pub const fn legend(mut self, position: LegendPosition) -> Self {
        self.legend = position;
        self
    }

    /// Adds single-colour markers.
    #[must_use]
    pub fn scatter(
        mut self,
        points: impl IntoIterator<Item = (f64, f64)>,
        color: RGBColor,
        label: Option<&str>,
    ) -> Self {
        self.series.push(Series::Scatter {
            points: points.into_iter().map(|(x, y)| (x, y, color)).collect(),
            label: label.map(str::to_owned),
        });
        self
    }

    /// Adds markers coloured individually.
    #[must_use]
    pub fn colored_scatter(mut self, points: impl IntoIterator<Item = (f64, f64, RGBColor)>) -> Self {
        self.series.push(Series::Scatter {
            points: points.into_iter().collect(),
            label: None,
        });
        self
    }

    /// Adds a polyline.
    #[must_use]
    pub fn line(
        mut self,
        points: impl IntoIterator<Item = (f64, f64)>,
        color: RGBColor,
        dashed: bool,
        label: Option<&str>,
    ) -> Self {
        self.series.push(Series::Line {
            points: points.into_iter().collect(),
            color,
            dashed,
            label: label.map(str::to_owned),
        });
        self
    }

    /// Renders to `path`, replacing any existing file. The extension of `path`
    /// must agree with `format`.
    pub fn save(&self, path: impl AsRef<Path>, format: ImageFormat) -> Result<()> {
        let path = path.as_ref();
        let implied = ImageFormat::from_path(path)?;
        if implied != format {
            return Err(AnalysisError::Plot(format!(
                "{} does not match requested {format:?}",
                path.display()
            )));
        }

        let root = BitMapBackend::new(path, CANVAS).into_drawing_area();
        root.fill(&WHITE).map_err(plot_error)?;
        let (x_range, y_range) = self.bounds();
        let span = (x_range.end - x_range.start, y_range.end - y_range.start);

        let mut builder = ChartBuilder::on(&root);
        builder.margin(20);
        #[cfg(feature = "ttf")]
        builder
            .caption(&self.title, ("sans-serif", 24))
            .x_label_area_size(40)
            .y_label_area_size(50);
        let mut chart = builder
            .build_cartesian_2d(x_range.clone(), y_range.clone())
            .map_err(plot_error)?;

        #[cfg(feature = "ttf")]
        chart
            .configure_mesh()
            .x_desc(&self.x_label)
            .y_desc(&self.y_label)
            .draw()
            .map_err(plot_error)?;
        #[cfg(not(feature = "ttf"))]
        chart
            .plotting_area()
            .draw(&Rectangle::new(
                [(x_range.start, y_range.start), (x_range.end, y_range.end)],
                BLACK.stroke_width(1),
            ))
            .map_err(plot_error)?;

        for series in &self.series {
            match series {
                Series::Scatter { points, label } => {
                    let anno = chart
                        .draw_series(points.iter().map(|&(x, y, color)| {
                            Circle::new((x, y), MARKER_SIZE, color.filled())
                        }))
                        .map_err(plot_error)?;
                    let color = points.first().map_or(BLACK, |point| point.2);
                    annotate(anno, label.as_deref(), color);
                }
                Series::Line {
                    points,
                    color,
                    dashed,
                    label,
                } => {
                    let color = *color;
                    let anno = if *dashed {
                        chart.draw_series(
                            dash_segments(points, span)
                                .into_iter()
                                .map(move |dash| PathElement::new(dash.to_vec(), color.stroke_width(LINE_WIDTH))),
                        )
                    } else {
                        chart.draw_series(LineSeries::new(
                            points.iter().copied(),
                            color.stroke_width(LINE_WIDTH),
                        ))
                    }
                    .map_err(plot_error)?;
                    annotate(anno, label.as_deref(), color);
                }
            }
        }

        #[cfg(feature = "ttf")]
        if self.series.iter().any(|series| series.label().is_some()) {
            let position = match self.legend {
                LegendPosition::UpperLeft => SeriesLabelPosition::UpperLeft,
                LegendPosition::UpperRight => SeriesLabelPosition::UpperRight,
                LegendPosition::LowerRight => SeriesLabelPosition::LowerRight,
            };
            chart
                .configure_series_labels()
                .position(position)
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .map_err(plot_error)?;
        }

        root.present().map_err(plot_error)?;
        Ok(())
    }

    /// Number of layers carrying a legend entry.
    #[must_use]
    pub fn legend_entries(&self) -> usize {
        self.series.iter().filter(|series| series.label().is_some()).count()
    }

    fn bounds(&self) -> (Range<f64>, Range<f64>) {
        let mut x = (f64::INFINITY, f64::NEG_INFINITY);
        let mut y = (f64::INFINITY, f64::NEG_INFINITY);
        for (px, py) in self.series.iter().flat_map(Series::points) {
            if px.is_finite() && py.is_finite() {
                x = (x.0.min(px), x.1.max(px));
                y = (y.0.min(py), y.1.max(py));
            }
        }
        (
            self.x_range.clone().unwrap_or_else(|| padded(x)),
            self.y_range.clone().unwrap_or_else(|| padded(y)),
        )
    }
}

#[cfg(feature = "ttf")]
fn annotate<'a, DB: DrawingBackend + 'a>(
    anno: &mut SeriesAnno<'a, DB>,
    label: Option<&str>,
    color: RGBColor,
) {
    if let Some(label) = label {
        anno.label(label)
            .legend(move |(x, y)| Circle::new((x, y), MARKER_SIZE, color.filled()));
    }
}

#[cfg(not(feature = "ttf"))]
fn annotate<DB: DrawingBackend>(_: &SeriesAnno<'_, DB>, _: Option<&str>, _: RGBColor) {}

fn padded((lo, hi): (f64, f64)) -> Range<f64> {
    if !lo.is_finite() || !hi.is_finite() {
        return 0.0..1.0;
    }
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 0.5 };
    (lo - pad)..(hi + pad)
}

/// Splits a polyline into dash segments of constant length relative to the
/// visible ranges.
fn dash_segments(points: &[(f64, f64)], span: (f64, f64)) -> Vec<[(f64, f64); 2]> {
    let lerp = |a: (f64, f64), b: (f64, f64), t: f64| (a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t);
    let mut dashes = Vec::new();
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let length = ((b.0 - a.0) / span.0).hypot((b.1 - a.1) / span.1);
        if !length.is_finite() || length <= 0.0 {
            continue;
        }
        let mut start = 0.0;
        let mut step = 0_u32;
        while start < length {
            let end = (start + DASH).min(length);
            dashes.push([lerp(a, b, start / length), lerp(a, b, end / length)]);
            step += 1;
            start = f64::from(step) * (DASH + GAP);
        }
    }
    dashes
}

/// Colour at position `t` in `[0, 1]` of the viridis ramp.
#[must_use]
pub fn viridis(t: f64) -> RGBColor {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (VIRIDIS.len() - 1) as f64;
    let lo = (scaled.floor() as usize).min(VIRIDIS.len() - 2);
    let frac = scaled - lo as f64;
    let (a, b) = (VIRIDIS[lo], VIRIDIS[lo + 1]);
    let channel = |from: u8, to: u8| (f64::from(from) + (f64::from(to) - f64::from(from)) * frac).round() as u8;
    RGBColor(channel(a.0, b.0), channel(a.1, b.1), channel(a.2, b.2))
}

/// Evenly spaced viridis colour for category `index` of `count`.
#[must_use]
pub fn category_color(index: usize, count: usize) -> RGBColor {
    if count <= 1 {
        return viridis(0.0);
    }
    viridis(index as f64 / (count - 1) as f64)
}

fn plot_error(err: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::Plot(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Figure {
        Figure::new("sample")
            .axes("x", "y")
            .scatter([(0.0, 1.0), (1.0, 3.0), (2.0, 2.0)], BLUE, Some("points"))
            .line([(0.0, 0.0), (2.0, 3.0)], RED, true, None)
    }

    #[test]
    fn writes_png_and_repeats_bytes() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("a.png");
        let second = dir.path().join("b.png");
        sample().save(&first, ImageFormat::Png).unwrap();
        sample().save(&second, ImageFormat::Png).unwrap();
        let bytes = std::fs::read(&first).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
        assert_eq!(bytes, std::fs::read(&second).unwrap());
    }

    #[test]
    fn writes_jpeg() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plot.jpg");
        sample().save(&path, ImageFormat::Jpeg).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn extension_must_match_format() {
        let dir = tempdir().unwrap();
        let err = sample()
            .save(dir.path().join("plot.png"), ImageFormat::Jpeg)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Plot(_)));
        assert!(sample().save(dir.path().join("plot.gif"), ImageFormat::Png).is_err());
    }

    #[test]
    fn dashes_leave_gaps() {
        let dashes = dash_segments(&[(0.0, 0.0), (0.9, 0.0)], (1.0, 1.0));
        assert_eq!(dashes.len(), 23);
        assert!((dashes[0][1].0 - DASH).abs() < 1e-12);
        assert!((dashes[1][0].0 - (DASH + GAP)).abs() < 1e-12);
    }

    #[test]
    fn viridis_endpoints() {
        assert_eq!(viridis(0.0), RGBColor(0x44, 0x01, 0x54));
        assert_eq!(viridis(1.0), RGBColor(0xfd, 0xe7, 0x25));
        assert_eq!(category_color(1, 3), RGBColor(0x21, 0x91, 0x8c));
        assert_eq!(sample().legend_entries(), 1);
    }
}
