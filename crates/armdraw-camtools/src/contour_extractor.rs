//! Contour Extractor
//!
//! Vectorizes a grayscale image into marker-delimited polylines in pixel
//! space. The image is blurred, sharpened by blending a Laplacian back in,
//! binarized by one of three policies, and its region boundaries are traced,
//! ordered largest first, filtered, and simplified.

use crate::simplify::{perimeter, polygon_area, simplify_closed};
use armdraw_core::{DrawingPath, ExtractionError, Point2D};
use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, Contour};
use imageproc::definitions::Image;
use imageproc::distance_transform::Norm;
use imageproc::filter::{filter_clamped, gaussian_blur_f32};
use imageproc::kernel::Kernel;
use imageproc::morphology;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Sigma matching a 5x5 Gaussian kernel with automatic sigma
const DENOISE_SIGMA: f32 = 1.1;

/// Sigma of the weighted neighbourhood used by adaptive thresholding (11x11 block)
const ADAPTIVE_SIGMA: f32 = 2.0;

/// Offset subtracted from the local mean in adaptive thresholding
const ADAPTIVE_OFFSET: f32 = 2.0;

/// Weight of the blurred image in the sharpening blend
const BLUR_WEIGHT: f32 = 0.7;

/// Weight of the Laplacian in the sharpening blend
const EDGE_WEIGHT: f32 = 0.3;

/// 3x3 Laplacian aperture
const LAPLACIAN_3X3: [i32; 9] = [2, 0, 2, 0, -8, 0, 2, 0, 2];

/// Contours enclosing less area than this are noise
pub const MIN_CONTOUR_AREA: f64 = 5.0;

/// Base simplification factor, divided by the detail level
pub const EPSILON_BASE: f64 = 0.03;

/// Retries stop once the threshold is at or below this value
pub const RETRY_FLOOR: u8 = 50;

/// Amount the threshold drops on each retry
pub const RETRY_STEP: u8 = 30;

/// Binarization policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    /// Global threshold followed by a closing
    #[default]
    Contour,
    /// Canny edges with hysteresis `(t, 2t)` followed by a dilation
    Canny,
    /// Local Gaussian-weighted threshold followed by a closing
    Adaptive,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionMethod::Contour => write!(f, "contour"),
            ExtractionMethod::Canny => write!(f, "canny"),
            ExtractionMethod::Adaptive => write!(f, "adaptive"),
        }
    }
}

impl FromStr for ExtractionMethod {
    type Err = ExtractionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contour" => Ok(ExtractionMethod::Contour),
            "canny" => Ok(ExtractionMethod::Canny),
            "adaptive" => Ok(ExtractionMethod::Adaptive),
            other => Err(ExtractionError::UnknownMethod {
                name: other.to_string(),
            }),
        }
    }
}

/// Contour extraction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionParams {
    /// Binarization threshold (0-255)
    pub threshold: u8,
    /// Treat dark pixels as foreground
    pub invert: bool,
    /// Binarization policy
    pub method: ExtractionMethod,
    /// Detail level (> 0); smaller values simplify more coarsely
    pub detail_level: f64,
}

impl Default for ExtractionParams {
    fn default() -> Self {
        Self {
            threshold: 100,
            invert: true,
            method: ExtractionMethod::Contour,
            detail_level: 0.5,
        }
    }
}

impl ExtractionParams {
    /// Simplification factor applied to each contour's perimeter
    pub fn epsilon_factor(&self) -> f64 {
        EPSILON_BASE / self.detail_level
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<(), ExtractionError> {
        if !(self.detail_level.is_finite() && self.detail_level > 0.0) {
            return Err(ExtractionError::InvalidParameter {
                name: "detail_level".to_string(),
                reason: format!("must be greater than 0, got {}", self.detail_level),
            });
        }
        Ok(())
    }
}

/// Result of a successful extraction
#[derive(Debug, Clone)]
pub struct Extraction {
    /// The unmodified source image
    pub source: GrayImage,
    /// Binary mask the contours were traced from
    pub binary: GrayImage,
    /// Marker-delimited polylines in pixel space, largest first
    pub path: DrawingPath,
    /// Threshold that produced the path, lower than requested after retries
    pub threshold_used: u8,
}

/// Image vectorizer
#[derive(Debug, Clone, Default)]
pub struct ContourExtractor {
    params: ExtractionParams,
}

impl ContourExtractor {
    /// Create an extractor with the given parameters
    pub fn new(params: ExtractionParams) -> Self {
        Self { params }
    }

    /// Current parameters
    pub fn params(&self) -> &ExtractionParams {
        &self.params
    }

    /// Vectorize `gray`.
    ///
    /// With the `contour` method, an empty result is retried with the
    /// threshold lowered by 30 while it stays above 50. Any other empty
    /// result is [`ExtractionError::NoContours`].
    pub fn extract(&self, gray: &GrayImage) -> Result<Extraction, ExtractionError> {
        self.params.validate()?;
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Err(ExtractionError::EmptyImage { width, height });
        }

        let enhanced = enhance(gray);
        let epsilon_factor = self.params.epsilon_factor();
        let mut threshold = self.params.threshold;

        loop {
            let binary = binarize(&enhanced, self.params.method, threshold, self.params.invert);
            let polylines = trace_polylines(&binary, epsilon_factor);
            debug!(
                method = %self.params.method,
                threshold,
                polylines = polylines.len(),
                "traced contours"
            );

            if !polylines.is_empty() {
                let path = DrawingPath::from_polylines(polylines);
                info!(
                    polylines = path.segment_count(),
                    points = path.point_count(),
                    threshold,
                    "extracted drawing path"
                );
                return Ok(Extraction {
                    source: gray.clone(),
                    binary,
                    path,
                    threshold_used: threshold,
                });
            }

            if self.params.method == ExtractionMethod::Contour && threshold > RETRY_FLOOR {
                let lowered = threshold - RETRY_STEP;
                warn!(
                    from = threshold,
                    to = lowered,
                    "no contours found, retrying with lower threshold"
                );
                threshold = lowered;
                continue;
            }

            return Err(ExtractionError::NoContours {
                method: self.params.method.to_string(),
                threshold,
            });
        }
    }
}

/// Denoise, then blend a Laplacian edge map back into the blurred image
pub fn enhance(gray: &GrayImage) -> GrayImage {
    let blurred = gaussian_blur_f32(gray, DENOISE_SIGMA);
    let laplacian: Image<Luma<i16>> = filter_clamped(&blurred, Kernel::new(&LAPLACIAN_3X3, 3, 3));

    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let base = f32::from(blurred.get_pixel(x, y)[0]);
        // Laplacian saturates to the 8-bit range before blending.
        let edge = f32::from(laplacian.get_pixel(x, y)[0].clamp(0, 255));
        let value = (BLUR_WEIGHT * base + EDGE_WEIGHT * edge).round().clamp(0.0, 255.0);
        Luma([value as u8])
    })
}

/// Produce the binary mask for one method and threshold
pub fn binarize(
    enhanced: &GrayImage,
    method: ExtractionMethod,
    threshold: u8,
    invert: bool,
) -> GrayImage {
    match method {
        ExtractionMethod::Contour => {
            let mask = map_foreground(enhanced, invert, |_, _, v| v > threshold);
            morphology::close(&mask, Norm::LInf, 1)
        }
        ExtractionMethod::Canny => {
            // A zero low threshold would let hysteresis walk onto the border row.
            let low = f32::from(threshold.max(1));
            let edges = imageproc::edges::canny(enhanced, low, low * 2.0);
            morphology::dilate(&edges, Norm::LInf, 1)
        }
        ExtractionMethod::Adaptive => {
            let local_mean = gaussian_blur_f32(enhanced, ADAPTIVE_SIGMA);
            let mask = map_foreground(enhanced, invert, |x, y, v| {
                f32::from(v) > f32::from(local_mean.get_pixel(x, y)[0]) - ADAPTIVE_OFFSET
            });
            morphology::close(&mask, Norm::LInf, 1)
        }
    }
}

fn map_foreground<F>(image: &GrayImage, invert: bool, above: F) -> GrayImage
where
    F: Fn(u32, u32, u8) -> bool,
{
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let hit = above(x, y, image.get_pixel(x, y)[0]);
        if hit != invert {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Trace every region boundary, order by enclosed area, drop noise, simplify
pub fn trace_polylines(binary: &GrayImage, epsilon_factor: f64) -> Vec<Vec<Point2D>> {
    let contours: Vec<Contour<u32>> = find_contours(binary);

    let mut measured: Vec<(f64, Vec<Point2D>)> = contours
        .into_iter()
        .map(|contour| {
            let points: Vec<Point2D> = contour
                .points
                .into_iter()
                .map(|p| Point2D::new(f64::from(p.x), f64::from(p.y)))
                .collect();
            (polygon_area(&points), points)
        })
        .collect();

    // Stable sort keeps trace order among equal areas.
    measured.sort_by(|a, b| b.0.total_cmp(&a.0));

    measured
        .into_iter()
        .filter(|(area, _)| *area >= MIN_CONTOUR_AREA)
        .map(|(_, points)| {
            let epsilon = epsilon_factor * perimeter(&points, true);
            simplify_closed(&points, epsilon)
        })
        .filter(|polyline| !polyline.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas(width: u32, height: u32, background: u8) -> GrayImage {
        GrayImage::from_pixel(width, height, Luma([background]))
    }

    fn fill_rect(img: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, value: u8) {
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, Luma([value]));
            }
        }
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("Canny".parse::<ExtractionMethod>(), Ok(ExtractionMethod::Canny));
        assert_eq!(
            "sobel".parse::<ExtractionMethod>(),
            Err(ExtractionError::UnknownMethod {
                name: "sobel".to_string()
            })
        );
        assert_eq!(ExtractionMethod::Adaptive.to_string(), "adaptive");
    }

    #[test]
    fn test_epsilon_factor() {
        let params = ExtractionParams {
            detail_level: 0.5,
            ..Default::default()
        };
        assert!((params.epsilon_factor() - 0.06).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_detail_level() {
        let extractor = ContourExtractor::new(ExtractionParams {
            detail_level: 0.0,
            ..Default::default()
        });
        let err = extractor.extract(&canvas(10, 10, 255)).unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidParameter { .. }));
    }

    #[test]
    fn test_empty_image() {
        let extractor = ContourExtractor::default();
        let err = extractor.extract(&GrayImage::new(0, 0)).unwrap_err();
        assert_eq!(err, ExtractionError::EmptyImage { width: 0, height: 0 });
    }

    #[test]
    fn test_dark_square_on_white() {
        let mut img = canvas(60, 60, 255);
        fill_rect(&mut img, 15, 15, 45, 45, 0);

        let extraction = ContourExtractor::default().extract(&img).unwrap();
        assert_eq!(extraction.threshold_used, 100);
        assert!(extraction.path.segment_count() >= 1);
        assert!(!extraction.path.items()[0].is_marker());

        let largest = extraction.path.segments().next().unwrap();
        for p in &largest {
            assert!(p.x >= 10.0 && p.x <= 50.0, "x out of square: {}", p.x);
            assert!(p.y >= 10.0 && p.y <= 50.0, "y out of square: {}", p.y);
        }
    }

    #[test]
    fn test_blank_image_fails_after_retries() {
        let extractor = ContourExtractor::default();
        let err = extractor.extract(&canvas(40, 40, 255)).unwrap_err();
        assert_eq!(
            err,
            ExtractionError::NoContours {
                method: "contour".to_string(),
                threshold: 40
            }
        );
    }

    #[test]
    fn test_uniform_grey_square_exhausts_retries() {
        // Grey 100 blends to at least 70 everywhere, so no pass at 60 or 30
        // finds a dark region.
        let mut img = canvas(50, 50, 255);
        fill_rect(&mut img, 10, 10, 40, 40, 100);
        let extractor = ContourExtractor::new(ExtractionParams {
            threshold: 60,
            ..Default::default()
        });
        let err = extractor.extract(&img).unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::NoContours { threshold: 30, .. }
        ));

        let extractor = ContourExtractor::new(ExtractionParams {
            threshold: 90,
            ..Default::default()
        });
        assert_eq!(extractor.extract(&img).unwrap().threshold_used, 90);
    }

    #[test]
    fn test_retry_lowers_threshold_until_found() {
        // Bright square on black without inversion. The blend caps every
        // pixel below 200, and the square interior sits at 140.
        let mut img = canvas(60, 60, 0);
        fill_rect(&mut img, 15, 15, 45, 45, 200);
        let extractor = ContourExtractor::new(ExtractionParams {
            threshold: 250,
            invert: false,
            ..Default::default()
        });

        let extraction = extractor.extract(&img).unwrap();
        let used = extraction.threshold_used;
        assert!((130..=190).contains(&used), "threshold {}", used);
        assert_eq!((250 - used) % 30, 0);
    }

    #[test]
    fn test_non_contour_methods_do_not_retry() {
        let extractor = ContourExtractor::new(ExtractionParams {
            method: ExtractionMethod::Canny,
            ..Default::default()
        });
        let err = extractor.extract(&canvas(30, 30, 200)).unwrap_err();
        assert_eq!(
            err,
            ExtractionError::NoContours {
                method: "canny".to_string(),
                threshold: 100
            }
        );
    }

    #[test]
    fn test_canny_finds_square_edges() {
        let mut img = canvas(60, 60, 255);
        fill_rect(&mut img, 15, 15, 45, 45, 0);
        let extractor = ContourExtractor::new(ExtractionParams {
            method: ExtractionMethod::Canny,
            ..Default::default()
        });
        let extraction = extractor.extract(&img).unwrap();
        assert!(extraction.path.point_count() >= 3);
    }

    #[test]
    fn test_trace_orders_by_area() {
        let mut mask = GrayImage::new(80, 40);
        fill_rect(&mut mask, 5, 5, 12, 12, 255);
        fill_rect(&mut mask, 30, 5, 70, 35, 255);

        let polylines = trace_polylines(&mask, 0.01);
        assert_eq!(polylines.len(), 2);
        assert!(polygon_area(&polylines[0]) > polygon_area(&polylines[1]));
    }

    #[test]
    fn test_trace_drops_specks() {
        let mut mask = GrayImage::new(20, 20);
        fill_rect(&mut mask, 3, 3, 5, 5, 255);
        assert!(trace_polylines(&mask, 0.06).is_empty());
    }
}
