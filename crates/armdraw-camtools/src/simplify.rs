//! Polyline measurements and Ramer-Douglas-Peucker simplification
//!
//! Contours traced from a binary mask follow every boundary pixel. These
//! helpers measure a traced contour as a closed curve and reduce it to the
//! corners that matter for drawing.

use armdraw_core::Point2D;

/// Area enclosed by a closed polyline (shoelace formula, always non-negative)
pub fn polygon_area(points: &[Point2D]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice_signed: f64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum();
    twice_signed.abs() / 2.0
}

/// Length of a polyline, including the closing edge when `closed` is set
pub fn perimeter(points: &[Point2D], closed: bool) -> f64 {
    let open: f64 = points.windows(2).map(|w| w[0].distance_to(&w[1])).sum();
    match (closed, points.first(), points.last()) {
        (true, Some(first), Some(last)) if points.len() > 1 => open + last.distance_to(first),
        _ => open,
    }
}

/// Simplify an open polyline.
///
/// Points closer than `tolerance` to the chord between kept neighbours are
/// dropped. Both endpoints are always kept; fewer than three points are
/// returned unchanged.
pub fn simplify_open(points: &[Point2D], tolerance: f64) -> Vec<Point2D> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let last = points.len() - 1;
    let mut kept = vec![false; points.len()];
    kept[0] = true;
    kept[last] = true;

    let mut spans = vec![(0usize, last)];
    while let Some((start, end)) = spans.pop() {
        if end <= start + 1 {
            continue;
        }
        let (idx, dist) = ((start + 1)..end)
            .map(|i| (i, chord_distance(&points[i], &points[start], &points[end])))
            .fold((start, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });

        if dist > tolerance {
            kept[idx] = true;
            spans.push((start, idx));
            spans.push((idx, end));
        }
    }

    points
        .iter()
        .zip(&kept)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Simplify a closed contour.
///
/// The curve is opened at its first point and closed again with a copy of
/// it, so the first point always survives and the result carries no
/// duplicate closing point.
pub fn simplify_closed(points: &[Point2D], tolerance: f64) -> Vec<Point2D> {
    let Some(first) = points.first() else {
        return Vec::new();
    };
    let mut ring = points.to_vec();
    ring.push(*first);

    let mut simplified = simplify_open(&ring, tolerance);
    if simplified.len() > 1 {
        simplified.pop();
    }
    simplified
}

/// Distance from `p` to the line through `a` and `b`; distance to `a` when they coincide
fn chord_distance(p: &Point2D, a: &Point2D, b: &Point2D) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length = dx.hypot(dy);
    if length == 0.0 {
        return p.distance_to(a);
    }
    (dx * (a.y - p.y) - dy * (a.x - p.x)).abs() / length
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(coords: &[(f64, f64)]) -> Vec<Point2D> {
        coords.iter().copied().map(Point2D::from).collect()
    }

    #[test]
    fn test_square_area_and_perimeter() {
        let square = pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        assert_eq!(polygon_area(&square), 100.0);
        assert_eq!(perimeter(&square, true), 40.0);
        assert_eq!(perimeter(&square, false), 30.0);
    }

    #[test]
    fn test_area_ignores_winding() {
        let mut square = pts(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]);
        square.reverse();
        assert_eq!(polygon_area(&square), 16.0);
        assert_eq!(polygon_area(&square[..2]), 0.0);
    }

    #[test]
    fn test_collinear_points_collapse() {
        let line = pts(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]);
        assert_eq!(simplify_open(&line, 0.1), pts(&[(0.0, 0.0), (3.0, 3.0)]));
    }

    #[test]
    fn test_peaks_above_tolerance_survive() {
        let zigzag = pts(&[(0.0, 0.0), (2.0, 5.0), (4.0, 0.0), (6.0, 5.0), (8.0, 0.0)]);
        assert_eq!(simplify_open(&zigzag, 1.0).len(), 5);
        assert_eq!(simplify_open(&zigzag, 10.0).len(), 2);
    }

    #[test]
    fn test_closed_pixel_square_keeps_corners() {
        // Boundary of a 5x5 block traced pixel by pixel.
        let mut ring = Vec::new();
        for x in 0..4 {
            ring.push(Point2D::new(x as f64, 0.0));
        }
        for y in 0..4 {
            ring.push(Point2D::new(4.0, y as f64));
        }
        for x in (1..=4).rev() {
            ring.push(Point2D::new(x as f64, 4.0));
        }
        for y in (1..=4).rev() {
            ring.push(Point2D::new(0.0, y as f64));
        }

        let simplified = simplify_closed(&ring, 0.5);
        assert_eq!(
            simplified,
            pts(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)])
        );
    }

    #[test]
    fn test_closed_degenerate_inputs() {
        assert!(simplify_closed(&[], 1.0).is_empty());
        let single = pts(&[(3.0, 3.0)]);
        assert_eq!(simplify_closed(&single, 1.0), single);
    }
}
