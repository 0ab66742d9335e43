//! Line fitting over Cartesian scan points.
//!
//! Used to recognise walls: a run of points is treated as a wall when a
//! least-squares line fits it with a summed squared residual under the
//! configured tolerance. Degenerate inputs yield `None`.

use serde::{Deserialize, Serialize};
use wayfinder_core::Point;

/// A line `y = slope * x + intercept` in the robot frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LineFit {
    pub fn y_at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Ordinary least-squares fit of `y` against `x`.
///
/// Returns `None` for fewer than two points or when every point shares the
/// same `x` (a vertical line has no finite slope).
///
/// # Examples
///
/// ```
/// use wayfinder_analysis::geometry::least_squares;
/// use wayfinder_core::Point;
///
/// let points = [Point::new(0.0, 1.0), Point::new(1.0, 3.0), Point::new(2.0, 5.0)];
/// let fit = least_squares(&points).unwrap();
/// assert!((fit.slope - 2.0).abs() < 1e-9);
/// assert!((fit.intercept - 1.0).abs() < 1e-9);
///
/// assert!(least_squares(&points[..1]).is_none());
/// ```
pub fn least_squares(points: &[Point]) -> Option<LineFit> {
    if points.len() < 2 {
        return None;
    }

    let n = points.len() as f64;
    let x_avg = points.iter().map(|p| p.x).sum::<f64>() / n;
    let y_avg = points.iter().map(|p| p.y).sum::<f64>() / n;

    let (covariance, variance) = points.iter().fold((0.0, 0.0), |(cov, var), p| {
        let dx = p.x - x_avg;
        (cov + dx * (p.y - y_avg), var + dx * dx)
    });

    if variance <= f64::EPSILON {
        return None;
    }

    let slope = covariance / variance;
    Some(LineFit {
        slope,
        intercept: y_avg - slope * x_avg,
    })
}

/// Sum of squared vertical residuals of `points` against `fit`.
pub fn error_squared(points: &[Point], fit: &LineFit) -> f64 {
    points
        .iter()
        .map(|p| {
            let dy = p.y - fit.y_at(p.x);
            dy * dy
        })
        .sum()
}

/// Fit a wall through `points`.
///
/// Needs at least `min_points` points (and never fewer than two) and a
/// residual no larger than `tolerance`.
pub fn fit_wall(points: &[Point], min_points: usize, tolerance: f64) -> Option<LineFit> {
    if points.len() < min_points.max(2) {
        return None;
    }

    let fit = least_squares(points)?;
    (error_squared(points, &fit) <= tolerance).then_some(fit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(slope: f64, intercept: f64, xs: &[f64]) -> Vec<Point> {
        xs.iter()
            .map(|&x| Point::new(x, slope * x + intercept))
            .collect()
    }

    #[test]
    fn test_exact_line_has_zero_error() {
        let points = line(0.5, 300.0, &[-200.0, -100.0, 0.0, 100.0]);
        let fit = least_squares(&points).unwrap();

        assert!((fit.slope - 0.5).abs() < 1e-9);
        assert!((fit.intercept - 300.0).abs() < 1e-9);
        assert!(error_squared(&points, &fit) < 1e-6);
    }

    #[test]
    fn test_vertical_points_are_degenerate() {
        let points = [Point::new(-250.0, 10.0), Point::new(-250.0, 200.0)];
        assert!(least_squares(&points).is_none());
        assert!(fit_wall(&points, 1, 700.0).is_none());
    }

    #[test]
    fn test_empty_input() {
        assert!(least_squares(&[]).is_none());
        assert!(fit_wall(&[], 0, 700.0).is_none());
    }

    #[test]
    fn test_scattered_points_are_not_a_wall() {
        let points = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 400.0),
            Point::new(20.0, -300.0),
            Point::new(30.0, 250.0),
        ];
        assert!(least_squares(&points).is_some());
        assert!(fit_wall(&points, 2, 700.0).is_none());
    }

    #[test]
    fn test_noisy_wall_within_tolerance() {
        let mut points = line(0.0, 350.0, &[-150.0, -50.0, 50.0, 150.0]);
        points[1].y += 10.0;
        points[2].y -= 10.0;

        let fit = fit_wall(&points, 2, 700.0).unwrap();
        assert!(fit.slope.abs() < 0.2);
    }

    #[test]
    fn test_min_points_enforced() {
        let points = line(1.0, 0.0, &[0.0, 1.0, 2.0]);
        assert!(fit_wall(&points, 4, 700.0).is_none());
        assert!(fit_wall(&points, 3, 700.0).is_some());
    }
}
