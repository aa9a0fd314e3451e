//! # Signal Smoothing
//!
//! Denoising filter driven by a single strength knob in `0..=100`.
//!
//! The window grows with both the curve length and the strength, from roughly 3%
//! of the curve at low strength up to roughly 25% at strength 100, and is always
//! odd and at least 5 samples wide.
//!
//! The primary method is Savitzky–Golay local polynomial regression (order 3) with
//! polynomial interpolation at both edges, so the first and last half-windows are
//! evaluated from a polynomial fitted to the first and last full windows instead
//! of being truncated. When the regression cannot be computed (window wider than
//! the curve, singular normal equations) a symmetric moving average over a signal
//! reflected at both ends is used instead. Both paths return exactly as many
//! samples as they receive.
//!
//! Smoothing never mutates stored curves; it is applied for display, derivative
//! computation and the smoothed export only.

use log::debug;

/// Largest window the smoother will use, in samples.
pub const MAX_WINDOW: usize = 101;

/// Smallest window the smoother will use, in samples.
pub const MIN_WINDOW: usize = 5;

/// Highest accepted strength value.
pub const MAX_STRENGTH: u8 = 100;

/// Smooth `y` with the given strength (clamped to `0..=100`).
///
/// Strength 0 or fewer than 3 samples returns an unchanged copy.
pub fn smooth_signal(y: &[f64], strength: u8) -> Vec<f64> {
    let Some(window) = window_size(y.len(), strength) else {
        return y.to_vec();
    };

    let order = polynomial_order(window);
    if let Some(smoothed) = savitzky_golay(y, window, order) {
        debug!(
            "Savitzky-Golay smoothing: n={}, strength={}, window={}, order={}",
            y.len(),
            strength,
            window,
            order
        );
        return smoothed;
    }

    let k = MIN_WINDOW.max(window.min(y.len() - 1));
    debug!(
        "Savitzky-Golay unavailable for n={} window={}; reflected moving average k={}",
        y.len(),
        window,
        k
    );
    reflected_moving_average(y, k)
}

/// Window length used for a curve of `len` samples at `strength`, or `None` when
/// smoothing is a no-op.
pub fn window_size(len: usize, strength: u8) -> Option<usize> {
    if len < 3 || strength == 0 {
        return None;
    }
    let n = len as f64;
    let frac = f64::from(strength.min(MAX_STRENGTH)) / 100.0;
    let target = (0.03 * n + 0.22 * frac * n).round() as usize;

    // Largest odd value not above the curve length.
    let upper = MAX_WINDOW.min(len - (1 - len % 2));
    let mut window = odd(MIN_WINDOW.max(target.min(upper)));
    if window >= len {
        window = odd(MIN_WINDOW.max(len - 1));
    }
    (window >= MIN_WINDOW).then_some(window)
}

/// Polynomial order for a window: capped at 3, floored at 2.
pub fn polynomial_order(window: usize) -> usize {
    3.min(2.max(window.saturating_sub(2)))
}

fn odd(n: usize) -> usize {
    let n = n.max(3);
    if n % 2 == 1 {
        n
    } else {
        n + 1
    }
}

/// Savitzky–Golay smoothing with polynomial interpolation at the edges.
///
/// Returns `None` when the window is even, wider than the signal, not wider than
/// the polynomial order, or when the least-squares system is singular.
pub fn savitzky_golay(y: &[f64], window: usize, order: usize) -> Option<Vec<f64>> {
    let n = y.len();
    if window % 2 == 0 || window > n || order >= window {
        return None;
    }
    let half = window / 2;

    let weights = central_weights(window, order)?;
    let mut out = vec![0.0; n];
    for i in half..n - half {
        out[i] = weights
            .iter()
            .zip(&y[i - half..=i + half])
            .map(|(w, v)| w * v)
            .sum();
    }

    // Edges: evaluate a polynomial fitted to the first/last full window.
    let positions = scaled_positions(window);
    let head = fit_polynomial(&positions, &y[..window], order)?;
    for (i, value) in out.iter_mut().enumerate().take(half) {
        *value = evaluate(&head, positions[i]);
    }
    let tail = fit_polynomial(&positions, &y[n - window..], order)?;
    for j in window - half..window {
        out[n - window + j] = evaluate(&tail, positions[j]);
    }

    Some(out)
}

/// Convolution weights that evaluate the least-squares polynomial at the window
/// centre.
fn central_weights(window: usize, order: usize) -> Option<Vec<f64>> {
    let design: Vec<Vec<f64>> = scaled_positions(window)
        .into_iter()
        .map(|t| (0..=order).map(|p| t.powi(p as i32)).collect())
        .collect();

    let mut unit = vec![0.0; order + 1];
    unit[0] = 1.0;
    let z = solve_linear(normal_matrix(&design, order), unit)?;

    Some(
        design
            .iter()
            .map(|row| row.iter().zip(&z).map(|(a, b)| a * b).sum())
            .collect(),
    )
}

/// Window offsets from the centre, scaled into `[-1, 1]` to keep the normal
/// equations well conditioned for wide windows.
fn scaled_positions(window: usize) -> Vec<f64> {
    let half = (window / 2).max(1) as f64;
    (0..window).map(|j| (j as f64 - half) / half).collect()
}

fn normal_matrix(design: &[Vec<f64>], order: usize) -> Vec<Vec<f64>> {
    let mut ata = vec![vec![0.0; order + 1]; order + 1];
    for row in design {
        for (r, &a) in row.iter().enumerate() {
            for (c, &b) in row.iter().enumerate() {
                ata[r][c] += a * b;
            }
        }
    }
    ata
}

/// Least-squares polynomial coefficients (constant term first).
fn fit_polynomial(xs: &[f64], ys: &[f64], order: usize) -> Option<Vec<f64>> {
    let design: Vec<Vec<f64>> = xs
        .iter()
        .map(|&t| (0..=order).map(|p| t.powi(p as i32)).collect())
        .collect();
    let mut aty = vec![0.0; order + 1];
    for (row, &v) in design.iter().zip(ys) {
        for (acc, &a) in aty.iter_mut().zip(row) {
            *acc += a * v;
        }
    }
    solve_linear(normal_matrix(&design, order), aty)
}

fn evaluate(coefficients: &[f64], t: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * t + c)
}

/// Gaussian elimination with partial pivoting.
fn solve_linear(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if !a[pivot][col].is_finite() || a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        let pivot_row = a[col].clone();
        let pivot_rhs = b[col];
        for row in col + 1..n {
            let factor = a[row][col] / pivot_row[col];
            for k in col..n {
                a[row][k] -= factor * pivot_row[k];
            }
            b[row] -= factor * pivot_rhs;
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

/// Centred moving average of width `k` over a signal reflected (without edge
/// repetition) at both boundaries.
pub fn reflected_moving_average(y: &[f64], k: usize) -> Vec<f64> {
    let n = y.len();
    if n < 2 || k < 2 {
        return y.to_vec();
    }
    let half = (k / 2) as isize;
    let scale = 1.0 / k as f64;
    (0..n as isize)
        .map(|i| {
            let sum: f64 = (i - half..i - half + k as isize)
                .map(|m| y[reflect_index(m, n)])
                .sum();
            sum * scale
        })
        .collect()
}

fn reflect_index(m: isize, n: usize) -> usize {
    let period = 2 * (n as isize - 1);
    let m = m.rem_euclid(period);
    if m >= n as isize {
        (period - m) as usize
    } else {
        m as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noisy_ramp(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| i as f64 * 2.0 + if i % 2 == 0 { 0.5 } else { -0.5 })
            .collect()
    }

    #[test]
    fn test_strength_zero_is_identity() {
        let y = noisy_ramp(40);
        assert_eq!(smooth_signal(&y, 0), y);
    }

    #[test]
    fn test_short_signal_is_identity() {
        let y = vec![1.0, 5.0];
        assert_eq!(smooth_signal(&y, 80), y);
    }

    #[test]
    fn test_window_size_bounds() {
        assert_eq!(window_size(50, 0), None);
        assert_eq!(window_size(2, 50), None);
        // 0.03 * 50 + 0.22 * 0.25 * 50 = 4.25 -> 4 -> floor 5
        assert_eq!(window_size(50, 25), Some(5));
        // 0.03 * 200 + 0.22 * 200 = 50 -> 51
        assert_eq!(window_size(200, 100), Some(51));
        // Capped at 101 for long curves
        assert_eq!(window_size(2000, 100), Some(101));
        for len in 3..300 {
            for strength in [1u8, 35, 100] {
                let w = window_size(len, strength).unwrap();
                assert_eq!(w % 2, 1);
                assert!(w >= MIN_WINDOW && w <= MAX_WINDOW);
            }
        }
    }

    #[test]
    fn test_polynomial_order() {
        assert_eq!(polynomial_order(5), 3);
        assert_eq!(polynomial_order(101), 3);
        assert_eq!(polynomial_order(4), 2);
    }

    #[test]
    fn test_savgol_preserves_cubic() {
        let y: Vec<f64> = (0..30)
            .map(|i| {
                let t = i as f64 * 0.1;
                1.0 + 2.0 * t - 0.5 * t * t + 0.1 * t * t * t
            })
            .collect();
        let smoothed = savitzky_golay(&y, 9, 3).unwrap();
        for (a, b) in y.iter().zip(&smoothed) {
            assert!((a - b).abs() < 1e-9, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_savgol_rejects_wide_window() {
        assert!(savitzky_golay(&[1.0, 2.0, 3.0], 5, 3).is_none());
        assert!(savitzky_golay(&[1.0; 10], 4, 2).is_none());
    }

    #[test]
    fn test_smoothing_reduces_alternating_noise() {
        let y = noisy_ramp(60);
        let smoothed = smooth_signal(&y, 60);
        assert_eq!(smoothed.len(), y.len());
        let roughness = |v: &[f64]| -> f64 {
            v.windows(3)
                .map(|w| (w[2] - 2.0 * w[1] + w[0]).abs())
                .sum()
        };
        assert!(roughness(&smoothed) < roughness(&y) / 4.0);
    }

    #[test]
    fn test_reflected_moving_average_constant() {
        let y = vec![3.0; 7];
        let out = reflected_moving_average(&y, 5);
        assert_eq!(out.len(), 7);
        for v in out {
            assert!((v - 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_reflected_moving_average_edges() {
        let y = vec![0.0, 1.0, 2.0, 3.0];
        let out = reflected_moving_average(&y, 5);
        // index 0 window: y2, y1, y0, y1, y2
        assert!((out[0] - 1.2).abs() < 1e-12);
        // index 3 window: y1, y2, y3, y2, y1
        assert!((out[3] - 1.8).abs() < 1e-12);
    }

    #[test]
    fn test_tiny_curve_falls_back_to_moving_average() {
        let y = vec![0.0, 1.0, 2.0, 3.0];
        assert_eq!(smooth_signal(&y, 50), reflected_moving_average(&y, 5));
    }

    #[test]
    fn test_reflect_index() {
        assert_eq!(reflect_index(-1, 5), 1);
        assert_eq!(reflect_index(-2, 5), 2);
        assert_eq!(reflect_index(5, 5), 3);
        assert_eq!(reflect_index(6, 5), 2);
        assert_eq!(reflect_index(2, 5), 2);
    }
}
