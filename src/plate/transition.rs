/// Before/after fluorescence of a curve change, for interpolated display.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Temperatures shared by both states
    pub temperatures: Vec<f64>,
    /// Fluorescence before the change
    pub from: Vec<f64>,
    /// Fluorescence after the change
    pub to: Vec<f64>,
}

impl Transition {
    /// Build a transition; `None` unless all three arrays have the same length.
    pub fn new(temperatures: Vec<f64>, from: Vec<f64>, to: Vec<f64>) -> Option<Self> {
        (temperatures.len() == from.len() && from.len() == to.len()).then_some(Self {
            temperatures,
            from,
            to,
        })
    }

    /// Linear interpolation between the two states; `fraction` is clamped to
    /// `[0, 1]`.
    pub fn frame(&self, fraction: f64) -> Vec<f64> {
        let alpha = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
        self.from
            .iter()
            .zip(&self.to)
            .map(|(a, b)| a * (1.0 - alpha) + b * alpha)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_interpolation() {
        let t = Transition::new(vec![1.0, 2.0], vec![0.0, 10.0], vec![10.0, 0.0]).unwrap();
        assert_eq!(t.frame(0.0), vec![0.0, 10.0]);
        assert_eq!(t.frame(1.0), vec![10.0, 0.0]);
        assert_eq!(t.frame(0.5), vec![5.0, 5.0]);
        assert_eq!(t.frame(2.0), t.frame(1.0));
    }

    #[test]
    fn test_length_mismatch() {
        assert!(Transition::new(vec![1.0, 2.0], vec![0.0], vec![1.0]).is_none());
    }
}
