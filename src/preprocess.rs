//! Preprocessor pipeline applied to spectrum channels during load.
//!
//! A preprocessor is a pure function from one real matrix to another of
//! the same shape. The built-ins below cover every transform named in
//! §4.5; [`Preprocessor::Composite`] folds several of them into one.

use log::warn;

use crate::Float;

/// A transform applied to a spectrum channel.
///
/// Implemented as a trait so a caller can plug in a custom transform
/// beyond the built-in [`Preprocessor`] enum, the way the source's
/// `SignalProcessor` is an abstract base class subclasses override.
pub trait Preprocess {
    /// Apply the transform to `signal`, returning a new vector of the
    /// same length. Implementations must be pure: same input, same
    /// output, no side effects.
    fn apply(&self, signal: &[Float]) -> Vec<Float>;
}

/// The built-in preprocessors named in §4.5.
#[derive(Debug, Clone)]
pub enum Preprocessor {
    /// Returns the input unchanged (or a copy of it, if `copy` is set).
    Identity {
        /// Whether to allocate a fresh copy rather than conceptually
        /// reusing the input. Since [`Preprocess::apply`] always returns
        /// an owned `Vec`, this only matters in the sense of documenting
        /// intent; behaviorally both paths produce an equal vector.
        copy: bool,
    },
    /// Elementwise absolute value.
    Abs,
    /// `max(x, 0)` elementwise.
    Rectifier,
    /// Affine rescale so the minimum maps to 0 and the maximum to 1.
    Normalize,
    /// `10*log10(x / impedance) - reference`, assuming `x` is in volts².
    GainCalculator {
        /// Reference level subtracted from the result, in dB.
        reference: Float,
        /// RF front-end impedance used to convert volts² to watts.
        impedance: Float,
    },
    /// Applies each stage in order.
    Composite(Vec<Preprocessor>),
}

impl Preprocessor {
    /// `GainCalculator` with the documented defaults (`reference=0`,
    /// `impedance=50`).
    #[must_use]
    pub fn gain_calculator_default() -> Self {
        Preprocessor::GainCalculator {
            reference: 0.0,
            impedance: 50.0,
        }
    }
}

impl Default for Preprocessor {
    /// The default when no preprocessor is supplied: `Identity` without
    /// a copy.
    fn default() -> Self {
        Preprocessor::Identity { copy: false }
    }
}

impl Preprocess for Preprocessor {
    fn apply(&self, signal: &[Float]) -> Vec<Float> {
        match self {
            Preprocessor::Identity { .. } => signal.to_vec(),
            Preprocessor::Abs => signal.iter().map(|x| x.abs()).collect(),
            Preprocessor::Rectifier => signal.iter().map(|&x| x.max(0.0)).collect(),
            Preprocessor::Normalize => normalize(signal),
            Preprocessor::GainCalculator { reference, impedance } => {
                signal.iter().map(|&x| 10.0 * (x / impedance).log10() - reference).collect()
            }
            Preprocessor::Composite(stages) => {
                let mut out = signal.to_vec();
                for stage in stages {
                    out = stage.apply(&out);
                }
                out
            }
        }
    }
}

/// Affine rescale so `min -> 0`, `max -> 1`. On constant input (where
/// `max == min`) this returns an all-zero vector rather than dividing by
/// zero, per the documented, non-panicking choice in §4.5.
fn normalize(signal: &[Float]) -> Vec<Float> {
    if signal.is_empty() {
        return Vec::new();
    }
    let min = signal.iter().copied().fold(Float::INFINITY, Float::min);
    let max = signal.iter().copied().fold(Float::NEG_INFINITY, Float::max);
    let span = max - min;
    if span == 0.0 {
        warn!("preprocess: Normalize called on constant input, returning zeros");
        return vec![0.0; signal.len()];
    }
    signal.iter().map(|&x| (x - min) / span).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::assert_almost_equal_f32;

    #[test]
    fn identity_is_a_no_op() {
        let p = Preprocessor::default();
        let input = vec![1.0, -2.0, 3.5];
        assert_almost_equal_f32(&p.apply(&input), &input);
    }

    #[test]
    fn abs_takes_absolute_value() {
        let p = Preprocessor::Abs;
        assert_almost_equal_f32(&p.apply(&[-1.0, 2.0, -3.0]), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn rectifier_clips_negatives() {
        let p = Preprocessor::Rectifier;
        assert_almost_equal_f32(&p.apply(&[-1.0, 0.0, 3.0]), &[0.0, 0.0, 3.0]);
    }

    #[test]
    fn normalize_maps_min_and_max() {
        let p = Preprocessor::Normalize;
        assert_almost_equal_f32(&p.apply(&[2.0, 4.0, 6.0]), &[0.0, 0.5, 1.0]);
    }

    #[test]
    fn normalize_constant_input_returns_zeros() {
        let p = Preprocessor::Normalize;
        assert_almost_equal_f32(&p.apply(&[5.0, 5.0, 5.0]), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn gain_calculator_applies_defaults() {
        let p = Preprocessor::gain_calculator_default();
        let out = p.apply(&[50.0]);
        // 10*log10(50/50) - 0 == 0
        assert_almost_equal_f32(&out, &[0.0]);
    }

    #[test]
    fn composite_associativity() {
        let a = Preprocessor::Abs;
        let b = Preprocessor::Rectifier;
        let c = Preprocessor::gain_calculator_default();
        let left = Preprocessor::Composite(vec![Preprocessor::Composite(vec![a.clone(), b.clone()]), c.clone()]);
        let right = Preprocessor::Composite(vec![a, Preprocessor::Composite(vec![b, c])]);
        let input = vec![-10.0, 25.0, -0.5, 100.0];
        assert_almost_equal_f32(&left.apply(&input), &right.apply(&input));
    }
}
