//! Random sampling into freshly allocated tensors
//!
//! A [`Generator`] owns its RNG state; nothing here touches a global
//! generator. Elements are drawn in row-major order, so the same seed and
//! shape always produce the same tensor.

use num_traits::{Float, NumCast};
use rand::distributions::uniform::SampleUniform;
use rand::distributions::{Bernoulli, Distribution, Standard, Uniform};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::array::{NdArray, NdArrayMut};
use crate::error::{Result, TensorError};
use crate::shape::{Order, Shape};
use crate::tensor::Tensor;

/// Source of random tensors
#[derive(Debug, Clone)]
pub struct Generator {
    rng: StdRng,
}

impl Generator {
    /// Reproducible generator
    pub fn seeded(seed: u64) -> Self {
        debug!(seed, "seeding generator");
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generator seeded from the operating system
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Samples from the standard distribution of `T`: `[0, 1)` for floats,
    /// the full range for integers, fair coins for `bool`
    pub fn random<T, const N: usize>(&mut self, shape: impl Into<Shape<N>>) -> Result<Tensor<T, N>>
    where
        Standard: Distribution<T>,
    {
        Tensor::from_fn(shape, |_| self.rng.gen())
    }

    fn sample_range<T, const N: usize>(
        &mut self,
        shape: Shape<N>,
        low: T,
        high: T,
        operation: &str,
    ) -> Result<Tensor<T, N>>
    where
        T: SampleUniform + PartialOrd,
    {
        if !(low < high) {
            return Err(TensorError::invalid_argument(
                "EMPTY_SAMPLE_RANGE",
                "low must be less than high",
                operation,
                "Pass a non-empty half-open range [low, high)",
            ));
        }
        let between = Uniform::new(low, high);
        Tensor::from_fn(shape, |_| between.sample(&mut self.rng))
    }

    /// Uniform floats in `[low, high)`
    pub fn uniform<T, const N: usize>(&mut self, shape: impl Into<Shape<N>>, low: T, high: T) -> Result<Tensor<T, N>>
    where
        T: Float + SampleUniform,
    {
        self.sample_range(shape.into(), low, high, "uniform")
    }

    /// Uniform integers in `[low, high)`
    pub fn integers<T, const N: usize>(&mut self, shape: impl Into<Shape<N>>, low: T, high: T) -> Result<Tensor<T, N>>
    where
        T: SampleUniform + PartialOrd + num_traits::PrimInt,
    {
        self.sample_range(shape.into(), low, high, "integers")
    }

    /// Normal samples with the given mean and standard deviation `scale`, drawn with
    /// the Box-Muller transform
    pub fn normal<T, const N: usize>(&mut self, shape: impl Into<Shape<N>>, mean: T, scale: T) -> Result<Tensor<T, N>>
    where
        T: Float,
    {
        if scale < T::zero() {
            return Err(TensorError::invalid_argument(
                "NEGATIVE_SCALE",
                "scale < 0",
                "normal",
                "The standard deviation must be non-negative",
            ));
        }
        let rng = &mut self.rng;
        let mut spare: Option<f64> = None;
        Tensor::from_fn(shape, |_| {
            let z = match spare.take() {
                Some(z) => z,
                None => {
                    let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
                    let u2: f64 = rng.gen();
                    let radius = (-2.0 * u1.ln()).sqrt();
                    let theta = 2.0 * std::f64::consts::PI * u2;
                    spare = Some(radius * theta.sin());
                    radius * theta.cos()
                }
            };
            mean + scale * <T as NumCast>::from(z).unwrap_or_else(T::nan)
        })
    }

    /// Standard normal samples
    pub fn standard_normal<T: Float, const N: usize>(&mut self, shape: impl Into<Shape<N>>) -> Result<Tensor<T, N>> {
        self.normal(shape, T::zero(), T::one())
    }

    /// Independent trials that are `true` with probability `p`
    pub fn bernoulli<const N: usize>(&mut self, shape: impl Into<Shape<N>>, p: f64) -> Result<Tensor<bool, N>> {
        let trial = Bernoulli::new(p).map_err(|_| {
            TensorError::invalid_argument(
                "INVALID_PROBABILITY",
                format!("probability {} is outside [0, 1]", p),
                "bernoulli",
                "Pass a probability between 0 and 1",
            )
        })?;
        Tensor::from_fn(shape, |_| trial.sample(&mut self.rng))
    }

    /// Draws `size` elements of `a`, with or without replacement
    pub fn choice<T, A>(&mut self, a: &A, size: usize, replace: bool) -> Result<Tensor<T, 1>>
    where
        A: NdArray<1, Elem = T> + ?Sized,
        T: Clone,
    {
        let n = a.size();
        if n == 0 && size > 0 {
            return Err(TensorError::invalid_argument(
                "CHOICE_EMPTY_POPULATION",
                "a cannot be empty unless no samples are taken",
                "choice",
                "Sample from a non-empty array",
            ));
        }
        if !replace && size > n {
            return Err(TensorError::invalid_argument(
                "CHOICE_SAMPLE_TOO_LARGE",
                format!("cannot take a larger sample ({}) than population ({}) without replacement", size, n),
                "choice",
                "Reduce the sample size or sample with replacement",
            ));
        }
        let picks = if replace {
            Tensor::from_fn([size], |_| self.rng.gen_range(0..n))?
        } else {
            Tensor::from_vec([size], sample(&mut self.rng, n, size).into_vec())?
        };
        a.take_flat(&picks)
    }

    /// Shuffles a rank-1 array in place; views and selections shuffle the
    /// elements they map to
    pub fn shuffle<A>(&mut self, a: &mut A)
    where
        A: NdArrayMut<1> + ?Sized,
    {
        let (data, mapping) = a.parts_mut();
        let offsets: Vec<usize> = mapping.offsets(Order::RowMajor).collect();
        for i in (1..offsets.len()).rev() {
            let j = self.rng.gen_range(0..=i);
            data.swap(offsets[i], offsets[j]);
        }
    }

    /// A random ordering of `0..n`
    pub fn permutation(&mut self, n: usize) -> Result<Tensor<usize, 1>> {
        let mut order = Tensor::from_fn([n], |index| index[0])?;
        self.shuffle(&mut order);
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::StridedArrayMut;
    use crate::error::ErrorKind;
    use crate::ops::{Mean, StdDev};
    use approx::assert_relative_eq;

    #[test]
    fn test_seeded_is_reproducible() {
        let a: Tensor<f64, 2> = Generator::seeded(7).random([3, 4]).unwrap();
        let b: Tensor<f64, 2> = Generator::seeded(7).random([3, 4]).unwrap();
        assert_eq!(a, b);
        assert!(a.as_slice().iter().all(|&x| (0.0..1.0).contains(&x)));
    }

    #[test]
    fn test_ranges() {
        let mut rng = Generator::seeded(1);
        let u = rng.uniform([1000], -2.0f32, 3.0).unwrap();
        assert!(u.as_slice().iter().all(|&x| (-2.0..3.0).contains(&x)));
        let k = rng.integers([1000], 5i64, 8).unwrap();
        assert!(k.as_slice().iter().all(|&x| (5..8).contains(&x)));
        let err = rng.integers([3], 4i32, 4).unwrap_err();
        assert_eq!(err.code(), "EMPTY_SAMPLE_RANGE");
    }

    #[test]
    fn test_normal_moments() {
        let mut rng = Generator::seeded(42);
        let x = rng.normal([20_000], 3.0f64, 2.0).unwrap();
        assert_relative_eq!(Mean::reduce_all(&x), 3.0, epsilon = 0.1);
        assert_relative_eq!(StdDev::reduce_all(&x, 0), 2.0, epsilon = 0.1);
        assert_eq!(rng.normal([2], 0.0f64, -1.0).unwrap_err().kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_bernoulli_extremes() {
        let mut rng = Generator::seeded(3);
        assert!(rng.bernoulli([50], 0.0).unwrap().as_slice().iter().all(|&b| !b));
        assert!(rng.bernoulli([50], 1.0).unwrap().as_slice().iter().all(|&b| b));
        assert!(rng.bernoulli([1], 1.5).is_err());
    }

    #[test]
    fn test_choice_without_replacement_is_distinct() {
        let mut rng = Generator::seeded(11);
        let population = Tensor::from_vec([6], vec![10, 20, 30, 40, 50, 60]).unwrap();
        let mut picked = rng.choice(&population, 6, false).unwrap().into_vec();
        picked.sort_unstable();
        assert_eq!(picked, vec![10, 20, 30, 40, 50, 60]);
        assert!(rng.choice(&population, 7, false).is_err());
        assert_eq!(rng.choice(&population, 20, true).unwrap().size(), 20);
    }

    #[test]
    fn test_shuffle_through_view_keeps_elements() {
        let mut rng = Generator::seeded(5);
        let mut t = Tensor::from_fn([2, 5], |i| i[0] * 5 + i[1]).unwrap();
        let mut row = t.slice_mut::<1>(&[crate::slice::IndexArg::At(1)]).unwrap();
        rng.shuffle(&mut row);
        assert_eq!(&t.as_slice()[..5], &[0, 1, 2, 3, 4]);
        let mut second = t.as_slice()[5..].to_vec();
        second.sort_unstable();
        assert_eq!(second, vec![5, 6, 7, 8, 9]);

        let mut p = rng.permutation(8).unwrap().into_vec();
        p.sort_unstable();
        assert_eq!(p, (0..8).collect::<Vec<_>>());
    }
}
