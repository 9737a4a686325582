//! https://en.wikipedia.org/wiki/Algorithms_for_calculating_variance#Parallel_algorithm

use super::StreamingMetric;

/// Combine two separately computed means and sums of squared deviations (m2) into a single mean and m2. This is what lets `MeanVariance` be updated one value at a time and merged across partitions.
pub fn merge_mean_m2(
	n_a: u64,
	mean_a: f64,
	m2_a: f64,
	n_b: u64,
	mean_b: f64,
	m2_b: f64,
) -> (f64, f64) {
	let n_a = n_a as f64;
	let n_b = n_b as f64;
	(
		(((n_a * mean_a) + (n_b * mean_b)) / (n_a + n_b)),
		m2_a + m2_b + (mean_b - mean_a) * (mean_b - mean_a) * (n_a * n_b / (n_a + n_b)),
	)
}

/// The population variance is the mean squared deviation from the mean.
fn m2_to_variance(m2: f64, n: u64) -> f64 {
	m2 / n as f64
}

/// `MeanVariance` computes the mean and population variance of a stream of values.
#[derive(Clone, Debug, Default)]
pub struct MeanVariance(Option<MeanVarianceOutput>);

#[derive(Clone, Debug, PartialEq)]
pub struct MeanVarianceOutput {
	pub n: u64,
	pub mean: f64,
	pub m2: f64,
}

impl MeanVarianceOutput {
	pub fn variance(&self) -> f64 {
		m2_to_variance(self.m2, self.n)
	}
}

impl MeanVariance {
	pub fn new() -> Self {
		Self::default()
	}
}

impl StreamingMetric<'_> for MeanVariance {
	type Input = f64;
	type Output = Option<MeanVarianceOutput>;

	fn update(&mut self, value: f64) {
		self.merge(MeanVariance(Some(MeanVarianceOutput {
			n: 1,
			mean: value,
			m2: 0.0,
		})))
	}

	fn merge(&mut self, other: Self) {
		match (&mut self.0, other.0) {
			(Some(this), Some(other)) => {
				let (mean, m2) =
					merge_mean_m2(this.n, this.mean, this.m2, other.n, other.mean, other.m2);
				this.n += other.n;
				this.mean = mean;
				this.m2 = m2;
			}
			(None, other) => self.0 = other,
			(Some(_), None) => {}
		}
	}

	fn finalize(self) -> Option<MeanVarianceOutput> {
		self.0
	}
}

#[test]
fn test_mean_variance() {
	let mut mean_variance = MeanVariance::new();
	for value in [10.0, 20.0, 30.0, 40.0].iter() {
		mean_variance.update(*value);
	}
	let output = mean_variance.finalize().unwrap();
	assert_eq!(output.n, 4);
	assert!((output.mean - 25.0).abs() < 1e-9);
	assert!((output.variance() - 125.0).abs() < 1e-9);
}

#[test]
fn test_mean_variance_constant_and_empty() {
	let mut mean_variance = MeanVariance::new();
	mean_variance.update(3.0);
	mean_variance.update(3.0);
	assert_eq!(mean_variance.finalize().unwrap().variance(), 0.0);
	assert_eq!(MeanVariance::new().finalize(), None);
}

#[test]
fn test_merge() {
	let mut a = MeanVariance::new();
	a.update(1.0);
	a.update(2.0);
	let mut b = MeanVariance::new();
	b.update(3.0);
	b.update(4.0);
	a.merge(b);
	let output = a.finalize().unwrap();
	assert!((output.mean - 2.5).abs() < 1e-12);
	assert!((output.variance() - 1.25).abs() < 1e-12);
}
