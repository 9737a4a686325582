use super::{mean_variance::MeanVariance, StreamingMetric};
use itertools::izip;
use ndarray::prelude::*;

/// `RegressionMetrics` computes common metrics for comparing predicted numbers with labels.
#[derive(Default)]
pub struct RegressionMetrics {
	labels: MeanVariance,
	absolute_error: f64,
	squared_error: f64,
}

pub struct RegressionMetricsInput<'a> {
	pub predictions: ArrayView1<'a, f64>,
	pub labels: ArrayView1<'a, f64>,
}

#[derive(Debug, PartialEq)]
pub struct RegressionMetricsOutput {
	/// The mean squared error.
	pub mse: f64,
	/// The root mean squared error.
	pub rmse: f64,
	/// The mean absolute error.
	pub mae: f64,
	/// The coefficient of determination. It is NaN when the labels have zero variance.
	pub r2: f64,
	/// The mean squared error of always predicting the mean of the labels, which is the variance of the labels.
	pub baseline_mse: f64,
	pub baseline_rmse: f64,
}

impl RegressionMetrics {
	pub fn new() -> Self {
		Self::default()
	}
}

impl<'a> StreamingMetric<'a> for RegressionMetrics {
	type Input = RegressionMetricsInput<'a>;
	type Output = Option<RegressionMetricsOutput>;

	fn update(&mut self, input: RegressionMetricsInput<'a>) {
		for (prediction, label) in izip!(input.predictions.iter(), input.labels.iter()) {
			self.labels.update(*label);
			let error = prediction - label;
			self.absolute_error += error.abs();
			self.squared_error += error * error;
		}
	}

	fn merge(&mut self, other: Self) {
		self.labels.merge(other.labels);
		self.absolute_error += other.absolute_error;
		self.squared_error += other.squared_error;
	}

	fn finalize(self) -> Option<RegressionMetricsOutput> {
		let labels = self.labels.finalize()?;
		let n = labels.n as f64;
		let variance = labels.variance();
		let mse = self.squared_error / n;
		Some(RegressionMetricsOutput {
			mse,
			rmse: mse.sqrt(),
			mae: self.absolute_error / n,
			r2: 1.0 - self.squared_error / (variance * n),
			baseline_mse: variance,
			baseline_rmse: variance.sqrt(),
		})
	}
}

#[test]
fn test_regression_metrics() {
	let predictions = arr1(&[15.0, 15.0, 35.0, 35.0]);
	let labels = arr1(&[10.0, 20.0, 30.0, 40.0]);
	let mut metrics = RegressionMetrics::new();
	metrics.update(RegressionMetricsInput {
		predictions: predictions.view(),
		labels: labels.view(),
	});
	let metrics = metrics.finalize().unwrap();
	assert!((metrics.mse - 25.0).abs() < 1e-9);
	assert!((metrics.rmse - 5.0).abs() < 1e-9);
	assert!((metrics.mae - 5.0).abs() < 1e-9);
	assert!((metrics.r2 - 0.8).abs() < 1e-9);
	assert!((metrics.baseline_mse - 125.0).abs() < 1e-9);
}

#[test]
fn test_regression_metrics_empty() {
	assert_eq!(RegressionMetrics::new().finalize(), None);
}
