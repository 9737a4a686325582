/*!
This crate defines the [`Metric`](trait.Metric.html) and [`StreamingMetric`](trait.StreamingMetric.html) traits and a number of concrete types that implement them. The impurity measures used to score decision tree splits, [`Entropy`](struct.Entropy.html) and [`MeanVariance`](struct.MeanVariance.html), live here alongside the metrics used to report how well a trained tree fits its training data, such as [`Accuracy`](struct.Accuracy.html) and [`RegressionMetrics`](struct.RegressionMetrics.html).
*/

#![allow(clippy::tabs_in_doc_comments)]

mod accuracy;
mod entropy;
mod mean;
mod mean_variance;
mod mode;
mod regression;

pub use self::accuracy::Accuracy;
pub use self::entropy::Entropy;
pub use self::mean::Mean;
pub use self::mean_variance::{merge_mean_m2, MeanVariance, MeanVarianceOutput};
pub use self::mode::Mode;
pub use self::regression::{RegressionMetrics, RegressionMetricsInput, RegressionMetricsOutput};

/**
The `Metric` trait defines a common interface to metrics that can be computed when the entire input is available at once.

The seemingly unused generic lifetime `'a` exists here to allow `Input`s and `Output`s to borrow from their enclosing scope.
*/
pub trait Metric<'a> {
	type Input;
	type Output;
	fn compute(input: Self::Input) -> Self::Output;
}

/**
The `StreamingMetric` trait defines a common interface to metrics that can be computed in a streaming manner, where the input is available in chunks, such as the mean and variance of a target column.

After being initialized, a value of type `T` implementing the `StreamingMetric` trait can have `update()` called on it with values of the associated type `Input`. Multiple values of `T` can be merged together by calling `merge()`. When finished aggregating, you can call `finalize()` on the metric to produce the associated type `Output`.

# Examples

Here is a basic example implementation of a `Max` metric, which takes `f64`s as input and produces an `f64` as output that is the maximum of all the inputs.

```
use sapling_metrics::StreamingMetric;

struct Max(f64);

impl StreamingMetric<'_> for Max {
	type Input = f64;
	type Output = f64;
	fn update(&mut self, input: Self::Input) {
		self.0 = self.0.max(input)
	}
	fn merge(&mut self, other: Self) { self.0 = self.0.max(other.0) }
	fn finalize(self) -> Self::Output { self.0 }
}

let mut max = Max(std::f64::NEG_INFINITY);
max.update(2.0);
max.update(7.0);
assert_eq!(max.finalize(), 7.0);
```
*/
pub trait StreamingMetric<'a> {
	/// `Input` is the type to aggregate in calls to `update()`.
	type Input;
	/// `Output` is the return type of `finalize()`.
	type Output;
	/// Update this streaming metric with the `Input` `input`.
	fn update(&mut self, input: Self::Input);
	/// Merge multiple independently computed streaming metrics.
	fn merge(&mut self, other: Self);
	/// When you are done aggregating `Input`s, call `finalize()` to produce an `Output`.
	fn finalize(self) -> Self::Output;
}
