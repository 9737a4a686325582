use super::{mean::Mean, StreamingMetric};

/// The accuracy is the proportion of examples where predicted == label. Inputs are `(predicted, label)` pairs of class indexes.
#[derive(Default)]
pub struct Accuracy(Mean);

impl Accuracy {
	pub fn new() -> Self {
		Self::default()
	}
}

impl StreamingMetric<'_> for Accuracy {
	type Input = (usize, usize);
	type Output = Option<f64>;

	fn update(&mut self, value: Self::Input) {
		self.0.update(if value.0 == value.1 { 1.0 } else { 0.0 })
	}

	fn merge(&mut self, other: Self) {
		self.0.merge(other.0)
	}

	fn finalize(self) -> Option<f64> {
		self.0.finalize()
	}
}

#[test]
fn test_accuracy() {
	let mut accuracy = Accuracy::new();
	for pair in [(0, 0), (1, 1), (1, 0), (2, 2)].iter() {
		accuracy.update(*pair);
	}
	assert!((accuracy.finalize().unwrap() - 0.75).abs() < 1e-12);
	assert_eq!(Accuracy::new().finalize(), None);
}
