use super::StreamingMetric;

/// The arithmetic mean of a stream of values. The output is `None` if no values were seen.
#[derive(Clone, Debug, Default)]
pub struct Mean {
	n: u64,
	mean: f64,
}

impl Mean {
	pub fn new() -> Self {
		Self::default()
	}
}

impl StreamingMetric<'_> for Mean {
	type Input = f64;
	type Output = Option<f64>;

	fn update(&mut self, value: f64) {
		self.n += 1;
		self.mean += (value - self.mean) / self.n as f64;
	}

	fn merge(&mut self, other: Self) {
		let n = self.n + other.n;
		if n == 0 {
			return;
		}
		self.mean = (self.mean * self.n as f64 + other.mean * other.n as f64) / n as f64;
		self.n = n;
	}

	fn finalize(self) -> Option<f64> {
		if self.n == 0 {
			None
		} else {
			Some(self.mean)
		}
	}
}

#[test]
fn test_mean() {
	let mut a = Mean::new();
	a.update(1.0);
	a.update(2.0);
	let mut b = Mean::new();
	b.update(6.0);
	a.merge(b);
	a.merge(Mean::new());
	assert!((a.finalize().unwrap() - 3.0).abs() < 1e-12);
	assert_eq!(Mean::new().finalize(), None);
}
