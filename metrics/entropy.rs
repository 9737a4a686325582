use super::Metric;

/**
The entropy of a set of class labels, in bits, computed from the number of labels in each class:

`entropy = -Σ p_c * log2(p_c)` where `p_c = count_c / total`.

Classes with a count of zero contribute nothing. The entropy of an empty set or of a set where every label belongs to one class is zero.
*/
pub struct Entropy;

impl<'a> Metric<'a> for Entropy {
	type Input = &'a [usize];
	type Output = f64;

	fn compute(class_counts: &'a [usize]) -> f64 {
		let total: usize = class_counts.iter().sum();
		if total == 0 {
			return 0.0;
		}
		let total = total as f64;
		let entropy: f64 = class_counts
			.iter()
			.filter(|count| **count > 0)
			.map(|count| {
				let probability = *count as f64 / total;
				probability * probability.log2()
			})
			.sum();
		// Avoid returning negative zero for pure sets.
		0.0 - entropy
	}
}

#[test]
fn test_entropy() {
	assert_eq!(Entropy::compute(&[]), 0.0);
	assert_eq!(Entropy::compute(&[0, 0]), 0.0);
	assert_eq!(Entropy::compute(&[7]), 0.0);
	assert_eq!(Entropy::compute(&[7, 0]), 0.0);
	assert!((Entropy::compute(&[2, 2]) - 1.0).abs() < 1e-12);
	assert!((Entropy::compute(&[1, 1, 1, 1]) - 2.0).abs() < 1e-12);
	let entropy = Entropy::compute(&[3, 1]);
	assert!(entropy > 0.0 && entropy < 1.0);
}
