use crate::{split::Labels, LeafValue};
use sapling_metrics::{Mean, Metric, Mode, StreamingMetric};

/// Summarize the examples that reach a leaf into the leaf's prediction.
pub(crate) fn summarize_leaf(labels: &Labels, examples: &[usize]) -> LeafValue {
	match labels {
		Labels::Classification {
			classes,
			class_indexes,
		} => {
			// Counts are kept in the order classes first appear among the examples, so ties go to the first one seen.
			let mut encountered_classes: Vec<usize> = Vec::new();
			let mut counts: Vec<usize> = Vec::new();
			let mut position_for_class: Vec<Option<usize>> = vec![None; classes.len()];
			for class_index in examples.iter().filter_map(|example| class_indexes[*example]) {
				match position_for_class[class_index] {
					Some(position) => counts[position] += 1,
					None => {
						position_for_class[class_index] = Some(counts.len());
						encountered_classes.push(class_index);
						counts.push(1);
					}
				}
			}
			match Mode::compute(&counts) {
				Some(position) => LeafValue::Classification {
					class: classes[encountered_classes[position]].clone(),
					confidence: confidence(counts[position], examples.len()),
				},
				None => LeafValue::Classification {
					class: sapling_dataframe::Value::Missing,
					confidence: 0.0,
				},
			}
		}
		Labels::Regression { values } => {
			let mut mean = Mean::new();
			let mut valid_count = 0;
			for value in examples.iter().filter_map(|example| values[*example]) {
				mean.update(value);
				valid_count += 1;
			}
			LeafValue::Regression {
				mean: mean.finalize(),
				valid_count,
			}
		}
	}
}

/// The percentage of `n_examples` that `count` represents, rounded to one decimal place.
fn confidence(count: usize, n_examples: usize) -> f64 {
	if n_examples == 0 {
		return 0.0;
	}
	let percent = 100.0 * count as f64 / n_examples as f64;
	(percent * 10.0).round() / 10.0
}

#[cfg(test)]
use crate::ProblemType;
#[cfg(test)]
use sapling_dataframe::{Dataset, Value};

#[test]
fn test_classification_leaf() {
	let dataset = Dataset::from_records(
		vec!["B", "A", "A", "B", "B", "C"]
			.into_iter()
			.map(|class| vec![("y", Value::from(class))]),
	);
	let (labels, examples) = Labels::compute(&dataset, 0, ProblemType::Classification);
	assert_eq!(
		summarize_leaf(&labels, &examples),
		LeafValue::Classification {
			class: Value::from("B"),
			confidence: 50.0,
		}
	);
	assert_eq!(
		summarize_leaf(&labels, &[0, 1, 2]),
		LeafValue::Classification {
			class: Value::from("A"),
			confidence: 66.7,
		}
	);
}

#[test]
fn test_classification_leaf_ties_go_to_the_first_class() {
	let dataset = Dataset::from_records(
		vec!["A", "B", "B", "A"]
			.into_iter()
			.map(|class| vec![("y", Value::from(class))]),
	);
	let (labels, examples) = Labels::compute(&dataset, 0, ProblemType::Classification);
	assert_eq!(
		summarize_leaf(&labels, &examples),
		LeafValue::Classification {
			class: Value::from("A"),
			confidence: 50.0,
		}
	);
	assert_eq!(
		summarize_leaf(&labels, &[1, 3]),
		LeafValue::Classification {
			class: Value::from("B"),
			confidence: 50.0,
		}
	);
}

#[test]
fn test_regression_leaf_counts_every_example() {
	let dataset = Dataset::from_records(vec![
		vec![("y", Value::Number(2.0))],
		vec![("y", Value::from("n/a"))],
		vec![("y", Value::Number(4.0))],
	]);
	let (labels, examples) = Labels::compute(&dataset, 0, ProblemType::Regression);
	assert_eq!(examples.len(), 3);
	assert_eq!(
		summarize_leaf(&labels, &examples),
		LeafValue::Regression {
			mean: Some(3.0),
			valid_count: 2,
		}
	);
	assert_eq!(
		summarize_leaf(&labels, &[1]),
		LeafValue::Regression {
			mean: None,
			valid_count: 0,
		}
	);
}
