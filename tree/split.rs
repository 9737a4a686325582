use crate::{
	BranchSplit, CategoricalSplit, ColumnRole, FeatureProfile, NumericalSplit, ProblemType,
	SplitDirection,
};
use rayon::prelude::*;
use sapling_dataframe::{Dataset, Value};
use sapling_metrics::{Entropy, MeanVariance, Metric, StreamingMetric};
use sapling_util::finite::{median, Finite};
use std::collections::{HashMap, HashSet};

/// The target column, encoded once per training run so impurities can be computed from example indexes alone. Both variants are indexed by the row index in the dataset.
#[derive(Debug)]
pub(crate) enum Labels {
	Classification {
		/// These are the distinct classes in the order they first appear in the dataset.
		classes: Vec<Value>,
		/// This is the index into `classes` for each row, or `None` if the row's target is missing.
		class_indexes: Vec<Option<usize>>,
	},
	Regression {
		/// This is the target for each row, or `None` if it is not a finite number.
		values: Vec<Option<f64>>,
	},
}

impl Labels {
	/// Encode the target column. This returns the labels and the indexes of the rows whose target is present. Rows with a missing target are left out of training.
	pub fn compute(
		dataset: &Dataset,
		target_column_index: usize,
		problem_type: ProblemType,
	) -> (Labels, Vec<usize>) {
		let examples: Vec<usize> = dataset
			.column(target_column_index)
			.enumerate()
			.filter(|(_, value)| !value.is_missing())
			.map(|(row_index, _)| row_index)
			.collect();
		let labels = match problem_type {
			ProblemType::Classification => {
				let mut classes = Vec::new();
				let mut class_index_for_category: HashMap<String, usize> = HashMap::new();
				let class_indexes = dataset
					.column(target_column_index)
					.map(|value| {
						let category = value.as_category()?;
						let next_class_index = classes.len();
						let class_index = *class_index_for_category
							.entry(category.into_owned())
							.or_insert(next_class_index);
						if class_index == next_class_index {
							classes.push(value.clone());
						}
						Some(class_index)
					})
					.collect();
				Labels::Classification {
					classes,
					class_indexes,
				}
			}
			ProblemType::Regression => Labels::Regression {
				values: dataset
					.column(target_column_index)
					.map(|value| value.as_number())
					.collect(),
			},
		};
		(labels, examples)
	}

	/// Compute the impurity of the examples: the entropy of their classes in bits for classification, and the variance of their numeric targets for regression. Examples whose target is unusable are skipped.
	pub fn impurity(&self, examples: &[usize]) -> f64 {
		match self {
			Labels::Classification {
				classes,
				class_indexes,
			} => {
				let mut class_counts = vec![0; classes.len()];
				for class_index in examples.iter().filter_map(|example| class_indexes[*example]) {
					class_counts[class_index] += 1;
				}
				Entropy::compute(&class_counts)
			}
			Labels::Regression { values } => {
				let mut mean_variance = MeanVariance::new();
				for value in examples.iter().filter_map(|example| values[*example]) {
					mean_variance.update(value);
				}
				mean_variance
					.finalize()
					.map(|output| output.variance())
					.unwrap_or(0.0)
			}
		}
	}
}

/// The `SplitEvaluator` scores partitions of the examples in one node.
pub(crate) struct SplitEvaluator<'a> {
	labels: &'a Labels,
	parent_impurity: f64,
	n_examples: usize,
}

impl<'a> SplitEvaluator<'a> {
	pub fn new(labels: &'a Labels, examples: &[usize]) -> Self {
		Self {
			labels,
			parent_impurity: labels.impurity(examples),
			n_examples: examples.len(),
		}
	}

	/**
	Compute the gain of splitting the node's examples into `left` and `right`:

	`gain = impurity(parent) - Σ (|child| / |parent|) * impurity(child)`

	A partition with an empty side has no gain and returns `None`.
	*/
	pub fn gain(&self, left: &[usize], right: &[usize]) -> Option<f64> {
		if left.is_empty() || right.is_empty() {
			return None;
		}
		let n_examples = self.n_examples as f64;
		let left_weight = left.len() as f64 / n_examples;
		let right_weight = right.len() as f64 / n_examples;
		Some(
			self.parent_impurity
				- left_weight * self.labels.impurity(left)
				- right_weight * self.labels.impurity(right),
		)
	}
}

pub(crate) struct SplitCandidate {
	pub split: BranchSplit,
	pub gain: f64,
	pub left_examples: Vec<usize>,
	pub right_examples: Vec<usize>,
}

pub(crate) struct ChooseBestSplitOptions<'a> {
	pub dataset: &'a Dataset,
	pub features: &'a [FeatureProfile],
	/// These are the indexes into `features` of the features not yet used on the path to this node.
	pub available_features: &'a [usize],
	pub labels: &'a Labels,
	pub examples: &'a [usize],
}

/// Find the split with the highest gain across all available features, if one exists. Features are evaluated in parallel, but the winner is chosen in feature order, so ties go to the feature that comes first.
pub(crate) fn choose_best_split(options: ChooseBestSplitOptions) -> Option<SplitCandidate> {
	let ChooseBestSplitOptions {
		dataset,
		features,
		available_features,
		labels,
		examples,
	} = options;
	let evaluator = SplitEvaluator::new(labels, examples);
	let best_split_for_features: Vec<Option<SplitCandidate>> = available_features
		.par_iter()
		.map(|feature_index| {
			choose_best_split_for_feature(
				dataset,
				*feature_index,
				&features[*feature_index],
				&evaluator,
				examples,
			)
		})
		.collect();
	best_split_for_features
		.into_iter()
		.fold(None, choose_split_with_highest_gain)
}

fn choose_best_split_for_feature(
	dataset: &Dataset,
	feature_index: usize,
	feature: &FeatureProfile,
	evaluator: &SplitEvaluator,
	examples: &[usize],
) -> Option<SplitCandidate> {
	match feature.role {
		ColumnRole::Numerical => {
			choose_best_split_for_numerical_feature(dataset, feature_index, feature, evaluator, examples)
		}
		ColumnRole::Categorical => choose_best_split_for_categorical_feature(
			dataset,
			feature_index,
			feature,
			evaluator,
			examples,
		),
	}
}

/// A numerical feature proposes a single split, at the median of its values in the node.
fn choose_best_split_for_numerical_feature(
	dataset: &Dataset,
	feature_index: usize,
	feature: &FeatureProfile,
	evaluator: &SplitEvaluator,
	examples: &[usize],
) -> Option<SplitCandidate> {
	let mut values: Vec<Finite> = examples
		.iter()
		.filter_map(|example| dataset.value(*example, feature.column_index).as_number())
		.filter_map(|value| Finite::new(value).ok())
		.collect();
	let threshold = median(&mut values)?;
	let split = BranchSplit::Numerical(NumericalSplit {
		feature_index,
		threshold,
	});
	evaluate_split(dataset, feature, split, evaluator, examples)
}

/// A categorical feature proposes one split per category present in the node, in the order the categories first appear.
fn choose_best_split_for_categorical_feature(
	dataset: &Dataset,
	feature_index: usize,
	feature: &FeatureProfile,
	evaluator: &SplitEvaluator,
	examples: &[usize],
) -> Option<SplitCandidate> {
	let mut seen = HashSet::new();
	let mut categories = Vec::new();
	for example in examples.iter() {
		if let Some(category) = dataset.value(*example, feature.column_index).as_category() {
			if seen.insert(category.clone()) {
				categories.push(category.into_owned());
			}
		}
	}
	categories
		.into_iter()
		.map(|category| {
			let split = BranchSplit::Categorical(CategoricalSplit {
				feature_index,
				category,
			});
			evaluate_split(dataset, feature, split, evaluator, examples)
		})
		.fold(None, choose_split_with_highest_gain)
}

/// Partition the examples by the split and score the partition. Examples whose value the split cannot test go right.
fn evaluate_split(
	dataset: &Dataset,
	feature: &FeatureProfile,
	split: BranchSplit,
	evaluator: &SplitEvaluator,
	examples: &[usize],
) -> Option<SplitCandidate> {
	let (left_examples, right_examples): (Vec<usize>, Vec<usize>) =
		examples.iter().partition(|example| {
			let value = dataset.value(**example, feature.column_index);
			split.direction(value) == Some(SplitDirection::Left)
		});
	let gain = evaluator.gain(&left_examples, &right_examples)?;
	Some(SplitCandidate {
		split,
		gain,
		left_examples,
		right_examples,
	})
}

fn choose_split_with_highest_gain(
	current: Option<SplitCandidate>,
	candidate: Option<SplitCandidate>,
) -> Option<SplitCandidate> {
	match (current, candidate) {
		(None, None) => None,
		(current, None) => current,
		(None, candidate) => candidate,
		(Some(current), Some(candidate)) => {
			if candidate.gain > current.gain {
				Some(candidate)
			} else {
				Some(current)
			}
		}
	}
}

#[cfg(test)]
fn test_features(dataset: &Dataset, target_column_index: usize) -> Vec<FeatureProfile> {
	dataset
		.column_names()
		.iter()
		.enumerate()
		.filter(|(column_index, _)| *column_index != target_column_index)
		.map(|(column_index, name)| {
			FeatureProfile::compute(name.clone(), column_index, dataset.column(column_index))
		})
		.collect()
}

#[test]
fn test_perfect_classification_split() {
	let dataset = Dataset::from_records(vec![
		vec![("x", Value::Number(1.0)), ("y", Value::from("A"))],
		vec![("x", Value::Number(1.0)), ("y", Value::from("A"))],
		vec![("x", Value::Number(5.0)), ("y", Value::from("B"))],
		vec![("x", Value::Number(5.0)), ("y", Value::from("B"))],
	]);
	let (labels, examples) = Labels::compute(&dataset, 1, ProblemType::Classification);
	assert!((labels.impurity(&examples) - 1.0).abs() < 1e-12);
	let features = test_features(&dataset, 1);
	let best = choose_best_split(ChooseBestSplitOptions {
		dataset: &dataset,
		features: &features,
		available_features: &[0],
		labels: &labels,
		examples: &examples,
	})
	.unwrap();
	assert_eq!(
		best.split,
		BranchSplit::Numerical(NumericalSplit {
			feature_index: 0,
			threshold: 3.0,
		})
	);
	assert!((best.gain - 1.0).abs() < 1e-12);
	assert_eq!(best.left_examples, vec![0, 1]);
	assert_eq!(best.right_examples, vec![2, 3]);
}

#[test]
fn test_variance_reduction() {
	let dataset = Dataset::from_records((1..=4).map(|i| {
		vec![
			("x", Value::Number(i as f64)),
			("y", Value::Number(10.0 * i as f64)),
		]
	}));
	let (labels, examples) = Labels::compute(&dataset, 1, ProblemType::Regression);
	assert!((labels.impurity(&examples) - 125.0).abs() < 1e-9);
	let evaluator = SplitEvaluator::new(&labels, &examples);
	let gain = evaluator.gain(&[0, 1], &[2, 3]).unwrap();
	assert!((gain - 100.0).abs() < 1e-9);
	assert_eq!(evaluator.gain(&[], &[0, 1, 2, 3]), None);
}

#[test]
fn test_impurity_is_zero_for_pure_sets() {
	let dataset = Dataset::from_records(vec![
		vec![("x", Value::Number(1.0)), ("y", Value::from("A"))],
		vec![("x", Value::Number(2.0)), ("y", Value::from("A"))],
	]);
	let (labels, examples) = Labels::compute(&dataset, 1, ProblemType::Classification);
	assert_eq!(labels.impurity(&examples), 0.0);
	let dataset = Dataset::from_records(vec![
		vec![("y", Value::Number(7.0))],
		vec![("y", Value::Number(7.0))],
		vec![("y", Value::from("n/a"))],
	]);
	let (labels, examples) = Labels::compute(&dataset, 0, ProblemType::Regression);
	assert_eq!(examples, vec![0, 1, 2]);
	assert_eq!(labels.impurity(&examples), 0.0);
}

#[test]
fn test_categorical_ties_go_to_the_first_category() {
	let dataset = Dataset::from_records(vec![
		vec![("color", Value::from("red")), ("y", Value::from("A"))],
		vec![("color", Value::from("blue")), ("y", Value::from("B"))],
		vec![("color", Value::from("red")), ("y", Value::from("A"))],
		vec![("color", Value::from("blue")), ("y", Value::from("B"))],
	]);
	let (labels, examples) = Labels::compute(&dataset, 1, ProblemType::Classification);
	let features = test_features(&dataset, 1);
	let best = choose_best_split(ChooseBestSplitOptions {
		dataset: &dataset,
		features: &features,
		available_features: &[0],
		labels: &labels,
		examples: &examples,
	})
	.unwrap();
	assert_eq!(
		best.split,
		BranchSplit::Categorical(CategoricalSplit {
			feature_index: 0,
			category: "red".to_owned(),
		})
	);
}

#[test]
fn test_feature_ties_go_to_the_first_feature() {
	let dataset = Dataset::from_records(vec![
		vec![("a", Value::Number(1.0)), ("b", Value::Number(1.0)), ("y", Value::from("A"))],
		vec![("a", Value::Number(1.0)), ("b", Value::Number(1.0)), ("y", Value::from("A"))],
		vec![("a", Value::Number(2.0)), ("b", Value::Number(2.0)), ("y", Value::from("B"))],
		vec![("a", Value::Number(2.0)), ("b", Value::Number(2.0)), ("y", Value::from("B"))],
	]);
	let (labels, examples) = Labels::compute(&dataset, 2, ProblemType::Classification);
	let features = test_features(&dataset, 2);
	let best = choose_best_split(ChooseBestSplitOptions {
		dataset: &dataset,
		features: &features,
		available_features: &[0, 1],
		labels: &labels,
		examples: &examples,
	})
	.unwrap();
	assert_eq!(best.split.feature_index(), 0);
	let best = choose_best_split(ChooseBestSplitOptions {
		dataset: &dataset,
		features: &features,
		available_features: &[1, 0],
		labels: &labels,
		examples: &examples,
	})
	.unwrap();
	assert_eq!(best.split.feature_index(), 1);
}

#[test]
fn test_no_split_when_every_partition_has_an_empty_side() {
	let dataset = Dataset::from_records(vec![
		vec![("x", Value::Number(4.0)), ("color", Value::from("red")), ("y", Value::from("A"))],
		vec![("x", Value::Number(4.0)), ("color", Value::from("red")), ("y", Value::from("B"))],
		vec![("x", Value::Missing), ("color", Value::Missing), ("y", Value::from("A"))],
	]);
	let (labels, examples) = Labels::compute(&dataset, 2, ProblemType::Classification);
	let features = test_features(&dataset, 2);
	// The missing values go right, so both features have a usable split.
	let best = choose_best_split(ChooseBestSplitOptions {
		dataset: &dataset,
		features: &features,
		available_features: &[0, 1],
		labels: &labels,
		examples: &examples,
	})
	.unwrap();
	assert_eq!(best.right_examples, vec![2]);
	// Without the row with missing values, every partition is one sided.
	let best = choose_best_split(ChooseBestSplitOptions {
		dataset: &dataset,
		features: &features,
		available_features: &[0, 1],
		labels: &labels,
		examples: &examples[..2],
	});
	assert!(best.is_none());
}
