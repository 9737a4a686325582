use crate::{split::Labels, LeafNode, LeafValue, Node, Tree};
use ndarray::prelude::*;
use sapling_metrics::{
	Accuracy, RegressionMetrics, RegressionMetricsInput, RegressionMetricsOutput, StreamingMetric,
};

/// These are the statistics reported after training, for display alongside the tree.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrainStats {
	/// This is the number of rows the tree was trained on.
	pub n_rows: usize,
	/// This is the number of rows left out of training because their target was missing.
	pub n_rows_skipped: usize,
	pub n_features: usize,
	pub n_nodes: usize,
	pub n_branches: usize,
	pub n_leaves: usize,
	pub depth: usize,
	/// This is how well the tree fits the rows it was trained on. It is `None` if no row has a target usable for the metric.
	pub training_metric: Option<TrainingMetric>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrainingMetric {
	Classification {
		/// This is the fraction of training rows whose class matches the class of the leaf they reach.
		accuracy: f64,
	},
	Regression {
		mse: f64,
		rmse: f64,
		mae: f64,
		/// This is `None` when the targets have zero variance.
		r2: Option<f64>,
	},
}

impl std::fmt::Display for TrainingMetric {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			TrainingMetric::Classification { accuracy } => {
				write!(f, "accuracy {:.1}%", accuracy * 100.0)
			}
			TrainingMetric::Regression { rmse, r2, .. } => match r2 {
				Some(r2) => write!(f, "rmse {:.4}, r2 {:.4}", rmse, r2),
				None => write!(f, "rmse {:.4}", rmse),
			},
		}
	}
}

impl TrainStats {
	pub(crate) fn compute(
		tree: &Tree,
		labels: &Labels,
		leaf_examples: &[(usize, Vec<usize>)],
		n_rows_skipped: usize,
		n_features: usize,
	) -> Self {
		TrainStats {
			n_rows: leaf_examples.iter().map(|(_, examples)| examples.len()).sum(),
			n_rows_skipped,
			n_features,
			n_nodes: tree.nodes.len(),
			n_branches: tree.n_branches(),
			n_leaves: tree.n_leaves(),
			depth: tree.depth(),
			training_metric: compute_training_metric(tree, labels, leaf_examples),
		}
	}
}

/// Score the tree on its own training rows. `leaf_examples` pairs each leaf's index in the tree with the examples that reached it during training, so no example needs to be run through the tree again.
fn compute_training_metric(
	tree: &Tree,
	labels: &Labels,
	leaf_examples: &[(usize, Vec<usize>)],
) -> Option<TrainingMetric> {
	let leaves = leaf_examples.iter().filter_map(|(node_index, examples)| {
		match tree.nodes.get(*node_index) {
			Some(Node::Leaf(LeafNode { value, .. })) => Some((value, examples)),
			_ => None,
		}
	});
	match labels {
		Labels::Classification {
			classes,
			class_indexes,
		} => {
			let mut accuracy = Accuracy::new();
			for (value, examples) in leaves {
				let predicted_class_index = match value {
					LeafValue::Classification { class, .. } => {
						classes.iter().position(|candidate| candidate == class)
					}
					LeafValue::Regression { .. } => None,
				};
				let predicted_class_index = match predicted_class_index {
					Some(predicted_class_index) => predicted_class_index,
					None => continue,
				};
				for class_index in examples.iter().filter_map(|example| class_indexes[*example]) {
					accuracy.update((predicted_class_index, class_index));
				}
			}
			accuracy
				.finalize()
				.map(|accuracy| TrainingMetric::Classification { accuracy })
		}
		Labels::Regression { values } => {
			let mut predictions = Vec::new();
			let mut targets = Vec::new();
			for (value, examples) in leaves {
				let mean = match value {
					LeafValue::Regression {
						mean: Some(mean), ..
					} => *mean,
					_ => continue,
				};
				for target in examples.iter().filter_map(|example| values[*example]) {
					predictions.push(mean);
					targets.push(target);
				}
			}
			let predictions = Array::from(predictions);
			let targets = Array::from(targets);
			let mut metrics = RegressionMetrics::new();
			metrics.update(RegressionMetricsInput {
				predictions: predictions.view(),
				labels: targets.view(),
			});
			metrics.finalize().map(
				|RegressionMetricsOutput {
				     mse, rmse, mae, r2, ..
				 }| TrainingMetric::Regression {
					mse,
					rmse,
					mae,
					r2: if r2.is_finite() { Some(r2) } else { None },
				},
			)
		}
	}
}

#[test]
fn test_training_accuracy() {
	use crate::ProblemType;
	use sapling_dataframe::{Dataset, Value};
	let dataset = Dataset::from_records(
		vec!["A", "A", "B", "B"]
			.into_iter()
			.map(|class| vec![("y", Value::from(class))]),
	);
	let (labels, _) = Labels::compute(&dataset, 0, ProblemType::Classification);
	let tree = Tree {
		nodes: vec![Node::Leaf(LeafNode {
			value: LeafValue::Classification {
				class: Value::from("A"),
				confidence: 50.0,
			},
			examples_count: 4,
		})],
	};
	let stats = TrainStats::compute(&tree, &labels, &[(0, vec![0, 1, 2, 3])], 1, 2);
	assert_eq!(stats.n_rows, 4);
	assert_eq!(stats.n_rows_skipped, 1);
	assert_eq!((stats.n_nodes, stats.n_branches, stats.n_leaves), (1, 0, 1));
	assert_eq!(stats.depth, 0);
	match stats.training_metric {
		Some(TrainingMetric::Classification { accuracy }) => assert!((accuracy - 0.5).abs() < 1e-12),
		other => panic!("expected a classification metric, got {:?}", other),
	}
}

#[test]
fn test_constant_regression_target_has_no_r2() {
	use crate::ProblemType;
	use sapling_dataframe::{Dataset, Value};
	let dataset = Dataset::from_records((0..3).map(|_| vec![("y", Value::Number(5.0))]));
	let (labels, examples) = Labels::compute(&dataset, 0, ProblemType::Regression);
	let tree = Tree {
		nodes: vec![Node::Leaf(LeafNode {
			value: LeafValue::Regression {
				mean: Some(5.0),
				valid_count: 3,
			},
			examples_count: 3,
		})],
	};
	let stats = TrainStats::compute(&tree, &labels, &[(0, examples)], 0, 1);
	assert_eq!(
		stats.training_metric,
		Some(TrainingMetric::Regression {
			mse: 0.0,
			rmse: 0.0,
			mae: 0.0,
			r2: None,
		})
	);
}
