use crate::{
	feature_importances::compute_feature_importances,
	leaf::summarize_leaf,
	profile::profile_features,
	split::{choose_best_split, ChooseBestSplitOptions, Labels, SplitCandidate},
	BranchNode, FeatureProfile, LeafNode, Model, Node, ProblemType, TrainError, TrainOptions,
	TrainProgress, TrainStats, Tree,
};
use sapling_dataframe::Dataset;
use sapling_util::progress_counter::ProgressCounter;
use std::convert::TryFrom;

/**
Train a decision tree to predict `target_column` from every other column of `dataset` that is not in `ignored_columns`.

Training fails only if the dataset has no rows with a target, if the target column does not exist, or if no feature columns remain. Rows with a missing target are skipped. Malformed feature values never fail training: they fail every branch's test and go right.
*/
pub fn train(
	dataset: &Dataset,
	target_column: &str,
	ignored_columns: &[String],
	problem_type: ProblemType,
	options: &TrainOptions,
	update_progress: &mut dyn FnMut(TrainProgress),
) -> Result<Model, TrainError> {
	if dataset.is_empty() {
		return Err(TrainError::EmptyDataset);
	}
	let target_column_index = dataset
		.column_index(target_column)
		.ok_or_else(|| TrainError::TargetColumnNotFound(target_column.to_owned()))?;
	log::info!(
		"training a {} tree for \"{}\" on {} rows and {} columns",
		problem_type,
		target_column,
		dataset.nrows(),
		dataset.ncols(),
	);

	// Profile the features.
	let progress_counter = ProgressCounter::new(dataset.ncols() as u64);
	update_progress(TrainProgress::ProfilingFeatures(progress_counter.clone()));
	let features = profile_features(dataset, target_column_index, ignored_columns, &progress_counter)?;

	// Encode the target, leaving out the rows where it is missing.
	let (labels, examples) = Labels::compute(dataset, target_column_index, problem_type);
	let n_rows_skipped = dataset.nrows() - examples.len();
	if n_rows_skipped > 0 {
		log::warn!(
			"skipped {} rows with a missing value for \"{}\"",
			n_rows_skipped,
			target_column
		);
	}
	if examples.is_empty() {
		return Err(TrainError::EmptyDataset);
	}

	// Grow the tree.
	let progress_counter = ProgressCounter::new(max_nodes(options.max_depth));
	update_progress(TrainProgress::GrowingTree(progress_counter.clone()));
	let mut builder = TreeBuilder {
		dataset,
		features: &features,
		labels: &labels,
		options,
		progress_counter: &progress_counter,
		nodes: Vec::new(),
		leaf_examples: Vec::new(),
	};
	let available_features: Vec<usize> = (0..features.len()).collect();
	builder.build(examples, &available_features, 0);
	let TreeBuilder {
		nodes,
		leaf_examples,
		..
	} = builder;
	let tree = Tree { nodes };
	progress_counter.set(progress_counter.total());

	let n_examples = dataset.nrows() - n_rows_skipped;
	let feature_importances = compute_feature_importances(&tree, features.len(), n_examples);
	let stats = TrainStats::compute(
		&tree,
		&labels,
		&leaf_examples,
		n_rows_skipped,
		features.len(),
	);
	log::info!(
		"trained a tree with {} nodes, {} leaves, and depth {}",
		stats.n_nodes,
		stats.n_leaves,
		stats.depth,
	);
	if let Some(training_metric) = &stats.training_metric {
		log::info!("training {}", training_metric);
	}

	Ok(Model {
		target_column: target_column.to_owned(),
		problem_type,
		features,
		tree,
		feature_importances,
		stats,
	})
}

/// This is the number of nodes in a full binary tree of the given depth, which bounds the number of nodes training can create.
fn max_nodes(max_depth: usize) -> u64 {
	u32::try_from(max_depth)
		.ok()
		.and_then(|max_depth| max_depth.checked_add(1))
		.and_then(|shift| 1u64.checked_shl(shift))
		.map(|n| n - 1)
		.unwrap_or(u64::MAX)
}

struct TreeBuilder<'a> {
	dataset: &'a Dataset,
	features: &'a [FeatureProfile],
	labels: &'a Labels,
	options: &'a TrainOptions,
	progress_counter: &'a ProgressCounter,
	/// Nodes are pushed in pre-order, so the root is at index zero and every branch is pushed before its children.
	nodes: Vec<Node>,
	/// These pair each leaf's node index with the examples that reached it.
	leaf_examples: Vec<(usize, Vec<usize>)>,
}

impl<'a> TreeBuilder<'a> {
	/// Build the subtree for `examples` and return the index of its root node.
	fn build(&mut self, examples: Vec<usize>, available_features: &[usize], depth: usize) -> usize {
		self.progress_counter.inc(1);
		let should_stop = depth >= self.options.max_depth
			|| examples.len() < self.options.min_examples_to_split
			|| available_features.is_empty();
		if should_stop {
			return self.push_leaf(examples);
		}
		let best_split = choose_best_split(ChooseBestSplitOptions {
			dataset: self.dataset,
			features: self.features,
			available_features,
			labels: self.labels,
			examples: &examples,
		});
		let SplitCandidate {
			split,
			gain,
			left_examples,
			right_examples,
		} = match best_split {
			Some(best_split) => best_split,
			None => return self.push_leaf(examples),
		};
		log::debug!(
			"split {} examples at depth {} on {} with gain {}",
			examples.len(),
			depth,
			crate::describe_split(self.features, &split),
			gain,
		);

		// A feature is used at most once on any path from the root.
		let feature_index = split.feature_index();
		let child_available_features: Vec<usize> = available_features
			.iter()
			.cloned()
			.filter(|available_feature| *available_feature != feature_index)
			.collect();

		// Push the branch first and fill in its children's indexes once they are known.
		let node_index = self.nodes.len();
		self.nodes.push(Node::Branch(BranchNode {
			left_child_index: 0,
			right_child_index: 0,
			split,
			gain,
			examples_count: examples.len(),
		}));
		let left_child_index = self.build(left_examples, &child_available_features, depth + 1);
		let right_child_index = self.build(right_examples, &child_available_features, depth + 1);
		if let Some(Node::Branch(branch)) = self.nodes.get_mut(node_index) {
			branch.left_child_index = left_child_index;
			branch.right_child_index = right_child_index;
		}
		node_index
	}

	fn push_leaf(&mut self, examples: Vec<usize>) -> usize {
		let value = summarize_leaf(self.labels, &examples);
		log::debug!("leaf with {} examples predicts {:?}", examples.len(), value);
		let node_index = self.nodes.len();
		self.nodes.push(Node::Leaf(LeafNode {
			value,
			examples_count: examples.len(),
		}));
		self.leaf_examples.push((node_index, examples));
		node_index
	}
}

#[cfg(test)]
use crate::{BranchSplit, LeafValue, NumericalSplit};
#[cfg(test)]
use sapling_dataframe::Value;

#[cfg(test)]
fn train_default(dataset: &Dataset, problem_type: ProblemType) -> Model {
	train(
		dataset,
		"y",
		&[],
		problem_type,
		&TrainOptions::default(),
		&mut |_| {},
	)
	.unwrap()
}

#[test]
fn test_separable_classification() {
	let dataset = Dataset::from_records(vec![
		vec![("x", Value::Number(1.0)), ("y", Value::from("A"))],
		vec![("x", Value::Number(1.0)), ("y", Value::from("A"))],
		vec![("x", Value::Number(5.0)), ("y", Value::from("B"))],
		vec![("x", Value::Number(5.0)), ("y", Value::from("B"))],
	]);
	let model = train_default(&dataset, ProblemType::Classification);
	insta::assert_debug_snapshot!(model.tree, @r###"
 Tree {
     nodes: [
         Branch(
             BranchNode {
                 left_child_index: 1,
                 right_child_index: 2,
                 split: Numerical(
                     NumericalSplit {
                         feature_index: 0,
                         threshold: 3.0,
                     },
                 ),
                 gain: 1.0,
                 examples_count: 4,
             },
         ),
         Leaf(
             LeafNode {
                 value: Classification {
                     class: Text(
                         "A",
                     ),
                     confidence: 100.0,
                 },
                 examples_count: 2,
             },
         ),
         Leaf(
             LeafNode {
                 value: Classification {
                     class: Text(
                         "B",
                     ),
                     confidence: 100.0,
                 },
                 examples_count: 2,
             },
         ),
     ],
 }
 "###);
	assert_eq!(model.feature_importances, vec![1.0]);
	assert_eq!(model.stats.n_rows, 4);
	let split = BranchSplit::Numerical(NumericalSplit {
		feature_index: 0,
		threshold: 3.0,
	});
	assert_eq!(model.describe_split(&split), "x <= 3");
}

#[test]
fn test_regression_trend() {
	let dataset = Dataset::from_records((1..=4).map(|i| {
		vec![
			("x", Value::Number(i as f64)),
			("y", Value::Number(10.0 * i as f64)),
		]
	}));
	let model = train_default(&dataset, ProblemType::Regression);
	let root = match model.tree.root() {
		Some(Node::Branch(root)) => root,
		other => panic!("expected the root to be a branch, got {:?}", other),
	};
	assert_eq!(
		root.split,
		BranchSplit::Numerical(NumericalSplit {
			feature_index: 0,
			threshold: 2.5,
		})
	);
	assert!((root.gain - 100.0).abs() < 1e-9);
	let leaf_means: Vec<f64> = model
		.tree
		.nodes
		.iter()
		.filter_map(|node| match node {
			Node::Leaf(LeafNode {
				value: LeafValue::Regression {
					mean: Some(mean), ..
				},
				..
			}) => Some(*mean),
			_ => None,
		})
		.collect();
	// Each child has two examples, so both are leaves.
	assert_eq!(leaf_means.len(), 2);
	assert!((leaf_means[0] - 15.0).abs() < 1e-9);
	assert!((leaf_means[1] - 35.0).abs() < 1e-9);
}

#[test]
fn test_two_rows_make_a_single_leaf() {
	let dataset = Dataset::from_records(vec![
		vec![("x", Value::Number(1.0)), ("y", Value::from("A"))],
		vec![("x", Value::Number(2.0)), ("y", Value::from("B"))],
	]);
	let model = train_default(&dataset, ProblemType::Classification);
	assert_eq!(model.tree.nodes.len(), 1);
	assert_eq!(
		model.tree.root(),
		Some(&Node::Leaf(LeafNode {
			value: LeafValue::Classification {
				class: Value::from("A"),
				confidence: 50.0,
			},
			examples_count: 2,
		}))
	);
	assert_eq!(model.feature_importances, vec![0.0]);
}

#[cfg(test)]
fn wide_dataset() -> Dataset {
	Dataset::from_records((0..64).map(|i: usize| {
		vec![
			("a", Value::Number((i % 2) as f64)),
			("b", Value::Number((i / 2 % 2) as f64)),
			("c", Value::from(["red", "green", "blue", "gray"][i / 4 % 4])),
			("d", Value::Number((i / 16) as f64)),
			("e", Value::Number(i as f64)),
			("y", Value::Number(((i * 7) % 13) as f64)),
		]
	}))
}

#[test]
fn test_depth_and_feature_reuse_are_bounded() {
	let dataset = wide_dataset();
	for max_depth in 0..=6 {
		let options = TrainOptions {
			max_depth,
			..Default::default()
		};
		let model = train(
			&dataset,
			"y",
			&[],
			ProblemType::Regression,
			&options,
			&mut |_| {},
		)
		.unwrap();
		assert!(model.tree.depth() <= max_depth);
		// Walk every root to leaf path and check that no feature is split on twice.
		let mut stack = vec![(0usize, Vec::<usize>::new())];
		let mut n_leaf_examples = 0;
		while let Some((node_index, used_features)) = stack.pop() {
			match &model.tree.nodes[node_index] {
				Node::Branch(branch) => {
					let feature_index = branch.split.feature_index();
					assert!(!used_features.contains(&feature_index));
					let mut used_features = used_features.clone();
					used_features.push(feature_index);
					let left = &model.tree.nodes[branch.left_child_index];
					let right = &model.tree.nodes[branch.right_child_index];
					assert_eq!(
						left.examples_count() + right.examples_count(),
						branch.examples_count
					);
					stack.push((branch.left_child_index, used_features.clone()));
					stack.push((branch.right_child_index, used_features));
				}
				Node::Leaf(leaf) => n_leaf_examples += leaf.examples_count,
			}
		}
		// Every training row reaches exactly one leaf.
		assert_eq!(n_leaf_examples, dataset.nrows());
	}
}

#[test]
fn test_training_is_deterministic() {
	let dataset = wide_dataset();
	let a = train_default(&dataset, ProblemType::Regression);
	let b = train_default(&dataset, ProblemType::Regression);
	assert_eq!(a, b);
	let sum: f64 = a.feature_importances.iter().sum();
	assert!((sum - 1.0).abs() < 1e-9);
}

#[test]
fn test_missing_targets_are_skipped() {
	let dataset = Dataset::from_records(vec![
		vec![("x", Value::Number(1.0)), ("y", Value::from("A"))],
		vec![("x", Value::Number(1.0)), ("y", Value::from("A"))],
		vec![("x", Value::Number(3.0))],
		vec![("x", Value::Number(5.0)), ("y", Value::from("B"))],
		vec![("x", Value::Number(5.0)), ("y", Value::Missing)],
		vec![("x", Value::Number(5.0)), ("y", Value::from("B"))],
	]);
	let model = train_default(&dataset, ProblemType::Classification);
	assert_eq!(model.stats.n_rows, 4);
	assert_eq!(model.stats.n_rows_skipped, 2);
	assert_eq!(model.tree.nodes[0].examples_count(), 4);
	assert_eq!(model.tree.n_leaves(), 2);
}

#[test]
fn test_regression_leaf_reports_rows_and_valid_targets() {
	let dataset = Dataset::from_records(vec![
		vec![("x", Value::Number(1.0)), ("y", Value::Number(4.0))],
		vec![("x", Value::Number(2.0)), ("y", Value::from("unknown"))],
	]);
	let model = train_default(&dataset, ProblemType::Regression);
	assert_eq!(
		model.tree.root(),
		Some(&Node::Leaf(LeafNode {
			value: LeafValue::Regression {
				mean: Some(4.0),
				valid_count: 1,
			},
			examples_count: 2,
		}))
	);
}

#[test]
fn test_train_errors() {
	let empty = Dataset::new(vec!["x".to_owned(), "y".to_owned()]);
	assert_eq!(
		train(
			&empty,
			"y",
			&[],
			ProblemType::Classification,
			&TrainOptions::default(),
			&mut |_| {},
		),
		Err(TrainError::EmptyDataset)
	);
	let only_target = Dataset::from_records(vec![vec![("y", Value::from("A"))]]);
	assert_eq!(
		train(
			&only_target,
			"y",
			&[],
			ProblemType::Classification,
			&TrainOptions::default(),
			&mut |_| {},
		),
		Err(TrainError::NoUsableFeatures)
	);
	let all_missing = Dataset::from_records(vec![
		vec![("x", Value::Number(1.0)), ("y", Value::Missing)],
		vec![("x", Value::Number(2.0)), ("y", Value::Missing)],
	]);
	assert_eq!(
		train(
			&all_missing,
			"y",
			&[],
			ProblemType::Classification,
			&TrainOptions::default(),
			&mut |_| {},
		),
		Err(TrainError::EmptyDataset)
	);
	assert_eq!(
		train(
			&all_missing,
			"z",
			&[],
			ProblemType::Classification,
			&TrainOptions::default(),
			&mut |_| {},
		),
		Err(TrainError::TargetColumnNotFound("z".to_owned()))
	);
}

#[test]
fn test_progress() {
	let dataset = wide_dataset();
	let mut phases = Vec::new();
	let model = train(
		&dataset,
		"y",
		&["e".to_owned()],
		ProblemType::Regression,
		&TrainOptions::default(),
		&mut |progress| phases.push(progress),
	)
	.unwrap();
	assert_eq!(model.features.len(), 4);
	assert_eq!(phases.len(), 2);
	match &phases[0] {
		TrainProgress::ProfilingFeatures(counter) => {
			assert_eq!(counter.total(), 6);
			assert_eq!(counter.get(), 6);
		}
		other => panic!("expected the profiling phase, got {:?}", other),
	}
	match &phases[1] {
		TrainProgress::GrowingTree(counter) => {
			assert_eq!(counter.total(), 15);
			assert_eq!(counter.get(), 15);
		}
		other => panic!("expected the growing phase, got {:?}", other),
	}
}
