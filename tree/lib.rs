/*!
This crate learns a single, depth-limited decision tree from a [`Dataset`](../sapling_dataframe/struct.Dataset.html) and uses it to make predictions. It handles both classification, where the target column holds class labels, and regression, where the target column holds numbers.

## Training

Training begins by profiling every candidate feature column. A column whose values are mostly numbers is treated as [`Numerical`](enum.ColumnRole.html) and split by a threshold. Every other column is treated as [`Categorical`](enum.ColumnRole.html) and split by membership in a single category.

The tree is then grown from the root. At each node, every feature not yet used on the path to that node proposes candidate splits. A numerical feature proposes one split at the median of its values in the node. A categorical feature proposes one split per category present in the node. Each candidate is scored by its gain, which is the decrease in impurity from the parent to the weighted children. Impurity is the entropy of the class labels for classification and the variance of the target for regression. The candidate with the highest gain wins, and ties go to the candidate seen first, in column order and then category order.

A node becomes a leaf when it reaches [`max_depth`](struct.TrainOptions.html#structfield.max_depth), when it has fewer than [`min_examples_to_split`](struct.TrainOptions.html#structfield.min_examples_to_split) examples, when every feature has been used on its path, or when no candidate sends examples both ways. A classification leaf predicts its majority class with the percentage of examples in that class. A regression leaf predicts the mean of its target values.

## Prediction

[`Model::predict`](struct.Model.html#method.predict) starts at the root and follows each branch's test until it reaches a leaf.
*/

#![allow(clippy::tabs_in_doc_comments)]

mod error;
mod feature_importances;
mod leaf;
mod predict;
mod profile;
mod progress;
mod session;
mod split;
mod stats;
mod train;

pub use self::error::{ParseProblemTypeError, PredictError, TrainError};
pub use self::predict::Prediction;
pub use self::profile::{infer_role, ColumnRole, FeatureProfile, FeatureRange};
pub use self::progress::TrainProgress;
pub use self::session::{TrainHandle, TrainOutcome, TrainRequest, Trainer};
pub use self::stats::{TrainStats, TrainingMetric};
pub use self::train::train;

use sapling_dataframe::{Dataset, Value};

/// These are the options passed to [`train`](fn.train.html).
#[derive(Clone, Debug, PartialEq)]
pub struct TrainOptions {
	/// No path from the root to a leaf will pass through more than this many branches.
	pub max_depth: usize,
	/// A node with fewer examples than this will not be split.
	pub min_examples_to_split: usize,
}

impl Default for TrainOptions {
	fn default() -> Self {
		Self {
			max_depth: 3,
			min_examples_to_split: 3,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemType {
	Classification,
	Regression,
}

impl ProblemType {
	/// Choose the problem type for a target column that was not given one explicitly. A numerical target is a regression problem and anything else is a classification problem.
	pub fn infer(dataset: &Dataset, target_column_index: usize) -> ProblemType {
		match infer_role(dataset.column(target_column_index)) {
			ColumnRole::Numerical => ProblemType::Regression,
			ColumnRole::Categorical => ProblemType::Classification,
		}
	}
}

impl std::str::FromStr for ProblemType {
	type Err = ParseProblemTypeError;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"classification" => Ok(ProblemType::Classification),
			"regression" => Ok(ProblemType::Regression),
			_ => Err(ParseProblemTypeError(s.to_owned())),
		}
	}
}

impl std::fmt::Display for ProblemType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ProblemType::Classification => write!(f, "classification"),
			ProblemType::Regression => write!(f, "regression"),
		}
	}
}

/// A `Model` is the output of training. It never changes after training. Retraining produces a new `Model`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Model {
	/// This is the name of the column the model predicts.
	pub target_column: String,
	pub problem_type: ProblemType,
	/// These are the features the tree was allowed to split on, in column order. Splits refer to features by their index in this list.
	pub features: Vec<FeatureProfile>,
	pub tree: Tree,
	/// These are the gain-weighted importances of each feature, in the same order as `features`. They sum to one unless the tree has no branches.
	pub feature_importances: Vec<f64>,
	pub stats: TrainStats,
}

impl Model {
	/// Describe a branch's test in terms of feature names, such as `age <= 35` or `color == red`.
	pub fn describe_split(&self, split: &BranchSplit) -> String {
		describe_split(&self.features, split)
	}
}

pub(crate) fn describe_split(features: &[FeatureProfile], split: &BranchSplit) -> String {
	let feature_name = features
		.get(split.feature_index())
		.map(|feature| feature.name.as_str())
		.unwrap_or("?");
	match split {
		BranchSplit::Numerical(NumericalSplit { threshold, .. }) => {
			format!("{} <= {}", feature_name, threshold)
		}
		BranchSplit::Categorical(CategoricalSplit { category, .. }) => {
			format!("{} == {}", feature_name, category)
		}
	}
}

/// Trees are stored as a `Vec` of `Node`s with the root at index zero. Each branch holds the indexes of its two children. Every node other than the root is the child of exactly one branch.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Tree {
	pub nodes: Vec<Node>,
}

impl Tree {
	pub fn root(&self) -> Option<&Node> {
		self.nodes.first()
	}

	pub fn n_branches(&self) -> usize {
		self.nodes
			.iter()
			.filter(|node| matches!(node, Node::Branch(_)))
			.count()
	}

	pub fn n_leaves(&self) -> usize {
		self.nodes.len() - self.n_branches()
	}

	/// This is the largest number of branches on any path from the root to a leaf.
	pub fn depth(&self) -> usize {
		let mut depth = 0;
		let mut stack = if self.nodes.is_empty() {
			vec![]
		} else {
			vec![(0, 0)]
		};
		let mut n_visited = 0;
		while let Some((node_index, node_depth)) = stack.pop() {
			// A tree visits each node once, so more visits than nodes means a child index points back up the tree.
			n_visited += 1;
			if n_visited > self.nodes.len() {
				break;
			}
			match self.nodes.get(node_index) {
				Some(Node::Branch(branch)) => {
					stack.push((branch.left_child_index, node_depth + 1));
					stack.push((branch.right_child_index, node_depth + 1));
				}
				Some(Node::Leaf(_)) | None => depth = depth.max(node_depth),
			}
		}
		depth
	}
}

/// A node is either a branch or a leaf.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
	Branch(BranchNode),
	Leaf(LeafNode),
}

impl Node {
	pub fn examples_count(&self) -> usize {
		match self {
			Node::Branch(BranchNode { examples_count, .. }) => *examples_count,
			Node::Leaf(LeafNode { examples_count, .. }) => *examples_count,
		}
	}
}

/// A `BranchNode` is a decision node in a tree.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BranchNode {
	/// This is the index in the tree's node vector for this node's left child.
	pub left_child_index: usize,
	/// This is the index in the tree's node vector for this node's right child.
	pub right_child_index: usize,
	/// When making predictions, an example will be sent either to the right or left child. The `split` contains the information necessary to determine which way it will go.
	pub split: BranchSplit,
	/// This is the gain of the split when it was chosen.
	pub gain: f64,
	/// This is the number of training examples that reached this node.
	pub examples_count: usize,
}

/// A `BranchSplit` describes how examples are sent to the left or right child given their feature values.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum BranchSplit {
	Numerical(NumericalSplit),
	Categorical(CategoricalSplit),
}

/// A numerical split sends an example left if its feature value is <= `threshold` and right otherwise.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NumericalSplit {
	pub feature_index: usize,
	pub threshold: f64,
}

/// A categorical split sends an example left if its feature value is `category` and right otherwise.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CategoricalSplit {
	pub feature_index: usize,
	pub category: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SplitDirection {
	Left,
	Right,
}

impl BranchSplit {
	pub fn feature_index(&self) -> usize {
		match self {
			BranchSplit::Numerical(split) => split.feature_index,
			BranchSplit::Categorical(split) => split.feature_index,
		}
	}

	pub fn role(&self) -> ColumnRole {
		match self {
			BranchSplit::Numerical(_) => ColumnRole::Numerical,
			BranchSplit::Categorical(_) => ColumnRole::Categorical,
		}
	}

	/// Decide which way a value goes. This returns `None` if the value cannot be tested by this split, which is the case for missing values and for non-numbers in a numerical split.
	pub fn direction(&self, value: &Value) -> Option<SplitDirection> {
		let goes_left = match self {
			BranchSplit::Numerical(NumericalSplit { threshold, .. }) => {
				value.as_number()? <= *threshold
			}
			BranchSplit::Categorical(CategoricalSplit { category, .. }) => {
				value.as_category()? == category.as_str()
			}
		};
		if goes_left {
			Some(SplitDirection::Left)
		} else {
			Some(SplitDirection::Right)
		}
	}
}

/// The leaves in a tree hold the prediction for the examples that reach them.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LeafNode {
	pub value: LeafValue,
	/// This is the number of training examples that reached this leaf.
	pub examples_count: usize,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LeafValue {
	Classification {
		/// This is the most common class among the examples that reached the leaf.
		class: Value,
		/// This is the percentage of examples in the leaf that belong to `class`, rounded to one decimal place.
		confidence: f64,
	},
	Regression {
		/// This is the mean target value of the examples that reached the leaf. It is `None` if none of them had a numeric target.
		mean: Option<f64>,
		/// This is the number of examples whose target was used to compute the mean.
		valid_count: usize,
	},
}

#[test]
fn test_model_json() {
	let dataset = Dataset::from_records(vec![
		vec![("color", Value::from("red")), ("y", Value::Number(1.0))],
		vec![("color", Value::from("red")), ("y", Value::Number(1.5))],
		vec![("color", Value::from("blue")), ("y", Value::Number(4.0))],
		vec![("color", Value::Missing), ("y", Value::Number(4.5))],
	]);
	let model = train(
		&dataset,
		"y",
		&[],
		ProblemType::infer(&dataset, 1),
		&TrainOptions::default(),
		&mut |_| {},
	)
	.unwrap();
	assert_eq!(model.problem_type, ProblemType::Regression);
	assert_eq!(model.tree.n_branches(), 1);
	assert_eq!(model.tree.depth(), 1);
	let json = serde_json::to_value(&model.tree.nodes[0]).unwrap();
	assert_eq!(
		json,
		serde_json::json!({
			"type": "branch",
			"left_child_index": 1,
			"right_child_index": 2,
			"split": { "role": "categorical", "feature_index": 0, "category": "red" },
			"gain": json["gain"],
			"examples_count": 4,
		})
	);
	let reloaded: Model = serde_json::from_str(&serde_json::to_string(&model).unwrap()).unwrap();
	assert_eq!(reloaded.tree, model.tree);
	assert_eq!(reloaded.features, model.features);
}

#[test]
fn test_parse_problem_type() {
	assert_eq!("regression".parse(), Ok(ProblemType::Regression));
	assert_eq!(
		"clustering".parse::<ProblemType>(),
		Err(ParseProblemTypeError("clustering".to_owned()))
	);
}

#[test]
fn test_depth_of_tree_with_cycle() {
	let tree = Tree {
		nodes: vec![
			Node::Branch(BranchNode {
				left_child_index: 0,
				right_child_index: 1,
				split: BranchSplit::Numerical(NumericalSplit {
					feature_index: 0,
					threshold: 1.0,
				}),
				gain: 1.0,
				examples_count: 2,
			}),
			Node::Leaf(LeafNode {
				value: LeafValue::Regression {
					mean: Some(1.0),
					valid_count: 2,
				},
				examples_count: 2,
			}),
		],
	};
	assert_eq!(tree.depth(), 1);
}
