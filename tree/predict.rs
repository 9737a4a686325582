use crate::{BranchNode, LeafNode, LeafValue, Model, Node, PredictError, SplitDirection};
use sapling_dataframe::{Row, Value};

/// This is the result of running one row through a tree.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Prediction {
	/// This is the leaf's prediction.
	pub value: LeafValue,
	/// This is the number of training examples that reached the leaf.
	pub examples_count: usize,
	/// This is the index of the leaf in the tree's node vector.
	pub leaf_index: usize,
	/// These are the indexes of the nodes visited from the root to the leaf, inclusive.
	pub path: Vec<usize>,
}

impl Model {
	/**
	Make a prediction for a row. The row must have a usable value for every feature tested on the path from the root to the leaf it reaches: a number for a numerical split and any value that is not missing for a categorical split. Columns the path does not test may be absent.
	*/
	pub fn predict(&self, row: &Row) -> Result<Prediction, PredictError> {
		for feature in self.out_of_range_features(row) {
			log::warn!(
				"the value for feature \"{}\" is outside the range seen in training",
				feature
			);
		}
		// Start at the root node.
		let mut node_index = 0;
		let mut path = Vec::new();
		loop {
			path.push(node_index);
			// A path longer than the tree has revisited a node.
			if path.len() > self.tree.nodes.len() {
				return Err(PredictError::MalformedTree { node_index });
			}
			match self.tree.nodes.get(node_index) {
				// We are at a branch, decide whether to send this row to the left or right child.
				Some(Node::Branch(BranchNode {
					left_child_index,
					right_child_index,
					split,
					..
				})) => {
					let feature = self
						.features
						.get(split.feature_index())
						.ok_or(PredictError::MalformedTree { node_index })?;
					let value = row.get(&feature.name).unwrap_or(&Value::Missing);
					let direction = split.direction(value).ok_or_else(|| {
						PredictError::InvalidPredictionInput {
							feature: feature.name.clone(),
						}
					})?;
					node_index = match direction {
						SplitDirection::Left => *left_child_index,
						SplitDirection::Right => *right_child_index,
					};
				}
				// We made it to a leaf! The prediction is the leaf's value.
				Some(Node::Leaf(LeafNode {
					value,
					examples_count,
				})) => {
					return Ok(Prediction {
						value: value.clone(),
						examples_count: *examples_count,
						leaf_index: node_index,
						path,
					})
				}
				None => return Err(PredictError::MalformedTree { node_index }),
			}
		}
	}

	/// List the features whose value in the row is present but outside the range seen during training. Such a row can still be predicted, but the tree never saw values like it.
	pub fn out_of_range_features(&self, row: &Row) -> Vec<&str> {
		self.features
			.iter()
			.filter(|feature| match row.get(&feature.name) {
				Some(value) if !value.is_missing() => !feature.contains(value),
				_ => false,
			})
			.map(|feature| feature.name.as_str())
			.collect()
	}
}

#[cfg(test)]
fn separable_model() -> Model {
	use crate::{train, ProblemType, TrainOptions};
	use sapling_dataframe::Dataset;
	let dataset = Dataset::from_records(vec![
		vec![("x", Value::Number(1.0)), ("y", Value::from("A"))],
		vec![("x", Value::Number(1.0)), ("y", Value::from("A"))],
		vec![("x", Value::Number(5.0)), ("y", Value::from("B"))],
		vec![("x", Value::Number(5.0)), ("y", Value::from("B"))],
	]);
	train(
		&dataset,
		"y",
		&[],
		ProblemType::Classification,
		&TrainOptions::default(),
		&mut |_| {},
	)
	.unwrap()
}

#[test]
fn test_predict() {
	use maplit::btreemap;
	let model = separable_model();
	let prediction = model
		.predict(&btreemap! { "x".to_owned() => Value::Number(2.0) })
		.unwrap();
	assert_eq!(
		prediction.value,
		LeafValue::Classification {
			class: Value::from("A"),
			confidence: 100.0,
		}
	);
	assert_eq!(prediction.examples_count, 2);
	assert_eq!(prediction.path, vec![0, 1]);
	let prediction = model
		.predict(&btreemap! { "x".to_owned() => Value::Number(6.0) })
		.unwrap();
	assert_eq!(
		prediction.value,
		LeafValue::Classification {
			class: Value::from("B"),
			confidence: 100.0,
		}
	);
	assert_eq!(prediction.path, vec![0, 2]);
}

#[test]
fn test_predict_invalid_input() {
	use maplit::btreemap;
	let model = separable_model();
	let expected = Err(PredictError::InvalidPredictionInput {
		feature: "x".to_owned(),
	});
	assert_eq!(model.predict(&Row::new()), expected);
	assert_eq!(
		model.predict(&btreemap! { "x".to_owned() => Value::Missing }),
		expected
	);
	assert_eq!(
		model.predict(&btreemap! { "x".to_owned() => Value::from("two") }),
		expected
	);
}

#[test]
fn test_out_of_range_features() {
	use maplit::btreemap;
	let model = separable_model();
	assert_eq!(
		model.out_of_range_features(&btreemap! { "x".to_owned() => Value::Number(6.0) }),
		vec!["x"]
	);
	assert!(model
		.out_of_range_features(&btreemap! { "x".to_owned() => Value::Number(3.0) })
		.is_empty());
	assert!(model.out_of_range_features(&Row::new()).is_empty());
}

#[test]
fn test_predict_tree_with_cycle() {
	use maplit::btreemap;
	let mut model = separable_model();
	if let Node::Branch(branch) = &mut model.tree.nodes[0] {
		branch.left_child_index = 0;
	}
	assert_eq!(
		model.predict(&btreemap! { "x".to_owned() => Value::Number(2.0) }),
		Err(PredictError::MalformedTree { node_index: 0 })
	);
	assert_eq!(
		model
			.predict(&btreemap! { "x".to_owned() => Value::Number(6.0) })
			.map(|prediction| prediction.path),
		Ok(vec![0, 2])
	);
}

#[test]
fn test_predict_categorical_split() {
	use crate::{train, BranchSplit, ProblemType, TrainOptions};
	use maplit::btreemap;
	use sapling_dataframe::Dataset;
	let dataset = Dataset::from_records(vec![
		vec![("code", Value::from("2")), ("y", Value::from("A"))],
		vec![("code", Value::from("2")), ("y", Value::from("A"))],
		vec![("code", Value::from("7")), ("y", Value::from("B"))],
		vec![("code", Value::from("7")), ("y", Value::from("B"))],
	]);
	let model = train(
		&dataset,
		"y",
		&[],
		ProblemType::Classification,
		&TrainOptions::default(),
		&mut |_| {},
	)
	.unwrap();
	match &model.tree.nodes[0] {
		Node::Branch(branch) => assert!(matches!(
			&branch.split,
			BranchSplit::Categorical(split) if split.category == "2"
		)),
		Node::Leaf(_) => panic!("expected a branch at the root"),
	}
	let predict_class = |value: Value| {
		model
			.predict(&btreemap! { "code".to_owned() => value })
			.map(|prediction| (prediction.value, prediction.path))
	};
	let class_a = LeafValue::Classification {
		class: Value::from("A"),
		confidence: 100.0,
	};
	let class_b = LeafValue::Classification {
		class: Value::from("B"),
		confidence: 100.0,
	};
	// The category matches its text, and a number matches its integer rendering.
	assert_eq!(predict_class(Value::from("2")), Ok((class_a.clone(), vec![0, 1])));
	assert_eq!(predict_class(Value::Number(2.0)), Ok((class_a, vec![0, 1])));
	// Every other category goes right, including ones never seen in training.
	assert_eq!(predict_class(Value::from("7")), Ok((class_b.clone(), vec![0, 2])));
	assert_eq!(predict_class(Value::from("9")), Ok((class_b, vec![0, 2])));
	assert_eq!(
		predict_class(Value::Missing),
		Err(PredictError::InvalidPredictionInput {
			feature: "code".to_owned(),
		})
	);
}
