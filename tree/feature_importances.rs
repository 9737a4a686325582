use crate::{BranchNode, Node, Tree};

/// This function computes feature importances using the "gain" method, where a feature's importance is the sum over the branches that split on it of the split's gain weighted by the fraction of training examples that reached the branch.
pub(crate) fn compute_feature_importances(
	tree: &Tree,
	n_features: usize,
	n_examples: usize,
) -> Vec<f64> {
	let mut feature_importances = vec![0.0; n_features];
	if n_examples == 0 {
		return feature_importances;
	}
	for node in tree.nodes.iter() {
		if let Node::Branch(BranchNode {
			split,
			gain,
			examples_count,
			..
		}) = node
		{
			if let Some(feature_importance) = feature_importances.get_mut(split.feature_index()) {
				*feature_importance += gain * *examples_count as f64 / n_examples as f64;
			}
		}
	}
	// Normalize the feature_importances.
	let total: f64 = feature_importances.iter().sum();
	if total > 0.0 {
		for feature_importance in feature_importances.iter_mut() {
			*feature_importance /= total;
		}
	}
	feature_importances
}

#[test]
fn test_feature_importances() {
	use crate::{BranchSplit, CategoricalSplit, LeafNode, LeafValue, NumericalSplit};
	let leaf = |examples_count| {
		Node::Leaf(LeafNode {
			value: LeafValue::Regression {
				mean: Some(0.0),
				valid_count: examples_count,
			},
			examples_count,
		})
	};
	let tree = Tree {
		nodes: vec![
			Node::Branch(BranchNode {
				left_child_index: 1,
				right_child_index: 4,
				split: BranchSplit::Numerical(NumericalSplit {
					feature_index: 2,
					threshold: 1.5,
				}),
				gain: 3.0,
				examples_count: 8,
			}),
			Node::Branch(BranchNode {
				left_child_index: 2,
				right_child_index: 3,
				split: BranchSplit::Categorical(CategoricalSplit {
					feature_index: 0,
					category: "red".to_owned(),
				}),
				gain: 2.0,
				examples_count: 4,
			}),
			leaf(2),
			leaf(2),
			leaf(4),
		],
	};
	let feature_importances = compute_feature_importances(&tree, 3, 8);
	assert!((feature_importances[0] - 0.25).abs() < 1e-12);
	assert_eq!(feature_importances[1], 0.0);
	assert!((feature_importances[2] - 0.75).abs() < 1e-12);
	let stump = Tree {
		nodes: vec![leaf(8)],
	};
	assert_eq!(compute_feature_importances(&stump, 2, 8), vec![0.0, 0.0]);
}
