use thiserror::Error;

/// These are the ways training can fail. Individual malformed values never fail training. They are skipped.
#[derive(Debug, Error, PartialEq)]
pub enum TrainError {
	#[error("the dataset has no rows to train on")]
	EmptyDataset,
	#[error("did not find target column \"{0}\"")]
	TargetColumnNotFound(String),
	#[error("no feature columns remain after excluding the target and ignored columns")]
	NoUsableFeatures,
}

#[derive(Debug, Error, PartialEq)]
pub enum PredictError {
	/// The input lacks a usable value for a feature that a branch on the traversed path tests.
	#[error("the input has no usable value for feature \"{feature}\"")]
	InvalidPredictionInput { feature: String },
	#[error("the tree has no node at index {node_index}")]
	MalformedTree { node_index: usize },
}

#[derive(Debug, Error, PartialEq)]
#[error("unknown problem type \"{0}\", expected \"classification\" or \"regression\"")]
pub struct ParseProblemTypeError(pub String);
