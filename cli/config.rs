/*!
This module defines the `Config` struct, which is read from the file passed to `sapling train --config`. Every field is optional. A value given on the command line takes precedence over the config file, and the config file takes precedence over the defaults.
*/

use anyhow::{Context, Result};
use sapling_tree::{ProblemType, TrainOptions};
use std::path::Path;

#[derive(Debug, Default, PartialEq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
	pub target: Option<String>,
	pub problem_type: Option<ProblemType>,
	pub ignored_columns: Option<Vec<String>>,
	pub max_depth: Option<usize>,
	pub min_examples_to_split: Option<usize>,
}

impl Config {
	/// Read a config from a yaml file. Json is a subset of yaml, so json config files work too.
	pub fn from_path(path: &Path) -> Result<Config> {
		let config = std::fs::read_to_string(path)
			.with_context(|| format!("failed to read config file {}", path.display()))?;
		let config = serde_yaml::from_str(&config)
			.with_context(|| format!("failed to parse config file {}", path.display()))?;
		Ok(config)
	}

	pub fn train_options(&self) -> TrainOptions {
		let defaults = TrainOptions::default();
		TrainOptions {
			max_depth: self.max_depth.unwrap_or(defaults.max_depth),
			min_examples_to_split: self
				.min_examples_to_split
				.unwrap_or(defaults.min_examples_to_split),
		}
	}
}

#[test]
fn test_yaml_config() {
	let config: Config = serde_yaml::from_str(
		"
target: species
problem_type: classification
ignored_columns:
  - id
max_depth: 5
",
	)
	.unwrap();
	assert_eq!(
		config,
		Config {
			target: Some("species".to_owned()),
			problem_type: Some(ProblemType::Classification),
			ignored_columns: Some(vec!["id".to_owned()]),
			max_depth: Some(5),
			min_examples_to_split: None,
		}
	);
	assert_eq!(
		config.train_options(),
		TrainOptions {
			max_depth: 5,
			min_examples_to_split: 3,
		}
	);
}

#[test]
fn test_json_config() {
	let config: Config =
		serde_yaml::from_str(r#"{"problem_type": "regression", "min_examples_to_split": 10}"#)
			.unwrap();
	assert_eq!(config.problem_type, Some(ProblemType::Regression));
	assert_eq!(config.train_options().min_examples_to_split, 10);
	assert_eq!(config.train_options().max_depth, 3);
}

#[test]
fn test_unknown_fields_are_rejected() {
	assert!(serde_yaml::from_str::<Config>("max_dpeth: 4").is_err());
	assert_eq!(serde_yaml::from_str::<Config>("{}").unwrap(), Config::default());
}
