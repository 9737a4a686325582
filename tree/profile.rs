use crate::TrainError;
use sapling_dataframe::{Dataset, Value};
use sapling_metrics::{Mean, StreamingMetric};
use sapling_util::progress_counter::ProgressCounter;
use std::collections::BTreeSet;

/// A column's role decides how the tree compares its values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
	/// Values are ordered and split by a threshold.
	Numerical,
	/// Values are compared for equality and split by membership in one category.
	Categorical,
}

/// This is the range of values observed for a feature during training. It is used to check prediction inputs, not to choose splits.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeatureRange {
	Numerical { min: f64, max: f64, mean: f64 },
	/// The categories are sorted, so the range does not depend on row order.
	Categorical { categories: Vec<String> },
}

/// This struct describes one feature column.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FeatureProfile {
	/// This is the name of the column.
	pub name: String,
	/// This is the index of the column in the training dataset.
	pub column_index: usize,
	pub role: ColumnRole,
	pub range: FeatureRange,
	/// This is the number of values usable under the feature's role. For a numerical feature these are the finite numbers. For a categorical feature these are all values that are not missing.
	pub valid_count: usize,
	/// This is the number of values that are present but not usable under the feature's role, such as text in a numerical column.
	pub invalid_count: usize,
	pub missing_count: usize,
}

/**
Decide the role of a column by a majority vote over its values that are not missing. Finite numbers vote for `Numerical`. Everything else votes for `Categorical`. A tie goes to the role of the first value that is not missing, and a column with no values is `Categorical`.
*/
pub fn infer_role<'a>(values: impl IntoIterator<Item = &'a Value>) -> ColumnRole {
	let mut n_numbers = 0usize;
	let mut n_others = 0usize;
	let mut first_role = None;
	for value in values {
		let role = match value {
			Value::Missing => continue,
			value if value.as_number().is_some() => ColumnRole::Numerical,
			_ => ColumnRole::Categorical,
		};
		match role {
			ColumnRole::Numerical => n_numbers += 1,
			ColumnRole::Categorical => n_others += 1,
		}
		first_role.get_or_insert(role);
	}
	if n_numbers > n_others {
		ColumnRole::Numerical
	} else if n_numbers < n_others {
		ColumnRole::Categorical
	} else {
		first_role.unwrap_or(ColumnRole::Categorical)
	}
}

impl FeatureProfile {
	/// Profile a column from its values.
	pub fn compute<'a>(
		name: String,
		column_index: usize,
		values: impl Iterator<Item = &'a Value> + Clone,
	) -> Self {
		let role = infer_role(values.clone());
		let missing_count = values.clone().filter(|value| value.is_missing()).count();
		let present_count = values.clone().count() - missing_count;
		let (range, valid_count) = match role {
			ColumnRole::Numerical => {
				let mut min = std::f64::INFINITY;
				let mut max = std::f64::NEG_INFINITY;
				let mut mean = Mean::new();
				let mut valid_count = 0;
				for value in values.filter_map(|value| value.as_number()) {
					min = min.min(value);
					max = max.max(value);
					mean.update(value);
					valid_count += 1;
				}
				let range = match mean.finalize() {
					Some(mean) => FeatureRange::Numerical { min, max, mean },
					None => FeatureRange::Numerical {
						min: 0.0,
						max: 0.0,
						mean: 0.0,
					},
				};
				(range, valid_count)
			}
			ColumnRole::Categorical => {
				let categories: BTreeSet<String> = values
					.filter_map(|value| value.as_category())
					.map(|category| category.into_owned())
					.collect();
				let range = FeatureRange::Categorical {
					categories: categories.into_iter().collect(),
				};
				(range, present_count)
			}
		};
		Self {
			name,
			column_index,
			role,
			range,
			valid_count,
			invalid_count: present_count - valid_count,
			missing_count,
		}
	}

	/// Check whether a prediction input value falls inside the range observed during training.
	pub fn contains(&self, value: &Value) -> bool {
		match &self.range {
			FeatureRange::Numerical { min, max, .. } => value
				.as_number()
				.map(|value| *min <= value && value <= *max)
				.unwrap_or(false),
			FeatureRange::Categorical { categories } => value
				.as_category()
				.map(|category| {
					categories
						.binary_search_by(|known| known.as_str().cmp(&*category))
						.is_ok()
				})
				.unwrap_or(false),
		}
	}
}

/// Profile every column of the dataset except the target and the ignored columns, in column order.
pub(crate) fn profile_features(
	dataset: &Dataset,
	target_column_index: usize,
	ignored_columns: &[String],
	progress_counter: &ProgressCounter,
) -> Result<Vec<FeatureProfile>, TrainError> {
	let mut features = Vec::new();
	for (column_index, column_name) in dataset.column_names().iter().enumerate() {
		progress_counter.inc(1);
		if column_index == target_column_index || ignored_columns.contains(column_name) {
			continue;
		}
		let feature = FeatureProfile::compute(
			column_name.clone(),
			column_index,
			dataset.column(column_index),
		);
		log::debug!(
			"profiled feature \"{}\" as {:?} with {} valid, {} invalid, and {} missing values",
			feature.name,
			feature.role,
			feature.valid_count,
			feature.invalid_count,
			feature.missing_count,
		);
		features.push(feature);
	}
	if features.is_empty() {
		return Err(TrainError::NoUsableFeatures);
	}
	Ok(features)
}

#[cfg(test)]
fn test_dataset() -> Dataset {
	use maplit::btreemap;
	Dataset::from_records(vec![
		btreemap! {
			"a_number" => Value::Number(3.0),
			"b_color" => Value::from("red"),
			"c_late_number" => Value::Missing,
			"d_mixed" => Value::from("n/a"),
			"y" => Value::from("A"),
		},
		btreemap! {
			"a_number" => Value::Number(1.0),
			"b_color" => Value::from("blue"),
			"c_late_number" => Value::Number(7.0),
			"d_mixed" => Value::Number(2.0),
			"y" => Value::from("B"),
		},
		btreemap! {
			"a_number" => Value::Number(2.0),
			"b_color" => Value::from("red"),
			"c_late_number" => Value::Number(5.0),
			"d_mixed" => Value::from("unknown"),
			"y" => Value::from("A"),
		},
	])
}

#[test]
fn test_roles() {
	let dataset = test_dataset();
	let features = profile_features(&dataset, 4, &[], &ProgressCounter::new(5)).unwrap();
	let roles: Vec<(&str, ColumnRole)> = features
		.iter()
		.map(|feature| (feature.name.as_str(), feature.role))
		.collect();
	insta::assert_debug_snapshot!(roles, @r###"
 [
     (
         "a_number",
         Numerical,
     ),
     (
         "b_color",
         Categorical,
     ),
     (
         "c_late_number",
         Numerical,
     ),
     (
         "d_mixed",
         Categorical,
     ),
 ]
 "###);
}

#[test]
fn test_ranges() {
	let dataset = test_dataset();
	let features = profile_features(&dataset, 4, &[], &ProgressCounter::new(5)).unwrap();
	assert_eq!(
		features[0].range,
		FeatureRange::Numerical {
			min: 1.0,
			max: 3.0,
			mean: 2.0,
		}
	);
	assert_eq!(
		features[1].range,
		FeatureRange::Categorical {
			categories: vec!["blue".to_owned(), "red".to_owned()],
		}
	);
	assert_eq!(features[2].missing_count, 1);
	assert_eq!(features[2].valid_count, 2);
	assert_eq!(
		features[3].range,
		FeatureRange::Categorical {
			categories: vec!["2".to_owned(), "n/a".to_owned(), "unknown".to_owned()],
		}
	);
	assert!(features[0].contains(&Value::Number(2.5)));
	assert!(!features[0].contains(&Value::Number(3.5)));
	assert!(!features[0].contains(&Value::from("2")));
	assert!(features[1].contains(&Value::from("red")));
	assert!(!features[1].contains(&Value::from("green")));
}

#[test]
fn test_ignored_and_no_usable_features() {
	let dataset = test_dataset();
	let ignored = vec!["b_color".to_owned(), "d_mixed".to_owned()];
	let features = profile_features(&dataset, 4, &ignored, &ProgressCounter::new(5)).unwrap();
	let names: Vec<&str> = features.iter().map(|feature| feature.name.as_str()).collect();
	assert_eq!(names, vec!["a_number", "c_late_number"]);
	let ignored: Vec<String> = ["a_number", "b_color", "c_late_number", "d_mixed"]
		.iter()
		.map(|name| name.to_string())
		.collect();
	assert_eq!(
		profile_features(&dataset, 4, &ignored, &ProgressCounter::new(5)),
		Err(TrainError::NoUsableFeatures)
	);
}

#[test]
fn test_infer_role_ties() {
	let values = vec![Value::Missing, Value::from("x"), Value::Number(1.0)];
	assert_eq!(infer_role(&values), ColumnRole::Categorical);
	let values = vec![Value::Missing, Value::Number(1.0), Value::from("x")];
	assert_eq!(infer_role(&values), ColumnRole::Numerical);
	assert_eq!(infer_role(&[Value::Missing]), ColumnRole::Categorical);
}
