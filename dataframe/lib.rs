/*!
This crate provides the tabular data consumed by `sapling_tree`. A [`Dataset`](struct.Dataset.html) is a rectangular collection of rows, like a spreadsheet, where every row has one [`Value`](enum.Value.html) per column. Unlike a typed dataframe, a column does not carry a type of its own. The tree crate decides how to treat each column by profiling its values.
*/

#![allow(clippy::tabs_in_doc_comments)]

use std::{borrow::Cow, collections::BTreeMap};
use thiserror::Error;

mod load;

/// A `Row` maps column names to values. It is the input to a prediction.
pub type Row = BTreeMap<String, Value>;

/// A single cell in a dataset.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Value {
	Number(f64),
	Text(String),
	Missing,
}

#[derive(Debug, Error)]
pub enum DatasetError {
	#[error("row {row_index} has {got} values but the dataset has {expected} columns")]
	RaggedRow {
		row_index: usize,
		expected: usize,
		got: usize,
	},
	#[error("expected a json array of row objects")]
	NotAnArray,
	#[error("row {row_index} is not a json object")]
	RowNotAnObject { row_index: usize },
	#[error(transparent)]
	Json(#[from] serde_json::Error),
	#[error(transparent)]
	Io(#[from] std::io::Error),
}

impl Value {
	/// Return the value as a number if it is a finite number. Missing values, text, and non-finite numbers return `None`.
	pub fn as_number(&self) -> Option<f64> {
		match self {
			Value::Number(value) if value.is_finite() => Some(*value),
			_ => None,
		}
	}

	pub fn is_missing(&self) -> bool {
		matches!(self, Value::Missing)
	}

	/// Return the key used to compare this value for equality with a category. Numbers use their display form, so `1.0` and `"1"` are the same category.
	pub fn as_category(&self) -> Option<Cow<str>> {
		match self {
			Value::Number(value) => Some(Cow::Owned(value.to_string())),
			Value::Text(value) => Some(Cow::Borrowed(value.as_str())),
			Value::Missing => None,
		}
	}

	/// Convert a deserialized json scalar. `null` is missing, numbers are numbers, and every other json value is kept as text.
	pub fn from_json(value: &serde_json::Value) -> Value {
		match value {
			serde_json::Value::Null => Value::Missing,
			serde_json::Value::Number(number) => number
				.as_f64()
				.map(Value::Number)
				.unwrap_or_else(|| Value::Text(number.to_string())),
			serde_json::Value::String(value) => Value::Text(value.clone()),
			other => Value::Text(other.to_string()),
		}
	}
}

impl std::fmt::Display for Value {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Value::Number(value) => write!(f, "{}", value),
			Value::Text(value) => write!(f, "{}", value),
			Value::Missing => write!(f, "null"),
		}
	}
}

impl From<f64> for Value {
	fn from(value: f64) -> Value {
		Value::Number(value)
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Value {
		Value::Text(value.to_owned())
	}
}

impl From<String> for Value {
	fn from(value: String) -> Value {
		Value::Text(value)
	}
}

impl<T> From<Option<T>> for Value
where
	T: Into<Value>,
{
	fn from(value: Option<T>) -> Value {
		value.map(Into::into).unwrap_or(Value::Missing)
	}
}

/// A `Dataset` is an ordered sequence of rows that all share the same columns.
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
	column_names: Vec<String>,
	rows: Vec<Vec<Value>>,
}

impl Dataset {
	/// Create an empty dataset with the given columns.
	pub fn new(column_names: Vec<String>) -> Self {
		Self {
			column_names,
			rows: Vec::new(),
		}
	}

	/// Create a dataset from rows of values in column order.
	pub fn from_rows(column_names: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, DatasetError> {
		let mut dataset = Self::new(column_names);
		for row in rows {
			dataset.push_row(row)?;
		}
		Ok(dataset)
	}

	/**
	Create a dataset from records of `(column name, value)` pairs. The columns are the union of the names in all records, in the order they are first encountered. A record without a value for some column gets `Value::Missing` in that cell.
	*/
	pub fn from_records<R, K>(records: impl IntoIterator<Item = R>) -> Self
	where
		R: IntoIterator<Item = (K, Value)>,
		K: Into<String>,
	{
		let mut column_names: Vec<String> = Vec::new();
		let mut column_indexes: BTreeMap<String, usize> = BTreeMap::new();
		let mut sparse_rows: Vec<Vec<(usize, Value)>> = Vec::new();
		for record in records {
			let mut sparse_row = Vec::new();
			for (column_name, value) in record {
				let column_name = column_name.into();
				let column_index = match column_indexes.get(&column_name) {
					Some(column_index) => *column_index,
					None => {
						let column_index = column_names.len();
						column_names.push(column_name.clone());
						column_indexes.insert(column_name, column_index);
						column_index
					}
				};
				sparse_row.push((column_index, value));
			}
			sparse_rows.push(sparse_row);
		}
		let n_columns = column_names.len();
		let rows = sparse_rows
			.into_iter()
			.map(|sparse_row| {
				let mut row = vec![Value::Missing; n_columns];
				for (column_index, value) in sparse_row {
					row[column_index] = value;
				}
				row
			})
			.collect();
		Self { column_names, rows }
	}

	pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), DatasetError> {
		if row.len() != self.ncols() {
			return Err(DatasetError::RaggedRow {
				row_index: self.rows.len(),
				expected: self.ncols(),
				got: row.len(),
			});
		}
		self.rows.push(row);
		Ok(())
	}

	pub fn nrows(&self) -> usize {
		self.rows.len()
	}

	pub fn ncols(&self) -> usize {
		self.column_names.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	pub fn column_names(&self) -> &[String] {
		&self.column_names
	}

	pub fn column_index(&self, column_name: &str) -> Option<usize> {
		self.column_names
			.iter()
			.position(|name| name == column_name)
	}

	pub fn value(&self, row_index: usize, column_index: usize) -> &Value {
		&self.rows[row_index][column_index]
	}

	/// Iterate over the values of one column from the first row to the last.
	pub fn column(&self, column_index: usize) -> impl Iterator<Item = &Value> + Clone + '_ {
		self.rows.iter().map(move |row| &row[column_index])
	}

	/// Build the `Row` for the row at `row_index`, for example to predict on a training row.
	pub fn row_map(&self, row_index: usize) -> Row {
		self.column_names
			.iter()
			.cloned()
			.zip(self.rows[row_index].iter().cloned())
			.collect()
	}
}

#[test]
fn test_from_records() {
	use maplit::btreemap;
	let records = vec![
		vec![("x", Value::Number(1.0)), ("y", Value::from("A"))],
		vec![("y", Value::from("B")), ("z", Value::from("extra"))],
	];
	let dataset = Dataset::from_records(records);
	assert_eq!(dataset.column_names(), &["x", "y", "z"]);
	assert_eq!(dataset.nrows(), 2);
	assert_eq!(dataset.value(1, 0), &Value::Missing);
	assert_eq!(dataset.value(0, 2), &Value::Missing);
	assert_eq!(
		dataset.row_map(1),
		btreemap! {
			"x".to_owned() => Value::Missing,
			"y".to_owned() => Value::from("B"),
			"z".to_owned() => Value::from("extra"),
		}
	);
}

#[test]
fn test_ragged_row() {
	let result = Dataset::from_rows(
		vec!["x".to_owned(), "y".to_owned()],
		vec![
			vec![Value::Number(1.0), Value::from("A")],
			vec![Value::Number(2.0)],
		],
	);
	match result {
		Err(DatasetError::RaggedRow {
			row_index,
			expected,
			got,
		}) => assert_eq!((row_index, expected, got), (1, 2, 1)),
		other => panic!("expected a ragged row error, got {:?}", other),
	}
}

#[test]
fn test_value_accessors() {
	assert_eq!(Value::Number(2.5).as_number(), Some(2.5));
	assert_eq!(Value::Number(std::f64::NAN).as_number(), None);
	assert_eq!(Value::from("2.5").as_number(), None);
	assert_eq!(Value::Number(1.0).as_category().as_deref(), Some("1"));
	assert_eq!(Value::from("red").as_category().as_deref(), Some("red"));
	assert_eq!(Value::Missing.as_category(), None);
	assert_eq!(Value::from(None::<f64>), Value::Missing);
	assert_eq!(Value::from_json(&serde_json::json!(true)), Value::from("true"));
	assert_eq!(Value::from_json(&serde_json::json!(null)), Value::Missing);
}
