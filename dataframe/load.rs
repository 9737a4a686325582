use super::*;
use std::{io::Read, path::Path};

impl Dataset {
	/// Load a dataset from a json file containing an array of row objects.
	pub fn from_path(path: &Path) -> Result<Self, DatasetError> {
		let file = std::fs::File::open(path)?;
		Self::from_reader(std::io::BufReader::new(file))
	}

	pub fn from_reader<R>(reader: R) -> Result<Self, DatasetError>
	where
		R: Read,
	{
		let json: serde_json::Value = serde_json::from_reader(reader)?;
		Self::from_json(&json)
	}

	pub fn from_json_str(json: &str) -> Result<Self, DatasetError> {
		let json: serde_json::Value = serde_json::from_str(json)?;
		Self::from_json(&json)
	}

	/**
	Build a dataset from an already deserialized json array of objects. Keys keep the order they appear in within each object, so the column order of the dataset follows the first row that mentions each column.
	*/
	pub fn from_json(json: &serde_json::Value) -> Result<Self, DatasetError> {
		let records = json.as_array().ok_or(DatasetError::NotAnArray)?;
		let records = records
			.iter()
			.enumerate()
			.map(|(row_index, record)| {
				record
					.as_object()
					.ok_or(DatasetError::RowNotAnObject { row_index })
			})
			.collect::<Result<Vec<_>, _>>()?;
		Ok(Self::from_records(records.into_iter().map(|record| {
			record
				.iter()
				.map(|(column_name, value)| (column_name.clone(), Value::from_json(value)))
		})))
	}
}

#[test]
fn test_from_json_str() {
	let json = r#"[
		{"x": 1, "color": "red", "y": "A"},
		{"x": 2.5, "color": null, "y": "B"},
		{"x": "n/a", "y": "B"}
	]"#;
	let dataset = Dataset::from_json_str(json).unwrap();
	insta::assert_debug_snapshot!(dataset, @r###"
 Dataset {
     column_names: [
         "x",
         "color",
         "y",
     ],
     rows: [
         [
             Number(
                 1.0,
             ),
             Text(
                 "red",
             ),
             Text(
                 "A",
             ),
         ],
         [
             Number(
                 2.5,
             ),
             Missing,
             Text(
                 "B",
             ),
         ],
         [
             Text(
                 "n/a",
             ),
             Missing,
             Text(
                 "B",
             ),
         ],
     ],
 }
 "###);
}

#[test]
fn test_from_json_errors() {
	assert!(matches!(
		Dataset::from_json_str(r#"{"x": 1}"#),
		Err(DatasetError::NotAnArray)
	));
	assert!(matches!(
		Dataset::from_json_str(r#"[{"x": 1}, 2]"#),
		Err(DatasetError::RowNotAnObject { row_index: 1 })
	));
	assert!(matches!(
		Dataset::from_json_str("[{"),
		Err(DatasetError::Json(_))
	));
}
