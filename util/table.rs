use std::fmt;

/// A `Table` renders a header and rows of cells as a plain text table with `|` separated columns, sized to fit the widest cell in each column.
pub struct Table {
	padding: usize,
	header: Vec<String>,
	rows: Vec<Vec<String>>,
}

impl Table {
	pub fn new<S>(header: impl IntoIterator<Item = S>) -> Self
	where
		S: Into<String>,
	{
		Self {
			padding: 1,
			header: header.into_iter().map(Into::into).collect(),
			rows: Vec::new(),
		}
	}

	/// Append a row. Missing cells render empty and extra cells are ignored.
	pub fn push_row<S>(&mut self, row: impl IntoIterator<Item = S>)
	where
		S: Into<String>,
	{
		let mut row: Vec<String> = row.into_iter().map(Into::into).collect();
		row.resize(self.header.len(), String::new());
		self.rows.push(row);
	}
}

impl fmt::Display for Table {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut column_widths: Vec<usize> = self.header.iter().map(|header| header.len()).collect();
		for row in self.rows.iter() {
			for (column_width, value) in column_widths.iter_mut().zip(row.iter()) {
				*column_width = usize::max(*column_width, value.len());
			}
		}
		let line = Line {
			column_widths: &column_widths,
			padding: self.padding,
		};
		let header = Row {
			column_widths: &column_widths,
			padding: self.padding,
			values: &self.header,
		};
		writeln!(f, "{}", header)?;
		writeln!(f, "{}", line)?;
		for values in self.rows.iter() {
			let row = Row {
				column_widths: &column_widths,
				padding: self.padding,
				values,
			};
			writeln!(f, "{}", row)?;
		}
		Ok(())
	}
}

struct Line<'a> {
	column_widths: &'a [usize],
	padding: usize,
}

impl<'a> fmt::Display for Line<'a> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "|")?;
		for column_width in self.column_widths.iter() {
			write!(f, "{}|", "-".repeat(column_width + 2 * self.padding))?;
		}
		Ok(())
	}
}

struct Row<'a> {
	column_widths: &'a [usize],
	padding: usize,
	values: &'a [String],
}

impl<'a> fmt::Display for Row<'a> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "|")?;
		for (column_width, value) in self.column_widths.iter().zip(self.values) {
			let padding = " ".repeat(self.padding);
			let fill = " ".repeat(column_width - value.len());
			write!(f, "{}{}{}{}|", padding, value, fill, padding)?;
		}
		Ok(())
	}
}

#[test]
fn test_table() {
	let mut table = Table::new(vec!["stat", "value"]);
	table.push_row(vec!["rows", "1204"]);
	table.push_row(vec!["depth"]);
	let expected = "\
| stat  | value |
|-------|-------|
| rows  | 1204  |
| depth |       |
";
	assert_eq!(table.to_string(), expected);
}
