use std::cmp::Ordering;
use thiserror::Error;

/// A `Finite` is an `f64` that is neither NaN nor infinite. Finite values are totally ordered, so a slice of them can be sorted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Finite(f64);

#[derive(Debug, Error, PartialEq)]
#[error("not finite")]
pub struct NotFiniteError;

impl Finite {
	pub fn new(value: f64) -> Result<Finite, NotFiniteError> {
		if value.is_finite() {
			Ok(Finite(value))
		} else {
			Err(NotFiniteError)
		}
	}

	pub fn get(self) -> f64 {
		self.0
	}
}

impl Eq for Finite {}

impl PartialOrd for Finite {
	fn partial_cmp(&self, other: &Finite) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for Finite {
	fn cmp(&self, other: &Finite) -> Ordering {
		self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
	}
}

/// Compute the median of a slice of finite values, sorting it in place. The median of an even number of values is the mean of the two middle values. Returns `None` for an empty slice.
pub fn median(values: &mut [Finite]) -> Option<f64> {
	if values.is_empty() {
		return None;
	}
	values.sort_unstable();
	let middle = values.len() / 2;
	let median = if values.len() % 2 == 0 {
		(values[middle - 1].get() + values[middle].get()) / 2.0
	} else {
		values[middle].get()
	};
	Some(median)
}

#[test]
fn test_not_finite() {
	assert_eq!(Finite::new(std::f64::NAN), Err(NotFiniteError));
	assert_eq!(Finite::new(std::f64::NEG_INFINITY), Err(NotFiniteError));
	assert_eq!(Finite::new(1.5).map(Finite::get), Ok(1.5));
}

#[test]
fn test_median() {
	let mut values: Vec<Finite> = [5.0, 1.0, 5.0, 1.0]
		.iter()
		.map(|value| Finite::new(*value).unwrap())
		.collect();
	assert_eq!(median(&mut values), Some(3.0));
	let mut values: Vec<Finite> = [4.0, -2.0, 9.0]
		.iter()
		.map(|value| Finite::new(*value).unwrap())
		.collect();
	assert_eq!(median(&mut values), Some(4.0));
	assert_eq!(median(&mut []), None);
}
