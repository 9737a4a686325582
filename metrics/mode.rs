use super::Metric;

/// The mode is the index of the largest count. When several counts tie for the largest, the first one wins, so callers that order counts by first appearance get the first encountered value. The output is `None` for empty input.
#[derive(Debug, Clone, Default)]
pub struct Mode;

impl<'a> Metric<'a> for Mode {
	type Input = &'a [usize];
	type Output = Option<usize>;

	fn compute(counts: &'a [usize]) -> Option<usize> {
		let mut mode: Option<(usize, usize)> = None;
		for (index, count) in counts.iter().enumerate() {
			match mode {
				Some((_, best_count)) if *count <= best_count => {}
				_ => mode = Some((index, *count)),
			}
		}
		mode.map(|(index, _)| index)
	}
}

#[test]
fn test_mode() {
	assert_eq!(Mode::compute(&[]), None);
	assert_eq!(Mode::compute(&[1, 3, 2]), Some(1));
	assert_eq!(Mode::compute(&[2, 3, 3]), Some(1));
	assert_eq!(Mode::compute(&[4, 4]), Some(0));
}
