use std::sync::{
	atomic::{AtomicU64, Ordering},
	Arc,
};

/// A `ProgressCounter` is a cheaply cloneable counter that one side increments while another side, possibly on a different thread, reads it to display progress.
#[derive(Clone, Debug)]
pub struct ProgressCounter {
	current: Arc<AtomicU64>,
	total: u64,
}

impl ProgressCounter {
	pub fn new(total: u64) -> Self {
		Self {
			current: Arc::new(AtomicU64::new(0)),
			total,
		}
	}
	pub fn total(&self) -> u64 {
		self.total
	}
	pub fn get(&self) -> u64 {
		self.current.load(Ordering::Relaxed)
	}
	pub fn set(&self, value: u64) {
		self.current.store(value, Ordering::Relaxed);
	}
	pub fn inc(&self, amount: u64) {
		self.current.fetch_add(amount, Ordering::Relaxed);
	}
	/// Return the fraction of the total reached so far, capped at one.
	pub fn fraction(&self) -> f64 {
		if self.total == 0 {
			return 1.0;
		}
		(self.get() as f64 / self.total as f64).min(1.0)
	}
}

#[test]
fn test_progress_counter() {
	let counter = ProgressCounter::new(4);
	let clone = counter.clone();
	clone.inc(1);
	clone.inc(2);
	assert_eq!(counter.get(), 3);
	assert!((counter.fraction() - 0.75).abs() < 1e-12);
	counter.set(10);
	assert!((clone.fraction() - 1.0).abs() < 1e-12);
	assert!((ProgressCounter::new(0).fraction() - 1.0).abs() < 1e-12);
}
