use crate::{train, Model, ProblemType, TrainError, TrainOptions, TrainProgress};
use sapling_dataframe::Dataset;
use std::{
	sync::{
		atomic::{AtomicU64, Ordering},
		Arc, Mutex,
	},
	thread::JoinHandle,
};

/// A `TrainRequest` holds everything a background training run needs.
#[derive(Clone, Debug)]
pub struct TrainRequest {
	pub dataset: Arc<Dataset>,
	pub target_column: String,
	pub ignored_columns: Vec<String>,
	pub problem_type: ProblemType,
	pub options: TrainOptions,
}

/**
A `Trainer` runs training on worker threads and keeps at most one result of interest: the result of the most recent request. Starting a new run does not stop an older one. The older run finishes in the background and its result is discarded when it is joined.
*/
#[derive(Clone, Debug, Default)]
pub struct Trainer {
	latest_generation: Arc<AtomicU64>,
}

/// A `TrainHandle` refers to one training run started by a [`Trainer`](struct.Trainer.html).
#[derive(Debug)]
pub struct TrainHandle {
	generation: u64,
	latest_generation: Arc<AtomicU64>,
	progress: Arc<Mutex<Option<TrainProgress>>>,
	join_handle: JoinHandle<Result<Model, TrainError>>,
}

#[derive(Debug, PartialEq)]
pub enum TrainOutcome {
	/// The run was the most recent one when it was joined.
	Completed(Result<Model, TrainError>),
	/// A newer run was started after this one, so its result was discarded.
	Superseded,
}

impl Trainer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Start training on a new thread. Any run started earlier by this trainer is superseded.
	pub fn spawn(&self, request: TrainRequest) -> TrainHandle {
		let generation = self.latest_generation.fetch_add(1, Ordering::SeqCst) + 1;
		let progress = Arc::new(Mutex::new(None));
		let join_handle = std::thread::spawn({
			let progress = progress.clone();
			move || {
				let TrainRequest {
					dataset,
					target_column,
					ignored_columns,
					problem_type,
					options,
				} = request;
				train(
					&dataset,
					&target_column,
					&ignored_columns,
					problem_type,
					&options,
					&mut |update| {
						if let Ok(mut progress) = progress.lock() {
							progress.replace(update);
						}
					},
				)
			}
		});
		TrainHandle {
			generation,
			latest_generation: self.latest_generation.clone(),
			progress,
			join_handle,
		}
	}
}

impl TrainHandle {
	/// Return true if a newer run was started by the same trainer.
	pub fn is_superseded(&self) -> bool {
		self.latest_generation.load(Ordering::SeqCst) != self.generation
	}

	pub fn is_finished(&self) -> bool {
		self.join_handle.is_finished()
	}

	/// Return the latest progress reported by the run, if it has reported any.
	pub fn progress(&self) -> Option<TrainProgress> {
		self.progress.lock().ok()?.clone()
	}

	/// Wait for the run to finish. If the worker thread panicked, the panic resumes on the calling thread.
	pub fn join(self) -> TrainOutcome {
		let result = match self.join_handle.join() {
			Ok(result) => result,
			Err(panic) => std::panic::resume_unwind(panic),
		};
		if self.latest_generation.load(Ordering::SeqCst) != self.generation {
			log::debug!("discarding the result of superseded training run {}", self.generation);
			return TrainOutcome::Superseded;
		}
		TrainOutcome::Completed(result)
	}
}

#[cfg(test)]
fn test_request(target_column: &str) -> TrainRequest {
	use sapling_dataframe::Value;
	let dataset = Dataset::from_records(vec![
		vec![("x", Value::Number(1.0)), ("y", Value::from("A"))],
		vec![("x", Value::Number(1.0)), ("y", Value::from("A"))],
		vec![("x", Value::Number(5.0)), ("y", Value::from("B"))],
		vec![("x", Value::Number(5.0)), ("y", Value::from("B"))],
	]);
	TrainRequest {
		dataset: Arc::new(dataset),
		target_column: target_column.to_owned(),
		ignored_columns: Vec::new(),
		problem_type: ProblemType::Classification,
		options: TrainOptions::default(),
	}
}

#[test]
fn test_newer_runs_supersede_older_runs() {
	let trainer = Trainer::new();
	let first = trainer.spawn(test_request("y"));
	assert!(!first.is_superseded());
	let second = trainer.spawn(test_request("y"));
	assert!(first.is_superseded());
	assert!(!second.is_superseded());
	assert_eq!(first.join(), TrainOutcome::Superseded);
	match second.join() {
		TrainOutcome::Completed(Ok(model)) => assert_eq!(model.tree.n_leaves(), 2),
		other => panic!("expected the latest run to complete, got {:?}", other),
	}
}

#[test]
fn test_errors_are_reported_by_the_latest_run() {
	let trainer = Trainer::new();
	let handle = trainer.spawn(test_request("z"));
	assert_eq!(
		handle.join(),
		TrainOutcome::Completed(Err(TrainError::TargetColumnNotFound("z".to_owned())))
	);
	// A clone shares the generation counter, so it supersedes runs started by the original.
	let first = trainer.spawn(test_request("y"));
	let _second = trainer.clone().spawn(test_request("y"));
	assert_eq!(first.join(), TrainOutcome::Superseded);
}

#[test]
fn test_progress_is_reported() {
	let trainer = Trainer::new();
	let handle = trainer.spawn(test_request("y"));
	let join_handle_progress = handle.progress.clone();
	assert!(matches!(handle.join(), TrainOutcome::Completed(Ok(_))));
	let progress = join_handle_progress.lock().unwrap().clone();
	match progress {
		Some(TrainProgress::GrowingTree(counter)) => assert_eq!(counter.get(), counter.total()),
		other => panic!("expected the last progress to be the growing phase, got {:?}", other),
	}
}
