use sapling_util::progress_counter::ProgressCounter;

/// This enum reports the training progress. Each phase carries a counter that training increments as it works.
#[derive(Clone, Debug)]
pub enum TrainProgress {
	/// Training is profiling the feature columns. The counter counts columns.
	ProfilingFeatures(ProgressCounter),
	/// Training is growing the tree. The counter counts nodes, and its total is the number of nodes in a full tree of the maximum depth.
	GrowingTree(ProgressCounter),
}
