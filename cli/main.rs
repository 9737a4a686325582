//! This module contains the main entrypoint to the sapling cli.

use self::config::Config;
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use sapling_dataframe::{Dataset, Row};
use sapling_tree::{
	Model, Node, ProblemType, TrainError, TrainOutcome, TrainProgress, TrainRequest, Trainer,
};
use sapling_util::table::Table;
use std::{
	io::{BufReader, BufWriter},
	path::{Path, PathBuf},
	sync::Arc,
	time::Duration,
};

mod config;

#[derive(Parser)]
#[clap(about = "Learn a decision tree from a json dataset and make predictions with it.")]
enum Options {
	#[clap(name = "train")]
	Train(TrainArgs),
	#[clap(name = "predict")]
	Predict(PredictArgs),
}

#[derive(Parser, Debug)]
#[clap(about = "train a decision tree")]
#[clap(long_about = "train a decision tree from a json file containing an array of row objects")]
struct TrainArgs {
	#[clap(short, long, help = "the path to your .json file")]
	file: PathBuf,
	#[clap(short, long, help = "the name of the column to predict")]
	target: Option<String>,
	#[clap(long = "ignore", help = "a column to leave out of training")]
	ignore: Vec<String>,
	#[clap(long, help = "classification or regression")]
	problem_type: Option<ProblemType>,
	#[clap(short, long, help = "the path to a config file")]
	config: Option<PathBuf>,
	#[clap(short, long, help = "the path to write the model to")]
	output: Option<PathBuf>,
	#[clap(long = "no-progress", help = "disable the progress display", parse(from_flag = std::ops::Not::not))]
	progress: bool,
}

#[derive(Parser, Debug)]
#[clap(about = "make predictions with a trained tree")]
struct PredictArgs {
	#[clap(short, long, help = "the path to a model written by sapling train")]
	model: PathBuf,
	#[clap(short, long, help = "a json object, or an array of json objects, to predict")]
	input: Option<String>,
	#[clap(long, help = "the path to a json file containing the rows to predict")]
	input_file: Option<PathBuf>,
}

fn main() {
	let options = Options::parse();
	let env = env_logger::Env::default().default_filter_or("info");
	env_logger::Builder::from_env(env)
		.format_module_path(false)
		.format_timestamp(None)
		.init();
	let result = match options {
		Options::Train(args) => cli_train(args),
		Options::Predict(args) => cli_predict(args),
	};
	if let Err(error) = result {
		eprintln!("{}: {:#}", "error".red().bold(), error);
		std::process::exit(1);
	}
}

fn cli_train(args: TrainArgs) -> Result<()> {
	let config = match args.config.as_deref() {
		Some(config_path) => Config::from_path(config_path)?,
		None => Config::default(),
	};
	let dataset = Dataset::from_path(&args.file)
		.with_context(|| format!("failed to load dataset {}", args.file.display()))?;
	let target_column = args
		.target
		.clone()
		.or_else(|| config.target.clone())
		.ok_or_else(|| anyhow!("no target column, pass --target or set target in a config file"))?;
	let ignored_columns = if args.ignore.is_empty() {
		config.ignored_columns.clone().unwrap_or_default()
	} else {
		args.ignore.clone()
	};
	let problem_type = match args.problem_type.or(config.problem_type) {
		Some(problem_type) => problem_type,
		None => {
			let target_column_index = dataset
				.column_index(&target_column)
				.ok_or_else(|| TrainError::TargetColumnNotFound(target_column.clone()))?;
			let problem_type = ProblemType::infer(&dataset, target_column_index);
			log::info!("inferred the problem type {} from \"{}\"", problem_type, target_column);
			problem_type
		}
	};

	// Train on a worker thread so the progress display can update while training runs.
	let trainer = Trainer::new();
	let handle = trainer.spawn(TrainRequest {
		dataset: Arc::new(dataset),
		target_column,
		ignored_columns,
		problem_type,
		options: config.train_options(),
	});
	if args.progress {
		while !handle.is_finished() {
			if let Some(progress) = handle.progress() {
				print_progress(&progress);
			}
			std::thread::sleep(Duration::from_millis(15));
		}
		if let Some(progress) = handle.progress() {
			print_progress(&progress);
		}
		eprintln!();
	}
	let model = match handle.join() {
		TrainOutcome::Completed(result) => result?,
		TrainOutcome::Superseded => bail!("training was superseded by a newer run"),
	};

	print_summary(&model);

	// Retrieve the output path from the command line arguments or generate a default.
	let output_path = match args.output {
		Some(output) => output,
		None => {
			let dir = std::env::current_dir()?;
			let name = args
				.file
				.file_stem()
				.and_then(|file_stem| file_stem.to_str())
				.unwrap_or("model");
			available_path(&dir, name, "model.json")?
		}
	};

	// Write the model to the output path.
	let file = std::fs::File::create(&output_path)
		.with_context(|| format!("failed to create {}", output_path.display()))?;
	serde_json::to_writer_pretty(BufWriter::new(file), &model)
		.with_context(|| format!("failed to write the model to {}", output_path.display()))?;
	eprintln!("Your model was written to {}.", output_path.display());
	eprintln!(
		"To make predictions, run `sapling predict --model {} --input '{{...}}'`.",
		output_path.display()
	);

	Ok(())
}

fn cli_predict(args: PredictArgs) -> Result<()> {
	let file = std::fs::File::open(&args.model)
		.with_context(|| format!("failed to open model {}", args.model.display()))?;
	let model: Model = serde_json::from_reader(BufReader::new(file))
		.with_context(|| format!("failed to read model {}", args.model.display()))?;
	let input: serde_json::Value = match (args.input, args.input_file) {
		(Some(input), None) => serde_json::from_str(&input).context("failed to parse --input")?,
		(None, Some(input_file)) => {
			let file = std::fs::File::open(&input_file)
				.with_context(|| format!("failed to open {}", input_file.display()))?;
			serde_json::from_reader(BufReader::new(file))
				.with_context(|| format!("failed to parse {}", input_file.display()))?
		}
		_ => bail!("pass exactly one of --input or --input-file"),
	};
	for (row_index, row) in rows_from_json(input)?.iter().enumerate() {
		let prediction = model
			.predict(row)
			.with_context(|| format!("failed to predict row {}", row_index))?;
		println!("{}", serde_json::to_string(&prediction)?);
	}
	Ok(())
}

/// Convert a json object, or an array of json objects, into rows to predict.
fn rows_from_json(json: serde_json::Value) -> Result<Vec<Row>> {
	let json = match json {
		serde_json::Value::Object(_) => serde_json::Value::Array(vec![json]),
		json => json,
	};
	let dataset = Dataset::from_json(&json)?;
	Ok((0..dataset.nrows())
		.map(|row_index| dataset.row_map(row_index))
		.collect())
}

fn print_progress(progress: &TrainProgress) {
	let (title, progress_counter) = match progress {
		TrainProgress::ProfilingFeatures(progress_counter) => ("profiling features", progress_counter),
		TrainProgress::GrowingTree(progress_counter) => ("growing tree", progress_counter),
	};
	eprint!(
		"\r{:<18} {:>3.0}%",
		title,
		progress_counter.fraction() * 100.0
	);
}

fn print_summary(model: &Model) {
	let stats = &model.stats;
	let mut table = Table::new(vec!["stat", "value"]);
	table.push_row(vec!["problem type".to_owned(), model.problem_type.to_string()]);
	table.push_row(vec!["rows".to_owned(), stats.n_rows.to_string()]);
	table.push_row(vec![
		"rows skipped".to_owned(),
		stats.n_rows_skipped.to_string(),
	]);
	table.push_row(vec!["features".to_owned(), stats.n_features.to_string()]);
	table.push_row(vec!["nodes".to_owned(), stats.n_nodes.to_string()]);
	table.push_row(vec!["leaves".to_owned(), stats.n_leaves.to_string()]);
	table.push_row(vec!["depth".to_owned(), stats.depth.to_string()]);
	if let Some(training_metric) = &stats.training_metric {
		table.push_row(vec!["training".to_owned(), training_metric.to_string()]);
	}
	println!("{}", table);

	let mut feature_importances: Vec<(&str, f64)> = model
		.features
		.iter()
		.zip(model.feature_importances.iter())
		.map(|(feature, importance)| (feature.name.as_str(), *importance))
		.collect();
	feature_importances.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
	let mut table = Table::new(vec!["feature", "importance"]);
	for (name, importance) in feature_importances {
		table.push_row(vec![name.to_owned(), format!("{:.4}", importance)]);
	}
	println!("{}", table);

	for line in tree_lines(model) {
		println!("{}", line);
	}
}

/// Render the tree as indented lines, one per node, with each branch followed by its left and then its right subtree.
fn tree_lines(model: &Model) -> Vec<String> {
	let mut lines = Vec::new();
	let mut stack = vec![(0, 0, "")];
	while let Some((node_index, depth, prefix)) = stack.pop() {
		let indent = "  ".repeat(depth);
		match model.tree.nodes.get(node_index) {
			Some(Node::Branch(branch)) => {
				lines.push(format!(
					"{}{}{} (gain {:.4}, {} examples)",
					indent,
					prefix,
					model.describe_split(&branch.split),
					branch.gain,
					branch.examples_count,
				));
				stack.push((branch.right_child_index, depth + 1, "else: "));
				stack.push((branch.left_child_index, depth + 1, "then: "));
			}
			Some(Node::Leaf(leaf)) => {
				let value = serde_json::to_string(&leaf.value).unwrap_or_default();
				lines.push(format!(
					"{}{}{} ({} examples)",
					indent, prefix, value, leaf.examples_count
				));
			}
			None => {}
		}
	}
	lines
}

/// This function checks if a file with the given name and extension already exists at the path `base`, and if it does, it appends " 1", " 2", etc. to it until it finds a name that will not overwrite an existing file.
fn available_path(dir: &Path, name: &str, extension: &str) -> Result<PathBuf> {
	let mut i = 0;
	loop {
		let mut filename = String::new();
		filename.push_str(name);
		if i > 0 {
			filename.push(' ');
			filename.push_str(&i.to_string());
		}
		filename.push('.');
		filename.push_str(extension);
		let path = dir.join(filename);
		match std::fs::metadata(&path) {
			// If a file at the path does not exist, return the path.
			Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(path),
			Err(error) => return Err(error.into()),
			// If a file at the path exists, try the next number.
			Ok(_) => i += 1,
		}
	}
}

#[test]
fn test_rows_from_json() {
	use maplit::btreemap;
	use sapling_dataframe::Value;
	let rows = rows_from_json(serde_json::json!({ "x": 2, "color": "red" })).unwrap();
	assert_eq!(
		rows,
		vec![btreemap! {
			"color".to_owned() => Value::from("red"),
			"x".to_owned() => Value::Number(2.0),
		}]
	);
	let rows = rows_from_json(serde_json::json!([{ "x": 2 }, { "color": null }])).unwrap();
	assert_eq!(rows.len(), 2);
	assert_eq!(rows[1]["x"], Value::Missing);
	assert!(rows_from_json(serde_json::json!(3)).is_err());
}

#[test]
fn test_tree_lines() {
	use sapling_dataframe::Value;
	use sapling_tree::{train, TrainOptions};
	let dataset = Dataset::from_records(vec![
		vec![("x", Value::Number(1.0)), ("y", Value::from("A"))],
		vec![("x", Value::Number(1.0)), ("y", Value::from("A"))],
		vec![("x", Value::Number(5.0)), ("y", Value::from("B"))],
		vec![("x", Value::Number(5.0)), ("y", Value::from("B"))],
	]);
	let model = train(
		&dataset,
		"y",
		&[],
		ProblemType::Classification,
		&TrainOptions::default(),
		&mut |_| {},
	)
	.unwrap();
	insta::assert_debug_snapshot!(tree_lines(&model), @r###"
 [
     "x <= 3 (gain 1.0000, 4 examples)",
     "  then: {\"type\":\"classification\",\"class\":\"A\",\"confidence\":100.0} (2 examples)",
     "  else: {\"type\":\"classification\",\"class\":\"B\",\"confidence\":100.0} (2 examples)",
 ]
 "###);
}

#[test]
fn test_model_json_keeps_thresholds_exact() {
	use maplit::btreemap;
	use sapling_dataframe::Value;
	use sapling_tree::{train, BranchSplit, TrainOptions};
	let dataset = Dataset::from_records(vec![
		vec![("x", Value::Number(0.1)), ("y", Value::from("A"))],
		vec![("x", Value::Number(0.1)), ("y", Value::from("A"))],
		vec![("x", Value::Number(0.7)), ("y", Value::from("B"))],
		vec![("x", Value::Number(0.7)), ("y", Value::from("B"))],
	]);
	let model = train(
		&dataset,
		"y",
		&[],
		ProblemType::Classification,
		&TrainOptions::default(),
		&mut |_| {},
	)
	.unwrap();
	let threshold = |model: &Model| match &model.tree.nodes[0] {
		Node::Branch(branch) => match &branch.split {
			BranchSplit::Numerical(split) => split.threshold,
			BranchSplit::Categorical(_) => panic!("expected a numerical split"),
		},
		Node::Leaf(_) => panic!("expected a branch at the root"),
	};
	let reloaded: Model = serde_json::from_str(&serde_json::to_string(&model).unwrap()).unwrap();
	assert_eq!(threshold(&reloaded).to_bits(), threshold(&model).to_bits());
	let at_threshold = btreemap! { "x".to_owned() => Value::Number(threshold(&model)) };
	assert_eq!(
		reloaded.predict(&at_threshold).unwrap().path,
		model.predict(&at_threshold).unwrap().path
	);
}
