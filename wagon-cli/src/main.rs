use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use wagon_core::io::{extract_words, read_file};
use wagon_core::utils::{natural, nonzero_natural};
use wagon_core::{GenerationInput, Source, StartMode, TableBuilder, WordSource};

/// Random word generator.
#[derive(Parser, Debug)]
#[command(name = "wagon", version, about = "Build tables of sub-word statistics and generate random words from them")]
struct Cli {
	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Extract a table from the given text
	Table {
		/// The text to analyse
		text: PathBuf,

		/// If not 0, the maximum length of prefixes to store
		#[arg(short, long, default_value = "0", value_parser = parse_natural)]
		prefix: usize,

		/// Flatten the table
		#[arg(short, long)]
		flatten: bool,

		/// Also check that the table is complete
		#[arg(short, long)]
		check: bool,

		/// The output destination; if missing, print the table
		#[arg(short, long)]
		output: Option<PathBuf>,
	},

	/// Generate random words from a table (`.bin`) or a raw text
	Word {
		/// The table or text to generate from
		source: PathBuf,

		/// The length of generated words
		#[arg(short, long, default_value = "10", value_parser = parse_nonzero_natural)]
		length: usize,

		/// The number of words to generate
		#[arg(short, long, default_value = "10", value_parser = parse_natural)]
		count: usize,

		/// If not 0, the maximum length of prefixes to consider when choosing the next character
		#[arg(short, long, default_value = "0", value_parser = parse_natural)]
		prefix: usize,

		/// Generate words starting as words of the table
		#[arg(short, long)]
		start: bool,

		/// Generate words ending as words of the table
		#[arg(short, long)]
		end: bool,

		/// Consider the table as flattened
		#[arg(short, long)]
		flatten: bool,

		/// Seed of the random generator, for reproducible words
		#[arg(long)]
		seed: Option<u64>,

		/// Give up after this many weighted draws per word
		#[arg(long, value_parser = parse_nonzero_natural)]
		max_draws: Option<usize>,
	},
}

fn parse_natural(value: &str) -> Result<usize, String> {
	natural(value).map_err(|e| e.to_string())
}

fn parse_nonzero_natural(value: &str) -> Result<usize, String> {
	nonzero_natural(value).map_err(|e| e.to_string())
}

fn main() -> anyhow::Result<()> {
	env_logger::init();

	match Cli::parse().command {
		Command::Table { text, prefix, flatten, check, output } => {
			let words: Vec<String> = read_file(&text)
				.with_context(|| format!("cannot read {}", text.display()))?
				.iter()
				.flat_map(|line| extract_words(line))
				.collect();
			log::info!("{} words read from {}", words.len(), text.display());

			let table = TableBuilder::new().prefix(prefix).flatten(flatten).build_parallel(words);
			if check {
				log::info!("strict completeness: {}", table.is_complete());
				if !table.is_complete_ignoring_end() {
					let dead_ends: String = table.dead_ends().into_iter().filter(|c| *c != wagon_core::END_CHAR).collect();
					bail!("the given text yields an incomplete table (dead ends: {:?})", dead_ends);
				}
			}

			match output {
				Some(path) => {
					table.save(&path).with_context(|| format!("cannot write {}", path.display()))?;
					log::info!("table of {} contexts written to {}", table.len(), path.display());
				}
				None => println!("{}", table),
			}
		}
		Command::Word { source, length, count, prefix, start, end, flatten, seed, max_draws } => {
			let mut input = GenerationInput::new(length)?;
			input.window = prefix;
			input.require_end = end;
			input.flatten = flatten;
			input.set_max_draws(max_draws)?;
			if start {
				input.start = StartMode::InModel;
			}

			let builder = TableBuilder::new().flatten(flatten);
			let source = Source::from_path(&source, builder)
				.with_context(|| format!("cannot load {}", source.display()))?;

			let mut rng: Box<dyn RngCore> = match seed {
				Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
				None => Box::new(rand::rng()),
			};
			for _ in 0..count {
				println!("{}", source.random_word(&input, rng.as_mut())?);
			}
		}
	}

	Ok(())
}
