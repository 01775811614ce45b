use std::collections::BTreeSet;
use std::path::Path;

use rand::{Rng, RngCore};

use super::builder::TableBuilder;
use super::generation_input::GenerationInput;
use super::table::{END_CHAR, START_CHAR, Table};
use crate::error::{WagonError, WagonResult};
use crate::io::{extract_words, read_file};
use crate::utils::random_weighted_choice;

/// Anything able to produce a random word of a given length.
///
/// Drivers only need this capability, not the concrete kind of source.
pub trait WordSource {
	/// Generates a random word following `input`.
	///
	/// # Errors
	/// - `GenerationExhausted` if no word satisfies `input`
	/// - `BudgetExceeded` if the draw budget of `input` runs out
	fn random_word(&self, input: &GenerationInput, rng: &mut dyn RngCore) -> WagonResult<String>;
}

impl WordSource for Table {
	fn random_word(&self, input: &GenerationInput, rng: &mut dyn RngCore) -> WagonResult<String> {
		WordGenerator::new(self).generate(input, rng)
	}
}

/// A source of words, as handed to a driver.
///
/// # Variants
/// - `Table`: a table already built (usually loaded from disk).
/// - `Text`: raw corpus words, along with the table built from them once
///   when the source is created.
#[derive(Clone, Debug)]
pub enum Source {
	Table(Table),
	Text { words: Vec<String>, table: Table },
}

impl Source {
	/// Creates a text source, building its table with `builder`.
	pub fn from_words(words: Vec<String>, builder: TableBuilder) -> Self {
		let table = builder.build_parallel(words.clone());
		Self::Text { words, table }
	}

	/// Loads a source from a file.
	///
	/// - `.bin` files are persisted tables.
	/// - Any other file is read as raw text, split into words and built
	///   into a table.
	pub fn from_path<P: AsRef<Path>>(path: P, builder: TableBuilder) -> WagonResult<Self> {
		let path = path.as_ref();
		if path.extension() == Some(std::ffi::OsStr::new("bin")) {
			return Ok(Self::Table(Table::load(path)?));
		}
		let words = read_file(path)?.iter().flat_map(|line| extract_words(line)).collect();
		Ok(Self::from_words(words, builder))
	}

	/// Returns the table words are generated from.
	pub fn table(&self) -> &Table {
		match self {
			Self::Table(table) | Self::Text { table, .. } => table,
		}
	}

	/// Turns this source into its table.
	pub fn into_table(self) -> Table {
		match self {
			Self::Table(table) | Self::Text { table, .. } => table,
		}
	}
}

impl WordSource for Source {
	fn random_word(&self, input: &GenerationInput, rng: &mut dyn RngCore) -> WagonResult<String> {
		self.table().random_word(input, rng)
	}
}

/// Outcome of extending a partial word up to a target length.
enum Extension {
	/// The word reached the target length and satisfies the end constraint.
	Complete(Vec<char>),
	/// Every continuation was tried; holds the longest prefix reached.
	DeadEnd(Vec<char>),
}

/// Counts weighted draws against an optional budget.
struct DrawBudget {
	limit: Option<usize>,
	spent: usize,
}

impl DrawBudget {
	fn new(limit: Option<usize>) -> Self {
		Self { limit, spent: 0 }
	}

	fn spend(&mut self) -> WagonResult<()> {
		if let Some(limit) = self.limit {
			if self.spent >= limit {
				return Err(WagonError::BudgetExceeded(limit));
			}
		}
		self.spent += 1;
		Ok(())
	}
}

/// Generates words of an exact length from a [`Table`].
///
/// # Behavior
/// Each position of the word is filled by a weighted draw over
/// [`Table::weighted_choices`]. When a position cannot be filled, the
/// search backtracks: the character drawn at the previous position is
/// excluded there and another one is drawn. The end sentinel is never
/// drawn, so a word cannot stop early.
///
/// The search is depth-first and iterative: one exclusion set is kept per
/// open position on an explicit stack, so long words do not grow the call
/// stack.
///
/// # Termination
/// Exclusion sets only grow and the alphabet is finite, so every position
/// eventually succeeds or fails, and the depth is bounded by the length.
#[derive(Clone, Copy, Debug)]
pub struct WordGenerator<'a> {
	table: &'a Table,
}

impl<'a> WordGenerator<'a> {
	pub fn new(table: &'a Table) -> Self {
		Self { table }
	}

	/// Generates a random word of exactly `input.length()` characters.
	///
	/// # Behavior
	/// - `StartMode::InModel`: extends from the start sentinel to
	///   `length + 1` characters, then strips the sentinel.
	/// - `StartMode::Anywhere`: picks a first character uniformly among the
	///   single-character contexts; if no word can grow from it, it is
	///   removed and another one is picked.
	///
	/// # Errors
	/// - `InvalidConfiguration` if `length + 1` overflows in `InModel` mode
	/// - `GenerationExhausted` if no word of this length satisfies `input`
	/// - `BudgetExceeded` if `input.max_draws()` is reached
	pub fn generate<R: Rng + ?Sized>(&self, input: &GenerationInput, rng: &mut R) -> WagonResult<String> {
		let length = input.length();
		let mut budget = DrawBudget::new(input.max_draws());

		if input.require_start() {
			let Some(target_length) = length.checked_add(1) else {
				return Err(WagonError::InvalidConfiguration(format!(
					"length {} leaves no room for the start sentinel",
					length
				)));
			};
			return match self.extend(vec![START_CHAR], target_length, input, rng, &mut budget)? {
				Extension::Complete(word) => Ok(word[1..].iter().collect()),
				Extension::DeadEnd(deepest) => Err(WagonError::GenerationExhausted {
					length,
					partial: deepest[1..].iter().collect(),
				}),
			};
		}

		let mut first_letters = self.table.single_characters();
		let mut deepest: Vec<char> = Vec::new();
		while !first_letters.is_empty() {
			let index = rng.random_range(0..first_letters.len());
			match self.extend(vec![first_letters[index]], length, input, rng, &mut budget)? {
				Extension::Complete(word) => return Ok(word.into_iter().collect()),
				Extension::DeadEnd(reached) => {
					log::debug!("no word of length {} starts with {:?}", length, first_letters[index]);
					if reached.len() > deepest.len() {
						deepest = reached;
					}
					first_letters.swap_remove(index);
				}
			}
		}

		if deepest.is_empty() {
			return Err(WagonError::exhausted(length));
		}
		Err(WagonError::GenerationExhausted { length, partial: deepest.into_iter().collect() })
	}

	/// Generates `count` words, each following `input`.
	///
	/// # Errors
	/// Stops at the first generation error.
	pub fn generate_many<R: Rng + ?Sized>(
		&self,
		input: &GenerationInput,
		count: usize,
		rng: &mut R,
	) -> WagonResult<Vec<String>> {
		(0..count).map(|_| self.generate(input, rng)).collect()
	}

	/// Extends `word` with random characters up to `target_length`.
	///
	/// `exclusions[i]` holds the characters already ruled out at position
	/// `base + i`, where `base` is the length of the initial word. The end
	/// sentinel is ruled out everywhere.
	fn extend<R: Rng + ?Sized>(
		&self,
		mut word: Vec<char>,
		target_length: usize,
		input: &GenerationInput,
		rng: &mut R,
		budget: &mut DrawBudget,
	) -> WagonResult<Extension> {
		let base = word.len();
		let mut exclusions: Vec<BTreeSet<char>> = Vec::new();
		let mut deepest = word.clone();

		loop {
			if word.len() > deepest.len() {
				deepest.clone_from(&word);
			}

			if word.len() >= target_length {
				if self.can_end(&word, input.require_end) {
					return Ok(Extension::Complete(word));
				}
				if !Self::backtrack(&mut word, &mut exclusions, base) {
					return Ok(Extension::DeadEnd(deepest));
				}
				continue;
			}

			// Open the exclusion set of this position on first visit
			if exclusions.len() < word.len() - base + 1 {
				exclusions.push(BTreeSet::from([END_CHAR]));
			}
			let Some(exclude) = exclusions.last() else {
				return Ok(Extension::DeadEnd(deepest));
			};

			let context: String = word.iter().collect();
			let choices = self.table.weighted_choices(&context, input.window, exclude, input.flatten);
			if choices.is_empty() {
				if !Self::backtrack(&mut word, &mut exclusions, base) {
					return Ok(Extension::DeadEnd(deepest));
				}
				continue;
			}

			budget.spend()?;
			match random_weighted_choice(&choices, rng) {
				Some(character) => word.push(character),
				None => {
					if !Self::backtrack(&mut word, &mut exclusions, base) {
						return Ok(Extension::DeadEnd(deepest));
					}
				}
			}
		}
	}

	/// Fails the current position.
	///
	/// Closes the exclusion set of the current position, removes the last
	/// drawn character and excludes it at its own position.
	///
	/// Returns `false` if there is nothing left to backtrack to.
	fn backtrack(word: &mut Vec<char>, exclusions: &mut Vec<BTreeSet<char>>, base: usize) -> bool {
		if exclusions.len() > word.len() - base {
			exclusions.pop();
		}
		if word.len() <= base {
			return false;
		}
		match (word.pop(), exclusions.last_mut()) {
			(Some(character), Some(exclude)) => {
				log::trace!("backtracking: {:?} excluded at position {}", character, word.len());
				exclude.insert(character);
				true
			}
			_ => false,
		}
	}

	/// Checks the end constraint on a word of the target length.
	///
	/// Without `require_end` any word may end. Otherwise its last character,
	/// as a bare context, must be followed by the end sentinel in the table.
	fn can_end(&self, word: &[char], require_end: bool) -> bool {
		if !require_end {
			return true;
		}
		word.last()
			.and_then(|last| self.table.get(&last.to_string()))
			.is_some_and(|successors| successors.contains_key(&END_CHAR))
	}
}
