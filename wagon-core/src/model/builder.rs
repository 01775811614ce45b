use std::sync::mpsc;
use std::thread;

use super::table::{END_CHAR, START_CHAR, Table};

/// Builds a [`Table`] from a corpus of words.
///
/// # Configuration
/// - `prefix`: if greater than 0, contexts are at most `prefix + 1`
///   characters long; 0 means unbounded.
/// - `flatten`: if set, every observed transition weighs exactly 1,
///   whatever its number of occurrences.
///
/// Building is a pure function of the words and the configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TableBuilder {
	prefix: usize,
	flatten: bool,
}

impl TableBuilder {
	/// Creates a builder with an unbounded prefix and counted weights.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the maximum prefix length (0 = unbounded).
	pub fn prefix(mut self, prefix: usize) -> Self {
		self.prefix = prefix;
		self
	}

	/// Sets the flatten mode.
	pub fn flatten(mut self, flatten: bool) -> Self {
		self.flatten = flatten;
		self
	}

	pub fn prefix_bound(&self) -> usize {
		self.prefix
	}

	pub fn is_flatten(&self) -> bool {
		self.flatten
	}

	/// Builds the table of `words`.
	///
	/// Each word is wrapped as `">" + word + "<"`. Then, for every start
	/// position and every end position after it (bounded by the prefix),
	/// the sub-word `word[start..end]` is recorded as a context followed by
	/// `word[end]`.
	///
	/// # Notes
	/// - Words are sequences of `char`s; sentinels must not appear in them.
	/// - Empty words are ignored.
	///
	/// # Example
	/// Building from `["abaq"]` yields, among others,
	/// `"a" -> {b: 1, q: 1}`, `"ab" -> {a: 1}` and `"q" -> {<: 1}`.
	pub fn build<I, S>(&self, words: I) -> Table
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut table = Table::default();
		let mut count = 0usize;
		for word in words {
			let word = word.as_ref();
			if word.is_empty() {
				continue;
			}
			self.add_word(&mut table, word);
			count += 1;
		}
		log::debug!(
			"built table from {} words: {} contexts, {} pairs",
			count,
			table.len(),
			table.pairs()
		);
		table
	}

	/// Records every (context, successor) pair of a single word.
	fn add_word(&self, table: &mut Table, word: &str) {
		let chars: Vec<char> = std::iter::once(START_CHAR)
			.chain(word.chars())
			.chain(std::iter::once(END_CHAR))
			.collect();
		let last = chars.len() - 1;

		for start in 0..last {
			let max_end = if self.prefix == 0 { last } else { (start + self.prefix + 1).min(last) };
			for end in start + 1..=max_end {
				let sub_word: String = chars[start..end].iter().collect();
				table.observe(sub_word, chars[end], self.flatten);
			}
		}
	}

	/// Builds the table of `words` using several threads.
	///
	/// # Behavior
	/// - Splits the words into chunks (based on CPU cores * factor).
	/// - Spawns threads to build partial tables for each chunk.
	/// - Merges all partial tables sequentially.
	///
	/// The result is the same as [`TableBuilder::build`].
	pub fn build_parallel(&self, words: Vec<String>) -> Table {
		if words.is_empty() {
			return Table::default();
		}

		let cpus = num_cpus::get();
		let factor = 8;
		let chunks = cpus * factor;
		let chunk_size = words.len().div_ceil(chunks).max(1);

		let (tx, rx) = mpsc::channel();
		for chunk in words.chunks(chunk_size) {
			let tx = tx.clone();
			let chunk: Vec<String> = chunk.to_vec();
			let builder = *self;

			thread::spawn(move || {
				let mut partial_table = Table::default();
				for word in chunk.iter().filter(|word| !word.is_empty()) {
					builder.add_word(&mut partial_table, word);
				}
				// The receiver outlives every sender
				let _ = tx.send(partial_table);
			});
		}
		drop(tx);

		let mut final_table = Table::default();
		for partial_table in rx.iter() {
			final_table.merge(partial_table, self.flatten);
		}
		log::debug!(
			"built table from {} words in parallel: {} contexts, {} pairs",
			words.len(),
			final_table.len(),
			final_table.pairs()
		);
		final_table
	}
}
