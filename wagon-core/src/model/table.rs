use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::builder::TableBuilder;
use crate::error::WagonResult;
use crate::io::{build_output_path, extract_words, read_file};

/// Sentinel prepended to every training word.
pub const START_CHAR: char = '>';

/// Sentinel appended to every training word.
pub const END_CHAR: char = '<';

/// Successors of a single context, with their weights.
pub type Successors = BTreeMap<char, u64>;

/// A table of sub-word statistics.
///
/// A `Table` maps a context (a non-empty string) to the characters observed
/// right after it, each with a strictly positive weight. Given `t` a table,
/// `t.get(s)[c]` is the weight of `c` following `s`. Absent pairs have a
/// zero probability and are never stored.
///
/// Every training word is bracketed with [`START_CHAR`] and [`END_CHAR`],
/// so both sentinels show up in the table: `>` as a context, `<` as a
/// successor.
///
/// ## Invariants
/// - Context keys are never empty
/// - Every stored weight is `>= 1`
/// - A table is immutable once built; generation only reads it
///
/// Ordered maps are used so that iteration, and therefore every weighted
/// draw, is reproducible from a seeded random generator.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
	content: BTreeMap<String, Successors>,
}

impl Table {
	/// Creates a table from raw content.
	///
	/// Empty contexts, zero weights and contexts left without successors
	/// are dropped so the table invariants hold.
	pub fn from_content(content: BTreeMap<String, Successors>) -> Self {
		let content = content
			.into_iter()
			.filter(|(context, _)| !context.is_empty())
			.map(|(context, successors)| {
				let successors: Successors = successors.into_iter().filter(|(_, weight)| *weight > 0).collect();
				(context, successors)
			})
			.filter(|(_, successors)| !successors.is_empty())
			.collect();
		Self { content }
	}

	/// Builds a table from a raw text file, or loads its cached binary.
	///
	/// - The cache lives next to `filepath`, its extension encodes the
	///   builder configuration (ex. `names.p3f.bin`).
	/// - If the cache does not exist, words are extracted from the text,
	///   the table is built in parallel and the cache is written.
	pub fn from_text_file<P: AsRef<Path>>(filepath: P, builder: &TableBuilder) -> WagonResult<Self> {
		let extension = format!(
			"p{}{}.bin",
			builder.prefix_bound(),
			if builder.is_flatten() { "f" } else { "" }
		);
		let binary_data_path = build_output_path(&filepath, &extension)?;
		if binary_data_path.exists() {
			log::debug!("loading cached table {}", binary_data_path.display());
			return Self::load(binary_data_path);
		}

		let words: Vec<String> = read_file(&filepath)?
			.iter()
			.flat_map(|line| extract_words(line))
			.collect();
		let table = builder.build_parallel(words);
		table.save(&binary_data_path)?;
		Ok(table)
	}

	/// Returns the successors of `context`, if it is a known context.
	pub fn get(&self, context: &str) -> Option<&Successors> {
		self.content.get(context)
	}

	/// Returns `true` if `context` is a key of this table.
	pub fn contains(&self, context: &str) -> bool {
		self.content.contains_key(context)
	}

	/// Number of contexts.
	pub fn len(&self) -> usize {
		self.content.len()
	}

	pub fn is_empty(&self) -> bool {
		self.content.is_empty()
	}

	/// Number of (context, successor) pairs.
	pub fn pairs(&self) -> usize {
		self.content.values().map(BTreeMap::len).sum()
	}

	/// Iterates over contexts and their successors, in context order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &Successors)> {
		self.content.iter().map(|(context, successors)| (context.as_str(), successors))
	}

	/// Iterates over context keys, in order.
	pub fn contexts(&self) -> impl Iterator<Item = &str> {
		self.content.keys().map(String::as_str)
	}

	/// Returns the single-character contexts, sentinels excluded.
	///
	/// These are the candidate first characters of a generated word.
	pub fn single_characters(&self) -> Vec<char> {
		self.contexts()
			.filter_map(|context| {
				let mut chars = context.chars();
				match (chars.next(), chars.next()) {
					(Some(c), None) if c != START_CHAR && c != END_CHAR => Some(c),
					_ => None,
				}
			})
			.collect()
	}

	/// Checks that this table is complete.
	///
	/// A table is complete if every successor it holds is itself a
	/// single-character context, so any produced character can be followed
	/// by a new one.
	///
	/// # Notes
	/// - `<` is a successor in any table built from a non-empty corpus but
	///   never a context, so such tables are reported incomplete. Use
	///   [`Table::is_complete_ignoring_end`] to exempt it.
	pub fn is_complete(&self) -> bool {
		self.content
			.values()
			.flat_map(BTreeMap::keys)
			.all(|successor| self.contains_char(*successor))
	}

	/// Like [`Table::is_complete`], with the end sentinel exempted.
	pub fn is_complete_ignoring_end(&self) -> bool {
		self.content
			.values()
			.flat_map(BTreeMap::keys)
			.all(|successor| *successor == END_CHAR || self.contains_char(*successor))
	}

	/// Returns the successors that are not themselves contexts.
	pub fn dead_ends(&self) -> BTreeSet<char> {
		self.content
			.values()
			.flat_map(BTreeMap::keys)
			.filter(|successor| !self.contains_char(**successor))
			.copied()
			.collect()
	}

	fn contains_char(&self, character: char) -> bool {
		let mut buffer = [0u8; 4];
		self.content.contains_key(&*character.encode_utf8(&mut buffer))
	}

	/// Returns the weighted choices of the character following `word`.
	///
	/// Every suffix of `word` (only the trailing `window` characters when
	/// `window > 0`) is looked up, from the shortest to the longest:
	/// - successors in `exclude` are skipped;
	/// - the weight of a successor is `1` if `flatten`, its stored weight
	///   otherwise;
	/// - weights are multiplied by a running scale, then accumulated per
	///   successor;
	/// - after each suffix, the scale grows by the mass that suffix added.
	///
	/// A longer suffix therefore always outweighs all shorter ones combined,
	/// while the shorter alternatives stay possible.
	///
	/// Returns an empty map if no suffix has a non-excluded successor.
	pub fn weighted_choices(&self, word: &str, window: usize, exclude: &BTreeSet<char>, flatten: bool) -> Successors {
		let chars: Vec<char> = word.chars().collect();
		let longest = if window > 0 { window.min(chars.len()) } else { chars.len() };

		let mut weighted_choices = Successors::new();
		let mut scale: u64 = 1;
		for size in 1..=longest {
			let sub_word: String = chars[chars.len() - size..].iter().collect();
			let mut current_sum: u64 = 0;
			if let Some(successors) = self.content.get(&sub_word) {
				for (successor, weight) in successors {
					if exclude.contains(successor) {
						continue;
					}
					let weight = if flatten { 1 } else { *weight };
					let weight = weight.saturating_mul(scale);
					let total = weighted_choices.entry(*successor).or_insert(0);
					*total = total.saturating_add(weight);
					current_sum = current_sum.saturating_add(weight);
				}
			}
			scale = scale.saturating_add(current_sum);
		}
		weighted_choices
	}

	/// Merges another table into this one.
	///
	/// Weights of matching pairs are summed, or kept at `1` if `flatten`.
	/// Used to combine partial tables built from disjoint chunks of a
	/// corpus; not meant for tables already handed to generation.
	pub(crate) fn merge(&mut self, other: Self, flatten: bool) {
		for (context, successors) in other.content {
			let existing = self.content.entry(context).or_default();
			for (successor, weight) in successors {
				let stored = existing.entry(successor).or_insert(0);
				*stored = if flatten { 1 } else { stored.saturating_add(weight) };
			}
		}
	}

	/// Inserts one observation of `successor` after `context`.
	pub(crate) fn observe(&mut self, context: String, successor: char, flatten: bool) {
		let weight = self.content.entry(context).or_default().entry(successor).or_insert(0);
		*weight = if flatten { 1 } else { *weight + 1 };
	}

	/// Encodes this table with `postcard`.
	pub fn to_bytes(&self) -> WagonResult<Vec<u8>> {
		Ok(postcard::to_stdvec(self)?)
	}

	/// Decodes a table encoded by [`Table::to_bytes`].
	///
	/// The decoded content is re-checked against the table invariants.
	pub fn from_bytes(bytes: &[u8]) -> WagonResult<Self> {
		let table: Self = postcard::from_bytes(bytes)?;
		Ok(Self::from_content(table.content))
	}

	/// Writes this table to `path`.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> WagonResult<()> {
		std::fs::write(path, self.to_bytes()?)?;
		Ok(())
	}

	/// Reads a table written by [`Table::save`].
	pub fn load<P: AsRef<Path>>(path: P) -> WagonResult<Self> {
		let bytes = std::fs::read(path)?;
		Self::from_bytes(&bytes)
	}
}

impl fmt::Display for Table {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{{")?;
		for (index, (context, successors)) in self.content.iter().enumerate() {
			if index > 0 {
				write!(f, ", ")?;
			}
			write!(f, "{:?}: {{", context)?;
			for (position, (successor, weight)) in successors.iter().enumerate() {
				if position > 0 {
					write!(f, ", ")?;
				}
				write!(f, "{:?}: {}", successor, weight)?;
			}
			write!(f, "}}")?;
		}
		write!(f, "}}")
	}
}
