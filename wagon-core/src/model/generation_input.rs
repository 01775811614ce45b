use crate::error::{WagonError, WagonResult};

/// Strategy used to select the first character of a generated word.
///
/// # Variants
/// - `Anywhere`: pick uniformly among the single-character contexts of the
///   table, retrying the others if a start leads nowhere.
/// - `InModel`: start as a word of the table does, i.e. right after the
///   start sentinel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StartMode {
	#[default]
	Anywhere,
	InModel,
}

/// Input parameters of a single word generation.
///
/// # Invariants
/// - `length` is always >= 1
/// - `max_draws`, when set, is >= 1
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationInput {
	/// Exact number of characters of the generated word.
	length: usize,

	/// Maximum context length considered when choosing the next character
	/// (0 = unbounded).
	pub window: usize,

	/// How the first character is chosen.
	pub start: StartMode,

	/// Whether the word must end as a word of the table does.
	pub require_end: bool,

	/// Whether the table weights are ignored (every transition weighs 1).
	pub flatten: bool,

	/// Optional cap on the number of weighted draws of one generation.
	max_draws: Option<usize>,
}

impl GenerationInput {
	/// Creates a generation input for words of `length` characters.
	///
	/// # Errors
	/// Returns `InvalidConfiguration` if `length` is 0.
	pub fn new(length: usize) -> WagonResult<Self> {
		let mut input = Self {
			length: 1,
			window: 0,
			start: StartMode::Anywhere,
			require_end: false,
			flatten: false,
			max_draws: None,
		};
		input.set_length(length)?;
		Ok(input)
	}

	/// Returns the requested word length.
	pub fn length(&self) -> usize {
		self.length
	}

	/// Sets the requested word length.
	///
	/// # Errors
	/// Returns `InvalidConfiguration` if `length` is 0.
	pub fn set_length(&mut self, length: usize) -> WagonResult<()> {
		if length == 0 {
			return Err(WagonError::InvalidConfiguration("length must be >= 1".to_owned()));
		}
		self.length = length;
		Ok(())
	}

	pub fn max_draws(&self) -> Option<usize> {
		self.max_draws
	}

	/// Caps the number of weighted draws (`None` = unbounded).
	///
	/// # Errors
	/// Returns `InvalidConfiguration` for a zero budget.
	pub fn set_max_draws(&mut self, max_draws: Option<usize>) -> WagonResult<()> {
		if max_draws == Some(0) {
			return Err(WagonError::InvalidConfiguration("draw budget must be >= 1".to_owned()));
		}
		self.max_draws = max_draws;
		Ok(())
	}

	/// Returns `true` if the word must start as a word of the table.
	pub fn require_start(&self) -> bool {
		self.start == StartMode::InModel
	}
}
