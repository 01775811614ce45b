use std::collections::BTreeMap;

use rand::Rng;

use crate::error::{WagonError, WagonResult};

/// Parses `value` as a natural number (`>= 0`).
///
/// # Errors
/// Returns `InvalidConfiguration` if `value` is not an integer or is negative.
pub fn natural(value: &str) -> WagonResult<usize> {
	let integer: i64 = value
		.trim()
		.parse()
		.map_err(|_| WagonError::InvalidConfiguration(format!("'{}' is not an integer", value)))?;
	if integer < 0 {
		return Err(WagonError::InvalidConfiguration(format!("'{}' is not a positive integer", value)));
	}
	usize::try_from(integer)
		.map_err(|_| WagonError::InvalidConfiguration(format!("'{}' is too large", value)))
}

/// Parses `value` as a strictly positive natural number (`>= 1`).
///
/// # Errors
/// Returns `InvalidConfiguration` if `value` is not an integer or is `<= 0`.
pub fn nonzero_natural(value: &str) -> WagonResult<usize> {
	match natural(value)? {
		0 => Err(WagonError::InvalidConfiguration(format!("'{}' is not a strict positive integer", value))),
		integer => Ok(integer),
	}
}

/// Picks a random key of `choices`, weighted by its value.
///
/// A value `r` is drawn uniformly in `[0, total)`, then the entries are
/// walked in iteration order, subtracting each weight until `r` falls
/// inside one. This selects the first entry whose cumulative weight
/// exceeds `r`.
///
/// Returns `None` if `choices` is empty or all weights are zero.
pub fn random_weighted_choice<R: Rng + ?Sized>(choices: &BTreeMap<char, u64>, rng: &mut R) -> Option<char> {
	let total = choices.values().fold(0u64, |acc, weight| acc.saturating_add(*weight));
	if total == 0 {
		return None;
	}

	let mut r = rng.random_range(0..total);
	for (character, weight) in choices {
		if r < *weight {
			return Some(*character);
		}
		r -= weight;
	}

	// Unreachable when the total did not saturate
	choices.keys().next_back().copied()
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	#[test]
	fn natural_accepts_zero_and_positive() {
		assert_eq!(natural("0").unwrap(), 0);
		assert_eq!(natural(" 12 ").unwrap(), 12);
	}

	#[test]
	fn natural_rejects_negative_and_garbage() {
		assert!(matches!(natural("-1"), Err(WagonError::InvalidConfiguration(_))));
		assert!(matches!(natural("ten"), Err(WagonError::InvalidConfiguration(_))));
	}

	#[test]
	fn nonzero_natural_rejects_zero() {
		assert!(nonzero_natural("0").is_err());
		assert!(nonzero_natural("-3").is_err());
		assert_eq!(nonzero_natural("7").unwrap(), 7);
	}

	#[test]
	fn weighted_choice_empty() {
		let mut rng = StdRng::seed_from_u64(1);
		assert_eq!(random_weighted_choice(&BTreeMap::new(), &mut rng), None);
	}

	#[test]
	fn weighted_choice_single_entry() {
		let mut rng = StdRng::seed_from_u64(2);
		let choices = BTreeMap::from([('x', 3)]);
		for _ in 0..20 {
			assert_eq!(random_weighted_choice(&choices, &mut rng), Some('x'));
		}
	}

	#[test]
	fn weighted_choice_never_picks_zero_weight() {
		let mut rng = StdRng::seed_from_u64(3);
		let choices = BTreeMap::from([('a', 0), ('b', 5), ('c', 0)]);
		for _ in 0..50 {
			assert_eq!(random_weighted_choice(&choices, &mut rng), Some('b'));
		}
	}

	#[test]
	fn weighted_choice_follows_weights() {
		let mut rng = StdRng::seed_from_u64(4);
		let choices = BTreeMap::from([('a', 1), ('b', 99)]);
		let b_count = (0..1000)
			.filter(|_| random_weighted_choice(&choices, &mut rng) == Some('b'))
			.count();
		assert!(b_count > 900, "b picked {} times", b_count);
	}
}
