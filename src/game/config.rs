//! Session configuration, supplied from outside (the page reads it off the URL).

use rand::Rng;

/// Inset used whenever a position is clamped into the viewport.
pub const CLAMP_INSET: f64 = 10.0;
/// Extra pick distance beyond a node's radius when starting a drag.
pub const HIT_PADDING: f64 = 8.0;
/// How long a hinted node stays highlighted, in seconds.
pub const HINT_DURATION: f64 = 1.4;

pub const DEFAULT_NODE_COUNT: usize = 6;
pub const RANDOM_NODE_COUNTS: std::ops::RangeInclusive<usize> = 5..=10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Difficulty {
	#[default]
	Easy,
	Hard,
	Expert,
}

impl Difficulty {
	/// Case-insensitive substring match: anything mentioning "expert" wins over
	/// "hard", everything else is easy.
	pub fn from_label(label: &str) -> Self {
		let label = label.to_ascii_lowercase();
		if label.contains("expert") {
			Difficulty::Expert
		} else if label.contains("hard") {
			Difficulty::Hard
		} else {
			Difficulty::Easy
		}
	}

	pub fn multiplier(self) -> f64 {
		match self {
			Difficulty::Easy => 1.0,
			Difficulty::Hard => 1.3,
			Difficulty::Expert => 1.6,
		}
	}

	pub fn label(self) -> &'static str {
		match self {
			Difficulty::Easy => "Easy",
			Difficulty::Hard => "Hard",
			Difficulty::Expert => "Expert",
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct GameConfig {
	pub difficulty: Difficulty,
	/// Raw label as given, kept for the history log.
	pub difficulty_label: Option<String>,
	/// Skip any saved session and start fresh.
	pub force_new: bool,
	pub node_count: usize,
}

impl Default for GameConfig {
	fn default() -> Self {
		Self {
			difficulty: Difficulty::default(),
			difficulty_label: None,
			force_new: false,
			node_count: DEFAULT_NODE_COUNT,
		}
	}
}

impl GameConfig {
	/// Builds a config from the `difficulty` and `new` query parameters.
	pub fn from_params(difficulty: Option<&str>, new: Option<&str>) -> Self {
		Self {
			difficulty: difficulty.map(Difficulty::from_label).unwrap_or_default(),
			difficulty_label: difficulty.map(str::to_owned),
			force_new: new == Some("true"),
			..Self::default()
		}
	}

	pub fn label(&self) -> &str {
		self.difficulty_label
			.as_deref()
			.unwrap_or(self.difficulty.label())
	}

	pub fn random_node_count<R: Rng + ?Sized>(rng: &mut R) -> usize {
		rng.gen_range(RANDOM_NODE_COUNTS)
	}
}
