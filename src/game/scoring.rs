//! Planarity percentage and the composite score.
//!
//! All of these are pure functions of the current geometry plus the session
//! counters, so a restored snapshot scores identically.

use super::config::Difficulty;
use super::geometry::Viewport;
use super::graph::Graph;

const PLANARITY_WEIGHT: f64 = 12.0;
const MOVE_PENALTY: f64 = 2.0;
const EDGE_WEIGHT: f64 = 6.0;
const NODE_WEIGHT: f64 = 2.0;

const BALANCE_MAX: f64 = 100.0;
const BALANCE_FLOOR: f64 = 40.0;
const BALANCE_STEEPNESS: f64 = 25.0;
const BALANCE_EXPONENT: f64 = 1.3;

/// Progress toward zero crossings relative to the session's initial count.
///
/// Only a crossing-free layout reports 100; rounding never gets there early.
pub fn planarity_percent(initial_crossings: usize, crossings: usize) -> u32 {
	let initial = initial_crossings.max(1);
	let progress = initial.saturating_sub(crossings);
	let percent = (100.0 * progress as f64 / initial as f64).round() as u32;
	if crossings > 0 { percent.min(99) } else { percent }
}

pub fn complexity_score(edge_count: usize, node_count: usize, difficulty: Difficulty) -> u32 {
	let base = EDGE_WEIGHT * edge_count as f64 + NODE_WEIGHT * node_count as f64;
	(base * difficulty.multiplier()).round() as u32
}

/// Population variance of the edge lengths; zero without edges.
pub fn edge_length_variance(graph: &Graph) -> f64 {
	let n = graph.edges.len();
	if n == 0 {
		return 0.0;
	}
	let mean = graph.edge_lengths().sum::<f64>() / n as f64;
	graph.edge_lengths().map(|l| (l - mean).powi(2)).sum::<f64>() / n as f64
}

/// Rewards uniform edge lengths: 100 at zero variance, decaying toward 40.
pub fn balance_bonus(graph: &Graph, viewport: Viewport) -> u32 {
	if graph.edges.is_empty() {
		return 0;
	}
	let normalized = edge_length_variance(graph) / (viewport.scale().max(1.0) * 2.0);
	let smooth = BALANCE_MAX / (1.0 + (normalized * BALANCE_STEEPNESS).powf(BALANCE_EXPONENT));
	smooth.clamp(BALANCE_FLOOR, BALANCE_MAX).round() as u32
}

pub fn score(planarity: u32, complexity: u32, balance: u32, moves: u32, timer: u32) -> u32 {
	let raw = planarity as f64 * PLANARITY_WEIGHT + complexity as f64 + balance as f64
		- MOVE_PENALTY * moves as f64
		- timer as f64;
	raw.round().max(0.0) as u32
}

/// Everything the HUD shows that is derived from geometry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Metrics {
	pub crossings: usize,
	pub planarity: u32,
	pub complexity: u32,
	pub balance: u32,
	pub score: u32,
}

impl Metrics {
	pub fn evaluate(
		graph: &Graph,
		viewport: Viewport,
		difficulty: Difficulty,
		initial_crossings: usize,
		moves: u32,
		timer: u32,
	) -> Self {
		let crossings = graph.crossings();
		let planarity = planarity_percent(initial_crossings, crossings);
		let complexity = complexity_score(graph.edges.len(), graph.nodes.len(), difficulty);
		let balance = balance_bonus(graph, viewport);
		Self {
			crossings,
			planarity,
			complexity,
			balance,
			score: score(planarity, complexity, balance, moves, timer),
		}
	}

	pub fn is_planar(&self) -> bool {
		self.crossings == 0
	}
}
