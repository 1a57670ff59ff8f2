//! One puzzle session: the graph plus its counters, drag selection and hint.
//!
//! All mutation goes through `&mut Session`, so the drag handler, the solver
//! and the frame tick are serialized by whoever owns it.

use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, info};
use rand::Rng;

use super::config::{CLAMP_INSET, Difficulty, HINT_DURATION, HIT_PADDING};
use super::geometry::{Point, Viewport, node_crossing_counts};
use super::graph::{Graph, NodeColor};
use super::scoring::Metrics;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

fn next_token() -> u64 {
	NEXT_TOKEN.fetch_add(1, Ordering::Relaxed)
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Hint {
	node: usize,
	remaining: f64,
}

/// Result of re-scoring the current layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Evaluation {
	pub metrics: Metrics,
	/// Set on the one evaluation that first sees zero crossings.
	pub newly_solved: bool,
}

/// Counters carried over when a session is resumed from storage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counters {
	pub moves: u32,
	pub timer: u32,
	pub score: u32,
	pub planarity: u32,
	pub solved: bool,
}

#[derive(Debug)]
pub struct Session {
	graph: Graph,
	viewport: Viewport,
	difficulty: Difficulty,
	moves: u32,
	timer: u32,
	clock: f64,
	initial_crossings: usize,
	metrics: Metrics,
	solved: bool,
	token: u64,
	selected: Option<usize>,
	hint: Option<Hint>,
}

impl Session {
	pub fn new<R: Rng + ?Sized>(
		node_count: usize,
		viewport: Viewport,
		difficulty: Difficulty,
		rng: &mut R,
	) -> Self {
		let mut session = Self::resume(Graph::default(), viewport, difficulty, Counters::default());
		session.regenerate(node_count, rng);
		session
	}

	/// Wraps an existing graph, e.g. one loaded from storage. The initial
	/// crossing count is taken from the graph as it is now.
	pub fn resume(graph: Graph, viewport: Viewport, difficulty: Difficulty, counters: Counters) -> Self {
		let initial_crossings = graph.crossings().max(1);
		Self {
			graph,
			viewport,
			difficulty,
			moves: counters.moves,
			timer: counters.timer,
			clock: 0.0,
			initial_crossings,
			metrics: Metrics {
				score: counters.score,
				planarity: counters.planarity,
				..Metrics::default()
			},
			solved: counters.solved,
			token: next_token(),
			selected: None,
			hint: None,
		}
	}

	/// Replaces the graph and starts over. Any solver run or hint tied to the
	/// previous graph is invalidated through the new token.
	pub fn regenerate<R: Rng + ?Sized>(&mut self, node_count: usize, rng: &mut R) {
		self.graph = Graph::generate(node_count, self.viewport, rng);
		self.moves = 0;
		self.timer = 0;
		self.clock = 0.0;
		self.metrics = Metrics::default();
		self.solved = false;
		self.initial_crossings = self.graph.crossings().max(1);
		self.token = next_token();
		self.selected = None;
		self.hint = None;
	}

	pub fn graph(&self) -> &Graph {
		&self.graph
	}

	pub(crate) fn graph_mut(&mut self) -> &mut Graph {
		&mut self.graph
	}

	pub fn viewport(&self) -> Viewport {
		self.viewport
	}

	pub fn difficulty(&self) -> Difficulty {
		self.difficulty
	}

	pub fn moves(&self) -> u32 {
		self.moves
	}

	pub fn timer(&self) -> u32 {
		self.timer
	}

	pub fn initial_crossings(&self) -> usize {
		self.initial_crossings
	}

	/// Metrics from the last [`Session::evaluate`].
	pub fn metrics(&self) -> Metrics {
		self.metrics
	}

	pub fn is_solved(&self) -> bool {
		self.solved
	}

	/// Identifies this graph instance; changes on every regenerate.
	pub fn token(&self) -> u64 {
		self.token
	}

	pub fn selected(&self) -> Option<usize> {
		self.selected
	}

	pub fn hinted(&self) -> Option<usize> {
		self.hint.map(|h| h.node)
	}

	/// Re-scores the current geometry and latches the solved flag.
	pub fn evaluate(&mut self) -> Evaluation {
		self.metrics = Metrics::evaluate(
			&self.graph,
			self.viewport,
			self.difficulty,
			self.initial_crossings,
			self.moves,
			self.timer,
		);
		let newly_solved = self.metrics.is_planar() && !self.solved;
		if newly_solved {
			self.solved = true;
			info!(
				"solved: score {}, {} moves, {}s",
				self.metrics.score, self.moves, self.timer
			);
		}
		Evaluation {
			metrics: self.metrics,
			newly_solved,
		}
	}

	/// Advances the wall clock by `dt` seconds. The timer stops once solved;
	/// the hint countdown keeps running.
	pub fn tick(&mut self, dt: f64) {
		if !self.solved {
			self.clock += dt.max(0.0);
			let whole = self.clock.floor();
			self.timer += whole as u32;
			self.clock -= whole;
		}
		if let Some(hint) = self.hint.as_mut() {
			hint.remaining -= dt;
			if hint.remaining <= 0.0 {
				self.clear_hint();
			}
		}
	}

	/// Picks the first node (lowest index) within reach of `p`.
	pub fn start_drag(&mut self, p: Point) -> Option<usize> {
		self.selected = self
			.graph
			.nodes
			.iter()
			.position(|node| node.pos.distance(p) < node.radius + HIT_PADDING);
		self.selected
	}

	/// Moves the selected node to `p`, clamped into the viewport. Each call
	/// counts as one move. Returns false when nothing is selected.
	pub fn drag_to(&mut self, p: Point) -> bool {
		let Some(idx) = self.selected else {
			return false;
		};
		self.graph.nodes[idx].pos = self.viewport.clamp(p, CLAMP_INSET);
		self.moves += 1;
		true
	}

	pub fn end_drag(&mut self) {
		self.selected = None;
	}

	/// Highlights the node involved in the most crossings for
	/// [`HINT_DURATION`]. Nothing is highlighted on a planar layout.
	pub fn hint(&mut self) -> Option<usize> {
		let counts = node_crossing_counts(&self.graph.nodes, &self.graph.edges);
		let (worst, &count) = counts
			.iter()
			.enumerate()
			.fold(None, |best: Option<(usize, &usize)>, (i, c)| match best {
				Some((_, b)) if b >= c => best,
				_ => Some((i, c)),
			})?;
		if count == 0 {
			return None;
		}
		self.clear_hint();
		self.graph.nodes[worst].color = NodeColor::Hint;
		self.hint = Some(Hint {
			node: worst,
			remaining: HINT_DURATION,
		});
		debug!("hint: node {worst} is in {count} crossings");
		Some(worst)
	}

	fn clear_hint(&mut self) {
		if let Some(hint) = self.hint.take() {
			if let Some(node) = self.graph.nodes.get_mut(hint.node) {
				node.color = NodeColor::Gold;
			}
		}
	}

	/// Applies new viewport dimensions: radii are re-derived and every node is
	/// pulled back inside.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.viewport = Viewport::new(width, height);
		self.graph.fit_to(self.viewport, CLAMP_INSET);
	}
}
