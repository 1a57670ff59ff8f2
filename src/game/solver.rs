//! Auto-solve: a force-directed layout interleaved with crossing-driven local
//! search.
//!
//! Each call to [`AutoSolver::step`] runs one bounded batch of iterations and
//! returns, so the caller can schedule batches from its frame loop and stay
//! responsive. A batch does the following:
//!
//! - pairwise repulsion plus springs toward a rest length, integrated with an
//!   annealed learning rate and clamped into the viewport;
//! - every [`SolverParams::local_search_every`] iterations, greedy random
//!   perturbation of the nodes involved in the most crossings, kept only when
//!   the total crossing count strictly drops;
//! - every [`SolverParams::jitter_every`] iterations, a small random nudge to a
//!   few nodes.
//!
//! Batches that fail to reduce the crossing count accumulate stagnation; past
//! the limit a few nodes are thrown to fresh random positions.
//!
//! A run is tied to the session token it started with. Once the session is
//! regenerated the run ends as [`SolverPhase::Cancelled`] without touching the
//! new graph.

use log::debug;
use rand::Rng;

use super::config::CLAMP_INSET;
use super::geometry::{MIN_DISTANCE, Viewport, node_crossing_counts};
use super::graph::Graph;
use super::session::Session;

/// Tuning constants. `Default` holds the values the game ships with.
#[derive(Clone, Debug, PartialEq)]
pub struct SolverParams {
	/// Hard cap on simulation iterations for one run.
	pub max_total_iterations: usize,
	/// Iterations per [`AutoSolver::step`] call.
	pub iterations_per_frame: usize,
	/// Learning rate at the start of a run, on top of `lr_min`.
	pub lr_max: f64,
	/// Learning rate floor reached at the end of the budget.
	pub lr_min: f64,
	/// Repulsion numerator, divided by squared distance.
	pub repulsion: f64,
	pub spring: f64,
	pub rest_length: f64,
	pub local_search_every: usize,
	/// How many of the worst nodes are perturbed per local search.
	pub local_search_nodes: usize,
	/// Random candidates tried per node.
	pub local_search_attempts: usize,
	/// Perturbation radius as a fraction of the larger viewport dimension.
	/// Shared by local search and jitter.
	pub perturbation_scale: f64,
	/// Consecutive non-improving batches tolerated before relocating nodes.
	pub stagnation_limit: u32,
	pub relocation_nodes: usize,
	pub relocation_inset: f64,
	pub jitter_every: usize,
	pub jitter_nodes: usize,
}

impl Default for SolverParams {
	fn default() -> Self {
		Self {
			max_total_iterations: 6000,
			iterations_per_frame: 5,
			lr_max: 0.035,
			lr_min: 0.002,
			repulsion: 1000.0,
			spring: 0.02,
			rest_length: 110.0,
			local_search_every: 60,
			local_search_nodes: 3,
			local_search_attempts: 10,
			perturbation_scale: 0.06,
			stagnation_limit: 15,
			relocation_nodes: 3,
			relocation_inset: 40.0,
			jitter_every: 200,
			jitter_nodes: 3,
		}
	}
}

impl SolverParams {
	/// Step size at `iteration`, annealed linearly from `lr_max + lr_min`
	/// down to `lr_min`.
	pub fn learning_rate(&self, iteration: usize) -> f64 {
		let progress = iteration as f64 / self.max_total_iterations.max(1) as f64;
		(self.lr_max * (1.0 - progress) + self.lr_min).max(self.lr_min)
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SolverPhase {
	#[default]
	Idle,
	Running,
	/// Reached zero crossings.
	Converged,
	/// Spent the iteration budget.
	Exhausted,
	/// The session was regenerated under a running solver.
	Cancelled,
}

impl SolverPhase {
	pub fn label(self) -> &'static str {
		match self {
			SolverPhase::Idle => "idle",
			SolverPhase::Running => "solving",
			SolverPhase::Converged => "converged",
			SolverPhase::Exhausted => "gave up",
			SolverPhase::Cancelled => "cancelled",
		}
	}
}

fn due(iteration: usize, every: usize) -> bool {
	every > 0 && iteration % every == 0
}

#[derive(Debug, Default)]
pub struct AutoSolver {
	params: SolverParams,
	phase: SolverPhase,
	token: u64,
	iterations: usize,
	stagnation: u32,
	last_crossings: usize,
}

impl AutoSolver {
	pub fn new(params: SolverParams) -> Self {
		Self {
			params,
			..Self::default()
		}
	}

	pub fn params(&self) -> &SolverParams {
		&self.params
	}

	pub fn phase(&self) -> SolverPhase {
		self.phase
	}

	pub fn is_running(&self) -> bool {
		self.phase == SolverPhase::Running
	}

	/// Iterations spent by the current (or last) run.
	pub fn iterations(&self) -> usize {
		self.iterations
	}

	/// Begins a run on `session`. A no-op returning false while a run on the
	/// same session is already in progress; a run left over from a replaced
	/// graph is dropped and a new one starts.
	pub fn start(&mut self, session: &Session) -> bool {
		if self.is_running() && self.token == session.token() {
			return false;
		}
		self.phase = SolverPhase::Running;
		self.token = session.token();
		self.iterations = 0;
		self.stagnation = 0;
		self.last_crossings = session.graph().crossings();
		debug!("auto-solve started at {} crossings", self.last_crossings);
		true
	}

	/// Runs one batch and reports the phase afterwards. Anything but
	/// [`SolverPhase::Running`] means the run is over.
	pub fn step<R: Rng + ?Sized>(&mut self, session: &mut Session, rng: &mut R) -> SolverPhase {
		if !self.is_running() {
			return self.phase;
		}
		if session.token() != self.token {
			return self.finish(SolverPhase::Cancelled);
		}
		let viewport = session.viewport();
		let graph = session.graph_mut();
		if let Some(done) = self.terminal(graph.crossings()) {
			return self.finish(done);
		}

		for _ in 0..self.params.iterations_per_frame.max(1) {
			if self.iterations >= self.params.max_total_iterations {
				break;
			}
			let lr = self.params.learning_rate(self.iterations);
			self.simulate(graph, viewport, lr);
			self.iterations += 1;
			if due(self.iterations, self.params.local_search_every) {
				self.improve_worst(graph, viewport, rng);
			}
			if due(self.iterations, self.params.jitter_every) {
				self.jitter(graph, viewport, rng);
			}
		}

		let crossings = graph.crossings();
		if crossings >= self.last_crossings {
			self.stagnation += 1;
		} else {
			self.stagnation = 0;
		}
		self.last_crossings = crossings;
		if self.stagnation > self.params.stagnation_limit {
			self.relocate(graph, viewport, rng);
			self.stagnation = 0;
		}

		match self.terminal(graph.crossings()) {
			Some(done) => self.finish(done),
			None => self.phase,
		}
	}

	/// Steps until the run ends. Bounded by the iteration budget.
	pub fn run<R: Rng + ?Sized>(&mut self, session: &mut Session, rng: &mut R) -> SolverPhase {
		while self.step(session, rng) == SolverPhase::Running {}
		self.phase
	}

	fn terminal(&self, crossings: usize) -> Option<SolverPhase> {
		if crossings == 0 {
			Some(SolverPhase::Converged)
		} else if self.iterations >= self.params.max_total_iterations {
			Some(SolverPhase::Exhausted)
		} else {
			None
		}
	}

	fn finish(&mut self, phase: SolverPhase) -> SolverPhase {
		debug!("auto-solve {} after {} iterations", phase.label(), self.iterations);
		self.phase = phase;
		phase
	}

	fn simulate(&self, graph: &mut Graph, viewport: Viewport, lr: f64) {
		let p = &self.params;
		let n = graph.nodes.len();
		let mut forces = vec![(0.0f64, 0.0f64); n];

		for i in 0..n {
			for j in i + 1..n {
				let (a, b) = (graph.nodes[i].pos, graph.nodes[j].pos);
				let (dx, dy) = (a.x - b.x, a.y - b.y);
				let dist_sq = (dx * dx + dy * dy).max(MIN_DISTANCE * MIN_DISTANCE);
				let dist = dist_sq.sqrt();
				let f = p.repulsion / dist_sq;
				let (ux, uy) = (dx / dist, dy / dist);
				forces[i].0 += ux * f;
				forces[i].1 += uy * f;
				forces[j].0 -= ux * f;
				forces[j].1 -= uy * f;
			}
		}

		for edge in &graph.edges {
			let (a, b) = (graph.nodes[edge.a].pos, graph.nodes[edge.b].pos);
			let (dx, dy) = (b.x - a.x, b.y - a.y);
			let dist = (dx * dx + dy * dy).sqrt().max(MIN_DISTANCE);
			let f = (dist - p.rest_length) * p.spring;
			let (ux, uy) = (dx / dist, dy / dist);
			forces[edge.a].0 += ux * f;
			forces[edge.a].1 += uy * f;
			forces[edge.b].0 -= ux * f;
			forces[edge.b].1 -= uy * f;
		}

		for (node, (fx, fy)) in graph.nodes.iter_mut().zip(forces) {
			node.pos.x += fx * lr;
			node.pos.y += fy * lr;
			node.pos = viewport.clamp(node.pos, CLAMP_INSET);
		}
	}

	fn improve_worst<R: Rng + ?Sized>(&mut self, graph: &mut Graph, viewport: Viewport, rng: &mut R) {
		let counts = node_crossing_counts(&graph.nodes, &graph.edges);
		let mut order: Vec<usize> = (0..counts.len()).collect();
		order.sort_by(|&a, &b| counts[b].cmp(&counts[a]));
		order.truncate(self.params.local_search_nodes);

		let radius = viewport.scale() * self.params.perturbation_scale;
		for idx in order {
			let before = graph.crossings();
			let after = improve_node(
				graph,
				viewport,
				idx,
				self.params.local_search_attempts,
				radius,
				rng,
			);
			if after < before {
				self.stagnation = 0;
			}
		}
	}

	fn jitter<R: Rng + ?Sized>(&self, graph: &mut Graph, viewport: Viewport, rng: &mut R) {
		let n = graph.nodes.len();
		if n == 0 {
			return;
		}
		let scale = viewport.scale() * self.params.perturbation_scale;
		for _ in 0..self.params.jitter_nodes.min(n) {
			let node = &mut graph.nodes[rng.gen_range(0..n)];
			let nudged = node.pos;
			node.pos.x = nudged.x + rng.gen_range(-0.5..0.5) * scale;
			node.pos.y = nudged.y + rng.gen_range(-0.5..0.5) * scale;
			node.pos = viewport.clamp(node.pos, CLAMP_INSET);
		}
	}

	fn relocate<R: Rng + ?Sized>(&self, graph: &mut Graph, viewport: Viewport, rng: &mut R) {
		let n = graph.nodes.len();
		if n == 0 {
			return;
		}
		let count = (n / 4).clamp(1, self.params.relocation_nodes.max(1));
		debug!("auto-solve stagnated, relocating {count} nodes");
		for _ in 0..count {
			let idx = rng.gen_range(0..n);
			graph.nodes[idx].pos = viewport.random_point(self.params.relocation_inset, rng);
		}
	}
}

/// Greedy best-of-`attempts` random move of node `idx` within `max_disp`.
///
/// The node ends at the candidate with the fewest total crossings, or where it
/// started if no candidate strictly improved. Returns the resulting crossing
/// count, which is never above the count before the call.
pub fn improve_node<R: Rng + ?Sized>(
	graph: &mut Graph,
	viewport: Viewport,
	idx: usize,
	attempts: usize,
	max_disp: f64,
	rng: &mut R,
) -> usize {
	let origin = graph.nodes[idx].pos;
	let mut best = (origin, graph.crossings());
	for _ in 0..attempts {
		let mut candidate = origin;
		candidate.x += rng.gen_range(-1.0..=1.0) * max_disp;
		candidate.y += rng.gen_range(-1.0..=1.0) * max_disp;
		graph.nodes[idx].pos = viewport.clamp(candidate, CLAMP_INSET);
		let crossings = graph.crossings();
		if crossings < best.1 {
			best = (graph.nodes[idx].pos, crossings);
		}
	}
	graph.nodes[idx].pos = best.0;
	best.1
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	use super::*;
	use crate::game::config::Difficulty;
	use crate::game::geometry::Point;
	use crate::game::session::Counters;

	fn session_from(points: &[Point], edges: &[(usize, usize)], viewport: Viewport) -> Session {
		let graph = Graph::from_parts(points, edges, 10.0).unwrap();
		Session::resume(graph, viewport, Difficulty::Easy, Counters::default())
	}

	fn k5() -> Session {
		let points: Vec<Point> = (0..5)
			.map(|i| {
				let angle = i as f64 * std::f64::consts::TAU / 5.0;
				Point::new(300.0 + 150.0 * angle.cos(), 300.0 + 150.0 * angle.sin())
			})
			.collect();
		let edges: Vec<(usize, usize)> =
			(0..5).flat_map(|i| (i + 1..5).map(move |j| (i, j))).collect();
		session_from(&points, &edges, Viewport::new(600.0, 600.0))
	}

	#[test]
	fn learning_rate_anneals() {
		let params = SolverParams::default();
		assert!((params.learning_rate(0) - 0.037).abs() < 1e-12);
		assert!((params.learning_rate(3000) - 0.0195).abs() < 1e-12);
		assert!((params.learning_rate(6000) - 0.002).abs() < 1e-12);
		assert!((params.learning_rate(9000) - 0.002).abs() < 1e-12);
	}

	#[test]
	fn runs_terminate_within_budget() {
		let mut rng = StdRng::seed_from_u64(42);
		let viewport = Viewport::new(900.0, 700.0);
		for n in 5..=11 {
			let mut session = Session::new(n, viewport, Difficulty::Easy, &mut rng);
			let edge_count = session.graph().edges.len();
			let mut solver = AutoSolver::new(SolverParams::default());
			assert!(solver.start(&session));
			let phase = solver.run(&mut session, &mut rng);

			assert!(matches!(phase, SolverPhase::Converged | SolverPhase::Exhausted));
			assert!(solver.iterations() <= solver.params().max_total_iterations);
			assert_eq!(session.graph().nodes.len(), n);
			assert_eq!(session.graph().edges.len(), edge_count);
			assert!(session.graph().nodes.iter().all(|node| viewport.contains(node.pos, CLAMP_INSET)));
			if phase == SolverPhase::Converged {
				assert_eq!(session.graph().crossings(), 0);
			}
		}
	}

	#[test]
	fn non_planar_graph_exhausts_budget() {
		let mut rng = StdRng::seed_from_u64(1);
		let mut session = k5();
		let mut solver = AutoSolver::new(SolverParams {
			max_total_iterations: 600,
			..SolverParams::default()
		});
		solver.start(&session);
		assert_eq!(solver.run(&mut session, &mut rng), SolverPhase::Exhausted);
		assert_eq!(solver.iterations(), 600);
		assert!(session.graph().crossings() >= 1);
	}

	#[test]
	fn planar_graph_converges_immediately() {
		let mut rng = StdRng::seed_from_u64(1);
		let points = [Point::new(100.0, 100.0), Point::new(200.0, 100.0), Point::new(150.0, 200.0)];
		let mut session = session_from(&points, &[(0, 1), (1, 2), (2, 0)], Viewport::new(400.0, 400.0));
		let mut solver = AutoSolver::default();
		solver.start(&session);
		assert_eq!(solver.step(&mut session, &mut rng), SolverPhase::Converged);
		assert_eq!(solver.iterations(), 0);
		assert_eq!(session.graph().positions(), points.to_vec());
	}

	#[test]
	fn start_is_reentrancy_guarded() {
		let session = k5();
		let mut solver = AutoSolver::default();
		assert!(solver.start(&session));
		assert!(!solver.start(&session));
		assert!(solver.is_running());
	}

	#[test]
	fn regenerate_cancels_running_solver() {
		let mut rng = StdRng::seed_from_u64(8);
		let mut session = k5();
		let mut solver = AutoSolver::default();
		solver.start(&session);
		assert_eq!(solver.step(&mut session, &mut rng), SolverPhase::Running);

		session.regenerate(6, &mut rng);
		let fresh = session.graph().positions();
		assert_eq!(solver.step(&mut session, &mut rng), SolverPhase::Cancelled);
		assert_eq!(session.graph().positions(), fresh);
		assert!(solver.start(&session));
	}

	#[test]
	fn start_after_regenerate_restarts_immediately() {
		let mut rng = StdRng::seed_from_u64(4);
		let mut session = k5();
		let mut solver = AutoSolver::default();
		assert!(solver.start(&session));
		session.regenerate(7, &mut rng);

		assert!(solver.start(&session));
		assert!(solver.is_running());
		assert_eq!(solver.iterations(), 0);
		assert_ne!(solver.step(&mut session, &mut rng), SolverPhase::Cancelled);
	}

	/// Physics switched off so that only the escape moves touch positions.
	fn frozen(params: SolverParams) -> AutoSolver {
		AutoSolver::new(SolverParams {
			repulsion: 0.0,
			spring: 0.0,
			local_search_every: 0,
			iterations_per_frame: 1,
			..params
		})
	}

	#[test]
	fn stagnation_relocates_nodes() {
		let mut rng = StdRng::seed_from_u64(13);
		let mut session = k5();
		let viewport = session.viewport();
		let before = session.graph().positions();
		let mut solver = frozen(SolverParams {
			jitter_every: 0,
			stagnation_limit: 1,
			..SolverParams::default()
		});
		solver.start(&session);

		assert_eq!(solver.step(&mut session, &mut rng), SolverPhase::Running);
		assert_eq!(solver.stagnation, 1);
		assert_eq!(session.graph().positions(), before);

		assert_eq!(solver.step(&mut session, &mut rng), SolverPhase::Running);
		assert_eq!(solver.stagnation, 0);
		let inset = solver.params().relocation_inset;
		let moved: Vec<Point> = session
			.graph()
			.positions()
			.into_iter()
			.zip(&before)
			.filter(|(now, was)| now != *was)
			.map(|(now, _)| now)
			.collect();
		assert!(!moved.is_empty());
		assert!(moved.len() <= 3);
		assert!(moved.iter().all(|&p| viewport.contains(p, inset)));
	}

	#[test]
	fn jitter_fires_on_its_cadence() {
		let mut rng = StdRng::seed_from_u64(21);
		let mut session = k5();
		let viewport = session.viewport();
		let mut solver = frozen(SolverParams {
			jitter_every: 4,
			stagnation_limit: u32::MAX,
			..SolverParams::default()
		});
		solver.start(&session);

		let mut last = session.graph().positions();
		for iteration in 1..=12 {
			assert_eq!(solver.step(&mut session, &mut rng), SolverPhase::Running);
			let now = session.graph().positions();
			assert_eq!(now != last, iteration % 4 == 0, "iteration {iteration}");
			assert!(session.graph().nodes.iter().all(|n| viewport.contains(n.pos, CLAMP_INSET)));
			last = now;
		}
	}

	#[test]
	fn zero_batch_size_still_progresses() {
		let mut rng = StdRng::seed_from_u64(2);
		let mut session = k5();
		let mut solver = AutoSolver::new(SolverParams {
			iterations_per_frame: 0,
			max_total_iterations: 50,
			..SolverParams::default()
		});
		solver.start(&session);
		solver.step(&mut session, &mut rng);
		assert_eq!(solver.iterations(), 1);
		assert_eq!(solver.run(&mut session, &mut rng), SolverPhase::Exhausted);
	}

	#[test]
	fn springs_pull_and_repulsion_pushes() {
		let viewport = Viewport::new(800.0, 400.0);
		let solver = AutoSolver::default();

		let points = [Point::new(100.0, 200.0), Point::new(700.0, 200.0)];
		let mut graph = Graph::from_parts(&points, &[(0, 1)], 10.0).unwrap();
		solver.simulate(&mut graph, viewport, 1.0);
		assert!(graph.nodes[0].pos.distance(graph.nodes[1].pos) < 600.0);

		let points = [Point::new(400.0, 200.0), Point::new(405.0, 200.0)];
		let mut graph = Graph::from_parts(&points, &[], 10.0).unwrap();
		solver.simulate(&mut graph, viewport, 1.0);
		assert!(graph.nodes[0].pos.distance(graph.nodes[1].pos) > 5.0);
	}

	#[test]
	fn coincident_nodes_stay_finite() {
		let viewport = Viewport::new(400.0, 400.0);
		let points = [Point::new(200.0, 200.0), Point::new(200.0, 200.0)];
		let mut graph = Graph::from_parts(&points, &[(0, 1)], 10.0).unwrap();
		AutoSolver::default().simulate(&mut graph, viewport, 0.037);
		assert!(graph.nodes.iter().all(|n| n.pos.x.is_finite() && n.pos.y.is_finite()));
	}

	proptest! {
		#[test]
		fn local_improvement_never_worsens(seed in any::<u64>(), idx in 0usize..5) {
			let mut rng = StdRng::seed_from_u64(seed);
			let mut session = Session::new(8, Viewport::new(700.0, 500.0), Difficulty::Easy, &mut rng);
			let viewport = session.viewport();
			let graph = session.graph_mut();
			let before = graph.crossings();
			let after = improve_node(graph, viewport, idx, 10, 42.0, &mut rng);
			prop_assert!(after <= before);
			prop_assert_eq!(after, graph.crossings());
		}
	}
}
