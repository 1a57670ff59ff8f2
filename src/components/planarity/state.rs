use log::warn;
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::types::HudStats;
use crate::game::{
	AutoSolver, GameConfig, GameStore, HistoryRecord, KeyValueStore, Point, SavedGame, Session,
	SolverParams, Viewport,
};

/// Everything the canvas owns: the session, the solver driving it, the RNG and
/// the store it persists into. Only ever touched from the frame loop and the
/// input handlers, one at a time.
pub struct PlanarityState<S> {
	pub session: Session,
	pub solver: AutoSolver,
	pub config: GameConfig,
	rng: StdRng,
	store: Option<GameStore<S>>,
	store_failed: bool,
	/// A solve record the store has not accepted yet.
	pending_history: Option<HistoryRecord>,
}

impl<S: KeyValueStore> PlanarityState<S> {
	/// Resumes the saved session if there is a usable one (and `force_new` is
	/// off), otherwise generates a fresh graph.
	pub fn new(config: GameConfig, width: f64, height: f64, seed: u64, store: Option<GameStore<S>>) -> Self {
		let mut rng = StdRng::seed_from_u64(seed);
		let viewport = Viewport::new(width, height);
		let restored = if config.force_new {
			None
		} else {
			store
				.as_ref()
				.and_then(GameStore::load_current)
				.and_then(|saved| saved.restore(viewport, config.difficulty))
		};
		let session = restored.unwrap_or_else(|| {
			Session::new(config.node_count, viewport, config.difficulty, &mut rng)
		});

		Self {
			session,
			solver: AutoSolver::new(SolverParams::default()),
			config,
			rng,
			store,
			store_failed: false,
			pending_history: None,
		}
	}

	/// One frame: a solver batch if one is running, the clock, re-scoring and
	/// persistence. `date` is only called when this frame solves the puzzle.
	/// A history record that fails to store is retried on later frames.
	pub fn tick(&mut self, dt: f64, date: impl FnOnce() -> String) -> HudStats {
		if self.solver.is_running() {
			self.solver.step(&mut self.session, &mut self.rng);
		}
		self.session.tick(dt);
		let eval = self.session.evaluate();

		let label = self.config.label().to_owned();
		if eval.newly_solved && self.store.is_some() {
			self.pending_history = Some(HistoryRecord::capture(&self.session, &label, date()));
		}
		if let Some(store) = self.store.as_mut() {
			let mut result = store.save_current(&SavedGame::capture(&self.session, &label));
			if let Some(record) = &self.pending_history {
				match store.append_history(record) {
					Ok(()) => self.pending_history = None,
					Err(err) => result = result.and(Err(err)),
				}
			}
			match result {
				Err(err) if !self.store_failed => {
					warn!("could not persist progress: {err:#}");
					self.store_failed = true;
				}
				Ok(()) => self.store_failed = false,
				Err(_) => {}
			}
		}
		self.hud()
	}

	pub fn hud(&self) -> HudStats {
		HudStats::new(&self.session, self.solver.phase())
	}

	/// New graph with the configured node count.
	pub fn reset(&mut self) {
		self.session.regenerate(self.config.node_count, &mut self.rng);
	}

	/// New graph with a random node count.
	pub fn generate_new(&mut self) {
		let count = GameConfig::random_node_count(&mut self.rng);
		self.session.regenerate(count, &mut self.rng);
	}

	pub fn hint(&mut self) -> Option<usize> {
		self.session.hint()
	}

	pub fn auto_solve(&mut self) -> bool {
		self.solver.start(&self.session)
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.session.resize(width, height);
	}

	/// Returns true when `p` picked up a node.
	pub fn pointer_down(&mut self, p: Point) -> bool {
		self.session.start_drag(p).is_some()
	}

	/// Returns true while a node is being dragged.
	pub fn pointer_move(&mut self, p: Point) -> bool {
		self.session.drag_to(p)
	}

	pub fn pointer_up(&mut self) {
		self.session.end_drag();
	}

	pub fn store(&self) -> Option<&GameStore<S>> {
		self.store.as_ref()
	}
}

#[cfg(test)]
mod tests {
	use std::cell::Cell;
	use std::rc::Rc;

	use anyhow::{Result, bail};

	use super::*;
	use crate::game::persistence::HISTORY_KEY;
	use crate::game::{Counters, Graph, MemoryStore, SolverPhase};

	fn fresh(store: Option<GameStore<MemoryStore>>) -> PlanarityState<MemoryStore> {
		PlanarityState::new(GameConfig::default(), 800.0, 600.0, 17, store)
	}

	/// Two disjoint edges drawn as an X: one crossing, solvable by moving any
	/// endpoint.
	fn crossed_pair<S: KeyValueStore>(state: &mut PlanarityState<S>) {
		let points = [
			Point::new(100.0, 100.0),
			Point::new(500.0, 500.0),
			Point::new(100.0, 500.0),
			Point::new(500.0, 100.0),
		];
		let graph = Graph::from_parts(&points, &[(0, 1), (2, 3)], 9.6).unwrap();
		state.session = Session::resume(
			graph,
			state.session.viewport(),
			state.config.difficulty,
			Counters::default(),
		);
	}

	/// Memory store whose history writes fail while `fail_history` is set.
	#[derive(Default)]
	struct FlakyStore {
		inner: MemoryStore,
		fail_history: Rc<Cell<bool>>,
	}

	impl KeyValueStore for FlakyStore {
		fn get(&self, key: &str) -> Result<Option<String>> {
			self.inner.get(key)
		}

		fn set(&mut self, key: &str, value: &str) -> Result<()> {
			if key == HISTORY_KEY && self.fail_history.get() {
				bail!("quota exceeded");
			}
			self.inner.set(key, value)
		}
	}

	#[test]
	fn tick_persists_current_game() {
		let mut state = fresh(Some(GameStore::new(MemoryStore::default())));
		let hud = state.tick(0.016, String::new);
		assert_eq!(hud.moves, 0);
		let saved = state.store().unwrap().load_current().unwrap();
		assert_eq!(saved.nodes, state.session.graph().positions());
		assert_eq!(saved.difficulty, "Easy");
	}

	#[test]
	fn resumes_saved_game_unless_forced_new() {
		let mut first = fresh(Some(GameStore::new(MemoryStore::default())));
		first.tick(0.016, String::new);
		let positions = first.session.graph().positions();
		let store = first.store().unwrap().store().clone();

		let resumed = fresh(Some(GameStore::new(store.clone())));
		assert_eq!(resumed.session.graph().positions(), positions);

		let config = GameConfig {
			force_new: true,
			node_count: 9,
			..GameConfig::default()
		};
		let forced = PlanarityState::new(config, 800.0, 600.0, 99, Some(GameStore::new(store)));
		assert_eq!(forced.session.graph().nodes.len(), 9);
	}

	#[test]
	fn auto_solve_writes_history_once() {
		let mut state = fresh(Some(GameStore::new(MemoryStore::default())));
		crossed_pair(&mut state);
		assert!(state.auto_solve());
		let mut frames = 0;
		while state.solver.is_running() {
			state.tick(0.016, || "today".to_owned());
			frames += 1;
			assert!(frames < 2000);
		}
		assert_eq!(state.solver.phase(), SolverPhase::Converged);
		for _ in 0..5 {
			state.tick(0.016, || "later".to_owned());
		}

		let history = state.store().unwrap().history();
		assert_eq!(history.len(), 1);
		assert_eq!(history[0].date, "today");
		assert!(state.hud().solved);
		assert_eq!(state.hud().planarity, 100);
	}

	#[test]
	fn dragging_to_planar_writes_history_once() {
		let mut state = fresh(Some(GameStore::new(MemoryStore::default())));
		crossed_pair(&mut state);
		assert!(!state.tick(0.016, String::new).solved);

		assert!(state.pointer_down(Point::new(500.0, 500.0)));
		assert!(state.pointer_move(Point::new(150.0, 400.0)));
		state.pointer_up();
		let hud = state.tick(0.016, || "solved".to_owned());
		assert!(hud.solved);
		state.tick(0.016, || "again".to_owned());

		let history = state.store().unwrap().history();
		assert_eq!(history.len(), 1);
		assert_eq!(history[0].date, "solved");
		assert_eq!(history[0].moves, 1);
	}

	#[test]
	fn failed_history_write_is_retried() {
		let fail_history = Rc::new(Cell::new(true));
		let store = FlakyStore {
			fail_history: fail_history.clone(),
			..FlakyStore::default()
		};
		let mut state = PlanarityState::new(GameConfig::default(), 800.0, 600.0, 5, Some(GameStore::new(store)));
		crossed_pair(&mut state);

		state.pointer_down(Point::new(500.0, 500.0));
		state.pointer_move(Point::new(150.0, 400.0));
		state.pointer_up();
		state.tick(0.016, || "first".to_owned());

		let store = state.store().unwrap();
		assert!(store.history().is_empty());
		assert!(store.load_current().unwrap().solved);

		fail_history.set(false);
		state.tick(0.016, || "second".to_owned());
		state.tick(0.016, || "third".to_owned());
		let history = state.store().unwrap().history();
		assert_eq!(history.len(), 1);
		assert_eq!(history[0].date, "first");
	}

	#[test]
	fn reset_cancels_running_solver() {
		let mut state = fresh(None);
		state.generate_new();
		state.auto_solve();
		assert!(!state.auto_solve());
		state.reset();
		let positions = state.session.graph().positions();
		let hud = state.tick(0.016, String::new);
		assert_eq!(hud.solver, SolverPhase::Cancelled);
		assert_eq!(state.session.graph().positions(), positions);
		assert_eq!(state.session.graph().nodes.len(), 6);
	}

	#[test]
	fn pointer_drag_counts_moves() {
		let mut state = fresh(None);
		let start = state.session.graph().nodes[0].pos;
		assert!(state.pointer_down(start));
		assert!(state.pointer_move(Point::new(-50.0, 5000.0)));
		state.pointer_up();
		assert!(!state.pointer_move(Point::new(10.0, 10.0)));
		let hud = state.tick(0.0, String::new);
		assert_eq!(hud.moves, 1);
		let dragged = state.session.graph().nodes[0].pos;
		assert_eq!(dragged, Point::new(10.0, 590.0));
	}
}
