use crate::game::{Session, SolverPhase};

/// What the HUD shows, refreshed once per frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HudStats {
	pub moves: u32,
	pub timer: u32,
	pub score: u32,
	pub planarity: u32,
	pub crossings: usize,
	pub complexity: u32,
	pub balance: u32,
	pub solved: bool,
	pub solver: SolverPhase,
}

impl HudStats {
	pub fn new(session: &Session, solver: SolverPhase) -> Self {
		let metrics = session.metrics();
		Self {
			moves: session.moves(),
			timer: session.timer(),
			score: metrics.score,
			planarity: metrics.planarity,
			crossings: metrics.crossings,
			complexity: metrics.complexity,
			balance: metrics.balance,
			solved: session.is_solved(),
			solver,
		}
	}
}
