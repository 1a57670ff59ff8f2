//! The planarity puzzle itself, independent of the browser.

pub mod config;
pub mod geometry;
pub mod graph;
pub mod persistence;
pub mod scoring;
pub mod session;
pub mod solver;

pub use config::{Difficulty, GameConfig};
pub use geometry::{Point, Viewport};
pub use graph::{Edge, Graph, Node, NodeColor};
pub use persistence::{GameStore, HistoryRecord, KeyValueStore, LocalStorage, MemoryStore, SavedGame};
pub use scoring::Metrics;
pub use session::{Counters, Evaluation, Session};
pub use solver::{AutoSolver, SolverParams, SolverPhase};
