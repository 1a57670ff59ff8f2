//! Saved session snapshot and the solve history, as JSON in a string-keyed
//! store.
//!
//! Reads never fail hard: a missing, unreadable or corrupt entry comes back as
//! "nothing saved" and the caller starts a fresh graph.

use std::collections::HashMap;

use anyhow::{Context, Result, anyhow};
use log::{info, warn};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::config::{CLAMP_INSET, Difficulty};
use super::geometry::{Point, Viewport};
use super::graph::{Graph, node_radius};
use super::session::{Counters, Session};

pub const CURRENT_GAME_KEY: &str = "currentPlanarityGame";
pub const HISTORY_KEY: &str = "planarityHistory";

/// A string-keyed, string-valued store.
pub trait KeyValueStore {
	fn get(&self, key: &str) -> Result<Option<String>>;
	fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Process-local store, used headless and in tests.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
	entries: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
	fn get(&self, key: &str) -> Result<Option<String>> {
		Ok(self.entries.get(key).cloned())
	}

	fn set(&mut self, key: &str, value: &str) -> Result<()> {
		self.entries.insert(key.to_owned(), value.to_owned());
		Ok(())
	}
}

/// The browser's `window.localStorage`.
pub struct LocalStorage {
	storage: web_sys::Storage,
}

impl LocalStorage {
	/// `None` outside a browser or when storage is disabled.
	pub fn open() -> Option<Self> {
		let storage = web_sys::window()?.local_storage().ok()??;
		Some(Self { storage })
	}
}

impl KeyValueStore for LocalStorage {
	fn get(&self, key: &str) -> Result<Option<String>> {
		self.storage
			.get_item(key)
			.map_err(|e| anyhow!("localStorage read of {key} failed: {e:?}"))
	}

	fn set(&mut self, key: &str, value: &str) -> Result<()> {
		self.storage
			.set_item(key, value)
			.map_err(|e| anyhow!("localStorage write of {key} failed: {e:?}"))
	}
}

/// Full snapshot of the running session, overwritten every frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedGame {
	pub nodes: Vec<Point>,
	pub edges: Vec<[usize; 2]>,
	pub moves: u32,
	pub timer: u32,
	pub score: u32,
	pub planarity: u32,
	pub difficulty: String,
	pub solved: bool,
}

impl SavedGame {
	pub fn capture(session: &Session, difficulty: &str) -> Self {
		let metrics = session.metrics();
		Self {
			nodes: session.graph().positions(),
			edges: session.graph().edge_pairs(),
			moves: session.moves(),
			timer: session.timer(),
			score: metrics.score,
			planarity: metrics.planarity,
			difficulty: difficulty.to_owned(),
			solved: session.is_solved(),
		}
	}

	/// Rebuilds a session in `viewport`. Returns `None` for an empty graph or
	/// one whose edges reference missing nodes.
	pub fn restore(&self, viewport: Viewport, difficulty: Difficulty) -> Option<Session> {
		if self.nodes.is_empty() {
			return None;
		}
		let edges: Vec<(usize, usize)> = self.edges.iter().map(|&[a, b]| (a, b)).collect();
		let Some(mut graph) = Graph::from_parts(&self.nodes, &edges, node_radius(viewport.width)) else {
			warn!("saved game has invalid edges, ignoring it");
			return None;
		};
		graph.fit_to(viewport, CLAMP_INSET);
		let counters = Counters {
			moves: self.moves,
			timer: self.timer,
			score: self.score,
			planarity: self.planarity,
			solved: self.solved,
		};
		info!(
			"restored saved game: {} nodes, {} moves, {}s",
			graph.nodes.len(),
			self.moves,
			self.timer
		);
		Some(Session::resume(graph, viewport, difficulty, counters))
	}
}

fn round3(v: f64) -> f64 {
	(v * 1000.0).round() / 1000.0
}

/// One solved puzzle, appended once per session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
	pub difficulty: String,
	pub score: u32,
	pub moves: u32,
	pub time: String,
	pub date: String,
	/// Positions as fractions of the viewport, to 3 decimals. Older records
	/// carry these as decimal strings.
	#[serde(deserialize_with = "fraction_points")]
	pub nodes: Vec<Point>,
	pub edges: Vec<[usize; 2]>,
	pub complexity: u32,
	pub balance_bonus: u32,
}

impl HistoryRecord {
	pub fn capture(session: &Session, difficulty: &str, date: String) -> Self {
		let viewport = session.viewport();
		let (w, h) = (viewport.width.max(1.0), viewport.height.max(1.0));
		let metrics = session.metrics();
		Self {
			difficulty: difficulty.to_owned(),
			score: metrics.score,
			moves: session.moves(),
			time: format!("{}s", session.timer()),
			date,
			nodes: session
				.graph()
				.positions()
				.into_iter()
				.map(|p| Point::new(round3(p.x / w), round3(p.y / h)))
				.collect(),
			edges: session.graph().edge_pairs(),
			complexity: metrics.complexity,
			balance_bonus: metrics.balance,
		}
	}
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Coordinate {
	Number(f64),
	Text(String),
}

impl Coordinate {
	fn value<E: serde::de::Error>(self) -> Result<f64, E> {
		match self {
			Coordinate::Number(v) => Ok(v),
			Coordinate::Text(s) => s.trim().parse().map_err(E::custom),
		}
	}
}

#[derive(Deserialize)]
struct RawPoint {
	x: Coordinate,
	y: Coordinate,
}

fn fraction_points<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Point>, D::Error> {
	Vec::<RawPoint>::deserialize(deserializer)?
		.into_iter()
		.map(|p| Ok(Point::new(p.x.value()?, p.y.value()?)))
		.collect()
}

/// Typed access to the two persisted records.
pub struct GameStore<S> {
	store: S,
}

impl<S: KeyValueStore> GameStore<S> {
	pub fn new(store: S) -> Self {
		Self { store }
	}

	pub fn store(&self) -> &S {
		&self.store
	}

	fn read<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
		let raw = match self.store.get(key) {
			Ok(raw) => raw?,
			Err(err) => {
				warn!("{err:#}");
				return None;
			}
		};
		match serde_json::from_str(&raw) {
			Ok(value) => Some(value),
			Err(err) => {
				warn!("discarding corrupt {key}: {err}");
				None
			}
		}
	}

	fn write<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
		let raw = serde_json::to_string(value).with_context(|| format!("encoding {key}"))?;
		self.store.set(key, &raw)
	}

	pub fn load_current(&self) -> Option<SavedGame> {
		self.read(CURRENT_GAME_KEY)
	}

	pub fn save_current(&mut self, game: &SavedGame) -> Result<()> {
		self.write(CURRENT_GAME_KEY, game)
	}

	/// All readable records so far. Entries that do not parse are skipped
	/// here but stay in storage.
	pub fn history(&self) -> Vec<HistoryRecord> {
		let entries: Vec<Value> = self.read(HISTORY_KEY).unwrap_or_default();
		entries
			.into_iter()
			.enumerate()
			.filter_map(|(idx, entry)| match serde_json::from_value(entry) {
				Ok(record) => Some(record),
				Err(err) => {
					warn!("skipping unreadable history entry {idx}: {err}");
					None
				}
			})
			.collect()
	}

	/// Appends `record` after whatever is stored, readable or not. Only a
	/// value that is not a JSON array at all is replaced.
	pub fn append_history(&mut self, record: &HistoryRecord) -> Result<()> {
		let raw = self.store.get(HISTORY_KEY)?;
		let mut entries = match raw.as_deref().map(|raw| serde_json::from_str::<Vec<Value>>(raw)) {
			None => Vec::new(),
			Some(Ok(entries)) => entries,
			Some(Err(err)) => {
				warn!("{HISTORY_KEY} is not a list, starting over: {err}");
				Vec::new()
			}
		};
		entries.push(serde_json::to_value(record).context("encoding history record")?);
		self.write(HISTORY_KEY, &entries)
	}
}
