mod component;
mod render;
mod state;
mod types;

pub use component::PlanarityCanvas;
pub use state::PlanarityState;
pub use types::HudStats;
