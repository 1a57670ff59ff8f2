use leptos::prelude::*;
use web_sys::UrlSearchParams;

use crate::components::planarity::PlanarityCanvas;
use crate::game::GameConfig;

/// Reads `?difficulty=...&new=true` off the current URL.
fn config_from_url() -> GameConfig {
	let params = web_sys::window()
		.and_then(|w| w.location().search().ok())
		.and_then(|search| UrlSearchParams::new_with_str(&search).ok());
	match params {
		Some(params) => GameConfig::from_params(
			params.get("difficulty").as_deref(),
			params.get("new").as_deref(),
		),
		None => GameConfig::default(),
	}
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let config = config_from_url();

	view! {
		<div class="fullscreen-graph">
			<PlanarityCanvas config=config />
			<div class="graph-overlay">
				<h1>"Planarity"</h1>
				<p class="subtitle">"Drag the nodes until no two edges cross."</p>
			</div>
		</div>
	}
}
