use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::{info, warn};
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, TouchEvent, Window};

use super::render;
use super::state::PlanarityState;
use super::types::HudStats;
use crate::game::{GameConfig, GameStore, LocalStorage, Point};

type SharedState = Rc<RefCell<Option<PlanarityState<LocalStorage>>>>;

const MIN_WIDTH: f64 = 300.0;
const MIN_HEIGHT: f64 = 240.0;

fn canvas_point(canvas_ref: NodeRef<leptos::html::Canvas>, client_x: i32, client_y: i32) -> Option<Point> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some(Point::new(
		client_x as f64 - rect.left(),
		client_y as f64 - rect.top(),
	))
}

/// Touch input follows the first active touch point.
fn touch_point(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &TouchEvent) -> Option<Point> {
	let touch = ev.touches().get(0)?;
	canvas_point(canvas_ref, touch.client_x(), touch.client_y())
}

fn window_size(window: &Window) -> (f64, f64) {
	let dim = |v: Result<JsValue, JsValue>, fallback: f64| v.ok().and_then(|v| v.as_f64()).unwrap_or(fallback);
	(
		dim(window.inner_width(), 800.0).max(MIN_WIDTH),
		dim(window.inner_height(), 600.0).max(MIN_HEIGHT),
	)
}

fn random_seed() -> u64 {
	(js_sys::Math::random() * (1u64 << 53) as f64) as u64 ^ js_sys::Date::now() as u64
}

fn locale_date() -> String {
	js_sys::Date::new_0()
		.to_locale_string("default", &JsValue::UNDEFINED)
		.into()
}

/// The puzzle canvas, sized to the window and tracking its resizes.
#[component]
pub fn PlanarityCanvas(config: GameConfig) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let stats = RwSignal::new(HudStats::default());
	let state: SharedState = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (state_init, animate_init, resize_cb_init) =
		(state.clone(), animate.clone(), resize_cb.clone());
	let difficulty = config.label().to_owned();

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};

		let (w, h) = window_size(&window);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let Some(ctx) = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
		else {
			warn!("2d canvas context unavailable");
			return;
		};

		let store = LocalStorage::open().map(GameStore::new);
		if store.is_none() {
			warn!("localStorage unavailable, progress will not be saved");
		}
		*state_init.borrow_mut() = Some(PlanarityState::new(config.clone(), w, h, random_seed(), store));
		info!("planarity canvas ready at {w}x{h}");

		let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
		*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
			let Some(win) = web_sys::window() else {
				return;
			};
			let (nw, nh) = window_size(&win);
			canvas_resize.set_width(nw as u32);
			canvas_resize.set_height(nh as u32);
			if let Some(ref mut s) = *state_resize.borrow_mut() {
				s.resize(nw, nh);
			}
		}));
		if let Some(ref cb) = *resize_cb_init.borrow() {
			let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}

		let (state_anim, animate_inner) = (state_init.clone(), animate_init.clone());
		let mut last_frame = js_sys::Date::now();
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			let now = js_sys::Date::now();
			let dt = ((now - last_frame) / 1000.0).max(0.0);
			last_frame = now;

			let hud = match *state_anim.borrow_mut() {
				Some(ref mut s) => {
					let hud = s.tick(dt, locale_date);
					render::render(&s.session, &ctx);
					Some(hud)
				}
				None => None,
			};
			if let Some(hud) = hud {
				stats.set(hud);
			}

			if let (Some(cb), Some(win)) = (animate_inner.borrow().as_ref(), web_sys::window()) {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some(p) = canvas_point(canvas_ref, ev.client_x(), ev.client_y()) else {
			return;
		};
		if let Some(ref mut s) = *state_md.borrow_mut() {
			if s.pointer_down(p) {
				ev.prevent_default();
			}
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some(p) = canvas_point(canvas_ref, ev.client_x(), ev.client_y()) else {
			return;
		};
		if let Some(ref mut s) = *state_mm.borrow_mut() {
			if s.pointer_move(p) {
				ev.prevent_default();
			}
		}
	};

	let state_ts = state.clone();
	let on_touchstart = move |ev: TouchEvent| {
		let Some(p) = touch_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_ts.borrow_mut() {
			if s.pointer_down(p) && ev.cancelable() {
				ev.prevent_default();
			}
		}
	};

	let state_tm = state.clone();
	let on_touchmove = move |ev: TouchEvent| {
		let Some(p) = touch_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_tm.borrow_mut() {
			if s.pointer_move(p) && ev.cancelable() {
				ev.prevent_default();
			}
		}
	};

	let release = {
		let state = state.clone();
		move || {
			if let Some(ref mut s) = *state.borrow_mut() {
				s.pointer_up();
			}
		}
	};
	let (release_mu, release_ml, release_te, release_tc) =
		(release.clone(), release.clone(), release.clone(), release);

	let state_reset = state.clone();
	let on_reset = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_reset.borrow_mut() {
			s.reset();
		}
	};

	let state_new = state.clone();
	let on_generate = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_new.borrow_mut() {
			s.generate_new();
			info!("new graph with {} nodes", s.session.graph().nodes.len());
		}
	};

	let state_hint = state.clone();
	let on_hint = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_hint.borrow_mut() {
			s.hint();
		}
	};

	let state_solve = state.clone();
	let on_solve = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_solve.borrow_mut() {
			s.auto_solve();
		}
	};

	view! {
		<div class="planarity-game">
			<canvas
				node_ref=canvas_ref
				class="planarity-canvas"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=move |_: MouseEvent| release_mu()
				on:mouseleave=move |_: MouseEvent| release_ml()
				on:touchstart=on_touchstart
				on:touchmove=on_touchmove
				on:touchend=move |_: TouchEvent| release_te()
				on:touchcancel=move |_: TouchEvent| release_tc()
				style="display: block; touch-action: none; cursor: grab;"
			/>
			<div class="planarity-hud">
				<span>"Moves: " {move || stats.get().moves.to_string()}</span>
				<span>"Time: " {move || format!("{}s", stats.get().timer)}</span>
				<span>"Score: " {move || stats.get().score.to_string()}</span>
				<span>"Planarity: " {move || format!("{}%", stats.get().planarity)}</span>
				<span>"Crossings: " {move || stats.get().crossings.to_string()}</span>
				<span>"Complexity: " {move || stats.get().complexity.to_string()}</span>
				<span>"Balance: " {move || stats.get().balance.to_string()}</span>
				<span>{difficulty}</span>
				<span class="solver-phase">{move || stats.get().solver.label()}</span>
			</div>
			<div class="planarity-controls">
				<button on:click=on_reset>"Reset"</button>
				<button on:click=on_generate>"New Graph"</button>
				<button on:click=on_hint>"Hint"</button>
				<button on:click=on_solve>"Auto Solve"</button>
			</div>
		</div>
	}
}
