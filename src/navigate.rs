//! Click and history interception that drives [`DocumentDiffer`].

use crate::{
	classify::{is_local_url, is_same_document},
	closure_map::{ClosureMap, PromiseCallback},
	diff::DocumentDiffer,
	load::parse_document,
};
use core::cell::{Cell, RefCell};
use js_sys::Promise;
use std::rc::Rc;
use tracing::{error, info, instrument, trace, warn};
use url::Url;
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationOptions {
	/// Scroll to the top (keeping the horizontal offset) after a navigation that isn't a history traversal.
	pub reset_scroll: bool,
	/// Leave clicks with modifier keys or non-primary buttons to the browser, so "open in new tab" keeps working.
	pub respect_modifier_keys: bool,
}
impl Default for NavigationOptions {
	fn default() -> Self {
		Self {
			reset_scroll: true,
			respect_modifier_keys: true,
		}
	}
}

/// Intercepts same-origin link clicks and history traversal on `window` and reconciles the fetched page into the current document.
///
/// Dropping the [`Navigator`] removes its event listeners and abandons navigations in flight.
/// Their promise callbacks are leaked so that they can still settle, but they don't touch the document anymore.
pub struct Navigator {
	state: Rc<NavigatorState>,
	on_click: Closure<dyn Fn(web_sys::Event)>,
	on_popstate: Closure<dyn Fn(web_sys::Event)>,
}

struct NavigatorState {
	window: web_sys::Window,
	differ: DocumentDiffer,
	options: NavigationOptions,
	/// Incremented per navigation. Results of older navigations are discarded.
	generation: Cell<u64>,
	/// The URL of the currently displayed page.
	location: RefCell<Url>,
	callbacks: RefCell<ClosureMap>,
}

impl Navigator {
	/// # Errors
	///
	/// Iff there is no `window`, its location can't be read or listeners can't be added.
	#[instrument]
	pub fn install(options: NavigationOptions) -> Result<Self, JsValue> {
		let window = web_sys::window().ok_or_else(|| JsValue::from_str("spa-dom: No `window` available."))?;
		let state = NavigatorState::new(window, options)?;

		let on_click = Closure::wrap(Box::new({
			let state = Rc::clone(&state);
			move |event: web_sys::Event| state.on_click(&event)
		}) as Box<dyn Fn(web_sys::Event)>);
		let on_popstate = Closure::wrap(Box::new({
			let state = Rc::clone(&state);
			move |_: web_sys::Event| state.on_popstate()
		}) as Box<dyn Fn(web_sys::Event)>);

		state.window.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())?;
		if let Err(error) = state.window.add_event_listener_with_callback("popstate", on_popstate.as_ref().unchecked_ref()) {
			remove_listener(&state.window, "click", &on_click);
			return Err(error);
		}
		info!("Installed navigation listeners.");

		Ok(Self { state, on_click, on_popstate })
	}

	/// Navigates to `url` as if a link to it had been clicked.
	pub fn navigate(&self, url: Url) {
		self.state.navigate(url, false)
	}

	#[must_use]
	pub fn options(&self) -> NavigationOptions {
		self.state.options
	}
}

impl Drop for Navigator {
	fn drop(&mut self) {
		remove_listener(&self.state.window, "click", &self.on_click);
		remove_listener(&self.state.window, "popstate", &self.on_popstate);

		let abandoned = self.state.callbacks.borrow_mut().take_pending();
		trace!("Dropped navigator with {} pending promise callback pair(s).", abandoned.len());
		for (on_fulfilled, on_rejected) in abandoned {
			on_fulfilled.forget();
			on_rejected.forget();
		}
	}
}

impl NavigatorState {
	fn new(window: web_sys::Window, options: NavigationOptions) -> Result<Rc<Self>, JsValue> {
		let location = current_url(&window)?;
		Ok(Rc::new(Self {
			window,
			differ: DocumentDiffer::new()?,
			options,
			generation: Cell::new(0),
			location: RefCell::new(location),
			callbacks: RefCell::default(),
		}))
	}

	fn on_click(self: &Rc<Self>, event: &web_sys::Event) {
		if event.default_prevented() {
			return;
		}

		if self.options.respect_modifier_keys {
			if let Some(mouse_event) = event.dyn_ref::<web_sys::MouseEvent>() {
				if mouse_event.button() != 0 || mouse_event.ctrl_key() || mouse_event.meta_key() || mouse_event.shift_key() || mouse_event.alt_key() {
					return;
				}
			}
		}

		let anchor = match event
			.target()
			.and_then(|target| target.dyn_into::<web_sys::Element>().ok())
			.and_then(|element| element.closest("a").ok().flatten())
			.and_then(|a| a.dyn_into::<web_sys::HtmlAnchorElement>().ok())
		{
			Some(anchor) => anchor,
			None => return,
		};

		let target = anchor.target();
		if anchor.has_attribute("download") || !(target.is_empty() || target == "_self") {
			return;
		}

		let href = anchor.href();
		let location = self.location.borrow().clone();
		if !is_local_url(&href, &location) {
			return;
		}
		let url = match Url::parse(&href) {
			Ok(url) => url,
			Err(_) => return,
		};
		if url.fragment().is_some() && is_same_document(&url, &location) {
			trace!("Leaving in-page navigation to {} to the browser.", url);
			return;
		}

		event.prevent_default();
		self.navigate(url, false);
	}

	fn on_popstate(self: &Rc<Self>) {
		let url = match current_url(&self.window) {
			Ok(url) => url,
			Err(error) => return error!("Could not read location after popstate: {:?}", error),
		};
		if is_same_document(&url, &self.location.borrow()) {
			trace!("Ignoring popstate within the same document.");
			*self.location.borrow_mut() = url;
			return;
		}
		self.navigate(url, true)
	}

	#[instrument(skip(self, url), fields(url = %url))]
	fn navigate(self: &Rc<Self>, url: Url, is_back: bool) {
		let generation = self.begin();
		info!(generation, is_back, "Navigating.");

		let fetched = self.window.fetch_with_str(url.as_str());
		self.when_settled(generation, &fetched, move |state, response| {
			match response.dyn_into::<web_sys::Response>().and_then(|response| response.text()) {
				Ok(text) => state.when_settled(generation, &text, move |state, html| state.complete(&url, is_back, &html)),
				Err(error) => error!("Could not read response body: {:?}", error),
			}
		});
	}

	/// Starts a new navigation, superseding all earlier ones.
	fn begin(&self) -> u64 {
		let generation = self.generation.get().wrapping_add(1);
		self.generation.set(generation);
		self.callbacks.borrow_mut().sweep();
		generation
	}

	/// Continues navigation `generation` with `value`, unless another navigation started in the meantime.
	fn resume<F>(self: &Rc<Self>, generation: u64, value: JsValue, on_fulfilled: F)
	where
		F: FnOnce(&Rc<Self>, JsValue),
	{
		if self.generation.get() != generation {
			return trace!("Discarding result of superseded navigation {}.", generation);
		}
		on_fulfilled(self, value)
	}

	/// Calls `on_fulfilled` once `promise` resolves, unless another navigation started in the meantime.
	fn when_settled<F>(self: &Rc<Self>, generation: u64, promise: &Promise, on_fulfilled: F)
	where
		F: 'static + FnOnce(&Rc<Self>, JsValue),
	{
		let ticket = self.callbacks.borrow_mut().reserve();

		let fulfilled: PromiseCallback = Closure::wrap(Box::new({
			let state = Rc::downgrade(self);
			let mut on_fulfilled = Some(on_fulfilled);
			move |value: JsValue| {
				let state = match state.upgrade() {
					Some(state) => state,
					None => return,
				};
				state.callbacks.borrow_mut().settle(ticket);
				if let Some(on_fulfilled) = on_fulfilled.take() {
					state.resume(generation, value, on_fulfilled)
				}
			}
		}) as Box<dyn FnMut(JsValue)>);

		let rejected: PromiseCallback = Closure::wrap(Box::new({
			let state = Rc::downgrade(self);
			move |reason: JsValue| {
				if let Some(state) = state.upgrade() {
					state.callbacks.borrow_mut().settle(ticket);
				}
				error!("Navigation {} failed: {:?}", generation, reason)
			}
		}) as Box<dyn FnMut(JsValue)>);

		let mut callbacks = self.callbacks.borrow_mut();
		if let Some((fulfilled, rejected)) = callbacks.publish(ticket, (fulfilled, rejected)) {
			let _ = promise.then2(fulfilled, rejected);
		}
	}

	fn complete(&self, url: &Url, is_back: bool, html: &JsValue) {
		let html = match html.as_string() {
			Some(html) => html,
			None => return error!("Response body was not a string: {:?}", html),
		};
		let incoming = match parse_document(&html) {
			Ok(incoming) => incoming,
			Err(error) => return error!("Could not parse fetched page: {:?}", error),
		};
		let document = match self.window.document() {
			Some(document) => document,
			None => return error!("`window` has no document."),
		};

		let live_base = self.location.borrow().clone();
		self.differ.diff(&document, &incoming, &live_base, url);
		*self.location.borrow_mut() = url.clone();

		if is_back {
			return;
		}

		match self.window.history() {
			Ok(history) => {
				if let Err(error) = history.push_state_with_url(&JsValue::NULL, "", Some(url.as_str())) {
					error!("Could not push history state: {:?}", error)
				}
			}
			Err(error) => error!("Could not access history: {:?}", error),
		}

		if self.options.reset_scroll {
			let x = self.window.scroll_x().unwrap_or(0.0);
			self.window.scroll_to_with_x_and_y(x, 0.0);
		}
	}
}

fn remove_listener(window: &web_sys::Window, name: &str, listener: &Closure<dyn Fn(web_sys::Event)>) {
	if let Err(error) = window.remove_event_listener_with_callback(name, listener.as_ref().unchecked_ref()) {
		warn!("Failed to remove {} listener: {:?}", name, error)
	}
}

fn current_url(window: &web_sys::Window) -> Result<Url, JsValue> {
	let href = window.location().href()?;
	Url::parse(&href).map_err(|error| JsValue::from_str(&format!("spa-dom: Unparsable location {:?}: {}", href, error)))
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
	use super::*;
	use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

	wasm_bindgen_test_configure!(run_in_browser);

	/// The current page with only its title changed, so reconciling it leaves the rest of the test page alone.
	fn current_page_titled(title: &str) -> JsValue {
		let document = web_sys::window().unwrap().document().unwrap();
		let page = parse_document(&document.document_element().unwrap().outer_html()).unwrap();
		page.set_title(title);
		JsValue::from_str(&page.document_element().unwrap().outer_html())
	}

	#[wasm_bindgen_test]
	fn only_the_latest_navigation_is_applied() {
		let window = web_sys::window().unwrap();
		let document = window.document().unwrap();
		let original_href = window.location().href().unwrap();
		let original_title = document.title();

		let start = Url::parse(&original_href).unwrap();
		let first_url = start.join("?spa-dom=first").unwrap();
		let second_url = start.join("?spa-dom=second").unwrap();
		let back_url = start.join("?spa-dom=back").unwrap();

		let options = NavigationOptions {
			reset_scroll: false,
			respect_modifier_keys: true,
		};
		let state = NavigatorState::new(window.clone(), options).unwrap();

		let first = state.begin();
		let second = state.begin();

		state.resume(first, current_page_titled("First"), |state, html| state.complete(&first_url, false, &html));
		assert_eq!(document.title(), original_title);
		assert_eq!(window.location().href().unwrap(), original_href);
		assert_eq!(*state.location.borrow(), start);

		state.resume(second, current_page_titled("Second"), |state, html| state.complete(&second_url, false, &html));
		assert_eq!(document.title(), "Second");
		assert_eq!(window.location().href().unwrap(), second_url.as_str());
		assert_eq!(*state.location.borrow(), second_url);

		// History traversal reconciles, but doesn't push.
		let back = state.begin();
		state.resume(back, current_page_titled("Back"), |state, html| state.complete(&back_url, true, &html));
		assert_eq!(document.title(), "Back");
		assert_eq!(window.location().href().unwrap(), second_url.as_str());
		assert_eq!(*state.location.borrow(), back_url);

		window.history().unwrap().replace_state_with_url(&JsValue::NULL, "", Some(&original_href)).unwrap();
		document.set_title(&original_title);
	}
}
