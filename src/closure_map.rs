use hashbrown::{hash_map::Entry, HashMap};
use tracing::{error, trace};
use wasm_bindgen::{closure::Closure, JsValue};

pub(crate) type PromiseCallback = Closure<dyn FnMut(JsValue)>;

/// Keeps promise callbacks alive until they have run.
///
/// Callbacks can't be dropped from inside themselves, so settled tickets are only marked and then freed by the next [`sweep`](`ClosureMap::sweep`).
pub(crate) struct ClosureMap<T = (PromiseCallback, PromiseCallback)> {
	next_ticket: u64,
	pending: HashMap<u64, T>,
	settled: Vec<u64>,
}
impl<T> Default for ClosureMap<T> {
	fn default() -> Self {
		Self {
			next_ticket: 0,
			pending: HashMap::new(),
			settled: Vec::new(),
		}
	}
}
impl<T> ClosureMap<T> {
	pub(crate) fn reserve(&mut self) -> u64 {
		let ticket = self.next_ticket;
		self.next_ticket = self.next_ticket.wrapping_add(1);
		ticket
	}

	/// Stores the callbacks for `ticket` and returns them for passing to [`js_sys::Promise::then2`].
	///
	/// A ticket that is still in use is rejected, and the callbacks stored under it are kept.
	pub(crate) fn publish(&mut self, ticket: u64, callbacks: T) -> Option<&T> {
		match self.pending.entry(ticket) {
			Entry::Vacant(vacant) => {
				trace!("Published promise callbacks for ticket {}.", ticket);
				Some(vacant.insert(callbacks))
			}
			Entry::Occupied(_) => {
				error!("spa-dom bug: Promise callback ticket {} is already in use.", ticket);
				None
			}
		}
	}

	pub(crate) fn settle(&mut self, ticket: u64) {
		self.settled.push(ticket);
	}

	/// Frees the callbacks of all settled tickets. Must not be called from inside one of them.
	pub(crate) fn sweep(&mut self) {
		let Self { pending, settled, .. } = self;
		let count = settled.drain(..).filter(|ticket| pending.remove(ticket).is_some()).count();
		trace!("Freed {} settled promise callback pair(s), {} still pending.", count, pending.len());
	}

	/// Sweeps, then hands out the callbacks that haven't run yet.
	pub(crate) fn take_pending(&mut self) -> Vec<T> {
		self.sweep();
		self.pending.drain().map(|(_, callbacks)| callbacks).collect()
	}

	pub(crate) fn len(&self) -> usize {
		self.pending.len()
	}
}
