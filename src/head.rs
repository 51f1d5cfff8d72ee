//! `<head>` reconciliation.
//!
//! Singletons (`<title>`, named `<meta>`) are updated in place.
//! Everything else is matched by [`IdentityKey`] and either kept, removed or appended.

use crate::{
	attributes::sync_attributes,
	diff::{adopt, element_children, DocumentDiffer},
	key::{resource_identity, singleton_key, IdentityKey, Normalization, ResourceIdentity},
};
use hashbrown::{hash_map::Entry, HashMap, HashSet};
use tracing::{error, info, instrument, trace, trace_span};
use url::Url;

/// What to do with the children of the live and incoming `<head>`, by index.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HeadPlan {
	/// `(live, incoming)` singleton pairs, synchronized in place.
	pub sync: Vec<(usize, usize)>,
	/// Live children without counterpart, in document order.
	pub remove: Vec<usize>,
	/// Incoming children to append, in incoming order.
	pub append: Vec<usize>,
	/// Incoming children skipped because an identical one was kept or added already.
	pub duplicates: Vec<usize>,
}

#[must_use]
pub fn plan_head(live: &[IdentityKey], incoming: &[IdentityKey]) -> HeadPlan {
	let mut plan = HeadPlan::default();

	let mut singletons = HashMap::<&IdentityKey, usize>::new();
	let mut removal_candidates = HashMap::<&IdentityKey, usize>::new();
	for (i, key) in live.iter().enumerate() {
		if key.is_singleton() {
			singletons.insert(key, i);
			continue;
		}
		match removal_candidates.entry(key) {
			Entry::Vacant(vacant) => {
				vacant.insert(i);
			}
			Entry::Occupied(_) => {
				trace!("Live duplicate {}", key);
				plan.remove.push(i)
			}
		}
	}

	let mut seen = HashSet::<&IdentityKey>::new();
	for (j, key) in incoming.iter().enumerate() {
		if key.is_singleton() {
			if let Some(&i) = singletons.get(key) {
				plan.sync.push((i, j));
				continue;
			}
		} else if removal_candidates.remove(key).is_some() {
			trace!("Keep {}", key);
			seen.insert(key);
			continue;
		}

		if seen.insert(key) {
			info!("Add {}", key);
			plan.append.push(j);
		} else {
			info!("Duplicate {}", key);
			plan.duplicates.push(j);
		}
	}

	plan.remove.extend(removal_candidates.values());
	plan.remove.sort_unstable();
	plan
}

impl DocumentDiffer {
	/// Computes `element`'s head key, rewriting a relative resource reference to its absolute path on the way.
	fn head_key(&self, element: &web_sys::Element, base: &Url) -> IdentityKey {
		if let Some(key) = singleton_key(element) {
			return key;
		}

		if let Some(ResourceIdentity { key, normalization }) = resource_identity(element, base) {
			if let Some(Normalization { attribute, value }) = normalization {
				trace!("Normalizing {}={:?}", attribute, value);
				if let Err(error) = element.set_attribute(attribute, &value) {
					error!("Could not normalize {}={:?}: {:?}", attribute, value, error)
				}
			}
			return key;
		}

		IdentityKey::Opaque(self.serialize(element))
	}

	#[instrument(skip_all)]
	pub(crate) fn reconcile_head(&self, document: &web_sys::Document, live: &web_sys::Element, incoming: &web_sys::Element, live_base: &Url, incoming_base: &Url) {
		let live_children = element_children(live);
		let incoming_children = element_children(incoming);

		let live_keys: Vec<_> = live_children.iter().map(|child| self.head_key(child, live_base)).collect();
		let incoming_keys: Vec<_> = incoming_children.iter().map(|child| self.head_key(child, incoming_base)).collect();

		let plan = plan_head(&live_keys, &incoming_keys);
		trace!(
			sync = plan.sync.len(),
			remove = plan.remove.len(),
			append = plan.append.len(),
			duplicates = plan.duplicates.len(),
			"Planned head reconciliation."
		);

		for (i, j) in plan.sync {
			let span = trace_span!("Synchronizing singleton", key = %live_keys[i]);
			let _enter = span.enter();
			sync_singleton(&live_children[i], &incoming_children[j]);
		}

		for i in plan.remove {
			trace!("Remove {}", live_keys[i]);
			live_children[i].remove();
		}

		for j in plan.append {
			adopt(document, live, &incoming_children[j]);
		}
	}
}

fn sync_singleton(live: &web_sys::Element, incoming: &web_sys::Element) {
	sync_attributes(live, incoming);
	let text = incoming.text_content();
	if live.text_content() != text {
		live.set_text_content(text.as_deref());
	}
}
