//! `<body>` reconciliation.
//!
//! Only direct children are matched. A child that exists with identical markup is left alone.
//! Otherwise the first remaining live child with the same tag is reused, with its attributes synchronized and its content swapped out wholesale.
//! Whatever is left over on the live side is removed, and unmatched incoming children are appended at the end.
//!
//! Live children keep their relative order, even if the incoming document has them reordered.

use crate::{
	attributes::sync_attributes,
	diff::{adopt, element_children, import_clone, DocumentDiffer},
};
use hashbrown::HashMap;
use std::collections::VecDeque;
use tracing::{error, instrument, trace, trace_span};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
	/// Full serialization.
	pub key: String,
	pub tag: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMatch {
	/// Identical live child at this index, left untouched.
	Keep(usize),
	/// Live child at this index with the same tag, to be synchronized.
	Morph(usize),
	Append,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BodyPlan {
	/// One entry per incoming child.
	pub matches: Vec<BodyMatch>,
	/// Unmatched live children, in document order.
	pub remove: Vec<usize>,
}

#[must_use]
pub fn plan_body(live: &[Fingerprint], incoming: &[Fingerprint]) -> BodyPlan {
	let mut by_key = HashMap::<&str, VecDeque<usize>>::new();
	let mut by_tag = HashMap::<&str, VecDeque<usize>>::new();
	for (i, fingerprint) in live.iter().enumerate() {
		by_key.entry(fingerprint.key.as_str()).or_default().push_back(i);
		by_tag.entry(fingerprint.tag.as_str()).or_default().push_back(i);
	}

	let mut consumed = vec![false; live.len()];
	let mut matches = Vec::with_capacity(incoming.len());
	for wanted in incoming {
		let body_match = if let Some(i) = take_first(by_key.get_mut(wanted.key.as_str()), &consumed) {
			BodyMatch::Keep(i)
		} else if let Some(i) = take_first(by_tag.get_mut(wanted.tag.as_str()), &consumed) {
			BodyMatch::Morph(i)
		} else {
			BodyMatch::Append
		};
		if let BodyMatch::Keep(i) | BodyMatch::Morph(i) = body_match {
			consumed[i] = true;
		}
		matches.push(body_match);
	}

	BodyPlan {
		matches,
		remove: consumed.iter().enumerate().filter(|(_, consumed)| !**consumed).map(|(i, _)| i).collect(),
	}
}

/// Pops the first not yet consumed index, in live document order.
fn take_first(queue: Option<&mut VecDeque<usize>>, consumed: &[bool]) -> Option<usize> {
	let queue = queue?;
	while let Some(i) = queue.pop_front() {
		if !consumed[i] {
			return Some(i);
		}
	}
	None
}

impl DocumentDiffer {
	#[instrument(skip_all)]
	pub(crate) fn reconcile_body(&self, document: &web_sys::Document, live: &web_sys::Element, incoming: &web_sys::Element) {
		let live_children = element_children(live);
		let incoming_children = element_children(incoming);

		let fingerprint = |element: &web_sys::Element| Fingerprint {
			key: self.serialize(element),
			tag: element.local_name(),
		};
		let live_fingerprints: Vec<_> = live_children.iter().map(fingerprint).collect();
		let incoming_fingerprints: Vec<_> = incoming_children.iter().map(fingerprint).collect();

		let plan = plan_body(&live_fingerprints, &incoming_fingerprints);

		let mut appended = Vec::new();
		for (j, body_match) in plan.matches.into_iter().enumerate() {
			match body_match {
				BodyMatch::Keep(i) => trace!("Keeping <{}> at {}.", live_fingerprints[i].tag, i),
				BodyMatch::Morph(i) => {
					let span = trace_span!("Morphing", tag = %live_fingerprints[i].tag, i);
					let _enter = span.enter();
					morph(document, &live_children[i], &incoming_children[j]);
				}
				BodyMatch::Append => appended.push(j),
			}
		}

		for i in plan.remove {
			trace!("Removing <{}> at {}.", live_fingerprints[i].tag, i);
			live_children[i].remove();
		}

		for j in appended {
			adopt(document, live, &incoming_children[j]);
		}
	}
}

/// Synchronizes `live`'s attributes with `incoming`'s and replaces its child nodes with clones of `incoming`'s, without diffing them.
fn morph(document: &web_sys::Document, live: &web_sys::Element, incoming: &web_sys::Element) {
	sync_attributes(live, incoming);

	if live.inner_html() == incoming.inner_html() {
		return;
	}

	let child_nodes = incoming.child_nodes();
	let replacements: Vec<_> = (0..child_nodes.length())
		.filter_map(|i| child_nodes.item(i))
		.filter_map(|child| import_clone(document, &child))
		.collect();
	trace!("Replacing content with {} node(s).", replacements.len());

	live.set_text_content(None);
	for replacement in replacements {
		if let Err(error) = live.append_child(&replacement) {
			error!("Could not append to <{}>: {:?}", live.local_name(), error)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn element(tag: &str, content: &str) -> Fingerprint {
		Fingerprint {
			key: format!("<{0}>{1}</{0}>", tag, content),
			tag: tag.to_owned(),
		}
	}

	#[test]
	fn identical_bodies_keep_everything() {
		let body = [element("header", ""), element("main", "x"), element("footer", "")];
		assert_eq!(
			plan_body(&body, &body),
			BodyPlan {
				matches: vec![BodyMatch::Keep(0), BodyMatch::Keep(1), BodyMatch::Keep(2)],
				remove: vec![],
			}
		);
	}

	#[test]
	fn reordered_children_stay_in_place_and_new_ones_append() {
		let live = [element("div", "A"), element("p", "B")];
		let incoming = [element("p", "B"), element("div", "A"), element("span", "C")];
		assert_eq!(
			plan_body(&live, &incoming),
			BodyPlan {
				matches: vec![BodyMatch::Keep(1), BodyMatch::Keep(0), BodyMatch::Append],
				remove: vec![],
			}
		);
	}

	#[test]
	fn changed_content_region_is_morphed() {
		let live = [element("nav", ""), element("main", "old"), element("footer", "")];
		let incoming = [element("nav", ""), element("main", "new"), element("footer", "")];
		assert_eq!(plan_body(&live, &incoming).matches, [BodyMatch::Keep(0), BodyMatch::Morph(1), BodyMatch::Keep(2)]);
	}

	#[test]
	fn tag_fallback_uses_live_document_order() {
		let live = [element("div", "1"), element("div", "2"), element("div", "3")];
		let incoming = [element("div", "2"), element("div", "x"), element("div", "y")];
		assert_eq!(
			plan_body(&live, &incoming),
			BodyPlan {
				matches: vec![BodyMatch::Keep(1), BodyMatch::Morph(0), BodyMatch::Morph(2)],
				remove: vec![],
			}
		);
	}

	#[test]
	fn morph_can_claim_a_later_exact_match() {
		let live = [element("section", "a"), element("section", "b")];
		let incoming = [element("section", "c"), element("section", "a")];
		// `c` takes the first remaining <section>, which is `a`, so `a` then falls back to `b`.
		assert_eq!(plan_body(&live, &incoming).matches, [BodyMatch::Morph(0), BodyMatch::Morph(1)]);
	}

	#[test]
	fn leftovers_are_removed() {
		let live = [element("aside", ""), element("main", "x"), element("dialog", "")];
		let incoming = [element("main", "x")];
		assert_eq!(
			plan_body(&live, &incoming),
			BodyPlan {
				matches: vec![BodyMatch::Keep(1)],
				remove: vec![0, 2],
			}
		);
	}

	#[test]
	fn identical_live_duplicates_match_one_to_one() {
		let live = [element("hr", ""), element("hr", "")];
		let incoming = [element("hr", "")];
		assert_eq!(
			plan_body(&live, &incoming),
			BodyPlan {
				matches: vec![BodyMatch::Keep(0)],
				remove: vec![1],
			}
		);
	}

	#[test]
	fn empty_live_body_appends_all() {
		let incoming = [element("h1", "t"), element("p", "")];
		assert_eq!(plan_body(&[], &incoming).matches, [BodyMatch::Append, BodyMatch::Append]);
	}
}
