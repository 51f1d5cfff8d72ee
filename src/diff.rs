use tracing::{error, instrument, trace, warn};
use url::Url;
use wasm_bindgen::{throw_str, JsValue};

use crate::attributes::sync_attributes;

/// Reconciles a freshly parsed document into the live one.
///
/// Holds the [***XMLSerializer***](https://developer.mozilla.org/en-US/docs/Web/API/XMLSerializer) used for opaque element keys,
/// which is stateless and can be reused across any number of [`diff`](`DocumentDiffer::diff`) calls.
///
/// # Correct Use
///
/// Reconciliations must not interleave on the same live document.
/// Since [`diff`](`DocumentDiffer::diff`) is synchronous, this only matters for callers that split it across tasks, which they shouldn't.
#[derive(Debug)]
pub struct DocumentDiffer {
	serializer: web_sys::XmlSerializer,
}
impl DocumentDiffer {
	/// # Errors
	///
	/// Iff the [***XMLSerializer***](https://developer.mozilla.org/en-US/docs/Web/API/XMLSerializer) can't be constructed.
	#[instrument]
	pub fn new() -> Result<Self, JsValue> {
		Ok(Self {
			serializer: web_sys::XmlSerializer::new()?,
		})
	}

	/// Mutates `live` in place so that its root, `<head>` and `<body>` match `incoming`.
	///
	/// 1. Attributes of the root element, `<head>` and `<body>` are synchronized.
	/// 2. `<head>` children are matched by identity key. Relative `<script src>` and `<link href>` values in **both** documents
	///    are rewritten to absolute paths (resolved against `live_base` and `incoming_base` respectively).
	/// 3. `<body>` children are matched by serialization, then by tag name. Matched-by-tag children have their attributes
	///    synchronized and their content replaced wholesale. New children are appended at the end.
	///
	/// Nodes taken over from `incoming` are imported as deep clones, so `incoming` keeps its content.
	/// Calling this again with the same `incoming` doesn't change `live` any further.
	///
	/// # Panics / Throws
	///
	/// If either document has no root element, `<head>` or `<body>`.
	#[instrument(skip_all, fields(live_base = %live_base, incoming_base = %incoming_base))]
	pub fn diff(&self, live: &web_sys::Document, incoming: &web_sys::Document, live_base: &Url, incoming_base: &Url) {
		let live_root = expect_part(live.document_element(), "live root element");
		let incoming_root = expect_part(incoming.document_element(), "incoming root element");
		let live_head = expect_part(live.head(), "live <head>");
		let incoming_head = expect_part(incoming.head(), "incoming <head>");
		let live_body = expect_part(live.body(), "live <body>");
		let incoming_body = expect_part(incoming.body(), "incoming <body>");

		sync_attributes(&live_root, &incoming_root);
		sync_attributes(&live_head, &incoming_head);
		sync_attributes(&live_body, &incoming_body);

		self.reconcile_head(live, &live_head, &incoming_head, live_base, incoming_base);
		self.reconcile_body(live, &live_body, &incoming_body);
	}

	/// Canonical markup of `element`, used as its opaque identity.
	pub(crate) fn serialize(&self, element: &web_sys::Element) -> String {
		self.serializer.serialize_to_string(element).unwrap_or_else(|error| {
			warn!("Could not serialize <{}>, falling back to `outerHTML`: {:?}", element.local_name(), error);
			element.outer_html()
		})
	}
}

/// Deep clone of `node` (from any document), owned by `document`.
pub(crate) fn import_clone(document: &web_sys::Document, node: &web_sys::Node) -> Option<web_sys::Node> {
	match document.import_node_with_deep(node, true) {
		Ok(clone) => Some(clone),
		Err(error) => {
			error!("Could not import node {:?}: {:?}", node, error);
			None
		}
	}
}

/// Appends a deep clone of `node` to `parent`, which must be in `document`.
pub(crate) fn adopt(document: &web_sys::Document, parent: &web_sys::Element, node: &web_sys::Node) {
	if let Some(clone) = import_clone(document, node) {
		match parent.append_child(&clone) {
			Ok(_) => trace!("Appended <{}>.", node.node_name()),
			Err(error) => error!("Could not append node {:?}: {:?}", clone, error),
		}
	}
}

/// Snapshot of `element`'s child elements, unaffected by later mutation.
pub(crate) fn element_children(element: &web_sys::Element) -> Vec<web_sys::Element> {
	let children = element.children();
	(0..children.length()).filter_map(|i| children.item(i)).collect()
}

fn expect_part<T>(part: Option<T>, what: &str) -> T {
	match part {
		Some(part) => part,
		None => {
			if cfg!(debug_assertions) {
				panic!("spa-dom: Document has no {}.", what)
			} else {
				throw_str("spa-dom: Document is missing a root element, <head> or <body>.")
			}
		}
	}
}
