//! Namespace-aware attribute synchronization.

use tracing::{error, instrument, trace, warn};

/// One [***Attr***](https://developer.mozilla.org/en-US/docs/Web/API/Attr) as read from a [***NamedNodeMap***](https://developer.mozilla.org/en-US/docs/Web/API/NamedNodeMap).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRecord {
	pub namespace: Option<String>,
	pub local_name: String,
	pub prefix: Option<String>,
	/// The qualified name.
	pub name: String,
	pub value: String,
}
impl AttributeRecord {
	#[must_use]
	pub fn plain(name: &str, value: &str) -> Self {
		Self {
			namespace: None,
			local_name: name.to_owned(),
			prefix: None,
			name: name.to_owned(),
			value: value.to_owned(),
		}
	}

	#[must_use]
	pub fn namespaced(namespace: &str, prefix: Option<&str>, local_name: &str, value: &str) -> Self {
		Self {
			namespace: Some(namespace.to_owned()),
			local_name: local_name.to_owned(),
			prefix: prefix.map(ToOwned::to_owned),
			name: match prefix {
				Some(prefix) => format!("{}:{}", prefix, local_name),
				None => local_name.to_owned(),
			},
			value: value.to_owned(),
		}
	}

	fn read(attribute: &web_sys::Attr) -> Self {
		Self {
			namespace: attribute.namespace_uri(),
			local_name: attribute.local_name(),
			prefix: attribute.prefix(),
			name: attribute.name(),
			value: attribute.value(),
		}
	}

	/// Like [***getAttributeNS***](https://developer.mozilla.org/en-US/docs/Web/API/Element/getAttributeNS) for namespaced attributes
	/// and [***getAttribute***](https://developer.mozilla.org/en-US/docs/Web/API/Element/getAttribute) otherwise.
	fn find_counterpart<'a>(&self, others: &'a [AttributeRecord]) -> Option<&'a AttributeRecord> {
		match &self.namespace {
			Some(namespace) => others.iter().find(|other| other.namespace.as_ref() == Some(namespace) && other.local_name == self.local_name),
			None => others.iter().find(|other| other.name == self.name),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeMutation {
	Set { namespace: Option<String>, name: String, value: String },
	Remove { namespace: Option<String>, name: String },
}

/// Computes the mutations that make `target`'s attributes equal to `source`'s.
///
/// Attributes whose value already matches produce no mutation.
#[must_use]
pub fn plan_attributes(target: &[AttributeRecord], source: &[AttributeRecord]) -> Vec<AttributeMutation> {
	let mut mutations = Vec::new();

	for wanted in source {
		if wanted.find_counterpart(target).map(|existing| existing.value.as_str()) == Some(wanted.value.as_str()) {
			continue;
		}
		mutations.push(match &wanted.namespace {
			Some(namespace) => AttributeMutation::Set {
				namespace: Some(namespace.clone()),
				// Namespace declarations have to keep their `xmlns:` prefix.
				name: if wanted.prefix.as_deref() == Some("xmlns") {
					wanted.name.clone()
				} else {
					wanted.local_name.clone()
				},
				value: wanted.value.clone(),
			},
			None => AttributeMutation::Set {
				namespace: None,
				name: wanted.name.clone(),
				value: wanted.value.clone(),
			},
		});
	}

	for existing in target {
		if existing.find_counterpart(source).is_none() {
			mutations.push(match &existing.namespace {
				Some(namespace) => AttributeMutation::Remove {
					namespace: Some(namespace.clone()),
					name: existing.local_name.clone(),
				},
				None => AttributeMutation::Remove {
					namespace: None,
					name: existing.name.clone(),
				},
			});
		}
	}

	mutations
}

#[must_use]
pub fn read_attributes(element: &web_sys::Element) -> Vec<AttributeRecord> {
	let attributes = element.attributes();
	(0..attributes.length()).filter_map(|i| attributes.item(i)).map(|attribute| AttributeRecord::read(&attribute)).collect()
}

/// Makes `target`'s attribute set equal to `source`'s, writing only what differs.
///
/// The element itself (and so its tag) is kept.
#[instrument(skip(target, source), fields(tag = %target.local_name()))]
pub fn sync_attributes(target: &web_sys::Element, source: &web_sys::Element) {
	let mutations = plan_attributes(&read_attributes(target), &read_attributes(source));
	if mutations.is_empty() {
		return;
	}
	trace!("Applying {} attribute mutation(s).", mutations.len());

	for mutation in mutations {
		match mutation {
			AttributeMutation::Set { namespace: Some(namespace), name, value } => {
				if let Err(error) = target.set_attribute_ns(Some(&namespace), &name, &value) {
					error!("Could not set attribute {:?}={:?} (namespace {:?}): {:?}", name, value, namespace, error)
				}
			}
			AttributeMutation::Set { namespace: None, name, value } => {
				if let Err(error) = target.set_attribute(&name, &value) {
					error!("Could not set attribute {:?}={:?}: {:?}", name, value, error)
				}
			}
			AttributeMutation::Remove { namespace: Some(namespace), name } => {
				if let Err(error) = target.remove_attribute_ns(Some(&namespace), &name) {
					warn!("Could not remove attribute {:?} (namespace {:?}): {:?}", name, namespace, error)
				}
			}
			AttributeMutation::Remove { namespace: None, name } => {
				if let Err(error) = target.remove_attribute(&name) {
					warn!("Could not remove attribute {:?}: {:?}", name, error)
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const XLINK: &str = "http://www.w3.org/1999/xlink";
	const XMLNS: &str = "http://www.w3.org/2000/xmlns/";

	#[test]
	fn equal_sets_need_nothing() {
		let attributes = [AttributeRecord::plain("class", "a"), AttributeRecord::namespaced(XLINK, Some("xlink"), "href", "#x")];
		assert_eq!(plan_attributes(&attributes, &attributes), []);
	}

	#[test]
	fn changed_added_and_removed() {
		let target = [AttributeRecord::plain("class", "a"), AttributeRecord::plain("hidden", "")];
		let source = [AttributeRecord::plain("class", "b"), AttributeRecord::plain("id", "main")];
		assert_eq!(
			plan_attributes(&target, &source),
			[
				AttributeMutation::Set {
					namespace: None,
					name: "class".to_owned(),
					value: "b".to_owned()
				},
				AttributeMutation::Set {
					namespace: None,
					name: "id".to_owned(),
					value: "main".to_owned()
				},
				AttributeMutation::Remove {
					namespace: None,
					name: "hidden".to_owned()
				},
			]
		);
	}

	#[test]
	fn namespaced_attributes_use_local_name() {
		let target = [AttributeRecord::namespaced(XLINK, Some("xlink"), "href", "#old"), AttributeRecord::namespaced(XLINK, Some("xlink"), "title", "t")];
		let source = [AttributeRecord::namespaced(XLINK, Some("xlink"), "href", "#new")];
		assert_eq!(
			plan_attributes(&target, &source),
			[
				AttributeMutation::Set {
					namespace: Some(XLINK.to_owned()),
					name: "href".to_owned(),
					value: "#new".to_owned()
				},
				AttributeMutation::Remove {
					namespace: Some(XLINK.to_owned()),
					name: "title".to_owned()
				},
			]
		);
	}

	#[test]
	fn namespace_declarations_keep_their_prefix() {
		let source = [AttributeRecord::namespaced(XMLNS, Some("xmlns"), "xlink", XLINK)];
		assert_eq!(
			plan_attributes(&[], &source),
			[AttributeMutation::Set {
				namespace: Some(XMLNS.to_owned()),
				name: "xmlns:xlink".to_owned(),
				value: XLINK.to_owned()
			}]
		);
	}

	#[test]
	fn plain_and_namespaced_with_same_local_name_are_distinct() {
		let target = [AttributeRecord::plain("href", "a")];
		let source = [AttributeRecord::namespaced(XLINK, Some("xlink"), "href", "a")];
		let mutations = plan_attributes(&target, &source);
		assert!(mutations.contains(&AttributeMutation::Set {
			namespace: Some(XLINK.to_owned()),
			name: "href".to_owned(),
			value: "a".to_owned()
		}));
		assert!(mutations.contains(&AttributeMutation::Remove {
			namespace: None,
			name: "href".to_owned()
		}));
	}

	#[test]
	fn empty_value_is_still_a_value() {
		let target = [AttributeRecord::plain("hidden", "")];
		assert_eq!(plan_attributes(&target, &[AttributeRecord::plain("hidden", "")]), []);
		assert_eq!(
			plan_attributes(&[], &[AttributeRecord::plain("hidden", "")]),
			[AttributeMutation::Set {
				namespace: None,
				name: "hidden".to_owned(),
				value: String::new()
			}]
		);
	}
}
