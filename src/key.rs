//! Identity keys used to match elements across the live and incoming documents.
//!
//! Keys only live for the duration of one [`DocumentDiffer::diff`](`crate::diff::DocumentDiffer::diff`) call.

use crate::classify::{absolute_path, is_relative_href};
use core::fmt::{self, Display, Formatter};
use url::Url;

/// Read access to the parts of an element that keying looks at.
pub trait ElementView {
	/// The element's [***localName***](https://developer.mozilla.org/en-US/docs/Web/API/Element/localName).
	fn local_name(&self) -> String;
	fn attribute(&self, name: &str) -> Option<String>;
}

impl ElementView for web_sys::Element {
	fn local_name(&self) -> String {
		web_sys::Element::local_name(self)
	}

	fn attribute(&self, name: &str) -> Option<String> {
		self.get_attribute(name)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
	/// `title`, `meta[name=…]` or `meta[property=…]`. Assumed unique per `<head>`.
	Singleton(String),
	/// `script[src=…]` or `link[rel=…][href=…]`, with the reference normalized.
	Resource(String),
	/// The element's full serialization.
	Opaque(String),
}
impl IdentityKey {
	#[must_use]
	pub fn as_str(&self) -> &str {
		match self {
			IdentityKey::Singleton(key) | IdentityKey::Resource(key) | IdentityKey::Opaque(key) => key,
		}
	}

	#[must_use]
	pub fn is_singleton(&self) -> bool {
		matches!(self, IdentityKey::Singleton(_))
	}
}

impl Display for IdentityKey {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let key = self.as_str();
		if cfg!(feature = "dangerous-logging") || !matches!(self, IdentityKey::Opaque(_)) {
			return f.write_str(key);
		}

		let tag = key.trim_start_matches('<').split(|c: char| c.is_whitespace() || c == '>' || c == '/').next().unwrap_or_default();
		write!(f, "<{}> ({} bytes, redacted)", tag, key.len())
	}
}

/// An attribute rewrite that makes a resource reference absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalization {
	pub attribute: &'static str,
	pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceIdentity {
	pub key: IdentityKey,
	/// [`None`] if the attribute is absolute already or was normalized before.
	pub normalization: Option<Normalization>,
}

#[must_use]
pub fn singleton_key(element: &impl ElementView) -> Option<IdentityKey> {
	match element.local_name().as_str() {
		"title" => Some(IdentityKey::Singleton("title".to_owned())),
		"meta" => {
			if let Some(name) = element.attribute("name") {
				Some(IdentityKey::Singleton(format!("meta[name={}]", name)))
			} else {
				element.attribute("property").map(|property| IdentityKey::Singleton(format!("meta[property={}]", property)))
			}
		}
		_ => None,
	}
}

/// Keys `<script src>` and `<link href>` by their reference, resolved against `base` if [relative](`is_relative_href`).
///
/// Does not modify `element`. Apply the returned [`Normalization`] to keep the element consistent with its key.
///
/// Returns [`None`] for other elements and for references that can't be resolved.
#[must_use]
pub fn resource_identity(element: &impl ElementView, base: &Url) -> Option<ResourceIdentity> {
	let (attribute, value, prefix) = match element.local_name().as_str() {
		"script" => ("src", element.attribute("src")?, "script".to_owned()),
		"link" => {
			let href = element.attribute("href")?;
			let rel = element.attribute("rel").unwrap_or_default();
			("href", href, format!("link[rel={}]", rel))
		}
		_ => return None,
	};

	if !is_relative_href(&value) {
		return Some(ResourceIdentity {
			key: IdentityKey::Resource(format!("{}[{}={}]", prefix, attribute, value)),
			normalization: None,
		});
	}

	let path = absolute_path(&value, base)?;
	Some(ResourceIdentity {
		key: IdentityKey::Resource(format!("{}[{}={}]", prefix, attribute, path)),
		normalization: if path == value { None } else { Some(Normalization { attribute, value: path }) },
	})
}
