//! Turning fetched page text into a [`web_sys::Document`].

use tracing::{instrument, trace};
use wasm_bindgen::JsValue;
use web_sys::{DomParser, SupportedType};

thread_local! {
	static PARSER: Result<DomParser, JsValue> = DomParser::new();
}

/// Parses `html` as a complete `text/html` document.
///
/// Parsing itself is permissive and never fails for malformed markup.
///
/// # Errors
///
/// Iff no [***DOMParser***](https://developer.mozilla.org/en-US/docs/Web/API/DOMParser) is available.
#[instrument(skip(html), fields(len = html.len()))]
pub fn parse_document(html: &str) -> Result<web_sys::Document, JsValue> {
	PARSER.with(|parser| {
		let parser = parser.as_ref().map_err(Clone::clone)?;
		let document = parser.parse_from_string(html, SupportedType::TextHtml)?;
		trace!("Parsed document.");
		Ok(document)
	})
}
