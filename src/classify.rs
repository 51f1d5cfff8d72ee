//! Link and resource reference classification.

use url::Url;

/// Whether `href` (an absolute URL, as returned by [***HTMLAnchorElement.href***](https://developer.mozilla.org/en-US/docs/Web/API/HTMLAnchorElement/href))
/// points at the same origin as `page`.
///
/// Unparsable input is never local.
#[must_use]
pub fn is_local_url(href: &str, page: &Url) -> bool {
	match Url::parse(href) {
		Ok(url) => url.origin() == page.origin(),
		Err(_) => false,
	}
}

/// Whether a `src`/`href` attribute value has to be resolved against the document's base URL before it can be compared.
///
/// This is a prefix heuristic, not URL grammar: anything that doesn't start with `http` counts,
/// which includes protocol-relative references like `//cdn.example/x.js`.
#[must_use]
pub fn is_relative_href(href: &str) -> bool {
	href.starts_with('.') || !href.starts_with("http")
}

/// Resolves `href` against `base` and returns only the resulting path.
///
/// Query and fragment are dropped.
#[must_use]
pub fn absolute_path(href: &str, base: &Url) -> Option<String> {
	base.join(href).ok().map(|url| url.path().to_owned())
}

/// Whether `a` and `b` only differ in their fragment, if at all.
#[must_use]
pub fn is_same_document(a: &Url, b: &Url) -> bool {
	a[..url::Position::AfterQuery] == b[..url::Position::AfterQuery]
}
