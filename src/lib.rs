//! Client-side navigation for server-rendered sites.
//!
//! Same-origin link clicks and history traversal are intercepted, the target page is fetched and parsed,
//! and [`DocumentDiffer::diff`](`diff::DocumentDiffer::diff`) reconciles it into the live document,
//! so that unchanged elements keep their identity, listeners and focus.
//!
//! The differ can also be used on its own, with any two parsed documents.

#![doc(html_root_url = "https://docs.rs/spa-dom/0.1.0")]
#![warn(clippy::pedantic)]

pub use url::Url;

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod attributes;
pub mod body;
pub mod classify;
pub mod diff;
pub mod head;
pub mod key;
pub mod load;

#[cfg(feature = "navigation")]
mod closure_map;
#[cfg(feature = "navigation")]
pub mod navigate;

pub use diff::DocumentDiffer;
#[cfg(feature = "navigation")]
pub use navigate::{NavigationOptions, Navigator};
