//! Tolerant decoder for agent XML snapshots.
//!
//! Decoding runs in two phases: a permissive staging pass over the raw
//! document, then a projection keyed on each service's `<type>` that routes
//! the overloaded leaf tags into the right domain variant. Either the whole
//! snapshot decodes or the error names the offending element.

use std::borrow::Cow;

use thiserror::Error;

use crate::domain::model::Snapshot;

mod project;
mod staging;

pub use project::collected_time;

/// Why a snapshot was rejected.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("snapshot is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("malformed snapshot XML: {0}")]
    Xml(#[from] quick_xml::DeError),
    #[error("missing element {element}")]
    MissingRoot { element: &'static str },
    #[error("service {service:?}: missing element {element}")]
    MissingElement {
        service: String,
        element: &'static str,
    },
    #[error("service {service:?}: unsupported service type {value}")]
    UnknownServiceType { service: String, value: i64 },
}

/// Decode one snapshot document.
pub fn decode(body: &[u8]) -> Result<Snapshot, DecodeError> {
    let text = std::str::from_utf8(body)?;
    let text = rewrite_prolog(text);
    let staged: staging::MonitStaging = quick_xml::de::from_str(&text)?;
    project::snapshot(staged)
}

/// Agents declare `ISO-8859-1` in the XML prolog but all observed field
/// values are ASCII, and the parser speaks UTF-8 only. Substitute the
/// declared name inside the declaration; the rest of the document is
/// untouched.
fn rewrite_prolog(xml: &str) -> Cow<'_, str> {
    const DECLARED: &str = "iso-8859-1";

    let Some(prolog_end) = xml.find("?>") else {
        return Cow::Borrowed(xml);
    };
    let Some(pos) = xml[..prolog_end].to_ascii_lowercase().find(DECLARED) else {
        return Cow::Borrowed(xml);
    };

    let mut rewritten = String::with_capacity(xml.len());
    rewritten.push_str(&xml[..pos]);
    rewritten.push_str("UTF-8");
    rewritten.push_str(&xml[pos + DECLARED.len()..]);
    Cow::Owned(rewritten)
}
