//! Property-tagged binary codec for Icarus mount save records.
//!
//! The four components are layered bottom-up: [`bytes`] (positioned
//! read/write of primitives and the variable-width string), [`structs`]
//! (the closed set of fixed-layout struct kinds), [`property`] (one tagged
//! property: header, framing, value, size patch), and [`proplist`] (a
//! `None`-terminated sequence of properties, plus the dotted-path lookup
//! grammar used to navigate a decoded tree). [`decode`] and [`encode`] are
//! the only entry points a caller needs; everything else is exposed so a
//! collaborator can build and inspect trees directly.

use derive_getters::Getters;

use crate::bytes::{Cursor, Sink};

mod bytes;
mod property;
mod proplist;
pub mod result;
mod structs;

pub use crate::bytes::FString;
pub use crate::property::{ArrayValue, Property, PropertyValue, StructValue, NONE_SENTINEL};
pub use crate::result::{Error, Result};
pub use crate::structs::FixedStruct;

const TRAILING_ZEROS: [u8; 4] = [0; 4];

/// A decoded property blob: the ordered property list plus whether the
/// four trailing alignment-zero bytes some corpora append were present
/// (§9 Design Notes, "Top-level trailing zeros" — carried rather than
/// re-derived, so `encode(decode(b)) == b` holds either way).
#[derive(Debug, Clone, PartialEq, Getters)]
pub struct Document {
    properties: Vec<Property>,
    trailing_zeros: bool,
}

impl Document {
    /// Builds a document from scratch. `trailing_zeros` defaults to `true`,
    /// matching the reference encoder's behavior for a freshly built
    /// top-level blob.
    pub fn new(properties: Vec<Property>) -> Self {
        Self {
            properties,
            trailing_zeros: true,
        }
    }

    pub fn properties_mut(&mut self) -> &mut Vec<Property> {
        &mut self.properties
    }

    pub fn find(&self, path: &str) -> Result<Option<&Property>> {
        proplist::find(&self.properties, path)
    }

    pub fn find_mut(&mut self, path: &str) -> Result<Option<&mut Property>> {
        proplist::find_mut(&mut self.properties, path)
    }

    pub fn set(&mut self, path: &str, value: PropertyValue) -> Result<bool> {
        proplist::set(&mut self.properties, path, value)
    }

    pub fn clone_properties(&self) -> Result<Vec<Property>> {
        proplist::clone_properties(&self.properties)
    }
}

/// Decodes a property blob (§6 "Input: the property blob"). The blob
/// begins at the first property's name and ends with the `None` sentinel,
/// optionally followed by four zero bytes.
pub fn decode(bytes: &[u8]) -> Result<Document> {
    let mut reader = Cursor::new(bytes);
    let properties = proplist::decode(&mut reader)?;
    let trailing_zeros = match reader.remaining() {
        0 => false,
        4 => {
            let tail = reader.read_slice(4)?;
            if tail != TRAILING_ZEROS {
                return Err(Error::BadTree(
                    "four bytes remain after the property list but are not all zero",
                ));
            }
            true
        }
        _ => {
            return Err(Error::BadTree(
                "unexpected bytes remain after the property list terminator",
            ))
        }
    };
    Ok(Document {
        properties,
        trailing_zeros,
    })
}

/// Encodes a document back to bytes, reproducing the trailing-zeros choice
/// it was decoded with (or `true`, for a document built with [`Document::new`]).
pub fn encode(document: &Document) -> Result<Vec<u8>> {
    let mut sink = Sink::new();
    proplist::encode(&mut sink, &document.properties)?;
    if document.trailing_zeros {
        sink.write_bytes(&TRAILING_ZEROS);
    }
    Ok(sink.into_bytes())
}

/// Looks up a record in a standalone property list without going through a
/// [`Document`] — used when navigating a struct's own children, which are
/// already a plain `&[Property]` rather than a document.
pub fn find<'a>(properties: &'a [Property], path: &str) -> Result<Option<&'a Property>> {
    proplist::find(properties, path)
}

pub fn find_mut<'a>(properties: &'a mut [Property], path: &str) -> Result<Option<&'a mut Property>> {
    proplist::find_mut(properties, path)
}

pub fn set(properties: &mut [Property], path: &str, value: PropertyValue) -> Result<bool> {
    proplist::set(properties, path, value)
}

pub fn clone_properties(properties: &[Property]) -> Result<Vec<Property>> {
    proplist::clone_properties(properties)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn empty_document_round_trips_with_trailing_zeros() {
        let document = Document::new(vec![]);
        let bytes = encode(&document).unwrap();
        // "None" length prefix (4) + NUL (1) + trailing zeros (4)
        assert_eq!(bytes.len(), 9);
        assert_eq!(&bytes[bytes.len() - 4..], &TRAILING_ZEROS);

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, document);
    }

    #[test]
    fn document_without_trailing_zeros_round_trips() {
        let mut document = Document::new(vec![Property::new("Tag", PropertyValue::Int(1))]);
        let with_zeros = encode(&document).unwrap();
        document.trailing_zeros = false;
        let without_zeros = encode(&document).unwrap();
        assert_eq!(without_zeros.len(), with_zeros.len() - 4);

        let decoded = decode(&without_zeros).unwrap();
        assert!(!decoded.trailing_zeros);
        assert_eq!(decoded.properties, document.properties);
    }

    #[test]
    fn nonzero_trailing_bytes_are_rejected() {
        let document = Document::new(vec![]);
        let mut bytes = encode(&document).unwrap();
        let last = bytes.len() - 1;
        bytes[last] = 1;
        let err = decode(&bytes).unwrap_err();
        assert_matches!(err, Error::BadTree(_));
    }
}
