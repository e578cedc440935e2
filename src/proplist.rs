//! Property-list codec (§4.D) and the dotted-path lookup grammar used to
//! navigate a decoded tree: `segment("."segment)*`, `segment := name("["index"]")?`.

use crate::bytes::{Cursor, FString, Sink};
use crate::property::{self, Property, PropertyValue, NONE_SENTINEL};
use crate::result::{Error, Result};

/// Decodes properties until the `None` terminator. Used both at the
/// document root and for a struct property's nested list, whose declared
/// size the caller checks independently once this returns.
pub fn decode(reader: &mut Cursor) -> Result<Vec<Property>> {
    let mut properties = Vec::new();
    while let Some(prop) = property::decode(reader)? {
        properties.push(prop);
    }
    Ok(properties)
}

/// Decodes a property list enclosed by a struct property's declared size,
/// stopping as soon as either the `None` terminator is consumed or the
/// declared-size boundary is reached (§4.D "Size-bounded nested lists") —
/// the budget is enforced *between* each property decode, not just checked
/// after the fact, so a malformed list can't read past its struct's bytes
/// and mistake a sibling property for one more child. The reference encoder
/// sometimes leaves padding between the terminator and the boundary; when
/// that happens the cursor is advanced past it, so the enclosing property's
/// `check_size` call sees an exact match.
pub fn decode_bounded(reader: &mut Cursor, declared_size: usize) -> Result<Vec<Property>> {
    let start = reader.position();
    let boundary = start + declared_size;
    let mut properties = Vec::new();
    loop {
        if reader.position() >= boundary {
            break;
        }
        match property::decode(reader)? {
            Some(prop) => properties.push(prop),
            None => break,
        }
    }
    let consumed = reader.position() - start;
    if consumed > declared_size {
        return Err(Error::SizeMismatch {
            offset: reader.position(),
            declared: declared_size as i64,
            consumed,
        });
    }
    if consumed < declared_size {
        reader.skip(declared_size - consumed)?;
    }
    Ok(properties)
}

/// Encodes each property in order, followed by the `None` terminator every
/// property list ends with (§3 invariant 1).
pub fn encode(sink: &mut Sink, properties: &[Property]) -> Result<()> {
    for prop in properties {
        property::encode(sink, prop)?;
    }
    sink.write_fstring(&FString::from_text(NONE_SENTINEL))?;
    Ok(())
}

/// Returns an independent deep copy of a property list. Implemented as
/// encode-then-decode rather than a structural clone so that the copy's
/// structural equality with the original is guaranteed by the round-trip
/// contract the codec already has to uphold, not by a second, independently
/// maintained deep-copy implementation.
pub fn clone_properties(properties: &[Property]) -> Result<Vec<Property>> {
    let mut sink = Sink::new();
    encode(&mut sink, properties)?;
    let bytes = sink.into_bytes();
    let mut reader = Cursor::new(&bytes);
    decode(&mut reader)
}

/// One parsed path segment: a property name and an optional struct-array
/// element index.
type Segment<'a> = (&'a str, Option<usize>);

fn parse_segment(raw: &str) -> Result<Segment<'_>> {
    match raw.find('[') {
        None => {
            if raw.is_empty() {
                return Err(Error::BadTree("path contains an empty segment"));
            }
            Ok((raw, None))
        }
        Some(open) => {
            if !raw.ends_with(']') {
                return Err(Error::BadTree("array index segment is missing its closing ']'"));
            }
            let name = &raw[..open];
            if name.is_empty() {
                return Err(Error::BadTree("path contains an empty segment"));
            }
            let digits = &raw[open + 1..raw.len() - 1];
            let index: usize = digits
                .parse()
                .map_err(|_| Error::BadTree("array index segment does not contain a valid number"))?;
            Ok((name, Some(index)))
        }
    }
}

fn parse_path(path: &str) -> Result<Vec<Segment<'_>>> {
    if path.is_empty() {
        return Err(Error::BadTree("path is empty"));
    }
    path.split('.').map(parse_segment).collect()
}

/// Resolves a dotted path against a property list, descending into struct
/// children and, for an indexed segment, a struct array's elements.
pub fn find<'a>(properties: &'a [Property], path: &str) -> Result<Option<&'a Property>> {
    let segments = parse_path(path)?;
    let mut current: &[Property] = properties;
    let mut found: Option<&Property> = None;
    for (name, index) in segments {
        let prop = match current.iter().find(|p| p.name == name) {
            Some(p) => p,
            None => return Ok(None),
        };
        let selected = match index {
            None => prop,
            Some(idx) => {
                let elements = prop.array_elements().ok_or(Error::BadTree(
                    "an indexed path segment was used on a property that is not a struct array",
                ))?;
                match elements.get(idx) {
                    Some(element) => element,
                    None => return Ok(None),
                }
            }
        };
        found = Some(selected);
        current = selected.children().unwrap_or(&[]);
    }
    Ok(found)
}

/// The mutable counterpart of [`find`].
pub fn find_mut<'a>(properties: &'a mut [Property], path: &str) -> Result<Option<&'a mut Property>> {
    let segments = parse_path(path)?;
    let mut current: &mut [Property] = properties;
    for (i, (name, index)) in segments.iter().enumerate() {
        let prop = match current.iter_mut().find(|p| p.name == *name) {
            Some(p) => p,
            None => return Ok(None),
        };
        let selected: &mut Property = match index {
            None => prop,
            Some(idx) => {
                let elements = prop.array_elements_mut().ok_or(Error::BadTree(
                    "an indexed path segment was used on a property that is not a struct array",
                ))?;
                match elements.get_mut(*idx) {
                    Some(element) => element,
                    None => return Ok(None),
                }
            }
        };
        if i + 1 == segments.len() {
            return Ok(Some(selected));
        }
        current = selected.children_mut().map(Vec::as_mut_slice).unwrap_or(&mut []);
    }
    Ok(None)
}

/// Overwrites the value of the property at `path`, leaving its name and
/// array index untouched. Returns whether a property was found.
pub fn set(properties: &mut [Property], path: &str, value: PropertyValue) -> Result<bool> {
    match find_mut(properties, path)? {
        Some(prop) => {
            prop.value = value;
            Ok(true)
        }
        None => Ok(false),
    }
}
