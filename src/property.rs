//! The property codec (§4.C): decoding and encoding a single tagged
//! property — header, type-specific framing bytes, value body — with the
//! size field patched once the value's byte length is known.

use crate::bytes::{Cursor, FString, Sink};
use crate::proplist;
use crate::result::{Error, Result};
use crate::structs::{self, FixedStruct};

const TAG_INT: &str = "IntProperty";
const TAG_UINT: &str = "UInt32Property";
const TAG_INT64: &str = "Int64Property";
const TAG_FLOAT: &str = "FloatProperty";
const TAG_DOUBLE: &str = "DoubleProperty";
const TAG_BOOL: &str = "BoolProperty";
const TAG_BYTE: &str = "ByteProperty";
const TAG_STR: &str = "StrProperty";
const TAG_NAME: &str = "NameProperty";
const TAG_ENUM: &str = "EnumProperty";
const TAG_ARRAY: &str = "ArrayProperty";
const TAG_STRUCT: &str = "StructProperty";
const TAG_MAP: &str = "MapProperty";

/// The sentinel name that terminates a property list (§3 invariant 1).
pub const NONE_SENTINEL: &str = "None";

/// A single decoded or hand-built property record (§3 Data model).
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    /// Preserved verbatim on round-trip; always 0 in the target corpus.
    /// §9's Open Question is resolved by rejecting non-zero values on decode
    /// rather than silently accepting them.
    pub array_index: i32,
    pub value: PropertyValue,
}

impl Property {
    pub fn new(name: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            name: name.into(),
            array_index: 0,
            value,
        }
    }

    /// The children of a struct-valued property, if it is one backed by a
    /// nested property list (fixed-layout structs have no children).
    pub fn children(&self) -> Option<&[Property]> {
        match &self.value {
            PropertyValue::Struct {
                value: StructValue::Properties(children),
                ..
            } => Some(children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Property>> {
        match &mut self.value {
            PropertyValue::Struct {
                value: StructValue::Properties(children),
                ..
            } => Some(children),
            _ => None,
        }
    }

    /// The decoded elements of a struct-valued array, each itself a full
    /// record carrying the array's element-name hint and struct tag.
    pub fn array_elements(&self) -> Option<&[Property]> {
        match &self.value {
            PropertyValue::Array {
                value: ArrayValue::Structs { elements, .. },
                ..
            } => Some(elements),
            _ => None,
        }
    }

    pub fn array_elements_mut(&mut self) -> Option<&mut Vec<Property>> {
        match &mut self.value {
            PropertyValue::Array {
                value: ArrayValue::Structs { elements, .. },
                ..
            } => Some(elements),
            _ => None,
        }
    }
}

/// The tagged variant over the closed set of type tags (§3 Data model).
/// Modeling this as a variant rather than one loose record with many
/// optional fields makes states like "array with a struct tag but no inner
/// type" unrepresentable.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Int(i32),
    UInt(u32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    Byte(u8),
    Str(FString),
    Name(FString),
    Enum {
        enum_type: String,
        value: FString,
    },
    Struct {
        struct_tag: String,
        /// The struct property's own GUID header field, distinct from the
        /// 16 value bytes a `Guid`-tagged struct carries as its payload.
        guid: [u8; 16],
        value: StructValue,
    },
    Array {
        inner_type: String,
        value: ArrayValue,
    },
    Map {
        key_type: String,
        value_type: String,
        /// Preserved verbatim; see §9 Design Notes, "Map property".
        bytes: Vec<u8>,
    },
}

impl PropertyValue {
    fn type_tag(&self) -> &'static str {
        match self {
            PropertyValue::Int(_) => TAG_INT,
            PropertyValue::UInt(_) => TAG_UINT,
            PropertyValue::Int64(_) => TAG_INT64,
            PropertyValue::Float(_) => TAG_FLOAT,
            PropertyValue::Double(_) => TAG_DOUBLE,
            PropertyValue::Bool(_) => TAG_BOOL,
            PropertyValue::Byte(_) => TAG_BYTE,
            PropertyValue::Str(_) => TAG_STR,
            PropertyValue::Name(_) => TAG_NAME,
            PropertyValue::Enum { .. } => TAG_ENUM,
            PropertyValue::Struct { .. } => TAG_STRUCT,
            PropertyValue::Array { .. } => TAG_ARRAY,
            PropertyValue::Map { .. } => TAG_MAP,
        }
    }
}

/// The value of a struct-typed property: either a fixed byte layout or a
/// nested property list (§4.B).
#[derive(Debug, Clone, PartialEq)]
pub enum StructValue {
    Fixed(FixedStruct),
    Properties(Vec<Property>),
}

/// The value of an array-typed property, one variant per element framing
/// rule (§4.C "Array element handling").
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValue {
    Bytes(Vec<u8>),
    Scalars(Vec<PropertyValue>),
    Structs {
        /// The name copied onto every element from the prototype header,
        /// retained here so an empty array can still re-emit its prototype.
        element_name: String,
        struct_tag: String,
        guid: [u8; 16],
        elements: Vec<Property>,
    },
}

/// Decodes one property tag, or `None` if the reader was positioned at the
/// list terminator (name absent or equal to `None`).
pub fn decode(reader: &mut Cursor) -> Result<Option<Property>> {
    let name_offset = reader.position();
    let name = reader.read_fstring()?;
    let name = match name.as_str() {
        None => return Ok(None),
        Some(NONE_SENTINEL) => return Ok(None),
        Some(_) => name.as_str().unwrap().to_owned(),
    };
    if name.is_empty() {
        return Err(Error::MalformedString {
            offset: name_offset,
            reason: "property name is empty",
        });
    }

    let type_tag = reader.read_required_string()?;
    let size = reader.read_i32()?;
    let array_index_offset = reader.position();
    let array_index = reader.read_i32()?;
    if array_index != 0 {
        return Err(Error::NonZeroArrayIndex {
            index: array_index,
            offset: array_index_offset,
        });
    }

    let value = decode_value(reader, &type_tag, size)?;
    Ok(Some(Property {
        name,
        array_index,
        value,
    }))
}

fn decode_value(reader: &mut Cursor, type_tag: &str, size: i32) -> Result<PropertyValue> {
    match type_tag {
        TAG_BOOL => {
            if size != 0 {
                return Err(Error::SizeMismatch {
                    offset: reader.position(),
                    declared: size as i64,
                    consumed: 0,
                });
            }
            let value = reader.read_u8()? != 0;
            reader.skip(1)?; // padding byte, outside the size region
            Ok(PropertyValue::Bool(value))
        }
        TAG_ENUM => {
            let enum_type = reader.read_required_string()?;
            reader.skip(1)?; // padding byte, outside the size region
            let start = reader.position();
            let value = reader.read_fstring()?;
            check_size(reader, start, size)?;
            Ok(PropertyValue::Enum { enum_type, value })
        }
        TAG_ARRAY => {
            let inner_type = reader.read_required_string()?;
            reader.skip(1)?;
            let start = reader.position();
            let value = decode_array(reader, &inner_type, (size.max(0) as usize).saturating_sub(4))?;
            check_size(reader, start, size)?;
            Ok(PropertyValue::Array { inner_type, value })
        }
        TAG_STRUCT => {
            let struct_tag = reader.read_required_string()?;
            let guid = reader.read_guid()?;
            reader.skip(1)?;
            let start = reader.position();
            let value = if structs::is_fixed_layout(&struct_tag) {
                let fixed = structs::decode(&struct_tag, reader)?;
                StructValue::Fixed(fixed)
            } else {
                if size < 0 {
                    return Err(Error::SizeMismatch {
                        offset: reader.position(),
                        declared: size as i64,
                        consumed: 0,
                    });
                }
                let children = proplist::decode_bounded(reader, size as usize)?;
                StructValue::Properties(children)
            };
            check_size(reader, start, size)?;
            Ok(PropertyValue::Struct {
                struct_tag,
                guid,
                value,
            })
        }
        TAG_MAP => {
            if size < 0 {
                return Err(Error::SizeMismatch {
                    offset: reader.position(),
                    declared: size as i64,
                    consumed: 0,
                });
            }
            let key_type = reader.read_required_string()?;
            let value_type = reader.read_required_string()?;
            reader.skip(1)?;
            let bytes = reader.read_slice(size as usize)?.to_vec();
            Ok(PropertyValue::Map {
                key_type,
                value_type,
                bytes,
            })
        }
        _ => {
            reader.skip(1)?; // padding byte, outside the size region
            let start = reader.position();
            let value = decode_scalar(reader, type_tag)?;
            check_size(reader, start, size)?;
            Ok(value)
        }
    }
}

fn decode_scalar(reader: &mut Cursor, type_tag: &str) -> Result<PropertyValue> {
    Ok(match type_tag {
        TAG_INT => PropertyValue::Int(reader.read_i32()?),
        TAG_UINT => PropertyValue::UInt(reader.read_u32()?),
        TAG_INT64 => PropertyValue::Int64(reader.read_i64()?),
        TAG_FLOAT => PropertyValue::Float(reader.read_f32()?),
        TAG_DOUBLE => PropertyValue::Double(reader.read_f64()?),
        TAG_BOOL => PropertyValue::Bool(reader.read_u8()? != 0),
        TAG_BYTE => PropertyValue::Byte(reader.read_u8()?),
        TAG_STR => PropertyValue::Str(reader.read_fstring()?),
        TAG_NAME => PropertyValue::Name(reader.read_fstring()?),
        other => {
            return Err(Error::UnknownType {
                tag: other.to_owned(),
                offset: reader.position(),
            })
        }
    })
}

fn decode_array(reader: &mut Cursor, inner_type: &str, _value_len: usize) -> Result<ArrayValue> {
    let count = reader.read_u32()?;
    match inner_type {
        TAG_BYTE => {
            let bytes = reader.read_slice(count as usize)?.to_vec();
            Ok(ArrayValue::Bytes(bytes))
        }
        TAG_STRUCT => decode_struct_array(reader, count),
        _ => {
            let mut scalars = Vec::with_capacity(count as usize);
            for _ in 0..count {
                scalars.push(decode_scalar(reader, inner_type)?);
            }
            Ok(ArrayValue::Scalars(scalars))
        }
    }
}

fn decode_struct_array(reader: &mut Cursor, count: u32) -> Result<ArrayValue> {
    let element_name = reader.read_required_string()?;
    let proto_type = reader.read_required_string()?;
    if proto_type != TAG_STRUCT {
        return Err(Error::BadTree(
            "struct array prototype header did not declare StructProperty",
        ));
    }
    let proto_size = reader.read_i32()?;
    if proto_size < 0 {
        return Err(Error::SizeMismatch {
            offset: reader.position(),
            declared: proto_size as i64,
            consumed: 0,
        });
    }
    let array_index_offset = reader.position();
    let proto_array_index = reader.read_i32()?;
    if proto_array_index != 0 {
        return Err(Error::NonZeroArrayIndex {
            index: proto_array_index,
            offset: array_index_offset,
        });
    }
    let struct_tag = reader.read_required_string()?;
    let guid = reader.read_guid()?;
    reader.skip(1)?;

    let total = proto_size as usize;
    let start = reader.position();
    let mut elements = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let children = proplist::decode(reader)?;
        elements.push(Property {
            name: element_name.clone(),
            array_index: 0,
            value: PropertyValue::Struct {
                struct_tag: struct_tag.clone(),
                guid,
                value: StructValue::Properties(children),
            },
        });
    }
    let consumed = reader.position() - start;
    if consumed != total {
        return Err(Error::SizeMismatch {
            offset: reader.position(),
            declared: total as i64,
            consumed,
        });
    }

    Ok(ArrayValue::Structs {
        element_name,
        struct_tag,
        guid,
        elements,
    })
}

fn check_size(reader: &Cursor, value_start: usize, declared: i32) -> Result<()> {
    let consumed = reader.position() - value_start;
    if consumed != declared.max(0) as usize {
        return Err(Error::SizeMismatch {
            offset: reader.position(),
            declared: declared as i64,
            consumed,
        });
    }
    Ok(())
}

/// Encodes one property: name, type tag, reserved size field, array index,
/// type-specific header bytes, then the value region with the size field
/// patched after the fact.
pub fn encode(sink: &mut Sink, property: &Property) -> Result<()> {
    sink.write_fstring(&FString::from_text(property.name.clone()))?;
    sink.write_fstring(&FString::from_text(property.value.type_tag()))?;

    if let PropertyValue::Bool(value) = &property.value {
        sink.write_i32(0)?; // size is always 0 for Bool
        sink.write_i32(0)?; // array index
        sink.write_u8(*value as u8);
        sink.write_u8(0); // padding byte, outside the size region
        return Ok(());
    }

    let size_offset = sink.reserve_size();
    sink.write_i32(0)?; // array index, always 0 on encode
    match &property.value {
        PropertyValue::Enum { enum_type, .. } => {
            sink.write_fstring(&FString::from_text(enum_type.clone()))?;
            sink.write_u8(0);
        }
        PropertyValue::Array { inner_type, .. } => {
            sink.write_fstring(&FString::from_text(inner_type.clone()))?;
            sink.write_u8(0);
        }
        PropertyValue::Struct { struct_tag, guid, .. } => {
            sink.write_fstring(&FString::from_text(struct_tag.clone()))?;
            sink.write_guid(guid);
            sink.write_u8(0);
        }
        PropertyValue::Map { key_type, value_type, .. } => {
            sink.write_fstring(&FString::from_text(key_type.clone()))?;
            sink.write_fstring(&FString::from_text(value_type.clone()))?;
            sink.write_u8(0);
        }
        _ => sink.write_u8(0), // the single padding byte for the scalar bucket
    }

    let value_start = sink.position();
    encode_value(sink, &property.value)?;
    sink.patch_size(size_offset, value_start);
    Ok(())
}

fn encode_value(sink: &mut Sink, value: &PropertyValue) -> Result<()> {
    match value {
        PropertyValue::Int(v) => sink.write_i32(*v)?,
        PropertyValue::UInt(v) => sink.write_u32(*v)?,
        PropertyValue::Int64(v) => sink.write_i64(*v)?,
        PropertyValue::Float(v) => sink.write_f32(*v)?,
        PropertyValue::Double(v) => sink.write_f64(*v)?,
        PropertyValue::Byte(v) => sink.write_u8(*v),
        PropertyValue::Str(v) | PropertyValue::Name(v) => sink.write_fstring(v)?,
        PropertyValue::Enum { value, .. } => sink.write_fstring(value)?,
        PropertyValue::Struct { value, .. } => match value {
            StructValue::Fixed(fixed) => fixed.encode(sink)?,
            StructValue::Properties(children) => proplist::encode(sink, children)?,
        },
        PropertyValue::Array { inner_type, value } => encode_array(sink, inner_type, value)?,
        PropertyValue::Map { bytes, .. } => sink.write_bytes(bytes),
        // Only reachable as an array scalar element — a top-level Bool
        // property is written by `encode` before the size region opens, with
        // no per-element header, so a single byte is all this case needs.
        PropertyValue::Bool(v) => sink.write_u8(*v as u8),
    }
    Ok(())
}

fn encode_array(sink: &mut Sink, inner_type: &str, value: &ArrayValue) -> Result<()> {
    match value {
        ArrayValue::Bytes(bytes) => {
            if inner_type != TAG_BYTE {
                return Err(Error::BadTree("byte array body paired with a non-Byte inner type"));
            }
            sink.write_u32(bytes.len() as u32)?;
            sink.write_bytes(bytes);
        }
        ArrayValue::Scalars(values) => {
            sink.write_u32(values.len() as u32)?;
            for v in values {
                if v.type_tag() != inner_type {
                    return Err(Error::BadTree("array element type does not match its declared inner type"));
                }
                encode_value(sink, v)?;
            }
        }
        ArrayValue::Structs { element_name, struct_tag, guid, elements } => {
            if inner_type != TAG_STRUCT {
                return Err(Error::BadTree("struct array body paired with a non-Struct inner type"));
            }
            sink.write_u32(elements.len() as u32)?;

            let mut scratch = Sink::new();
            for element in elements {
                let children = element.children().ok_or(Error::BadTree(
                    "struct array element is missing its property-list children",
                ))?;
                proplist::encode(&mut scratch, children)?;
            }
            let body = scratch.into_bytes();

            sink.write_fstring(&FString::from_text(element_name.clone()))?;
            sink.write_fstring(&FString::from_text(TAG_STRUCT))?;
            sink.write_i32(body.len() as i32)?;
            sink.write_i32(0)?;
            sink.write_fstring(&FString::from_text(struct_tag.clone()))?;
            sink.write_guid(guid);
            sink.write_u8(0);
            sink.write_bytes(&body);
        }
    }
    Ok(())
}
