//! Primitive/struct-kind dispatch (§4.B): the closed, static registry that
//! maps a struct tag to either a fixed byte layout or "not fixed, recurse
//! into the property-list codec instead". Adding a fixed-layout struct kind
//! means adding one variant and one pair of match arms here, nowhere else.

use crate::bytes::{Cursor, Sink};
use crate::result::Result;

/// A struct value framed by a fixed byte layout rather than nested
/// properties (§4.B family 1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixedStruct {
    Vector { x: f32, y: f32, z: f32 },
    Vector2D { x: f32, y: f32 },
    Rotator { pitch: f32, yaw: f32, roll: f32 },
    Quat { x: f32, y: f32, z: f32, w: f32 },
    LinearColor { r: f32, g: f32, b: f32, a: f32 },
    /// Byte order on the wire is B, G, R, A — not the field declaration order.
    Color { r: u8, g: u8, b: u8, a: u8 },
    Guid([u8; 16]),
    DateTime(i64),
    Timespan(i64),
}

impl FixedStruct {
    /// The struct tag this value was decoded from / should be encoded as.
    pub fn tag(&self) -> &'static str {
        match self {
            FixedStruct::Vector { .. } => "Vector",
            FixedStruct::Vector2D { .. } => "Vector2D",
            FixedStruct::Rotator { .. } => "Rotator",
            FixedStruct::Quat { .. } => "Quat",
            FixedStruct::LinearColor { .. } => "LinearColor",
            FixedStruct::Color { .. } => "Color",
            FixedStruct::Guid(_) => "Guid",
            FixedStruct::DateTime(_) => "DateTime",
            FixedStruct::Timespan(_) => "Timespan",
        }
    }

    pub fn byte_len(&self) -> usize {
        match self {
            FixedStruct::Vector { .. } => 12,
            FixedStruct::Vector2D { .. } => 8,
            FixedStruct::Rotator { .. } => 12,
            FixedStruct::Quat { .. } => 16,
            FixedStruct::LinearColor { .. } => 16,
            FixedStruct::Color { .. } => 4,
            FixedStruct::Guid(_) => 16,
            FixedStruct::DateTime(_) | FixedStruct::Timespan(_) => 8,
        }
    }

    pub fn encode(&self, sink: &mut Sink) -> Result<()> {
        match self {
            FixedStruct::Vector { x, y, z } => {
                sink.write_f32(*x)?;
                sink.write_f32(*y)?;
                sink.write_f32(*z)?;
            }
            FixedStruct::Vector2D { x, y } => {
                sink.write_f32(*x)?;
                sink.write_f32(*y)?;
            }
            FixedStruct::Rotator { pitch, yaw, roll } => {
                sink.write_f32(*pitch)?;
                sink.write_f32(*yaw)?;
                sink.write_f32(*roll)?;
            }
            FixedStruct::Quat { x, y, z, w } => {
                sink.write_f32(*x)?;
                sink.write_f32(*y)?;
                sink.write_f32(*z)?;
                sink.write_f32(*w)?;
            }
            FixedStruct::LinearColor { r, g, b, a } => {
                sink.write_f32(*r)?;
                sink.write_f32(*g)?;
                sink.write_f32(*b)?;
                sink.write_f32(*a)?;
            }
            FixedStruct::Color { r, g, b, a } => {
                sink.write_u8(*b);
                sink.write_u8(*g);
                sink.write_u8(*r);
                sink.write_u8(*a);
            }
            FixedStruct::Guid(bytes) => sink.write_guid(bytes),
            FixedStruct::DateTime(ticks) | FixedStruct::Timespan(ticks) => sink.write_i64(*ticks)?,
        }
        Ok(())
    }
}

/// The closed set of struct tags with a fixed byte layout. Anything not in
/// this list is a property-bearing struct (§4.B family 2).
const FIXED_LAYOUT_TAGS: &[&str] = &[
    "Vector",
    "Vector2D",
    "Rotator",
    "Quat",
    "LinearColor",
    "Color",
    "Guid",
    "DateTime",
    "Timespan",
];

pub fn is_fixed_layout(struct_tag: &str) -> bool {
    FIXED_LAYOUT_TAGS.contains(&struct_tag)
}

/// Decodes a fixed-layout struct value. The caller is responsible for having
/// already checked [`is_fixed_layout`] — an unrecognized tag here is a bug in
/// the caller, not a malformed-input condition.
pub fn decode(struct_tag: &str, reader: &mut Cursor) -> Result<FixedStruct> {
    Ok(match struct_tag {
        "Vector" => FixedStruct::Vector {
            x: reader.read_f32()?,
            y: reader.read_f32()?,
            z: reader.read_f32()?,
        },
        "Vector2D" => FixedStruct::Vector2D {
            x: reader.read_f32()?,
            y: reader.read_f32()?,
        },
        "Rotator" => FixedStruct::Rotator {
            pitch: reader.read_f32()?,
            yaw: reader.read_f32()?,
            roll: reader.read_f32()?,
        },
        "Quat" => FixedStruct::Quat {
            x: reader.read_f32()?,
            y: reader.read_f32()?,
            z: reader.read_f32()?,
            w: reader.read_f32()?,
        },
        "LinearColor" => FixedStruct::LinearColor {
            r: reader.read_f32()?,
            g: reader.read_f32()?,
            b: reader.read_f32()?,
            a: reader.read_f32()?,
        },
        "Color" => {
            let b = reader.read_u8()?;
            let g = reader.read_u8()?;
            let r = reader.read_u8()?;
            let a = reader.read_u8()?;
            FixedStruct::Color { r, g, b, a }
        }
        "Guid" => FixedStruct::Guid(reader.read_guid()?),
        "DateTime" => FixedStruct::DateTime(reader.read_i64()?),
        "Timespan" => FixedStruct::Timespan(reader.read_i64()?),
        other => unreachable!("{other} is not a fixed-layout struct tag"),
    })
}
