use thiserror::Error;

pub type Result<A, E = Error> = std::result::Result<A, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unexpected end of buffer at offset {offset}: needed {needed} byte(s), {available} available")]
    UnexpectedEnd {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("malformed string at offset {offset}: {reason}")]
    MalformedString { offset: usize, reason: &'static str },
    #[error("unknown primitive type tag {tag:?} at offset {offset}")]
    UnknownType { tag: String, offset: usize },
    #[error(
        "size mismatch at offset {offset}: enclosing property declared {declared} byte(s) but {consumed} were consumed"
    )]
    SizeMismatch {
        offset: usize,
        declared: i64,
        consumed: usize,
    },
    #[error("malformed tree: {0}")]
    BadTree(&'static str),
    #[error("non-zero array index {index} at offset {offset} is not supported")]
    NonZeroArrayIndex { index: i32, offset: usize },
    #[error("codec error: {0}")]
    Codec(#[from] declio::Error),
}
