use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error("invalid file format (magic header {found:?})")]
    InvalidFormat { found: [u8; 2] },
    #[error("the degree of the tree must be at least 2, but was {0}")]
    DegreeTooSmall(u8),
    #[error("the degree of the tree must be at most 128, but was {0}")]
    DegreeTooLarge(u8),
    #[error("the file descriptor contains an invalid tree degree {0}")]
    InvalidStoredDegree(i16),
    #[error("a node block needs {expected} bytes, but only {actual} bytes are available")]
    BlockTooSmall { expected: usize, actual: usize },
    #[error("node at position {position} has {size} keys, but can only hold {capacity}")]
    CorruptNode {
        position: i64,
        size: usize,
        capacity: usize,
    },
    #[error(transparent)]
    IntConversion(#[from] std::num::TryFromIntError),
    #[error(transparent)]
    SliceConversion(#[from] std::array::TryFromSliceError),
}
