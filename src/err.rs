use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Grammar errors raised while scanning a map's entity text.
///
/// Every variant carries the byte offset reached inside the entity lump so
/// diagnostics can cite roughly where the text went wrong. These never abort
/// the run, only the map being processed.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum EntParseError {
    #[error("Offset {offset}: found end of data while parsing a quoted string")]
    UnterminatedString { offset: usize },

    #[error("Offset {offset}: reached end of entity data while inside a block")]
    UnterminatedBlock { offset: usize },

    #[error("Offset {offset}: unexpected start of block")]
    UnexpectedBlockStart { offset: usize },

    #[error("Offset {offset}: unexpected end of block")]
    UnexpectedBlockEnd { offset: usize },

    #[error("Offset {offset}: found non-whitespace between key and value")]
    NonWhitespaceSeparator { offset: usize },

    #[error("Offset {offset}: key has no matching value")]
    MissingValue { offset: usize },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("An I/O error has occurred: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("Failed to open file {}: {source}", path.display())]
    FailedToOpenFile { path: PathBuf, source: io::Error },

    #[error("Short read while reading {what}")]
    Truncated { what: &'static str },

    #[error("Incorrect BSP version, expected `{expected}`, found `{found}`")]
    InvalidBspVersion { expected: u32, found: u32 },

    #[error("Corrupt BSP header: {what}")]
    CorruptBspHeader { what: &'static str },

    #[error("Corrupt BSP texture directory: {what}")]
    CorruptTextureDirectory { what: &'static str },

    #[error("Not a PAK file, expected id `{expected:#x}`, found `{found:#x}`")]
    InvalidPakId { expected: u32, found: u32 },

    #[error("Invalid PAK directory size `{size}`, not a non-zero multiple of {entry_size}")]
    InvalidPakDirectorySize { size: u32, entry_size: u32 },

    #[error("Invalid WAD magic, expected `WAD`, found `{magic:2X?}`")]
    InvalidWadMagic { magic: [u8; 4] },

    #[error("Incorrect WAD version `{found}`, expected `2` or `3`")]
    InvalidWadVersion { found: char },

    #[error("Invalid MDL magic, expected `IDST`, found `{magic:2X?}`")]
    InvalidMdlMagic { magic: [u8; 4] },

    #[error("Incorrect MDL version, expected `{expected}`, found `{found}`")]
    InvalidMdlVersion { expected: u32, found: u32 },

    #[error("Error parsing entity data: {source}")]
    EntParse {
        #[from]
        source: EntParseError,
    },

    #[error("Entity data not in recognized text format")]
    NoEntityData,

    #[error("Res file {} already exists", path.display())]
    ResFileExists { path: PathBuf },
}
