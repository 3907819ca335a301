//! Shared data model, error types, and variant registry for the FastFile
//! codec and zone-editing engine. No I/O, no compression, no CLI — see the
//! `codff` crate for those.

#![cfg_attr(not(feature = "std"), no_std)]
#![allow(non_camel_case_types)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod model;
pub mod variant;

pub use model::{InlineMarker, LocalizedEntry, RawFileEntry, RawFileHeaderSize};
pub use variant::{Game, Platform, Variant, VariantInfo};

use alloc::string::String;
use core::fmt;

#[macro_export]
macro_rules! file_line_col {
    () => {
        alloc::format!("{}:{}:{}", file!(), line!(), column!())
    };
}

/// A simple enum that contains all the possible errors this library can return.
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    #[cfg(feature = "std")]
    /// Occurs when a [`std::io`] function returns an error.
    Io(std::io::Error),
    /// The blob is shorter than a required field implies.
    Truncated { expected: usize, found: usize },
    /// The archive prelude doesn't match any known variant's magic.
    MagicMismatch([u8; 8]),
    /// Deflate/zlib decode returned an error, or produced an implausible length.
    DecodeFailure(String),
    /// A post-write zone failed one of the §3 invariants.
    InvariantViolation(String),
    /// Requested content exceeds the target slot; caller may retry via
    /// `ResizeSlot` or synthesis.
    ContentTooLarge { requested: usize, available: usize },
    /// Synthesis was requested on a zone containing asset types other than
    /// `rawfile`/`localize`; caller must confirm loss.
    UnsupportedAssetAtRebuild(u32),
    /// A scanned candidate (key, image name, dimensions) failed its validator.
    ValidationFailure(String),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "std")]
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Truncated { expected, found } => {
                write!(f, "truncated: expected at least {expected} bytes, found {found}")
            }
            Self::MagicMismatch(m) => write!(f, "magic mismatch: {m:02x?}"),
            Self::DecodeFailure(s) => write!(f, "decode failure: {s}"),
            Self::InvariantViolation(s) => write!(f, "invariant violation: {s}"),
            Self::ContentTooLarge {
                requested,
                available,
            } => write!(
                f,
                "content too large: requested {requested} bytes, slot holds {available}"
            ),
            Self::UnsupportedAssetAtRebuild(ty) => {
                write!(f, "unsupported asset type {ty:#x} present at rebuild")
            }
            Self::ValidationFailure(s) => write!(f, "validation failure: {s}"),
        }
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for ErrorKind {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// An error produced by the codec or editing engine, carrying the call site
/// and, where known, the byte offset into the archive/zone at which it
/// occurred.
#[derive(Debug)]
pub struct Error {
    where_: String,
    kind: ErrorKind,
    off: Option<u64>,
}

impl Error {
    pub fn new(where_: String, kind: ErrorKind) -> Self {
        Self {
            where_,
            kind,
            off: None,
        }
    }

    pub fn new_with_offset(where_: String, off: u64, kind: ErrorKind) -> Self {
        Self {
            where_,
            kind,
            off: Some(off),
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn where_(&self) -> &str {
        &self.where_
    }

    pub fn off(&self) -> Option<u64> {
        self.off
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.off {
            Some(off) => write!(f, "{} (at offset {off:#x}): {}", self.where_, self.kind),
            None => write!(f, "{}: {}", self.where_, self.kind),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

pub type Result<T> = core::result::Result<T, Error>;
