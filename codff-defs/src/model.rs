//! The zone data model (§3): named regions, record shapes, and the runtime
//! records parsers hand back. Pure data — no parsing/mutation logic lives
//! here, only the shapes C5/C6/C7/C8 (in the `codff` crate) operate on.

use alloc::string::String;
use alloc::vec::Vec;

use crate::variant::INLINE_MARKER;

/// The byte pattern `0xFFFFFFFF`, used throughout the zone format as a
/// serialization placeholder meaning "data follows inline" — never a
/// runtime pointer. See DESIGN.md, "Pointer placeholders".
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct InlineMarker;

impl InlineMarker {
    pub const BYTES: [u8; 4] = INLINE_MARKER.to_be_bytes();

    pub fn is_marker(bytes: &[u8]) -> bool {
        bytes.len() == 4 && bytes == Self::BYTES
    }
}

/// Which of the two `rawfile` on-disk header shapes an entry uses (§3).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RawFileHeaderSize {
    /// `0xFF*4 | size_be_u32 | 0xFF*4 | name\0 | data[size]`
    Standard,
    /// `0xFF*4 | comp_len_be | uncomp_len_be | 0xFF*4 | name\0 | zlib[comp_len]`
    /// MW2-only.
    Mw2Compressed,
}

impl RawFileHeaderSize {
    pub const fn byte_len(self) -> usize {
        match self {
            Self::Standard => 12,
            Self::Mw2Compressed => 16,
        }
    }
}

/// A `rawfile` asset's runtime record: parsed positions borrow nothing —
/// they're indices into a zone buffer owned by the editor session.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawFileEntry {
    pub header_offset: usize,
    pub header_size: RawFileHeaderSize,
    pub name: String,
    pub name_offset: usize,
    pub data_offset: usize,
    /// Bytes available to the content before a rename/grow is needed. For a
    /// standard entry this is `content_size`; for a compressed entry this is
    /// the zlib stream's on-disk length (`compressed_size`).
    pub allocated_size: u32,
    /// Logical (uncompressed) content length.
    pub content_size: u32,
    pub is_compressed: bool,
    /// On-disk zlib stream length; equal to `allocated_size` when compressed.
    pub compressed_size: u32,
    /// Has a leading extra `0xFF*4` pointer slot (only the first MW2
    /// compressed entry in a zone may carry this).
    pub has_leading_pointer_slot: bool,
}

impl RawFileEntry {
    /// Offset one past the final content byte of this entry (before any
    /// following record's header).
    pub fn record_end(&self) -> usize {
        self.data_offset + self.allocated_size as usize
    }

    /// Offset one past this entry's NUL-terminated name.
    pub fn name_end(&self) -> usize {
        self.name_offset + self.name.len() + 1
    }
}

/// A `localize` asset's runtime record. Key/text are raw byte slices (not
/// decoded) to preserve round-trip of non-ASCII encodings.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LocalizedEntry {
    pub header_offset: usize,
    pub record_end: usize,
    pub key_bytes: Vec<u8>,
    pub text_bytes: Vec<u8>,
    /// Degenerate "key-only" form: the first pointer quad wasn't
    /// `0xFF*4`, so no text is present.
    pub key_only: bool,
}

impl LocalizedEntry {
    pub fn new(header_offset: usize, key_bytes: Vec<u8>, text_bytes: Vec<u8>, record_end: usize) -> Self {
        let key_only = text_bytes.is_empty();
        Self {
            header_offset,
            record_end,
            key_bytes,
            text_bytes,
            key_only,
        }
    }
}

/// Validates a localize key per §4.6: ASCII, 3-150 chars, starts with an
/// uppercase letter, `[A-Z0-9_]` only, at least one underscore, at least
/// two uppercase letters, no run of 4+ identical characters.
pub fn validate_localize_key(key: &str) -> bool {
    if !(3..=150).contains(&key.len()) || !key.is_ascii() {
        return false;
    }
    let bytes = key.as_bytes();
    if !bytes[0].is_ascii_uppercase() {
        return false;
    }
    if !bytes
        .iter()
        .all(|&b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
    {
        return false;
    }
    if !bytes.contains(&b'_') {
        return false;
    }
    if bytes.iter().filter(|b| b.is_ascii_uppercase()).count() < 2 {
        return false;
    }
    if bytes.windows(4).any(|w| w.iter().all(|&b| b == w[0])) {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_validator_accepts_typical_key() {
        assert!(validate_localize_key("K_MENU_PLAY"));
    }

    #[test]
    fn key_validator_rejects_no_underscore() {
        assert!(!validate_localize_key("KMENUPLAY"));
    }

    #[test]
    fn key_validator_rejects_lowercase() {
        assert!(!validate_localize_key("K_menu_play"));
    }

    #[test]
    fn key_validator_rejects_repeat_run() {
        assert!(!validate_localize_key("K_AAAA_PLAY"));
    }

    #[test]
    fn key_validator_rejects_too_short() {
        assert!(!validate_localize_key("K_"));
    }

    #[test]
    fn inline_marker_round_trips() {
        assert!(InlineMarker::is_marker(&[0xFF, 0xFF, 0xFF, 0xFF]));
        assert!(!InlineMarker::is_marker(&[0xFF, 0xFF, 0xFF, 0xFE]));
    }
}
