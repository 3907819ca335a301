//! Asset payload parser (C6 §4.6): locates `rawfile` and `localize`
//! payload records in pool order, advancing a cursor through the payload
//! area. Parsers here are tolerant: a record that fails validation is
//! reported to the caller, which skips it and keeps scanning (§7).

use codff_defs::model::validate_localize_key;
use codff_defs::variant::Encoding;
use codff_defs::{file_line_col, Error, ErrorKind, InlineMarker, LocalizedEntry, RawFileEntry, RawFileHeaderSize, Result};

const FF4: [u8; 4] = [0xFF; 4];
const MAX_PLAUSIBLE_COMPRESSED_LEN: u32 = 10_000_000;

fn read_name(payload: &[u8], start: usize) -> Option<(String, usize)> {
    let nul = payload[start..].iter().position(|&b| b == 0)?;
    let name = std::str::from_utf8(&payload[start..start + nul]).ok()?.to_owned();
    Some((name, start + nul))
}

fn read_u32_be(payload: &[u8], offset: usize) -> Option<u32> {
    payload
        .get(offset..offset + 4)
        .map(|s| u32::from_be_bytes(s.try_into().unwrap()))
}

/// Parses a standard (12-byte-header) `rawfile` record at `cursor`.
/// Returns `None` if the header markers don't match — the caller advances
/// past the record's best-effort width or aborts the walk, depending on
/// context.
pub fn parse_rawfile_standard(payload: &[u8], cursor: usize) -> Option<RawFileEntry> {
    if payload.get(cursor..cursor + 4)? != FF4 {
        return None;
    }
    let size = read_u32_be(payload, cursor + 4)?;
    if payload.get(cursor + 8..cursor + 12)? != FF4 {
        return None;
    }
    let name_offset = cursor + 12;
    let (name, name_nul) = read_name(payload, name_offset)?;
    let data_offset = name_nul + 1;
    if payload.len() < data_offset + size as usize {
        return None;
    }

    Some(RawFileEntry {
        header_offset: cursor,
        header_size: RawFileHeaderSize::Standard,
        name,
        name_offset,
        data_offset,
        allocated_size: size,
        content_size: size,
        is_compressed: false,
        compressed_size: size,
        has_leading_pointer_slot: false,
    })
}

/// Parses the MW2 compressed (16-byte-header) `rawfile` variant, trying
/// both `cursor` and `cursor - 4` for the first entry's extra leading
/// pointer slot (§4.6).
pub fn parse_rawfile_mw2_compressed(payload: &[u8], cursor: usize, allow_leading_slot: bool) -> Option<RawFileEntry> {
    if let Some(entry) = parse_rawfile_mw2_compressed_at(payload, cursor, false) {
        return Some(entry);
    }
    if allow_leading_slot && cursor >= 4 {
        if let Some(entry) = parse_rawfile_mw2_compressed_at(payload, cursor - 4, true) {
            return Some(entry);
        }
    }
    None
}

fn parse_rawfile_mw2_compressed_at(payload: &[u8], cursor: usize, has_leading_slot: bool) -> Option<RawFileEntry> {
    let header_start = if has_leading_slot { cursor + 4 } else { cursor };
    if payload.get(header_start..header_start + 4)? != FF4 {
        return None;
    }
    let comp_len = read_u32_be(payload, header_start + 4)?;
    let uncomp_len = read_u32_be(payload, header_start + 8)?;
    if payload.get(header_start + 12..header_start + 16)? != FF4 {
        return None;
    }
    if comp_len == 0 || comp_len >= MAX_PLAUSIBLE_COMPRESSED_LEN || comp_len == uncomp_len {
        return None;
    }

    let name_offset = header_start + 16;
    let (name, name_nul) = read_name(payload, name_offset)?;
    let data_offset = name_nul + 1;
    let data = payload.get(data_offset..data_offset + comp_len as usize)?;
    if data.first() != Some(&crate::compress::ZLIB_MAGIC_BYTE) {
        return None;
    }

    Some(RawFileEntry {
        header_offset: cursor,
        header_size: RawFileHeaderSize::Mw2Compressed,
        name,
        name_offset,
        data_offset,
        allocated_size: comp_len,
        content_size: uncomp_len,
        is_compressed: true,
        compressed_size: comp_len,
        has_leading_pointer_slot: has_leading_slot,
    })
}

/// Parses a `localize` record at `cursor`: `0xFF×8`, then text and key
/// NUL-terminated strings, or a key-only degenerate form (§4.6).
pub fn parse_localize(payload: &[u8], cursor: usize) -> Option<LocalizedEntry> {
    let first_quad = payload.get(cursor..cursor + 4)?;
    let second_quad = payload.get(cursor + 4..cursor + 8)?;
    if second_quad != FF4 {
        return None;
    }

    let key_only = first_quad != FF4;
    let mut pos = cursor + 8;

    let (text_bytes, key_bytes) = if key_only {
        let key_nul = payload[pos..].iter().position(|&b| b == 0)?;
        let key = payload[pos..pos + key_nul].to_vec();
        pos += key_nul + 1;
        (Vec::new(), key)
    } else {
        let text_nul = payload[pos..].iter().position(|&b| b == 0)?;
        let text = payload[pos..pos + text_nul].to_vec();
        pos += text_nul + 1;
        let key_nul = payload[pos..].iter().position(|&b| b == 0)?;
        let key = payload[pos..pos + key_nul].to_vec();
        pos += key_nul + 1;
        (text, key)
    };

    let key_str = std::str::from_utf8(&key_bytes).ok()?;
    if !validate_localize_key(key_str) {
        return None;
    }

    Some(LocalizedEntry::new(cursor, key_bytes, text_bytes, pos))
}

/// Returns true for the byte pattern reserved as [`InlineMarker`], used by
/// callers that need to tell a pointer placeholder apart from real data
/// without going through a full record parse.
pub fn is_inline_marker(bytes: &[u8]) -> bool {
    InlineMarker::is_marker(bytes)
}

/// Exports an entry's logical content, decompressing it first if needed
/// (§6.3 "Export helpers"). What a GUI shell's "extract" action hands back.
pub fn export_raw(zone: &[u8], entry: &RawFileEntry) -> Result<Vec<u8>> {
    let slot = zone
        .get(entry.data_offset..entry.data_offset + entry.allocated_size as usize)
        .ok_or_else(|| {
            Error::new(
                file_line_col!(),
                ErrorKind::Truncated {
                    expected: entry.data_offset + entry.allocated_size as usize,
                    found: zone.len(),
                },
            )
        })?;
    if entry.is_compressed {
        crate::compress::decode_as(&slot[..entry.compressed_size as usize], Encoding::ZlibDeflate)
    } else {
        Ok(slot[..entry.content_size as usize].to_vec())
    }
}

/// Exports an entry exactly as it sits on disk: header, name, and data,
/// still compressed if it was stored that way (§6.3 "Export helpers"). The
/// returned bytes can be reinserted into another zone of the same variant
/// without reparsing.
pub fn export_raw_with_header(zone: &[u8], entry: &RawFileEntry) -> Result<Vec<u8>> {
    zone.get(entry.header_offset..entry.record_end())
        .map(<[u8]>::to_vec)
        .ok_or_else(|| {
            Error::new(
                file_line_col!(),
                ErrorKind::Truncated {
                    expected: entry.record_end(),
                    found: zone.len(),
                },
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_rawfile_from_literal_bytes() {
        let bytes: &[u8] = &[
            0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x0A, 0xFF, 0xFF, 0xFF, 0xFF, b'f', b'o', b'o', b'.', b'g',
            b's', b'c', 0x00, b'h', b'e', b'l', b'l', b'o', b'!', b'\n', b'\n', b'\n', b'\n',
        ];
        let entry = parse_rawfile_standard(bytes, 0).unwrap();
        assert_eq!(entry.name, "foo.gsc");
        assert_eq!(entry.content_size, 10);
        assert_eq!(&bytes[entry.data_offset..entry.data_offset + 10], b"hello!\n\n\n\n");
    }

    #[test]
    fn rejects_standard_rawfile_missing_marker() {
        let bytes = vec![0u8; 20];
        assert!(parse_rawfile_standard(&bytes, 0).is_none());
    }

    #[test]
    fn parses_localize_entry() {
        let mut bytes = vec![0xFF; 8];
        bytes.extend_from_slice(b"Hello!\0");
        bytes.extend_from_slice(b"K_MENU_HELLO\0");
        let entry = parse_localize(&bytes, 0).unwrap();
        assert_eq!(entry.text_bytes, b"Hello!");
        assert_eq!(entry.key_bytes, b"K_MENU_HELLO");
        assert!(!entry.key_only);
    }

    #[test]
    fn parses_key_only_localize_entry() {
        let mut bytes = vec![0x00, 0x00, 0x00, 0x00];
        bytes.extend_from_slice(&FF4);
        bytes.extend_from_slice(b"K_MENU_HELLO\0");
        let entry = parse_localize(&bytes, 0).unwrap();
        assert!(entry.key_only);
        assert!(entry.text_bytes.is_empty());
    }

    #[test]
    fn rejects_localize_with_bad_key() {
        let mut bytes = vec![0xFF; 8];
        bytes.extend_from_slice(b"Hello!\0");
        bytes.extend_from_slice(b"nope\0");
        assert!(parse_localize(&bytes, 0).is_none());
    }

    #[test]
    fn export_raw_returns_standard_content() {
        let bytes: &[u8] = &[
            0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x05, 0xFF, 0xFF, 0xFF, 0xFF, b'a', b'.', b'g', b's', b'c',
            0x00, b'h', b'e', b'l', b'l', b'o',
        ];
        let entry = parse_rawfile_standard(bytes, 0).unwrap();
        let content = export_raw(bytes, &entry).unwrap();
        assert_eq!(content, b"hello");
    }

    #[test]
    fn export_raw_with_header_round_trips_into_a_parse() {
        let bytes: &[u8] = &[
            0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x05, 0xFF, 0xFF, 0xFF, 0xFF, b'a', b'.', b'g', b's', b'c',
            0x00, b'h', b'e', b'l', b'l', b'o',
        ];
        let entry = parse_rawfile_standard(bytes, 0).unwrap();
        let exported = export_raw_with_header(bytes, &entry).unwrap();
        let reparsed = parse_rawfile_standard(&exported, 0).unwrap();
        assert_eq!(reparsed.name, "a.gsc");
        assert_eq!(reparsed.content_size, 5);
    }
}
