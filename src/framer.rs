//! Archive framer (C3 §4.3, §6.1): FastFile file-level read/write. Detects
//! the variant from the 12-byte prelude, skips/re-emits the MW2 extended
//! header, and de-frames/re-frames the compressed body according to the
//! variant's [`Framing`](codff_defs::variant::Framing).

use codff_defs::variant::{Encoding, Framing, PoolEncoding};
use codff_defs::{file_line_col, Error, ErrorKind, Game, Platform, Result, Variant, VariantInfo};

use crate::compress::{self, CompressionLevel};

const PRELUDE_LEN: usize = 12;
const STREAMING_MAGIC: &[u8; 8] = b"IWffs100";
const BLOCK_MAX_UNCOMPRESSED: usize = 64 * 1024;
const BLOCK_END_MARKER: [u8; 2] = [0x00, 0x01];
const HASH_TABLE_LEN: usize = 0x400C - 0x14;

/// MW2's 25-byte (+ `entry_count * 20` variable) extended header, present on
/// every MW2 archive regardless of framing (§4.3).
#[derive(Clone, Debug, Default)]
pub struct Mw2ExtendedHeader {
    pub allow_online_update: u8,
    pub file_creation_time: u64,
    pub region: u32,
    pub entries: Vec<[u8; 20]>,
    pub file_sizes: u64,
}

impl Mw2ExtendedHeader {
    fn read(bytes: &[u8]) -> Result<(Self, usize)> {
        if bytes.len() < 17 {
            return Err(truncated(17, bytes.len()));
        }
        let allow_online_update = bytes[0];
        let file_creation_time = u64::from_be_bytes(bytes[1..9].try_into().unwrap());
        let region = u32::from_be_bytes(bytes[9..13].try_into().unwrap());
        let entry_count = u32::from_be_bytes(bytes[13..17].try_into().unwrap()) as usize;

        let entries_start = 17;
        let entries_len = entry_count * 20;
        let file_sizes_start = entries_start + entries_len;
        let total = file_sizes_start + 8;
        if bytes.len() < total {
            return Err(truncated(total, bytes.len()));
        }

        let mut entries = Vec::with_capacity(entry_count);
        for i in 0..entry_count {
            let start = entries_start + i * 20;
            entries.push(bytes[start..start + 20].try_into().unwrap());
        }
        let file_sizes =
            u64::from_be_bytes(bytes[file_sizes_start..file_sizes_start + 8].try_into().unwrap());

        Ok((
            Self {
                allow_online_update,
                file_creation_time,
                region,
                entries,
                file_sizes,
            },
            total,
        ))
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.push(self.allow_online_update);
        out.extend_from_slice(&self.file_creation_time.to_be_bytes());
        out.extend_from_slice(&self.region.to_be_bytes());
        out.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        for entry in &self.entries {
            out.extend_from_slice(entry);
        }
        out.extend_from_slice(&self.file_sizes.to_be_bytes());
    }
}

fn truncated(expected: usize, found: usize) -> Error {
    Error::new(file_line_col!(), ErrorKind::Truncated { expected, found })
}

/// Detects the archive variant from its magic/version/platform signature
/// (§4.1). Platform can't be derived with certainty purely from the
/// prelude for every combination (see DESIGN.md, "platform detection"); in
/// the one genuinely ambiguous case (unsigned MW2 console) this peeks at
/// the framing of the body that follows to disambiguate.
pub fn detect(bytes: &[u8]) -> Result<Variant> {
    if bytes.len() < PRELUDE_LEN {
        return Err(truncated(PRELUDE_LEN, bytes.len()));
    }

    let magic: [u8; 8] = bytes[0..8].try_into().unwrap();
    let is_signed = match &magic {
        b"IWffu100" => false,
        b"IWff0100" => true,
        _ => {
            return Err(Error::new(
                file_line_col!(),
                ErrorKind::MagicMismatch(magic),
            ))
        }
    };

    let version_field = &bytes[8..12];
    let version_be = u32::from_be_bytes(version_field.try_into().unwrap());
    let version_le = u32::from_le_bytes(version_field.try_into().unwrap());

    if let Some(game) = VariantInfo::game_from_version(version_be) {
        let platform = if is_signed {
            Platform::Xbox360
        } else if game == Game::MW2 {
            guess_mw2_console_platform(&bytes[PRELUDE_LEN..])
        } else {
            // CoD4/WaW unsigned console archives are byte-identical in
            // framing on PS3 and Xbox 360; default to PS3 (see DESIGN.md).
            Platform::PS3
        };
        return Ok(Variant::new(game, platform, is_signed));
    }

    if !is_signed {
        if let Some(game) = VariantInfo::game_from_version(version_le) {
            return Ok(Variant::new(game, Platform::PC, false));
        }
    }

    Err(Error::new(
        file_line_col!(),
        ErrorKind::DecodeFailure(alloc_format_version(version_be, version_le)),
    ))
}

fn alloc_format_version(be: u32, le: u32) -> String {
    format!("unrecognized version field (be={be:#x}, le={le:#x})")
}

/// MW2 unsigned console archives are either block-framed (PS3) or a single
/// continuous zlib stream (Xbox 360); peeking at the bytes right after the
/// (skipped) extended header tells them apart unambiguously.
fn guess_mw2_console_platform(after_prelude: &[u8]) -> Platform {
    let Ok((_, ext_len)) = Mw2ExtendedHeader::read(after_prelude) else {
        return Platform::PS3;
    };
    let body = &after_prelude[ext_len..];
    if body.len() >= 2 {
        let block_len = u16::from_be_bytes([body[0], body[1]]) as usize;
        if block_len > 1 && body.len() >= 2 + block_len {
            return Platform::PS3;
        }
    }
    Platform::Xbox360
}

/// A decompressed zone plus whatever framing metadata must be preserved
/// verbatim to re-frame it losslessly.
#[derive(Clone, Debug)]
pub struct DecodedArchive {
    pub variant: Variant,
    pub zone: Vec<u8>,
    pub mw2_header: Option<Mw2ExtendedHeader>,
    /// The signed Xbox 360 hash table, opaque to the editor, copied
    /// verbatim on rewrite (§4.3, §6.1).
    pub hash_table: Option<Vec<u8>>,
}

/// Decompresses a FastFile archive into its raw zone blob (C3 → C2).
pub fn decompress(archive_bytes: &[u8]) -> Result<DecodedArchive> {
    let variant = detect(archive_bytes)?;
    let info = variant.info().ok_or_else(|| {
        Error::new(
            file_line_col!(),
            ErrorKind::DecodeFailure(format!("unimplemented variant {variant:?}")),
        )
    })?;

    let mut cursor = PRELUDE_LEN;
    let mut mw2_header = None;
    if variant.game == Game::MW2 {
        let (hdr, len) = Mw2ExtendedHeader::read(&archive_bytes[cursor..])?;
        cursor += len;
        mw2_header = Some(hdr);
    }

    let (zone, hash_table) = match info.framing {
        Framing::StreamingSigned => {
            let rest = &archive_bytes[cursor..];
            if rest.len() < 8 || &rest[0..8] != STREAMING_MAGIC {
                return Err(Error::new(
                    file_line_col!(),
                    ErrorKind::MagicMismatch(rest.get(0..8).map_or([0; 8], |s| s.try_into().unwrap())),
                ));
            }
            let rest = &rest[8..];
            if rest.len() < HASH_TABLE_LEN {
                return Err(truncated(HASH_TABLE_LEN, rest.len()));
            }
            let hash_table = rest[..HASH_TABLE_LEN].to_vec();
            let stream = &rest[HASH_TABLE_LEN..];
            (compress::decode_as(stream, info.encoding)?, Some(hash_table))
        }
        Framing::SingleStream => {
            let stream = &archive_bytes[cursor..];
            let start = if variant.game == Game::MW2 && is_dev_build(archive_bytes) {
                find_zlib_stream_start(stream).unwrap_or(0)
            } else {
                0
            };
            (compress::decode_as(&stream[start..], info.encoding)?, None)
        }
        Framing::BlockFramed => (decode_blocks(&archive_bytes[cursor..], info.encoding)?, None),
    };

    Ok(DecodedArchive {
        variant,
        zone,
        mw2_header,
        hash_table,
    })
}

fn is_dev_build(archive_bytes: &[u8]) -> bool {
    archive_bytes.len() >= 12 && u32::from_be_bytes(archive_bytes[8..12].try_into().unwrap()) == 0xFD
}

/// Best-effort search for a zlib stream start (`0x78` with a valid header
/// checksum per RFC 1950 §2.2), used only for the undocumented MW2
/// dev-build (`0xFD`) layout — see DESIGN.md, Open Questions.
fn find_zlib_stream_start(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(2)
        .position(|w| w[0] == compress::ZLIB_MAGIC_BYTE && (u16::from_be_bytes([w[0], w[1]]) % 31 == 0))
}

fn decode_blocks(body: &[u8], encoding: Encoding) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut pos = 0;

    loop {
        if body.len() - pos < 2 {
            log::warn!("block-framed archive ran out of bytes without an end marker");
            break;
        }
        let len = u16::from_be_bytes([body[pos], body[pos + 1]]) as usize;
        if len <= 1 {
            pos += 2;
            break;
        }
        pos += 2;
        if body.len() - pos < len {
            return Err(truncated(len, body.len() - pos));
        }
        let block = compress::decode_as(&body[pos..pos + len], encoding)?;
        out.extend_from_slice(&block);
        pos += len;

        if out.len() % BLOCK_MAX_UNCOMPRESSED != 0 && pos >= body.len() {
            break;
        }
    }

    if pos < body.len() {
        log::warn!(
            "{} trailing byte(s) after block-framed end marker, ignored",
            body.len() - pos
        );
    }

    Ok(out)
}

fn encode_blocks(zone: &[u8], encoding: Encoding, level: CompressionLevel) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in zone.chunks(BLOCK_MAX_UNCOMPRESSED) {
        let block = compress::encode_block(chunk, encoding, level);
        out.extend_from_slice(&(block.len() as u16).to_be_bytes());
        out.extend_from_slice(&block);
    }
    out.extend_from_slice(&BLOCK_END_MARKER);
    out
}

/// Options controlling [`compress`]'s write path.
#[derive(Clone, Debug, Default)]
pub struct CompressOptions {
    pub level: CompressionLevel,
    /// Required when re-framing a signed Xbox 360 archive: the original
    /// hash table, copied verbatim (§4.3).
    pub hash_table: Option<Vec<u8>>,
    pub mw2_header: Option<Mw2ExtendedHeader>,
}

/// Frames and compresses a zone blob back into a FastFile archive for the
/// given variant (C2 → C3, the write-side mirror of [`decompress`]).
pub fn compress(zone_bytes: &[u8], variant: Variant, opts: &CompressOptions) -> Result<Vec<u8>> {
    let info = variant.info().ok_or_else(|| {
        Error::new(
            file_line_col!(),
            ErrorKind::DecodeFailure(format!("unimplemented variant {variant:?}")),
        )
    })?;

    let mut out = Vec::with_capacity(zone_bytes.len());
    out.extend_from_slice(&info.magic);
    out.extend_from_slice(&info.version.to_be_bytes());

    if variant.game == Game::MW2 {
        opts.mw2_header.clone().unwrap_or_default().write(&mut out);
    }

    match info.framing {
        Framing::StreamingSigned => {
            let hash_table = opts.hash_table.as_ref().ok_or_else(|| {
                Error::new(
                    file_line_col!(),
                    ErrorKind::InvariantViolation(
                        "signed Xbox 360 rewrite requires the original hash table".into(),
                    ),
                )
            })?;
            if hash_table.len() != HASH_TABLE_LEN {
                return Err(Error::new(
                    file_line_col!(),
                    ErrorKind::InvariantViolation(format!(
                        "hash table must be {HASH_TABLE_LEN} bytes, got {}",
                        hash_table.len()
                    )),
                ));
            }
            out.extend_from_slice(STREAMING_MAGIC);
            out.extend_from_slice(hash_table);
            out.extend_from_slice(&compress::encode_block(zone_bytes, info.encoding, opts.level));
        }
        Framing::SingleStream => {
            out.extend_from_slice(&compress::encode_block(zone_bytes, info.encoding, opts.level));
        }
        Framing::BlockFramed => {
            out.extend_from_slice(&encode_blocks(zone_bytes, info.encoding, opts.level));
        }
    }

    Ok(out)
}

/// Pool encoding tie-breaking convenience re-exported for callers that only
/// need the variant's pool-record shape without the rest of [`VariantInfo`].
pub fn pool_encoding(variant: Variant) -> Option<PoolEncoding> {
    variant.info().map(|i| i.pool_encoding)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cod4_archive(zone: &[u8]) -> Vec<u8> {
        let variant = Variant::new(Game::CoD4, Platform::PS3, false);
        compress(zone, variant, &CompressOptions::default()).unwrap()
    }

    #[test]
    fn detects_mw2_unsigned_from_literal_bytes() {
        let mut bytes = vec![0x49, 0x57, 0x66, 0x66, 0x75, 0x31, 0x30, 0x30, 0x00, 0x00, 0x01, 0x0D];
        bytes.extend_from_slice(&[0u8; 64]);
        let variant = detect(&bytes).unwrap();
        assert_eq!(variant.game, Game::MW2);
        assert!(!variant.is_signed);
    }

    #[test]
    fn round_trips_block_framed_cod4() {
        let zone = b"a zone blob, pretend".repeat(100);
        let archive = cod4_archive(&zone);
        let decoded = decompress(&archive).unwrap();
        assert_eq!(decoded.zone, zone);
        assert_eq!(decoded.variant.game, Game::CoD4);
    }

    #[test]
    fn rejects_bad_magic() {
        let bytes = vec![0u8; 12];
        assert!(matches!(
            detect(&bytes).unwrap_err().kind(),
            ErrorKind::MagicMismatch(_)
        ));
    }

    #[test]
    fn round_trips_mw2_pc_single_stream() {
        let zone = b"zone for mw2 pc".repeat(50);
        let variant = Variant::new(Game::MW2, Platform::PC, false);
        let archive = compress(&zone, variant, &CompressOptions::default()).unwrap();
        let decoded = decompress(&archive).unwrap();
        assert_eq!(decoded.zone, zone);
        assert_eq!(decoded.variant.platform, Platform::PC);
    }
}
