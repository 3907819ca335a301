//! Fresh-zone synthesizer (C8 §4.8): assembles a new zone byte-for-byte
//! from a list of raw files and localized entries for a target variant.

use codff_defs::variant::{Game, PoolEncoding, VariantInfo};
use codff_defs::{file_line_col, Error, ErrorKind, Result, Variant};

use crate::compress::{self, CompressionLevel};
use crate::header::ZoneHeader;

const BLOCK_ALIGN: usize = 64 * 1024;
const DEFAULT_ZONE_NAME: &str = "patch_mp";

/// One raw file to embed, by name and content.
pub struct RawFileInput<'a> {
    pub name: &'a str,
    pub bytes: &'a [u8],
}

/// One localized entry to embed.
pub struct LocalizedInput<'a> {
    pub key: &'a [u8],
    pub text: &'a [u8],
}

fn write_pool_record(out: &mut Vec<u8>, type_id: u32, info: &VariantInfo) {
    let big_endian = info.variant.platform.is_big_endian();
    let type_bytes = if big_endian {
        type_id.to_be_bytes()
    } else {
        type_id.to_le_bytes()
    };
    match info.pool_encoding {
        PoolEncoding::TypeFirst => {
            out.extend_from_slice(&type_bytes);
            out.extend_from_slice(&[0xFF; 4]);
        }
        PoolEncoding::PointerFirst => {
            out.extend_from_slice(&[0xFF; 4]);
            out.extend_from_slice(&type_bytes);
        }
    }
}

fn write_rawfile_standard(out: &mut Vec<u8>, name: &str, content: &[u8]) {
    out.extend_from_slice(&[0xFF; 4]);
    out.extend_from_slice(&(content.len() as u32).to_be_bytes());
    out.extend_from_slice(&[0xFF; 4]);
    out.extend_from_slice(name.as_bytes());
    out.push(0);
    out.extend_from_slice(content);
}

fn write_rawfile_mw2_compressed(out: &mut Vec<u8>, name: &str, content: &[u8], is_first: bool) {
    let compressed = compress::encode_block(
        content,
        codff_defs::variant::Encoding::ZlibDeflate,
        CompressionLevel::Optimal,
    );
    if is_first {
        out.extend_from_slice(&[0xFF; 4]);
    }
    out.extend_from_slice(&[0xFF; 4]);
    out.extend_from_slice(&(compressed.len() as u32).to_be_bytes());
    out.extend_from_slice(&(content.len() as u32).to_be_bytes());
    out.extend_from_slice(&[0xFF; 4]);
    out.extend_from_slice(name.as_bytes());
    out.push(0);
    out.extend_from_slice(&compressed);
}

fn write_localized(out: &mut Vec<u8>, entry: &LocalizedInput) {
    out.extend_from_slice(&[0xFF; 8]);
    out.extend_from_slice(entry.text);
    out.push(0);
    out.extend_from_slice(entry.key);
    out.push(0);
}

fn write_footer(out: &mut Vec<u8>, variant: &Variant, zone_name: &str) {
    out.extend_from_slice(&[0xFF; 4]);
    out.extend_from_slice(&[0u8; 4]);
    if variant.game == Game::MW2 {
        out.extend_from_slice(&[0u8; 4]);
    }
    out.extend_from_slice(&[0xFF; 4]);
    out.extend_from_slice(zone_name.as_bytes());
    out.push(0);
}

/// Synthesizes a complete zone from scratch. `zone_name` defaults to
/// `patch_mp` (§4.8).
pub fn synthesize(
    variant: Variant,
    raw_files: &[RawFileInput],
    localized: &[LocalizedInput],
    zone_name: Option<&str>,
) -> Result<Vec<u8>> {
    let info = variant.info().ok_or_else(|| {
        Error::new(
            file_line_col!(),
            ErrorKind::DecodeFailure(format!("unimplemented variant {variant:?}")),
        )
    })?;

    let zone_name = zone_name.unwrap_or(DEFAULT_ZONE_NAME);
    let asset_count = raw_files.len() as u32 + localized.len() as u32 + 1;

    let mut zone = vec![0u8; info.zone_header_size as usize];
    let header = ZoneHeader::fresh(&info, asset_count);
    header.write(&mut zone, &info)?;
    if matches!(variant.game, Game::CoD4 | Game::WaW) {
        zone.extend_from_slice(&[0xFF; 4]);
    }

    for _ in raw_files {
        write_pool_record(&mut zone, info.rawfile_type_id, &info);
    }
    for _ in localized {
        write_pool_record(&mut zone, info.localize_type_id, &info);
    }
    write_pool_record(&mut zone, info.rawfile_type_id, &info);

    let uses_compression = variant.game == Game::MW2;
    for (i, file) in raw_files.iter().enumerate() {
        if uses_compression {
            write_rawfile_mw2_compressed(&mut zone, file.name, file.bytes, i == 0);
        } else {
            write_rawfile_standard(&mut zone, file.name, file.bytes);
        }
    }

    for entry in localized {
        write_localized(&mut zone, entry);
    }

    write_footer(&mut zone, &variant, zone_name);

    let padded_len = zone.len().div_ceil(BLOCK_ALIGN) * BLOCK_ALIGN;
    zone.resize(padded_len.max(BLOCK_ALIGN), 0);

    let mut header = ZoneHeader::read(&zone, &info)?;
    header.zone_size = zone.len() as u32 - 4;
    header.asset_count = asset_count;
    header.write(&mut zone, &info)?;

    Ok(zone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codff_defs::{Game, Platform};

    #[test]
    fn synthesizes_mw2_ps3_zone_matching_scenario() {
        let variant = Variant::new(Game::MW2, Platform::PS3, false);
        let raw_files = vec![RawFileInput {
            name: "a.gsc",
            bytes: b"x",
        }];
        let localized = vec![LocalizedInput {
            key: b"K_A",
            text: b"A",
        }];

        let zone = synthesize(variant, &raw_files, &localized, None).unwrap();
        assert_eq!(zone.len() % BLOCK_ALIGN, 0);

        let info = variant.info().unwrap();
        assert_eq!(info.zone_header_size, 48);
        let header = ZoneHeader::read(&zone, &info).unwrap();
        assert_eq!(header.mem_alloc_1, 0x03B4);
        assert_eq!(header.mem_alloc_2, 0x1000);
        assert_eq!(header.asset_count, 3);
        assert_eq!(header.zone_size, zone.len() as u32 - 4);
    }

    #[test]
    fn synthesizes_cod4_zone_with_standard_rawfile() {
        let variant = Variant::new(Game::CoD4, Platform::PS3, false);
        let raw_files = vec![RawFileInput {
            name: "a.gsc",
            bytes: b"hello",
        }];
        let zone = synthesize(variant, &raw_files, &[], Some("my_zone")).unwrap();
        assert!(zone.windows(b"a.gsc".len()).any(|w| w == b"a.gsc"));
        assert!(zone.windows(b"my_zone".len()).any(|w| w == b"my_zone"));
    }
}
