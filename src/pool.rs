//! Asset-pool walker (C5 §4.5): scans 8-byte pool records between the tag
//! section end and the all-`0xFF` sentinel.

use codff_defs::variant::{PoolEncoding, VariantInfo};

const SENTINEL: [u8; 8] = [0xFF; 8];

/// One accepted pool record.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PoolRecord {
    pub pool_offset: usize,
    pub type_id: u32,
    pub big_endian: bool,
}

/// The result of a pool walk: its extent plus every accepted record.
#[derive(Clone, Debug, Default)]
pub struct PoolWalk {
    pub pool_start: usize,
    pub pool_end: usize,
    pub records: Vec<PoolRecord>,
}

/// Types the variant actually defines payload parsing for; anything else
/// is still *accepted* into the pool (it's a real pool record) but carried
/// as an opaque type id rather than parsed (§4.5, §4.6).
fn known_type_ids(info: &VariantInfo) -> [u32; 2] {
    [info.rawfile_type_id, info.localize_type_id]
}

/// Tries to decode an 8-byte candidate as a pool record in both encodings,
/// preferring pointer-first when its leading quad is all-`0xFF` (§4.5 tie
/// break), and accepting only type ids in the variant's asset enumeration.
/// The walker retains the source's tolerance for mixed endianness within
/// one zone (§9, Open Questions (b)): both native and swapped endian are
/// tried before rejecting a candidate.
fn decode_candidate(bytes: &[u8; 8], info: &VariantInfo) -> Option<PoolRecord> {
    let leading_ff = bytes[0..4] == [0xFF; 4];
    let trailing_ff = bytes[4..8] == [0xFF; 4];

    let try_type_first = |big_endian: bool| -> Option<u32> {
        if !trailing_ff {
            return None;
        }
        let type_word = if big_endian {
            u32::from_be_bytes(bytes[0..4].try_into().unwrap())
        } else {
            u32::from_le_bytes(bytes[0..4].try_into().unwrap())
        };
        Some(type_word)
    };
    let try_pointer_first = |big_endian: bool| -> Option<u32> {
        if !leading_ff {
            return None;
        }
        let type_word = if big_endian {
            u32::from_be_bytes(bytes[4..8].try_into().unwrap())
        } else {
            u32::from_le_bytes(bytes[4..8].try_into().unwrap())
        };
        Some(type_word)
    };

    let native_be = info.variant.platform.is_big_endian();
    let preferred_pointer_first = leading_ff;

    let mut attempts: Vec<(PoolEncoding, bool)> = Vec::with_capacity(4);
    if preferred_pointer_first {
        attempts.push((PoolEncoding::PointerFirst, native_be));
        attempts.push((PoolEncoding::PointerFirst, !native_be));
        attempts.push((PoolEncoding::TypeFirst, native_be));
        attempts.push((PoolEncoding::TypeFirst, !native_be));
    } else {
        attempts.push((PoolEncoding::TypeFirst, native_be));
        attempts.push((PoolEncoding::TypeFirst, !native_be));
        attempts.push((PoolEncoding::PointerFirst, native_be));
        attempts.push((PoolEncoding::PointerFirst, !native_be));
    }

    for (encoding, big_endian) in attempts {
        let type_word = match encoding {
            PoolEncoding::TypeFirst => try_type_first(big_endian),
            PoolEncoding::PointerFirst => try_pointer_first(big_endian),
        };
        if let Some(type_word) = type_word {
            if known_type_ids(info).contains(&type_word) {
                return Some(PoolRecord {
                    pool_offset: 0,
                    type_id: type_word,
                    big_endian,
                });
            }
        }
    }
    None
}

/// Walks the pool starting at `pool_start` (the tag section's end, or 0 if
/// none was located).
pub fn walk(zone: &[u8], pool_start: usize, info: &VariantInfo) -> PoolWalk {
    let mut offset = pool_start;
    let mut records = Vec::new();

    while offset + 8 <= zone.len() {
        let candidate: [u8; 8] = zone[offset..offset + 8].try_into().unwrap();
        if candidate == SENTINEL {
            return PoolWalk {
                pool_start,
                pool_end: offset + 8,
                records,
            };
        }
        if let Some(mut record) = decode_candidate(&candidate, info) {
            record.pool_offset = offset;
            log::debug!("accepted pool record at {offset:#x}: type {:#x}", record.type_id);
            records.push(record);
            offset += 8;
        } else {
            offset += 1;
        }
    }

    log::warn!("asset pool ran off the end of the zone without a sentinel");
    PoolWalk {
        pool_start,
        pool_end: zone.len(),
        records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codff_defs::{Game, Platform, Variant};

    fn cod4_info() -> VariantInfo {
        Variant::new(Game::CoD4, Platform::PS3, false).info().unwrap()
    }

    fn mw2_pc_info() -> VariantInfo {
        Variant::new(Game::MW2, Platform::PC, false).info().unwrap()
    }

    #[test]
    fn walks_type_first_records_and_finds_sentinel() {
        let info = cod4_info();
        let mut zone = Vec::new();
        zone.extend_from_slice(&[0x00, 0x00, 0x00, info.rawfile_type_id as u8, 0xFF, 0xFF, 0xFF, 0xFF]);
        zone.extend_from_slice(&[0x00, 0x00, 0x00, info.localize_type_id as u8, 0xFF, 0xFF, 0xFF, 0xFF]);
        zone.extend_from_slice(&SENTINEL);

        let walk_result = walk(&zone, 0, &info);
        assert_eq!(walk_result.records.len(), 2);
        assert_eq!(walk_result.pool_end, 16 + 8);
    }

    #[test]
    fn walks_pointer_first_records_little_endian() {
        let info = mw2_pc_info();
        let mut zone = Vec::new();
        zone.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF]);
        zone.extend_from_slice(&info.rawfile_type_id.to_le_bytes());
        zone.extend_from_slice(&SENTINEL);

        let walk_result = walk(&zone, 0, &info);
        assert_eq!(walk_result.records.len(), 1);
        assert_eq!(walk_result.records[0].type_id, info.rawfile_type_id);
    }

    #[test]
    fn probes_byte_by_byte_past_garbage() {
        let info = cod4_info();
        let mut zone = vec![0x11, 0x22, 0x33];
        zone.extend_from_slice(&[0x00, 0x00, 0x00, info.rawfile_type_id as u8, 0xFF, 0xFF, 0xFF, 0xFF]);
        zone.extend_from_slice(&SENTINEL);

        let walk_result = walk(&zone, 0, &info);
        assert_eq!(walk_result.records.len(), 1);
        assert_eq!(walk_result.records[0].pool_offset, 3);
    }
}
