//! Zone header codec (C4 §3, §4.4): byte-accurate read/write of the fixed
//! 48/52/56-byte zone prelude.

use codff_defs::variant::VariantInfo;
use codff_defs::{file_line_col, Error, ErrorKind, Result};

/// The parsed zone header. `reserved` is carried through unmodified on
/// edit and zero-filled on synthesis (§3: "content ignored on read,
/// constants on write").
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ZoneHeader {
    pub zone_size: u32,
    pub reserved: Vec<u8>,
    pub mem_alloc_1: u32,
    pub mem_alloc_2: u32,
    pub script_string_count: u32,
    pub script_strings_ptr: u32,
    pub asset_count: u32,
    pub assets_ptr: u32,
}

fn read_u32(bytes: &[u8], offset: usize, big_endian: bool) -> Result<u32> {
    let slot = bytes.get(offset..offset + 4).ok_or_else(|| {
        Error::new(
            file_line_col!(),
            ErrorKind::Truncated {
                expected: offset + 4,
                found: bytes.len(),
            },
        )
    })?;
    let arr: [u8; 4] = slot.try_into().unwrap();
    Ok(if big_endian {
        u32::from_be_bytes(arr)
    } else {
        u32::from_le_bytes(arr)
    })
}

fn write_u32(out: &mut [u8], offset: usize, value: u32, big_endian: bool) {
    let bytes = if big_endian {
        value.to_be_bytes()
    } else {
        value.to_le_bytes()
    };
    out[offset..offset + 4].copy_from_slice(&bytes);
}

impl ZoneHeader {
    /// Reads the header from the start of `zone`. `info` supplies the
    /// variant's header size, endianness, and field offsets.
    pub fn read(zone: &[u8], info: &VariantInfo) -> Result<Self> {
        let size = info.zone_header_size as usize;
        if zone.len() < size {
            return Err(Error::new(
                file_line_col!(),
                ErrorKind::Truncated {
                    expected: size,
                    found: zone.len(),
                },
            ));
        }
        let big_endian = info.variant.platform.is_big_endian();

        let zone_size = read_u32(zone, 0, big_endian)?;
        let reserved = zone[4..info.mem_alloc_offset()].to_vec();
        let mem_alloc_1 = read_u32(zone, info.mem_alloc_offset(), big_endian)?;
        let mem_alloc_2 = read_u32(zone, info.mem_alloc_offset() + 4, big_endian)?;
        let script_string_count = read_u32(zone, info.script_string_count_offset(), big_endian)?;
        let script_strings_ptr = read_u32(zone, info.script_string_count_offset() + 4, big_endian)?;
        let asset_count = read_u32(zone, info.asset_count_offset(), big_endian)?;
        let assets_ptr = read_u32(zone, info.asset_count_offset() + 4, big_endian)?;

        Ok(Self {
            zone_size,
            reserved,
            mem_alloc_1,
            mem_alloc_2,
            script_string_count,
            script_strings_ptr,
            asset_count,
            assets_ptr,
        })
    }

    /// Writes the header into the first `info.zone_header_size` bytes of
    /// `zone`, which must already be at least that long.
    pub fn write(&self, zone: &mut [u8], info: &VariantInfo) -> Result<()> {
        let size = info.zone_header_size as usize;
        if zone.len() < size {
            return Err(Error::new(
                file_line_col!(),
                ErrorKind::Truncated {
                    expected: size,
                    found: zone.len(),
                },
            ));
        }
        let big_endian = info.variant.platform.is_big_endian();

        write_u32(zone, 0, self.zone_size, big_endian);
        let reserved_end = info.mem_alloc_offset();
        zone[4..reserved_end].copy_from_slice(&self.reserved);
        write_u32(zone, info.mem_alloc_offset(), self.mem_alloc_1, big_endian);
        write_u32(zone, info.mem_alloc_offset() + 4, self.mem_alloc_2, big_endian);
        write_u32(
            zone,
            info.script_string_count_offset(),
            self.script_string_count,
            big_endian,
        );
        write_u32(
            zone,
            info.script_string_count_offset() + 4,
            self.script_strings_ptr,
            big_endian,
        );
        write_u32(zone, info.asset_count_offset(), self.asset_count, big_endian);
        write_u32(zone, info.asset_count_offset() + 4, self.assets_ptr, big_endian);
        Ok(())
    }

    /// Builds a fresh header for synthesis: zone_size/asset_count are
    /// placeholders the caller patches in after the rest of the zone is
    /// assembled (§4.8).
    pub fn fresh(info: &VariantInfo, asset_count: u32) -> Self {
        Self {
            zone_size: 0,
            reserved: vec![0u8; info.mem_alloc_offset() - 4],
            mem_alloc_1: info.mem_alloc_1,
            mem_alloc_2: info.mem_alloc_2,
            script_string_count: 0,
            script_strings_ptr: 0,
            asset_count,
            assets_ptr: 0,
        }
    }

    /// Validates that `mem_alloc_1`/`mem_alloc_2` actually identify the
    /// game the caller detected from the archive prelude (§4.1: "refined
    /// from header mem-alloc constants after decompression, definitive").
    pub fn confirms_game(&self, info: &VariantInfo) -> bool {
        self.mem_alloc_1 == info.mem_alloc_1 && self.mem_alloc_2 == info.mem_alloc_2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codff_defs::{Game, Platform, Variant};

    fn cod4_info() -> VariantInfo {
        Variant::new(Game::CoD4, Platform::PS3, false).info().unwrap()
    }

    #[test]
    fn round_trips_header_fields() {
        let info = cod4_info();
        let mut zone = vec![0u8; info.zone_header_size as usize + 16];
        let header = ZoneHeader {
            zone_size: zone.len() as u32 - 4,
            reserved: vec![0u8; info.mem_alloc_offset() - 4],
            mem_alloc_1: info.mem_alloc_1,
            mem_alloc_2: info.mem_alloc_2,
            script_string_count: 3,
            script_strings_ptr: 0xFFFF_FFFF,
            asset_count: 7,
            assets_ptr: 0xFFFF_FFFF,
        };
        header.write(&mut zone, &info).unwrap();
        let read_back = ZoneHeader::read(&zone, &info).unwrap();
        assert_eq!(header, read_back);
        assert!(read_back.confirms_game(&info));
    }

    #[test]
    fn fresh_header_identifies_game() {
        let info = cod4_info();
        let header = ZoneHeader::fresh(&info, 5);
        assert!(header.confirms_game(&info));
        assert_eq!(header.asset_count, 5);
    }

    #[test]
    fn truncated_zone_is_rejected() {
        let info = cod4_info();
        let zone = vec![0u8; 4];
        assert!(matches!(
            ZoneHeader::read(&zone, &info).unwrap_err().kind(),
            ErrorKind::Truncated { .. }
        ));
    }
}
