//! Variant registry (C1): game x platform signature table, version
//! constants, and the per-variant constants the rest of the codec looks up
//! by [`Variant`] rather than scattering across conditionals (see DESIGN.md,
//! "Duck-typed platform flags").

use core::fmt;

/// One of the three supported titles.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Game {
    CoD4,
    WaW,
    MW2,
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CoD4 => "Call of Duty 4",
            Self::WaW => "World at War",
            Self::MW2 => "Modern Warfare 2",
        };
        write!(f, "{s}")
    }
}

/// Target platform. `Wii` is recognized by magic/version but has no
/// implemented framing or header layout (mirrors the teacher's treatment of
/// unimplemented platforms: detected, then rejected with a typed error
/// rather than silently mis-parsed).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Platform {
    PS3,
    Xbox360,
    PC,
    Wii,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PS3 => "PS3",
            Self::Xbox360 => "Xbox 360",
            Self::PC => "PC",
            Self::Wii => "Wii",
        };
        write!(f, "{s}")
    }
}

impl Platform {
    /// Console platforms store the zone header big-endian; `PC` stores it
    /// little-endian.
    pub const fn is_big_endian(&self) -> bool {
        !matches!(self, Self::PC)
    }

    pub const fn is_little_endian(&self) -> bool {
        !self.is_big_endian()
    }

    pub const fn is_console(&self) -> bool {
        !matches!(self, Self::PC)
    }
}

/// A closed tagged variant identifying exactly one archive/zone shape:
/// `{ game, platform, is_signed }`. Never represented as scattered booleans
/// elsewhere in the codec.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Variant {
    pub game: Game,
    pub platform: Platform,
    pub is_signed: bool,
}

impl Variant {
    pub const fn new(game: Game, platform: Platform, is_signed: bool) -> Self {
        Self {
            game,
            platform,
            is_signed,
        }
    }

    /// Looks up the full constant record for this variant. `None` for
    /// combinations that don't exist in the wild (e.g. a signed MW2 archive,
    /// or anything on `Wii`).
    pub const fn info(&self) -> Option<VariantInfo> {
        VariantInfo::for_variant(*self)
    }
}

/// FastFile framing, selected by [`Variant`] (C3 §4.3).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Framing {
    /// `len_be_u16 | deflate_bytes[len]` blocks, terminated by `0x00 0x01`.
    BlockFramed,
    /// One continuous zlib stream covering the whole zone, no block framing.
    SingleStream,
    /// `IWffs100 | hash_table[16376] | zlib_stream`, Xbox 360 signed only.
    StreamingSigned,
}

/// Raw deflate vs zlib-wrapped deflate (C2 §4.2).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Encoding {
    RawDeflate,
    ZlibDeflate,
}

pub const INLINE_MARKER: u32 = 0xFFFF_FFFF;

/// Asset-pool record encoding: `type-first` (`00 00 00 TT FF FF FF FF`) or
/// `pointer-first` (`FF FF FF FF 00 00 00 TT`). See C5 §4.5.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PoolEncoding {
    TypeFirst,
    PointerFirst,
}

/// All per-variant constants in one record — looked up once via
/// [`Variant::info`], never recomputed from conditionals downstream.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct VariantInfo {
    pub variant: Variant,
    /// The 8-byte ASCII magic at archive offset 0.
    pub magic: [u8; 8],
    /// The canonical version this registry writes on synthesis. Reads
    /// tolerate any of [`VariantInfo::valid_versions`].
    pub version: u32,
    pub framing: Framing,
    pub encoding: Encoding,
    pub pool_encoding: PoolEncoding,
    /// Total size in bytes of the fixed zone-header prelude (§3: 48, 52, or 56).
    pub zone_header_size: u32,
    pub mem_alloc_1: u32,
    pub mem_alloc_2: u32,
    pub rawfile_type_id: u32,
    pub localize_type_id: u32,
}

impl VariantInfo {
    pub const fn for_variant(variant: Variant) -> Option<Self> {
        use Encoding::*;
        use Framing::*;
        use Game::*;
        use Platform::*;
        use PoolEncoding::*;

        let Variant {
            game,
            platform,
            is_signed,
        } = variant;

        if matches!(platform, Wii) {
            return None;
        }

        // MW2 never shipped a signed build in this corpus; CoD4/WaW are
        // signed only on Xbox 360 (streaming-signed framing, §4.3).
        if is_signed && (matches!(game, MW2) || !matches!(platform, Xbox360)) {
            return None;
        }

        let magic: [u8; 8] = if is_signed {
            *b"IWff0100"
        } else {
            *b"IWffu100"
        };

        let framing = if is_signed {
            StreamingSigned
        } else {
            match (game, platform) {
                (MW2, PC) => SingleStream,
                (MW2, Xbox360) => SingleStream,
                _ => BlockFramed,
            }
        };

        let encoding = match game {
            MW2 => ZlibDeflate,
            _ => RawDeflate,
        };

        let pool_encoding = match (game, platform) {
            (MW2, _) | (_, PC) => PointerFirst,
            _ => TypeFirst,
        };

        // MW2's worked synthesis example (a PS3 zone) begins with a 48-B
        // header, so both MW2 console platforms share the shorter header;
        // only CoD4/WaW keep the 52-B console header. See DESIGN.md.
        let zone_header_size = match (game, platform) {
            (_, PC) => 56,
            (MW2, _) => 48,
            _ => 52,
        };

        let (mem_alloc_1, mem_alloc_2) = match game {
            CoD4 => (0x0F70, 0x0),
            WaW => (0x10B0, 0x5F8F0),
            MW2 => (0x03B4, 0x1000),
        };

        // rawfile/localize asset type ids: stable across CoD4/WaW (shared
        // asset-pool taxonomy); MW2 renumbered the pool.
        let (rawfile_type_id, localize_type_id) = match game {
            CoD4 | WaW => (0x22, 0x1A),
            MW2 => (0x23, 0x1A),
        };

        let version = Self::canonical_version(game);

        Some(Self {
            variant,
            magic,
            version,
            framing,
            encoding,
            pool_encoding,
            zone_header_size,
            mem_alloc_1,
            mem_alloc_2,
            rawfile_type_id,
            localize_type_id,
        })
    }

    const fn canonical_version(game: Game) -> u32 {
        match game {
            Game::CoD4 => 0x1A2,
            Game::WaW => 0x19B,
            Game::MW2 => 0x114,
        }
    }

    /// Every version number a reader should accept for this game (patch
    /// revisions all parse identically at the zone level).
    pub const fn valid_versions(game: Game) -> &'static [u32] {
        match game {
            Game::CoD4 => &[0x01, 0x05, 0x1A2],
            Game::WaW => &[0x183, 0x19B],
            Game::MW2 => &[0x10D, 0x114, 0xFD],
        }
    }

    pub fn game_from_version(version: u32) -> Option<Game> {
        for game in [Game::CoD4, Game::WaW, Game::MW2] {
            if Self::valid_versions(game).contains(&version) {
                return Some(game);
            }
        }
        None
    }

    /// Byte offset of `asset_count` within the zone header.
    pub const fn asset_count_offset(&self) -> usize {
        // zone_size(4) + reserved + mem_alloc_1(4) + mem_alloc_2(4)
        // + script_string_count(4) + script_strings_ptr(4)
        self.reserved_len() + 20
    }

    /// Byte offset of `script_string_count` within the zone header.
    pub const fn script_string_count_offset(&self) -> usize {
        self.reserved_len() + 12
    }

    pub const fn mem_alloc_offset(&self) -> usize {
        4 + self.reserved_len()
    }

    /// Length of the reserved/external-size/block-size run between
    /// `zone_size` and `mem_alloc_1`, whose content is ignored on read and
    /// written as zero (see DESIGN.md, zone header layout).
    const fn reserved_len(&self) -> usize {
        self.zone_header_size as usize - 28
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_sizes_match_spec() {
        let cod4_ps3 = Variant::new(Game::CoD4, Platform::PS3, false)
            .info()
            .unwrap();
        assert_eq!(cod4_ps3.zone_header_size, 52);

        let mw2_xbox = Variant::new(Game::MW2, Platform::Xbox360, false)
            .info()
            .unwrap();
        assert_eq!(mw2_xbox.zone_header_size, 48);

        let mw2_ps3 = Variant::new(Game::MW2, Platform::PS3, false).info().unwrap();
        assert_eq!(mw2_ps3.zone_header_size, 48);

        let mw2_pc = Variant::new(Game::MW2, Platform::PC, false).info().unwrap();
        assert_eq!(mw2_pc.zone_header_size, 56);
    }

    #[test]
    fn mem_alloc_constants_identify_game() {
        let waw = Variant::new(Game::WaW, Platform::PS3, false)
            .info()
            .unwrap();
        assert_eq!((waw.mem_alloc_1, waw.mem_alloc_2), (0x10B0, 0x5F8F0));
    }

    #[test]
    fn wii_and_signed_mw2_are_unimplemented() {
        assert!(Variant::new(Game::CoD4, Platform::Wii, false).info().is_none());
        assert!(Variant::new(Game::MW2, Platform::PS3, true).info().is_none());
    }

    #[test]
    fn signed_requires_xbox360() {
        assert!(Variant::new(Game::CoD4, Platform::PS3, true).info().is_none());
        assert!(Variant::new(Game::CoD4, Platform::Xbox360, true)
            .info()
            .is_some());
    }
}
