//! Binary codec and zone-editing engine for Call of Duty FastFile (`.ff`)
//! archives (CoD4, World at War, Modern Warfare 2; PS3, Xbox 360, PC).
//!
//! Control flow on read: [`framer`] produces a decompressed zone blob,
//! [`header`] reads its fixed prelude, [`pool`] walks the asset pool, and
//! [`payload`] parses each `rawfile`/`localize` record. Control flow on
//! write: either [`mutate`] patches a parsed zone in place, or [`synth`]
//! re-synthesizes one from scratch; [`framer`] then re-frames and
//! [`compress`] re-compresses it.

#![allow(non_camel_case_types)]

extern crate alloc;

pub mod codeformat;
pub mod compress;
pub mod framer;
pub mod header;
pub mod inspect;
pub mod mutate;
pub mod payload;
pub mod pool;
pub mod synth;

pub use codff_defs::{
    Error, ErrorKind, Game, InlineMarker, LocalizedEntry, Platform, RawFileEntry,
    RawFileHeaderSize, Result, Variant, VariantInfo,
};
pub use payload::{export_raw, export_raw_with_header};

use std::io::{Seek, SeekFrom};

pub(crate) use codff_defs::file_line_col;

/// [`Seek::stream_len`] isn't stable yet, so we implement it manually here,
/// same as the teacher.
pub(crate) trait StreamLen: Seek {
    fn stream_len_(&mut self) -> std::io::Result<u64> {
        let pos = self.stream_position()?;
        let len = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(pos))?;
        Ok(len)
    }
}

impl<T: Seek> StreamLen for T {}

/// A fully parsed zone: the asset pool range plus every supported record
/// found within it. Returned by [`parse_zone`]; consumed by [`mutate`] and
/// [`synth::synthesize`] (§6.3).
#[derive(Clone, Debug, Default)]
pub struct ZoneIndex {
    pub pool_start: usize,
    pub pool_end: usize,
    pub payload_end: usize,
    pub raw_files: Vec<RawFileEntry>,
    pub localized: Vec<LocalizedEntry>,
    /// Pool records whose type isn't `rawfile`/`localize`; tracked so
    /// [`synth::synthesize`] can report [`ErrorKind::UnsupportedAssetAtRebuild`]
    /// rather than silently dropping them.
    pub other_asset_types: Vec<u32>,
}

impl ZoneIndex {
    pub fn has_unsupported_assets(&self) -> bool {
        !self.other_asset_types.is_empty()
    }
}

/// Parses a decompressed zone into its pool and payload records (§6.3).
/// `pool_start` is the tag section's end; pass `None` to assume the pool
/// begins immediately after the header (no tag section).
///
/// Payload parsing is a contiguous scan: once a pool record of an
/// unsupported asset type is reached, its on-disk size can't be derived
/// (only `rawfile`/`localize` layouts are known here), so the walk stops
/// there and every remaining record is reported via
/// [`ZoneIndex::other_asset_types`] without an offset.
pub fn parse_zone(zone: &[u8], variant: Variant, pool_start: Option<usize>) -> Result<ZoneIndex> {
    let info = variant.info().ok_or_else(|| {
        Error::new(
            file_line_col!(),
            ErrorKind::DecodeFailure(format!("unimplemented variant {variant:?}")),
        )
    })?;

    let header = header::ZoneHeader::read(zone, &info)?;
    if !header.confirms_game(&info) {
        log::warn!("zone header mem-alloc constants don't match the detected variant's game");
    }

    let pool_start = pool_start.unwrap_or(info.zone_header_size as usize);
    let walk = pool::walk(zone, pool_start, &info);

    let mut raw_files = Vec::new();
    let mut localized = Vec::new();
    let mut other_asset_types = Vec::new();
    let mut cursor = walk.pool_end;
    let mut first_rawfile = true;
    let mut stopped_early = false;

    for record in &walk.records {
        if stopped_early {
            other_asset_types.push(record.type_id);
            continue;
        }

        if record.type_id == info.rawfile_type_id {
            let parsed = if variant.game == Game::MW2 {
                payload::parse_rawfile_mw2_compressed(zone, cursor, first_rawfile)
                    .or_else(|| payload::parse_rawfile_standard(zone, cursor))
            } else {
                payload::parse_rawfile_standard(zone, cursor)
            };
            first_rawfile = false;
            match parsed {
                Some(entry) => {
                    cursor = entry.record_end();
                    raw_files.push(entry);
                }
                None => {
                    log::warn!("failed to parse rawfile record at offset {cursor:#x}, stopping payload walk");
                    other_asset_types.push(record.type_id);
                    stopped_early = true;
                }
            }
        } else if record.type_id == info.localize_type_id {
            match payload::parse_localize(zone, cursor) {
                Some(entry) => {
                    cursor = entry.record_end;
                    localized.push(entry);
                }
                None => {
                    log::warn!("failed to parse localize record at offset {cursor:#x}, stopping payload walk");
                    other_asset_types.push(record.type_id);
                    stopped_early = true;
                }
            }
        } else {
            other_asset_types.push(record.type_id);
            stopped_early = true;
        }
    }

    Ok(ZoneIndex {
        pool_start: walk.pool_start,
        pool_end: walk.pool_end,
        payload_end: cursor,
        raw_files,
        localized,
        other_asset_types,
    })
}
