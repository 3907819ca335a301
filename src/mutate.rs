//! In-place zone mutator (C7 §4.7): content replace, rename, slot resize,
//! and cross-entry space transfer, each maintaining the header and every
//! other entry's recorded offsets.

use codff_defs::variant::VariantInfo;
use codff_defs::{file_line_col, Error, ErrorKind, RawFileEntry, Result};

use crate::compress::{self, CompressionLevel};
use crate::header::ZoneHeader;

/// An edit operation against a parsed zone (§6.3).
pub enum Op<'a> {
    ReplaceContent { entry: usize, content: &'a [u8] },
    Rename { entry: usize, new_name: &'a str },
    /// Grows a slot beyond its current allocation. The in-place mutator
    /// can't satisfy this (§4.7 says to prefer C8); surfaced so callers
    /// know to re-synthesize instead.
    ResizeSlot { entry: usize, new_allocated_size: u32 },
    TransferSpace { donor: usize, recipient: usize, bytes: u32 },
}

/// Dispatches one [`Op`] against a parsed zone, the entry point named in
/// §6.3 (`mutate(zone_bytes_mut, ZoneIndex, Op) -> Result`). Here the
/// zone index is represented as the caller's `entries` slice rather than
/// the full `ZoneIndex` so this module has no dependency on `pool`/`lib`.
pub fn mutate(zone: &mut Vec<u8>, entries: &mut Vec<RawFileEntry>, info: &VariantInfo, op: Op) -> Result<()> {
    match op {
        Op::ReplaceContent { entry, content } => {
            let is_compressed = entry_mut(entries, entry)?.is_compressed;
            let target = entry_mut(entries, entry)?;
            if is_compressed {
                replace_compressed_content(zone, target, content)
            } else {
                replace_content(zone, target, content)
            }
        }
        Op::Rename { entry, new_name } => rename(zone, entries, info, entry, new_name),
        Op::ResizeSlot {
            entry,
            new_allocated_size,
        } => {
            let current = entry_mut(entries, entry)?.allocated_size;
            Err(Error::new(
                file_line_col!(),
                ErrorKind::ContentTooLarge {
                    requested: new_allocated_size as usize,
                    available: current as usize,
                },
            ))
        }
        Op::TransferSpace {
            donor,
            recipient,
            bytes,
        } => transfer_space(zone, entries, donor, recipient, bytes),
    }
}

fn entry_mut<'a>(entries: &'a mut [RawFileEntry], index: usize) -> Result<&'a mut RawFileEntry> {
    entries.get_mut(index).ok_or_else(|| {
        Error::new(
            file_line_col!(),
            ErrorKind::InvariantViolation(format!("no rawfile entry at index {index}")),
        )
    })
}

fn adjust_zone_size(zone: &mut Vec<u8>, info: &VariantInfo, delta: i64) -> Result<()> {
    let mut header = ZoneHeader::read(zone, info)?;
    header.zone_size = (header.zone_size as i64 + delta) as u32;
    header.write(zone, info)
}

/// Overwrites a non-compressed entry's content, zero-padding to its
/// existing `allocated_size`. Fails if the new content doesn't fit.
pub fn replace_content(zone: &mut [u8], entry: &mut RawFileEntry, content: &[u8]) -> Result<()> {
    if entry.is_compressed {
        return Err(Error::new(
            file_line_col!(),
            ErrorKind::InvariantViolation("use replace_compressed_content for a compressed entry".into()),
        ));
    }
    if content.len() as u32 > entry.allocated_size {
        return Err(Error::new(
            file_line_col!(),
            ErrorKind::ContentTooLarge {
                requested: content.len(),
                available: entry.allocated_size as usize,
            },
        ));
    }

    let slot = &mut zone[entry.data_offset..entry.data_offset + entry.allocated_size as usize];
    slot.fill(0);
    slot[..content.len()].copy_from_slice(content);
    entry.content_size = content.len() as u32;
    Ok(())
}

/// Re-compresses `content` and writes it into a compressed entry's slot,
/// updating the on-disk length fields (§4.7). Fails if the re-compressed
/// length exceeds the existing compressed slot.
pub fn replace_compressed_content(zone: &mut [u8], entry: &mut RawFileEntry, content: &[u8]) -> Result<()> {
    if !entry.is_compressed {
        return Err(Error::new(
            file_line_col!(),
            ErrorKind::InvariantViolation("entry is not compressed".into()),
        ));
    }
    let recompressed = compress::encode_block(
        content,
        codff_defs::variant::Encoding::ZlibDeflate,
        CompressionLevel::Optimal,
    );
    if recompressed.len() as u32 > entry.compressed_size {
        return Err(Error::new(
            file_line_col!(),
            ErrorKind::ContentTooLarge {
                requested: recompressed.len(),
                available: entry.compressed_size as usize,
            },
        ));
    }

    let slot = &mut zone[entry.data_offset..entry.data_offset + entry.compressed_size as usize];
    slot.fill(0);
    slot[..recompressed.len()].copy_from_slice(&recompressed);

    let comp_len_offset = entry.header_offset + if entry.has_leading_pointer_slot { 4 } else { 0 } + 4;
    zone[comp_len_offset..comp_len_offset + 4].copy_from_slice(&(recompressed.len() as u32).to_be_bytes());
    zone[comp_len_offset + 4..comp_len_offset + 8].copy_from_slice(&(content.len() as u32).to_be_bytes());

    entry.allocated_size = recompressed.len() as u32;
    entry.compressed_size = recompressed.len() as u32;
    entry.content_size = content.len() as u32;
    Ok(())
}

/// Renames an entry in place, shifting every byte after the old name (and
/// every later entry's recorded offset) by the length delta (§4.7).
pub fn rename(
    zone: &mut Vec<u8>,
    entries: &mut [RawFileEntry],
    info: &VariantInfo,
    index: usize,
    new_name: &str,
) -> Result<()> {
    let old_name_end;
    let name_offset;
    let delta: i64;
    {
        let entry = entry_mut(entries, index)?;
        if entry.name == new_name {
            return Ok(());
        }
        old_name_end = entry.name_end();
        name_offset = entry.name_offset;
        delta = new_name.len() as i64 - entry.name.len() as i64;
    }

    if delta == 0 {
        zone[name_offset..name_offset + new_name.len()].copy_from_slice(new_name.as_bytes());
        entries[index].name = new_name.to_owned();
        return Ok(());
    }

    let mut new_zone = Vec::with_capacity((zone.len() as i64 + delta) as usize);
    new_zone.extend_from_slice(&zone[..name_offset]);
    new_zone.extend_from_slice(new_name.as_bytes());
    new_zone.push(0);
    new_zone.extend_from_slice(&zone[old_name_end..]);
    *zone = new_zone;

    for (i, entry) in entries.iter_mut().enumerate() {
        if i == index {
            entry.name = new_name.to_owned();
            entry.data_offset = (entry.data_offset as i64 + delta) as usize;
        } else if entry.header_offset >= old_name_end {
            entry.header_offset = (entry.header_offset as i64 + delta) as usize;
            entry.name_offset = (entry.name_offset as i64 + delta) as usize;
            entry.data_offset = (entry.data_offset as i64 + delta) as usize;
        }
    }

    adjust_zone_size(zone, info, delta)
}

/// Moves `bytes` of allocation from `donor` to `recipient`, preserving
/// total zone length (§4.7, §8 "space-transfer conservation").
pub fn transfer_space(zone: &mut [u8], entries: &mut [RawFileEntry], donor: usize, recipient: usize, bytes: u32) -> Result<()> {
    if donor == recipient {
        return Err(Error::new(
            file_line_col!(),
            ErrorKind::InvariantViolation("donor and recipient must differ".into()),
        ));
    }
    let (donor_offset, donor_alloc, donor_content) = {
        let d = entry_mut(entries, donor)?;
        if d.is_compressed {
            return Err(Error::new(
                file_line_col!(),
                ErrorKind::InvariantViolation("transfer_space requires non-compressed entries".into()),
            ));
        }
        let free = d.allocated_size.saturating_sub(d.content_size);
        if bytes > free {
            return Err(Error::new(
                file_line_col!(),
                ErrorKind::ContentTooLarge {
                    requested: bytes as usize,
                    available: free as usize,
                },
            ));
        }
        (d.data_offset, d.allocated_size, d.content_size)
    };
    let (recipient_offset, recipient_is_compressed) = {
        let r = entry_mut(entries, recipient)?;
        (r.data_offset, r.is_compressed)
    };
    if recipient_is_compressed {
        return Err(Error::new(
            file_line_col!(),
            ErrorKind::InvariantViolation("transfer_space requires non-compressed entries".into()),
        ));
    }

    if donor_offset < recipient_offset {
        shrink_donor_grow_recipient_forward(zone, entries, donor, recipient, bytes, donor_alloc, donor_content)?;
    } else {
        shrink_donor_grow_recipient_backward(zone, entries, donor, recipient, bytes, donor_alloc, donor_content)?;
    }
    Ok(())
}

fn write_size_field(zone: &mut [u8], entry: &RawFileEntry, size: u32) {
    let size_offset = entry.header_offset + 4;
    zone[size_offset..size_offset + 4].copy_from_slice(&size.to_be_bytes());
}

fn shrink_donor_grow_recipient_forward(
    zone: &mut [u8],
    entries: &mut [RawFileEntry],
    donor: usize,
    recipient: usize,
    bytes: u32,
    donor_alloc: u32,
    donor_content: u32,
) -> Result<()> {
    let donor_old_end = entries[donor].record_end();
    let recipient_header_start = entries[recipient].header_offset;
    let shift = bytes as usize;

    zone.copy_within(donor_old_end..recipient_header_start, donor_old_end - shift);
    let recipient_new_header_start = recipient_header_start - shift;
    let recipient_new_data_offset = entries[recipient].data_offset - shift;

    entries[donor].allocated_size = donor_alloc - bytes;
    write_size_field(zone, &entries[donor], donor_content);

    let recipient_new_alloc = entries[recipient].allocated_size + bytes;
    entries[recipient].header_offset = recipient_new_header_start;
    entries[recipient].name_offset -= shift;
    entries[recipient].data_offset = recipient_new_data_offset;
    entries[recipient].allocated_size = recipient_new_alloc;
    write_size_field(zone, &entries[recipient], recipient_new_alloc);

    let tail_start = recipient_new_data_offset + entries[recipient].content_size as usize;
    let tail_end = tail_start + bytes as usize;
    zone[tail_start..tail_end].fill(0);

    for entry in entries.iter_mut() {
        if entry.header_offset > donor_old_end && entry.header_offset < recipient_header_start {
            entry.header_offset -= shift;
            entry.name_offset -= shift;
            entry.data_offset -= shift;
        }
    }
    Ok(())
}

fn shrink_donor_grow_recipient_backward(
    zone: &mut [u8],
    entries: &mut [RawFileEntry],
    donor: usize,
    recipient: usize,
    bytes: u32,
    donor_alloc: u32,
    donor_content: u32,
) -> Result<()> {
    let recipient_old_end = entries[recipient].record_end();
    let donor_header_start = entries[donor].header_offset;
    let shift = bytes as usize;

    zone.copy_within(recipient_old_end..donor_header_start, recipient_old_end + shift);
    let recipient_new_alloc = entries[recipient].allocated_size + bytes;
    entries[recipient].allocated_size = recipient_new_alloc;
    write_size_field(zone, &entries[recipient], recipient_new_alloc);
    let tail_start = entries[recipient].data_offset + entries[recipient].content_size as usize;
    zone[tail_start..tail_start + bytes as usize].fill(0);

    let donor_new_header_start = donor_header_start + shift;
    entries[donor].header_offset = donor_new_header_start;
    entries[donor].name_offset += shift;
    entries[donor].data_offset += shift;
    entries[donor].allocated_size = donor_alloc - bytes;
    write_size_field(zone, &entries[donor], donor_content);

    for entry in entries.iter_mut() {
        if entry.header_offset > recipient_old_end && entry.header_offset < donor_header_start {
            entry.header_offset += shift;
            entry.name_offset += shift;
            entry.data_offset += shift;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use codff_defs::{Game, Platform, Variant};

    fn cod4_info() -> VariantInfo {
        Variant::new(Game::CoD4, Platform::PS3, false).info().unwrap()
    }

    fn standard_entry(header_offset: usize, name: &str, allocated_size: u32, content_size: u32) -> (Vec<u8>, RawFileEntry) {
        let mut bytes = vec![0xFFu8, 0xFF, 0xFF, 0xFF];
        bytes.extend_from_slice(&allocated_size.to_be_bytes());
        bytes.extend_from_slice(&[0xFF; 4]);
        let name_offset = header_offset + 12;
        bytes.extend_from_slice(name.as_bytes());
        bytes.push(0);
        let data_offset = name_offset + name.len() + 1;
        bytes.extend(std::iter::repeat(0u8).take(allocated_size as usize));

        let entry = RawFileEntry {
            header_offset,
            header_size: codff_defs::RawFileHeaderSize::Standard,
            name: name.to_owned(),
            name_offset,
            data_offset,
            allocated_size,
            content_size,
            is_compressed: false,
            compressed_size: allocated_size,
            has_leading_pointer_slot: false,
        };
        (bytes, entry)
    }

    #[test]
    fn replace_content_zero_pads_slot() {
        let (mut zone, mut entry) = standard_entry(0, "a.gsc", 10, 10);
        replace_content(&mut zone, &mut entry, b"hi\n").unwrap();
        assert_eq!(&zone[entry.data_offset..entry.data_offset + 10], b"hi\n\0\0\0\0\0\0\0");
        assert_eq!(entry.content_size, 3);
    }

    #[test]
    fn replace_content_rejects_oversize() {
        let (mut zone, mut entry) = standard_entry(0, "a.gsc", 4, 4);
        let err = replace_content(&mut zone, &mut entry, b"too big").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ContentTooLarge { .. }));
    }

    #[test]
    fn rename_same_length_overwrites_in_place() {
        let (mut zone, entry) = standard_entry(0, "a.gsc", 4, 4);
        let info = cod4_info();
        let mut entries = vec![entry];
        rename(&mut zone, &mut entries, &info, 0, "b.gsc").unwrap();
        assert_eq!(entries[0].name, "b.gsc");
        assert_eq!(zone.len(), zone.len());
    }

    #[test]
    fn rename_to_same_name_is_noop() {
        let (mut zone, entry) = standard_entry(0, "a.gsc", 4, 4);
        let info = cod4_info();
        let mut entries = vec![entry.clone()];
        let before = zone.clone();
        rename(&mut zone, &mut entries, &info, 0, "a.gsc").unwrap();
        assert_eq!(zone, before);
        assert_eq!(entries[0], entry);
    }

    #[test]
    fn transfer_space_conserves_total_length() {
        let (mut zone_a, entry_a) = standard_entry(0, "donor.gsc", 50, 20);
        let donor_end = entry_a.record_end();
        let (zone_b, mut entry_b) = standard_entry(donor_end, "recipient.gsc", 30, 30);
        zone_a.extend_from_slice(&zone_b);
        entry_b.header_offset = donor_end;
        entry_b.name_offset = donor_end + 12;
        entry_b.data_offset = donor_end + 12 + "recipient.gsc".len() + 1;

        let total_before = zone_a.len();
        let mut entries = vec![entry_a, entry_b];
        transfer_space(&mut zone_a, &mut entries, 0, 1, 30).unwrap();

        assert_eq!(zone_a.len(), total_before);
        assert_eq!(entries[0].allocated_size, 20);
        assert_eq!(entries[1].allocated_size, 60);
    }
}
