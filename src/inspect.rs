//! Inspection-only parsers (§4.6): `ImageAsset` and `XAnim` offset
//! calculation. Neither produces a mutable record — these exist to let a
//! caller describe assets the mutator doesn't support editing.

const REJECTED_EXTENSIONS: &[&str] = &[
    ".cfg", ".gsc", ".csc", ".txt", ".csv", ".menu", ".vision", ".arena", ".str", ".def",
];

/// A best-effort description of an image asset read backwards from its
/// name offset via a fixed schedule of negative offsets.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ImageAsset {
    pub name_offset: usize,
    pub name: String,
    pub size: u32,
    pub width: u16,
    pub height: u16,
    pub depth: u16,
    pub category: u8,
    pub streaming: u8,
    pub texture_format: u8,
}

/// Negative byte offsets (from the name) of each fixed field, in read
/// order. Tightens as it's applied: each field is read before the next
/// offset is computed, so a short buffer aborts early rather than reading
/// garbage.
struct ImageFieldLayout {
    size: usize,
    width: usize,
    height: usize,
    depth: usize,
    category: usize,
    streaming: usize,
    texture_format: usize,
}

// Contiguous, back-to-front: size(4) width(2) height(2) depth(2) category(1)
// streaming(1) texture_format(1), ending right before the name bytes.
const IMAGE_FIELDS: ImageFieldLayout = ImageFieldLayout {
    size: 13,
    width: 9,
    height: 7,
    depth: 5,
    category: 3,
    streaming: 2,
    texture_format: 1,
};

fn is_plausible_image_name(name: &str) -> bool {
    if REJECTED_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
        return false;
    }
    let has_name_token = name
        .bytes()
        .any(|b| matches!(b, b'_' | b'/' | b'\\' | b'~' | b'$'))
        || name.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    if !has_name_token {
        return false;
    }
    !name.as_bytes().windows(5).any(|w| w.iter().all(|&b| b == w[0]))
}

/// Attempts to read an `ImageAsset` whose name sits at `name_offset` in
/// `zone`, preceded by the `0xFF` pointer pair and followed by printable
/// ASCII (§4.6). Returns `None` on any out-of-range offset or failed
/// validator — callers treat this as "not an image here" and move on.
pub fn parse_image_asset(zone: &[u8], name_offset: usize) -> Option<ImageAsset> {
    if name_offset < IMAGE_FIELDS.size {
        return None;
    }
    let name_end = zone[name_offset..].iter().position(|&b| b == 0)? + name_offset;
    let name = std::str::from_utf8(&zone[name_offset..name_end]).ok()?.to_owned();
    if !is_plausible_image_name(&name) {
        return None;
    }

    let at = |back: usize| name_offset.checked_sub(back);
    let size = u32::from_be_bytes(zone.get(at(IMAGE_FIELDS.size)?..at(IMAGE_FIELDS.size)? + 4)?.try_into().ok()?);
    let width = u16::from_be_bytes(zone.get(at(IMAGE_FIELDS.width)?..at(IMAGE_FIELDS.width)? + 2)?.try_into().ok()?);
    let height =
        u16::from_be_bytes(zone.get(at(IMAGE_FIELDS.height)?..at(IMAGE_FIELDS.height)? + 2)?.try_into().ok()?);
    let depth = u16::from_be_bytes(zone.get(at(IMAGE_FIELDS.depth)?..at(IMAGE_FIELDS.depth)? + 2)?.try_into().ok()?);
    let category = *zone.get(at(IMAGE_FIELDS.category)?)?;
    let streaming = *zone.get(at(IMAGE_FIELDS.streaming)?)?;
    let texture_format = *zone.get(at(IMAGE_FIELDS.texture_format)?)?;

    if !(1..=8192).contains(&width) || !(1..=8192).contains(&height) || !(1..=512).contains(&depth) {
        return None;
    }
    let max_size = 8u64 * width as u64 * height as u64;
    if size == 0 || size as u64 > max_size {
        return None;
    }

    Some(ImageAsset {
        name_offset,
        name,
        size,
        width,
        height,
        depth,
        category,
        streaming,
        texture_format,
    })
}

/// Byte offsets of each XAnim data array, each aligned to a 4-byte
/// boundary (§4.6).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct XAnimDataOffsets {
    pub data_byte: usize,
    pub data_short: usize,
    pub data_int: usize,
    pub indices: usize,
    pub notifies: usize,
    pub delta_part: usize,
    pub total_len: usize,
}

const fn align4(n: usize) -> usize {
    (n + 3) & !3
}

/// Computes the layout of an XAnim's variable-length data arrays given its
/// bone/frame/notify counts and each array's element count.
pub fn xanim_data_offsets(
    bone_count: usize,
    frame_count: usize,
    byte_count: usize,
    short_count: usize,
    int_count: usize,
    notify_count: usize,
) -> XAnimDataOffsets {
    let index_width = if frame_count <= 255 { 1 } else { 2 };

    let data_byte = 0;
    let data_short = align4(data_byte + byte_count);
    let data_int = align4(data_short + short_count * 2);
    let indices = align4(data_int + int_count * 4);
    let notifies = align4(indices + bone_count * index_width);
    let delta_part = align4(notifies + notify_count * 12);
    let total_len = align4(delta_part);

    XAnimDataOffsets {
        data_byte,
        data_short,
        data_int,
        indices,
        notifies,
        delta_part,
        total_len,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xanim_offsets_align_to_four_bytes() {
        let offsets = xanim_data_offsets(12, 30, 5, 3, 2, 1);
        assert_eq!(offsets.data_byte, 0);
        assert_eq!(offsets.data_short % 4, 0);
        assert_eq!(offsets.data_int % 4, 0);
        assert_eq!(offsets.indices % 4, 0);
        assert_eq!(offsets.notifies % 4, 0);
    }

    #[test]
    fn xanim_index_width_switches_above_255_frames() {
        let small = xanim_data_offsets(10, 200, 0, 0, 0, 0);
        let large = xanim_data_offsets(10, 300, 0, 0, 0, 0);
        assert!(large.notifies - large.indices >= small.notifies - small.indices);
    }

    #[test]
    fn image_name_rejects_script_extensions() {
        assert!(!is_plausible_image_name("weapon.gsc"));
        assert!(is_plausible_image_name("weapon_diffuse"));
    }

    #[test]
    fn image_name_rejects_long_identical_runs() {
        assert!(!is_plausible_image_name("aaaaa_tex"));
    }

    #[test]
    fn image_asset_parses_from_fixed_schedule() {
        let name = b"a_tex\0";
        let name_offset = 20;
        let mut zone = vec![0u8; name_offset + name.len()];
        zone[name_offset..name_offset + name.len()].copy_from_slice(name);

        zone[name_offset - 13..name_offset - 9].copy_from_slice(&100u32.to_be_bytes());
        zone[name_offset - 9..name_offset - 7].copy_from_slice(&16u16.to_be_bytes());
        zone[name_offset - 7..name_offset - 5].copy_from_slice(&16u16.to_be_bytes());
        zone[name_offset - 5..name_offset - 3].copy_from_slice(&1u16.to_be_bytes());

        let image = parse_image_asset(&zone, name_offset).unwrap();
        assert_eq!(image.name, "a_tex");
        assert_eq!(image.width, 16);
        assert_eq!(image.height, 16);
    }
}
