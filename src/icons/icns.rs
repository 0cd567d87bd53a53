//! Decoding of Apple icon containers.
//!
//! The `icns` crate handles the well-formed cases. Files it rejects are walked
//! block by block and any payload `image` can sniff is kept. The thumbnail
//! helper is the last resort.

use icns::IconFamily;
use image::RgbaImage;
use rs_apply::Apply;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use super::pick_best_by_size;
use super::thumbnail::ThumbnailRenderer;
use crate::error::{LaunchpadError, Result};

const MAGIC: &[u8; 4] = b"icns";
const HEADER_LEN: usize = 8;

pub fn is_icns_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("icns"))
        .unwrap_or(false)
}

/// Decode every representation in `path` and keep the one closest to `target`.
pub fn load_best_image(
    path: &Path,
    target: u32,
    renderer: Option<&ThumbnailRenderer>,
) -> Result<RgbaImage> {
    let bytes = fs::read(path).map_err(|e| LaunchpadError::decode(path, e.to_string()))?;

    let images = match decode_family(&bytes) {
        images if images.is_empty() => decode_blocks(&bytes),
        images => images,
    };

    if let Some(best) = pick_best_by_size(images, target) {
        return Ok(best);
    }

    if let Some(image) = renderer.and_then(|r| r.render(path, target).ok()) {
        return Ok(image);
    }

    Err(LaunchpadError::decode(path, "No readable image in ICNS file."))
}

fn decode_family(bytes: &[u8]) -> Vec<RgbaImage> {
    let Ok(family) = Cursor::new(bytes).apply(IconFamily::read) else {
        return Vec::new();
    };

    family
        .available_icons()
        .into_iter()
        .filter_map(|icon_type| family.get_icon_with_type(icon_type).ok())
        .filter_map(|image| {
            let mut png_data = Vec::new();
            image.write_png(&mut png_data).ok()?;
            image::load_from_memory(&png_data).ok()
        })
        .map(|image| image.to_rgba8())
        .collect()
}

/// Decode each block payload independently, skipping the ones that fail.
pub fn decode_blocks(bytes: &[u8]) -> Vec<RgbaImage> {
    block_payloads(bytes)
        .into_iter()
        .filter_map(|data| image::load_from_memory(data).ok())
        .map(|image| image.to_rgba8())
        .collect()
}

/// Split a container into block payloads: 4-byte type, 4-byte big-endian
/// length (header included), payload. Stops at the first malformed block.
pub fn block_payloads(bytes: &[u8]) -> Vec<&[u8]> {
    if bytes.len() < HEADER_LEN || &bytes[..4] != MAGIC {
        return Vec::new();
    }

    let limit = (be_u32(&bytes[4..8]) as usize).min(bytes.len());
    let mut payloads = Vec::new();
    let mut offset = HEADER_LEN;

    while offset + HEADER_LEN <= limit {
        let len = be_u32(&bytes[offset + 4..offset + 8]) as usize;
        if len < HEADER_LEN || offset + len > bytes.len() {
            break;
        }
        payloads.push(&bytes[offset + HEADER_LEN..offset + len]);
        offset += len;
    }

    payloads
}

fn be_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
