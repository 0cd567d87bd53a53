//! Fixtures shared by the unit tests: fake bundles, images and icon files.

use image::{Rgba, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};

/// Plist body for an application bundle, with extra `<key>..` entries appended.
pub fn app_plist(extra: &str) -> String {
    format!(
        "<key>CFBundlePackageType</key><string>APPL</string>{}",
        extra
    )
}

/// Create `<root>/<name>/Contents/{Info.plist,Resources}`.
pub fn write_bundle(root: &Path, name: &str, plist_body: &str) -> PathBuf {
    let bundle = root.join(name);
    fs::create_dir_all(bundle.join("Contents/Resources")).unwrap();
    fs::write(
        bundle.join("Contents/Info.plist"),
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <plist version=\"1.0\">\n<dict>\n{}\n</dict>\n</plist>\n",
            plist_body
        ),
    )
    .unwrap();
    bundle
}

pub fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(color))
}

pub fn png_bytes(image: &RgbaImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

pub fn write_png(path: &Path, width: u32, height: u32, color: [u8; 4]) {
    fs::write(path, png_bytes(&solid(width, height, color))).unwrap();
}

/// Hand-assembled icon container whose blocks are PNG payloads.
pub fn icns_bytes(blocks: &[(&[u8; 4], Vec<u8>)]) -> Vec<u8> {
    let body_len: usize = blocks.iter().map(|(_, data)| data.len() + 8).sum();
    let mut out = Vec::with_capacity(body_len + 8);
    out.extend_from_slice(b"icns");
    out.extend_from_slice(&((body_len + 8) as u32).to_be_bytes());
    for (kind, data) in blocks {
        out.extend_from_slice(*kind);
        out.extend_from_slice(&((data.len() + 8) as u32).to_be_bytes());
        out.extend_from_slice(data);
    }
    out
}
