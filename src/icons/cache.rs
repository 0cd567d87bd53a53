//! Two-tier icon cache: an in-memory map keyed by bundle identity and size,
//! backed by one PNG per bundle on disk.

use image::codecs::png::PngEncoder;
use image::RgbaImage;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use super::icns;
use super::{
    decode_image_file, placeholder_icon, scale_to_square, snap_decode_size, IconHandle,
    IconPipeline, IconSource,
};
use crate::bundle::{self, BundleInfo};
use crate::error::{LaunchpadError, Result};
use crate::logs;
use crate::resolver;

pub struct IconCache {
    dir: PathBuf,
    memory: HashMap<String, IconHandle>,
    pipeline: IconPipeline,
    decode_floor: u32,
}

impl IconCache {
    /// Open (creating if needed) the cache directory.
    pub fn init(dir: impl Into<PathBuf>, pipeline: IconPipeline) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            memory: HashMap::new(),
            pipeline,
            decode_floor: 0,
        })
    }

    /// Custom container icons are decoded at no less than this size before scaling.
    pub fn with_decode_floor(mut self, floor: u32) -> Self {
        self.decode_floor = floor;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn cache_file(&self, bundle: &Path) -> PathBuf {
        self.dir
            .join(format!("{}.png", resolver::bundle_stem(bundle)))
    }

    fn memory_key(bundle: &Path, size: u32) -> String {
        format!("{}|{}", resolver::canonical_identity(bundle), size)
    }

    /// Memory, then a fresh disk copy, then the resolution pipeline.
    pub fn get_or_resolve(&mut self, bundle: &Path, size: u32) -> IconHandle {
        let key = Self::memory_key(bundle, size);
        if let Some(hit) = self.memory.get(&key) {
            return Arc::clone(hit);
        }

        let png = self.cache_file(bundle);

        let Some(info) = BundleInfo::load(bundle) else {
            // Without metadata only a manually placed file can help; no freshness check.
            return match read_sized(&png, size) {
                Some(image) => self.remember(key, image),
                None => Arc::new(placeholder_icon(&resolver::bundle_stem(bundle), size)),
            };
        };

        if is_fresh(bundle, &png)
            && let Some(image) = read_sized(&png, size)
        {
            return self.remember(key, image);
        }

        let resolved = self.pipeline.resolve(&info, size);
        if resolved.source != IconSource::Placeholder
            && let Err(e) = write_png_atomic(&self.dir, &png, &resolved.image)
        {
            logs::log_warn(&format!("Could not cache icon {}: {}", png.display(), e));
        }

        self.remember(key, resolved.image)
    }

    /// Decode a user-chosen image, store it as the bundle's icon and return it
    /// along with the file it now lives in.
    pub fn assign_custom_icon(
        &mut self,
        bundle: &Path,
        source: &Path,
        size: u32,
    ) -> Result<(IconHandle, PathBuf)> {
        let image = if icns::is_icns_path(source) {
            let decode_size = snap_decode_size(size.max(self.decode_floor));
            icns::load_best_image(source, decode_size, self.pipeline.renderer())?
        } else {
            decode_image_file(source).ok_or_else(|| {
                LaunchpadError::decode(source, "Unsupported or unreadable image format.")
            })?
        };

        let scaled = scale_to_square(&image, size);
        let png = self.cache_file(bundle);
        write_png_atomic(&self.dir, &png, &scaled)?;

        logs::log_info(&format!(
            "Custom icon for {} saved to {}",
            bundle.display(),
            png.display()
        ));

        let handle = self.remember(Self::memory_key(bundle, size), scaled);
        Ok((handle, png))
    }

    /// Seed the memory tier from a previously saved override file.
    pub fn load_override(&mut self, bundle: &Path, file: &Path, size: u32) -> Option<IconHandle> {
        let image = read_sized(file, size)?;
        Some(self.remember(Self::memory_key(bundle, size), image))
    }

    /// Forget every size of `bundle` and delete its disk copy.
    pub fn evict(&mut self, bundle: &Path) {
        let prefix = format!("{}|", resolver::canonical_identity(bundle));
        self.memory.retain(|key, _| !key.starts_with(&prefix));

        let png = self.cache_file(bundle);
        if let Err(e) = fs::remove_file(&png)
            && e.kind() != io::ErrorKind::NotFound
        {
            logs::log_warn(&format!("Could not remove {}: {}", png.display(), e));
        }
    }

    /// Drop both tiers. Returns the number of files removed.
    pub fn clear(&mut self) -> Result<usize> {
        self.memory.clear();

        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)?.flatten() {
            let path = entry.path();
            if path.is_file() {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn remember(&mut self, key: String, image: RgbaImage) -> IconHandle {
        let handle = Arc::new(image);
        self.memory.insert(key, Arc::clone(&handle));
        handle
    }
}

/// The disk copy is stale once anything it was derived from is newer.
pub fn is_fresh(bundle: &Path, png: &Path) -> bool {
    let Some(cached) = modified(png) else {
        return false;
    };

    [
        bundle::info_plist_path(bundle),
        bundle::assets_car_path(bundle),
        bundle::resources_dir(bundle),
    ]
    .iter()
    .filter_map(|source| modified(source))
    .all(|source| source <= cached)
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok()?.modified().ok()
}

fn read_sized(path: &Path, size: u32) -> Option<RgbaImage> {
    decode_image_file(path).map(|image| scale_to_square(&image, size))
}

/// Encode to a temp file in `dir` and rename over `dest`.
fn write_png_atomic(dir: &Path, dest: &Path, image: &RgbaImage) -> Result<()> {
    fs::create_dir_all(dir)?;

    let mut png_data = Vec::new();
    image.write_with_encoder(PngEncoder::new(&mut png_data))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".icon-")
        .suffix(".png")
        .tempfile_in(dir)?;
    tmp.write_all(&png_data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}
