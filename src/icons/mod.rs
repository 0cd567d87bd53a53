//! Icon resolution: an ordered cascade of strategies that turn a bundle into a
//! square bitmap, plus the sizing helpers they share.

pub mod cache;
pub mod icns;
pub mod thumbnail;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::bundle::{self, BundleInfo};
use crate::logs;
use crate::resolver;
use thumbnail::ThumbnailRenderer;

/// Shared bitmap handle handed to entries and kept by the cache.
pub type IconHandle = Arc<RgbaImage>;

/// Sizes the icon container stores natively.
pub const DECODE_SIZES: [u32; 7] = [16, 32, 64, 128, 256, 512, 1024];

/// Round up to the nearest native container size, capped at the largest.
pub fn snap_decode_size(want: u32) -> u32 {
    DECODE_SIZES
        .iter()
        .copied()
        .find(|&size| size >= want)
        .unwrap_or(DECODE_SIZES[DECODE_SIZES.len() - 1])
}

/// Smallest image at least `target` on its long side, else the largest one below it.
pub fn pick_best_by_size(images: Vec<RgbaImage>, target: u32) -> Option<RgbaImage> {
    let side = |image: &RgbaImage| image.width().max(image.height());

    let mut at_least: Option<RgbaImage> = None;
    let mut below: Option<RgbaImage> = None;

    for image in images {
        let s = side(&image);
        if s >= target {
            if at_least.as_ref().is_none_or(|best| s < side(best)) {
                at_least = Some(image);
            }
        } else if below.as_ref().is_none_or(|best| s > side(best)) {
            below = Some(image);
        }
    }

    at_least.or(below)
}

/// Fit `image` into a transparent `side`x`side` canvas, centred, aspect preserved.
pub fn scale_to_square(image: &RgbaImage, side: u32) -> RgbaImage {
    let (width, height) = image.dimensions();
    if side == 0 || width == 0 || height == 0 {
        return RgbaImage::new(side, side);
    }
    if width == side && height == side {
        return image.clone();
    }

    let scale = f32::min(side as f32 / width as f32, side as f32 / height as f32);
    let new_width = ((width as f32 * scale).round() as u32).clamp(1, side);
    let new_height = ((height as f32 * scale).round() as u32).clamp(1, side);

    let resized = imageops::resize(image, new_width, new_height, FilterType::CatmullRom);
    let mut canvas = RgbaImage::new(side, side);
    imageops::overlay(
        &mut canvas,
        &resized,
        ((side - new_width) / 2) as i64,
        ((side - new_height) / 2) as i64,
    );
    canvas
}

/// Decode any raster file `image` understands, sniffing the format from content.
pub fn decode_image_file(path: &Path) -> Option<RgbaImage> {
    let bytes = fs::read(path).ok()?;
    image::load_from_memory(&bytes)
        .ok()
        .map(|image| image.to_rgba8())
}

/// Deterministic pixelated stand-in for bundles with no usable icon.
pub fn placeholder_icon(name: &str, size: u32) -> RgbaImage {
    let base_seed = name.chars().map(|c| c as u64).sum::<u64>();
    let block = (size / 8).max(1);

    RgbaImage::from_fn(size, size, |x, y| {
        let block_seed = (x / block) * 8 + (y / block);
        let mut block_rng = ChaCha8Rng::seed_from_u64(base_seed + block_seed as u64);

        let intensity = if block_rng.r#gen::<f32>() > 0.5 {
            200u8
        } else {
            50u8
        };
        Rgba([intensity, intensity, intensity, 255])
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconSource {
    IcnsFile,
    VariantImages,
    AssetCatalog,
    GenericIcon,
    Placeholder,
}

#[derive(Debug, Clone)]
pub struct ResolvedIcon {
    pub image: RgbaImage,
    pub source: IconSource,
}

/// One step of the cascade. Returning `None` hands over to the next strategy.
pub trait IconStrategy {
    fn source(&self) -> IconSource;
    fn resolve(&self, info: &BundleInfo, size: u32) -> Option<RgbaImage>;
}

pub struct IconPipeline {
    strategies: Vec<Box<dyn IconStrategy>>,
    renderer: Option<ThumbnailRenderer>,
}

impl IconPipeline {
    pub fn new(strategies: Vec<Box<dyn IconStrategy>>) -> Self {
        Self {
            strategies,
            renderer: None,
        }
    }

    /// `.icns` → declared variant images → asset catalog → generic icon.
    pub fn standard(renderer: ThumbnailRenderer, generic_icon: Option<PathBuf>) -> Self {
        Self {
            strategies: vec![
                Box::new(IcnsFileStrategy {
                    renderer: renderer.clone(),
                }),
                Box::new(VariantImagesStrategy),
                Box::new(AssetCatalogStrategy {
                    renderer: renderer.clone(),
                }),
                Box::new(GenericIconStrategy {
                    icon_path: generic_icon,
                    renderer: renderer.clone(),
                }),
            ],
            renderer: Some(renderer),
        }
    }

    /// Renderer used as the last resort for decoding user-supplied container files.
    pub fn renderer(&self) -> Option<&ThumbnailRenderer> {
        self.renderer.as_ref()
    }

    /// First strategy that succeeds wins; never fails.
    pub fn resolve(&self, info: &BundleInfo, size: u32) -> ResolvedIcon {
        for strategy in &self.strategies {
            if let Some(image) = strategy.resolve(info, size) {
                return ResolvedIcon {
                    image,
                    source: strategy.source(),
                };
            }
        }

        logs::log_warn(&format!(
            "No icon found for {}, using placeholder",
            info.root().display()
        ));
        ResolvedIcon {
            image: placeholder_icon(&info.display_name_or_stem(), size),
            source: IconSource::Placeholder,
        }
    }
}

/// The classic `.icns` file named in `Info.plist`, or one at a conventional name.
pub struct IcnsFileStrategy {
    renderer: ThumbnailRenderer,
}

impl IcnsFileStrategy {
    fn icon_path(info: &BundleInfo) -> Option<PathBuf> {
        let resources = bundle::resources_dir(info.root());

        if let Some(declared) = info.icon_file() {
            let path = resources.join(declared);
            if path.is_file() {
                return Some(path);
            }
        }

        let app_name = resolver::bundle_stem(info.root());
        [
            format!("{}.icns", app_name),
            format!("{}.icns", app_name.to_lowercase()),
            "AppIcon.icns".to_string(),
            "appicon.icns".to_string(),
            "app.icns".to_string(),
            "icon.icns".to_string(),
        ]
        .into_iter()
        .chain(info.icon_name())
        .map(|name| resources.join(name))
        .find(|path| path.is_file())
    }
}

impl IconStrategy for IcnsFileStrategy {
    fn source(&self) -> IconSource {
        IconSource::IcnsFile
    }

    fn resolve(&self, info: &BundleInfo, size: u32) -> Option<RgbaImage> {
        let path = Self::icon_path(info)?;
        icns::load_best_image(&path, snap_decode_size(size), Some(&self.renderer))
            .ok()
            .map(|best| scale_to_square(&best, size))
    }
}

/// Platform-variant images listed under `CFBundleIcons`; the widest one wins.
pub struct VariantImagesStrategy;

impl IconStrategy for VariantImagesStrategy {
    fn source(&self) -> IconSource {
        IconSource::VariantImages
    }

    fn resolve(&self, info: &BundleInfo, size: u32) -> Option<RgbaImage> {
        let resources = bundle::resources_dir(info.root());

        info.icon_variant_files()
            .iter()
            .flat_map(|base| {
                [
                    base.clone(),
                    format!("{}.png", base),
                    format!("{}@2x.png", base),
                    format!("{}@3x.png", base),
                ]
            })
            .map(|name| resources.join(name))
            .filter(|path| path.is_file())
            .filter_map(|path| decode_image_file(&path))
            .reduce(|best, image| {
                if image.width() > best.width() {
                    image
                } else {
                    best
                }
            })
            .map(|best| scale_to_square(&best, size))
    }
}

/// Compiled asset catalogs can only be rendered by the platform thumbnailer.
pub struct AssetCatalogStrategy {
    renderer: ThumbnailRenderer,
}

impl IconStrategy for AssetCatalogStrategy {
    fn source(&self) -> IconSource {
        IconSource::AssetCatalog
    }

    fn resolve(&self, info: &BundleInfo, size: u32) -> Option<RgbaImage> {
        if !bundle::assets_car_path(info.root()).is_file() {
            return None;
        }

        match self.renderer.render(info.root(), size) {
            Ok(image) => Some(scale_to_square(&image, size)),
            Err(e) => {
                logs::log_warn(&format!(
                    "Thumbnail render failed for {}: {}",
                    info.root().display(),
                    e
                ));
                None
            }
        }
    }
}

/// The platform's generic application icon.
pub struct GenericIconStrategy {
    icon_path: Option<PathBuf>,
    renderer: ThumbnailRenderer,
}

impl IconStrategy for GenericIconStrategy {
    fn source(&self) -> IconSource {
        IconSource::GenericIcon
    }

    fn resolve(&self, _info: &BundleInfo, size: u32) -> Option<RgbaImage> {
        let path = self.icon_path.as_ref().filter(|path| path.is_file())?;
        icns::load_best_image(path, snap_decode_size(size), Some(&self.renderer))
            .ok()
            .map(|best| scale_to_square(&best, size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{app_plist, icns_bytes, png_bytes, solid, write_bundle, write_png};
    use std::time::Duration;
    use tempfile::TempDir;

    fn no_renderer() -> ThumbnailRenderer {
        ThumbnailRenderer::new("/nonexistent/thumbnailer", Duration::from_millis(500))
    }

    #[test]
    fn test_snap_decode_size() {
        assert_eq!(snap_decode_size(1), 16);
        assert_eq!(snap_decode_size(16), 16);
        assert_eq!(snap_decode_size(120), 128);
        assert_eq!(snap_decode_size(150), 256);
        assert_eq!(snap_decode_size(1024), 1024);
        assert_eq!(snap_decode_size(4096), 1024);
    }

    #[test]
    fn test_pick_smallest_at_least_target() {
        let images = [16, 48, 128, 512]
            .iter()
            .map(|&s| solid(s, s, [0, 0, 0, 255]))
            .collect::<Vec<_>>();
        let best = pick_best_by_size(images, 64).unwrap();
        assert_eq!(best.width(), 128);
    }

    #[test]
    fn test_pick_largest_when_all_below_target() {
        let images = [16, 48, 128, 512]
            .iter()
            .map(|&s| solid(s, s, [0, 0, 0, 255]))
            .collect::<Vec<_>>();
        let best = pick_best_by_size(images, 2048).unwrap();
        assert_eq!(best.width(), 512);
    }

    #[test]
    fn test_pick_from_nothing() {
        assert!(pick_best_by_size(Vec::new(), 64).is_none());
    }

    #[test]
    fn test_scale_to_square_pads_and_centres() {
        let wide = solid(200, 100, [255, 0, 0, 255]);
        let square = scale_to_square(&wide, 100);

        assert_eq!(square.dimensions(), (100, 100));
        // Letterboxed: top and bottom rows stay transparent, the middle is filled.
        assert_eq!(square.get_pixel(50, 0)[3], 0);
        assert_eq!(square.get_pixel(50, 99)[3], 0);
        assert_eq!(*square.get_pixel(50, 50), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_scale_to_zero_side_is_empty() {
        let square = scale_to_square(&solid(40, 20, [0, 0, 255, 255]), 0);
        assert_eq!(square.dimensions(), (0, 0));
    }

    #[test]
    fn test_placeholder_is_deterministic() {
        let a = placeholder_icon("Safari", 64);
        let b = placeholder_icon("Safari", 64);
        assert_eq!(a, b);
        assert_eq!(a.dimensions(), (64, 64));
    }

    #[test]
    fn test_pipeline_prefers_declared_icns() {
        let dir = TempDir::new().unwrap();
        let bundle = write_bundle(
            dir.path(),
            "Foo.app",
            &app_plist("<key>CFBundleIconFile</key><string>Foo</string>"),
        );
        let red = png_bytes(&solid(128, 128, [255, 0, 0, 255]));
        std::fs::write(
            bundle.join("Contents/Resources/Foo.icns"),
            icns_bytes(&[(b"ic07", red)]),
        )
        .unwrap();

        let info = BundleInfo::load(&bundle).unwrap();
        let resolved = IconPipeline::standard(no_renderer(), None).resolve(&info, 64);
        assert_eq!(resolved.source, IconSource::IcnsFile);
        assert_eq!(resolved.image.dimensions(), (64, 64));
        assert_eq!(*resolved.image.get_pixel(32, 32), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_pipeline_uses_widest_variant_image() {
        let dir = TempDir::new().unwrap();
        let bundle = write_bundle(
            dir.path(),
            "Phone.app",
            &app_plist(
                "<key>CFBundleIcons</key><dict>\
                   <key>CFBundlePrimaryIcon</key><dict>\
                     <key>CFBundleIconFiles</key><array><string>AppIcon60x60</string></array>\
                   </dict>\
                 </dict>",
            ),
        );
        let resources = bundle.join("Contents/Resources");
        write_png(&resources.join("AppIcon60x60.png"), 60, 60, [0, 0, 255, 255]);
        write_png(&resources.join("AppIcon60x60@3x.png"), 180, 180, [0, 255, 0, 255]);

        let info = BundleInfo::load(&bundle).unwrap();
        let resolved = IconPipeline::standard(no_renderer(), None).resolve(&info, 120);
        assert_eq!(resolved.source, IconSource::VariantImages);
        assert_eq!(*resolved.image.get_pixel(60, 60), Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn test_pipeline_skips_asset_catalog_without_thumbnailer() {
        let dir = TempDir::new().unwrap();
        let bundle = write_bundle(dir.path(), "Modern.app", &app_plist(""));
        std::fs::write(bundle.join("Contents/Resources/Assets.car"), b"car").unwrap();

        let info = BundleInfo::load(&bundle).unwrap();
        let resolved = IconPipeline::standard(no_renderer(), None).resolve(&info, 32);
        assert_eq!(resolved.source, IconSource::Placeholder);
        assert_eq!(resolved.image.dimensions(), (32, 32));
    }

    #[test]
    fn test_pipeline_falls_back_to_generic_icon() {
        let dir = TempDir::new().unwrap();
        let bundle = write_bundle(dir.path(), "Plain.app", &app_plist(""));
        let generic = dir.path().join("Generic.icns");
        std::fs::write(
            &generic,
            icns_bytes(&[(b"ic07", png_bytes(&solid(128, 128, [9, 9, 9, 255])))]),
        )
        .unwrap();

        let info = BundleInfo::load(&bundle).unwrap();
        let resolved = IconPipeline::standard(no_renderer(), Some(generic)).resolve(&info, 64);
        assert_eq!(resolved.source, IconSource::GenericIcon);
    }

    #[test]
    fn test_conventional_icon_name_is_found() {
        let dir = TempDir::new().unwrap();
        let bundle = write_bundle(dir.path(), "Tool.app", &app_plist(""));
        std::fs::write(
            bundle.join("Contents/Resources/AppIcon.icns"),
            icns_bytes(&[(b"ic07", png_bytes(&solid(128, 128, [1, 2, 3, 255])))]),
        )
        .unwrap();

        let info = BundleInfo::load(&bundle).unwrap();
        let resolved = IconPipeline::standard(no_renderer(), None).resolve(&info, 128);
        assert_eq!(resolved.source, IconSource::IcnsFile);
    }
}
