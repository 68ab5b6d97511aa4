//! Image → AVIF converter. Decodes with the `image` crate and encodes with its rav1e-backed
//! `AvifEncoder`. Outputs mirror the input tree with the extension swapped to `.avif`.

use anyhow::{Context, Result};
use image::codecs::avif::AvifEncoder;
use image::{DynamicImage, ImageReader};
use std::path::{Path, PathBuf};

use crate::engine::tools::with_extension_replaced;
use crate::pipeline::ItemProcessor;
use crate::utils::config::{AVIF_EXTENSION, Defaults};
use crate::utils::tempfiles::ensure_writable_dir;
use crate::{CancelFlag, Interrupted, SourceFile};

pub struct AvifConverter {
    output_root: PathBuf,
    quality: u8,
    speed: u8,
}

impl AvifConverter {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            quality: Defaults::AVIF_QUALITY,
            speed: Defaults::AVIF_SPEED,
        }
    }

    /// 1 (smallest) to 100 (best).
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// 0 (slowest, best compression) to 10 (fastest).
    pub fn with_speed(mut self, speed: u8) -> Self {
        self.speed = speed;
        self
    }
}

/// The AVIF encoder takes 8-bit RGB(A); everything else is converted first.
fn to_encodable(img: DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => img,
        other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

impl ItemProcessor for AvifConverter {
    type Item = SourceFile;

    fn prepare(&self) -> Result<()> {
        if !(1..=100).contains(&self.quality) {
            anyhow::bail!("quality must be between 1 and 100 (got {})", self.quality);
        }
        if self.speed > 10 {
            anyhow::bail!("speed must be between 0 and 10 (got {})", self.speed);
        }
        ensure_writable_dir(&self.output_root)
    }

    fn output_path(&self, item: &SourceFile) -> Result<PathBuf> {
        Ok(self
            .output_root
            .join(with_extension_replaced(&item.relative, AVIF_EXTENSION)))
    }

    fn transform(&self, item: &SourceFile, dest: &Path, cancel: &CancelFlag) -> Result<()> {
        let img = ImageReader::open(&item.path)
            .context("open image")?
            .with_guessed_format()
            .context("detect image format")?
            .decode()
            .context("decode image")?;
        if cancel.is_cancelled() {
            return Err(Interrupted.into());
        }
        let img = to_encodable(img);
        let mut encoded = Vec::new();
        let encoder = AvifEncoder::new_with_speed_quality(&mut encoded, self.speed, self.quality);
        img.write_with_encoder(encoder).context("AVIF encode")?;
        std::fs::write(dest, &encoded).with_context(|| format!("write {}", dest.display()))?;
        Ok(())
    }
}
