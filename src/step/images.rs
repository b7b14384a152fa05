//! The `images` step: optimize or copy the image tree.
//!
//! Production mode re-encodes JPEG and PNG files (lossy/lossless
//! recompression); development mode copies everything unmodified for fast
//! iteration. Formats the encoder does not handle are copied verbatim in
//! both modes.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use rayon::prelude::*;

use super::{Pipeline, StepError, StepId, StepReport, StepRunner};
use crate::utils::fs::{copy_file, walk_files};

/// JPEG re-encode quality in production mode.
const JPEG_QUALITY: u8 = 80;

pub struct ImagesStep;

impl StepRunner for ImagesStep {
    fn id(&self) -> StepId {
        StepId::Images
    }

    fn run(&self, pipeline: &Pipeline) -> Result<StepReport, StepError> {
        let config = &pipeline.config;
        let source = &config.images.source;
        let dest_root = config.dist.join(&config.images.dest);
        let production = pipeline.mode.is_production();

        let files = walk_files(source);
        let results: Vec<Result<(), StepError>> = files
            .par_iter()
            .map(|path| {
                let rel = path.strip_prefix(source).unwrap_or(path);
                let dest = dest_root.join(rel);
                process_image(path, &dest, production)
            })
            .collect();

        let written = results.len();
        for result in results {
            result?;
        }

        Ok(StepReport::new(written))
    }
}

fn process_image(path: &Path, dest: &Path, production: bool) -> Result<(), StepError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let recompress = production && matches!(ext.as_deref(), Some("jpg" | "jpeg" | "png"));
    if !recompress {
        return copy_file(path, dest).map_err(|e| StepError::io(path, e));
    }

    let img = image::open(path).map_err(|e| StepError::Image {
        path: path.to_path_buf(),
        source: e,
    })?;

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StepError::io(parent, e))?;
    }
    let file = File::create(dest).map_err(|e| StepError::io(dest, e))?;
    let mut writer = BufWriter::new(file);

    let encoded = match ext.as_deref() {
        Some("jpg" | "jpeg") => {
            img.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY))
        }
        _ => img.write_with_encoder(PngEncoder::new_with_quality(
            &mut writer,
            CompressionType::Best,
            FilterType::Adaptive,
        )),
    };

    encoded.map_err(|e| StepError::Image {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::core::Mode;
    use std::fs;
    use tempfile::TempDir;

    fn fixture(mode: Mode) -> (TempDir, Pipeline) {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        fs::create_dir_all(config.images.source.join("icons")).unwrap();
        fs::write(config.images.source.join("photo.svg"), "<svg/>").unwrap();
        fs::write(config.images.source.join("icons/dot.gif"), "GIF89a").unwrap();
        fs::create_dir_all(&config.dist).unwrap();
        (temp, Pipeline::new(config, mode))
    }

    #[test]
    fn test_development_copies_verbatim() {
        let (_temp, pipeline) = fixture(Mode::Development);
        let report = ImagesStep.run(&pipeline).unwrap();

        assert_eq!(report.written, 2);
        let dest = pipeline.config.dist.join("img");
        assert_eq!(fs::read(dest.join("photo.svg")).unwrap(), b"<svg/>");
        assert_eq!(fs::read(dest.join("icons/dot.gif")).unwrap(), b"GIF89a");
    }

    #[test]
    fn test_unhandled_formats_copied_in_production() {
        // svg/gif are not re-encoded even in production
        let (_temp, pipeline) = fixture(Mode::Production);
        ImagesStep.run(&pipeline).unwrap();

        let dest = pipeline.config.dist.join("img");
        assert_eq!(fs::read(dest.join("photo.svg")).unwrap(), b"<svg/>");
    }

    #[test]
    fn test_missing_source_tree_is_empty_run() {
        let temp = TempDir::new().unwrap();
        let pipeline = Pipeline::new(test_config(temp.path()), Mode::Development);

        let report = ImagesStep.run(&pipeline).unwrap();
        assert_eq!(report.written, 0);
    }

    #[test]
    fn test_corrupt_jpeg_fails_in_production() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        fs::create_dir_all(&config.images.source).unwrap();
        fs::write(config.images.source.join("broken.jpg"), "not a jpeg").unwrap();
        let pipeline = Pipeline::new(config, Mode::Production);

        let result = ImagesStep.run(&pipeline);
        assert!(matches!(result, Err(StepError::Image { .. })));
    }
}
