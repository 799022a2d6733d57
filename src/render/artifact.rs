use std::io::Cursor;
use std::path::Path;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat, RgbaImage};
use tracing::{debug, warn};

use super::ArtifactError;

/// Write `image` as a PNG and prove it decodes back to the same size.
///
/// A failed check triggers one re-encode through an independent in-memory
/// path; if that also fails the file is removed and `Corrupt` is returned.
pub fn write_png_verified(image: &RgbaImage, path: &Path) -> Result<(), ArtifactError> {
    write_png_with(image, path, save_direct, encode_in_memory)
}

fn write_png_with<P, F>(
    image: &RgbaImage,
    path: &Path,
    primary: P,
    fallback: F,
) -> Result<(), ArtifactError>
where
    P: Fn(&RgbaImage, &Path) -> Result<(), String>,
    F: Fn(&RgbaImage) -> Result<Vec<u8>, String>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ArtifactError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let expected = image.dimensions();
    let first = primary(image, path).and_then(|()| verify_file(path, expected));
    let reason = match first {
        Ok(()) => {
            debug!(path = %path.display(), "png written and verified");
            return Ok(());
        }
        Err(reason) => reason,
    };
    warn!(path = %path.display(), %reason, "png verification failed, re-encoding");
    let retry = fallback(image)
        .and_then(|bytes| verify_bytes(&bytes, expected).map(|()| bytes))
        .and_then(|bytes| std::fs::write(path, bytes).map_err(|err| err.to_string()))
        .and_then(|()| verify_file(path, expected));
    match retry {
        Ok(()) => Ok(()),
        Err(reason) => {
            let _ = std::fs::remove_file(path);
            Err(ArtifactError::Corrupt {
                path: path.to_path_buf(),
                reason,
            })
        }
    }
}

fn save_direct(image: &RgbaImage, path: &Path) -> Result<(), String> {
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|err| err.to_string())
}

fn encode_in_memory(image: &RgbaImage) -> Result<Vec<u8>, String> {
    let mut bytes = Vec::new();
    PngEncoder::new(Cursor::new(&mut bytes))
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|err| err.to_string())?;
    Ok(bytes)
}

fn verify_file(path: &Path, expected: (u32, u32)) -> Result<(), String> {
    let bytes = std::fs::read(path).map_err(|err| err.to_string())?;
    verify_bytes(&bytes, expected)
}

fn verify_bytes(bytes: &[u8], expected: (u32, u32)) -> Result<(), String> {
    let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|err| err.to_string())?;
    let actual = (decoded.width(), decoded.height());
    if actual != expected {
        return Err(format!(
            "decoded {}x{}, expected {}x{}",
            actual.0, actual.1, expected.0, expected.1
        ));
    }
    Ok(())
}
