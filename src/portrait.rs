use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// The talk service wants JPEG portraits. A `.png` source is re-encoded
/// to a `.jpg` sibling and the sibling path returned; anything else
/// passes through untouched. Alpha is dropped in the conversion.
pub fn prepare_portrait(path: &Path) -> Result<PathBuf> {
    let is_png = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("png"))
        .unwrap_or(false);
    if !is_png {
        return Ok(path.to_path_buf());
    }

    let img = image::open(path)
        .with_context(|| format!("Failed to open portrait: {}", path.display()))?;
    let jpg_path = path.with_extension("jpg");
    img.to_rgb8()
        .save(&jpg_path)
        .with_context(|| format!("Failed to encode portrait: {}", jpg_path.display()))?;
    Ok(jpg_path)
}
