use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::foundation::error::{CapsyncError, CapsyncResult};
use crate::render::canvas::FaceWeight;

/// Validated font bytes plus the family name they register under.
#[derive(Clone, Debug)]
pub struct FontFace {
    bytes: Arc<Vec<u8>>,
    family: String,
}

impl FontFace {
    /// Parse `bytes` and keep them for shaping and rasterization.
    pub fn from_bytes(bytes: Vec<u8>) -> CapsyncResult<Self> {
        if bytes.is_empty() {
            return Err(CapsyncError::font("font data is empty"));
        }

        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes.clone()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| CapsyncError::font("no font faces found in font data"))?;
        let family = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| CapsyncError::font("registered font family has no name"))?
            .to_string();

        Ok(Self {
            bytes: Arc::new(bytes),
            family,
        })
    }

    /// Read and parse a font file.
    pub fn from_path(path: &Path) -> CapsyncResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            CapsyncError::font(format!("failed to read font '{}': {e}", path.display()))
        })?;
        Self::from_bytes(bytes).map_err(|e| match e {
            CapsyncError::FontLoad(msg) => {
                CapsyncError::font(format!("'{}': {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Raw font file bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Family name reported by the font.
    pub fn family(&self) -> &str {
        &self.family
    }
}

/// The regular and bold faces used by one render.
///
/// Immutable after construction; share it between workers behind an `Arc`.
#[derive(Clone, Debug)]
pub struct FontCache {
    regular: FontFace,
    bold: FontFace,
}

impl FontCache {
    /// Build from already-parsed faces.
    pub fn new(regular: FontFace, bold: FontFace) -> Self {
        Self { regular, bold }
    }

    /// Build from raw font bytes.
    pub fn from_bytes(regular: Vec<u8>, bold: Vec<u8>) -> CapsyncResult<Self> {
        Ok(Self::new(
            FontFace::from_bytes(regular)?,
            FontFace::from_bytes(bold)?,
        ))
    }

    /// Build from two font files.
    pub fn from_paths(regular: &Path, bold: &Path) -> CapsyncResult<Self> {
        Ok(Self::new(
            FontFace::from_path(regular)?,
            FontFace::from_path(bold)?,
        ))
    }

    /// Locate `<family>-Medium.ttf` (or `<family>-Regular.ttf`) and `<family>-Bold.ttf` in `dir`.
    pub fn from_family_dir(dir: &Path, family: &str) -> CapsyncResult<Self> {
        let regular = first_existing(dir, family, &["Medium", "Regular"]).ok_or_else(|| {
            CapsyncError::font(format!(
                "no {family}-Medium.ttf or {family}-Regular.ttf in '{}'",
                dir.display()
            ))
        })?;
        let bold = first_existing(dir, family, &["Bold"]).ok_or_else(|| {
            CapsyncError::font(format!("no {family}-Bold.ttf in '{}'", dir.display()))
        })?;
        tracing::debug!(
            regular = %regular.display(),
            bold = %bold.display(),
            "resolved caption fonts"
        );
        Self::from_paths(&regular, &bold)
    }

    /// Face for `weight`.
    pub fn face(&self, weight: FaceWeight) -> &FontFace {
        match weight {
            FaceWeight::Regular => &self.regular,
            FaceWeight::Bold => &self.bold,
        }
    }
}

fn first_existing(dir: &Path, family: &str, styles: &[&str]) -> Option<PathBuf> {
    styles
        .iter()
        .map(|style| dir.join(format!("{family}-{style}.ttf")))
        .find(|p| p.is_file())
}

#[cfg(test)]
#[path = "../../tests/unit/assets/fonts.rs"]
mod tests;
