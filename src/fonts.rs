//! Font resources for charts and documents.
//!
//! Fonts are resolved once at startup from configuration and passed to the
//! renderers explicitly. Resolution tries the preferred path, then each
//! fallback candidate. When nothing is readable the set is empty: documents
//! use the built-in Helvetica face and charts are drawn without text.

use plotters::style::{register_font, FontStyle};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// Family name the chart renderer draws text with.
pub const CHART_FONT_FAMILY: &str = "sans-serif";

/// Outcome of the process-wide chart font registration: the registered
/// font's path, or `None` when the first attempt failed.
static CHART_FONT: OnceLock<Option<PathBuf>> = OnceLock::new();

/// A TrueType font read from disk.
#[derive(Debug, Clone)]
pub struct LoadedFont {
    /// Where the font was read from.
    pub path: PathBuf,
    /// Raw font file contents.
    pub bytes: Arc<[u8]>,
}

/// The font resources available to the renderers.
#[derive(Debug, Clone, Default)]
pub struct FontSet {
    font: Option<LoadedFont>,
}

impl FontSet {
    /// A set with no external font.
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Resolve the first readable font among `preferred` and `fallbacks`.
    pub fn resolve(preferred: Option<&Path>, fallbacks: &[PathBuf]) -> Self {
        let candidates = preferred
            .into_iter()
            .chain(fallbacks.iter().map(PathBuf::as_path));

        for path in candidates {
            match std::fs::read(path) {
                Ok(bytes) if !bytes.is_empty() => {
                    info!("Using font: {}", path.display());
                    return Self::from_bytes(path, bytes);
                }
                Ok(_) => warn!("Font file is empty: {}", path.display()),
                Err(e) => debug!("Font not available at {}: {}", path.display(), e),
            }
        }

        warn!("No font file found; falling back to built-in PDF font and text-free charts");
        Self::builtin()
    }

    /// Build a set from font bytes already in memory.
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        Self {
            font: Some(LoadedFont {
                path: path.into(),
                bytes: bytes.into(),
            }),
        }
    }

    /// The external font, if one was resolved.
    pub fn font(&self) -> Option<&LoadedFont> {
        self.font.as_ref()
    }

    /// Make the font available to the chart backend.
    ///
    /// Returns whether charts can draw text. The backend keeps one registry
    /// per process and the first registration attempt decides it: a later
    /// set with a different font still gets `true`, but charts keep drawing
    /// with the first font (see [`registered_chart_font`]). A failed first
    /// attempt leaves charts text-free for the rest of the process.
    pub fn register_chart_font(&self) -> bool {
        let Some(font) = &self.font else {
            return false;
        };

        let registered = CHART_FONT.get_or_init(|| {
            // The chart backend requires 'static font data.
            let data: &'static [u8] = Box::leak(font.bytes.to_vec().into_boxed_slice());
            match register_font(CHART_FONT_FAMILY, FontStyle::Normal, data) {
                Ok(()) => {
                    debug!("Registered chart font from {}", font.path.display());
                    Some(font.path.clone())
                }
                Err(_) => {
                    warn!(
                        "Font at {} is not a usable TrueType font; charts will omit text",
                        font.path.display()
                    );
                    None
                }
            }
        });

        match registered {
            Some(path) if *path != font.path => {
                warn!(
                    "Chart font already registered from {}; ignoring {}",
                    path.display(),
                    font.path.display()
                );
                true
            }
            Some(_) => true,
            None => false,
        }
    }
}

/// Path of the font charts draw with, once one has been registered.
pub fn registered_chart_font() -> Option<&'static Path> {
    CHART_FONT.get().and_then(|p| p.as_deref())
}

/// A real system font registered for charts, if this machine has one.
#[cfg(test)]
pub(crate) fn system_fonts() -> Option<FontSet> {
    let fonts = FontSet::resolve(None, &crate::config::FontConfig::default().fallbacks);
    if fonts.register_chart_font() {
        Some(fonts)
    } else {
        None
    }
}
