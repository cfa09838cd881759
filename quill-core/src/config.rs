//! Document configuration.

use yrs::{OffsetKind, Options};

/// Unit used to address positions inside shared text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextIndexing {
    /// UTF-8 bytes (engine default)
    #[default]
    Bytes,
    /// UTF-16 code units, compatible with JavaScript peers
    Utf16,
}

/// Options applied when a [`Document`](crate::Document) creates its replica.
#[derive(Debug, Clone)]
pub struct DocumentConfig {
    /// How text indices and lengths are measured
    pub text_indexing: TextIndexing,
    /// Keep tombstones instead of garbage-collecting deleted content
    pub skip_gc: bool,
    /// Edits closer together than this are merged into one undo step
    pub undo_capture_timeout_ms: u64,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            text_indexing: TextIndexing::Bytes,
            skip_gc: false,
            undo_capture_timeout_ms: 500,
        }
    }
}

impl DocumentConfig {
    pub(crate) fn engine_options(&self) -> Options {
        let mut options = Options::default();
        options.offset_kind = match self.text_indexing {
            TextIndexing::Bytes => OffsetKind::Bytes,
            TextIndexing::Utf16 => OffsetKind::Utf16,
        };
        options.skip_gc = self.skip_gc;
        options
    }
}
