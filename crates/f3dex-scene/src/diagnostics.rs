//! Recoverable problems found while decoding. Each one is logged as it is
//! recorded; the decode continues and produces a best-effort scene.

/// Why a face could not use a window slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SlotFault {
    /// Never loaded.
    #[error("unset")]
    Unset,
    /// Loaded before the current batch opened.
    #[error("stale")]
    Stale,
}

/// A recoverable decode problem.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Diagnostic {
    /// A load-indices command computed a global index past the vertex array.
    #[error("command {command}: global index {global} for slot {slot} exceeds vertex array")]
    IndexOverflow {
        command: usize,
        slot: usize,
        global: u32,
    },
    /// A load-indices command addressed a slot past the 32-slot window.
    #[error("command {command}: slot {slot} outside vertex window")]
    SlotOutOfWindow { command: usize, slot: usize },
    /// A face referenced a slot with no usable global index; the triangle was dropped.
    #[error("command {command}: slot {slot} is {fault}, triangle dropped")]
    UnresolvedSlot {
        command: usize,
        slot: usize,
        fault: SlotFault,
    },
    /// A batch referenced global indices below its computed offset.
    #[error("batch {batch}: minimum index {min_index} below offset {offset}, using minimum")]
    NonMonotonicBatch {
        batch: usize,
        min_index: u32,
        offset: u32,
    },
    /// A palette load ran past the texture data section.
    #[error("command {command}: palette for texture {texture} exceeds texture data")]
    PaletteOutOfRange { command: usize, texture: usize },
    /// A texture bind named an offset with no descriptor.
    #[error("command {command}: no texture at offset {offset:#X}, descriptor added")]
    UnknownTexture { command: usize, offset: u32 },
    /// The pixel codec rejected a texture.
    #[error("texture {texture}: {message}")]
    TextureDecode { texture: usize, message: String },
}

/// Discriminant of [`Diagnostic`], for counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    IndexOverflow,
    SlotOutOfWindow,
    UnresolvedSlot,
    NonMonotonicBatch,
    PaletteOutOfRange,
    UnknownTexture,
    TextureDecode,
}

impl Diagnostic {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Self::IndexOverflow { .. } => DiagnosticKind::IndexOverflow,
            Self::SlotOutOfWindow { .. } => DiagnosticKind::SlotOutOfWindow,
            Self::UnresolvedSlot { .. } => DiagnosticKind::UnresolvedSlot,
            Self::NonMonotonicBatch { .. } => DiagnosticKind::NonMonotonicBatch,
            Self::PaletteOutOfRange { .. } => DiagnosticKind::PaletteOutOfRange,
            Self::UnknownTexture { .. } => DiagnosticKind::UnknownTexture,
            Self::TextureDecode { .. } => DiagnosticKind::TextureDecode,
        }
    }
}

/// Ordered list of recoverable problems from one decode pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and log a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        log::warn!("{}", diagnostic);
        self.entries.push(diagnostic);
    }

    pub fn has_recoverable_errors(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind() == kind).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_has_no_errors() {
        let d = Diagnostics::new();
        assert!(!d.has_recoverable_errors());
        assert_eq!(d.count(DiagnosticKind::IndexOverflow), 0);
    }

    #[test]
    fn test_count_by_kind() {
        let mut d = Diagnostics::new();
        d.push(Diagnostic::IndexOverflow {
            command: 1,
            slot: 0,
            global: 10,
        });
        d.push(Diagnostic::IndexOverflow {
            command: 1,
            slot: 1,
            global: 11,
        });
        d.push(Diagnostic::UnresolvedSlot {
            command: 2,
            slot: 5,
            fault: SlotFault::Unset,
        });
        assert!(d.has_recoverable_errors());
        assert_eq!(d.len(), 3);
        assert_eq!(d.count(DiagnosticKind::IndexOverflow), 2);
        assert_eq!(d.count(DiagnosticKind::UnresolvedSlot), 1);
        assert_eq!(d.count(DiagnosticKind::TextureDecode), 0);
    }

    #[test]
    fn test_display_mentions_slot() {
        let diag = Diagnostic::UnresolvedSlot {
            command: 7,
            slot: 3,
            fault: SlotFault::Stale,
        };
        assert_eq!(
            diag.to_string(),
            "command 7: slot 3 is stale, triangle dropped"
        );
    }

    #[test]
    fn test_display_formats_fields() {
        assert_eq!(SlotFault::Unset.to_string(), "unset");
        let diag = Diagnostic::UnknownTexture {
            command: 2,
            offset: 0x400,
        };
        assert_eq!(
            diag.to_string(),
            "command 2: no texture at offset 0x400, descriptor added"
        );
        let diag = Diagnostic::NonMonotonicBatch {
            batch: 1,
            min_index: 0,
            offset: 7,
        };
        assert_eq!(
            diag.to_string(),
            "batch 1: minimum index 0 below offset 7, using minimum"
        );
    }
}
