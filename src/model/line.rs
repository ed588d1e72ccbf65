//! Line-level output records.

use serde::{Deserialize, Serialize};

/// Kind of a formatting annotation span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Size,
    Bold,
    Italic,
    Underlined,
    Alignment,
    Indentation,
    Style,
}

impl AnnotationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationKind::Size => "size",
            AnnotationKind::Bold => "bold",
            AnnotationKind::Italic => "italic",
            AnnotationKind::Underlined => "underlined",
            AnnotationKind::Alignment => "alignment",
            AnnotationKind::Indentation => "indentation",
            AnnotationKind::Style => "style",
        }
    }
}

/// A formatting span over `[start, end)` character positions of a line's
/// text. Spans for different kinds may overlap freely; spans of one kind are
/// emitted per contiguous run-group and never overlap each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub kind: AnnotationKind,
    pub start: usize,
    pub end: usize,
    pub value: String,
}

impl Annotation {
    pub fn new(kind: AnnotationKind, start: usize, end: usize, value: impl Into<String>) -> Self {
        Self {
            kind,
            start,
            end,
            value: value.into(),
        }
    }
}

/// Which document part a line came from. Header, footer, footnote and
/// endnote paragraphs are ordinary paragraph sources, only tagged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    #[default]
    Body,
    Header,
    Footer,
    Footnote,
    Endnote,
}

/// One output line: a paragraph's concatenated text (numbering marker
/// included) plus its formatting annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineRecord {
    /// Stable identifier: `"{md5_of_file_bytes}_{ordinal}"`.
    pub uid: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Origin::is_body")]
    pub origin: Origin,
    /// List nesting level (`ilvl`) if the paragraph was numbered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    pub annotations: Vec<Annotation>,
}

impl Origin {
    fn is_body(&self) -> bool {
        matches!(self, Origin::Body)
    }
}

impl LineRecord {
    /// Check whether an annotation with the given kind and value covers the
    /// whole line. Convenience for tests and downstream consumers.
    pub fn has_annotation(&self, kind: AnnotationKind, value: &str) -> bool {
        self.annotations
            .iter()
            .any(|a| a.kind == kind && a.value == value)
    }
}
