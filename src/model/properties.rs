//! Resolved and partial formatting property records.
//!
//! OOXML never states a run's final formatting in one place: it is the result
//! of a fixed-order cascade (document defaults, named styles, numbering level
//! contributions, direct formatting). Each cascade layer is captured as a
//! [`PropertyOverrides`] partial record; applying the layers in order onto a
//! [`ResolvedProperties`] baseline yields the final value for every field.

use serde::{Deserialize, Serialize};

/// Paragraph justification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Right,
    Center,
    /// Justified (`w:jc w:val="both"`).
    Both,
}

impl Alignment {
    /// The annotation value for this alignment.
    pub fn as_str(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Right => "right",
            Alignment::Center => "center",
            Alignment::Both => "both",
        }
    }

    /// Parse a `w:jc` value. Unknown values map to `None`.
    pub(crate) fn parse(val: &str) -> Option<Self> {
        match val {
            "left" | "start" => Some(Alignment::Left),
            "right" | "end" => Some(Alignment::Right),
            "center" => Some(Alignment::Center),
            "both" | "justify" | "distribute" => Some(Alignment::Both),
            _ => None,
        }
    }
}

/// Paragraph indentation in twentieths of a point (twips).
///
/// The four offsets are independent: a cascade layer setting only `left`
/// leaves the other three falling through to earlier layers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indentation {
    #[serde(rename = "firstLine")]
    pub first_line: i32,
    pub hanging: i32,
    pub start: i32,
    pub left: i32,
}

/// Fully-merged formatting for a paragraph or run.
///
/// Every field holds a concrete value; "unset" exists only in
/// [`PropertyOverrides`]. The all-zero/false/left baseline is what remains
/// when no cascade layer says anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedProperties {
    /// Font size in half-points, as written in `w:sz`.
    pub size: u32,
    pub indentation: Indentation,
    pub alignment: Alignment,
    pub bold: bool,
    pub italic: bool,
    pub underlined: bool,
    /// Display name of the originating named style, lowercased.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_name: Option<String>,
}

impl ResolvedProperties {
    /// Font size in points.
    pub fn size_points(&self) -> f32 {
        self.size as f32 / 2.0
    }

    /// Apply one cascade layer: fields the layer is silent on keep their
    /// current value, indentation merges offset-by-offset.
    pub fn apply(&mut self, overrides: &PropertyOverrides) {
        if let Some(size) = overrides.size {
            self.size = size;
        }
        if let Some(v) = overrides.indentation.first_line {
            self.indentation.first_line = v;
        }
        if let Some(v) = overrides.indentation.hanging {
            self.indentation.hanging = v;
        }
        if let Some(v) = overrides.indentation.start {
            self.indentation.start = v;
        }
        if let Some(v) = overrides.indentation.left {
            self.indentation.left = v;
        }
        if let Some(alignment) = overrides.alignment {
            self.alignment = alignment;
        }
        if let Some(bold) = overrides.bold {
            self.bold = bold;
        }
        if let Some(italic) = overrides.italic {
            self.italic = italic;
        }
        if let Some(underlined) = overrides.underlined {
            self.underlined = underlined;
        }
    }

    /// Run-granularity equality: the fields that decide whether two adjacent
    /// runs collapse into one annotation span. Alignment and indentation are
    /// paragraph-granularity and deliberately excluded.
    pub fn same_run_formatting(&self, other: &ResolvedProperties) -> bool {
        self.size == other.size
            && self.bold == other.bold
            && self.italic == other.italic
            && self.underlined == other.underlined
    }
}

/// Partial indentation record for one cascade layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndentationOverrides {
    pub first_line: Option<i32>,
    pub hanging: Option<i32>,
    pub start: Option<i32>,
    pub left: Option<i32>,
}

impl IndentationOverrides {
    pub fn is_empty(&self) -> bool {
        self.first_line.is_none()
            && self.hanging.is_none()
            && self.start.is_none()
            && self.left.is_none()
    }

    /// Merge another partial record on top (other takes precedence).
    pub fn merge(&mut self, other: &IndentationOverrides) {
        if other.first_line.is_some() {
            self.first_line = other.first_line;
        }
        if other.hanging.is_some() {
            self.hanging = other.hanging;
        }
        if other.start.is_some() {
            self.start = other.start;
        }
        if other.left.is_some() {
            self.left = other.left;
        }
    }
}

/// Partial formatting record: only the fields one cascade layer explicitly
/// sets. Used both for direct `pPr`/`rPr` formatting and for flattened style
/// chains.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyOverrides {
    pub size: Option<u32>,
    pub indentation: IndentationOverrides,
    pub alignment: Option<Alignment>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underlined: Option<bool>,
}

impl PropertyOverrides {
    pub fn is_empty(&self) -> bool {
        self.size.is_none()
            && self.indentation.is_empty()
            && self.alignment.is_none()
            && self.bold.is_none()
            && self.italic.is_none()
            && self.underlined.is_none()
    }

    /// Merge another partial record on top (other takes precedence).
    pub fn merge(&mut self, other: &PropertyOverrides) {
        if other.size.is_some() {
            self.size = other.size;
        }
        self.indentation.merge(&other.indentation);
        if other.alignment.is_some() {
            self.alignment = other.alignment;
        }
        if other.bold.is_some() {
            self.bold = other.bold;
        }
        if other.italic.is_some() {
            self.italic = other.italic;
        }
        if other.underlined.is_some() {
            self.underlined = other.underlined;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_preserves_silent_fields() {
        let mut props = ResolvedProperties {
            size: 24,
            bold: true,
            ..Default::default()
        };
        props.apply(&PropertyOverrides {
            italic: Some(true),
            ..Default::default()
        });

        assert_eq!(props.size, 24);
        assert!(props.bold);
        assert!(props.italic);
    }

    #[test]
    fn test_indentation_merges_per_offset() {
        let mut props = ResolvedProperties::default();
        props.apply(&PropertyOverrides {
            indentation: IndentationOverrides {
                left: Some(720),
                ..Default::default()
            },
            ..Default::default()
        });
        props.apply(&PropertyOverrides {
            indentation: IndentationOverrides {
                first_line: Some(200),
                ..Default::default()
            },
            ..Default::default()
        });

        // The second layer's silence on `left` must not zero it out.
        assert_eq!(props.indentation.left, 720);
        assert_eq!(props.indentation.first_line, 200);
    }

    #[test]
    fn test_override_can_unset_flag() {
        let mut props = ResolvedProperties {
            bold: true,
            ..Default::default()
        };
        props.apply(&PropertyOverrides {
            bold: Some(false),
            ..Default::default()
        });
        assert!(!props.bold);
    }

    #[test]
    fn test_same_run_formatting_ignores_alignment() {
        let a = ResolvedProperties {
            size: 24,
            alignment: Alignment::Center,
            ..Default::default()
        };
        let b = ResolvedProperties {
            size: 24,
            alignment: Alignment::Left,
            ..Default::default()
        };
        assert!(a.same_run_formatting(&b));
    }

    #[test]
    fn test_alignment_parse() {
        assert_eq!(Alignment::parse("both"), Some(Alignment::Both));
        assert_eq!(Alignment::parse("start"), Some(Alignment::Left));
        assert_eq!(Alignment::parse("end"), Some(Alignment::Right));
        assert_eq!(Alignment::parse("mystery"), None);
    }
}
