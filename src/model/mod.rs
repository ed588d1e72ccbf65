//! Data models for resolved formatting and line-level output.

pub mod line;
pub mod properties;

pub use line::{Annotation, AnnotationKind, LineRecord, Origin};
pub use properties::{
    Alignment, Indentation, IndentationOverrides, PropertyOverrides, ResolvedProperties,
};
