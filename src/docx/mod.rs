//! DOCX (WordprocessingML) parsing.

mod numbering;
mod paragraph;
mod parser;
mod properties;
mod styles;

pub use numbering::{
    AbstractNumbering, CounterState, LevelOverride, MarkerSuffix, NumberFormat, NumberingInstance,
    NumberingLevel, NumberingTable,
};
pub use paragraph::{Paragraph, ParagraphBuilder, Run};
pub use parser::{DocxParser, ParseState};
pub use styles::{StyleDefinition, StyleFamily, StyleTable};
