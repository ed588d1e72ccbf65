//! DOCX style table and cascade resolution.
//!
//! `styles.xml` defines named styles that inherit from each other through
//! `basedOn` chains and bottom out at `docDefaults`. The resolver flattens a
//! chain into one [`ResolvedProperties`] record: outermost ancestor first,
//! innermost style last, each field independently overridden.

use crate::error::{Error, Result};
use crate::model::{PropertyOverrides, ResolvedProperties};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use super::properties::{apply_paragraph_property, apply_run_property, attr_val, bool_attr};

/// Style family (`w:type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleFamily {
    Paragraph,
    Character,
    Numbering,
}

impl StyleFamily {
    fn parse(val: &str) -> Option<Self> {
        match val {
            "paragraph" => Some(StyleFamily::Paragraph),
            "character" => Some(StyleFamily::Character),
            "numbering" => Some(StyleFamily::Numbering),
            _ => None,
        }
    }
}

/// One parsed style definition. Immutable once the table is built.
#[derive(Debug, Clone, Default)]
pub struct StyleDefinition {
    /// Style ID (e.g. "Heading1").
    pub id: String,
    /// Display name (e.g. "Heading 1").
    pub name: String,
    /// Family; `None` for typeless (custom) styles.
    pub family: Option<StyleFamily>,
    /// Parent style ID (`basedOn`).
    pub based_on: Option<String>,
    /// Marked `w:default="1"` for its family.
    pub default: bool,
    /// For numbering-family styles: the `numId` bound through the style's
    /// own `pPr/numPr`. This is the target of `numStyleLink` indirection.
    pub numbering_id: Option<String>,
    /// The style's direct property overrides (`pPr` + `rPr`).
    pub overrides: PropertyOverrides,
}

/// Lookup table over `styles.xml` with memoized cascade resolution.
#[derive(Debug, Default)]
pub struct StyleTable {
    styles: Vec<StyleDefinition>,
    /// Same ID may exist under multiple families.
    by_id: HashMap<String, Vec<usize>>,
    /// Default style ID per family (`w:default="1"`).
    defaults: HashMap<StyleFamily, String>,
    /// `docDefaults` overrides applied beneath every style.
    doc_defaults: PropertyOverrides,
    cache: RefCell<HashMap<(Option<String>, StyleFamily), ResolvedProperties>>,
}

impl StyleTable {
    /// Parse `styles.xml` into a lookup table.
    pub fn parse(xml: &str) -> Result<Self> {
        if xml.trim().is_empty() {
            return Ok(Self::default());
        }

        let mut table = StyleTable::default();
        let mut reader = quick_xml::Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut current: Option<StyleDefinition> = None;
        let mut in_doc_defaults = false;
        let mut in_ppr = false;
        let mut in_rpr = false;
        let mut in_num_pr = false;

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| Error::XmlParse(e.to_string()))?;
            match event {
                quick_xml::events::Event::Start(ref e) | quick_xml::events::Event::Empty(ref e) => {
                    let empty = matches!(event, quick_xml::events::Event::Empty(_));
                    match e.name().as_ref() {
                        b"w:docDefaults" => in_doc_defaults = !empty,
                        b"w:style" => {
                            let style = StyleDefinition {
                                id: attr_val(e, b"w:styleId").unwrap_or_default(),
                                family: attr_val(e, b"w:type")
                                    .as_deref()
                                    .and_then(StyleFamily::parse),
                                default: bool_attr(e, b"w:default").unwrap_or(false),
                                ..Default::default()
                            };
                            if style.default {
                                if let Some(family) = style.family {
                                    table.defaults.entry(family).or_insert(style.id.clone());
                                }
                            }
                            if empty {
                                table.push(style);
                            } else {
                                current = Some(style);
                            }
                        }
                        b"w:pPr" if !empty => in_ppr = true,
                        b"w:rPr" if !empty => in_rpr = true,
                        b"w:numPr" if in_ppr && !empty => in_num_pr = true,
                        b"w:name" => {
                            if let (Some(style), Some(val)) = (&mut current, attr_val(e, b"w:val"))
                            {
                                style.name = val;
                            }
                        }
                        b"w:basedOn" => {
                            if let (Some(style), Some(val)) = (&mut current, attr_val(e, b"w:val"))
                            {
                                style.based_on = Some(val);
                            }
                        }
                        b"w:numId" if in_num_pr => {
                            if let (Some(style), Some(val)) = (&mut current, attr_val(e, b"w:val"))
                            {
                                style.numbering_id = Some(val);
                            }
                        }
                        _ => {
                            let target = if in_doc_defaults {
                                Some(&mut table.doc_defaults)
                            } else {
                                current.as_mut().map(|s| &mut s.overrides)
                            };
                            if let Some(overrides) = target {
                                if in_rpr {
                                    apply_run_property(overrides, e);
                                } else if in_ppr && !in_num_pr {
                                    apply_paragraph_property(overrides, e);
                                } else if in_doc_defaults {
                                    // docDefaults wraps tags in pPrDefault/rPrDefault
                                    if !apply_run_property(overrides, e) {
                                        apply_paragraph_property(overrides, e);
                                    }
                                }
                            }
                        }
                    }
                }
                quick_xml::events::Event::End(ref e) => match e.name().as_ref() {
                    b"w:docDefaults" => in_doc_defaults = false,
                    b"w:style" => {
                        if let Some(style) = current.take() {
                            table.push(style);
                        }
                        in_ppr = false;
                        in_rpr = false;
                        in_num_pr = false;
                    }
                    b"w:pPr" => in_ppr = false,
                    b"w:rPr" => in_rpr = false,
                    b"w:numPr" => in_num_pr = false,
                    _ => {}
                },
                quick_xml::events::Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(table)
    }

    fn push(&mut self, style: StyleDefinition) {
        if style.id.is_empty() {
            return;
        }
        self.by_id
            .entry(style.id.clone())
            .or_default()
            .push(self.styles.len());
        self.styles.push(style);
    }

    /// Find a style by ID, preferring an exact family match, else accepting
    /// a typeless (custom) definition.
    pub fn find(&self, id: &str, family: StyleFamily) -> Option<&StyleDefinition> {
        let candidates = self.by_id.get(id)?;
        candidates
            .iter()
            .map(|&i| &self.styles[i])
            .find(|s| s.family == Some(family))
            .or_else(|| {
                candidates
                    .iter()
                    .map(|&i| &self.styles[i])
                    .find(|s| s.family.is_none())
            })
    }

    /// The inheritance chain for a style, outermost ancestor first, with the
    /// family's default style prepended when present. `basedOn` cycles are
    /// broken with a visited set; dangling parents end the ascent.
    fn chain(&self, id: &str, family: StyleFamily) -> Vec<&StyleDefinition> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut chain: Vec<&StyleDefinition> = Vec::new();

        let mut current = self.find(id, family);
        while let Some(style) = current {
            if !visited.insert(style.id.as_str()) {
                log::warn!("basedOn cycle detected at style '{}'", style.id);
                break;
            }
            chain.push(style);
            current = style.based_on.as_deref().and_then(|p| self.find(p, family));
        }
        chain.reverse();

        if let Some(default_id) = self.defaults.get(&family) {
            if !visited.contains(default_id.as_str()) {
                if let Some(default_style) = self.find(default_id, family) {
                    chain.insert(0, default_style);
                }
            }
        }

        chain
    }

    /// Resolve a style reference into fully-merged properties.
    ///
    /// `None` yields the document defaults for the family. Pure over the
    /// immutable table; memoized per `(style_id, family)`.
    pub fn resolve(&self, style_id: Option<&str>, family: StyleFamily) -> ResolvedProperties {
        let key = (style_id.map(str::to_string), family);
        if let Some(hit) = self.cache.borrow().get(&key) {
            return hit.clone();
        }

        let mut props = ResolvedProperties::default();
        props.apply(&self.doc_defaults);

        if let Some(id) = style_id {
            let chain = self.chain(id, family);
            if chain.is_empty() {
                log::warn!("unresolvable style reference '{}'", id);
            }
            for style in &chain {
                props.apply(&style.overrides);
            }
            if let Some(target) = self.find(id, family) {
                if !target.name.is_empty() {
                    props.style_name = Some(target.name.to_lowercase());
                }
            }
        }

        self.cache.borrow_mut().insert(key, props.clone());
        props
    }

    /// Flatten a style chain into one partial record without baking in the
    /// document defaults. Used for character styles, which layer onto an
    /// already-resolved run base.
    pub fn chain_overrides(&self, id: &str, family: StyleFamily) -> PropertyOverrides {
        let mut merged = PropertyOverrides::default();
        for style in self.chain(id, family) {
            merged.merge(&style.overrides);
        }
        merged
    }

    /// The `numId` bound by a numbering-family style, for `numStyleLink`
    /// indirection.
    pub fn numbering_style_target(&self, style_id: &str) -> Option<&str> {
        self.find(style_id, StyleFamily::Numbering)?
            .numbering_id
            .as_deref()
    }

    /// The innermost `numPr` binding along a style's inheritance chain.
    /// Paragraphs without a direct `numPr` inherit numbering this way.
    pub fn numbering_reference(&self, id: &str, family: StyleFamily) -> Option<String> {
        self.chain(id, family)
            .iter()
            .rev()
            .find_map(|s| s.numbering_id.clone())
    }
}
