//! Paragraph assembly: runs, the formatting cascade and annotation spans.
//!
//! [`ParagraphBuilder`] turns one `w:p` fragment into a [`Paragraph`]: it
//! resolves the paragraph's style chain, folds in numbering level
//! contributions and direct formatting, synthesizes the marker run, and
//! merges adjacent runs whose formatting cannot be told apart.

use crate::error::{Error, Result};
use crate::model::{
    Annotation, AnnotationKind, LineRecord, Origin, PropertyOverrides, ResolvedProperties,
};
use quick_xml::events::Event;

use super::numbering::{CounterState, NumberingTable};
use super::properties::{apply_paragraph_property, apply_run_property, attr_val};
use super::styles::{StyleFamily, StyleTable};

/// One text run with fully-resolved formatting.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub text: String,
    pub properties: ResolvedProperties,
}

/// One assembled paragraph. The numbering marker, when present, is the first
/// run; `text()` is the concatenation of all runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub runs: Vec<Run>,
    /// Paragraph-granularity formatting (alignment, indentation, style).
    pub properties: ResolvedProperties,
    /// List nesting level when the paragraph is numbered.
    pub level: Option<u8>,
    pub origin: Origin,
}

impl Paragraph {
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.iter().all(|r| r.text.is_empty())
    }

    /// Flatten into an output line with annotation spans over `[start, end)`
    /// character positions.
    pub fn into_line_record(self, uid: String) -> LineRecord {
        let text = self.text();
        let total = text.chars().count();
        let mut annotations = Vec::new();

        for (start, end, value) in run_spans(&self.runs, |r| {
            Some(format!("{:.1}", r.properties.size_points()))
        }) {
            annotations.push(Annotation::new(AnnotationKind::Size, start, end, value));
        }

        let flags: [(AnnotationKind, fn(&ResolvedProperties) -> bool); 3] = [
            (AnnotationKind::Bold, |p| p.bold),
            (AnnotationKind::Italic, |p| p.italic),
            (AnnotationKind::Underlined, |p| p.underlined),
        ];
        for (kind, flag) in flags {
            for (start, end, value) in
                run_spans(&self.runs, |r| flag(&r.properties).then(|| "True".to_string()))
            {
                annotations.push(Annotation::new(kind, start, end, value));
            }
        }

        annotations.push(Annotation::new(
            AnnotationKind::Alignment,
            0,
            total,
            self.properties.alignment.as_str(),
        ));
        let indent = self.properties.indentation.left + self.properties.indentation.start;
        annotations.push(Annotation::new(
            AnnotationKind::Indentation,
            0,
            total,
            indent.to_string(),
        ));
        if let Some(name) = &self.properties.style_name {
            annotations.push(Annotation::new(AnnotationKind::Style, 0, total, name.clone()));
        }

        LineRecord {
            uid,
            text,
            origin: self.origin,
            level: self.level,
            annotations,
        }
    }
}

/// Walk the runs and emit one span per maximal group of adjacent runs that
/// map to the same value. Runs mapping to `None` break groups.
fn run_spans<F>(runs: &[Run], mut value_of: F) -> Vec<(usize, usize, String)>
where
    F: FnMut(&Run) -> Option<String>,
{
    let mut spans = Vec::new();
    let mut open: Option<(usize, String)> = None;
    let mut pos = 0;

    for run in runs {
        let len = run.text.chars().count();
        let value = value_of(run);
        let extends = matches!((&open, &value), (Some((_, cur)), Some(v)) if cur == v);
        if !extends {
            if let Some((start, val)) = open.take() {
                spans.push((start, pos, val));
            }
            if let Some(v) = value {
                open = Some((pos, v));
            }
        }
        pos += len;
    }
    if let Some((start, val)) = open {
        spans.push((start, pos, val));
    }
    spans
}

/// Paragraph-level facts gathered on the first pass over `w:pPr`.
#[derive(Debug, Default)]
struct ParagraphIntro {
    style_id: Option<String>,
    num_id: Option<String>,
    ilvl: Option<u8>,
    direct: PropertyOverrides,
}

/// Builds paragraphs against a document's style and numbering tables while
/// carrying the list counters across calls. One builder per document, fed
/// paragraphs strictly in document order.
pub struct ParagraphBuilder<'a> {
    styles: &'a StyleTable,
    numbering: Option<&'a NumberingTable>,
    counters: CounterState,
}

impl<'a> ParagraphBuilder<'a> {
    pub fn new(styles: &'a StyleTable, numbering: Option<&'a NumberingTable>) -> Self {
        Self {
            styles,
            numbering,
            counters: CounterState::new(),
        }
    }

    /// Assemble one paragraph from its `w:p` XML fragment.
    pub fn build(&mut self, xml: &str, origin: Origin) -> Result<Paragraph> {
        let intro = Self::read_intro(xml)?;

        // Paragraph layers: style chain, then numbering level, then direct.
        let mut para_props = self
            .styles
            .resolve(intro.style_id.as_deref(), StyleFamily::Paragraph);

        // numId="0" explicitly removes inherited numbering.
        let num_id = intro
            .num_id
            .clone()
            .or_else(|| {
                intro.style_id.as_deref().and_then(|id| {
                    self.styles.numbering_reference(id, StyleFamily::Paragraph)
                })
            })
            .filter(|id| id.as_str() != "0");

        let mut level = None;
        let mut marker_run: Option<Run> = None;
        if let (Some(numbering), Some(num_id)) = (self.numbering, num_id.as_deref()) {
            let ilvl = intro.ilvl.unwrap_or(0);
            match numbering.next_marker(num_id, ilvl, &mut self.counters, self.styles) {
                Some((marker, lvl)) => {
                    para_props.apply(&lvl.paragraph_overrides);
                    level = Some(ilvl);

                    let mut marker_props = para_props.clone();
                    marker_props.apply(&intro.direct);
                    marker_props.apply(&lvl.run_overrides);
                    marker_run = Some(Run {
                        text: marker,
                        properties: marker_props,
                    });
                }
                None => {
                    log::warn!(
                        "no usable numbering level for num id '{}' ilvl {}",
                        num_id,
                        ilvl
                    );
                }
            }
        }
        para_props.apply(&intro.direct);

        let mut runs = Vec::new();
        if let Some(marker) = marker_run {
            push_run(&mut runs, marker);
        }
        self.read_runs(xml, &para_props, &mut runs)?;

        Ok(Paragraph {
            runs,
            properties: para_props,
            level,
            origin,
        })
    }

    /// First pass: collect the paragraph's `pPr` (style reference, numbering
    /// reference, direct formatting). The `pPr`'s own `rPr` holds paragraph
    /// mark formatting and contributes nothing here.
    fn read_intro(xml: &str) -> Result<ParagraphIntro> {
        let mut intro = ParagraphIntro::default();
        let mut reader = quick_xml::Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut in_ppr = false;
        let mut in_mark_rpr = false;
        let mut in_num_pr = false;

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| Error::XmlParse(e.to_string()))?;
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let empty = matches!(event, Event::Empty(_));
                    match e.name().as_ref() {
                        b"w:pPr" if !empty => in_ppr = true,
                        b"w:rPr" if in_ppr && !empty => in_mark_rpr = true,
                        b"w:numPr" if in_ppr && !empty => in_num_pr = true,
                        b"w:pStyle" if in_ppr => {
                            intro.style_id = attr_val(e, b"w:val");
                        }
                        b"w:numId" if in_num_pr => {
                            intro.num_id = attr_val(e, b"w:val");
                        }
                        b"w:ilvl" if in_num_pr => {
                            intro.ilvl = attr_val(e, b"w:val").and_then(|v| v.parse().ok());
                        }
                        b"w:r" => break,
                        _ if in_ppr && !in_mark_rpr && !in_num_pr => {
                            apply_paragraph_property(&mut intro.direct, e);
                        }
                        _ => {}
                    }
                }
                Event::End(ref e) => match e.name().as_ref() {
                    b"w:pPr" => break,
                    b"w:rPr" => in_mark_rpr = false,
                    b"w:numPr" => in_num_pr = false,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(intro)
    }

    /// Second pass: extract runs with their resolved formatting. Text is
    /// preserved verbatim (`xml:space` honored by not trimming), tabs and
    /// breaks become control characters, field instructions and drawings are
    /// skipped.
    fn read_runs(
        &self,
        xml: &str,
        para_props: &ResolvedProperties,
        runs: &mut Vec<Run>,
    ) -> Result<()> {
        let mut reader = quick_xml::Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut buf = Vec::new();
        let mut skip_buf = Vec::new();
        let mut in_ppr = false;
        let mut in_rpr = false;
        let mut in_text = false;
        let mut current: Option<(String, Option<String>, PropertyOverrides)> = None;

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| Error::XmlParse(e.to_string()))?;
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let empty = matches!(event, Event::Empty(_));
                    match e.name().as_ref() {
                        b"w:pPr" if !empty => in_ppr = true,
                        _ if in_ppr => {}
                        b"w:r" if !empty => {
                            current = Some((String::new(), None, PropertyOverrides::default()));
                        }
                        b"w:rPr" if current.is_some() && !empty => in_rpr = true,
                        b"w:rStyle" if in_rpr => {
                            if let Some((_, r_style, _)) = &mut current {
                                *r_style = attr_val(e, b"w:val");
                            }
                        }
                        _ if in_rpr => {
                            if let Some((_, _, overrides)) = &mut current {
                                apply_run_property(overrides, e);
                            }
                        }
                        b"w:t" if current.is_some() && !empty => in_text = true,
                        b"w:tab" => {
                            if let Some((text, _, _)) = &mut current {
                                text.push('\t');
                            }
                        }
                        b"w:br" => {
                            if let Some((text, _, _)) = &mut current {
                                text.push('\n');
                            }
                        }
                        b"w:cr" => {
                            if let Some((text, _, _)) = &mut current {
                                text.push('\r');
                            }
                        }
                        // Field codes and embedded objects carry no line text.
                        b"w:instrText" | b"w:sym" | b"w:drawing" | b"w:pict" | b"w:object"
                            if !empty =>
                        {
                            reader
                                .read_to_end_into(e.to_end().name(), &mut skip_buf)
                                .map_err(|err| Error::XmlParse(err.to_string()))?;
                        }
                        _ => {}
                    }
                }
                Event::Text(ref t) => {
                    if in_text {
                        if let Some((text, _, _)) = &mut current {
                            let decoded =
                                t.unescape().map_err(|e| Error::XmlParse(e.to_string()))?;
                            text.push_str(&decoded);
                        }
                    }
                }
                Event::End(ref e) => match e.name().as_ref() {
                    b"w:pPr" => in_ppr = false,
                    b"w:rPr" => in_rpr = false,
                    b"w:t" => in_text = false,
                    b"w:r" => {
                        if let Some((text, r_style, direct)) = current.take() {
                            let mut props = para_props.clone();
                            if let Some(style_id) = r_style.as_deref() {
                                props.apply(
                                    &self
                                        .styles
                                        .chain_overrides(style_id, StyleFamily::Character),
                                );
                            }
                            props.apply(&direct);
                            push_run(runs, Run { text, properties: props });
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }
}

/// Append a run, coalescing with the previous one when no annotation could
/// tell them apart. Empty runs vanish.
fn push_run(runs: &mut Vec<Run>, run: Run) {
    if run.text.is_empty() {
        return;
    }
    if let Some(last) = runs.last_mut() {
        if last.properties.same_run_formatting(&run.properties) {
            last.text.push_str(&run.text);
            return;
        }
    }
    runs.push(run);
}
