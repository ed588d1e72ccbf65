//! DOCX document parser façade.
//!
//! [`DocxParser`] owns the whole pipeline for one file: open the container,
//! build the style and numbering tables, walk every paragraph-bearing part in
//! a fixed order (headers, body, footers, footnotes, endnotes) through one
//! shared [`ParagraphBuilder`], and memoize the line output. Parsing happens
//! at most once per parser; repeated line requests return the same records.

use crate::container::OoxmlContainer;
use crate::error::{Error, Result};
use crate::model::{LineRecord, Origin};
use md5::{Digest, Md5};
use std::path::{Path, PathBuf};

use super::numbering::NumberingTable;
use super::paragraph::{Paragraph, ParagraphBuilder};
use super::styles::StyleTable;

/// Lifecycle of a [`DocxParser`]. A failed parse is terminal: the parser
/// reports the failure on every subsequent request instead of retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    Unparsed,
    Parsing,
    Parsed,
    Failed,
}

/// Parser for one DOCX file.
pub struct DocxParser {
    path: PathBuf,
    state: ParseState,
    /// Hex MD5 of the file bytes; line uids are `"{hash}_{ordinal}"`.
    hash: String,
    paragraphs: Vec<Paragraph>,
    lines_with_meta: Option<Vec<LineRecord>>,
    lines: Option<Vec<String>>,
}

/// Paragraph-bearing parts in output order. Headers come before the body,
/// footers and notes after it.
const HEADER_PARTS: [&str; 3] = ["word/header1.xml", "word/header2.xml", "word/header3.xml"];
const FOOTER_PARTS: [&str; 3] = ["word/footer1.xml", "word/footer2.xml", "word/footer3.xml"];

impl DocxParser {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: ParseState::Unparsed,
            hash: String::new(),
            paragraphs: Vec::new(),
            lines_with_meta: None,
            lines: None,
        }
    }

    /// Whether a path looks like a DOCX file (by extension only; the content
    /// is checked when parsing).
    pub fn can_parse(path: impl AsRef<Path>) -> bool {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("docx"))
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Parse the document. An explicit call on an already-parsed document
    /// re-parses from disk and discards the memoized lines; a call after a
    /// failure reports the failure again.
    pub fn parse(&mut self) -> Result<()> {
        if self.state == ParseState::Failed {
            return Err(self.failed_error());
        }

        self.state = ParseState::Parsing;
        self.lines = None;
        self.lines_with_meta = None;
        match self.parse_inner() {
            Ok(()) => {
                self.state = ParseState::Parsed;
                Ok(())
            }
            Err(e) => {
                self.state = ParseState::Failed;
                Err(e)
            }
        }
    }

    fn failed_error(&self) -> Error {
        Error::InvalidData(format!(
            "document '{}' previously failed to parse",
            self.path.display()
        ))
    }

    /// Parse only if the document has not been parsed yet.
    fn ensure_parsed(&mut self) -> Result<()> {
        match self.state {
            ParseState::Parsed => Ok(()),
            ParseState::Failed => Err(self.failed_error()),
            ParseState::Unparsed | ParseState::Parsing => self.parse(),
        }
    }

    fn parse_inner(&mut self) -> Result<()> {
        log::debug!("parsing '{}'", self.path.display());
        let data = std::fs::read(&self.path)?;

        let mut hasher = Md5::new();
        hasher.update(&data);
        self.hash = format!("{:x}", hasher.finalize());

        let container = OoxmlContainer::from_bytes(data)?;

        // Some producers write the body to document2.xml.
        let document_xml = container
            .read_xml("word/document.xml")
            .or_else(|_| container.read_xml("word/document2.xml"))?;
        let styles = StyleTable::parse(&container.read_xml("word/styles.xml")?)?;
        let numbering = match container.read_xml("word/numbering.xml") {
            Ok(xml) => Some(NumberingTable::parse(&xml)?),
            Err(Error::MissingComponent(_)) => None,
            Err(e) => return Err(e),
        };

        // One builder for the whole document: list counters run across parts.
        let mut builder = ParagraphBuilder::new(&styles, numbering.as_ref());
        let mut paragraphs = Vec::new();

        let collect_part = |part: &str,
                            origin: Origin,
                            builder: &mut ParagraphBuilder,
                            paragraphs: &mut Vec<Paragraph>| {
            if !container.exists(part) {
                return Ok(());
            }
            let xml = container.read_xml(part)?;
            for fragment in collect_paragraph_xml(&xml, None)? {
                paragraphs.push(builder.build(&fragment, origin)?);
            }
            Ok::<(), Error>(())
        };

        for part in HEADER_PARTS {
            collect_part(part, Origin::Header, &mut builder, &mut paragraphs)?;
        }
        for fragment in collect_paragraph_xml(&document_xml, Some(b"w:body"))? {
            paragraphs.push(builder.build(&fragment, Origin::Body)?);
        }
        for part in FOOTER_PARTS {
            collect_part(part, Origin::Footer, &mut builder, &mut paragraphs)?;
        }
        collect_part("word/footnotes.xml", Origin::Footnote, &mut builder, &mut paragraphs)?;
        collect_part("word/endnotes.xml", Origin::Endnote, &mut builder, &mut paragraphs)?;

        log::debug!(
            "parsed '{}': {} paragraphs",
            self.path.display(),
            paragraphs.len()
        );
        self.paragraphs = paragraphs;
        Ok(())
    }

    /// All paragraph texts in document order, empty paragraphs included.
    pub fn get_lines(&mut self) -> Result<Vec<String>> {
        self.ensure_parsed()?;
        if self.lines.is_none() {
            self.lines = Some(self.paragraphs.iter().map(|p| p.text()).collect());
        }
        Ok(self.lines.clone().unwrap_or_default())
    }

    /// Annotated line records in document order. Empty paragraphs are
    /// dropped; uid ordinals count only the lines kept, so the output is
    /// stable across repeated calls.
    pub fn get_lines_with_meta(&mut self) -> Result<Vec<LineRecord>> {
        self.ensure_parsed()?;
        if self.lines_with_meta.is_none() {
            let mut records = Vec::new();
            for para in &self.paragraphs {
                if para.is_empty() {
                    continue;
                }
                let uid = format!("{}_{}", self.hash, records.len());
                records.push(para.clone().into_line_record(uid));
            }
            self.lines_with_meta = Some(records);
        }
        Ok(self.lines_with_meta.clone().unwrap_or_default())
    }
}

/// Cut a part's XML into standalone `w:p` fragments by re-serializing the
/// event stream. Paragraphs inside tables are skipped wholesale. When `gate`
/// is given, only content inside that element is considered (the body part
/// wraps everything else in `w:document`).
pub(crate) fn collect_paragraph_xml(xml: &str, gate: Option<&[u8]>) -> Result<Vec<String>> {
    let mut fragments = Vec::new();
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut in_scope = gate.is_none();
    let mut in_paragraph = false;
    let mut table_depth: u32 = 0;
    let mut paragraph_xml = String::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| Error::XmlParse(e.to_string()))?;
        match event {
            quick_xml::events::Event::Start(ref e) => {
                let name = e.name();
                if Some(name.as_ref()) == gate {
                    in_scope = true;
                } else if name.as_ref() == b"w:tbl" && in_scope {
                    table_depth += 1;
                } else if name.as_ref() == b"w:p" && in_scope && table_depth == 0 && !in_paragraph
                {
                    in_paragraph = true;
                    paragraph_xml.clear();
                    write_open_tag(&mut paragraph_xml, e, false);
                } else if in_paragraph {
                    write_open_tag(&mut paragraph_xml, e, false);
                }
            }
            quick_xml::events::Event::Empty(ref e) => {
                if in_paragraph {
                    write_open_tag(&mut paragraph_xml, e, true);
                } else if e.name().as_ref() == b"w:p" && in_scope && table_depth == 0 {
                    // Self-closing empty paragraph.
                    let mut fragment = String::new();
                    write_open_tag(&mut fragment, e, true);
                    fragments.push(fragment);
                }
            }
            quick_xml::events::Event::Text(ref t) => {
                if in_paragraph {
                    let text = t.unescape().map_err(|e| Error::XmlParse(e.to_string()))?;
                    paragraph_xml.push_str(&escape_xml(&text));
                }
            }
            quick_xml::events::Event::End(ref e) => {
                let name = e.name();
                if Some(name.as_ref()) == gate {
                    in_scope = false;
                } else if name.as_ref() == b"w:tbl" && table_depth > 0 {
                    table_depth -= 1;
                } else if name.as_ref() == b"w:p" && in_paragraph {
                    paragraph_xml.push_str("</w:p>");
                    fragments.push(std::mem::take(&mut paragraph_xml));
                    in_paragraph = false;
                } else if in_paragraph {
                    paragraph_xml.push_str("</");
                    paragraph_xml.push_str(&String::from_utf8_lossy(name.as_ref()));
                    paragraph_xml.push('>');
                }
            }
            quick_xml::events::Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(fragments)
}

fn write_open_tag(out: &mut String, e: &quick_xml::events::BytesStart, self_closing: bool) {
    out.push('<');
    out.push_str(&String::from_utf8_lossy(e.name().as_ref()));
    for attr in e.attributes().flatten() {
        out.push(' ');
        out.push_str(&String::from_utf8_lossy(attr.key.as_ref()));
        out.push_str("=\"");
        // Attribute bytes are still escaped as in the source; copying them
        // verbatim keeps entities single-escaped through the round trip.
        out.push_str(&String::from_utf8_lossy(&attr.value));
        out.push('"');
    }
    out.push_str(if self_closing { "/>" } else { ">" });
}

/// Escape XML special characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnnotationKind;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    const MINIMAL_STYLES: &str = r#"<w:styles xmlns:w="http://example"/>"#;

    fn docx_file(entries: &[(&str, &str)]) -> tempfile::NamedTempFile {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        let data = writer.finish().unwrap().into_inner();

        let mut file = tempfile::Builder::new().suffix(".docx").tempfile().unwrap();
        file.write_all(&data).unwrap();
        file
    }

    #[test]
    fn test_can_parse() {
        assert!(DocxParser::can_parse("report.docx"));
        assert!(DocxParser::can_parse("REPORT.DOCX"));
        assert!(!DocxParser::can_parse("report.doc"));
        assert!(!DocxParser::can_parse("report"));
    }

    #[test]
    fn test_collect_paragraph_xml_gated() {
        let xml = r#"<w:document>
            <w:ignored><w:p><w:r><w:t>outside</w:t></w:r></w:p></w:ignored>
            <w:body>
                <w:p><w:r><w:t>first</w:t></w:r></w:p>
                <w:p><w:r><w:t>second</w:t></w:r></w:p>
            </w:body>
        </w:document>"#;

        let fragments = collect_paragraph_xml(xml, Some(b"w:body")).unwrap();
        assert_eq!(fragments.len(), 2);
        assert!(fragments[0].contains("first"));
        assert!(fragments[1].contains("second"));
    }

    #[test]
    fn test_collect_paragraph_xml_skips_tables() {
        let xml = r#"<w:body>
            <w:p><w:r><w:t>before</w:t></w:r></w:p>
            <w:tbl><w:tr><w:tc>
                <w:p><w:r><w:t>cell</w:t></w:r></w:p>
                <w:tbl><w:tr><w:tc><w:p><w:r><w:t>nested</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
            </w:tc></w:tr></w:tbl>
            <w:p><w:r><w:t>after</w:t></w:r></w:p>
        </w:body>"#;

        let fragments = collect_paragraph_xml(xml, Some(b"w:body")).unwrap();
        assert_eq!(fragments.len(), 2);
        assert!(fragments[0].contains("before"));
        assert!(fragments[1].contains("after"));
    }

    #[test]
    fn test_collect_preserves_attributes_and_text() {
        let xml = r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:t xml:space="preserve">a &amp; b </w:t></w:r></w:p>"#;
        let fragments = collect_paragraph_xml(xml, None).unwrap();
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].contains(r#"<w:jc w:val="center"/>"#));
        assert!(fragments[0].contains("a &amp; b "));
    }

    #[test]
    fn test_attribute_entities_stay_single_escaped() {
        let xml = r#"<w:p><w:pPr><w:pStyle w:val="A&amp;B"/></w:pPr><w:r><w:t>x</w:t></w:r></w:p>"#;
        let fragments = collect_paragraph_xml(xml, None).unwrap();
        assert!(fragments[0].contains(r#"<w:pStyle w:val="A&amp;B"/>"#));
    }

    #[test]
    fn test_style_id_with_entity_resolves_after_roundtrip() {
        let file = docx_file(&[
            (
                "word/document.xml",
                r#"<w:document><w:body>
                    <w:p><w:pPr><w:pStyle w:val="A&amp;B"/></w:pPr><w:r><w:t>text</w:t></w:r></w:p>
                </w:body></w:document>"#,
            ),
            (
                "word/styles.xml",
                r#"<w:styles xmlns:w="http://example">
                    <w:style w:type="paragraph" w:styleId="A&amp;B">
                        <w:name w:val="Q&amp;A"/>
                        <w:rPr><w:b/></w:rPr>
                    </w:style>
                </w:styles>"#,
            ),
        ]);

        let mut parser = DocxParser::new(file.path());
        let records = parser.get_lines_with_meta().unwrap();

        let line = &records[0];
        assert_eq!(line.text, "text");
        assert!(line.has_annotation(AnnotationKind::Style, "q&a"));
        assert!(line.has_annotation(AnnotationKind::Bold, "True"));
    }

    #[test]
    fn test_parse_and_memoize() {
        let file = docx_file(&[
            (
                "word/document.xml",
                r#"<w:document><w:body>
                    <w:p><w:r><w:t>Hello</w:t></w:r></w:p>
                    <w:p/>
                    <w:p><w:r><w:t>World</w:t></w:r></w:p>
                </w:body></w:document>"#,
            ),
            ("word/styles.xml", MINIMAL_STYLES),
        ]);

        let mut parser = DocxParser::new(file.path());
        assert_eq!(parser.state(), ParseState::Unparsed);

        let lines = parser.get_lines().unwrap();
        assert_eq!(parser.state(), ParseState::Parsed);
        assert_eq!(lines, vec!["Hello", "", "World"]);

        // Empty paragraphs are dropped and ordinals count kept lines only.
        let records = parser.get_lines_with_meta().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].uid.ends_with("_0"));
        assert!(records[1].uid.ends_with("_1"));
        let (hash, _) = records[0].uid.split_once('_').unwrap();
        assert_eq!(hash.len(), 32);

        let again = parser.get_lines_with_meta().unwrap();
        assert_eq!(records, again);
    }

    #[test]
    fn test_document2_fallback() {
        let file = docx_file(&[
            (
                "word/document2.xml",
                r#"<w:document><w:body><w:p><w:r><w:t>alt body</w:t></w:r></w:p></w:body></w:document>"#,
            ),
            ("word/styles.xml", MINIMAL_STYLES),
        ]);

        let mut parser = DocxParser::new(file.path());
        assert_eq!(parser.get_lines().unwrap(), vec!["alt body"]);
    }

    #[test]
    fn test_missing_styles_is_fatal() {
        let file = docx_file(&[(
            "word/document.xml",
            r#"<w:document><w:body/></w:document>"#,
        )]);

        let mut parser = DocxParser::new(file.path());
        let err = parser.parse().unwrap_err();
        assert!(matches!(err, Error::MissingComponent(_)));
        assert_eq!(parser.state(), ParseState::Failed);

        // Failure is terminal; later requests do not retry.
        assert!(parser.get_lines().is_err());
    }

    #[test]
    fn test_part_order_and_origins() {
        let file = docx_file(&[
            (
                "word/document.xml",
                r#"<w:document><w:body><w:p><w:r><w:t>body</w:t></w:r></w:p></w:body></w:document>"#,
            ),
            ("word/styles.xml", MINIMAL_STYLES),
            (
                "word/header1.xml",
                r#"<w:hdr><w:p><w:r><w:t>header</w:t></w:r></w:p></w:hdr>"#,
            ),
            (
                "word/footer1.xml",
                r#"<w:ftr><w:p><w:r><w:t>footer</w:t></w:r></w:p></w:ftr>"#,
            ),
            (
                "word/footnotes.xml",
                r#"<w:footnotes><w:footnote><w:p><w:r><w:t>note</w:t></w:r></w:p></w:footnote></w:footnotes>"#,
            ),
        ]);

        let mut parser = DocxParser::new(file.path());
        let records = parser.get_lines_with_meta().unwrap();

        let texts: Vec<_> = records.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["header", "body", "footer", "note"]);
        assert_eq!(records[0].origin, Origin::Header);
        assert_eq!(records[1].origin, Origin::Body);
        assert_eq!(records[2].origin, Origin::Footer);
        assert_eq!(records[3].origin, Origin::Footnote);
    }
}
