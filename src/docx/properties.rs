//! Direct formatting extraction from `pPr`/`rPr` XML.
//!
//! The same property tags appear in `styles.xml` (inside style definitions
//! and `docDefaults`), in `numbering.xml` (inside level definitions) and in
//! `document.xml` (direct formatting); the tag handlers here are shared by
//! all three parsers.

use crate::model::{Alignment, PropertyOverrides};
use quick_xml::events::BytesStart;

/// Get an attribute value as a string, with XML entities unescaped.
pub(crate) fn attr_val(e: &BytesStart, key: &[u8]) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == key {
            return attr.unescape_value().ok().map(|v| v.to_string());
        }
    }
    None
}

/// Get a boolean attribute value (`"0"`/`"false"` are false, anything else
/// true). `None` when the attribute is absent.
pub(crate) fn bool_attr(e: &BytesStart, key: &[u8]) -> Option<bool> {
    attr_val(e, key).map(|val| val != "0" && val != "false")
}

/// Apply one run-scoped property tag (`w:sz`, `w:b`, `w:i`, `w:u`) to a
/// partial record. Returns true when the tag was recognized.
pub(crate) fn apply_run_property(overrides: &mut PropertyOverrides, e: &BytesStart) -> bool {
    match e.name().as_ref() {
        b"w:sz" => {
            if let Some(val) = attr_val(e, b"w:val") {
                if let Ok(size) = val.parse() {
                    overrides.size = Some(size);
                }
            }
            true
        }
        // An empty <w:b/> means "on"; <w:b w:val="0"/> means "off".
        b"w:b" => {
            overrides.bold = Some(bool_attr(e, b"w:val").unwrap_or(true));
            true
        }
        b"w:i" => {
            overrides.italic = Some(bool_attr(e, b"w:val").unwrap_or(true));
            true
        }
        b"w:u" => {
            if let Some(val) = attr_val(e, b"w:val") {
                overrides.underlined = Some(val != "none");
            }
            true
        }
        _ => false,
    }
}

/// Apply one paragraph-scoped property tag (`w:jc`, `w:ind`) to a partial
/// record. The four indentation attributes are read independently; an `ind`
/// tag setting only `w:left` leaves the other offsets unset.
pub(crate) fn apply_paragraph_property(overrides: &mut PropertyOverrides, e: &BytesStart) -> bool {
    match e.name().as_ref() {
        b"w:jc" => {
            if let Some(val) = attr_val(e, b"w:val") {
                if let Some(alignment) = Alignment::parse(&val) {
                    overrides.alignment = Some(alignment);
                }
            }
            true
        }
        b"w:ind" => {
            let ind = &mut overrides.indentation;
            for (key, slot) in [
                (&b"w:firstLine"[..], &mut ind.first_line),
                (&b"w:hanging"[..], &mut ind.hanging),
                (&b"w:start"[..], &mut ind.start),
                (&b"w:left"[..], &mut ind.left),
            ] {
                if let Some(val) = attr_val(e, key) {
                    if let Ok(v) = val.parse() {
                        *slot = Some(v);
                    }
                }
            }
            true
        }
        _ => false,
    }
}

/// Parse every recognized property tag in an XML fragment into one partial
/// record, ignoring element nesting. Suitable for isolated `pPr`/`rPr`
/// fragments; the document and style parsers track context themselves.
#[cfg(test)]
pub(crate) fn parse_properties(xml: &str) -> PropertyOverrides {
    use quick_xml::events::Event;

    let mut overrides = PropertyOverrides::default();
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if !apply_run_property(&mut overrides, &e) {
                    apply_paragraph_property(&mut overrides, &e);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    overrides
}
