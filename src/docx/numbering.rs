//! DOCX numbering (list) definitions and counter replay.
//!
//! `numbering.xml` holds reusable `abstractNum` definitions and `num`
//! instances binding them to the IDs paragraphs reference. Marker text is
//! produced by substituting `%N` placeholders in a level's text template
//! with running counters, replayed strictly in document order through
//! [`CounterState`].

use crate::error::{Error, Result};
use crate::model::PropertyOverrides;
use std::collections::{HashMap, HashSet};

use super::properties::{apply_paragraph_property, apply_run_property, attr_val};
use super::styles::StyleTable;

/// Number format of one list level (`w:numFmt`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NumberFormat {
    #[default]
    Decimal,
    Bullet,
    LowerLetter,
    UpperLetter,
    LowerRoman,
    UpperRoman,
    RussianLower,
    RussianUpper,
    None,
}

impl NumberFormat {
    fn parse(val: &str) -> Self {
        match val {
            "decimal" => NumberFormat::Decimal,
            "bullet" => NumberFormat::Bullet,
            "lowerLetter" => NumberFormat::LowerLetter,
            "upperLetter" => NumberFormat::UpperLetter,
            "lowerRoman" => NumberFormat::LowerRoman,
            "upperRoman" => NumberFormat::UpperRoman,
            "russianLower" => NumberFormat::RussianLower,
            "russianUpper" => NumberFormat::RussianUpper,
            "none" => NumberFormat::None,
            other => {
                log::warn!("unknown numFmt '{}', rendering as decimal", other);
                NumberFormat::Decimal
            }
        }
    }
}

/// Marker suffix (`w:suff`): what separates the marker from the paragraph
/// text. Defaults to a tab.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MarkerSuffix {
    #[default]
    Tab,
    Space,
    Nothing,
}

impl MarkerSuffix {
    fn parse(val: &str) -> Self {
        match val {
            "space" => MarkerSuffix::Space,
            "nothing" => MarkerSuffix::Nothing,
            _ => MarkerSuffix::Tab,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerSuffix::Tab => "\t",
            MarkerSuffix::Space => " ",
            MarkerSuffix::Nothing => "",
        }
    }
}

/// One list level definition (`w:lvl`).
#[derive(Debug, Clone)]
pub struct NumberingLevel {
    /// Level index (0-based `ilvl`).
    pub level: u8,
    /// Start value (`w:start`).
    pub start: u32,
    /// Text template with `%N` placeholders (e.g. `"%1.%2."`).
    pub template: String,
    pub format: NumberFormat,
    /// `lvlRestart`: restart this level's counter when entered from a
    /// shallower level. Defaults to true.
    pub restart: bool,
    pub suffix: MarkerSuffix,
    /// Paragraph-scoped overrides from the level's `pPr` (indentation).
    pub paragraph_overrides: PropertyOverrides,
    /// Run-scoped overrides from the level's `rPr`, applied to the
    /// synthetic marker run.
    pub run_overrides: PropertyOverrides,
}

impl Default for NumberingLevel {
    fn default() -> Self {
        Self {
            level: 0,
            start: 1,
            template: String::new(),
            format: NumberFormat::Decimal,
            restart: true,
            suffix: MarkerSuffix::Tab,
            paragraph_overrides: PropertyOverrides::default(),
            run_overrides: PropertyOverrides::default(),
        }
    }
}

/// Reusable list definition (`w:abstractNum`).
#[derive(Debug, Clone, Default)]
pub struct AbstractNumbering {
    pub id: String,
    /// Indirection to a numbering-family style (`w:numStyleLink`).
    pub num_style_link: Option<String>,
    /// Reverse binding (`w:styleLink`); kept for completeness.
    pub style_link: Option<String>,
    /// `restartNumberingAfterBreak`: when the document switches away from
    /// this numbering, all counters restart. Defaults to true.
    pub restart: bool,
    pub levels: HashMap<u8, NumberingLevel>,
}

/// Per-level override carried by a `num` instance (`w:lvlOverride`).
#[derive(Debug, Clone, Default)]
pub struct LevelOverride {
    pub start_override: Option<u32>,
    /// Full replacement level, when the override carries its own `w:lvl`.
    pub level: Option<NumberingLevel>,
}

/// Concrete numbering instance (`w:num`), as referenced by paragraphs.
#[derive(Debug, Clone, Default)]
pub struct NumberingInstance {
    pub num_id: String,
    pub abstract_num_id: String,
    pub overrides: HashMap<u8, LevelOverride>,
}

/// Lookup table over `numbering.xml`.
#[derive(Debug, Clone, Default)]
pub struct NumberingTable {
    abstract_nums: HashMap<String, AbstractNumbering>,
    instances: HashMap<String, NumberingInstance>,
}

/// Where a `w:lvl` currently being parsed belongs.
#[derive(PartialEq)]
enum LevelScope {
    Abstract,
    Override,
}

impl NumberingTable {
    /// Parse `numbering.xml` into a lookup table.
    pub fn parse(xml: &str) -> Result<Self> {
        if xml.trim().is_empty() {
            return Ok(Self::default());
        }

        let mut table = NumberingTable::default();
        let mut reader = quick_xml::Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut current_abstract: Option<AbstractNumbering> = None;
        let mut current_instance: Option<NumberingInstance> = None;
        let mut current_override: Option<(u8, LevelOverride)> = None;
        let mut current_level: Option<NumberingLevel> = None;
        let mut level_scope = LevelScope::Abstract;
        let mut level_is_legal = false;
        let mut in_ppr = false;
        let mut in_rpr = false;

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| Error::XmlParse(e.to_string()))?;
            match event {
                quick_xml::events::Event::Start(ref e) | quick_xml::events::Event::Empty(ref e) => {
                    let empty = matches!(event, quick_xml::events::Event::Empty(_));
                    match e.name().as_ref() {
                        b"w:abstractNum" => {
                            let mut abstract_num = AbstractNumbering {
                                id: attr_val(e, b"w:abstractNumId").unwrap_or_default(),
                                restart: true,
                                ..Default::default()
                            };
                            // namespace prefix varies (w15 etc.)
                            for attr in e.attributes().flatten() {
                                if attr.key.as_ref().ends_with(b"restartNumberingAfterBreak") {
                                    let val = String::from_utf8_lossy(&attr.value);
                                    abstract_num.restart = val != "0" && val != "false";
                                }
                            }
                            if empty {
                                table
                                    .abstract_nums
                                    .insert(abstract_num.id.clone(), abstract_num);
                            } else {
                                current_abstract = Some(abstract_num);
                            }
                        }
                        b"w:numStyleLink" => {
                            if let (Some(abs), Some(val)) =
                                (&mut current_abstract, attr_val(e, b"w:val"))
                            {
                                abs.num_style_link = Some(val);
                            }
                        }
                        b"w:styleLink" => {
                            if let (Some(abs), Some(val)) =
                                (&mut current_abstract, attr_val(e, b"w:val"))
                            {
                                abs.style_link = Some(val);
                            }
                        }
                        b"w:lvl" if !empty => {
                            let ilvl = attr_val(e, b"w:ilvl")
                                .and_then(|v| v.parse().ok())
                                .unwrap_or(0);
                            current_level = Some(NumberingLevel {
                                level: ilvl,
                                ..Default::default()
                            });
                            level_scope = if current_override.is_some() {
                                LevelScope::Override
                            } else {
                                LevelScope::Abstract
                            };
                            level_is_legal = false;
                        }
                        b"w:start" => {
                            if let (Some(level), Some(val)) =
                                (&mut current_level, attr_val(e, b"w:val"))
                            {
                                level.start = val.parse().unwrap_or(1);
                            }
                        }
                        b"w:numFmt" => {
                            if let (Some(level), Some(val)) =
                                (&mut current_level, attr_val(e, b"w:val"))
                            {
                                level.format = NumberFormat::parse(&val);
                            }
                        }
                        b"w:lvlText" => {
                            if let (Some(level), Some(val)) =
                                (&mut current_level, attr_val(e, b"w:val"))
                            {
                                level.template = val;
                            }
                        }
                        b"w:lvlRestart" => {
                            if let (Some(level), Some(val)) =
                                (&mut current_level, attr_val(e, b"w:val"))
                            {
                                level.restart = val != "0" && val != "false";
                            }
                        }
                        b"w:suff" => {
                            if let (Some(level), Some(val)) =
                                (&mut current_level, attr_val(e, b"w:val"))
                            {
                                level.suffix = MarkerSuffix::parse(&val);
                            }
                        }
                        b"w:isLgl" => {
                            if current_level.is_some() {
                                level_is_legal = true;
                            }
                        }
                        b"w:pPr" if current_level.is_some() && !empty => in_ppr = true,
                        b"w:rPr" if current_level.is_some() && !empty => in_rpr = true,
                        b"w:num" => {
                            let instance = NumberingInstance {
                                num_id: attr_val(e, b"w:numId").unwrap_or_default(),
                                ..Default::default()
                            };
                            if empty {
                                table.instances.insert(instance.num_id.clone(), instance);
                            } else {
                                current_instance = Some(instance);
                            }
                        }
                        b"w:abstractNumId" => {
                            if let (Some(instance), Some(val)) =
                                (&mut current_instance, attr_val(e, b"w:val"))
                            {
                                instance.abstract_num_id = val;
                            }
                        }
                        b"w:lvlOverride" => {
                            let ilvl = attr_val(e, b"w:ilvl")
                                .and_then(|v| v.parse().ok())
                                .unwrap_or(0);
                            if empty {
                                if let Some(instance) = &mut current_instance {
                                    instance.overrides.insert(ilvl, LevelOverride::default());
                                }
                            } else {
                                current_override = Some((ilvl, LevelOverride::default()));
                            }
                        }
                        b"w:startOverride" => {
                            if let (Some((_, ovr)), Some(val)) =
                                (&mut current_override, attr_val(e, b"w:val"))
                            {
                                ovr.start_override = val.parse().ok();
                            }
                        }
                        _ => {
                            if let Some(level) = &mut current_level {
                                if in_rpr {
                                    apply_run_property(&mut level.run_overrides, e);
                                } else if in_ppr {
                                    apply_paragraph_property(&mut level.paragraph_overrides, e);
                                }
                            }
                        }
                    }
                }
                quick_xml::events::Event::End(ref e) => match e.name().as_ref() {
                    b"w:abstractNum" => {
                        if let Some(abstract_num) = current_abstract.take() {
                            table
                                .abstract_nums
                                .insert(abstract_num.id.clone(), abstract_num);
                        }
                    }
                    b"w:lvl" => {
                        if let Some(mut level) = current_level.take() {
                            if level_is_legal {
                                level.format = NumberFormat::Decimal;
                            }
                            match level_scope {
                                LevelScope::Override => {
                                    if let Some((_, ovr)) = &mut current_override {
                                        ovr.level = Some(level);
                                    }
                                }
                                LevelScope::Abstract => {
                                    if let Some(abs) = &mut current_abstract {
                                        abs.levels.insert(level.level, level);
                                    }
                                }
                            }
                        }
                        in_ppr = false;
                        in_rpr = false;
                    }
                    b"w:lvlOverride" => {
                        if let (Some(instance), Some((ilvl, ovr))) =
                            (&mut current_instance, current_override.take())
                        {
                            instance.overrides.insert(ilvl, ovr);
                        }
                    }
                    b"w:num" => {
                        if let Some(instance) = current_instance.take() {
                            table.instances.insert(instance.num_id.clone(), instance);
                        }
                    }
                    b"w:pPr" => in_ppr = false,
                    b"w:rPr" => in_rpr = false,
                    _ => {}
                },
                quick_xml::events::Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(table)
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Resolve a paragraph's `numId` to its abstract definition, following
    /// `numStyleLink` indirection through the style table. Returns the
    /// final abstract (the counter identity) and the directly-referenced
    /// instance (whose `lvlOverride`s still apply).
    fn resolve_abstract(
        &self,
        num_id: &str,
        styles: &StyleTable,
    ) -> Option<(&AbstractNumbering, &NumberingInstance)> {
        let instance = self.instances.get(num_id)?;
        let mut abs = self.abstract_nums.get(&instance.abstract_num_id)?;

        let mut visited: HashSet<&str> = HashSet::new();
        while let Some(link) = abs.num_style_link.as_deref() {
            if !visited.insert(abs.id.as_str()) {
                log::warn!("numStyleLink cycle at abstract numbering '{}'", abs.id);
                break;
            }
            let Some(target_num) = styles.numbering_style_target(link) else {
                log::warn!("numStyleLink '{}' does not resolve to a numbering style", link);
                break;
            };
            let Some(next) = self
                .instances
                .get(target_num)
                .and_then(|i| self.abstract_nums.get(&i.abstract_num_id))
            else {
                break;
            };
            abs = next;
        }

        Some((abs, instance))
    }

    /// The abstract definition behind a `numId`, if resolvable.
    pub fn abstract_numbering(
        &self,
        num_id: &str,
        styles: &StyleTable,
    ) -> Option<&AbstractNumbering> {
        self.resolve_abstract(num_id, styles).map(|(abs, _)| abs)
    }

    /// The effective level definition for `(numId, ilvl)`: the abstract
    /// level with the instance's `lvlOverride` applied on top.
    pub fn level(
        &self,
        num_id: &str,
        ilvl: u8,
        styles: &StyleTable,
    ) -> Option<NumberingLevel> {
        let (abs, instance) = self.resolve_abstract(num_id, styles)?;
        let mut level = abs.levels.get(&ilvl).cloned();
        if let Some(ovr) = instance.overrides.get(&ilvl) {
            if let Some(replacement) = &ovr.level {
                level = Some(replacement.clone());
            }
            if let (Some(level), Some(start)) = (&mut level, ovr.start_override) {
                level.start = start;
            }
        }
        level
    }

    /// Render the marker text for `(numId, ilvl)` from the current counter
    /// state: the level's template with each `%N` replaced by the rendered
    /// counter of level N-1, plus the suffix. Dangling references yield an
    /// empty marker, never an error.
    pub fn marker_text(
        &self,
        num_id: &str,
        ilvl: u8,
        counters: &CounterState,
        styles: &StyleTable,
    ) -> String {
        let Some((abs, _)) = self.resolve_abstract(num_id, styles) else {
            return String::new();
        };
        let Some(level) = self.level(num_id, ilvl, styles) else {
            return String::new();
        };

        let mut out = String::new();
        let mut chars = level.template.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            let mut digits = String::new();
            while let Some(&d) = chars.peek() {
                if !d.is_ascii_digit() {
                    break;
                }
                digits.push(d);
                chars.next();
            }
            let Ok(n) = digits.parse::<u8>() else {
                out.push('%');
                continue;
            };
            if n == 0 {
                continue;
            }
            let ref_lvl = n - 1;
            let ref_level = self.level(num_id, ref_lvl, styles);
            let value = counters
                .value(&abs.id, ref_lvl)
                .or_else(|| ref_level.as_ref().map(|l| l.start))
                .unwrap_or(1);
            let format = ref_level.map(|l| l.format).unwrap_or_default();
            out.push_str(&render_number(value, format));
        }
        out.push_str(level.suffix.as_str());
        out
    }

    /// Advance the counters for one numbered paragraph and render its
    /// marker. This is the one orchestration point callers use, so the
    /// update-then-render order cannot be gotten wrong.
    pub fn next_marker(
        &self,
        num_id: &str,
        ilvl: u8,
        counters: &mut CounterState,
        styles: &StyleTable,
    ) -> Option<(String, NumberingLevel)> {
        let (abs, _) = self.resolve_abstract(num_id, styles)?;
        let level = self.level(num_id, ilvl, styles)?;
        let identity = abs.id.clone();
        counters.advance(abs, &identity, ilvl, &level);
        let text = self.marker_text(num_id, ilvl, counters, styles);
        Some((text, level))
    }
}

/// Running list counters, keyed by (abstract numbering identity, level).
///
/// Mutated strictly in document order; the transition rules live in
/// [`CounterState::advance`] so the restart policy is one auditable
/// function.
#[derive(Debug, Clone, Default)]
pub struct CounterState {
    counters: HashMap<(String, u8), u32>,
    prev: Option<PrevMark>,
}

#[derive(Debug, Clone)]
struct PrevMark {
    identity: String,
    level: u8,
    /// The previous abstract's restart-on-change flag.
    restart_on_change: bool,
}

impl CounterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current counter value, if the level has been entered.
    pub fn value(&self, identity: &str, level: u8) -> Option<u32> {
        self.counters.get(&(identity.to_string(), level)).copied()
    }

    /// Apply the transition rules for one numbered paragraph. Must be called
    /// exactly once per numbered paragraph, in document order, before the
    /// marker text is rendered.
    ///
    /// Policy order: (1) identity change with the previous instance marked
    /// restart clears everything; (2) an unseen level initializes to its
    /// start, a strictly-deeper transition with `lvlRestart` resets to
    /// start, anything else increments; (3) a shallower transition clears
    /// deeper restartable levels so they start over on next entry.
    pub fn advance(
        &mut self,
        abs: &AbstractNumbering,
        identity: &str,
        ilvl: u8,
        level: &NumberingLevel,
    ) {
        if let Some(prev) = &self.prev {
            if prev.identity != identity && prev.restart_on_change {
                self.counters.clear();
            }
        }

        let same_identity_prev = self
            .prev
            .as_ref()
            .filter(|p| p.identity == identity)
            .map(|p| p.level);

        let key = (identity.to_string(), ilvl);
        match self.counters.entry(key) {
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(level.start);
            }
            std::collections::hash_map::Entry::Occupied(mut entry) => {
                let deeper = same_identity_prev.map_or(false, |prev_lvl| ilvl > prev_lvl);
                if deeper && level.restart {
                    entry.insert(level.start);
                } else {
                    *entry.get_mut() += 1;
                }
            }
        }

        if let Some(prev_lvl) = same_identity_prev {
            if ilvl < prev_lvl {
                for (deeper_lvl, deeper) in &abs.levels {
                    if *deeper_lvl > ilvl && deeper.restart {
                        self.counters.remove(&(identity.to_string(), *deeper_lvl));
                    }
                }
            }
        }

        self.prev = Some(PrevMark {
            identity: identity.to_string(),
            level: ilvl,
            restart_on_change: abs.restart,
        });
    }
}

const LATIN: &[char; 26] = &[
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's',
    't', 'u', 'v', 'w', 'x', 'y', 'z',
];

// Russian numbering alphabet: 32 letters, no "ё".
const RUSSIAN: &[char; 32] = &[
    'а', 'б', 'в', 'г', 'д', 'е', 'ж', 'з', 'и', 'й', 'к', 'л', 'м', 'н', 'о', 'п', 'р', 'с', 'т',
    'у', 'ф', 'х', 'ц', 'ч', 'ш', 'щ', 'ъ', 'ы', 'ь', 'э', 'ю', 'я',
];

/// Render a counter value under a number format. Bullets and `none` render
/// empty here: a bullet's glyph is its template text, not a counter.
pub fn render_number(value: u32, format: NumberFormat) -> String {
    match format {
        NumberFormat::Decimal => value.to_string(),
        NumberFormat::LowerLetter => letter(value, LATIN, false),
        NumberFormat::UpperLetter => letter(value, LATIN, true),
        NumberFormat::LowerRoman => roman(value, false),
        NumberFormat::UpperRoman => roman(value, true),
        NumberFormat::RussianLower => letter(value, RUSSIAN, false),
        NumberFormat::RussianUpper => letter(value, RUSSIAN, true),
        NumberFormat::Bullet | NumberFormat::None => String::new(),
    }
}

/// Letter numbering with wraparound by repetition: after the alphabet is
/// exhausted the letter doubles (…, y, z, aa, bb, …), not a positional
/// encoding.
fn letter(value: u32, alphabet: &[char], upper: bool) -> String {
    if value == 0 {
        return String::new();
    }
    let n = (value - 1) as usize;
    let ch = alphabet[n % alphabet.len()];
    let reps = n / alphabet.len() + 1;
    let rendered: String = std::iter::repeat(ch).take(reps).collect();
    if upper {
        rendered.to_uppercase()
    } else {
        rendered
    }
}

fn roman(mut value: u32, upper: bool) -> String {
    const PAIRS: [(u32, &str); 13] = [
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];

    let mut out = String::new();
    for (magnitude, digits) in PAIRS {
        while value >= magnitude {
            out.push_str(digits);
            value -= magnitude;
        }
    }
    if upper {
        out.to_uppercase()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NUMBERING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
    <w:abstractNum w:abstractNumId="0">
        <w:lvl w:ilvl="0">
            <w:start w:val="1"/>
            <w:numFmt w:val="decimal"/>
            <w:lvlText w:val="%1."/>
        </w:lvl>
        <w:lvl w:ilvl="1">
            <w:start w:val="1"/>
            <w:numFmt w:val="decimal"/>
            <w:lvlText w:val="%1.%2."/>
        </w:lvl>
    </w:abstractNum>
    <w:num w:numId="1">
        <w:abstractNumId w:val="0"/>
    </w:num>
</w:numbering>"#;

    fn empty_styles() -> StyleTable {
        StyleTable::parse("<w:styles xmlns:w=\"http://example\"/>").unwrap()
    }

    fn mark(
        table: &NumberingTable,
        counters: &mut CounterState,
        styles: &StyleTable,
        num_id: &str,
        ilvl: u8,
    ) -> String {
        table
            .next_marker(num_id, ilvl, counters, styles)
            .map(|(text, _)| text)
            .unwrap_or_default()
    }

    #[test]
    fn test_parse_numbering() {
        let table = NumberingTable::parse(NUMBERING).unwrap();
        assert!(!table.is_empty());

        let styles = empty_styles();
        let level = table.level("1", 0, &styles).unwrap();
        assert_eq!(level.template, "%1.");
        assert_eq!(level.format, NumberFormat::Decimal);
        assert_eq!(level.start, 1);
        assert!(level.restart);
        assert_eq!(level.suffix, MarkerSuffix::Tab);
    }

    #[test]
    fn test_sequential_markers() {
        let table = NumberingTable::parse(NUMBERING).unwrap();
        let styles = empty_styles();
        let mut counters = CounterState::new();

        assert_eq!(mark(&table, &mut counters, &styles, "1", 0), "1.\t");
        assert_eq!(mark(&table, &mut counters, &styles, "1", 0), "2.\t");
        assert_eq!(mark(&table, &mut counters, &styles, "1", 0), "3.\t");
    }

    #[test]
    fn test_nested_levels_resume_parent_count() {
        let table = NumberingTable::parse(NUMBERING).unwrap();
        let styles = empty_styles();
        let mut counters = CounterState::new();

        assert_eq!(mark(&table, &mut counters, &styles, "1", 0), "1.\t");
        assert_eq!(mark(&table, &mut counters, &styles, "1", 1), "1.1.\t");
        assert_eq!(mark(&table, &mut counters, &styles, "1", 1), "1.2.\t");
        // Returning to level 0 resumes its count, not a restart.
        assert_eq!(mark(&table, &mut counters, &styles, "1", 0), "2.\t");
        // The deeper level restarted after the shallower transition.
        assert_eq!(mark(&table, &mut counters, &styles, "1", 1), "2.1.\t");
    }

    #[test]
    fn test_lvl_restart_disabled_keeps_counting() {
        let xml = r#"<w:numbering xmlns:w="http://example">
            <w:abstractNum w:abstractNumId="0">
                <w:lvl w:ilvl="0">
                    <w:start w:val="1"/>
                    <w:numFmt w:val="decimal"/>
                    <w:lvlText w:val="%1."/>
                </w:lvl>
                <w:lvl w:ilvl="1">
                    <w:start w:val="1"/>
                    <w:numFmt w:val="decimal"/>
                    <w:lvlText w:val="%2)"/>
                    <w:lvlRestart w:val="0"/>
                </w:lvl>
            </w:abstractNum>
            <w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num>
        </w:numbering>"#;
        let table = NumberingTable::parse(xml).unwrap();
        let styles = empty_styles();
        let mut counters = CounterState::new();

        assert_eq!(mark(&table, &mut counters, &styles, "1", 0), "1.\t");
        assert_eq!(mark(&table, &mut counters, &styles, "1", 1), "1)\t");
        assert_eq!(mark(&table, &mut counters, &styles, "1", 0), "2.\t");
        // lvlRestart=0: the deeper level keeps counting across the break.
        assert_eq!(mark(&table, &mut counters, &styles, "1", 1), "2)\t");
    }

    #[test]
    fn test_identity_change_restarts_counters() {
        let xml = r#"<w:numbering xmlns:w="http://example">
            <w:abstractNum w:abstractNumId="0">
                <w:lvl w:ilvl="0">
                    <w:start w:val="1"/>
                    <w:numFmt w:val="decimal"/>
                    <w:lvlText w:val="%1."/>
                </w:lvl>
            </w:abstractNum>
            <w:abstractNum w:abstractNumId="5">
                <w:lvl w:ilvl="0">
                    <w:start w:val="1"/>
                    <w:numFmt w:val="decimal"/>
                    <w:lvlText w:val="%1)"/>
                </w:lvl>
            </w:abstractNum>
            <w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num>
            <w:num w:numId="2"><w:abstractNumId w:val="5"/></w:num>
        </w:numbering>"#;
        let table = NumberingTable::parse(xml).unwrap();
        let styles = empty_styles();
        let mut counters = CounterState::new();

        assert_eq!(mark(&table, &mut counters, &styles, "1", 0), "1.\t");
        assert_eq!(mark(&table, &mut counters, &styles, "1", 0), "2.\t");
        // Switching away from a restart-marked numbering clears everything.
        assert_eq!(mark(&table, &mut counters, &styles, "2", 0), "1)\t");
        assert_eq!(mark(&table, &mut counters, &styles, "1", 0), "1.\t");
    }

    #[test]
    fn test_start_override() {
        let xml = r#"<w:numbering xmlns:w="http://example">
            <w:abstractNum w:abstractNumId="0">
                <w:lvl w:ilvl="0">
                    <w:start w:val="1"/>
                    <w:numFmt w:val="decimal"/>
                    <w:lvlText w:val="%1."/>
                </w:lvl>
            </w:abstractNum>
            <w:num w:numId="1">
                <w:abstractNumId w:val="0"/>
                <w:lvlOverride w:ilvl="0">
                    <w:startOverride w:val="5"/>
                </w:lvlOverride>
            </w:num>
        </w:numbering>"#;
        let table = NumberingTable::parse(xml).unwrap();
        let styles = empty_styles();
        let mut counters = CounterState::new();

        assert_eq!(mark(&table, &mut counters, &styles, "1", 0), "5.\t");
        assert_eq!(mark(&table, &mut counters, &styles, "1", 0), "6.\t");
    }

    #[test]
    fn test_num_style_link_indirection() {
        let styles_xml = r#"<w:styles xmlns:w="http://example">
            <w:style w:type="numbering" w:styleId="MyList">
                <w:name w:val="My List"/>
                <w:pPr><w:numPr><w:numId w:val="2"/></w:numPr></w:pPr>
            </w:style>
        </w:styles>"#;
        let numbering_xml = r#"<w:numbering xmlns:w="http://example">
            <w:abstractNum w:abstractNumId="0">
                <w:numStyleLink w:val="MyList"/>
            </w:abstractNum>
            <w:abstractNum w:abstractNumId="1">
                <w:styleLink w:val="MyList"/>
                <w:lvl w:ilvl="0">
                    <w:start w:val="1"/>
                    <w:numFmt w:val="upperRoman"/>
                    <w:lvlText w:val="%1."/>
                </w:lvl>
            </w:abstractNum>
            <w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num>
            <w:num w:numId="2"><w:abstractNumId w:val="1"/></w:num>
        </w:numbering>"#;
        let styles = StyleTable::parse(styles_xml).unwrap();
        let table = NumberingTable::parse(numbering_xml).unwrap();
        let mut counters = CounterState::new();

        // numId 1 points at an abstract that is only a link; the levels come
        // from the linked style's numbering.
        assert_eq!(mark(&table, &mut counters, &styles, "1", 0), "I.\t");
        assert_eq!(mark(&table, &mut counters, &styles, "1", 0), "II.\t");
    }

    #[test]
    fn test_dangling_reference_yields_empty_marker() {
        let table = NumberingTable::parse(NUMBERING).unwrap();
        let styles = empty_styles();
        let mut counters = CounterState::new();

        assert!(table.next_marker("99", 0, &mut counters, &styles).is_none());
        assert_eq!(table.marker_text("99", 0, &counters, &styles), "");
    }

    #[test]
    fn test_bullet_marker_is_template_glyph() {
        let xml = r#"<w:numbering xmlns:w="http://example">
            <w:abstractNum w:abstractNumId="0">
                <w:lvl w:ilvl="0">
                    <w:start w:val="1"/>
                    <w:numFmt w:val="bullet"/>
                    <w:lvlText w:val="•"/>
                    <w:suff w:val="space"/>
                </w:lvl>
            </w:abstractNum>
            <w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num>
        </w:numbering>"#;
        let table = NumberingTable::parse(xml).unwrap();
        let styles = empty_styles();
        let mut counters = CounterState::new();

        assert_eq!(mark(&table, &mut counters, &styles, "1", 0), "• ");
        assert_eq!(mark(&table, &mut counters, &styles, "1", 0), "• ");
    }

    #[test]
    fn test_letter_wraparound_repeats() {
        assert_eq!(render_number(1, NumberFormat::LowerLetter), "a");
        assert_eq!(render_number(26, NumberFormat::LowerLetter), "z");
        // Shift 26: repeated letters, not positional "ab".
        assert_eq!(render_number(27, NumberFormat::UpperLetter), "AA");
        assert_eq!(render_number(28, NumberFormat::LowerLetter), "bb");
        assert_eq!(render_number(53, NumberFormat::LowerLetter), "aaa");
    }

    #[test]
    fn test_roman_numerals() {
        assert_eq!(render_number(4, NumberFormat::LowerRoman), "iv");
        assert_eq!(render_number(18, NumberFormat::LowerRoman), "xviii");
        assert_eq!(render_number(19, NumberFormat::UpperRoman), "XIX");
        assert_eq!(render_number(40, NumberFormat::LowerRoman), "xl");
        assert_eq!(render_number(1994, NumberFormat::UpperRoman), "MCMXCIV");
    }

    #[test]
    fn test_russian_letters() {
        assert_eq!(render_number(1, NumberFormat::RussianLower), "а");
        assert_eq!(render_number(32, NumberFormat::RussianLower), "я");
        assert_eq!(render_number(33, NumberFormat::RussianLower), "аа");
        assert_eq!(render_number(2, NumberFormat::RussianUpper), "Б");
    }

    #[test]
    fn test_level_run_overrides_parsed() {
        let xml = r#"<w:numbering xmlns:w="http://example">
            <w:abstractNum w:abstractNumId="0">
                <w:lvl w:ilvl="0">
                    <w:start w:val="1"/>
                    <w:numFmt w:val="decimal"/>
                    <w:lvlText w:val="%1."/>
                    <w:pPr><w:ind w:left="720" w:hanging="360"/></w:pPr>
                    <w:rPr><w:b/></w:rPr>
                </w:lvl>
            </w:abstractNum>
            <w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num>
        </w:numbering>"#;
        let table = NumberingTable::parse(xml).unwrap();
        let styles = empty_styles();

        let level = table.level("1", 0, &styles).unwrap();
        assert_eq!(level.paragraph_overrides.indentation.left, Some(720));
        assert_eq!(level.paragraph_overrides.indentation.hanging, Some(360));
        assert_eq!(level.run_overrides.bold, Some(true));
    }
}
