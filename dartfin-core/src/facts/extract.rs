//! Numeric fact extraction from an XBRL instance document.
//!
//! Every element with direct text content is a candidate. Only the text that
//! precedes an element's first child counts as its own. An element is kept
//! when its name resolves to a namespace (prefixed, or under a default
//! `xmlns`) and its trimmed text parses as a number once `,` thousands
//! separators are removed. Unqualified elements are not facts and are skipped
//! without comment. Qualified text facts (dates, names, measures) are skipped
//! too; a parse error is reported only for an element carrying a `contextRef`
//! whose text looks like a number but does not parse as one.

use super::{FactError, FactExtraction, FactParseError};
use crate::domain::RawFact;
use chrono::NaiveDate;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use std::fs;
use std::path::Path;

struct OpenElement {
    qualified: bool,
    local_name: String,
    context_ref: Option<String>,
    unit_ref: Option<String>,
    text: String,
    saw_child: bool,
    position: u64,
}

/// Extract facts from an XBRL document held in memory.
pub fn extract_facts(document: &str) -> Result<FactExtraction, FactError> {
    let mut reader = NsReader::from_str(document);
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut out = FactExtraction::default();

    loop {
        let position = reader.buffer_position() as u64;
        let (qualified, event) = match reader.read_resolved_event() {
            Ok((ns, event)) => (matches!(ns, ResolveResult::Bound(_)), event),
            Err(e) => {
                return Err(FactError::Xml {
                    position,
                    reason: e.to_string(),
                })
            }
        };

        match event {
            Event::Start(start) => {
                if let Some(parent) = stack.last_mut() {
                    parent.saw_child = true;
                }
                stack.push(open_element(&start, qualified, position)?);
            }
            Event::Empty(_) => {
                if let Some(parent) = stack.last_mut() {
                    parent.saw_child = true;
                }
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut().filter(|t| !t.saw_child) {
                    let unescaped = text.unescape().map_err(|e| FactError::Xml {
                        position,
                        reason: e.to_string(),
                    })?;
                    top.text.push_str(&unescaped);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut().filter(|t| !t.saw_child) {
                    top.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::End(_) => {
                if let Some(element) = stack.pop() {
                    close_element(element, &mut out);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out)
}

/// Read and extract an XBRL file from disk.
pub fn extract_facts_from_path(path: &Path) -> Result<FactExtraction, FactError> {
    let content = fs::read_to_string(path).map_err(|e| FactError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    extract_facts(content.trim_start_matches('\u{feff}'))
}

fn open_element(
    start: &BytesStart<'_>,
    qualified: bool,
    position: u64,
) -> Result<OpenElement, FactError> {
    let local_name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    Ok(OpenElement {
        qualified,
        local_name,
        context_ref: attribute(start, "contextRef", position)?,
        unit_ref: attribute(start, "unitRef", position)?,
        text: String::new(),
        saw_child: false,
        position,
    })
}

fn attribute(
    start: &BytesStart<'_>,
    name: &str,
    position: u64,
) -> Result<Option<String>, FactError> {
    let attr = start
        .try_get_attribute(name)
        .map_err(|e| FactError::Xml {
            position,
            reason: e.to_string(),
        })?;
    match attr {
        None => Ok(None),
        Some(a) => a
            .unescape_value()
            .map(|v| Some(v.into_owned()))
            .map_err(|e| FactError::Xml {
                position,
                reason: e.to_string(),
            }),
    }
}

fn close_element(element: OpenElement, out: &mut FactExtraction) {
    if !element.qualified {
        return;
    }
    let text = element.text.trim();
    if text.is_empty() {
        return;
    }

    match parse_numeric(text) {
        Some(numeric_value) => out.facts.push(RawFact {
            account_tag: element.local_name,
            numeric_value,
            context_ref: element.context_ref,
            unit_ref: element.unit_ref,
        }),
        None if element.context_ref.is_some() && looks_numeric(text) => {
            out.errors.push(FactParseError {
                tag: element.local_name,
                text: text.to_string(),
                position: element.position,
            })
        }
        None => {}
    }
}

/// Digit-led text made only of number characters, excluding ISO dates.
fn looks_numeric(text: &str) -> bool {
    let unsigned = text.trim_start_matches(['+', '-']);
    let digit_led = unsigned.starts_with(|c: char| c.is_ascii_digit());
    let number_chars = text
        .chars()
        .all(|c| c.is_ascii_digit() || c.is_whitespace() || ",.+-eE".contains(c));
    digit_led && number_chars && NaiveDate::parse_from_str(text, "%Y-%m-%d").is_err()
}

/// Parse fact text: thousands separators removed, surrounding whitespace ignored.
pub fn parse_numeric(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| *c != ',').collect();
    cleaned.trim().parse::<f64>().ok()
}
