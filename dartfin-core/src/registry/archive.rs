//! Registry archive decoding: ZIP container → `CORPCODE.xml` → records.

use super::RegistryError;
use crate::domain::CorporateRecord;
use serde::Deserialize;
use std::io::{Cursor, Read};
use zip::result::ZipError;
use zip::ZipArchive;

/// Leading bytes of every ZIP container.
pub const ZIP_SIGNATURE: &[u8] = b"PK";

/// Name of the document inside the archive.
pub const INNER_DOCUMENT: &str = "CORPCODE.xml";

const PREVIEW_BYTES: usize = 300;

#[derive(Debug, Deserialize)]
struct RegistryDocument {
    #[serde(rename = "list", default)]
    entries: Vec<RegistryEntry>,
}

#[derive(Debug, Deserialize)]
struct RegistryEntry {
    corp_code: String,
    corp_name: String,
    #[serde(default)]
    stock_code: Option<String>,
}

/// Validate and unpack a registry archive payload.
pub fn decode_archive(payload: &[u8]) -> Result<Vec<CorporateRecord>, RegistryError> {
    if !payload.starts_with(ZIP_SIGNATURE) {
        return Err(RegistryError::Format(format!(
            "registry payload is not a ZIP archive (starts with: {})",
            preview(payload)
        )));
    }

    let mut archive = ZipArchive::new(Cursor::new(payload))
        .map_err(|e| RegistryError::Format(format!("unreadable ZIP archive: {e}")))?;

    let mut document = archive.by_name(INNER_DOCUMENT).map_err(|e| match e {
        ZipError::FileNotFound => {
            RegistryError::Format(format!("archive does not contain {INNER_DOCUMENT}"))
        }
        other => RegistryError::Format(format!("cannot open {INNER_DOCUMENT}: {other}")),
    })?;

    let mut xml = String::new();
    document
        .read_to_string(&mut xml)
        .map_err(|e| RegistryError::Format(format!("cannot read {INNER_DOCUMENT}: {e}")))?;

    parse_registry_xml(&xml)
}

/// Parse the registry document: one record per repeated `<list>` element.
pub fn parse_registry_xml(xml: &str) -> Result<Vec<CorporateRecord>, RegistryError> {
    let xml = xml.trim_start_matches('\u{feff}');
    let doc: RegistryDocument = quick_xml::de::from_str(xml)
        .map_err(|e| RegistryError::Format(format!("malformed {INNER_DOCUMENT}: {e}")))?;

    Ok(doc
        .entries
        .into_iter()
        .map(|e| CorporateRecord::new(e.corp_code, e.corp_name, e.stock_code))
        .collect())
}

/// Lossy text preview of the start of a payload, for diagnostics.
fn preview(payload: &[u8]) -> String {
    let end = payload.len().min(PREVIEW_BYTES);
    String::from_utf8_lossy(&payload[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn zip_with(name: &str, content: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file(name, SimpleFileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<result>
    <list>
        <corp_code>00126380</corp_code>
        <corp_name>삼성전자</corp_name>
        <stock_code>005930</stock_code>
        <modify_date>20230110</modify_date>
    </list>
    <list>
        <corp_code>00434003</corp_code>
        <corp_name>다코</corp_name>
        <stock_code> </stock_code>
        <modify_date>20170630</modify_date>
    </list>
</result>"#;

    #[test]
    fn parses_records_in_document_order() {
        let records = parse_registry_xml(SAMPLE).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].entity_code.as_str(), "00126380");
        assert_eq!(records[0].display_name, "삼성전자");
        assert_eq!(records[0].stock_code.as_deref(), Some("005930"));
        assert_eq!(records[1].entity_code.as_str(), "00434003");
        assert_eq!(records[1].stock_code, None);
    }

    #[test]
    fn decodes_zip_payload() {
        let records = decode_archive(&zip_with(INNER_DOCUMENT, SAMPLE)).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn rejects_non_zip_payload() {
        let body = br#"{"status":"010","message":"unregistered key"}"#;
        let err = decode_archive(body).unwrap_err();
        match err {
            RegistryError::Format(msg) => assert!(msg.contains("unregistered key"), "{msg}"),
            other => panic!("expected Format, got {other:?}"),
        }
    }

    #[test]
    fn rejects_archive_without_inner_document() {
        let err = decode_archive(&zip_with("OTHER.xml", SAMPLE)).unwrap_err();
        assert!(matches!(err, RegistryError::Format(ref m) if m.contains(INNER_DOCUMENT)));
    }

    #[test]
    fn empty_registry_is_not_an_error() {
        let records = parse_registry_xml("<result></result>").unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn record_missing_code_is_format_error() {
        let xml = "<result><list><corp_name>x</corp_name></list></result>";
        assert!(matches!(
            parse_registry_xml(xml),
            Err(RegistryError::Format(_))
        ));
    }
}
