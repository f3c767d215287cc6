//! Shared plumbing for Office Open XML containers (DOCX, XLSX).

use std::io::{Cursor, Read};

use quick_xml::events::BytesStart;
use zip::result::ZipError;
use zip::ZipArchive;

use super::ExtractionError;

pub type Container<'a> = ZipArchive<Cursor<&'a [u8]>>;

/// Upper bound for a single XML part; larger parts are treated as corrupt.
const MAX_PART_BYTES: u64 = 64 * 1024 * 1024;

pub fn open_container(bytes: &[u8]) -> Result<Container<'_>, ExtractionError> {
    Ok(ZipArchive::new(Cursor::new(bytes))?)
}

/// Read a part as UTF-8. `Ok(None)` when the part does not exist.
pub fn read_part(container: &mut Container<'_>, name: &str) -> Result<Option<String>, ExtractionError> {
    let file = match container.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut bytes = Vec::new();
    file.take(MAX_PART_BYTES).read_to_end(&mut bytes)?;
    String::from_utf8(bytes)
        .map(Some)
        .map_err(|e| ExtractionError::EncodingError(format!("{name}: {e}")))
}

/// Like `read_part` but a missing part is an error.
pub fn require_part(container: &mut Container<'_>, name: &str) -> Result<String, ExtractionError> {
    read_part(container, name)?.ok_or_else(|| ExtractionError::MissingPart(name.to_string()))
}

/// Text node content with any escapes resolved.
pub fn text_content(raw: &[u8]) -> String {
    let lossy = String::from_utf8_lossy(raw);
    match quick_xml::escape::unescape(&lossy) {
        Ok(text) => text.into_owned(),
        Err(_) => lossy.into_owned(),
    }
}

/// Resolve a general entity reference body (`amp`, `#x131`) to its text.
pub fn entity_text(name: &[u8]) -> String {
    let reference = format!("&{};", String::from_utf8_lossy(name));
    match quick_xml::escape::unescape(&reference) {
        Ok(text) => text.into_owned(),
        Err(_) => String::new(),
    }
}

/// Attribute value by qualified key, e.g. `b"r"` or `b"r:id"`.
pub fn attr(element: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    element
        .try_get_attribute(key)
        .ok()
        .flatten()
        .map(|a| text_content(&a.value))
}


#[cfg(test)]
mod tests {
    use super::test_support::make_container;
    use super::*;

    #[test]
    fn reads_existing_and_missing_parts() {
        let bytes = make_container(&[("word/document.xml", "<w:document/>")]);
        let mut container = open_container(&bytes).unwrap();
        assert_eq!(
            read_part(&mut container, "word/document.xml").unwrap().as_deref(),
            Some("<w:document/>")
        );
        assert!(read_part(&mut container, "word/styles.xml").unwrap().is_none());
        assert!(matches!(
            require_part(&mut container, "xl/workbook.xml"),
            Err(ExtractionError::MissingPart(_))
        ));
    }

    #[test]
    fn not_a_container() {
        assert!(matches!(
            open_container(b"plain text"),
            Err(ExtractionError::Container(_))
        ));
    }

    #[test]
    fn escapes_resolved() {
        assert_eq!(text_content(b"Et &amp; Tavuk"), "Et & Tavuk");
        assert_eq!(entity_text(b"lt"), "<");
        assert_eq!(entity_text(b"#x131"), "ı");
    }
}
