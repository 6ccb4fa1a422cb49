use std::io::Read;
use std::path::Path;

use docsearch_core::ExtractionError;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::package::{malformed, open_archive};

const FORMAT: &str = "hwpx";

/// Concatenates the text of every `Contents/*.xml` part. Paragraph ends
/// become line breaks. A part that fails to parse is logged and skipped.
pub(crate) fn extract(path: &Path) -> Result<String, ExtractionError> {
    let mut archive = open_archive(path, FORMAT)?;
    let mut texts = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| malformed(FORMAT, e))?;
        let name = entry.name().to_string();
        if !(name.starts_with("Contents/") && name.to_lowercase().ends_with(".xml")) {
            continue;
        }
        let mut xml = String::new();
        if let Err(e) = entry.read_to_string(&mut xml) {
            tracing::warn!(path = %path.display(), part = %name, error = %e, "Unreadable hwpx part");
            continue;
        }
        match xml_text(&xml) {
            Ok(text) => texts.push(text),
            Err(e) => tracing::warn!(path = %path.display(), part = %name, error = %e, "Unparsable hwpx part"),
        }
    }
    Ok(texts.join("\n").trim().to_string())
}

fn xml_text(xml: &str) -> Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(t) => out.push_str(&t.unescape()?),
            Event::CData(c) => out.push_str(&String::from_utf8_lossy(&c.into_inner())),
            Event::End(e) if e.local_name().as_ref() == b"p" => out.push('\n'),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}
