use std::collections::HashMap;
use std::path::Path;

use docsearch_core::ExtractionError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::package::{malformed, open_archive, read_entry};

const FORMAT: &str = "xlsx";

/// One `[Sheet: name]` header per sheet in workbook order, then one line per
/// non-empty row with cell values joined by a space.
pub(crate) fn extract(path: &Path) -> Result<String, ExtractionError> {
    let mut archive = open_archive(path, FORMAT)?;
    let shared = match read_entry(&mut archive, "xl/sharedStrings.xml", FORMAT)? {
        Some(xml) => shared_strings(&xml).map_err(|e| malformed(FORMAT, e))?,
        None => Vec::new(),
    };
    let workbook = read_entry(&mut archive, "xl/workbook.xml", FORMAT)?
        .ok_or_else(|| malformed(FORMAT, "missing xl/workbook.xml"))?;
    let sheets = sheet_list(&workbook).map_err(|e| malformed(FORMAT, e))?;
    let rels = match read_entry(&mut archive, "xl/_rels/workbook.xml.rels", FORMAT)? {
        Some(xml) => relationships(&xml).map_err(|e| malformed(FORMAT, e))?,
        None => HashMap::new(),
    };

    let mut lines = Vec::new();
    for (index, (name, rel_id)) in sheets.iter().enumerate() {
        let part = rels
            .get(rel_id)
            .map(|target| part_path(target))
            .unwrap_or_else(|| format!("xl/worksheets/sheet{}.xml", index + 1));
        lines.push(format!("[Sheet: {name}]"));
        match read_entry(&mut archive, &part, FORMAT)? {
            Some(xml) => lines.extend(sheet_rows(&xml, &shared).map_err(|e| malformed(FORMAT, e))?),
            None => tracing::warn!(path = %path.display(), sheet = %name, part = %part, "Missing worksheet part"),
        }
    }
    Ok(lines.join("\n"))
}

fn part_path(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{target}"),
    }
}

fn attr(e: &BytesStart<'_>, local: &[u8]) -> Result<Option<String>, quick_xml::Error> {
    for a in e.attributes() {
        let a = a?;
        if a.key.local_name().as_ref() == local {
            return Ok(Some(a.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn shared_strings(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let (mut in_t, mut in_phonetic) = (false, false);
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_t = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Text(t) if in_t && !in_phonetic => current.push_str(&t.unescape()?),
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"t" => in_t = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

/// `(sheet name, relationship id)` in workbook order.
fn sheet_list(xml: &str) -> Result<Vec<(String, String)>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut sheets = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attr(&e, b"name")?.unwrap_or_default();
                let rel_id = attr(&e, b"id")?.unwrap_or_default();
                sheets.push((name, rel_id));
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(sheets)
}

fn relationships(xml: &str) -> Result<HashMap<String, String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut rels = HashMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr(&e, b"Id")?, attr(&e, b"Target")?) {
                    rels.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rels)
}

fn sheet_rows(xml: &str, shared: &[String]) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell_type: Option<String> = None;
    let mut value = String::new();
    let mut in_value = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => row.clear(),
                b"c" => {
                    cell_type = attr(&e, b"t")?;
                    value.clear();
                }
                b"v" | b"t" => in_value = true,
                _ => {}
            },
            Event::Text(t) if in_value => value.push_str(&t.unescape()?),
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    let resolved = match cell_type.as_deref() {
                        Some("s") => value.trim().parse::<usize>().ok().and_then(|i| shared.get(i).cloned()).unwrap_or_default(),
                        _ => std::mem::take(&mut value),
                    };
                    if !resolved.is_empty() {
                        row.push(resolved);
                    }
                }
                b"row" if !row.is_empty() => rows.push(row.join(" ")),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rows)
}
