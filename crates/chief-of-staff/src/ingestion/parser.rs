//! Multi-format document text extraction
//!
//! Every path through [`DocumentExtractor::extract`] ends in a string: either
//! the extracted text or a bracketed placeholder describing why there is none.
//! Placeholders are ingested like any other content so the model and the user
//! both see what happened to a file.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::error::Result;
use crate::types::FileType;

/// Stateless extractor that dispatches on file suffix
pub struct DocumentExtractor;

impl DocumentExtractor {
    /// Extract text from an uploaded file. Never fails.
    pub fn extract(filename: &str, data: &[u8]) -> String {
        let file_type = FileType::from_filename(filename);
        tracing::debug!(
            "Extracting '{}' as {} ({} bytes)",
            filename,
            file_type.display_name(),
            data.len()
        );

        // Third-party decoders occasionally panic on malformed input
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            Self::dispatch(filename, &file_type, data)
        }));

        match outcome {
            Ok(text) => text,
            Err(payload) => {
                let message = panic_message(payload);
                tracing::warn!("Extraction of '{}' aborted: {}", filename, message);
                format!("[Error processing {}: {}]", filename, message)
            }
        }
    }

    fn dispatch(filename: &str, file_type: &FileType, data: &[u8]) -> String {
        match file_type {
            FileType::Pdf => Self::extract_pdf(filename, data),
            FileType::Pptx => Self::extract_pptx(filename, data),
            FileType::Xlsx | FileType::Xls => Self::extract_excel(filename, data),
            FileType::Csv => Self::extract_csv(filename, data),
            FileType::Txt | FileType::Markdown => Self::extract_text(data),
            FileType::Unsupported(ext) => format!("[Unsupported file type: {}]", ext),
        }
    }

    /// PDF text, one `--- Page N ---` section per page with text
    #[cfg(feature = "pdf")]
    fn extract_pdf(filename: &str, data: &[u8]) -> String {
        match pdf::read_pages(filename, data) {
            Ok(pages) => {
                let mut text = String::new();
                for (index, page) in pages.iter().enumerate() {
                    if page.trim().is_empty() {
                        tracing::debug!("Page {} has no extractable text", index + 1);
                        continue;
                    }
                    text.push_str(&format!("\n--- Page {} ---\n{}\n", index + 1, page));
                }
                non_empty_or(text, "[PDF contains no extractable text]")
            }
            Err(e) => degraded("PDF", e),
        }
    }

    #[cfg(not(feature = "pdf"))]
    fn extract_pdf(_filename: &str, _data: &[u8]) -> String {
        "[PDF processing not available - pdf feature not enabled]".to_string()
    }

    /// Slide text, one `--- Slide N ---` section per slide
    #[cfg(feature = "pptx")]
    fn extract_pptx(filename: &str, data: &[u8]) -> String {
        match pptx::read_slides(filename, data) {
            Ok(slides) => {
                let mut text = String::new();
                for (index, shapes) in slides.iter().enumerate() {
                    text.push_str(&format!("\n--- Slide {} ---\n", index + 1));
                    for shape in shapes {
                        text.push_str(shape);
                        text.push('\n');
                    }
                }
                non_empty_or(text, "[PowerPoint contains no extractable text]")
            }
            Err(e) => degraded("PowerPoint", e),
        }
    }

    #[cfg(not(feature = "pptx"))]
    fn extract_pptx(_filename: &str, _data: &[u8]) -> String {
        "[PowerPoint processing not available - pptx feature not enabled]".to_string()
    }

    /// Workbook text, one `--- Sheet: name ---` table per sheet
    #[cfg(feature = "xlsx")]
    fn extract_excel(filename: &str, data: &[u8]) -> String {
        match excel::read_sheets(filename, data) {
            Ok(sheets) => {
                let mut text = String::new();
                for (name, rows) in sheets {
                    text.push_str(&format!("\n--- Sheet: {} ---\n", name));
                    let mut rows = rows.into_iter();
                    let headers = rows.next().unwrap_or_default();
                    let body: Vec<Vec<String>> = rows.collect();
                    text.push_str(&super::table::render_table(&headers, &body));
                    text.push_str("\n\n");
                }
                non_empty_or(text, "[Excel file contains no data]")
            }
            Err(e) => degraded("Excel", e),
        }
    }

    #[cfg(not(feature = "xlsx"))]
    fn extract_excel(_filename: &str, _data: &[u8]) -> String {
        "[Excel processing not available - xlsx feature not enabled]".to_string()
    }

    /// Delimited text rendered as a single table
    #[cfg(feature = "csv")]
    fn extract_csv(filename: &str, data: &[u8]) -> String {
        match delimited::read_table(filename, data) {
            Ok((headers, rows)) => format!(
                "CSV File: {}\n\n{}",
                filename,
                super::table::render_table(&headers, &rows)
            ),
            Err(e) => degraded("CSV", e),
        }
    }

    #[cfg(not(feature = "csv"))]
    fn extract_csv(_filename: &str, _data: &[u8]) -> String {
        "[CSV processing not available - csv feature not enabled]".to_string()
    }

    /// Plain text or markdown, UTF-8 with a Latin-1 fallback
    fn extract_text(data: &[u8]) -> String {
        let text = decode_text(data);
        let text = text.trim_start_matches('\u{feff}');
        non_empty_or(text.to_string(), "[File is empty]")
    }
}

/// Decode bytes as UTF-8, falling back to ISO-8859-1 byte-for-char mapping
pub fn decode_text(data: &[u8]) -> String {
    match std::str::from_utf8(data) {
        Ok(text) => text.to_string(),
        Err(_) => {
            tracing::debug!("Input is not valid UTF-8, decoding as Latin-1");
            data.iter().map(|&b| b as char).collect()
        }
    }
}

fn non_empty_or(text: String, placeholder: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        placeholder.to_string()
    } else {
        trimmed.to_string()
    }
}

#[allow(dead_code)]
fn degraded(format_name: &str, err: crate::error::Error) -> String {
    tracing::warn!("Could not read {}: {}", format_name, err);
    format!("[Error reading {}: {}]", format_name, err.user_message())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "decoder panicked".to_string()
    }
}

#[cfg(feature = "pdf")]
mod pdf {
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use super::Result;
    use crate::error::Error;

    const FALLBACK_TIMEOUT: Duration = Duration::from_secs(60);

    /// Text of every page in page order; empty strings for pages without text
    pub(super) fn read_pages(filename: &str, data: &[u8]) -> Result<Vec<String>> {
        match lopdf::Document::load_mem(data) {
            Ok(doc) => {
                let pages = pages_from_document(&doc);
                if pages.iter().any(|p| !p.trim().is_empty()) {
                    return Ok(pages);
                }
                tracing::debug!("lopdf found no text in '{}', trying pdf-extract", filename);
                match extract_with_timeout(filename, data) {
                    Ok(fallback) => Ok(fallback),
                    // A readable document with no text is an empty result, not an error
                    Err(e) => {
                        tracing::debug!("pdf-extract fallback failed: {}", e);
                        Ok(pages)
                    }
                }
            }
            Err(e) => {
                tracing::warn!("lopdf could not load '{}' ({}), trying pdf-extract", filename, e);
                extract_with_timeout(filename, data)
            }
        }
    }

    fn pages_from_document(doc: &lopdf::Document) -> Vec<String> {
        doc.get_pages()
            .into_iter()
            .map(|(page_num, page_id)| match doc.extract_text(&[page_num]) {
                Ok(text) => text.trim().to_string(),
                Err(e) => {
                    tracing::debug!("extract_text failed on page {}: {}", page_num, e);
                    doc.get_page_content(page_id)
                        .map(|content| text_from_content_stream(&content))
                        .unwrap_or_default()
                }
            })
            .collect()
    }

    /// Per-page extraction with pdf-extract, guarded by a timeout
    pub(super) fn extract_with_timeout(filename: &str, data: &[u8]) -> Result<Vec<String>> {
        let data_vec = data.to_vec();
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            let result = pdf_extract::extract_text_from_mem_by_pages(&data_vec);
            let _ = tx.send(result);
        });

        match rx.recv_timeout(FALLBACK_TIMEOUT) {
            Ok(Ok(pages)) => {
                let _ = handle.join();
                Ok(pages.into_iter().map(|p| p.trim().to_string()).collect())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(Error::file_parse(filename, e.to_string()))
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tracing::error!("PDF extraction timeout after {:?}", FALLBACK_TIMEOUT);
                Err(Error::file_parse(filename, "extraction timed out"))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                tracing::error!("PDF extraction thread crashed");
                Err(Error::file_parse(filename, "extraction thread crashed"))
            }
        }
    }

    /// Pull string operands of `Tj`/`TJ` out of a raw content stream
    fn text_from_content_stream(content: &[u8]) -> String {
        let content_str = String::from_utf8_lossy(content);
        let mut text = String::new();
        let mut in_text_block = false;
        let mut current = String::new();

        for line in content_str.lines() {
            let line = line.trim();

            match line {
                "BT" => {
                    in_text_block = true;
                    continue;
                }
                "ET" => {
                    in_text_block = false;
                    if !current.is_empty() {
                        text.push_str(&current);
                        text.push(' ');
                        current.clear();
                    }
                    continue;
                }
                _ => {}
            }

            if in_text_block && (line.ends_with("Tj") || line.ends_with("TJ")) {
                if let (Some(start), Some(end)) = (line.find('('), line.rfind(')')) {
                    if start < end {
                        current.push_str(&unescape_literal(&line[start + 1..end]));
                    }
                }
            }
        }

        text.trim().to_string()
    }

    /// Resolve backslash escapes of a PDF literal string in a single pass
    fn unescape_literal(raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        let mut chars = raw.chars();

        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                // \\ \( \) and unknown escapes keep the escaped char
                Some(other) => out.push(other),
                None => {}
            }
        }

        out
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_content_stream_scan() {
            let stream = b"BT\n/F1 12 Tf\n(Hello \\(PDF\\)) Tj\nET\nBT\n(Again) Tj\nET";
            assert_eq!(text_from_content_stream(stream), "Hello (PDF) Again");
        }

        #[test]
        fn test_escaped_backslash_is_not_a_newline() {
            // literal `C:\\new` in the stream is the text `C:\new`
            assert_eq!(unescape_literal(r"C:\\new"), r"C:\new");
            assert_eq!(unescape_literal(r"a\nb\tc\)"), "a\nb\tc)");
            assert_eq!(unescape_literal("trailing\\"), "trailing");
        }
    }
}

#[cfg(feature = "pptx")]
mod pptx {
    use std::collections::{HashMap, HashSet};
    use std::io::{Read, Seek};

    use quick_xml::events::Event;
    use quick_xml::Reader;
    use zip::ZipArchive;

    use super::Result;
    use crate::error::Error;

    const SLIDE_PREFIX: &str = "ppt/slides/slide";
    const PRESENTATION_PART: &str = "ppt/presentation.xml";
    const PRESENTATION_RELS_PART: &str = "ppt/_rels/presentation.xml.rels";

    /// Text of each text-bearing shape, grouped by slide in presentation order
    pub(super) fn read_slides(filename: &str, data: &[u8]) -> Result<Vec<Vec<String>>> {
        let cursor = std::io::Cursor::new(data);
        let mut archive =
            ZipArchive::new(cursor).map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let listed = listed_slide_parts(&mut archive);
        let parts: HashSet<String> = archive.file_names().map(str::to_string).collect();

        let mut slide_parts: Vec<String> = listed
            .unwrap_or_default()
            .into_iter()
            .filter(|part| parts.contains(part))
            .collect();
        if slide_parts.is_empty() {
            slide_parts = numbered_slide_parts(&parts);
        }

        if slide_parts.is_empty() && !parts.contains(PRESENTATION_PART) {
            return Err(Error::file_parse(
                filename,
                "archive is not a PowerPoint presentation",
            ));
        }

        let mut slides = Vec::with_capacity(slide_parts.len());
        for part in slide_parts {
            let mut file = archive
                .by_name(&part)
                .map_err(|e| Error::file_parse(filename, format!("{}: {}", part, e)))?;
            let mut xml = String::new();
            file.read_to_string(&mut xml)?;
            slides.push(shape_texts(filename, &xml)?);
        }

        Ok(slides)
    }

    /// Slide parts in the order `<p:sldIdLst>` lists them.
    ///
    /// `None` when the presentation part or its relationships are missing or
    /// unreadable.
    fn listed_slide_parts<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Option<Vec<String>> {
        let presentation = read_part(archive, PRESENTATION_PART)?;
        let rels = read_part(archive, PRESENTATION_RELS_PART)?;

        let ids = match slide_relationship_ids(&presentation) {
            Ok(ids) => ids,
            Err(e) => {
                tracing::debug!("Unreadable slide list: {}", e);
                return None;
            }
        };
        let targets = match relationship_targets(&rels) {
            Ok(targets) => targets,
            Err(e) => {
                tracing::debug!("Unreadable presentation relationships: {}", e);
                return None;
            }
        };

        Some(
            ids.iter()
                .filter_map(|id| targets.get(id))
                .map(|target| resolve_target(target))
                .collect(),
        )
    }

    /// Fallback order: numeric suffix of `ppt/slides/slideN.xml`
    fn numbered_slide_parts(parts: &HashSet<String>) -> Vec<String> {
        let mut numbered: Vec<(u32, String)> = parts
            .iter()
            .filter(|name| name.starts_with(SLIDE_PREFIX) && name.ends_with(".xml"))
            .filter_map(|name| {
                name.trim_start_matches(SLIDE_PREFIX)
                    .trim_end_matches(".xml")
                    .parse::<u32>()
                    .ok()
                    .map(|n| (n, name.clone()))
            })
            .collect();
        numbered.sort_by_key(|(n, _)| *n);
        numbered.into_iter().map(|(_, name)| name).collect()
    }

    fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Option<String> {
        let mut file = archive.by_name(name).ok()?;
        let mut xml = String::new();
        file.read_to_string(&mut xml).ok()?;
        Some(xml)
    }

    /// `r:id` of every `<p:sldId>` in document order
    fn slide_relationship_ids(xml: &str) -> std::result::Result<Vec<String>, quick_xml::Error> {
        let mut reader = Reader::from_str(xml);
        let mut ids = Vec::new();

        loop {
            match reader.read_event()? {
                Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sldId" => {
                    for attr in e.attributes().flatten() {
                        if attr.key.local_name().as_ref() == b"id" && attr.key.prefix().is_some() {
                            ids.push(String::from_utf8_lossy(&attr.value).into_owned());
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(ids)
    }

    /// Relationship `Id` to `Target`
    fn relationship_targets(
        xml: &str,
    ) -> std::result::Result<HashMap<String, String>, quick_xml::Error> {
        let mut reader = Reader::from_str(xml);
        let mut targets = HashMap::new();

        loop {
            match reader.read_event()? {
                Event::Start(e) | Event::Empty(e)
                    if e.local_name().as_ref() == b"Relationship" =>
                {
                    let mut id = None;
                    let mut target = None;
                    for attr in e.attributes().flatten() {
                        let value = String::from_utf8_lossy(&attr.value).into_owned();
                        match attr.key.local_name().as_ref() {
                            b"Id" => id = Some(value),
                            b"Target" => target = Some(value),
                            _ => {}
                        }
                    }
                    if let (Some(id), Some(target)) = (id, target) {
                        targets.insert(id, target);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(targets)
    }

    /// Relationship targets are relative to `ppt/` unless absolute
    fn resolve_target(target: &str) -> String {
        match target.strip_prefix('/') {
            Some(absolute) => absolute.to_string(),
            None => format!("ppt/{}", target.trim_start_matches("./")),
        }
    }

    /// Text of every `<p:sp>` shape whose text body is non-empty.
    ///
    /// Runs within a paragraph are concatenated and paragraphs are joined
    /// with newlines.
    pub(super) fn shape_texts(filename: &str, xml: &str) -> Result<Vec<String>> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut shapes = Vec::new();
        let mut in_shape = false;
        let mut in_text = false;
        let mut paragraphs: Vec<String> = Vec::new();
        let mut paragraph = String::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => match e.local_name().as_ref() {
                    b"sp" => {
                        in_shape = true;
                        paragraphs.clear();
                    }
                    b"p" if in_shape => paragraph.clear(),
                    b"t" if in_shape => in_text = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) if in_shape => match e.local_name().as_ref() {
                    b"p" => paragraphs.push(String::new()),
                    b"br" => paragraph.push('\n'),
                    _ => {}
                },
                Ok(Event::Text(e)) if in_text => {
                    let text = e
                        .unescape()
                        .map_err(|err| Error::file_parse(filename, err.to_string()))?;
                    paragraph.push_str(&text);
                }
                Ok(Event::End(e)) => match e.local_name().as_ref() {
                    b"t" => in_text = false,
                    b"p" if in_shape => paragraphs.push(std::mem::take(&mut paragraph)),
                    b"sp" => {
                        let text = paragraphs.join("\n");
                        if !text.is_empty() {
                            shapes.push(text);
                        }
                        paragraphs.clear();
                        in_shape = false;
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::file_parse(filename, e.to_string())),
                _ => {}
            }
        }

        Ok(shapes)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_shape_texts_joins_runs_and_paragraphs() {
            let xml = r#"<p:sld xmlns:p="p" xmlns:a="a"><p:cSld><p:spTree>
                <p:sp><p:txBody><a:p><a:r><a:t>Hello </a:t></a:r><a:r><a:t>world</a:t></a:r></a:p><a:p><a:r><a:t>Second</a:t></a:r></a:p></p:txBody></p:sp>
                <p:sp><p:txBody><a:p/></p:txBody></p:sp>
                <p:pic><p:blipFill/></p:pic>
                <p:sp><p:txBody><a:p><a:r><a:t>Q&amp;A</a:t></a:r></a:p></p:txBody></p:sp>
            </p:spTree></p:cSld></p:sld>"#;

            let shapes = shape_texts("deck.pptx", xml).unwrap();
            assert_eq!(shapes, vec!["Hello world\nSecond".to_string(), "Q&A".to_string()]);
        }

        #[test]
        fn test_relationship_targets_resolve_under_ppt() {
            assert_eq!(resolve_target("slides/slide3.xml"), "ppt/slides/slide3.xml");
            assert_eq!(resolve_target("/ppt/slides/slide3.xml"), "ppt/slides/slide3.xml");
        }
    }
}

#[cfg(feature = "xlsx")]
mod excel {
    use calamine::{Data, Reader};

    use super::Result;
    use crate::error::Error;

    /// All sheets in declaration order as rows of display strings
    pub(super) fn read_sheets(
        filename: &str,
        data: &[u8],
    ) -> Result<Vec<(String, Vec<Vec<String>>)>> {
        let cursor = std::io::Cursor::new(data);
        let mut workbook = calamine::open_workbook_auto_from_rs(cursor)
            .map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut sheets = Vec::new();
        for sheet_name in workbook.sheet_names().to_vec() {
            let range = workbook.worksheet_range(&sheet_name).map_err(|e| {
                Error::file_parse(filename, format!("sheet '{}': {}", sheet_name, e))
            })?;

            let rows = range
                .rows()
                .map(|row| row.iter().map(cell_text).collect())
                .collect();
            sheets.push((sheet_name, rows));
        }

        Ok(sheets)
    }

    fn cell_text(cell: &Data) -> String {
        match cell {
            Data::Empty => String::new(),
            Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
            other => other.to_string(),
        }
    }
}

#[cfg(feature = "csv")]
mod delimited {
    use super::Result;
    use crate::error::Error;

    /// Header row and data rows of a comma separated table
    pub(super) fn read_table(
        filename: &str,
        data: &[u8],
    ) -> Result<(Vec<String>, Vec<Vec<String>>)> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(data);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| Error::file_parse(filename, e.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(Error::file_parse(filename, "No columns to parse from file"));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| Error::file_parse(filename, e.to_string()))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok((headers, rows))
    }
}
