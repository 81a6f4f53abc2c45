use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Turns the final inlined markup into a binary document blob.
pub trait DocumentConverter: Send + Sync {
    fn convert(&self, html: &str) -> Result<Vec<u8>, ConvertError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("container write failed: {0}")]
    Container(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// DOCX converter using Word's altChunk import.
///
/// The HTML is not translated to WordprocessingML. Instead it is packaged
/// as an MHT part that `word/document.xml` pulls in through a `w:altChunk`
/// reference; Word performs the actual HTML import when the file is opened.
/// Inline `data:` images are moved out of the HTML into MHT parts of their
/// own because Word does not resolve data URIs inside an altChunk.
#[derive(Debug, Default, Clone, Copy)]
pub struct MhtDocxConverter;

impl DocumentConverter for MhtDocxConverter {
    fn convert(&self, html: &str) -> Result<Vec<u8>, ConvertError> {
        let mht = build_mht(html);

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(CONTENT_TYPES_XML.as_bytes())?;
        zip.start_file("_rels/.rels", options)?;
        zip.write_all(PACKAGE_RELS_XML.as_bytes())?;
        zip.start_file("word/document.xml", options)?;
        zip.write_all(DOCUMENT_XML.as_bytes())?;
        zip.start_file("word/_rels/document.xml.rels", options)?;
        zip.write_all(DOCUMENT_RELS_XML.as_bytes())?;
        zip.start_file("word/afchunk.mht", options)?;
        zip.write_all(mht.as_bytes())?;

        Ok(zip.finish()?.into_inner())
    }
}

const MHT_BOUNDARY: &str = "----=mhtDocumentPart";

struct MhtPart {
    location: String,
    content_type: String,
    payload_base64: String,
}

fn build_mht(html: &str) -> String {
    let (html, parts) = extract_data_uris(html);
    // Quoted-printable transfer encoding for the HTML part: only '=' needs
    // escaping, everything else is shipped as UTF-8.
    let html = html.replace('=', "=3D");

    let mut mht = format!(
        "MIME-Version: 1.0\r\n\
         Content-Type: multipart/related;\r\n\
         \ttype=\"text/html\";\r\n\
         \tboundary=\"{MHT_BOUNDARY}\"\r\n\
         \r\n\
         --{MHT_BOUNDARY}\r\n\
         Content-Type: text/html;\r\n\
         \tcharset=\"utf-8\"\r\n\
         Content-Transfer-Encoding: quoted-printable\r\n\
         Content-Location: file:///C:/fake/document.html\r\n\
         \r\n\
         {html}\r\n"
    );
    for part in &parts {
        mht.push_str(&format!(
            "\r\n--{MHT_BOUNDARY}\r\n\
             Content-Location: {}\r\n\
             Content-Type: {}\r\n\
             Content-Transfer-Encoding: base64\r\n\
             \r\n\
             {}\r\n",
            part.location,
            part.content_type,
            wrap_base64(&part.payload_base64)
        ));
    }
    mht.push_str(&format!("\r\n--{MHT_BOUNDARY}--\r\n"));
    mht
}

/// Moves every `"data:{type};base64,{payload}"` attribute value into an MHT
/// part and substitutes a fake content location the part is addressed by.
fn extract_data_uris(html: &str) -> (String, Vec<MhtPart>) {
    let mut out = String::with_capacity(html.len());
    let mut parts = Vec::new();
    let mut rest = html;

    while let Some(found) = rest.find("\"data:") {
        let value_start = found + 1;
        let Some(value_len) = rest[value_start..].find('"') else {
            break;
        };
        let value = &rest[value_start..value_start + value_len];
        out.push_str(&rest[..value_start]);
        match parse_data_uri(value, parts.len()) {
            Some(part) => {
                out.push_str(&part.location);
                parts.push(part);
            }
            None => out.push_str(value),
        }
        out.push('"');
        rest = &rest[value_start + value_len + 1..];
    }
    out.push_str(rest);
    (out, parts)
}

fn parse_data_uri(value: &str, index: usize) -> Option<MhtPart> {
    let (content_type, payload) = value.strip_prefix("data:")?.split_once(";base64,")?;
    if content_type.is_empty() || payload.is_empty() {
        return None;
    }
    let extension = content_type.rsplit('/').next().unwrap_or("bin");
    Some(MhtPart {
        location: format!("file:///C:/fake/image{index}.{extension}"),
        content_type: content_type.to_string(),
        payload_base64: payload.to_string(),
    })
}

fn wrap_base64(payload: &str) -> String {
    let mut wrapped = String::with_capacity(payload.len() + payload.len() / 76 * 2);
    let bytes = payload.as_bytes();
    for (i, chunk) in bytes.chunks(76).enumerate() {
        if i > 0 {
            wrapped.push_str("\r\n");
        }
        // Base64 payloads are always ASCII.
        wrapped.push_str(std::str::from_utf8(chunk).unwrap_or_default());
    }
    wrapped
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Default Extension="mht" ContentType="message/rfc822"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>
"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>
"#;

const DOCUMENT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <w:body>
    <w:altChunk r:id="htmlChunk"/>
    <w:sectPr>
      <w:pgSz w:w="12240" w:h="15840" w:orient="portrait"/>
      <w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/>
    </w:sectPr>
  </w:body>
</w:document>
"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="htmlChunk" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/aFChunk" Target="/word/afchunk.mht"/>
</Relationships>
"#;

#[cfg(test)]
mod tests {
    use super::{extract_data_uris, parse_data_uri};

    #[test]
    fn data_uris_become_addressed_parts() {
        let html = r#"<img src="data:image/png;base64,AAAA"><img src="/kept.png">"#;
        let (rewritten, parts) = extract_data_uris(html);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].location, "file:///C:/fake/image0.png");
        assert_eq!(parts[0].content_type, "image/png");
        assert_eq!(parts[0].payload_base64, "AAAA");
        assert_eq!(
            rewritten,
            r#"<img src="file:///C:/fake/image0.png"><img src="/kept.png">"#
        );
    }

    #[test]
    fn malformed_data_uri_is_left_in_place() {
        let html = r#"<img src="data:image/png,not-base64">"#;
        let (rewritten, parts) = extract_data_uris(html);
        assert!(parts.is_empty());
        assert_eq!(rewritten, html);
    }

    #[test]
    fn extension_comes_from_content_subtype() {
        let part = parse_data_uri("data:image/jpeg;base64,AA==", 3).unwrap();
        assert_eq!(part.location, "file:///C:/fake/image3.jpeg");
    }
}
