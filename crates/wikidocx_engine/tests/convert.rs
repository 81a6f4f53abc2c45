use std::io::{Cursor, Read};

use wikidocx_engine::{DocumentConverter, MhtDocxConverter};
use zip::ZipArchive;

fn read_part(blob: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(blob.to_vec())).unwrap();
    let mut part = archive.by_name(name).unwrap();
    let mut content = String::new();
    part.read_to_string(&mut content).unwrap();
    content
}

#[test]
fn converter_emits_an_opc_package() {
    let blob = MhtDocxConverter.convert("<div><p>Hi</p></div>").unwrap();
    // ZIP local file header magic.
    assert_eq!(&blob[..4], b"PK\x03\x04");

    let mut archive = ZipArchive::new(Cursor::new(blob)).unwrap();
    let names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    for expected in [
        "[Content_Types].xml",
        "_rels/.rels",
        "word/document.xml",
        "word/_rels/document.xml.rels",
        "word/afchunk.mht",
    ] {
        assert!(names.iter().any(|n| n == expected), "missing {expected}");
    }
}

#[test]
fn document_references_the_html_chunk() {
    let blob = MhtDocxConverter.convert("<div></div>").unwrap();
    let document = read_part(&blob, "word/document.xml");
    assert!(document.contains(r#"<w:altChunk r:id="htmlChunk"/>"#));

    let rels = read_part(&blob, "word/_rels/document.xml.rels");
    assert!(rels.contains(r#"Target="/word/afchunk.mht""#));
}

#[test]
fn inline_images_are_moved_into_mht_parts() {
    let html = r#"<div><img src="data:image/png;base64,aGVsbG8="></div>"#;
    let blob = MhtDocxConverter.convert(html).unwrap();
    let mht = read_part(&blob, "word/afchunk.mht");

    assert!(mht.contains("Content-Location: file:///C:/fake/image0.png"));
    assert!(mht.contains("Content-Transfer-Encoding: base64"));
    assert!(mht.contains("aGVsbG8="));
    // The HTML part must reference the part, not the data URI.
    assert!(!mht.contains("data:image/png"));
    assert!(mht.contains("file:///C:/fake/image0.png"));
}

#[test]
fn html_part_is_quoted_printable_escaped() {
    let blob = MhtDocxConverter
        .convert(r#"<div><p class="a">x = y</p></div>"#)
        .unwrap();
    let mht = read_part(&blob, "word/afchunk.mht");
    assert!(mht.contains(r#"class=3D"a""#));
    assert!(mht.contains("x =3D y"));
}
