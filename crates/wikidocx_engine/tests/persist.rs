use std::fs;

use tempfile::TempDir;
use wikidocx_engine::{ensure_output_dir, write_output_file, AtomicFileWriter};

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing_and_is_atomic() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("output.docx", b"hello").unwrap();
    assert_eq!(first.file_name().unwrap(), "output.docx");
    assert_eq!(fs::read(&first).unwrap(), b"hello");

    // Replace existing
    let second = writer.write("output.docx", b"world").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), b"world");
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    let result = writer.write("output.docx", b"data");
    assert!(result.is_err());
    assert!(!file_path.with_file_name("output.docx").exists());
}

#[test]
fn output_path_is_split_into_dir_and_name() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("nested").join("export.docx");
    let written = write_output_file(&target, b"blob").unwrap();
    assert_eq!(written, target);
    assert_eq!(fs::read(&target).unwrap(), b"blob");
}
