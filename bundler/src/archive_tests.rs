//! Unit tests for the rooted zip writer.

use super::*;
use rstest::rstest;
use std::collections::BTreeMap;
use std::io::Read;

fn read_entries(archive: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut zip = zip::ZipArchive::new(File::open(archive).expect("open archive")).expect("zip");
    (0..zip.len())
        .map(|index| {
            let mut entry = zip.by_index(index).expect("entry");
            let mut contents = Vec::new();
            entry.read_to_end(&mut contents).expect("read entry");
            (entry.name().to_owned(), contents)
        })
        .collect()
}

#[test]
fn round_trip_stores_root_relative_names() {
    let temp = tempfile::tempdir().expect("temp dir");
    let root = temp.path().join("a");
    fs::create_dir_all(&root).expect("create root");
    fs::write(root.join("b.txt"), "bee").expect("write");
    fs::write(root.join("c.txt"), "sea").expect("write");
    let archive = temp.path().join("out.zip");

    ArchiveWriter::scoped(&archive, &root, |writer| {
        writer.add(&root.join("b.txt"), None)?;
        writer.add(&root.join("c.txt"), None)?;
        Ok(())
    })
    .expect("write archive");

    let entries = read_entries(&archive);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries.get("b.txt").map(Vec::as_slice), Some(&b"bee"[..]));
    assert_eq!(entries.get("c.txt").map(Vec::as_slice), Some(&b"sea"[..]));
}

#[test]
fn nested_entries_use_forward_slashes() {
    let temp = tempfile::tempdir().expect("temp dir");
    let root = temp.path().join("lib");
    fs::create_dir_all(root.join("six/moves")).expect("create dirs");
    fs::write(root.join("six/moves/__init__.py"), "").expect("write");
    let archive = temp.path().join("packages.zip");

    let mut writer = ArchiveWriter::create(&archive, &root).expect("create");
    let name = writer
        .add(&root.join("six/moves/__init__.py"), None)
        .expect("add");
    writer.finish().expect("finish");

    assert_eq!(name, "six/moves/__init__.py");
    assert!(read_entries(&archive).contains_key("six/moves/__init__.py"));
}

#[test]
fn relative_names_resolve_against_root() {
    let temp = tempfile::tempdir().expect("temp dir");
    let root = temp.path().join("lib");
    fs::create_dir_all(root.join("pkg")).expect("create dirs");
    fs::write(root.join("pkg/mod.py"), "x = 1\n").expect("write");
    let archive = temp.path().join("packages.zip");

    let mut writer = ArchiveWriter::create(&archive, &root).expect("create");
    let name = writer.add(Path::new("./pkg/mod.py"), None).expect("add");
    writer.finish().expect("finish");

    assert_eq!(name, "pkg/mod.py");
}

#[rstest]
#[case::sibling_with_common_prefix("/srv/lib2/mod.py")]
#[case::parent_escape("/srv/lib/../secrets.txt")]
#[case::root_itself("/srv/lib")]
#[case::root_with_trailing_dot("/srv/lib/.")]
#[case::unrelated("/etc/passwd")]
#[case::relative_escape("../outside.py")]
fn entries_outside_root_are_rejected(#[case] candidate: &str) {
    let temp = tempfile::tempdir().expect("temp dir");
    let archive = temp.path().join("out.zip");
    let writer = ArchiveWriter::create(&archive, Path::new("/srv/lib")).expect("create");

    let err = writer
        .entry_name(Path::new(candidate))
        .expect_err("entry should be rejected");
    assert!(
        matches!(err, BundlerError::EntryOutsideRoot { ref root, .. } if root == Path::new("/srv/lib")),
        "unexpected error: {err}"
    );
}

#[test]
fn add_rejects_file_outside_root() {
    let temp = tempfile::tempdir().expect("temp dir");
    let root = temp.path().join("lib");
    fs::create_dir_all(&root).expect("create root");
    let stray = temp.path().join("stray.py");
    fs::write(&stray, "").expect("write");

    let mut writer = ArchiveWriter::create(&temp.path().join("out.zip"), &root).expect("create");
    let err = writer.add(&stray, None).expect_err("outside root");
    assert!(matches!(err, BundlerError::EntryOutsideRoot { .. }));
}

#[test]
fn scoped_finalises_archive_when_fill_fails() {
    let temp = tempfile::tempdir().expect("temp dir");
    let root = temp.path().join("lib");
    fs::create_dir_all(&root).expect("create root");
    fs::write(root.join("kept.py"), "kept").expect("write");
    let archive = temp.path().join("out.zip");

    let result: Result<()> = ArchiveWriter::scoped(&archive, &root, |writer| {
        writer.add(&root.join("kept.py"), None)?;
        writer.add(&temp.path().join("elsewhere.py"), None)?;
        Ok(())
    });

    assert!(matches!(result, Err(BundlerError::EntryOutsideRoot { .. })));
    let entries = read_entries(&archive);
    assert_eq!(entries.keys().collect::<Vec<_>>(), vec!["kept.py"]);
}

#[test]
fn dropping_unfinished_writer_finalises_archive() {
    let temp = tempfile::tempdir().expect("temp dir");
    let root = temp.path().join("lib");
    fs::create_dir_all(&root).expect("create root");
    fs::write(root.join("mod.py"), "pass").expect("write");
    let archive = temp.path().join("out.zip");

    {
        let mut writer = ArchiveWriter::create(&archive, &root).expect("create");
        writer.add(&root.join("mod.py"), None).expect("add");
    }

    assert!(read_entries(&archive).contains_key("mod.py"));
}

#[test]
fn entries_are_deflated() {
    let temp = tempfile::tempdir().expect("temp dir");
    let root = temp.path().join("lib");
    fs::create_dir_all(&root).expect("create root");
    fs::write(root.join("big.txt"), "a".repeat(4096)).expect("write");
    let archive = temp.path().join("out.zip");

    ArchiveWriter::scoped(&archive, &root, |writer| {
        writer.add(&root.join("big.txt"), None).map(drop)
    })
    .expect("write archive");

    let mut zip = zip::ZipArchive::new(File::open(&archive).expect("open")).expect("zip");
    let entry = zip.by_name("big.txt").expect("entry");
    assert_eq!(entry.compression(), CompressionMethod::Deflated);
    assert!(entry.compressed_size() < entry.size());
}
