//! RamFs Tests

use super::*;

fn fresh() -> RamFs {
    let mut fs = RamFs::new();
    fs.format();
    fs
}

fn read_to_vec(fs: &RamFs, path: &str) -> std::vec::Vec<u8> {
    let mut buf = [0u8; MAX_CONTENT];
    let n = fs.read(path, &mut buf).unwrap();
    buf[..n].to_vec()
}

#[test]
fn root_aliases_resolve_identically() {
    let fs = fresh();
    assert_eq!(fs.resolve("/"), Some(0));
    assert_eq!(fs.resolve(""), Some(0));
    assert_eq!(fs.resolve("."), Some(0));
    assert!(fs.exists("/"));
}

#[test]
fn write_then_read_returns_content() {
    let mut fs = fresh();
    fs.write("hello.txt", b"Hello, World!").unwrap();
    assert_eq!(read_to_vec(&fs, "hello.txt"), b"Hello, World!");
    // Leading slash reaches the same node.
    assert_eq!(read_to_vec(&fs, "/hello.txt"), b"Hello, World!");
}

#[test]
fn read_truncates_to_caller_buffer() {
    let mut fs = fresh();
    fs.write("a.txt", b"0123456789").unwrap();
    let mut small = [0u8; 4];
    assert_eq!(fs.read("a.txt", &mut small), Ok(4));
    assert_eq!(&small, b"0123");
}

#[test]
fn write_truncates_to_content_capacity() {
    let mut fs = fresh();
    let big = [b'x'; MAX_CONTENT + 100];
    fs.write("big", &big).unwrap();
    assert_eq!(fs.stat("big").unwrap().size, MAX_CONTENT);
}

#[test]
fn overwrite_replaces_content_and_size() {
    let mut fs = fresh();
    fs.write("f", b"a long first version").unwrap();
    fs.write("f", b"short").unwrap();
    assert_eq!(read_to_vec(&fs, "f"), b"short");
    assert_eq!(fs.stat("f").unwrap().size, 5);
}

#[test]
fn read_of_missing_path_and_of_directory_fail_distinctly() {
    let mut fs = fresh();
    fs.create_dir("d").unwrap();
    let mut buf = [0u8; 8];
    assert_eq!(fs.read("nope", &mut buf), Err(FsError::NotFound));
    assert_eq!(fs.read("d", &mut buf), Err(FsError::IsADirectory));
}

#[test]
fn write_over_directory_is_refused() {
    let mut fs = fresh();
    fs.create_dir("d").unwrap();
    assert_eq!(fs.write("d", b"x"), Err(FsError::IsADirectory));
}

#[test]
fn create_in_missing_parent_vs_file_parent() {
    let mut fs = fresh();
    fs.write("file", b"").unwrap();
    // Parent missing and parent-is-a-file are distinct failures.
    assert_eq!(fs.write("no/child", b"x"), Err(FsError::NotFound));
    assert_eq!(fs.write("file/child", b"x"), Err(FsError::NotADirectory));
    assert_eq!(fs.create_dir("no/child"), Err(FsError::NotFound));
    assert_eq!(fs.create_dir("file/child"), Err(FsError::NotADirectory));
}

#[test]
fn mkdir_twice_fails_then_slot_is_reusable() {
    let mut fs = fresh();
    fs.create_dir("d").unwrap();
    assert_eq!(fs.create_dir("d"), Err(FsError::AlreadyExists));
    fs.remove("d").unwrap();
    fs.create_dir("d").unwrap();
}

#[test]
fn remove_non_empty_directory_is_refused_until_emptied() {
    let mut fs = fresh();
    fs.create_dir("d").unwrap();
    fs.write("d/child", b"x").unwrap();
    assert_eq!(fs.remove("d"), Err(FsError::NotEmpty));
    fs.remove("d/child").unwrap();
    fs.remove("d").unwrap();
    assert!(!fs.exists("d"));
}

#[test]
fn root_is_never_deletable() {
    let mut fs = fresh();
    assert_eq!(fs.remove("/"), Err(FsError::PermissionDenied));
    assert_eq!(fs.remove(""), Err(FsError::PermissionDenied));
    assert_eq!(fs.remove("."), Err(FsError::PermissionDenied));
    assert!(fs.exists("/"));
}

#[test]
fn remove_missing_path_reports_not_found() {
    let mut fs = fresh();
    assert_eq!(fs.remove("ghost"), Err(FsError::NotFound));
}

#[test]
fn read_dir_distinguishes_empty_from_failed() {
    let mut fs = fresh();
    fs.create_dir("empty").unwrap();
    fs.write("file", b"").unwrap();

    assert_eq!(fs.read_dir("empty").unwrap().len(), 0);
    assert_eq!(fs.read_dir("ghost").unwrap_err(), FsError::NotFound);
    assert_eq!(fs.read_dir("file").unwrap_err(), FsError::NotADirectory);
}

#[test]
fn read_dir_lists_only_immediate_children_with_kind() {
    let mut fs = fresh();
    fs.create_dir("d").unwrap();
    fs.create_dir("d/sub").unwrap();
    fs.write("d/f.txt", b"x").unwrap();
    fs.write("other", b"x").unwrap();

    let entries = fs.read_dir("d").unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().any(|e| e.name.as_str() == "sub" && e.is_dir));
    assert!(entries.iter().any(|e| e.name.as_str() == "f.txt" && !e.is_dir));
}

#[test]
fn nested_paths_resolve_component_by_component() {
    let mut fs = fresh();
    fs.create_dir("a").unwrap();
    fs.create_dir("a/b").unwrap();
    fs.write("a/b/c.txt", b"deep").unwrap();

    assert_eq!(read_to_vec(&fs, "/a/b/c.txt"), b"deep");
    // Doubled separators collapse.
    assert_eq!(read_to_vec(&fs, "//a//b//c.txt"), b"deep");
}

#[test]
fn sibling_names_are_unique_but_not_global() {
    let mut fs = fresh();
    fs.create_dir("a").unwrap();
    fs.create_dir("b").unwrap();
    fs.write("a/same", b"in a").unwrap();
    fs.write("b/same", b"in b").unwrap();

    assert_eq!(read_to_vec(&fs, "a/same"), b"in a");
    assert_eq!(read_to_vec(&fs, "b/same"), b"in b");
}

#[test]
fn node_table_exhaustion_reports_no_space() {
    let mut fs = fresh();
    // Slot 0 is the root; the other MAX_NODES - 1 slots fill up.
    for i in 0..MAX_NODES - 1 {
        let mut name = std::string::String::new();
        use std::fmt::Write;
        write!(name, "f{}", i).unwrap();
        fs.write(&name, b"").unwrap();
    }
    assert_eq!(fs.write("one-more", b""), Err(FsError::NoSpace));
    assert_eq!(fs.create_dir("one-more"), Err(FsError::NoSpace));

    // Freeing any slot makes creation possible again.
    fs.remove("f0").unwrap();
    fs.write("one-more", b"").unwrap();
}

#[test]
fn long_component_names_truncate_consistently() {
    let mut fs = fresh();
    let long = "x".repeat(MAX_NAME * 2);
    fs.write(&long, b"data").unwrap();
    // Lookup truncates the same way, so the file is reachable both by
    // the original over-long name and its truncated form.
    assert_eq!(read_to_vec(&fs, &long), b"data");
    assert_eq!(read_to_vec(&fs, &long[..MAX_NAME - 1]), b"data");
}

#[test]
fn invalid_creation_targets_are_rejected() {
    let mut fs = fresh();
    // The empty path and "/" alias the root, which is a directory.
    assert_eq!(fs.write("", b"x"), Err(FsError::IsADirectory));
    assert_eq!(fs.create_dir("/"), Err(FsError::AlreadyExists));
}

#[test]
fn stat_reports_size_and_kind() {
    let mut fs = fresh();
    fs.create_dir("d").unwrap();
    fs.write("f", b"12345").unwrap();

    assert_eq!(fs.stat("f"), Ok(FileStat { size: 5, is_dir: false }));
    assert_eq!(fs.stat("d"), Ok(FileStat { size: 0, is_dir: true }));
    assert_eq!(fs.stat("ghost"), Err(FsError::NotFound));
}

#[test]
fn end_to_end_docs_scenario() {
    let mut fs = fresh();
    fs.create_dir("docs").unwrap();
    fs.write("docs/a.txt", b"hello").unwrap();

    let entries = fs.read_dir("docs").unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name.as_str(), "a.txt");
    assert!(!entries[0].is_dir);

    assert_eq!(read_to_vec(&fs, "docs/a.txt"), b"hello");

    fs.remove("docs/a.txt").unwrap();
    fs.remove("docs").unwrap();

    let root_entries = fs.read_dir("/").unwrap();
    assert!(root_entries.iter().all(|e| e.name.as_str() != "docs"));
}
