use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;
use webassembler::{try_walk_dir, walk_dir, WalkError};

fn tree(files: &[&str]) -> TempDir {
    let temp = TempDir::new().expect("tempdir");
    for relative in files {
        let path = temp.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).expect("create parent");
        fs::write(&path, relative).expect("write file");
    }
    temp
}

#[test]
fn callback_runs_once_per_file_with_full_list() {
    let temp = tree(&["a/1.md", "a/b/2.md"]);
    let mut calls: Vec<(PathBuf, Vec<PathBuf>)> = Vec::new();

    walk_dir(temp.path().join("a"), |path, all| {
        calls.push((path.to_path_buf(), all.to_vec()));
    })
    .expect("walk");

    assert_eq!(calls.len(), 2);
    let expected: BTreeSet<PathBuf> = [
        temp.path().join("a/1.md"),
        temp.path().join("a/b/2.md"),
    ]
    .into_iter()
    .collect();
    let visited: BTreeSet<PathBuf> = calls.iter().map(|(path, _)| path.clone()).collect();
    assert_eq!(visited, expected);

    for (idx, (path, all)) in calls.iter().enumerate() {
        assert_eq!(&all[idx], path, "callbacks follow list order");
        assert_eq!(all.iter().cloned().collect::<BTreeSet<_>>(), expected);
    }
}

#[test]
fn empty_directory_never_calls_back() {
    let temp = TempDir::new().expect("tempdir");
    fs::create_dir_all(temp.path().join("only/dirs")).unwrap();

    let mut count = 0;
    walk_dir(temp.path(), |_, _| count += 1).expect("walk");
    assert_eq!(count, 0);
}

#[test]
fn missing_root_fails_before_callbacks() {
    let temp = TempDir::new().expect("tempdir");
    let mut count = 0;
    let result = walk_dir(temp.path().join("missing"), |_, _| count += 1);

    assert!(matches!(result, Err(WalkError::Io { .. })));
    assert_eq!(count, 0);
}

#[test]
fn callback_errors_stop_the_walk() {
    let temp = tree(&["x.md", "y.md", "z.md"]);
    let mut seen = 0;

    let result: Result<(), Box<dyn std::error::Error>> = try_walk_dir(temp.path(), |_, _| {
        seen += 1;
        if seen == 2 {
            Err("stop".into())
        } else {
            Ok(())
        }
    });

    assert_eq!(result.unwrap_err().to_string(), "stop");
    assert_eq!(seen, 2);
}
