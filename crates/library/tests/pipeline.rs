use ndos_compress::Compression;
use ndos_config::Config;
use ndos_library::{Action, Classifier, Placement, archive_all, list_members, restructure};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;
use walkdir::WalkDir;

fn classifier() -> Classifier {
    Classifier::from_config(&Config::default()).unwrap()
}

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Every path under `root` (relative), with file contents, in walk order.
fn snapshot(root: &Path) -> Vec<(PathBuf, Option<Vec<u8>>)> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .map(Result::unwrap)
        .map(|e| {
            let contents = e.file_type().is_file().then(|| fs::read(e.path()).unwrap());
            (e.path().strip_prefix(root).unwrap().to_path_buf(), contents)
        })
        .collect()
}

/// Creates `<tmp>/in` and `<tmp>/project`, returning both (the project root
/// canonicalized, as it appears in reported destinations).
fn workspace(tmp: &Path) -> (PathBuf, PathBuf) {
    let src = tmp.join("in");
    let dest = tmp.join("project");
    fs::create_dir_all(&src).unwrap();
    fs::create_dir_all(&dest).unwrap();
    let dest = fs::canonicalize(dest).unwrap();
    (src, dest)
}

#[test]
fn test_files_land_in_their_placement() {
    let tmp = tempdir().unwrap();
    let (src, dest) = workspace(tmp.path());
    write(&src.join("inputA/sub-M001/20230501_scan.csv"), "scan");
    write(&src.join("inputA/other/random.bin"), "random");
    write(&src.join("inputA/.DS_Store"), "hidden");

    let actions = restructure(&src, &dest, classifier(), false).unwrap();
    assert_eq!(actions.len(), 2);

    let scan = dest.join("raw_data/M001/20230501/raw/20230501_scan.csv");
    let random = dest.join("raw_data/unknown_subject/unknown_session/raw/random.bin");
    assert_eq!(fs::read_to_string(&scan).unwrap(), "scan");
    assert_eq!(fs::read_to_string(&random).unwrap(), "random");
    assert!(src.join("inputA/.DS_Store").is_file());
    assert!(!src.join("inputA/sub-M001/20230501_scan.csv").exists());

    for action in &actions {
        let Action::Moved { from, to, placement, .. } = action else {
            panic!("expected a move, got {action:?}");
        };
        let prefix = dest.join("raw_data").join(&placement.subject).join(&placement.session).join("raw");
        assert!(to.starts_with(&prefix));
        assert_eq!(to.file_name(), from.file_name());
    }
    let placements: Vec<_> = actions.iter().map(Action::placement).cloned().collect();
    assert_eq!(
        placements,
        [Placement::new("unknown_subject", "unknown_session"), Placement::new("M001", "20230501")]
    );
}

#[test]
fn test_duplicate_names_are_disambiguated_in_order() {
    let tmp = tempdir().unwrap();
    let (src, dest) = workspace(tmp.path());
    write(&src.join("batch1/M002/20230101/data.csv"), "first");
    write(&src.join("batch2/M002/20230101/data.csv"), "second");
    write(&src.join("batch3/M002/20230101/data.csv"), "third");
    write(&src.join("batch1/M002/20230101/README"), "one");
    write(&src.join("batch2/M002/20230101/README"), "two");

    let actions = restructure(&src, &dest, classifier(), false).unwrap();
    let raw = dest.join("raw_data/M002/20230101/raw");
    assert_eq!(fs::read_to_string(raw.join("data.csv")).unwrap(), "first");
    assert_eq!(fs::read_to_string(raw.join("data_1.csv")).unwrap(), "second");
    assert_eq!(fs::read_to_string(raw.join("data_2.csv")).unwrap(), "third");
    assert_eq!(fs::read_to_string(raw.join("README")).unwrap(), "one");
    assert_eq!(fs::read_to_string(raw.join("README_1")).unwrap(), "two");

    // No two sources share a destination.
    let mut destinations: Vec<_> = actions.iter().map(Action::destination).collect();
    destinations.sort();
    destinations.dedup();
    assert_eq!(destinations.len(), 5);
}

#[test]
fn test_existing_destination_file_is_never_overwritten() {
    let tmp = tempdir().unwrap();
    let (src, dest) = workspace(tmp.path());
    write(&dest.join("raw_data/M003/20230202/raw/trace.npy"), "already here");
    write(&src.join("M003/20230202/trace.npy"), "incoming");

    let actions = restructure(&src, &dest, classifier(), false).unwrap();
    let raw = dest.join("raw_data/M003/20230202/raw");
    assert_eq!(actions[0].destination(), raw.join("trace_1.npy"));
    assert_eq!(fs::read_to_string(raw.join("trace.npy")).unwrap(), "already here");
    assert_eq!(fs::read_to_string(raw.join("trace_1.npy")).unwrap(), "incoming");
}

#[test]
fn test_dry_run_changes_nothing() {
    let tmp = tempdir().unwrap();
    let (src, dest) = workspace(tmp.path());
    write(&src.join("inputA/sub-M001/20230501_scan.csv"), "scan");
    write(&src.join("inputA/other/random.bin"), "random");
    let before = snapshot(tmp.path());

    let actions = restructure(&src, &dest, classifier(), true).unwrap();
    assert_eq!(actions.len(), 2);
    assert!(actions.iter().all(|a| matches!(a, Action::Planned { .. })));
    assert_eq!(snapshot(tmp.path()), before);
}

#[test]
fn test_archive_after_restructure() {
    let tmp = tempdir().unwrap();
    let (src, dest) = workspace(tmp.path());
    write(&src.join("rig/M002/20230101/data.csv"), "1,2,3");
    write(&src.join("rig/sub-M001/20230501_scan.csv"), "scan");
    // A session directory without `raw` is skipped.
    fs::create_dir_all(dest.join("raw_data/M009/20230909")).unwrap();

    restructure(&src, &dest, classifier(), false).unwrap();
    let archived = archive_all(&dest, Compression::Gzip).unwrap();

    let paths: Vec<_> = archived.iter().map(|a| a.path.clone()).collect();
    assert_eq!(
        paths,
        [dest.join("archives/M001_20230501.tar.gz"), dest.join("archives/M002_20230101.tar.gz")]
    );
    let members = list_members(dest.join("archives/M002_20230101.tar.gz")).unwrap();
    assert!(members.contains(&PathBuf::from("M002/20230101/raw/data.csv")));
    assert!(members.iter().all(|m| m.starts_with("M002/20230101/raw")));
    // Archiving doesn't consume the raw files.
    assert!(dest.join("raw_data/M002/20230101/raw/data.csv").is_file());
}

#[test]
fn test_archiving_twice_yields_same_members() {
    let tmp = tempdir().unwrap();
    let (src, dest) = workspace(tmp.path());
    write(&src.join("sub-R7/20220303/a.bin"), "a");
    write(&src.join("sub-R7/20220303/nested/b.bin"), "b");
    restructure(&src, &dest, classifier(), false).unwrap();

    let first = archive_all(&dest, Compression::Gzip).unwrap();
    let first_members = list_members(&first[0].path).unwrap();
    let second = archive_all(&dest, Compression::Gzip).unwrap();
    let second_members = list_members(&second[0].path).unwrap();

    assert_eq!(first[0].path, second[0].path);
    assert_eq!(first_members, second_members);
    assert_eq!(fs::read_dir(dest.join("archives")).unwrap().count(), 1);
}
