//! Per-session archiving.
//!
//! Every `raw_data/<Subject>/<Session>/raw` directory becomes one tarball,
//! `archives/<Subject>_<Session>.tar.gz` (or whichever [`Compression`] was
//! chosen), whose entries are rooted at `<Subject>/<Session>/raw`. Session
//! directories without a `raw` directory are skipped.
//!
//! Each archive is written to a hidden temporary file next to its final
//! location and renamed into place once complete, so a failure never leaves a
//! truncated archive behind. An existing archive of the same name is replaced.
//!
//! Sessions are independent: one failing doesn't stop the others. The failure
//! is reported once all sessions have been attempted.

pub mod error;

use crate::archive::error::{Error, ErrorKind, Result};
use crate::classify::Placement;
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::placement::{ARCHIVES_DIR, RAW_DATA_DIR, RAW_DIR};
use exn::ResultExt;
use ndos_compress::Compression;
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::vec::IntoIter;
use tracing::{debug, error, info, instrument, warn};
use walkdir::WalkDir;

/// Longest magic byte sequence among the supported formats.
const MAGIC_LEN: u64 = 8;

/// Mode requested for new archives, before the umask applies.
#[cfg(unix)]
const ARCHIVE_MODE: u32 = 0o666;

/// A successfully written session archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Archived {
    pub placement: Placement,
    pub path: PathBuf,
    /// Number of non-directory entries stored.
    pub files: usize,
}

/// Iterator over the archive results of every session under `raw_data`.
///
/// Unlike [`Restructurer`](crate::Restructurer), an `Err` item doesn't end
/// iteration. Use [`Archiver::run`] (or [`archive_all`]) to get the
/// fail-at-end behaviour.
#[derive(Debug)]
pub struct Archiver {
    archives_dir: PathBuf,
    compression: Compression,
    sessions: IntoIter<(Placement, PathBuf)>,
}

impl Archiver {
    /// Ensures `<dest_root>/archives` exists and lists the sessions to archive,
    /// in name order.
    ///
    /// A missing `raw_data` directory means there is nothing to do; that is
    /// logged, not an error.
    #[instrument(skip_all, fields(dest = %dest_root.as_ref().display(), compression = %compression))]
    pub fn new(dest_root: impl AsRef<Path>, compression: Compression) -> LibraryResult<Self> {
        Self::new_inner(dest_root.as_ref(), compression).or_raise(|| LibraryErrorKind::Archive)
    }

    fn new_inner(dest_root: &Path, compression: Compression) -> Result<Self> {
        if !dest_root.is_dir() {
            exn::bail!(ErrorKind::DestinationRoot(dest_root.to_path_buf()));
        }
        let archives_dir = dest_root.join(ARCHIVES_DIR);
        fs::create_dir_all(&archives_dir).or_raise(|| ErrorKind::Prepare(archives_dir.clone()))?;
        let sessions = sessions(&dest_root.join(RAW_DATA_DIR))?;
        info!(count = sessions.len(), "discovered sessions");
        Ok(Self { archives_dir, compression, sessions: sessions.into_iter() })
    }

    /// Number of sessions not yet attempted.
    pub fn remaining(&self) -> usize {
        self.sessions.len()
    }

    /// Archives every remaining session, calling `on_archived` after each one
    /// that succeeds.
    ///
    /// # Errors
    /// Failed sessions are logged as they happen. Once all sessions have been
    /// attempted, returns [`Exn<LibraryErrorKind::Archive>`](LibraryErrorKind::Archive)
    /// raised from [`Incomplete`](ErrorKind::Incomplete), which lists the
    /// archives that could not be written and carries each one's error as a
    /// child.
    pub fn run(mut self, mut on_archived: impl FnMut(&Archived)) -> LibraryResult<Vec<Archived>> {
        let attempted = self.remaining();
        let mut archived = Vec::with_capacity(attempted);
        let mut failed = vec![];
        let mut causes = vec![];
        for (placement, raw_dir) in std::mem::take(&mut self.sessions) {
            let archive = self.archive_path(&placement);
            match self.create(placement, &raw_dir, archive.clone()) {
                Ok(done) => {
                    on_archived(&done);
                    archived.push(done);
                },
                Err(err) => {
                    error!(archive = %archive.display(), "{err:?}");
                    failed.push(archive);
                    causes.push(err);
                },
            }
        }
        if !failed.is_empty() {
            let incomplete = ErrorKind::Incomplete { failed, attempted };
            return Err(Error::raise_all::<ErrorKind, _>(incomplete, causes)).or_raise(|| LibraryErrorKind::Archive);
        }
        Ok(archived)
    }

    fn archive_path(&self, placement: &Placement) -> PathBuf {
        let name = format!("{}_{}.tar{}", placement.subject, placement.session, self.compression.extension());
        self.archives_dir.join(name)
    }

    #[instrument(level = "debug", skip_all, fields(archive = %archive.display()))]
    fn create(&self, placement: Placement, raw_dir: &Path, archive: PathBuf) -> Result<Archived> {
        let failed = || ErrorKind::Create { archive: archive.clone() };
        let mut options = tempfile::Builder::new();
        options.prefix(".").suffix(".partial");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            options.permissions(fs::Permissions::from_mode(ARCHIVE_MODE));
        }
        let mut temp = options.tempfile_in(&self.archives_dir).or_raise(failed)?;

        let encoder = self.compression.encoder(temp.as_file_mut()).or_raise(failed)?;
        let mut builder = tar::Builder::new(encoder);
        builder.follow_symlinks(false);
        let root = Path::new(&placement.subject).join(&placement.session).join(RAW_DIR);
        let files = append_tree(&mut builder, raw_dir, &root).or_raise(failed)?;
        builder.into_inner().or_raise(failed)?.finish().or_raise(failed)?;

        temp.as_file().sync_all().or_raise(failed)?;
        temp.persist(&archive).or_raise(failed)?;
        info!(archive = %archive.display(), files, "archived");
        Ok(Archived { placement, path: archive, files })
    }
}

impl Iterator for Archiver {
    type Item = LibraryResult<Archived>;

    fn next(&mut self) -> Option<Self::Item> {
        let (placement, raw_dir) = self.sessions.next()?;
        let archive = self.archive_path(&placement);
        Some(self.create(placement, &raw_dir, archive).or_raise(|| LibraryErrorKind::Archive))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.sessions.size_hint()
    }
}

/// Archives every session under `<dest_root>/raw_data`; see [`Archiver::run`].
pub fn archive_all(dest_root: impl AsRef<Path>, compression: Compression) -> LibraryResult<Vec<Archived>> {
    Archiver::new(dest_root, compression)?.run(|_| ())
}

/// Lists the entry paths stored in an archive, in stored order.
///
/// The compression is taken from the file extension and must agree with the
/// file's magic bytes.
#[instrument(skip_all, fields(archive = %archive.as_ref().display()))]
pub fn list_members(archive: impl AsRef<Path>) -> LibraryResult<Vec<PathBuf>> {
    list_members_inner(archive.as_ref()).or_raise(|| LibraryErrorKind::Archive)
}

fn list_members_inner(archive: &Path) -> Result<Vec<PathBuf>> {
    let unreadable = || ErrorKind::Read(archive.to_path_buf());
    let compression = Compression::from_path(archive);
    let mut file = File::open(archive).or_raise(unreadable)?;

    let mut head = vec![];
    (&mut file).take(MAGIC_LEN).read_to_end(&mut head).or_raise(unreadable)?;
    if !compression.check_magic_bytes(&head) {
        exn::bail!(ErrorKind::Format(archive.to_path_buf()));
    }
    file.seek(SeekFrom::Start(0)).or_raise(unreadable)?;

    let reader = compression.wrap_reader(BufReader::new(file)).or_raise(unreadable)?;
    let mut tarball = tar::Archive::new(reader);
    let mut members = vec![];
    for entry in tarball.entries().or_raise(unreadable)? {
        let entry = entry.or_raise(unreadable)?;
        members.push(entry.path().or_raise(unreadable)?.into_owned());
    }
    debug!(count = members.len(), "listed archive members");
    Ok(members)
}

/// Finds `<Subject>/<Session>/raw` directories under `raw_data`, in name order.
fn sessions(raw_data: &Path) -> Result<Vec<(Placement, PathBuf)>> {
    if !raw_data.is_dir() {
        warn!(path = %raw_data.display(), "nothing to archive, no raw data directory");
        return Ok(vec![]);
    }
    let mut found = vec![];
    let walker = WalkDir::new(raw_data).min_depth(2).max_depth(2).follow_links(false).sort_by_file_name();
    for entry in walker {
        let entry = entry.or_raise(|| ErrorKind::Prepare(raw_data.to_path_buf()))?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let raw_dir = entry.path().join(RAW_DIR);
        if !fs::symlink_metadata(&raw_dir).is_ok_and(|meta| meta.is_dir()) {
            debug!(session = %entry.path().display(), "no raw directory, skipping");
            continue;
        }
        let Some(subject) = entry.path().parent().and_then(Path::file_name) else {
            continue;
        };
        let placement = Placement::new(subject.to_string_lossy(), entry.file_name().to_string_lossy());
        found.push((placement, raw_dir));
    }
    Ok(found)
}

/// Appends `raw_dir` and everything below it under `root`, in name order.
/// Returns the number of non-directory entries written.
fn append_tree<W: Write>(builder: &mut tar::Builder<W>, raw_dir: &Path, root: &Path) -> io::Result<usize> {
    let mut files = 0;
    for entry in WalkDir::new(raw_dir).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        let relative = entry.path().strip_prefix(raw_dir).map_err(io::Error::other)?;
        let name = if relative.as_os_str().is_empty() { root.to_path_buf() } else { root.join(relative) };
        if entry.file_type().is_dir() {
            builder.append_dir(&name, entry.path())?;
        } else {
            builder.append_path_with_name(entry.path(), &name)?;
            files += 1;
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ops::Deref;

    fn touch(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_sessions_requires_raw_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let raw_data = temp_dir.path().join(RAW_DATA_DIR);
        touch(&raw_data.join("M2/20230101/raw/data.csv"), "x");
        touch(&raw_data.join("M1/20230102/raw/b.csv"), "x");
        touch(&raw_data.join("M1/20230101/notes.txt"), "x");
        touch(&raw_data.join("M1/20230103/raw"), "a file, not a directory");
        touch(&raw_data.join("stray.txt"), "x");
        let found: Vec<_> = sessions(&raw_data).unwrap().into_iter().map(|(p, _)| p).collect();
        assert_eq!(found, [Placement::new("M1", "20230102"), Placement::new("M2", "20230101")]);
    }

    #[test]
    fn test_missing_raw_data_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let archived = archive_all(temp_dir.path(), Compression::Gzip).unwrap();
        assert!(archived.is_empty());
        assert!(temp_dir.path().join(ARCHIVES_DIR).is_dir());
    }

    #[test]
    fn test_missing_destination_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("missing");
        let err = Archiver::new_inner(&missing, Compression::Gzip).unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::DestinationRoot(p) if p == &missing));
    }

    #[test]
    fn test_archive_members_are_rooted_and_sorted() {
        let temp_dir = tempfile::tempdir().unwrap();
        let raw = temp_dir.path().join("raw_data/M002/20230101/raw");
        touch(&raw.join("data.csv"), "1,2,3");
        touch(&raw.join("a/nested.txt"), "n");

        let archived = archive_all(temp_dir.path(), Compression::Gzip).unwrap();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].path, temp_dir.path().join("archives/M002_20230101.tar.gz"));
        assert_eq!(archived[0].files, 2);

        let members = list_members(&archived[0].path).unwrap();
        let expected: Vec<PathBuf> = ["M002/20230101/raw", "M002/20230101/raw/a", "M002/20230101/raw/a/nested.txt", "M002/20230101/raw/data.csv"]
            .into_iter()
            .map(PathBuf::from)
            .collect();
        assert_eq!(members, expected);
        // Nothing left over from the temporary file.
        assert_eq!(fs::read_dir(temp_dir.path().join(ARCHIVES_DIR)).unwrap().count(), 1);
    }

    #[test]
    fn test_compression_picks_extension() {
        let temp_dir = tempfile::tempdir().unwrap();
        touch(&temp_dir.path().join("raw_data/S1/20240101/raw/x.bin"), "x");
        let bz2 = archive_all(temp_dir.path(), Compression::Bzip2).unwrap();
        assert_eq!(bz2[0].path.file_name().unwrap(), "S1_20240101.tar.bz2");
        let plain = archive_all(temp_dir.path(), Compression::None).unwrap();
        assert_eq!(plain[0].path.file_name().unwrap(), "S1_20240101.tar");
        assert_eq!(list_members(&bz2[0].path).unwrap(), list_members(&plain[0].path).unwrap());
    }

    #[test]
    fn test_list_members_rejects_mismatched_format() {
        let temp_dir = tempfile::tempdir().unwrap();
        let fake = temp_dir.path().join("fake.tar.gz");
        fs::write(&fake, b"definitely not gzip").unwrap();
        let err = list_members_inner(&fake).unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::Format(p) if p == &fake));
    }

    #[test]
    fn test_list_members_missing_archive() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = list_members(temp_dir.path().join("nope.tar.gz")).unwrap_err();
        assert!(matches!(err.deref(), LibraryErrorKind::Archive));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_stored_as_links() {
        let temp_dir = tempfile::tempdir().unwrap();
        let raw = temp_dir.path().join("raw_data/M1/20230101/raw");
        touch(&raw.join("data.csv"), "d");
        std::os::unix::fs::symlink("data.csv", raw.join("latest.csv")).unwrap();
        let archived = archive_all(temp_dir.path(), Compression::None).unwrap();

        let mut tarball = tar::Archive::new(File::open(&archived[0].path).unwrap());
        let link = tarball
            .entries()
            .unwrap()
            .map(|entry| entry.unwrap())
            .find(|e| e.path().unwrap().ends_with("latest.csv"))
            .unwrap();
        assert!(link.header().entry_type().is_symlink());
        assert_eq!(link.link_name().unwrap().unwrap(), Path::new("data.csv"));
    }

    #[test]
    fn test_failure_is_reported_after_other_sessions() {
        let temp_dir = tempfile::tempdir().unwrap();
        let raw_data = temp_dir.path().join(RAW_DATA_DIR);
        touch(&raw_data.join("A/20230101/raw/ok.csv"), "ok");
        touch(&raw_data.join("B/20230101/raw/blocked.csv"), "b");
        touch(&raw_data.join("C/20230101/raw/ok.csv"), "ok");
        // A directory where B's archive should go can't be replaced by a file.
        let archives = temp_dir.path().join(ARCHIVES_DIR);
        let blocked = archives.join("B_20230101.tar.gz");
        fs::create_dir_all(&blocked).unwrap();

        let mut printed = vec![];
        let err = Archiver::new(temp_dir.path(), Compression::Gzip)
            .unwrap()
            .run(|a| printed.push(a.placement.clone()))
            .unwrap_err();
        assert!(matches!(err.deref(), LibraryErrorKind::Archive));
        assert_eq!(printed, [Placement::new("A", "20230101"), Placement::new("C", "20230101")]);

        let incomplete = &err.frame().children()[0];
        let kind = incomplete.error().downcast_ref::<ErrorKind>().unwrap();
        assert!(matches!(kind, ErrorKind::Incomplete { failed, attempted: 3 } if failed == &[blocked.clone()]));
        assert!(kind.to_string().contains("B_20230101.tar.gz"));
        let cause = incomplete.children()[0].error().downcast_ref::<ErrorKind>().unwrap();
        assert!(matches!(cause, ErrorKind::Create { archive } if archive == &blocked));
        assert_eq!(incomplete.children().len(), 1);

        assert!(archives.join("A_20230101.tar.gz").is_file());
        assert!(archives.join("C_20230101.tar.gz").is_file());
        assert!(blocked.is_dir());
        // No temporary files left behind.
        assert_eq!(fs::read_dir(&archives).unwrap().count(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_archive_mode_follows_umask() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        touch(&temp_dir.path().join("raw_data/M1/20230101/raw/data.csv"), "d");
        let archived = archive_all(temp_dir.path(), Compression::Gzip).unwrap();
        let reference = temp_dir.path().join("reference");
        File::create(&reference).unwrap();
        let mode = |path: &Path| fs::metadata(path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&archived[0].path), mode(&reference));
    }
}
