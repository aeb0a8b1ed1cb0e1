// Filesystem side of the archiver.
//
// `scan_tree()` turns a directory into a `Corpus`, `compress_tree()` writes
// an archive for it, and `extract_archive()` restores a tree from one. The
// archive is fully decoded and validated in memory before anything is
// created under the destination.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::engine::{self, Corpus, DecodedTree, EncodeOptions, SourceFile};
use crate::error::{DeltaXError, Result};
use crate::format::section::GzipCodec;

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `compress_tree()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodeStats {
    pub files: usize,
    pub empty_dirs: usize,
    /// Sum of all input file sizes.
    pub input_bytes: u64,
    pub patterns: usize,
    /// Sum of all pattern lengths.
    pub pattern_bytes: u64,
    /// Reference segments across all files.
    pub references: u64,
    /// Literal bytes across all files.
    pub literal_bytes: u64,
    /// Size of the written archive.
    pub archive_bytes: u64,
}

/// Statistics returned by `extract_archive()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub files: usize,
    pub empty_dirs: usize,
    pub output_bytes: u64,
}

// ---------------------------------------------------------------------------
// Scan
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum EntryKind {
    File,
    Dir,
    Other,
}

#[derive(Debug)]
struct ScanEntry {
    depth: usize,
    kind: EntryKind,
    path: PathBuf,
    rel: String,
}

fn source_error(path: &Path, source: io::Error) -> DeltaXError {
    DeltaXError::Source {
        path: path.to_path_buf(),
        source,
    }
}

/// Relative path of `path` under `root`, `/`-separated.
fn relative_path(root: &Path, path: &Path) -> Result<String> {
    let rel = path.strip_prefix(root).map_err(|_| {
        source_error(
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "entry is outside the scan root"),
        )
    })?;
    let mut parts = Vec::new();
    for component in rel.components() {
        let part = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| DeltaXError::NonUtf8Path(path.to_path_buf()))?;
        parts.push(part);
    }
    Ok(parts.join("/"))
}

/// Walk `root` and read every regular file beneath it.
///
/// Entries are visited in file-name order, so the corpus order is stable
/// across runs. Symlinks are not followed and are skipped. A directory is
/// recorded as empty when it has no entries at all, skipped ones included.
pub fn scan_tree(root: &Path) -> Result<Corpus> {
    let meta = fs::metadata(root).map_err(|e| source_error(root, e))?;
    if !meta.is_dir() {
        return Err(source_error(
            root,
            io::Error::new(io::ErrorKind::NotADirectory, "scan root is not a directory"),
        ));
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            DeltaXError::Source {
                path,
                source: e.into(),
            }
        })?;
        let file_type = entry.file_type();
        let kind = if file_type.is_file() {
            EntryKind::File
        } else if file_type.is_dir() {
            EntryKind::Dir
        } else {
            warn!("skipping non-regular entry {}", entry.path().display());
            EntryKind::Other
        };
        entries.push(ScanEntry {
            depth: entry.depth(),
            kind,
            rel: relative_path(root, entry.path())?,
            path: entry.into_path(),
        });
    }

    let mut file_entries = Vec::new();
    let mut empty_dirs = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        match entry.kind {
            EntryKind::File => file_entries.push(entry),
            EntryKind::Dir => {
                let has_children = entries.get(i + 1).is_some_and(|next| next.depth > entry.depth);
                if !has_children {
                    empty_dirs.push(entry.rel.clone());
                }
            }
            EntryKind::Other => {}
        }
    }

    let files = engine::try_map_each(&file_entries, |entry| {
        let data = fs::read(&entry.path).map_err(|e| source_error(&entry.path, e))?;
        Ok(SourceFile {
            path: entry.rel.clone(),
            data,
        })
    })?;

    debug!(
        "scanned {}: {} files, {} empty directories",
        root.display(),
        files.len(),
        empty_dirs.len()
    );
    Ok(Corpus { files, empty_dirs })
}

// ---------------------------------------------------------------------------
// Compress
// ---------------------------------------------------------------------------

/// Scan `root`, encode it and write the archive to `output`.
pub fn compress_tree(root: &Path, output: &Path, opts: &EncodeOptions) -> Result<EncodeStats> {
    let corpus = engine::with_threads(opts.threads, || scan_tree(root))??;
    let archive = engine::encode_corpus(&corpus, opts)?;
    let (bytes, sizes) = archive.pack_with_sizes(&GzipCodec::new(opts.level))?;
    fs::write(output, &bytes)?;

    let records = &archive.files.files;
    let stats = EncodeStats {
        files: records.len(),
        empty_dirs: archive.files.empty_dirs.len(),
        input_bytes: corpus.input_bytes(),
        patterns: archive.patterns.len(),
        pattern_bytes: archive.patterns.total_bytes() as u64,
        references: records.iter().map(|r| r.reference_count() as u64).sum(),
        literal_bytes: records.iter().map(|r| r.literal_bytes() as u64).sum(),
        archive_bytes: sizes.total as u64,
    };
    info!(
        "wrote {} ({} bytes from {} input bytes, {} patterns)",
        output.display(),
        stats.archive_bytes,
        stats.input_bytes,
        stats.patterns
    );
    Ok(stats)
}

// ---------------------------------------------------------------------------
// Extract
// ---------------------------------------------------------------------------

/// Join an archive-relative path onto `root`, rejecting anything that could
/// escape it.
pub fn safe_join(root: &Path, rel: &str) -> Result<PathBuf> {
    let p = Path::new(rel);
    if rel.is_empty() || p.is_absolute() {
        return Err(DeltaXError::UnsafePath(rel.to_owned()));
    }
    for component in p.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(DeltaXError::UnsafePath(rel.to_owned()));
            }
        }
    }
    Ok(root.join(p))
}

/// Write a decoded tree under `dest`. Every path is checked before the
/// first write, and no two files may land on the same path.
pub fn write_tree(tree: &DecodedTree, dest: &Path) -> Result<DecodeStats> {
    let mut seen = HashSet::with_capacity(tree.files.len());
    let mut files = Vec::with_capacity(tree.files.len());
    for f in &tree.files {
        let path = safe_join(dest, &f.path)?;
        if !seen.insert(path.clone()) {
            return Err(DeltaXError::DuplicatePath(f.path.clone()));
        }
        files.push((path, f));
    }
    let dirs = tree
        .empty_dirs
        .iter()
        .map(|d| safe_join(dest, d))
        .collect::<Result<Vec<_>>>()?;

    fs::create_dir_all(dest)?;
    engine::try_map_each(&files, |(path, file)| {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &file.data)?;
        Ok(())
    })?;
    for dir in &dirs {
        fs::create_dir_all(dir)?;
    }

    Ok(DecodeStats {
        files: files.len(),
        empty_dirs: dirs.len(),
        output_bytes: tree.output_bytes(),
    })
}

/// Read `archive`, reconstruct it in memory and write it under `dest`.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<DecodeStats> {
    let bytes = fs::read(archive).map_err(|e| source_error(archive, e))?;
    let tree = engine::decode(&bytes)?;
    let stats = write_tree(&tree, dest)?;
    info!(
        "extracted {} files and {} empty directories to {}",
        stats.files,
        stats.empty_dirs,
        dest.display()
    );
    Ok(stats)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
