use crate::metadata::{MetadataProvider, MetadataRecord};
use crate::signature::{check_signature, MediaKind};
use crate::source::{FileSource, LocalFile};
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub scanned_files: usize,
    pub photo_files: usize,
    pub skipped_hidden: usize,
    pub skipped_other: usize,
}

pub fn collect_photo_files(
    root: &Path,
    recursive: bool,
    include_hidden: bool,
) -> Result<(Vec<PathBuf>, ScanStats)> {
    if !root.is_dir() {
        anyhow::bail!("input folder does not exist: {}", root.display());
    }

    let mut stats = ScanStats::default();
    let mut out = Vec::new();

    let paths: Vec<PathBuf> = if recursive {
        let mut paths = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry =
                entry.with_context(|| format!("failed to walk folder: {}", root.display()))?;
            if entry.file_type().is_file() {
                paths.push(entry.into_path());
            }
        }
        paths
    } else {
        let mut paths = Vec::new();
        for entry in
            fs::read_dir(root).with_context(|| format!("could not read folder: {}", root.display()))?
        {
            let entry = entry.with_context(|| format!("failed to read entry: {}", root.display()))?;
            let path = entry.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths
    };

    for path in paths {
        stats.scanned_files += 1;
        if is_hidden(&path) && !include_hidden {
            stats.skipped_hidden += 1;
            continue;
        }
        if is_photo(&path) {
            stats.photo_files += 1;
            out.push(path);
        } else {
            stats.skipped_other += 1;
        }
    }
    out.sort();

    log::debug!(
        "scanned {} files under {}: {} photos",
        stats.scanned_files,
        root.display(),
        stats.photo_files
    );
    Ok((out, stats))
}

#[derive(Debug)]
pub struct Inspection {
    pub kind: Option<MediaKind>,
    pub metadata: Option<MetadataRecord>,
}

pub fn inspect_files<P: MetadataProvider>(files: &[LocalFile], provider: &P) -> Vec<Inspection> {
    files
        .par_iter()
        .map(|file| {
            match file.read_bytes() {
                Ok(bytes) => match check_signature(file.name(), &bytes) {
                    Ok(kind) => Inspection {
                        kind: Some(kind),
                        metadata: provider.extract(&bytes),
                    },
                    Err(err) => {
                        log::warn!("skipping {}: {err}", file.path().display());
                        Inspection {
                            kind: None,
                            metadata: None,
                        }
                    }
                },
                Err(err) => {
                    log::warn!("could not read {}: {err}", file.path().display());
                    Inspection {
                        kind: None,
                        metadata: None,
                    }
                }
            }
        })
        .collect()
}

fn is_photo(path: &Path) -> bool {
    const EXTENSIONS: &[&str] = &[
        "jpg", "jpeg", "jpe", "jfif", "png", "gif", "webp", "tif", "tiff", "dng", "nef", "cr2",
        "arw", "orf", "rw2", "pef", "heic", "heif", "avif", "bmp",
    ];
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e))
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}
