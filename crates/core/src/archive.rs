use crate::batch::{resolve_conflict, BatchEntry, BatchMapping, Progress};
use crate::sanitize::{sanitize_filename, split_extension};
use crate::source::FileSource;
use chrono::{DateTime, Datelike, Local, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::{self, Cursor, Seek, Write};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const MANIFEST_FILENAME: &str = "rename_manifest.txt";
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;
const MAX_COMPRESSION_LEVEL: u32 = 9;
const DEFAULT_ARCHIVE_NAME: &str = "renamed_photos";

const BUFFERED_MAX_FILES: usize = 10;
const BUFFERED_MAX_BYTES: u64 = 10 * 1024 * 1024;

const ALREADY_COMPRESSED: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "heic", "heif", "avif", "jxl", "mp4", "m4v", "mov",
    "avi", "mkv", "webm", "mp3", "m4a", "aac", "ogg", "opus", "flac", "zip", "gz", "bz2", "xz",
    "7z", "rar", "zst",
];

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("could not read {filename}: {source}")]
    ReadFailure {
        filename: String,
        #[source]
        source: io::Error,
    },
    #[error("archive encoder failed: {0}")]
    Encoder(#[from] zip::result::ZipError),
    #[error("archive output failed: {0}")]
    Io(#[from] io::Error),
    #[error("{files} files were given for {results} rename results")]
    MappingMismatch { files: usize, results: usize },
    #[error("archive is already finalized")]
    Finalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveStrategy {
    #[default]
    Auto,
    Buffered,
    Streaming,
}

impl ArchiveStrategy {
    fn resolve(self, file_count: usize, total_bytes: u64) -> ArchiveStrategy {
        match self {
            ArchiveStrategy::Auto
                if file_count <= BUFFERED_MAX_FILES && total_bytes <= BUFFERED_MAX_BYTES =>
            {
                ArchiveStrategy::Buffered
            }
            ArchiveStrategy::Auto => ArchiveStrategy::Streaming,
            other => other,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    pub compression_level: u32,
    pub include_manifest: bool,
    pub folder_prefix: Option<String>,
    pub strategy: ArchiveStrategy,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            include_manifest: true,
            folder_prefix: None,
            strategy: ArchiveStrategy::Auto,
        }
    }
}

impl ArchiveOptions {
    fn prefix(&self) -> Option<&str> {
        self.folder_prefix
            .as_deref()
            .map(|p| p.trim_matches('/'))
            .filter(|p| !p.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveResult {
    pub bytes: Vec<u8>,
    pub size_bytes: u64,
    pub suggested_filename: String,
    pub file_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub suggested_filename: String,
    pub file_count: usize,
    pub strategy: ArchiveStrategy,
}

pub fn create_archive<F: FileSource>(
    files: &[F],
    mapping: &BatchMapping,
    options: &ArchiveOptions,
) -> Result<ArchiveResult, ArchiveError> {
    create_archive_with_progress(files, mapping, options, &mut |_| {})
}

pub fn create_archive_with_progress<F: FileSource>(
    files: &[F],
    mapping: &BatchMapping,
    options: &ArchiveOptions,
    on_progress: &mut dyn FnMut(Progress),
) -> Result<ArchiveResult, ArchiveError> {
    let (cursor, summary) = assemble(
        Cursor::new(Vec::new()),
        files,
        mapping,
        options,
        Local::now(),
        on_progress,
    )?;
    let bytes = cursor.into_inner();
    Ok(ArchiveResult {
        size_bytes: bytes.len() as u64,
        bytes,
        suggested_filename: summary.suggested_filename,
        file_count: summary.file_count,
    })
}

/// Same as [`create_archive_with_progress`] but writes into `writer`.
///
/// On error the writer holds an incomplete archive and must be discarded.
pub fn write_archive<W: Write + Seek, F: FileSource>(
    writer: W,
    files: &[F],
    mapping: &BatchMapping,
    options: &ArchiveOptions,
    on_progress: &mut dyn FnMut(Progress),
) -> Result<(W, ArchiveSummary), ArchiveError> {
    assemble(writer, files, mapping, options, Local::now(), on_progress)
}

fn assemble<W: Write + Seek, F: FileSource>(
    writer: W,
    files: &[F],
    mapping: &BatchMapping,
    options: &ArchiveOptions,
    created_at: DateTime<Local>,
    on_progress: &mut dyn FnMut(Progress),
) -> Result<(W, ArchiveSummary), ArchiveError> {
    if files.len() != mapping.len() {
        return Err(ArchiveError::MappingMismatch {
            files: files.len(),
            results: mapping.len(),
        });
    }

    let total_bytes: u64 = files.iter().map(FileSource::size).sum();
    let strategy = options.strategy.resolve(files.len(), total_bytes);
    log::debug!(
        "archiving {} files ({} bytes) with {:?} strategy",
        files.len(),
        total_bytes,
        strategy
    );

    let mut assembler = ArchiveAssembler::new(writer, options, created_at);
    let pairs = mapping.entries().iter().zip(files);
    let total = files.len();
    let mut report = |index: usize, entry: &BatchEntry| {
        on_progress(Progress {
            processed: index + 1,
            total,
            current: entry.result.filename.clone(),
        })
    };

    match strategy {
        ArchiveStrategy::Streaming => {
            for (index, (entry, file)) in pairs.enumerate() {
                let bytes = read_source(file)?;
                assembler.add_entry(entry, &bytes, file.last_modified())?;
                report(index, entry);
            }
        }
        _ => {
            let loaded = pairs
                .map(|(entry, file)| -> Result<_, ArchiveError> {
                    Ok((entry, read_source(file)?, file.last_modified()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            for (index, (entry, bytes, modified)) in loaded.iter().enumerate() {
                assembler.add_entry(entry, bytes, *modified)?;
                report(index, entry);
            }
        }
    }

    if options.include_manifest {
        let manifest = assembler.add_manifest(&build_manifest(mapping, created_at))?;
        log::debug!("manifest written as {manifest}");
    }

    let file_count = assembler.entry_count();
    let writer = assembler.finish()?;
    log::info!("archive complete: {file_count} entries");

    Ok((
        writer,
        ArchiveSummary {
            suggested_filename: suggested_filename(options.prefix(), created_at),
            file_count,
            strategy,
        },
    ))
}

fn read_source<F: FileSource>(file: &F) -> Result<Vec<u8>, ArchiveError> {
    file.read_bytes().map_err(|source| ArchiveError::ReadFailure {
        filename: file.name().to_string(),
        source,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    Collecting,
    Finalizing,
    Complete,
}

pub struct ArchiveAssembler<W: Write + Seek> {
    zip: Option<ZipWriter<W>>,
    state: AssemblerState,
    compression_level: u32,
    prefix: Option<String>,
    created_at: DateTime<Local>,
    names: HashSet<String>,
}

impl<W: Write + Seek> ArchiveAssembler<W> {
    pub fn new(writer: W, options: &ArchiveOptions, created_at: DateTime<Local>) -> Self {
        Self {
            zip: Some(ZipWriter::new(writer)),
            state: AssemblerState::Collecting,
            compression_level: options.compression_level.min(MAX_COMPRESSION_LEVEL),
            prefix: options.prefix().map(str::to_string),
            created_at,
            names: HashSet::new(),
        }
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    pub fn entry_count(&self) -> usize {
        self.names.len()
    }

    pub fn add_entry(
        &mut self,
        entry: &BatchEntry,
        bytes: &[u8],
        modified: Option<DateTime<Local>>,
    ) -> Result<(), ArchiveError> {
        let (_, original_ext) = split_extension(&entry.original_name);
        let level = if is_already_compressed(original_ext) {
            0
        } else {
            self.compression_level
        };
        log::debug!("adding {} (level {level})", entry.result.filename);
        self.write(&entry.result.filename, bytes, level, modified.unwrap_or(self.created_at))
    }

    /// Adds the manifest under [`MANIFEST_FILENAME`], suffixed if a renamed
    /// file already took that name. Returns the name used.
    pub fn add_manifest(&mut self, text: &str) -> Result<String, ArchiveError> {
        let name = if self.names.contains(MANIFEST_FILENAME) {
            resolve_conflict(MANIFEST_FILENAME, &self.names)
        } else {
            MANIFEST_FILENAME.to_string()
        };
        self.write(&name, text.as_bytes(), self.compression_level, self.created_at)?;
        Ok(name)
    }

    pub fn finish(&mut self) -> Result<W, ArchiveError> {
        let zip = self.zip.take().ok_or(ArchiveError::Finalized)?;
        self.state = AssemblerState::Finalizing;
        let writer = zip.finish()?;
        self.state = AssemblerState::Complete;
        Ok(writer)
    }

    fn entry_path(&self, filename: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}/{filename}"),
            None => filename.to_string(),
        }
    }

    fn write(
        &mut self,
        name: &str,
        bytes: &[u8],
        level: u32,
        modified: DateTime<Local>,
    ) -> Result<(), ArchiveError> {
        if self.state != AssemblerState::Collecting {
            return Err(ArchiveError::Finalized);
        }
        let path = self.entry_path(name);
        let zip = self.zip.as_mut().ok_or(ArchiveError::Finalized)?;

        let options = SimpleFileOptions::default()
            .last_modified_time(zip_time(modified))
            .large_file(bytes.len() as u64 >= u64::from(u32::MAX));
        let options = if level == 0 {
            options.compression_method(CompressionMethod::Stored)
        } else {
            options
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(i64::from(level)))
        };

        zip.start_file(path, options)?;
        zip.write_all(bytes)?;
        self.names.insert(name.to_string());
        Ok(())
    }
}

fn is_already_compressed(extension: &str) -> bool {
    ALREADY_COMPRESSED
        .iter()
        .any(|ext| ext.eq_ignore_ascii_case(extension))
}

fn zip_time(time: DateTime<Local>) -> zip::DateTime {
    u16::try_from(time.year())
        .ok()
        .and_then(|year| {
            zip::DateTime::from_date_and_time(
                year,
                time.month() as u8,
                time.day() as u8,
                time.hour() as u8,
                time.minute() as u8,
                time.second() as u8,
            )
            .ok()
        })
        .unwrap_or_default()
}

pub fn build_manifest(mapping: &BatchMapping, created_at: DateTime<Local>) -> String {
    let mut out = String::new();
    out.push_str("Photo rename manifest\n");
    out.push_str(&format!("Created: {}\n", created_at.format("%Y-%m-%d %H:%M:%S")));
    out.push_str(&format!("Files: {}\n\n", mapping.len()));

    for entry in mapping.entries() {
        out.push_str(&format!(
            "{} → {}\n",
            entry.original_name, entry.result.filename
        ));
        for warning in &entry.result.warnings {
            out.push_str(&format!("  ! {warning}\n"));
        }
    }

    out
}

pub fn suggested_filename(folder: Option<&str>, created_at: DateTime<Local>) -> String {
    let base = folder
        .map(sanitize_filename)
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| DEFAULT_ARCHIVE_NAME.to_string());
    format!("{}_{}.zip", base, created_at.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{batch_rename, BatchOptions};
    use crate::source::MemoryFile;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::io::Read;
    use zip::ZipArchive;

    struct UnreadableFile;

    impl FileSource for UnreadableFile {
        fn name(&self) -> &str {
            "broken.jpg"
        }

        fn size(&self) -> u64 {
            10
        }

        fn last_modified(&self) -> Option<DateTime<Local>> {
            None
        }

        fn read_bytes(&self) -> io::Result<Vec<u8>> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
    }

    fn fixed_date() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2025, 10, 11, 14, 25, 30)
            .earliest()
            .expect("valid local date")
    }

    fn rename<F: FileSource>(files: &[F], template: &str) -> BatchMapping {
        let options = BatchOptions {
            fallback_date: Some(fixed_date()),
            ..BatchOptions::default()
        };
        batch_rename(files, template, &HashMap::new(), &options).expect("rename")
    }

    fn sample_files() -> Vec<MemoryFile> {
        vec![
            MemoryFile::new("IMG_0001.JPG", vec![0xAB; 2 * 1024 * 1024]),
            MemoryFile::new("notes.txt", "lorem ipsum ".repeat(850).into_bytes()),
        ]
    }

    fn open(bytes: Vec<u8>) -> ZipArchive<Cursor<Vec<u8>>> {
        ZipArchive::new(Cursor::new(bytes)).expect("valid zip")
    }

    fn assemble_at(
        files: &[MemoryFile],
        mapping: &BatchMapping,
        options: &ArchiveOptions,
    ) -> Vec<u8> {
        let (cursor, _) = assemble(
            Cursor::new(Vec::new()),
            files,
            mapping,
            options,
            fixed_date(),
            &mut |_| {},
        )
        .expect("archive");
        cursor.into_inner()
    }

    #[test]
    fn jpeg_is_stored_and_text_is_deflated() {
        let files = sample_files();
        let mapping = rename(&files, "{original}_{counter}");
        let result = create_archive(&files, &mapping, &ArchiveOptions::default()).expect("archive");

        assert_eq!(result.file_count, 3);
        assert_eq!(result.size_bytes, result.bytes.len() as u64);
        assert!(result.size_bytes > 2 * 1024 * 1024);

        let mut archive = open(result.bytes);
        let jpg = archive.by_name("IMG_0001_001.jpg").expect("jpg entry");
        assert_eq!(jpg.compression(), CompressionMethod::Stored);
        assert_eq!(jpg.compressed_size(), jpg.size());
        drop(jpg);

        let txt = archive.by_name("notes_002.txt").expect("txt entry");
        assert_eq!(txt.compression(), CompressionMethod::Deflated);
        assert!(txt.compressed_size() < txt.size());
    }

    #[test]
    fn archive_round_trips_every_entry() {
        let files = sample_files();
        let mapping = rename(&files, "{counter}");
        let result = create_archive(&files, &mapping, &ArchiveOptions::default()).expect("archive");

        let mut archive = open(result.bytes);
        assert_eq!(archive.len(), files.len() + 1);
        for (entry, file) in mapping.entries().iter().zip(&files) {
            let mut content = Vec::new();
            archive
                .by_name(&entry.result.filename)
                .expect("entry")
                .read_to_end(&mut content)
                .expect("read");
            assert_eq!(content, file.bytes);
        }
        assert!(archive.by_name(MANIFEST_FILENAME).is_ok());
    }

    #[test]
    fn manifest_steps_aside_for_a_renamed_file() {
        let files = vec![
            MemoryFile::new(MANIFEST_FILENAME, b"user notes".to_vec()),
            MemoryFile::new("b.jpg", b"2".to_vec()),
        ];
        let mapping = rename(&files, "{original}");
        assert_eq!(mapping.entries()[0].result.filename, MANIFEST_FILENAME);

        let result = create_archive(&files, &mapping, &ArchiveOptions::default()).expect("archive");
        assert_eq!(result.file_count, 3);

        let mut archive = open(result.bytes);
        assert_eq!(archive.len(), 3);
        let mut content = String::new();
        archive
            .by_name(MANIFEST_FILENAME)
            .expect("renamed file")
            .read_to_string(&mut content)
            .expect("read");
        assert_eq!(content, "user notes");
        content.clear();
        archive
            .by_name("rename_manifest_1.txt")
            .expect("manifest")
            .read_to_string(&mut content)
            .expect("read");
        assert!(content.starts_with("Photo rename manifest"));
    }

    #[test]
    fn manifest_is_optional() {
        let files = sample_files();
        let mapping = rename(&files, "{counter}");
        let options = ArchiveOptions {
            include_manifest: false,
            ..ArchiveOptions::default()
        };
        let result = create_archive(&files, &mapping, &options).expect("archive");
        assert_eq!(result.file_count, 2);
        assert_eq!(open(result.bytes).len(), 2);
    }

    #[test]
    fn buffered_and_streaming_produce_identical_bytes() {
        let files = sample_files();
        let mapping = rename(&files, "{original}");
        let buffered = ArchiveOptions {
            strategy: ArchiveStrategy::Buffered,
            ..ArchiveOptions::default()
        };
        let streaming = ArchiveOptions {
            strategy: ArchiveStrategy::Streaming,
            ..ArchiveOptions::default()
        };
        assert_eq!(
            assemble_at(&files, &mapping, &buffered),
            assemble_at(&files, &mapping, &streaming)
        );
    }

    #[test]
    fn auto_strategy_uses_thresholds() {
        assert_eq!(ArchiveStrategy::Auto.resolve(10, 1024), ArchiveStrategy::Buffered);
        assert_eq!(ArchiveStrategy::Auto.resolve(11, 1024), ArchiveStrategy::Streaming);
        assert_eq!(
            ArchiveStrategy::Auto.resolve(2, BUFFERED_MAX_BYTES + 1),
            ArchiveStrategy::Streaming
        );
        assert_eq!(ArchiveStrategy::Buffered.resolve(500, u64::MAX), ArchiveStrategy::Buffered);
    }

    #[test]
    fn folder_prefix_is_applied_to_every_entry() {
        let files = sample_files();
        let mapping = rename(&files, "{counter}");
        let options = ArchiveOptions {
            folder_prefix: Some("/Kyoto Trip/".to_string()),
            ..ArchiveOptions::default()
        };
        let result = create_archive(&files, &mapping, &options).expect("archive");
        assert!(result.suggested_filename.starts_with("Kyoto_Trip_"));
        assert!(result.suggested_filename.ends_with(".zip"));

        let archive = open(result.bytes);
        let mut names: Vec<_> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "Kyoto Trip/001.jpg".to_string(),
                "Kyoto Trip/002.txt".to_string(),
                format!("Kyoto Trip/{MANIFEST_FILENAME}"),
            ]
        );
    }

    #[test]
    fn level_zero_stores_everything() {
        let files = sample_files();
        let mapping = rename(&files, "{counter}");
        let options = ArchiveOptions {
            compression_level: 0,
            ..ArchiveOptions::default()
        };
        let result = create_archive(&files, &mapping, &options).expect("archive");
        let mut archive = open(result.bytes);
        for i in 0..archive.len() {
            let file = archive.by_index(i).expect("entry");
            assert_eq!(file.compression(), CompressionMethod::Stored);
        }
    }

    #[test]
    fn read_failure_fails_the_whole_archive() {
        let files = vec![UnreadableFile];
        let mapping = rename(&files, "{counter}");
        for strategy in [ArchiveStrategy::Buffered, ArchiveStrategy::Streaming] {
            let options = ArchiveOptions {
                strategy,
                ..ArchiveOptions::default()
            };
            let err = create_archive(&files, &mapping, &options).expect_err("must fail");
            match err {
                ArchiveError::ReadFailure { filename, .. } => assert_eq!(filename, "broken.jpg"),
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn mismatched_mapping_is_rejected() {
        let files = sample_files();
        let mapping = rename(&files[..1], "{counter}");
        let err = create_archive(&files, &mapping, &ArchiveOptions::default()).expect_err("must fail");
        assert!(matches!(
            err,
            ArchiveError::MappingMismatch {
                files: 2,
                results: 1
            }
        ));
    }

    #[test]
    fn assembler_rejects_entries_after_finish() {
        let files = sample_files();
        let mapping = rename(&files, "{counter}");
        let mut assembler =
            ArchiveAssembler::new(Cursor::new(Vec::new()), &ArchiveOptions::default(), fixed_date());
        assert_eq!(assembler.state(), AssemblerState::Collecting);
        assembler
            .add_entry(&mapping.entries()[0], b"abc", None)
            .expect("add");
        assembler.finish().expect("finish");
        assert_eq!(assembler.state(), AssemblerState::Complete);

        let err = assembler
            .add_entry(&mapping.entries()[1], b"def", None)
            .expect_err("must fail");
        assert!(matches!(err, ArchiveError::Finalized));
        assert!(matches!(assembler.finish(), Err(ArchiveError::Finalized)));
    }

    #[test]
    fn progress_reports_each_entry() {
        let files = sample_files();
        let mapping = rename(&files, "{counter}");
        let mut seen = Vec::new();
        create_archive_with_progress(&files, &mapping, &ArchiveOptions::default(), &mut |p| {
            seen.push(p.processed)
        })
        .expect("archive");
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn manifest_lists_renames_and_warnings() {
        let files = vec![
            MemoryFile::new("a.jpg", b"1".to_vec()),
            MemoryFile::new("b.jpg", b"2".to_vec()),
        ];
        let mapping = rename(&files, "{model}");
        let manifest = build_manifest(&mapping, fixed_date());

        assert!(manifest.contains("Created: 2025-10-11 14:25:30"));
        assert!(manifest.contains("Files: 2"));
        assert!(manifest.contains("a.jpg → .jpg\n"));
        assert!(manifest.contains("b.jpg → _1.jpg\n"));
        assert!(manifest.contains("  ! Camera model not available in EXIF data"));
        assert!(manifest.contains("  ! Filename conflict resolved with numeric suffix"));
        let a = manifest.find("a.jpg →").expect("a listed");
        let b = manifest.find("b.jpg →").expect("b listed");
        assert!(a < b);
    }

    #[test]
    fn suggested_filename_defaults_without_folder() {
        assert_eq!(
            suggested_filename(None, fixed_date()),
            "renamed_photos_20251011_142530.zip"
        );
        assert_eq!(
            suggested_filename(Some("trip"), fixed_date()),
            "trip_20251011_142530.zip"
        );
    }

    #[test]
    fn zip_time_keeps_local_fields_and_clamps_old_dates() {
        let time = zip_time(fixed_date());
        assert_eq!((time.year(), time.month(), time.day()), (2025, 10, 11));
        assert_eq!((time.hour(), time.minute()), (14, 25));

        let old = Local
            .with_ymd_and_hms(1970, 1, 1, 12, 0, 0)
            .earliest()
            .expect("valid local date");
        assert_eq!(zip_time(old).year(), 1980);
    }
}
