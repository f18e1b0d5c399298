use crate::metadata::MetadataRecord;
use crate::resolver::{generate_filename_parsed, RenameOptions, RenameResult, DEFAULT_COUNTER_PADDING};
use crate::sanitize::split_extension;
use crate::source::FileSource;
use crate::template::{parse_template, validate_template, TemplateError};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub const CONFLICT_WARNING: &str = "Filename conflict resolved with numeric suffix";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub usize);

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub start_counter: u64,
    pub counter_padding: usize,
    pub custom_text: String,
    pub fallback_date: Option<DateTime<Local>>,
    pub preserve_extension: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            start_counter: 1,
            counter_padding: DEFAULT_COUNTER_PADDING,
            custom_text: String::new(),
            fallback_date: None,
            preserve_extension: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
    pub current: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntry {
    pub id: FileId,
    pub original_name: String,
    pub counter: u64,
    pub result: RenameResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchMapping {
    entries: Vec<BatchEntry>,
}

impl BatchMapping {
    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    pub fn get(&self, id: FileId) -> Option<&BatchEntry> {
        self.entries.get(id.0).filter(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.result.filename.as_str())
    }

    pub fn warning_count(&self) -> usize {
        self.entries.iter().map(|e| e.result.warnings.len()).sum()
    }
}

pub fn batch_rename<F: FileSource>(
    files: &[F],
    template: &str,
    metadata: &HashMap<FileId, MetadataRecord>,
    options: &BatchOptions,
) -> Result<BatchMapping, TemplateError> {
    batch_rename_with_progress(files, template, metadata, options, &mut |_| {})
}

/// Renames every file in `files`, assigning counters by list position and
/// suffixing any name already taken earlier in the batch. `metadata` is keyed
/// by each file's position in `files`.
pub fn batch_rename_with_progress<F: FileSource>(
    files: &[F],
    template: &str,
    metadata: &HashMap<FileId, MetadataRecord>,
    options: &BatchOptions,
    on_progress: &mut dyn FnMut(Progress),
) -> Result<BatchMapping, TemplateError> {
    validate_template(template)?;
    let parsed = parse_template(template);
    let started_at = Local::now();

    let mut used = HashSet::<String>::with_capacity(files.len());
    let mut entries = Vec::with_capacity(files.len());

    for (index, file) in files.iter().enumerate() {
        let id = FileId(index);
        let counter = options.start_counter.saturating_add(index as u64);
        let rename_options = RenameOptions {
            counter,
            counter_padding: options.counter_padding,
            custom_text: options.custom_text.clone(),
            fallback_date: options
                .fallback_date
                .or_else(|| file.last_modified())
                .unwrap_or(started_at),
            preserve_extension: options.preserve_extension,
        };

        let mut result = generate_filename_parsed(
            &parsed,
            metadata.get(&id),
            file.name(),
            &rename_options,
        );

        if used.contains(&result.filename) {
            let resolved = resolve_conflict(&result.filename, &used);
            log::warn!(
                "{}: {} already taken, using {}",
                file.name(),
                result.filename,
                resolved
            );
            result.filename = resolved;
            result.warnings.push(CONFLICT_WARNING.to_string());
        }
        used.insert(result.filename.clone());

        log::debug!("{} -> {}", file.name(), result.filename);
        entries.push(BatchEntry {
            id,
            original_name: file.name().to_string(),
            counter,
            result,
        });
        on_progress(Progress {
            processed: index + 1,
            total: files.len(),
            current: file.name().to_string(),
        });
    }

    let mapping = BatchMapping { entries };
    log::info!(
        "renamed {} files ({} warnings)",
        mapping.len(),
        mapping.warning_count()
    );
    Ok(mapping)
}

pub(crate) fn resolve_conflict(candidate: &str, used: &HashSet<String>) -> String {
    let (base, ext) = split_extension(candidate);
    let mut n = 1usize;
    loop {
        let next = if ext.is_empty() && !candidate.ends_with('.') {
            format!("{base}_{n}")
        } else {
            format!("{base}_{n}.{ext}")
        };
        if !used.contains(&next) {
            return next;
        }
        n += 1;
    }
}
