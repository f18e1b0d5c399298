mod archive;
mod batch;
mod config;
mod exif_reader;
mod metadata;
mod resolver;
mod sanitize;
mod scan;
mod signature;
mod source;
mod template;

pub const DEFAULT_TEMPLATE: &str = "{YYYY}{MM}{DD}_{HH}{mm}{ss}_{counter}";

pub use archive::{
    build_manifest, create_archive, create_archive_with_progress, suggested_filename,
    write_archive, ArchiveAssembler, ArchiveError, ArchiveOptions, ArchiveResult, ArchiveStrategy,
    ArchiveSummary, AssemblerState, DEFAULT_COMPRESSION_LEVEL, MANIFEST_FILENAME,
};
pub use batch::{
    batch_rename, batch_rename_with_progress, BatchEntry, BatchMapping, BatchOptions, FileId,
    Progress, CONFLICT_WARNING,
};
pub use config::{
    app_paths, load_config, load_config_from, save_config, save_config_to, AppConfig, AppPaths,
};
pub use exif_reader::ExifMetadataProvider;
pub use metadata::{MetadataProvider, MetadataRecord};
pub use resolver::{
    generate_filename, generate_filename_parsed, RenameOptions, RenameResult,
    DEFAULT_COUNTER_PADDING,
};
pub use sanitize::{sanitize_filename, sanitize_text_field};
pub use scan::{collect_photo_files, inspect_files, Inspection, ScanStats};
pub use signature::{check_signature, detect_media_kind, MediaKind, SignatureError};
pub use source::{FileSource, LocalFile, MemoryFile};
pub use template::{
    parse_template, token_catalogue, validate_template, ParsedTemplate, TemplateError,
    TemplatePart, TemplateToken, Token, TokenInfo,
};
