use crate::metadata::{MetadataRecord, DEFAULT_ORIENTATION};
use crate::sanitize::{sanitize_filename, sanitize_text_field, split_extension};
use crate::template::{parse_template, ParsedTemplate, TemplatePart, Token};
use chrono::{DateTime, Datelike, Local, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

pub const DEFAULT_COUNTER_PADDING: usize = 3;

#[derive(Debug, Clone)]
pub struct RenameOptions {
    pub counter: u64,
    pub counter_padding: usize,
    pub custom_text: String,
    pub fallback_date: DateTime<Local>,
    pub preserve_extension: bool,
}

impl Default for RenameOptions {
    fn default() -> Self {
        Self {
            counter: 1,
            counter_padding: DEFAULT_COUNTER_PADDING,
            custom_text: String::new(),
            fallback_date: Local::now(),
            preserve_extension: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameResult {
    pub filename: String,
    pub success: bool,
    pub warnings: Vec<String>,
}

impl RenameResult {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

pub fn generate_filename(
    template: &str,
    metadata: Option<&MetadataRecord>,
    original_filename: &str,
    options: &RenameOptions,
) -> RenameResult {
    generate_filename_parsed(&parse_template(template), metadata, original_filename, options)
}

pub fn generate_filename_parsed(
    template: &ParsedTemplate,
    metadata: Option<&MetadataRecord>,
    original_filename: &str,
    options: &RenameOptions,
) -> RenameResult {
    let (name, ext) = split_extension(original_filename);
    let ctx = Context {
        metadata,
        date: metadata
            .and_then(|m| m.date_taken)
            .unwrap_or(options.fallback_date),
        name,
        ext,
        options,
    };

    let mut warnings = Vec::new();
    let kinds: BTreeSet<Token> = template.tokens().filter_map(|t| t.kind).collect();
    let mut values = HashMap::<Token, String>::with_capacity(kinds.len());
    for kind in kinds {
        let value = match resolve_token(kind, &ctx) {
            Ok(value) => value,
            Err(Missing(label)) => {
                warnings.push(format!("{label} not available in EXIF data"));
                String::new()
            }
        };
        values.insert(kind, value);
    }

    let mut unresolved = Vec::<&str>::new();
    for token in template.invalid_tokens() {
        if !unresolved.contains(&token.full_match.as_str()) {
            unresolved.push(&token.full_match);
        }
    }
    if !unresolved.is_empty() {
        warnings.push(format!("Unresolved tokens: {}", unresolved.join(", ")));
    }

    let mut rendered = String::new();
    for part in template.parts() {
        match part {
            TemplatePart::Literal(text) => rendered.push_str(text),
            TemplatePart::Token(token) => {
                if let Some(value) = token.kind.and_then(|k| values.get(&k)) {
                    rendered.push_str(value);
                }
            }
        }
    }

    let mut filename = sanitize_filename(&rendered);
    if options.preserve_extension && !ext.is_empty() {
        filename.push('.');
        filename.push_str(&sanitize_filename(&ext.to_lowercase()));
    }

    RenameResult {
        filename,
        success: true,
        warnings,
    }
}

struct Context<'a> {
    metadata: Option<&'a MetadataRecord>,
    date: DateTime<Local>,
    name: &'a str,
    ext: &'a str,
    options: &'a RenameOptions,
}

impl<'a> Context<'a> {
    fn field<T>(
        &self,
        label: &'static str,
        get: impl FnOnce(&'a MetadataRecord) -> Option<T>,
    ) -> Result<T, Missing> {
        self.metadata.and_then(get).ok_or(Missing(label))
    }
}

struct Missing(&'static str);

fn resolve_token(token: Token, ctx: &Context<'_>) -> Result<String, Missing> {
    let d = ctx.date;
    let value = match token {
        Token::Year => format!("{:04}", d.year()),
        Token::ShortYear => format!("{:02}", d.year().rem_euclid(100)),
        Token::Month => format!("{:02}", d.month()),
        Token::Day => format!("{:02}", d.day()),
        Token::Hour => format!("{:02}", d.hour()),
        Token::Minute => format!("{:02}", d.minute()),
        Token::Second => format!("{:02}", d.second()),
        Token::Date => d.format("%Y%m%d").to_string(),
        Token::DateTime => d.format("%Y%m%d_%H%M%S").to_string(),
        Token::Timestamp => d.timestamp().to_string(),
        Token::Make => sanitize_text_field(ctx.field("Camera make", |m| m.normalized_make())?),
        Token::Model => sanitize_text_field(ctx.field("Camera model", |m| m.normalized_model())?),
        Token::Lens => sanitize_text_field(ctx.field("Lens model", |m| m.normalized_lens())?),
        Token::Iso => ctx.field("ISO", |m| m.iso)?.to_string(),
        Token::Aperture => format_number(ctx.field("Aperture", |m| finite(m.aperture))?),
        Token::Shutter => format_shutter(ctx.field("Shutter speed", |m| {
            finite(m.shutter_speed).filter(|v| *v > 0.0)
        })?),
        Token::Focal => format_number(ctx.field("Focal length", |m| finite(m.focal_length))?),
        Token::Width => ctx.field("Image width", |m| m.width)?.to_string(),
        Token::Height => ctx.field("Image height", |m| m.height)?.to_string(),
        Token::Dimensions => {
            let (w, h) = ctx.field("Image dimensions", |m| m.width.zip(m.height))?;
            format!("{w}x{h}")
        }
        Token::Orientation => ctx
            .metadata
            .map_or(DEFAULT_ORIENTATION, |m| m.orientation)
            .to_string(),
        Token::Latitude => format!("{:.6}", ctx.field("GPS latitude", |m| finite(m.latitude))?),
        Token::Longitude => format!("{:.6}", ctx.field("GPS longitude", |m| finite(m.longitude))?),
        Token::Gps => {
            let (lat, lng) = ctx.field("GPS coordinates", |m| {
                finite(m.latitude).zip(finite(m.longitude))
            })?;
            format!("{lat:.6}_{lng:.6}")
        }
        Token::Counter(width) => {
            pad_counter(ctx.options.counter, width.unwrap_or(ctx.options.counter_padding))
        }
        Token::Original => ctx.name.to_string(),
        Token::Extension => ctx.ext.to_string(),
        Token::Custom => ctx.options.custom_text.clone(),
    };
    Ok(value)
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn pad_counter(counter: u64, width: usize) -> String {
    let digits = counter.to_string();
    let mut out = "0".repeat(width.saturating_sub(digits.len()));
    out.push_str(&digits);
    out
}

fn format_number(value: f64) -> String {
    value.to_string()
}

fn format_shutter(seconds: f64) -> String {
    if seconds >= 1.0 {
        format!("{}s", format_number(seconds))
    } else {
        format!("1/{}s", (1.0 / seconds).round())
    }
}
