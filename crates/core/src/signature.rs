use crate::sanitize::split_extension;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Jpeg,
    Png,
    Gif,
    Webp,
    Tiff,
    Heif,
    Avif,
    Bmp,
}

impl MediaKind {
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            MediaKind::Jpeg => &["jpg", "jpeg", "jpe", "jfif"],
            MediaKind::Png => &["png"],
            MediaKind::Gif => &["gif"],
            MediaKind::Webp => &["webp"],
            MediaKind::Tiff => &["tif", "tiff", "dng", "nef", "cr2", "arw", "orf", "rw2", "pef"],
            MediaKind::Heif => &["heic", "heif"],
            MediaKind::Avif => &["avif"],
            MediaKind::Bmp => &["bmp"],
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("{filename}: content is not a recognised image format")]
    Unrecognized { filename: String },
    #[error("{filename}: content is {detected:?} but extension is .{extension}")]
    ExtensionMismatch {
        filename: String,
        detected: MediaKind,
        extension: String,
    },
}

pub fn detect_media_kind(bytes: &[u8]) -> Option<MediaKind> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(MediaKind::Jpeg);
    }
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some(MediaKind::Png);
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some(MediaKind::Gif);
    }
    if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some(MediaKind::Webp);
    }
    if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
        return Some(MediaKind::Tiff);
    }
    if bytes.starts_with(b"BM") && bytes.len() >= 14 {
        return Some(MediaKind::Bmp);
    }
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        return match &bytes[8..12] {
            b"avif" | b"avis" => Some(MediaKind::Avif),
            b"heic" | b"heix" | b"hevc" | b"hevx" | b"heim" | b"heis" | b"mif1" | b"msf1" => {
                Some(MediaKind::Heif)
            }
            _ => None,
        };
    }
    None
}

pub fn check_signature(filename: &str, bytes: &[u8]) -> Result<MediaKind, SignatureError> {
    let detected = detect_media_kind(bytes).ok_or_else(|| SignatureError::Unrecognized {
        filename: filename.to_string(),
    })?;

    let (_, extension) = split_extension(filename);
    let extension = extension.to_ascii_lowercase();
    if detected.extensions().contains(&extension.as_str()) {
        return Ok(detected);
    }

    Err(SignatureError::ExtensionMismatch {
        filename: filename.to_string(),
        detected,
        extension,
    })
}
