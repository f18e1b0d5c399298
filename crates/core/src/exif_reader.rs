use crate::metadata::{MetadataProvider, MetadataRecord, DEFAULT_ORIENTATION};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use exif::{Exif, In, Reader, Tag, Value};
use std::io::Cursor;

#[derive(Debug, Clone, Copy, Default)]
pub struct ExifMetadataProvider;

impl MetadataProvider for ExifMetadataProvider {
    fn extract(&self, bytes: &[u8]) -> Option<MetadataRecord> {
        let exif = match Reader::new().read_from_container(&mut Cursor::new(bytes)) {
            Ok(exif) => exif,
            Err(err) => {
                log::debug!("no EXIF data: {err}");
                return None;
            }
        };
        Some(read_record(&exif))
    }
}

fn read_record(exif: &Exif) -> MetadataRecord {
    let date_taken = [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime]
        .into_iter()
        .find_map(|tag| ascii_field(exif, tag).and_then(|raw| parse_date(&raw)));

    MetadataRecord {
        date_taken,
        make: ascii_field(exif, Tag::Make),
        model: ascii_field(exif, Tag::Model),
        lens: ascii_field(exif, Tag::LensModel),
        iso: uint_field(exif, Tag::PhotographicSensitivity),
        aperture: rational_field(exif, Tag::FNumber),
        shutter_speed: rational_field(exif, Tag::ExposureTime),
        focal_length: rational_field(exif, Tag::FocalLength),
        width: uint_field(exif, Tag::PixelXDimension).or_else(|| uint_field(exif, Tag::ImageWidth)),
        height: uint_field(exif, Tag::PixelYDimension)
            .or_else(|| uint_field(exif, Tag::ImageLength)),
        latitude: gps_coordinate(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, "S"),
        longitude: gps_coordinate(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, "W"),
        altitude: gps_altitude(exif),
        orientation: uint_field(exif, Tag::Orientation)
            .and_then(|v| u16::try_from(v).ok())
            .unwrap_or(DEFAULT_ORIENTATION),
    }
}

fn ascii_field(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Ascii(parts) => parts
            .first()
            .map(|raw| {
                String::from_utf8_lossy(raw)
                    .trim_end_matches('\0')
                    .trim()
                    .to_string()
            })
            .filter(|v| !v.is_empty()),
        _ => None,
    }
}

fn uint_field(exif: &Exif, tag: Tag) -> Option<u32> {
    exif.get_field(tag, In::PRIMARY)?.value.get_uint(0)
}

fn rational_field(exif: &Exif, tag: Tag) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let value = match &field.value {
        Value::Rational(values) => values.first()?.to_f64(),
        Value::SRational(values) => values.first()?.to_f64(),
        _ => return None,
    };
    value.is_finite().then_some(value)
}

fn gps_coordinate(exif: &Exif, tag: Tag, ref_tag: Tag, negative_ref: &str) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let Value::Rational(dms) = &field.value else {
        return None;
    };
    if dms.is_empty() {
        return None;
    }

    let degrees = dms
        .iter()
        .zip([1.0, 60.0, 3600.0])
        .map(|(part, divisor)| part.to_f64() / divisor)
        .sum::<f64>();
    if !degrees.is_finite() {
        return None;
    }

    let negative = ascii_field(exif, ref_tag)
        .map(|r| r.eq_ignore_ascii_case(negative_ref))
        .unwrap_or(false);
    Some(if negative { -degrees } else { degrees })
}

fn gps_altitude(exif: &Exif) -> Option<f64> {
    let altitude = rational_field(exif, Tag::GPSAltitude)?;
    let below_sea_level = exif
        .get_field(Tag::GPSAltitudeRef, In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        == Some(1);
    Some(if below_sea_level { -altitude } else { altitude })
}

pub(crate) fn parse_date(input: &str) -> Option<DateTime<Local>> {
    let normalized = input.trim();

    let candidates = [
        "%Y:%m:%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%:z",
        "%Y-%m-%dT%H:%M:%S%.f%:z",
    ];

    for fmt in candidates {
        if let Ok(dt) = DateTime::parse_from_str(normalized, fmt) {
            return Some(dt.with_timezone(&Local));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(normalized, fmt) {
            if let Some(local) = Local.from_local_datetime(&naive).earliest() {
                return Some(local);
            }
        }
    }

    None
}
