use serde::Serialize;
use thiserror::Error;

// Variant order is resolution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Token {
    Year,
    ShortYear,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Date,
    DateTime,
    Timestamp,
    Make,
    Model,
    Lens,
    Iso,
    Aperture,
    Shutter,
    Focal,
    Width,
    Height,
    Dimensions,
    Orientation,
    Latitude,
    Longitude,
    Gps,
    /// `{counter}` carries `None` and uses the batch padding; `{counter:N}`
    /// carries its own width.
    Counter(Option<usize>),
    Original,
    Extension,
    Custom,
}

impl Token {
    pub fn from_name(name: &str) -> Option<Token> {
        let token = match name {
            "YYYY" => Token::Year,
            "YY" => Token::ShortYear,
            "MM" => Token::Month,
            "DD" => Token::Day,
            "HH" => Token::Hour,
            "mm" => Token::Minute,
            "ss" => Token::Second,
            "date" => Token::Date,
            "datetime" => Token::DateTime,
            "timestamp" => Token::Timestamp,
            "make" => Token::Make,
            "model" => Token::Model,
            "lens" => Token::Lens,
            "iso" => Token::Iso,
            "aperture" => Token::Aperture,
            "shutter" => Token::Shutter,
            "focal" => Token::Focal,
            "width" => Token::Width,
            "height" => Token::Height,
            "dimensions" => Token::Dimensions,
            "orientation" => Token::Orientation,
            "lat" => Token::Latitude,
            "lng" => Token::Longitude,
            "gps" => Token::Gps,
            "counter" => Token::Counter(None),
            "original" => Token::Original,
            "ext" => Token::Extension,
            "custom" => Token::Custom,
            other => return parse_counter_width(other).map(|w| Token::Counter(Some(w))),
        };
        Some(token)
    }
}

fn parse_counter_width(name: &str) -> Option<usize> {
    let digits = name.strip_prefix("counter:")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<usize>().ok().filter(|w| *w > 0)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateToken {
    pub token: String,
    pub full_match: String,
    pub position: usize,
    pub is_valid: bool,
    #[serde(skip)]
    pub kind: Option<Token>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart {
    Literal(String),
    Token(TemplateToken),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedTemplate {
    parts: Vec<TemplatePart>,
}

impl ParsedTemplate {
    pub fn parts(&self) -> &[TemplatePart] {
        &self.parts
    }

    pub fn tokens(&self) -> impl Iterator<Item = &TemplateToken> {
        self.parts.iter().filter_map(|part| match part {
            TemplatePart::Token(token) => Some(token),
            TemplatePart::Literal(_) => None,
        })
    }

    pub fn invalid_tokens(&self) -> impl Iterator<Item = &TemplateToken> {
        self.tokens().filter(|t| !t.is_valid)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template is empty")]
    Empty,
}

pub fn validate_template(input: &str) -> Result<(), TemplateError> {
    if input.trim().is_empty() {
        return Err(TemplateError::Empty);
    }
    Ok(())
}

pub fn parse_template(input: &str) -> ParsedTemplate {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut cursor = 0usize;

    while let Some(offset) = input[cursor..].find('{') {
        let open = cursor + offset;
        let Some(close_offset) = input[open + 1..].find('}') else {
            break;
        };
        let close = open + 1 + close_offset;
        let name = &input[open + 1..close];

        literal.push_str(&input[cursor..open]);
        if name.is_empty() {
            literal.push_str("{}");
        } else {
            if !literal.is_empty() {
                parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
            }
            let kind = Token::from_name(name);
            parts.push(TemplatePart::Token(TemplateToken {
                token: name.to_string(),
                full_match: input[open..=close].to_string(),
                position: open,
                is_valid: kind.is_some(),
                kind,
            }));
        }
        cursor = close + 1;
    }

    literal.push_str(&input[cursor..]);
    if !literal.is_empty() {
        parts.push(TemplatePart::Literal(literal));
    }

    ParsedTemplate { parts }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenInfo {
    pub token: &'static str,
    pub description: &'static str,
}

const CATALOGUE: &[TokenInfo] = &[
    TokenInfo { token: "{YYYY}", description: "Year (4 digits)" },
    TokenInfo { token: "{YY}", description: "Year (2 digits)" },
    TokenInfo { token: "{MM}", description: "Month (01-12)" },
    TokenInfo { token: "{DD}", description: "Day (01-31)" },
    TokenInfo { token: "{HH}", description: "Hour (00-23)" },
    TokenInfo { token: "{mm}", description: "Minute (00-59)" },
    TokenInfo { token: "{ss}", description: "Second (00-59)" },
    TokenInfo { token: "{date}", description: "Date (YYYYMMDD)" },
    TokenInfo { token: "{datetime}", description: "Date and time (YYYYMMDD_HHMMSS)" },
    TokenInfo { token: "{timestamp}", description: "Unix timestamp (seconds)" },
    TokenInfo { token: "{make}", description: "Camera make" },
    TokenInfo { token: "{model}", description: "Camera model" },
    TokenInfo { token: "{lens}", description: "Lens model" },
    TokenInfo { token: "{iso}", description: "ISO sensitivity" },
    TokenInfo { token: "{aperture}", description: "Aperture (f-number)" },
    TokenInfo { token: "{shutter}", description: "Shutter speed" },
    TokenInfo { token: "{focal}", description: "Focal length (mm)" },
    TokenInfo { token: "{width}", description: "Image width (px)" },
    TokenInfo { token: "{height}", description: "Image height (px)" },
    TokenInfo { token: "{dimensions}", description: "Image dimensions (WIDTHxHEIGHT)" },
    TokenInfo { token: "{orientation}", description: "EXIF orientation (1-8)" },
    TokenInfo { token: "{lat}", description: "GPS latitude" },
    TokenInfo { token: "{lng}", description: "GPS longitude" },
    TokenInfo { token: "{gps}", description: "GPS coordinates (LAT_LNG)" },
    TokenInfo { token: "{counter}", description: "Sequence number" },
    TokenInfo { token: "{counter:N}", description: "Sequence number padded to N digits" },
    TokenInfo { token: "{original}", description: "Original filename without extension" },
    TokenInfo { token: "{ext}", description: "Original extension" },
    TokenInfo { token: "{custom}", description: "Custom text" },
];

pub fn token_catalogue() -> &'static [TokenInfo] {
    CATALOGUE
}
