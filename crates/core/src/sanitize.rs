pub fn sanitize_text_field(value: &str) -> String {
    let kept: String = value
        .chars()
        .filter(|&ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || ch.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join("_")
}

pub fn sanitize_filename(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_underscore = false;

    for ch in value.chars() {
        let ch = if ch.is_whitespace() {
            '_'
        } else if is_disallowed_char(ch) {
            continue;
        } else {
            ch
        };
        if ch == '_' {
            if prev_underscore {
                continue;
            }
            prev_underscore = true;
        } else {
            prev_underscore = false;
        }
        out.push(ch);
    }

    out
}

pub fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(pos) => (&filename[..pos], &filename[pos + 1..]),
        None => (filename, ""),
    }
}

fn is_disallowed_char(ch: char) -> bool {
    matches!(ch, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || ch.is_control()
}
