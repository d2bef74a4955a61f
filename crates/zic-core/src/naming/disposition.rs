//! Content-Disposition filename extraction.

/// Filename carried by a `Content-Disposition` value.
///
/// Handles `filename="quoted \"name\""`, bare `filename=token` and RFC 5987
/// `filename*=UTF-8''percent%20encoded`; the extended form wins when both exist.
pub fn disposition_filename(header_value: &str) -> Option<String> {
    let mut plain: Option<String> = None;
    let mut extended: Option<String> = None;

    for param in header_value.split(';').map(str::trim) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        match key.as_str() {
            "filename*" => {
                // charset'language'value
                let mut parts = value.splitn(3, '\'');
                let charset = parts.next().unwrap_or("");
                let _language = parts.next();
                if let Some(encoded) = parts.next() {
                    if charset.eq_ignore_ascii_case("utf-8") {
                        let decoded = percent_decode(unquote(encoded).as_str());
                        if !decoded.is_empty() {
                            extended = Some(decoded);
                        }
                    }
                }
            }
            "filename" => {
                let v = unquote(value);
                if !v.is_empty() {
                    plain = Some(v);
                }
            }
            _ => {}
        }
    }

    extended.or(plain)
}

/// Strip surrounding quotes and backslash escapes.
fn unquote(value: &str) -> String {
    let inner = match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => inner,
        None => return value.to_string(),
    };
    let mut out = String::with_capacity(inner.len());
    let mut escaped = false;
    for c in inner.chars() {
        if escaped {
            out.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else {
            out.push(c);
        }
    }
    out
}

/// Decode `%XX` escapes (invalid escapes are kept literally; invalid UTF-8 is
/// replaced).
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(h), Some(l)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(h << 4 | l);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
