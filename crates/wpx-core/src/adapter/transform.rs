//! Value-level transforms for attributes that hold more than one field.
//!
//! Each function takes the whole attribute value and a per-URL rewrite
//! closure, and only touches the URL tokens.

/// `srcset`: comma-separated candidates of the form `<url> <descriptor>`.
///
/// Each candidate is trimmed, its first space-separated token is rewritten,
/// and candidates are rejoined with a bare `,`.
pub fn rewrite_srcset(value: &str, rewrite: impl Fn(&str) -> String) -> String {
    value
        .split(',')
        .map(|candidate| {
            let mut tokens: Vec<String> = candidate.trim().split(' ').map(str::to_string).collect();
            if let Some(first) = tokens.first_mut() {
                *first = rewrite(first.trim());
            }
            tokens.join(" ")
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// `archive`: comma-separated plain URLs.
pub fn rewrite_url_list(value: &str, rewrite: impl Fn(&str) -> String) -> String {
    value
        .split(',')
        .map(|url| rewrite(url.trim()))
        .collect::<Vec<_>>()
        .join(",")
}

/// `content` (meta refresh): semicolon-separated fields, URL in field 1.
///
/// Values with a single field carry no URL and are returned as is. A leading
/// `url=` key is kept and only its value is rewritten.
pub fn rewrite_tuple(value: &str, rewrite: impl Fn(&str) -> String) -> String {
    let mut fields: Vec<String> = value.split(';').map(str::to_string).collect();
    if fields.len() < 2 {
        return value.to_string();
    }

    let field = fields[1].trim();
    fields[1] = match split_url_key(field) {
        Some((key, url)) => format!("{key}{}", rewrite(url.trim())),
        None => rewrite(field),
    };
    fields.join(";")
}

fn split_url_key(field: &str) -> Option<(&str, &str)> {
    let (key, rest) = field.split_once('=')?;
    if key.trim().eq_ignore_ascii_case("url") {
        Some((&field[..key.len() + 1], rest))
    } else {
        None
    }
}
