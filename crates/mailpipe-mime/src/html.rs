//! Best-effort HTML to text conversion.

const HTML_MARKERS: [&str; 6] = ["<html", "<body", "<div", "<span", "<p", "<table"];

const ENTITIES: [(&str, &str); 6] = [
    ("&nbsp;", " "),
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
];

/// Returns true if `text` contains a common HTML opening tag (case-insensitive).
#[must_use]
pub fn looks_like_html(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    HTML_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Drops everything between `<` and `>`, decodes a few entities and trims.
///
/// Not an HTML parser: an unclosed tag swallows the rest of the input.
#[must_use]
pub fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;

    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    decode_entities(&text).trim().to_string()
}

/// Single pass so that `&amp;lt;` becomes `&lt;`, not `<`.
fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(i) = rest.find('&') {
        out.push_str(&rest[..i]);
        rest = &rest[i..];
        match ENTITIES.iter().find(|(entity, _)| rest.starts_with(entity)) {
            Some((entity, replacement)) => {
                out.push_str(replacement);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}
