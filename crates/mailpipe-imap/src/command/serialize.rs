//! Low-level argument encoding.

use super::FetchAttribute;

/// Writes `s` as an atom when possible, otherwise as a quoted string.
pub fn write_astring(buf: &mut Vec<u8>, s: &str) {
    if s.is_empty() || s.bytes().any(needs_quoting) {
        buf.push(b'"');
        for b in s.bytes() {
            if b == b'"' || b == b'\\' {
                buf.push(b'\\');
            }
            buf.push(b);
        }
        buf.push(b'"');
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
}

const fn needs_quoting(b: u8) -> bool {
    matches!(
        b,
        b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*' | b']'
    ) || b < 0x20
        || b == 0x7F
}

/// Writes a parenthesized FETCH item list.
pub fn write_fetch_attributes(buf: &mut Vec<u8>, items: &[FetchAttribute]) {
    buf.push(b'(');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            buf.push(b' ');
        }
        match item {
            FetchAttribute::Uid => buf.extend_from_slice(b"UID"),
            FetchAttribute::Flags => buf.extend_from_slice(b"FLAGS"),
            FetchAttribute::Envelope => buf.extend_from_slice(b"ENVELOPE"),
            FetchAttribute::InternalDate => buf.extend_from_slice(b"INTERNALDATE"),
            FetchAttribute::Body { section, peek } => {
                let prefix: &[u8] = if *peek { b"BODY.PEEK[" } else { b"BODY[" };
                buf.extend_from_slice(prefix);
                buf.extend_from_slice(section.as_bytes());
                buf.push(b']');
            }
        }
    }
    buf.push(b')');
}
