//! URI component encoding, byte-compatible with `encodeURIComponent`.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )` is escaped.
pub const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encodes `value` as a single URI component (`:` → `%3A`, `/` → `%2F`).
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_characters_are_escaped() {
        assert_eq!(
            encode_component("http://abc.com/file.txt?q=s&x=1#f"),
            "http%3A%2F%2Fabc.com%2Ffile.txt%3Fq%3Ds%26x%3D1%23f"
        );
    }

    #[test]
    fn unreserved_marks_pass_through() {
        assert_eq!(encode_component("a-b_c.d!e~f*g'h(i)"), "a-b_c.d!e~f*g'h(i)");
    }

    #[test]
    fn existing_escapes_are_escaped_again() {
        assert_eq!(encode_component("a%20b c"), "a%2520b%20c");
    }

    #[test]
    fn non_ascii_is_utf8_encoded() {
        assert_eq!(encode_component("é"), "%C3%A9");
    }
}
