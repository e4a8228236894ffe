/// Append `s` to `buf` as a single-quoted bash word.
/// Embedded single quotes are closed, escaped, and reopened.
pub fn single_quote(s: &str, buf: &mut String) {
    buf.push('\'');
    for c in s.chars() {
        if c == '\'' {
            buf.push_str("'\\''");
        } else {
            buf.push(c);
        }
    }
    buf.push('\'');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quoted(s: &str) -> String {
        let mut buf = String::new();
        single_quote(s, &mut buf);
        buf
    }

    #[test]
    fn test_plain() {
        assert_eq!(quoted("/data/fil"), "'/data/fil'");
        assert_eq!(quoted(""), "''");
    }

    #[test]
    fn test_special_chars_are_literal() {
        assert_eq!(quoted("a b $HOME \"x\""), "'a b $HOME \"x\"'");
    }

    #[test]
    fn test_embedded_single_quote() {
        assert_eq!(quoted("it's"), "'it'\\''s'");
    }
}
