/// Longueur maximale d'une partie locale (RFC 5321).
pub(crate) const MAX_LOCAL_LEN: usize = 64;

/// Strict rules: ASCII atext, dots allowed but never leading, trailing or doubled.
pub(crate) fn is_local_strict(s: &str) -> bool {
    if s.is_empty() || s.starts_with('.') || s.ends_with('.') || s.contains("..") {
        return false;
    }
    s.chars().all(|c| c.is_ascii_alphanumeric() || is_atext_symbol(c) || c == '.')
}

/// Relaxed rules: also accept a simple quoted-string, otherwise fall back to
/// [`is_local_strict`].
pub(crate) fn is_local_relaxed(s: &str) -> bool {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        !s[1..s.len() - 1].contains(['"', '\\', '\r', '\n'])
    } else {
        is_local_strict(s)
    }
}

fn is_atext_symbol(c: char) -> bool {
    matches!(
        c,
        '!' | '#'
            | '$'
            | '%'
            | '&'
            | '\''
            | '*'
            | '+'
            | '-'
            | '/'
            | '='
            | '?'
            | '^'
            | '_'
            | '`'
            | '{'
            | '|'
            | '}'
            | '~'
    )
}
