//! Shell-style `$NAME` / `${NAME}` expansion

/// Replace `$NAME` and `${NAME}` references using `lookup`.
///
/// - `$$` becomes `$`
/// - unknown names expand to the empty string
/// - `${}` and an unterminated `${` are dropped
/// - a `$` not followed by a name, and a trailing `$`, stay as they are
/// - `$0`-`$9`, `$*`, `$#`, `$@`, `$!`, `$?` and `$-` are one-character names
pub fn expand_env(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'$' || i + 1 >= bytes.len() {
            i += 1;
            continue;
        }

        out.push_str(&input[copied..i]);
        let (name, width) = shell_name(&input[i + 1..]);
        match name {
            Some("$") => out.push('$'),
            Some(name) => out.push_str(&lookup(name).unwrap_or_default()),
            // bad syntax, the consumed characters are dropped
            None if width > 0 => {}
            None => out.push('$'),
        }
        i += 1 + width;
        copied = i;
    }

    out.push_str(&input[copied..]);
    out
}

/// The name at the start of `s` (which follows a `$`) and how many bytes it
/// spans. `(None, n > 0)` is invalid syntax; `(None, 0)` is no name at all.
fn shell_name(s: &str) -> (Option<&str>, usize) {
    let bytes = s.as_bytes();

    if bytes[0] == b'{' {
        if bytes.len() > 2 && is_special(bytes[1]) && bytes[2] == b'}' {
            return (Some(&s[1..2]), 3);
        }
        return match bytes.iter().skip(1).position(|b| *b == b'}') {
            Some(0) => (None, 2),
            Some(end) => (Some(&s[1..end + 1]), end + 2),
            None => (None, 1),
        };
    }

    if is_special(bytes[0]) {
        return (Some(&s[0..1]), 1);
    }

    let len = bytes
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
        .count();
    if len == 0 {
        (None, 0)
    } else {
        (Some(&s[..len]), len)
    }
}

fn is_special(b: u8) -> bool {
    matches!(b, b'*' | b'#' | b'$' | b'@' | b'!' | b'?' | b'-' | b'0'..=b'9')
}
