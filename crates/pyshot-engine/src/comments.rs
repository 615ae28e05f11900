//! Comment stripping applied to submissions before any rule looks at them.

/// The line comment marker of the tutorial language.
pub const COMMENT_MARKER: char = '#';

/// Removes line comments from `source`, keeping every line break.
///
/// A comment starts at an unescaped `#` that is not inside a quoted string
/// and runs to the end of its line. String state does not carry over line
/// breaks, so an unterminated quote only affects its own line.
///
/// # Examples
///
/// ```
/// use pyshot_engine::strip_comments;
///
/// assert_eq!(strip_comments("edad = 25  # años"), "edad = 25  ");
/// assert_eq!(strip_comments("# edad = 25\nx = 1"), "\nx = 1");
/// assert_eq!(strip_comments("s = \"#1\""), "s = \"#1\"");
/// ```
#[must_use]
pub fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());

    for (i, line) in source.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&line[..code_len(line)]);
    }

    out
}

/// Byte length of the code part of a single line.
fn code_len(line: &str) -> usize {
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (idx, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' | '\'' => match quote {
                Some(open) if open == ch => quote = None,
                Some(_) => {}
                None => quote = Some(ch),
            },
            COMMENT_MARKER if quote.is_none() => return idx,
            _ => {}
        }
    }

    line.len()
}
