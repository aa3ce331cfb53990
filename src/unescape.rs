/// What an escaped `\n` turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Newline {
    /// Single-line text such as a title or a venue.
    Space,
    /// Multi-line text such as a description.
    LineBreak,
}

/// Unescape a text value.
///
/// Replacements run in a fixed order over the whole string: `\n`, then `\,`,
/// then `\\`. The result must not be unescaped again.
pub fn unescape(s: &str, newline: Newline) -> String {
    let newline = match newline {
        Newline::Space => " ",
        Newline::LineBreak => "\n",
    };

    s.replace("\\n", newline)
        .replace("\\,", ",")
        .replace("\\\\", "\\")
}
