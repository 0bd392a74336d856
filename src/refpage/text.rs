//! Whitespace normalization for flattened page text.

/// Collapse a block of markup text onto a single line.
///
/// The input is split on newlines; every line after the first is
/// preceded by exactly one space, and each line is trimmed before it is
/// emitted. Interior blank lines therefore survive as extra spaces
/// instead of disappearing. A string that already went through this
/// contains no newlines, so running it again changes nothing.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(line.trim());
    }
    out
}
