//! Fixed-width source attribution.

use crate::types::SourceName;

/// Width of the attribution field, in characters.
pub(crate) const SOURCE_FIELD_WIDTH: usize = 12;

/// Appends the attribution prefix for `name`: the name left-aligned in a
/// 12-character field, the separator glyph, and a space. Names wider than the
/// field are cut to 11 characters plus an ellipsis. Width is counted in
/// characters, not bytes, so multibyte names line up.
pub(crate) fn push_source_prefix(out: &mut String, name: &SourceName) {
    let width = name.as_str().chars().count();
    if width > SOURCE_FIELD_WIDTH {
        out.extend(name.as_str().chars().take(SOURCE_FIELD_WIDTH - 1));
        out.push('…');
    } else {
        out.push_str(name.as_str());
        for _ in width..SOURCE_FIELD_WIDTH {
            out.push(' ');
        }
    }
    out.push_str("┊ ");
}

#[cfg(test)]
pub(crate) fn source_prefix(name: &SourceName) -> String {
    let mut out = String::new();
    push_source_prefix(&mut out, name);
    out
}
