//! Pad id extraction from folder and file names.

use super::PadId;

/// Parses the pad id embedded in a folder or file name.
///
/// The digit run right after the last `_` wins (`number_12` → 12); otherwise
/// the first digit run anywhere in the name is used (`pad3` → 3). Zero and
/// overflowing values are rejected.
pub fn parse_pad_id(name: &str) -> Option<PadId> {
    if let Some((_, suffix)) = name.rsplit_once('_') {
        if let Some(id) = leading_number(suffix) {
            return Some(id);
        }
    }
    let start = name.find(|c: char| c.is_ascii_digit())?;
    leading_number(&name[start..])
}

fn leading_number(text: &str) -> Option<PadId> {
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    if end == 0 {
        return None;
    }
    text[..end].parse::<PadId>().ok().filter(|&id| id > 0)
}
