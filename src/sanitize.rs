use std::sync::LazyLock;

use regex::Regex;

/// Byte length above which a name is shortened.
pub const MAX_FILENAME_BYTES: usize = 240;
const KEEP_BYTES: usize = 100;
const ELLIPSIS: &str = "...";

static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[<>:"|?*]"#).unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static PERIODS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.+").unwrap());

/// Normalizes free text into a single path segment.
///
/// Separators become hyphens, characters rejected by common filesystems are
/// dropped, whitespace and period runs collapse, and anything longer than
/// [`MAX_FILENAME_BYTES`] keeps only its first and last 100 bytes around `...`.
pub fn sanitize_filename(text: &str) -> String {
    let replaced = text.replace(['/', '\\'], "-");
    let stripped = DISALLOWED.replace_all(&replaced, "");
    let collapsed = WHITESPACE.replace_all(&stripped, " ");
    let trimmed = collapsed.trim();
    let name = PERIODS.replace_all(trimmed, ".").into_owned();

    if name.len() <= MAX_FILENAME_BYTES {
        return name;
    }
    let head = &name[..floor_char_boundary(&name, KEEP_BYTES)];
    let tail = &name[ceil_char_boundary(&name, name.len() - KEEP_BYTES)..];
    format!("{head}{ELLIPSIS}{tail}")
}

fn floor_char_boundary(value: &str, mut index: usize) -> usize {
    while !value.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(value: &str, mut index: usize) -> usize {
    while !value.is_char_boundary(index) {
        index += 1;
    }
    index
}
