//! Command scripts: one operator instruction per line.

/// Instructions in a script. Blank lines and `#` comments are skipped.
pub fn script_lines(contents: &str) -> Vec<&str> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect()
}
