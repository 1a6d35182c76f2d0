//! Byte size helpers for limits, logging and env parsing.

/// Convert kilobytes to bytes.
#[inline]
pub const fn kb(n: usize) -> usize {
    n * 1024
}

/// Convert megabytes to bytes.
#[inline]
pub const fn mb(n: usize) -> usize {
    n * 1024 * 1024
}

/// Convert gigabytes to bytes.
#[inline]
pub const fn gb(n: usize) -> usize {
    n * 1024 * 1024 * 1024
}

/// Format a byte count with a binary unit, e.g. `4.00 KB`.
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: [(&str, usize); 3] = [("GB", gb(1)), ("MB", mb(1)), ("KB", kb(1))];

    UNITS
        .iter()
        .find(|&&(_, scale)| bytes >= scale)
        .map(|&(unit, scale)| format!("{:.2} {}", bytes as f64 / scale as f64, unit))
        .unwrap_or_else(|| format!("{} B", bytes))
}

/// Parse a byte count such as `4096`, `64K`, `512M` or `2G`.
///
/// Suffixes are binary and case-insensitive; an optional trailing `B` is accepted.
pub fn parse_bytes(text: &str) -> Option<usize> {
    let trimmed = text.trim();
    let upper = trimmed.to_ascii_uppercase();
    let body = upper.strip_suffix('B').unwrap_or(&upper);

    let (digits, scale) = match body.chars().last()? {
        'K' => (&body[..body.len() - 1], kb(1)),
        'M' => (&body[..body.len() - 1], mb(1)),
        'G' => (&body[..body.len() - 1], gb(1)),
        _ => (body, 1),
    };

    digits.trim().parse::<usize>().ok()?.checked_mul(scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_conversions() {
        assert_eq!(kb(4), 4096);
        assert_eq!(mb(1), 1024 * 1024);
        assert_eq!(gb(1), 1024 * 1024 * 1024);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(128), "128 B");
        assert_eq!(format_bytes(4096), "4.00 KB");
        assert_eq!(format_bytes(mb(3) / 2), "1.50 MB");
    }

    #[test]
    fn test_parse_bytes() {
        assert_eq!(parse_bytes("4096"), Some(4096));
        assert_eq!(parse_bytes("64k"), Some(kb(64)));
        assert_eq!(parse_bytes(" 512MB "), Some(mb(512)));
        assert_eq!(parse_bytes("2G"), Some(gb(2)));
        assert_eq!(parse_bytes("lots"), None);
        assert_eq!(parse_bytes(""), None);
    }
}
