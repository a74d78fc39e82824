//! 工具函数集合

use once_cell::sync::Lazy;
use regex::Regex;

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("valid digits regex"));

/// 格式化字节大小
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// 提取文本中第一段连续的十进制数字
///
/// 没有数字，或数字超出 u64 范围时返回 None
pub fn first_integer(text: &str) -> Option<u64> {
    DIGITS.find(text)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0.00 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
        assert_eq!(format_bytes(16777216), "16.00 MB");
        assert_eq!(format_bytes(1073741824), "1.00 GB");
    }

    #[test]
    fn test_first_integer() {
        assert_eq!(first_integer("       16384 kB"), Some(16384));
        assert_eq!(first_integer("0"), Some(0));
        assert_eq!(first_integer("abc 12 34"), Some(12));
        assert_eq!(first_integer("x7y"), Some(7));
    }

    #[test]
    fn test_first_integer_missing() {
        assert_eq!(first_integer(""), None);
        assert_eq!(first_integer("   kB"), None);
        assert_eq!(first_integer("99999999999999999999999"), None);
    }
}
