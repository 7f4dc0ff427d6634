use super::Splitter;

/// 版本号切分：`.` `_` `-` 为分隔符
/// 看起来像网址或邮箱的值不切分，整体作为第一段
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionSplitter;

impl Splitter for VersionSplitter {
    #[inline(always)]
    fn is_separator(&self, c: u8) -> bool {
        matches!(c, b'.' | b'_' | b'-')
    }

    #[inline(always)]
    fn is_end_of_string_separator(&self, _c: u8) -> bool {
        false
    }

    fn should_split(&self, value: &str) -> bool {
        if value.starts_with("www.") || value.starts_with("http") {
            return false;
        }
        !(value.contains('@') && value.contains('.'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_segments() {
        let s = VersionSplitter;
        let v = "53.0.2785_124-beta";
        assert_eq!(s.single_split(v, 1), Some("53"));
        assert_eq!(s.single_split(v, 4), Some("124"));
        assert_eq!(s.first_splits(v, 2), Some("53.0"));
        assert_eq!(s.split_range(v, 2, 3), Some("0.2785"));
        assert_eq!(s.split_range(v, 3, -1), Some("2785_124-beta"));
        assert_eq!(s.single_split(v, 6), None);
    }

    #[test]
    fn test_urls_and_emails_are_atomic() {
        let s = VersionSplitter;
        assert_eq!(s.single_split("www.example.com", 1), Some("www.example.com"));
        assert_eq!(s.single_split("www.example.com", 2), None);
        assert_eq!(s.single_split("http-1.2", 1), Some("http-1.2"));
        assert_eq!(s.single_split("me@example.org", 1), Some("me@example.org"));
        // 只有 @ 没有 . 时照常切分
        assert_eq!(s.single_split("a@b-c", 2), Some("c"));
    }
}
