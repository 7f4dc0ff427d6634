/// User-Agent 输入守卫：分词前限制长度，保证超长输入不会拖垮引擎
use std::borrow::Cow;

pub struct UaInputGuard;

impl UaInputGuard {
    /// 按字节上限截断，截断点回退到字符边界；首尾空白一并去掉
    #[inline]
    pub fn guard(input: &str, max_len: usize) -> Cow<'_, str> {
        let trimmed = input.trim();
        if trimmed.len() <= max_len {
            return Cow::Borrowed(trimmed);
        }
        let mut cut = max_len;
        while !trimmed.is_char_boundary(cut) {
            cut -= 1;
        }
        log::debug!(
            "User-Agent truncated | Length: {} | Limit: {}",
            trimmed.len(),
            max_len
        );
        Cow::Owned(trimmed[..cut].trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_input_is_borrowed() {
        let guarded = UaInputGuard::guard("  Foo/1.0 ", 2048);
        assert!(matches!(guarded, Cow::Borrowed("Foo/1.0")));
    }

    #[test]
    fn test_truncates_on_char_boundary() {
        // "ü" 占两个字节，上限落在其中间时回退
        assert_eq!(UaInputGuard::guard("abü", 3), "ab");
        assert_eq!(UaInputGuard::guard("abcdef", 4), "abcd");
    }
}
