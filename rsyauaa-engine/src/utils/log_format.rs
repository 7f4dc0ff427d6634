use std::fmt::{self, Write};

/// 日志预览：连续空白折叠为一个空格，超过 max_chars 个字符截断并加省略号
/// 返回的是惰性 Display，不产生中间字符串
#[inline]
pub fn preview_compact(text: &str, max_chars: usize) -> impl fmt::Display + '_ {
    Preview { text, max_chars }
}

struct Preview<'a> {
    text: &'a str,
    max_chars: usize,
}

impl fmt::Display for Preview<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut written = 0;
        let mut in_space = false;
        for ch in self.text.chars() {
            if ch.is_whitespace() {
                if in_space {
                    continue;
                }
                in_space = true;
            } else {
                in_space = false;
            }
            if written == self.max_chars {
                return f.write_char('…');
            }
            f.write_char(if in_space { ' ' } else { ch })?;
            written += 1;
        }
        Ok(())
    }
}

/// 键列表的日志形式：`[a, b, …] (total: N)`，最多列出 limit 个
pub fn compress_key_list<S: AsRef<str>>(keys: &[S], limit: usize) -> String {
    if keys.is_empty() {
        return "[empty]".to_string();
    }
    let mut out = String::from("[");
    for (i, key) in keys.iter().take(limit).enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        // 写入 String 不会失败
        let _ = write!(out, "{}", preview_compact(key.as_ref(), 60));
    }
    if keys.len() > limit {
        out.push_str(", …");
    }
    out.push(']');
    let _ = write!(out, " (total: {})", keys.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_collapses_and_truncates() {
        assert_eq!(preview_compact("a  b\t\nc", 10).to_string(), "a b c");
        assert_eq!(preview_compact("abcdef", 3).to_string(), "abc…");
        assert_eq!(preview_compact("abc", 3).to_string(), "abc");
    }

    #[test]
    fn test_compress_key_list() {
        assert_eq!(compress_key_list::<&str>(&[], 3), "[empty]");
        assert_eq!(compress_key_list(&["a", "b"], 3), "[a, b] (total: 2)");
        assert_eq!(
            compress_key_list(&["a", "b", "c", "d"], 2),
            "[a, b, …] (total: 4)"
        );
    }
}
