use super::Splitter;

/// 按「词」切分：空白与常见标点都算分隔符，遇到 `(` 视为结束
#[derive(Debug, Clone, Copy, Default)]
pub struct WordSplitter;

impl Splitter for WordSplitter {
    #[inline(always)]
    fn is_separator(&self, c: u8) -> bool {
        matches!(
            c,
            b' ' | b'\t'
                | b'.'
                | b':'
                | b';'
                | b'='
                | b'&'
                | b'?'
                | b'-'
                | b'_'
                | b'+'
                | b'/'
                | b'\\'
                | b','
        )
    }

    #[inline(always)]
    fn is_end_of_string_separator(&self, c: u8) -> bool {
        c == b'('
    }
}
