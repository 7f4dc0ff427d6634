//! 分段器：按分隔符把值切成 1 起始编号的片段
//!
//! 两种取区间的实现必须给出一致结果：
//! - 逐次扫描（`split_range`），适合一个节点只取一两个区间
//! - 先算偏移表再切（`create_split_list` + `split_range_with_list`），
//!   适合同一节点要取很多区间
//!
//! 所有扫描都按字节进行，分隔符均为 ASCII，切片位置天然落在字符边界上
mod version;
mod word;

pub use version::VersionSplitter;
pub use word::WordSplitter;

use crate::core::range::WordRange;

/// 分段偏移表：每段的 [start, end) 字节区间
pub type SplitList = Vec<(usize, usize)>;

pub trait Splitter: Send + Sync {
    fn is_separator(&self, c: u8) -> bool;

    /// 遇到即视为字符串结束的字符
    fn is_end_of_string_separator(&self, c: u8) -> bool;

    /// 为 false 时整个值视为单个片段
    fn should_split(&self, _value: &str) -> bool {
        true
    }

    /// 第 split 段的起始字节位置
    fn find_split_start(&self, value: &str, split: i32) -> Option<usize> {
        if split <= 0 {
            return None;
        }
        let bytes = value.as_bytes();
        let atomic = !self.should_split(value);
        let mut in_segment = false;
        let mut seen = 0;
        for (i, &c) in bytes.iter().enumerate() {
            if self.is_end_of_string_separator(c) {
                return None;
            }
            if !atomic && self.is_separator(c) {
                in_segment = false;
                continue;
            }
            if !in_segment {
                in_segment = true;
                seen += 1;
                if seen == split {
                    return Some(i);
                }
            }
        }
        None
    }

    /// 从 start 开始的片段结束位置（不含）
    fn find_split_end(&self, value: &str, start: usize) -> usize {
        let bytes = value.as_bytes();
        let atomic = !self.should_split(value);
        for (i, &c) in bytes.iter().enumerate().skip(start) {
            if self.is_end_of_string_separator(c) || (!atomic && self.is_separator(c)) {
                return i;
            }
        }
        bytes.len()
    }

    /// 最后一个片段的结束位置（从 start 所在片段往后找）
    fn find_last_split_end(&self, value: &str, start: usize) -> usize {
        let bytes = value.as_bytes();
        let atomic = !self.should_split(value);
        let mut last_end = self.find_split_end(value, start);
        let mut i = last_end;
        while i < bytes.len() {
            let c = bytes[i];
            if self.is_end_of_string_separator(c) {
                break;
            }
            if !atomic && self.is_separator(c) {
                i += 1;
                continue;
            }
            last_end = self.find_split_end(value, i);
            i = last_end;
        }
        last_end
    }

    /// 第 split 段
    fn single_split<'a>(&self, value: &'a str, split: i32) -> Option<&'a str> {
        let start = self.find_split_start(value, split)?;
        let end = self.find_split_end(value, start);
        Some(&value[start..end])
    }

    /// 从开头到第 split 段结束
    fn first_splits<'a>(&self, value: &'a str, split: i32) -> Option<&'a str> {
        let start = self.find_split_start(value, split)?;
        let end = self.find_split_end(value, start);
        Some(&value[..end])
    }

    /// 第 first..=last 段（含中间的分隔符），last 为 -1 表示到最后一段
    fn split_range<'a>(&self, value: &'a str, first: i32, last: i32) -> Option<&'a str> {
        if first <= 0 || (last != WordRange::TO_END && last < first) {
            return None;
        }
        let start = self.find_split_start(value, first)?;
        let end = if last == WordRange::TO_END {
            self.find_last_split_end(value, start)
        } else {
            let last_start = self.find_split_start(value, last)?;
            self.find_split_end(value, last_start)
        };
        Some(&value[start..end])
    }

    /// 一次扫描算出全部片段偏移
    fn create_split_list(&self, value: &str) -> SplitList {
        let bytes = value.as_bytes();
        let atomic = !self.should_split(value);
        let mut list = SplitList::new();
        let mut segment_start: Option<usize> = None;
        let mut end_of_string = bytes.len();
        for (i, &c) in bytes.iter().enumerate() {
            if self.is_end_of_string_separator(c) {
                end_of_string = i;
                break;
            }
            if !atomic && self.is_separator(c) {
                if let Some(start) = segment_start.take() {
                    list.push((start, i));
                }
                continue;
            }
            if segment_start.is_none() {
                segment_start = Some(i);
            }
        }
        if let Some(start) = segment_start {
            list.push((start, end_of_string));
        }
        list
    }

    /// 基于偏移表取区间，结果与 `split_range` 一致
    fn split_range_with_list<'a>(
        &self,
        value: &'a str,
        list: &[(usize, usize)],
        first: i32,
        last: i32,
    ) -> Option<&'a str> {
        if first <= 0 || (last != WordRange::TO_END && last < first) {
            return None;
        }
        let first_index = (first - 1) as usize;
        let last_index = if last == WordRange::TO_END {
            list.len().checked_sub(1)?
        } else {
            (last - 1) as usize
        };
        let (start, _) = *list.get(first_index)?;
        let (_, end) = *list.get(last_index)?;
        value.get(start..end)
    }

    fn split<'a>(&self, value: &'a str, range: WordRange) -> Option<&'a str> {
        self.split_range(value, range.first, range.last)
    }
}

/// 分段器选择（节点种类 → 分段器）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplitterKind {
    Word,
    Version,
}

impl SplitterKind {
    pub fn splitter(self) -> &'static dyn Splitter {
        match self {
            SplitterKind::Word => &WordSplitter,
            SplitterKind::Version => &VersionSplitter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 两种实现对所有区间组合给出相同结果
    fn assert_consistent(splitter: &dyn Splitter, value: &str) {
        let list = splitter.create_split_list(value);
        for first in -1..8 {
            for last in -2..8 {
                assert_eq!(
                    splitter.split_range(value, first, last),
                    splitter.split_range_with_list(value, &list, first, last),
                    "value={:?} first={} last={}",
                    value,
                    first,
                    last
                );
            }
        }
    }

    #[test]
    fn test_rescan_and_list_agree() {
        let values = [
            "",
            "one",
            "one two three",
            "  leading and trailing  ",
            "Mozilla/5.0 (Linux; Android 7.0)",
            "a--b__c",
            "Chrome-Ex;tra:stuff",
        ];
        for value in values {
            assert_consistent(&WordSplitter, value);
            assert_consistent(&VersionSplitter, value);
        }
        for value in ["1.2.3_4-5", "www.example.com", "user@host.com", "http-x.1", "..1..2"] {
            assert_consistent(&VersionSplitter, value);
        }
    }

    #[test]
    fn test_kind_dispatch() {
        assert_eq!(
            SplitterKind::Word.splitter().single_split("a b", 2),
            Some("b")
        );
        assert_eq!(
            SplitterKind::Version.splitter().single_split("1.2", 2),
            Some("2")
        );
    }
}
