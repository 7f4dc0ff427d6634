//! 引擎级常量与可调参数
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

/// 前缀哈希最大字符数：`^="xyz"` 这类短前缀直接由索引命中，无需运行期步骤
pub const PREFIX_HASH_LIMIT: usize = 3;

/// 同一节点需要的词区间数量超过该值时，改为预先计算分段偏移表
pub const SPLIT_LIST_THRESHOLD: usize = 4;

/// 未登记名称的默认最大序号
pub const DEFAULT_MAX_RANGE: usize = 10;

/// 语法错误标记路径，遍历开始前总是第一个被通知
pub const SYNTAX_ERROR: &str = "__SyntaxError__";

/// 根节点路径名
pub const AGENT: &str = "agent";

/// 开放区间 `(*)` / `(n-)` 展开时的上限
/// 数值来自真实 User-Agent 统计，留有少量余量
static MAX_RANGE: Lazy<FxHashMap<&'static str, usize>> = Lazy::new(|| {
    let mut map = FxHashMap::default();
    // 语法本身决定只可能出现一次
    map.insert("agent", 1);
    map.insert("name", 1);
    map.insert("key", 1);

    map.insert("value", 2);
    map.insert("version", 5);
    map.insert("comments", 2);
    map.insert("entry", 20);
    map.insert("product", 10);
    map.insert("email", 2);
    map.insert("keyvalue", 3);
    map.insert("text", 8);
    map.insert("url", 3);
    map.insert("uuid", 4);
    map.insert("base64", 2);
    map
});

/// 查询某个路径名的最大展开序号
#[inline]
pub fn max_range_for(name: &str) -> usize {
    MAX_RANGE.get(name).copied().unwrap_or(DEFAULT_MAX_RANGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_unknown_names() {
        assert_eq!(max_range_for("agent"), 1);
        assert_eq!(max_range_for("entry"), 20);
        assert_eq!(max_range_for("whatever"), DEFAULT_MAX_RANGE);
    }
}
