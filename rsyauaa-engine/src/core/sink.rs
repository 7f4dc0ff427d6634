/// 匹配结果的接收方
/// 引擎按置信度从低到高依次写入，每个字段最多写一次
pub trait ResultSink {
    fn set(&mut self, field: &str, value: &str, confidence: i64);
}

/// 收集成 (字段, 值, 置信度) 列表，主要给测试与诊断使用
impl ResultSink for Vec<(String, String, i64)> {
    fn set(&mut self, field: &str, value: &str, confidence: i64) {
        self.push((field.to_string(), value.to_string(), confidence));
    }
}
