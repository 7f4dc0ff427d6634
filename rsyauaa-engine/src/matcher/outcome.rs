use rustc_hash::FxHashMap;
use serde::Serialize;

use super::matches::MatchesList;
use crate::core::sink::ResultSink;

/// 单次解析选项
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyzeOptions {
    /// 保留命中明细（诊断用）
    pub keep_matches: bool,
}

/// 同一字段、同一置信度却给出不同值的冲突
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfidenceCollision {
    pub field: String,
    pub confidence: i64,
    pub kept: String,
    pub rejected: String,
}

/// 单次解析的统计
#[derive(Debug, Clone)]
pub struct AnalyzeReport {
    /// 被通知触及的规则数
    pub touched_matchers: usize,
    /// 最终成立并写出结果的规则数
    pub fired_matchers: usize,
    pub collisions: Vec<ConfidenceCollision>,
    pub matches: MatchesList,
}

#[derive(Debug, Clone)]
struct FieldCandidate {
    value: String,
    confidence: i64,
}

/// 字段收集：每个字段只保留置信度最高的值
#[derive(Debug, Default)]
pub(crate) struct FieldCollector {
    fields: FxHashMap<String, FieldCandidate>,
    collisions: Vec<ConfidenceCollision>,
}

impl FieldCollector {
    /// 置信度严格更高才覆盖；相同置信度的不同值记为冲突，保留先到者
    pub fn offer(&mut self, field: &str, value: &str, confidence: i64) {
        match self.fields.get_mut(field) {
            None => {
                self.fields.insert(
                    field.to_string(),
                    FieldCandidate {
                        value: value.to_string(),
                        confidence,
                    },
                );
            }
            Some(current) if confidence > current.confidence => {
                current.value = value.to_string();
                current.confidence = confidence;
            }
            Some(current) if confidence == current.confidence && current.value != value => {
                log::warn!(
                    "Field {} has two values with confidence {}: kept [{}], rejected [{}]",
                    field,
                    confidence,
                    current.value,
                    value
                );
                self.collisions.push(ConfidenceCollision {
                    field: field.to_string(),
                    confidence,
                    kept: current.value.clone(),
                    rejected: value.to_string(),
                });
            }
            Some(_) => {}
        }
    }

    /// 按置信度从低到高写入结果接收方，返回冲突列表
    pub fn flush(self, sink: &mut dyn ResultSink) -> Vec<ConfidenceCollision> {
        let mut fields: Vec<(String, FieldCandidate)> = self.fields.into_iter().collect();
        fields.sort_by(|(a_name, a), (b_name, b)| {
            a.confidence
                .cmp(&b.confidence)
                .then_with(|| a_name.cmp(b_name))
        });
        for (field, candidate) in &fields {
            sink.set(field, &candidate.value, candidate.confidence);
        }
        self.collisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highest_confidence_wins() {
        let mut collector = FieldCollector::default();
        collector.offer("DeviceClass", "Phone", 100);
        collector.offer("DeviceClass", "Tablet", 200);
        collector.offer("DeviceClass", "Desktop", 150);
        let mut sink: Vec<(String, String, i64)> = Vec::new();
        let collisions = collector.flush(&mut sink);
        assert!(collisions.is_empty());
        assert_eq!(sink, vec![("DeviceClass".into(), "Tablet".into(), 200)]);
    }

    #[test]
    fn test_tie_keeps_first_and_reports() {
        let mut collector = FieldCollector::default();
        collector.offer("AgentName", "Chrome", 10);
        collector.offer("AgentName", "Chromium", 10);
        collector.offer("AgentName", "Chrome", 10);
        let mut sink: Vec<(String, String, i64)> = Vec::new();
        let collisions = collector.flush(&mut sink);
        assert_eq!(sink[0].1, "Chrome");
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].rejected, "Chromium");
    }

    #[test]
    fn test_flush_order_by_confidence() {
        let mut collector = FieldCollector::default();
        collector.offer("B", "b", 50);
        collector.offer("A", "a", 5);
        collector.offer("C", "c", 50);
        let mut sink: Vec<(String, String, i64)> = Vec::new();
        collector.flush(&mut sink);
        let order: Vec<&str> = sink.iter().map(|(f, _, _)| f.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
    }
}
