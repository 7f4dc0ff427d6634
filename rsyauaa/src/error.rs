//! 全局错误类型定义
use rsyauaa_engine::CoreError;
use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RsyError {
    // 规则相关错误
    #[error("规则加载失败：{0}")]
    RuleLoadError(String),
    #[error("规则编译失败：{0}")]
    RuleCompileError(#[from] CoreError),

    // 分析器相关错误
    #[error("分析器未初始化: {0}")]
    AnalyzerNotInitialized(String),
    #[error("分析器初始化失败: {0}")]
    AnalyzerInitError(String),
    #[error("功能未启用: {0}")]
    FeatureDisabled(String),

    // 序列化/反序列化错误
    #[error("JSON解析失败：{0}")]
    JsonError(#[from] SerdeJsonError),

    // 基础错误
    #[error("IO操作失败：{0}")]
    IoError(#[from] IoError),
    #[error("无效输入：{0}")]
    InvalidInput(String),
}

// 全局Result类型
pub type RsyResult<T> = Result<T, RsyError>;
