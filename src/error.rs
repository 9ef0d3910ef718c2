//! 错误类型
//!
//! 三类错误：配置错误、输入错误、运行时错误。
//! 未知方块名与越界索引不属于错误，统一回退到默认 ID。

use std::path::PathBuf;
use thiserror::Error;

/// 顶层错误
#[derive(Debug, Error)]
pub enum Error {
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    #[error("输入错误: {0}")]
    Input(#[from] InputError),

    #[error("运行时错误: {0}")]
    Runtime(#[from] RuntimeError),
}

/// 规则配置或工具设置相关的错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("找不到配置文件: {}", .0.display())]
    NotFound(PathBuf),

    #[error("无法读取配置文件 {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 所有候选编码都无法解码为合法 JSON
    #[error(
        "无法解析配置文件 {} (已尝试编码: {}): {reason}",
        .path.display(),
        .tried.join(", ")
    )]
    Undecodable {
        path: PathBuf,
        tried: Vec<String>,
        /// 最后一次 JSON 解析错误
        reason: String,
    },

    #[error("配置结构不正确: {0}")]
    Shape(String),

    #[error("第 {index} 条规则无效: {reason}")]
    InvalidEntry { index: usize, reason: String },

    #[error("未知的文本编码: {0}")]
    UnknownEncoding(String),

    #[error("无法加载设置 {}: {reason}", .path.display())]
    Settings { path: PathBuf, reason: String },
}

/// Schematic 输入相关的错误
#[derive(Debug, Error)]
pub enum InputError {
    #[error("找不到输入文件: {}", .0.display())]
    NotFound(PathBuf),

    #[error("无法读取输入文件 {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("无法解码 schematic: {0}")]
    Decode(String),

    #[error("schematic 缺少字段: {0}")]
    MissingField(&'static str),

    #[error("尺寸无效: {width}x{height}x{length}")]
    InvalidDimensions { width: i64, height: i64, length: i64 },

    #[error("方块数据损坏: {0}")]
    MalformedData(String),
}

/// 其他运行期错误
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("无法写入 {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn families_wrap_with_prefix() {
        let err: Error = InputError::MissingField("Data").into();
        assert!(matches!(err, Error::Input(InputError::MissingField("Data"))));
        assert_eq!(err.to_string(), "输入错误: schematic 缺少字段: Data");

        let err: Error = ConfigError::Shape("缺少 blocks 列表".into()).into();
        assert!(err.to_string().starts_with("配置错误"));
    }

    #[test]
    fn undecodable_lists_tried_encodings() {
        let err = ConfigError::Undecodable {
            path: PathBuf::from("rules.json"),
            tried: vec!["UTF-8".into(), "Shift_JIS".into()],
            reason: "expected value at line 1 column 1".into(),
        };
        let text = err.to_string();
        assert!(text.contains("UTF-8, Shift_JIS"));
        assert!(text.ends_with(": expected value at line 1 column 1"));
    }
}
