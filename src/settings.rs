//! 工具设置文件（schemh.toml）加载与管理

use crate::error::ConfigError;
use crate::legend::LegendMerge;
use crate::resolver::MatchMode;
use crate::schematic::DataEncoding;
use crate::volume::AxisOrder;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// 默认设置文件名
pub const SETTINGS_FILE: &str = "schemh.toml";

/// 默认规则文件名
pub const RULES_FILE: &str = "block_rules.json";

/// 主设置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// 规则文件设置
    pub rules: RulesSettings,
    /// 方块解析设置
    pub resolve: ResolveSettings,
    /// schematic 读取设置
    pub schematic: SchematicSettings,
    /// 头文件输出设置
    pub output: OutputSettings,
}

/// 规则文件设置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesSettings {
    /// 规则文件路径
    pub path: PathBuf,
    /// 按顺序尝试的文本编码
    pub encodings: Vec<String>,
}

/// 方块解析设置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveSettings {
    /// 名称匹配方式
    pub match_mode: MatchMode,
    /// 图例合并方式
    pub legend_merge: LegendMerge,
}

/// schematic 读取设置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchematicSettings {
    /// Data 字段编码
    pub data_encoding: DataEncoding,
}

/// 头文件输出设置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// 数组轴顺序
    pub axis_order: AxisOrder,
    /// 数组元素的 C 类型
    pub array_type: String,
}

// ============== 默认值 ==============

impl Default for RulesSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(RULES_FILE),
            encodings: vec![
                "utf-8".to_string(),
                "shift_jis".to_string(),
                "euc-jp".to_string(),
            ],
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            axis_order: AxisOrder::default(),
            array_type: "int".to_string(),
        }
    }
}

// ============== 设置加载 ==============

impl Settings {
    /// 从文件加载设置
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Settings {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// 获取用户设置文件路径
    pub fn default_settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("schemh").join("config.toml"))
    }

    /// 按优先级加载设置：
    /// 1. 当前目录的 schemh.toml
    /// 2. 用户配置目录的 config.toml
    /// 3. 默认设置
    pub fn load() -> Self {
        let local = Path::new(SETTINGS_FILE);
        let user = Self::default_settings_path();

        for candidate in std::iter::once(local.to_path_buf()).chain(user) {
            if !candidate.exists() {
                continue;
            }
            match Self::load_from_file(&candidate) {
                Ok(settings) => {
                    eprintln!("已加载设置: {}", candidate.display());
                    return settings;
                }
                Err(e) => warn!("忽略设置文件 {}: {}", candidate.display(), e),
            }
        }

        Self::default()
    }

    /// 查找规则文件：
    /// 1. 命令行指定的路径
    /// 2. 设置中的路径（相对当前目录）
    /// 3. 设置中的路径（相对输入文件所在目录）
    ///
    /// 都不存在时返回第一个候选，由预检报告缺失。
    pub fn locate_rules(&self, explicit: Option<&Path>, input: &Path) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }

        let configured = &self.rules.path;
        if configured.is_absolute() || configured.exists() {
            return configured.clone();
        }

        let beside_input = input
            .parent()
            .map(|dir| dir.join(configured))
            .filter(|p| p.exists());

        beside_input.unwrap_or_else(|| configured.clone())
    }

    /// 生成默认设置文件内容
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schemh.toml");
        fs::write(
            &path,
            "[output]\naxis_order = \"length-width-height\"\n\n[resolve]\nmatch_mode = \"raw\"\n",
        )
        .unwrap();

        let settings = Settings::load_from_file(&path).unwrap();
        assert_eq!(settings.output.axis_order, AxisOrder::LengthWidthHeight);
        assert_eq!(settings.output.array_type, "int");
        assert_eq!(settings.resolve.match_mode, MatchMode::Raw);
        assert_eq!(settings.resolve.legend_merge, LegendMerge::Accumulate);
        assert_eq!(settings.rules.path, PathBuf::from(RULES_FILE));
    }

    #[test]
    fn bad_toml_is_settings_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schemh.toml");
        fs::write(&path, "[output\naxis_order = 3").unwrap();

        let err = Settings::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Settings { .. }));
    }

    #[test]
    fn default_toml_round_trips() {
        let text = Settings::default_toml();
        let parsed: Settings = toml::from_str(&text).unwrap();
        assert_eq!(parsed.rules.encodings.len(), 3);
        assert_eq!(parsed.schematic.data_encoding, DataEncoding::Varint);
    }

    #[test]
    fn rules_found_beside_input() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("Floor1.schem");
        let rules = dir.path().join("my_rules.json");
        fs::write(&rules, "{}").unwrap();

        let mut settings = Settings::default();
        settings.rules.path = PathBuf::from("my_rules.json");

        assert_eq!(settings.locate_rules(None, &input), rules);
        assert_eq!(
            settings.locate_rules(Some(Path::new("other.json")), &input),
            PathBuf::from("other.json")
        );
    }
}
