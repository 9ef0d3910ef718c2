//! 方块规则表
//!
//! 规则文件是 JSON，按顺序尝试多种文本编码读取，
//! 然后校验为强类型的 [`RuleTable`]。

use crate::error::ConfigError;
use encoding_rs::Encoding;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// 规则文件未给出 default_id 时使用的默认 ID
pub const FALLBACK_ID: i32 = 99;

/// 规则文件未给出 names_ja 时默认 ID 的显示名
pub const FALLBACK_NAME: &str = "未知";

/// 属性条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    /// 全部需要相等的属性
    pub properties: BTreeMap<String, String>,
    pub id: i32,
    /// 条件专属显示名，为空时使用规则的显示名
    pub names: Vec<String>,
}

/// 单条规则
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleEntry {
    /// 名称片段（包含匹配）
    pub fragment: String,
    pub default_id: i32,
    pub conditions: Vec<Condition>,
    pub names: Vec<String>,
}

/// 有序规则表，先匹配者优先
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTable {
    /// 没有规则匹配时的 ID
    pub default_id: i32,
    pub default_names: Vec<String>,
    /// 图例中累积显示名的“未分配” ID
    pub unassigned_id: Option<i32>,
    pub entries: Vec<RuleEntry>,
}

impl RuleEntry {
    pub fn new(fragment: impl Into<String>, default_id: i32) -> Self {
        Self {
            fragment: fragment.into(),
            default_id,
            conditions: Vec::new(),
            names: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    pub fn with_condition(mut self, properties: &[(&str, &str)], id: i32) -> Self {
        self.conditions.push(Condition {
            properties: properties
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            id,
            names: Vec::new(),
        });
        self
    }

    /// 显示名，未配置时退回名称片段
    pub fn display_name(&self) -> String {
        if self.names.is_empty() {
            self.fragment.clone()
        } else {
            self.names.join(" / ")
        }
    }
}

impl RuleTable {
    pub fn new(default_id: i32, entries: Vec<RuleEntry>) -> Self {
        Self {
            default_id,
            default_names: Vec::new(),
            unassigned_id: None,
            entries,
        }
    }

    /// 默认 ID 的显示名
    pub fn default_display_name(&self) -> String {
        if self.default_names.is_empty() {
            FALLBACK_NAME.to_string()
        } else {
            self.default_names.join(" / ")
        }
    }

    /// 从文件加载规则表，按 `encodings` 顺序尝试解码
    pub fn load(path: &Path, encodings: &[String]) -> Result<Self, ConfigError> {
        let candidates = encodings
            .iter()
            .map(|label| {
                Encoding::for_label(label.trim().as_bytes())
                    .ok_or_else(|| ConfigError::UnknownEncoding(label.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let bytes = fs::read(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
            _ => ConfigError::Read {
                path: path.to_path_buf(),
                source,
            },
        })?;

        let json = decode_json(&bytes, &candidates).map_err(|(tried, reason)| {
            ConfigError::Undecodable {
                path: path.to_path_buf(),
                tried,
                reason,
            }
        })?;

        Self::from_json(&json)
    }

    /// 校验 JSON 文档并构建规则表
    pub fn from_json(json: &JsonValue) -> Result<Self, ConfigError> {
        let root = json
            .as_object()
            .ok_or_else(|| ConfigError::Shape("顶层必须是对象".into()))?;

        let default_id = match root.get("default_id") {
            None | Some(JsonValue::Null) => FALLBACK_ID,
            Some(v) => json_id(v).ok_or_else(|| ConfigError::Shape("default_id 必须是整数".into()))?,
        };

        let unassigned_id = match root.get("unassigned_id") {
            None | Some(JsonValue::Null) => None,
            Some(v) => Some(
                json_id(v).ok_or_else(|| ConfigError::Shape("unassigned_id 必须是整数".into()))?,
            ),
        };

        let default_names = match root.get("names_ja") {
            None | Some(JsonValue::Null) => Vec::new(),
            Some(v) => serde_json::from_value::<Names>(v.clone())
                .map(Names::into_vec)
                .map_err(|e| ConfigError::Shape(format!("names_ja: {}", e)))?,
        };

        let blocks = root
            .get("blocks")
            .and_then(|v| v.as_array())
            .ok_or_else(|| ConfigError::Shape("缺少 blocks 列表".into()))?;

        let entries = blocks
            .iter()
            .enumerate()
            .map(|(index, block)| parse_entry(index, block, default_id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            default_id,
            default_names,
            unassigned_id,
            entries,
        })
    }

    /// 示例规则文件
    pub fn sample_json() -> JsonValue {
        json!({
            "default_id": FALLBACK_ID,
            "names_ja": "その他",
            "blocks": [
                {
                    "name": "spruce_stairs",
                    "default_id": 4,
                    "names_ja": "トウヒの階段",
                    "conditions": [
                        { "properties": { "half": "bottom" }, "id": 4, "names_ja": "トウヒの階段（下）" },
                        { "properties": { "half": "top" }, "id": 6, "names_ja": "トウヒの階段（上）" }
                    ]
                },
                { "name": "air", "default_id": 0, "names_ja": "空気" },
                { "name": "spruce_planks", "default_id": 1, "names_ja": "トウヒの板材" },
                { "name": "purple_terracotta", "default_id": 2, "names_ja": "紫色のテラコッタ" },
                { "name": "crimson_planks", "default_id": 3, "names_ja": "真紅の板材" }
            ]
        })
    }
}

/// 依次尝试候选编码，返回第一个能解析为 JSON 的结果；
/// 失败时返回尝试过的编码名和最后一次错误
fn decode_json(
    bytes: &[u8],
    candidates: &[&'static Encoding],
) -> Result<JsonValue, (Vec<String>, String)> {
    let mut attempts: Vec<(&'static Encoding, &[u8])> = Vec::new();
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        attempts.push((encoding, &bytes[bom_len..]));
    }
    attempts.extend(candidates.iter().map(|&encoding| (encoding, bytes)));

    let mut tried = Vec::new();
    let mut json_error = None;
    for (encoding, payload) in attempts {
        tried.push(encoding.name().to_string());
        let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(payload)
        else {
            debug!("规则文件无法按 {} 解码", encoding.name());
            continue;
        };
        match serde_json::from_str::<JsonValue>(&text) {
            Ok(json) => {
                debug!("规则文件编码: {}", encoding.name());
                return Ok(json);
            }
            Err(e) => {
                debug!("按 {} 解码后 JSON 无效: {}", encoding.name(), e);
                json_error = Some(e.to_string());
            }
        }
    }

    let reason = json_error.unwrap_or_else(|| "没有编码能无损解码该文件".to_string());
    Err((tried, reason))
}

/// 单个或多个显示名
#[derive(Deserialize)]
#[serde(untagged)]
enum Names {
    One(String),
    Many(Vec<String>),
}

impl Names {
    fn into_vec(self) -> Vec<String> {
        match self {
            Names::One(name) if name.is_empty() => Vec::new(),
            Names::One(name) => vec![name],
            Names::Many(names) => names,
        }
    }
}

#[derive(Deserialize)]
struct RawEntry {
    name: Option<String>,
    default_id: Option<JsonValue>,
    names_ja: Option<Names>,
    #[serde(default)]
    conditions: Vec<RawCondition>,
}

#[derive(Deserialize)]
struct RawCondition {
    #[serde(default)]
    properties: BTreeMap<String, JsonValue>,
    id: JsonValue,
    names_ja: Option<Names>,
}

fn parse_entry(index: usize, block: &JsonValue, table_default: i32) -> Result<RuleEntry, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEntry { index, reason };

    let raw: RawEntry = serde_json::from_value(block.clone()).map_err(|e| invalid(e.to_string()))?;

    let fragment = raw.name.unwrap_or_default().trim().to_string();
    if fragment.is_empty() {
        return Err(invalid("name 不能为空".into()));
    }

    let default_id = match raw.default_id {
        None | Some(JsonValue::Null) => table_default,
        Some(v) => json_id(&v).ok_or_else(|| invalid(format!("{}: default_id 必须是整数", fragment)))?,
    };

    let conditions = raw
        .conditions
        .into_iter()
        .map(|cond| -> Result<Condition, ConfigError> {
            let id = json_id(&cond.id)
                .ok_or_else(|| invalid(format!("{}: 条件 id 必须是整数", fragment)))?;
            let properties = cond
                .properties
                .into_iter()
                .map(|(k, v)| {
                    property_text(&v)
                        .map(|text| (k.clone(), text))
                        .ok_or_else(|| invalid(format!("{}: 属性 {} 必须是标量", fragment, k)))
                })
                .collect::<Result<BTreeMap<_, _>, _>>()?;
            Ok(Condition {
                properties,
                id,
                names: cond.names_ja.map(Names::into_vec).unwrap_or_default(),
            })
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;

    Ok(RuleEntry {
        fragment,
        default_id,
        conditions,
        names: raw.names_ja.map(Names::into_vec).unwrap_or_default(),
    })
}

fn json_id(value: &JsonValue) -> Option<i32> {
    value.as_i64().and_then(|v| i32::try_from(v).ok())
}

/// 属性值按方块状态字符串的写法转为文本
fn property_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
