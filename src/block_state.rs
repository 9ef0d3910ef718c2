//! 方块状态字符串解析
//!
//! `minecraft:spruce_stairs[facing=east,half=top]` 拆分为基础名与属性表。

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static PROPERTIES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]*)\]").expect("属性正则无效"));

/// 解析后的方块状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockState {
    /// 原始字符串
    pub raw: String,
    /// 去掉属性段后的名称
    pub base: String,
    /// 属性表
    pub properties: BTreeMap<String, String>,
}

impl BlockState {
    /// 解析方块状态字符串，缺少 `=` 的属性对直接跳过
    pub fn parse(raw: &str) -> Self {
        let Some(caps) = PROPERTIES_RE.captures(raw) else {
            return Self {
                raw: raw.to_string(),
                base: raw.trim().to_string(),
                properties: BTreeMap::new(),
            };
        };

        let whole = caps.get(0).map_or(0..0, |m| m.range());
        let inner = caps.get(1).map_or("", |m| m.as_str());

        let mut base = String::with_capacity(raw.len());
        base.push_str(&raw[..whole.start]);
        base.push_str(&raw[whole.end..]);

        Self {
            raw: raw.to_string(),
            base: base.trim().to_string(),
            properties: parse_properties(inner),
        }
    }

    /// 检查是否包含全部要求的属性（多余的属性忽略）
    pub fn has_properties(&self, required: &BTreeMap<String, String>) -> bool {
        required
            .iter()
            .all(|(key, value)| self.properties.get(key) == Some(value))
    }
}

fn parse_properties(inner: &str) -> BTreeMap<String, String> {
    inner
        .split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim()))
        .filter(|(k, _)| !k.is_empty())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
