//! 调色板解析：方块状态字符串 → 输出 ID

use crate::block_state::BlockState;
use crate::rules::{RuleEntry, RuleTable};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// 调色板索引 → 输出 ID
pub type IdMap = BTreeMap<i32, i32>;

/// 名称片段的匹配对象
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    /// 只在去掉属性段的基础名中查找
    #[default]
    BaseName,
    /// 在包含属性段的完整字符串中查找
    Raw,
}

/// 单个方块的解析结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub id: i32,
    /// 命中的规则下标，`None` 表示使用了表默认值
    pub rule: Option<usize>,
}

/// 调色板解析器
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    table: &'a RuleTable,
    mode: MatchMode,
}

impl<'a> Resolver<'a> {
    pub fn new(table: &'a RuleTable, mode: MatchMode) -> Self {
        Self { table, mode }
    }

    /// 解析方块状态字符串为输出 ID
    pub fn resolve(&self, raw: &str) -> i32 {
        self.resolve_state(&BlockState::parse(raw)).id
    }

    /// 按规则表顺序查找第一条名称片段命中的规则
    pub fn resolve_state(&self, state: &BlockState) -> Resolution {
        let haystack = match self.mode {
            MatchMode::BaseName => state.base.as_str(),
            MatchMode::Raw => state.raw.as_str(),
        };

        let hit = self
            .table
            .entries
            .iter()
            .enumerate()
            .find(|(_, entry)| haystack.contains(entry.fragment.as_str()));

        match hit {
            Some((index, entry)) => Resolution {
                id: apply_conditions(entry, state),
                rule: Some(index),
            },
            None => Resolution {
                id: self.table.default_id,
                rule: None,
            },
        }
    }

    /// 解析整个调色板（方块名 → 索引）为索引 → ID 映射
    pub fn resolve_palette(&self, palette: &BTreeMap<String, i32>) -> IdMap {
        let mut map = IdMap::new();
        let mut unmatched = Vec::new();

        for (name, &index) in palette {
            let resolution = self.resolve_state(&BlockState::parse(name));
            debug!("调色板 {} ({}) -> {}", index, name, resolution.id);
            if resolution.rule.is_none() {
                unmatched.push(name.as_str());
            }
            map.insert(index, resolution.id);
        }

        if !unmatched.is_empty() {
            warn!(
                "{} 种方块未匹配任何规则，使用默认 ID {}: {}",
                unmatched.len(),
                self.table.default_id,
                unmatched.join(", ")
            );
        }

        map
    }
}

fn apply_conditions(entry: &RuleEntry, state: &BlockState) -> i32 {
    entry
        .conditions
        .iter()
        .find(|cond| state.has_properties(&cond.properties))
        .map_or(entry.default_id, |cond| cond.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::FALLBACK_ID;

    fn stairs_table() -> RuleTable {
        RuleTable::new(
            FALLBACK_ID,
            vec![
                RuleEntry::new("spruce_stairs", 5)
                    .with_condition(&[("half", "bottom"), ("facing", "east")], 5)
                    .with_condition(&[("half", "top"), ("facing", "east")], 9),
                RuleEntry::new("spruce_planks", 1),
            ],
        )
    }

    #[test]
    fn stairs_scenario() {
        let table = stairs_table();
        let resolver = Resolver::new(&table, MatchMode::BaseName);

        assert_eq!(resolver.resolve("minecraft:spruce_stairs[half=top,facing=east]"), 9);
        assert_eq!(resolver.resolve("minecraft:spruce_stairs[facing=east,half=bottom]"), 5);
        assert_eq!(resolver.resolve("minecraft:spruce_planks"), 1);
        assert_eq!(resolver.resolve("minecraft:unknown_block"), 99);
    }

    #[test]
    fn unmatched_conditions_use_entry_default() {
        let table = stairs_table();
        let resolver = Resolver::new(&table, MatchMode::BaseName);

        assert_eq!(resolver.resolve("minecraft:spruce_stairs[half=top,facing=west]"), 5);
        assert_eq!(resolver.resolve("minecraft:spruce_stairs"), 5);
    }

    #[test]
    fn extra_properties_are_ignored() {
        let table = stairs_table();
        let resolver = Resolver::new(&table, MatchMode::BaseName);

        assert_eq!(
            resolver.resolve("minecraft:spruce_stairs[facing=east,half=top,shape=straight,waterlogged=false]"),
            9
        );
    }

    #[test]
    fn earlier_entry_wins_over_more_specific() {
        let table = RuleTable::new(
            FALLBACK_ID,
            vec![RuleEntry::new("planks", 1), RuleEntry::new("spruce_planks", 2)],
        );
        let resolver = Resolver::new(&table, MatchMode::BaseName);
        assert_eq!(resolver.resolve("minecraft:spruce_planks"), 1);

        let table = RuleTable::new(
            FALLBACK_ID,
            vec![RuleEntry::new("spruce_planks", 2), RuleEntry::new("planks", 1)],
        );
        let resolver = Resolver::new(&table, MatchMode::BaseName);
        assert_eq!(resolver.resolve("minecraft:spruce_planks"), 2);
        assert_eq!(resolver.resolve("minecraft:oak_planks"), 1);
    }

    #[test]
    fn match_mode_controls_property_text() {
        let table = RuleTable::new(FALLBACK_ID, vec![RuleEntry::new("waterlogged", 7)]);
        let state = "minecraft:oak_slab[type=top,waterlogged=true]";

        assert_eq!(Resolver::new(&table, MatchMode::BaseName).resolve(state), 99);
        assert_eq!(Resolver::new(&table, MatchMode::Raw).resolve(state), 7);
    }

    #[test]
    fn palette_maps_indices() {
        let table = stairs_table();
        let resolver = Resolver::new(&table, MatchMode::BaseName);
        let palette: BTreeMap<String, i32> = [
            ("minecraft:spruce_planks".to_string(), 0),
            ("minecraft:spruce_stairs[half=top,facing=east]".to_string(), 1),
            ("minecraft:glass".to_string(), 2),
        ]
        .into_iter()
        .collect();

        let map = resolver.resolve_palette(&palette);
        assert_eq!(map, IdMap::from([(0, 1), (1, 9), (2, 99)]));
    }

    #[test]
    fn resolution_reports_rule_index() {
        let table = stairs_table();
        let resolver = Resolver::new(&table, MatchMode::BaseName);

        let hit = resolver.resolve_state(&BlockState::parse("minecraft:spruce_planks"));
        assert_eq!(hit.rule, Some(1));
        let miss = resolver.resolve_state(&BlockState::parse("minecraft:dirt"));
        assert_eq!(miss, Resolution { id: 99, rule: None });
    }
}
