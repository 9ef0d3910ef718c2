//! 图例：输出 ID → 显示名

use crate::rules::RuleTable;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 多条规则共享同一 ID 时的合并方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LegendMerge {
    /// “未分配” ID 下累积所有显示名，其余 ID 后者覆盖前者
    #[default]
    Accumulate,
    /// 一律后者覆盖前者
    LastWins,
}

/// 图例中的显示名
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegendName {
    Single(String),
    List(Vec<String>),
}

impl fmt::Display for LegendName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LegendName::Single(name) => f.write_str(name),
            LegendName::List(names) => f.write_str(&names.join(", ")),
        }
    }
}

/// 输出 ID → 显示名，按 ID 升序
pub type Legend = BTreeMap<i32, LegendName>;

/// 由规则表构建图例
pub fn build_legend(table: &RuleTable, merge: LegendMerge) -> Legend {
    let mut legend = Legend::new();
    let accumulating = |id: i32| merge == LegendMerge::Accumulate && table.unassigned_id == Some(id);

    for entry in &table.entries {
        let entry_name = entry.display_name();

        if entry.conditions.is_empty() {
            if accumulating(entry.default_id) {
                let names = if entry.names.is_empty() {
                    vec![entry.fragment.clone()]
                } else {
                    entry.names.clone()
                };
                accumulate(&mut legend, entry.default_id, names);
            } else {
                legend.insert(entry.default_id, LegendName::Single(entry_name));
            }
            continue;
        }

        for cond in &entry.conditions {
            let name = if cond.names.is_empty() {
                entry_name.clone()
            } else {
                cond.names.join(" / ")
            };
            if accumulating(cond.id) {
                accumulate(&mut legend, cond.id, vec![name]);
            } else {
                legend.insert(cond.id, LegendName::Single(name));
            }
        }

        // 条件都不满足时使用规则默认 ID
        legend
            .entry(entry.default_id)
            .or_insert_with(|| LegendName::Single(entry_name));
    }

    legend
        .entry(table.default_id)
        .or_insert_with(|| LegendName::Single(table.default_display_name()));

    legend
}

fn accumulate(legend: &mut Legend, id: i32, names: Vec<String>) {
    let slot = legend
        .entry(id)
        .or_insert_with(|| LegendName::List(Vec::new()));
    let mut list = match std::mem::replace(slot, LegendName::List(Vec::new())) {
        LegendName::Single(existing) => vec![existing],
        LegendName::List(list) => list,
    };
    list.extend(names);
    *slot = LegendName::List(list);
}

/// 取 ID 的显示名，图例中没有时返回 `?`
pub fn display_name(legend: &Legend, id: i32) -> String {
    legend
        .get(&id)
        .map_or_else(|| "?".to_string(), |name| name.to_string())
}
