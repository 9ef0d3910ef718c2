//! 三维方块 ID 数组重建
//!
//! 平铺数组的下标为 `x + z·W + y·W·L`：x 变化最快，其次 z，y 最慢。

use crate::resolver::IdMap;
use crate::schematic::Dimensions;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 输出数组的轴顺序（从外到内）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AxisOrder {
    /// `[height][length][width]`，即 `map[y][z][x]`
    #[default]
    HeightLengthWidth,
    /// `[length][width][height]`，即 `map[z][x][y]`
    LengthWidthHeight,
}

impl AxisOrder {
    /// 从外到内的坐标名
    pub fn axes(self) -> [char; 3] {
        match self {
            AxisOrder::HeightLengthWidth => ['y', 'z', 'x'],
            AxisOrder::LengthWidthHeight => ['z', 'x', 'y'],
        }
    }

    /// 从外到内各维的尺寸宏名
    pub fn extent_names(self) -> [&'static str; 3] {
        match self {
            AxisOrder::HeightLengthWidth => ["MAP_HEIGHT", "MAP_LENGTH", "MAP_WIDTH"],
            AxisOrder::LengthWidthHeight => ["MAP_LENGTH", "MAP_WIDTH", "MAP_HEIGHT"],
        }
    }

    /// 从外到内各维的尺寸
    pub fn extents(self, dims: Dimensions) -> [usize; 3] {
        match self {
            AxisOrder::HeightLengthWidth => [dims.height, dims.length, dims.width],
            AxisOrder::LengthWidthHeight => [dims.length, dims.width, dims.height],
        }
    }

    /// 把 (外, 中, 内) 下标转换为 (x, y, z)
    pub fn to_xyz(self, outer: usize, middle: usize, inner: usize) -> (usize, usize, usize) {
        match self {
            AxisOrder::HeightLengthWidth => (inner, outer, middle),
            AxisOrder::LengthWidthHeight => (middle, inner, outer),
        }
    }
}

/// 稠密的三维 ID 数组
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    dimensions: Dimensions,
    /// 按平铺下标存放
    cells: Vec<i32>,
}

impl Volume {
    /// 由平铺索引数组和调色板映射重建
    ///
    /// 下标超出数组长度、或索引不在映射中的体素保持 `sentinel`。
    pub fn build(flat: &[i32], ids: &IdMap, dimensions: Dimensions, sentinel: i32) -> Self {
        let Dimensions {
            width,
            height,
            length,
        } = dimensions;
        let mut cells = vec![sentinel; dimensions.volume()];

        for y in 0..height {
            for z in 0..length {
                for x in 0..width {
                    let idx = y * (length * width) + z * width + x;
                    if let Some(palette_index) = flat.get(idx) {
                        cells[idx] = ids.get(palette_index).copied().unwrap_or(sentinel);
                    }
                }
            }
        }

        Self { dimensions, cells }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// 取 (x, y, z) 处的 ID，越界返回 `None`
    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<i32> {
        let Dimensions {
            width,
            height,
            length,
        } = self.dimensions;
        if x >= width || y >= height || z >= length {
            return None;
        }
        self.cells.get(x + z * width + y * width * length).copied()
    }

    /// 按轴顺序取最内层的一行
    pub fn row(&self, order: AxisOrder, outer: usize, middle: usize) -> Vec<i32> {
        let [_, _, inner_len] = order.extents(self.dimensions);
        (0..inner_len)
            .filter_map(|inner| {
                let (x, y, z) = order.to_xyz(outer, middle, inner);
                self.get(x, y, z)
            })
            .collect()
    }

    /// 按轴顺序展开为嵌套数组
    pub fn to_nested(&self, order: AxisOrder) -> Vec<Vec<Vec<i32>>> {
        let [outer_len, middle_len, _] = order.extents(self.dimensions);
        (0..outer_len)
            .map(|outer| {
                (0..middle_len)
                    .map(|middle| self.row(order, outer, middle))
                    .collect()
            })
            .collect()
    }

    /// 各 ID 的体素数量
    pub fn distribution(&self) -> BTreeMap<i32, usize> {
        let mut counts = BTreeMap::new();
        for &id in &self.cells {
            *counts.entry(id).or_insert(0) += 1;
        }
        counts
    }
}
