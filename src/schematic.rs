//! Schematic 文件读取
//!
//! 支持 Sponge v3（`Schematic.Blocks.Palette` / `Data`）与
//! v2（根下 `Palette` / `BlockData`）两种布局。

use crate::error::InputError;
use clap::ValueEnum;
use fastnbt::Value;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{ErrorKind, Read};
use std::path::Path;
use tracing::{debug, warn};

/// gzip 魔数
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Sponge 格式中单轴的最大尺寸
pub const MAX_AXIS: i64 = u16::MAX as i64;

/// 一次转换允许的最大体素数
pub const MAX_VOLUME: usize = 1 << 28;

/// 方块数据字段编码
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DataEncoding {
    /// Sponge 格式的变长整数（调色板小于 128 时与 raw 相同）
    #[default]
    Varint,
    /// 每个字节一个索引
    Raw,
}

/// 区域尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: usize,
    pub height: usize,
    pub length: usize,
}

impl Dimensions {
    pub fn new(width: usize, height: usize, length: usize) -> Self {
        Self {
            width,
            height,
            length,
        }
    }

    /// 体素总数 W·H·L
    pub fn volume(&self) -> usize {
        self.width * self.height * self.length
    }

    /// 体素总数，溢出时返回 `None`
    pub fn checked_volume(&self) -> Option<usize> {
        self.width
            .checked_mul(self.height)
            .and_then(|v| v.checked_mul(self.length))
    }
}

/// 读取后的 schematic
#[derive(Debug, Clone)]
pub struct Schematic {
    pub dimensions: Dimensions,
    /// 方块状态字符串 → 调色板索引
    pub palette: BTreeMap<String, i32>,
    /// 每个体素的调色板索引
    pub blocks: Vec<i32>,
}

impl Schematic {
    /// 从文件读取
    pub fn load(path: &Path, encoding: DataEncoding) -> Result<Self, InputError> {
        let data = fs::read(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => InputError::NotFound(path.to_path_buf()),
            _ => InputError::Read {
                path: path.to_path_buf(),
                source,
            },
        })?;
        Self::from_bytes(&data, encoding)
    }

    /// 从字节读取，自动识别 gzip
    pub fn from_bytes(data: &[u8], encoding: DataEncoding) -> Result<Self, InputError> {
        let nbt_data = if data.starts_with(&GZIP_MAGIC) {
            let mut decoder = flate2::read::GzDecoder::new(data);
            let mut decompressed = Vec::new();
            decoder
                .read_to_end(&mut decompressed)
                .map_err(|e| InputError::Decode(format!("gzip: {}", e)))?;
            decompressed
        } else {
            data.to_vec()
        };

        let value: Value =
            fastnbt::from_bytes(&nbt_data).map_err(|e| InputError::Decode(e.to_string()))?;
        Self::from_value(&value, encoding)
    }

    /// 从 NBT 树读取
    pub fn from_value(value: &Value, encoding: DataEncoding) -> Result<Self, InputError> {
        let Value::Compound(root) = value else {
            return Err(InputError::Decode("根节点不是复合标签".into()));
        };

        // v3 多包一层 Schematic
        let region = match root.get("Schematic") {
            Some(Value::Compound(inner)) => inner,
            _ => root,
        };

        let width = dimension(region, "Width")?;
        let height = dimension(region, "Height")?;
        let length = dimension(region, "Length")?;
        let invalid = InputError::InvalidDimensions {
            width,
            height,
            length,
        };
        if [width, height, length]
            .iter()
            .any(|&v| v <= 0 || v > MAX_AXIS)
        {
            return Err(invalid);
        }
        let dimensions = Dimensions::new(width as usize, height as usize, length as usize);
        match dimensions.checked_volume() {
            Some(volume) if volume <= MAX_VOLUME => {}
            _ => return Err(invalid),
        }

        let (palette_tag, data_tag) = match region.get("Blocks") {
            Some(Value::Compound(blocks)) => (blocks.get("Palette"), blocks.get("Data")),
            _ => (region.get("Palette"), region.get("BlockData")),
        };

        let palette = match palette_tag {
            Some(tag) => read_palette(tag),
            None => {
                warn!("Palette 不存在，所有方块将使用默认 ID");
                BTreeMap::new()
            }
        };

        let data_tag = data_tag.ok_or(InputError::MissingField("Data"))?;
        let blocks = read_blocks(data_tag, encoding)?;

        debug!(
            "schematic {}x{}x{}, 调色板 {} 项, 数据 {} 项",
            width,
            height,
            length,
            palette.len(),
            blocks.len()
        );

        if blocks.len() < dimensions.volume() {
            warn!(
                "方块数据只有 {} 项，少于 {} 个体素，缺失部分使用默认 ID",
                blocks.len(),
                dimensions.volume()
            );
        }

        Ok(Self {
            dimensions,
            palette,
            blocks,
        })
    }
}

fn dimension(region: &HashMap<String, Value>, field: &'static str) -> Result<i64, InputError> {
    match region.get(field) {
        // Sponge 把尺寸存为无符号 short
        Some(Value::Short(v)) => Ok(*v as u16 as i64),
        Some(Value::Byte(v)) => Ok(*v as u8 as i64),
        Some(Value::Int(v)) => Ok(*v as i64),
        Some(Value::Long(v)) => Ok(*v),
        _ => Err(InputError::MissingField(field)),
    }
}

fn read_palette(tag: &Value) -> BTreeMap<String, i32> {
    let Value::Compound(map) = tag else {
        warn!("Palette 不是复合标签，已忽略");
        return BTreeMap::new();
    };

    map.iter()
        .filter_map(|(name, index)| match int_value(index) {
            Some(i) => Some((name.clone(), i)),
            None => {
                warn!("调色板项 {} 的索引不是整数，已跳过", name);
                None
            }
        })
        .collect()
}

fn int_value(value: &Value) -> Option<i32> {
    match value {
        Value::Byte(v) => Some(*v as i32),
        Value::Short(v) => Some(*v as i32),
        Value::Int(v) => Some(*v),
        Value::Long(v) => i32::try_from(*v).ok(),
        _ => None,
    }
}

fn read_blocks(tag: &Value, encoding: DataEncoding) -> Result<Vec<i32>, InputError> {
    match tag {
        Value::ByteArray(arr) => {
            let bytes: Vec<u8> = arr.iter().map(|&b| b as u8).collect();
            match encoding {
                DataEncoding::Varint => decode_varints(&bytes),
                DataEncoding::Raw => Ok(bytes.into_iter().map(i32::from).collect()),
            }
        }
        Value::IntArray(arr) => Ok(arr.iter().copied().collect()),
        Value::List(list) => list
            .iter()
            .map(|v| int_value(v).ok_or_else(|| InputError::MalformedData("列表中含非整数".into())))
            .collect(),
        _ => Err(InputError::MalformedData("Data 字段类型不受支持".into())),
    }
}

/// 解码 LEB128 变长整数序列
pub fn decode_varints(bytes: &[u8]) -> Result<Vec<i32>, InputError> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut value: u32 = 0;
    let mut shift = 0u32;

    for (pos, &byte) in bytes.iter().enumerate() {
        // 第 5 个字节只能携带 4 位
        if shift >= 32 || (shift == 28 && byte & 0x70 != 0) {
            return Err(InputError::MalformedData(format!("位置 {} 的变长整数过长", pos)));
        }
        value |= ((byte & 0x7f) as u32) << shift;
        if byte & 0x80 == 0 {
            out.push(value as i32);
            value = 0;
            shift = 0;
        } else {
            shift += 7;
        }
    }

    if shift != 0 {
        return Err(InputError::MalformedData("变长整数在末尾被截断".into()));
    }
    Ok(out)
}
