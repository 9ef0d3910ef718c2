//! 转换流水线：读取规则 → 读取 schematic → 解析调色板 → 重建 → 写头文件

use crate::error::{Result, RuntimeError};
use crate::header::{self, HeaderOptions};
use crate::legend::{build_legend, display_name, Legend, LegendMerge};
use crate::preflight;
use crate::resolver::{MatchMode, Resolver};
use crate::rules::RuleTable;
use crate::schematic::{DataEncoding, Dimensions, Schematic};
use crate::settings::Settings;
use crate::volume::{AxisOrder, Volume};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

/// schematic 文件扩展名
pub const SCHEM_EXTENSION: &str = "schem";

/// 单次转换参数
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub rules_path: PathBuf,
    pub encodings: Vec<String>,
    pub match_mode: MatchMode,
    pub legend_merge: LegendMerge,
    pub data_encoding: DataEncoding,
    pub axis_order: AxisOrder,
    pub array_type: String,
}

impl ConvertOptions {
    pub fn from_settings(settings: &Settings, rules_path: PathBuf) -> Self {
        Self {
            rules_path,
            encodings: settings.rules.encodings.clone(),
            match_mode: settings.resolve.match_mode,
            legend_merge: settings.resolve.legend_merge,
            data_encoding: settings.schematic.data_encoding,
            axis_order: settings.output.axis_order,
            array_type: settings.output.array_type.clone(),
        }
    }

    /// 加载规则表
    pub fn load_rules(&self) -> Result<RuleTable> {
        Ok(RuleTable::load(&self.rules_path, &self.encodings)?)
    }
}

/// 一次转换的结果
#[derive(Debug, Clone)]
pub struct Conversion {
    pub input: PathBuf,
    pub output: PathBuf,
    pub dimensions: Dimensions,
    pub palette_size: usize,
    pub legend: Legend,
    /// 各 ID 的体素数量
    pub distribution: BTreeMap<i32, usize>,
}

impl Conversion {
    /// 控制台报告：各 ID 的体素数量
    pub fn report(&self) -> String {
        let total: usize = self.distribution.values().sum();
        let d = self.dimensions;

        let mut out = String::new();
        let _ = writeln!(out, "尺寸: {}x{}x{} (宽x高x长)", d.width, d.height, d.length);
        let _ = writeln!(out, "调色板: {} 项", self.palette_size);
        let _ = writeln!(out, "方块分布 (共 {} 个体素):", total);
        for (id, count) in &self.distribution {
            let _ = writeln!(
                out,
                "  {:>4}  {:>8}  {}",
                id,
                count,
                display_name(&self.legend, *id)
            );
        }
        out
    }
}

/// 完整转换单个文件：预检、加载规则、转换
pub fn convert_file(input: &Path, output: &Path, options: &ConvertOptions) -> Result<Conversion> {
    preflight::check(input, &options.rules_path, Some(output))?;
    let table = options.load_rules()?;
    convert_with_table(input, output, &table, options)
}

/// 使用已加载的规则表转换单个文件
pub fn convert_with_table(
    input: &Path,
    output: &Path,
    table: &RuleTable,
    options: &ConvertOptions,
) -> Result<Conversion> {
    let schem = Schematic::load(input, options.data_encoding)?;

    let ids = Resolver::new(table, options.match_mode).resolve_palette(&schem.palette);
    let volume = Volume::build(&schem.blocks, &ids, schem.dimensions, table.default_id);
    let legend = build_legend(table, options.legend_merge);

    let header_options = HeaderOptions {
        axis_order: options.axis_order,
        array_type: options.array_type.clone(),
        source_name: input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        identifier: header::identifier_for(input),
        generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    };
    let text = header::render(&volume, &legend, &header_options);
    header::write_atomic(output, &text)?;
    info!("已生成 {}", output.display());

    Ok(Conversion {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        dimensions: schem.dimensions,
        palette_size: schem.palette.len(),
        legend,
        distribution: volume.distribution(),
    })
}

/// 列出目录下（不递归）的所有 schematic 文件，按文件名排序
pub fn find_schematics(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(RuntimeError::Other(format!("不是目录: {}", dir.display())).into());
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().map_or(false, |ext| ext == SCHEM_EXTENSION))
        .collect();
    files.sort();
    Ok(files)
}
