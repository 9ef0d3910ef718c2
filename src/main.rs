//! Schematic 转 C 头文件工具

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dialoguer::{Confirm, Input};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use schemh::header::output_path_for;
use schemh::settings::{RULES_FILE, SETTINGS_FILE};
use schemh::{
    convert_with_table, find_schematics, preflight, AxisOrder, ConvertOptions, DataEncoding,
    LegendMerge, MatchMode, RuleTable, Settings,
};

/// Schematic 转 C 头文件工具
#[derive(Parser)]
#[command(name = "schemh", version, about, args_conflicts_with_subcommands = true)]
struct Cli {
    /// 设置文件路径
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    convert: ConvertArgs,
}

#[derive(Args)]
struct ConvertArgs {
    /// schematic 文件或目录（省略时交互输入）
    input: Option<PathBuf>,
    /// 规则文件路径
    #[arg(short, long)]
    rules: Option<PathBuf>,
    /// 输出头文件路径（默认: 输入文件旁的 .h）
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// 数组轴顺序
    #[arg(long, value_enum)]
    axis: Option<AxisOrder>,
    /// 名称匹配方式
    #[arg(long, value_enum)]
    match_mode: Option<MatchMode>,
    /// 图例合并方式
    #[arg(long, value_enum)]
    legend_merge: Option<LegendMerge>,
    /// Data 字段编码
    #[arg(long, value_enum)]
    data_encoding: Option<DataEncoding>,
    /// 数组元素的 C 类型
    #[arg(long)]
    array_type: Option<String>,
    /// 不询问直接覆盖已存在的头文件
    #[arg(short = 'y', long, visible_alias = "overwrite")]
    force: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// 生成默认设置文件
    Config {
        /// 输出路径（默认: schemh.toml）
        #[arg(short, long, default_value = SETTINGS_FILE)]
        output: PathBuf,
        /// 覆盖已存在的文件
        #[arg(long)]
        force: bool,
    },
    /// 生成示例规则文件
    Rules {
        /// 输出路径（默认: block_rules.json）
        #[arg(short, long, default_value = RULES_FILE)]
        output: PathBuf,
        /// 覆盖已存在的文件
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_settings(config_path: Option<PathBuf>) -> Result<Settings> {
    match config_path {
        Some(path) => {
            let settings = Settings::load_from_file(&path)?;
            eprintln!("已加载设置: {}", path.display());
            Ok(settings)
        }
        None => Ok(Settings::load()),
    }
}

/// 命令行参数优先于设置文件
fn apply_overrides(settings: &mut Settings, args: &ConvertArgs) {
    if let Some(axis) = args.axis {
        settings.output.axis_order = axis;
    }
    if let Some(mode) = args.match_mode {
        settings.resolve.match_mode = mode;
    }
    if let Some(merge) = args.legend_merge {
        settings.resolve.legend_merge = merge;
    }
    if let Some(encoding) = args.data_encoding {
        settings.schematic.data_encoding = encoding;
    }
    if let Some(array_type) = &args.array_type {
        settings.output.array_type = array_type.clone();
    }
}

fn prompt_input() -> Result<PathBuf> {
    let text = Input::<String>::new()
        .with_prompt("schematic 文件路径")
        .interact_text()
        .context("无法读取输入")?;
    // 拖放文件时路径可能带引号
    Ok(PathBuf::from(text.trim().trim_matches('"')))
}

fn confirm_overwrite(path: &Path) -> Result<bool> {
    Confirm::new()
        .with_prompt(format!("{} 已存在，是否覆盖?", path.display()))
        .default(false)
        .interact()
        .context("无法读取确认")
}

fn write_file(output: &Path, force: bool, content: &str) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!("文件已存在: {:?}\n使用 --force 覆盖", output);
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, content)?;
    Ok(())
}

fn run_convert(config_path: Option<PathBuf>, args: ConvertArgs) -> Result<()> {
    let mut settings = load_settings(config_path)?;
    apply_overrides(&mut settings, &args);

    let input = match &args.input {
        Some(path) => path.clone(),
        None => prompt_input()?,
    };
    let rules_path = settings.locate_rules(args.rules.as_deref(), &input);

    let batch = input.is_dir();
    if batch && args.output.is_some() {
        anyhow::bail!("输入为目录时不能指定 --output");
    }
    let single_output = if batch {
        None
    } else {
        Some(args.output.clone().unwrap_or_else(|| output_path_for(&input)))
    };

    preflight::check(&input, &rules_path, single_output.as_deref())?;

    let options = ConvertOptions::from_settings(&settings, rules_path);
    let table: RuleTable = options.load_rules()?;
    eprintln!(
        "已加载规则: {} ({} 条)",
        options.rules_path.display(),
        table.entries.len()
    );

    let jobs: Vec<(PathBuf, PathBuf)> = match single_output {
        Some(output) => vec![(input.clone(), output)],
        None => find_schematics(&input)?
            .into_iter()
            .map(|file| {
                let output = output_path_for(&file);
                (file, output)
            })
            .collect(),
    };

    if jobs.is_empty() {
        println!("目录中没有 .schem 文件: {:?}", input);
        return Ok(());
    }

    let start = Instant::now();
    for (file, output) in &jobs {
        if output.exists() && !args.force && !confirm_overwrite(output)? {
            println!("已跳过: {:?}", output);
            continue;
        }

        println!("读取: {:?}", file);
        let conversion = convert_with_table(file, output, &table, &options)?;
        print!("{}", conversion.report());
        println!("已生成: {:?}", conversion.output);
        println!();
    }
    println!("耗时: {:.2}s", start.elapsed().as_secs_f64());

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(Commands::Config { output, force }) => {
            write_file(&output, force, &Settings::default_toml())?;
            println!("已生成设置文件: {:?}", output);
            println!("\n设置项说明:");
            println!("  [rules]");
            println!("    path = \"{}\"        # 规则文件", RULES_FILE);
            println!("    encodings = [...]    # 按顺序尝试的编码");
            println!("  [resolve]");
            println!("    match_mode = \"base-name\" | \"raw\"");
            println!("    legend_merge = \"accumulate\" | \"last-wins\"");
            println!("  [schematic]");
            println!("    data_encoding = \"varint\" | \"raw\"");
            println!("  [output]");
            println!("    axis_order = \"height-length-width\" | \"length-width-height\"");
            println!("    array_type = \"int\"");
        }

        Some(Commands::Rules { output, force }) => {
            let sample = serde_json::to_string_pretty(&RuleTable::sample_json())?;
            write_file(&output, force, &sample)?;
            println!("已生成示例规则: {:?}", output);
            println!("规则按顺序匹配，先命中者优先；名称片段使用包含匹配。");
        }

        None => run_convert(cli.config, cli.convert)?,
    }

    Ok(())
}
