//! C 头文件生成

use crate::error::RuntimeError;
use crate::legend::Legend;
use crate::volume::{AxisOrder, Volume};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// 头文件渲染参数
#[derive(Debug, Clone)]
pub struct HeaderOptions {
    pub axis_order: AxisOrder,
    /// 数组元素的 C 类型
    pub array_type: String,
    /// 写入注释的源文件名
    pub source_name: String,
    /// 数组名
    pub identifier: String,
    /// 生成时间（已格式化）
    pub generated_at: String,
}

/// 输入文件旁的 `<basename>.h`
pub fn output_path_for(input: &Path) -> PathBuf {
    input.with_extension("h")
}

/// 由文件名生成合法的 C 标识符
pub fn identifier_for(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut ident: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if ident.is_empty() {
        ident.push_str("level_map");
    } else if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    ident
}

/// 渲染头文件内容
pub fn render(volume: &Volume, legend: &Legend, options: &HeaderOptions) -> String {
    let dims = volume.dimensions();
    let order = options.axis_order;
    let guard = format!("{}_H", options.identifier.to_ascii_uppercase());
    let [outer_len, middle_len, _] = order.extents(dims);
    let [outer_axis, middle_axis, inner_axis] = order.axes();
    let [outer_name, middle_name, inner_name] = order.extent_names();

    // 写入 String 不会失败
    let mut out = String::new();
    let _ = writeln!(
        out,
        "// 自动生成于 {}，请勿手动修改",
        comment_text(&options.generated_at)
    );
    let _ = writeln!(out, "// 源文件: {}", comment_text(&options.source_name));
    out.push_str("//\n// 图例:\n");
    for (id, name) in legend {
        let _ = writeln!(out, "//   {} = {}", id, comment_text(&name.to_string()));
    }
    out.push('\n');

    let _ = writeln!(out, "#ifndef {}", guard);
    let _ = writeln!(out, "#define {}\n", guard);
    let _ = writeln!(out, "#define MAP_WIDTH {}", dims.width);
    let _ = writeln!(out, "#define MAP_HEIGHT {}", dims.height);
    let _ = writeln!(out, "#define MAP_LENGTH {}\n", dims.length);

    let _ = writeln!(
        out,
        "// 索引方式: {}[{}][{}][{}]",
        options.identifier, outer_axis, middle_axis, inner_axis
    );
    let _ = writeln!(
        out,
        "static {} {}[{}][{}][{}] = {{",
        options.array_type, options.identifier, outer_name, middle_name, inner_name
    );

    for outer in 0..outer_len {
        let _ = writeln!(out, "    {{ // {}={}", outer_axis.to_ascii_uppercase(), outer);
        for middle in 0..middle_len {
            let row: Vec<String> = volume
                .row(order, outer, middle)
                .iter()
                .map(|id| id.to_string())
                .collect();
            let _ = writeln!(
                out,
                "        {{{}}}, // {}={}",
                row.join(","),
                middle_axis.to_ascii_uppercase(),
                middle
            );
        }
        out.push_str("    },\n");
    }
    out.push_str("};\n\n");
    let _ = writeln!(out, "#endif // {}", guard);

    out
}

/// 行注释内不能出现换行
fn comment_text(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

/// 先写临时文件再改名，保证不会留下半截头文件
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), RuntimeError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "header.h".to_string());
    let temp = path.with_file_name(format!(".{}.tmp", file_name));

    fs::write(&temp, contents).map_err(|source| {
        let _ = fs::remove_file(&temp);
        RuntimeError::Write {
            path: temp.clone(),
            source,
        }
    })?;

    fs::rename(&temp, path).map_err(|source| {
        let _ = fs::remove_file(&temp);
        RuntimeError::Write {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legend::LegendName;
    use crate::resolver::IdMap;
    use crate::schematic::Dimensions;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn options(order: AxisOrder) -> HeaderOptions {
        HeaderOptions {
            axis_order: order,
            array_type: "int".to_string(),
            source_name: "Floor1.schem".to_string(),
            identifier: "Floor1".to_string(),
            generated_at: "2026-01-02 03:04:05".to_string(),
        }
    }

    fn sample() -> (Volume, Legend) {
        let ids = IdMap::from([(0, 1), (1, 2), (2, 3), (3, 4)]);
        let volume = Volume::build(&[0, 1, 2, 3], &ids, Dimensions::new(2, 1, 2), 99);
        let legend = Legend::from([
            (1, LegendName::Single("トウヒの板材".into())),
            (99, LegendName::List(vec!["その他".into(), "ガラス".into()])),
        ]);
        (volume, legend)
    }

    #[test]
    fn renders_height_length_width() {
        let (volume, legend) = sample();
        let text = render(&volume, &legend, &options(AxisOrder::HeightLengthWidth));

        let expected = "\
// 自动生成于 2026-01-02 03:04:05，请勿手动修改
// 源文件: Floor1.schem
//
// 图例:
//   1 = トウヒの板材
//   99 = その他, ガラス

#ifndef FLOOR1_H
#define FLOOR1_H

#define MAP_WIDTH 2
#define MAP_HEIGHT 1
#define MAP_LENGTH 2

// 索引方式: Floor1[y][z][x]
static int Floor1[MAP_HEIGHT][MAP_LENGTH][MAP_WIDTH] = {
    { // Y=0
        {1,2}, // Z=0
        {3,4}, // Z=1
    },
};

#endif // FLOOR1_H
";
        assert_eq!(text, expected);
    }

    #[test]
    fn renders_length_width_height() {
        let (volume, legend) = sample();
        let mut opts = options(AxisOrder::LengthWidthHeight);
        opts.array_type = "unsigned char".to_string();
        let text = render(&volume, &legend, &opts);

        assert!(text.contains("// 索引方式: Floor1[z][x][y]\n"));
        assert!(text.contains("static unsigned char Floor1[MAP_LENGTH][MAP_WIDTH][MAP_HEIGHT] = {\n"));
        assert!(text.contains("    { // Z=1\n        {3}, // X=0\n        {4}, // X=1\n    },\n"));
    }

    #[test]
    fn identifiers_are_sanitized() {
        assert_eq!(identifier_for(Path::new("maps/Floor1.schem")), "Floor1");
        assert_eq!(identifier_for(Path::new("2nd floor-b.schem")), "_2nd_floor_b");
        assert_eq!(output_path_for(Path::new("maps/Floor1.schem")), PathBuf::from("maps/Floor1.h"));
    }

    #[test]
    fn atomic_write_leaves_no_temp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Floor1.h");
        write_atomic(&path, "// ok\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "// ok\n");
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn legend_names_stay_in_comments() {
        let (volume, _) = sample();
        let legend = Legend::from([(1, LegendName::Single("石\nint broken = 1;\r\n".into()))]);
        let mut opts = options(AxisOrder::HeightLengthWidth);
        opts.source_name = "a\nb.schem".to_string();
        let text = render(&volume, &legend, &opts);

        assert!(text.contains("//   1 = 石 int broken = 1;  \n"));
        assert!(text.contains("// 源文件: a b.schem\n"));
        let header_end = text.find("#ifndef").unwrap();
        for line in text[..header_end].lines().filter(|l| !l.is_empty()) {
            assert!(line.starts_with("//"), "未注释的行: {}", line);
        }
    }

    #[test]
    fn failed_rename_removes_temp() {
        let dir = TempDir::new().unwrap();
        // 目标是非空目录，改名必然失败
        let path = dir.path().join("Floor1.h");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        assert!(matches!(write_atomic(&path, "x"), Err(RuntimeError::Write { .. })));
        assert!(!dir.path().join(".Floor1.h.tmp").exists());
    }

    #[test]
    fn failed_temp_write_reports_temp_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Floor1.h");
        let temp = dir.path().join(".Floor1.h.tmp");
        fs::create_dir(&temp).unwrap();

        match write_atomic(&path, "x") {
            Err(RuntimeError::Write { path: failed, .. }) => assert_eq!(failed, temp),
            other => panic!("意外结果: {:?}", other),
        }
        assert!(!path.exists());
    }

    #[test]
    fn atomic_write_to_missing_dir_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no_such_dir").join("x.h");
        assert!(matches!(write_atomic(&path, "x"), Err(RuntimeError::Write { .. })));
    }
}
