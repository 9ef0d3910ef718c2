//! 运行前检查
//!
//! 由驱动在流水线开始前调用一次，核心模块本身不做这些检查。

use crate::error::{ConfigError, InputError, Result, RuntimeError};
use std::path::Path;
use tracing::debug;

/// 检查输入、规则文件与输出目录是否可用
pub fn check(input: &Path, rules: &Path, output: Option<&Path>) -> Result<()> {
    if !input.exists() {
        return Err(InputError::NotFound(input.to_path_buf()).into());
    }
    if !rules.is_file() {
        return Err(ConfigError::NotFound(rules.to_path_buf()).into());
    }

    if let Some(output) = output {
        let dir = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        if !dir.is_dir() {
            return Err(RuntimeError::Other(format!("输出目录不存在: {}", dir.display())).into());
        }
        if output.is_dir() {
            return Err(RuntimeError::Other(format!("输出路径是目录: {}", output.display())).into());
        }
    }

    debug!(
        "预检通过: 输入 {}, 规则 {}",
        input.display(),
        rules.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn reports_each_missing_piece() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.schem");
        let rules = dir.path().join("rules.json");

        assert!(matches!(
            check(&input, &rules, None),
            Err(Error::Input(InputError::NotFound(_)))
        ));

        fs::write(&input, b"").unwrap();
        assert!(matches!(
            check(&input, &rules, None),
            Err(Error::Config(ConfigError::NotFound(_)))
        ));

        fs::write(&rules, b"{}").unwrap();
        assert!(check(&input, &rules, None).is_ok());

        let bad_output = dir.path().join("missing").join("a.h");
        assert!(matches!(
            check(&input, &rules, Some(&bad_output)),
            Err(Error::Runtime(_))
        ));
        assert!(check(&input, &rules, Some(&dir.path().join("a.h"))).is_ok());
    }
}
