//! Schematic 转 C 头文件工具
//!
//! 将 Sponge schematic 的方块数据按规则表映射为整数 ID，输出三维数组头文件

pub mod block_state;
pub mod convert;
pub mod error;
pub mod header;
pub mod legend;
pub mod preflight;
pub mod resolver;
pub mod rules;
pub mod schematic;
pub mod settings;
pub mod volume;

pub use block_state::BlockState;
pub use convert::{convert_file, convert_with_table, find_schematics, Conversion, ConvertOptions};
pub use error::{ConfigError, Error, InputError, Result, RuntimeError};
pub use legend::{build_legend, Legend, LegendMerge, LegendName};
pub use resolver::{IdMap, MatchMode, Resolver};
pub use rules::{Condition, RuleEntry, RuleTable};
pub use schematic::{DataEncoding, Dimensions, Schematic};
pub use settings::Settings;
pub use volume::{AxisOrder, Volume};
