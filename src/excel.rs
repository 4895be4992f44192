//! # excel 模块
//!
//! 读取随程序发布的院校表格，按分组键整理为 [`UniversityGroups`]。
//!
//! 表格第一行为表头，列名不区分大小写：
//!
//! | 列名 | 必需 | 说明 |
//! |------|------|------|
//! | `group` | 是 | 分组键（整数） |
//! | `name` | 是 | 院校名称 |
//! | `campus` / `city` / `type` | 否 | 校区、城市、院校类型 |
//! | `latitude` / `longitude` | 否 | 坐标，必须同时给出 |
//!
//! 空行会被跳过，同一组内保持表格中的行顺序。

use crate::common::error::ParseError;
use crate::common::utils::normalize_header;
use crate::model::{Coord, DataConfig, University, UniversityGroups};
use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::PathBuf;
use tracing::{debug, info};

/// 院校表格数据源。
pub trait SpreadsheetParser: Send + Sync {
    fn parse(&self) -> Result<UniversityGroups, ParseError>;
}

/// 基于 calamine 的表格解析器，支持 xlsx / xls / ods。
#[derive(Debug, Clone)]
pub struct ExcelParser {
    path: PathBuf,
    sheet: Option<String>,
}

impl ExcelParser {
    pub fn new(path: impl Into<PathBuf>, sheet: Option<String>) -> Self {
        Self { path: path.into(), sheet }
    }

    pub fn from_config(config: &DataConfig) -> Self {
        Self::new(&config.spreadsheet, config.sheet.clone())
    }

    fn read_range(&self) -> Result<Range<Data>, ParseError> {
        let mut workbook = open_workbook_auto(&self.path).map_err(|source| ParseError::Open {
            path: self.path.clone(),
            source,
        })?;

        match &self.sheet {
            Some(sheet) => workbook
                .worksheet_range(sheet)
                .map_err(|source| ParseError::Sheet { sheet: sheet.clone(), source }),
            None => {
                let first = workbook
                    .sheet_names()
                    .first()
                    .cloned()
                    .ok_or(ParseError::NoWorksheet)?;
                workbook
                    .worksheet_range(&first)
                    .map_err(|source| ParseError::Sheet { sheet: first, source })
            }
        }
    }
}

impl SpreadsheetParser for ExcelParser {
    fn parse(&self) -> Result<UniversityGroups, ParseError> {
        info!("📖 读取院校表格：{}", self.path.display());
        let range = self.read_range()?;
        let groups = parse_range(&range)?;
        let total: usize = groups.values().map(Vec::len).sum();
        info!("院校表格解析完成：{} 个分组，共 {} 所院校", groups.len(), total);
        Ok(groups)
    }
}

/// 表头中各列的位置
struct Columns {
    group: usize,
    name: usize,
    campus: Option<usize>,
    city: Option<usize>,
    kind: Option<usize>,
    latitude: Option<usize>,
    longitude: Option<usize>,
}

impl Columns {
    fn from_header(header: &[Data]) -> Result<Self, ParseError> {
        let names: Vec<String> = header
            .iter()
            .map(|cell| normalize_header(&cell.to_string()))
            .collect();
        let find = |wanted: &str| names.iter().position(|n| n == wanted);

        Ok(Self {
            group: find("group").ok_or(ParseError::MissingColumn("group"))?,
            name: find("name").ok_or(ParseError::MissingColumn("name"))?,
            campus: find("campus"),
            city: find("city"),
            kind: find("type"),
            latitude: find("latitude"),
            longitude: find("longitude"),
        })
    }
}

/// 把一个工作表区域解析为分组后的院校列表。
pub fn parse_range(range: &Range<Data>) -> Result<UniversityGroups, ParseError> {
    let mut rows = range.rows();
    let header = rows.next().ok_or(ParseError::EmptySheet)?;
    let columns = Columns::from_header(header)?;

    let mut groups = UniversityGroups::new();
    // 行号按表格习惯从 1 开始，表头为第 1 行
    for (index, row) in rows.enumerate() {
        let row_no = index + 2;
        if row.iter().all(|cell| text(Some(cell)).is_none()) {
            debug!("跳过空行 {}", row_no);
            continue;
        }

        let invalid = |reason: String| ParseError::InvalidRow { row: row_no, reason };

        let key = group_key(row.get(columns.group))
            .ok_or_else(|| invalid(format!("分组键无效：{:?}", row.get(columns.group))))?;
        let name = text(row.get(columns.name)).ok_or_else(|| invalid("缺少院校名称".to_string()))?;

        let coord = match (
            columns.latitude.map(|c| row.get(c)),
            columns.longitude.map(|c| row.get(c)),
        ) {
            (Some(lat), Some(lon)) => coord(lat, lon).map_err(invalid)?,
            _ => None,
        };

        let university = University {
            name,
            campus: columns.campus.and_then(|c| text(row.get(c))),
            city: columns.city.and_then(|c| text(row.get(c))),
            kind: columns.kind.and_then(|c| text(row.get(c))),
            coord,
        };
        groups.entry(key).or_default().push(university);
    }

    Ok(groups)
}

fn text(cell: Option<&Data>) -> Option<String> {
    let value = match cell? {
        Data::Empty => return None,
        Data::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    };
    (!value.is_empty()).then_some(value)
}

fn number(cell: Option<&Data>) -> Option<f64> {
    match cell? {
        Data::Int(i) => Some(*i as f64),
        Data::Float(f) => Some(*f),
        Data::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

fn group_key(cell: Option<&Data>) -> Option<i32> {
    match cell? {
        Data::Int(i) => i32::try_from(*i).ok(),
        Data::String(s) => s.trim().parse().ok(),
        other => {
            let value = number(Some(other))?;
            let in_range = value >= f64::from(i32::MIN) && value <= f64::from(i32::MAX);
            (value.fract() == 0.0 && in_range).then_some(value as i32)
        }
    }
}

fn coord(lat: Option<&Data>, lon: Option<&Data>) -> Result<Option<Coord>, String> {
    let lat_text = text(lat);
    let lon_text = text(lon);
    match (lat_text, lon_text) {
        (None, None) => Ok(None),
        (Some(_), Some(_)) => match (number(lat), number(lon)) {
            (Some(lat), Some(lon)) => Ok(Some(Coord { lat, lon })),
            _ => Err("坐标不是数字".to_string()),
        },
        _ => Err("经纬度必须同时给出".to_string()),
    }
}
