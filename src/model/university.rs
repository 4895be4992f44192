use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 分组键 -> 该组院校（保持表格中的行顺序）。
///
/// 分组键的含义由表格决定，这里不做任何解释。
pub type UniversityGroups = BTreeMap<i32, Vec<University>>;

/// 表格中的一行：一所院校（或其某个校区）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct University {
    #[serde(rename = "schoolName")]
    pub name: String,

    #[serde(rename = "campusName", skip_serializing_if = "Option::is_none")]
    pub campus: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    /// 院校类型，例如 "university" / "applied sciences"
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub coord: Option<Coord>,
}

#[cfg(test)]
impl University {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            campus: None,
            city: None,
            kind: None,
            coord: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

/// 抓取到的一个专业方向及开设该方向的院校。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniversityTopField {
    pub field: String,
    pub universities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_points: Option<f64>,
}

#[cfg(test)]
impl UniversityTopField {
    pub fn new(field: impl Into<String>, universities: Vec<String>) -> Self {
        Self {
            field: field.into(),
            universities,
            min_points: None,
        }
    }
}
