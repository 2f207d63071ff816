use crate::domain::model::Row;
use serde_json::{Number, Value};

/// 一個 CPT 代碼在 CSV 中對應的欄位
#[derive(Debug, Clone, Copy)]
pub struct CptColumns {
    pub code: &'static str,
    pub units_column: &'static str,
    /// 依序嘗試，第一個非空白的值為 modifier
    pub modifier_columns: &'static [&'static str],
}

// 來源表格中 98977 的 modifier 標題是 "989877 Modifier"
pub const CPT_CODES: [CptColumns; 4] = [
    CptColumns {
        code: "98975",
        units_column: "98975",
        modifier_columns: &["98975 Modifier"],
    },
    CptColumns {
        code: "98977",
        units_column: "98977",
        modifier_columns: &["989877 Modifier", "98977 Modifier"],
    },
    CptColumns {
        code: "98980",
        units_column: "98980",
        modifier_columns: &["98980 Modifier"],
    },
    CptColumns {
        code: "98981",
        units_column: "98981",
        modifier_columns: &["98981 Modifier"],
    },
];

const NO_MODIFIER: &str = "no";

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedTreatment {
    pub cpt_code: String,
    pub units: f64,
    pub modifier: Option<String>,
}

impl PlannedTreatment {
    pub fn modifier_order(&self) -> Vec<String> {
        self.modifier.iter().cloned().collect()
    }

    /// 整數單位以 JSON 整數送出
    pub fn units_json(&self) -> Value {
        if self.units.fract() == 0.0 && self.units.abs() < i64::MAX as f64 {
            Value::Number(Number::from(self.units as i64))
        } else {
            Number::from_f64(self.units)
                .map(Value::Number)
                .unwrap_or(Value::Null)
        }
    }
}

/// 列出這一列需要送出的治療項目（單位數 > 0 的 CPT 代碼）
pub fn plan_treatments(row: &Row) -> Vec<PlannedTreatment> {
    CPT_CODES
        .iter()
        .filter_map(|cpt| {
            let units = parse_units(row.get(cpt.units_column))?;
            Some(PlannedTreatment {
                cpt_code: cpt.code.to_string(),
                units,
                modifier: modifier_for(row, cpt),
            })
        })
        .collect()
}

fn parse_units(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|units| units.is_finite() && *units > 0.0)
}

fn modifier_for(row: &Row, cpt: &CptColumns) -> Option<String> {
    cpt.modifier_columns
        .iter()
        .map(|column| row.get(column).trim())
        .find(|value| !value.is_empty())
        .filter(|value| !value.eq_ignore_ascii_case(NO_MODIFIER))
        .map(str::to_string)
}
