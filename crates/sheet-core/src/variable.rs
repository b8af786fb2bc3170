//! 變數宣告與方程式模型

use serde::{Deserialize, Serialize};

/// 變數宣告類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarKind {
    /// 明確輸入宣告：`name = ?{value}unit`，或以 `';'` 串接於同一行的宣告
    Explicit,
    /// 字面值指派：`name = value unit`
    Literal,
}

/// 計算書中宣告的變數
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableEntry {
    /// 變數名稱（區分大小寫）
    pub name: String,

    /// 數值
    pub value: f64,

    /// 單位（可為空字串）
    pub unit: String,

    /// 宣告類型
    pub kind: VarKind,
}

impl VariableEntry {
    /// 創建新的變數宣告
    pub fn new(name: String, value: f64, unit: String, kind: VarKind) -> Self {
        Self {
            name,
            value,
            unit,
            kind,
        }
    }

    /// 檢查是否為明確輸入宣告
    pub fn is_explicit(&self) -> bool {
        self.kind == VarKind::Explicit
    }

    /// 檢查是否帶有單位
    pub fn has_unit(&self) -> bool {
        !self.unit.is_empty()
    }
}

/// 計算方程式（由原始碼掃描產生，不另行儲存）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquationEntry {
    /// 左側結果變數名稱
    pub lhs: String,

    /// 右側運算式（已去除註解）
    pub rhs: String,
}

impl EquationEntry {
    pub fn new(lhs: String, rhs: String) -> Self {
        Self { lhs, rhs }
    }
}

/// 變數解析結果：三個平行序列，依首次出現順序排列
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedVariables {
    pub names: Vec<String>,
    pub values: Vec<f64>,
    pub units: Vec<String>,
    kinds: Vec<VarKind>,
}

impl ParsedVariables {
    /// 創建空的解析結果
    pub fn new() -> Self {
        Self::default()
    }

    /// 寫入一筆宣告
    ///
    /// 重複名稱保留首次出現的位置，數值與單位以最後一次為準。
    pub fn upsert(&mut self, name: &str, value: f64, unit: &str, kind: VarKind) {
        match self.position(name) {
            Some(index) => {
                self.values[index] = value;
                self.units[index] = unit.to_string();
                self.kinds[index] = kind;
            }
            None => {
                self.names.push(name.to_string());
                self.values.push(value);
                self.units.push(unit.to_string());
                self.kinds.push(kind);
            }
        }
    }

    /// 查詢名稱的位置
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// 查詢變數數值
    pub fn value_of(&self, name: &str) -> Option<f64> {
        self.position(name).map(|index| self.values[index])
    }

    /// 查詢變數單位
    pub fn unit_of(&self, name: &str) -> Option<&str> {
        self.position(name).map(|index| self.units[index].as_str())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// 轉換為變數宣告列表
    pub fn into_entries(self) -> Vec<VariableEntry> {
        self.names
            .into_iter()
            .zip(self.values)
            .zip(self.units)
            .zip(self.kinds)
            .map(|(((name, value), unit), kind)| VariableEntry::new(name, value, unit, kind))
            .collect()
    }
}
