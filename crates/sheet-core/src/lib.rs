//! # Sheet Core
//!
//! 計算書核心資料模型與類型定義

pub mod config;
pub mod result;
pub mod variable;

// Re-export 主要類型
pub use config::{OptimizerConfig, SheetConfig, SyntaxConfig, UnitAlias};
pub use result::{ExtractedResult, ExtractionMiss, MissReason, ResultBlock};
pub use variable::{EquationEntry, ParsedVariables, VarKind, VariableEntry};

/// 計算書錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum SheetError {
    #[error("尚未載入計算書原始碼")]
    NoSourceText,

    #[error("未設定計算引擎（render function）")]
    RenderUnavailable,

    #[error("計算引擎執行失敗: {0}")]
    RenderFailed(String),

    #[error("找不到變數宣告: {0}")]
    VariableNotFound(String),

    #[error("無法寫入非有限數值: {name} = {value}")]
    NonFiniteValue { name: String, value: f64 },

    #[error("無效的配置: {0}")]
    InvalidConfig(String),
}

impl SheetError {
    /// 是否為結構性錯誤（需中止當前操作）
    ///
    /// 單一變數代換失敗屬於可略過的錯誤，批次作業應繼續執行。
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            SheetError::NoSourceText | SheetError::RenderUnavailable | SheetError::RenderFailed(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SheetError>;
