//! # Calcsheet
//!
//! 計算書模型與結果擷取引擎
//!
//! - [`model`]：資料模型、錯誤類型與配置
//! - [`calc`]：語法分類、變數代換、渲染與結果擷取
//! - [`cache`]：問題簽章與評估緩存
//! - [`optimizer`]：目標函數組合、評估迴圈與收斂診斷

pub use sheet_cache as cache;
pub use sheet_calc as calc;
pub use sheet_core as model;
pub use sheet_optimizer as optimizer;

pub use sheet_calc::{parse_variables, Renderer, Sheet, SheetState, SyntaxClassifier};
pub use sheet_core::{OptimizerConfig, SheetConfig, SheetError, SyntaxConfig};
pub use sheet_optimizer::{Problem, SheetEvaluator};
