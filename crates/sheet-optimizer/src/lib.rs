//! # Sheet Optimizer
//!
//! 以計算書為評估函數的優化迴圈：目標函數組合、評估緩存與收斂診斷

pub mod convergence;
pub mod evaluator;
pub mod objective;

// Re-export 主要類型
pub use convergence::{analyze_convergence, ConvergenceReport, ConvergenceStatus};
pub use evaluator::{Problem, SheetEvaluator};
pub use objective::{compose_fitness, ObjectiveMode};

use sheet_cache::CacheEntry;

/// 單次評估結果
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResult {
    /// 總適應值（越小越好）
    pub fitness: f64,

    /// 各目標函數值；缺值者為懲罰值
    pub objectives: Vec<f64>,

    /// 是否取自緩存
    pub cached: bool,

    /// 產生此結果的評估序號
    pub iteration: usize,

    /// 計算書中找不到宣告的設計變數（取自緩存時為空）
    pub missing_variables: Vec<String>,
}

impl EvaluationResult {
    /// 由緩存項目建立
    pub fn from_cache(entry: &CacheEntry) -> Self {
        Self {
            fitness: entry.fitness,
            objectives: entry.objectives.clone(),
            cached: true,
            iteration: entry.iteration,
            missing_variables: Vec::new(),
        }
    }
}
