//! 計算書評估器
//!
//! 在迭代優化中包裝單一計算書：代換設計變數、渲染、擷取目標函數並組合
//! 適應值。相同問題下相同的輸入向量直接從緩存取回，不再呼叫計算引擎；
//! 問題形狀改變時清除緩存與歷史。

use serde::{Deserialize, Serialize};
use sheet_cache::{
    build_signature, create_cache_key, CacheEntry, EvaluationCache, SignatureTracker,
};
use sheet_calc::Sheet;
use sheet_core::{OptimizerConfig, SheetError};

use crate::convergence::{analyze_convergence, ConvergenceReport};
use crate::objective::{compose_fitness, ObjectiveMode};
use crate::EvaluationResult;

/// 優化問題：設計變數、目標函數與各目標函數的模式與目標值
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub design_variables: Vec<String>,
    pub objectives: Vec<String>,
    pub modes: Vec<String>,
    pub targets: Vec<f64>,
}

impl Problem {
    /// 創建問題（所有目標函數預設為 minimize）
    pub fn new<S: AsRef<str>>(design_variables: &[S], objectives: &[S]) -> Self {
        Self {
            design_variables: owned(design_variables),
            objectives: owned(objectives),
            modes: Vec::new(),
            targets: Vec::new(),
        }
    }

    /// 建構器模式：設置目標函數模式
    pub fn with_modes<S: AsRef<str>>(mut self, modes: &[S]) -> Self {
        self.modes = owned(modes);
        self
    }

    /// 建構器模式：設置目標值
    pub fn with_targets(mut self, targets: &[f64]) -> Self {
        self.targets = targets.to_vec();
        self
    }

    /// 第 `index` 個目標函數的模式（索引超出時為 minimize）
    pub fn mode(&self, index: usize) -> ObjectiveMode {
        self.modes
            .get(index)
            .map(|m| ObjectiveMode::parse(m))
            .unwrap_or_default()
    }

    /// 第 `index` 個目標函數的目標值（索引超出時為 0）
    pub fn target(&self, index: usize) -> f64 {
        self.targets.get(index).copied().unwrap_or(0.0)
    }

    pub fn signature(&self) -> String {
        build_signature(
            self.design_variables.as_slice(),
            self.objectives.as_slice(),
            self.modes.as_slice(),
            &self.targets,
        )
    }

    pub fn cache_key(&self, values: &[f64]) -> String {
        create_cache_key(
            self.design_variables.as_slice(),
            values,
            self.objectives.as_slice(),
            self.modes.as_slice(),
            &self.targets,
        )
    }
}

fn owned<S: AsRef<str>>(items: &[S]) -> Vec<String> {
    items.iter().map(|s| s.as_ref().to_string()).collect()
}

/// 計算書評估器
#[derive(Debug)]
pub struct SheetEvaluator {
    sheet: Sheet,
    config: OptimizerConfig,
    cache: EvaluationCache,
    tracker: SignatureTracker,
    history: Vec<CacheEntry>,
    iteration: usize,
}

impl SheetEvaluator {
    /// 創建評估器（計算書需已載入並設定計算引擎）
    pub fn new(sheet: Sheet, config: OptimizerConfig) -> sheet_core::Result<Self> {
        config.validate()?;

        let cache = EvaluationCache::with_capacity(config.cache_capacity);
        Ok(Self {
            sheet,
            config,
            cache,
            tracker: SignatureTracker::new(),
            history: Vec::new(),
            iteration: 0,
        })
    }

    pub fn sheet(&self) -> &Sheet {
        &self.sheet
    }

    pub fn into_sheet(self) -> Sheet {
        self.sheet
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// 比對問題簽章；改變時清除緩存與歷史，回傳是否改變
    pub fn sync_signature(&mut self, problem: &Problem) -> bool {
        let change = self.tracker.update(&problem.signature());
        if change.is_changed() {
            tracing::debug!(
                "問題形狀改變：設計變數 {} 個，目標函數 {} 個，清除 {} 筆緩存與 {} 筆歷史",
                problem.design_variables.len(),
                problem.objectives.len(),
                self.cache.len(),
                self.history.len()
            );
            self.cache.clear();
            self.history.clear();
            self.iteration = 0;
        }
        change.is_changed()
    }

    /// 評估一組設計變數數值
    ///
    /// 結構性錯誤（未載入、無計算引擎、引擎失敗）會中止並回傳；個別變數
    /// 代換失敗與目標函數缺值不中止，缺值以懲罰值計入。
    ///
    /// 目標函數缺值或非有限值時，目標值記為 `penalty_value`，適應值一律
    /// 加上 `+penalty_value`，不論該目標函數的模式（maximize 亦同）。
    pub fn evaluate(
        &mut self,
        problem: &Problem,
        values: &[f64],
    ) -> sheet_core::Result<EvaluationResult> {
        if values.len() != problem.design_variables.len() {
            return Err(SheetError::InvalidConfig(format!(
                "設計變數 {} 個，但提供了 {} 個數值",
                problem.design_variables.len(),
                values.len()
            )));
        }

        self.sync_signature(problem);

        let key = problem.cache_key(values);
        if let Some(entry) = self.cache.get(&key) {
            return Ok(EvaluationResult::from_cache(entry));
        }

        let assignments: Vec<(&str, f64)> = problem
            .design_variables
            .iter()
            .map(String::as_str)
            .zip(values.iter().copied())
            .collect();
        let report = self.sheet.set_variables(&assignments)?;
        self.sheet.calculate()?;

        let results = self.sheet.results();
        let penalty = self.config.penalty_value;
        let mut objectives = Vec::with_capacity(problem.objectives.len());
        let mut matched_values = Vec::new();
        let mut matched_modes = Vec::new();
        let mut matched_targets = Vec::new();
        let mut missing = 0usize;

        for (index, name) in problem.objectives.iter().enumerate() {
            let computed = results
                .iter()
                .find(|result| &result.name == name)
                .map(|result| result.value)
                .filter(|value| value.is_finite());

            match computed {
                Some(value) => {
                    objectives.push(value);
                    matched_values.push(value);
                    matched_modes.push(problem.mode(index).as_str());
                    matched_targets.push(problem.target(index));
                }
                None => {
                    tracing::warn!("目標函數 {} 無計算值，以懲罰值 {} 計入", name, penalty);
                    objectives.push(penalty);
                    missing += 1;
                }
            }
        }

        let fitness = compose_fitness(&matched_values, &matched_modes, &matched_targets)
            + penalty * missing as f64;

        self.iteration += 1;
        let entry = CacheEntry::new(values.to_vec(), fitness, objectives, self.iteration);
        tracing::debug!("第 {} 次評估：適應值 {}", self.iteration, fitness);

        let missing_variables = report
            .missing_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let result = EvaluationResult {
            fitness,
            objectives: entry.objectives.clone(),
            cached: false,
            iteration: self.iteration,
            missing_variables,
        };

        self.history.push(entry.clone());
        if let Some(capacity) = self.config.cache_capacity {
            let excess = self.history.len().saturating_sub(capacity);
            self.history.drain(..excess);
        }
        self.cache.insert(key, entry);
        Ok(result)
    }

    /// 目前問題下的評估歷史（設定 `cache_capacity` 時只保留最近的筆數）
    pub fn history(&self) -> &[CacheEntry] {
        &self.history
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn cache_stats(&self) -> sheet_cache::CacheStats {
        self.cache.stats()
    }

    /// 計算引擎被呼叫的次數
    pub fn render_count(&self) -> usize {
        self.sheet.render_count()
    }

    /// 保留的歷史中適應值最小的評估
    pub fn best(&self) -> Option<&CacheEntry> {
        self.history
            .iter()
            .min_by(|a, b| a.fitness.total_cmp(&b.fitness))
    }

    pub fn convergence_report(&self) -> ConvergenceReport {
        let fitness: Vec<f64> = self.history.iter().map(|entry| entry.fitness).collect();
        analyze_convergence(&fitness, &self.config)
    }

    /// 收斂診斷文字
    pub fn analyze_convergence(&self) -> String {
        self.convergence_report().to_string()
    }
}
