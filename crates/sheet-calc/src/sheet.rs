//! 計算書模型
//!
//! 持有單一計算書的原始碼與最後一次渲染輸出。原始碼是唯一的可變資料來源，
//! 變數值在需要時重新掃描取得。

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use sheet_core::{
    EquationEntry, ExtractedResult, ExtractionMiss, MissReason, ParsedVariables, ResultBlock,
    SheetConfig, SheetError, VariableEntry,
};

use crate::extract::{extract_unit, extract_value, find_block, result_blocks};
use crate::lines::LineTable;
use crate::preprocess::substitute_unit_aliases;
use crate::render::Renderer;
use crate::syntax::SyntaxClassifier;

/// 計算書狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetState {
    /// 尚未載入
    Empty,
    /// 已載入原始碼，尚未渲染
    Loaded,
    /// 已成功渲染至少一次
    Rendered,
}

/// 批次代換結果
#[derive(Debug, Default)]
pub struct SubstitutionReport {
    /// 成功改寫的變數名稱
    pub applied: Vec<String>,

    /// 個別失敗（找不到宣告、非有限數值）
    pub failures: Vec<SheetError>,
}

impl SubstitutionReport {
    /// 是否全部成功
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// 找不到宣告的變數名稱
    pub fn missing_names(&self) -> Vec<&str> {
        self.failures
            .iter()
            .filter_map(|failure| match failure {
                SheetError::VariableNotFound(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// 計算書
pub struct Sheet {
    source: String,
    rendered: Option<String>,
    state: SheetState,
    renderer: Option<Box<dyn Renderer>>,
    classifier: Arc<SyntaxClassifier>,
    config: SheetConfig,
    render_count: usize,
}

impl Sheet {
    /// 以預設配置創建空的計算書
    pub fn new() -> Self {
        Self::with_config(SheetConfig::default())
    }

    /// 以指定配置創建空的計算書
    ///
    /// 配置含有擴充詞元資料時建立專用分類器，否則使用共用分類器。
    pub fn with_config(config: SheetConfig) -> Self {
        let classifier = if config.syntax.is_empty() {
            SyntaxClassifier::shared()
        } else {
            Arc::new(SyntaxClassifier::with_config(&config.syntax))
        };

        Self {
            source: String::new(),
            rendered: None,
            state: SheetState::Empty,
            renderer: None,
            classifier,
            config,
            render_count: 0,
        }
    }

    /// 建構器模式：設定計算引擎
    pub fn with_renderer<R: Renderer + 'static>(mut self, renderer: R) -> Self {
        self.set_renderer(renderer);
        self
    }

    pub fn set_renderer<R: Renderer + 'static>(&mut self, renderer: R) {
        self.renderer = Some(Box::new(renderer));
    }

    pub fn has_renderer(&self) -> bool {
        self.renderer.is_some()
    }

    /// 載入原始碼（原樣保存，不做解析）
    ///
    /// 重新載入會捨棄先前的渲染輸出。
    pub fn load(&mut self, text: &str) {
        self.source = text.to_string();
        self.rendered = None;
        self.state = SheetState::Loaded;
        tracing::debug!("載入計算書：{} 位元組", self.source.len());
    }

    pub fn state(&self) -> SheetState {
        self.state
    }

    pub fn source_text(&self) -> &str {
        &self.source
    }

    /// 最後一次渲染輸出
    pub fn rendered_output(&self) -> Option<&str> {
        self.rendered.as_deref()
    }

    /// 計算引擎被呼叫的次數
    pub fn render_count(&self) -> usize {
        self.render_count
    }

    pub fn config(&self) -> &SheetConfig {
        &self.config
    }

    pub fn classifier(&self) -> &SyntaxClassifier {
        &self.classifier
    }

    /// 解析目前原始碼的變數宣告（三個平行序列）
    pub fn parse_variables(&self, explicit_only: bool) -> ParsedVariables {
        self.classifier.parse_variables(&self.source, explicit_only)
    }

    /// 解析目前原始碼的變數宣告
    pub fn variables(&self, explicit_only: bool) -> Vec<VariableEntry> {
        self.parse_variables(explicit_only).into_entries()
    }

    /// 改寫變數宣告的數值
    ///
    /// 只改寫第一個符合的宣告；單位、`';'` 形式與其他行保持不變。
    pub fn set_variable(&mut self, name: &str, value: f64) -> sheet_core::Result<()> {
        if self.state == SheetState::Empty {
            return Err(SheetError::NoSourceText);
        }
        if !value.is_finite() {
            return Err(SheetError::NonFiniteValue {
                name: name.to_string(),
                value,
            });
        }

        let mut table = LineTable::parse(&self.source, &self.classifier);
        table.set_value(name, value, &self.classifier)?;
        self.source = table.to_source();

        tracing::debug!("代換變數 {} = {}", name, value);
        Ok(())
    }

    /// 批次改寫變數，個別失敗不中斷
    pub fn set_variables(
        &mut self,
        assignments: &[(&str, f64)],
    ) -> sheet_core::Result<SubstitutionReport> {
        if self.state == SheetState::Empty {
            return Err(SheetError::NoSourceText);
        }

        let mut report = SubstitutionReport::default();
        for &(name, value) in assignments {
            match self.set_variable(name, value) {
                Ok(()) => report.applied.push(name.to_string()),
                Err(err) if err.is_structural() => return Err(err),
                Err(err) => {
                    tracing::warn!("變數代換失敗: {}", err);
                    report.failures.push(err);
                }
            }
        }

        tracing::debug!(
            "批次代換：成功 {} 筆，失敗 {} 筆",
            report.applied.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// 交給計算引擎的原始碼（已展開單位別名）
    pub fn preprocessed_source(&self) -> String {
        substitute_unit_aliases(&self.source, &self.config.unit_aliases, &self.classifier)
    }

    /// 呼叫計算引擎渲染目前原始碼，成功時取代先前的輸出
    pub fn calculate(&mut self) -> sheet_core::Result<&str> {
        let renderer = self.renderer.as_ref().ok_or(SheetError::RenderUnavailable)?;
        if self.source.trim().is_empty() {
            return Err(SheetError::NoSourceText);
        }

        let input = self.preprocessed_source();
        tracing::info!("開始渲染計算書：{} 行", input.lines().count());
        let start_time = Instant::now();

        let outcome = renderer.render(&input);
        self.render_count += 1;
        let output = outcome.map_err(|e| SheetError::RenderFailed(e.to_string()))?;

        tracing::info!(
            "渲染完成：輸出 {} 位元組，耗時 {:?}",
            output.len(),
            start_time.elapsed()
        );

        self.state = SheetState::Rendered;
        Ok(self.rendered.insert(output).as_str())
    }

    /// 原始碼中的計算方程式（依原順序，不去重）
    pub fn result_equations(&self) -> Vec<EquationEntry> {
        self.source
            .lines()
            .filter_map(|line| self.classifier.scan_line(line).equation())
            .collect()
    }

    /// 方程式左側名稱（去重，依首次出現順序）
    pub fn result_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for equation in self.result_equations() {
            if !names.contains(&equation.lhs) {
                names.push(equation.lhs);
            }
        }
        names
    }

    /// 最後一次渲染輸出的結果區塊；尚未渲染時為空
    pub fn result_blocks(&self) -> Vec<ResultBlock> {
        self.rendered
            .as_deref()
            .map(result_blocks)
            .unwrap_or_default()
    }

    /// 各結果名稱的數值；擷取失敗者為 `NaN`
    pub fn result_values(&self) -> Vec<f64> {
        self.result_values_checked()
            .into_iter()
            .map(|value| value.unwrap_or(f64::NAN))
            .collect()
    }

    pub fn result_values_checked(&self) -> Vec<Result<f64, ExtractionMiss>> {
        self.extract_each(extract_value)
    }

    /// 各結果名稱的單位；找不到者為空字串
    pub fn result_units(&self) -> Vec<String> {
        self.result_units_checked()
            .into_iter()
            .map(|unit| unit.unwrap_or_default())
            .collect()
    }

    pub fn result_units_checked(&self) -> Vec<Result<String, ExtractionMiss>> {
        self.extract_each(|block| extract_unit(block, &self.classifier))
    }

    /// 各結果名稱的數值與單位
    pub fn results(&self) -> Vec<ExtractedResult> {
        let blocks = self.result_blocks();
        let results: Vec<ExtractedResult> = self
            .result_names()
            .into_iter()
            .map(|name| match find_block(&blocks, &name) {
                Some(block) => {
                    let value = extract_value(block).unwrap_or(f64::NAN);
                    let unit = extract_unit(block, &self.classifier).unwrap_or_default();
                    ExtractedResult::new(name, value, unit)
                }
                None => ExtractedResult::new(name, f64::NAN, String::new()),
            })
            .collect();

        tracing::debug!(
            "擷取結果：{} 筆，缺值 {} 筆",
            results.len(),
            results.iter().filter(|r| !r.has_value()).count()
        );
        results
    }

    fn extract_each<T, F>(&self, extract: F) -> Vec<Result<T, ExtractionMiss>>
    where
        F: Fn(&ResultBlock) -> Result<T, ExtractionMiss>,
    {
        let blocks = self.result_blocks();
        self.result_names()
            .into_iter()
            .map(|name| match find_block(&blocks, &name) {
                Some(block) => extract(block),
                None => Err(ExtractionMiss::new(&name, MissReason::NoBlock)),
            })
            .collect()
    }
}

impl Default for Sheet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Sheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sheet")
            .field("state", &self.state)
            .field("source_len", &self.source.len())
            .field("rendered_len", &self.rendered.as_ref().map(String::len))
            .field("has_renderer", &self.renderer.is_some())
            .field("render_count", &self.render_count)
            .finish()
    }
}
