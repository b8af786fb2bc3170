//! 計算書與優化配置模型

use serde::{Deserialize, Serialize};

use crate::{Result, SheetError};

/// 語法分類器的擴充詞元資料
///
/// 內建的單位字元種子集已足以運作；此處僅提供額外字元與函數名稱。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntaxConfig {
    /// 額外的單位字元（每個字元各自加入）
    pub extra_unit_chars: String,

    /// 額外的已知函數名稱
    pub extra_functions: Vec<String>,
}

impl SyntaxConfig {
    /// 創建空的擴充資料
    pub fn new() -> Self {
        Self::default()
    }

    /// 建構器模式：加入額外單位字元
    pub fn with_unit_chars(mut self, chars: &str) -> Self {
        self.extra_unit_chars.push_str(chars);
        self
    }

    /// 建構器模式：加入額外函數名稱
    pub fn with_function(mut self, name: &str) -> Self {
        self.extra_functions.push(name.to_string());
        self
    }

    /// 是否未擴充任何詞元
    pub fn is_empty(&self) -> bool {
        self.extra_unit_chars.trim().is_empty()
            && self.extra_functions.iter().all(|f| f.trim().is_empty())
    }

    /// 從 JSON 載入
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SheetError::InvalidConfig(e.to_string()))
    }
}

/// 單位別名：計算引擎不認得的單位，渲染前展開為「數量 × 基本單位」
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitAlias {
    /// 別名詞元（完整詞元比對）
    pub alias: String,

    /// 展開內容
    pub expansion: String,
}

impl UnitAlias {
    pub fn new(alias: &str, expansion: &str) -> Self {
        Self {
            alias: alias.to_string(),
            expansion: expansion.to_string(),
        }
    }
}

/// 計算書配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    /// 渲染前的單位別名代換表
    pub unit_aliases: Vec<UnitAlias>,

    /// 語法分類器擴充資料
    pub syntax: SyntaxConfig,
}

impl SheetConfig {
    /// 創建新的配置（含預設單位別名）
    pub fn new() -> Self {
        Self {
            unit_aliases: Self::default_unit_aliases(),
            syntax: SyntaxConfig::new(),
        }
    }

    /// 預設單位別名：重力單位制的力
    pub fn default_unit_aliases() -> Vec<UnitAlias> {
        vec![
            UnitAlias::new("kgf", "(9.80665*N)"),
            UnitAlias::new("tf", "(9806.65*N)"),
            UnitAlias::new("gf", "(0.00980665*N)"),
        ]
    }

    /// 建構器模式：加入單位別名（同名別名會被取代）
    pub fn with_unit_alias(mut self, alias: &str, expansion: &str) -> Self {
        self.unit_aliases.retain(|a| a.alias != alias);
        self.unit_aliases.push(UnitAlias::new(alias, expansion));
        self
    }

    /// 建構器模式：清除所有單位別名
    pub fn without_unit_aliases(mut self) -> Self {
        self.unit_aliases.clear();
        self
    }

    /// 建構器模式：設置語法擴充資料
    pub fn with_syntax(mut self, syntax: SyntaxConfig) -> Self {
        self.syntax = syntax;
        self
    }

    /// 從 JSON 載入
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SheetError::InvalidConfig(e.to_string()))
    }
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// 迭代優化配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// 目標名稱不存在或無法擷取時的懲罰值（必須為有限值）
    pub penalty_value: f64,

    /// 停滯判定的絕對容差
    pub stagnation_tolerance: f64,

    /// 收斂趨勢觀察視窗（最近筆數）
    pub convergence_window: usize,

    /// 停滯判定視窗（最近筆數）
    pub stagnation_window: usize,

    /// 緩存與評估歷史的筆數上限；`None` 表示不限
    pub cache_capacity: Option<usize>,
}

impl OptimizerConfig {
    /// 創建預設配置
    pub fn new() -> Self {
        Self {
            penalty_value: 1e12,
            stagnation_tolerance: 1e-6,
            convergence_window: 10,
            stagnation_window: 5,
            cache_capacity: None,
        }
    }

    /// 建構器模式：設置懲罰值
    pub fn with_penalty_value(mut self, value: f64) -> Self {
        self.penalty_value = value;
        self
    }

    /// 建構器模式：設置停滯容差
    pub fn with_stagnation_tolerance(mut self, tolerance: f64) -> Self {
        self.stagnation_tolerance = tolerance;
        self
    }

    /// 建構器模式：設置觀察視窗
    pub fn with_windows(mut self, convergence_window: usize, stagnation_window: usize) -> Self {
        self.convergence_window = convergence_window;
        self.stagnation_window = stagnation_window;
        self
    }

    /// 建構器模式：設置緩存上限（超過時淘汰最早的評估）
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    /// 驗證配置
    pub fn validate(&self) -> Result<()> {
        if !self.penalty_value.is_finite() {
            return Err(SheetError::InvalidConfig(format!(
                "penalty_value 必須為有限值: {}",
                self.penalty_value
            )));
        }
        if self.convergence_window < 2 || self.stagnation_window < 2 {
            return Err(SheetError::InvalidConfig(
                "觀察視窗至少需要 2 筆".to_string(),
            ));
        }
        if self.cache_capacity == Some(0) {
            return Err(SheetError::InvalidConfig(
                "cache_capacity 至少為 1".to_string(),
            ));
        }
        Ok(())
    }

    /// 從 JSON 載入並驗證
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SheetError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::new()
    }
}
