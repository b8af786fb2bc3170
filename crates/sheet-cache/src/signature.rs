//! 問題簽章與緩存鍵
//!
//! 兩者都以 JSON 序列化產生，數值一律以可還原的字串表示，模式字串
//! 去除前後空白並轉為小寫。

use serde::{Deserialize, Serialize};

/// 優化問題的形狀
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProblemSignature {
    pub design_variables: Vec<String>,
    pub objectives: Vec<String>,
    pub modes: Vec<String>,
    pub targets: Vec<f64>,
}

impl ProblemSignature {
    pub fn new<S: AsRef<str>>(
        design_variables: &[S],
        objectives: &[S],
        modes: &[S],
        targets: &[f64],
    ) -> Self {
        Self {
            design_variables: owned(design_variables),
            objectives: owned(objectives),
            modes: modes.iter().map(|m| normalize_mode(m.as_ref())).collect(),
            targets: targets.to_vec(),
        }
    }

    /// 確定性的簽章字串
    pub fn to_key(&self) -> String {
        let record = SignatureRecord {
            design_variables: &self.design_variables,
            objectives: &self.objectives,
            modes: &self.modes,
            targets: self.targets.iter().copied().map(format_round_trip).collect(),
        };
        to_json(&record)
    }
}

#[derive(Debug, Serialize)]
struct SignatureRecord<'a> {
    design_variables: &'a [String],
    objectives: &'a [String],
    modes: &'a [String],
    targets: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CacheKeyRecord<'a> {
    names: Vec<&'a str>,
    values: Vec<String>,
    objectives: Vec<&'a str>,
    modes: Vec<String>,
    targets: Vec<String>,
}

/// 可還原的數值字串（`0.1` 與 `0.1 + 1e-17` 必定不同，`-0.0` 與 `0.0` 也不同）
pub fn format_round_trip(value: f64) -> String {
    format!("{:?}", value)
}

/// 模式字串正規化
pub fn normalize_mode(mode: &str) -> String {
    mode.trim().to_lowercase()
}

/// 建立問題簽章
pub fn build_signature<S: AsRef<str>>(
    design_variables: &[S],
    objectives: &[S],
    modes: &[S],
    targets: &[f64],
) -> String {
    ProblemSignature::new(design_variables, objectives, modes, targets).to_key()
}

/// 建立緩存鍵：每個設計變數的名稱與數值，加上目標函數配置
///
/// 名稱與數值各自完整列入，數量不一致時多出的部分也會影響鍵值。
pub fn create_cache_key<S: AsRef<str>>(
    names: &[S],
    values: &[f64],
    objectives: &[S],
    modes: &[S],
    targets: &[f64],
) -> String {
    let record = CacheKeyRecord {
        names: names.iter().map(AsRef::as_ref).collect(),
        values: values.iter().copied().map(format_round_trip).collect(),
        objectives: objectives.iter().map(AsRef::as_ref).collect(),
        modes: modes.iter().map(|m| normalize_mode(m.as_ref())).collect(),
        targets: targets.iter().copied().map(format_round_trip).collect(),
    };
    to_json(&record)
}

fn owned<S: AsRef<str>>(items: &[S]) -> Vec<String> {
    items.iter().map(|s| s.as_ref().to_string()).collect()
}

fn to_json<T: Serialize + std::fmt::Debug>(record: &T) -> String {
    serde_json::to_string(record).unwrap_or_else(|_| format!("{:?}", record))
}
