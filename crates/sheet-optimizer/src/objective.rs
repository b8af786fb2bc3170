//! 目標函數模式與適應值組合

use std::fmt;

use serde::{Deserialize, Serialize};

/// 目標函數模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectiveMode {
    /// 原值
    #[default]
    Minimize,
    /// 取負值
    Maximize,
    /// 與目標值的絕對距離
    Target,
}

impl ObjectiveMode {
    /// 解析模式字串（不分大小寫）；無法辨識時視為 minimize
    pub fn parse(mode: &str) -> Self {
        match mode.trim().to_lowercase().as_str() {
            "maximize" | "max" => ObjectiveMode::Maximize,
            "target" => ObjectiveMode::Target,
            _ => ObjectiveMode::Minimize,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectiveMode::Minimize => "minimize",
            ObjectiveMode::Maximize => "maximize",
            ObjectiveMode::Target => "target",
        }
    }

    /// 單一目標函數對總適應值的貢獻
    pub fn contribution(&self, value: f64, target: f64) -> f64 {
        match self {
            ObjectiveMode::Minimize => value,
            ObjectiveMode::Maximize => -value,
            ObjectiveMode::Target => (value - target).abs(),
        }
    }
}

impl fmt::Display for ObjectiveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 組合總適應值
///
/// 模式或目標值索引不足時，分別以 minimize 與 0 補上。
pub fn compose_fitness<S: AsRef<str>>(values: &[f64], modes: &[S], targets: &[f64]) -> f64 {
    values
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            let mode = modes
                .get(index)
                .map(|m| ObjectiveMode::parse(m.as_ref()))
                .unwrap_or_default();
            let target = targets.get(index).copied().unwrap_or(0.0);
            mode.contribution(value, target)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("minimize", ObjectiveMode::Minimize)]
    #[case("Maximize", ObjectiveMode::Maximize)]
    #[case("  TARGET ", ObjectiveMode::Target)]
    #[case("max", ObjectiveMode::Maximize)]
    #[case("", ObjectiveMode::Minimize)]
    #[case("fastest", ObjectiveMode::Minimize)]
    fn test_parse_mode(#[case] input: &str, #[case] expected: ObjectiveMode) {
        assert_eq!(ObjectiveMode::parse(input), expected);
    }

    #[test]
    fn test_maximize_contributes_negation() {
        assert_eq!(compose_fitness(&[10.0], &["maximize"], &[]), -10.0);
    }

    #[test]
    fn test_target_contributes_distance() {
        assert_eq!(compose_fitness(&[10.0], &["target"], &[7.0]), 3.0);
        assert_eq!(compose_fitness(&[4.0], &["target"], &[7.0]), 3.0);
    }

    #[test]
    fn test_missing_modes_and_targets_default() {
        // 第二個目標函數沒有模式（minimize），第一個 target 沒有目標值（0）
        let fitness = compose_fitness(&[-2.0, 5.0], &["target"], &[]);
        assert_eq!(fitness, 7.0);
    }

    #[test]
    fn test_sum_of_modes() {
        let modes = ["minimize", "maximize", "target"];
        let fitness = compose_fitness(&[3.0, 10.0, 10.0], &modes, &[0.0, 0.0, 7.0]);
        assert_eq!(fitness, 3.0 - 10.0 + 3.0);
    }

    #[test]
    fn test_mode_serde() {
        assert_eq!(serde_json::to_string(&ObjectiveMode::Target).unwrap(), "\"target\"");
        assert_eq!(ObjectiveMode::Maximize.to_string(), "maximize");
    }
}
