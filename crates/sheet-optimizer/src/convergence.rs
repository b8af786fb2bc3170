//! 收斂診斷
//!
//! 僅供觀察優化進度，不影響適應值計算。

use std::fmt;

use serde::{Deserialize, Serialize};
use sheet_core::OptimizerConfig;

/// 收斂狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvergenceStatus {
    /// 評估不到兩筆
    Starting,
    /// 近期適應值下降
    Improving,
    /// 近期適應值上升
    Worsening,
    /// 近期適應值皆在容差內
    Stagnant,
    /// 首尾相同但中間有變動
    Fluctuating,
}

impl ConvergenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConvergenceStatus::Starting => "starting",
            ConvergenceStatus::Improving => "improving",
            ConvergenceStatus::Worsening => "worsening",
            ConvergenceStatus::Stagnant => "stagnant",
            ConvergenceStatus::Fluctuating => "fluctuating",
        }
    }
}

impl fmt::Display for ConvergenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 收斂報告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceReport {
    pub status: ConvergenceStatus,

    /// 歷史評估筆數
    pub evaluations: usize,

    /// 近期視窗內首筆減末筆的適應值（正值代表改善）
    pub improvement: f64,

    /// 改善幅度（相對首筆的百分比；首筆為 0 時為 0）
    pub improvement_rate: f64,

    /// 近期停滯
    pub stagnant: bool,

    /// 全部歷史中的最佳（最小）適應值
    pub best_fitness: Option<f64>,
}

/// 分析適應值歷史
pub fn analyze_convergence(fitness: &[f64], config: &OptimizerConfig) -> ConvergenceReport {
    let best_fitness = fitness.iter().copied().reduce(f64::min);

    if fitness.len() < 2 {
        return ConvergenceReport {
            status: ConvergenceStatus::Starting,
            evaluations: fitness.len(),
            improvement: 0.0,
            improvement_rate: 0.0,
            stagnant: false,
            best_fitness,
        };
    }

    let recent = tail(fitness, config.convergence_window);
    let first = recent[0];
    let last = recent[recent.len() - 1];
    let improvement = first - last;
    let improvement_rate = if first != 0.0 {
        improvement / first.abs() * 100.0
    } else {
        0.0
    };

    let stagnant = tail(fitness, config.stagnation_window)
        .iter()
        .all(|f| (f - last).abs() <= config.stagnation_tolerance);

    let status = if stagnant {
        ConvergenceStatus::Stagnant
    } else if improvement > 0.0 {
        ConvergenceStatus::Improving
    } else if improvement < 0.0 {
        ConvergenceStatus::Worsening
    } else {
        ConvergenceStatus::Fluctuating
    };

    ConvergenceReport {
        status,
        evaluations: fitness.len(),
        improvement,
        improvement_rate,
        stagnant,
        best_fitness,
    }
}

fn tail(values: &[f64], window: usize) -> &[f64] {
    &values[values.len().saturating_sub(window)..]
}

impl fmt::Display for ConvergenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.status == ConvergenceStatus::Starting {
            return write!(f, "starting（已評估 {} 筆）", self.evaluations);
        }

        write!(
            f,
            "{}（已評估 {} 筆）：近期改善 {:.6e}（{:.2}%）",
            self.status, self.evaluations, self.improvement, self.improvement_rate
        )?;
        if self.stagnant {
            write!(f, "，已停滯")?;
        }
        if let Some(best) = self.best_fitness {
            write!(f, "，最佳適應值 {}", best)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OptimizerConfig {
        OptimizerConfig::default()
    }

    #[test]
    fn test_starting() {
        let report = analyze_convergence(&[], &config());
        assert_eq!(report.status, ConvergenceStatus::Starting);
        assert!(report.best_fitness.is_none());

        let report = analyze_convergence(&[4.0], &config());
        assert_eq!(report.status, ConvergenceStatus::Starting);
        assert_eq!(report.best_fitness, Some(4.0));
        assert!(report.to_string().starts_with("starting"));
    }

    #[test]
    fn test_improving() {
        let report = analyze_convergence(&[10.0, 8.0, 5.0], &config());

        assert_eq!(report.status, ConvergenceStatus::Improving);
        assert_eq!(report.improvement, 5.0);
        assert_eq!(report.improvement_rate, 50.0);
        assert!(!report.stagnant);
        assert_eq!(report.best_fitness, Some(5.0));
        assert!(report.to_string().starts_with("improving"));
    }

    #[test]
    fn test_window_limits_improvement() {
        // 只比較最近 10 筆：首筆 100 不在視窗內
        let mut history = vec![100.0];
        history.extend((0..10).map(|i| 20.0 - i as f64));
        let report = analyze_convergence(&history, &config());

        assert_eq!(report.improvement, 9.0);
        assert_eq!(report.best_fitness, Some(11.0));
    }

    #[test]
    fn test_stagnation() {
        let history = [9.0, 3.0, 2.0, 2.0, 2.0 + 1e-9, 2.0, 2.0];
        let report = analyze_convergence(&history, &config());

        assert!(report.stagnant);
        assert_eq!(report.status, ConvergenceStatus::Stagnant);
        assert!(report.to_string().contains("已停滯"));
    }

    #[test]
    fn test_not_stagnant_with_small_window_change() {
        let history = [2.0, 2.0, 2.0, 2.0, 1.0];
        let report = analyze_convergence(&history, &config());

        assert!(!report.stagnant);
        assert_eq!(report.status, ConvergenceStatus::Improving);
    }

    #[test]
    fn test_worsening_and_fluctuating() {
        assert_eq!(
            analyze_convergence(&[1.0, 3.0], &config()).status,
            ConvergenceStatus::Worsening
        );
        assert_eq!(
            analyze_convergence(&[1.0, 3.0, 1.0], &config()).status,
            ConvergenceStatus::Fluctuating
        );
    }

    #[test]
    fn test_zero_first_fitness_rate() {
        let report = analyze_convergence(&[0.0, -2.0], &config());
        assert_eq!(report.improvement, 2.0);
        assert_eq!(report.improvement_rate, 0.0);
    }

    #[test]
    fn test_custom_windows() {
        let config = OptimizerConfig::new().with_windows(3, 2);
        let report = analyze_convergence(&[50.0, 10.0, 4.0, 4.0], &config);

        assert_eq!(report.improvement, 6.0);
        assert!(report.stagnant);
    }
}
