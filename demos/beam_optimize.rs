//! 梁斷面優化示例
//!
//! 以假計算引擎渲染簡支梁計算書，掃描梁深使彎曲應力接近容許值。

use anyhow::Context;
use calcsheet::calc::RenderError;
use calcsheet::{parse_variables, OptimizerConfig, Problem, Sheet, SheetEvaluator};
use tracing_subscriber::EnvFilter;

const BEAM: &str = "\
'Simply supported beam
L = ?{6}m
q = ?{12}kN/m
b = ?{200}mm';'h = ?{300}mm
M = q*L^2/8
W = b*h^2/6
σ = M/W";

/// 示例用的計算引擎：只認得這份計算書的三條方程式
fn render(source: &str) -> Result<String, RenderError> {
    let vars = parse_variables(source, false);
    let get = |name: &str| vars.value_of(name).ok_or(format!("missing {}", name));
    let (l, q, b, h) = (get("L")?, get("q")?, get("b")?, get("h")?);

    let m = q * l * l / 8.0;
    let w = b * h * h / 6.0;
    Ok(format!(
        "M = q·L^2/8 = {} kN·m\nW = b·h^2/6 = {} mm^3\nσ = M/W = {} N/mm^2",
        m,
        w,
        m * 1e6 / w
    ))
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("=== 梁斷面優化示例 ===\n");

    let mut sheet = Sheet::new().with_renderer(render);
    sheet.load(BEAM);

    let config = OptimizerConfig::new().with_stagnation_tolerance(1e-3);
    let mut evaluator = SheetEvaluator::new(sheet, config).context("建立評估器失敗")?;

    // 目標：彎曲應力 12 N/mm²
    let problem = Problem::new(&["h"], &["σ"])
        .with_modes(&["target"])
        .with_targets(&[12.0]);

    for step in 0..=12 {
        let h = 250.0 + 25.0 * step as f64;
        let result = evaluator
            .evaluate(&problem, &[h])
            .with_context(|| format!("h = {} mm 評估失敗", h))?;
        println!(
            "  h = {:>5} mm -> σ = {:>8.3} N/mm², 適應值 {:.4}",
            h, result.objectives[0], result.fitness
        );
    }

    // 重複評估取自緩存
    evaluator.evaluate(&problem, &[300.0])?;

    if let Some(best) = evaluator.best() {
        println!("\n最佳梁深: {} mm（適應值 {:.4}）", best.input_vector[0], best.fitness);
    }
    println!("計算引擎呼叫次數: {}", evaluator.render_count());
    println!("收斂診斷: {}", evaluator.analyze_convergence());

    Ok(())
}
