//! 集成測試

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use calcsheet::calc::RenderError;
use calcsheet::optimizer::compose_fitness;
use calcsheet::*;
use rstest::rstest;

const BEAM: &str = "\
'Simply supported beam
L = ?{6}m ' span
q = ?{12}kN/m
b = ?{200}mm';'h = ?{300}mm
M = q*L^2/8
W = b*h^2/6
σ = M/W";

/// 假計算引擎：依原始碼中的宣告計算彎矩、斷面模數與應力，輸出類 HTML 標記
fn beam_markup(source: &str) -> Result<String, RenderError> {
    let vars = parse_variables(source, false);
    let get = |name: &str| vars.value_of(name).ok_or(format!("missing {}", name));
    let (l, q, b, h) = (get("L")?, get("q")?, get("b")?, get("h")?);

    let m = q * l * l / 8.0;
    let w = b * h * h / 6.0;
    let sigma = m * 1e6 / w;

    Ok(format!(
        concat!(
            "<h3>Simply supported beam</h3>",
            r#"<p><span class="eq"><var>L</var> = {l} <i>m</i></span></p>"#,
            r#"<p><span class="eq"><var>M</var> = <var>q</var>·<var>L</var><sup>2</sup>/8"#,
            r#" = {m} <i>kN·m</i></span></p>"#,
            r#"<p><span class="eq"><var>W</var> = <var>b</var>·<var>h</var><sup>2</sup>/6"#,
            r#" = {w} &times; 10<sup>6</sup> <i>mm</i><sup>3</sup></span></p>"#,
            r#"<p><span class="eq"><var>σ</var> = <var>M</var>/<var>W</var> = {sigma} "#,
            r#"<span class="dvc"><i>N</i><span class="dvl"></span><i>mm</i><sup>2</sup></span></span></p>"#,
        ),
        l = l,
        m = m,
        w = w / 1e6,
        sigma = sigma,
    ))
}

fn counting_sheet(calls: &Arc<AtomicUsize>) -> Sheet {
    let counter = Arc::clone(calls);
    let mut sheet = Sheet::new().with_renderer(move |source: &str| {
        counter.fetch_add(1, Ordering::SeqCst);
        beam_markup(source)
    });
    sheet.load(BEAM);
    sheet
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() <= 1e-9 * expected.abs().max(1.0),
        "expected {}, got {}",
        expected,
        actual
    );
}

#[test]
fn test_beam_sheet_end_to_end() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut sheet = counting_sheet(&calls);

    // 1. 宣告
    let parsed = sheet.parse_variables(true);
    assert_eq!(parsed.names, vec!["L", "q", "b", "h"]);
    assert_eq!(parsed.values, vec![6.0, 12.0, 200.0, 300.0]);
    assert_eq!(parsed.units, vec!["m", "kN/m", "mm", "mm"]);

    // 2. 方程式
    let equations = sheet.result_equations();
    let lhs: Vec<&str> = equations.iter().map(|e| e.lhs.as_str()).collect();
    assert_eq!(lhs, vec!["M", "W", "σ"]);
    assert_eq!(equations[0].rhs, "q*L^2/8");

    // 3. 渲染與擷取
    sheet.calculate().unwrap();
    assert_eq!(sheet.state(), SheetState::Rendered);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert_eq!(sheet.result_values(), vec![54.0, 3e6, 18.0]);
    assert_eq!(sheet.result_units(), vec!["kN·m", "mm^3", "N/mm^2"]);
}

#[test]
fn test_substitute_and_recalculate() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut sheet = counting_sheet(&calls);

    let report = sheet.set_variables(&[("L", 4.0), ("t_f", 12.0)]).unwrap();
    assert_eq!(report.missing_names(), vec!["t_f"]);
    assert!(sheet.source_text().contains("L = ?{4}m ' span"));
    assert!(sheet.source_text().contains("b = ?{200}mm';'h = ?{300}mm"));

    sheet.calculate().unwrap();
    let results = sheet.results();
    assert_eq!(results[0].name, "M");
    assert_eq!(results[0].value, 24.0);
    assert_eq!(results[2].value, 8.0);
    assert_eq!(results[2].unit, "N/mm^2");
}

#[test]
fn test_optimizer_loop_with_cache() {
    let calls = Arc::new(AtomicUsize::new(0));
    let sheet = counting_sheet(&calls);
    let mut evaluator = SheetEvaluator::new(sheet, OptimizerConfig::default()).unwrap();

    // 找出使應力最接近 12 N/mm² 的梁深
    let problem = Problem::new(&["h"], &["σ"])
        .with_modes(&["target"])
        .with_targets(&[12.0]);

    let first = evaluator.evaluate(&problem, &[300.0]).unwrap();
    assert_close(first.fitness, 6.0);

    evaluator.evaluate(&problem, &[400.0]).unwrap();
    let repeated = evaluator.evaluate(&problem, &[300.0]).unwrap();
    evaluator.evaluate(&problem, &[350.0]).unwrap();

    assert!(repeated.cached);
    assert_eq!(repeated.fitness, first.fitness);
    assert_eq!(repeated.objectives, first.objectives);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(evaluator.render_count(), 3);
    assert_eq!(evaluator.history().len(), 3);
    assert_eq!(evaluator.cache_len(), 3);

    let best = evaluator.best().unwrap();
    assert_eq!(best.input_vector, vec![350.0]);
    assert!(evaluator.analyze_convergence().starts_with("improving"));
}

#[test]
fn test_problem_change_resets_history() {
    let calls = Arc::new(AtomicUsize::new(0));
    let sheet = counting_sheet(&calls);
    let mut evaluator = SheetEvaluator::new(sheet, OptimizerConfig::default()).unwrap();

    let problem = Problem::new(&["h"], &["σ"]).with_modes(&["target"]).with_targets(&[12.0]);
    evaluator.evaluate(&problem, &[300.0]).unwrap();
    evaluator.evaluate(&problem, &[400.0]).unwrap();
    assert_eq!(evaluator.history().len(), 2);

    let retargeted = problem.clone().with_targets(&[10.0]);
    assert!(evaluator.sync_signature(&retargeted));
    assert_eq!(evaluator.history().len(), 0);

    let result = evaluator.evaluate(&retargeted, &[300.0]).unwrap();
    assert!(!result.cached);
    assert_close(result.fitness, 8.0);
    assert_eq!(evaluator.history().len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_missing_objective_keeps_loop_running() {
    let calls = Arc::new(AtomicUsize::new(0));
    let sheet = counting_sheet(&calls);
    let config = OptimizerConfig::new().with_penalty_value(1e9);
    let mut evaluator = SheetEvaluator::new(sheet, config).unwrap();

    let problem = Problem::new(&["h"], &["M", "deflection"]);
    let result = evaluator.evaluate(&problem, &[300.0]).unwrap();

    assert_eq!(result.objectives, vec![54.0, 1e9]);
    assert_eq!(result.fitness, 54.0 + 1e9);
}

#[test]
fn test_explicit_declaration_scenario() {
    let parsed = parse_variables("L = ?{5}m", true);

    assert_eq!(parsed.names, vec!["L"]);
    assert_eq!(parsed.values, vec![5.0]);
    assert_eq!(parsed.units, vec!["m"]);
}

#[test]
fn test_equation_exclusion_scenario() {
    let mut sheet = Sheet::new();
    sheet.load("L = ?{5}m\nA = L*L");

    let equations = sheet.result_equations();
    assert_eq!(equations.len(), 1);
    assert_eq!(equations[0].lhs, "A");
    assert_eq!(equations[0].rhs, "L*L");
    assert!(sheet.parse_variables(false).value_of("A").is_none());
}

#[test]
fn test_scientific_result_scenario() {
    let mut sheet = Sheet::new().with_renderer(|_: &str| -> Result<String, RenderError> {
        Ok("L = 0.10770329614269007 m\nA = L·L = 1.16×10^-2 m^2".to_string())
    });
    sheet.load("L = ?{0.10770329614269007}m\nA = L*L");
    sheet.calculate().unwrap();

    assert_eq!(sheet.result_values(), vec![0.0116]);
    assert_eq!(sheet.result_units(), vec!["m^2"]);
}

#[rstest]
#[case("maximize", 0.0, -10.0)]
#[case("target", 7.0, 3.0)]
#[case("minimize", 0.0, 10.0)]
fn test_fitness_composition_scenario(
    #[case] mode: &str,
    #[case] target: f64,
    #[case] expected: f64,
) {
    assert_eq!(compose_fitness(&[10.0], &[mode], &[target]), expected);
}

#[test]
fn test_unit_alias_config_from_json() {
    let config = SheetConfig::from_json(
        r#"{"unit_aliases": [{"alias": "kip", "expansion": "(4448.2216*N)"}]}"#,
    )
    .unwrap();
    let mut sheet = Sheet::with_config(config);
    sheet.load("P = ?{3}kip\nQ = ?{2}kgf");

    // JSON 只列出 kip，預設別名不再套用
    assert_eq!(sheet.preprocessed_source(), "P = ?{3}(4448.2216*N)\nQ = ?{2}kgf");
    assert!(matches!(sheet.calculate(), Err(SheetError::RenderUnavailable)));
}
