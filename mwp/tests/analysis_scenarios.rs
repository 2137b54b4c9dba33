// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell

//! End-to-end scenarios: literal source programs through the parser
//! and the analyzer, asserting verdicts, bounds and choice vectors.

use mwp_analysis::{analyze_program, AnalysisConfig, FuncStatus, Report};

fn analyze(source: &str, config: AnalysisConfig) -> Report {
    let (program, errors) = mwp_parser::parse(source);
    assert!(errors.is_empty(), "parse errors: {errors:?}");
    analyze_program(&program, config)
}

fn analyze_default(source: &str) -> Report {
    analyze(source, AnalysisConfig::default())
}

#[test]
fn test_double_addition_is_bounded() {
    let report = analyze_default("void foo(int y1, int y2){ y2 = y1 + y1; }");
    let func = report.get("foo").unwrap();

    assert_eq!(func.status, FuncStatus::Bounded);
    assert!(!func.infinite);
    assert_eq!(func.index, 1);
    assert_eq!(func.bound_fmt.as_deref(), Some("y1′ ≤ y1 ∧ y2′ ≤ y1"));
    let choices = func.choices.as_ref().unwrap();
    assert!(choices.n_bounds() >= 1);
}

#[test]
fn test_exponentiation_is_infinite() {
    let source = "void main(int x, int n, int p, int r){
        p = x;
        while(n > 0){
            if(n % 2 == 1){ r = p * r; }
            p = p * p;
            n = n / 2;
        }
    }";
    let report = analyze_default(source);
    let func = report.get("main").unwrap();
    assert_eq!(func.status, FuncStatus::Infinite);
    assert!(func.infinite);
}

#[test]
fn test_exponentiation_problematic_flows() {
    let source = "void main(int x, int n, int p, int r){
        p = x;
        while(n > 0){
            if(n % 2 == 1){ r = p * r; }
            p = p * p;
            n = n / 2;
        }
    }";
    // completion mode keeps the matrix and names the failing flows
    let report = analyze(
        source,
        AnalysisConfig {
            fin: true,
            ..Default::default()
        },
    );
    let func = report.get("main").unwrap();
    assert!(func.infinite);
    assert!(func.relation.is_some());

    let flows_from_x = func
        .problematic_flows
        .iter()
        .find(|(source, _)| source == "x")
        .map(|(_, targets)| targets.clone())
        .unwrap();
    assert!(flows_from_x.iter().any(|t| t == "p"));
    assert!(flows_from_x.iter().any(|t| t == "r"));
}

#[test]
fn test_sequential_additions_are_bounded() {
    let report =
        analyze_default("int foo(int X1, int X2, int X3){ X1 = X2 + X3; X1 = X1 + X1; }");
    let func = report.get("foo").unwrap();

    assert_eq!(func.status, FuncStatus::Bounded);
    assert_eq!(func.index, 2);
    assert_eq!(
        func.bound_fmt.as_deref(),
        Some("X1′ ≤ X2*X3 ∧ X2′ ≤ X2 ∧ X3′ ≤ X3")
    );
}

#[test]
fn test_branch_then_loop_is_bounded() {
    let source = "int foo(int X0, int X1, int X2, int X3){
        if(X1 == 1){
            X1 = X2 + X1;
            X2 = X3 + X2;
        }
        while(X0 < 10){
            X0 = X1 + X2;
        }
    }";
    let report = analyze_default(source);
    let func = report.get("foo").unwrap();

    assert_eq!(func.status, FuncStatus::Bounded);
    assert_eq!(func.index, 3);
    assert_eq!(
        func.bound_fmt.as_deref(),
        Some("X0′ ≤ max(X0,X1)+X2*X3 ∧ X1′ ≤ X1+X2 ∧ X2′ ≤ X2+X3 ∧ X3′ ≤ X3")
    );

    // inside the loop only derivation choice 2 survives
    let choices = func.choices.as_ref().unwrap();
    assert_eq!(
        choices.valid,
        vec![vec![vec![0, 1, 2], vec![0, 1, 2], vec![2]]]
    );
}

#[test]
fn test_self_feeding_loop_is_infinite() {
    let source = "int foo(int X1, int X2, int X3){
        if(X1 == 1){
            X1 = X2 + X1;
            X2 = X3 + X2;
        }
        while(X1 < 10){
            X1 = X2 + X1;
        }
    }";
    let report = analyze_default(source);
    let func = report.get("foo").unwrap();

    assert_eq!(func.status, FuncStatus::Infinite);
    // early exit: the matrix is not retained
    assert!(func.relation.is_none());
}

#[test]
fn test_self_feeding_loop_flows_target_x1() {
    let source = "int foo(int X1, int X2, int X3){
        if(X1 == 1){
            X1 = X2 + X1;
            X2 = X3 + X2;
        }
        while(X1 < 10){
            X1 = X2 + X1;
        }
    }";
    let report = analyze(
        source,
        AnalysisConfig {
            fin: true,
            ..Default::default()
        },
    );
    let func = report.get("foo").unwrap();
    assert!(func.infinite);
    assert!(func
        .problematic_flows
        .iter()
        .all(|(_, targets)| targets.iter().any(|t| t == "X1")));
    assert!(!func.problematic_flows.is_empty());
}

#[test]
fn test_independent_assignments_have_full_choice_space() {
    let source = "int spread(int y1, int z1, int y2, int z2, int y3, int z3,
                             int y4, int z4, int y5, int z5, int y6, int z6){
        int x1 = y1 + z1;
        int x2 = y2 + z2;
        int x3 = y3 + z3;
        int x4 = y4 + z4;
        int x5 = y5 + z5;
        int x6 = y6 + z6;
    }";
    let report = analyze_default(source);
    let func = report.get("spread").unwrap();

    assert_eq!(func.status, FuncStatus::Bounded);
    assert_eq!(func.index, 6);
    let choices = func.choices.as_ref().unwrap();
    assert_eq!(choices.valid, vec![vec![vec![0, 1, 2]; 6]]);
    assert_eq!(choices.n_bounds(), 729);
    // every output stays polynomial in the inputs
    assert!(func.bound_fmt.is_some());
}

#[test]
fn test_bounded_for_loop_records_counter_dependency() {
    let source = "int accumulate(int n, int r){
        int s = 0;
        for(int i = 0; i < n; i++){
            s = s + r;
        }
    }";
    let report = analyze_default(source);
    let func = report.get("accumulate").unwrap();

    assert_eq!(func.status, FuncStatus::Bounded);
    let bound = func.bound.as_ref().unwrap();
    // s accumulates r once per iteration: bounded by n*r
    assert_eq!(bound.get("s").unwrap().to_string(), "n*r");
    assert_eq!(bound.get("n").unwrap().to_string(), "n");
    assert_eq!(bound.get("r").unwrap().to_string(), "r");
}

#[test]
fn test_empty_body_is_identity() {
    let report = analyze_default("void noop(int x){ }");
    let func = report.get("noop").unwrap();

    assert_eq!(func.status, FuncStatus::Bounded);
    assert_eq!(func.index, 0);
    assert_eq!(func.bound_fmt.as_deref(), Some("x′ ≤ x"));
}

#[test]
fn test_strict_mode_rejects_unsupported() {
    let source = "int f(int n){ n = n / 2; }";
    let report = analyze(
        source,
        AnalysisConfig {
            strict: true,
            ..Default::default()
        },
    );
    let func = report.get("f").unwrap();
    assert_eq!(func.status, FuncStatus::Unsupported);
    assert!(func.bound.is_none());
    assert_eq!(func.warnings, vec!["operator /"]);
}

#[test]
fn test_skip_mode_warns_and_continues() {
    let source = "int f(int x, int y){ x = y / 2; y = y + 1; }";
    let report = analyze_default(source);
    let func = report.get("f").unwrap();

    assert_eq!(func.status, FuncStatus::Bounded);
    assert_eq!(func.warnings, vec!["operator /"]);
    // the skipped statement leaves x untouched
    assert_eq!(func.bound.as_ref().unwrap().get("x").unwrap().to_string(), "x");
}

#[test]
fn test_sibling_functions_are_independent() {
    let source = "void ok(int a, int b){ a = b + b; }
        void bad(int p){ while(p > 0){ p = p * p; } }";
    let report = analyze_default(source);

    assert_eq!(report.get("ok").unwrap().status, FuncStatus::Bounded);
    assert_eq!(report.get("bad").unwrap().status, FuncStatus::Infinite);
    assert_eq!(report.program.n_functions, 2);
    assert_eq!(report.program.n_loops, 1);
}

#[test]
fn test_return_variable_is_recorded() {
    let report = analyze_default("int f(int x, int y){ x = y + 1; return x; }");
    let func = report.get("f").unwrap();
    assert_eq!(func.returns.as_deref(), Some("x"));
}

#[test]
fn test_report_serializes_matrix() {
    let report = analyze_default("void foo(int y1, int y2){ y2 = y1 + y1; }");
    let json = serde_json::to_value(&report).unwrap();

    let func = &json["functions"][0];
    assert_eq!(func["name"], "foo");
    assert_eq!(func["status"], "bounded");
    // matrix cells are lists of {scalar, deltas} monomials
    let cell = &func["relation"]["matrix"][0][1];
    assert_eq!(cell[0]["scalar"], "p");
    assert_eq!(cell[0]["deltas"][0][0], 0);
    assert_eq!(cell[0]["deltas"][0][1], 0);
}
