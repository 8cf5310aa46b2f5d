#![cfg(target_arch = "wasm32")]

use fines_engine::Society;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

#[wasm_bindgen_test]
fn construct_and_run() {
    let mut society = Society::create(
        vec![30_000.0, 60_000.0, 90_000.0],
        "flat".to_string(),
        vec![100.0],
        JsValue::NULL,
    )
    .expect("valid construction");

    let results = society.run(3);
    assert!(!results.is_null(), "successful run returns a results record");
    assert!(society.iteration_count() > 0);
}

#[wasm_bindgen_test]
fn arity_error_surfaces_at_construction() {
    let err = Society::create(
        vec![30_000.0],
        "flat".to_string(),
        vec![1.0, 2.0],
        JsValue::NULL,
    );
    assert!(err.is_err(), "flat with two parameters must be rejected");
}

#[wasm_bindgen_test]
fn set_fine_parameters_checks_arity() {
    let mut society = Society::create(
        vec![30_000.0, 60_000.0],
        "income_based".to_string(),
        vec![50.0, 0.001],
        JsValue::NULL,
    )
    .expect("valid construction");

    assert!(society.set_fine_parameters(vec![60.0, 0.002]).is_ok());
    assert!(society.set_fine_parameters(vec![60.0]).is_err());
}
