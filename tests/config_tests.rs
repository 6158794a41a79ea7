use plicvof::{GradientScheme, PlicVofConfig};

#[test]
fn empty_document_gives_defaults() {
    let cfg: PlicVofConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(cfg, PlicVofConfig::default());
    assert_eq!(cfg.n_alpha_bounds, 3);
    assert_eq!(cfg.surf_cell_tol, 1e-8);
    assert!(!cfg.smoothed_alpha_grad);
}

#[test]
fn partial_document_overrides_named_fields() {
    let cfg: PlicVofConfig = serde_json::from_str(
        r#"{ "n_alpha_bounds": 5, "gradient": "leastSquares", "write_plic_faces": true }"#,
    )
    .unwrap();
    assert_eq!(cfg.n_alpha_bounds, 5);
    assert_eq!(cfg.gradient, GradientScheme::LeastSquares);
    assert!(cfg.write_plic_faces);
    assert_eq!(cfg.max_courant, PlicVofConfig::default().max_courant);
}

#[test]
fn config_survives_serialization() {
    let cfg = PlicVofConfig::default().with_snap_tol(1e-6).with_max_sub_cycles(8);
    let text = serde_json::to_string(&cfg).unwrap();
    let back: PlicVofConfig = serde_json::from_str(&text).unwrap();
    assert_eq!(back, cfg);
}

#[test]
fn unknown_gradient_scheme_is_rejected() {
    let res: Result<PlicVofConfig, _> = serde_json::from_str(r#"{ "gradient": "fourthOrder" }"#);
    assert!(res.is_err());
}
