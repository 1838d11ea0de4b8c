use anyhow::Result;

use canopy_bundle_config::{
    built_in_rules, is_external, Error, ExternalRule, ExternalsMatcher,
};

#[test]
fn built_in_react_is_external() -> Result<()> {
    assert!(is_external("react", built_in_rules())?);
    assert!(is_external("react-dom/client", built_in_rules())?);
    assert!(is_external("single-spa", built_in_rules())?);
    Ok(())
}

#[test]
fn local_widget_is_bundled() -> Result<()> {
    assert!(!is_external("my-local-widget", built_in_rules())?);
    Ok(())
}

#[test]
fn exact_rules_match_the_full_string() -> Result<()> {
    // "react" is an exact rule, so submodules fall through to the
    // pattern rules and are bundled unless one of those matches.
    assert!(!is_external("react-calendar", built_in_rules())?);
    Ok(())
}

#[test]
fn scoped_canopytax_packages() -> Result<()> {
    assert!(is_external("@canopytax/forms", built_in_rules())?);
    assert!(!is_external("@canopytax/forms/internal", built_in_rules())?);
    Ok(())
}

#[test]
fn pattern_anchoring_is_exact() -> Result<()> {
    let rules = vec![ExternalRule::pattern(r"^@scope/[^/]+$")?];
    assert!(is_external("@scope/pkg", &rules)?);
    assert!(!is_external("@scope/pkg/sub", &rules)?);
    Ok(())
}

#[test]
fn legacy_sofe_specifiers() -> Result<()> {
    assert!(is_external("people!sofe", built_in_rules())?);
    assert!(is_external("sofe", built_in_rules())?);
    Ok(())
}

#[test]
fn override_predicate_only_adds() -> Result<()> {
    // A predicate that rejects everything cannot force a built-in
    // external back into the bundle.
    let matcher =
        ExternalsMatcher::new(built_in_rules().to_vec()).with_override(|_| Ok(false));
    assert!(matcher.is_external("react")?);

    let matcher = ExternalsMatcher::new(built_in_rules().to_vec())
        .with_override(|id| Ok(id == "host-provided-widget"));
    assert!(matcher.is_external("host-provided-widget")?);
    assert!(matcher.is_external("react")?);
    assert!(!matcher.is_external("my-local-widget")?);
    Ok(())
}

#[test]
fn failing_predicate_surfaces() {
    let rules = vec![ExternalRule::predicate(|_| {
        anyhow::bail!("lookup table unavailable")
    })];
    let err = is_external("react", &rules).unwrap_err();
    match err {
        Error::RuleEvaluation { module_id, .. } => assert_eq!(module_id, "react"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn matching_short_circuits_before_later_rules() -> Result<()> {
    let rules = vec![
        ExternalRule::exact("react"),
        ExternalRule::predicate(|_| anyhow::bail!("must not be evaluated")),
    ];
    assert!(is_external("react", &rules)?);
    Ok(())
}

#[test]
fn rules_deserialize_from_json() -> Result<()> {
    let rules: Vec<ExternalRule> =
        serde_json::from_str(r#"["react", {"pattern": "^@scope/[^/]+$"}]"#)?;
    assert!(is_external("react", &rules)?);
    assert!(is_external("@scope/pkg", &rules)?);
    assert!(!is_external("left-pad", &rules)?);
    Ok(())
}
