use std::path::Path;

use super::*;

fn loaded_session() -> ScriptedSession {
    let factory = ScriptedFactory::new(&[("bond", 2.0), ("tech", 4.0)], 1.0);
    let mut session = factory.spawn_session().unwrap();
    session.configure(&SessionOptions::default()).unwrap();
    session.read_model(Path::new("models/qpmv/qpmv.mod")).unwrap();
    session
        .read_script(Path::new("models/qpmv/qpmvbit.run"))
        .unwrap();
    session.set_string_parameter("data_dir", "models/qpmv").unwrap();
    session.read_table("assetstable").unwrap();
    session.read_table("astrets").unwrap();
    session
}

#[test]
fn test_model_must_be_read_before_use() {
    let factory = ScriptedFactory::new(&[("bond", 2.0)], 1.0);
    let mut session = factory.spawn_session().unwrap();
    assert!(matches!(
        session.read_model(Path::new("qpmv.mod")),
        Err(SessionError::Backend(_))
    ));
    session.configure(&SessionOptions::default()).unwrap();
    assert!(session.solve().is_err());
}

#[test]
fn test_unknown_entities_are_rejected() {
    let mut session = loaded_session();
    assert!(matches!(
        session.read_table("bondstable"),
        Err(SessionError::UnknownEntity(_))
    ));
    assert!(matches!(
        session.set_parameter("riskfree", 0.02),
        Err(SessionError::UnknownEntity(_))
    ));
    assert!(matches!(
        session.variable_value("weights"),
        Err(SessionError::UnknownEntity(_))
    ));
}

#[test]
fn test_queries_require_a_solution() {
    let mut session = loaded_session();
    assert!(session.variable_value("portret").is_err());
    session.set_relaxation(true).unwrap();
    session.solve().unwrap();
    assert_eq!(session.variable_value("portret").unwrap(), 1.0);
    // Binding a new target invalidates the previous solution.
    session.set_parameter("targetret", 3.0).unwrap();
    assert!(session.objective_value("cst").is_err());
}

#[test]
fn test_average_return_table() {
    let mut session = loaded_session();
    session.set_relaxation(true).unwrap();
    session.solve().unwrap();
    let values = session.parameter_values("averret").unwrap();
    let max = values.column("averret").unwrap().f64().unwrap().max();
    assert_eq!(max, Some(4.0));
}

#[test]
fn test_relaxed_variance_is_below_integral() {
    let mut session = loaded_session();
    session.set_parameter("targetret", 3.0).unwrap();
    session.set_relaxation(true).unwrap();
    session.solve().unwrap();
    let qp = session.objective_value("cst").unwrap();
    session.set_relaxation(false).unwrap();
    session.solve().unwrap();
    let qmip = session.objective_value("cst").unwrap();
    assert!(qp < qmip);
}

#[test]
fn test_failure_injection_is_target_specific() {
    let factory =
        ScriptedFactory::new(&[("bond", 2.0), ("tech", 4.0)], 1.0).fail_for_target(2.0);
    let mut session = factory.spawn_session().unwrap();
    session.configure(&SessionOptions::default()).unwrap();
    session.read_model(Path::new("qpmv.mod")).unwrap();
    session.read_script(Path::new("qpmvbit.run")).unwrap();
    session.set_string_parameter("data_dir", "X").unwrap();
    session.read_table("assetstable").unwrap();
    session.read_table("astrets").unwrap();
    session.set_parameter("targetret", 3.0).unwrap();
    assert!(session.solve().is_ok());
    session.set_parameter("targetret", 2.0).unwrap();
    assert!(matches!(
        session.solve(),
        Err(SessionError::Infeasible { target }) if target == 2.0
    ));
}
