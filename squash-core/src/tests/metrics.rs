use super::fixtures;
use crate::error::Error;
use crate::handles;
use crate::metrics::Metric;

use serde_json::json;

#[test]
fn create_get_list() {
    let mut conn = fixtures::conn();
    let mut pa1 = fixtures::metric("PA1");
    pa1.specs = Some(json!([{"name": "design", "threshold": 5.0}]));
    let created = Metric::create(&mut conn, &[pa1.clone(), fixtures::metric("AM1")]).unwrap();
    assert_eq!(
        created,
        [handles::metric("PA1".into()), handles::metric("AM1".into())]
    );

    let info = Metric::get(&mut conn, &handles::metric("PA1".into()))
        .unwrap()
        .info();
    assert_eq!(info, pa1);

    let names = Metric::list(&mut conn)
        .unwrap()
        .into_iter()
        .map(|m| m.metric)
        .collect::<Vec<_>>();
    assert_eq!(names, ["AM1", "PA1"]);
}

#[test]
fn unknown_metric() {
    let mut conn = fixtures::conn();
    assert!(matches!(
        Metric::get(&mut conn, &handles::metric("AM1".into())),
        Err(Error::MetricNotFound(_))
    ));
}

#[test]
fn duplicates_roll_back_the_batch() {
    let mut conn = fixtures::conn();
    Metric::create(&mut conn, &[fixtures::metric("AM1")]).unwrap();

    let batch = [fixtures::metric("PA2"), fixtures::metric("AM1")];
    assert!(matches!(
        Metric::create(&mut conn, &batch),
        Err(Error::MetricAlreadyExists(handle)) if handle.name == "AM1"
    ));
    assert!(matches!(
        Metric::get(&mut conn, &handles::metric("PA2".into())),
        Err(Error::MetricNotFound(_))
    ));
    assert_eq!(Metric::list(&mut conn).unwrap().len(), 1);
}

#[test]
fn rejected_declarations() {
    let mut conn = fixtures::conn();
    assert!(matches!(
        Metric::create(&mut conn, &[fixtures::metric("A M1")]),
        Err(Error::IllegalMetricHandle(_))
    ));
    assert!(matches!(
        Metric::create(&mut conn, &[fixtures::metric("AM1_is_way_too_long")]),
        Err(Error::IllegalMetricHandle(_))
    ));

    let mut metric = fixtures::metric("AM1");
    metric.description = "  ".into();
    match Metric::create(&mut conn, &[metric]) {
        Err(Error::InvalidMetric { metric, reason }) => {
            assert_eq!(metric, "AM1");
            assert_eq!(reason, "description may not be blank");
        }
        other => panic!("expected an invalid metric, got {:?}", other),
    }

    let mut metric = fixtures::metric("AM1");
    metric.operator = "<=>".into();
    assert!(matches!(
        Metric::create(&mut conn, &[metric]),
        Err(Error::InvalidMetric { .. })
    ));
    assert!(Metric::list(&mut conn).unwrap().is_empty());
}

#[test]
fn store_errors_surface() {
    use diesel::RunQueryDsl;
    let mut conn = fixtures::conn();
    diesel::sql_query("DROP TABLE measurements")
        .execute(&mut conn)
        .unwrap();
    diesel::sql_query("DROP TABLE metrics")
        .execute(&mut conn)
        .unwrap();
    let e = Metric::create(&mut conn, &[fixtures::metric("AM1")]).unwrap_err();
    assert!(matches!(e, Error::UnexpectedDatabaseError(_)));
    assert!(e.is_internal());
}
