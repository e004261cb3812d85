use super::*;
use tyrel_common::limits::MONITORED_SUBTYPE_THRESHOLD;

#[test]
fn test_empty_object_gives_defaults() {
    let options: ComparerOptions = serde_json::from_str("{}").expect("valid options");
    assert_eq!(options, ComparerOptions::default());
    assert!(!options.erased_types);
    assert_eq!(options.monitor_threshold, MONITORED_SUBTYPE_THRESHOLD);
}

#[test]
fn test_camel_case_keys() {
    let options: ComparerOptions =
        serde_json::from_str(r#"{ "erasedTypes": true, "monitorThreshold": 12 }"#)
            .expect("valid options");
    assert!(options.erased_types);
    assert_eq!(options.monitor_threshold, 12);

    let json = serde_json::to_string(&options).expect("serializable");
    assert!(json.contains("\"erasedTypes\":true"));
    assert!(json.contains("\"monitorThreshold\":12"));
}

#[test]
fn test_builders() {
    let options = ComparerOptions::default()
        .with_erased_types(true)
        .with_monitor_threshold(3);
    assert_eq!(
        options,
        ComparerOptions {
            erased_types: true,
            monitor_threshold: 3,
        }
    );

    let db = TypeInterner::new();
    let cmp = TypeComparer::with_options(&db, options.clone());
    assert_eq!(cmp.options(), &options);
    assert!(std::ptr::eq(cmp.interner(), &db));
}
