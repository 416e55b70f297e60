use super::*;

fn parse(text: &str) -> toml::Value {
    toml::from_str(text).unwrap()
}

#[test]
fn test_apply_layer_overrides_only_present_keys() {
    let mut base = parse(
        r#"
        [dispatch]
        topic = "events"
        throttle_percent = 100
    "#,
    );
    let mut sources = FieldSources::new();
    record_leaves(&base, ConfigLayer::Defaults, &mut sources);

    apply_layer(
        &mut base,
        &parse("[dispatch]\nthrottle_percent = 25\n"),
        ConfigLayer::File,
        &mut sources,
    );

    assert_eq!(base["dispatch"]["topic"].as_str(), Some("events"));
    assert_eq!(base["dispatch"]["throttle_percent"].as_integer(), Some(25));
    assert_eq!(sources.get("dispatch.topic"), Some(&ConfigLayer::Defaults));
    assert_eq!(sources.get("dispatch.throttle_percent"), Some(&ConfigLayer::File));
}

#[test]
fn test_apply_layer_records_new_subtrees() {
    let mut base = parse("[dispatch]\n");
    let mut sources = FieldSources::new();

    apply_layer(
        &mut base,
        &parse("[partitioning.keys]\nprofile_updated = [\"account_id\"]\n"),
        ConfigLayer::File,
        &mut sources,
    );

    assert!(base.as_table().unwrap().contains_key("partitioning"));
    assert_eq!(
        sources.get("partitioning.keys.profile_updated"),
        Some(&ConfigLayer::File)
    );
    assert_eq!(sources.len(), 1);
}

#[test]
fn test_arrays_are_replaced_not_appended() {
    let mut base = parse("[logging]\ndirectives = [\"a=debug\", \"b=info\"]\n");
    let mut sources = FieldSources::new();

    apply_layer(
        &mut base,
        &parse("[logging]\ndirectives = [\"c=trace\"]\n"),
        ConfigLayer::File,
        &mut sources,
    );

    let directives = base["logging"]["directives"].as_array().unwrap();
    assert_eq!(directives.len(), 1);
    assert_eq!(directives[0].as_str(), Some("c=trace"));
}

#[test]
fn test_set_nested_creates_tables() {
    let mut val = toml::Value::Table(toml::map::Map::new());
    set_nested(&mut val, &["cutover", "consume_enabled"], toml::Value::Boolean(true));
    assert_eq!(
        get_nested(&val, &["cutover", "consume_enabled"]),
        Some(&toml::Value::Boolean(true))
    );
}

#[test]
fn test_get_nested_missing() {
    let val = parse("[dispatch]\n");
    assert!(get_nested(&val, &["dispatch", "topic"]).is_none());
    assert!(get_nested(&val, &["nope", "topic"]).is_none());
}
