use super::{ConfigLayer, FieldSources};

/// Apply one configuration layer on top of `base`.
///
/// Tables are merged key by key. Any other value in `overlay` replaces the
/// value at the same path, arrays included. Every leaf the overlay touches is
/// attributed to `layer` in `sources`.
pub fn apply_layer(
    base: &mut toml::Value,
    overlay: &toml::Value,
    layer: ConfigLayer,
    sources: &mut FieldSources,
) {
    let mut path = Vec::new();
    merge_at(base, overlay, &mut path, layer, sources);
}

/// Attribute every leaf of `value` to `layer`.
pub fn record_leaves(value: &toml::Value, layer: ConfigLayer, sources: &mut FieldSources) {
    let mut path = Vec::new();
    walk_leaves(value, &mut path, layer, sources);
}

fn merge_at<'a>(
    base: &mut toml::Value,
    overlay: &'a toml::Value,
    path: &mut Vec<&'a str>,
    layer: ConfigLayer,
    sources: &mut FieldSources,
) {
    let (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) = (&mut *base, overlay)
    else {
        *base = overlay.clone();
        walk_leaves(overlay, path, layer, sources);
        return;
    };

    for (key, incoming) in overlay_table {
        path.push(key);
        match base_table.get_mut(key) {
            Some(existing) if incoming.is_table() => {
                merge_at(existing, incoming, path, layer, sources);
            },
            Some(existing) => {
                *existing = incoming.clone();
                sources.insert(path.join("."), layer);
            },
            None => {
                base_table.insert(key.clone(), incoming.clone());
                walk_leaves(incoming, path, layer, sources);
            },
        }
        path.pop();
    }
}

fn walk_leaves<'a>(
    value: &'a toml::Value,
    path: &mut Vec<&'a str>,
    layer: ConfigLayer,
    sources: &mut FieldSources,
) {
    match value.as_table() {
        Some(table) => {
            for (key, child) in table {
                path.push(key);
                walk_leaves(child, path, layer, sources);
                path.pop();
            }
        },
        None => {
            sources.insert(path.join("."), layer);
        },
    }
}
