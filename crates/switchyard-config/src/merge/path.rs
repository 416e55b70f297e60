use tracing::warn;

/// Set a value at a nested path, creating intermediate tables as needed.
pub(crate) fn set_nested(val: &mut toml::Value, path: &[&str], new_val: toml::Value) {
    let Some((leaf, parents)) = path.split_last() else {
        return;
    };

    let mut current = val;
    for segment in parents {
        let Some(table) = current.as_table_mut() else {
            warn!(segment, "set_nested: path crosses a non-table value; skipping");
            return;
        };
        current = table
            .entry((*segment).to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    match current.as_table_mut() {
        Some(table) => {
            table.insert((*leaf).to_owned(), new_val);
        },
        None => warn!(leaf, "set_nested: parent is not a table; skipping"),
    }
}

/// Navigate into a nested `toml::Value` by dotted path segments.
#[cfg(test)]
pub(crate) fn get_nested<'a>(val: &'a toml::Value, path: &[&str]) -> Option<&'a toml::Value> {
    path.iter()
        .try_fold(val, |current, segment| current.as_table()?.get(*segment))
}
