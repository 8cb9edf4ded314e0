use std::collections::BTreeMap;

use serde::Serialize;

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Records keyed by id, the same shape as the category documents on disk.
pub(crate) fn print_records<T: Serialize>(records: &[(String, T)]) -> anyhow::Result<()> {
    let map: BTreeMap<&str, &T> = records.iter().map(|(id, r)| (id.as_str(), r)).collect();
    print_json(&map)
}

pub(crate) fn opt(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}
