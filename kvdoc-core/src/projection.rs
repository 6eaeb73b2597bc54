//! Field projection.
//!
//! Projection keeps only the selected top-level keys of a record. The fields kept are never
//! projected further. Arrays of populated records are projected element by element, as each
//! element is resolved.

use crate::record::Record;

/// Retains only the `select`ed keys of `record`.
pub fn project_record(record: &mut Record, select: &[String]) {
    let dropped: Vec<String> = record
        .keys()
        .filter(|key| !select.contains(*key))
        .cloned()
        .collect();

    for key in dropped {
        record.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn select(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn keeps_only_selected_top_level_keys() {
        let mut record = doc! {
            "_id": "a",
            "createdAt": 1,
            "name": "X",
            "age": 3,
            "address": { "street": "Mantegh", "name": "home" },
        };

        project_record(&mut record, &select(&["name", "age"]));

        assert_eq!(record, doc! { "name": "X", "age": 3 });
    }

    #[test]
    fn nested_documents_are_not_projected() {
        let mut record = doc! { "address": { "street": "Mantegh", "zip": "1" } };

        project_record(&mut record, &select(&["address"]));

        assert_eq!(record, doc! { "address": { "street": "Mantegh", "zip": "1" } });
    }

}
