use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::StorageError;

/// One product row from the input table.
///
/// `index` is the 0-based row position and is stable across runs over the
/// same file; it drives filenames and ledger ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub index: usize,
    pub name: String,
    pub features: String,
    pub category: String,
    pub audience: String,
    pub keywords: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InputRow {
    name: String,
    features: String,
    category: String,
    audience: String,
    keywords: String,
}

/// Read the whole input CSV up front. Cells are trimmed and absent columns read as "".
pub fn read_work_items(path: &Path) -> Result<Vec<WorkItem>, StorageError> {
    let file = std::fs::File::open(path).map_err(|e| StorageError::io("open", path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(file);

    let mut items = Vec::new();
    for (index, row) in reader.deserialize::<InputRow>().enumerate() {
        let row = row?;
        items.push(WorkItem {
            index,
            name: row.name,
            features: row.features,
            category: row.category,
            audience: row.audience,
            keywords: row.keywords,
        });
    }
    debug!(path = %path.display(), count = items.len(), "loaded work items");
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("input.csv");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn reads_rows_in_order_with_trimmed_cells() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "name,features,category,audience,keywords\n\
             \" Cat Food \",tuna; salmon,pets,owners,\"cat food, kibble\"\n\
             Dog Leash,nylon,pets,walkers,leash\n",
        );
        let items = read_work_items(&path).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].index, 0);
        assert_eq!(items[0].name, "Cat Food");
        assert_eq!(items[0].keywords, "cat food, kibble");
        assert_eq!(items[1].index, 1);
        assert_eq!(items[1].name, "Dog Leash");
    }

    #[test]
    fn missing_columns_default_to_empty() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "name,features\nLamp,warm light\n");
        let items = read_work_items(&path).unwrap();
        assert_eq!(items[0].features, "warm light");
        assert_eq!(items[0].category, "");
        assert_eq!(items[0].keywords, "");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = read_work_items(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, StorageError::Io { action: "open", .. }));
    }
}
