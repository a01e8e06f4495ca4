//! Class label tables.

use std::path::Path;

use crate::error::{Error, Result};

/// Ordered class names; line `i` of the source file names class `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    /// Read a newline-delimited label file.
    ///
    /// Blank lines are kept so that indices stay aligned with the file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LabelLoad`] if the file cannot be read.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::LabelLoad {
            path: path.to_path_buf(),
            source,
        })?;

        let table = Self::parse(&content);
        tracing::debug!("Loaded {} labels from {}", table.len(), path.display());
        Ok(table)
    }

    /// Build a table from text, one label per line.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        Self {
            labels: content.lines().map(str::to_string).collect(),
        }
    }

    /// Look up the label for a class index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index >= self.len()`.
    pub fn get(&self, index: usize) -> Result<&str> {
        self.labels
            .get(index)
            .map(String::as_str)
            .ok_or(Error::IndexOutOfRange {
                index,
                len: self.labels.len(),
            })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl FromIterator<String> for LabelTable {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_and_lookup() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "cat").unwrap();
        writeln!(file, "dog").unwrap();
        writeln!(file, "bird").unwrap();

        let table = LabelTable::load(file.path()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(1).unwrap(), "dog");
    }

    #[test]
    fn test_out_of_range_lookup() {
        let table = LabelTable::parse("cat\ndog\nbird\n");
        let err = table.get(5).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 5, len: 3 }));
        assert!(table.get(3).is_err());
    }

    #[test]
    fn test_blank_lines_preserved() {
        let table = LabelTable::parse("cat\n\nbird");
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(1).unwrap(), "");
        assert_eq!(table.get(2).unwrap(), "bird");
    }

    #[test]
    fn test_crlf_line_endings() {
        let table = LabelTable::parse("tench\r\ngoldfish\r\n");
        assert_eq!(table.get(1).unwrap(), "goldfish");
    }

    #[test]
    fn test_missing_file() {
        let err = LabelTable::load("no/such/labels.txt").unwrap_err();
        assert!(matches!(err, Error::LabelLoad { .. }));
    }

    #[test]
    fn test_empty_table() {
        let table = LabelTable::parse("");
        assert!(table.is_empty());
        assert!(matches!(
            table.get(0),
            Err(Error::IndexOutOfRange { index: 0, len: 0 })
        ));
    }
}
