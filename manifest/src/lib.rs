//! Reads the approved input identifiers out of a sub-run manifest.
//!
//! A manifest is a comma-delimited file written by an upstream process.
//! Each data row names one approved input file; the identifier lives in a
//! fixed column. Row order is significant: it becomes the task index of the
//! job that processes that input.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use util::HashSet;

/// The identifier is the second column of each row.
pub const DEFAULT_ID_COLUMN: usize = 1;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Manifest not found: {0:?}")]
    ManifestNotFound(PathBuf),
    #[error("Malformed row in manifest {path} at line {line}: expected at least {expected} columns, found {found}")]
    MalformedRow {
        path: String,
        line: u64,
        expected: usize,
        found: usize,
    },
    #[error("Unable to read manifest {0}")]
    Csv(String, #[source] csv::Error),
}

/// Describes where the identifier lives in a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestSchema {
    /// If true, the first row is discarded no matter what it contains.
    pub has_header: bool,
    /// Zero-based column holding the identifier.
    pub id_column: usize,
}

impl Default for ManifestSchema {
    fn default() -> Self {
        Self {
            has_header: true,
            id_column: DEFAULT_ID_COLUMN,
        }
    }
}

/// Read the manifest at `path` and return its identifiers in row order.
pub fn read(path: &Path, schema: &ManifestSchema) -> Result<Vec<String>, Error> {
    let label = path.to_string_lossy();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::ManifestNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(Error::Csv(label.into_owned(), e.into())),
    };
    read_from_reader(file, schema, &label)
}

/// Same as [`read`], for any `Read` source. `label` is only used in errors.
pub fn read_from_reader<R: Read>(
    reader: R,
    schema: &ManifestSchema,
    label: &str,
) -> Result<Vec<String>, Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(schema.has_header)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut ids = Vec::with_capacity(64);
    for record in rdr.records() {
        let record = record.map_err(|e| Error::Csv(label.to_owned(), e))?;
        match record.get(schema.id_column) {
            Some(id) => ids.push(id.to_owned()),
            None => {
                return Err(Error::MalformedRow {
                    path: label.to_owned(),
                    line: record.position().map(|pos| pos.line()).unwrap_or_default(),
                    expected: schema.id_column + 1,
                    found: record.len(),
                });
            }
        }
    }

    log::debug!("read {} identifiers from manifest {label}", ids.len());
    Ok(ids)
}

/// Identifiers that occur more than once, each reported once, in order of
/// their second occurrence.
pub fn duplicates(ids: &[String]) -> Vec<&str> {
    let mut seen = HashSet::default();
    let mut reported = HashSet::default();
    let mut dups = Vec::with_capacity(0);
    for id in ids {
        if !seen.insert(id.as_str()) && reported.insert(id.as_str()) {
            dups.push(id.as_str());
        }
    }
    dups
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn read_str(text: &str, schema: &ManifestSchema) -> Result<Vec<String>, Error> {
        read_from_reader(text.as_bytes(), schema, "test.csv")
    }

    #[test]
    fn test_skips_header_and_reads_second_column() -> Result<(), Error> {
        let ids = read_str("id,name\n1,alpha\n2,beta\n", &ManifestSchema::default())?;
        assert_eq!(ids, vec!["alpha", "beta"]);
        Ok(())
    }

    #[test]
    fn test_header_skipped_regardless_of_content() -> Result<(), Error> {
        // first row looks like data, but it's still discarded:
        let ids = read_str("0,first\n1,second\n", &ManifestSchema::default())?;
        assert_eq!(ids, vec!["second"]);
        Ok(())
    }

    #[test]
    fn test_no_header() -> Result<(), Error> {
        let schema = ManifestSchema {
            has_header: false,
            id_column: 0,
        };
        let ids = read_str("a\nb\nc\n", &schema)?;
        assert_eq!(ids, vec!["a", "b", "c"]);
        Ok(())
    }

    #[test]
    fn test_header_only() -> Result<(), Error> {
        let ids = read_str("id,name\n", &ManifestSchema::default())?;
        assert!(ids.is_empty());
        let ids = read_str("", &ManifestSchema::default())?;
        assert!(ids.is_empty());
        Ok(())
    }

    #[test]
    fn test_preserves_order_and_duplicates() -> Result<(), Error> {
        let text = "id,name,extra\n3,gamma,x\n1,alpha,y\n3,gamma,z\n2,beta,w\n";
        let ids = read_str(text, &ManifestSchema::default())?;
        assert_eq!(ids, vec!["gamma", "alpha", "gamma", "beta"]);
        assert_eq!(duplicates(&ids), vec!["gamma"]);
        Ok(())
    }

    #[test]
    fn test_trims_fields() -> Result<(), Error> {
        let ids = read_str("id, name\n1, alpha \n2,beta\r\n", &ManifestSchema::default())?;
        assert_eq!(ids, vec!["alpha", "beta"]);
        Ok(())
    }

    #[test]
    fn test_malformed_row() {
        let result = read_str("id,name\n1,alpha\n2\n3,gamma\n", &ManifestSchema::default());
        match result {
            Err(Error::MalformedRow {
                line,
                expected,
                found,
                ..
            }) => {
                assert_eq!(line, 3);
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            other => panic!("expected MalformedRow, got {other:?}"),
        }
    }

    #[test]
    fn test_read_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("sim_0.csv");
        std::fs::write(&path, "id,name\n1,alpha\n2,beta\n")?;
        let ids = read(&path, &ManifestSchema::default())?;
        assert_eq!(ids, vec!["alpha", "beta"]);
        Ok(())
    }

    #[test]
    fn test_manifest_not_found() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("missing.csv");
        match read(&path, &ManifestSchema::default()) {
            Err(Error::ManifestNotFound(p)) => assert_eq!(p, path),
            other => panic!("expected ManifestNotFound, got {other:?}"),
        }
        Ok(())
    }
}
