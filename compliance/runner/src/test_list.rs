// Licensed under the Apache-2.0 license

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TestListError {
    #[error("could not read test list {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse test list: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("test list key {0:?} is not a string")]
    BadKey(serde_yaml::Value),
}

/// One test as described by the harness.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct TestEntry {
    pub test_path: PathBuf,
    pub work_dir: PathBuf,
    #[serde(default)]
    pub macros: Vec<String>,
    pub isa: String,
    #[serde(default)]
    pub coverage_labels: Vec<String>,
}

impl TestEntry {
    /// `-march` value for this test.
    pub fn march(&self) -> String {
        self.isa.to_lowercase()
    }

    /// Source file name without its extension, e.g. `add-01` for `add-01.S`.
    pub fn test_name(&self) -> String {
        self.test_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Tests in the order the harness listed them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestList {
    entries: Vec<(String, TestEntry)>,
}

impl TestList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: impl Into<String>, entry: TestEntry) {
        self.entries.push((id.into(), entry));
    }

    pub fn load(path: &Path) -> Result<Self, TestListError> {
        let contents = std::fs::read_to_string(path).map_err(|source| TestListError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, TestListError> {
        let mut list = Self::new();
        if contents.trim().is_empty() {
            return Ok(list);
        }
        let mapping: serde_yaml::Mapping = serde_yaml::from_str(contents)?;
        for (key, value) in mapping {
            let serde_yaml::Value::String(id) = key else {
                return Err(TestListError::BadKey(key));
            };
            list.push(id, serde_yaml::from_value(value)?);
        }
        Ok(list)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TestEntry)> {
        self.entries.iter().map(|(id, entry)| (id.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_LIST: &str = "
/suite/rv32i_m/I/src/sub-01.S:
  work_dir: /work/rv32i_m/I/src/sub-01.S/dut
  macros: [TEST_CASE_1=True, XLEN=32]
  isa: RV32I
  test_path: /suite/rv32i_m/I/src/sub-01.S
  coverage_labels: [sub]
/suite/rv32i_m/I/src/add-01.S:
  work_dir: /work/rv32i_m/I/src/add-01.S/dut
  macros: [TEST_CASE_1=True, XLEN=32]
  isa: RV32I
  test_path: /suite/rv32i_m/I/src/add-01.S
  coverage_labels: [add]
/suite/rv32i_m/privilege/src/ebreak.S:
  work_dir: /work/rv32i_m/privilege/src/ebreak.S/dut
  isa: RV32I_Zicsr
  test_path: /suite/rv32i_m/privilege/src/ebreak.S
";

    #[test]
    fn test_file_order_preserved() {
        let list = TestList::from_yaml_str(TEST_LIST).unwrap();
        let names: Vec<String> = list.iter().map(|(_, entry)| entry.test_name()).collect();
        assert_eq!(names, ["sub-01", "add-01", "ebreak"]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_entry_fields() {
        let list = TestList::from_yaml_str(TEST_LIST).unwrap();
        let (id, entry) = list.iter().nth(1).unwrap();
        assert_eq!(id, "/suite/rv32i_m/I/src/add-01.S");
        assert_eq!(entry.macros, ["TEST_CASE_1=True", "XLEN=32"]);
        assert_eq!(entry.coverage_labels, ["add"]);
        assert_eq!(entry.march(), "rv32i");

        let (_, ebreak) = list.iter().nth(2).unwrap();
        assert!(ebreak.macros.is_empty());
        assert!(ebreak.coverage_labels.is_empty());
        assert_eq!(ebreak.march(), "rv32i_zicsr");
    }

    #[test]
    fn test_empty_list() {
        assert!(TestList::from_yaml_str("\n").unwrap().is_empty());
    }

    #[test]
    fn test_bad_entries() {
        assert!(matches!(
            TestList::from_yaml_str("1: {}\n"),
            Err(TestListError::BadKey(_))
        ));
        assert!(matches!(
            TestList::from_yaml_str("add-01:\n  isa: RV32I\n"),
            Err(TestListError::Parse(_))
        ));
    }
}
