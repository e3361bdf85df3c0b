// Licensed under the Apache-2.0 license

use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Letters reflected in the target identifier, in the order they are emitted.
const IDENTIFIER_ORDER: [char; 5] = ['I', 'M', 'C', 'F', 'D'];

#[derive(Debug, Error)]
pub enum IsaSpecError {
    #[error("could not read ISA spec {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse ISA spec: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("ISA string {0:?} does not start with RV<xlen>")]
    BadIsaString(String),
    #[error("supported_xlen {0:?} contains neither 32 nor 64")]
    UnsupportedXlen(Vec<u32>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Xlen {
    Rv32,
    Rv64,
}

impl Xlen {
    /// Picks the widest width the hart supports.
    pub fn from_supported(supported: &[u32]) -> Result<Self, IsaSpecError> {
        if supported.contains(&64) {
            Ok(Xlen::Rv64)
        } else if supported.contains(&32) {
            Ok(Xlen::Rv32)
        } else {
            Err(IsaSpecError::UnsupportedXlen(supported.to_vec()))
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            Xlen::Rv32 => 32,
            Xlen::Rv64 => 64,
        }
    }

    /// Integer ABI passed to the compiler as `-mabi`.
    pub fn abi(self) -> &'static str {
        match self {
            Xlen::Rv32 => "ilp32",
            Xlen::Rv64 => "lp64",
        }
    }
}

impl fmt::Display for Xlen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

#[derive(Deserialize)]
struct IsaSpecFile {
    hart0: HartSpec,
}

#[derive(Deserialize)]
struct HartSpec {
    #[serde(rename = "ISA")]
    isa: String,
    supported_xlen: Vec<u32>,
}

/// Register width and single-letter extensions of the hart under test.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IsaProfile {
    xlen: Xlen,
    isa: String,
    extensions: BTreeSet<char>,
}

impl IsaProfile {
    pub fn new(xlen: Xlen, isa: &str) -> Result<Self, IsaSpecError> {
        Ok(Self {
            xlen,
            isa: isa.to_string(),
            extensions: single_letter_extensions(isa)?,
        })
    }

    /// Loads `hart0` of a riscv-config ISA yaml.
    pub fn load(path: &Path) -> Result<Self, IsaSpecError> {
        let contents = std::fs::read_to_string(path).map_err(|source| IsaSpecError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, IsaSpecError> {
        let spec: IsaSpecFile = serde_yaml::from_str(contents)?;
        let xlen = Xlen::from_supported(&spec.hart0.supported_xlen)?;
        Self::new(xlen, &spec.hart0.isa)
    }

    pub fn xlen(&self) -> Xlen {
        self.xlen
    }

    /// The `ISA` string exactly as written in the ISA yaml.
    pub fn isa_string(&self) -> &str {
        &self.isa
    }

    pub fn has_extension(&self, letter: char) -> bool {
        self.extensions.contains(&letter.to_ascii_uppercase())
    }

    /// `rv<xlen>` followed by the enabled letters out of `i m c f d`.
    pub fn identifier(&self) -> String {
        let mut identifier = format!("rv{}", self.xlen.bits());
        identifier.extend(
            IDENTIFIER_ORDER
                .iter()
                .filter(|letter| self.extensions.contains(letter))
                .map(|letter| letter.to_ascii_lowercase()),
        );
        identifier
    }
}

/// Collects the single-letter extensions of an ISA string such as
/// `RV32IMCZicsr_Zifencei`. Parsing stops at the first multi-letter
/// extension; `G` expands to `IMAFD` and version suffixes (`2P0`) are skipped.
fn single_letter_extensions(isa: &str) -> Result<BTreeSet<char>, IsaSpecError> {
    let upper = isa.to_ascii_uppercase();
    let base = upper
        .strip_prefix("RV")
        .ok_or_else(|| IsaSpecError::BadIsaString(isa.to_string()))?;
    let letters = base.trim_start_matches(|c: char| c.is_ascii_digit());
    if letters.len() == base.len() {
        return Err(IsaSpecError::BadIsaString(isa.to_string()));
    }

    let mut extensions = BTreeSet::new();
    let mut after_digit = false;
    for c in letters.chars() {
        match c {
            'Z' | 'S' | 'X' | '_' => break,
            'P' if after_digit => {}
            'G' => extensions.extend(['I', 'M', 'A', 'F', 'D']),
            c if c.is_ascii_alphabetic() => {
                extensions.insert(c);
            }
            c if c.is_ascii_digit() => {}
            _ => break,
        }
        after_digit = c.is_ascii_digit();
    }
    Ok(extensions)
}
