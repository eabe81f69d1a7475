use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What was written for one array.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ArrayReport {
    /// e.g. "train images"
    pub name: String,
    pub file: String,
    pub shape: Vec<usize>,
    pub dtype: String,
    pub elements: usize,
    pub bytes: u64,
}

impl ArrayReport {
    pub fn new(name: &str, file: &str, shape: &[usize], bytes: u64) -> ArrayReport {
        ArrayReport {
            name: name.to_string(),
            file: file.to_string(),
            shape: shape.to_vec(),
            dtype: "float32".to_string(),
            elements: shape.iter().product(),
            bytes,
        }
    }

    pub fn shape_line(&self) -> String {
        format!("shape of {} {}", self.name, format_shape(&self.shape))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExportManifest {
    pub dataset: String,
    pub source: String,
    pub arrays: Vec<ArrayReport>,
}

impl ExportManifest {
    pub fn to_file(&self, filepath: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(filepath)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    pub fn from_file(filepath: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(filepath)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Python-style dimension tuple: `(60000, 28, 28, 1)`, `(60000,)`, `()`.
pub fn format_shape(shape: &[usize]) -> String {
    match shape {
        [] => "()".to_string(),
        [n] => format!("({n},)"),
        dims => {
            let dims: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
            format!("({})", dims.join(", "))
        }
    }
}

/// Prints one shape line per array, in order.
pub fn print_shapes<W: Write>(out: &mut W, reports: &[ArrayReport]) -> Result<()> {
    for report in reports {
        writeln!(out, "{}", report.shape_line())?;
    }
    Ok(())
}
