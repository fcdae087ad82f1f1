pub mod assemble;
pub mod condense;
pub mod estimate;

use std::io::Read;
use std::path::PathBuf;

/// Read input text from a file, or from stdin when no file is given.
pub fn read_input(file: Option<PathBuf>) -> Result<String, Box<dyn std::error::Error>> {
    match file {
        Some(path) => Ok(std::fs::read_to_string(&path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}
