//! CLI commands

use std::io::Read;
use std::path::Path;

use miette::{IntoDiagnostic, Result, WrapErr};

pub mod convert_datacenters;
pub mod convert_helm_values;

/// Read a file argument, treating `-` as stdin.
pub fn read_input(path: &Path) -> Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut buffer = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buffer)
            .into_diagnostic()
            .wrap_err("failed to read from stdin")?;
        return Ok(buffer);
    }

    std::fs::read(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_input_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"datacenters: {}\n").unwrap();

        let content = read_input(file.path()).unwrap();
        assert_eq!(content, b"datacenters: {}\n");
    }

    #[test]
    fn test_read_input_missing_file() {
        let err = read_input(Path::new("/does/not/exist.yaml")).unwrap_err();
        assert!(err.to_string().contains("exist.yaml"));
    }
}
