//! Reading unit batches from JSON.

use std::io::Read;
use std::path::Path;
use tt_common::{Error, Result, Unit};

/// Parse a JSON array of units.
pub fn parse_units(json: &str) -> Result<Vec<Unit>> {
    let units: Vec<Unit> = serde_json::from_str(json)?;
    Ok(units)
}

/// Read units from a file, or from stdin when `path` is `-`.
pub fn read_units(path: &Path) -> Result<Vec<Unit>> {
    let content = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to read {}: {}", path.display(), e),
            ))
        })?
    };
    parse_units(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_nulls_and_missing_names() {
        let units = parse_units(
            r#"[
                {"id": "36061000100", "name": "Tract 1", "counts": {"housing_units": 1200, "units_5_plus": null}},
                {"id": "36061000200", "counts": {}}
            ]"#,
        )
        .unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].count("housing_units"), Some(1200.0));
        assert_eq!(units[0].count("units_5_plus"), None);
        assert_eq!(units[1].name, "");
    }

    #[test]
    fn rejects_non_array() {
        assert!(matches!(parse_units(r#"{"id": "x"}"#), Err(Error::Json(_))));
    }

    #[test]
    fn reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"id": "a", "name": "A", "counts": {{}}}}]"#).unwrap();
        let units = read_units(file.path()).unwrap();
        assert_eq!(units[0].id.as_str(), "a");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_units(Path::new("/nonexistent/units.json")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("/nonexistent/units.json"));
    }
}
