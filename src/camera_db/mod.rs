//! Camera sensor width database, in the text format shipped with OpenMVG.
//!
//! Each line holds one camera and its sensor width in millimeters:
//!
//! ```text
//! Canon Canon EOS 5D;35.8
//! Canon EOS 5D;35.8
//! ```
//!
//! The key is either `"<make> <model>"` or the model alone, as image metadata is not
//! consistent about repeating the make in the model string.

use log::{debug, warn};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Install location of the OpenMVG database.
pub const DEFAULT_CAMERA_DB_PATH: &str =
    "/usr/local/share/openMVG/sensor_width_camera_database.txt";

#[derive(Debug, thiserror::Error)]
pub enum CameraDbError {
    #[error("Cannot parse camera database entry at line {line_number}: {line:?}")]
    MalformedDatabaseEntry { line_number: usize, line: String },

    #[error("error reading camera database")]
    Io(#[from] std::io::Error),
}

/// Sensor widths in millimeters, keyed by camera make and model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CameraDb {
    entries: HashMap<String, f64>,
}

impl CameraDb {
    /// Reads a database from `reader`.
    ///
    /// Malformed lines are logged and skipped. Later entries replace earlier ones with the
    /// same key.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self, CameraDbError> {
        let mut entries = HashMap::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            match parse_entry(index + 1, line.trim_end()) {
                Ok((key, width)) => {
                    entries.insert(key.to_string(), width);
                }
                Err(err) => warn!("{err}"),
            }
        }
        debug!("Loaded {} camera database entries", entries.len());
        Ok(CameraDb { entries })
    }

    /// Reads the database file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CameraDbError> {
        let file = File::open(path)?;
        Self::parse(BufReader::new(file))
    }

    /// Reads the database from [`DEFAULT_CAMERA_DB_PATH`].
    pub fn load_default() -> Result<Self, CameraDbError> {
        Self::load(DEFAULT_CAMERA_DB_PATH)
    }

    /// Sensor width of the entry with exactly this key.
    pub fn sensor_width(&self, key: &str) -> Option<f64> {
        self.entries.get(key).copied()
    }

    /// Sensor width for a camera, looked up by `"<make> <model>"` first and by the model
    /// alone otherwise.
    pub fn lookup(&self, make: &str, model: &str) -> Option<f64> {
        self.sensor_width(&format!("{make} {model}"))
            .or_else(|| self.sensor_width(model))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(key, sensor width)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(key, width)| (key.as_str(), *width))
    }
}

fn parse_entry(line_number: usize, line: &str) -> Result<(&str, f64), CameraDbError> {
    let malformed = || CameraDbError::MalformedDatabaseEntry {
        line_number,
        line: line.to_string(),
    };

    let mut parts = line.split(';');
    let (Some(key), Some(width), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(malformed());
    };
    let width = width.trim().parse::<f64>().map_err(|_| malformed())?;
    Ok((key, width))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::{Cursor, Write};

    const DB: &str = "Canon Canon EOS 5D;35.8\n\
                      Canon EOS 5D;35.8\n\
                      Apple iPhone 6;4.8  \n\
                      \n\
                      Broken;entry;here\n\
                      NoWidth\n\
                      Nikon D70;abc\n\
                      Apple iPhone 6;4.89\n";

    #[test]
    fn test_parse_skips_malformed_lines() {
        let db = CameraDb::parse(Cursor::new(DB)).unwrap();
        assert_eq!(db.len(), 3);
        assert_relative_eq!(db.sensor_width("Canon EOS 5D").unwrap(), 35.8);
        assert_eq!(db.sensor_width("Broken"), None);
        assert_eq!(db.sensor_width("Nikon D70"), None);
        // Later entries win
        assert_relative_eq!(db.sensor_width("Apple iPhone 6").unwrap(), 4.89);
    }

    #[test]
    fn test_lookup() {
        let db = CameraDb::parse(Cursor::new(DB)).unwrap();
        assert_relative_eq!(db.lookup("Canon", "Canon EOS 5D").unwrap(), 35.8);
        assert_relative_eq!(db.lookup("Unknown", "Canon EOS 5D").unwrap(), 35.8);
        assert_relative_eq!(db.lookup("Apple", "iPhone 6").unwrap(), 4.89);
        assert_eq!(db.lookup("Sony", "A7"), None);
    }

    #[test]
    fn test_parse_entry_errors() {
        assert!(matches!(
            parse_entry(4, ""),
            Err(CameraDbError::MalformedDatabaseEntry { line_number: 4, .. })
        ));
        let err = parse_entry(7, "Nikon D70;abc").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot parse camera database entry at line 7: \"Nikon D70;abc\""
        );
        assert_eq!(parse_entry(1, "GoPro HERO4; 6.17").unwrap(), ("GoPro HERO4", 6.17));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{DB}").unwrap();

        let db = CameraDb::load(file.path()).unwrap();
        assert_eq!(db.len(), 3);
        assert!(!db.is_empty());

        let mut keys: Vec<_> = db.iter().map(|(key, _)| key).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["Apple iPhone 6", "Canon Canon EOS 5D", "Canon EOS 5D"]);
    }

    #[test]
    fn test_load_sample_database() {
        let db = CameraDb::load("samples/sensor_width_camera_database.txt").unwrap();
        assert_relative_eq!(db.lookup("Canon", "Canon EOS 5D").unwrap(), 35.8);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = CameraDb::load(dir.path().join("missing.txt"));
        assert!(matches!(result, Err(CameraDbError::Io(_))));
    }
}
