//! Serialization of fitted components to disk.
//!
//! Every component file is written as `<stem>.<format extension>`. The
//! format tag travels through save/load so a pipeline saved as JSON is
//! loaded as JSON.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{Result, RfeError};

/// Persistence format of a saved pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Format {
    #[default]
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "bincode")]
    Bincode,
}

impl Format {
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Bincode => "bin",
        }
    }

    fn with_extension(&self, stem: &Path) -> PathBuf {
        stem.with_extension(self.extension())
    }
}

/// Writes `value` to `<stem>.<ext>`.
pub fn save<T: Serialize>(stem: &Path, value: &T, format: Format) -> Result<()> {
    let path = format.with_extension(stem);
    match format {
        Format::Json => {
            let json = serde_json::to_string_pretty(value)?;
            fs::write(&path, json)?;
        }
        Format::Bincode => {
            let bytes = bincode::serialize(value)?;
            fs::write(&path, bytes)?;
        }
    }
    Ok(())
}

/// Reads a value of type `T` from `<stem>.<ext>`.
pub fn load<T: DeserializeOwned>(stem: &Path, format: Format) -> Result<T> {
    let path = format.with_extension(stem);
    let read_err = |e: std::io::Error| {
        RfeError::Io(format!("Could not read '{}': {}", path.display(), e))
    };
    match format {
        Format::Json => {
            let json = fs::read_to_string(&path).map_err(read_err)?;
            Ok(serde_json::from_str(&json)?)
        }
        Format::Bincode => {
            let bytes = fs::read(&path).map_err(read_err)?;
            Ok(bincode::deserialize(&bytes)?)
        }
    }
}

/// Detects which format a saved pipeline directory uses by probing for the
/// pipeline file.
pub fn detect_format(dir: &Path, stem: &str) -> Result<Format> {
    for format in [Format::Json, Format::Bincode] {
        if dir.join(stem).with_extension(format.extension()).exists() {
            return Ok(format);
        }
    }
    Err(RfeError::Io(format!(
        "No saved pipeline found under '{}'.",
        dir.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Payload {
        name: String,
        values: Vec<f64>,
    }

    #[test]
    fn test_round_trip_both_formats() {
        let dir = tempfile::tempdir().unwrap();
        let payload = Payload {
            name: "x".to_string(),
            values: vec![1.0, 2.5],
        };
        for format in [Format::Json, Format::Bincode] {
            let stem = dir.path().join("payload");
            save(&stem, &payload, format).unwrap();
            let loaded: Payload = load(&stem, format).unwrap();
            assert_eq!(loaded, payload);
        }
    }

    #[test]
    fn test_detect_format() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("pipeline");
        save(&stem, &42u32, Format::Json).unwrap();
        assert_eq!(detect_format(dir.path(), "pipeline").unwrap(), Format::Json);
    }
}
