//! Generic parameters functions
//!
//! Parameter files are TOML files kept in the `params` directory of the
//! software root. They can be loaded either straight into a typed parameter
//! struct with [`load`], or into a [`ParamTable`] which provides loosely typed
//! getters with defaults.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::de::DeserializeOwned;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use thiserror::Error;
use toml;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A loaded parameter file with typed accessors.
///
/// Keys are dotted paths into the TOML document, e.g. `"monitor.poll_period_s"`.
/// Every getter takes a default which is returned if the key is missing or
/// holds a value of a different type.
#[derive(Debug, Clone)]
pub struct ParamTable {
    root: toml::Value,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading of a parameter file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Cannot find the software root directory: {0}")]
    SwRootNotFound(std::io::Error),

    #[error("Cannot load the parmeter file {0:?}: {1}")]
    FileLoadError(PathBuf, std::io::Error),

    #[error("Cannot read the parameter file: {0}")]
    DeserialiseError(toml::de::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ParamTable {
    /// Load a parameter table from a file in the params directory.
    pub fn load(param_file_path: &str) -> Result<Self, LoadError> {
        Self::load_from_path(params_path(param_file_path)?)
    }

    /// Load a parameter table from an explicit path.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        Ok(Self {
            root: load_from_path(path)?,
        })
    }

    /// Parse a parameter table from a TOML string.
    pub fn parse(s: &str) -> Result<Self, LoadError> {
        Ok(Self {
            root: toml::from_str(s).map_err(LoadError::DeserialiseError)?,
        })
    }

    /// Returns true if the key exists in the table.
    pub fn has_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Get an integer value.
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.get(key).and_then(|v| v.as_integer()).unwrap_or(default)
    }

    /// Get a floating point value. Integer values are accepted and converted.
    pub fn get_f64(&self, key: &str, default: f64) -> f64 {
        match self.get(key) {
            Some(toml::Value::Float(f)) => *f,
            Some(toml::Value::Integer(i)) => *i as f64,
            _ => default,
        }
    }

    /// Get a boolean value.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(|v| v.as_bool()).unwrap_or(default)
    }

    /// Get a string value.
    pub fn get_str(&self, key: &str, default: &str) -> String {
        self.get(key)
            .and_then(|v| v.as_str())
            .unwrap_or(default)
            .to_string()
    }

    /// Deserialise the value at the given key into a typed struct.
    ///
    /// Returns `None` if the key doesn't exist or the value doesn't match.
    pub fn get_typed<P: DeserializeOwned>(&self, key: &str) -> Option<P> {
        self.get(key).and_then(|v| v.clone().try_into().ok())
    }

    fn get(&self, key: &str) -> Option<&toml::Value> {
        key.split('.')
            .try_fold(&self.root, |value, part| value.as_table()?.get(part))
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a parameter file
///
/// The file path is relative to the `{sw_root}/params` directory
pub fn load<P>(param_file_path: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned,
{
    load_from_path(params_path(param_file_path)?)
}

/// Load a parameter file from an explicit path
pub fn load_from_path<P, F>(path: F) -> Result<P, LoadError>
where
    P: DeserializeOwned,
    F: AsRef<Path>,
{
    let params_str = read_to_string(path.as_ref())
        .map_err(|e| LoadError::FileLoadError(path.as_ref().to_path_buf(), e))?;

    toml::from_str(params_str.as_str()).map_err(LoadError::DeserialiseError)
}

/// Get the full path to a file in the params directory
pub fn params_path(param_file_path: &str) -> Result<PathBuf, LoadError> {
    let mut path = crate::host::get_sw_root().map_err(LoadError::SwRootNotFound)?;
    path.push("params");
    path.push(param_file_path);
    Ok(path)
}
