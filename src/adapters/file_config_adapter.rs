//! INI file configuration adapter.

use configparser::ini::Ini;
use std::path::Path;

use crate::domain::error::KestrelError;
use crate::ports::config_port::ConfigPort;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<FileConfigAdapter, KestrelError> {
        let mut config = Ini::new();
        config
            .load(&path)
            .map_err(|reason| KestrelError::ConfigParse {
                file: path.as_ref().display().to_string(),
                reason,
            })?;
        Ok(FileConfigAdapter { config })
    }

    pub fn from_string(content: &str) -> Result<FileConfigAdapter, KestrelError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| KestrelError::ConfigParse {
                file: "<inline>".to_string(),
                reason,
            })?;
        Ok(FileConfigAdapter { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}
