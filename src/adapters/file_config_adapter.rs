//! INI file configuration adapter.

use crate::domain::error::ScanError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScanError> {
        let file = path.as_ref().display().to_string();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| ScanError::ConfigParse { file, reason })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|v| v.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_scan_section() {
        let adapter = FileConfigAdapter::from_string(
            "[scan]\ndata_dir = /srv/prices\nworkers = 3\nrow_number = 6\n",
        )
        .unwrap();
        assert_eq!(
            adapter.get_string("scan", "data_dir"),
            Some("/srv/prices".to_string())
        );
        assert_eq!(adapter.get_string("scan", "workers"), Some("3".to_string()));
        assert_eq!(adapter.get_string("scan", "row_number"), Some("6".to_string()));
    }

    #[test]
    fn missing_keys_fall_back() {
        let adapter = FileConfigAdapter::from_string("[scan]\nworkers = many\n").unwrap();
        assert_eq!(adapter.get_string("scan", "missing"), None);
        assert_eq!(adapter.get_string("other", "workers"), None);
        assert!(adapter.get_list("scan", "exclude_sectors").is_empty());
    }

    #[test]
    fn section_names_are_case_insensitive() {
        let adapter = FileConfigAdapter::from_string("[Scan]\nDays = 120\n").unwrap();
        assert_eq!(adapter.get_string("scan", "days"), Some("120".to_string()));
    }

    #[test]
    fn get_list_splits_on_commas() {
        let adapter =
            FileConfigAdapter::from_string("[scan]\nexclude_sectors = Oils-Energy, ,Utilities\n")
                .unwrap();
        assert_eq!(
            adapter.get_list("scan", "exclude_sectors"),
            vec!["Oils-Energy", "Utilities"]
        );
    }

    #[test]
    fn from_file_loads_config() {
        let file = create_temp_config("[scan]\ndays = 200,60\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("scan", "days"), Some("200,60".to_string()));
    }

    #[test]
    fn from_file_missing_is_config_error() {
        let err = FileConfigAdapter::from_file("/nonexistent/barscan.ini").err().unwrap();
        assert!(matches!(err, ScanError::ConfigParse { .. }));
    }
}
