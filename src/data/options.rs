use std::{
    fs::{self, File},
    io::Write,
    path::PathBuf,
    time::Duration,
};

use serde::Serialize;
use toml::Value;

pub const OPTIONS_VERSION: &str = "1.0";

#[cfg(windows)]
const DEFAULT_DEVICE: &str = "COM1";
#[cfg(not(windows))]
const DEFAULT_DEVICE: &str = "/dev/ttyUSB0";

/// Host tool settings, persisted as `options.toml` in the platform config dir.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Options {
    pub device: String,
    pub baud_rate: usize,
    pub read_timeout_ms: u64,
    pub shell_settle_ms: u64,
    pub max_upload_size: usize,
    pub log_level: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            baud_rate: 115_200,
            read_timeout_ms: 2000,
            shell_settle_ms: 300,
            max_upload_size: 512 * 1024,
            log_level: "info".to_string(),
        }
    }
}

impl Options {
    pub fn options_file() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "GitHub", "uart_xfer").map(|dirs| dirs.config_dir().join("options.toml"))
    }

    /// Defaults when no options file exists yet.
    pub fn load_options() -> anyhow::Result<Self> {
        if let Some(options_file) = Options::options_file() {
            if options_file.exists() {
                let content = fs::read_to_string(&options_file)?;
                return Options::from_str(&content);
            }
        }
        Ok(Options::default())
    }

    pub fn store_options(&self) -> anyhow::Result<()> {
        let Some(options_file) = Options::options_file() else {
            return Ok(());
        };
        if let Some(dir) = options_file.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut file = File::create(&options_file)?;
        file.write_all(self.to_toml()?.as_bytes())?;
        file.flush()?;
        log::info!("stored options to {}", options_file.display());
        Ok(())
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(format!("version = \"{OPTIONS_VERSION}\"\n{}", toml::to_string(self)?))
    }

    /// Unknown keys and values of the wrong type are ignored.
    pub fn from_str(input_text: &str) -> anyhow::Result<Options> {
        let value = input_text.parse::<Value>()?;
        let mut result = Options::default();
        parse_value(&mut result, &value);
        Ok(result)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn shell_settle(&self) -> Duration {
        Duration::from_millis(self.shell_settle_ms)
    }

    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

fn parse_value(options: &mut Options, value: &Value) {
    let Value::Table(table) = value else {
        return;
    };
    for (k, v) in table {
        match (k.as_str(), v) {
            ("device", Value::String(str)) => options.device = str.clone(),
            ("baud_rate", Value::Integer(i)) if *i > 0 => options.baud_rate = *i as usize,
            ("read_timeout_ms", Value::Integer(i)) if *i >= 0 => options.read_timeout_ms = *i as u64,
            ("shell_settle_ms", Value::Integer(i)) if *i >= 0 => options.shell_settle_ms = *i as u64,
            ("max_upload_size", Value::Integer(i)) if *i > 0 => options.max_upload_size = *i as usize,
            ("log_level", Value::String(str)) => options.log_level = str.clone(),
            ("version", _) => {}
            _ => log::warn!("ignored option {k}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file() {
        let options = Options::from_str("device = \"/dev/ttyACM1\"\nbaud_rate = 57600\nmonitor = true\nshell_settle_ms = \"slow\"\n").unwrap();
        assert_eq!("/dev/ttyACM1", options.device);
        assert_eq!(57600, options.baud_rate);
        assert_eq!(300, options.shell_settle_ms);
        assert_eq!(Duration::from_millis(2000), options.read_timeout());
        assert_eq!(512 * 1024, options.max_upload_size);
    }

    #[test]
    fn test_store_format_reads_back() {
        let options = Options {
            device: "COM7".to_string(),
            read_timeout_ms: 500,
            log_level: "debug".to_string(),
            ..Default::default()
        };
        let text = options.to_toml().unwrap();
        assert!(text.starts_with("version = \"1.0\"\n"));
        assert_eq!(options, Options::from_str(&text).unwrap());
        assert_eq!(log::LevelFilter::Debug, options.log_level_filter());
    }

    #[test]
    fn test_bad_input() {
        assert!(Options::from_str("device = ").is_err());
        let options = Options {
            log_level: "chatty".to_string(),
            ..Default::default()
        };
        assert_eq!(log::LevelFilter::Info, options.log_level_filter());
    }
}
