//! 应用配置和持久化
//!
//! 提供设备名称、射频后端等设置的存储和读取。

use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::logging::LogLevel;

/// 射频后端选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RadioBackend {
    /// bluer (BlueZ D-Bus)，Linux 默认
    #[default]
    Bluez,
    /// btleplug，跨平台备选
    Btle,
}

impl RadioBackend {
    pub fn name(&self) -> &'static str {
        match self {
            RadioBackend::Bluez => "bluez",
            RadioBackend::Btle => "btleplug",
        }
    }
}

/// 应用设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// 设备名称（日志和状态显示用）
    pub device_name: String,
    /// 射频后端
    pub backend: RadioBackend,
    /// 适配器名称（None 使用默认适配器，仅 bluez 后端生效）
    pub adapter: Option<String>,
    /// 默认日志级别（被 RUST_LOG 覆盖）
    pub log_level: LogLevel,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            device_name: get_default_device_name(),
            backend: RadioBackend::default(),
            adapter: None,
            log_level: LogLevel::default(),
        }
    }
}

impl AppSettings {
    /// 获取配置文件路径
    fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cattyscan");
        config_dir.join("settings.toml")
    }

    /// 加载设置（如果文件不存在则使用默认值）
    pub fn load() -> Self {
        let path = Self::config_path();
        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(settings) => {
                        debug!("Loaded settings from {:?}", path);
                        return settings;
                    }
                    Err(e) => {
                        log::warn!("Failed to parse settings: {}, using defaults", e);
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read settings file: {}, using defaults", e);
                }
            }
        }
        Self::default()
    }

    /// 保存设置
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        debug!("Saved settings to {:?}", path);
        Ok(())
    }
}

/// 获取默认设备名称（主机名）
fn get_default_device_name() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "Cattyscan".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = AppSettings::default();
        assert_eq!(settings.backend, RadioBackend::Bluez);
        assert!(settings.adapter.is_none());
        assert_eq!(settings.log_level, LogLevel::Info);
        assert!(!settings.device_name.is_empty());
    }

    #[test]
    fn test_backend_name() {
        assert_eq!(RadioBackend::Bluez.name(), "bluez");
        assert_eq!(RadioBackend::Btle.name(), "btleplug");
    }

    #[test]
    fn test_settings_toml_roundtrip() {
        let settings = AppSettings {
            device_name: "test-box".to_string(),
            backend: RadioBackend::Btle,
            adapter: Some("hci1".to_string()),
            log_level: LogLevel::Debug,
        };

        let content = toml::to_string_pretty(&settings).unwrap();
        let parsed: AppSettings = toml::from_str(&content).unwrap();

        assert_eq!(parsed.device_name, "test-box");
        assert_eq!(parsed.backend, RadioBackend::Btle);
        assert_eq!(parsed.adapter.as_deref(), Some("hci1"));
        assert_eq!(parsed.log_level, LogLevel::Debug);
    }
}
