use std::path::PathBuf;

use dirs::data_dir;

/// Per-user data directory for parlance.
pub fn get_data_dir() -> PathBuf {
    data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("parlance")
}

/// Default location of the stored chat history
pub fn get_default_history_path() -> PathBuf {
    get_data_dir().join("history.json")
}

/// Default location of the optional streamer config file
pub fn get_default_config_path() -> PathBuf {
    get_data_dir().join("config.json")
}
