use std::path::PathBuf;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "FITHOUSE_DATA_DIR";

/// Pick the data directory: explicit flag, then `FITHOUSE_DATA_DIR`, then
/// the platform data dir, then `./.fithouse`.
pub fn resolve_data_dir(flag: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = flag {
        return dir;
    }
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    default_data_dir()
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("fithouse"))
        .unwrap_or_else(|| PathBuf::from(".fithouse"))
}
