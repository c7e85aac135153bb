use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "CareLink";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default bind address for the portal server.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8520";

/// Get the application data directory.
/// `CARELINK_DATA_DIR` overrides the default of ~/CareLink/.
pub fn app_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CARELINK_DATA_DIR") {
        return PathBuf::from(dir);
    }
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("CareLink")
}

/// Get the portal database path.
pub fn database_path() -> PathBuf {
    app_data_dir().join("carelink.db")
}

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    "info,carelink=debug"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_path_under_app_data() {
        let db = database_path();
        let app = app_data_dir();
        assert!(db.starts_with(app));
        assert!(db.ends_with("carelink.db"));
    }

    #[test]
    fn app_name_is_carelink() {
        assert_eq!(APP_NAME, "CareLink");
    }
}
