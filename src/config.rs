use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Carnet";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Bearer-token lifetime.
pub const TOKEN_TTL_HOURS: i64 = 12;

/// Minimum accepted password length at registration.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Get the application data directory
/// ~/Carnet/ on all platforms (user-visible, holds the database)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join(APP_NAME)
}

/// Path of the SQLite database file
pub fn database_path() -> PathBuf {
    app_data_dir().join("carnet.db")
}

/// Listen address, overridable via CARNET_ADDR
pub fn bind_addr() -> SocketAddr {
    std::env::var("CARNET_ADDR")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8420)))
}

/// Default tracing filter when RUST_LOG is unset
pub fn default_log_filter() -> &'static str {
    "carnet=info,tower_http=info"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("Carnet"));
    }

    #[test]
    fn database_path_under_data_dir() {
        let path = database_path();
        assert!(path.starts_with(app_data_dir()));
        assert!(path.ends_with("carnet.db"));
    }

    #[test]
    fn default_bind_addr_is_loopback() {
        let addr = bind_addr();
        assert!(addr.ip().is_loopback() || std::env::var("CARNET_ADDR").is_ok());
    }
}
