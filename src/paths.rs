use std::path::PathBuf;

/// Returns the user's home directory, honoring `FLOWVIZ_HOME` first.
pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("FLOWVIZ_HOME")
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME")
                .or_else(|| std::env::var_os("USERPROFILE"))
                .map(PathBuf::from)
        })
}

/// Returns the default path to ~/.env (or $FLOWVIZ_HOME/.env if set).
pub fn home_env_path() -> Option<PathBuf> {
    home_dir().map(|mut dir| {
        dir.push(".env");
        dir
    })
}

/// Returns the data directory; log files go under `logs/` here.
pub fn data_dir() -> PathBuf {
    if let Some(mut dir) = home_dir() {
        dir.push(".flowviz");
        dir
    } else {
        PathBuf::from(".flowviz")
    }
}
