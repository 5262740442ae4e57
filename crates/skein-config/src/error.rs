use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid skein config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot render skein config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
