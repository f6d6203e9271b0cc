use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("StblCore error: {0}")]
    Core(#[from] stblcore::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("settings parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("settings write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid project metadata: {0}")]
    InvalidMetadata(String),

    #[error("project {uuid} string table was accessed before being loaded")]
    ProjectNotLoaded { uuid: String },

    #[error("no data stored under '{0}'")]
    MissingRecord(String),

    #[error("stale write to '{key}': version {version} is older than {applied}")]
    StaleWrite {
        key: String,
        version: u64,
        applied: u64,
    },

    #[error("{0}")]
    Upload(String),
}

pub type Result<T> = std::result::Result<T, Error>;
