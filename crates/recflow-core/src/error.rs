pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown config key: {key}")]
    UnknownConfigKey { key: String },

    #[error("Invalid value for config key `{key}`: {message}")]
    InvalidConfigValue { key: String, message: String },

    #[error("Unknown record: {record_id}")]
    UnknownRecord { record_id: String },

    #[error("Unknown table: {table_id}")]
    UnknownTable { table_id: String },
}
