use std::path::PathBuf;

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the application
#[derive(Debug)]
pub enum Error {
    ManifestError { file: PathBuf, message: String },
    InvalidRule { field: String, message: String },
    InvalidAction(String),
    SerializationError(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::ManifestError { file, message } => {
                write!(f, "路由清单错误 {}: {}", file.display(), message)
            }
            Error::InvalidRule { field, message } => {
                write!(f, "无效的校验规则 {}: {}", field, message)
            }
            Error::InvalidAction(action) => write!(f, "无效的处理器引用: {}", action),
            Error::SerializationError(msg) => write!(f, "序列化错误: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(format!("JSON 序列化错误: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::SerializationError(format!("YAML 序列化错误: {}", err))
    }
}
