use std::fmt;

#[derive(Debug, Clone)]
pub enum QrLinkerError {
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    FileOperation(String),
    Validation(String),
    NotFound(String),
    Gone(String),
    Serialization(String),
    DateParse(String),
}

impl QrLinkerError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            QrLinkerError::DatabaseConfig(_) => "E001",
            QrLinkerError::DatabaseConnection(_) => "E002",
            QrLinkerError::DatabaseOperation(_) => "E003",
            QrLinkerError::FileOperation(_) => "E004",
            QrLinkerError::Validation(_) => "E005",
            QrLinkerError::NotFound(_) => "E006",
            QrLinkerError::Gone(_) => "E007",
            QrLinkerError::Serialization(_) => "E008",
            QrLinkerError::DateParse(_) => "E009",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            QrLinkerError::DatabaseConfig(_) => "Database Configuration Error",
            QrLinkerError::DatabaseConnection(_) => "Database Connection Error",
            QrLinkerError::DatabaseOperation(_) => "Database Operation Error",
            QrLinkerError::FileOperation(_) => "File Operation Error",
            QrLinkerError::Validation(_) => "Validation Error",
            QrLinkerError::NotFound(_) => "Resource Not Found",
            QrLinkerError::Gone(_) => "Resource Deactivated",
            QrLinkerError::Serialization(_) => "Serialization Error",
            QrLinkerError::DateParse(_) => "Date Parse Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            QrLinkerError::DatabaseConfig(msg)
            | QrLinkerError::DatabaseConnection(msg)
            | QrLinkerError::DatabaseOperation(msg)
            | QrLinkerError::FileOperation(msg)
            | QrLinkerError::Validation(msg)
            | QrLinkerError::NotFound(msg)
            | QrLinkerError::Gone(msg)
            | QrLinkerError::Serialization(msg)
            | QrLinkerError::DateParse(msg) => msg,
        }
    }

    /// 格式化为彩色输出（用于终端）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出（用于日志）
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for QrLinkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for QrLinkerError {}

// 便捷的构造函数
impl QrLinkerError {
    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        QrLinkerError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        QrLinkerError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        QrLinkerError::DatabaseOperation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        QrLinkerError::FileOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        QrLinkerError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        QrLinkerError::NotFound(msg.into())
    }

    pub fn gone<T: Into<String>>(msg: T) -> Self {
        QrLinkerError::Gone(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        QrLinkerError::Serialization(msg.into())
    }

    pub fn date_parse<T: Into<String>>(msg: T) -> Self {
        QrLinkerError::DateParse(msg.into())
    }
}

impl From<sea_orm::DbErr> for QrLinkerError {
    fn from(err: sea_orm::DbErr) -> Self {
        QrLinkerError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for QrLinkerError {
    fn from(err: std::io::Error) -> Self {
        QrLinkerError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for QrLinkerError {
    fn from(err: serde_json::Error) -> Self {
        QrLinkerError::Serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for QrLinkerError {
    fn from(err: chrono::ParseError) -> Self {
        QrLinkerError::DateParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, QrLinkerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_and_gone_are_distinct() {
        let nf = QrLinkerError::not_found("abc");
        let gone = QrLinkerError::gone("abc");
        assert_ne!(nf.code(), gone.code());
        assert_eq!(nf.message(), "abc");
        assert_eq!(gone.format_simple(), "Resource Deactivated: abc");
    }

    #[test]
    fn test_db_err_conversion() {
        let err: QrLinkerError = sea_orm::DbErr::Custom("boom".to_string()).into();
        assert!(matches!(err, QrLinkerError::DatabaseOperation(_)));
        assert!(err.message().contains("boom"));
    }
}
