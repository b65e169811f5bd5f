use std::fmt;

use actix_web::http::StatusCode;

#[derive(Debug, Clone)]
pub enum QuickslugError {
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    Validation(String),
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    SlugTaken(String),
    UsernameTaken(String),
    AccountExists(String),
    Gone(String),
    QuotaExceeded(String),
    SlugGeneration(String),
    Serialization(String),
}

impl QuickslugError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            QuickslugError::DatabaseConfig(_) => "E001",
            QuickslugError::DatabaseConnection(_) => "E002",
            QuickslugError::DatabaseOperation(_) => "E003",
            QuickslugError::Validation(_) => "E004",
            QuickslugError::NotFound(_) => "E005",
            QuickslugError::Unauthorized(_) => "E006",
            QuickslugError::Forbidden(_) => "E007",
            QuickslugError::SlugTaken(_) => "E008",
            QuickslugError::UsernameTaken(_) => "E009",
            QuickslugError::AccountExists(_) => "E010",
            QuickslugError::Gone(_) => "E011",
            QuickslugError::QuotaExceeded(_) => "E012",
            QuickslugError::SlugGeneration(_) => "E013",
            QuickslugError::Serialization(_) => "E014",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            QuickslugError::DatabaseConfig(_) => "Database Configuration Error",
            QuickslugError::DatabaseConnection(_) => "Database Connection Error",
            QuickslugError::DatabaseOperation(_) => "Database Operation Error",
            QuickslugError::Validation(_) => "Validation Error",
            QuickslugError::NotFound(_) => "Resource Not Found",
            QuickslugError::Unauthorized(_) => "Unauthorized",
            QuickslugError::Forbidden(_) => "Forbidden",
            QuickslugError::SlugTaken(_) => "Slug Conflict",
            QuickslugError::UsernameTaken(_) => "Username Conflict",
            QuickslugError::AccountExists(_) => "Account Conflict",
            QuickslugError::Gone(_) => "Resource Gone",
            QuickslugError::QuotaExceeded(_) => "Quota Exceeded",
            QuickslugError::SlugGeneration(_) => "Slug Generation Error",
            QuickslugError::Serialization(_) => "Serialization Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            QuickslugError::DatabaseConfig(msg)
            | QuickslugError::DatabaseConnection(msg)
            | QuickslugError::DatabaseOperation(msg)
            | QuickslugError::Validation(msg)
            | QuickslugError::NotFound(msg)
            | QuickslugError::Unauthorized(msg)
            | QuickslugError::Forbidden(msg)
            | QuickslugError::SlugTaken(msg)
            | QuickslugError::UsernameTaken(msg)
            | QuickslugError::AccountExists(msg)
            | QuickslugError::Gone(msg)
            | QuickslugError::QuotaExceeded(msg)
            | QuickslugError::SlugGeneration(msg)
            | QuickslugError::Serialization(msg) => msg,
        }
    }

    /// 对应的 HTTP 状态码
    pub fn http_status(&self) -> StatusCode {
        match self {
            QuickslugError::Validation(_) => StatusCode::BAD_REQUEST,
            QuickslugError::NotFound(_) => StatusCode::NOT_FOUND,
            QuickslugError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            QuickslugError::Forbidden(_) => StatusCode::FORBIDDEN,
            QuickslugError::SlugTaken(_)
            | QuickslugError::UsernameTaken(_)
            | QuickslugError::AccountExists(_) => StatusCode::CONFLICT,
            QuickslugError::Gone(_) => StatusCode::GONE,
            QuickslugError::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            QuickslugError::DatabaseConfig(_)
            | QuickslugError::DatabaseConnection(_)
            | QuickslugError::DatabaseOperation(_)
            | QuickslugError::SlugGeneration(_)
            | QuickslugError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 是否属于服务端内部错误（对外隐藏细节）
    pub fn is_internal(&self) -> bool {
        self.http_status().is_server_error()
    }

    /// 格式化为彩色输出（用于启动失败时的终端提示）
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

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for QuickslugError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for QuickslugError {}

// 便捷的构造函数
impl QuickslugError {
    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        QuickslugError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        QuickslugError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        QuickslugError::DatabaseOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        QuickslugError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        QuickslugError::NotFound(msg.into())
    }

    pub fn unauthorized<T: Into<String>>(msg: T) -> Self {
        QuickslugError::Unauthorized(msg.into())
    }

    pub fn forbidden<T: Into<String>>(msg: T) -> Self {
        QuickslugError::Forbidden(msg.into())
    }

    pub fn slug_taken<T: Into<String>>(msg: T) -> Self {
        QuickslugError::SlugTaken(msg.into())
    }

    pub fn username_taken<T: Into<String>>(msg: T) -> Self {
        QuickslugError::UsernameTaken(msg.into())
    }

    pub fn account_exists<T: Into<String>>(msg: T) -> Self {
        QuickslugError::AccountExists(msg.into())
    }

    pub fn gone<T: Into<String>>(msg: T) -> Self {
        QuickslugError::Gone(msg.into())
    }

    pub fn quota_exceeded<T: Into<String>>(msg: T) -> Self {
        QuickslugError::QuotaExceeded(msg.into())
    }

    pub fn slug_generation<T: Into<String>>(msg: T) -> Self {
        QuickslugError::SlugGeneration(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        QuickslugError::Serialization(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for QuickslugError {
    fn from(err: sea_orm::DbErr) -> Self {
        QuickslugError::DatabaseOperation(err.to_string())
    }
}

impl From<serde_json::Error> for QuickslugError {
    fn from(err: serde_json::Error) -> Self {
        QuickslugError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, QuickslugError>;
