//! 统一 API 错误码定义

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::errors::QuickslugError;

/// API 错误码枚举
///
/// 使用 serde_repr 序列化为数字，按千位分域：
/// - 0: 成功
/// - 1000-1099: 通用错误
/// - 2000-2099: 认证与账户错误
/// - 3000-3099: 链接错误
/// - 4000-4099: 配额错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum ErrorCode {
    // 成功
    Success = 0,

    // 通用错误 1000-1099
    BadRequest = 1000,
    Unauthorized = 1001,
    Forbidden = 1003,
    NotFound = 1004,
    InternalServerError = 1005,
    ServiceUnavailable = 1030,

    // 认证与账户错误 2000-2099
    AccountExists = 2010,
    UsernameTaken = 2011,

    // 链接错误 3000-3099
    SlugTaken = 3001,
    LinkExpired = 3007,
    SlugGenerationFailed = 3008,

    // 配额错误 4000-4099
    QuotaExceeded = 4000,
}

impl From<&QuickslugError> for ErrorCode {
    fn from(err: &QuickslugError) -> Self {
        match err {
            QuickslugError::Validation(_) => ErrorCode::BadRequest,
            QuickslugError::Unauthorized(_) => ErrorCode::Unauthorized,
            QuickslugError::Forbidden(_) => ErrorCode::Forbidden,
            QuickslugError::NotFound(_) => ErrorCode::NotFound,
            QuickslugError::Gone(_) => ErrorCode::LinkExpired,
            QuickslugError::SlugTaken(_) => ErrorCode::SlugTaken,
            QuickslugError::UsernameTaken(_) => ErrorCode::UsernameTaken,
            QuickslugError::AccountExists(_) => ErrorCode::AccountExists,
            QuickslugError::QuotaExceeded(_) => ErrorCode::QuotaExceeded,
            QuickslugError::SlugGeneration(_) => ErrorCode::SlugGenerationFailed,
            QuickslugError::DatabaseConnection(_) => ErrorCode::ServiceUnavailable,
            QuickslugError::DatabaseConfig(_)
            | QuickslugError::DatabaseOperation(_)
            | QuickslugError::Serialization(_) => ErrorCode::InternalServerError,
        }
    }
}

impl From<QuickslugError> for ErrorCode {
    fn from(err: QuickslugError) -> Self {
        ErrorCode::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_number() {
        assert_eq!(serde_json::to_string(&ErrorCode::Success).unwrap(), "0");
        assert_eq!(serde_json::to_string(&ErrorCode::SlugTaken).unwrap(), "3001");
        let code: ErrorCode = serde_json::from_str("4000").unwrap();
        assert_eq!(code, ErrorCode::QuotaExceeded);
    }

    #[test]
    fn test_from_error() {
        assert_eq!(
            ErrorCode::from(&QuickslugError::slug_taken("This slug is already taken")),
            ErrorCode::SlugTaken
        );
        assert_eq!(
            ErrorCode::from(&QuickslugError::username_taken("This username is already taken")),
            ErrorCode::UsernameTaken
        );
        // 错误码由变体决定，与提示文案无关
        assert_eq!(
            ErrorCode::from(&QuickslugError::account_exists("Email is registered")),
            ErrorCode::AccountExists
        );
        assert_eq!(
            ErrorCode::from(&QuickslugError::slug_taken("Pick another one")),
            ErrorCode::SlugTaken
        );
        assert_eq!(
            ErrorCode::from(&QuickslugError::slug_generation("exhausted")),
            ErrorCode::SlugGenerationFailed
        );
        assert_eq!(
            ErrorCode::from(&QuickslugError::gone("Link has expired")),
            ErrorCode::LinkExpired
        );
        assert_eq!(
            ErrorCode::from(QuickslugError::database_operation("boom")),
            ErrorCode::InternalServerError
        );
    }
}
