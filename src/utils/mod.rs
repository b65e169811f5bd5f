pub mod ip;
pub mod password;
pub mod time_parser;
pub mod url_validator;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

pub use time_parser::{ExpiryPreset, TimeParser};

/// 短码字符集（与 nanoid 默认字母表一致）
pub const SLUG_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

pub const CUSTOM_SLUG_MIN_LEN: usize = 3;
pub const CUSTOM_SLUG_MAX_LEN: usize = 32;

/// 查找阶段允许的最长短码，与数据库列宽一致
pub const SLUG_MAX_LEN: usize = 64;

/// 始终保留的路由前缀
pub const BUILTIN_RESERVED_SLUGS: &[&str] = &["api", "health"];

/// 生成随机短码
pub fn generate_slug(length: usize) -> String {
    std::iter::repeat_with(|| SLUG_ALPHABET[rand::random_range(0..SLUG_ALPHABET.len())] as char)
        .take(length)
        .collect()
}

fn is_slug_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// 短码格式检查（重定向查找前使用，不访问存储）
pub fn is_valid_slug_format(slug: &str) -> bool {
    !slug.is_empty() && slug.len() <= SLUG_MAX_LEN && slug.chars().all(is_slug_char)
}

/// 是否为保留短码（大小写不敏感）
pub fn is_reserved_slug(slug: &str, extra: &[String]) -> bool {
    BUILTIN_RESERVED_SLUGS
        .iter()
        .any(|r| r.eq_ignore_ascii_case(slug))
        || extra.iter().any(|r| r.eq_ignore_ascii_case(slug))
}

/// 校验用户自定义短码，返回不可用原因
pub fn check_custom_slug(slug: &str, reserved: &[String]) -> Result<(), String> {
    let len = slug.chars().count();
    if !(CUSTOM_SLUG_MIN_LEN..=CUSTOM_SLUG_MAX_LEN).contains(&len) {
        return Err(format!(
            "Slug must be between {} and {} characters",
            CUSTOM_SLUG_MIN_LEN, CUSTOM_SLUG_MAX_LEN
        ));
    }
    if !slug.chars().all(is_slug_char) {
        return Err(
            "Slug may only contain letters, digits, underscores and hyphens".to_string(),
        );
    }
    if is_reserved_slug(slug, reserved) {
        return Err(format!("Slug '{}' is reserved", slug));
    }
    Ok(())
}

/// 生成 URL 安全的随机令牌（base64url，无填充）
pub fn generate_secure_token(bytes: usize) -> String {
    let buf: Vec<u8> = std::iter::repeat_with(rand::random::<u8>)
        .take(bytes)
        .collect();
    URL_SAFE_NO_PAD.encode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_slug_alphabet_and_length() {
        for len in [4, 8, 16] {
            let slug = generate_slug(len);
            assert_eq!(slug.len(), len);
            assert!(slug.bytes().all(|b| SLUG_ALPHABET.contains(&b)));
            assert!(is_valid_slug_format(&slug));
        }
    }

    #[test]
    fn test_slug_format() {
        assert!(is_valid_slug_format("abc"));
        assert!(is_valid_slug_format("a"));
        assert!(is_valid_slug_format("My_Link-2"));
        assert!(!is_valid_slug_format(""));
        assert!(!is_valid_slug_format("has space"));
        assert!(!is_valid_slug_format("slash/y"));
        assert!(!is_valid_slug_format("ünï"));
        assert!(!is_valid_slug_format(&"a".repeat(SLUG_MAX_LEN + 1)));
    }

    #[test]
    fn test_custom_slug_rules() {
        let extra = vec!["admin".to_string()];
        assert!(check_custom_slug("my-link", &extra).is_ok());
        assert!(check_custom_slug("abc", &extra).is_ok());
        assert!(check_custom_slug(&"x".repeat(32), &extra).is_ok());

        assert!(check_custom_slug("ab", &extra).is_err());
        assert!(check_custom_slug(&"x".repeat(33), &extra).is_err());
        assert!(check_custom_slug("bad slug", &extra).is_err());
        assert!(check_custom_slug("API", &extra).is_err());
        assert!(check_custom_slug("health", &extra).is_err());
        assert!(check_custom_slug("Admin", &extra).is_err());
    }

    #[test]
    fn test_secure_token() {
        let a = generate_secure_token(32);
        let b = generate_secure_token(32);
        assert_ne!(a, b);
        // 32 字节 -> 43 个 base64url 字符
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
