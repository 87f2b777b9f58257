// Helper functions for safe logging

/// Masks email addresses for safe logging
/// Prevents sensitive data exposure while preserving debugging utility
///
/// # Example
/// ```
/// let masked = safe_email_log("user@example.com");
/// // Returns: "u***@example.com"
/// ```
pub fn safe_email_log(email: &str) -> String {
    if email.chars().count() > 3 {
        let parts: Vec<&str> = email.split('@').collect();
        // First char, not first byte; local parts can be multibyte
        match (parts.len() == 2).then(|| parts[0].chars().next()).flatten() {
            Some(first) => format!("{}***@{}", first, parts[1]),
            None => "***@***.***".to_string(),
        }
    } else {
        "***@***.***".to_string()
    }
}

/// Masks tokens for safe logging
/// Shows only first and last 4 characters
///
/// # Example
/// ```
/// let masked = safe_token_log("ya29.a0AfH6SMBx7named");
/// // Returns: "ya29...amed"
/// ```
pub fn safe_token_log(token: &str) -> String {
    let count = token.chars().count();
    if count > 8 {
        let head: String = token.chars().take(4).collect();
        let tail: String = token.chars().skip(count - 4).collect();
        format!("{}...{}", head, tail)
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_email_log_masks_local_part() {
        assert_eq!(safe_email_log("user@example.com"), "u***@example.com");
        assert_eq!(safe_email_log("ab"), "***@***.***");
        assert_eq!(safe_email_log("not-an-email"), "***@***.***");
    }

    #[test]
    fn test_safe_email_log_handles_multibyte_local_part() {
        assert_eq!(safe_email_log("éclair@example.com"), "é***@example.com");
        assert_eq!(safe_email_log("用户@example.com"), "用***@example.com");
    }

    #[test]
    fn test_safe_token_log_masks_middle() {
        assert_eq!(safe_token_log("abcdefghijkl"), "abcd...ijkl");
        assert_eq!(safe_token_log("short"), "***");
    }

    #[test]
    fn test_safe_token_log_handles_multibyte_tokens() {
        assert_eq!(safe_token_log("абвгдежзик"), "абвг...жзик");
        assert_eq!(safe_token_log("токен"), "***");
    }
}
