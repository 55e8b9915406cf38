// /learnhub-lms/services/payments-service/src/utils/validator.rs

use bigdecimal::BigDecimal;
use once_cell::sync::Lazy;
use regex::Regex;
use crate::utils::constants::constants::MAX_PAGE_SIZE;
use crate::utils::error::{AppError, AppResult};

static COURSE_SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap());

static PROMO_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{3,32}$").unwrap());

/// Validasi course slug (lowercase kebab-case, mis. `ai-101`)
pub fn validate_course_slug(slug: &str) -> AppResult<()> {
    if slug.is_empty() || slug.len() > 100 {
        return Err(AppError::BadRequest("Course slug tidak valid".to_string()));
    }

    if !COURSE_SLUG_RE.is_match(slug) {
        return Err(AppError::BadRequest(
            format!("Course slug '{}' tidak valid (harus lowercase kebab-case)", slug)
        ));
    }
    Ok(())
}

/// Validasi format promo code
pub fn validate_promo_code(code: &str) -> AppResult<()> {
    if !PROMO_CODE_RE.is_match(code) {
        return Err(AppError::BadRequest(
            "Promo code hanya boleh huruf, angka, dash, underscore (3-32 karakter)".to_string()
        ));
    }
    Ok(())
}

/// Validasi amount harus positif
pub fn validate_positive_amount(amount: &BigDecimal, field_name: &str) -> AppResult<()> {
    if amount <= &BigDecimal::from(0) {
        return Err(AppError::BadRequest(format!("{} harus lebih besar dari 0", field_name)));
    }
    Ok(())
}

/// Validasi payment reference / gateway payment id dari client
pub fn validate_payment_identifier(value: &str, field_name: &str) -> AppResult<()> {
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{} tidak boleh kosong", field_name)));
    }

    if value.len() > 100 {
        return Err(AppError::BadRequest(format!("{} terlalu panjang", field_name)));
    }

    if !value.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
        return Err(AppError::BadRequest(format!("Format {} tidak valid", field_name)));
    }

    Ok(())
}

/// Validasi status filter untuk admin payment list
pub fn validate_record_status(status: &str) -> AppResult<()> {
    let valid_statuses = ["pending", "completed", "failed", "rejected"];

    if !valid_statuses.contains(&status) {
        return Err(AppError::BadRequest(
            format!("Payment status '{}' tidak valid. Valid: {:?}", status, valid_statuses)
        ));
    }
    Ok(())
}

/// Validasi pagination parameters
pub fn validate_pagination(page: u32, limit: u32) -> AppResult<(u32, u32)> {
    if page == 0 {
        return Err(AppError::BadRequest("Page harus dimulai dari 1".to_string()));
    }

    if limit == 0 {
        return Err(AppError::BadRequest("Limit harus lebih besar dari 0".to_string()));
    }

    if limit > MAX_PAGE_SIZE {
        return Err(AppError::BadRequest(format!(
            "Limit maksimal {} items per page", MAX_PAGE_SIZE
        )));
    }

    Ok((page, limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    #[test]
    fn test_validate_course_slug() {
        assert!(validate_course_slug("ai-101").is_ok());
        assert!(validate_course_slug("fullstack-web-dev").is_ok());
        assert!(validate_course_slug("AI-101").is_err());
        assert!(validate_course_slug("ai_101").is_err());
        assert!(validate_course_slug("-ai").is_err());
        assert!(validate_course_slug("").is_err());
    }

    #[test]
    fn test_validate_promo_code() {
        assert!(validate_promo_code("LAUNCH50").is_ok());
        assert!(validate_promo_code("early-bird_2").is_ok());
        assert!(validate_promo_code("ab").is_err());
        assert!(validate_promo_code("has space").is_err());
    }

    #[test]
    fn test_validate_positive_amount() {
        assert!(validate_positive_amount(&BigDecimal::from(100), "amount").is_ok());
        assert!(validate_positive_amount(&BigDecimal::from(0), "amount").is_err());
        assert!(validate_positive_amount(&BigDecimal::from(-50), "amount").is_err());
    }

    #[test]
    fn test_validate_payment_identifier() {
        assert!(validate_payment_identifier("bank_1000", "ref").is_ok());
        assert!(validate_payment_identifier("pay_abc123", "payment_id").is_ok());
        assert!(validate_payment_identifier("", "ref").is_err());
        assert!(validate_payment_identifier("a".repeat(101).as_str(), "ref").is_err());
        assert!(validate_payment_identifier("pay id", "payment_id").is_err());
    }

    #[test]
    fn test_validate_pagination() {
        assert!(validate_pagination(1, 10).is_ok());
        assert!(validate_pagination(0, 10).is_err());
        assert!(validate_pagination(1, 0).is_err());
        assert!(validate_pagination(1, 101).is_err());
    }
}
