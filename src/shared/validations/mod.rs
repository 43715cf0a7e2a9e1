/// Clamp page / page size query values into sane bounds (page >= 1, size 1..=100).
pub fn validate_pagination(page: Option<u32>, page_size: Option<u32>) -> (u32, u32) {
    let page = page.unwrap_or(1).max(1);
    let page_size = page_size.unwrap_or(20).clamp(1, 100);
    (page, page_size)
}

/// Row offset of `page` (1-based); computed in `u64` so huge pages cannot overflow.
pub fn page_offset(page: u32, page_size: u32) -> u64 {
    u64::from(page.saturating_sub(1)) * u64::from(page_size)
}

/// Lower-case and trim an email so uniqueness checks are case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
