mod ab_testing_service;
mod audit_service;
mod auth_service;
pub mod calculator_service;
mod dashboard_service;
mod gtm_service;
mod lead_service;
mod page_service;
mod tracking_service;
mod webhook_service;

/// Zero-based row offset for 1-based pagination. Widens before the multiply
/// so an oversized page number cannot overflow.
pub(crate) fn page_offset(page: u32, limit: u32) -> i64 {
    (i64::from(page) - 1).max(0) * i64::from(limit)
}

pub use ab_testing_service::*;
pub use audit_service::*;
pub use auth_service::*;
pub use calculator_service::*;
pub use dashboard_service::*;
pub use gtm_service::*;
pub use lead_service::*;
pub use page_service::*;
pub use tracking_service::*;
pub use webhook_service::*;

#[cfg(test)]
mod tests {
    use super::page_offset;

    #[test]
    fn test_page_offset_widens_before_multiply() {
        assert_eq!(page_offset(1, 20), 0);
        assert_eq!(page_offset(3, 20), 40);
        assert_eq!(page_offset(0, 20), 0);
        assert_eq!(page_offset(u32::MAX, 100), (i64::from(u32::MAX) - 1) * 100);
    }
}
