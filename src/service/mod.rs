pub mod booking_service;
pub mod decision_service;
pub mod error;
pub mod match_service;
pub mod notification_service;
pub mod payment_provider;
pub mod rate_limiter;
