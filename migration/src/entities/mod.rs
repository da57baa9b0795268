pub mod qr_code;
pub mod qr_scan;
pub mod session_first_seen;
pub mod social_click;

pub use qr_code::Entity as QrCodeEntity;
pub use qr_scan::Entity as QrScanEntity;
pub use session_first_seen::Entity as SessionFirstSeenEntity;
pub use social_click::Entity as SocialClickEntity;
