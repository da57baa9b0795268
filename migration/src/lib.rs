pub use sea_orm_migration::prelude::*;

pub mod entities;
mod m20261001_000001_qr_codes;
mod m20261001_000002_scan_events;
mod m20261001_000003_session_first_seen;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_qr_codes::Migration),
            Box::new(m20261001_000002_scan_events::Migration),
            Box::new(m20261001_000003_session_first_seen::Migration),
        ]
    }
}
