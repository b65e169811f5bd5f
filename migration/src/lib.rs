pub use sea_orm_migration::prelude::*;

pub mod entities;
mod m20261017_000001_users;
mod m20261017_000002_links;
mod m20261017_000003_click_events;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261017_000001_users::Migration),
            Box::new(m20261017_000002_links::Migration),
            Box::new(m20261017_000003_click_events::Migration),
        ]
    }
}
