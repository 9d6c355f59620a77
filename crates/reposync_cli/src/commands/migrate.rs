use reposync::db;
use reposync::migration::{Migrator, MigratorTrait};

use crate::MigrateAction;

pub(crate) async fn handle_migrate(
    action: MigrateAction,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = db::connect(database_url).await?;

    match action {
        MigrateAction::Up => {
            let pending = Migrator::get_pending_migrations(&db).await?.len();
            Migrator::up(&db, None).await?;
            println!("Applied {pending} pending migration(s).");
        }
        MigrateAction::Down => {
            Migrator::down(&db, Some(1)).await?;
            println!("Rolled back the last migration.");
        }
        MigrateAction::Status => {
            for migration in Migrator::get_migration_with_status(&db).await? {
                println!("{:<48} {}", migration.name(), migration.status());
            }
        }
        MigrateAction::Fresh => {
            Migrator::fresh(&db).await?;
            println!(
                "Dropped all tables and reapplied {} migration(s).",
                Migrator::migrations().len()
            );
        }
    }

    Ok(())
}
