use campusmart_db::migrations;

use crate::commands::{finish, with_database, CommandResult, Failure};

pub fn run() -> CommandResult {
    let outcome = with_database(|pool| async move {
        migrations::run_pending(&pool).await.map_err(Failure::migration)?;
        Ok("applied pending migrations".to_string())
    });

    finish("migrate", outcome)
}
