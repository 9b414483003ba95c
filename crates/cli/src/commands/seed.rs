use campusmart_db::{migrations, DemoSeedDataset, SeedResult};

use crate::commands::{finish, with_database, CommandResult, Failure};

pub fn run() -> CommandResult {
    let outcome = with_database(|pool| async move {
        migrations::run_pending(&pool).await.map_err(Failure::migration)?;

        let seeded = DemoSeedDataset::load(&pool)
            .await
            .map_err(|error| Failure::new("seed_execution", 5, error))?;
        let verification = DemoSeedDataset::verify(&pool)
            .await
            .map_err(|error| Failure::new("seed_verification", 6, error))?;

        if !verification.all_present {
            let message = verification_message(&verification.failed_checks());
            return Err(Failure::new("seed_verification", 6, message));
        }
        Ok(summary(&seeded))
    });

    finish("seed", outcome)
}

fn summary(seeded: &SeedResult) -> String {
    format!(
        "demo marketplace loaded: {} users, {} items, {} requests (pending, approved, rejected)",
        seeded.users, seeded.items, seeded.requests
    )
}

fn verification_message(failed_checks: &[&str]) -> String {
    match failed_checks {
        [] => "Some seed data failed to load".to_string(),
        labels => format!("Seed verification failed for checks: {}", labels.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::{summary, verification_message};
    use campusmart_db::SeedResult;

    #[test]
    fn verification_message_names_missing_rows() {
        let message = verification_message(&["item-2", "request-3-rejected"]);

        assert_eq!(message, "Seed verification failed for checks: item-2, request-3-rejected");
    }

    #[test]
    fn verification_message_without_labels_is_generic() {
        assert_eq!(verification_message(&[]), "Some seed data failed to load");
    }

    #[test]
    fn summary_counts_every_table() {
        let message = summary(&SeedResult { users: 3, items: 3, requests: 3 });

        assert_eq!(
            message,
            "demo marketplace loaded: 3 users, 3 items, 3 requests (pending, approved, rejected)"
        );
    }
}
