use chrono::{NaiveDate, Utc};
use sqlx::PgPool;

use crate::models::settings::DataRetention;

const RETENTION_CLASSES: [DataRetention; 4] = [
    DataRetention::ThreeMonths,
    DataRetention::SixMonths,
    DataRetention::OneYear,
    DataRetention::TwoYears,
];

/// Start the retention worker (purges mood history past each user's window).
pub fn spawn_retention_worker(db: PgPool, period_secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(period_secs));
        loop {
            interval.tick().await;
            match purge_expired_moods(&db, Utc::now().date_naive()).await {
                Ok(count) => {
                    if count > 0 {
                        tracing::info!(purged = count, "Retention sweep: purged mood entries");
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Retention sweep error");
                }
            }
        }
    });
}

/// Delete entries older than the owner's retention window. Users with no
/// settings row fall under the default window.
pub async fn purge_expired_moods(db: &PgPool, today: NaiveDate) -> Result<u64, sqlx::Error> {
    let mut purged = 0;

    for class in RETENTION_CLASSES {
        let Some(cutoff) = class.cutoff(today) else {
            continue;
        };

        let result = sqlx::query(
            r#"
            DELETE FROM daily_moods m
            WHERE m.mood_date < $1
              AND COALESCE(
                    (SELECT s.data_retention FROM user_settings s WHERE s.user_id = m.user_id),
                    $3
                  ) = $2
            "#,
        )
        .bind(cutoff)
        .bind(class)
        .bind(DataRetention::default())
        .execute(db)
        .await?;

        purged += result.rows_affected();
    }

    Ok(purged)
}
