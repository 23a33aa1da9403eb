mod common;

use axum::http::StatusCode;
use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

// Own binary: every user in the database is created by this test.
#[tokio::test]
async fn publish_sends_exactly_one_notification_per_active_user() {
    let app = common::app().await;
    let mut active = Vec::new();
    for suffix in ["count_a", "count_b", "count_c"] {
        active.push(app.create_user(suffix).await);
    }
    let deleted = app.create_user("count_deleted").await;
    sqlx::query("UPDATE users SET deleted_at = now() WHERE id = $1")
        .bind(deleted.id)
        .execute(app.pool())
        .await
        .unwrap();

    let published_at = (OffsetDateTime::now_utc() - Duration::minutes(1))
        .format(&Rfc3339)
        .unwrap();
    let resp = app
        .post_admin(
            "/admin/news",
            json!({ "title": "Resultados de la convocatoria", "published_at": published_at }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.error_message());
    assert_eq!(resp.json()["notifications_sent"], 3);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications")
        .fetch_one(app.pool())
        .await
        .unwrap();
    assert_eq!(total, 3);

    for user in &active {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1")
                .bind(user.id)
                .fetch_one(app.pool())
                .await
                .unwrap();
        assert_eq!(count, 1);
    }
}
