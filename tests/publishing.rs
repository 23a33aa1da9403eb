mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

fn timestamp(offset: Duration) -> String {
    (OffsetDateTime::now_utc() + offset)
        .format(&Rfc3339)
        .unwrap()
}

fn published_now() -> String {
    timestamp(Duration::minutes(-1))
}

fn published_later() -> String {
    timestamp(Duration::days(7))
}

fn sent(resp: &common::TestResponse) -> u64 {
    resp.json()["notifications_sent"].as_u64().unwrap()
}

fn item(resp: &common::TestResponse) -> Value {
    resp.json()["item"].clone()
}

async fn notification_for(user_id: Uuid, link: &str) -> Value {
    let app = common::app().await;
    let row: (String, String, String, Option<String>) = sqlx::query_as(
        "SELECT notification_type, title, message, link FROM notifications \
         WHERE user_id = $1 AND link = $2",
    )
    .bind(user_id)
    .bind(link)
    .fetch_one(app.pool())
    .await
    .expect("notification for link");
    json!({ "type": row.0, "title": row.1, "message": row.2, "link": row.3 })
}

// ===========================================================================
// Calls
// ===========================================================================

#[tokio::test]
async fn published_call_notifies_every_user_once() {
    let app = common::app().await;
    let first = app.create_user("pub_call_a").await;
    let second = app.create_user("pub_call_b").await;
    let program = app.create_program("KA1-PUB").await;

    let resp = app
        .post_admin(
            "/admin/calls",
            json!({
                "program_id": program,
                "title": "Movilidad de estudiantes 2026",
                "status": "abierta",
                "published_at": published_now(),
            }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.error_message());
    assert!(sent(&resp) >= 2);

    let call = item(&resp);
    assert_eq!(call["slug"], "movilidad-de-estudiantes-2026");
    assert_eq!(call["program_name"], "Programa KA1-PUB");

    let link = format!("{}/convocatorias/movilidad-de-estudiantes-2026", common::TEST_BASE_URL);
    for user in [&first, &second] {
        assert_eq!(app.notifications_with_link(user.id, &link).await, 1);
    }

    let notification = notification_for(first.id, &link).await;
    assert_eq!(notification["type"], "convocatoria");
    assert_eq!(notification["title"], "Nueva convocatoria publicada");
    assert!(notification["message"]
        .as_str()
        .unwrap()
        .contains("Movilidad de estudiantes 2026"));
}

#[tokio::test]
async fn scheduled_or_draft_call_does_not_notify() {
    let app = common::app().await;
    let program = app.create_program("KA2-SCHED").await;

    let scheduled = app
        .post_admin(
            "/admin/calls",
            json!({
                "program_id": program,
                "title": "Convocatoria programada",
                "published_at": published_later(),
            }),
        )
        .await;
    assert_eq!(scheduled.status, StatusCode::OK);
    assert_eq!(sent(&scheduled), 0);

    let draft = app
        .post_admin(
            "/admin/calls",
            json!({ "program_id": program, "title": "Convocatoria borrador" }),
        )
        .await;
    assert_eq!(draft.status, StatusCode::OK);
    assert_eq!(sent(&draft), 0);
    assert_eq!(item(&draft)["status"], "borrador");
}

#[tokio::test]
async fn publishing_a_draft_call_notifies_once() {
    let app = common::app().await;
    let user = app.create_user("pub_call_update").await;
    let program = app.create_program("KA3-UPD").await;

    let created = app
        .post_admin(
            "/admin/calls",
            json!({ "program_id": program, "title": "Asociaciones de cooperación" }),
        )
        .await;
    assert_eq!(sent(&created), 0);
    let id = item(&created)["id"].as_str().unwrap().to_string();
    let link = format!("{}/convocatorias/asociaciones-de-cooperacion", common::TEST_BASE_URL);

    let published = app
        .patch_admin(
            &format!("/admin/calls/{}", id),
            json!({ "published_at": published_now() }),
        )
        .await;
    assert_eq!(published.status, StatusCode::OK, "{}", published.error_message());
    assert!(sent(&published) >= 1);
    assert_eq!(app.notifications_with_link(user.id, &link).await, 1);

    let retitled = app
        .patch_admin(
            &format!("/admin/calls/{}", id),
            json!({ "status": "cerrada", "published_at": published_now() }),
        )
        .await;
    assert_eq!(retitled.status, StatusCode::OK);
    assert_eq!(sent(&retitled), 0);
    assert_eq!(app.notifications_with_link(user.id, &link).await, 1);
}

#[tokio::test]
async fn unpublishing_never_notifies() {
    let app = common::app().await;
    let program = app.create_program("KA4-UNPUB").await;

    let created = app
        .post_admin(
            "/admin/calls",
            json!({
                "program_id": program,
                "title": "Convocatoria retirada",
                "published_at": published_now(),
            }),
        )
        .await;
    let id = item(&created)["id"].as_str().unwrap().to_string();

    let unpublished = app
        .patch_admin(&format!("/admin/calls/{}", id), json!({ "unpublish": true }))
        .await;
    assert_eq!(unpublished.status, StatusCode::OK);
    assert_eq!(sent(&unpublished), 0);
    assert!(item(&unpublished)["published_at"].is_null());
}

#[tokio::test]
async fn call_with_unknown_program_is_rejected() {
    let app = common::app().await;
    let resp = app
        .post_admin(
            "/admin/calls",
            json!({ "program_id": Uuid::new_v4(), "title": "Sin programa" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "invalid program_id");
}

#[tokio::test]
async fn publish_and_unpublish_together_is_rejected() {
    let app = common::app().await;
    let resp = app
        .patch_admin(
            &format!("/admin/calls/{}", Uuid::new_v4()),
            json!({ "published_at": published_now(), "unpublish": true }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

// ===========================================================================
// Resolutions, news, documents
// ===========================================================================

#[tokio::test]
async fn published_resolution_links_to_its_call() {
    let app = common::app().await;
    let user = app.create_user("pub_resolution").await;
    let program = app.create_program("KA5-RES").await;

    let call = app
        .post_admin(
            "/admin/calls",
            json!({ "program_id": program, "title": "Convocatoria con resolución" }),
        )
        .await;
    let call_id = item(&call)["id"].as_str().unwrap().to_string();

    let resp = app
        .post_admin(
            "/admin/resolutions",
            json!({
                "call_id": call_id,
                "title": "Resolución provisional",
                "published_at": published_now(),
            }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.error_message());
    assert!(sent(&resp) >= 1);
    let resolution_id = item(&resp)["id"].as_str().unwrap().to_string();

    let link = format!(
        "{}/admin/convocatorias/{}/resoluciones/{}",
        common::TEST_BASE_URL,
        call_id,
        resolution_id
    );
    assert_eq!(app.notifications_with_link(user.id, &link).await, 1);
    let notification = notification_for(user.id, &link).await;
    assert_eq!(notification["type"], "resolucion");
    assert!(notification["message"]
        .as_str()
        .unwrap()
        .contains("Convocatoria con resolución"));
}

#[tokio::test]
async fn published_news_uses_excerpt_as_message() {
    let app = common::app().await;
    let user = app.create_user("pub_news").await;

    let resp = app
        .post_admin(
            "/admin/news",
            json!({
                "title": "Jornada informativa Erasmus+",
                "excerpt": "Te esperamos el próximo martes.",
                "published_at": published_now(),
            }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.error_message());

    let link = format!("{}/noticias/jornada-informativa-erasmus", common::TEST_BASE_URL);
    assert_eq!(app.notifications_with_link(user.id, &link).await, 1);
    let notification = notification_for(user.id, &link).await;
    assert_eq!(notification["type"], "noticia");
    assert_eq!(notification["message"], "Te esperamos el próximo martes.");
}

#[tokio::test]
async fn scheduled_news_does_not_notify_when_edited() {
    let app = common::app().await;

    let created = app
        .post_admin(
            "/admin/news",
            json!({ "title": "Noticia futura", "published_at": published_later() }),
        )
        .await;
    assert_eq!(sent(&created), 0);
    let id = item(&created)["id"].as_str().unwrap().to_string();

    let edited = app
        .patch_admin(
            &format!("/admin/news/{}", id),
            json!({ "published_at": published_now() }),
        )
        .await;
    assert_eq!(edited.status, StatusCode::OK);
    assert_eq!(sent(&edited), 0);
}

#[tokio::test]
async fn activating_a_document_notifies_as_system() {
    let app = common::app().await;
    let user = app.create_user("pub_document").await;

    let created = app
        .post_admin(
            "/admin/documents",
            json!({ "title": "Guía del participante" }),
        )
        .await;
    assert_eq!(created.status, StatusCode::OK);
    assert_eq!(sent(&created), 0);
    let id = item(&created)["id"].as_str().unwrap().to_string();

    let activated = app
        .patch_admin(&format!("/admin/documents/{}", id), json!({ "is_active": true }))
        .await;
    assert_eq!(activated.status, StatusCode::OK);
    assert!(sent(&activated) >= 1);

    let link = format!("{}/documentos/guia-del-participante", common::TEST_BASE_URL);
    assert_eq!(app.notifications_with_link(user.id, &link).await, 1);
    assert_eq!(notification_for(user.id, &link).await["type"], "sistema");

    let again = app
        .patch_admin(&format!("/admin/documents/{}", id), json!({ "is_active": true }))
        .await;
    assert_eq!(sent(&again), 0);
}

#[tokio::test]
async fn active_document_notifies_on_create() {
    let app = common::app().await;
    let user = app.create_user("pub_document_active").await;

    let created = app
        .post_admin(
            "/admin/documents",
            json!({ "title": "Modelo de acuerdo", "is_active": true }),
        )
        .await;
    assert_eq!(created.status, StatusCode::OK);
    assert!(sent(&created) >= 1);

    let link = format!("{}/documentos/modelo-de-acuerdo", common::TEST_BASE_URL);
    assert_eq!(app.notifications_with_link(user.id, &link).await, 1);
}

#[tokio::test]
async fn deleted_users_are_not_notified() {
    let app = common::app().await;
    let user = app.create_user("pub_deleted").await;
    sqlx::query("UPDATE users SET deleted_at = now() WHERE id = $1")
        .bind(user.id)
        .execute(app.pool())
        .await
        .unwrap();

    app.post_admin(
        "/admin/news",
        json!({ "title": "Aviso para activos", "published_at": published_now() }),
    )
    .await;

    let link = format!("{}/noticias/aviso-para-activos", common::TEST_BASE_URL);
    assert_eq!(app.notifications_with_link(user.id, &link).await, 0);
}
