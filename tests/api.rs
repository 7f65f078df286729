mod common;

use serde_json::{Value, json};

use common::TestServer;

#[tokio::test]
async fn test_health() {
    let server = TestServer::start().await;

    let resp = reqwest::get(server.url("/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_register_sets_session_and_me_works() {
    let server = TestServer::start().await;
    let client = server.client();

    let resp = client
        .post(server.url("/api/auth/register"))
        .json(&json!({
            "name": "Asha",
            "email": "Asha@Example.Com ",
            "password": "correct-horse-1",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    // Email is normalized at the boundary.
    assert_eq!(body["data"]["email"], "asha@example.com");
    assert_eq!(body["data"]["is_admin"], false);
    assert!(body["data"]["password_hash"].is_null());

    let me: Value = client
        .get(server.url("/api/auth/me"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["data"]["email"], "asha@example.com");
    assert_eq!(me["data"]["purchased_notes"], json!([]));
}

#[tokio::test]
async fn test_register_duplicate_email_rejected() {
    let server = TestServer::start().await;

    let payload = json!({
        "name": "Asha",
        "email": "dup@example.com",
        "password": "correct-horse-1",
    });

    let first = server
        .client()
        .post(server.url("/api/auth/register"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 201);

    // Same address with different case is still a duplicate.
    let second = server
        .client()
        .post(server.url("/api/auth/register"))
        .json(&json!({
            "name": "Other",
            "email": "DUP@example.com",
            "password": "correct-horse-1",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 400);
    let body: Value = second.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_register_short_password_rejected() {
    let server = TestServer::start().await;

    let resp = server
        .client()
        .post(server.url("/api/auth/register"))
        .json(&json!({
            "name": "Asha",
            "email": "short@example.com",
            "password": "short",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let server = TestServer::start().await;
    server.student_client("Asha").await;

    let unknown = server
        .client()
        .post(server.url("/api/auth/login"))
        .json(&json!({ "email": "nobody@example.com", "password": "whatever-123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), 401);
    let unknown_body: Value = unknown.json().await.unwrap();

    let wrong_pw = server
        .client()
        .post(server.url("/api/auth/login"))
        .json(&json!({ "email": common::ADMIN_EMAIL, "password": "wrong-password-1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_pw.status(), 401);
    let wrong_pw_body: Value = wrong_pw.json().await.unwrap();

    // Same message either way, so accounts cannot be enumerated.
    assert_eq!(unknown_body["message"], wrong_pw_body["message"]);
}

#[tokio::test]
async fn test_logout_invalidates_session() {
    let server = TestServer::start().await;
    let client = server.student_client("Asha").await;

    let resp = client
        .post(server.url("/api/auth/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let me = client.get(server.url("/api/auth/me")).send().await.unwrap();
    assert_eq!(me.status(), 401);
}

#[tokio::test]
async fn test_change_password_requires_current() {
    let server = TestServer::start().await;
    let client = server.student_client("Asha").await;

    let wrong = client
        .put(server.url("/api/auth/change-password"))
        .json(&json!({
            "current_password": "not-the-password",
            "new_password": "new-password-11",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), 401);

    let ok = client
        .put(server.url("/api/auth/change-password"))
        .json(&json!({
            "current_password": "student-password-1",
            "new_password": "new-password-11",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status(), 200);

    let email = client
        .get(server.url("/api/auth/me"))
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap()["data"]["email"]
        .as_str()
        .unwrap()
        .to_string();

    let relogin = server
        .client()
        .post(server.url("/api/auth/login"))
        .json(&json!({ "email": email, "password": "new-password-11" }))
        .send()
        .await
        .unwrap();
    assert_eq!(relogin.status(), 200);
}

#[tokio::test]
async fn test_change_email_rejects_taken_address() {
    let server = TestServer::start().await;
    let client = server.student_client("Asha").await;

    let resp = client
        .put(server.url("/api/auth/change-email"))
        .json(&json!({
            "email": common::ADMIN_EMAIL,
            "password": "student-password-1",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);

    // Re-submitting the current address is a no-op, not a conflict.
    let email = client
        .get(server.url("/api/auth/me"))
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap()["data"]["email"]
        .as_str()
        .unwrap()
        .to_string();
    let same = client
        .put(server.url("/api/auth/change-email"))
        .json(&json!({ "email": email, "password": "student-password-1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(same.status(), 200);
}

#[tokio::test]
async fn test_admin_routes_distinguish_401_and_403() {
    let server = TestServer::start().await;

    // No session at all.
    let anon = reqwest::get(server.url("/api/admin/stats")).await.unwrap();
    assert_eq!(anon.status(), 401);

    // Valid session, but not an admin.
    let student = server.student_client("Asha").await;
    let forbidden = student
        .get(server.url("/api/admin/stats"))
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status(), 403);

    let admin = server.admin_client().await;
    let ok = admin.get(server.url("/api/admin/stats")).send().await.unwrap();
    assert_eq!(ok.status(), 200);
}

#[tokio::test]
async fn test_notes_count_tracks_uploads_and_deletes() {
    let server = TestServer::start().await;
    let admin = server.admin_client().await;

    let teacher_id = server.create_teacher(&admin, "Mrs Iyer", "Math").await;
    let free_id = server.create_note(&admin, &teacher_id, "Algebra basics", 0).await;
    server.create_note(&admin, &teacher_id, "Calculus", 50).await;

    let teacher: Value = reqwest::get(server.url(&format!("/api/teachers/{teacher_id}")))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(teacher["data"]["notes_count"], 2);
    assert_eq!(teacher["data"]["notes"].as_array().unwrap().len(), 2);

    let del = admin
        .delete(server.url(&format!("/api/admin/notes/{free_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(del.status(), 200);

    let teacher: Value = reqwest::get(server.url(&format!("/api/teachers/{teacher_id}")))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(teacher["data"]["notes_count"], 1);
}

#[tokio::test]
async fn test_concurrent_note_changes_keep_notes_count_consistent() {
    let server = TestServer::start().await;
    let admin = server.admin_client().await;

    let teacher_id = server.create_teacher(&admin, "Mrs Iyer", "Math").await;
    let doomed = server.create_note(&admin, &teacher_id, "Doomed", 0).await;

    // Two uploads and a delete for the same teacher, racing each other.
    let (_a, _b, del) = tokio::join!(
        server.create_note(&admin, &teacher_id, "Survivor A", 0),
        server.create_note(&admin, &teacher_id, "Survivor B", 25),
        admin
            .delete(server.url(&format!("/api/admin/notes/{doomed}")))
            .send(),
    );
    assert_eq!(del.unwrap().status(), 200);

    // Whatever the interleaving, the counter equals the live note count.
    let teacher: Value = reqwest::get(server.url(&format!("/api/teachers/{teacher_id}")))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let live = teacher["data"]["notes"].as_array().unwrap().len() as i64;
    assert_eq!(teacher["data"]["notes_count"].as_i64().unwrap(), live);
    assert_eq!(live, 2);
}

#[tokio::test]
async fn test_listing_order_and_subject_filter() {
    let server = TestServer::start().await;
    let admin = server.admin_client().await;

    let math = server.create_teacher(&admin, "Mrs Iyer", "Math").await;
    let physics = server.create_teacher(&admin, "Mr Rao", "Physics").await;

    let first = server.create_note(&admin, &math, "First", 0).await;
    let second = server.create_note(&admin, &math, "Second", 0).await;
    server.create_note(&admin, &physics, "Optics", 10).await;

    // Global catalog: newest first.
    let all: Value = reqwest::get(server.url("/api/notes"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let titles: Vec<&str> = all["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Optics", "Second", "First"]);

    let filtered: Value = reqwest::get(server.url("/api/notes?subject=Math"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(filtered["data"].as_array().unwrap().len(), 2);

    // Teacher page: oldest first, reading order.
    let teacher: Value = reqwest::get(server.url(&format!("/api/teachers/{math}")))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ids: Vec<&str> = teacher["data"]["notes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![first.as_str(), second.as_str()]);
}

#[tokio::test]
async fn test_free_note_is_accessible_to_everyone() {
    let server = TestServer::start().await;
    let admin = server.admin_client().await;

    let teacher_id = server.create_teacher(&admin, "Mrs Iyer", "Math").await;
    let note_id = server.create_note(&admin, &teacher_id, "Freebie", 0).await;

    // Anonymous.
    let detail: Value = reqwest::get(server.url(&format!("/api/notes/{note_id}")))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["data"]["has_access"], true);

    let content = reqwest::get(server.url(&format!("/api/notes/{note_id}/content")))
        .await
        .unwrap();
    assert_eq!(content.status(), 200);
    assert_eq!(
        content.headers()["content-type"].to_str().unwrap(),
        "application/pdf"
    );

    // Freshly registered student, no purchases.
    let student = server.student_client("Asha").await;
    let detail: Value = student
        .get(server.url(&format!("/api/notes/{note_id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["data"]["has_access"], true);
}

#[tokio::test]
async fn test_paid_note_content_is_gated() {
    let server = TestServer::start().await;
    let admin = server.admin_client().await;

    let teacher_id = server.create_teacher(&admin, "Mrs Iyer", "Math").await;
    let note_id = server.create_note(&admin, &teacher_id, "Premium", 50).await;

    // Anonymous viewers are asked to log in.
    let anon = reqwest::get(server.url(&format!("/api/notes/{note_id}/content")))
        .await
        .unwrap();
    assert_eq!(anon.status(), 401);

    // Authenticated but unpurchased viewers are refused.
    let student = server.student_client("Asha").await;
    let gated = student
        .get(server.url(&format!("/api/notes/{note_id}/content")))
        .send()
        .await
        .unwrap();
    assert_eq!(gated.status(), 403);

    let detail: Value = student
        .get(server.url(&format!("/api/notes/{note_id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["data"]["has_access"], false);

    // Purchase unlocks the bytes.
    let purchase = student
        .post(server.url(&format!("/api/notes/purchase/{note_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(purchase.status(), 200);
    let receipt: Value = purchase.json().await.unwrap();
    assert_eq!(receipt["data"]["note_id"], note_id.as_str());
    assert_eq!(receipt["data"]["price"], 50);

    let unlocked = student
        .get(server.url(&format!("/api/notes/{note_id}/content")))
        .send()
        .await
        .unwrap();
    assert_eq!(unlocked.status(), 200);

    let me: Value = student
        .get(server.url("/api/auth/me"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["data"]["purchased_notes"], json!([note_id]));
}

#[tokio::test]
async fn test_duplicate_purchase_rejected() {
    let server = TestServer::start().await;
    let admin = server.admin_client().await;

    let teacher_id = server.create_teacher(&admin, "Mrs Iyer", "Math").await;
    let note_id = server.create_note(&admin, &teacher_id, "Premium", 50).await;

    let student = server.student_client("Asha").await;
    let first = student
        .post(server.url(&format!("/api/notes/purchase/{note_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 200);

    let second = student
        .post(server.url(&format!("/api/notes/purchase/{note_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 400);
}

#[tokio::test]
async fn test_concurrent_duplicate_purchase_grants_once() {
    let server = TestServer::start().await;
    let admin = server.admin_client().await;

    let teacher_id = server.create_teacher(&admin, "Mrs Iyer", "Math").await;
    let note_id = server.create_note(&admin, &teacher_id, "Premium", 50).await;

    let student = server.student_client("Asha").await;
    let url = server.url(&format!("/api/notes/purchase/{note_id}"));

    let (a, b) = tokio::join!(student.post(&url).send(), student.post(&url).send());
    let mut statuses = [a.unwrap().status().as_u16(), b.unwrap().status().as_u16()];
    statuses.sort_unstable();
    assert_eq!(statuses, [200, 400]);

    // Exactly one grant row regardless of which request won.
    let me: Value = student
        .get(server.url("/api/auth/me"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["data"]["purchased_notes"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_purchase_of_missing_note_is_404() {
    let server = TestServer::start().await;
    let student = server.student_client("Asha").await;

    let resp = student
        .post(server.url("/api/notes/purchase/no-such-note"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_update_note_price_rederives_is_paid() {
    let server = TestServer::start().await;
    let admin = server.admin_client().await;

    let teacher_id = server.create_teacher(&admin, "Mrs Iyer", "Math").await;
    let note_id = server.create_note(&admin, &teacher_id, "Premium", 50).await;

    let resp = admin
        .put(server.url(&format!("/api/admin/notes/{note_id}")))
        .json(&json!({ "price": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["is_paid"], false);

    // Now free: anonymous content access works.
    let content = reqwest::get(server.url(&format!("/api/notes/{note_id}/content")))
        .await
        .unwrap();
    assert_eq!(content.status(), 200);
}

#[tokio::test]
async fn test_teacher_delete_cascades_to_notes() {
    let server = TestServer::start().await;
    let admin = server.admin_client().await;

    let teacher_id = server.create_teacher(&admin, "Mrs Iyer", "Math").await;
    let note_id = server.create_note(&admin, &teacher_id, "Orphan-to-be", 0).await;

    let del = admin
        .delete(server.url(&format!("/api/admin/teachers/{teacher_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(del.status(), 200);

    let teacher = reqwest::get(server.url(&format!("/api/teachers/{teacher_id}")))
        .await
        .unwrap();
    assert_eq!(teacher.status(), 404);

    let note = reqwest::get(server.url(&format!("/api/notes/{note_id}")))
        .await
        .unwrap();
    assert_eq!(note.status(), 404);
}

#[tokio::test]
async fn test_purchased_note_deletion_yields_404_not_access() {
    let server = TestServer::start().await;
    let admin = server.admin_client().await;

    let teacher_id = server.create_teacher(&admin, "Mrs Iyer", "Math").await;
    let note_id = server.create_note(&admin, &teacher_id, "Ephemeral", 50).await;

    let student = server.student_client("Asha").await;
    let purchase = student
        .post(server.url(&format!("/api/notes/purchase/{note_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(purchase.status(), 200);

    admin
        .delete(server.url(&format!("/api/admin/notes/{note_id}")))
        .send()
        .await
        .unwrap();

    // The grant survives but the note is gone; absence wins.
    let content = student
        .get(server.url(&format!("/api/notes/{note_id}/content")))
        .send()
        .await
        .unwrap();
    assert_eq!(content.status(), 404);
}

#[tokio::test]
async fn test_admin_stats_and_revenue() {
    let server = TestServer::start().await;
    let admin = server.admin_client().await;

    let teacher_id = server.create_teacher(&admin, "Mrs Iyer", "Math").await;
    let note_id = server.create_note(&admin, &teacher_id, "Premium", 50).await;
    server.create_note(&admin, &teacher_id, "Freebie", 0).await;

    let buyer = server.student_client("Asha").await;
    buyer
        .post(server.url(&format!("/api/notes/purchase/{note_id}")))
        .send()
        .await
        .unwrap();
    server.student_client("Ben").await;

    let stats: Value = admin
        .get(server.url("/api/admin/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let overview = &stats["data"]["overview"];
    assert_eq!(overview["total_students"], 2);
    assert_eq!(overview["total_teachers"], 1);
    assert_eq!(overview["total_notes"], 2);
    assert_eq!(overview["active_students"], 1);
    assert_eq!(overview["total_revenue"], 50);
    assert_eq!(overview["new_students_this_week"], 2);

    let top_students = stats["data"]["top_students"].as_array().unwrap();
    assert_eq!(top_students[0]["name"], "Asha");
    assert_eq!(top_students[0]["purchase_count"], 1);
}

#[tokio::test]
async fn test_student_analytics_lists_purchases() {
    let server = TestServer::start().await;
    let admin = server.admin_client().await;

    let teacher_id = server.create_teacher(&admin, "Mrs Iyer", "Math").await;
    let note_id = server.create_note(&admin, &teacher_id, "Premium", 50).await;

    let student = server.student_client("Asha").await;
    student
        .post(server.url(&format!("/api/notes/purchase/{note_id}")))
        .send()
        .await
        .unwrap();

    let analytics: Value = student
        .get(server.url("/api/analytics/student"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(analytics["data"]["stats"]["purchased_notes"], 1);
    assert_eq!(analytics["data"]["notes"][0]["id"], note_id.as_str());
}

#[tokio::test]
async fn test_admin_users_never_expose_hashes() {
    let server = TestServer::start().await;
    let admin = server.admin_client().await;
    server.student_client("Asha").await;

    let users: Value = admin
        .get(server.url("/api/admin/users"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let list = users["data"].as_array().unwrap();
    assert_eq!(list.len(), 2);
    for user in list {
        assert!(user.get("password_hash").is_none());
    }
}

#[tokio::test]
async fn test_note_upload_rejects_wrong_content_type() {
    let server = TestServer::start().await;
    let admin = server.admin_client().await;
    let teacher_id = server.create_teacher(&admin, "Mrs Iyer", "Math").await;

    let file = reqwest::multipart::Part::bytes(b"<html></html>".to_vec())
        .file_name("note.html")
        .mime_str("text/html")
        .unwrap();
    let form = reqwest::multipart::Form::new()
        .text("teacher_id", teacher_id)
        .text("title", "Nope")
        .text("price", "0")
        .part("files", file);

    let resp = admin
        .post(server.url("/api/admin/notes"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_note_upload_for_missing_teacher_is_404() {
    let server = TestServer::start().await;
    let admin = server.admin_client().await;

    let file = reqwest::multipart::Part::bytes(b"%PDF-1.4".to_vec())
        .file_name("note.pdf")
        .mime_str("application/pdf")
        .unwrap();
    let form = reqwest::multipart::Form::new()
        .text("teacher_id", "no-such-teacher")
        .text("title", "Lost")
        .text("price", "0")
        .part("files", file);

    let resp = admin
        .post(server.url("/api/admin/notes"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_batch_upload_creates_one_note_per_file() {
    let server = TestServer::start().await;
    let admin = server.admin_client().await;
    let teacher_id = server.create_teacher(&admin, "Mrs Iyer", "Math").await;

    let mut form = reqwest::multipart::Form::new()
        .text("teacher_id", teacher_id.clone())
        .text("title", "Chapter scans")
        .text("price", "25");
    for page in 0..3 {
        let file = reqwest::multipart::Part::bytes(format!("page {page}").into_bytes())
            .file_name(format!("page-{page}.png"))
            .mime_str("image/png")
            .unwrap();
        form = form.part("files", file);
    }

    let resp = admin
        .post(server.url("/api/admin/notes"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let teacher: Value = reqwest::get(server.url(&format!("/api/teachers/{teacher_id}")))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(teacher["data"]["notes_count"], 3);
    for note in teacher["data"]["notes"].as_array().unwrap() {
        assert_eq!(note["content_kind"], "image");
        assert_eq!(note["is_paid"], true);
    }
}

#[tokio::test]
async fn test_update_teacher_profile() {
    let server = TestServer::start().await;
    let admin = server.admin_client().await;
    let teacher_id = server.create_teacher(&admin, "Mrs Iyer", "Math").await;

    let photo = reqwest::multipart::Part::bytes(vec![0x89, b'P', b'N', b'G'])
        .file_name("photo.png")
        .mime_str("image/png")
        .unwrap();
    let form = reqwest::multipart::Form::new()
        .text("description", "Twenty years of algebra.")
        .part("photo", photo);

    let resp = admin
        .put(server.url(&format!("/api/admin/teachers/{teacher_id}")))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["description"], "Twenty years of algebra.");
    assert!(
        body["data"]["profile_image"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,")
    );
    // Name untouched by a partial update.
    assert_eq!(body["data"]["name"], "Mrs Iyer");
}
