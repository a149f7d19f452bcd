#[macro_use]
mod common;

use std::net::TcpListener;
use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{rt, test, web, App, HttpServer};
use pretty_assertions::assert_eq;
use serde_json::json;
use taskguard::models::{Role, Task};
use taskguard::store::{MemoryStore, RecordStore};

use common::{read_json, seed_task, seed_user, FlakyTaskStore, RacingStore};

#[test_log::test(actix_rt::test)]
async fn test_task_crud_flow() {
    let store = Arc::new(MemoryStore::new());
    let alice = seed_user(store.as_ref(), "alice", Role::User).await;
    let app = init_app!(store.clone());

    // 1. Create: owner comes from the token, status starts in progress.
    let req = test::TestRequest::post()
        .uri("/api/tasks")
        .insert_header(alice.bearer())
        .set_json(json!({ "title": "Write report", "description": "Quarterly numbers" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Task = test::read_body_json(resp).await;
    assert_eq!(created.title, "Write report");
    assert_eq!(created.status.as_str(), "in progress");
    assert_eq!(created.user_id, alice.id);

    // 2. Get by id
    let req = test::TestRequest::get()
        .uri(&format!("/api/tasks/{}", created.id))
        .insert_header(alice.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Task = test::read_body_json(resp).await;
    assert_eq!(fetched, created);

    // 3. Partial update keeps untouched fields
    let req = test::TestRequest::put()
        .uri(&format!("/api/tasks/{}", created.id))
        .insert_header(alice.bearer())
        .set_json(json!({ "title": "Write final report", "description": "" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Task = test::read_body_json(resp).await;
    assert_eq!(updated.title, "Write final report");
    assert_eq!(updated.description, "Quarterly numbers");

    // 4. List
    let req = test::TestRequest::get()
        .uri("/api/tasks")
        .insert_header(alice.bearer())
        .to_request();
    let tasks: Vec<Task> = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, created.id);

    // 5. Delete
    let req = test::TestRequest::delete()
        .uri(&format!("/api/tasks/{}", created.id))
        .insert_header(alice.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        read_json(resp).await,
        json!({ "message": "Task deleted successfully" })
    );
    assert!(store.find_task(created.id).await.unwrap().is_none());
}

#[test_log::test(actix_rt::test)]
async fn test_completing_a_task_locks_it() {
    let store = Arc::new(MemoryStore::new());
    let alice = seed_user(store.as_ref(), "alice", Role::User).await;
    let task = seed_task(store.as_ref(), alice.id, "Ship it", "in progress").await;
    let app = init_app!(store.clone());

    let req = test::TestRequest::put()
        .uri(&format!("/api/tasks/{}", task.id))
        .insert_header(alice.bearer())
        .set_json(json!({ "status": "completed" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::put()
        .uri(&format!("/api/tasks/{}", task.id))
        .insert_header(alice.bearer())
        .set_json(json!({ "status": "in progress" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body = read_json(resp).await;
    assert!(body["message"].as_str().unwrap().contains("already completed"));
    assert!(body.get("error").is_none());

    let req = test::TestRequest::delete()
        .uri(&format!("/api/tasks/{}", task.id))
        .insert_header(alice.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Still readable, still completed.
    let req = test::TestRequest::get()
        .uri(&format!("/api/tasks/{}", task.id))
        .insert_header(alice.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Task = test::read_body_json(resp).await;
    assert!(fetched.status.is_completed());
}

#[test_log::test(actix_rt::test)]
async fn test_guard_scenarios() {
    let store = Arc::new(MemoryStore::new());
    let owner = seed_user(store.as_ref(), "owner", Role::User).await;
    let intruder = seed_user(store.as_ref(), "intruder", Role::User).await;
    let open = seed_task(store.as_ref(), owner.id, "Open", "in progress").await;
    let done = seed_task(store.as_ref(), owner.id, "Done", "completed").await;
    let app = init_app!(store.clone());

    // A: owner updates an open task.
    let req = test::TestRequest::put()
        .uri(&format!("/api/tasks/{}", open.id))
        .insert_header(owner.bearer())
        .set_json(json!({ "title": "Renamed" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    // B: someone else is refused, whatever the status, and learns nothing about it.
    for task in [&open, &done] {
        let req = test::TestRequest::put()
            .uri(&format!("/api/tasks/{}", task.id))
            .insert_header(intruder.bearer())
            .set_json(json!({ "title": "Mine now" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            read_json(resp).await,
            json!({ "message": "You do not have permission to access this task" })
        );
    }

    // B also covers reads.
    let req = test::TestRequest::get()
        .uri(&format!("/api/tasks/{}", open.id))
        .insert_header(intruder.bearer())
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    // C: owner hits the lock.
    let req = test::TestRequest::put()
        .uri(&format!("/api/tasks/{}", done.id))
        .insert_header(owner.bearer())
        .set_json(json!({ "title": "Reopen?" }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    // D: unknown task on every guarded route.
    for req in [
        test::TestRequest::get().uri("/api/tasks/9999"),
        test::TestRequest::put()
            .uri("/api/tasks/9999")
            .set_json(json!({ "title": "x" })),
        test::TestRequest::delete().uri("/api/tasks/9999"),
    ] {
        let resp = test::call_service(&app, req.insert_header(owner.bearer()).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(read_json(resp).await, json!({ "message": "Task not found" }));
    }

    let unchanged = store.find_task(done.id).await.unwrap().unwrap();
    assert_eq!(unchanged, done);
}

#[test_log::test(actix_rt::test)]
async fn test_admin_bypasses_ownership_but_not_the_lock() {
    let store = Arc::new(MemoryStore::new());
    let owner = seed_user(store.as_ref(), "owner", Role::User).await;
    let admin = seed_user(store.as_ref(), "admin", Role::Admin).await;
    let open = seed_task(store.as_ref(), owner.id, "Open", "in progress").await;
    let done = seed_task(store.as_ref(), owner.id, "Done", "completed").await;
    let app = init_app!(store.clone());

    let req = test::TestRequest::put()
        .uri(&format!("/api/tasks/{}", open.id))
        .insert_header(admin.bearer())
        .set_json(json!({ "status": "blocked" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Task = test::read_body_json(resp).await;
    assert_eq!(updated.status.as_str(), "blocked");
    assert_eq!(updated.user_id, owner.id);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/tasks/{}", done.id))
        .insert_header(admin.bearer())
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    let req = test::TestRequest::delete()
        .uri(&format!("/api/tasks/{}", open.id))
        .insert_header(admin.bearer())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[test_log::test(actix_rt::test)]
async fn test_deleted_requester_is_not_found() {
    let store = Arc::new(MemoryStore::new());
    let owner = seed_user(store.as_ref(), "owner", Role::User).await;
    let ghost = seed_user(store.as_ref(), "ghost", Role::User).await;
    let task = seed_task(store.as_ref(), owner.id, "Open", "in progress").await;
    store.delete_user(ghost.id).await.unwrap();
    let app = init_app!(store.clone());

    // The token still verifies, but its subject no longer exists.
    let req = test::TestRequest::put()
        .uri(&format!("/api/tasks/{}", task.id))
        .insert_header(ghost.bearer())
        .set_json(json!({ "title": "x" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json(resp).await, json!({ "message": "User not found" }));
}

#[test_log::test(actix_rt::test)]
async fn test_completion_between_guard_and_write_is_refused() {
    let inner = Arc::new(MemoryStore::new());
    let owner = seed_user(inner.as_ref(), "owner", Role::User).await;
    let task = seed_task(inner.as_ref(), owner.id, "Open", "in progress").await;
    let app = init_app!(Arc::new(RacingStore {
        inner: inner.clone()
    }));

    let req = test::TestRequest::put()
        .uri(&format!("/api/tasks/{}", task.id))
        .insert_header(owner.bearer())
        .set_json(json!({ "title": "Too late" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/tasks/{}", task.id))
        .insert_header(owner.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let stored = inner.find_task(task.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Open");
    assert!(stored.status.is_completed());
}

#[test_log::test(actix_rt::test)]
async fn test_store_fault_surfaces_as_internal_error() {
    let inner = Arc::new(MemoryStore::new());
    let owner = seed_user(inner.as_ref(), "owner", Role::User).await;
    let task = seed_task(inner.as_ref(), owner.id, "Open", "in progress").await;
    let app = init_app!(Arc::new(FlakyTaskStore {
        inner: inner.clone()
    }));

    let req = test::TestRequest::delete()
        .uri(&format!("/api/tasks/{}", task.id))
        .insert_header(owner.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json(resp).await;
    assert_eq!(body["message"], "Failed to verify task ownership");
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("connection refused"));

    assert!(inner.find_task(task.id).await.unwrap().is_some());
}

#[test_log::test(actix_rt::test)]
async fn test_list_is_scoped_and_filtered() {
    let store = Arc::new(MemoryStore::new());
    let alice = seed_user(store.as_ref(), "alice", Role::User).await;
    let bob = seed_user(store.as_ref(), "bob", Role::User).await;
    seed_task(store.as_ref(), alice.id, "Buy milk", "in progress").await;
    seed_task(store.as_ref(), alice.id, "File taxes", "completed").await;
    seed_task(store.as_ref(), bob.id, "Buy bread", "in progress").await;
    let app = init_app!(store.clone());

    let list = |query: &str, bearer: (&'static str, String)| {
        test::TestRequest::get()
            .uri(&format!("/api/tasks{}", query))
            .insert_header(bearer)
            .to_request()
    };

    let tasks: Vec<Task> =
        test::read_body_json(test::call_service(&app, list("", alice.bearer())).await).await;
    assert_eq!(tasks.len(), 2);
    assert!(tasks.iter().all(|t| t.user_id == alice.id));

    let tasks: Vec<Task> = test::read_body_json(
        test::call_service(&app, list("?status=completed", alice.bearer())).await,
    )
    .await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "File taxes");

    let tasks: Vec<Task> = test::read_body_json(
        test::call_service(&app, list("?search=BUY", alice.bearer())).await,
    )
    .await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Buy milk");

    let tasks: Vec<Task> =
        test::read_body_json(test::call_service(&app, list("", bob.bearer())).await).await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Buy bread");
}

#[test_log::test(actix_rt::test)]
async fn test_create_task_validation() {
    let store = Arc::new(MemoryStore::new());
    let alice = seed_user(store.as_ref(), "alice", Role::User).await;
    let app = init_app!(store.clone());

    let req = test::TestRequest::post()
        .uri("/api/tasks")
        .insert_header(alice.bearer())
        .set_json(json!({ "title": "", "description": "Something" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // A payload-supplied owner is ignored.
    let req = test::TestRequest::post()
        .uri("/api/tasks")
        .insert_header(alice.bearer())
        .set_json(json!({ "title": "Mine", "description": "Really", "user_id": 42 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Task = test::read_body_json(resp).await;
    assert_eq!(created.user_id, alice.id);
}

#[actix_rt::test]
async fn test_create_task_unauthorized() {
    common::setup_env();
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());

    // Find an available port
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let data = web::Data::from(store);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .service(taskguard::routes::health::health)
            .service(
                web::scope("/api")
                    .wrap(taskguard::auth::AuthMiddleware)
                    .configure(taskguard::routes::config),
            )
    })
    .workers(1)
    .bind(("127.0.0.1", port))
    .unwrap_or_else(|_| panic!("Failed to bind to port {}", port))
    .run();
    let handle = server.handle();
    rt::spawn(server);

    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://127.0.0.1:{}/api/tasks", port))
        .json(&json!({ "title": "Unauthorized Task", "description": "Nope" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = resp.json().await.expect("JSON body");
    assert_eq!(body, json!({ "message": "Missing token" }));

    let resp = client
        .put(format!("http://127.0.0.1:{}/api/tasks/1", port))
        .bearer_auth("not-a-jwt")
        .json(&json!({ "title": "x" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

    let resp = client
        .get(format!("http://127.0.0.1:{}/health", port))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    handle.stop(false).await;
}
