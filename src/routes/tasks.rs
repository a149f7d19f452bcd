use crate::{
    auth::AuthenticatedUserId,
    error::AppError,
    guards::{GuardRejection, RequireTaskAccess, TaskAccess},
    models::{NewTask, TaskFilter, TaskInput, TaskQuery, TaskUpdate},
    store::{RecordStore, TaskWrite},
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use log::info;
use serde_json::json;
use validator::Validate;

/// Retrieves a list of tasks for the authenticated user.
///
/// Only tasks owned by the caller are returned, newest first.
///
/// ## Query Parameters:
/// - `status` (optional): exact status match, e.g. `completed`.
/// - `search` (optional): case-insensitive match on title or description.
///
/// ## Responses:
/// - `200 OK`: JSON array of `Task` objects.
/// - `401 Unauthorized`: missing or invalid token.
/// - `500 Internal Server Error`: store failure.
#[get("")]
pub async fn get_tasks(
    store: web::Data<dyn RecordStore>,
    query_params: web::Query<TaskQuery>,
    user: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let filter = TaskFilter::from_query(user.0, query_params.into_inner());
    let tasks = store.list_tasks(&filter).await?;

    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a new task owned by the authenticated user.
///
/// The owner always comes from the token; new tasks start `in progress`.
///
/// ## Responses:
/// - `201 Created`: the new `Task`.
/// - `401 Unauthorized`: missing or invalid token.
/// - `422 Unprocessable Entity`: title or description out of bounds.
#[post("")]
pub async fn create_task(
    store: web::Data<dyn RecordStore>,
    task_data: web::Json<TaskInput>,
    user: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let task = store
        .create_task(NewTask::new(task_data.into_inner(), user.0))
        .await?;
    info!("user {} created task {}", user.0, task.id);

    Ok(HttpResponse::Created().json(task))
}

/// Retrieves a single task. Owner or admin only; completed tasks are readable.
///
/// ## Responses:
/// - `200 OK`: the `Task`.
/// - `403 Forbidden`: caller neither owns the task nor is an admin.
/// - `404 Not Found`: caller or task does not exist.
#[get("/{task_id}", wrap = "RequireTaskAccess::read_single()")]
pub async fn get_task(access: web::ReqData<TaskAccess>) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(&access.task))
}

/// Updates a task. Owner or admin only, and only while it is not completed.
///
/// Missing or empty fields keep their current value. Setting `status` to
/// `completed` locks the task from then on.
///
/// ## Responses:
/// - `200 OK`: the updated `Task`.
/// - `403 Forbidden`: not the owner, or the task is completed.
/// - `404 Not Found`: caller or task does not exist.
/// - `422 Unprocessable Entity`: field out of bounds.
#[put("/{task_id}", wrap = "RequireTaskAccess::mutate()")]
pub async fn update_task(
    store: web::Data<dyn RecordStore>,
    access: web::ReqData<TaskAccess>,
    task_data: web::Json<TaskUpdate>,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let TaskAccess { requester, mut task } = access.into_inner();
    task.apply(task_data.into_inner());

    // The store re-checks the lock, so a concurrent completion still wins.
    match store.save_task(&task).await? {
        TaskWrite::Applied(saved) => {
            info!("user {} updated task {}", requester.id, saved.id);
            Ok(HttpResponse::Ok().json(saved))
        }
        TaskWrite::Locked => Err(GuardRejection::TaskLocked.into()),
        TaskWrite::Missing => Err(GuardRejection::TaskNotFound.into()),
    }
}

/// Deletes a task. Owner or admin only, and only while it is not completed.
///
/// ## Responses:
/// - `200 OK`: `{"message": "Task deleted successfully"}`.
/// - `403 Forbidden`: not the owner, or the task is completed.
/// - `404 Not Found`: caller or task does not exist.
#[delete("/{task_id}", wrap = "RequireTaskAccess::mutate()")]
pub async fn delete_task(
    store: web::Data<dyn RecordStore>,
    access: web::ReqData<TaskAccess>,
) -> Result<impl Responder, AppError> {
    let TaskAccess { requester, task } = access.into_inner();

    match store.delete_task(task.id).await? {
        TaskWrite::Applied(()) => {
            info!("user {} deleted task {}", requester.id, task.id);
            Ok(HttpResponse::Ok().json(json!({ "message": "Task deleted successfully" })))
        }
        TaskWrite::Locked => Err(GuardRejection::TaskLocked.into()),
        TaskWrite::Missing => Err(GuardRejection::TaskNotFound.into()),
    }
}
