use std::rc::Rc;

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage, ResponseError,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use super::{GuardPipeline, GuardRejection, TaskAccess};
use crate::auth::Claims;
use crate::error::AppError;
use crate::store::RecordStore;

/// Path segment holding the task id on guarded resources.
pub const TASK_ID_PARAM: &str = "task_id";

/// Resource middleware that runs a [`GuardPipeline`] before the handler.
///
/// A rejection is rendered as the terminal response right here; the wrapped
/// handler is not called.
///
/// The requester comes from the `Claims` that `AuthMiddleware` placed in the
/// request extensions, never from the request body. On success the resulting
/// `TaskAccess` is inserted into the extensions so handlers can take
/// `web::ReqData<TaskAccess>`.
///
/// ```ignore
/// #[put("/{task_id}", wrap = "RequireTaskAccess::mutate()")]
/// ```
#[derive(Debug, Clone)]
pub struct RequireTaskAccess {
    pipeline: GuardPipeline,
}

impl RequireTaskAccess {
    pub fn new(pipeline: GuardPipeline) -> Self {
        Self { pipeline }
    }

    pub fn read_single() -> Self {
        Self::new(GuardPipeline::read_single())
    }

    pub fn mutate() -> Self {
        Self::new(GuardPipeline::mutate())
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireTaskAccess
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RequireTaskAccessService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireTaskAccessService {
            service: Rc::new(service),
            pipeline: self.pipeline.clone(),
        }))
    }
}

pub struct RequireTaskAccessService<S> {
    service: Rc<S>,
    pipeline: GuardPipeline,
}

impl<S, B> Service<ServiceRequest> for RequireTaskAccessService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let pipeline = self.pipeline.clone();

        Box::pin(async move {
            match authorize(&req, &pipeline).await {
                Ok(access) => {
                    req.extensions_mut().insert(access);
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(err) => {
                    let response = err.error_response();
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}

async fn authorize(
    req: &ServiceRequest,
    pipeline: &GuardPipeline,
) -> Result<TaskAccess, AppError> {
    let requester_id = req
        .extensions()
        .get::<Claims>()
        .map(|claims| claims.sub)
        .ok_or_else(|| AppError::Unauthorized("Missing authenticated user".into()))?;

    // A task id that cannot exist is indistinguishable from a missing task.
    let task_id = req
        .match_info()
        .get(TASK_ID_PARAM)
        .and_then(|raw| raw.parse::<i32>().ok())
        .ok_or(GuardRejection::TaskNotFound)?;

    let store = req
        .app_data::<web::Data<dyn RecordStore>>()
        .cloned()
        .ok_or_else(|| {
            AppError::internal("Task guards misconfigured", "record store not registered")
        })?;

    Ok(pipeline.run(store.get_ref(), requester_id, task_id).await?)
}
