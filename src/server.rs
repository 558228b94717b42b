//! HTTP front for a [`ProjectStore`], answering the `/api/projects/` contract.

use std::{convert::Infallible, future::Future, net::SocketAddr, sync::Arc};

use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use warp::{
    Filter, Rejection, Reply,
    http::StatusCode,
    reply::{Response, json as json_reply, with_status},
};

use crate::core::{
    db::{NewProject, ProjectQuery, ProjectStore, ProjectUpdate, StoreError},
    export::{self, ExportFormat},
};

#[derive(Debug, Deserialize)]
struct ExportQuery {
    format: Option<String>,
}

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    with_status(json_reply(&json!({ "detail": message.into() })), status).into_response()
}

fn store_error(err: StoreError) -> Response {
    match &err {
        StoreError::NotFound(_) => detail(StatusCode::NOT_FOUND, "Project not found"),
        StoreError::Transition(_) => detail(StatusCode::CONFLICT, err.to_string()),
        StoreError::Serialization(_) | StoreError::Invalid(_) => {
            detail(StatusCode::BAD_REQUEST, err.to_string())
        }
        _ => {
            tracing::error!(error = %err, "Project store failure");
            detail(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn respond<T: serde::Serialize>(result: Result<T, StoreError>) -> Response {
    match result {
        Ok(value) => json_reply(&value).into_response(),
        Err(err) => store_error(err),
    }
}

async fn list_projects<S: ProjectStore>(store: Arc<S>) -> Result<Response, Infallible> {
    Ok(respond(store.list_projects().await))
}

async fn search_projects<S: ProjectStore>(
    query: ProjectQuery,
    store: Arc<S>,
) -> Result<Response, Infallible> {
    Ok(respond(store.search_projects(&query).await))
}

async fn create_project<S: ProjectStore>(
    store: Arc<S>,
    project: NewProject,
) -> Result<Response, Infallible> {
    Ok(respond(store.create_project(&project).await))
}

async fn get_project<S: ProjectStore>(id: Uuid, store: Arc<S>) -> Result<Response, Infallible> {
    Ok(respond(store.get_project(id).await))
}

/// Status changes must follow the forward-only lifecycle, whichever store sits behind.
async fn update_project<S: ProjectStore>(
    id: Uuid,
    store: Arc<S>,
    mut update: ProjectUpdate,
) -> Result<Response, Infallible> {
    if update.status.is_some() || update.scenario.is_some() {
        let mut current = match store.get_project(id).await {
            Ok(project) => project,
            Err(err) => return Ok(store_error(err)),
        };
        if let Err(err) = update.apply(&mut current) {
            return Ok(detail(StatusCode::CONFLICT, err.to_string()));
        }
        // Forward both halves so a store that only overwrites stays in sync
        update.status = Some(current.status);
        update.scenario = Some(current.scenario);
    }
    Ok(respond(store.update_project(id, &update).await))
}

async fn delete_project<S: ProjectStore>(id: Uuid, store: Arc<S>) -> Result<Response, Infallible> {
    Ok(match store.delete_project(id).await {
        Ok(()) => json_reply(&json!({ "message": "Project deleted successfully" })).into_response(),
        Err(err) => store_error(err),
    })
}

async fn export_project<S: ProjectStore>(
    id: Uuid,
    query: ExportQuery,
    store: Arc<S>,
) -> Result<Response, Infallible> {
    let format = match query.format.as_deref().map(str::parse::<ExportFormat>) {
        None => ExportFormat::Json,
        Some(Ok(format)) => format,
        Some(Err(err)) => return Ok(detail(StatusCode::BAD_REQUEST, err.to_string())),
    };
    let project = match store.get_project(id).await {
        Ok(project) => project,
        Err(err) => return Ok(store_error(err)),
    };
    Ok(match export::render(&project, format) {
        Ok(value) => json_reply(&value).into_response(),
        Err(err) => detail(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    })
}

async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    if rejection.is_not_found() {
        return Ok(detail(StatusCode::NOT_FOUND, "Not Found"));
    }
    if let Some(err) = rejection.find::<warp::filters::body::BodyDeserializeError>() {
        return Ok(detail(StatusCode::UNPROCESSABLE_ENTITY, err.to_string()));
    }
    if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        return Ok(detail(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed"));
    }
    tracing::warn!(?rejection, "Unhandled rejection");
    Ok(detail(StatusCode::BAD_REQUEST, format!("{:?}", rejection)))
}

fn with_store<S: ProjectStore + 'static>(
    store: Arc<S>,
) -> impl Filter<Extract = (Arc<S>,), Error = Infallible> + Clone {
    warp::any().map(move || store.clone())
}

/// Every route of the project API. `/api/projects` and `/api/projects/` are the same collection.
pub fn routes<S: ProjectStore + 'static>(
    store: Arc<S>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let health = warp::path!("health")
        .and(warp::get())
        .map(|| json_reply(&json!({ "status": "healthy" })).into_response());

    let list = warp::path!("api" / "projects")
        .and(warp::get())
        .and(with_store(store.clone()))
        .and_then(list_projects::<S>);

    let search = warp::path!("api" / "projects" / "search")
        .and(warp::get())
        .and(warp::query::<ProjectQuery>())
        .and(with_store(store.clone()))
        .and_then(search_projects::<S>);

    let create = warp::path!("api" / "projects")
        .and(warp::post())
        .and(with_store(store.clone()))
        .and(warp::body::json())
        .and_then(create_project::<S>);

    let get = warp::path!("api" / "projects" / Uuid)
        .and(warp::get())
        .and(with_store(store.clone()))
        .and_then(get_project::<S>);

    let update = warp::path!("api" / "projects" / Uuid)
        .and(warp::put())
        .and(with_store(store.clone()))
        .and(warp::body::json())
        .and_then(update_project::<S>);

    let delete = warp::path!("api" / "projects" / Uuid)
        .and(warp::delete())
        .and(with_store(store.clone()))
        .and_then(delete_project::<S>);

    let export = warp::path!("api" / "projects" / Uuid / "export")
        .and(warp::get())
        .and(warp::query::<ExportQuery>())
        .and(with_store(store))
        .and_then(export_project::<S>);

    health
        .or(list)
        .unify()
        .or(search)
        .unify()
        .or(create)
        .unify()
        .or(get)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(export)
        .unify()
        .recover(handle_rejection)
        .unify()
        .with(warp::trace::request())
}

/// Binds `addr` and returns the bound address plus the server future.
///
/// The future resolves once `shutdown` completes.
pub fn serve<S, F>(
    store: Arc<S>,
    addr: SocketAddr,
    shutdown: F,
) -> anyhow::Result<(SocketAddr, impl Future<Output = ()>)>
where
    S: ProjectStore + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    let (bound, server) =
        warp::serve(routes(store)).try_bind_with_graceful_shutdown(addr, shutdown)?;
    tracing::info!(addr = %bound, "Project API listening");
    Ok((bound, server))
}
