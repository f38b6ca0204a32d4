use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub title: String,
    pub body: String,
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct NewPost {
    pub title: String,
    pub body: String,
    pub user_id: Option<u64>,
}

impl NewPost {
    /// Validate submitted fields. Multipart sends every value as text, so
    /// `userId` is accepted as a JSON integer or an integer string.
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self, ApiError> {
        let text = |name: &str| match fields.get(name) {
            Some(Value::String(s)) => Ok(s.clone()),
            _ => Err(ApiError::unprocessable(format!("`{name}` is required"))),
        };
        let user_id = match fields.get("userId") {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => Some(n.as_u64().ok_or_else(invalid_user_id)?),
            Some(Value::String(s)) => Some(s.trim().parse().map_err(|_| invalid_user_id())?),
            Some(_) => return Err(invalid_user_id()),
        };
        Ok(Self {
            title: text("title")?,
            body: text("body")?,
            user_id,
        })
    }
}

fn invalid_user_id() -> ApiError {
    ApiError::unprocessable("`userId` must be a non-negative integer")
}

/// Error response with a `{"error": ...}` body.
#[derive(Debug, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "not found".to_string(),
        }
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Default)]
pub struct Store {
    next_id: u64,
    posts: BTreeMap<u64, Post>,
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::default();
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/{id}", get(get_post).delete(delete_post))
        .fallback(|| async { ApiError::not_found() })
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_posts(State(db): State<Db>) -> Json<Vec<Post>> {
    let store = db.read().await;
    Json(store.posts.values().cloned().collect())
}

async fn create_post(State(db): State<Db>, request: Request) -> Result<(StatusCode, Json<Post>), ApiError> {
    let fields = read_fields(request).await?;
    let input = NewPost::from_fields(&fields)?;

    let mut store = db.write().await;
    store.next_id += 1;
    let post = Post {
        id: store.next_id,
        title: input.title,
        body: input.body,
        user_id: input.user_id,
    };
    store.posts.insert(post.id, post.clone());
    info!(id = post.id, "post created");
    Ok((StatusCode::CREATED, Json(post)))
}

/// Collect the submitted fields from either a JSON object or a multipart
/// form. File parts are read as (lossy) text.
async fn read_fields(request: Request) -> Result<Map<String, Value>, ApiError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    if is_multipart {
        let mut multipart = Multipart::from_request(request, &()).await.map_err(|e| ApiError {
            status: e.status(),
            message: e.body_text(),
        })?;
        let mut fields = Map::new();
        while let Some(field) = multipart.next_field().await.map_err(|e| ApiError {
            status: e.status(),
            message: e.body_text(),
        })? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let bytes = field.bytes().await.map_err(|e| ApiError {
                status: e.status(),
                message: e.body_text(),
            })?;
            fields.insert(name, Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        }
        return Ok(fields);
    }

    let Json(value) = Json::<Value>::from_request(request, &()).await.map_err(|e| ApiError {
        status: e.status(),
        message: e.body_text(),
    })?;
    match value {
        Value::Object(fields) => Ok(fields),
        _ => Err(ApiError::unprocessable("expected a JSON object")),
    }
}

async fn get_post(State(db): State<Db>, Path(id): Path<u64>) -> Result<Json<Post>, ApiError> {
    let store = db.read().await;
    store.posts.get(&id).cloned().map(Json).ok_or_else(ApiError::not_found)
}

async fn delete_post(State(db): State<Db>, Path(id): Path<u64>) -> Result<Json<Value>, ApiError> {
    let mut store = db.write().await;
    store.posts.remove(&id).ok_or_else(ApiError::not_found)?;
    info!(id, "post deleted");
    Ok(Json(json!({})))
}
