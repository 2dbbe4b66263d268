use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Extension, Form, Path, TypedHeader};
use axum::http::{StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use headers::{Header, HeaderName, HeaderValue, Host};
use lazy_static::lazy_static;
use pastelite_common::{
    paste_url, CreatedPaste, Health, PasteView, Url, HEALTH_ENDPOINT, PAGE_ENDPOINT,
    PASTES_ENDPOINT,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use tokio::task;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};

use crate::error::Error;
use crate::page;
use crate::paste::{NewPaste, Paste};
use crate::protocol;
use crate::store::Store;
use crate::time::{Clock, TestNow};

/// Fresh ids to try before giving up on a create request. Collisions are
/// astronomically rare, so running out means something else is wrong.
const MAX_CREATE_ATTEMPTS: usize = 8;

lazy_static! {
    static ref FORWARDED_PROTO_HEADER_NAME: HeaderName =
        HeaderName::from_static("x-forwarded-proto");
}

/// Shared by every handler. Owns the store handle for the server's lifetime.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub clock: Arc<dyn Clock>,
    pub public_url: Option<Url>,
    pub test_mode: bool,
}

impl AppState {
    fn now(&self, test_now: Option<TypedHeader<TestNow>>) -> DateTime<Utc> {
        match test_now {
            Some(TypedHeader(TestNow(now))) if self.test_mode => now,
            _ => self.clock.now(),
        }
    }

    fn base_url(
        &self,
        host: Option<&Host>,
        proto: Option<&ForwardedProto>,
        uri: &Uri,
    ) -> Result<Url, Error> {
        if let Some(url) = &self.public_url {
            return Ok(url.clone());
        }

        let host = host
            .map(|host| match host.port() {
                Some(port) => format!("{}:{}", host.hostname(), port),
                None => host.hostname().to_string(),
            })
            .or_else(|| uri.authority().map(ToString::to_string))
            .unwrap_or_else(|| "localhost".to_string());
        let scheme = proto.map_or("http", |proto| proto.0.as_str());

        Url::parse(&format!("{}://{}", scheme, host))
            .map_err(|_| Error::InvalidArgument("invalid Host header".to_string()))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index).post(create_from_form))
        .route(PASTES_ENDPOINT, post(create_paste))
        .route(&format!("{}/:id", PASTES_ENDPOINT), get(get_paste))
        .route(&format!("{}/:id", PAGE_ENDPOINT), get(paste_page))
        .route(HEALTH_ENDPOINT, get(health))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}

/// `X-Forwarded-Proto`, as set by a TLS-terminating proxy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForwardedProto(String);

impl Header for ForwardedProto {
    fn name() -> &'static HeaderName {
        &*FORWARDED_PROTO_HEADER_NAME
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        Self: Sized,
        I: Iterator<Item = &'i HeaderValue>,
    {
        let value = values
            .next()
            .ok_or_else(headers::Error::invalid)?
            .to_str()
            .map_err(|_| headers::Error::invalid())?;

        // Proxy chains append, the first entry is the client-facing one.
        match value.split(',').next().map(str::trim) {
            Some(proto) if proto.eq_ignore_ascii_case("http") => Ok(Self("http".to_string())),
            Some(proto) if proto.eq_ignore_ascii_case("https") => Ok(Self("https".to_string())),
            _ => Err(headers::Error::invalid()),
        }
    }

    fn encode<E: Extend<HeaderValue>>(&self, container: &mut E) {
        if let Ok(value) = HeaderValue::from_str(&self.0) {
            container.extend(std::iter::once(value));
        }
    }
}

/// Inserts `new_paste` under a freshly drawn id, drawing again while the id is
/// taken.
async fn store_new_paste(
    state: &AppState,
    new_paste: NewPaste,
    now: DateTime<Utc>,
) -> Result<Paste, Error> {
    let mut rng = StdRng::from_entropy();

    for _ in 0..MAX_CREATE_ATTEMPTS {
        match protocol::create(&*state.store, &mut rng, new_paste.clone(), now).await {
            Ok(paste) => {
                info!("Created paste {}", paste.id);
                return Ok(paste);
            }
            Err(Error::Conflict) => warn!("Generated id was already taken, retrying"),
            Err(e) => return Err(e),
        }
    }

    error!("Failed to generate a free paste id");
    Err(Error::Conflict)
}

#[instrument(skip(state, body))]
async fn create_paste(
    Extension(state): Extension<AppState>,
    test_now: Option<TypedHeader<TestNow>>,
    host: Option<TypedHeader<Host>>,
    proto: Option<TypedHeader<ForwardedProto>>,
    uri: Uri,
    body: Bytes,
) -> Result<(StatusCode, Json<CreatedPaste>), Error> {
    let new_paste = NewPaste::from_json(&body)?;
    let base = state.base_url(
        host.as_ref().map(|v| &v.0),
        proto.as_ref().map(|v| &v.0),
        &uri,
    )?;
    let now = state.now(test_now);

    let paste = store_new_paste(&state, new_paste, now).await?;
    let url = paste_url(&base, &paste.id).to_string();
    Ok((StatusCode::CREATED, Json(CreatedPaste { id: paste.id, url })))
}

/// Fields of the form served at `/`. Missing fields read as blank.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct CreateForm {
    content: String,
    ttl_seconds: String,
    max_views: String,
}

async fn index() -> Html<String> {
    Html(page::index("", None))
}

#[instrument(skip(state, form))]
async fn create_from_form(
    Extension(state): Extension<AppState>,
    test_now: Option<TypedHeader<TestNow>>,
    host: Option<TypedHeader<Host>>,
    proto: Option<TypedHeader<ForwardedProto>>,
    uri: Uri,
    Form(form): Form<CreateForm>,
) -> Response {
    let created = async {
        let new_paste = NewPaste::from_form(&form.content, &form.ttl_seconds, &form.max_views)?;
        let base = state.base_url(
            host.as_ref().map(|v| &v.0),
            proto.as_ref().map(|v| &v.0),
            &uri,
        )?;
        let paste = store_new_paste(&state, new_paste, state.now(test_now)).await?;
        Ok::<_, Error>(paste_url(&base, &paste.id))
    };

    match created.await {
        Ok(url) => (StatusCode::CREATED, Html(page::created(url.as_str()))).into_response(),
        Err(Error::InvalidArgument(message)) => (
            StatusCode::BAD_REQUEST,
            Html(page::index(&form.content, Some(&message))),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to create paste from form: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Html(page::internal_error())).into_response()
        }
    }
}

#[instrument(skip(state))]
async fn get_paste(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
    test_now: Option<TypedHeader<TestNow>>,
) -> Result<Json<PasteView>, Error> {
    let now = state.now(test_now);
    let consumed = protocol::consume(&*state.store, &id, now).await?;

    Ok(Json(PasteView {
        remaining_views: consumed.remaining_views(),
        expires_at: consumed.expires_at,
        content: consumed.content,
    }))
}

#[instrument(skip(state))]
async fn paste_page(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
    test_now: Option<TypedHeader<TestNow>>,
) -> Response {
    let now = state.now(test_now);
    match protocol::consume(&*state.store, &id, now).await {
        Ok(consumed) => Html(page::paste(&consumed, now)).into_response(),
        Err(Error::NotFound) => (StatusCode::NOT_FOUND, Html(page::not_found())).into_response(),
        Err(e) => {
            error!("Failed to render paste page: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Html(page::internal_error())).into_response()
        }
    }
}

#[instrument(skip(state))]
async fn health(Extension(state): Extension<AppState>) -> (StatusCode, Json<Health>) {
    let store = Arc::clone(&state.store);
    match task::spawn(async move { protocol::is_live(&*store).await }).await {
        Ok(true) => (
            StatusCode::OK,
            Json(Health {
                ok: true,
                error: None,
            }),
        ),
        Ok(false) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(Health {
                ok: false,
                error: Some("Database connection failed".to_string()),
            }),
        ),
        Err(e) => {
            error!("Health check task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Health {
                    ok: false,
                    error: Some("Internal server error".to_string()),
                }),
            )
        }
    }
}
