//! HTTP server implementation
//!
//! hyper http1 with TokioIo, one task per connection, upgrades enabled for
//! the presence websocket. Routing is a plain match over method and path.

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::header::AUTHORIZATION;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{HeaderMap, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::auth::{extract_token_from_header, Caller, JwtValidator};
use crate::config::Args;
use crate::db::MongoClient;
use crate::news::{ArchiveToggle, EngagementCounter, Newsroom, VisibilityFilter};
use crate::notify::{FanoutConfig, FanoutEngine, Inbox, PresenceRegistry};
use crate::routes;
use crate::server::websocket;
use crate::store::{
    CommentStore, ContentStore, MemoryCommentStore, MemoryContentStore,
    MemoryNotificationDirectory, MemoryPreferenceStore, MemoryUserDirectory, MongoCommentStore,
    MongoContentStore, MongoNotificationDirectory, MongoPreferenceStore, MongoUserDirectory,
    NotificationDirectory, PreferenceStore, UserDirectory,
};
use crate::types::{BulletinError, Result};

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Storage collaborators behind their ports
pub struct Stores {
    pub content: Arc<dyn ContentStore>,
    pub prefs: Arc<dyn PreferenceStore>,
    pub users: Arc<dyn UserDirectory>,
    pub comments: Arc<dyn CommentStore>,
    pub notifications: Arc<dyn NotificationDirectory>,
}

impl Stores {
    /// In-memory stores around the given user directory
    pub fn memory(users: Arc<dyn UserDirectory>) -> Self {
        Self {
            content: Arc::new(MemoryContentStore::new()),
            prefs: Arc::new(MemoryPreferenceStore::new()),
            users,
            comments: Arc::new(MemoryCommentStore::new()),
            notifications: Arc::new(MemoryNotificationDirectory::new()),
        }
    }

    pub async fn mongo(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            content: Arc::new(MongoContentStore::new(client).await?),
            prefs: Arc::new(MongoPreferenceStore::new(client).await?),
            users: Arc::new(MongoUserDirectory::new(client).await?),
            comments: Arc::new(MongoCommentStore::new(client).await?),
            notifications: Arc::new(MongoNotificationDirectory::new(client).await?),
        })
    }
}

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// "mongodb" or "memory"
    pub backend: &'static str,
    pub jwt: JwtValidator,
    pub stores: Stores,
    /// Live channels of connected users
    pub presence: Arc<PresenceRegistry>,
    pub fanout: Arc<FanoutEngine>,
    pub visibility: Arc<VisibilityFilter>,
    pub engagement: EngagementCounter,
    pub archive: ArchiveToggle,
    pub inbox: Inbox,
    pub newsroom: Newsroom,
    pub started_at: Instant,
}

impl AppState {
    /// Wire the core components over `stores`
    pub fn new(args: Args, backend: &'static str, stores: Stores) -> Result<Self> {
        let jwt = match args.jwt_secret() {
            Some(secret) if args.jwt_secret.is_some() => JwtValidator::new(secret)?,
            Some(_) => JwtValidator::new_dev(),
            None => {
                return Err(BulletinError::Config(
                    "JWT_SECRET is required in production mode".into(),
                ))
            }
        };

        let presence = Arc::new(PresenceRegistry::new(args.push_buffer));
        let fanout = Arc::new(FanoutEngine::new(
            Arc::clone(&stores.users),
            Arc::clone(&stores.notifications),
            presence.clone(),
            FanoutConfig {
                concurrency: args.fanout_concurrency,
                write_timeout: args.fanout_write_timeout(),
            },
        ));
        let visibility = Arc::new(VisibilityFilter::new(
            Arc::clone(&stores.content),
            Arc::clone(&stores.prefs),
        ));
        let engagement = EngagementCounter::new(Arc::clone(&stores.content));
        let archive = ArchiveToggle::new(Arc::clone(&stores.content), Arc::clone(&stores.prefs));
        let inbox = Inbox::new(Arc::clone(&stores.notifications));
        let newsroom = Newsroom::new(
            Arc::clone(&stores.content),
            Arc::clone(&stores.prefs),
            Arc::clone(&stores.comments),
            Arc::clone(&visibility),
            Arc::clone(&fanout),
        );

        Ok(Self {
            args,
            backend,
            jwt,
            stores,
            presence,
            fanout,
            visibility,
            engagement,
            archive,
            inbox,
            newsroom,
            started_at: Instant::now(),
        })
    }

    /// AppState over in-memory stores (dev mode and tests)
    pub fn in_memory(args: Args, users: Arc<MemoryUserDirectory>) -> Result<Self> {
        Self::new(args, "memory", Stores::memory(users))
    }

    /// AppState over MongoDB collections
    pub async fn with_mongo(args: Args, client: &MongoClient) -> Result<Self> {
        let stores = Stores::mongo(client).await?;
        Self::new(args, "mongodb", stores)
    }

    /// Verify the bearer token in `headers`
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Caller> {
        let header = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok());
        let token = extract_token_from_header(header)
            .ok_or_else(|| BulletinError::Unauthorized("No token provided".into()))?;
        self.authenticate_token(token)
    }

    pub fn authenticate_token(&self, token: &str) -> Result<Caller> {
        let claims = self.jwt.verify_token(token).into_claims()?;
        Caller::try_from(claims)
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Bulletin listening on {} (backend: {})",
        state.args.listen, state.backend
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - built-in token secret accepted");
    }

    info!(
        "Fan-out: concurrency {}, write timeout {}ms, push buffer {}",
        state.args.fanout_concurrency, state.args.fanout_write_timeout_ms, state.args.push_buffer
    );

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .with_upgrades()
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    let response = match (method.clone(), path.as_str()) {
        (Method::OPTIONS, _) => to_boxed(preflight_response()),

        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            to_boxed(routes::health_check(&state))
        }

        (Method::GET, "/ws") => {
            if hyper_tungstenite::is_upgrade_request(&req) {
                to_boxed(websocket::handle_presence_upgrade(Arc::clone(&state), req).await)
            } else {
                to_boxed(routes::error_response(&BulletinError::BadRequest(
                    "WebSocket upgrade required for /ws".into(),
                )))
            }
        }

        (_, p) if p.starts_with("/api/") => to_boxed(handle_api(&state, req).await),

        _ => to_boxed(routes::error_response(&BulletinError::NotFound(format!(
            "No route for {} {}",
            method, path
        )))),
    };

    Ok(response)
}

/// Authenticate, read the body and hand off to the API router
async fn handle_api(state: &AppState, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let caller = match state.authenticate(req.headers()) {
        Ok(caller) => caller,
        Err(e) => {
            debug!("Rejected request: {}", e);
            return routes::error_response(&e);
        }
    };

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);

    let body = match read_body(req.into_body(), state.args.max_body_bytes).await {
        Ok(body) => body,
        Err(e) => return routes::error_response(&e),
    };

    routes::respond(
        routes::handle_api_request(state, &caller, &method, &path, query.as_deref(), body).await,
    )
}

/// Collect a request body, refusing anything larger than `limit`
async fn read_body(body: Incoming, limit: usize) -> Result<Bytes> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) => {
            if e.downcast_ref::<http_body_util::LengthLimitError>().is_some() {
                Err(BulletinError::BadRequest(format!(
                    "Request body exceeds {} bytes",
                    limit
                )))
            } else {
                Err(BulletinError::BadRequest(format!(
                    "Failed to read body: {}",
                    e
                )))
            }
        }
    }
}

/// Convert a Full<Bytes> body to BoxBody
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .header(
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, DELETE, OPTIONS",
        )
        .header("Access-Control-Max-Age", "86400")
        .body(Full::new(Bytes::new()))
        .unwrap()
}
