mod chain_config;
mod config;
mod pages;

use anyhow::anyhow;
use axum::{
    Json, Router,
    http::{
        Method, StatusCode,
        header::{ACCEPT, CONTENT_TYPE},
    },
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, broadcast::error::RecvError};
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use yd_chain_client::{ProviderRegistry, WalletProvider};
use yd_chain_memory::{MemoryChain, MemoryChainConfig};
use yd_chain_rpc::JsonRpcProvider;
use yd_contracts::AddressBook;
use yd_dapp_core::{DappClient, SyncOptions};
use yd_storage::{DisplayNameStore, InMemoryDisplayNameStore, RocksDbDisplayNameStore};
use yd_views::{CreateCourseForm, ListingForm, NavBarState, ProfileForm, StakingForm};

use crate::config::{Config, ProviderKind};

#[derive(Debug, Serialize)]
struct HealthResponse {
    service: &'static str,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct VersionResponse {
    service: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

/// One client session plus the local form state of every page.
pub(crate) struct AppState {
    client: DappClient,
    nav: Arc<RwLock<NavBarState>>,
    listing: Mutex<ListingForm>,
    create_course: Mutex<CreateCourseForm>,
    staking: Mutex<StakingForm>,
    profile: Mutex<ProfileForm>,
}

impl AppState {
    async fn new(client: DappClient) -> Arc<Self> {
        let nav = NavBarState::load(&client).await;
        Arc::new(Self {
            client,
            nav: Arc::new(RwLock::new(nav)),
            listing: Mutex::new(ListingForm::default()),
            create_course: Mutex::new(CreateCourseForm::default()),
            staking: Mutex::new(StakingForm::default()),
            profile: Mutex::new(ProfileForm::default()),
        })
    }

    /// Background tasks: balance re-reads and the nav bar's display name.
    fn spawn_listeners(&self) -> [JoinHandle<()>; 2] {
        let mut signals = self.client.signals.subscribe();
        let nav = Arc::clone(&self.nav);
        let nav_task = tokio::spawn(async move {
            loop {
                match signals.recv().await {
                    Ok(signal) => nav.write().await.apply(&signal),
                    Err(RecvError::Lagged(missed)) => warn!("nav listener missed {} signals", missed),
                    Err(RecvError::Closed) => break,
                }
            }
        });
        [self.client.spawn_refresh_listener(), nav_task]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    let client = build_client(&config)?;
    let state = AppState::new(client).await;
    state.spawn_listeners();

    let app = router(state);
    info!("course-service listening on {}", config.bind_address);

    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn build_client(config: &Config) -> anyhow::Result<DappClient> {
    let book = AddressBook::builtin()
        .with_default_chain(config.default_chain)
        .with_env_overrides();

    let provider: Arc<dyn WalletProvider> = match config.provider {
        ProviderKind::Rpc => {
            info!("using JSON-RPC wallet at {}", config.rpc_url);
            Arc::new(JsonRpcProvider::new(Some(config.rpc_url.clone())))
        }
        ProviderKind::Memory => {
            warn!("using the in-memory chain; nothing is persisted on chain");
            Arc::new(MemoryChain::new(MemoryChainConfig::hardhat(&book)))
        }
    };
    let mut registry = ProviderRegistry::default();
    registry.register(provider.clone());

    let names: Arc<dyn DisplayNameStore> = match &config.display_name_db {
        Some(path) => {
            let path = path
                .to_str()
                .ok_or_else(|| anyhow!("DISPLAY_NAME_DB is not valid UTF-8"))?;
            Arc::new(RocksDbDisplayNameStore::open_default(path)?)
        }
        None => Arc::new(InMemoryDisplayNameStore::default()),
    };

    let options = SyncOptions {
        sample_fallback: config.sample_fallback,
    };
    Ok(DappClient::new(registry, provider, book, names, options))
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/chain/config", get(chain_config::chain_config))
        .route("/wallet", get(pages::wallet))
        .route("/wallet/connect", post(pages::wallet_connect))
        .route("/wallet/disconnect", post(pages::wallet_disconnect))
        .route("/wallet/switch-chain", post(pages::wallet_switch_chain))
        .route("/nav", get(pages::nav))
        .route("/courses", get(pages::courses).post(pages::create_course))
        .route("/courses/new", get(pages::new_course))
        .route("/courses/{id}/purchase", post(pages::purchase_course))
        .route("/staking", get(pages::staking_page))
        .route("/staking/deposit", post(pages::staking_deposit))
        .route("/staking/withdraw", post(pages::staking_withdraw))
        .route("/profile", get(pages::profile_page))
        .route("/profile/rename", post(pages::profile_rename))
        .route("/profile/buy-tokens", post(pages::profile_buy_tokens))
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        service: "course-service",
        status: "ok",
    })
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        service: "course-service",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn bad_request(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_owned(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::{Value, json};
    use std::time::Duration;
    use tower::ServiceExt;

    async fn memory_app() -> (Arc<AppState>, Router) {
        let config = Config::from_lookup(|key| match key {
            "YD_PROVIDER" => Some("memory".to_owned()),
            "YD_SAMPLE_FALLBACK" => Some("false".to_owned()),
            _ => None,
        })
        .unwrap();
        let state = AppState::new(build_client(&config).unwrap()).await;
        state.spawn_listeners();
        (state.clone(), router(state))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn health_and_chain_config() {
        let (_, app) = memory_app().await;
        let (status, body) = call(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "course-service");

        let (_, body) = call(&app, "GET", "/chain/config", None).await;
        assert_eq!(body["chain_id"], 31337);
        assert_eq!(body["connected"], false);
        assert_eq!(body["contracts"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn actions_answer_with_page_feedback() {
        let (_, app) = memory_app().await;
        let (status, body) = call(&app, "POST", "/courses/1/purchase", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["feedback"]["tone"], "error");

        let (status, body) = call(
            &app,
            "POST",
            "/staking/deposit",
            Some(json!({ "asset": "eth", "amount": "1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["feedback"]["message"], "Connect your wallet to stake.");
    }

    #[tokio::test]
    async fn create_buy_and_list_a_course() {
        let (_, app) = memory_app().await;
        let (_, wallet) = call(&app, "POST", "/wallet/connect", None).await;
        assert_eq!(wallet["connected"], true);
        assert_eq!(wallet["label"], "0xf39F...2266");

        let (_, created) = call(
            &app,
            "POST",
            "/courses",
            Some(json!({
                "name": "Rust for dApps",
                "description": "Typed contract bindings",
                "price": "0.25",
                "category": "expert",
                "content_url": "ipfs://rust-dapps"
            })),
        )
        .await;
        assert_eq!(created["primary_status"]["tone"], "success");
        assert_eq!(created["follow_up_status"]["tone"], "success");

        let (_, listing) = call(&app, "POST", "/courses/1/purchase", None).await;
        assert_eq!(listing["cards"][0]["buy"], "purchased");
        assert_eq!(listing["cards"][0]["category"], "Expert");
        assert_eq!(listing["cards"][0]["content_url"], "ipfs://rust-dapps");

        let (_, profile) = call(&app, "GET", "/profile", None).await;
        assert_eq!(profile["purchased_courses"][0]["title"], "Rust for dApps");
    }

    #[tokio::test]
    async fn rename_reaches_the_nav_bar() {
        let (state, app) = memory_app().await;
        call(&app, "POST", "/wallet/connect", None).await;

        let (_, profile) = call(&app, "POST", "/profile/rename", Some(json!({ "name": "Ada" }))).await;
        assert_eq!(profile["display_name"], "Ada");

        for _ in 0..50 {
            if state.nav.read().await.display_name.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let (_, nav) = call(&app, "GET", "/nav?path=/profile", None).await;
        assert_eq!(nav["display_name"], "Ada");
    }

    #[tokio::test]
    async fn nav_rejects_relative_paths() {
        let (_, app) = memory_app().await;
        let (status, body) = call(&app, "GET", "/nav?path=profile", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "path must start with '/'");
    }

    #[tokio::test]
    async fn display_name_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("names").to_string_lossy().into_owned();
        let lookup = |key: &str| match key {
            "YD_PROVIDER" => Some("memory".to_owned()),
            "DISPLAY_NAME_DB" => Some(db.clone()),
            _ => None,
        };

        {
            let state = AppState::new(build_client(&Config::from_lookup(lookup).unwrap()).unwrap()).await;
            state.client.wallet.connect().await.unwrap();
            state.client.submitter.rename_profile("Grace").await.unwrap();
        }

        let state = AppState::new(build_client(&Config::from_lookup(lookup).unwrap()).unwrap()).await;
        assert_eq!(state.nav.read().await.display_name.as_deref(), Some("Grace"));
    }
}
