use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use yd_api_types::{
    BuyTokensRequest, ChainId, CourseId, CreateCourseRequest, RenameRequest, StakeRequest, SwitchChainRequest,
};
use yd_views::{
    CreateCourseView, ListingView, NavBarView, ProfileView, StakingView, WalletButtonView, create_course,
    listing, navbar, profile, staking, wallet_button,
};

use crate::{AppState, ApiResult, bad_request};

#[derive(Debug, Deserialize)]
pub(crate) struct NavQuery {
    pub(crate) path: Option<String>,
}

// ── Wallet ──

pub(crate) async fn wallet(State(state): State<Arc<AppState>>) -> Json<WalletButtonView> {
    Json(wallet_button::view(&state.client).await)
}

pub(crate) async fn wallet_connect(State(state): State<Arc<AppState>>) -> Json<WalletButtonView> {
    let view = wallet_button::connect(&state.client).await;
    info!("wallet connect: connected={}", view.connected);
    Json(view)
}

pub(crate) async fn wallet_disconnect(State(state): State<Arc<AppState>>) -> Json<WalletButtonView> {
    Json(wallet_button::disconnect(&state.client).await)
}

pub(crate) async fn wallet_switch_chain(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SwitchChainRequest>,
) -> Json<WalletButtonView> {
    Json(wallet_button::switch_chain(&state.client, ChainId(request.chain_id)).await)
}

// ── Navigation ──

pub(crate) async fn nav(State(state): State<Arc<AppState>>, Query(query): Query<NavQuery>) -> ApiResult<NavBarView> {
    let path = query.path.unwrap_or_else(|| "/".to_owned());
    if !path.starts_with('/') {
        return Err(bad_request("path must start with '/'"));
    }
    let nav = state.nav.read().await.clone();
    Ok(Json(navbar::view(&state.client, &path, &nav).await))
}

// ── Courses ──

pub(crate) async fn courses(State(state): State<Arc<AppState>>) -> Json<ListingView> {
    let form = state.listing.lock().await;
    Json(listing::view(&state.client, &form).await)
}

pub(crate) async fn purchase_course(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<ListingView> {
    let mut form = state.listing.lock().await;
    Json(listing::purchase(&state.client, &mut form, &CourseId(id)).await)
}

pub(crate) async fn new_course(State(state): State<Arc<AppState>>) -> Json<CreateCourseView> {
    let form = state.create_course.lock().await;
    Json(create_course::view(&state.client, &form))
}

pub(crate) async fn create_course(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateCourseRequest>,
) -> Json<CreateCourseView> {
    let mut form = state.create_course.lock().await;
    form.fill(&request);
    Json(create_course::submit(&state.client, &mut form).await)
}

// ── Staking ──

pub(crate) async fn staking_page(State(state): State<Arc<AppState>>) -> Json<StakingView> {
    let form = state.staking.lock().await;
    Json(staking::view(&state.client, &form).await)
}

pub(crate) async fn staking_deposit(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StakeRequest>,
) -> Json<StakingView> {
    let mut form = state.staking.lock().await;
    form.asset = request.asset;
    form.amount = request.amount;
    Json(staking::deposit(&state.client, &mut form).await)
}

pub(crate) async fn staking_withdraw(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StakeRequest>,
) -> Json<StakingView> {
    let mut form = state.staking.lock().await;
    form.asset = request.asset;
    form.amount = request.amount;
    Json(staking::withdraw(&state.client, &mut form).await)
}

// ── Profile ──

pub(crate) async fn profile_page(State(state): State<Arc<AppState>>) -> Json<ProfileView> {
    let form = state.profile.lock().await;
    Json(profile::view(&state.client, &form).await)
}

pub(crate) async fn profile_rename(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RenameRequest>,
) -> Json<ProfileView> {
    let mut form = state.profile.lock().await;
    form.rename_input = request.name;
    Json(profile::rename(&state.client, &mut form).await)
}

pub(crate) async fn profile_buy_tokens(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BuyTokensRequest>,
) -> Json<ProfileView> {
    let mut form = state.profile.lock().await;
    form.buy_amount = request.amount;
    Json(profile::buy_tokens(&state.client, &mut form).await)
}
