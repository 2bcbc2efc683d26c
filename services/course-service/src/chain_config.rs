use axum::{Json, extract::State};
use std::sync::Arc;
use yd_api_types::{ChainConfigResponse, ContractAddressInfo};
use yd_contracts::ContractName;

use crate::AppState;

/// Chain the session is on (the default chain while disconnected) and the
/// contract addresses resolved for it. Unresolved contracts are `null`.
pub(crate) async fn chain_config(State(state): State<Arc<AppState>>) -> Json<ChainConfigResponse> {
    let wallet = state.client.wallet.state();
    let chain_id = state.client.wallet.current_chain();
    let book = state.client.reads.address_book();

    Json(ChainConfigResponse {
        chain_id,
        chain_name: chain_id.name(),
        connected: wallet.is_connected(),
        contracts: ContractName::ALL
            .iter()
            .map(|name| ContractAddressInfo {
                contract: name.as_str().to_owned(),
                address: book.resolve(*name, Some(chain_id)),
            })
            .collect(),
    })
}
