use alloy_primitives::Address;
use serde::Serialize;
use yd_api_types::{ChainId, TokenAmount};
use yd_dapp_core::{DappClient, WalletState};

use crate::format::{fixed_with_symbol, short_address};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletButtonView {
    pub connected: bool,
    pub busy: bool,
    pub label: String,
    pub address: Option<Address>,
    pub short_address: Option<String>,
    pub chain_id: Option<ChainId>,
    pub chain_name: Option<String>,
    pub balance: Option<String>,
    pub error: Option<String>,
}

pub fn render(state: &WalletState, balance: Option<TokenAmount>) -> WalletButtonView {
    let busy = state.connecting || state.disconnecting;
    let Some(session) = state.session.as_ref() else {
        let label = if state.connecting { "Connecting..." } else { "Connect wallet" };
        return WalletButtonView {
            connected: false,
            busy,
            label: label.to_owned(),
            address: None,
            short_address: None,
            chain_id: None,
            chain_name: None,
            balance: None,
            error: state.last_error.clone(),
        };
    };

    let short = short_address(&session.address);
    WalletButtonView {
        connected: true,
        busy,
        label: short.clone(),
        address: Some(session.address),
        short_address: Some(short),
        chain_id: Some(session.chain_id),
        chain_name: Some(session.chain_id.name()),
        balance: balance.map(|b| fixed_with_symbol(&b, 3, "ETH")),
        error: state.last_error.clone(),
    }
}

pub async fn view(client: &DappClient) -> WalletButtonView {
    let balance = client.reads.native_balance().await;
    render(&client.wallet.state(), balance)
}

/// Errors are not returned: they land in the view's transient `error`.
pub async fn connect(client: &DappClient) -> WalletButtonView {
    if client.wallet.connect().await.is_ok() {
        client.wallet.clear_error();
    }
    view(client).await
}

pub async fn disconnect(client: &DappClient) -> WalletButtonView {
    let _ = client.wallet.disconnect().await;
    view(client).await
}

pub async fn switch_chain(client: &DappClient, chain: ChainId) -> WalletButtonView {
    let _ = client.wallet.switch_chain(chain).await;
    view(client).await
}
