use serde::Serialize;
use tracing::warn;
use yd_dapp_core::{AppSignal, DappClient};
use yd_storage::DisplayNameStore;

use crate::wallet_button::{self, WalletButtonView};

pub const BRAND: &str = "YD Web3 Course";
pub const DEFAULT_CREATOR_NAME: &str = "YD Creator";

const NAV_ITEMS: [(&str, &str); 4] = [
    ("Courses", "/"),
    ("Create course", "/create"),
    ("Staking", "/staking"),
    ("Profile", "/profile"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub label: &'static str,
    pub path: &'static str,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavBarView {
    pub brand: &'static str,
    pub items: Vec<NavItem>,
    pub display_name: String,
    pub wallet: WalletButtonView,
}

/// Display name shown in the bar; follows `DisplayNameChanged`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavBarState {
    pub display_name: Option<String>,
}

impl NavBarState {
    pub async fn load(client: &DappClient) -> Self {
        let display_name = match client.names.load_display_name().await {
            Ok(name) => name,
            Err(err) => {
                warn!("stored display name unreadable: {}", err);
                None
            }
        };
        Self { display_name }
    }

    pub fn apply(&mut self, signal: &AppSignal) {
        if let AppSignal::DisplayNameChanged(name) = signal {
            self.display_name = Some(name.clone());
        }
    }
}

pub fn render(path: &str, state: &NavBarState, wallet: WalletButtonView) -> NavBarView {
    NavBarView {
        brand: BRAND,
        items: NAV_ITEMS
            .iter()
            .map(|&(label, item_path)| NavItem {
                label,
                path: item_path,
                active: item_path == path,
            })
            .collect(),
        display_name: state
            .display_name
            .clone()
            .unwrap_or_else(|| DEFAULT_CREATOR_NAME.to_owned()),
        wallet,
    }
}

pub async fn view(client: &DappClient, path: &str, state: &NavBarState) -> NavBarView {
    render(path, state, wallet_button::view(client).await)
}
