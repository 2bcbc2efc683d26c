use alloy_primitives::Address;
use serde::Serialize;
use tracing::warn;
use yd_api_types::{ChainId, TokenAmount};
use yd_dapp_core::{DappClient, DappError, PendingAction, WalletState};
use yd_storage::DisplayNameStore;

use crate::feedback::Feedback;
use crate::format::{fixed_with_symbol, short_address};

pub const DEFAULT_LEARNER_NAME: &str = "YD Learner";
const DEFAULT_BUY_AMOUNT: &str = "200";

/// Native cost of `amount` platform tokens at `price`, 4 decimals;
/// `"0.00"` when either is missing or invalid.
pub fn estimated_cost(amount: &str, price: Option<&TokenAmount>) -> String {
    let (Ok(amount), Some(price)) = (TokenAmount::parse(amount), price) else {
        return "0.00".to_owned();
    };
    match amount.cost_at(price.base_units()) {
        Some(cost) => TokenAmount::from_base_units(cost).format_fixed(4),
        None => "0.00".to_owned(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnedCourse {
    pub id: String,
    pub title: String,
    pub content_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileView {
    pub display_name: String,
    pub connected: bool,
    pub address: Option<Address>,
    pub short_address: Option<String>,
    pub chain_id: ChainId,
    pub chain_name: String,
    pub native_balance: Option<String>,
    pub platform_balance: Option<String>,
    pub rename_input: String,
    pub renaming: bool,
    pub rename_status: Option<Feedback>,
    pub top_up_status: Option<Feedback>,
    pub last_signature: Option<String>,
    pub buy_amount: String,
    pub estimated_cost: String,
    pub buying: bool,
    pub buy_status: Option<Feedback>,
    pub purchased_courses: Vec<OwnedCourse>,
    pub toast: Option<Feedback>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileForm {
    pub rename_input: String,
    pub buy_amount: String,
    pub rename_status: Option<Feedback>,
    pub top_up_status: Option<Feedback>,
    pub last_signature: Option<String>,
    pub buy_status: Option<Feedback>,
    pub toast: Option<Feedback>,
}

impl Default for ProfileForm {
    fn default() -> Self {
        Self {
            rename_input: String::new(),
            buy_amount: DEFAULT_BUY_AMOUNT.to_owned(),
            rename_status: None,
            top_up_status: None,
            last_signature: None,
            buy_status: None,
            toast: None,
        }
    }
}

/// Everything the profile page reads, gathered before rendering.
#[derive(Debug, Clone, Default)]
pub struct ProfileReads {
    pub display_name: Option<String>,
    pub native_balance: Option<TokenAmount>,
    pub platform_balance: Option<TokenAmount>,
    pub token_price: Option<TokenAmount>,
    pub purchased_courses: Vec<OwnedCourse>,
}

pub fn render(
    wallet: &WalletState,
    default_chain: ChainId,
    reads: &ProfileReads,
    form: &ProfileForm,
    pending: &[PendingAction],
) -> ProfileView {
    let chain_id = wallet.chain_id().unwrap_or(default_chain);
    let address = wallet.address();
    ProfileView {
        display_name: reads
            .display_name
            .clone()
            .unwrap_or_else(|| DEFAULT_LEARNER_NAME.to_owned()),
        connected: wallet.is_connected(),
        address,
        short_address: address.as_ref().map(short_address),
        chain_id,
        chain_name: chain_id.name(),
        native_balance: reads.native_balance.map(|b| fixed_with_symbol(&b, 4, "ETH")),
        platform_balance: reads.platform_balance.map(|b| fixed_with_symbol(&b, 2, "YD")),
        rename_input: form.rename_input.clone(),
        renaming: pending
            .iter()
            .any(|action| matches!(action, PendingAction::SignRename | PendingAction::Rename)),
        rename_status: form.rename_status.clone(),
        top_up_status: form.top_up_status.clone(),
        last_signature: form.last_signature.clone(),
        buy_amount: form.buy_amount.clone(),
        estimated_cost: estimated_cost(&form.buy_amount, reads.token_price.as_ref()),
        buying: pending.contains(&PendingAction::BuyTokens),
        buy_status: form.buy_status.clone(),
        purchased_courses: reads.purchased_courses.clone(),
        toast: form.toast.clone(),
    }
}

async fn gather(client: &DappClient) -> ProfileReads {
    let display_name = client.names.load_display_name().await.unwrap_or_else(|err| {
        warn!("stored display name unreadable: {}", err);
        None
    });
    let catalog = client.reads.course_catalog().await;
    let purchased_courses = catalog
        .purchased_courses()
        .into_iter()
        .map(|course| OwnedCourse {
            id: course.id.to_string(),
            title: course.title.clone(),
            content_url: course.content_url.clone(),
        })
        .collect();

    ProfileReads {
        display_name,
        native_balance: client.reads.native_balance().await,
        platform_balance: client.reads.platform_balance().await,
        token_price: client.reads.token_price().await,
        purchased_courses,
    }
}

pub async fn view(client: &DappClient, form: &ProfileForm) -> ProfileView {
    let reads = gather(client).await;
    render(
        &client.wallet.state(),
        client.wallet.default_chain(),
        &reads,
        form,
        &client.submitter.pending(),
    )
}

fn wallet_first(action: &str, err: &DappError) -> Feedback {
    match err {
        DappError::WalletNotConnected => Feedback::error("Connect your wallet first."),
        other => Feedback::failed(action, other),
    }
}

pub async fn rename(client: &DappClient, form: &mut ProfileForm) -> ProfileView {
    form.rename_status = None;
    form.top_up_status = None;

    match client.submitter.rename_profile(&form.rename_input).await {
        Ok(outcome) => {
            form.rename_status = Some(Feedback::success(format!(
                "Display name updated to \"{}\" (tx: {}).",
                outcome.display_name, outcome.tx
            )));
            form.top_up_status = Some(Feedback::follow_up("Fee top-up", &outcome.top_up));
            form.last_signature = Some(outcome.signature);
            form.toast = Some(Feedback::success("Profile updated."));
            form.rename_input.clear();
        }
        Err(err) => form.rename_status = Some(wallet_first("Rename failed", &err)),
    }
    view(client, form).await
}

pub async fn buy_tokens(client: &DappClient, form: &mut ProfileForm) -> ProfileView {
    form.buy_status = None;

    match client.submitter.buy_tokens(&form.buy_amount).await {
        Ok(purchase) => {
            let message = format!(
                "Bought {} YD for {} ETH.",
                purchase.amount,
                purchase.cost.format_fixed(4)
            );
            form.buy_status = Some(Feedback::success(message.clone()));
            form.toast = Some(Feedback::success(message));
        }
        Err(err) => form.buy_status = Some(wallet_first("Token purchase failed", &err)),
    }
    view(client, form).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use yd_dapp_core::WalletSession;

    fn price() -> TokenAmount {
        TokenAmount::parse("0.001").unwrap()
    }

    #[test]
    fn estimated_cost_needs_amount_and_price() {
        assert_eq!(estimated_cost("200", Some(&price())), "0.2000");
        assert_eq!(estimated_cost("1.5", Some(&price())), "0.0015");
        assert_eq!(estimated_cost("", Some(&price())), "0.00");
        assert_eq!(estimated_cost("200", None), "0.00");
    }

    #[test]
    fn disconnected_profile_uses_defaults() {
        let view = render(
            &WalletState::default(),
            ChainId::HARDHAT,
            &ProfileReads::default(),
            &ProfileForm::default(),
            &[],
        );
        assert_eq!(view.display_name, DEFAULT_LEARNER_NAME);
        assert_eq!(view.chain_name, "Hardhat");
        assert_eq!(view.buy_amount, "200");
        assert_eq!(view.estimated_cost, "0.00");
        assert!(!view.connected);
        assert!(view.purchased_courses.is_empty());
    }

    #[test]
    fn connected_profile_shows_balances_and_pending_rename() {
        let wallet = WalletState {
            session: Some(WalletSession {
                address: "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap(),
                chain_id: ChainId::SEPOLIA,
                connector: "injected".into(),
            }),
            ..WalletState::default()
        };
        let reads = ProfileReads {
            display_name: Some("Ada".into()),
            native_balance: Some(TokenAmount::parse("1.23456").unwrap()),
            platform_balance: Some(TokenAmount::from_tokens(95)),
            token_price: Some(price()),
            purchased_courses: vec![OwnedCourse {
                id: "1".into(),
                title: "Rust".into(),
                content_url: "ipfs://rust".into(),
            }],
        };
        let view = render(
            &wallet,
            ChainId::HARDHAT,
            &reads,
            &ProfileForm::default(),
            &[PendingAction::SignRename],
        );
        assert_eq!(view.display_name, "Ada");
        assert_eq!(view.chain_name, "Sepolia");
        assert_eq!(view.short_address.as_deref(), Some("0xf39F...2266"));
        assert_eq!(view.native_balance.as_deref(), Some("1.2345 ETH"));
        assert_eq!(view.platform_balance.as_deref(), Some("95.00 YD"));
        assert_eq!(view.estimated_cost, "0.2000");
        assert!(view.renaming);
        assert!(!view.buying);
        assert_eq!(view.purchased_courses[0].content_url, "ipfs://rust");
    }
}
