use std::sync::Arc;

use yd_api_types::{CourseId, StakeAsset, TokenAmount};
use yd_chain_client::{ProviderError, ProviderRegistry};
use yd_chain_memory::{MemoryChain, MemoryChainConfig};
use yd_contracts::abi::{IPlatformToken, IStakingTreasury};
use yd_contracts::{AddressBook, SolCall};
use yd_dapp_core::{DappClient, SyncOptions};
use yd_storage::InMemoryDisplayNameStore;
use yd_views::feedback::Tone;
use yd_views::listing::BuyState;
use yd_views::{
    CreateCourseForm, ListingForm, NavBarState, ProfileForm, StakingForm, create_course, listing, navbar,
    profile, staking, wallet_button,
};

fn client() -> (Arc<MemoryChain>, DappClient) {
    let chain = Arc::new(MemoryChain::new(MemoryChainConfig::hardhat(&AddressBook::builtin())));
    let mut registry = ProviderRegistry::default();
    registry.register(chain.clone());
    let client = DappClient::new(
        registry,
        chain.clone(),
        AddressBook::builtin(),
        Arc::new(InMemoryDisplayNameStore::default()),
        SyncOptions { sample_fallback: false },
    );
    (chain, client)
}

fn filled_form(name: &str) -> CreateCourseForm {
    CreateCourseForm {
        name: name.to_owned(),
        description: "From zero to deployed contracts".to_owned(),
        price: "0.5".to_owned(),
        content_url: "ipfs://rust-course".to_owned(),
        ..CreateCourseForm::default()
    }
}

#[tokio::test]
async fn created_course_can_be_bought_from_the_listing() {
    let (_chain, client) = client();
    let button = wallet_button::connect(&client).await;
    assert!(button.connected);

    let mut form = filled_form("Rust for Solidity devs");
    let created = create_course::submit(&client, &mut form).await;
    assert_eq!(created.primary_status.as_ref().map(|s| s.tone), Some(Tone::Success));
    assert_eq!(created.follow_up_status.as_ref().map(|s| s.tone), Some(Tone::Success));
    assert_eq!(created.name, "", "form resets after createCourse succeeds");

    let mut page = ListingForm::default();
    let before = listing::view(&client, &page).await;
    assert_eq!(before.cards.len(), 1);
    assert_eq!(before.cards[0].buy, BuyState::Buy);
    assert_eq!(before.cards[0].content_url, None);
    assert!(before.demo_banner.is_none());

    let after = listing::purchase(&client, &mut page, &CourseId("1".into())).await;
    assert_eq!(after.feedback.as_ref().map(|f| f.tone), Some(Tone::Success));
    assert_eq!(after.cards[0].buy, BuyState::Purchased);
    assert_eq!(after.cards[0].content_url.as_deref(), Some("ipfs://rust-course"));

    let owned = profile::view(&client, &ProfileForm::default()).await;
    assert_eq!(owned.purchased_courses.len(), 1);
    assert_eq!(owned.purchased_courses[0].title, "Rust for Solidity devs");
}

#[tokio::test]
async fn purchase_without_wallet_asks_to_connect() {
    let (chain, client) = client();
    wallet_button::connect(&client).await;
    create_course::submit(&client, &mut filled_form("Intro")).await;
    wallet_button::disconnect(&client).await;

    let mut page = ListingForm::default();
    let view = listing::purchase(&client, &mut page, &CourseId("1".into())).await;
    let feedback = view.feedback.unwrap();
    assert_eq!(feedback.tone, Tone::Error);
    assert_eq!(feedback.message, "Connect your wallet before purchasing.");
    assert!(
        chain
            .transactions()
            .await
            .iter()
            .all(|tx| tx.function != "purchaseCourse")
    );
}

#[tokio::test]
async fn missing_course_name_keeps_the_form() {
    let (chain, client) = client();
    wallet_button::connect(&client).await;

    let mut form = filled_form("   ");
    let view = create_course::submit(&client, &mut form).await;
    assert_eq!(
        view.primary_status.map(|s| s.message).as_deref(),
        Some("course name is required")
    );
    assert_eq!(view.follow_up_status, None);
    assert_eq!(view.content_url, "ipfs://rust-course");
    assert!(chain.transactions().await.is_empty());
}

#[tokio::test]
async fn listing_reports_a_catalog_fetch_already_in_flight() {
    let (chain, client) = client();
    chain.pause_reads(true);

    let form = ListingForm::default();
    let mut other = Box::pin(client.reads.course_catalog());
    assert!(futures::poll!(&mut other).is_pending());
    let mut page = Box::pin(listing::view(&client, &form));
    assert!(futures::poll!(&mut page).is_pending());

    chain.pause_reads(false);
    assert!(page.await.loading);
    other.await;
    assert!(!listing::view(&client, &form).await.loading);
}

#[tokio::test]
async fn staking_enforces_minimum_then_shows_position() {
    let (chain, client) = client();
    let mut form = StakingForm {
        amount: "0.05".into(),
        ..StakingForm::default()
    };
    let view = staking::deposit(&client, &mut form).await;
    assert_eq!(view.feedback.unwrap().message, "Connect your wallet to stake.");

    wallet_button::connect(&client).await;
    let view = staking::deposit(&client, &mut form).await;
    assert_eq!(view.feedback.unwrap().message, "Minimum stake is 0.1 ETH.");
    assert!(chain.transactions().await.is_empty());

    form.amount = "2".into();
    let view = staking::deposit(&client, &mut form).await;
    assert_eq!(view.feedback.as_ref().map(|f| f.tone), Some(Tone::Success));
    assert_eq!(view.amount, "");
    assert_eq!(view.positions[0].staked, "2 ETH");
    assert_eq!(view.positions[0].yearly_profit, "0.2400 ETH");

    form.amount = "0.5".into();
    let view = staking::withdraw(&client, &mut form).await;
    assert_eq!(view.positions[0].staked, "1.5 ETH");

    form.asset = StakeAsset::Token;
    form.amount = "500".into();
    let view = staking::deposit(&client, &mut form).await;
    assert_eq!(view.feedback.unwrap().tone, Tone::Error);
}

#[tokio::test]
async fn failed_token_deposit_shows_the_granted_approval() {
    let (chain, client) = client();
    wallet_button::connect(&client).await;
    chain
        .fail_function(
            IStakingTreasury::depositYdCall::SELECTOR,
            ProviderError::Reverted(Some("paused".into())),
        )
        .await;

    let mut form = StakingForm {
        asset: StakeAsset::Token,
        amount: "50".into(),
        ..StakingForm::default()
    };
    let view = staking::deposit(&client, &mut form).await;
    let approval = view.approval_status.unwrap();
    assert_eq!(approval.tone, Tone::Success);
    assert!(approval.message.starts_with("Approval granted (tx: 0x"));
    let feedback = view.feedback.unwrap();
    assert_eq!(feedback.tone, Tone::Error);
    assert_eq!(feedback.message, "Stake failed: transaction reverted: paused");
    assert_eq!(view.amount, "50");
    assert_eq!(view.positions[1].staked, "0 YD");

    let staking = chain.deployment().staking_treasury.unwrap();
    assert_eq!(
        chain.allowance(chain.accounts()[0], staking).await,
        TokenAmount::from_tokens(50).base_units()
    );
}

#[tokio::test]
async fn rename_updates_profile_and_navbar() {
    let (chain, client) = client();
    wallet_button::connect(&client).await;
    let mut nav = NavBarState::load(&client).await;
    let mut signals = client.signals.subscribe();

    let mut form = ProfileForm {
        rename_input: "Ada".into(),
        ..ProfileForm::default()
    };
    let view = profile::rename(&client, &mut form).await;
    assert_eq!(view.display_name, "Ada");
    assert_eq!(view.rename_status.as_ref().map(|s| s.tone), Some(Tone::Success));
    assert_eq!(view.top_up_status.as_ref().map(|s| s.tone), Some(Tone::Success));
    assert!(view.last_signature.is_some());
    assert_eq!(view.rename_input, "");
    assert!(chain.profile(chain.accounts()[0]).await.is_some());

    while let Ok(signal) = signals.try_recv() {
        nav.apply(&signal);
    }
    let bar = navbar::view(&client, "/profile", &nav).await;
    assert_eq!(bar.display_name, "Ada");
    assert!(bar.items.iter().any(|item| item.path == "/profile" && item.active));
}

#[tokio::test]
async fn buy_tokens_reports_cost() {
    let (_chain, client) = client();
    wallet_button::connect(&client).await;

    let mut form = ProfileForm::default();
    let view = profile::view(&client, &form).await;
    assert_eq!(view.estimated_cost, "0.2000");

    let view = profile::buy_tokens(&client, &mut form).await;
    assert_eq!(
        view.buy_status.map(|s| s.message).as_deref(),
        Some("Bought 200 YD for 0.2000 ETH.")
    );
    assert_eq!(view.platform_balance.as_deref(), Some("300.00 YD"));
}

#[tokio::test]
async fn rename_survives_a_failed_top_up() {
    let (chain, client) = client();
    wallet_button::connect(&client).await;
    chain
        .fail_function(
            IPlatformToken::buyTokensCall::SELECTOR,
            ProviderError::Reverted(Some("sale closed".into())),
        )
        .await;

    let mut form = ProfileForm {
        rename_input: "Grace".into(),
        ..ProfileForm::default()
    };
    let view = profile::rename(&client, &mut form).await;
    assert_eq!(view.display_name, "Grace");
    assert_eq!(view.rename_status.as_ref().map(|s| s.tone), Some(Tone::Success));
    let top_up = view.top_up_status.unwrap();
    assert_eq!(top_up.tone, Tone::Error);
    assert_eq!(top_up.message, "Fee top-up failed: transaction reverted: sale closed");
    assert_eq!(view.platform_balance.as_deref(), Some("95.00 YD"));
}
