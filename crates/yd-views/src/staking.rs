//! Staking page: the two staking products, expected yield for the entered
//! amount, current positions, and deposit / withdraw actions.

use serde::Serialize;
use yd_api_types::{StakeAsset, StakingPosition, TokenAmount, U256};
use yd_dapp_core::{DappClient, DappError, PendingAction};

use crate::feedback::Feedback;
use crate::format::with_symbol;

const DAYS_PER_YEAR: u64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakingProduct {
    pub asset: StakeAsset,
    pub apy_percent: u64,
    pub lock_days: u64,
    pub minimum: &'static str,
}

pub const PRODUCTS: [StakingProduct; 2] = [
    StakingProduct {
        asset: StakeAsset::Native,
        apy_percent: 12,
        lock_days: 30,
        minimum: "0.1",
    },
    StakingProduct {
        asset: StakeAsset::Token,
        apy_percent: 18,
        lock_days: 60,
        minimum: "50",
    },
];

pub fn product(asset: StakeAsset) -> StakingProduct {
    match asset {
        StakeAsset::Native => PRODUCTS[0],
        StakeAsset::Token => PRODUCTS[1],
    }
}

/// Yield over the product's lock period, 4 decimals; `"0.0000"` for
/// anything that is not a valid amount.
pub fn expected_yield(amount: &str, product: &StakingProduct) -> String {
    TokenAmount::parse(amount)
        .ok()
        .and_then(|amount| {
            amount.mul_div(
                U256::from(product.apy_percent * product.lock_days),
                U256::from(100 * DAYS_PER_YEAR),
            )
        })
        .unwrap_or(TokenAmount::ZERO)
        .format_fixed(4)
}

pub fn yearly_profit(staked: &TokenAmount, product: &StakingProduct) -> String {
    staked
        .mul_div(U256::from(product.apy_percent), U256::from(100u8))
        .unwrap_or(TokenAmount::ZERO)
        .format_fixed(4)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductView {
    pub asset: StakeAsset,
    pub symbol: &'static str,
    pub apy: String,
    pub lock_days: u64,
    pub minimum: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionView {
    pub asset: StakeAsset,
    pub staked: String,
    pub yearly_profit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StakingView {
    pub products: Vec<ProductView>,
    pub asset: StakeAsset,
    pub amount: String,
    pub expected_yield: String,
    pub positions: Vec<PositionView>,
    pub pending: Option<&'static str>,
    pub feedback: Option<Feedback>,
    /// Token approval that went on chain, shown next to the deposit result.
    pub approval_status: Option<Feedback>,
    pub toast: Option<Feedback>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakingForm {
    pub asset: StakeAsset,
    pub amount: String,
    pub feedback: Option<Feedback>,
    pub approval_status: Option<Feedback>,
    pub toast: Option<Feedback>,
}

impl Default for StakingForm {
    fn default() -> Self {
        Self {
            asset: StakeAsset::Native,
            amount: String::new(),
            feedback: None,
            approval_status: None,
            toast: None,
        }
    }
}

fn pending_label(pending: &[PendingAction]) -> Option<&'static str> {
    pending.iter().rev().find_map(|action| match action {
        PendingAction::Approve => Some("Approving..."),
        PendingAction::Stake(_) => Some("Staking..."),
        PendingAction::Withdraw(_) => Some("Withdrawing..."),
        _ => None,
    })
}

pub fn render(
    form: &StakingForm,
    position: Option<&StakingPosition>,
    pending: &[PendingAction],
) -> StakingView {
    let products = PRODUCTS
        .iter()
        .map(|p| ProductView {
            asset: p.asset,
            symbol: p.asset.symbol(),
            apy: format!("{}%", p.apy_percent),
            lock_days: p.lock_days,
            minimum: format!("{} {}", p.minimum, p.asset.symbol()),
            selected: p.asset == form.asset,
        })
        .collect();

    let positions = position
        .map(|position| {
            PRODUCTS
                .iter()
                .map(|p| {
                    let staked = position.amount(p.asset);
                    PositionView {
                        asset: p.asset,
                        staked: with_symbol(&staked, p.asset.symbol()),
                        yearly_profit: format!("{} {}", yearly_profit(&staked, p), p.asset.symbol()),
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    StakingView {
        products,
        asset: form.asset,
        amount: form.amount.clone(),
        expected_yield: expected_yield(&form.amount, &product(form.asset)),
        positions,
        pending: pending_label(pending),
        feedback: form.feedback.clone(),
        approval_status: form.approval_status.clone(),
        toast: form.toast.clone(),
    }
}

pub async fn view(client: &DappClient, form: &StakingForm) -> StakingView {
    let position = client.reads.staking_position().await;
    render(form, position.as_ref(), &client.submitter.pending())
}

/// Rejects amounts under the product minimum; unparsable amounts are left
/// to the submitter so its validation message is shown.
fn check_minimum(asset: StakeAsset, amount: &str) -> Result<(), Feedback> {
    let product = product(asset);
    let (Ok(amount), Ok(minimum)) = (TokenAmount::parse(amount), TokenAmount::parse(product.minimum)) else {
        return Ok(());
    };
    if amount < minimum {
        return Err(Feedback::error(format!(
            "Minimum stake is {} {}.",
            product.minimum,
            asset.symbol()
        )));
    }
    Ok(())
}

fn action_error(action: &str, err: &DappError) -> Feedback {
    match err {
        DappError::WalletNotConnected => Feedback::error("Connect your wallet to stake."),
        other => Feedback::failed(action, other),
    }
}

pub async fn deposit(client: &DappClient, form: &mut StakingForm) -> StakingView {
    form.feedback = None;
    form.approval_status = None;
    if !client.wallet.state().is_connected() {
        form.feedback = Some(action_error("Stake failed", &DappError::WalletNotConnected));
        return view(client, form).await;
    }
    if let Err(feedback) = check_minimum(form.asset, &form.amount) {
        form.feedback = Some(feedback);
        return view(client, form).await;
    }

    match client.submitter.stake(form.asset, &form.amount).await {
        Ok(outcome) => {
            form.approval_status = outcome
                .approval
                .map(|hash| Feedback::success(format!("Approval granted (tx: {hash}).")));
            match outcome.deposit {
                Ok(_) => {
                    let message = format!("Staked {} {}.", form.amount.trim(), form.asset.symbol());
                    form.feedback = Some(Feedback::success(message.clone()));
                    form.toast = Some(Feedback::success(message));
                    form.amount.clear();
                }
                Err(err) => form.feedback = Some(action_error("Stake failed", &err)),
            }
        }
        Err(err) => form.feedback = Some(action_error("Stake failed", &err)),
    }
    view(client, form).await
}

pub async fn withdraw(client: &DappClient, form: &mut StakingForm) -> StakingView {
    form.feedback = None;
    form.approval_status = None;
    match client.submitter.withdraw(form.asset, &form.amount).await {
        Ok(_) => {
            let message = format!("Withdrew {} {}.", form.amount.trim(), form.asset.symbol());
            form.feedback = Some(Feedback::success(message.clone()));
            form.toast = Some(Feedback::success(message));
            form.amount.clear();
        }
        Err(err) => form.feedback = Some(action_error("Withdraw failed", &err)),
    }
    view(client, form).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_yield_uses_period_rate() {
        // 10 ETH * 12% * 30 / 365
        assert_eq!(expected_yield("10", &product(StakeAsset::Native)), "0.0986");
        // 1000 YD * 18% * 60 / 365
        assert_eq!(expected_yield("1000", &product(StakeAsset::Token)), "29.5890");
        assert_eq!(expected_yield("abc", &product(StakeAsset::Token)), "0.0000");
        assert_eq!(expected_yield("", &product(StakeAsset::Token)), "0.0000");
    }

    #[test]
    fn positions_show_yearly_profit() {
        let position = StakingPosition {
            native: TokenAmount::parse("2.5").unwrap(),
            token: TokenAmount::from_tokens(100),
        };
        let view = render(&StakingForm::default(), Some(&position), &[]);
        assert_eq!(view.positions.len(), 2);
        assert_eq!(view.positions[0].staked, "2.5 ETH");
        assert_eq!(view.positions[0].yearly_profit, "0.3000 ETH");
        assert_eq!(view.positions[1].yearly_profit, "18.0000 YD");
        assert!(view.products[0].selected);
    }

    #[test]
    fn no_position_renders_no_rows() {
        let view = render(&StakingForm::default(), None, &[PendingAction::Approve]);
        assert!(view.positions.is_empty());
        assert_eq!(view.pending, Some("Approving..."));

        let view = render(
            &StakingForm::default(),
            None,
            &[PendingAction::Stake(StakeAsset::Native), PendingAction::CreateCourse],
        );
        assert_eq!(view.pending, Some("Staking..."));
    }

    #[test]
    fn minimum_applies_per_asset() {
        assert!(check_minimum(StakeAsset::Native, "0.05").is_err());
        assert!(check_minimum(StakeAsset::Native, "0.1").is_ok());
        let err = check_minimum(StakeAsset::Token, "49.9").unwrap_err();
        assert_eq!(err.message, "Minimum stake is 50 YD.");
        assert!(check_minimum(StakeAsset::Token, "oops").is_ok());
    }
}
