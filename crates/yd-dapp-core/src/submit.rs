//! Contract writes.
//!
//! Each operation checks, in this order and without touching the network:
//! a wallet session exists, the contracts it needs resolve on the session's
//! current chain, the user input is well formed. Only then is anything
//! sent. Dependent second writes run after the primary one is accepted and
//! report their own outcome; they never undo or hide the primary result.

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use yd_api_types::{ChainId, Course, CourseCategory, CourseId, CourseSource, StakeAsset, TokenAmount, TxHash};
use yd_chain_client::{TxRequest, WalletProvider};
use yd_contracts::abi::{ICourseManager, IERC20, IPlatformToken, IProfileRegistry, IStakingTreasury};
use yd_contracts::{AddressBook, CREATOR_REWARD_TOKENS, ContractName, RENAME_FEE_TOKENS, rename_message};
use yd_storage::DisplayNameStore;

use crate::DappError;
use crate::session::{WalletManager, WalletSession};
use crate::signals::{AppSignal, SignalBus};
use crate::sync::{ReadContext, ReadScope, ReadSynchronizer};

/// Write currently waiting on the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingAction {
    CreateCourse,
    RewardMint,
    Purchase(CourseId),
    Approve,
    Stake(StakeAsset),
    Withdraw(StakeAsset),
    SignRename,
    Rename,
    BuyTokens,
    Burn,
}

/// Outcome of the dependent half of a two-step write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    /// Not attempted, with the reason.
    Skipped(String),
    Succeeded(TxHash),
    Failed(DappError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainedOutcome {
    pub primary: TxHash,
    pub follow_up: FollowUp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameOutcome {
    pub display_name: String,
    pub signature: String,
    pub tx: TxHash,
    /// Platform-token top-up replacing the rename fee.
    pub top_up: FollowUp,
}

/// A stake that got at least one transaction accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakeOutcome {
    /// Allowance granted before a token deposit. It stays on chain when the
    /// deposit then fails.
    pub approval: Option<TxHash>,
    pub deposit: Result<TxHash, DappError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPurchase {
    pub tx: TxHash,
    pub amount: TokenAmount,
    /// Native asset paid.
    pub cost: TokenAmount,
}

#[derive(Debug, Clone)]
pub struct CreateCourseInput {
    pub name: String,
    pub description: String,
    pub price: String,
    pub category: CourseCategory,
    pub content_url: String,
}

struct Ready {
    provider: Arc<dyn WalletProvider>,
    session: WalletSession,
}

impl Ready {
    fn chain(&self) -> ChainId {
        self.session.chain_id
    }

    fn read_context(&self) -> ReadContext {
        ReadContext {
            chain_id: self.session.chain_id,
            account: Some(self.session.address),
        }
    }
}

/// Removes its own entry from the pending list when the write settles,
/// whichever way.
struct PendingGuard<'a> {
    slot: &'a watch::Sender<Vec<PendingAction>>,
    action: PendingAction,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let action = &self.action;
        self.slot.send_modify(|pending| {
            if let Some(at) = pending.iter().position(|p| p == action) {
                pending.remove(at);
            }
        });
    }
}

fn required<'a>(value: &'a str, field: &str) -> Result<&'a str, DappError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DappError::InvalidInput(format!("{field} is required")));
    }
    Ok(value)
}

pub struct TransactionSubmitter {
    wallet: Arc<WalletManager>,
    reads: Arc<ReadSynchronizer>,
    signals: SignalBus,
    names: Arc<dyn DisplayNameStore>,
    pending: watch::Sender<Vec<PendingAction>>,
}

impl TransactionSubmitter {
    pub fn new(
        wallet: Arc<WalletManager>,
        reads: Arc<ReadSynchronizer>,
        signals: SignalBus,
        names: Arc<dyn DisplayNameStore>,
    ) -> Self {
        let (pending, _) = watch::channel(Vec::new());
        Self {
            wallet,
            reads,
            signals,
            names,
            pending,
        }
    }

    /// Writes waiting on the wallet, oldest first. Writes from different
    /// pages can overlap.
    pub fn pending(&self) -> Vec<PendingAction> {
        self.pending.borrow().clone()
    }

    pub fn subscribe_pending(&self) -> watch::Receiver<Vec<PendingAction>> {
        self.pending.subscribe()
    }

    /// `createCourse`, then the creator reward mint when the platform token
    /// is configured.
    pub async fn create_course(&self, input: &CreateCourseInput) -> Result<ChainedOutcome, DappError> {
        let ready = self.ready().await?;
        let manager = self.contract(ContractName::CourseManager, ready.chain())?;
        let name = required(&input.name, "course name")?;
        let description = required(&input.description, "description")?;
        let content_url = required(&input.content_url, "content url")?;
        let price = TokenAmount::parse_positive(&input.price)?;

        let call = ICourseManager::createCourseCall {
            name: name.to_owned(),
            description: description.to_owned(),
            priceWei: price.base_units(),
            category: input.category.as_str().to_owned(),
            contentUri: content_url.to_owned(),
        };
        let primary = self
            .send(&ready, PendingAction::CreateCourse, manager, call, U256::ZERO)
            .await?;
        self.reads.invalidate(ReadScope::Catalog).await;

        let follow_up = match self.book().resolve(ContractName::PlatformToken, Some(ready.chain())) {
            None => FollowUp::Skipped("platform token not configured for this chain".into()),
            Some(token) => {
                let mint = IPlatformToken::mintCall {
                    to: ready.session.address,
                    amount: TokenAmount::from_tokens(CREATOR_REWARD_TOKENS).base_units(),
                };
                match self.send(&ready, PendingAction::RewardMint, token, mint, U256::ZERO).await {
                    Ok(hash) => {
                        self.balances_changed().await;
                        FollowUp::Succeeded(hash)
                    }
                    Err(err) => FollowUp::Failed(err),
                }
            }
        };
        Ok(ChainedOutcome { primary, follow_up })
    }

    /// Pays the course price in the native asset.
    pub async fn purchase_course(&self, course: &Course) -> Result<TxHash, DappError> {
        let ready = self.ready().await?;
        let manager = self.contract(ContractName::CourseManager, ready.chain())?;
        let course_id = match (course.source, course.id.chain_id()) {
            (CourseSource::OnChain, Some(id)) => id,
            _ => {
                return Err(DappError::InvalidInput(
                    "demo courses cannot be purchased on chain".into(),
                ));
            }
        };

        let hash = self
            .send(
                &ready,
                PendingAction::Purchase(course.id.clone()),
                manager,
                ICourseManager::purchaseCourseCall { courseId: course_id },
                course.price.base_units(),
            )
            .await?;
        self.reads.mark_purchased(ready.read_context(), course.id.clone()).await;
        self.reads.invalidate(ReadScope::Catalog).await;
        self.balances_changed().await;
        Ok(hash)
    }

    /// Native deposits carry the amount as value; token deposits first
    /// approve the staking treasury and only deposit once that approval is
    /// accepted.
    ///
    /// `Err` means nothing reached the chain. A token deposit that fails
    /// after its approval was accepted comes back as `Ok` with the approval
    /// hash and the deposit error.
    pub async fn stake(&self, asset: StakeAsset, amount: &str) -> Result<StakeOutcome, DappError> {
        let ready = self.ready().await?;
        let staking = self.contract(ContractName::StakingTreasury, ready.chain())?;
        let token = match asset {
            StakeAsset::Token => Some(self.contract(ContractName::PlatformToken, ready.chain())?),
            StakeAsset::Native => None,
        };
        let amount = TokenAmount::parse_positive(amount)?.base_units();

        match token {
            None => {
                let deposit = self
                    .send(
                        &ready,
                        PendingAction::Stake(asset),
                        staking,
                        IStakingTreasury::depositEthCall {},
                        amount,
                    )
                    .await?;
                self.balances_changed().await;
                Ok(StakeOutcome {
                    approval: None,
                    deposit: Ok(deposit),
                })
            }
            Some(token) => {
                let approve = IERC20::approveCall {
                    spender: staking,
                    amount,
                };
                let approval = self
                    .send(&ready, PendingAction::Approve, token, approve, U256::ZERO)
                    .await?;
                self.balances_changed().await;

                let deposit = self
                    .send(
                        &ready,
                        PendingAction::Stake(asset),
                        staking,
                        IStakingTreasury::depositYdCall { amount },
                        U256::ZERO,
                    )
                    .await;
                if deposit.is_ok() {
                    self.balances_changed().await;
                }
                Ok(StakeOutcome {
                    approval: Some(approval),
                    deposit,
                })
            }
        }
    }

    pub async fn withdraw(&self, asset: StakeAsset, amount: &str) -> Result<TxHash, DappError> {
        let ready = self.ready().await?;
        let staking = self.contract(ContractName::StakingTreasury, ready.chain())?;
        let amount = TokenAmount::parse_positive(amount)?.base_units();

        let action = PendingAction::Withdraw(asset);
        let hash = match asset {
            StakeAsset::Native => {
                let call = IStakingTreasury::withdrawEthCall { amount };
                self.send(&ready, action, staking, call, U256::ZERO).await?
            }
            StakeAsset::Token => {
                let call = IStakingTreasury::withdrawYdCall { amount };
                self.send(&ready, action, staking, call, U256::ZERO).await?
            }
        };
        self.balances_changed().await;
        Ok(hash)
    }

    /// Signs the rename message, writes the profile, then tops the platform
    /// balance back up by the rename fee.
    pub async fn rename_profile(&self, display_name: &str) -> Result<RenameOutcome, DappError> {
        let ready = self.ready().await?;
        let registry = self.contract(ContractName::ProfileRegistry, ready.chain())?;
        self.contract(ContractName::BalanceRegistry, ready.chain())?;
        let display_name = required(display_name, "display name")?.to_owned();

        let signature = {
            let _pending = self.begin(PendingAction::SignRename);
            ready
                .provider
                .sign_message(ready.session.address, &rename_message(&display_name))
                .await
                .map_err(DappError::from_write)?
        };

        let call = IProfileRegistry::setProfileCall {
            displayName: display_name.clone(),
            metadata: signature.clone(),
        };
        let tx = self
            .send(&ready, PendingAction::Rename, registry, call, U256::ZERO)
            .await?;

        if let Err(err) = self.names.save_display_name(&display_name).await {
            warn!("display name not persisted: {}", err);
        }
        self.signals
            .publish(AppSignal::DisplayNameChanged(display_name.clone()));
        self.balances_changed().await;

        let top_up = self.rename_top_up(&ready).await;
        if matches!(top_up, FollowUp::Succeeded(_)) {
            self.balances_changed().await;
        }
        Ok(RenameOutcome {
            display_name,
            signature,
            tx,
            top_up,
        })
    }

    /// Buys `amount` platform tokens at the current token price.
    pub async fn buy_tokens(&self, amount: &str) -> Result<TokenPurchase, DappError> {
        let ready = self.ready().await?;
        let token = self.contract(ContractName::PlatformToken, ready.chain())?;
        let amount = TokenAmount::parse_positive(amount)?;
        let price = self
            .reads
            .token_price()
            .await
            .ok_or_else(|| DappError::Read("token price unavailable".into()))?;
        let cost = amount
            .cost_at(price.base_units())
            .ok_or_else(|| DappError::InvalidInput("amount is too large".into()))?;
        if cost.is_zero() {
            return Err(DappError::InvalidInput("amount too small".into()));
        }

        let tx = self
            .send(
                &ready,
                PendingAction::BuyTokens,
                token,
                IPlatformToken::buyTokensCall {},
                cost,
            )
            .await?;
        self.balances_changed().await;
        Ok(TokenPurchase {
            tx,
            amount,
            cost: TokenAmount::from_base_units(cost),
        })
    }

    pub async fn burn_tokens(&self, amount: &str) -> Result<TxHash, DappError> {
        let ready = self.ready().await?;
        let token = self.contract(ContractName::PlatformToken, ready.chain())?;
        let amount = TokenAmount::parse_positive(amount)?.base_units();
        let hash = self
            .send(
                &ready,
                PendingAction::Burn,
                token,
                IPlatformToken::burnCall { amount },
                U256::ZERO,
            )
            .await?;
        self.balances_changed().await;
        Ok(hash)
    }

    // ── Internals ──

    fn book(&self) -> &AddressBook {
        self.reads.address_book()
    }

    async fn ready(&self) -> Result<Ready, DappError> {
        let session = self
            .wallet
            .state()
            .session
            .ok_or(DappError::WalletNotConnected)?;
        let provider = self
            .wallet
            .active_provider()
            .await
            .ok_or(DappError::WalletNotConnected)?;
        Ok(Ready { provider, session })
    }

    /// Resolved against the chain the wallet is on right now.
    fn contract(&self, name: ContractName, chain: ChainId) -> Result<Address, DappError> {
        self.book()
            .resolve(name, Some(chain))
            .ok_or(DappError::NotConfigured(name))
    }

    fn begin(&self, action: PendingAction) -> PendingGuard<'_> {
        self.pending.send_modify(|pending| pending.push(action.clone()));
        PendingGuard {
            slot: &self.pending,
            action,
        }
    }

    async fn send<C>(
        &self,
        ready: &Ready,
        action: PendingAction,
        to: Address,
        call: C,
        value: U256,
    ) -> Result<TxHash, DappError>
    where
        C: SolCall + Send,
    {
        let _pending = self.begin(action.clone());
        let tx = TxRequest {
            from: ready.session.address,
            to,
            data: call.abi_encode().into(),
            value,
        };
        match ready.provider.send_transaction(tx).await {
            Ok(hash) => {
                info!("{:?} accepted: {}", action, hash);
                Ok(hash)
            }
            Err(err) => {
                let err = DappError::from_write(err);
                warn!("{:?} failed: {}", action, err);
                Err(err)
            }
        }
    }

    async fn rename_top_up(&self, ready: &Ready) -> FollowUp {
        let Some(token) = self.book().resolve(ContractName::PlatformToken, Some(ready.chain())) else {
            return FollowUp::Skipped("platform token not configured for this chain".into());
        };
        let Some(price) = self.reads.token_price().await else {
            return FollowUp::Skipped("token price unavailable".into());
        };
        let fee = TokenAmount::from_tokens(RENAME_FEE_TOKENS);
        let cost = match fee.cost_at(price.base_units()) {
            Some(cost) if !cost.is_zero() => cost,
            _ => return FollowUp::Skipped("token price too low for a top-up".into()),
        };
        match self
            .send(ready, PendingAction::BuyTokens, token, IPlatformToken::buyTokensCall {}, cost)
            .await
        {
            Ok(hash) => FollowUp::Succeeded(hash),
            Err(err) => FollowUp::Failed(err),
        }
    }

    async fn balances_changed(&self) {
        self.reads.invalidate(ReadScope::Balances).await;
        self.signals.publish(AppSignal::BalanceRefresh);
    }
}
