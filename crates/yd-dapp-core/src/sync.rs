//! Cached contract reads keyed by what they depend on.
//!
//! Every read is stored under `(query, chain, account)`. A wallet switching
//! chain or account therefore lands on a different key and is fetched fresh;
//! writes and [`AppSignal::BalanceRefresh`] drop entries explicitly through
//! [`ReadSynchronizer::invalidate`], which also bumps the refresh generation
//! that views subscribe to.

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use futures::future::join_all;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{RwLock, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use yd_api_types::{ChainId, Course, CourseId, StakingPosition, TokenAmount};
use yd_chain_client::{CallRequest, WalletProvider};
use yd_contracts::abi::{IBalanceRegistry, ICourseManager, IPlatformToken, IStakingTreasury};
use yd_contracts::{AddressBook, ContractName, decode};

use crate::catalog::sample_courses;
use crate::session::WalletManager;
use crate::signals::{AppSignal, SignalBus};
use crate::{DappError, ErrorKind};

/// Upper bound on course ids read in one catalog pass.
const MAX_CATALOG_SIZE: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ReadContext {
    pub chain_id: ChainId,
    pub account: Option<Address>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Query {
    Catalog,
    StakingPosition,
    PlatformBalance,
    TokenPrice,
    NativeBalance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadScope {
    /// Course list and purchase flags.
    Catalog,
    /// Native, platform-token and staked balances.
    Balances,
    Staking,
    Prices,
    All,
}

impl ReadScope {
    fn covers(&self, query: Query) -> bool {
        match self {
            Self::Catalog => query == Query::Catalog,
            Self::Balances => matches!(
                query,
                Query::NativeBalance | Query::PlatformBalance | Query::StakingPosition
            ),
            Self::Staking => query == Query::StakingPosition,
            Self::Prices => query == Query::TokenPrice,
            Self::All => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSource {
    OnChain,
    /// Demo data; nothing here exists on chain.
    Sample,
    /// No live data and demo data is switched off.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseCatalog {
    pub courses: Vec<Course>,
    pub purchased: BTreeSet<CourseId>,
    pub source: CatalogSource,
    pub next_course_id: Option<U256>,
}

impl CourseCatalog {
    pub fn is_purchased(&self, id: &CourseId) -> bool {
        self.purchased.contains(id)
    }

    pub fn purchased_courses(&self) -> Vec<&Course> {
        self.courses
            .iter()
            .filter(|course| self.purchased.contains(&course.id))
            .collect()
    }

    pub fn course(&self, id: &CourseId) -> Option<&Course> {
        self.courses.iter().find(|course| &course.id == id)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    /// Serve the demo catalog when no live course can be read.
    pub sample_fallback: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            sample_fallback: true,
        }
    }
}

/// Counts one catalog fetch as in flight until dropped, including when the
/// caller stops polling the read.
struct LoadGuard<'a>(&'a AtomicUsize);

impl<'a> LoadGuard<'a> {
    fn enter(loads: &'a AtomicUsize) -> Self {
        loads.fetch_add(1, Ordering::SeqCst);
        Self(loads)
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
enum Cached {
    Catalog(CourseCatalog),
    Position(StakingPosition),
    Amount(TokenAmount),
}

/// Encodes `call`, runs it as `eth_call` against `to` and decodes the
/// return tuple.
pub(crate) async fn view_call<C>(provider: &dyn WalletProvider, to: Address, call: C) -> Result<C::Return, DappError>
where
    C: SolCall + Send,
{
    let data = call.abi_encode();
    let raw = provider
        .call(CallRequest { to, data: data.into() })
        .await
        .map_err(DappError::from_read)?;
    C::abi_decode_returns(&raw, true).map_err(DappError::from_read)
}

pub struct ReadSynchronizer {
    wallet: Arc<WalletManager>,
    reader: Arc<dyn WalletProvider>,
    book: AddressBook,
    options: SyncOptions,
    cache: RwLock<HashMap<(Query, ReadContext), Cached>>,
    overlay: RwLock<HashSet<(ReadContext, CourseId)>>,
    generation: watch::Sender<u64>,
    catalog_loads: AtomicUsize,
}

impl ReadSynchronizer {
    pub fn new(
        wallet: Arc<WalletManager>,
        reader: Arc<dyn WalletProvider>,
        book: AddressBook,
        options: SyncOptions,
    ) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            wallet,
            reader,
            book,
            options,
            cache: RwLock::new(HashMap::new()),
            overlay: RwLock::new(HashSet::new()),
            generation,
            catalog_loads: AtomicUsize::new(0),
        }
    }

    /// Dependencies of every read right now.
    pub fn context(&self) -> ReadContext {
        let state = self.wallet.state();
        ReadContext {
            chain_id: state.chain_id().unwrap_or(self.wallet.default_chain()),
            account: state.address(),
        }
    }

    pub fn address_book(&self) -> &AddressBook {
        &self.book
    }

    pub fn subscribe_refresh(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    pub fn catalog_loading(&self) -> bool {
        self.catalog_loads.load(Ordering::SeqCst) > 0
    }

    pub async fn invalidate(&self, scope: ReadScope) {
        self.cache.write().await.retain(|(query, _), _| !scope.covers(*query));
        self.generation.send_modify(|g| *g += 1);
        debug!("invalidated {:?} reads", scope);
    }

    /// Records a purchase the wallet just accepted so views show it before
    /// the next read confirms it.
    pub async fn mark_purchased(&self, ctx: ReadContext, id: CourseId) {
        self.overlay.write().await.insert((ctx, id));
    }

    /// Turns [`AppSignal::BalanceRefresh`] into balance invalidation for as
    /// long as the bus lives.
    pub fn spawn_refresh_listener(self: &Arc<Self>, bus: &SignalBus) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        let this = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(AppSignal::BalanceRefresh) => this.invalidate(ReadScope::Balances).await,
                    Ok(AppSignal::DisplayNameChanged(_)) => {}
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("refresh listener missed {} signals", missed);
                        this.invalidate(ReadScope::All).await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            info!("refresh listener stopped");
        })
    }

    // ── Reads ──

    pub async fn course_catalog(&self) -> CourseCatalog {
        let ctx = self.context();
        let live = match self.cached(Query::Catalog, ctx).await {
            Some(Cached::Catalog(catalog)) => Ok(catalog),
            _ => {
                let fetched = {
                    let _loading = LoadGuard::enter(&self.catalog_loads);
                    self.fetch_catalog(ctx).await
                };
                if let Ok(catalog) = &fetched {
                    self.store(Query::Catalog, ctx, Cached::Catalog(catalog.clone())).await;
                }
                fetched
            }
        };

        match live {
            Ok(catalog) if catalog.courses.is_empty() && self.options.sample_fallback => {
                self.sample_catalog(catalog.next_course_id)
            }
            Ok(catalog) => self.with_overlay(ctx, catalog).await,
            Err(err) => {
                log_read_failure("course catalog", ctx, &err);
                if self.options.sample_fallback {
                    return self.sample_catalog(None);
                }
                CourseCatalog {
                    courses: Vec::new(),
                    purchased: BTreeSet::new(),
                    source: CatalogSource::Unavailable,
                    next_course_id: None,
                }
            }
        }
    }

    pub async fn staking_position(&self) -> Option<StakingPosition> {
        let ctx = self.context();
        let account = ctx.account?;
        let fetch = async {
            let staking = self.require(ContractName::StakingTreasury, ctx.chain_id)?;
            let raw = view_call(
                self.reader.as_ref(),
                staking,
                IStakingTreasury::positionsCall { _0: account },
            )
            .await?;
            Ok::<_, DappError>(Cached::Position(decode::staking_position(raw)))
        };
        match self.read_cached(Query::StakingPosition, ctx, fetch).await? {
            Cached::Position(position) => Some(position),
            _ => None,
        }
    }

    /// Platform-token balance from the balance registry.
    pub async fn platform_balance(&self) -> Option<TokenAmount> {
        let ctx = self.context();
        let account = ctx.account?;
        let fetch = async {
            let registry = self.require(ContractName::BalanceRegistry, ctx.chain_id)?;
            let raw = view_call(
                self.reader.as_ref(),
                registry,
                IBalanceRegistry::balanceOfCall { user: account },
            )
            .await?;
            Ok::<_, DappError>(Cached::Amount(TokenAmount::from_base_units(raw._0)))
        };
        self.read_amount(Query::PlatformBalance, ctx, fetch).await
    }

    /// Native-asset price of one whole platform token.
    pub async fn token_price(&self) -> Option<TokenAmount> {
        let ctx = self.context();
        let fetch = async {
            let token = self.require(ContractName::PlatformToken, ctx.chain_id)?;
            let raw = view_call(self.reader.as_ref(), token, IPlatformToken::tokenPriceCall {}).await?;
            Ok::<_, DappError>(Cached::Amount(TokenAmount::from_base_units(raw._0)))
        };
        self.read_amount(Query::TokenPrice, ctx, fetch).await
    }

    pub async fn native_balance(&self) -> Option<TokenAmount> {
        let ctx = self.context();
        let account = ctx.account?;
        let fetch = async {
            let balance = self
                .reader
                .get_balance(account)
                .await
                .map_err(DappError::from_read)?;
            Ok::<_, DappError>(Cached::Amount(TokenAmount::from_base_units(balance)))
        };
        self.read_amount(Query::NativeBalance, ctx, fetch).await
    }

    // ── Internals ──

    fn require(&self, name: ContractName, chain: ChainId) -> Result<Address, DappError> {
        self.book
            .resolve(name, Some(chain))
            .ok_or(DappError::NotConfigured(name))
    }

    async fn fetch_catalog(&self, ctx: ReadContext) -> Result<CourseCatalog, DappError> {
        let manager = self.require(ContractName::CourseManager, ctx.chain_id)?;
        let reader = self.reader.as_ref();

        let next = view_call(reader, manager, ICourseManager::nextCourseIdCall {})
            .await?
            ._0;
        let mut count = if next > U256::from(1u8) {
            next - U256::from(1u8)
        } else {
            U256::ZERO
        };
        if count > U256::from(MAX_CATALOG_SIZE) {
            warn!("catalog has {} courses, reading the first {}", count, MAX_CATALOG_SIZE);
            count = U256::from(MAX_CATALOG_SIZE);
        }
        let ids: Vec<U256> = (1..=count.to::<u64>()).map(U256::from).collect();

        let rows = join_all(
            ids.iter()
                .map(|id| view_call(reader, manager, ICourseManager::coursesCall { _0: *id })),
        )
        .await;
        let courses: Vec<Course> = rows
            .into_iter()
            .filter_map(|row| match row {
                Ok(raw) => decode::course(raw),
                Err(err) => {
                    warn!("skipping unreadable course: {}", err);
                    None
                }
            })
            .collect();

        let mut purchased = BTreeSet::new();
        if let Some(account) = ctx.account.filter(|_| !ids.is_empty()) {
            let flags = join_all(ids.iter().map(|id| {
                view_call(
                    reader,
                    manager,
                    ICourseManager::hasPurchasedCall {
                        buyer: account,
                        courseId: *id,
                    },
                )
            }))
            .await;
            for (id, flag) in ids.iter().zip(flags) {
                match flag {
                    Ok(owned) if owned._0 => {
                        purchased.insert(CourseId::from_chain(*id));
                    }
                    Ok(_) => {}
                    Err(err) => debug!("purchase flag for course {} unreadable: {}", id, err),
                }
            }
        }

        debug!(
            "read {} courses ({} purchased) on chain {}",
            courses.len(),
            purchased.len(),
            ctx.chain_id
        );
        Ok(CourseCatalog {
            courses,
            purchased,
            source: CatalogSource::OnChain,
            next_course_id: Some(next),
        })
    }

    fn sample_catalog(&self, next_course_id: Option<U256>) -> CourseCatalog {
        CourseCatalog {
            courses: sample_courses(),
            purchased: BTreeSet::new(),
            source: CatalogSource::Sample,
            next_course_id,
        }
    }

    async fn with_overlay(&self, ctx: ReadContext, mut catalog: CourseCatalog) -> CourseCatalog {
        let mut overlay = self.overlay.write().await;
        overlay.retain(|(owner, id)| {
            if *owner != ctx {
                return true;
            }
            // Confirmed by the chain: the overlay entry has done its job.
            if catalog.purchased.contains(id) {
                return false;
            }
            catalog.purchased.insert(id.clone());
            true
        });
        catalog
    }

    async fn cached(&self, query: Query, ctx: ReadContext) -> Option<Cached> {
        self.cache.read().await.get(&(query, ctx)).cloned()
    }

    async fn store(&self, query: Query, ctx: ReadContext, value: Cached) {
        self.cache.write().await.insert((query, ctx), value);
    }

    async fn read_cached<F>(&self, query: Query, ctx: ReadContext, fetch: F) -> Option<Cached>
    where
        F: Future<Output = Result<Cached, DappError>>,
    {
        if let Some(hit) = self.cached(query, ctx).await {
            return Some(hit);
        }
        match fetch.await {
            Ok(value) => {
                self.store(query, ctx, value.clone()).await;
                Some(value)
            }
            Err(err) => {
                log_read_failure(&format!("{query:?}"), ctx, &err);
                None
            }
        }
    }

    async fn read_amount<F>(&self, query: Query, ctx: ReadContext, fetch: F) -> Option<TokenAmount>
    where
        F: Future<Output = Result<Cached, DappError>>,
    {
        match self.read_cached(query, ctx, fetch).await? {
            Cached::Amount(amount) => Some(amount),
            _ => None,
        }
    }
}

fn log_read_failure(what: &str, ctx: ReadContext, err: &DappError) {
    if err.kind() == ErrorKind::Configuration {
        debug!("{} skipped on chain {}: {}", what, ctx.chain_id, err);
    } else {
        warn!("{} read failed on chain {}: {}", what, ctx.chain_id, err);
    }
}
