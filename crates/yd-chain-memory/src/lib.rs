//! In-process chain that executes the marketplace contracts against
//! in-memory state.
//!
//! Used by the service's demo mode and by tests. Every accepted write is
//! recorded; failures can be injected per function selector and the
//! "user" can be made to reject connections, signatures or transactions.

use alloy_primitives::{Address, Bytes, U256, hex, keccak256};
use alloy_sol_types::{SolCall, SolInterface};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify, watch};
use tracing::debug;
use yd_api_types::{ChainId, TxHash};
use yd_chain_client::{CallRequest, ConnectorKind, ProviderError, TxRequest, WalletProvider};
use yd_contracts::abi::{
    IBalanceRegistry, ICourseManager, IERC20, IPlatformToken, IProfileRegistry, IStakingTreasury,
};
use yd_contracts::{AddressBook, ContractName, RENAME_FEE_TOKENS};

const DEV_ACCOUNTS: [&str; 2] = [
    "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
    "0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
];

fn tokens(whole: u64) -> U256 {
    U256::from(whole) * U256::from(10u128.pow(18))
}

#[derive(Debug, Clone, Default)]
pub struct Deployment {
    pub platform_token: Option<Address>,
    pub balance_registry: Option<Address>,
    pub course_manager: Option<Address>,
    pub staking_treasury: Option<Address>,
    pub profile_registry: Option<Address>,
}

impl Deployment {
    pub fn from_book(book: &AddressBook, chain: ChainId) -> Self {
        let at = |name| book.resolve(name, Some(chain));
        Self {
            platform_token: at(ContractName::PlatformToken),
            balance_registry: at(ContractName::BalanceRegistry),
            course_manager: at(ContractName::CourseManager),
            staking_treasury: at(ContractName::StakingTreasury),
            profile_registry: at(ContractName::ProfileRegistry),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemoryChainConfig {
    pub chain_id: ChainId,
    pub supported_chains: Vec<ChainId>,
    pub accounts: Vec<Address>,
    pub native_balance: U256,
    pub token_balance: U256,
    pub token_price: U256,
    /// Account allowed to `mint`; `None` lets anyone mint.
    pub token_owner: Option<Address>,
    pub deployment: Deployment,
}

impl MemoryChainConfig {
    /// Two funded dev accounts on 31337 with the built-in local deployment.
    pub fn hardhat(book: &AddressBook) -> Self {
        let accounts = DEV_ACCOUNTS
            .iter()
            .filter_map(|raw| raw.parse::<Address>().ok())
            .collect::<Vec<_>>();
        Self {
            chain_id: ChainId::HARDHAT,
            supported_chains: vec![ChainId::HARDHAT, ChainId::SEPOLIA],
            token_owner: accounts.first().copied(),
            accounts,
            native_balance: tokens(10_000),
            token_balance: tokens(100),
            token_price: U256::from(1_000_000_000_000_000u128),
            deployment: Deployment::from_book(book, ChainId::HARDHAT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedTx {
    pub hash: TxHash,
    pub from: Address,
    pub to: Address,
    pub function: &'static str,
    pub value: U256,
}

#[derive(Debug, Clone)]
struct StoredCourse {
    creator: Address,
    name: String,
    description: String,
    price: U256,
    category: String,
    content_uri: String,
}

#[derive(Debug, Clone)]
struct ChainState {
    chain_id: ChainId,
    connected: bool,
    reject_connect: bool,
    reject_signatures: bool,
    reject_transactions: bool,
    failures: HashMap<[u8; 4], ProviderError>,
    native: HashMap<Address, U256>,
    tokens: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
    token_price: U256,
    courses: BTreeMap<U256, StoredCourse>,
    next_course_id: U256,
    purchases: HashSet<(Address, U256)>,
    positions: HashMap<Address, (U256, U256)>,
    profiles: HashMap<Address, (String, String)>,
    log: Vec<RecordedTx>,
    nonce: u64,
}

impl ChainState {
    /// Genesis: funded dev accounts, no courses, course ids starting at 1.
    fn genesis(config: &MemoryChainConfig) -> Self {
        let mut native = HashMap::new();
        let mut tokens = HashMap::new();
        for account in &config.accounts {
            native.insert(*account, config.native_balance);
            tokens.insert(*account, config.token_balance);
        }
        Self {
            chain_id: config.chain_id,
            connected: false,
            reject_connect: false,
            reject_signatures: false,
            reject_transactions: false,
            failures: HashMap::new(),
            native,
            tokens,
            allowances: HashMap::new(),
            token_price: config.token_price,
            courses: BTreeMap::new(),
            next_course_id: U256::from(1u8),
            purchases: HashSet::new(),
            positions: HashMap::new(),
            profiles: HashMap::new(),
            log: Vec::new(),
            nonce: 0,
        }
    }
}

fn revert(reason: &str) -> ProviderError {
    ProviderError::Reverted(Some(reason.to_owned()))
}

fn debit(balances: &mut HashMap<Address, U256>, who: Address, amount: U256, reason: &str) -> Result<(), ProviderError> {
    let balance = balances.entry(who).or_default();
    if *balance < amount {
        return Err(revert(reason));
    }
    *balance -= amount;
    Ok(())
}

fn credit(balances: &mut HashMap<Address, U256>, who: Address, amount: U256) {
    *balances.entry(who).or_default() += amount;
}

pub struct MemoryChain {
    id: String,
    kind: ConnectorKind,
    config: MemoryChainConfig,
    state: Mutex<ChainState>,
    reads_paused: watch::Sender<bool>,
    holds: Mutex<HashMap<[u8; 4], Arc<Notify>>>,
}

impl MemoryChain {
    pub fn new(config: MemoryChainConfig) -> Self {
        let state = ChainState::genesis(&config);
        let (reads_paused, _) = watch::channel(false);
        Self {
            id: "injected".to_owned(),
            kind: ConnectorKind::Injected,
            config,
            state: Mutex::new(state),
            reads_paused,
            holds: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_identity(mut self, id: impl Into<String>, kind: ConnectorKind) -> Self {
        self.id = id.into();
        self.kind = kind;
        self
    }

    pub fn accounts(&self) -> &[Address] {
        &self.config.accounts
    }

    pub fn deployment(&self) -> &Deployment {
        &self.config.deployment
    }

    // ── Test controls ──

    pub async fn reject_connect(&self, reject: bool) {
        self.state.lock().await.reject_connect = reject;
    }

    pub async fn reject_signatures(&self, reject: bool) {
        self.state.lock().await.reject_signatures = reject;
    }

    pub async fn reject_transactions(&self, reject: bool) {
        self.state.lock().await.reject_transactions = reject;
    }

    /// Make every transaction to the function with `selector` fail with `err`.
    pub async fn fail_function(&self, selector: [u8; 4], err: ProviderError) {
        self.state.lock().await.failures.insert(selector, err);
    }

    /// While paused, `eth_call`s wait instead of answering.
    pub fn pause_reads(&self, paused: bool) {
        self.reads_paused.send_replace(paused);
    }

    /// Transactions to the function with `selector` wait for a notification
    /// on the returned handle before they execute, one per transaction.
    pub async fn hold_function(&self, selector: [u8; 4]) -> Arc<Notify> {
        let mut holds = self.holds.lock().await;
        Arc::clone(holds.entry(selector).or_default())
    }

    pub async fn clear_failures(&self) {
        self.state.lock().await.failures.clear();
    }

    pub async fn set_token_price(&self, price: U256) {
        self.state.lock().await.token_price = price;
    }

    // ── Inspection ──

    pub async fn transactions(&self) -> Vec<RecordedTx> {
        self.state.lock().await.log.clone()
    }

    pub async fn token_balance(&self, account: Address) -> U256 {
        self.state.lock().await.tokens.get(&account).copied().unwrap_or_default()
    }

    pub async fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.state
            .lock()
            .await
            .allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or_default()
    }

    pub async fn profile(&self, account: Address) -> Option<(String, String)> {
        self.state.lock().await.profiles.get(&account).cloned()
    }

    pub async fn next_course_id(&self) -> U256 {
        self.state.lock().await.next_course_id
    }

    fn is(&self, slot: Option<Address>, to: Address) -> bool {
        slot == Some(to)
    }

    fn view(&self, state: &ChainState, req: &CallRequest) -> Result<Vec<u8>, ProviderError> {
        let deployment = &self.config.deployment;
        let data = req.data.as_ref();

        if self.is(deployment.course_manager, req.to) {
            use ICourseManager::ICourseManagerCalls as Calls;
            return match Calls::abi_decode(data, true).map_err(|e| revert(&e.to_string()))? {
                Calls::nextCourseId(_) => Ok(ICourseManager::nextCourseIdCall::abi_encode_returns(&(
                    state.next_course_id,
                ))),
                Calls::courses(call) => {
                    let encoded = match state.courses.get(&call._0) {
                        Some(c) => ICourseManager::coursesCall::abi_encode_returns(&(
                            call._0,
                            c.creator,
                            c.name.clone(),
                            c.description.clone(),
                            c.price,
                            c.category.clone(),
                            c.content_uri.clone(),
                        )),
                        None => ICourseManager::coursesCall::abi_encode_returns(&(
                            U256::ZERO,
                            Address::ZERO,
                            String::new(),
                            String::new(),
                            U256::ZERO,
                            String::new(),
                            String::new(),
                        )),
                    };
                    Ok(encoded)
                }
                Calls::hasPurchased(call) => Ok(ICourseManager::hasPurchasedCall::abi_encode_returns(&(
                    state.purchases.contains(&(call.buyer, call.courseId)),
                ))),
                _ => Err(ProviderError::Unsupported("eth_call on a write function".into())),
            };
        }

        if self.is(deployment.staking_treasury, req.to) {
            use IStakingTreasury::IStakingTreasuryCalls as Calls;
            return match Calls::abi_decode(data, true).map_err(|e| revert(&e.to_string()))? {
                Calls::positions(call) => {
                    let (native, token) = state.positions.get(&call._0).copied().unwrap_or_default();
                    Ok(IStakingTreasury::positionsCall::abi_encode_returns(&(native, token)))
                }
                _ => Err(ProviderError::Unsupported("eth_call on a write function".into())),
            };
        }

        if self.is(deployment.balance_registry, req.to) {
            use IBalanceRegistry::IBalanceRegistryCalls as Calls;
            let Calls::balanceOf(call) = Calls::abi_decode(data, true).map_err(|e| revert(&e.to_string()))?;
            let balance = state.tokens.get(&call.user).copied().unwrap_or_default();
            return Ok(IBalanceRegistry::balanceOfCall::abi_encode_returns(&(balance,)));
        }

        if self.is(deployment.platform_token, req.to) {
            use IPlatformToken::IPlatformTokenCalls as Calls;
            return match Calls::abi_decode(data, true).map_err(|e| revert(&e.to_string()))? {
                Calls::tokenPrice(_) => Ok(IPlatformToken::tokenPriceCall::abi_encode_returns(&(
                    state.token_price,
                ))),
                _ => Err(ProviderError::Unsupported("eth_call on a write function".into())),
            };
        }

        Err(revert("no contract at address"))
    }

    fn execute(&self, state: &mut ChainState, tx: &TxRequest) -> Result<&'static str, ProviderError> {
        let deployment = &self.config.deployment;
        let data = tx.data.as_ref();
        let from = tx.from;

        if !tx.value.is_zero() {
            let balance = state.native.entry(from).or_default();
            if *balance < tx.value {
                return Err(ProviderError::InsufficientFunds(
                    "insufficient funds for gas * price + value".into(),
                ));
            }
            *balance -= tx.value;
        }

        if self.is(deployment.course_manager, tx.to) {
            use ICourseManager::ICourseManagerCalls as Calls;
            return match Calls::abi_decode(data, true).map_err(|e| revert(&e.to_string()))? {
                Calls::createCourse(call) => {
                    if call.name.trim().is_empty() {
                        return Err(revert("name required"));
                    }
                    if call.priceWei.is_zero() {
                        return Err(revert("price must be positive"));
                    }
                    let id = state.next_course_id;
                    state.courses.insert(
                        id,
                        StoredCourse {
                            creator: from,
                            name: call.name,
                            description: call.description,
                            price: call.priceWei,
                            category: call.category,
                            content_uri: call.contentUri,
                        },
                    );
                    state.next_course_id = id + U256::from(1u8);
                    Ok("createCourse")
                }
                Calls::purchaseCourse(call) => {
                    let course = state
                        .courses
                        .get(&call.courseId)
                        .ok_or_else(|| revert("course not found"))?;
                    if state.purchases.contains(&(from, call.courseId)) {
                        return Err(revert("already purchased"));
                    }
                    if tx.value != course.price {
                        return Err(revert("incorrect payment"));
                    }
                    let creator = course.creator;
                    credit(&mut state.native, creator, tx.value);
                    state.purchases.insert((from, call.courseId));
                    Ok("purchaseCourse")
                }
                _ => Err(revert("function is read-only")),
            };
        }

        if self.is(deployment.staking_treasury, tx.to) {
            use IStakingTreasury::IStakingTreasuryCalls as Calls;
            let staking = tx.to;
            return match Calls::abi_decode(data, true).map_err(|e| revert(&e.to_string()))? {
                Calls::depositEth(_) => {
                    if tx.value.is_zero() {
                        return Err(revert("amount is zero"));
                    }
                    state.positions.entry(from).or_default().0 += tx.value;
                    Ok("depositEth")
                }
                Calls::depositYd(call) => {
                    let allowance = state.allowances.entry((from, staking)).or_default();
                    if *allowance < call.amount {
                        return Err(revert("insufficient allowance"));
                    }
                    *allowance -= call.amount;
                    debit(&mut state.tokens, from, call.amount, "insufficient YD balance")?;
                    state.positions.entry(from).or_default().1 += call.amount;
                    Ok("depositYd")
                }
                Calls::withdrawEth(call) => {
                    let position = state.positions.entry(from).or_default();
                    if position.0 < call.amount {
                        return Err(revert("insufficient staked ETH"));
                    }
                    position.0 -= call.amount;
                    credit(&mut state.native, from, call.amount);
                    Ok("withdrawEth")
                }
                Calls::withdrawYd(call) => {
                    let position = state.positions.entry(from).or_default();
                    if position.1 < call.amount {
                        return Err(revert("insufficient staked YD"));
                    }
                    position.1 -= call.amount;
                    credit(&mut state.tokens, from, call.amount);
                    Ok("withdrawYd")
                }
                Calls::positions(_) => Err(revert("function is read-only")),
            };
        }

        if self.is(deployment.profile_registry, tx.to) {
            use IProfileRegistry::IProfileRegistryCalls as Calls;
            let Calls::setProfile(call) = Calls::abi_decode(data, true).map_err(|e| revert(&e.to_string()))?;
            if call.displayName.trim().is_empty() {
                return Err(revert("display name required"));
            }
            debit(
                &mut state.tokens,
                from,
                tokens(RENAME_FEE_TOKENS),
                "insufficient YD balance for rename fee",
            )?;
            state.profiles.insert(from, (call.displayName, call.metadata));
            return Ok("setProfile");
        }

        if self.is(deployment.platform_token, tx.to) {
            if let Ok(IERC20::IERC20Calls::approve(call)) = IERC20::IERC20Calls::abi_decode(data, true) {
                state.allowances.insert((from, call.spender), call.amount);
                return Ok("approve");
            }
            use IPlatformToken::IPlatformTokenCalls as Calls;
            return match Calls::abi_decode(data, true).map_err(|e| revert(&e.to_string()))? {
                Calls::buyTokens(_) => {
                    if state.token_price.is_zero() {
                        return Err(revert("token price not set"));
                    }
                    let minted = tx.value * U256::from(10u128.pow(18)) / state.token_price;
                    if minted.is_zero() {
                        return Err(revert("amount too small"));
                    }
                    credit(&mut state.tokens, from, minted);
                    Ok("buyTokens")
                }
                Calls::burn(call) => {
                    debit(&mut state.tokens, from, call.amount, "burn amount exceeds balance")?;
                    Ok("burn")
                }
                Calls::mint(call) => {
                    if let Some(owner) = self.config.token_owner {
                        if owner != from {
                            return Err(revert("caller is not the owner"));
                        }
                    }
                    credit(&mut state.tokens, call.to, call.amount);
                    Ok("mint")
                }
                Calls::tokenPrice(_) => Err(revert("function is read-only")),
            };
        }

        Err(revert("no contract at address"))
    }
}

#[async_trait]
impl WalletProvider for MemoryChain {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ConnectorKind {
        self.kind
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let mut state = self.state.lock().await;
        if state.reject_connect {
            return Err(ProviderError::UserRejected("User rejected the request.".into()));
        }
        if self.config.accounts.is_empty() {
            return Err(ProviderError::UserRejected("wallet returned no accounts".into()));
        }
        state.connected = true;
        Ok(self.config.accounts.clone())
    }

    async fn chain_id(&self) -> Result<ChainId, ProviderError> {
        Ok(self.state.lock().await.chain_id)
    }

    async fn switch_chain(&self, chain: ChainId) -> Result<(), ProviderError> {
        if !self.config.supported_chains.contains(&chain) {
            return Err(ProviderError::Unsupported(format!("Unrecognized chain ID {chain}")));
        }
        self.state.lock().await.chain_id = chain;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ProviderError> {
        let mut state = self.state.lock().await;
        if !state.connected {
            return Err(ProviderError::Other("provider is not connected".into()));
        }
        state.connected = false;
        Ok(())
    }

    async fn sign_message(&self, account: Address, message: &str) -> Result<String, ProviderError> {
        if self.state.lock().await.reject_signatures {
            return Err(ProviderError::UserRejected("User denied message signature.".into()));
        }
        let mut preimage = account.to_vec();
        preimage.extend_from_slice(message.as_bytes());
        Ok(hex::encode_prefixed(keccak256(&preimage)))
    }

    async fn send_transaction(&self, tx: TxRequest) -> Result<TxHash, ProviderError> {
        let selector = tx.data.get(..4).and_then(|head| <[u8; 4]>::try_from(head).ok());
        let hold = match selector {
            Some(selector) => self.holds.lock().await.get(&selector).cloned(),
            None => None,
        };
        if let Some(hold) = hold {
            hold.notified().await;
        }

        let mut state = self.state.lock().await;
        if state.reject_transactions {
            return Err(ProviderError::UserRejected("User rejected the request.".into()));
        }
        if let Some(err) = selector.and_then(|selector| state.failures.get(&selector)) {
            return Err(err.clone());
        }

        // Execute on a copy so a revert leaves no partial effects.
        let mut next = state.clone();
        let function = self.execute(&mut next, &tx)?;

        next.nonce += 1;
        let mut preimage = tx.from.to_vec();
        preimage.extend_from_slice(&next.nonce.to_be_bytes());
        let hash = keccak256(&preimage);
        next.log.push(RecordedTx {
            hash,
            from: tx.from,
            to: tx.to,
            function,
            value: tx.value,
        });
        debug!("memory chain accepted {} from {} ({})", function, tx.from, hash);
        *state = next;
        Ok(hash)
    }

    async fn call(&self, req: CallRequest) -> Result<Bytes, ProviderError> {
        let mut resume = self.reads_paused.subscribe();
        loop {
            let paused = *resume.borrow_and_update();
            if !paused || resume.changed().await.is_err() {
                break;
            }
        }
        let state = self.state.lock().await;
        self.view(&state, &req).map(Bytes::from)
    }

    async fn get_balance(&self, account: Address) -> Result<U256, ProviderError> {
        Ok(self.state.lock().await.native.get(&account).copied().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> MemoryChain {
        MemoryChain::new(MemoryChainConfig::hardhat(&AddressBook::builtin()))
    }

    async fn send(chain: &MemoryChain, to: Address, data: Vec<u8>, value: U256) -> Result<TxHash, ProviderError> {
        chain
            .send_transaction(TxRequest {
                from: chain.accounts()[0],
                to,
                data: data.into(),
                value,
            })
            .await
    }

    #[tokio::test]
    async fn fresh_chain_starts_at_genesis() {
        let chain = chain();
        assert_eq!(chain.chain_id().await.unwrap(), ChainId::HARDHAT);
        assert_eq!(chain.next_course_id().await, U256::from(1u8));
        assert_eq!(chain.token_balance(chain.accounts()[1]).await, tokens(100));
        assert_eq!(chain.get_balance(chain.accounts()[0]).await.unwrap(), tokens(10_000));
        assert!(chain.transactions().await.is_empty());
    }

    #[tokio::test]
    async fn create_then_read_course() {
        let chain = chain();
        let manager = chain.deployment().course_manager.unwrap();
        let call = ICourseManager::createCourseCall {
            name: "Rust".into(),
            description: "systems".into(),
            priceWei: tokens(10),
            category: "expert".into(),
            contentUri: "ipfs://rust".into(),
        };
        send(&chain, manager, call.abi_encode(), U256::ZERO).await.unwrap();
        assert_eq!(chain.next_course_id().await, U256::from(2u8));

        let raw = chain
            .call(CallRequest {
                to: manager,
                data: ICourseManager::coursesCall { _0: U256::from(1u8) }.abi_encode().into(),
            })
            .await
            .unwrap();
        let course = ICourseManager::coursesCall::abi_decode_returns(&raw, true).unwrap();
        assert_eq!(course.creator, chain.accounts()[0]);
        assert_eq!(course.priceWei, tokens(10));
    }

    #[tokio::test]
    async fn reverted_write_leaves_no_effects() {
        let chain = chain();
        let manager = chain.deployment().course_manager.unwrap();
        let before = chain.get_balance(chain.accounts()[0]).await.unwrap();
        let err = send(
            &chain,
            manager,
            ICourseManager::purchaseCourseCall { courseId: U256::from(9u8) }.abi_encode(),
            tokens(1),
        )
        .await
        .unwrap_err();
        assert_eq!(err, ProviderError::Reverted(Some("course not found".into())));
        assert_eq!(chain.get_balance(chain.accounts()[0]).await.unwrap(), before);
        assert!(chain.transactions().await.is_empty());
    }

    #[tokio::test]
    async fn token_deposit_requires_allowance() {
        let chain = chain();
        let staking = chain.deployment().staking_treasury.unwrap();
        let token = chain.deployment().platform_token.unwrap();
        let deposit = IStakingTreasury::depositYdCall { amount: tokens(50) }.abi_encode();

        let err = send(&chain, staking, deposit.clone(), U256::ZERO).await.unwrap_err();
        assert_eq!(err, ProviderError::Reverted(Some("insufficient allowance".into())));

        let approve = IERC20::approveCall { spender: staking, amount: tokens(50) }.abi_encode();
        send(&chain, token, approve, U256::ZERO).await.unwrap();
        send(&chain, staking, deposit, U256::ZERO).await.unwrap();
        assert_eq!(chain.token_balance(chain.accounts()[0]).await, tokens(50));
    }

    #[tokio::test]
    async fn failure_injection_and_rejections() {
        let chain = chain();
        let token = chain.deployment().platform_token.unwrap();
        chain
            .fail_function(IPlatformToken::mintCall::SELECTOR, revert("minting paused"))
            .await;
        let mint = IPlatformToken::mintCall { to: chain.accounts()[0], amount: tokens(1) }.abi_encode();
        assert_eq!(
            send(&chain, token, mint, U256::ZERO).await.unwrap_err(),
            revert("minting paused")
        );

        chain.clear_failures().await;
        let release = chain.hold_function(IPlatformToken::mintCall::SELECTOR).await;
        release.notify_one();
        let mint = IPlatformToken::mintCall { to: chain.accounts()[0], amount: tokens(1) }.abi_encode();
        send(&chain, token, mint, U256::ZERO).await.unwrap();
        assert_eq!(chain.transactions().await.len(), 1);

        chain.reject_connect(true).await;
        assert!(matches!(
            chain.request_accounts().await,
            Err(ProviderError::UserRejected(_))
        ));
        assert!(chain.disconnect().await.is_err());
    }
}
