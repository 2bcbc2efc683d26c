mod catalog;
mod error;
pub mod session;
pub mod signals;
pub mod submit;
pub mod sync;

pub use catalog::sample_courses;
pub use error::{DappError, ErrorKind};
pub use session::{WalletManager, WalletSession, WalletState};
pub use signals::{AppSignal, SignalBus};
pub use submit::{
    ChainedOutcome, CreateCourseInput, FollowUp, PendingAction, RenameOutcome, StakeOutcome, TokenPurchase,
    TransactionSubmitter,
};
pub use sync::{CatalogSource, CourseCatalog, ReadContext, ReadScope, ReadSynchronizer, SyncOptions};

use std::sync::Arc;
use tokio::task::JoinHandle;
use yd_api_types::ChainId;
use yd_chain_client::{ProviderRegistry, WalletProvider};
use yd_contracts::AddressBook;
use yd_storage::DisplayNameStore;

/// One client session: wallet, reads, writes and the signal bus wired
/// together.
#[derive(Clone)]
pub struct DappClient {
    pub wallet: Arc<WalletManager>,
    pub reads: Arc<ReadSynchronizer>,
    pub submitter: Arc<TransactionSubmitter>,
    pub signals: SignalBus,
    pub names: Arc<dyn DisplayNameStore>,
}

impl DappClient {
    /// `reader` serves contract reads, including while no wallet is
    /// connected.
    pub fn new(
        registry: ProviderRegistry,
        reader: Arc<dyn WalletProvider>,
        book: AddressBook,
        names: Arc<dyn DisplayNameStore>,
        options: SyncOptions,
    ) -> Self {
        let default_chain: ChainId = book.default_chain();
        let wallet = Arc::new(WalletManager::new(registry, default_chain));
        let reads = Arc::new(ReadSynchronizer::new(wallet.clone(), reader, book, options));
        let signals = SignalBus::default();
        let submitter = Arc::new(TransactionSubmitter::new(
            wallet.clone(),
            reads.clone(),
            signals.clone(),
            names.clone(),
        ));
        Self {
            wallet,
            reads,
            submitter,
            signals,
            names,
        }
    }

    /// Starts the background task that re-reads balances on
    /// [`AppSignal::BalanceRefresh`].
    pub fn spawn_refresh_listener(&self) -> JoinHandle<()> {
        self.reads.spawn_refresh_listener(&self.signals)
    }
}
