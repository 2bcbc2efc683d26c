//! Recommended-courses page: course cards, purchase action, and the
//! purchase walkthrough.

use serde::Serialize;
use std::cmp::Ordering;
use yd_api_types::{Course, CourseId};
use yd_contracts::ContractName;
use yd_dapp_core::{CatalogSource, CourseCatalog, DappClient, DappError, PendingAction};

use crate::feedback::Feedback;
use crate::format::with_symbol;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseStep {
    pub title: &'static str,
    pub description: &'static str,
}

pub const PURCHASE_STEPS: [PurchaseStep; 3] = [
    PurchaseStep {
        title: "1. Get YD platform tokens",
        description: "Connect a wallet and swap fiat or on-chain assets for platform tokens.",
    },
    PurchaseStep {
        title: "2. Authorise the course contract",
        description: "The wallet approves the course contract to receive your payment.",
    },
    PurchaseStep {
        title: "3. Pay and start learning",
        description: "Once the purchase is on chain the course content link unlocks automatically.",
    },
];

const DEMO_BANNER: &str =
    "Showing demo courses: no live course data is available on this chain. Demo courses cannot be purchased.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuyState {
    Buy,
    Purchasing,
    Purchased,
}

impl BuyState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Buy => "Buy course",
            Self::Purchasing => "Purchasing...",
            Self::Purchased => "Purchased",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseCard {
    pub id: CourseId,
    pub title: String,
    pub description: String,
    pub price: String,
    pub cover: String,
    pub rating: f32,
    pub learners: u32,
    pub category: &'static str,
    pub tags: Vec<String>,
    pub buy: BuyState,
    pub buy_label: &'static str,
    pub buy_enabled: bool,
    /// Only present once the connected account owns the course.
    pub content_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingView {
    pub cards: Vec<CourseCard>,
    pub loading: bool,
    pub demo_banner: Option<&'static str>,
    pub contract_ready: bool,
    pub feedback: Option<Feedback>,
    pub toast: Option<Feedback>,
    pub steps: &'static [PurchaseStep],
}

/// Local state of the listing page between renders.
#[derive(Debug, Clone, Default)]
pub struct ListingForm {
    pub feedback: Option<Feedback>,
    pub toast: Option<Feedback>,
}

/// Newest first: numeric ids descending, anything else after them in
/// catalog order.
fn newest_first(a: &Course, b: &Course) -> Ordering {
    match (a.id.chain_id(), b.id.chain_id()) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn render(
    catalog: &CourseCatalog,
    pending: &[PendingAction],
    loading: bool,
    contract_ready: bool,
    form: &ListingForm,
) -> ListingView {
    let mut courses: Vec<&Course> = catalog.courses.iter().collect();
    courses.sort_by(|a, b| newest_first(a, b));

    let cards = courses
        .into_iter()
        .map(|course| {
            let purchased = catalog.is_purchased(&course.id);
            let buy = if purchased {
                BuyState::Purchased
            } else if pending.contains(&PendingAction::Purchase(course.id.clone())) {
                BuyState::Purchasing
            } else {
                BuyState::Buy
            };
            CourseCard {
                id: course.id.clone(),
                title: course.title.clone(),
                description: course.description.clone(),
                price: with_symbol(&course.price, "YD"),
                cover: course.cover.clone(),
                rating: course.rating,
                learners: course.learners,
                category: course.category.label(),
                tags: course.tags.clone(),
                buy,
                buy_label: buy.label(),
                buy_enabled: buy == BuyState::Buy,
                content_url: purchased.then(|| course.content_url.clone()),
            }
        })
        .collect();

    ListingView {
        cards,
        loading,
        demo_banner: (catalog.source == CatalogSource::Sample).then_some(DEMO_BANNER),
        contract_ready,
        feedback: form.feedback.clone(),
        toast: form.toast.clone(),
        steps: &PURCHASE_STEPS,
    }
}

fn contract_ready(client: &DappClient) -> bool {
    client
        .reads
        .address_book()
        .resolve(ContractName::CourseManager, Some(client.wallet.current_chain()))
        .is_some()
}

/// `loading` is sampled before this render's own read, so it reports a
/// catalog fetch another request already had in flight.
pub async fn view(client: &DappClient, form: &ListingForm) -> ListingView {
    let loading = client.reads.catalog_loading();
    let catalog = client.reads.course_catalog().await;
    render(
        &catalog,
        &client.submitter.pending(),
        loading,
        contract_ready(client),
        form,
    )
}

fn purchase_error(err: &DappError) -> Feedback {
    match err {
        DappError::WalletNotConnected => Feedback::error("Connect your wallet before purchasing."),
        DappError::NotConfigured(_) => {
            Feedback::error("Course contract address is not configured; deploy it first.")
        }
        other => Feedback::error(other.to_string()),
    }
}

pub async fn purchase(client: &DappClient, form: &mut ListingForm, id: &CourseId) -> ListingView {
    form.feedback = None;
    let catalog = client.reads.course_catalog().await;
    let Some(course) = catalog.course(id).cloned() else {
        form.feedback = Some(Feedback::error(format!("Course {id} not found.")));
        return view(client, form).await;
    };

    match client.submitter.purchase_course(&course).await {
        Ok(_) => {
            let message = format!("Purchased \"{}\"; the receipt is recorded on chain.", course.title);
            form.feedback = Some(Feedback::success(message.clone()));
            form.toast = Some(Feedback::success(message));
        }
        Err(err) => form.feedback = Some(purchase_error(&err)),
    }
    view(client, form).await
}
