//! Page view models for the course marketplace and the action handlers
//! behind them.
//!
//! Every page has a pure `render` over read results, wallet state and the
//! page's local form, an async `view` that gathers those reads from a
//! [`yd_dapp_core::DappClient`], and action handlers that submit through
//! the client and return the refreshed view. Handlers never fail: outcomes
//! land in the page's feedback and status fields.

pub mod create_course;
pub mod feedback;
pub mod format;
pub mod listing;
pub mod navbar;
pub mod profile;
pub mod staking;
pub mod wallet_button;

pub use create_course::{CreateCourseForm, CreateCourseView};
pub use feedback::{Feedback, Tone};
pub use listing::{ListingForm, ListingView};
pub use navbar::{NavBarState, NavBarView};
pub use profile::{ProfileForm, ProfileView};
pub use staking::{StakingForm, StakingView};
pub use wallet_button::WalletButtonView;
