use serde::Serialize;
use yd_api_types::{CourseCategory, CreateCourseRequest};
use yd_dapp_core::{CreateCourseInput, DappClient, DappError, PendingAction};

use crate::feedback::Feedback;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateCourseView {
    pub name: String,
    pub description: String,
    pub price: String,
    pub content_url: String,
    pub categories: Vec<CategoryOption>,
    pub submitting: bool,
    pub submit_label: &'static str,
    /// Outcome of `createCourse`.
    pub primary_status: Option<Feedback>,
    /// Outcome of the creator reward mint.
    pub follow_up_status: Option<Feedback>,
    pub toast: Option<Feedback>,
}

/// Field values survive a failed submission and reset after a successful
/// `createCourse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCourseForm {
    pub name: String,
    pub description: String,
    pub price: String,
    pub category: CourseCategory,
    pub content_url: String,
    pub primary_status: Option<Feedback>,
    pub follow_up_status: Option<Feedback>,
    pub toast: Option<Feedback>,
}

impl Default for CreateCourseForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            price: String::new(),
            category: CourseCategory::Advanced,
            content_url: String::new(),
            primary_status: None,
            follow_up_status: None,
            toast: None,
        }
    }
}

impl CreateCourseForm {
    /// Takes the submitted fields; an unknown category keeps the current one.
    pub fn fill(&mut self, request: &CreateCourseRequest) {
        self.name = request.name.clone();
        self.description = request.description.clone();
        self.price = request.price.clone();
        self.content_url = request.content_url.clone();
        if let Some(category) = request.category.as_deref().and_then(CourseCategory::from_label) {
            self.category = category;
        }
    }

    fn reset_fields(&mut self) {
        let statuses = (
            self.primary_status.take(),
            self.follow_up_status.take(),
            self.toast.take(),
        );
        *self = Self::default();
        (self.primary_status, self.follow_up_status, self.toast) = statuses;
    }

    fn input(&self) -> CreateCourseInput {
        CreateCourseInput {
            name: self.name.clone(),
            description: self.description.clone(),
            price: self.price.clone(),
            category: self.category,
            content_url: self.content_url.clone(),
        }
    }
}

pub fn render(form: &CreateCourseForm, pending: &[PendingAction]) -> CreateCourseView {
    let submitting = pending
        .iter()
        .any(|action| matches!(action, PendingAction::CreateCourse | PendingAction::RewardMint));
    CreateCourseView {
        name: form.name.clone(),
        description: form.description.clone(),
        price: form.price.clone(),
        content_url: form.content_url.clone(),
        categories: CourseCategory::ALL
            .iter()
            .map(|category| CategoryOption {
                value: category.as_str(),
                label: category.label(),
                selected: *category == form.category,
            })
            .collect(),
        submitting,
        submit_label: if submitting { "Submitting..." } else { "Create course" },
        primary_status: form.primary_status.clone(),
        follow_up_status: form.follow_up_status.clone(),
        toast: form.toast.clone(),
    }
}

pub fn view(client: &DappClient, form: &CreateCourseForm) -> CreateCourseView {
    render(form, &client.submitter.pending())
}

fn create_error(err: &DappError) -> Feedback {
    match err {
        DappError::WalletNotConnected => Feedback::error("Connect your wallet before creating a course."),
        DappError::InvalidInput(_) | DappError::InvalidAmount(_) => Feedback::error(err.to_string()),
        other => Feedback::failed("Course creation failed", other),
    }
}

pub async fn submit(client: &DappClient, form: &mut CreateCourseForm) -> CreateCourseView {
    form.primary_status = None;
    form.follow_up_status = None;

    match client.submitter.create_course(&form.input()).await {
        Ok(outcome) => {
            let title = form.name.trim().to_owned();
            form.primary_status = Some(Feedback::success(format!(
                "Course \"{title}\" created (tx: {}).",
                outcome.primary
            )));
            form.follow_up_status = Some(Feedback::follow_up("Creator reward", &outcome.follow_up));
            form.toast = Some(Feedback::success(format!("\"{title}\" is now listed.")));
            form.reset_fields();
        }
        Err(err) => form.primary_status = Some(create_error(&err)),
    }
    view(client, form)
}
