//! Dashboard page: CRM summary for the signed-in user.
//!
//! SYSTEM CONTEXT
//! ==============
//! This is the authenticated landing route. It fans out eight independent
//! reads and merges whatever came back into one [`DashboardSummary`].
//!
//! ERROR HANDLING
//! ==============
//! Each read settles on its own. A failed read contributes an empty list (or
//! a zero pipeline value), is logged at `warn`, and is listed in
//! `failed_sections`. The other sections are unaffected.

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod dashboard_test;

use crate::net::api::CrmApi;
use crate::net::error::ApiError;
use crate::net::types::{Activity, Deal, Lead};
use crate::state::session::{Session, SessionStore};
use crate::state::ui::Notices;

/// Rows kept per list section.
pub const RECENT_LIMIT: usize = 5;

/// One of the eight dashboard reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Section {
    Leads,
    Contacts,
    Deals,
    Activities,
    UpcomingActivities,
    OverdueActivities,
    DealsClosingSoon,
    PipelineValue,
}

impl Section {
    pub const ALL: [Self; 8] = [
        Self::Leads,
        Self::Contacts,
        Self::Deals,
        Self::Activities,
        Self::UpcomingActivities,
        Self::OverdueActivities,
        Self::DealsClosingSoon,
        Self::PipelineValue,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Leads => "leads",
            Self::Contacts => "contacts",
            Self::Deals => "deals",
            Self::Activities => "activities",
            Self::UpcomingActivities => "upcoming activities",
            Self::OverdueActivities => "overdue activities",
            Self::DealsClosingSoon => "deals closing soon",
            Self::PipelineValue => "pipeline value",
        }
    }
}

/// Merged result of the dashboard reads.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DashboardSummary {
    pub total_leads: usize,
    pub total_contacts: usize,
    pub total_deals: usize,
    pub total_activities: usize,
    pub pipeline_value: f64,
    pub recent_leads: Vec<Lead>,
    pub recent_deals: Vec<Deal>,
    pub upcoming_activities: Vec<Activity>,
    pub overdue_activities: Vec<Activity>,
    pub deals_closing_soon: Vec<Deal>,
    /// Sections whose read failed, in [`Section::ALL`] order.
    pub failed_sections: Vec<Section>,
}

impl DashboardSummary {
    #[must_use]
    pub fn all_failed(&self) -> bool {
        self.failed_sections.len() == Section::ALL.len()
    }
}

fn settle<T: Default>(section: Section, result: Result<T, ApiError>, failed: &mut Vec<Section>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(section = section.label(), code = err.error_code(), error = %err, "dashboard read failed");
            failed.push(section);
            T::default()
        }
    }
}

fn first_n<T>(mut items: Vec<T>) -> Vec<T> {
    items.truncate(RECENT_LIMIT);
    items
}

/// Run the eight reads concurrently and merge the results.
pub async fn load_summary(api: &dyn CrmApi) -> DashboardSummary {
    let (leads, contacts, deals, activities, upcoming, overdue, closing, pipeline) = futures::join!(
        api.leads(),
        api.contacts(),
        api.deals(),
        api.activities(),
        api.upcoming_activities(),
        api.overdue_activities(),
        api.deals_closing_soon(),
        api.pipeline_value(),
    );

    let mut failed = Vec::new();
    let leads = settle(Section::Leads, leads, &mut failed);
    let contacts = settle(Section::Contacts, contacts, &mut failed);
    let deals = settle(Section::Deals, deals, &mut failed);
    let activities = settle(Section::Activities, activities, &mut failed);
    let upcoming = settle(Section::UpcomingActivities, upcoming, &mut failed);
    let overdue = settle(Section::OverdueActivities, overdue, &mut failed);
    let closing = settle(Section::DealsClosingSoon, closing, &mut failed);
    let pipeline_value = settle(Section::PipelineValue, pipeline, &mut failed);

    tracing::debug!(
        leads = leads.len(),
        contacts = contacts.len(),
        deals = deals.len(),
        activities = activities.len(),
        pipeline_value,
        failed = failed.len(),
        "dashboard loaded"
    );

    DashboardSummary {
        total_leads: leads.len(),
        total_contacts: contacts.len(),
        total_deals: deals.len(),
        total_activities: activities.len(),
        pipeline_value,
        recent_leads: first_n(leads),
        recent_deals: first_n(deals),
        upcoming_activities: first_n(upcoming),
        overdue_activities: first_n(overdue),
        deals_closing_soon: first_n(closing),
        failed_sections: failed,
    }
}

// =============================================================================
// PAGE
// =============================================================================

#[derive(Clone, Debug, Default)]
pub struct DashboardPage {
    pub summary: Option<DashboardSummary>,
    pub loading: bool,
}

impl DashboardPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the summary when the session has a profile. Returns whether a
    /// load ran.
    pub async fn load(&mut self, session: &SessionStore, notices: &mut Notices) -> bool {
        let snapshot = session.snapshot();
        if !snapshot.is_authenticated() || snapshot.profile.is_none() {
            return false;
        }
        self.loading = true;
        let summary = load_summary(session.api()).await;
        self.loading = false;
        if summary.all_failed() {
            notices.error("Failed to load dashboard data");
        }
        self.summary = Some(summary);
        true
    }
}

/// Greeting line for the header of the page.
#[must_use]
pub fn welcome(session: &Session) -> String {
    match session.profile.as_ref().map(|p| p.first_name.trim()) {
        Some(name) if !name.is_empty() => format!("Welcome back, {name}!"),
        _ => "Welcome back!".to_owned(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BadgeVariant {
    Default,
    Secondary,
    Destructive,
    Outline,
}

/// Badge style for a lead or deal status. Matching is case-insensitive.
#[must_use]
pub fn status_badge(status: Option<&str>) -> BadgeVariant {
    let status = status.map(str::to_lowercase);
    match status.as_deref() {
        Some("new" | "prospect" | "closed" | "won") => BadgeVariant::Default,
        Some("qualified" | "in progress") => BadgeVariant::Secondary,
        Some("lost") => BadgeVariant::Destructive,
        _ => BadgeVariant::Outline,
    }
}

/// US-style currency text: `$15,000.5`, or `N/A` for a missing value.
#[must_use]
pub fn format_amount(value: Option<f64>) -> String {
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return "N/A".to_owned();
    };
    let sign = if value < 0.0 { "-" } else { "" };
    let fixed = format!("{:.2}", value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        format!("{sign}${grouped}")
    } else {
        format!("{sign}${grouped}.{fraction}")
    }
}

const MONTHS: [&str; 12] = ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"];

/// `2024-05-01` or `2024-05-01T09:30:00` as `May 1, 2024`. Anything else is
/// returned unchanged.
#[must_use]
pub fn format_date(raw: &str) -> String {
    parse_calendar_date(raw.get(..10).unwrap_or(raw)).unwrap_or_else(|| raw.to_owned())
}

fn parse_calendar_date(date: &str) -> Option<String> {
    let mut parts = date.splitn(3, '-');
    let year: u32 = parts.next()?.parse().ok()?;
    let month: usize = parts.next()?.parse().ok()?;
    let day: u32 = parts.next()?.parse().ok()?;
    let name = MONTHS.get(month.checked_sub(1)?)?;
    (1..=31).contains(&day).then(|| format!("{name} {day}, {year}"))
}
