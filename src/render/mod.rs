//! Plain-text rendering of the home screen.

pub mod catalog;

use std::fmt::Write;
use crate::models::DisplayVendor;
use crate::services::RosterState;
use catalog::*;

/// Extra context shown in the app-info footer.
#[derive(Debug, Clone, Default)]
pub struct AppInfo<'a> {
    pub app_id: &'a str,
    pub user_id: Option<&'a str>,
}

/// `⭐ 4.8`, clamped to the 0-5 scale.
pub fn format_rating(rating: f64) -> String {
    let rating = if rating.is_finite() { rating.clamp(0.0, 5.0) } else { 0.0 };
    format!("⭐ {:.1}", rating)
}

pub fn format_reviews(count: u64) -> String {
    format!("({} ulasan)", count)
}

pub fn render_vendor(vendor: &DisplayVendor) -> String {
    let mut card = format!("• {} — {}\n", vendor.name(), vendor.service());
    if let Some(price) = vendor.record.price.as_deref().filter(|p| !p.is_empty()) {
        let _ = writeln!(card, "  {}", price);
    }
    let _ = writeln!(
        card,
        "  {} {}",
        format_rating(vendor.record.rating),
        format_reviews(vendor.record.review_count)
    );
    let _ = writeln!(card, "  {}", vendor.profile_pic);
    card
}

/// The vendor section for one roster state: a loading line, the cards, or
/// the empty-state message.
pub fn render_roster(state: &RosterState) -> String {
    let mut out = format!("## {}\n", VENDORS_TITLE);
    match state {
        RosterState::Idle | RosterState::Loading => {
            let _ = writeln!(out, "{}", LOADING_TEXT);
        }
        RosterState::Populated(vendors) => {
            for vendor in vendors.iter() {
                out.push_str(&render_vendor(vendor));
            }
        }
        RosterState::Empty | RosterState::Cancelled => {
            let _ = writeln!(out, "{}", EMPTY_TEXT);
        }
    }
    out
}

pub fn render_categories() -> String {
    let mut out = format!("## {}\n", CATEGORIES_TITLE);
    let line = CATEGORIES
        .iter()
        .map(|c| format!("{} {}", c.icon, c.name))
        .collect::<Vec<_>>()
        .join("  ");
    let _ = writeln!(out, "{}", line);
    out
}

pub fn render_home(state: &RosterState, info: &AppInfo<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}", BRAND);
    let _ = writeln!(out, "{}", TAGLINE);
    let _ = writeln!(out, "[🔎 {}]\n", SEARCH_PLACEHOLDER);
    out.push_str(&render_categories());
    out.push('\n');
    out.push_str(&render_roster(state));
    out.push('\n');
    let _ = writeln!(out, "## {}", ABOUT_TITLE);
    let _ = writeln!(out, "{}\n", ABOUT_TEXT);
    let _ = writeln!(out, "{}", FOOTER_TEXT);
    let _ = writeln!(
        out,
        "App ID: {} | User ID: {}",
        info.app_id,
        info.user_id.unwrap_or("Loading...")
    );
    out
}
