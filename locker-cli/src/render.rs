//! Plain-text rendering for terminal output.

use chrono::NaiveDate;
use locker_core::dates::{format_display_date, format_short_date};
use locker_core::{deadline_status, Purchase, UrgencyClassification, UrgencyTier};

pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

pub fn tier_heading(tier: UrgencyTier) -> &'static str {
    match tier {
        UrgencyTier::Urgent => "Urgent",
        UrgencyTier::Upcoming => "Upcoming",
        UrgencyTier::Reference => "Reference",
    }
}

/// "Feb 7 (2 days left)", or "-" when untracked.
pub fn deadline_cell(deadline: Option<NaiveDate>, today: NaiveDate) -> String {
    match deadline {
        Some(d) => format!("{} ({})", format_short_date(d), deadline_status(d, today).text),
        None => "-".to_string(),
    }
}

pub fn purchase_line(p: &Purchase, today: NaiveDate) -> String {
    let store = p
        .store
        .as_deref()
        .map(|s| format!(" @ {s}"))
        .unwrap_or_default();
    let archived = if p.is_archived() { " [archived]" } else { "" };
    format!(
        "{}  {}{}{} | return: {} | warranty: {}",
        short_id(&p.id),
        p.name,
        store,
        archived,
        deadline_cell(p.return_deadline, today),
        deadline_cell(p.warranty_expiry, today)
    )
}

fn price_text(p: &Purchase) -> Option<String> {
    let price = p.price?;
    Some(format!(
        "{:.2} {}",
        price,
        p.currency.as_deref().unwrap_or(locker_core::purchase::DEFAULT_CURRENCY)
    ))
}

pub fn purchase_detail(p: &Purchase, today: NaiveDate, c: &UrgencyClassification) -> String {
    let mut lines = vec![
        format!("{} ({})", p.name, p.id),
        format!("  status:      {}", p.status),
        format!("  purchased:   {}", format_display_date(p.purchase_date)),
    ];
    if let Some(s) = &p.store {
        lines.push(format!("  store:       {s}"));
    }
    if let Some(price) = price_text(p) {
        lines.push(format!("  price:       {price}"));
    }
    if let Some(d) = p.return_deadline {
        lines.push(format!(
            "  return by:   {} ({})",
            format_display_date(d),
            deadline_status(d, today).text
        ));
    }
    if let Some(d) = p.warranty_expiry {
        lines.push(format!(
            "  warranty:    {} ({})",
            format_display_date(d),
            deadline_status(d, today).text
        ));
    }
    if let Some(s) = &p.serial_number {
        lines.push(format!("  serial:      {s}"));
    }
    if let Some(n) = &p.notes {
        lines.push(format!("  notes:       {n}"));
    }
    let primary = c
        .primary_deadline
        .map(|k| format!(" ({k})"))
        .unwrap_or_default();
    lines.push(format!("  urgency:     {}{}", c.tier, primary));
    lines.join("\n")
}
