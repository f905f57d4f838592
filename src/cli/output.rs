use std::fmt::Write;

use chrono::{DateTime, Local, Utc};

use crate::app::Output;
use crate::error::Result;
use crate::models::{Analytics, Bonus, BonusPage, Product};
use crate::notify::{Notice, NoticeLevel};

pub fn render(output: &Output, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(output)?);
    }
    Ok(render_text(output))
}

pub fn render_notice(notice: &Notice) -> String {
    match notice.level {
        NoticeLevel::Success => format!("✓ {}", notice.message),
        NoticeLevel::Error => format!("✗ {}", notice.message),
    }
}

fn render_text(output: &Output) -> String {
    let mut out = String::new();

    match output {
        Output::Dashboard { stats, activity } => {
            let _ = writeln!(out, " BonusBoost Dashboard ");
            let _ = writeln!(
                out,
                " {} Bonuses | {} Active Pages | {} Views | {:.1}% Conversion",
                stats.total_bonuses, stats.active_pages, stats.total_views, stats.conversion_rate
            );
            let _ = writeln!(out);
            let _ = writeln!(out, "Recent activity:");
            for item in activity {
                let _ = writeln!(
                    out,
                    "  {}  {}",
                    format_time(&item.timestamp),
                    item.description
                );
            }
        }

        Output::Product(product) => render_product(&mut out, product),

        Output::Products(products) => {
            if products.is_empty() {
                let _ = writeln!(out, "No products analyzed yet");
            }
            for product in products {
                let _ = writeln!(out, "#{:<5} {}  ({})", product.id, product.name, product.url);
            }
        }

        Output::Bonuses(bonuses) => {
            if bonuses.is_empty() {
                let _ = writeln!(out, "No bonuses yet");
            }
            for bonus in bonuses {
                render_bonus(&mut out, bonus);
            }
        }

        Output::Page(page) => render_page(&mut out, page),

        Output::Pages(pages) => {
            if pages.is_empty() {
                let _ = writeln!(out, "No bonus pages yet");
            }
            for page in pages {
                let _ = writeln!(
                    out,
                    "#{:<5} {:<9} {:>6} views {:>5} clicks {:>5.1}%  {}",
                    page.id,
                    page.status.to_string(),
                    page.views,
                    page.clicks,
                    page.conversion_rate(),
                    page.title
                );
            }
        }

        Output::Deleted {
            entity,
            id,
            deleted,
        } => {
            if *deleted {
                let _ = writeln!(out, "Deleted {} #{}", entity, id);
            } else {
                let _ = writeln!(out, "Nothing deleted for {} #{}", entity, id);
            }
        }

        Output::Redirect { id, target } => {
            let _ = writeln!(out, "Click recorded for page #{}", id);
            let _ = writeln!(out, "Redirect: {}", target);
        }

        Output::Analytics(analytics) => render_analytics(&mut out, analytics),

        Output::Keys(keys) => {
            if keys.is_empty() {
                let _ = writeln!(out, "No API keys stored");
            }
            for key in keys {
                let state = if key.is_active { "active" } else { "inactive" };
                let _ = writeln!(
                    out,
                    "{:<8} {:<16} {:<8} added {}",
                    key.provider.display_name(),
                    key.masked(),
                    state,
                    format_time(&key.added_at)
                );
            }
        }

        Output::KeyRemoved { provider, removed } => {
            if *removed {
                let _ = writeln!(out, "Removed {} API key", provider);
            } else {
                let _ = writeln!(out, "No {} API key stored", provider);
            }
        }

        Output::Connection { provider, result } => {
            let mark = if result.success { "✓" } else { "✗" };
            let _ = writeln!(out, "{} {}: {}", mark, provider, result.message);
        }

        Output::Charges(charges) => {
            for charge in charges {
                let _ = writeln!(
                    out,
                    "#{:<5} {:<20} ${:>8.2}  {}",
                    charge.id, charge.name, charge.price, charge.limits_of_use
                );
            }
        }

        Output::SalesPages(pages) => {
            for page in pages {
                let _ = writeln!(
                    out,
                    "#{:<5} {:<9} {:>6} views  {}",
                    page.id, page.status, page.views, page.title
                );
            }
        }

        Output::Scripts(scripts) => {
            for script in scripts {
                let _ = writeln!(out, "#{:<5} {}  [{}]", script.id, script.name, script.tags);
            }
        }

        Output::Nothing | Output::Quit => {}
    }

    out
}

fn render_product(out: &mut String, product: &Product) {
    let _ = writeln!(out, "#{} {}", product.id, product.name);
    let _ = writeln!(out, "{}", product.url);
    let _ = writeln!(out, "{}", product.description);
    let _ = writeln!(out);
    let _ = writeln!(out, "Features:");
    for feature in &product.features {
        let _ = writeln!(out, "  • {}", feature);
    }
    let _ = writeln!(out, "Gaps:");
    for gap in &product.gaps {
        let _ = writeln!(out, "  • {}", gap);
    }
}

fn render_bonus(out: &mut String, bonus: &Bonus) {
    let label = match bonus.record_id() {
        Some(id) => format!("#{}", id),
        None => format!("{} (unsaved)", bonus.id),
    };
    let _ = writeln!(
        out,
        "{} {} ({}, {})",
        label, bonus.title, bonus.bonus_type, bonus.value
    );
    let _ = writeln!(out, "  {}", bonus.description);
    let _ = writeln!(out, "  Fills: {}", bonus.content.target_gap);
    let _ = writeln!(out, "  Includes: {}", bonus.content.components.join(", "));
}

fn render_page(out: &mut String, page: &BonusPage) {
    let _ = writeln!(out, "#{} {} [{}]", page.id, page.title, page.status);
    let _ = writeln!(out, "{}", page.url);
    if !page.headline.is_empty() {
        let _ = writeln!(out, "{}", page.headline);
    }
    if !page.subheadline.is_empty() {
        let _ = writeln!(out, "{}", page.subheadline);
    }
    if !page.description.is_empty() {
        let _ = writeln!(out, "{}", page.description);
    }
    if let Some(explanation) = &page.bonus_explanation {
        for item in explanation.items() {
            let _ = writeln!(out, "  • {}", item);
        }
    }
    let _ = writeln!(out, "[{}] → {}", page.cta_text, page.resolve_redirect());
    let _ = writeln!(
        out,
        "{} views | {} clicks | {} conversions | {:.1}%",
        page.views,
        page.clicks,
        page.conversions,
        page.conversion_rate()
    );
}

fn render_analytics(out: &mut String, analytics: &Analytics) {
    let _ = writeln!(out, " Analytics ({}) ", analytics.range);
    let _ = writeln!(
        out,
        " {} Views | {} Clicks | {} Conversions | {:.1}% | ${} Revenue",
        analytics.total_views,
        analytics.total_clicks,
        analytics.total_conversions,
        analytics.conversion_rate,
        analytics.revenue
    );

    let _ = writeln!(out);
    for series in &analytics.chart_data {
        let values: Vec<String> = series.data.iter().map(|p| p.y.to_string()).collect();
        let _ = writeln!(out, "{:<12} {}", series.name, values.join(" "));
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Top pages:");
    for page in &analytics.top_pages {
        let _ = writeln!(
            out,
            "  #{:<5} {:>6} views {:>5} clicks {:>5.1}%  {}",
            page.id, page.views, page.clicks, page.conversion_rate, page.title
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Recent activity:");
    for entry in &analytics.recent_activity {
        let _ = writeln!(
            out,
            "  {}  {:<5} {} via {}",
            format_time(&entry.timestamp),
            entry.action,
            entry.page_title,
            entry.source
        );
    }
}

fn format_time(timestamp: &DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}
