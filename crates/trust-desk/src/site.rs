//! Static HTML for the public portal and the block explorer.
//!
//! Pages are plain strings built with `format!`. Every piece of operator or
//! ledger text goes through [`escape`] before it is interpolated.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use trust_ledger::Block;
use trust_types::{AlertLevel, Amount};

use crate::config::SiteConfig;
use crate::state::NewsItem;

/// Colour for inflows.
pub const INFLOW_COLOR: &str = "#00ff00";
/// Colour for outflows and entries without an amount.
pub const OUTFLOW_COLOR: &str = "#D4AF37";

/// Marker identifying the explorer link inside a portal page.
pub const EXPLORER_LINK_MARKER: &str = "href=\"explorer.html\"";

const EXPLORER_LINK: &str = "<a href=\"explorer.html\" class=\"explorer-link\">VIEW LIVE BLOCK EXPLORER</a>";

/// Everything the portal shows, already selected and ordered.
#[derive(Clone, Debug)]
pub struct PortalView<'a> {
    pub site: &'a SiteConfig,
    pub balance: Amount,
    pub alert: AlertLevel,
    /// Newest first.
    pub news: &'a [NewsItem],
    /// Newest first.
    pub history: &'a [Block],
    /// Tip hash and height for the status line.
    pub tip: &'a Block,
    pub rendered_at: DateTime<Utc>,
}

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Display colour for a signed amount.
pub fn amount_color(amount: Option<Amount>) -> &'static str {
    match amount {
        Some(a) if a.is_positive() => INFLOW_COLOR,
        _ => OUTFLOW_COLOR,
    }
}

pub fn render_portal(view: &PortalView<'_>) -> String {
    let site = view.site;
    let status_color = view.alert.color();

    let mut news = String::new();
    for item in view.news {
        let _ = write!(
            news,
            "\n            <div class=\"news\"><small>{}</small><br>{}</div>",
            escape(&item.date),
            escape(&item.msg)
        );
    }

    let mut history = String::new();
    for block in view.history {
        let amount = block.data.amount();
        let shown = amount.map(|a| a.to_string()).unwrap_or_default();
        let _ = write!(
            history,
            "\n            <div class=\"ledger-row\"><span>{}</span><span style=\"color: {};\">{}</span></div>",
            escape(block.data.description()),
            amount_color(amount),
            escape(&shown)
        );
    }

    let intake = match &site.intake_url {
        Some(url) => format!(
            r#"
        <div class="panel">
            <h3>SECURE INTAKE</h3>
            <p>Requests route directly to the Steward.</p>
            <form action="{}" method="get" target="_blank">
                <input type="text" name="title" placeholder="Request Title" required>
                <textarea name="body" rows="3" placeholder="Details..." required></textarea>
                <button>TRANSMIT REQUEST</button>
            </form>
        </div>"#,
            escape(url)
        ),
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        :root {{ --gold: #D4AF37; --bg: #050505; --panel: #111; --text: #e0e0e0; }}
        body {{ background-color: var(--bg); color: var(--text); font-family: 'Courier New', monospace; margin: 0; padding: 20px; }}
        .container {{ max-width: 800px; margin: 0 auto; }}
        h1 {{ color: var(--gold); letter-spacing: 2px; text-align: center; }}
        .status-bar {{ font-size: 0.8rem; color: {status_color}; border-bottom: 1px solid {status_color}; padding-bottom: 5px; margin-bottom: 20px; }}
        .metric {{ text-align: center; margin-bottom: 30px; background: var(--panel); padding: 20px; border: 1px solid #333; }}
        .val {{ font-size: 2rem; color: var(--gold); }}
        .panel {{ margin-bottom: 40px; }}
        .news {{ border-left: 2px solid var(--gold); padding-left: 10px; margin-bottom: 15px; }}
        .news small {{ color: #888; }}
        .ledger-row {{ border-bottom: 1px solid #222; padding: 10px; font-size: 0.8rem; display: flex; justify-content: space-between; }}
        input, textarea {{ width: 100%; padding: 10px; background: #000; border: 1px solid #444; color: #fff; box-sizing: border-box; margin-bottom: 10px; }}
        button {{ width: 100%; padding: 15px; background: var(--gold); color: #000; border: none; font-weight: bold; cursor: pointer; }}
        .explorer-link {{ display: block; margin-top: 20px; color: var(--gold); text-align: center; border: 1px solid var(--gold); padding: 10px; }}
        footer {{ text-align: center; margin-top: 40px; font-size: 0.7rem; color: #444; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>{heading}</h1>
        <div class="status-bar">STATUS: {alert} // CHAIN HEIGHT {height} // TIP {tip}</div>

        <div class="metric">
            <div class="val">{balance} {unit}</div>
            <div>RESERVE</div>
        </div>

        <div class="panel">
            <h3>COMMUNIQUÉS</h3>{news}
        </div>
{intake}
        <div class="panel">
            <h3>RECENT ACTIVITY</h3>{history}
        </div>

        {explorer_link}
        <footer>LAST SYNC: {rendered} | STEWARD: {steward}</footer>
    </div>
</body>
</html>
"#,
        title = escape(&site.title),
        heading = escape(&site.heading),
        alert = view.alert,
        height = view.tip.index,
        tip = view.tip.hash.short_hex(),
        balance = view.balance.unsigned_string(),
        unit = escape(&site.unit),
        rendered = view.rendered_at.format("%Y-%m-%d %H:%M UTC"),
        steward = escape(&site.steward),
        explorer_link = EXPLORER_LINK,
    )
}

/// Every block, newest first, with its full hashes.
pub fn render_explorer(site: &SiteConfig, blocks: &[Block], rendered_at: DateTime<Utc>) -> String {
    let mut rows = String::new();
    for block in blocks.iter().rev() {
        let amount = block.data.amount();
        let _ = write!(
            rows,
            r#"
            <tr>
                <td>{index}</td>
                <td>{timestamp}</td>
                <td>{description}</td>
                <td style="color: {color};">{amount}</td>
                <td class="hash">{hash}</td>
                <td class="hash">{previous}</td>
            </tr>"#,
            index = block.index,
            timestamp = escape(block.timestamp.as_str()),
            description = escape(block.data.description()),
            color = amount_color(amount),
            amount = amount.map(|a| a.to_string()).unwrap_or_default(),
            hash = block.hash,
            previous = escape(&block.previous_hash_str()),
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} | EXPLORER</title>
    <style>
        body {{ background-color: #050505; color: #e0e0e0; font-family: 'Courier New', monospace; padding: 20px; }}
        h1 {{ color: #D4AF37; text-align: center; }}
        table {{ width: 100%; border-collapse: collapse; font-size: 0.75rem; }}
        th, td {{ border-bottom: 1px solid #222; padding: 6px; text-align: left; vertical-align: top; }}
        th {{ color: #D4AF37; }}
        .hash {{ word-break: break-all; color: #888; }}
        footer {{ text-align: center; margin-top: 40px; font-size: 0.7rem; color: #444; }}
    </style>
</head>
<body>
    <h1>{title} BLOCK EXPLORER</h1>
    <p><a href="index.html" style="color: #D4AF37;">BACK TO PORTAL</a> // {count} BLOCKS</p>
    <table>
        <thead>
            <tr><th>#</th><th>TIMESTAMP</th><th>ENTRY</th><th>AMOUNT</th><th>HASH</th><th>PREVIOUS</th></tr>
        </thead>
        <tbody>{rows}
        </tbody>
    </table>
    <footer>LAST SYNC: {rendered}</footer>
</body>
</html>
"#,
        title = escape(&site.title),
        count = blocks.len(),
        rendered = rendered_at.format("%Y-%m-%d %H:%M UTC"),
    )
}

/// Insert the explorer link before `<footer>` in an existing portal page.
///
/// Returns `None` when the page already links the explorer or has no footer.
pub fn patch_explorer_link(html: &str) -> Option<String> {
    if html.contains(EXPLORER_LINK_MARKER) {
        return None;
    }
    let at = html.find("<footer>")?;
    let mut patched = String::with_capacity(html.len() + EXPLORER_LINK.len() + 16);
    patched.push_str(&html[..at]);
    patched.push_str(EXPLORER_LINK);
    patched.push_str("\n        ");
    patched.push_str(&html[at..]);
    Some(patched)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use trust_types::{Movement, Payload, Timestamp};

    use super::*;

    fn sample_chain() -> Vec<Block> {
        let genesis = Block::genesis("GENESIS");
        let inflow = Block::seal(1, Timestamp::now(), Payload::text("INFLOW +50.00000000"), Some(genesis.hash));
        let out = Block::seal(
            2,
            Timestamp::now(),
            Movement::new("SHELTER #4 <HEATING>", "-0.15".parse().unwrap()).into(),
            Some(inflow.hash),
        );
        vec![genesis, inflow, out]
    }

    fn rendered_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 59).unwrap()
    }

    fn portal(alert: AlertLevel, news: &[NewsItem], chain: &[Block]) -> String {
        let site = SiteConfig::default();
        let history: Vec<Block> = chain.iter().rev().cloned().collect();
        render_portal(&PortalView {
            site: &site,
            balance: "49.85".parse().unwrap(),
            alert,
            news,
            history: &history,
            tip: chain.last().unwrap(),
            rendered_at: rendered_at(),
        })
    }

    #[test]
    fn escape_covers_markup() {
        assert_eq!(escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn portal_shows_state() {
        let news = [NewsItem {
            date: "2026-10-16".into(),
            msg: "<b>bridge</b> active".into(),
        }];
        let html = portal(AlertLevel::Amber, &news, &sample_chain());

        assert!(html.contains("STATUS: AMBER"));
        assert!(html.contains("#ffbf00"));
        assert!(html.contains("49.85000000 BTC"));
        assert!(html.contains("LAST SYNC: 2026-10-16 09:30 UTC"));
        assert!(html.contains("&lt;b&gt;bridge&lt;/b&gt; active"));
        assert!(!html.contains("<b>bridge</b>"));
        assert!(html.contains("SHELTER #4 &lt;HEATING&gt;"));
        assert!(html.contains(EXPLORER_LINK_MARKER));
    }

    #[test]
    fn history_is_newest_first() {
        let html = portal(AlertLevel::Green, &[], &sample_chain());
        let shelter = html.find("SHELTER #4").unwrap();
        let inflow = html.find("INFLOW +50.00000000").unwrap();
        let genesis = html.find(">GENESIS<").unwrap();
        assert!(shelter < inflow && inflow < genesis);
    }

    #[test]
    fn amount_colour_follows_sign() {
        assert_eq!(amount_color(Some("50".parse().unwrap())), INFLOW_COLOR);
        assert_eq!(amount_color(Some("-0.15".parse().unwrap())), OUTFLOW_COLOR);
        assert_eq!(amount_color(None), OUTFLOW_COLOR);

        let html = portal(AlertLevel::Green, &[], &sample_chain());
        assert!(html.contains(&format!("color: {OUTFLOW_COLOR};\">-0.15000000")));
    }

    #[test]
    fn intake_form_only_when_configured() {
        let chain = sample_chain();
        let mut site = SiteConfig::default();
        let view = |site: &SiteConfig| {
            render_portal(&PortalView {
                site,
                balance: Amount::ZERO,
                alert: AlertLevel::Green,
                news: &[],
                history: &[],
                tip: &chain[0],
                rendered_at: rendered_at(),
            })
        };
        assert!(!view(&site).contains("<form"));
        site.intake_url = Some("https://intake.example/new?a=1&b=2".into());
        assert!(view(&site).contains(r#"action="https://intake.example/new?a=1&amp;b=2""#));
    }

    #[test]
    fn explorer_lists_every_block() {
        let chain = sample_chain();
        let html = render_explorer(&SiteConfig::default(), &chain, rendered_at());
        assert!(html.contains("3 BLOCKS"));
        for block in &chain {
            assert!(html.contains(&block.hash.to_hex()));
        }
        assert!(html.contains("<td class=\"hash\">0</td>"));
    }

    #[test]
    fn explorer_link_patch_is_idempotent() {
        let legacy = "<html><body><div>x</div>\n        <footer>LAST SYNC</footer></body></html>";
        let patched = patch_explorer_link(legacy).unwrap();
        assert!(patched.contains(EXPLORER_LINK_MARKER));
        assert!(patched.find(EXPLORER_LINK_MARKER).unwrap() < patched.find("<footer>").unwrap());
        assert_eq!(patch_explorer_link(&patched), None);
    }

    #[test]
    fn explorer_link_patch_needs_footer() {
        assert_eq!(patch_explorer_link("<html></html>"), None);
    }
}
