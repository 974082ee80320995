use std::process::ExitCode;

use anyhow::{bail, Context};
use colored::Colorize;
use serde::Serialize;
use serde_json::json;
use trust_desk::{Desk, DeskConfig, JsonInbox};
use trust_ledger::{Block, IntegrityPolicy, IntegrityViolation, Ledger};
use trust_types::{AlertLevel, Amount, Movement, Payload};

use crate::cli::*;
use crate::config;

pub fn run_command(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = config::load(cli.config.as_deref())?;
    let format = cli.format;

    let done = |r: anyhow::Result<()>| r.map(|()| ExitCode::SUCCESS);
    match cli.command {
        Command::Init => done(cmd_init(&config, format)),
        Command::Append(args) => done(cmd_append(&config, args, format)),
        Command::Verify => cmd_verify(&config, format),
        Command::Log(args) => done(cmd_log(&config, args, format)),
        Command::Show(args) => done(cmd_show(&config, args, format)),
        Command::Export(args) => done(cmd_export(&config, args)),
        Command::Import(args) => done(cmd_import(&config, args)),
        Command::Quarantine => done(cmd_quarantine(&config)),
        Command::Repair => done(cmd_repair(&config)),
        Command::Unlock => done(cmd_unlock(&config)),
        Command::Post(args) => done(post(&config, &args.message.join(" ")).map(drop)),
        Command::Requests => done(cmd_requests(&config, format)),
        Command::Disburse(args) => done(disburse(&config, args.id, &args.amount, format).map(drop)),
        Command::Reconcile => done(cmd_reconcile(&config)),
        Command::Alert(args) => done(alert(&config, &args.level).map(drop)),
        Command::Balance => done(cmd_balance(&config, format)),
        Command::Render => done(cmd_render(&config)),
        Command::LinkExplorer => done(cmd_link_explorer(&config)),
        Command::Action(args) => cmd_action(&config, args, format),
    }
}

/// Open an existing ledger; `inspect` tolerates a failing chain.
fn open_ledger(config: &DeskConfig, inspect: bool) -> anyhow::Result<Ledger> {
    let mut ledger_config = config.ledger.clone();
    if !ledger_config.path.exists() {
        bail!("no ledger at {}; run `trust init` first", ledger_config.path.display());
    }
    if inspect {
        ledger_config.integrity_policy = IntegrityPolicy::ReadOnly;
    }
    Ledger::open_or_create(ledger_config)
        .with_context(|| format!("opening ledger {}", config.ledger.path.display()))
}

fn open_desk(config: &DeskConfig) -> anyhow::Result<Desk<JsonInbox>> {
    let ledger = open_ledger(config, false)?;
    let inbox = JsonInbox::new(&config.inbox_path);
    Ok(Desk::with_ledger(config.clone(), ledger, inbox))
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn amount_text(amount: Amount) -> colored::ColoredString {
    if amount.is_positive() {
        amount.to_string().green()
    } else {
        amount.to_string().yellow()
    }
}

fn block_line(block: &Block) -> String {
    let amount = block.data.amount().map(|a| format!(" {}", amount_text(a))).unwrap_or_default();
    format!(
        "{:>6}  {}  {}  {}{}",
        format!("#{}", block.index).yellow().bold(),
        block.hash.short_hex().dimmed(),
        block.timestamp.as_str().dimmed(),
        block.data.description(),
        amount
    )
}

fn cmd_init(config: &DeskConfig, format: OutputFormat) -> anyhow::Result<()> {
    let existed = config.ledger.path.exists();
    let ledger = Ledger::open_or_create(config.ledger.clone())
        .with_context(|| format!("initializing ledger {}", config.ledger.path.display()))?;
    let genesis = ledger.get(0)?.context("ledger has no genesis block")?;

    if format == OutputFormat::Json {
        return print_json(&json!({
            "path": config.ledger.path,
            "created": !existed,
            "blocks": ledger.len()?,
            "genesis": genesis.hash,
        }));
    }
    if existed {
        println!("Ledger already initialized at {} ({} blocks)", config.ledger.path.display().to_string().bold(), ledger.len()?);
    } else {
        println!("{} Initialized ledger at {}", "✓".green().bold(), config.ledger.path.display().to_string().bold());
    }
    println!("  Genesis: {}", genesis.hash.to_string().cyan());
    Ok(())
}

fn cmd_append(config: &DeskConfig, args: AppendArgs, format: OutputFormat) -> anyhow::Result<()> {
    let payload = match (args.movement, args.text) {
        (Some(fields), _) => {
            let [description, amount]: [String; 2] = fields
                .try_into()
                .map_err(|_| anyhow::anyhow!("--movement takes DESCRIPTION AMOUNT"))?;
            let amount: Amount = amount.parse()?;
            Payload::from(Movement::new(description, amount))
        }
        (None, Some(text)) => Payload::text(text),
        (None, None) => bail!("nothing to append"),
    };

    let ledger = open_ledger(config, false)?;
    let block = ledger.append(payload)?;
    if format == OutputFormat::Json {
        return print_json(&block);
    }
    println!("{} Appended block {}", "✓".green().bold(), format!("#{}", block.index).yellow());
    println!("  Hash: {}", block.hash.to_string().cyan());
    Ok(())
}

fn print_violation(violation: &IntegrityViolation) {
    println!("{} Chain integrity violated at block #{}", "✗".red().bold(), violation.first_index);
    for v in &violation.violations {
        println!("  {} {}", "-".red(), v);
    }
}

fn cmd_verify(config: &DeskConfig, format: OutputFormat) -> anyhow::Result<ExitCode> {
    let ledger = open_ledger(config, true)?;
    let blocks = ledger.len()?;
    let result = match ledger.taint() {
        Some(violation) => Err(violation.clone()),
        None => ledger.verify(),
    };

    if format == OutputFormat::Json {
        let violations: Vec<_> = result
            .as_ref()
            .err()
            .map(|v| {
                v.violations
                    .iter()
                    .map(|v| json!({"index": v.index, "kind": v.kind.to_string(), "description": v.description}))
                    .collect()
            })
            .unwrap_or_default();
        print_json(&json!({
            "valid": result.is_ok(),
            "blocks": blocks,
            "first_violation": result.as_ref().err().map(|v| v.first_index),
            "violations": violations,
        }))?;
    } else {
        match &result {
            Ok(()) => {
                println!("{} Chain integrity verified", "✓".green().bold());
                println!("  Blocks: {}", blocks.to_string().bold());
                println!("  Links: {}", "valid".green());
                println!("  Hashes: {}", "valid".green());
            }
            Err(violation) => print_violation(violation),
        }
    }
    Ok(if result.is_ok() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn cmd_log(config: &DeskConfig, args: LogArgs, format: OutputFormat) -> anyhow::Result<()> {
    let ledger = open_ledger(config, true)?;
    let recent = ledger.recent(args.limit)?;
    if format == OutputFormat::Json {
        return print_json(&recent);
    }
    if let Some(violation) = ledger.taint() {
        println!("{} ledger is read-only: {}", "warning:".yellow().bold(), violation);
    }
    for block in &recent {
        println!("{}", block_line(block));
    }
    Ok(())
}

fn cmd_show(config: &DeskConfig, args: ShowArgs, format: OutputFormat) -> anyhow::Result<()> {
    let ledger = open_ledger(config, true)?;
    let Some(block) = ledger.get(args.index)? else {
        bail!("no block #{} (chain has {} blocks)", args.index, ledger.len()?);
    };
    if format == OutputFormat::Json {
        return print_json(&block);
    }
    println!("Block {}", format!("#{}", block.index).yellow().bold());
    println!("  Timestamp: {}", block.timestamp);
    println!("  Data:      {}", block.data);
    if let Some(m) = block.data.as_movement() {
        println!("  Amount:    {}", amount_text(m.amount));
        if let Some(request) = m.request {
            println!("  Request:   #{request}");
        }
    }
    println!("  Hash:      {}", block.hash.to_string().cyan());
    println!("  Previous:  {}", block.previous_hash_str().dimmed());
    Ok(())
}

fn cmd_export(config: &DeskConfig, args: PathArgs) -> anyhow::Result<()> {
    let ledger = open_ledger(config, true)?;
    let count = trust_ledger::export(&ledger, &args.path)?;
    println!("{} Exported {} blocks to {}", "✓".green().bold(), count, args.path.display().to_string().bold());
    Ok(())
}

fn cmd_import(config: &DeskConfig, args: PathArgs) -> anyhow::Result<()> {
    let ledger = trust_ledger::import(&args.path, config.ledger.clone())
        .with_context(|| format!("importing {}", args.path.display()))?;
    println!(
        "{} Imported {} blocks into {}",
        "✓".green().bold(),
        ledger.len()?,
        config.ledger.path.display().to_string().bold()
    );
    Ok(())
}

fn cmd_quarantine(config: &DeskConfig) -> anyhow::Result<()> {
    let moved = trust_ledger::quarantine(&config.ledger)?;
    println!("{} Ledger moved to {}", "✓".green().bold(), moved.display().to_string().bold());
    println!("  Run {} to start a fresh chain.", "trust init".cyan());
    Ok(())
}

fn cmd_repair(config: &DeskConfig) -> anyhow::Result<()> {
    match trust_ledger::repair_torn_tail(&config.ledger)? {
        Some(dropped) => println!("{} Dropped {} bytes of an incomplete final record", "✓".green().bold(), dropped),
        None => println!("Ledger ends cleanly; nothing to repair."),
    }
    Ok(())
}

fn cmd_unlock(config: &DeskConfig) -> anyhow::Result<()> {
    if trust_ledger::force_unlock(&config.ledger)? {
        println!("{} Removed {}", "✓".green().bold(), config.ledger.lock_path().display());
    } else {
        println!("No lock present.");
    }
    Ok(())
}

fn post(config: &DeskConfig, message: &str) -> anyhow::Result<bool> {
    let desk = open_desk(config)?;
    let changed = desk.post_news(message)?;
    if changed {
        println!("{} Communiqué posted; portal updated.", "✓".green().bold());
    } else {
        println!("Empty message; nothing posted.");
    }
    Ok(changed)
}

fn cmd_requests(config: &DeskConfig, format: OutputFormat) -> anyhow::Result<()> {
    let desk = open_desk(config)?;
    let open = desk.open_requests()?;
    if format == OutputFormat::Json {
        return print_json(&open);
    }
    if open.is_empty() {
        println!("No pending requests.");
        return Ok(());
    }
    println!("{} open request(s):", open.len().to_string().bold());
    for request in &open {
        let paid = desk.ledger().find_request(request.id)?.is_some();
        let marker = if paid { " (paid, awaiting acknowledgement)".yellow().to_string() } else { String::new() };
        println!("  [{}] {} ({}){}", request.id.to_string().yellow(), request.title.bold(), request.submitter, marker);
        if !request.body.is_empty() {
            println!("      {}", request.body.dimmed());
        }
    }
    Ok(())
}

fn disburse(config: &DeskConfig, id: u64, amount: &str, format: OutputFormat) -> anyhow::Result<bool> {
    let amount: Amount = amount.parse()?;
    let desk = open_desk(config)?;
    let outcome = desk.disburse(id, amount)?;
    if format == OutputFormat::Json {
        print_json(&json!({
            "request": id,
            "appended": outcome.appended,
            "rendered": outcome.rendered,
            "block": outcome.block,
        }))?;
    } else if outcome.appended {
        println!("{} Request #{} paid in block {}; acknowledged.", "✓".green().bold(), id, format!("#{}", outcome.block.index).yellow());
    } else {
        println!("{} Request #{} was already paid in block #{}; acknowledged.", "✓".green().bold(), id, outcome.block.index);
    }
    if !outcome.rendered && format != OutputFormat::Json {
        println!("{} Portal not updated; run `trust render` to retry.", "!".yellow().bold());
    }
    Ok(true)
}

fn cmd_reconcile(config: &DeskConfig) -> anyhow::Result<()> {
    let desk = open_desk(config)?;
    let acknowledged = desk.reconcile()?;
    if acknowledged.is_empty() {
        println!("Inbox and ledger agree.");
    } else {
        for id in acknowledged {
            println!("{} Acknowledged request #{}", "✓".green().bold(), id);
        }
    }
    Ok(())
}

fn alert(config: &DeskConfig, level: &str) -> anyhow::Result<bool> {
    let level: AlertLevel = level.parse()?;
    let desk = open_desk(config)?;
    let changed = desk.set_alert(level)?;
    if changed {
        println!("{} Alert level changed to {}", "✓".green().bold(), level.to_string().bold());
    } else {
        println!("Alert level already {}.", level);
    }
    Ok(changed)
}

fn cmd_balance(config: &DeskConfig, format: OutputFormat) -> anyhow::Result<()> {
    let desk = open_desk(config)?;
    let balance = desk.balance()?;
    if format == OutputFormat::Json {
        return print_json(&json!({ "balance": balance, "unit": config.site.unit }));
    }
    println!("{} {}", balance.unsigned_string().bold(), config.site.unit);
    Ok(())
}

fn cmd_render(config: &DeskConfig) -> anyhow::Result<()> {
    open_desk(config)?.render()?;
    println!(
        "{} Rendered {} and {}",
        "✓".green().bold(),
        config.portal_path.display(),
        config.explorer_path.display()
    );
    Ok(())
}

fn cmd_link_explorer(config: &DeskConfig) -> anyhow::Result<()> {
    if open_desk(config)?.link_explorer()? {
        println!("{} Portal linked to explorer.", "✓".green().bold());
    } else {
        println!("Portal already links the explorer.");
    }
    Ok(())
}

/// Numbered menu actions; exit status 0 when something changed, 1 otherwise.
fn cmd_action(config: &DeskConfig, args: ActionArgs, format: OutputFormat) -> anyhow::Result<ExitCode> {
    let changed = match (args.code, args.args.as_slice()) {
        (1, words) if !words.is_empty() => post(config, &words.join(" "))?,
        (2, [id, amount]) => {
            let id: u64 = id.parse().with_context(|| format!("invalid request id {id:?}"))?;
            disburse(config, id, amount, format)?
        }
        (3, [level]) => alert(config, level)?,
        (1, _) => bail!("action 1 takes MESSAGE"),
        (2, _) => bail!("action 2 takes ID AMOUNT"),
        (3, _) => bail!("action 3 takes LEVEL"),
        (code, _) => bail!("unknown action {code}; expected 1 (post), 2 (disburse) or 3 (alert)"),
    };
    Ok(if changed { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use trust_desk::Request;
    use trust_ledger::{LedgerConfig, SyncMode};

    use super::*;

    fn config(dir: &Path) -> DeskConfig {
        DeskConfig {
            ledger: LedgerConfig {
                sync_mode: SyncMode::OsDefault,
                ..LedgerConfig::at(dir.join("ledger.jsonl"))
            },
            state_path: dir.join("trust_data.json"),
            inbox_path: dir.join("requests.json"),
            portal_path: dir.join("index.html"),
            explorer_path: dir.join("explorer.html"),
            ..DeskConfig::default()
        }
    }

    fn action(config: &DeskConfig, code: u8, args: &[&str]) -> anyhow::Result<ExitCode> {
        cmd_action(
            config,
            ActionArgs {
                code,
                args: args.iter().map(|s| s.to_string()).collect(),
            },
            OutputFormat::Text,
        )
    }

    #[test]
    fn commands_require_init() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        assert!(open_ledger(&config, false).is_err());
        cmd_init(&config, OutputFormat::Text).unwrap();
        assert!(open_ledger(&config, false).is_ok());
    }

    #[test]
    fn action_codes_report_change() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        cmd_init(&config, OutputFormat::Text).unwrap();
        JsonInbox::new(&config.inbox_path)
            .submit(Request::new(4, "Shelter #4", "shelter"))
            .unwrap();

        assert_eq!(action(&config, 1, &["BRIDGE", "ACTIVE"]).unwrap(), ExitCode::SUCCESS);
        assert_eq!(action(&config, 3, &["amber"]).unwrap(), ExitCode::SUCCESS);
        assert_eq!(action(&config, 3, &["2"]).unwrap(), ExitCode::FAILURE);
        assert_eq!(action(&config, 2, &["4", "0.15"]).unwrap(), ExitCode::SUCCESS);
        assert!(action(&config, 2, &["4"]).is_err());
        assert!(action(&config, 9, &[]).is_err());

        let html = fs::read_to_string(&config.portal_path).unwrap();
        assert!(html.contains("BRIDGE ACTIVE"));
        assert!(html.contains("SHELTER #4"));
        assert!(html.contains("STATUS: AMBER"));
    }

    #[test]
    fn verify_fails_on_tampered_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        cmd_init(&config, OutputFormat::Text).unwrap();
        cmd_append(
            &config,
            AppendArgs {
                text: Some("INFLOW +50.00000000".into()),
                movement: None,
            },
            OutputFormat::Text,
        )
        .unwrap();
        assert_eq!(cmd_verify(&config, OutputFormat::Json).unwrap(), ExitCode::SUCCESS);

        let text = fs::read_to_string(&config.ledger.path).unwrap();
        fs::write(&config.ledger.path, text.replace("+50.", "+500.")).unwrap();
        assert_eq!(cmd_verify(&config, OutputFormat::Text).unwrap(), ExitCode::FAILURE);
        assert!(open_ledger(&config, false).is_err());
    }

    #[test]
    fn append_movement_parses_amount() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        cmd_init(&config, OutputFormat::Text).unwrap();
        let bad = AppendArgs {
            text: None,
            movement: Some(vec!["GIFT".into(), "lots".into()]),
        };
        assert!(cmd_append(&config, bad, OutputFormat::Text).is_err());

        let good = AppendArgs {
            text: None,
            movement: Some(vec!["GIFT".into(), "-0.00041822".into()]),
        };
        cmd_append(&config, good, OutputFormat::Text).unwrap();
        let tip = open_ledger(&config, true).unwrap().tip().unwrap();
        assert_eq!(tip.data.amount().unwrap().to_string(), "-0.00041822");
    }
}
