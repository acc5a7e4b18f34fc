//! clicker-runner: headless driver for Cookie Tycoon.
//!
//! Usage:
//!   clicker-runner --seconds 600 --cps 5 --db save.db
//!   clicker-runner --ipc-mode --db save.db [--config game.json] [--catalog upgrades.json]

use anyhow::Result;
use clicker_core::{
    catalog::UpgradeCatalog,
    config::GameConfig,
    economy::PurchaseOutcome,
    format::{format_exact, format_number},
    session::GameSession,
    store::SqliteStore,
    types::Millis,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::time::Instant;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Click { x: f64, y: f64 },
    Buy { id: String },
    /// Let the wall clock catch up, then report.
    Advance,
    Save,
    Quit,
}

#[derive(serde::Serialize)]
struct IpcReply<'a, T: serde::Serialize> {
    now_ms: Millis,
    #[serde(skip_serializing_if = "Option::is_none")]
    purchase: Option<&'a PurchaseOutcome>,
    state: T,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seconds = parse_arg(&args, "--seconds", 600u64);
    let clicks_per_second = parse_arg(&args, "--cps", 5u32);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = str_arg(&args, "--db").unwrap_or(":memory:");

    let config = match str_arg(&args, "--config") {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    let catalog = match str_arg(&args, "--catalog") {
        Some(path) => UpgradeCatalog::load(path)?,
        None => UpgradeCatalog::builtin(),
    };

    let store = if db == ":memory:" {
        SqliteStore::in_memory()?
    } else {
        SqliteStore::open(db)?
    };
    store.migrate()?;

    if ipc_mode {
        let started = Instant::now();
        let session = GameSession::start(&config, catalog, store, 0)?;
        run_ipc_loop(session, started)
    } else {
        println!("Cookie Tycoon: clicker-runner");
        println!("  seconds:   {seconds}");
        println!("  clicks/s:  {clicks_per_second}");
        println!("  db:        {db}");
        println!();
        let mut session = GameSession::start(&config, catalog, store, 0)?;
        simulate(&mut session, seconds, clicks_per_second)?;
        print_summary(&session, seconds);
        Ok(())
    }
}

fn run_ipc_loop(mut session: GameSession<SqliteStore>, started: Instant) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let now_ms = elapsed_ms(started);
        for event in session.advance(now_ms) {
            log::debug!("{}", serde_json::to_string(&event)?);
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        let mut purchase = None;
        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetState | IpcCommand::Advance => {}
            IpcCommand::Click { x, y } => {
                session.click(x, y, now_ms)?;
            }
            IpcCommand::Buy { id } => {
                purchase = Some(session.buy(&id)?);
            }
            IpcCommand::Save => {
                session.save_now()?;
            }
        }

        let reply = IpcReply {
            now_ms,
            purchase: purchase.as_ref(),
            state: session.view(),
        };
        writeln!(stdout, "{}", serde_json::to_string(&reply)?)?;
        stdout.flush()?;
    }

    session.end(elapsed_ms(started));
    Ok(())
}

/// Virtual-time play: click at a steady rate and greedily buy the
/// cheapest affordable upgrade after every second.
fn simulate(session: &mut GameSession<SqliteStore>, seconds: u64, clicks_per_second: u32) -> Result<()> {
    let click_gap = if clicks_per_second == 0 { 0 } else { 1000 / u64::from(clicks_per_second) };

    for second in 0..seconds {
        let base = second * 1000;
        for i in 0..u64::from(clicks_per_second) {
            session.click(0.0, 0.0, base + i * click_gap)?;
        }

        while let Some(id) = cheapest_affordable(session) {
            if !session.buy(&id)?.is_purchased() {
                break;
            }
        }

        let events = session.advance(base + 1000);
        log::debug!("t={}s events={}", second + 1, events.len());
    }

    session.save_now()?;
    session.end(seconds * 1000);
    Ok(())
}

fn cheapest_affordable(session: &GameSession<SqliteStore>) -> Option<String> {
    session
        .engine()
        .upgrade_views()
        .into_iter()
        .filter(|v| v.affordable)
        .min_by(|a, b| a.current_cost.total_cmp(&b.current_cost))
        .map(|v| v.id)
}

fn print_summary(session: &GameSession<SqliteStore>, seconds: u64) {
    let engine = session.engine();

    println!("=== RUN SUMMARY ===");
    println!("  played:         {seconds}s");
    println!("  balance:        {} ({})", format_number(engine.balance()), format_exact(engine.balance()));
    println!("  per second:     {}", format_number(engine.derived_rate()));
    println!("  per click:      {}", format_number(engine.derived_action_value()));
    println!("  total earned:   {}", format_number(engine.total_ever_earned()));
    if let Some(at) = session.last_saved_at() {
        println!("  last saved:     {}", at.with_timezone(&chrono::Local).format("%H:%M:%S"));
    }

    println!();
    println!("=== UPGRADES ===");
    for view in engine.upgrade_views().iter().filter(|v| v.owned_count > 0) {
        println!(
            "  {:<24} owned {:>4} | next {}",
            view.name,
            view.owned_count,
            format_number(view.current_cost)
        );
    }
}

fn elapsed_ms(started: Instant) -> Millis {
    Millis::try_from(started.elapsed().as_millis()).unwrap_or(Millis::MAX)
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
