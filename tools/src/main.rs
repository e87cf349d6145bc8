//! kiosk-runner: headless kiosk/admin front end for the overtime engine.
//!
//! Usage:
//!   kiosk-runner --db overtime.db --data-dir ./data
//!   kiosk-runner --db overtime.db --ipc-mode
//!   kiosk-runner --db overtime.db --now 2026-10-14T14:05 --ipc-mode

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use overtime_core::{
    admin::week_start_of,
    clock::{Clock, FixedClock, SystemClock},
    command::{CommandReply, KioskCommand},
    config::PolicyConfig,
    engine::AllocationEngine,
    notifier::LogListener,
    roster::SlotState,
    store::SlotStore,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = arg_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = arg_value(&args, "--data-dir").unwrap_or("./data");
    let fixed_now = match arg_value(&args, "--now") {
        Some(raw) => Some(parse_now(raw)?),
        None => None,
    };

    let config = load_config(data_dir)?;
    let clock: Arc<dyn Clock> = match fixed_now {
        Some(now) => Arc::new(FixedClock::new(now)),
        None => Arc::new(SystemClock),
    };

    if !ipc_mode {
        println!("Overtime kiosk-runner");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!("  now:       {}", clock.now().format("%Y-%m-%d %H:%M"));
        println!();
    }

    let store = SlotStore::open(db)?;
    store.migrate()?;

    let mut engine = AllocationEngine::new(store, config, clock)?;
    engine.subscribe(Box::new(LogListener));

    let today = engine.now().date();
    let week = engine.ensure_week_for(today)?;
    log::info!("week={} start={} status={}", week.id, week.start_date, week.status.as_str());

    if ipc_mode {
        run_ipc_loop(&mut engine)?;
    } else {
        print_summary(&engine, today)?;
    }

    Ok(())
}

/// One JSON command per line on stdin, one JSON reply per line on stdout.
fn run_ipc_loop(engine: &mut AllocationEngine) -> Result<()> {
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
        let line = buffer.trim();
        if line.is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<serde_json::Value>(line) {
            Ok(value) if value["cmd"] == "quit" => break,
            Ok(value) => match serde_json::from_value::<KioskCommand>(value) {
                Ok(cmd) => engine.execute(cmd),
                Err(e) => malformed(e),
            },
            Err(e) => malformed(e),
        };
        writeln!(stdout, "{}", serde_json::to_string(&reply)?)?;
        stdout.flush()?;
    }
    Ok(())
}

fn malformed(e: serde_json::Error) -> CommandReply {
    CommandReply::Error {
        kind: "validation".to_string(),
        message: e.to_string(),
    }
}

fn print_summary(engine: &AllocationEngine, today: NaiveDate) -> Result<()> {
    let grid = engine.week_grid(week_start_of(today))?;

    println!("=== WEEK SUMMARY ===");
    if let Some(week) = &grid.week {
        println!("  week:      {} → {}", week.start_date, week.end_date);
        println!("  status:    {}", week.status.as_str());
    }
    for day in &grid.days {
        for slot in &day.slots {
            let state = match slot.state {
                SlotState::Available => "available",
                SlotState::FullContestable => "full (contestable)",
                SlotState::FullLocked => "full (locked)",
                SlotState::Closed => "closed",
            };
            println!(
                "  {} {:<9} {:<7} {}/{}  {}",
                day.date,
                day.weekday,
                slot.code.as_str(),
                slot.taken,
                slot.capacity,
                state
            );
        }
    }
    println!("  employees: {}", engine.roster()?.len());
    Ok(())
}

fn load_config(data_dir: &str) -> Result<PolicyConfig> {
    let path = format!("{data_dir}/policy.json");
    let config = if Path::new(&path).exists() {
        PolicyConfig::load(data_dir)?
    } else {
        log::warn!("config: {path} not found, using defaults");
        PolicyConfig::default()
    };
    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_now(raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M"))
        .map_err(|e| anyhow::anyhow!("--now expects YYYY-MM-DDTHH:MM, got '{raw}': {e}"))
}
