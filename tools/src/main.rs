//! quote-runner: headless driver for the dealership financing resolver.
//!
//! Usage:
//!   quote-runner --db finance.db --rate-sheet sheet.json
//!   quote-runner --db finance.db --recompute 7 --without-insurance
//!   quote-runner --db finance.db --ipc-mode

use anyhow::Result;
use chrono::NaiveDate;
use dealer_finance_core::{
    amortization,
    clock::{Clock, FixedClock, SystemClock},
    config::FinanceConfig,
    inventory::{InventoryRecompute, Requester},
    resolver::{QuoteRequest, QuoteResolver},
    store::{FinanceStore, RateSheetRow},
    types::{DealershipId, EntityId},
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
struct EntitySeed {
    id:   EntityId,
    name: String,
    #[serde(default = "default_true")]
    active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(serde::Deserialize)]
struct RateSheetFile {
    #[serde(default)]
    entities: Vec<EntitySeed>,
    rows: Vec<RateSheetRow>,
}

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Quote {
        request: QuoteRequest,
        #[serde(default)]
        campaign: Option<String>,
    },
    Estimate {
        amount: f64,
        annual_rate: f64,
        term_months: u32,
        #[serde(default = "default_true")]
        with_insurance: bool,
    },
    Recompute {
        dealership_id: DealershipId,
        #[serde(default = "default_true")]
        with_insurance: bool,
    },
    LoadRateSheet {
        rows: Vec<RateSheetRow>,
    },
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let without_insurance = args.iter().any(|a| a == "--without-insurance");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");
    let rate_sheet = flag_value(&args, "--rate-sheet");
    let recompute: Option<DealershipId> =
        flag_value(&args, "--recompute").and_then(|v| v.parse().ok());
    let today: Option<NaiveDate> = flag_value(&args, "--today").and_then(|v| v.parse().ok());

    let config = FinanceConfig::load(data_dir)?;
    let clock: Box<dyn Clock> = match today {
        Some(date) => Box::new(FixedClock::new(date)),
        None => Box::new(SystemClock),
    };

    let store = FinanceStore::open(db)?;
    store.migrate()?;
    store.seed_campaigns(config.new_vehicle_max_age_months)?;

    if !ipc_mode {
        println!("quote-runner");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!("  today:     {}", clock.today());
        println!();
    }

    if let Some(path) = rate_sheet {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let file: RateSheetFile = serde_json::from_str(&content)?;
        for entity in &file.entities {
            store.seed_entity(entity.id, &entity.name, entity.active)?;
        }
        let summary = store.load_rate_sheet(&file.rows)?;
        println!("=== RATE SHEET ===");
        println!("  inserted:          {}", summary.inserted);
        println!("  updated:           {}", summary.updated);
        println!("  unknown entity:    {}", summary.skipped_entity);
        println!("  unknown campaign:  {}", summary.skipped_campaign);
        println!("  invalid row:       {}", summary.skipped_invalid);
    }

    if ipc_mode {
        run_ipc_loop(&store, &config, clock.as_ref())?;
    } else if let Some(dealership_id) = recompute {
        let job = InventoryRecompute::new(&store, &config, clock.as_ref());
        let report = job.recompute_dealership(&Requester::admin(), dealership_id, !without_insurance)?;
        println!("=== RECOMPUTE ===");
        println!("  batch:     {}", report.batch_id);
        println!("  updated:   {}", report.updated);
        println!("  failed:    {}", report.failed);
    }

    Ok(())
}

fn run_ipc_loop(store: &FinanceStore, config: &FinanceConfig, clock: &dyn Clock) -> Result<()> {
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

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        let reply = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Quote { request, campaign } => {
                let resolver = QuoteResolver::new(store, config, clock);
                let response = match campaign {
                    Some(code) => resolver.quote_for_campaign(&code, &request),
                    None => resolver.quote(&request),
                };
                serde_json::to_value(response)?
            }
            IpcCommand::Estimate { amount, annual_rate, term_months, with_insurance } => {
                match amortization::estimate_installment(
                    amount, annual_rate, term_months, with_insurance, config,
                ) {
                    Ok(installment) => serde_json::to_value(installment)?,
                    Err(e) => serde_json::json!({ "error": e.to_string() }),
                }
            }
            IpcCommand::Recompute { dealership_id, with_insurance } => {
                let job = InventoryRecompute::new(store, config, clock);
                match job.recompute_dealership(&Requester::admin(), dealership_id, with_insurance) {
                    Ok(report) => serde_json::to_value(report)?,
                    Err(e) => serde_json::json!({ "error": e.to_string() }),
                }
            }
            IpcCommand::LoadRateSheet { rows } => match store.load_rate_sheet(&rows) {
                Ok(summary) => serde_json::to_value(summary)?,
                Err(e) => serde_json::json!({ "error": e.to_string() }),
            },
        };

        writeln!(stdout, "{}", reply)?;
        stdout.flush()?;
    }
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
