use anyhow::Result;
use chrono::Local;
use clap::Parser;
use mansionfinder::cli::{init_logging, SheetArgs};
use mansionfinder::emansion::EMansionClient;
use mansionfinder::pipeline::{self, RunOptions};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Mansionfinder - e-mansion ad status sync for Google Sheets")]
struct Args {
    #[clap(flatten)]
    sheet: SheetArgs,

    /// Range holding the property names
    #[clap(long, env = "INPUT_RANGE", default_value = pipeline::SYNC_INPUT_RANGE)]
    input_range: String,

    /// Range holding the previous run's building ids and ad info
    #[clap(long, env = "STATE_RANGE", default_value = pipeline::SYNC_STATE_RANGE)]
    state_range: String,

    /// Top-left cell (or range) the results are written to, header included
    #[clap(long, env = "OUTPUT_RANGE", default_value = pipeline::SYNC_OUTPUT_RANGE)]
    output_range: String,

    /// Reuse the building id recorded in the same row instead of searching again
    #[clap(long)]
    reuse_ids: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.sheet.debug);

    println!("Mansionfinder - e-mansion Ad Status Sync");
    println!("========================================");

    let gateway = args.sheet.open_gateway()?;
    let provider = EMansionClient::new()?;

    let options = RunOptions {
        input_range: args.input_range,
        output_range: args.output_range,
        state_range: args.state_range,
        max_items: args.sheet.max_items,
        reuse_ids: args.reuse_ids,
        show_progress: args.sheet.show_progress(),
    };

    let today = Local::now().date_naive();
    let report = pipeline::run_sync(&provider, gateway.as_ref(), &options, today)?;

    println!("\n=== Summary ===");
    println!("Properties processed: {}", report.processed);
    println!("Buildings resolved: {}", report.resolved);
    println!("Not found: {}", report.not_found);
    println!("Ad info fetch failed: {}", report.fetch_failed);
    println!(
        "Sold out: {} ({} new today, {} still sold out)",
        report.sold_out, report.newly_sold_out, report.currently_sold_out
    );
    println!("Saved to: {}", report.written.updated_range);

    Ok(())
}
