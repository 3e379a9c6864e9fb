use anyhow::Result;
use clap::Parser;
use mansionfinder::cli::{init_logging, SheetArgs};
use mansionfinder::emansion::EMansionClient;
use mansionfinder::pipeline::{self, RunOptions};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Look up e-mansion building ids for property names")]
struct Args {
    #[clap(flatten)]
    sheet: SheetArgs,

    /// Range holding the property names
    #[clap(long, env = "INPUT_RANGE", default_value = pipeline::REPORT_INPUT_RANGE)]
    input_range: String,

    /// Top-left cell the name/id table is written to
    #[clap(long, env = "OUTPUT_RANGE", default_value = pipeline::REPORT_OUTPUT_RANGE)]
    output_range: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.sheet.debug);

    let gateway = args.sheet.open_gateway()?;
    let provider = EMansionClient::new()?;

    let options = RunOptions {
        input_range: args.input_range,
        output_range: args.output_range,
        max_items: args.sheet.max_items,
        show_progress: args.sheet.show_progress(),
        ..RunOptions::report()
    };

    let report = pipeline::run_building_ids(&provider, gateway.as_ref(), &options)?;
    println!(
        "Resolved {} of {} properties, saved to {}",
        report.resolved, report.processed, report.written.updated_range
    );

    Ok(())
}
