use anyhow::Result;
use chrono::Local;
use clap::Parser;
use mansionfinder::cli::{init_logging, SheetArgs};
use mansionfinder::emansion::EMansionClient;
use mansionfinder::links;
use mansionfinder::pipeline::{self, RunOptions};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Report the first active ad link (pure > L > Yahoo) per property")]
struct Args {
    #[clap(flatten)]
    sheet: SheetArgs,

    /// Range holding the property names
    #[clap(long, env = "INPUT_RANGE", default_value = pipeline::REPORT_INPUT_RANGE)]
    input_range: String,

    /// Top-left cell the link report is written to
    #[clap(long, env = "OUTPUT_RANGE", default_value = pipeline::REPORT_OUTPUT_RANGE)]
    output_range: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.sheet.debug);

    let gateway = args.sheet.open_gateway()?;
    let provider = EMansionClient::new()?.with_l_campaign(links::V6_CAMPAIGN);

    let options = RunOptions {
        input_range: args.input_range,
        output_range: args.output_range,
        max_items: args.sheet.max_items,
        show_progress: args.sheet.show_progress(),
        ..RunOptions::report()
    };

    let report = pipeline::run_ad_links(&provider, gateway.as_ref(), &options, Local::now().naive_local())?;
    println!(
        "Found active ads for {} of {} properties, saved to {}",
        report.with_link, report.processed, report.written.updated_range
    );

    Ok(())
}
