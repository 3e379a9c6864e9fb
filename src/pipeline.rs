use crate::models::{AdInfo, BuildingId, ReconciledRow};
use crate::reconcile::{reconcile, PriorState};
use crate::sheets::{first_column, A1Range, Row, SheetGateway, WriteSummary};
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

pub const SYNC_INPUT_RANGE: &str = "新着物件!B2:B";
pub const SYNC_STATE_RANGE: &str = "新着物件!L2:T";
pub const SYNC_OUTPUT_RANGE: &str = "新着物件!L1";
pub const REPORT_INPUT_RANGE: &str = "Sheet1!A2:A";
pub const REPORT_OUTPUT_RANGE: &str = "Sheet2!A1";

pub const BUILDING_ID_HEADER: &str = "Building ID";
pub const PROPERTY_NAME_HEADER: &str = "物件名";
pub const FETCHED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub trait ListingProvider {
    fn name(&self) -> &str;

    /// Building id for a property name. Blank names and empty results are `Ok(None)`.
    fn resolve_building(&self, property_name: &str) -> Result<Option<BuildingId>>;

    fn fetch_ad_info(&self, building_id: &BuildingId) -> Result<AdInfo>;
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input_range: String,
    pub output_range: String,
    /// Range holding the previous run's rows, only read by the ad sync.
    pub state_range: String,
    pub max_items: Option<usize>,
    /// Use the building id already recorded at the same row instead of searching.
    pub reuse_ids: bool,
    pub show_progress: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            input_range: SYNC_INPUT_RANGE.to_string(),
            output_range: SYNC_OUTPUT_RANGE.to_string(),
            state_range: SYNC_STATE_RANGE.to_string(),
            max_items: None,
            reuse_ids: false,
            show_progress: false,
        }
    }
}

impl RunOptions {
    /// Defaults for the name/id and ad link reports.
    pub fn report() -> Self {
        Self {
            input_range: REPORT_INPUT_RANGE.to_string(),
            output_range: REPORT_OUTPUT_RANGE.to_string(),
            ..Self::default()
        }
    }
}

fn parse_range(text: &str, what: &str) -> Result<A1Range> {
    text.parse()
        .with_context(|| format!("Invalid {} range: {}", what, text))
}

/// What a single property lookup produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    NotFound,
    FetchFailed(BuildingId),
    Fetched(BuildingId, AdInfo),
}

impl Lookup {
    pub fn building_id(&self) -> Option<&BuildingId> {
        match self {
            Lookup::NotFound => None,
            Lookup::FetchFailed(id) | Lookup::Fetched(id, _) => Some(id),
        }
    }

    pub fn ad_info(&self) -> Option<&AdInfo> {
        match self {
            Lookup::Fetched(_, info) => Some(info),
            _ => None,
        }
    }
}

/// Blank names are never searched and a failed search counts as not found.
/// Warnings are printed with the bar hidden.
fn resolve<P: ListingProvider>(provider: &P, property_name: &str, bar: &ProgressBar) -> Option<BuildingId> {
    if property_name.trim().is_empty() {
        return None;
    }
    match provider.resolve_building(property_name) {
        Ok(found) => found,
        Err(e) => {
            bar.suspend(|| {
                warn!(
                    "Error searching {} for {}: {:#}",
                    provider.name(),
                    property_name.trim(),
                    e
                )
            });
            None
        }
    }
}

fn lookup<P: ListingProvider>(
    provider: &P,
    property_name: &str,
    known: Option<&BuildingId>,
    bar: &ProgressBar,
) -> Lookup {
    let building_id = match known {
        Some(id) => {
            debug!("Reusing building id {} for {}", id, property_name);
            Some(id.clone())
        }
        None => resolve(provider, property_name, bar),
    };

    let Some(building_id) = building_id else {
        debug!("No building found for {:?}", property_name);
        return Lookup::NotFound;
    };

    match provider.fetch_ad_info(&building_id) {
        Ok(info) => Lookup::Fetched(building_id, info),
        Err(e) => {
            bar.suspend(|| {
                warn!(
                    "Error fetching ad info for building {} from {}: {:#}",
                    building_id,
                    provider.name(),
                    e
                )
            });
            Lookup::FetchFailed(building_id)
        }
    }
}

fn load_property_names<G: SheetGateway + ?Sized>(
    gateway: &G,
    range: &A1Range,
    max_items: Option<usize>,
) -> Result<Vec<String>> {
    let rows = gateway
        .read_range(range)
        .with_context(|| format!("Failed to read property names from {}", range))?;
    let mut names = first_column(&rows);
    if let Some(max) = max_items {
        if names.len() > max {
            info!("Limiting run to the first {} of {} properties", max, names.len());
            names.truncate(max);
        }
    }
    info!("Found {} properties to process", names.len());
    Ok(names)
}

fn progress_bar(len: usize, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}") {
        bar.set_style(style);
    }
    bar
}

fn write_output<G: SheetGateway + ?Sized>(gateway: &G, range: &A1Range, rows: &[Row]) -> Result<WriteSummary> {
    let summary = gateway
        .write_range(range, rows)
        .with_context(|| format!("Failed to write results to {}", range))?;
    info!(
        "Wrote {} rows to {} ({})",
        rows.len().saturating_sub(1),
        range,
        gateway.name()
    );
    Ok(summary)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub processed: usize,
    pub resolved: usize,
    pub not_found: usize,
    pub fetch_failed: usize,
    /// Rows with a first sold-out date, including ones listed again since.
    pub sold_out: usize,
    /// Rows whose latest flags still mark an ad as sold out.
    pub currently_sold_out: usize,
    pub newly_sold_out: usize,
    pub written: WriteSummary,
}

pub fn sync_header() -> Row {
    std::iter::once(BUILDING_ID_HEADER)
        .chain(ReconciledRow::HEADER)
        .map(str::to_string)
        .collect()
}

/// Looks up every property, reconciles it with the previous run's row and
/// writes the building id plus reconciled fields back, one row per input.
pub fn run_sync<P, G>(provider: &P, gateway: &G, options: &RunOptions, today: NaiveDate) -> Result<SyncReport>
where
    P: ListingProvider,
    G: SheetGateway + ?Sized,
{
    let input_range = parse_range(&options.input_range, "input")?;
    let state_range = parse_range(&options.state_range, "state")?;
    let output_range = parse_range(&options.output_range, "output")?;

    let names = load_property_names(gateway, &input_range, options.max_items)?;

    let prior_rows = gateway
        .read_range(&state_range)
        .with_context(|| format!("Failed to read previous results from {}", state_range))?;
    let prior = PriorState::from_rows(&prior_rows);
    info!("Loaded {} previously recorded buildings", prior.len());

    let mut report = SyncReport::default();
    let mut rows = vec![sync_header()];
    let bar = progress_bar(names.len(), options.show_progress);

    for (index, name) in names.iter().enumerate() {
        bar.set_message(name.clone());
        let known = if options.reuse_ids { prior.id_at(index) } else { None };
        let outcome = lookup(provider, name, known, &bar);
        report.processed += 1;

        let row = match &outcome {
            Lookup::NotFound => {
                report.not_found += 1;
                vec![String::new(); ReconciledRow::HEADER.len() + 1]
            }
            Lookup::FetchFailed(id) | Lookup::Fetched(id, _) => {
                report.resolved += 1;
                if outcome.ad_info().is_none() {
                    report.fetch_failed += 1;
                }
                let previous = prior.get(id);
                let merged = reconcile(outcome.ad_info(), previous, today);
                if merged.is_sold_out() {
                    report.currently_sold_out += 1;
                }

                if !merged.first_sold_out_date.is_empty() {
                    report.sold_out += 1;
                    if previous.map_or(true, |row| row.first_sold_out_date.is_empty()) {
                        report.newly_sold_out += 1;
                        bar.suspend(|| info!("{} ({}) first seen sold out", name, id));
                    }
                }
                debug!("[{}/{}] {} -> {} {:?}", index + 1, names.len(), name, id, merged);

                let mut row = vec![id.to_string()];
                row.extend(merged.to_cells());
                row
            }
        };
        rows.push(row);
        bar.inc(1);
    }
    bar.finish_and_clear();

    report.written = write_output(gateway, &output_range, &rows)?;
    Ok(report)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildingIdReport {
    pub processed: usize,
    pub resolved: usize,
    pub written: WriteSummary,
}

/// Writes each property name next to its building id.
pub fn run_building_ids<P, G>(provider: &P, gateway: &G, options: &RunOptions) -> Result<BuildingIdReport>
where
    P: ListingProvider,
    G: SheetGateway + ?Sized,
{
    let input_range = parse_range(&options.input_range, "input")?;
    let output_range = parse_range(&options.output_range, "output")?;
    let names = load_property_names(gateway, &input_range, options.max_items)?;

    let mut report = BuildingIdReport::default();
    let mut rows = vec![vec![PROPERTY_NAME_HEADER.to_string(), BUILDING_ID_HEADER.to_string()]];
    let bar = progress_bar(names.len(), options.show_progress);

    for name in &names {
        bar.set_message(name.clone());
        let building_id = resolve(provider, name, &bar);
        report.processed += 1;
        if building_id.is_some() {
            report.resolved += 1;
        }
        rows.push(vec![
            name.clone(),
            building_id.map(|id| id.to_string()).unwrap_or_default(),
        ]);
        bar.inc(1);
    }
    bar.finish_and_clear();

    report.written = write_output(gateway, &output_range, &rows)?;
    Ok(report)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdLinkReport {
    pub processed: usize,
    pub with_link: usize,
    pub written: WriteSummary,
}

/// Writes the first listed advertisement (pure, then L, then Yahoo) of each property.
pub fn run_ad_links<P, G>(
    provider: &P,
    gateway: &G,
    options: &RunOptions,
    fetched_at: NaiveDateTime,
) -> Result<AdLinkReport>
where
    P: ListingProvider,
    G: SheetGateway + ?Sized,
{
    let input_range = parse_range(&options.input_range, "input")?;
    let output_range = parse_range(&options.output_range, "output")?;
    let names = load_property_names(gateway, &input_range, options.max_items)?;
    let timestamp = fetched_at.format(FETCHED_AT_FORMAT).to_string();

    let mut report = AdLinkReport::default();
    let mut rows = vec![["物件名", "Building ID", "URL", "広告タイプ", "取得日時"]
        .map(str::to_string)
        .to_vec()];
    let bar = progress_bar(names.len(), options.show_progress);

    for name in &names {
        bar.set_message(name.clone());
        let outcome = lookup(provider, name, None, &bar);
        report.processed += 1;

        let (url, kind) = match outcome.ad_info().and_then(AdInfo::first_active) {
            Some((kind, slot)) => {
                report.with_link += 1;
                (slot.url.clone(), kind.label().to_string())
            }
            None => (String::new(), String::new()),
        };
        debug!("{} -> {:?} {}", name, outcome.building_id(), url);

        rows.push(vec![
            name.clone(),
            outcome.building_id().map(|id| id.to_string()).unwrap_or_default(),
            url,
            kind,
            timestamp.clone(),
        ]);
        bar.inc(1);
    }
    bar.finish_and_clear();

    report.written = write_output(gateway, &output_range, &rows)?;
    Ok(report)
}
