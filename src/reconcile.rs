//! Merges freshly fetched ad info with the row a previous run wrote.
//!
//! URLs and the entry id are sticky: a blank new value keeps the previous one.
//! Flags are not: they always reflect the latest fetch, and a failed fetch
//! blanks them. The first sold-out date is written once and then carried
//! forever.

use crate::models::{is_sold_out, AdInfo, AdSlot, BuildingId, ReconciledRow};
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::debug;

pub const DATE_FORMAT: &str = "%Y/%m/%d";

/// Rows written by the previous run, keyed by building id. Read-only once built.
#[derive(Debug, Default, Clone)]
pub struct PriorState {
    rows: HashMap<BuildingId, ReconciledRow>,
    positions: Vec<Option<BuildingId>>,
}

impl PriorState {
    /// Builds the table from state range rows: building id first, then the
    /// reconciled fields. Rows with a blank id are skipped and the first row
    /// for a duplicated id wins.
    pub fn from_rows(rows: &[Vec<String>]) -> Self {
        let mut state = PriorState::default();
        for row in rows {
            let id = row.first().and_then(BuildingId::new);
            if let Some(id) = &id {
                if state.rows.contains_key(id) {
                    debug!("Duplicate building id {} in prior state, keeping first row", id);
                } else {
                    let fields = row.get(1..).unwrap_or_default();
                    state.rows.insert(id.clone(), ReconciledRow::from_cells(fields));
                }
            }
            state.positions.push(id);
        }
        state
    }

    pub fn get(&self, id: &BuildingId) -> Option<&ReconciledRow> {
        self.rows.get(id)
    }

    /// The building id recorded at a row position by the previous run.
    pub fn id_at(&self, index: usize) -> Option<&BuildingId> {
        self.positions.get(index).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn sticky(new: &str, previous: &str) -> String {
    if new.is_empty() {
        previous.to_string()
    } else {
        new.to_string()
    }
}

/// Returns the merged url, the latest flag, and whether the pair reads as sold out.
fn merge_slot(new: Option<&AdSlot>, previous_url: &str) -> (String, String, bool) {
    let url = sticky(new.map_or("", |slot| slot.url.as_str()), previous_url);
    let flag = new.map(|slot| slot.sold_flag.clone()).unwrap_or_default();
    let sold_out = is_sold_out(&url, &flag);
    (url, flag, sold_out)
}

/// Reconciles one building. `fetched` is `None` when the ad info fetch failed,
/// `previous` is `None` for a building that was never written before.
pub fn reconcile(
    fetched: Option<&AdInfo>,
    previous: Option<&ReconciledRow>,
    today: NaiveDate,
) -> ReconciledRow {
    let empty = ReconciledRow::default();
    let previous = previous.unwrap_or(&empty);

    let (p_url, p_flag, p_sold) = merge_slot(fetched.map(|info| &info.p), &previous.p_url);
    let (l_url, l_flag, l_sold) = merge_slot(fetched.map(|info| &info.l), &previous.l_url);
    let (y_url, y_flag, y_sold) = merge_slot(fetched.map(|info| &info.y), &previous.y_url);

    let first_sold_out_date = if !previous.first_sold_out_date.is_empty() {
        previous.first_sold_out_date.clone()
    } else if p_sold || l_sold || y_sold {
        today.format(DATE_FORMAT).to_string()
    } else {
        String::new()
    };

    let entry_id = sticky(
        fetched.map_or("", |info| info.entry_id.as_str()),
        &previous.entry_id,
    );

    ReconciledRow {
        p_url,
        p_flag,
        l_url,
        l_flag,
        y_url,
        y_flag,
        first_sold_out_date,
        entry_id,
    }
}
