use std::fmt;

/// Flag value the provider uses for an advertisement that is currently listed.
pub const ON_SALE_FLAG: &str = "0";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildingId(String);

impl BuildingId {
    /// Returns `None` for blank input so an empty cell never becomes an id.
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(BuildingId(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdKind {
    Pure,
    L,
    Yahoo,
}

impl AdKind {
    pub const PRIORITY: [AdKind; 3] = [AdKind::Pure, AdKind::L, AdKind::Yahoo];

    /// Label written to the ad type column.
    pub fn label(&self) -> &'static str {
        match self {
            AdKind::Pure => "pure",
            AdKind::L => "L",
            AdKind::Yahoo => "Y",
        }
    }
}

/// One advertisement channel. Empty strings mean the provider had nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdSlot {
    pub url: String,
    pub sold_flag: String,
}

impl AdSlot {
    pub fn new(url: impl Into<String>, sold_flag: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            sold_flag: sold_flag.into(),
        }
    }

    pub fn is_on_sale(&self) -> bool {
        self.sold_flag == ON_SALE_FLAG
    }
}

/// Whether a url/flag pair counts as an observed sold-out advertisement.
pub fn is_sold_out(url: &str, sold_flag: &str) -> bool {
    !url.is_empty() && !sold_flag.is_empty() && sold_flag != ON_SALE_FLAG
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdInfo {
    pub p: AdSlot,
    pub l: AdSlot,
    pub y: AdSlot,
    pub entry_id: String,
}

impl AdInfo {
    pub fn slot(&self, kind: AdKind) -> &AdSlot {
        match kind {
            AdKind::Pure => &self.p,
            AdKind::L => &self.l,
            AdKind::Yahoo => &self.y,
        }
    }

    /// First listed advertisement with a usable URL, in P > L > Y order.
    pub fn first_active(&self) -> Option<(AdKind, &AdSlot)> {
        AdKind::PRIORITY
            .into_iter()
            .map(|kind| (kind, self.slot(kind)))
            .find(|(_, slot)| slot.is_on_sale() && !slot.url.is_empty())
    }
}

/// The persisted per-building record, one spreadsheet row after the building id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciledRow {
    pub p_url: String,
    pub p_flag: String,
    pub l_url: String,
    pub l_flag: String,
    pub y_url: String,
    pub y_flag: String,
    pub first_sold_out_date: String,
    pub entry_id: String,
}

impl ReconciledRow {
    pub const HEADER: [&'static str; 8] = [
        "p_dtlurl",
        "p_sold_flag",
        "l_url",
        "l_sold_flag",
        "y_dtlurl",
        "y_sold_flag",
        "first_sold_out_date",
        "entry_id",
    ];

    pub fn from_cells(cells: &[String]) -> Self {
        let cell = |i: usize| cells.get(i).cloned().unwrap_or_default();
        Self {
            p_url: cell(0),
            p_flag: cell(1),
            l_url: cell(2),
            l_flag: cell(3),
            y_url: cell(4),
            y_flag: cell(5),
            first_sold_out_date: cell(6),
            entry_id: cell(7),
        }
    }

    pub fn to_cells(&self) -> Vec<String> {
        vec![
            self.p_url.clone(),
            self.p_flag.clone(),
            self.l_url.clone(),
            self.l_flag.clone(),
            self.y_url.clone(),
            self.y_flag.clone(),
            self.first_sold_out_date.clone(),
            self.entry_id.clone(),
        ]
    }

    pub fn is_sold_out(&self) -> bool {
        is_sold_out(&self.p_url, &self.p_flag)
            || is_sold_out(&self.l_url, &self.l_flag)
            || is_sold_out(&self.y_url, &self.y_flag)
    }
}
