use anyhow::{bail, Context, Result};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

pub const DEFAULT_SHEET: &str = "Sheet1";

/// An A1-notation range such as `新着物件!L2:T`, `'My Sheet'!A1` or `B2:B10`.
///
/// Coordinates are zero-based. `end_col`/`end_row` of `None` mean the range
/// extends to the edge of the sheet in that direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Range {
    pub sheet: Option<String>,
    pub start_col: usize,
    pub start_row: usize,
    pub end_col: Option<usize>,
    pub end_row: Option<usize>,
}

fn cell_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z]{1,3})(\d+)(?::([A-Za-z]{1,3})(\d+)?)?$").expect("valid A1 regex")
    })
}

impl A1Range {
    pub fn sheet_name(&self) -> &str {
        self.sheet.as_deref().unwrap_or(DEFAULT_SHEET)
    }

    /// Number of columns the range spans, if bounded.
    pub fn width(&self) -> Option<usize> {
        self.end_col.map(|end| end + 1 - self.start_col)
    }

    /// Number of rows the range spans, if bounded.
    pub fn height(&self) -> Option<usize> {
        self.end_row.map(|end| end + 1 - self.start_row)
    }
}

impl FromStr for A1Range {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (sheet, cells) = match s.rfind('!') {
            Some(bang) => (Some(parse_sheet_name(&s[..bang])?), &s[bang + 1..]),
            None => (None, s),
        };

        let caps = cell_regex()
            .captures(cells)
            .with_context(|| format!("Invalid A1 range: {}", s))?;

        let start_col = column_index(&caps[1]);
        let start_row = row_index(&caps[2]).with_context(|| format!("Invalid A1 range: {}", s))?;

        let (end_col, end_row) = match caps.get(3) {
            Some(col) => {
                let end_row = match caps.get(4) {
                    Some(row) => Some(row_index(row.as_str()).with_context(|| format!("Invalid A1 range: {}", s))?),
                    None => None,
                };
                (Some(column_index(col.as_str())), end_row)
            }
            // A single cell anchors a write that may extend right and down.
            None => (None, None),
        };

        if let Some(end_col) = end_col {
            if end_col < start_col {
                bail!("Range ends before it starts: {}", s);
            }
        }
        if let Some(end_row) = end_row {
            if end_row < start_row {
                bail!("Range ends before it starts: {}", s);
            }
        }

        Ok(A1Range {
            sheet,
            start_col,
            start_row,
            end_col,
            end_row,
        })
    }
}

impl fmt::Display for A1Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sheet) = &self.sheet {
            if sheet.chars().all(|c| c.is_alphanumeric() || c == '_') {
                write!(f, "{}!", sheet)?;
            } else {
                write!(f, "'{}'!", sheet.replace('\'', "''"))?;
            }
        }
        write!(f, "{}{}", column_name(self.start_col), self.start_row + 1)?;
        if let Some(end_col) = self.end_col {
            write!(f, ":{}", column_name(end_col))?;
            if let Some(end_row) = self.end_row {
                write!(f, "{}", end_row + 1)?;
            }
        }
        Ok(())
    }
}

fn parse_sheet_name(raw: &str) -> Result<String> {
    let name = match raw.strip_prefix('\'') {
        Some(quoted) => quoted
            .strip_suffix('\'')
            .with_context(|| format!("Unterminated quoted sheet name: {}", raw))?
            .replace("''", "'"),
        None => raw.to_string(),
    };
    if name.is_empty() {
        bail!("Empty sheet name in range");
    }
    Ok(name)
}

/// `A` → 0, `Z` → 25, `AA` → 26.
pub fn column_index(letters: &str) -> usize {
    letters
        .chars()
        .map(|c| (c.to_ascii_uppercase() as u8 - b'A') as usize + 1)
        .fold(0, |acc, digit| acc * 26 + digit)
        - 1
}

pub fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

fn row_index(digits: &str) -> Result<usize> {
    let row: usize = digits.parse().context("Row number out of range")?;
    if row == 0 {
        bail!("Row numbers start at 1");
    }
    Ok(row - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_unbounded_column_range() {
        let range: A1Range = "新着物件!L2:T".parse().unwrap();
        assert_eq!(range.sheet.as_deref(), Some("新着物件"));
        assert_eq!(range.start_col, 11);
        assert_eq!(range.start_row, 1);
        assert_eq!(range.end_col, Some(19));
        assert_eq!(range.end_row, None);
        assert_eq!(range.width(), Some(9));
        assert_eq!(range.height(), None);
    }

    #[test]
    fn parses_anchor_and_bounded_range() {
        let anchor: A1Range = "Sheet2!A1".parse().unwrap();
        assert_eq!((anchor.start_col, anchor.start_row), (0, 0));
        assert_eq!((anchor.end_col, anchor.end_row), (None, None));

        let bounded: A1Range = "B2:C10".parse().unwrap();
        assert_eq!(bounded.sheet, None);
        assert_eq!(bounded.sheet_name(), DEFAULT_SHEET);
        assert_eq!(bounded.height(), Some(9));
    }

    #[test]
    fn parses_quoted_sheet_names() {
        let range: A1Range = "'Bob''s list'!A1:A".parse().unwrap();
        assert_eq!(range.sheet.as_deref(), Some("Bob's list"));
        assert_eq!(range.to_string(), "'Bob''s list'!A1:A");
    }

    #[test]
    fn display_round_trips() {
        for text in ["新着物件!L2:T", "Sheet1!A1", "AA10:AB20"] {
            assert_eq!(text.parse::<A1Range>().unwrap().to_string(), text);
        }
    }

    #[test]
    fn rejects_bad_ranges() {
        assert!("".parse::<A1Range>().is_err());
        assert!("Sheet1!".parse::<A1Range>().is_err());
        assert!("A0".parse::<A1Range>().is_err());
        assert!("C1:A1".parse::<A1Range>().is_err());
        assert!("A5:A2".parse::<A1Range>().is_err());
        assert!("!A1".parse::<A1Range>().is_err());
    }

    #[test]
    fn column_names_and_indices_agree() {
        assert_eq!(column_index("A"), 0);
        assert_eq!(column_index("z"), 25);
        assert_eq!(column_index("AA"), 26);
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(701), "ZZ");
        assert_eq!(column_name(702), "AAA");
    }
}
