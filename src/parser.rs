//! Typed parse of the provider's `ajaxJson` document.
//!
//! The response is loosely shaped: slots may be missing, `null`, an empty
//! array, or an object. Only objects are read; anything else counts as an
//! absent slot.

use crate::links;
use crate::models::{AdInfo, AdSlot, BuildingId};
use anyhow::{bail, Result};
use serde_json::{Map, Value};

type Object = Map<String, Value>;

/// Where a Yahoo advertisement can appear under `result`, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YahooSource {
    YNew,
    A,
    Root,
}

impl YahooSource {
    pub const PRIORITY: [YahooSource; 3] = [YahooSource::YNew, YahooSource::A, YahooSource::Root];

    fn locate<'a>(&self, result: &'a Object) -> Option<&'a Object> {
        match self {
            YahooSource::YNew => object_at(result, "ynew"),
            YahooSource::A => object_at(result, "a"),
            YahooSource::Root => Some(result),
        }
    }
}

/// Ad info as the provider reports it, before link building.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawAdInfo {
    pub p: AdSlot,
    pub l_project_cd: String,
    pub l_sold_flag: String,
    pub y: AdSlot,
    pub entry_id: String,
}

impl RawAdInfo {
    /// Builds the final slots, synthesising the L link with `l_campaign` and
    /// tagging Yahoo detail links.
    pub fn into_ad_info(self, l_campaign: &str) -> AdInfo {
        AdInfo {
            p: self.p,
            l: AdSlot::new(links::l_ad_url(&self.l_project_cd, l_campaign), self.l_sold_flag),
            y: AdSlot::new(links::with_yahoo_tracking(&self.y.url), self.y.sold_flag),
            entry_id: self.entry_id,
        }
    }
}

/// Parses an `ajaxJson` document. Prefers the `result` object and falls back
/// to the document root for responses that have no `result` wrapper.
pub fn parse_ad_json(document: &Value) -> Result<RawAdInfo> {
    let result = match document.get("result") {
        Some(Value::Object(result)) => result,
        Some(other) => bail!("ad info `result` is not an object: {}", kind_of(other)),
        None => match document {
            Value::Object(root) => root,
            other => bail!("ad info document is not an object: {}", kind_of(other)),
        },
    };

    let p = object_at(result, "p")
        .map(|p| AdSlot::new(scalar(p, "dtlurl"), scalar(p, "sold_flag")))
        .unwrap_or_default();

    let (l_project_cd, l_sold_flag) = object_at(result, "l")
        .map(|l| (scalar(l, "project_cd"), scalar(l, "sold_flag")))
        .unwrap_or_default();

    Ok(RawAdInfo {
        p,
        l_project_cd,
        l_sold_flag,
        y: yahoo_slot(result),
        entry_id: scalar(result, "entry_id"),
    })
}

/// URL and flag are each the first non-empty value in priority order, so they
/// may come from different sources.
fn yahoo_slot(result: &Object) -> AdSlot {
    let first_non_empty = |key: &str| {
        YahooSource::PRIORITY
            .iter()
            .filter_map(|source| source.locate(result))
            .map(|object| scalar(object, key))
            .find(|value| !value.is_empty())
            .unwrap_or_default()
    };
    AdSlot::new(first_non_empty("dtlurl"), first_non_empty("sold_flag"))
}

/// Parses the search endpoint response: the first building's id wins.
pub fn parse_search_json(document: &Value) -> Option<BuildingId> {
    let first = document.get("building")?.as_array()?.first()?;
    BuildingId::new(coerce(first.get("buildingid")?))
}

fn object_at<'a>(object: &'a Object, key: &str) -> Option<&'a Object> {
    object.get(key).and_then(Value::as_object)
}

fn scalar(object: &Object, key: &str) -> String {
    object.get(key).map(coerce).unwrap_or_default()
}

/// String form of a JSON scalar. `null` and containers become empty.
pub fn coerce(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::links::ALLIANCE_CAMPAIGN;
    use serde_json::json;

    #[test]
    fn reads_pure_slot_verbatim() {
        let doc = json!({"result": {"p": {"dtlurl": "http://a", "sold_flag": 0}}});
        let raw = parse_ad_json(&doc).unwrap();
        assert_eq!(raw.p, AdSlot::new("http://a", "0"));
        assert_eq!(raw.y, AdSlot::default());
    }

    #[test]
    fn null_values_become_empty_not_none() {
        let doc = json!({"result": {"p": {"dtlurl": null, "sold_flag": null}}});
        let raw = parse_ad_json(&doc).unwrap();
        assert_eq!(raw.p.url, "");
        assert_eq!(raw.p.sold_flag, "");
    }

    #[test]
    fn non_object_slots_are_absent() {
        let doc = json!({"result": {"p": [], "l": false, "ynew": "x"}});
        let raw = parse_ad_json(&doc).unwrap();
        assert_eq!(raw, RawAdInfo::default());
    }

    #[test]
    fn l_slot_builds_homes_link() {
        let doc = json!({"result": {"l": {"project_cd": 98765, "sold_flag": "1"}}});
        let info = parse_ad_json(&doc).unwrap().into_ad_info(ALLIANCE_CAMPAIGN);
        assert!(info.l.url.starts_with("https://www.homes.co.jp/mansion/b-98765/?"));
        assert_eq!(info.l.sold_flag, "1");
    }

    #[test]
    fn l_slot_without_project_code_has_no_url() {
        let doc = json!({"result": {"l": {"sold_flag": "0"}}});
        let info = parse_ad_json(&doc).unwrap().into_ad_info(ALLIANCE_CAMPAIGN);
        assert_eq!(info.l, AdSlot::new("", "0"));
    }

    #[test]
    fn yahoo_prefers_ynew_over_a_and_root() {
        let doc = json!({"result": {
            "ynew": {"dtlurl": "http://ynew", "sold_flag": "0"},
            "a": {"dtlurl": "http://a", "sold_flag": "1"},
            "dtlurl": "http://root"
        }});
        let raw = parse_ad_json(&doc).unwrap();
        assert_eq!(raw.y, AdSlot::new("http://ynew", "0"));
    }

    #[test]
    fn yahoo_a_beats_root() {
        let doc = json!({"result": {
            "a": {"dtlurl": "http://a"},
            "dtlurl": "http://root"
        }});
        assert_eq!(parse_ad_json(&doc).unwrap().y.url, "http://a");
    }

    #[test]
    fn yahoo_flag_is_resolved_independently_of_url() {
        let doc = json!({"result": {
            "ynew": {"dtlurl": "", "sold_flag": "1"},
            "a": {"dtlurl": "http://a"},
        }});
        let raw = parse_ad_json(&doc).unwrap();
        assert_eq!(raw.y, AdSlot::new("http://a", "1"));
    }

    #[test]
    fn yahoo_root_fallback_and_tracking() {
        let doc = json!({"result": {
            "dtlurl": "https://realestate.yahoo.co.jp/new/mansion/dtl/00001/",
            "sold_flag": 0
        }});
        let info = parse_ad_json(&doc).unwrap().into_ad_info(ALLIANCE_CAMPAIGN);
        assert_eq!(
            info.y.url,
            "https://realestate.yahoo.co.jp/new/mansion/dtl/00001/?sc_out=mikle_mansion_official"
        );
        assert_eq!(info.y.sold_flag, "0");
    }

    #[test]
    fn document_without_result_uses_root() {
        let doc = json!({"p": {"dtlurl": "http://a", "sold_flag": "1"}, "entry_id": 77});
        let raw = parse_ad_json(&doc).unwrap();
        assert_eq!(raw.p, AdSlot::new("http://a", "1"));
        assert_eq!(raw.entry_id, "77");
    }

    #[test]
    fn non_object_result_is_an_error() {
        assert!(parse_ad_json(&json!({"result": []})).is_err());
        assert!(parse_ad_json(&json!([1, 2])).is_err());
    }

    #[test]
    fn search_takes_first_building() {
        let doc = json!({"building": [{"buildingid": 123}, {"buildingid": 456}]});
        assert_eq!(parse_search_json(&doc).unwrap().as_str(), "123");
    }

    #[test]
    fn search_with_no_buildings_is_not_found() {
        assert_eq!(parse_search_json(&json!({"building": []})), None);
        assert_eq!(parse_search_json(&json!({})), None);
        assert_eq!(parse_search_json(&json!({"building": [{"buildingid": ""}]})), None);
    }
}
