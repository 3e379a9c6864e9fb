const HOMES_BASE_URL: &str = "https://www.homes.co.jp/mansion";

/// Tracking query used for L links recorded by the ad sync.
pub const ALLIANCE_CAMPAIGN: &str = "cmp_id=001_08359_0009551273&utm_campaign=alliance_sumulab&utm_content=001_08359_0009551273&utm_medium=cpa&utm_source=sumulab&utm_term=";

/// Tracking query used for L links in the ad link report.
pub const V6_CAMPAIGN: &str = "cmp_id=001_08359_0008683659&utm_campaign=v6_sumulab&utm_content=001_08359_0008683659&utm_medium=cpa&utm_source=sumulab&utm_term=";

pub const YAHOO_DETAIL_PREFIX: &str = "https://realestate.yahoo.co.jp/";
pub const YAHOO_TRACKING_KEY: &str = "sc_out";
pub const YAHOO_TRACKING_VALUE: &str = "mikle_mansion_official";

/// Builds the HOMES detail link for an L project code. Blank codes give an empty URL.
pub fn l_ad_url(project_cd: &str, campaign: &str) -> String {
    let project_cd = project_cd.trim();
    if project_cd.is_empty() {
        return String::new();
    }
    format!("{}/b-{}/?{}", HOMES_BASE_URL, project_cd, campaign)
}

/// Appends the Yahoo tracking parameter to detail page URLs, ahead of any
/// `#fragment`. Other URLs, and URLs whose query already has an `sc_out` key
/// (whatever its value), are returned unchanged.
pub fn with_yahoo_tracking(url: &str) -> String {
    if !url.starts_with(YAHOO_DETAIL_PREFIX) {
        return url.to_string();
    }
    let (base, fragment) = match url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (url, None),
    };
    if has_query_key(base, YAHOO_TRACKING_KEY) {
        return url.to_string();
    }

    let separator = if base.contains('?') { '&' } else { '?' };
    let mut tracked = format!("{}{}{}={}", base, separator, YAHOO_TRACKING_KEY, YAHOO_TRACKING_VALUE);
    if let Some(fragment) = fragment {
        tracked.push('#');
        tracked.push_str(fragment);
    }
    tracked
}

fn has_query_key(url: &str, key: &str) -> bool {
    match url.split_once('?') {
        Some((_, query)) => query
            .split('&')
            .any(|pair| pair.split_once('=').map_or(pair, |(k, _)| k) == key),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l_url_embeds_project_code() {
        let url = l_ad_url("12345", ALLIANCE_CAMPAIGN);
        assert!(url.starts_with("https://www.homes.co.jp/mansion/b-12345/?cmp_id="));
        assert!(url.ends_with("utm_term="));
        assert_eq!(l_ad_url("  ", ALLIANCE_CAMPAIGN), "");
    }

    #[test]
    fn yahoo_tracking_uses_question_mark_without_query() {
        assert_eq!(
            with_yahoo_tracking("https://realestate.yahoo.co.jp/new/mansion/dtl/00001/"),
            "https://realestate.yahoo.co.jp/new/mansion/dtl/00001/?sc_out=mikle_mansion_official"
        );
    }

    #[test]
    fn yahoo_tracking_uses_ampersand_with_query() {
        assert_eq!(
            with_yahoo_tracking("https://realestate.yahoo.co.jp/new/mansion/dtl/00001/?x=1"),
            "https://realestate.yahoo.co.jp/new/mansion/dtl/00001/?x=1&sc_out=mikle_mansion_official"
        );
    }

    #[test]
    fn yahoo_tracking_is_idempotent() {
        let once = with_yahoo_tracking("https://realestate.yahoo.co.jp/new/mansion/dtl/00001/");
        assert_eq!(with_yahoo_tracking(&once), once);

        let with_query = with_yahoo_tracking("https://realestate.yahoo.co.jp/a/?x=1");
        assert_eq!(with_yahoo_tracking(&with_query), with_query);
    }

    #[test]
    fn yahoo_tracking_goes_before_the_fragment() {
        let url = with_yahoo_tracking("https://realestate.yahoo.co.jp/new/mansion/dtl/1/#map");
        assert_eq!(
            url,
            "https://realestate.yahoo.co.jp/new/mansion/dtl/1/?sc_out=mikle_mansion_official#map"
        );
        assert_eq!(with_yahoo_tracking(&url), url);

        assert_eq!(
            with_yahoo_tracking("https://realestate.yahoo.co.jp/new/mansion/dtl/1/?x=1#map"),
            "https://realestate.yahoo.co.jp/new/mansion/dtl/1/?x=1&sc_out=mikle_mansion_official#map"
        );
    }

    #[test]
    fn existing_sc_out_value_is_kept() {
        let url = "https://realestate.yahoo.co.jp/new/mansion/dtl/1/?sc_out=other";
        assert_eq!(with_yahoo_tracking(url), url);

        let url = "https://realestate.yahoo.co.jp/new/mansion/dtl/1/?x=1&sc_out";
        assert_eq!(with_yahoo_tracking(url), url);
    }

    #[test]
    fn similar_keys_do_not_count_as_tracking() {
        assert_eq!(
            with_yahoo_tracking("https://realestate.yahoo.co.jp/dtl/1/?sc_outer=1"),
            "https://realestate.yahoo.co.jp/dtl/1/?sc_outer=1&sc_out=mikle_mansion_official"
        );
    }

    #[test]
    fn other_hosts_are_left_alone() {
        assert_eq!(with_yahoo_tracking("https://example.com/dtl/"), "https://example.com/dtl/");
        assert_eq!(with_yahoo_tracking(""), "");
    }
}
