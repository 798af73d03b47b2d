//! Rendering of result pages for stdout

use chrono::{DateTime, Utc};

use crate::data::ItemDetail;

/// Renders a page as a pretty-printed JSON array
pub fn render_json(items: &[ItemDetail]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(items)
}

/// Renders a page as a plain text table, ages measured against `now`
pub fn render_table(items: &[ItemDetail], now: DateTime<Utc>) -> String {
    if items.is_empty() {
        return "No stories found.\n".to_string();
    }

    let mut out = String::new();
    for item in items {
        let title = item.title.as_deref().unwrap_or("(untitled)");
        let host = item.url.as_deref().map(host_of).unwrap_or_default();
        let age = item
            .published_at()
            .map(|published| format_age(published, now))
            .unwrap_or_else(|| "-".to_string());
        let score = item.score.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
        out.push_str(&format!("{:>10}  {:>5}  {:>4}  {} ({})\n", item.id, score, age, title, host));
    }

    let total = items.first().and_then(|item| item.total_records).unwrap_or(items.len());
    out.push_str(&format!("\n{} of {} matching stories\n", items.len(), total));
    out
}

/// Host part of a URL, without scheme, port or path
fn host_of(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    let host = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    host.split(':').next().unwrap_or(host)
}

/// Compact age such as "42s", "5m", "3h" or "2d"
fn format_age(published: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(published);
    if elapsed.num_days() > 0 {
        format!("{}d", elapsed.num_days())
    } else if elapsed.num_hours() > 0 {
        format!("{}h", elapsed.num_hours())
    } else if elapsed.num_minutes() > 0 {
        format!("{}m", elapsed.num_minutes())
    } else {
        format!("{}s", elapsed.num_seconds().max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ItemId;
    use chrono::Duration;

    fn item(id: u64, title: &str, url: &str, time: i64) -> ItemDetail {
        let mut item = ItemDetail::placeholder(ItemId(id));
        item.title = Some(title.to_string());
        item.url = Some(url.to_string());
        item.time = Some(time);
        item.score = Some(100);
        item.total_records = Some(7);
        item
    }

    #[test]
    fn test_host_of() {
        assert_eq!(host_of("https://www.example.com/a/b?c=d"), "www.example.com");
        assert_eq!(host_of("http://user@example.org:8080/x"), "example.org");
        assert_eq!(host_of("example.net/path"), "example.net");
    }

    #[test]
    fn test_format_age() {
        let now = Utc::now();
        assert_eq!(format_age(now - Duration::seconds(42), now), "42s");
        assert_eq!(format_age(now - Duration::minutes(5), now), "5m");
        assert_eq!(format_age(now - Duration::hours(3), now), "3h");
        assert_eq!(format_age(now - Duration::days(2), now), "2d");
        assert_eq!(format_age(now + Duration::seconds(10), now), "0s");
    }

    #[test]
    fn test_render_table_lists_rows_and_total() {
        let now = DateTime::from_timestamp(1_700_003_600, 0).unwrap();
        let items = vec![item(8863, "Dropbox", "https://getdropbox.com/u/2", 1_700_000_000)];

        let table = render_table(&items, now);

        assert!(table.contains("8863"));
        assert!(table.contains("Dropbox (getdropbox.com)"));
        assert!(table.contains("1h"));
        assert!(table.contains("1 of 7 matching stories"));
    }

    #[test]
    fn test_render_table_empty() {
        assert_eq!(render_table(&[], Utc::now()), "No stories found.\n");
    }

    #[test]
    fn test_render_json_includes_total_records() {
        let items = vec![item(1, "One", "https://one.example", 0)];
        let json = render_json(&items).unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["totalRecords"], 7);
        assert_eq!(value[0]["title"], "One");
    }
}
