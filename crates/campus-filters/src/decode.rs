//! Total decoders from raw query values to typed filter values.
//!
//! Every decoder maps malformed input (wrong type, value outside a whitelist,
//! negative or non-numeric numbers, empty strings) to `None`; nothing in this
//! module can fail.

use chrono::NaiveDate;

use crate::filter_set::{DateRange, SortKey};

/// Wire format for calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Non-blank free text, returned verbatim.
#[must_use]
pub fn text(raw: Option<&str>) -> Option<String> {
    raw.filter(|value| !value.trim().is_empty())
        .map(str::to_string)
}

/// Value from a fixed whitelist.
#[must_use]
pub fn choice(raw: Option<&str>, allowed: &[String]) -> Option<String> {
    raw.filter(|value| allowed.iter().any(|candidate| candidate == value))
        .map(str::to_string)
}

/// Non-negative integer written with ASCII digits only.
#[must_use]
pub fn number(raw: Option<&str>) -> Option<u64> {
    let raw = raw?;
    if raw.is_empty() || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Zero-based page index.
#[must_use]
pub fn page(raw: Option<&str>) -> Option<u32> {
    number(raw).and_then(|value| u32::try_from(value).ok())
}

/// Boolean flag (`true`/`false`, `1`/`0`).
#[must_use]
pub fn flag(raw: Option<&str>) -> Option<bool> {
    match raw? {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Calendar date in `YYYY-MM-DD` form.
#[must_use]
pub fn date(raw: Option<&str>) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw?.trim(), DATE_FORMAT).ok()
}

/// Inclusive date range; both ends must parse and be ordered.
#[must_use]
pub fn date_range(from: Option<&str>, to: Option<&str>) -> Option<DateRange> {
    let from = date(from)?;
    let to = date(to)?;
    (from <= to).then_some(DateRange { from, to })
}

/// Identifier of a directory entry.
#[must_use]
pub fn reference_id(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Repeated values with blanks, duplicates and (when a whitelist is given)
/// unknown values dropped; an empty result is absent.
#[must_use]
pub fn many(values: &[&str], allowed: Option<&[String]>) -> Option<Vec<String>> {
    let mut kept: Vec<String> = Vec::new();
    for value in values {
        let value = value.trim();
        if value.is_empty() || kept.iter().any(|existing| existing == value) {
            continue;
        }
        if let Some(allowed) = allowed
            && !allowed.iter().any(|candidate| candidate == value)
        {
            continue;
        }
        kept.push(value.to_string());
    }
    (!kept.is_empty()).then_some(kept)
}

/// Sort entries (`field` ascending, `-field` descending) restricted to the
/// sortable columns; repeated columns keep their first occurrence.
#[must_use]
pub fn sort(values: &[&str], sortable: &[String]) -> Option<Vec<SortKey>> {
    let mut keys: Vec<SortKey> = Vec::new();
    for value in values {
        let value = value.trim();
        let (column, descending) = value
            .strip_prefix('-')
            .map_or((value, false), |column| (column, true));
        if !sortable.iter().any(|candidate| candidate == column)
            || keys.iter().any(|key| key.column_id == column)
        {
            continue;
        }
        keys.push(SortKey {
            column_id: column.to_string(),
            descending,
        });
    }
    (!keys.is_empty()).then_some(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_string()).collect()
    }

    #[test]
    fn text_rejects_blank_input() {
        assert_eq!(text(Some("smith")), Some("smith".to_string()));
        assert_eq!(text(Some("")), None);
        assert_eq!(text(Some("   ")), None);
        assert_eq!(text(None), None);
    }

    #[test]
    fn choice_enforces_whitelist() {
        let allowed = owned(&["active", "inactive"]);
        assert_eq!(choice(Some("active"), &allowed), Some("active".into()));
        assert_eq!(choice(Some("ACTIVE"), &allowed), None);
        assert_eq!(choice(Some(""), &allowed), None);
    }

    #[test]
    fn numbers_and_pages_reject_signs_and_garbage() {
        assert_eq!(number(Some("42")), Some(42));
        assert_eq!(number(Some("-1")), None);
        assert_eq!(number(Some("+1")), None);
        assert_eq!(number(Some("1.5")), None);
        assert_eq!(number(Some("")), None);
        assert_eq!(page(Some("2")), Some(2));
        assert_eq!(page(Some("99999999999")), None);
        assert_eq!(page(Some("abc")), None);
    }

    #[test]
    fn flags_accept_words_and_digits() {
        assert_eq!(flag(Some("true")), Some(true));
        assert_eq!(flag(Some("0")), Some(false));
        assert_eq!(flag(Some("yes")), None);
    }

    #[test]
    fn dates_and_ranges_validate_order() {
        let from = NaiveDate::from_ymd_opt(2026, 10, 1).expect("valid date");
        let to = NaiveDate::from_ymd_opt(2026, 10, 31).expect("valid date");
        assert_eq!(date(Some("2026-10-01")), Some(from));
        assert_eq!(date(Some("2026-13-01")), None);
        assert_eq!(
            date_range(Some("2026-10-01"), Some("2026-10-31")),
            Some(DateRange { from, to })
        );
        assert_eq!(date_range(Some("2026-10-31"), Some("2026-10-01")), None);
        assert_eq!(date_range(Some("2026-10-01"), None), None);
    }

    #[test]
    fn many_drops_empty_elements() {
        assert_eq!(
            many(&["1", "", "2"], None),
            Some(vec!["1".to_string(), "2".to_string()])
        );
        assert_eq!(many(&["", " "], None), None);
        assert_eq!(many(&[], None), None);
        assert_eq!(
            many(&["a", "b", "a"], Some(&owned(&["a"]))),
            Some(vec!["a".to_string()])
        );
    }

    #[test]
    fn sort_honours_prefix_and_whitelist() {
        let sortable = owned(&["name", "created_at"]);
        let keys = sort(&["-created_at", "name", "secret", "name"], &sortable)
            .expect("valid sort keys");
        assert_eq!(keys.len(), 2);
        assert!(keys[0].descending);
        assert_eq!(keys[0].column_id, "created_at");
        assert!(!keys[1].descending);
        assert_eq!(sort(&["-"], &sortable), None);
    }
}
