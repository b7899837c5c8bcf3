//! Flat request descriptor sent to the remote list API.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::descriptor::ViewSpec;
use crate::filter_set::ListState;

/// Request fields owned by the envelope; filters may not use them as wire names.
pub const RESERVED_WIRE_NAMES: [&str; 4] = ["is_list", "limit", "offset", "sort"];

/// Value of one filter field on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum WireValue {
    /// String value (text, choice, date, reference id).
    Text(String),
    /// Integer value.
    Number(u64),
    /// Boolean value.
    Flag(bool),
    /// Multi-valued field.
    List(Vec<String>),
}

impl WireValue {
    /// Query-string renditions of this value; lists repeat the field.
    #[must_use]
    pub fn to_params(&self) -> Vec<String> {
        match self {
            Self::Text(text) => vec![text.clone()],
            Self::Number(number) => vec![number.to_string()],
            Self::Flag(flag) => vec![flag.to_string()],
            Self::List(values) => values.clone(),
        }
    }
}

/// Request for one page of a list view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ListRequest {
    /// Always `true`; marks a paginated list call.
    pub is_list: bool,
    /// Page size.
    pub limit: u32,
    /// `page_index * page_size`.
    pub offset: u64,
    /// Active filters by wire name.
    #[serde(flatten)]
    pub filters: BTreeMap<String, WireValue>,
    /// Prefixed sort fields; omitted when unsorted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<String>>,
}

impl ListRequest {
    /// Build the request for `state` on `view`.
    #[must_use]
    pub fn build(view: &ViewSpec, state: &ListState) -> Self {
        let mut filters = BTreeMap::new();
        for descriptor in view.filters() {
            if let Some(value) = state.filters.get(descriptor.key()) {
                filters.extend(descriptor.wire_entries(value));
            }
        }
        Self {
            is_list: true,
            limit: state.pagination.page_size,
            offset: state.pagination.offset(),
            filters,
            sort: (!state.sort.is_empty()).then(|| state.sort.to_params()),
        }
    }

    /// Query-string pairs for transports that send the request as GET params.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("is_list".to_string(), self.is_list.to_string()),
            ("limit".to_string(), self.limit.to_string()),
            ("offset".to_string(), self.offset.to_string()),
        ];
        for (name, value) in &self.filters {
            pairs.extend(value.to_params().into_iter().map(|param| (name.clone(), param)));
        }
        if let Some(sort) = &self.sort {
            pairs.extend(sort.iter().map(|field| ("sort".to_string(), field.clone())));
        }
        pairs
    }

    /// Wire value sent for `name`, if any.
    #[must_use]
    pub fn filter(&self, name: &str) -> Option<&WireValue> {
        self.filters.get(name)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::descriptor::FilterDescriptor;
    use crate::directory::Directories;
    use crate::filter_set::decode_state;
    use crate::query::Query;

    fn payments() -> ViewSpec {
        ViewSpec::builder("payments")
            .page_size(25)
            .filter(FilterDescriptor::text("search"))
            .filter(FilterDescriptor::choice("status", &["paid", "pending"]))
            .filter(FilterDescriptor::reference("user_id", "users").wire("user"))
            .filter(FilterDescriptor::flag("refunded").wire("is_refunded"))
            .filter(FilterDescriptor::many("classroom_ids"))
            .filter(
                FilterDescriptor::date_range("start_date", "end_date")
                    .wire("date_from")
                    .wire_end("date_to"),
            )
            .sortable(&["amount", "created_at"])
            .build()
            .expect("valid view")
    }

    #[test]
    fn request_uses_wire_names_and_offsets() {
        let view = payments();
        let url = Query::parse(
            "status=paid&user_id=7&refunded=false&classroom_ids=1&classroom_ids=2&start_date=2026-10-01&end_date=2026-10-31&page=2&sort=-amount",
        );
        let state = decode_state(&view, &url, &Directories::new());
        let request = ListRequest::build(&view, &state);

        assert_eq!(
            serde_json::to_value(&request).expect("serialise request"),
            json!({
                "is_list": true,
                "limit": 25,
                "offset": 50,
                "status": "paid",
                "user": "7",
                "is_refunded": false,
                "classroom_ids": ["1", "2"],
                "date_from": "2026-10-01",
                "date_to": "2026-10-31",
                "sort": ["-amount"],
            })
        );
    }

    #[test]
    fn absent_filters_and_empty_sort_are_omitted() {
        let view = payments();
        let state = decode_state(&view, &Query::parse("search="), &Directories::new());
        let request = ListRequest::build(&view, &state);
        assert!(request.filters.is_empty());
        assert!(request.sort.is_none());
        assert_eq!(
            serde_json::to_value(&request).expect("serialise request"),
            json!({ "is_list": true, "limit": 25, "offset": 0 })
        );
    }

    #[test]
    fn query_pairs_repeat_list_fields() {
        let view = payments();
        let state = decode_state(
            &view,
            &Query::parse("classroom_ids=3&classroom_ids=4&sort=amount&sort=-created_at"),
            &Directories::new(),
        );
        let pairs = ListRequest::build(&view, &state).query_pairs();
        let rendered: Vec<String> = pairs
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        assert_eq!(
            rendered,
            vec![
                "is_list=true",
                "limit=25",
                "offset=0",
                "classroom_ids=3",
                "classroom_ids=4",
                "sort=amount",
                "sort=-created_at",
            ]
        );
    }
}
