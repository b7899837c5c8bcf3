//! Declared list views of the admin console.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::descriptor::{FilterDescriptor, ViewSpec};
use crate::error::{FilterError, FilterResult};

/// Directory of user accounts.
pub const USERS_DIRECTORY: &str = "users";
/// Directory of schools.
pub const SCHOOLS_DIRECTORY: &str = "schools";
/// Directory of classrooms.
pub const CLASSROOMS_DIRECTORY: &str = "classrooms";

const ROLES: &[&str] = &["admin", "manager", "teacher", "student", "parent"];
const PAYMENT_STATUSES: &[&str] = &["pending", "paid", "failed", "refunded"];
const LOG_LEVELS: &[&str] = &["debug", "info", "warning", "error"];
const CONTACT_STATUSES: &[&str] = &["new", "in_progress", "resolved"];
const EXCUSE_STATUSES: &[&str] = &["pending", "approved", "rejected"];

/// Registry of list views keyed by list key.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    views: BTreeMap<String, Arc<ViewSpec>>,
}

impl Catalog {
    /// Empty catalog.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            views: BTreeMap::new(),
        }
    }

    /// The console's list pages.
    ///
    /// # Errors
    /// Returns a [`FilterError`] if any declaration is inconsistent.
    pub fn standard() -> FilterResult<Self> {
        let mut catalog = Self::new();
        for view in [
            users()?,
            payments()?,
            subjects()?,
            classrooms()?,
            logs()?,
            contact_items()?,
            teacher_excuses()?,
        ] {
            catalog.insert(view);
        }
        Ok(catalog)
    }

    /// Register or replace a view.
    pub fn insert(&mut self, view: ViewSpec) {
        self.views
            .insert(view.list_key().to_string(), Arc::new(view));
    }

    /// View declared under `list_key`.
    ///
    /// # Errors
    /// Returns [`FilterError::UnknownView`] when nothing is declared under `list_key`.
    pub fn get(&self, list_key: &str) -> FilterResult<Arc<ViewSpec>> {
        self.views
            .get(list_key)
            .cloned()
            .ok_or_else(|| FilterError::UnknownView {
                view: list_key.to_string(),
            })
    }

    /// Apply per-view page size overrides.
    ///
    /// # Errors
    /// Returns [`FilterError::UnknownView`] for an override naming no view and
    /// [`FilterError::InvalidPageSize`] for a zero size.
    pub fn with_page_sizes(mut self, sizes: &BTreeMap<String, u32>) -> FilterResult<Self> {
        for (list_key, page_size) in sizes {
            let view = self.get(list_key)?.with_page_size(*page_size)?;
            self.insert(view);
        }
        Ok(self)
    }

    /// Views in list-key order.
    pub fn views(&self) -> impl Iterator<Item = &Arc<ViewSpec>> {
        self.views.values()
    }

    /// Number of declared views.
    #[must_use]
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Whether no view is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

fn users() -> FilterResult<ViewSpec> {
    ViewSpec::builder("users")
        .filter(FilterDescriptor::text("search"))
        .filter(FilterDescriptor::choice("role", ROLES))
        .filter(FilterDescriptor::reference("school_id", SCHOOLS_DIRECTORY))
        .filter(FilterDescriptor::flag("active").wire("is_active"))
        .sortable(&["first_name", "last_name", "email", "created_at"])
        .build()
}

fn payments() -> FilterResult<ViewSpec> {
    ViewSpec::builder("payments")
        .filter(FilterDescriptor::text("search"))
        .filter(FilterDescriptor::choice("status", PAYMENT_STATUSES))
        .filter(FilterDescriptor::reference("user_id", USERS_DIRECTORY).wire("user"))
        .filter(
            FilterDescriptor::date_range("start_date", "end_date")
                .wire("date_from")
                .wire_end("date_to"),
        )
        .sortable(&["amount", "created_at"])
        .build()
}

fn subjects() -> FilterResult<ViewSpec> {
    ViewSpec::builder("subjects")
        .filter(FilterDescriptor::text("search"))
        .filter(FilterDescriptor::reference("school_id", SCHOOLS_DIRECTORY))
        .filter(FilterDescriptor::many("classroom_ids").wire("classrooms"))
        .sortable(&["name", "created_at"])
        .build()
}

fn classrooms() -> FilterResult<ViewSpec> {
    ViewSpec::builder("classrooms")
        .filter(FilterDescriptor::text("search"))
        .filter(FilterDescriptor::reference("school_id", SCHOOLS_DIRECTORY))
        .filter(FilterDescriptor::number("grade"))
        .sortable(&["name", "grade"])
        .build()
}

fn logs() -> FilterResult<ViewSpec> {
    ViewSpec::builder("logs")
        .page_size(50)
        .filter(FilterDescriptor::choice("level", LOG_LEVELS))
        .filter(FilterDescriptor::reference("user_id", USERS_DIRECTORY).wire("user"))
        .filter(
            FilterDescriptor::date_range("start_date", "end_date")
                .wire("date_from")
                .wire_end("date_to"),
        )
        .sortable(&["created_at"])
        .polling()
        .build()
}

fn contact_items() -> FilterResult<ViewSpec> {
    ViewSpec::builder("contact_items")
        .endpoint("/contact-items")
        .filter(FilterDescriptor::text("search"))
        .filter(FilterDescriptor::choice("status", CONTACT_STATUSES))
        .filter(FilterDescriptor::flag("unread").wire("is_read_false"))
        .sortable(&["created_at"])
        .polling()
        .build()
}

fn teacher_excuses() -> FilterResult<ViewSpec> {
    ViewSpec::builder("teacher_excuses")
        .endpoint("/teacher-excuses")
        .filter(FilterDescriptor::reference("teacher_id", USERS_DIRECTORY).wire("teacher"))
        .filter(FilterDescriptor::choice("status", EXCUSE_STATUSES))
        .filter(FilterDescriptor::date("date"))
        .filter(FilterDescriptor::many("classroom_ids").wire("classrooms"))
        .sortable(&["date", "created_at"])
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::DirectoryId;

    #[test]
    fn standard_catalog_declares_every_console_list() {
        let catalog = Catalog::standard().expect("standard views are consistent");
        let keys: Vec<&str> = catalog.views().map(|view| view.list_key()).collect();
        assert_eq!(
            keys,
            vec![
                "classrooms",
                "contact_items",
                "logs",
                "payments",
                "subjects",
                "teacher_excuses",
                "users"
            ]
        );
        let polling: Vec<&str> = catalog
            .views()
            .filter(|view| view.polls())
            .map(|view| view.list_key())
            .collect();
        assert_eq!(polling, vec!["contact_items", "logs"]);
    }

    #[test]
    fn lookups_report_unknown_views() {
        let catalog = Catalog::standard().expect("standard views");
        assert_eq!(
            catalog.get("grades").expect_err("undeclared"),
            FilterError::UnknownView {
                view: "grades".into()
            }
        );
        let payments = catalog.get("payments").expect("declared");
        assert_eq!(
            payments.reference_directories().into_iter().collect::<Vec<_>>(),
            vec![DirectoryId::from(USERS_DIRECTORY)]
        );
    }

    #[test]
    fn page_size_overrides_replace_views() {
        let mut sizes = BTreeMap::new();
        sizes.insert("users".to_string(), 100);
        let catalog = Catalog::standard()
            .and_then(|catalog| catalog.with_page_sizes(&sizes))
            .expect("valid override");
        assert_eq!(catalog.get("users").expect("declared").page_size(), 100);
        assert_eq!(catalog.get("logs").expect("declared").page_size(), 50);

        sizes.insert("users".to_string(), 0);
        assert!(matches!(
            Catalog::standard().and_then(|catalog| catalog.with_page_sizes(&sizes)),
            Err(FilterError::InvalidPageSize { .. })
        ));
    }
}
