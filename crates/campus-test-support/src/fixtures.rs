//! Directory and view fixtures.

use std::sync::Arc;

use campus_filters::{Directories, DirectoryEntry, FilterDescriptor, ViewSpec};

/// Directory contents shared by the integration suites.
#[must_use]
pub fn directory_entries() -> Vec<(&'static str, Vec<DirectoryEntry>)> {
    vec![
        (
            "users",
            vec![
                DirectoryEntry::new("5", "Ada Smith"),
                DirectoryEntry::new("7", "Grace Jones"),
            ],
        ),
        (
            "schools",
            vec![
                DirectoryEntry::new("1", "North High"),
                DirectoryEntry::new("2", "South High"),
            ],
        ),
        (
            "classrooms",
            vec![
                DirectoryEntry::new("9", "9B"),
                DirectoryEntry::new("10", "10A"),
            ],
        ),
    ]
}

/// Every fixture directory, fully loaded.
#[must_use]
pub fn loaded_directories() -> Directories {
    directory_entries()
        .into_iter()
        .fold(Directories::new(), |directories, (id, entries)| {
            directories.with(id, entries)
        })
}

/// Small searchable view used by scheduler tests.
///
/// # Panics
///
/// Panics if the fixture declaration is rejected.
#[must_use]
pub fn search_view(polls: bool) -> Arc<ViewSpec> {
    let builder = ViewSpec::builder("people")
        .endpoint("/people")
        .page_size(10)
        .filter(FilterDescriptor::text("search"))
        .filter(FilterDescriptor::reference("school_id", "schools"));
    let builder = if polls { builder.polling() } else { builder };
    match builder.build() {
        Ok(view) => Arc::new(view),
        Err(error) => panic!("fixture view rejected: {error}"),
    }
}

#[cfg(test)]
mod tests {
    use campus_filters::DirectoryId;

    use super::*;

    #[test]
    fn loaded_directories_resolve_fixture_ids() {
        let directories = loaded_directories();
        let schools = DirectoryId::new("schools");
        assert!(directories.is_loaded(&schools));
        assert_eq!(
            directories.resolve(&schools, "2").map(|entry| entry.value.as_str()),
            Some("South High")
        );
    }

    #[test]
    fn search_view_polls_on_request() {
        assert!(search_view(true).polls());
        assert!(!search_view(false).polls());
        assert_eq!(search_view(false).endpoint(), "/people");
    }
}
