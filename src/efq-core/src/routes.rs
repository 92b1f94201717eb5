//! Fixed listing routes expressed as DSL parameter maps
//!
//! Both routes only build parameters; dispatching them goes through the same
//! builder and dispatcher as any other request.

use efq_parser::DELIMITER;
use efq_shared::Params;

/// Date field filtered by [`nodes_route`]
pub const ROUTE_DATE_FIELD: &str = "field_date";
/// Category field filtered by [`paged_nodes_route`]
pub const ROUTE_CATEGORY_FIELD: &str = "field_category.entity.tid";

fn is_active(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.contains("all"))
}

/// Calendar-style listing.
///
/// `category` uses the `category` grammar. `date` is `START--END`; when
/// present the listing is restricted to records overlapping that window and
/// sorted featured first, then by date.
pub fn nodes_route(
    content_type: &str,
    view_mode: &str,
    category: Option<&str>,
    date: Option<&str>,
) -> Params {
    let mut params = Params::new();
    params.insert("content_type".to_string(), content_type.to_string());
    params.insert("view_mode".to_string(), view_mode.to_string());

    if let Some(date) = date.map(str::trim).filter(|d| !d.is_empty()) {
        let window = match date.split_once(DELIMITER) {
            Some((start, end)) => format!("{start},{end}"),
            None => date.to_string(),
        };
        params.insert(
            "date".to_string(),
            format!("{ROUTE_DATE_FIELD}{DELIMITER}{window}"),
        );
        params.insert(
            "sort".to_string(),
            "field_featured-DESC,field_date-ASC".to_string(),
        );
    }
    if let Some(category) = is_active(category) {
        params.insert("category".to_string(), category.to_string());
    }
    params
}

/// Paged listing, newest first, optionally limited to one category term
pub fn paged_nodes_route(
    content_type: &str,
    view_mode: &str,
    page: u64,
    per_page: u64,
    category: Option<&str>,
) -> Params {
    let mut params = Params::new();
    params.insert("content_type".to_string(), content_type.to_string());
    params.insert("view_mode".to_string(), view_mode.to_string());
    params.insert("paged".to_string(), format!("{page}-{per_page}"));
    params.insert("sort".to_string(), "created-DESC".to_string());

    if let Some(term) = is_active(category) {
        params.insert(
            "field".to_string(),
            format!("{ROUTE_CATEGORY_FIELD}{DELIMITER}{term}{DELIMITER}="),
        );
    }
    params
}
