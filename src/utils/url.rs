//! URL utilities for consistent URL handling
//!
//! This module provides utilities for normalizing URLs to prevent issues
//! with trailing slashes when constructing backend endpoints.

/// Normalize a base URL by removing trailing slashes
///
/// This ensures consistent URL construction when appending endpoints,
/// preventing double slashes in the final URLs.
///
/// # Examples
///
/// ```
/// use citytalk::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://127.0.0.1:5000"), "http://127.0.0.1:5000");
/// assert_eq!(normalize_base_url("http://127.0.0.1:5000/"), "http://127.0.0.1:5000");
/// assert_eq!(normalize_base_url("http://127.0.0.1:5000///"), "http://127.0.0.1:5000");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Construct a complete endpoint URL from a base URL and endpoint path
///
/// This function normalizes the base URL and safely appends the endpoint,
/// ensuring there are no double slashes in the result.
///
/// # Examples
///
/// ```
/// use citytalk::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://127.0.0.1:5000", "process-prompt"),
///     "http://127.0.0.1:5000/process-prompt"
/// );
/// assert_eq!(
///     construct_api_url("http://127.0.0.1:5000/", "/process-prompt"),
///     "http://127.0.0.1:5000/process-prompt"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}

/// Construct the event-channel URL for a session.
pub fn stream_url(base_url: &str, session_id: &str) -> String {
    construct_api_url(base_url, &format!("stream/{}", session_id))
}

/// Construct a cache-busted map page URL.
///
/// The backend regenerates the map document in place, so each refresh
/// appends a timestamp query string to defeat intermediary caching.
pub fn map_url(base_url: &str, map_page: &str, timestamp_millis: i64) -> String {
    let page = map_page.trim_start_matches('/');
    format!(
        "{}/maps/{}?t={}",
        normalize_base_url(base_url),
        page,
        timestamp_millis
    )
}
