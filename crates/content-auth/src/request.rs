//! Borrowed view of the request facts authorization depends on.

use axum::http::request::Parts;
use axum::http::{HeaderMap, Method, Request};

/// Method, path and headers of an inbound request.
///
/// Strategies never see the body, so the view can be built from either a
/// full [`Request`] or just its [`Parts`].
#[derive(Debug, Clone, Copy)]
pub struct AuthRequest<'a> {
    method: &'a Method,
    path: &'a str,
    headers: &'a HeaderMap,
}

impl<'a> AuthRequest<'a> {
    /// Creates a view from its components.
    ///
    /// `path` is the resource path matched against the policy table.
    pub fn new(method: &'a Method, path: &'a str, headers: &'a HeaderMap) -> Self {
        Self {
            method,
            path,
            headers,
        }
    }

    /// Creates a view over request parts.
    pub fn from_parts(parts: &'a Parts) -> Self {
        Self::new(&parts.method, parts.uri.path(), &parts.headers)
    }

    /// Creates a view over a full request.
    pub fn from_request<B>(request: &'a Request<B>) -> Self {
        Self::new(request.method(), request.uri().path(), request.headers())
    }

    #[inline]
    pub fn method(&self) -> &'a Method {
        self.method
    }

    /// Policy action: the HTTP method name.
    #[inline]
    pub fn action(&self) -> &'a str {
        self.method.as_str()
    }

    #[inline]
    pub fn path(&self) -> &'a str {
        self.path
    }

    #[inline]
    pub fn headers(&self) -> &'a HeaderMap {
        self.headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_request_uses_path_without_query() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("https://api.example.edu/admin/student_guides?limit=5")
            .body(())
            .unwrap();

        let view = AuthRequest::from_request(&request);
        assert_eq!(view.path(), "/admin/student_guides");
        assert_eq!(view.action(), "POST");
    }

    #[test]
    fn from_parts_matches_from_request() {
        let request = Request::builder()
            .uri("/student_guides/1")
            .header("ROKWIRE-API-KEY", "k")
            .body(())
            .unwrap();
        let (parts, ()) = request.into_parts();

        let view = AuthRequest::from_parts(&parts);
        assert_eq!(view.method(), Method::GET);
        assert_eq!(view.path(), "/student_guides/1");
        assert!(view.headers().contains_key("rokwire-api-key"));
    }
}
