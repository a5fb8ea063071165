//! Request classification.
//!
//! Decides, from the path alone, whether a request is forwarded to an
//! upstream or handled by the gateway. Runs before any body-reading layer
//! sees the request: proxy requests never pass through the local JSON
//! body parser, so their bodies reach the upstream unread.

/// Where a request is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Forwarded to an upstream with the body untouched.
    Proxy,
    /// Handled by the gateway itself (health check, 404s).
    Local,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    /// Reserved prefix with trailing slash, e.g. `/api/v1/`.
    api_prefix: String,
}

impl Classifier {
    pub fn new(api_prefix: impl Into<String>) -> Self {
        let mut api_prefix = api_prefix.into();
        if !api_prefix.ends_with('/') {
            api_prefix.push('/');
        }
        Self { api_prefix }
    }

    pub fn classify(&self, path: &str) -> RouteClass {
        let root = &self.api_prefix[..self.api_prefix.len() - 1];
        if path.starts_with(&self.api_prefix) || (!root.is_empty() && path == root) {
            RouteClass::Proxy
        } else {
            RouteClass::Local
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_paths_are_proxied() {
        let classifier = Classifier::new("/api/v1/");
        assert_eq!(classifier.classify("/api/v1/users/1"), RouteClass::Proxy);
        assert_eq!(classifier.classify("/api/v1/unknown"), RouteClass::Proxy);
        assert_eq!(classifier.classify("/api/v1"), RouteClass::Proxy);
    }

    #[test]
    fn everything_else_is_local() {
        let classifier = Classifier::new("/api/v1");
        assert_eq!(classifier.classify("/"), RouteClass::Local);
        assert_eq!(classifier.classify("/health"), RouteClass::Local);
        assert_eq!(classifier.classify("/api/v10/users"), RouteClass::Local);
        assert_eq!(classifier.classify("/api/v2/users"), RouteClass::Local);
    }
}
