//! Address fragments naming the open document and heading.
//!
//! The canonical form is `doc=<path>&anchor=<id>` with both values
//! percent-encoded. Older links of the form `<path>`, `<path>?anchor=<id>`
//! and `<path>#<id>` are still understood.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use tracing::debug;

/// Everything except the characters a URI component leaves alone.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// A document path plus an optional heading id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: String,
    pub anchor: Option<String>,
}

fn decode(text: &str) -> String {
    percent_decode_str(text).decode_utf8_lossy().into_owned()
}

fn encode(text: &str) -> String {
    utf8_percent_encode(text, COMPONENT).to_string()
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}

/// Value of `key` in an `a=b&c=d` query string, decoded.
fn query_value(query: &str, key: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .and_then(|(_, v)| non_empty(decode(&v.replace('+', " "))))
}

impl Route {
    pub fn new(path: impl Into<String>, anchor: Option<String>) -> Self {
        Self {
            path: path.into(),
            anchor,
        }
    }

    /// Parse a fragment, with or without the leading `#`.
    pub fn parse(fragment: &str) -> Option<Self> {
        let raw = fragment.trim().trim_start_matches('#');
        if raw.is_empty() {
            return None;
        }
        if raw.starts_with("doc=") || raw.contains("&doc=") {
            let path = query_value(raw, "doc")?;
            return Some(Self {
                path,
                anchor: query_value(raw, "anchor"),
            });
        }

        let decoded = decode(raw);
        let (path, query) = match decoded.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (decoded.as_str(), None),
        };
        if let Some(query) = query.filter(|q| q.contains("anchor=")) {
            return non_empty(path.to_string()).map(|path| Self {
                path,
                anchor: query_value(query, "anchor"),
            });
        }
        if let Some((path, anchor)) = path.split_once('#') {
            return non_empty(path.to_string()).map(|path| Self {
                path,
                anchor: non_empty(anchor.to_string()),
            });
        }
        non_empty(path.to_string()).map(|path| Self { path, anchor: None })
    }

    /// Route for a link `href` found in the document at `current`.
    ///
    /// Relative targets resolve against `current`'s directory. Pure
    /// fragments and links leaving the site yield `None`.
    pub fn resolve_link(current: &str, href: &str) -> Option<Self> {
        let href = href.trim();
        if href.is_empty()
            || href.starts_with('#')
            || href.contains("://")
            || href.starts_with("mailto:")
        {
            return None;
        }
        let (target, anchor) = match href.split_once('#') {
            Some((target, anchor)) => (target, non_empty(decode(anchor))),
            None => (href, None),
        };
        let target = target.split_once('?').map_or(target, |(path, _)| path);
        let target = decode(target);

        let mut parts: Vec<&str> = if target.starts_with('/') {
            Vec::new()
        } else {
            current
                .rsplit_once('/')
                .map(|(dir, _)| dir.split('/').collect())
                .unwrap_or_default()
        };
        for segment in target.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                segment => parts.push(segment),
            }
        }
        non_empty(parts.join("/")).map(|path| Self { path, anchor })
    }

    /// Canonical fragment, without the leading `#`.
    pub fn to_fragment(&self) -> String {
        match &self.anchor {
            Some(anchor) => format!("doc={}&anchor={}", encode(&self.path), encode(anchor)),
            None => format!("doc={}", encode(&self.path)),
        }
    }
}

/// The current route and the back/forward history around it.
#[derive(Debug, Default)]
pub struct Router {
    current: Option<Route>,
    back: Vec<Route>,
    forward: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn current(&self) -> Option<&Route> {
        self.current.as_ref()
    }

    /// Fragment for display, empty when nothing is routed.
    pub fn fragment(&self) -> String {
        self.current.as_ref().map(Route::to_fragment).unwrap_or_default()
    }

    pub fn can_go_back(&self) -> bool {
        !self.back.is_empty()
    }

    pub fn can_go_forward(&self) -> bool {
        !self.forward.is_empty()
    }

    /// Record navigation the viewer already performed. Emits nothing.
    pub fn push(&mut self, route: Route) {
        if self.current.as_ref() == Some(&route) {
            return;
        }
        if let Some(previous) = self.current.replace(route) {
            self.back.push(previous);
        }
        self.forward.clear();
    }

    /// Swap the current entry in place, e.g. to record a new anchor.
    pub fn replace(&mut self, route: Route) {
        self.current = Some(route);
    }

    /// Handle an externally changed fragment.
    ///
    /// Returns the route to load when it differs from the current one.
    pub fn navigate(&mut self, fragment: &str) -> Option<Route> {
        let Some(route) = Route::parse(fragment) else {
            debug!(fragment, "ignoring unparseable fragment");
            return None;
        };
        if self.current.as_ref() == Some(&route) {
            return None;
        }
        self.push(route.clone());
        Some(route)
    }

    /// Step back in history, returning the route to load.
    pub fn back(&mut self) -> Option<Route> {
        let previous = self.back.pop()?;
        if let Some(current) = self.current.replace(previous.clone()) {
            self.forward.push(current);
        }
        Some(previous)
    }

    /// Step forward in history, returning the route to load.
    pub fn forward(&mut self) -> Option<Route> {
        let next = self.forward.pop()?;
        if let Some(current) = self.current.replace(next.clone()) {
            self.back.push(current);
        }
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_fragment_round_trip() {
        let route = Route::new("content/第一章/a b.md", Some("intro-2".to_string()));
        let fragment = route.to_fragment();
        assert!(fragment.starts_with("doc=content%2F"));
        assert_eq!(Route::parse(&format!("#{fragment}")), Some(route));
    }

    #[test]
    fn test_parse_legacy_forms() {
        assert_eq!(
            Route::parse("#content%2Fa.md"),
            Some(Route::new("content/a.md", None))
        );
        assert_eq!(
            Route::parse("#content/a.md?anchor=setup"),
            Some(Route::new("content/a.md", Some("setup".to_string())))
        );
        assert_eq!(
            Route::parse("#content/a.md#setup"),
            Some(Route::new("content/a.md", Some("setup".to_string())))
        );
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(Route::parse(""), None);
        assert_eq!(Route::parse("#"), None);
        assert_eq!(Route::parse("doc="), None);
        assert_eq!(Route::parse("#?anchor=x"), None);
    }

    #[test]
    fn test_parse_anchor_order_independent() {
        assert_eq!(
            Route::parse("anchor=b&doc=x.md"),
            Some(Route::new("x.md", Some("b".to_string())))
        );
    }

    #[test]
    fn test_resolve_relative_links() {
        assert_eq!(
            Route::resolve_link("guide/a.md", "b.md#setup"),
            Some(Route::new("guide/b.md", Some("setup".to_string())))
        );
        assert_eq!(
            Route::resolve_link("guide/deep/a.md", "../../top.md"),
            Some(Route::new("top.md", None))
        );
        assert_eq!(
            Route::resolve_link("guide/a.md", "/content/x.md?raw=1"),
            Some(Route::new("content/x.md", None))
        );
        assert_eq!(
            Route::resolve_link("a.md", "./%E7%AC%AC%E4%B8%80.md"),
            Some(Route::new("第一.md", None))
        );
    }

    #[test]
    fn test_resolve_link_skips_fragments_and_external() {
        assert_eq!(Route::resolve_link("a.md", "#setup"), None);
        assert_eq!(Route::resolve_link("a.md", "https://example.com"), None);
        assert_eq!(Route::resolve_link("a.md", "mailto:me@example.com"), None);
        assert_eq!(Route::resolve_link("a.md", ".."), None);
    }

    #[test]
    fn test_navigate_ignores_current_route() {
        let mut router = Router::new();
        assert_eq!(router.navigate("doc=a.md"), Some(Route::new("a.md", None)));
        assert_eq!(router.navigate("#doc=a.md"), None);
        assert_eq!(router.fragment(), "doc=a.md");
    }

    #[test]
    fn test_back_and_forward() {
        let mut router = Router::new();
        router.push(Route::new("a.md", None));
        router.push(Route::new("b.md", None));
        router.replace(Route::new("b.md", Some("x".to_string())));

        assert_eq!(router.back(), Some(Route::new("a.md", None)));
        assert!(!router.can_go_back());
        assert_eq!(
            router.forward(),
            Some(Route::new("b.md", Some("x".to_string())))
        );
        assert_eq!(router.forward(), None);

        router.back();
        router.push(Route::new("c.md", None));
        assert!(!router.can_go_forward());
    }
}
