//! URL Algebra - Path Algebra Over URL Pathnames
//!
//! Relative URLs are first-class: a URL is split into scheme, authority,
//! pathname, query and fragment without losing any of its text, and only
//! the pathname takes part in path arithmetic.

use std::borrow::Cow;
use std::fmt;

use ::url::Url;

use crate::paths::{relative_path, resolve_path, to_dir_path};

/// Determine whether the supplied URL is absolute (has a host).
pub fn is_absolute_url(url: &str) -> bool {
    UrlParts::parse(url).has_host()
}

/// Resolve a URL against another URL.
///
/// Supports relative base URLs, in which case only pathnames are resolved.
pub fn resolve_url(base_url: &str, url: &str) -> String {
    let base = UrlParts::parse(base_url);

    if base.has_host() {
        match Url::parse(base_url).and_then(|parsed| parsed.join(url)) {
            Ok(resolved) => return resolved.into(),
            Err(error) => {
                tracing::trace!(base_url, url, %error, "falling back to pathname resolution");
            }
        }
    }

    let target = UrlParts::parse(url);

    if target.authority.is_some() || !target.scheme.is_empty() {
        return url.to_string();
    }

    let pathname = resolve_path(&base.hosted_pathname(), &target.pathname);
    let resolved = UrlParts {
        pathname: Cow::Owned(pathname),
        ..target
    };

    if base.authority.is_some() {
        UrlParts {
            scheme: base.scheme,
            authority: base.authority,
            ..resolved
        }
        .to_string()
    } else {
        resolved.to_string()
    }
}

/// Get a relative URL from one URL to another.
///
/// URLs with differing origins cannot be related, so `to_url` is returned
/// unchanged.
pub fn relative_url(from_url: &str, to_url: &str) -> String {
    let from = UrlParts::parse(from_url);
    let to = UrlParts::parse(to_url);

    if from.origin() != to.origin() || (to.authority.is_none() && !to.scheme.is_empty()) {
        return to_url.to_string();
    }

    let pathname = relative_path(&from.hosted_pathname(), &to.hosted_pathname());

    UrlParts {
        scheme: "",
        authority: None,
        pathname: Cow::Owned(pathname),
        query: to.query,
        fragment: to.fragment,
    }
    .to_string()
}

/// Append a trailing slash to the URL's pathname if it is not already a
/// directory path.
pub fn to_dir_url(url: &str) -> String {
    let parts = UrlParts::parse(url);
    let pathname = to_dir_path(&parts.pathname);

    UrlParts {
        pathname: Cow::Owned(pathname),
        ..parts
    }
    .to_string()
}

/// Lossless split of a (possibly relative) URL.
#[derive(Debug, Clone, PartialEq, Eq)]
struct UrlParts<'a> {
    /// Including the trailing `:`, or empty.
    scheme: &'a str,
    /// Everything between `//` and the pathname, when `//` is present.
    authority: Option<&'a str>,
    pathname: Cow<'a, str>,
    /// Including the leading `?`, or empty.
    query: &'a str,
    /// Including the leading `#`, or empty.
    fragment: &'a str,
}

impl<'a> UrlParts<'a> {
    fn parse(input: &'a str) -> Self {
        let (rest, fragment) = split_at_char(input, '#');
        let (rest, query) = split_at_char(rest, '?');
        let (scheme, rest) = rest.split_at(scheme_len(rest));

        let (authority, pathname) = match rest.strip_prefix("//") {
            Some(after_slashes) => {
                let end = after_slashes.find('/').unwrap_or(after_slashes.len());
                (Some(&after_slashes[..end]), &after_slashes[end..])
            }
            None => (None, rest),
        };

        Self {
            scheme,
            authority,
            pathname: Cow::Borrowed(pathname),
            query,
            fragment,
        }
    }

    /// `host[:port]`, without credentials.
    fn host(&self) -> &'a str {
        let authority = self.authority.unwrap_or("");

        match authority.rfind('@') {
            Some(index) => &authority[index + 1..],
            None => authority,
        }
    }

    fn has_host(&self) -> bool {
        !self.host().is_empty()
    }

    /// Scheme, host and port, lowercased with default ports dropped.
    fn origin(&self) -> Option<String> {
        self.authority?;

        let scheme = self.scheme.to_ascii_lowercase();
        let host = self.host().to_ascii_lowercase();
        let (hostname, port) = split_port(&host);
        let port = port.filter(|port| Some(*port) != default_port(&scheme));

        Some(match port {
            Some(port) => format!("{scheme}//{hostname}:{port}"),
            None => format!("{scheme}//{hostname}"),
        })
    }

    /// A hosted URL without a pathname refers to the root.
    fn hosted_pathname(&self) -> Cow<'_, str> {
        if self.has_host() && self.pathname.is_empty() {
            Cow::Borrowed("/")
        } else {
            Cow::Borrowed(&self.pathname)
        }
    }
}

impl fmt::Display for UrlParts<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme)?;
        if let Some(authority) = self.authority {
            write!(f, "//{authority}")?;
        }
        write!(f, "{}{}{}", self.pathname, self.query, self.fragment)
    }
}

fn split_at_char(input: &str, delimiter: char) -> (&str, &str) {
    match input.find(delimiter) {
        Some(index) => input.split_at(index),
        None => (input, ""),
    }
}

/// Length of a leading `scheme:` (RFC 3986), or zero.
fn scheme_len(input: &str) -> usize {
    let mut chars = input.char_indices();

    match chars.next() {
        Some((_, first)) if first.is_ascii_alphabetic() => {}
        _ => return 0,
    }

    for (index, c) in chars {
        match c {
            ':' => return index + 1,
            c if c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.') => {}
            _ => return 0,
        }
    }

    0
}

fn split_port(host: &str) -> (&str, Option<&str>) {
    match host.rfind(':') {
        Some(index) if !host[index..].contains(']') => (&host[..index], Some(&host[index + 1..])),
        _ => (host, None),
    }
}

fn default_port(scheme: &str) -> Option<&'static str> {
    match scheme {
        "http:" | "ws:" => Some("80"),
        "https:" | "wss:" => Some("443"),
        "ftp:" => Some("21"),
        _ => None,
    }
}
