//! Upstream resolution for a single request.
//!
//! Everything here works against one routing table snapshot handed in by the
//! caller, so lookup, parameter substitution and URL construction all see the
//! same table. Each step returns a `Result` and the first failure ends
//! resolution for that request.
use url::Url;

use crate::core::{
    error::DispatchError,
    method::HttpMethod,
    path_pattern::Captures,
    routing_table::{RouteMatch, RoutingTable},
};

/// Where a request is going to be forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUpstream {
    pub listening_path: String,
    pub method: HttpMethod,
    pub url: Url,
}

/// Resolve the upstream URL for a request against `table`.
pub fn resolve(
    table: &RoutingTable,
    method: &http::Method,
    path: &str,
    query: Option<&str>,
) -> Result<ResolvedUpstream, DispatchError> {
    let (entry, target, captures) = match table.lookup(method, path) {
        RouteMatch::Found {
            entry,
            target,
            captures,
        } => (entry, target, captures),
        RouteMatch::MethodNotAllowed { .. } => {
            return Err(DispatchError::NoUpstreamForMethod {
                method: method.as_str().to_ascii_lowercase(),
                path: path.to_string(),
            });
        }
        RouteMatch::NotFound => {
            return Err(DispatchError::RouteNotFound {
                path: path.to_string(),
            });
        }
    };

    let upstream = upstream_string(&target.upstream_url, &captures);
    let url = parse_upstream(&upstream, query)?;

    Ok(ResolvedUpstream {
        listening_path: entry.listening_path().to_string(),
        method: target.method,
        url,
    })
}

/// Build the final upstream string for a matched route.
///
/// Named parameters replace their `{name}` placeholders in the target; a
/// greedy suffix is appended after a `/`.
pub fn upstream_string(target: &str, captures: &Captures) -> String {
    let mut upstream = substitute_params(target, captures);

    if let Some(suffix) = &captures.suffix {
        upstream = format!("{}/{}", upstream.trim_end_matches('/'), suffix);
    }

    upstream
}

/// Replace each `{name}` in `target` with its captured value in one pass.
/// Substituted values are never scanned again; unknown placeholders stay.
fn substitute_params(target: &str, captures: &Captures) -> String {
    let mut out = String::with_capacity(target.len());
    let mut rest = target;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match captures.param(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

fn parse_upstream(upstream: &str, query: Option<&str>) -> Result<Url, DispatchError> {
    let parse_error = |reason: String| DispatchError::UpstreamUrlParse {
        uri: upstream.to_string(),
        reason,
    };

    let mut url = Url::parse(upstream).map_err(|e| parse_error(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(parse_error(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(parse_error("missing host".to_string()));
    }

    if let Some(incoming) = query.filter(|q| !q.is_empty()) {
        let merged = match url.query() {
            Some(existing) if !existing.is_empty() => format!("{existing}&{incoming}"),
            _ => incoming.to_string(),
        };
        url.set_query(Some(&merged));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use http::Method;

    use super::*;
    use crate::core::compiler::compile_str;

    fn table() -> RoutingTable {
        compile_str(
            r#"
openapi: "3.0.0"
info:
  title: dispatch
  version: "1.0.0"
paths:
  /users/{id}:
    get:
      summary: Get user
      x-target: https://api.internal/users/{id}
  /orgs/{org}/members/{member}:
    get:
      summary: Get member
      x-target: https://api.internal/o/{org}/m/{member}?expand=true
  /github/{account+}:
    get:
      summary: Proxy github
      x-target: https://gh.internal/account
  /broken/{id}:
    get:
      summary: Broken target
      x-target: not a url/{id}
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_named_param_substitution() {
        let resolved = resolve(&table(), &Method::GET, "/users/42", None).unwrap();
        assert_eq!(resolved.url.as_str(), "https://api.internal/users/42");
        assert_eq!(resolved.listening_path, "/users/{id}");
        assert_eq!(resolved.method, HttpMethod::Get);
    }

    #[test]
    fn test_every_param_is_substituted() {
        let resolved = resolve(&table(), &Method::GET, "/orgs/acme/members/7", None).unwrap();
        assert_eq!(
            resolved.url.as_str(),
            "https://api.internal/o/acme/m/7?expand=true"
        );
    }

    #[test]
    fn test_greedy_suffix_is_appended() {
        let resolved = resolve(&table(), &Method::GET, "/github/octo/repos", None).unwrap();
        assert_eq!(resolved.url.as_str(), "https://gh.internal/account/octo/repos");

        let resolved =
            resolve(&table(), &Method::GET, "/github/account/octo/repos", None).unwrap();
        assert_eq!(resolved.url.as_str(), "https://gh.internal/account/octo/repos");
    }

    #[test]
    fn test_incoming_query_is_forwarded() {
        let resolved = resolve(&table(), &Method::GET, "/users/42", Some("page=2")).unwrap();
        assert_eq!(resolved.url.as_str(), "https://api.internal/users/42?page=2");

        let resolved = resolve(
            &table(),
            &Method::GET,
            "/orgs/acme/members/7",
            Some("page=2"),
        )
        .unwrap();
        assert_eq!(resolved.url.query(), Some("expand=true&page=2"));
    }

    #[test]
    fn test_failures_short_circuit() {
        assert_eq!(
            resolve(&table(), &Method::GET, "/nowhere", None),
            Err(DispatchError::RouteNotFound {
                path: "/nowhere".to_string()
            })
        );
        assert_eq!(
            resolve(&table(), &Method::POST, "/users/42", None),
            Err(DispatchError::NoUpstreamForMethod {
                method: "post".to_string(),
                path: "/users/42".to_string()
            })
        );
        match resolve(&table(), &Method::GET, "/broken/9", None) {
            Err(DispatchError::UpstreamUrlParse { uri, .. }) => assert_eq!(uri, "not a url/9"),
            other => panic!("expected parse failure, got {other:?}"),
        }
    }

    #[test]
    fn test_captured_values_are_not_substituted_again() {
        let captures = Captures {
            params: vec![
                ("org".to_string(), "{member}".to_string()),
                ("member".to_string(), "7".to_string()),
            ],
            suffix: None,
        };
        assert_eq!(
            upstream_string("https://api.internal/o/{org}/m/{member}", &captures),
            "https://api.internal/o/{member}/m/7"
        );
    }

    #[test]
    fn test_unknown_and_unclosed_placeholders_are_kept() {
        let captures = Captures {
            params: vec![("id".to_string(), "42".to_string())],
            suffix: None,
        };
        assert_eq!(
            upstream_string("https://x.internal/{id}/{other}/{open", &captures),
            "https://x.internal/42/{other}/{open"
        );
    }

    #[test]
    fn test_upstream_string_without_captures_is_target() {
        assert_eq!(
            upstream_string("https://x.internal/y", &Captures::default()),
            "https://x.internal/y"
        );
    }
}
