//! Splitting absolute URLs into an authority and a path, and rebuilding the
//! externally visible URL of a request from its gateway environment.

use std::{collections::HashMap, fmt, str::FromStr};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::Error;

pub const DEFAULT_PORT: u16 = 80;

const HTTPS_PORT: &str = "443";
const HTTP_PORT: &str = "80";

/// Characters left literal when quoting `SCRIPT_NAME` and `PATH_INFO`.
const PATH: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'/');

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Extracts the endpoint address of an absolute URL.
    pub fn from_url(url: &str) -> Result<Self, Error> {
        split_url(url).0.parse()
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(hostport: &str) -> Result<Self, Self::Err> {
        let mut split = hostport.split(':');
        let host = split.next().unwrap_or_default().to_owned();

        let port = match split.next() {
            Some(port) => port
                .parse()
                .map_err(|_| Error::InvalidPort(port.to_owned()))?,
            None => DEFAULT_PORT,
        };

        Ok(Self { host, port })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Splits a URL into `("host:port", "/path")`.
///
/// Anything up to the last `://` is discarded. The port is taken verbatim from
/// the authority when present and defaults to 80 otherwise. This is a plain
/// string split: malformed input produces odd output rather than an error.
pub fn split_url(url: &str) -> (String, String) {
    let without_scheme = url.rsplit("://").next().unwrap_or(url);

    let (authority, path) = match without_scheme.split_once('/') {
        Some((authority, rest)) => (authority, format!("/{}", rest)),
        None => (without_scheme, "/".to_owned()),
    };

    let mut hostport = authority.split(':');
    let host = hostport.next().unwrap_or_default();

    let hostport = match hostport.next() {
        Some(port) => format!("{}:{}", host, port),
        None => format!("{}:{}", host, DEFAULT_PORT),
    };

    (hostport, path)
}

fn quote(value: &str) -> String {
    utf8_percent_encode(value, PATH).to_string()
}

fn required<'a>(environ: &'a HashMap<String, String>, key: &'static str) -> Result<&'a str, Error> {
    environ
        .get(key)
        .map(String::as_str)
        .ok_or(Error::MissingEnvironmentKey(key))
}

fn optional<'a>(environ: &'a HashMap<String, String>, key: &str) -> &'a str {
    environ.get(key).map(String::as_str).unwrap_or_default()
}

/// Rebuilds the URL a client used to reach a gateway application, following
/// the reconstruction recipe from PEP 333 (CGI variables per RFC 3875).
pub fn reconstruct_url(environ: &HashMap<String, String>) -> Result<String, Error> {
    let scheme = required(environ, "wsgi.url_scheme")?;
    let mut url = format!("{}://", scheme);

    match environ.get("HTTP_HOST").filter(|host| !host.is_empty()) {
        Some(host) => url.push_str(host),

        None => {
            url.push_str(required(environ, "SERVER_NAME")?);

            let port = required(environ, "SERVER_PORT")?;
            let default_port = if scheme == "https" {
                HTTPS_PORT
            } else {
                HTTP_PORT
            };

            if port != default_port {
                url.push(':');
                url.push_str(port);
            }
        }
    }

    let script_name = quote(optional(environ, "SCRIPT_NAME"));
    let path_info = quote(optional(environ, "PATH_INFO"));

    if script_name == "/" && path_info.starts_with('/') {
        // A lone slash would double up with the path.
    } else if script_name.starts_with("//") {
        url.push_str(&script_name[1..]);
    } else {
        url.push_str(&script_name);
    }

    url.push_str(&path_info);

    let query = optional(environ, "QUERY_STRING");
    if !query.is_empty() {
        url.push('?');
        url.push_str(query);
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn environ(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn split_with_explicit_port() {
        let (hostport, path) = split_url("http://myserver:8080/service.wsdl");
        assert_eq!(hostport, "myserver:8080");
        assert_eq!(path, "/service.wsdl");
    }

    #[test]
    fn split_defaults_port() {
        let (hostport, path) = split_url("http://example.com/a/b?wsdl");
        assert_eq!(hostport, "example.com:80");
        assert_eq!(path, "/a/b?wsdl");
    }

    #[test]
    fn split_without_scheme_or_path() {
        assert_eq!(
            split_url("example.com"),
            ("example.com:80".to_owned(), "/".to_owned())
        );
        assert_eq!(
            split_url("https://example.com/"),
            ("example.com:80".to_owned(), "/".to_owned())
        );
    }

    #[test]
    fn endpoint_from_url() {
        let endpoint = Endpoint::from_url("http://localhost:9000/x").unwrap();
        assert_eq!(endpoint.host, "localhost");
        assert_eq!(endpoint.port, 9000);
        assert_eq!(endpoint.to_string(), "localhost:9000");

        let endpoint = Endpoint::from_url("http://localhost/x").unwrap();
        assert_eq!(endpoint.port, DEFAULT_PORT);
    }

    #[test]
    fn endpoint_rejects_bad_port() {
        assert!(matches!(
            Endpoint::from_url("http://localhost:http/x"),
            Err(Error::InvalidPort(port)) if port == "http"
        ));
    }

    #[test]
    fn reconstruct_prefers_http_host() {
        let env = environ(&[
            ("wsgi.url_scheme", "http"),
            ("HTTP_HOST", "proxy.example.com:8000"),
            ("SERVER_NAME", "internal"),
            ("SERVER_PORT", "9999"),
            ("SCRIPT_NAME", "/app"),
            ("PATH_INFO", "/svc"),
        ]);

        assert_eq!(
            reconstruct_url(&env).unwrap(),
            "http://proxy.example.com:8000/app/svc"
        );
    }

    #[test]
    fn reconstruct_elides_default_ports() {
        let env = environ(&[
            ("wsgi.url_scheme", "https"),
            ("SERVER_NAME", "example.com"),
            ("SERVER_PORT", "443"),
        ]);
        assert_eq!(reconstruct_url(&env).unwrap(), "https://example.com");

        let env = environ(&[
            ("wsgi.url_scheme", "http"),
            ("SERVER_NAME", "example.com"),
            ("SERVER_PORT", "80"),
            ("PATH_INFO", "/a"),
        ]);
        assert_eq!(reconstruct_url(&env).unwrap(), "http://example.com/a");
    }

    #[test]
    fn reconstruct_keeps_non_default_ports() {
        let env = environ(&[
            ("wsgi.url_scheme", "https"),
            ("SERVER_NAME", "example.com"),
            ("SERVER_PORT", "80"),
        ]);
        assert_eq!(reconstruct_url(&env).unwrap(), "https://example.com:80");

        let env = environ(&[
            ("wsgi.url_scheme", "http"),
            ("SERVER_NAME", "example.com"),
            ("SERVER_PORT", "443"),
        ]);
        assert_eq!(reconstruct_url(&env).unwrap(), "http://example.com:443");
    }

    #[test]
    fn reconstruct_skips_lone_slash_script_name() {
        let env = environ(&[
            ("wsgi.url_scheme", "http"),
            ("HTTP_HOST", "host"),
            ("SCRIPT_NAME", "/"),
            ("PATH_INFO", "/foo"),
        ]);
        assert_eq!(reconstruct_url(&env).unwrap(), "http://host/foo");
    }

    #[test]
    fn reconstruct_collapses_double_slash_script_name() {
        let env = environ(&[
            ("wsgi.url_scheme", "http"),
            ("HTTP_HOST", "host"),
            ("SCRIPT_NAME", "//app"),
            ("PATH_INFO", "/foo"),
        ]);
        assert_eq!(reconstruct_url(&env).unwrap(), "http://host/app/foo");
    }

    #[test]
    fn reconstruct_quotes_path_and_appends_query() {
        let env = environ(&[
            ("wsgi.url_scheme", "http"),
            ("HTTP_HOST", "host"),
            ("SCRIPT_NAME", "/my app"),
            ("PATH_INFO", "/a&b"),
            ("QUERY_STRING", "wsdl&x=1"),
        ]);
        assert_eq!(
            reconstruct_url(&env).unwrap(),
            "http://host/my%20app/a%26b?wsdl&x=1"
        );
    }

    #[test]
    fn reconstruct_quotes_tilde() {
        let env = environ(&[
            ("wsgi.url_scheme", "http"),
            ("HTTP_HOST", "host"),
            ("SCRIPT_NAME", "/~user"),
            ("PATH_INFO", "/a_b.c-d"),
        ]);
        assert_eq!(reconstruct_url(&env).unwrap(), "http://host/%7Euser/a_b.c-d");
    }

    #[test]
    fn reconstruct_falls_back_when_http_host_empty() {
        let env = environ(&[
            ("wsgi.url_scheme", "http"),
            ("HTTP_HOST", ""),
            ("SERVER_NAME", "fallback"),
            ("SERVER_PORT", "8080"),
        ]);
        assert_eq!(reconstruct_url(&env).unwrap(), "http://fallback:8080");
    }

    #[test]
    fn reconstruct_requires_scheme_and_server() {
        assert!(matches!(
            reconstruct_url(&environ(&[("HTTP_HOST", "host")])),
            Err(Error::MissingEnvironmentKey("wsgi.url_scheme"))
        ));
        assert!(matches!(
            reconstruct_url(&environ(&[
                ("wsgi.url_scheme", "http"),
                ("SERVER_NAME", "host"),
            ])),
            Err(Error::MissingEnvironmentKey("SERVER_PORT"))
        ));
    }

    proptest! {
        #[test]
        fn split_keeps_explicit_port(
            host in "[a-z][a-z0-9.-]{0,20}",
            port in 1u16..=u16::MAX,
            path in "(/[a-z0-9_]{0,8}){0,4}",
        ) {
            let (hostport, split_path) = split_url(&format!("http://{}:{}{}", host, port, path));
            prop_assert_eq!(hostport, format!("{}:{}", host, port));

            let expected = if path.is_empty() { "/".to_owned() } else { path };
            prop_assert_eq!(split_path, expected);
        }

        #[test]
        fn split_defaults_missing_port(host in "[a-z][a-z0-9.-]{0,20}") {
            let endpoint = Endpoint::from_url(&format!("http://{}/x", host)).unwrap();
            prop_assert_eq!(endpoint.host, host);
            prop_assert_eq!(endpoint.port, DEFAULT_PORT);
        }
    }
}
