//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The engine
//! builds `HttpRequest` values and classifies `HttpResponse` values without
//! knowing how the bytes travel; a `Transport` implementation performs the
//! actual I/O. This keeps classification deterministic and lets tests script
//! responses without a socket.
//!
//! All fields use owned types (`String`, `Vec`) so values can be cloned per
//! attempt and moved onto a blocking thread without lifetime concerns.

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
///
/// `path` is the absolute URL (base URL plus endpoint).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Whether the response declares a JSON content type
    /// (`application/json`, optionally with parameters such as a charset).
    pub fn is_json(&self) -> bool {
        self.header("content-type")
            .map(|value| value.to_ascii_lowercase().contains("application/json"))
            .unwrap_or(false)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(headers: Vec<(&str, &str)>) -> HttpResponse {
        HttpResponse {
            status: 200,
            status_text: "OK".to_string(),
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: String::new(),
        }
    }

    #[test]
    fn header_lookup_ignores_case() {
        let resp = response(vec![("Content-Type", "application/json")]);
        assert_eq!(resp.header("content-type"), Some("application/json"));
        assert_eq!(resp.header("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(resp.header("accept"), None);
    }

    #[test]
    fn json_content_type_with_charset_is_json() {
        assert!(response(vec![("content-type", "application/json; charset=utf-8")]).is_json());
        assert!(!response(vec![("content-type", "text/plain")]).is_json());
        assert!(!response(Vec::new()).is_json());
    }

    #[test]
    fn success_range_is_2xx() {
        let mut resp = response(Vec::new());
        for status in [200, 201, 204, 299] {
            resp.status = status;
            assert!(resp.is_success(), "{status}");
        }
        for status in [199, 301, 404, 503] {
            resp.status = status;
            assert!(!resp.is_success(), "{status}");
        }
    }
}
