//! Video-link validation and one-shot percent re-encoding.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use url::Url;

use crate::error::CoreError;

/// Characters escaped when re-encoding a path segment. `%` is included
/// because the input is fully decoded first, so any remaining percent sign
/// is a literal one.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'%')
    .add(b'/');

/// Characters escaped when re-encoding a query component. `&` and `=` are
/// included because components are split on the separators before decoding.
const QUERY_COMPONENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'=')
    .add(b'+');

/// Validate a caller-supplied video link.
///
/// The link is trimmed but otherwise left untouched; an empty result is the
/// only rejected input.
pub fn validate_video_link(video_link: &str) -> Result<&str, CoreError> {
    let trimmed = video_link.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidInput(
            "video link must not be empty".to_string(),
        ));
    }
    Ok(trimmed)
}

/// Re-encode the path and query of a URL exactly once.
///
/// Any prior percent-encoding is decoded first, then each path segment and
/// query component is encoded again, so already-encoded input passes
/// through unchanged while raw spaces or non-ASCII characters come out
/// encoded a single time. Inputs that do not parse as an absolute URL are
/// returned unchanged and left for the extractor to reject.
pub fn reencode_once(raw: &str) -> String {
    let Ok(url) = Url::parse(raw) else {
        return raw.to_string();
    };
    if !url.has_host() {
        return raw.to_string();
    }

    let mut out = String::new();
    out.push_str(url.scheme());
    out.push_str("://");
    if !url.username().is_empty() {
        out.push_str(url.username());
        if let Some(password) = url.password() {
            out.push(':');
            out.push_str(password);
        }
        out.push('@');
    }
    if let Some(host) = url.host_str() {
        out.push_str(host);
    }
    if let Some(port) = url.port() {
        out.push(':');
        out.push_str(&port.to_string());
    }

    for segment in url.path().split('/').skip(1) {
        out.push('/');
        out.push_str(&reencode_component(segment, PATH_SEGMENT));
    }

    if let Some(query) = url.query() {
        out.push('?');
        let mut first = true;
        for pair in query.split('&') {
            if !first {
                out.push('&');
            }
            first = false;
            match pair.split_once('=') {
                Some((key, value)) => {
                    out.push_str(&reencode_component(key, QUERY_COMPONENT));
                    out.push('=');
                    out.push_str(&reencode_component(value, QUERY_COMPONENT));
                }
                None => out.push_str(&reencode_component(pair, QUERY_COMPONENT)),
            }
        }
    }

    out
}

/// Decode a component, then encode it with the given escape set.
fn reencode_component(raw: &str, set: &'static AsciiSet) -> String {
    let decoded = percent_decode_str(raw).decode_utf8_lossy();
    utf8_percent_encode(&decoded, set).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- validate_video_link -------------------------------------------------

    #[test]
    fn non_empty_link_accepted() {
        assert_eq!(
            validate_video_link("https://cdn.example/a.mp4").unwrap(),
            "https://cdn.example/a.mp4"
        );
    }

    #[test]
    fn link_is_trimmed_only() {
        assert_eq!(
            validate_video_link("  https://cdn.example/a%20b.mp4 ").unwrap(),
            "https://cdn.example/a%20b.mp4"
        );
    }

    #[test]
    fn empty_link_rejected() {
        assert!(validate_video_link("").is_err());
        assert!(validate_video_link("   ").is_err());
    }

    // -- reencode_once -------------------------------------------------------

    #[test]
    fn plain_url_unchanged() {
        assert_eq!(
            reencode_once("https://cdn.example/videos/a.mp4"),
            "https://cdn.example/videos/a.mp4"
        );
    }

    #[test]
    fn already_encoded_url_is_stable() {
        assert_eq!(
            reencode_once("https://cdn.example/a%20b.mp4"),
            "https://cdn.example/a%20b.mp4"
        );
    }

    #[test]
    fn raw_space_encoded_once() {
        // The Url parser encodes the space; the decode/encode cycle keeps
        // the result at exactly one level.
        assert_eq!(
            reencode_once("https://cdn.example/a b.mp4"),
            "https://cdn.example/a%20b.mp4"
        );
    }

    #[test]
    fn double_encoded_input_is_stable() {
        // Decoding strips one level ("%2520" -> "%20"), and the literal
        // percent sign is escaped again on the way out.
        assert_eq!(
            reencode_once("https://cdn.example/a%2520b.mp4"),
            "https://cdn.example/a%2520b.mp4"
        );
    }

    #[test]
    fn query_separators_preserved() {
        assert_eq!(
            reencode_once("https://cdn.example/v.mp4?token=a%20b&expires=17"),
            "https://cdn.example/v.mp4?token=a%20b&expires=17"
        );
    }

    #[test]
    fn port_and_root_path_survive() {
        assert_eq!(
            reencode_once("http://cdn.example:8080/"),
            "http://cdn.example:8080/"
        );
    }

    #[test]
    fn non_url_input_returned_unchanged() {
        assert_eq!(reencode_once("not a url"), "not a url");
    }
}
