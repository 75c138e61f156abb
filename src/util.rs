use std::sync::OnceLock;

use regex::Regex;
use url::Url;

fn job_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
            .expect("job id pattern is valid")
    })
}

/// First UUID-shaped path segment of a status URL.
pub(crate) fn job_id_from_status_url(status_url: &Url) -> Option<&str> {
    status_url
        .path_segments()?
        .find(|segment| job_id_pattern().is_match(segment))
}

pub(crate) fn megabytes(bytes: u64) -> f64 {
    (bytes as f64 / 1e6 * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_job_id_segment() {
        let url = Url::parse(
            "https://vires.example/wps/3f2c1a9e-0b4d-4c1e-9a7f-1234567890ab/status.xml",
        )
        .unwrap();
        assert_eq!(
            job_id_from_status_url(&url),
            Some("3f2c1a9e-0b4d-4c1e-9a7f-1234567890ab")
        );
    }

    #[test]
    fn rejects_urls_without_job_id() {
        let upper = Url::parse("https://x/wps/3F2C1A9E-0B4D-4C1E-9A7F-1234567890AB/s.xml").unwrap();
        assert_eq!(job_id_from_status_url(&upper), None);
        let none = Url::parse("https://x/wps/status.xml").unwrap();
        assert_eq!(job_id_from_status_url(&none), None);
    }

    #[test]
    fn megabytes_rounds_to_three_places() {
        assert_eq!(megabytes(1_234_567), 1.235);
        assert_eq!(megabytes(0), 0.0);
    }
}
