//! WPS 1.0 execute-response parsing.

use reqwest::StatusCode;
use url::Url;

use crate::error::{Error, OwsException, Result};
use crate::status::{JobStatus, StatusSnapshot};
use crate::xml::Element;

pub const NS_WPS10: &str = "http://www.opengis.net/wps/1.0.0";
pub const NS_OWS11: &str = "http://www.opengis.net/ows/1.1";
pub const NS_OWS20: &str = "http://www.opengis.net/ows/2.0";
pub const NS_XLINK: &str = "http://www.w3.org/1999/xlink";

/// Parses an execute response into a status snapshot. Relative status
/// locations are resolved against `base`.
pub fn parse_status(document: &[u8], base: &Url) -> Result<StatusSnapshot> {
    let root = Element::parse(document)?;

    let status_element = root
        .child(NS_WPS10, "Status")
        .ok_or_else(|| Error::malformed("execute response has no wps:Status element"))?;
    let state = status_element
        .children()
        .next()
        .ok_or_else(|| Error::malformed("wps:Status element is empty"))?;

    let (status, percent_completed) = match (state.namespace(), state.local_name()) {
        (Some(NS_WPS10), "ProcessAccepted") => (JobStatus::Accepted, Some(0)),
        (Some(NS_WPS10), "ProcessStarted") => {
            (JobStatus::Started, Some(parse_percent(state.attr("percentCompleted"))?))
        }
        (Some(NS_WPS10), "ProcessSucceeded") => (JobStatus::Finished, Some(100)),
        (Some(NS_WPS10), "ProcessFailed") => (JobStatus::Failed, None),
        (_, other) => {
            return Err(Error::malformed(format!("unknown process status [{}]", other)));
        }
    };

    let location = root
        .attr("statusLocation")
        .ok_or_else(|| Error::malformed("execute response has no statusLocation"))?;
    let status_url = base
        .join(location)
        .map_err(|e| Error::malformed(format!("invalid statusLocation {:?}: {}", location, e)))?;

    Ok(StatusSnapshot {
        status,
        percent_completed,
        status_url,
        document: root,
    })
}

fn parse_percent(value: Option<&str>) -> Result<u8> {
    let Some(value) = value else {
        return Ok(0);
    };
    let percent: u8 = value
        .trim()
        .parse()
        .map_err(|_| Error::malformed(format!("invalid percentCompleted {:?}", value)))?;
    Ok(percent.min(100))
}

/// Reference URL of the output named `identifier`, if the document lists one.
pub fn extract_output_reference<'a>(document: &'a Element, identifier: &str) -> Option<&'a str> {
    document
        .child(NS_WPS10, "ProcessOutputs")?
        .children_named(NS_WPS10, "Output")
        .filter(|output| {
            output
                .child(NS_OWS11, "Identifier")
                .and_then(Element::text)
                .is_some_and(|id| id.trim() == identifier)
        })
        .find_map(|output| {
            let reference = output.child(NS_WPS10, "Reference")?;
            reference
                .attr_ns(NS_XLINK, "href")
                .or_else(|| reference.attr("href"))
        })
}

/// Looks for an OWS exception, trying OWS 1.1 before OWS 2.0.
pub fn extract_fault(document: &Element) -> Option<OwsException> {
    for ns in [NS_OWS11, NS_OWS20] {
        let Some(exception) = find_self_or_descendant(document, ns, "Exception") else {
            continue;
        };
        let Some(code) = exception.attr("exceptionCode") else {
            continue;
        };
        return Some(OwsException {
            code: code.to_string(),
            locator: exception.attr("locator").map(str::to_string),
            text: exception
                .child(ns, "ExceptionText")
                .and_then(Element::text)
                .map(|t| t.trim().to_string()),
        });
    }
    None
}

fn find_self_or_descendant<'a>(root: &'a Element, ns: &str, name: &str) -> Option<&'a Element> {
    if root.is(ns, name) {
        Some(root)
    } else {
        root.descendant(ns, name)
    }
}

/// Translates a non-success HTTP response into the error taxonomy.
///
/// 401/403 always become [`Error::Authentication`]. Otherwise an OWS
/// exception in the body becomes [`Error::Protocol`]; a body that cannot be
/// read as one leaves the HTTP error as it was.
pub fn error_from_response(status: StatusCode, url: &str, body: &[u8]) -> Error {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Error::Authentication;
    }

    match Element::parse(body).ok().as_ref().and_then(extract_fault) {
        Some(fault) => Error::Protocol(fault),
        None => Error::Http {
            status,
            url: url.to_string(),
        },
    }
}
