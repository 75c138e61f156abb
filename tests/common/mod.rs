#![allow(dead_code)]

use std::time::Duration;

use wpsclient::{Credential, WpsClient};

pub const JOB_ID: &str = "3f2c1a9e-0b4d-4c1e-9a7f-1234567890ab";

pub fn status_path() -> String {
    format!("/wps/{}/status.xml", JOB_ID)
}

pub fn output_path() -> String {
    format!("/wps/{}/output.cdf", JOB_ID)
}

fn execute_response(status: &str, outputs: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<wps:ExecuteResponse xmlns:wps="http://www.opengis.net/wps/1.0.0"
    xmlns:ows="http://www.opengis.net/ows/1.1"
    xmlns:xlink="http://www.w3.org/1999/xlink"
    service="WPS" version="1.0.0"
    statusLocation="{location}">
  <wps:Process><ows:Identifier>vires:fetch_data</ows:Identifier></wps:Process>
  <wps:Status creationTime="2020-01-01T00:00:00Z">{status}</wps:Status>
  {outputs}
</wps:ExecuteResponse>"#,
        location = status_path(),
        status = status,
        outputs = outputs
    )
}

pub fn accepted() -> String {
    execute_response("<wps:ProcessAccepted>queued</wps:ProcessAccepted>", "")
}

pub fn started(percent: u8) -> String {
    execute_response(
        &format!(
            r#"<wps:ProcessStarted percentCompleted="{}">running</wps:ProcessStarted>"#,
            percent
        ),
        "",
    )
}

pub fn succeeded_with(identifier: &str) -> String {
    execute_response(
        "<wps:ProcessSucceeded>done</wps:ProcessSucceeded>",
        &format!(
            r#"<wps:ProcessOutputs>
    <wps:Output>
      <ows:Identifier>{}</ows:Identifier>
      <wps:Reference xlink:href="{}" mimeType="application/x-cdf"/>
    </wps:Output>
  </wps:ProcessOutputs>"#,
            identifier,
            output_path()
        ),
    )
}

pub fn succeeded() -> String {
    succeeded_with("output")
}

pub fn failed(code: &str, locator: &str, text: &str) -> String {
    execute_response(
        &format!(
            r#"<wps:ProcessFailed>
      <ows:ExceptionReport version="1.0.0">
        <ows:Exception exceptionCode="{}" locator="{}">
          <ows:ExceptionText>{}</ows:ExceptionText>
        </ows:Exception>
      </ows:ExceptionReport>
    </wps:ProcessFailed>"#,
            code, locator, text
        ),
        "",
    )
}

pub fn ows_exception_report(code: &str, text: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ows:ExceptionReport xmlns:ows="http://www.opengis.net/ows/1.1" version="1.1.0">
  <ows:Exception exceptionCode="{}">
    <ows:ExceptionText>{}</ows:ExceptionText>
  </ows:Exception>
</ows:ExceptionReport>"#,
        code, text
    )
}

pub fn fetch_request() -> Vec<u8> {
    br#"<wps:Execute xmlns:wps="http://www.opengis.net/wps/1.0.0" xmlns:ows="http://www.opengis.net/ows/1.1" version="1.0.0" service="WPS"><ows:Identifier>vires:fetch_data</ows:Identifier></wps:Execute>"#
        .to_vec()
}

pub fn client(server_uri: &str) -> WpsClient {
    client_with(server_uri, &Credential::None)
}

pub fn client_with(server_uri: &str, credential: &Credential) -> WpsClient {
    WpsClient::new(&format!("{}/ows", server_uri), credential)
        .unwrap()
        .with_poll_interval(Duration::from_millis(5))
        .with_timeout(Duration::from_secs(10))
}
