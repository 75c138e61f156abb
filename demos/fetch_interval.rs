use anyhow::Result;
use chrono::{TimeZone, Utc};
use std::path::Path;
use tracing_subscriber::EnvFilter;
use wpsclient::{GetOptions, TimeInterval, WpsClient, get_between};

const REQUEST_TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<wps:Execute xmlns:wps="http://www.opengis.net/wps/1.0.0"
    xmlns:ows="http://www.opengis.net/ows/1.1"
    service="WPS" version="1.0.0">
  <ows:Identifier>vires:fetch_filtered_data_async</ows:Identifier>
  <wps:DataInputs>
    <wps:Input>
      <ows:Identifier>collection_ids</ows:Identifier>
      <wps:Data><wps:ComplexData mimeType="application/json">{"Alpha": ["SW_OPER_MAGA_LR_1B"]}</wps:ComplexData></wps:Data>
    </wps:Input>
    <wps:Input>
      <ows:Identifier>begin_time</ows:Identifier>
      <wps:Data><wps:LiteralData>{begin}</wps:LiteralData></wps:Data>
    </wps:Input>
    <wps:Input>
      <ows:Identifier>end_time</ows:Identifier>
      <wps:Data><wps:LiteralData>{end}</wps:LiteralData></wps:Data>
    </wps:Input>
    <wps:Input>
      <ows:Identifier>variables</ows:Identifier>
      <wps:Data><wps:LiteralData>F,B_NEC</wps:LiteralData></wps:Data>
    </wps:Input>
  </wps:DataInputs>
  <wps:ResponseForm>
    <wps:ResponseDocument lineage="true" storeExecuteResponse="true" status="{status}">
      <wps:Output asReference="true"><ows:Identifier>output</ows:Identifier></wps:Output>
    </wps:ResponseDocument>
  </wps:ResponseForm>
</wps:Execute>"#;

fn main() -> Result<()> {
    // Log level via RUST_LOG, e.g. `RUST_LOG=wpsclient=info`.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Configure the server via env vars or a `.viresclient.ini` file.
    let client = WpsClient::from_env()?;

    let body = |interval: &TimeInterval, asynchronous: bool| -> Result<Vec<u8>> {
        Ok(REQUEST_TEMPLATE
            .replace("{begin}", &interval.start.format("%Y-%m-%dT%H:%M:%SZ").to_string())
            .replace("{end}", &interval.end.format("%Y-%m-%dT%H:%M:%SZ").to_string())
            .replace("{status}", if asynchronous { "true" } else { "false" })
            .into_bytes())
    };

    let chunks = get_between(
        &client,
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2020, 3, 1, 0, 0, 0).unwrap(),
        &body,
        Path::new("downloads"),
        &GetOptions::default().with_sampling_step("PT1S"),
    )?;

    for chunk in &chunks {
        println!(
            "{} {} - {} ({} bytes)",
            chunk.path.display(),
            chunk.interval.start,
            chunk.interval.end,
            chunk.size
        );
    }
    Ok(())
}
