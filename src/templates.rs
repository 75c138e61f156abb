//! Fixed WPS Execute requests issued by the client itself.

use quick_xml::escape::escape;

const EXECUTE_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<wps:Execute version="1.0.0" service="WPS"
  xmlns:wps="http://www.opengis.net/wps/1.0.0"
  xmlns:ows="http://www.opengis.net/ows/1.1">"#;

/// Synchronous request removing an asynchronous job and its outputs.
pub fn remove_job(job_id: &str) -> Vec<u8> {
    format!(
        r#"{head}
  <ows:Identifier>vires:remove_job</ows:Identifier>
  <wps:DataInputs>
    <wps:Input>
      <ows:Identifier>job_id</ows:Identifier>
      <wps:Data>
        <wps:LiteralData>{job_id}</wps:LiteralData>
      </wps:Data>
    </wps:Input>
  </wps:DataInputs>
  <wps:ResponseForm>
    <wps:RawDataOutput>
      <ows:Identifier>success</ows:Identifier>
    </wps:RawDataOutput>
  </wps:ResponseForm>
</wps:Execute>
"#,
        head = EXECUTE_HEAD,
        job_id = escape(job_id)
    )
    .into_bytes()
}

/// Synchronous request listing the caller's asynchronous jobs as JSON.
pub fn list_jobs() -> Vec<u8> {
    format!(
        r#"{head}
  <ows:Identifier>vires:list_jobs</ows:Identifier>
  <wps:DataInputs/>
  <wps:ResponseForm>
    <wps:RawDataOutput mimeType="application/json">
      <ows:Identifier>job_list</ows:Identifier>
    </wps:RawDataOutput>
  </wps:ResponseForm>
</wps:Execute>
"#,
        head = EXECUTE_HEAD
    )
    .into_bytes()
}
