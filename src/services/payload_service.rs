use std::collections::BTreeMap;
use std::io::{Read, Write};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::AppError;
use crate::models::tree::ProxyName;

pub type Rows = BTreeMap<usize, String>;

pub fn encode_rows(rows: &Rows) -> Result<String, AppError> {
    let json = serde_json::to_vec(rows)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    let compressed = encoder.finish()?;
    Ok(STANDARD.encode(compressed))
}

pub fn decode_rows(payload: &str) -> Result<Rows, AppError> {
    let compressed = STANDARD
        .decode(payload.trim())
        .map_err(|e| AppError::General(format!("invalid base64 payload: {e}")))?;
    let mut json = Vec::new();
    GzDecoder::new(compressed.as_slice()).read_to_end(&mut json)?;
    Ok(serde_json::from_slice(&json)?)
}

pub fn script_data_html(
    tabname: &str,
    extra_networks_tabname: &str,
    proxy: ProxyName,
    rows: &Rows,
) -> Result<String, AppError> {
    Ok(format!(
        r#"<div class="extra-networks-script-data" data-tabname-full="{tabname}_{extra_networks_tabname}" data-proxy-name="{proxy}" data-json="{payload}" hidden></div>"#,
        payload = encode_rows(rows)?,
    ))
}
