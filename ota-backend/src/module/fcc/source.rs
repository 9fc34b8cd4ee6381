use crate::error::{TunerError, TunerResult};
use async_trait::async_trait;
use reqwest::Client;
use std::io::{Cursor, Read};
use std::time::Duration;

pub const FACILITIES_URL: &str =
    "https://transition.fcc.gov/ftp/Bureaus/MB/Databases/cdbs/facility.zip";

const FACILITY_FILE: &str = "facility.dat";
const DOWNLOAD_TIMEOUT_SECONDS: u64 = 300;

/// Source of the compressed facility archive
#[async_trait]
pub trait FacilitySource: Send + Sync {
    async fn download(&self) -> TunerResult<Vec<u8>>;
}

/// Downloads the archive over HTTP
pub struct HttpFacilitySource {
    client: Client,
    url: String,
}

impl HttpFacilitySource {
    pub fn new() -> TunerResult<Self> {
        Self::with_url(FACILITIES_URL)
    }

    pub fn with_url(url: impl Into<String>) -> TunerResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECONDS))
            .build()
            .map_err(|e| TunerError::fetch("facility archive", e))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl FacilitySource for HttpFacilitySource {
    async fn download(&self) -> TunerResult<Vec<u8>> {
        tracing::info!("Downloading FCC facilities from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| TunerError::fetch("facility archive", e))?;

        if !response.status().is_success() {
            return Err(TunerError::fetch(
                "facility archive",
                format!("HTTP error {}", response.status()),
            ));
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| TunerError::fetch("facility archive", e))?;

        tracing::info!("Downloaded {} bytes of facility data", data.len());
        Ok(data.to_vec())
    }
}

/// Extract the facility flat file from the archive
pub fn unzip_facilities(data: &[u8]) -> TunerResult<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))
        .map_err(|e| TunerError::Archive(format!("not a zip archive: {}", e)))?;

    let mut file = archive
        .by_name(FACILITY_FILE)
        .map_err(|e| TunerError::Archive(format!("{} missing: {}", FACILITY_FILE, e)))?;

    let mut bytes = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut bytes)
        .map_err(|e| TunerError::Archive(format!("failed to read {}: {}", FACILITY_FILE, e)))?;

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    pub(crate) fn zip_facilities(name: &str, content: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file(name, SimpleFileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_unzip() {
        let data = zip_facilities("facility.dat", "line one\nline two\n");
        assert_eq!(unzip_facilities(&data).unwrap(), "line one\nline two\n");
    }

    #[test]
    fn test_unzip_missing_member() {
        let data = zip_facilities("other.dat", "x");
        assert!(matches!(unzip_facilities(&data), Err(TunerError::Archive(_))));
    }

    #[test]
    fn test_unzip_garbage() {
        let err = unzip_facilities(b"definitely not a zip").unwrap_err();
        assert!(err.is_fatal());
    }
}
