use async_trait::async_trait;
use std::path::PathBuf;
use tmscore::model::FeatureCollection;
use tmscore::{MetadataSource, SyncError, SyncResult};

const USER_HEADER: &str = "Digitraffic-User";

/// Station metadata from the road-weather HTTP API.
pub struct HttpMetadataSource {
    client: reqwest::Client,
    url: String,
}

impl HttpMetadataSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl MetadataSource for HttpMetadataSource {
    async fn fetch(&self) -> SyncResult<FeatureCollection> {
        let response = self
            .client
            .get(&self.url)
            .header(USER_HEADER, "tmsmonitor")
            .send()
            .await
            .map_err(|err| SyncError::MetadataFetch(format!("GET {}: {}", self.url, err)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::MetadataFetch(format!(
                "GET {} returned {}",
                self.url, status
            )));
        }

        response
            .json::<FeatureCollection>()
            .await
            .map_err(|err| SyncError::MetadataFetch(format!("decoding {}: {}", self.url, err)))
    }
}

/// Station metadata saved to disk as GeoJSON.
pub struct FileMetadataSource {
    path: PathBuf,
}

impl FileMetadataSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MetadataSource for FileMetadataSource {
    async fn fetch(&self) -> SyncResult<FeatureCollection> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|err| {
            SyncError::MetadataFetch(format!("reading {}: {}", self.path.display(), err))
        })?;
        serde_json::from_str(&contents).map_err(|err| {
            SyncError::MetadataFetch(format!("parsing {}: {}", self.path.display(), err))
        })
    }
}

/// Fixed collection, already in memory.
pub struct StaticMetadataSource {
    collection: FeatureCollection,
}

impl StaticMetadataSource {
    pub fn new(collection: FeatureCollection) -> Self {
        Self { collection }
    }
}

#[async_trait]
impl MetadataSource for StaticMetadataSource {
    async fn fetch(&self) -> SyncResult<FeatureCollection> {
        Ok(self.collection.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use tmscore::model::StationId;

    #[tokio::test]
    async fn file_source_reads_geojson() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            br#"{"type": "FeatureCollection", "features": [
                {"id": 23001, "geometry": {"coordinates": [24.9, 60.16, 0.0]},
                 "properties": {"roadStationId": 23001, "names": {"en": "Helsinki"}}}
            ]}"#,
        )
        .unwrap();
        let source = FileMetadataSource::new(temp.path());
        let collection = source.fetch().await.unwrap();
        assert_eq!(collection.features.len(), 1);
        assert_eq!(collection.features[0].station_id(), Some(StationId(23001)));
    }

    #[tokio::test]
    async fn missing_file_is_a_fetch_error() {
        let source = FileMetadataSource::new("/nonexistent/stations.json");
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, SyncError::MetadataFetch(_)));
    }
}
