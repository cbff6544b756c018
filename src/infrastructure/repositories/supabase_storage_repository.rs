use async_trait::async_trait;

use super::storage_repository::StorageRepository;

/// Supabase Storage implementation of the artifact store.
///
/// Talks to the Storage REST API with a service key. Uploads go to
/// `{base}/storage/v1/object/{bucket}/{path}`; a duplicate object is cleared
/// with a delete and rewritten once.
pub struct SupabaseStorageRepository {
    base_url: String,
    service_key: String,
    bucket: String,
    http_client: reqwest::Client,
}

impl SupabaseStorageRepository {
    pub fn new(base_url: String, service_key: String, bucket: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            bucket,
            http_client: reqwest::Client::new(),
        }
    }

    fn object_url(&self, path: &str) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            self.bucket,
            encoded.join("/")
        )
    }

    async fn upload(
        &self,
        url: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<reqwest::StatusCode, String> {
        let response = self
            .http_client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| format!("storage upload request failed: {}", e))?;

        Ok(response.status())
    }

    async fn delete(&self, url: &str) -> Result<(), String> {
        let response = self
            .http_client
            .delete(url)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .send()
            .await
            .map_err(|e| format!("storage delete request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!(
                "storage delete rejected with status {}",
                response.status()
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl StorageRepository for SupabaseStorageRepository {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), String> {
        let url = self.object_url(path);

        let status = self.upload(&url, bytes.clone(), content_type).await?;
        if status.is_success() {
            tracing::info!(path, "artifact uploaded");
            return Ok(());
        }

        if status == reqwest::StatusCode::CONFLICT {
            // Duplicate object at this path; clear it so the fresh bytes win.
            tracing::warn!(path, "object already exists, deleting and re-uploading");
            self.delete(&url).await?;

            let retry_status = self.upload(&url, bytes, content_type).await?;
            if retry_status.is_success() {
                tracing::info!(path, "artifact re-uploaded after delete");
                return Ok(());
            }
            return Err(format!(
                "storage re-upload rejected with status {}",
                retry_status
            ));
        }

        Err(format!("storage upload rejected with status {}", status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn repo() -> SupabaseStorageRepository {
        SupabaseStorageRepository::new(
            "https://project.supabase.co/".to_string(),
            "service-key".to_string(),
            "audios".to_string(),
        )
    }

    #[test]
    fn test_object_url_joins_bucket_and_path() {
        let url = repo().object_url("A1/G1/casa.wav");
        assert_eq!(
            url,
            "https://project.supabase.co/storage/v1/object/audios/A1/G1/casa.wav"
        );
    }

    #[test]
    fn test_object_url_encodes_segments_but_keeps_separators() {
        let url = repo().object_url("A1/G1 - saludos/buenos dias.wav");
        assert_eq!(
            url,
            "https://project.supabase.co/storage/v1/object/audios/A1/G1%20-%20saludos/buenos%20dias.wav"
        );
    }
}
