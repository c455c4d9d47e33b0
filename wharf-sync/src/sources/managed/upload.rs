//! Staging saved content in object storage ahead of an import job.

use std::{path::Path, time::Duration};

use log::{debug, info};
use uuid::Uuid;
use wharf_core::{
    Content, DataSourceError, DestinationOverride, FormatType, ImportSource, ObjectStore,
    StorageDescriptor, StorageKind, UploadDestination, normalise_prefix,
};

/// Pick the bucket, prefix, and region an upload should land in.
///
/// A complete override wins. Otherwise the dataset must live in user-owned
/// storage that names its bucket, raw path, and region.
pub(crate) fn resolve_destination(
    storage: &StorageDescriptor,
    destination: Option<&DestinationOverride>,
) -> Result<UploadDestination, DataSourceError> {
    if let Some(explicit) = destination.filter(|candidate| candidate.is_complete()) {
        return Ok(UploadDestination {
            bucket: explicit.bucket.clone(),
            prefix: normalise_prefix(&explicit.path),
            region: explicit.region.clone(),
        });
    }
    match storage.kind {
        StorageKind::PublicManaged => Err(DataSourceError::Unsupported {
            operation: "uploading to platform-managed storage",
            reason: "supply a destination bucket, path, and region".to_owned(),
        }),
        StorageKind::PrivateUserOwned => {
            let present = |value: Option<&String>| value.filter(|text| !text.is_empty()).cloned();
            match (
                present(Some(&storage.bucket)),
                present(storage.raw_path.as_ref()),
                present(storage.region.as_ref()),
            ) {
                (Some(bucket), Some(raw_path), Some(region)) => Ok(UploadDestination {
                    bucket,
                    prefix: normalise_prefix(&raw_path),
                    region,
                }),
                _ => Err(DataSourceError::invalid_argument(
                    "dataset storage lacks a bucket, raw path, or region",
                )),
            }
        }
    }
}

fn object_key(destination: &UploadDestination, name: &str) -> String {
    format!("{}{name}", destination.prefix.trim_start_matches('/'))
}

/// Write inline content as a new object and describe it for the importer.
pub(crate) fn upload_content(
    store: &dyn ObjectStore,
    destination: &UploadDestination,
    content: Content,
    format: FormatType,
) -> Result<ImportSource, DataSourceError> {
    let extension = match format {
        FormatType::Text => "txt",
        FormatType::Jsonl | FormatType::Json => "jsonl",
    };
    let key = object_key(destination, &format!("data_{}.{extension}", Uuid::new_v4()));
    let payload = content.into_payload(format);
    store.put_object_from_string(&destination.bucket, &key, &payload)?;
    info!("uploaded {} bytes to {}/{key}", payload.len(), destination.bucket);
    Ok(ImportSource::ObjectStoreFile(format!(
        "/{}/{key}",
        destination.bucket
    )))
}

/// Upload a local archive and share it with the importer through a signed URL.
pub(crate) fn upload_archive(
    store: &dyn ObjectStore,
    destination: &UploadDestination,
    archive: &Path,
    ttl: Duration,
) -> Result<ImportSource, DataSourceError> {
    let name = archive
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            DataSourceError::invalid_argument(format!(
                "archive path {} has no UTF-8 file name",
                archive.display()
            ))
        })?;
    let key = object_key(destination, name);
    store.put_object_from_file(&destination.bucket, &key, archive)?;
    info!("uploaded archive {} to {}/{key}", archive.display(), destination.bucket);
    let url = store.generate_shared_url(&destination.bucket, &key, ttl)?;
    debug!("shared {}/{key} for {}s", destination.bucket, ttl.as_secs());
    Ok(ImportSource::SharedZipUrl(url))
}
