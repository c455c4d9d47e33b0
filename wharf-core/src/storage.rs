//! Object-storage descriptors, credentials, and upload destinations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::DataSourceError;

/// Who owns the bucket backing a managed dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageKind {
    /// Storage owned and operated by the platform.
    PublicManaged,
    /// A bucket owned by the user.
    PrivateUserOwned,
}

/// Remote storage backing a managed dataset.
///
/// Private descriptors always carry a region and raw path; use
/// [`StorageDescriptor::private`] to enforce that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageDescriptor {
    /// Storage ownership.
    pub kind: StorageKind,
    /// Bucket identifier.
    pub bucket: String,
    /// Object prefix within the bucket, always ending with `/`.
    pub path_prefix: String,
    /// Display name of the storage.
    #[serde(default)]
    pub name: String,
    /// Region hosting the bucket.
    #[serde(default)]
    pub region: Option<String>,
    /// Prefix as originally supplied by the user.
    #[serde(default)]
    pub raw_path: Option<String>,
}

impl StorageDescriptor {
    /// Describe platform-managed storage.
    pub fn public(bucket: impl Into<String>, path_prefix: &str, name: impl Into<String>) -> Self {
        Self {
            kind: StorageKind::PublicManaged,
            bucket: bucket.into(),
            path_prefix: normalise_prefix(path_prefix),
            name: name.into(),
            region: None,
            raw_path: None,
        }
    }

    /// Describe a user-owned bucket, requiring region and raw path.
    ///
    /// # Examples
    /// ```
    /// use wharf_core::StorageDescriptor;
    ///
    /// let storage = StorageDescriptor::private("bucket", "data", "mine", "bj", "/data")?;
    /// assert_eq!(storage.path_prefix, "data/");
    /// assert!(StorageDescriptor::private("bucket", "data", "mine", "", "/data").is_err());
    /// # Ok::<(), wharf_core::DataSourceError>(())
    /// ```
    pub fn private(
        bucket: impl Into<String>,
        path_prefix: &str,
        name: impl Into<String>,
        region: impl Into<String>,
        raw_path: impl Into<String>,
    ) -> Result<Self, DataSourceError> {
        let region_value = region.into();
        let raw_value = raw_path.into();
        if region_value.trim().is_empty() || raw_value.trim().is_empty() {
            return Err(DataSourceError::invalid_argument(
                "private storage requires both a region and a raw path",
            ));
        }
        Ok(Self {
            kind: StorageKind::PrivateUserOwned,
            bucket: bucket.into(),
            path_prefix: normalise_prefix(path_prefix),
            name: name.into(),
            region: Some(region_value),
            raw_path: Some(raw_value),
        })
    }
}

/// Force an object prefix to end with a path separator.
///
/// # Examples
/// ```
/// use wharf_core::normalise_prefix;
///
/// assert_eq!(normalise_prefix("exports"), "exports/");
/// assert_eq!(normalise_prefix("exports/"), "exports/");
/// ```
#[must_use]
pub fn normalise_prefix(prefix: &str) -> String {
    if prefix.ends_with('/') {
        prefix.to_owned()
    } else {
        format!("{prefix}/")
    }
}

/// Access key pair used for object storage.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Public access key.
    pub access_key: String,
    /// Secret key paired with the access key.
    pub secret_key: String,
}

impl Credentials {
    /// Construct a credential pair.
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Resolve credentials field by field: explicit values win over
    /// process-wide defaults. Returns `None` when either key is unavailable.
    ///
    /// # Examples
    /// ```
    /// use wharf_core::Credentials;
    ///
    /// let resolved = Credentials::resolve(Some("ak"), None, None, Some("sk-default"));
    /// assert_eq!(resolved, Some(Credentials::new("ak", "sk-default")));
    /// assert_eq!(Credentials::resolve(None, Some("sk"), None, None), None);
    /// ```
    #[must_use]
    pub fn resolve(
        explicit_access: Option<&str>,
        explicit_secret: Option<&str>,
        default_access: Option<&str>,
        default_secret: Option<&str>,
    ) -> Option<Self> {
        let pick = |explicit: Option<&str>, fallback: Option<&str>| {
            explicit
                .filter(|value| !value.is_empty())
                .or_else(|| fallback.filter(|value| !value.is_empty()))
                .map(str::to_owned)
        };
        let access_key = pick(explicit_access, default_access)?;
        let secret_key = pick(explicit_secret, default_secret)?;
        Some(Self {
            access_key,
            secret_key,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Explicit upload destination overriding a dataset's own storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationOverride {
    /// Bucket to upload into.
    pub bucket: String,
    /// Object prefix within the bucket.
    pub path: String,
    /// Region hosting the bucket.
    pub region: String,
}

impl DestinationOverride {
    /// Construct an override.
    pub fn new(
        bucket: impl Into<String>,
        path: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            path: path.into(),
            region: region.into(),
        }
    }

    /// Whether every component is populated.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.bucket.is_empty() && !self.path.is_empty() && !self.region.is_empty()
    }
}

/// Fully resolved upload target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadDestination {
    /// Bucket to upload into.
    pub bucket: String,
    /// Object prefix ending with `/`.
    pub prefix: String,
    /// Region hosting the bucket.
    pub region: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn debug_output_redacts_secret() {
        let credentials = Credentials::new("ak", "very-secret");
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("ak"));
        assert!(!rendered.contains("very-secret"));
    }

    #[rstest]
    #[case(Some("ak"), Some("sk"), Some("ak0"), Some("sk0"), Some(("ak", "sk")))]
    #[case(None, None, Some("ak0"), Some("sk0"), Some(("ak0", "sk0")))]
    #[case(Some(""), Some("sk"), Some("ak0"), None, Some(("ak0", "sk")))]
    #[case(None, None, None, Some("sk0"), None)]
    fn resolves_per_field(
        #[case] access: Option<&str>,
        #[case] secret: Option<&str>,
        #[case] default_access: Option<&str>,
        #[case] default_secret: Option<&str>,
        #[case] expected: Option<(&str, &str)>,
    ) {
        let resolved = Credentials::resolve(access, secret, default_access, default_secret);
        assert_eq!(
            resolved,
            expected.map(|(ak, sk)| Credentials::new(ak, sk))
        );
    }

    #[rstest]
    fn override_completeness() {
        assert!(DestinationOverride::new("b", "p", "r").is_complete());
        assert!(!DestinationOverride::new("b", "", "r").is_complete());
    }
}
