use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One source as listed by the internal API.
///
/// Every field tolerates `null` or absence and falls back to the empty string;
/// an empty `availability_status` means the source has never been checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    /// Legacy tenant (account number).
    #[serde(rename = "tenant", default, deserialize_with = "null_as_default")]
    pub tenant_account: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub org_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub availability_status: String,
}

// ---------------------------------------------------------------------------
// Page / PageMeta
// ---------------------------------------------------------------------------

/// Pagination metadata reported by the server for a single listing call.
///
/// `count` is the collection size at the time of the fetch and may differ
/// between pages of the same run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub count: u64,
    pub limit: u64,
    pub offset: u64,
}

/// One page of the `GET /internal/v2.0/sources` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    #[serde(rename = "data", default, deserialize_with = "null_as_default")]
    pub records: Vec<Record>,
    pub meta: PageMeta,
}

impl Page {
    pub fn count(&self) -> u64 {
        self.meta.count
    }

    pub fn limit(&self) -> u64 {
        self.meta.limit
    }

    pub fn offset(&self) -> u64 {
        self.meta.offset
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
