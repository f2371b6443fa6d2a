use serde::{Deserialize, Deserializer};
use uuid::Uuid;

/// Deserializes an identifier, treating the all-zero UUID as absent.
///
/// The API echoes `00000000-0000-0000-0000-000000000000` as the identifier of
/// elements that failed validation and were never stored.
pub fn nil_uuid_as_none<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Uuid>::deserialize(deserializer)?.filter(|id| !id.is_nil()))
}
