use time::{OffsetDateTime, PrimitiveDateTime, format_description::well_known::Rfc3339, macros::format_description};

/// Parses the datetime representations the API emits.
///
/// Handles the .NET JSON form (`/Date(1529443543581+0000)/`), RFC 3339, and
/// ISO timestamps without an offset (with or without fractional seconds),
/// which are taken to be UTC.
pub fn parse_dotnet_datetime(datetime_str: &str) -> Result<OffsetDateTime, String> {
    if let Some(inner) = datetime_str
        .strip_prefix("/Date(")
        .and_then(|rest| rest.strip_suffix(")/"))
    {
        let millis_str = inner
            .split(['+', '-'])
            .find(|part| !part.is_empty())
            .unwrap_or(inner);
        let millis = millis_str
            .parse::<i64>()
            .map_err(|e| format!("Invalid timestamp '{datetime_str}': {e}"))?;
        let millis = if inner.starts_with('-') { -millis } else { millis };
        return OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
            .map_err(|e| format!("Invalid timestamp: {e}"));
    }

    if let Ok(dt) = OffsetDateTime::parse(datetime_str, &Rfc3339) {
        return Ok(dt);
    }

    // e.g. "2025-03-03T06:17:25.8448470"
    let fractional = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");
    if let Ok(dt) = PrimitiveDateTime::parse(datetime_str, &fractional) {
        return Ok(dt.assume_utc());
    }

    let plain = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    if let Ok(dt) = PrimitiveDateTime::parse(datetime_str, &plain) {
        return Ok(dt.assume_utc());
    }

    Err(format!("Failed to parse datetime '{datetime_str}': no matching format"))
}

// Optional OffsetDateTime serialization
pub mod xero_datetime_format_option {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use time::{OffsetDateTime, format_description::well_known::Rfc3339};

    #[allow(clippy::ref_option)]
    pub fn serialize<S>(datetime: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match datetime {
            Some(dt) => {
                let formatted = dt.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
                serializer.serialize_str(&formatted)
            }
            None => serializer.serialize_none(),
        }
    }

    /// Lenient: an unparseable timestamp becomes `None` rather than failing the whole body.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt = Option::<String>::deserialize(deserializer)?;

        match opt {
            Some(s) if !s.is_empty() => match super::parse_dotnet_datetime(&s) {
                Ok(dt) => Ok(Some(dt)),
                Err(e) => {
                    warn!("ignoring unparseable timestamp: {e}");
                    Ok(None)
                }
            },
            _ => Ok(None),
        }
    }
}
