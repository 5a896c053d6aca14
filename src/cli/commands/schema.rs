//! Schema command implementation.

use permsync_lib::SchemeRecord;
use schemars::schema_for;

use crate::error::Result;

/// Print the JSON Schema of one export record.
///
/// # Errors
///
/// Returns an error if the schema cannot be serialized.
pub fn execute() -> Result<()> {
    let schema = schema_for!(SchemeRecord);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_schema_lists_role_fields() {
        let schema = serde_json::to_value(schema_for!(SchemeRecord)).unwrap();
        let properties = &schema["properties"];
        assert!(properties.get("default_channel_user_role").is_some());
        assert!(properties.get("roles").is_some());
        assert_eq!(schema["title"], "SchemeRecord");
    }
}
