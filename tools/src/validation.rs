use jsonschema::JSONSchema;

/// Validates `arguments` against a tool's declared draft-07 schema
/// subset (spec §6), returning the validator's error messages joined into
/// one string suitable for `ToolExecutionResult::error`.
pub fn validate_arguments(schema: &serde_json::Value, arguments: &serde_json::Value) -> Result<(), String> {
    let compiled = JSONSchema::compile(schema).map_err(|err| format!("invalid tool schema: {err}"))?;
    let result = compiled.validate(arguments);
    match result {
        Ok(()) => Ok(()),
        Err(errors) => {
            let joined = errors.map(|e| e.to_string()).collect::<Vec<_>>().join("; ");
            Err(joined)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_matching_arguments() {
        let schema = json!({
            "type": "object",
            "properties": { "text": { "type": "string" } },
            "required": ["text"],
        });
        assert!(validate_arguments(&schema, &json!({ "text": "abc" })).is_ok());
    }

    #[test]
    fn rejects_missing_required_field() {
        let schema = json!({
            "type": "object",
            "properties": { "text": { "type": "string" } },
            "required": ["text"],
        });
        assert!(validate_arguments(&schema, &json!({})).is_err());
    }

    #[test]
    fn rejects_wrong_type() {
        let schema = json!({
            "type": "object",
            "properties": { "count": { "type": "integer" } },
            "required": ["count"],
        });
        assert!(validate_arguments(&schema, &json!({ "count": "not a number" })).is_err());
    }
}
