use serde::Deserialize;

/// POST /habits body. Missing `name` deserializes to an empty string so the
/// store's non-empty check produces the 400 instead of a serde rejection.
#[derive(Debug, Deserialize)]
pub struct CreateHabitRequest {
    #[serde(default)]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_name_defaults_to_empty() {
        let req: CreateHabitRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.name, "");
    }

    #[test]
    fn name_is_taken_verbatim() {
        let req: CreateHabitRequest = serde_json::from_str(r#"{"name":"  Run  "}"#).unwrap();
        assert_eq!(req.name, "  Run  ");
    }
}
