use bson::oid::ObjectId;

use crate::error::AppError;

/// Parse a path segment as a MongoDB ObjectId.
pub fn parse_object_id(raw: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(raw).map_err(|_| AppError::BadRequest(format!("Invalid id '{raw}'")))
}

/// Parse an optional reference field; blank strings count as absent.
pub fn parse_optional_id(raw: Option<&str>) -> Result<Option<ObjectId>, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(id) => parse_object_id(id).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_id() {
        let id = ObjectId::new();
        assert_eq!(parse_object_id(&id.to_hex()).unwrap(), id);
        assert!(matches!(
            parse_object_id("not-an-id"),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_parse_optional_id() {
        assert_eq!(parse_optional_id(None).unwrap(), None);
        assert_eq!(parse_optional_id(Some("  ")).unwrap(), None);
        assert!(parse_optional_id(Some("zzz")).is_err());
    }
}
