use serde_json::Value;

/// The decoded contents of a student badge: a JSON object carrying the
/// student id and name. Extra fields (issue timestamps and the like) are
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPayload {
    pub student_id: String,
    pub name: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum PayloadError {
    /// The scanned text is not a JSON object at all.
    NotStructured,
    /// Parsed fine but a required field is absent or empty.
    MissingField(&'static str),
}

impl std::fmt::Display for PayloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadError::NotStructured => write!(f, "Scanned code is not a student badge"),
            PayloadError::MissingField(field) => {
                write!(f, "Scanned badge is missing the {field} field")
            }
        }
    }
}

impl ScanPayload {
    /// Decode scanned text. Badges printed by older releases carry the
    /// student id as a number, so both forms are accepted.
    pub fn parse(text: &str) -> Result<Self, PayloadError> {
        let value: Value =
            serde_json::from_str(text).map_err(|_| PayloadError::NotStructured)?;
        let obj = value.as_object().ok_or(PayloadError::NotStructured)?;

        let student_id = match obj.get("student_id") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(PayloadError::MissingField("student_id")),
        };

        let name = match obj.get("name") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            _ => return Err(PayloadError::MissingField("name")),
        };

        Ok(ScanPayload { student_id, name })
    }
}
