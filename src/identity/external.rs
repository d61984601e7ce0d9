use serde::{Deserialize, Serialize};

/// Role every upserted user is created with.
pub const DEFAULT_ROLE: &str = "user";

/// Verified primary identity as reported by the external provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExternalIdentity {
    pub external_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl ExternalIdentity {
    pub fn new<S: Into<String>>(external_id: S, email: S) -> Self {
        Self { external_id: external_id.into(), email: email.into(), ..Default::default() }
    }

    pub fn with_names(mut self, first: Option<&str>, last: Option<&str>) -> Self {
        self.first_name = first.map(str::to_string);
        self.last_name = last.map(str::to_string);
        self
    }

    /// Trimmed email, or None when the provider supplied none.
    pub fn primary_email(&self) -> Option<&str> {
        let email = self.email.trim();
        if email.is_empty() { None } else { Some(email) }
    }

    /// `first + " " + last`, trimmed; missing parts count as empty.
    pub fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("");
        let last = self.last_name.as_deref().unwrap_or("");
        format!("{} {}", first, last).trim().to_string()
    }
}

/// Body of `POST /api/users`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpsertPayload {
    pub email: String,
    pub name: String,
    pub role: String,
    pub external_id: String,
}

impl UpsertPayload {
    /// Derive the payload for an identity. Returns None when there is no email to key on.
    pub fn for_identity(identity: &ExternalIdentity) -> Option<Self> {
        let email = identity.primary_email()?;
        Some(Self {
            email: email.to_string(),
            name: identity.display_name(),
            role: DEFAULT_ROLE.to_string(),
            external_id: identity.external_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_from_first_name_only() {
        let id = ExternalIdentity::new("ext_1", "a@x.com").with_names(Some("Ann"), None);
        let p = UpsertPayload::for_identity(&id).expect("payload");
        assert_eq!(p, UpsertPayload {
            email: "a@x.com".into(),
            name: "Ann".into(),
            role: "user".into(),
            external_id: "ext_1".into(),
        });
    }

    #[test]
    fn payload_name_joins_and_trims() {
        let id = ExternalIdentity::new("ext_2", " b@x.com ").with_names(Some(" Bo"), Some("Lee "));
        let p = UpsertPayload::for_identity(&id).unwrap();
        assert_eq!(p.name, "Bo Lee");
        assert_eq!(p.email, "b@x.com");

        let nameless = ExternalIdentity::new("ext_3", "c@x.com");
        assert_eq!(UpsertPayload::for_identity(&nameless).unwrap().name, "");
    }

    #[test]
    fn no_payload_without_email() {
        assert!(UpsertPayload::for_identity(&ExternalIdentity::new("ext_4", "")).is_none());
        assert!(UpsertPayload::for_identity(&ExternalIdentity::new("ext_4", "   ")).is_none());
    }

    #[test]
    fn wire_shape_is_camel_case() {
        let id = ExternalIdentity::new("ext_1", "a@x.com").with_names(Some("Ann"), None);
        let v = serde_json::to_value(UpsertPayload::for_identity(&id).unwrap()).unwrap();
        assert_eq!(v, serde_json::json!({"email":"a@x.com","name":"Ann","role":"user","externalId":"ext_1"}));

        let parsed: ExternalIdentity =
            serde_json::from_str(r#"{"externalId":"ext_9","email":"z@x.com","lastName":"Zed"}"#).unwrap();
        assert_eq!(parsed.last_name.as_deref(), Some("Zed"));
        assert!(parsed.first_name.is_none());
    }
}
