use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use apikit::{Data, FieldDescriptor, Model, Record};

pub const USERNAME_MAX: usize = 150;
pub const NAME_MAX: usize = 150;
pub const EMAIL_MAX: usize = 254;

/// A site account.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    pub id: Option<i64>,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_staff: bool,
    /// Set on first save when missing.
    pub date_joined: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Default::default()
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn short_name(&self) -> String {
        self.first_name.clone()
    }
}

impl Record for User {
    fn resource(&self) -> &str {
        "user"
    }

    fn pk(&self) -> Option<Value> {
        self.id.map(Value::from)
    }

    fn attr(&self, name: &str) -> Option<Data> {
        let value = match name {
            "id" => Data::from(self.id),
            "username" => Data::from(self.username.clone()),
            "email" => Data::from(self.email.clone()),
            "first_name" => Data::from(self.first_name.clone()),
            "last_name" => Data::from(self.last_name.clone()),
            "is_active" => Data::from(self.is_active),
            "is_staff" => Data::from(self.is_staff),
            "date_joined" => Data::from(self.date_joined.map(|d| d.to_rfc3339())),
            "get_full_name" => {
                let full = self.full_name();
                Data::callable(move || Data::from(full.clone()))
            }
            "get_short_name" => {
                let short = self.short_name();
                Data::callable(move || Data::from(short.clone()))
            }
            _ => return None,
        };
        Some(value)
    }

    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "username": self.username,
            "email": self.email,
            "first_name": self.first_name,
            "last_name": self.last_name,
            "is_active": self.is_active,
            "is_staff": self.is_staff,
            "date_joined": self.date_joined.map(|d| d.to_rfc3339()),
        })
    }
}

fn text(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Null => Ok(String::new()),
        _ => Err("expected a string".to_string()),
    }
}

fn flag(value: &Value) -> Result<bool, String> {
    value
        .as_bool()
        .ok_or_else(|| "expected true or false".to_string())
}

impl Model for User {
    fn field_descriptors() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::primary_key("id"),
            FieldDescriptor::plain("username"),
            FieldDescriptor::plain("email"),
            FieldDescriptor::plain("first_name"),
            FieldDescriptor::plain("last_name"),
            FieldDescriptor::plain("is_active"),
            FieldDescriptor::plain("is_staff"),
            FieldDescriptor::plain("date_joined"),
        ]
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn set_field(&mut self, name: &str, value: &Value) -> Result<(), String> {
        match name {
            "username" => self.username = text(value)?,
            "email" => self.email = text(value)?,
            "first_name" => self.first_name = text(value)?,
            "last_name" => self.last_name = text(value)?,
            "is_active" => self.is_active = flag(value)?,
            "is_staff" => self.is_staff = flag(value)?,
            "date_joined" => {
                let raw = text(value)?;
                let parsed = DateTime::parse_from_rfc3339(&raw)
                    .map_err(|_| "expected an RFC 3339 timestamp".to_string())?;
                self.date_joined = Some(parsed.with_timezone(&Utc));
            }
            _ => return Err("not writable".to_string()),
        }
        Ok(())
    }

    fn full_clean(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let username = self.username.trim();
        if username.is_empty() {
            errors.push("username: This field cannot be blank.".to_string());
        } else if username.chars().count() > USERNAME_MAX {
            errors.push(format!(
                "username: Ensure this value has at most {USERNAME_MAX} characters."
            ));
        } else if !username
            .chars()
            .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
        {
            errors.push(
                "username: Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                    .to_string(),
            );
        }

        if !self.email.is_empty() {
            if self.email.chars().count() > EMAIL_MAX {
                errors.push(format!(
                    "email: Ensure this value has at most {EMAIL_MAX} characters."
                ));
            }
            let valid = self
                .email
                .split_once('@')
                .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
            if !valid {
                errors.push("email: Enter a valid email address.".to_string());
            }
        }

        for (field, value) in [("first_name", &self.first_name), ("last_name", &self.last_name)] {
            if value.chars().count() > NAME_MAX {
                errors.push(format!(
                    "{field}: Ensure this value has at most {NAME_MAX} characters."
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apikit::resolve;

    fn alice() -> User {
        User {
            id: Some(3),
            username: "alice".into(),
            email: "alice@example.org".into(),
            first_name: "Alice".into(),
            last_name: "Liddell".into(),
            ..Default::default()
        }
    }

    #[test]
    fn computed_names_resolve_through_callables() {
        let data = Data::record(alice());
        assert_eq!(resolve("get_full_name", &data).unwrap().to_json(), json!("Alice Liddell"));
        assert_eq!(resolve("+get_short_name", &data).unwrap().to_json(), json!("Alice"));
    }

    #[test]
    fn valid_user_passes_clean() {
        assert!(alice().full_clean().is_ok());
        assert!(User::new("a.b+c@d-e_f").full_clean().is_ok());
    }

    #[test]
    fn username_rules() {
        let errs = User::new("").full_clean().unwrap_err();
        assert_eq!(errs, vec!["username: This field cannot be blank."]);

        let errs = User::new("bad name!").full_clean().unwrap_err();
        assert!(errs[0].starts_with("username: Enter a valid username."));

        let errs = User::new("x".repeat(151)).full_clean().unwrap_err();
        assert!(errs[0].contains("at most 150"));
    }

    #[test]
    fn email_rules() {
        let mut user = User::new("bob");
        user.email = "not-an-address".into();
        assert_eq!(
            user.full_clean().unwrap_err(),
            vec!["email: Enter a valid email address."]
        );
        user.email = String::new();
        assert!(user.full_clean().is_ok());
    }

    #[test]
    fn set_field_checks_types() {
        let mut user = User::default();
        assert!(user.set_field("is_staff", &json!(true)).is_ok());
        assert!(user.is_staff);
        assert_eq!(
            user.set_field("is_active", &json!("yes")),
            Err("expected true or false".to_string())
        );
        assert!(user.set_field("date_joined", &json!("2024-01-02T03:04:05Z")).is_ok());
        assert!(user.date_joined.is_some());
        assert!(user.set_field("date_joined", &json!("yesterday")).is_err());
    }
}
