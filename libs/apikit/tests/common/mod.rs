#![allow(dead_code)]

use apikit::{Data, FieldDescriptor, Model, Record};
use serde_json::{json, Value};

/// Small model used across the integration tests.
#[derive(Debug, Clone, Default)]
pub struct Note {
    pub id: Option<i64>,
    pub title: String,
    pub done: bool,
}

impl Record for Note {
    fn resource(&self) -> &str {
        "note"
    }

    fn pk(&self) -> Option<Value> {
        self.id.map(Value::from)
    }

    fn attr(&self, name: &str) -> Option<Data> {
        match name {
            "id" => Some(Data::from(self.id)),
            "title" => Some(Data::from(self.title.clone())),
            "done" => Some(Data::from(self.done)),
            "shout" => {
                let title = self.title.to_uppercase();
                Some(Data::callable(move || Data::from(title.clone())))
            }
            _ => None,
        }
    }

    fn to_json(&self) -> Value {
        json!({ "id": self.id, "title": self.title, "done": self.done })
    }
}

impl Model for Note {
    fn field_descriptors() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::primary_key("id"),
            FieldDescriptor::plain("title"),
            FieldDescriptor::plain("done"),
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
            "title" => {
                self.title = value.as_str().ok_or("expected a string")?.to_string();
            }
            "done" => {
                self.done = value.as_bool().ok_or("expected a boolean")?;
            }
            _ => return Err("not writable".to_string()),
        }
        Ok(())
    }

    fn full_clean(&self) -> Result<(), Vec<String>> {
        if self.title.trim().is_empty() {
            Err(vec!["title: This field cannot be blank.".to_string()])
        } else {
            Ok(())
        }
    }
}
