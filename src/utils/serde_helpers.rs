/// 用于处理后端文档ID的序列化/反序列化辅助模块

use serde::{Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum IdValue {
    String(String),
    Oid {
        #[serde(rename = "$oid")]
        oid: String,
    },
    Document {
        #[serde(rename = "_id", alias = "id")]
        id: String,
    },
}

impl From<IdValue> for String {
    fn from(value: IdValue) -> Self {
        match value {
            IdValue::String(s) => s,
            IdValue::Oid { oid } => oid,
            IdValue::Document { id } => id,
        }
    }
}

/// 处理文档ID的多种格式 (例如: "65f0…", {"$oid": "65f0…"} 或已展开的 {"_id": "65f0…", …})
pub mod object_id {
    use super::*;

    pub fn serialize<S>(id: &str, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(id)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(IdValue::deserialize(deserializer)?.into())
    }

    /// 可选的文档ID
    pub mod option {
        use super::*;

        pub fn serialize<S>(id: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match id {
                Some(id) => serializer.serialize_some(id),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Ok(Option::<IdValue>::deserialize(deserializer)?.map(Into::into))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Debug, Serialize, Deserialize)]
    struct Doc {
        #[serde(with = "object_id")]
        id: String,
        #[serde(default, with = "object_id::option")]
        owner: Option<String>,
    }

    #[test]
    fn test_plain_and_extended_ids() {
        let doc: Doc = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
        assert_eq!(doc.id, "abc");
        assert_eq!(doc.owner, None);

        let doc: Doc =
            serde_json::from_str(r#"{"id": {"$oid": "65f0"}, "owner": {"_id": "u1", "username": "amy"}}"#)
                .unwrap();
        assert_eq!(doc.id, "65f0");
        assert_eq!(doc.owner.as_deref(), Some("u1"));
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let doc = Doc {
            id: "abc".to_string(),
            owner: Some("u1".to_string()),
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value, serde_json::json!({"id": "abc", "owner": "u1"}));
    }
}
