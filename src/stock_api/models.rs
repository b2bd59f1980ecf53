use serde::Deserialize;

/// Response body of `GET /item/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Item {
    pub uuid: String,
    pub name: String,
    pub quantity: i64,
}
