use serde::{Deserialize, Serialize};

/// One decoded record from the backend's `data: <json>` stream.
///
/// The wire shape is `{ "type": ..., "content": ... }`; the content shape
/// depends on the tag. Types this client does not know about deserialize to
/// `Unknown` and are skipped instead of failing the stream.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
pub enum StreamRecord {
    Status(String),
    Message(String),
    Cards(CardsData),
    Error(String),
    #[serde(other)]
    Unknown,
}

/// Structured recommendation payload attached to an assistant turn.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CardsData {
    #[serde(default)]
    pub criteria: serde_json::Value,
    pub matches: Vec<CreditCard>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, rename = "totalResults")]
    pub total_results: u32,
    #[serde(default)]
    pub query: String,
}

/// A single recommended card. Only the name and issuer are required; the
/// backend omits the rest for some cards, so everything else defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreditCard {
    pub card_name: String,
    pub bank: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub annual_fee: f64,
    #[serde(default)]
    pub annual_fee_display: String,
    #[serde(default)]
    pub welcome_offer: Option<String>,
    #[serde(default)]
    pub joining_fee: String,
    #[serde(default)]
    pub reward_rate: String,
    #[serde(default)]
    pub card_type: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, rename = "relevantFeatures")]
    pub relevant_features: Vec<String>,
}
