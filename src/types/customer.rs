//! Customer record as it arrives from a CSV row or a JSON message

use crate::error::{ChurnError, Result};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Categorical columns that go through the encoder registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CategoricalField {
    #[serde(rename = "Gender")]
    Gender,
    #[serde(rename = "Income")]
    Income,
    #[serde(rename = "Country")]
    Country,
    #[serde(rename = "Feedback")]
    Feedback,
    #[serde(rename = "Order_Status")]
    OrderStatus,
}

impl CategoricalField {
    /// All categorical fields, in feature-vector order.
    pub const ALL: [CategoricalField; 5] = [
        CategoricalField::Gender,
        CategoricalField::Income,
        CategoricalField::Country,
        CategoricalField::Feedback,
        CategoricalField::OrderStatus,
    ];

    /// Source column name
    pub fn name(self) -> &'static str {
        match self {
            CategoricalField::Gender => "Gender",
            CategoricalField::Income => "Income",
            CategoricalField::Country => "Country",
            CategoricalField::Feedback => "Feedback",
            CategoricalField::OrderStatus => "Order_Status",
        }
    }
}

impl fmt::Display for CategoricalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Numeric columns, coerced to `f64` before reaching the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericField {
    Age,
    TotalAmount,
    Ratings,
}

impl NumericField {
    /// Source column name
    pub fn name(self) -> &'static str {
        match self {
            NumericField::Age => "Age",
            NumericField::TotalAmount => "Total_Amount",
            NumericField::Ratings => "Ratings",
        }
    }
}

/// A numeric cell that keeps the text it was received as.
///
/// Missing and blank cells are `None`. The lenient value of anything that
/// does not parse to a finite number is `0.0`, the same imputation the
/// training job applies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericValue {
    raw: Option<String>,
}

impl NumericValue {
    /// A cell with no value
    pub fn missing() -> Self {
        Self { raw: None }
    }

    /// Raw text of the cell, if one was provided
    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    /// Parsed value, `None` when absent or unparseable
    pub fn parsed(&self) -> Option<f64> {
        self.raw
            .as_deref()
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }

    /// Lenient coercion: missing or unparseable becomes `0.0`
    pub fn value(&self) -> f64 {
        self.parsed().unwrap_or(0.0)
    }

    /// Strict coercion: missing still imputes `0.0`, garbage is rejected
    pub fn strict(&self, field: NumericField) -> Result<f64> {
        match self.raw.as_deref() {
            None => Ok(0.0),
            Some(raw) => self.parsed().ok_or_else(|| ChurnError::MalformedRecord {
                field: field.name().to_string(),
                value: raw.to_string(),
            }),
        }
    }

    fn from_text(text: &str) -> Self {
        if text.trim().is_empty() {
            Self::missing()
        } else {
            Self {
                raw: Some(text.to_string()),
            }
        }
    }
}

impl From<f64> for NumericValue {
    fn from(value: f64) -> Self {
        Self {
            raw: Some(value.to_string()),
        }
    }
}

impl From<i64> for NumericValue {
    fn from(value: i64) -> Self {
        Self {
            raw: Some(value.to_string()),
        }
    }
}

impl From<&str> for NumericValue {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

impl Serialize for NumericValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match (self.parsed(), self.raw.as_deref()) {
            (Some(v), _) => serializer.serialize_f64(v),
            (None, Some(raw)) => serializer.serialize_str(raw),
            (None, None) => serializer.serialize_none(),
        }
    }
}

struct NumericVisitor;

impl<'de> Visitor<'de> for NumericVisitor {
    type Value = NumericValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number, a numeric string or null")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Self::Value, E> {
        Ok(NumericValue::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Self::Value, E> {
        Ok(NumericValue::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
        Ok(NumericValue {
            raw: Some(v.to_string()),
        })
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<Self::Value, E> {
        Ok(NumericValue {
            raw: Some(v.to_string()),
        })
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
        Ok(NumericValue::from_text(v))
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(NumericValue::missing())
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(NumericValue::missing())
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> std::result::Result<Self::Value, D::Error> {
        d.deserialize_any(NumericVisitor)
    }
}

impl<'de> Deserialize<'de> for NumericValue {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        d.deserialize_any(NumericVisitor)
    }
}

/// Accepts strings, numbers, booleans and null; null becomes empty.
struct TextVisitor;

impl<'de> Visitor<'de> for TextVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, a number or null")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
        Ok(v.to_string())
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Self::Value, E> {
        Ok(v)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Self::Value, E> {
        Ok(v.to_string())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Self::Value, E> {
        Ok(v.to_string())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
        Ok(v.to_string())
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<Self::Value, E> {
        Ok(v.to_string())
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(String::new())
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(String::new())
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> std::result::Result<Self::Value, D::Error> {
        d.deserialize_any(TextVisitor)
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    d.deserialize_any(TextVisitor)
}

fn optional_text<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    let text = d.deserialize_any(TextVisitor)?;
    Ok(if text.is_empty() { None } else { Some(text) })
}

/// Raw retail customer record.
///
/// Field names on the wire are the source column names. Unknown columns are
/// ignored and missing ones take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    #[serde(rename = "Name", default, deserialize_with = "lenient_text")]
    pub name: String,

    #[serde(rename = "Email", default, deserialize_with = "lenient_text")]
    pub email: String,

    #[serde(rename = "Gender", default, deserialize_with = "lenient_text")]
    pub gender: String,

    /// Income band, e.g. "Low", "Medium", "High"
    #[serde(rename = "Income", default, deserialize_with = "lenient_text")]
    pub income: String,

    #[serde(rename = "Age", default)]
    pub age: NumericValue,

    #[serde(rename = "Country", default, deserialize_with = "lenient_text")]
    pub country: String,

    /// Lifetime spend
    #[serde(rename = "Total_Amount", default)]
    pub total_amount: NumericValue,

    #[serde(rename = "Feedback", default, deserialize_with = "lenient_text")]
    pub feedback: String,

    #[serde(rename = "Order_Status", default, deserialize_with = "lenient_text")]
    pub order_status: String,

    #[serde(rename = "Ratings", default)]
    pub ratings: NumericValue,

    /// Training label, "Yes" for churned
    #[serde(
        rename = "Churn",
        default,
        deserialize_with = "optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub churn: Option<String>,

    /// Precomputed explanation, used by reports only
    #[serde(
        rename = "Churn_Reason",
        default,
        deserialize_with = "optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub churn_reason: Option<String>,
}

impl CustomerRecord {
    /// Parse a single JSON object
    pub fn from_json(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Value of a categorical column
    pub fn categorical(&self, field: CategoricalField) -> &str {
        match field {
            CategoricalField::Gender => &self.gender,
            CategoricalField::Income => &self.income,
            CategoricalField::Country => &self.country,
            CategoricalField::Feedback => &self.feedback,
            CategoricalField::OrderStatus => &self.order_status,
        }
    }

    /// Cell of a numeric column
    pub fn numeric(&self, field: NumericField) -> &NumericValue {
        match field {
            NumericField::Age => &self.age,
            NumericField::TotalAmount => &self.total_amount,
            NumericField::Ratings => &self.ratings,
        }
    }

    /// Whether the record is labelled as churned
    pub fn is_churned(&self) -> bool {
        self.churn.as_deref() == Some("Yes")
    }

    /// Binary training label: 1 for "Yes", 0 otherwise
    pub fn churn_label(&self) -> usize {
        usize::from(self.is_churned())
    }
}
