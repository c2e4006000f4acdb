//! Firestore typed-value encoding for nutrition documents.
//!
//! Firestore wraps every field in a single-key object naming its type:
//! `{"stringValue": "..."}`, `{"doubleValue": 1.5}`, `{"integerValue": "12"}`,
//! `{"timestampValue": "2024-05-01T12:00:00Z"}`, `{"mapValue": {"fields": {...}}}`.

use chrono::{DateTime, SecondsFormat, Utc};
use nutrilens_types::{
    EstimateSource, HistoryEntry, NutritionRecord, RawNutrition, RecordId, UserId,
};
use serde_json::{Map, Value, json};

fn string(value: &str) -> Value {
    json!({ "stringValue": value })
}

fn double(value: f64) -> Value {
    json!({ "doubleValue": value })
}

fn timestamp(value: DateTime<Utc>) -> Value {
    json!({ "timestampValue": value.to_rfc3339_opts(SecondsFormat::Micros, true) })
}

fn map(fields: Map<String, Value>) -> Value {
    json!({ "mapValue": { "fields": fields } })
}

/// Document body for one saved record.
pub(crate) fn encode_document(
    user_id: &UserId,
    record: &NutritionRecord,
    observed_at: DateTime<Utc>,
) -> Value {
    let mut nutrition = Map::new();
    nutrition.insert("food_name".into(), string(record.food_name()));
    nutrition.insert("calories".into(), double(record.calories()));
    nutrition.insert("protein_g".into(), double(record.protein_g()));
    nutrition.insert("carbs_g".into(), double(record.carbs_g()));
    nutrition.insert("fats_g".into(), double(record.fats_g()));
    nutrition.insert("confidence".into(), double(record.confidence()));

    let mut fields = Map::new();
    fields.insert("user_id".into(), string(user_id.as_str()));
    fields.insert("food_name".into(), string(record.food_name()));
    fields.insert("calories".into(), double(record.calories()));
    fields.insert("timestamp".into(), timestamp(observed_at));
    fields.insert("source".into(), string(record.source().as_str()));
    fields.insert("nutrition".into(), map(nutrition));

    json!({ "fields": fields })
}

/// Decode a document returned by a query back into a history entry.
pub(crate) fn decode_document(document: &Value) -> Result<HistoryEntry, String> {
    let name = document
        .get("name")
        .and_then(Value::as_str)
        .ok_or("document has no name")?;
    let id = name.rsplit('/').next().unwrap_or(name);

    let fields = document
        .get("fields")
        .and_then(Value::as_object)
        .ok_or("document has no fields")?;

    let nutrition_fields = fields
        .get("nutrition")
        .and_then(|v| v.get("mapValue"))
        .and_then(|v| v.get("fields"))
        .and_then(Value::as_object)
        .ok_or("missing map field 'nutrition'")?;

    let nutrition = RawNutrition {
        food_name: get_string(nutrition_fields, "food_name")?,
        calories: get_number(nutrition_fields, "calories")?,
        protein_g: get_number(nutrition_fields, "protein_g")?,
        carbs_g: get_number(nutrition_fields, "carbs_g")?,
        fats_g: get_number(nutrition_fields, "fats_g")?,
        confidence: get_number(nutrition_fields, "confidence")?,
    };

    // Documents written before `source` existed are classified by confidence.
    let source = get_string(fields, "source")
        .ok()
        .and_then(|s| EstimateSource::parse(&s))
        .unwrap_or(if nutrition.confidence == 0.0 {
            EstimateSource::Fallback
        } else {
            EstimateSource::Classifier
        });

    Ok(HistoryEntry {
        id: RecordId::new(id),
        user_id: get_string(fields, "user_id")?,
        food_name: get_string(fields, "food_name").unwrap_or_else(|_| nutrition.food_name.clone()),
        calories: get_number(fields, "calories").unwrap_or(nutrition.calories),
        timestamp: get_timestamp(fields, "timestamp")?,
        nutrition,
        source,
    })
}

fn field<'a>(fields: &'a Map<String, Value>, key: &str) -> Result<&'a Value, String> {
    fields.get(key).ok_or_else(|| format!("missing field '{key}'"))
}

fn get_string(fields: &Map<String, Value>, key: &str) -> Result<String, String> {
    field(fields, key)?
        .get("stringValue")
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| format!("field '{key}' is not a string"))
}

fn get_number(fields: &Map<String, Value>, key: &str) -> Result<f64, String> {
    let value = field(fields, key)?;
    if let Some(n) = value.get("doubleValue").and_then(Value::as_f64) {
        return Ok(n);
    }
    // integerValue is an int64 encoded as a JSON string.
    match value.get("integerValue") {
        Some(Value::String(s)) => s
            .parse::<i64>()
            .map(|n| n as f64)
            .map_err(|_| format!("field '{key}' has invalid integerValue")),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| format!("field '{key}' has invalid integerValue")),
        _ => Err(format!("field '{key}' is not a number")),
    }
}

fn get_timestamp(fields: &Map<String, Value>, key: &str) -> Result<DateTime<Utc>, String> {
    let raw = field(fields, key)?
        .get("timestampValue")
        .and_then(Value::as_str)
        .ok_or_else(|| format!("field '{key}' is not a timestamp"))?;
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("field '{key}': {e}"))
}
