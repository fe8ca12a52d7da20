use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};
use sheet_api::value::json_text;
use sheet_api::{
    CellAddress, Constraints, HeaderIndex, MatchPolicy, SheetError, TaggedValue, Table, decode_table,
    find_first, normalize_name,
};
use sheet_client::{BearerToken, CellUpdate, SheetRef, TableSource};

use crate::gateway::Gateway;

/// Body key overriding the target spreadsheet.
pub const SPREADSHEET_ID_KEY: &str = "spreadsheetId";
/// Body key overriding the target tab.
pub const SHEET_NAME_KEY: &str = "sheetName";
/// Body key holding the update's row selector.
pub const FIND_BY_KEY: &str = "findBy";

const RESERVED_KEYS: [&str; 3] = [SPREADSHEET_ID_KEY, SHEET_NAME_KEY, FIND_BY_KEY];

/// Reply of a successful update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub success: bool,
    /// Body field names that were written, in body order.
    pub updated: Vec<String>,
}

fn is_reserved(key: &str) -> bool {
    let key = normalize_name(key);
    RESERVED_KEYS.iter().any(|r| normalize_name(r) == key)
}

/// Value of a body key, looked up case-insensitively.
fn body_field<'a>(body: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    let key = normalize_name(key);
    body.iter()
        .filter(|(k, _)| normalize_name(k) == key)
        .map(|(_, v)| v)
        .next_back()
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, SheetError> {
    body.as_object()
        .ok_or_else(|| SheetError::input("request body must be a JSON object"))
}

fn cell_text(value: &Value) -> String {
    TaggedValue::from_json(value).encode()
}

impl Gateway {
    /// Append one record built from the body's non-reserved fields.
    ///
    /// Fields are placed by header name (case-insensitive); headers with no
    /// matching field get an empty cell; fields with no matching header are
    /// ignored. Returns the store's reply.
    pub async fn insert(&self, body: &Value) -> Result<Value, SheetError> {
        let body = as_object(body)?;
        let target = self.write_target(body)?;
        let token = self.token().await?;
        let table = self.write_table(&target, &token).await?;

        let mut fields: HashMap<String, &Value> = HashMap::new();
        for (key, value) in body.iter().filter(|(k, _)| !is_reserved(k)) {
            fields.insert(normalize_name(key), value);
        }
        let row: Vec<String> = table
            .header
            .iter()
            .map(|h| fields.get(&normalize_name(h)).map(|v| cell_text(v)).unwrap_or_default())
            .collect();

        let reply = self.store.append_row(&target, &row, &token).await?;
        tracing::info!(
            spreadsheet = %target.spreadsheet_id,
            sheet = %target.sheet_name,
            fields = fields.len(),
            "record inserted"
        );
        Ok(reply)
    }

    /// Overwrite fields of the first row matching the body's `findBy`.
    ///
    /// Matching ignores case on both column names and values. All cells are
    /// written in one batch.
    pub async fn update(&self, body: &Value) -> Result<UpdateReport, SheetError> {
        let body = as_object(body)?;

        let find_by = body_field(body, FIND_BY_KEY)
            .ok_or_else(|| SheetError::input("findBy is required for update"))?
            .as_object()
            .ok_or_else(|| SheetError::input("findBy must be an object of column/value pairs"))?;
        if find_by.is_empty() {
            return Err(SheetError::input("findBy must name at least one column"));
        }
        let constraints: Constraints = find_by.iter().map(|(k, v)| (k.clone(), json_text(v))).collect();

        let fields: Vec<(&String, &Value)> = body.iter().filter(|(k, _)| !is_reserved(k)).collect();
        if fields.is_empty() {
            return Err(SheetError::input("no fields to update"));
        }

        let target = self.write_target(body)?;
        let token = self.token().await?;
        let table = self.write_table(&target, &token).await?;

        let records = decode_table(&table);
        let index = find_first(&records, &constraints, MatchPolicy::CaseInsensitive)
            .ok_or_else(|| SheetError::not_found("no matching record found"))?;
        let row = row_number(index)?;

        let columns = HeaderIndex::new(&table.header);
        let mut updates = Vec::with_capacity(fields.len());
        let mut updated = Vec::with_capacity(fields.len());
        for (name, value) in fields {
            let Some(position) = columns.position(name) else {
                tracing::debug!(field = %name, "update field has no column, skipped");
                continue;
            };
            let column = u32::try_from(position + 1)
                .map_err(|_| SheetError::encoding("column index out of range"))?;
            let cell = CellUpdate {
                address: CellAddress::new(column, row),
                value: cell_text(value),
            };
            // Keys naming the same column collapse into one cell; the last one wins.
            match updates.iter().position(|u: &CellUpdate| u.address == cell.address) {
                Some(slot) => {
                    updates[slot] = cell;
                    updated[slot] = name.clone();
                }
                None => {
                    updates.push(cell);
                    updated.push(name.clone());
                }
            }
        }
        if updates.is_empty() {
            return Err(SheetError::input("none of the fields match a column"));
        }

        self.store.batch_update_cells(&target, &updates, &token).await?;
        tracing::info!(
            spreadsheet = %target.spreadsheet_id,
            sheet = %target.sheet_name,
            row,
            cells = updates.len(),
            "record updated"
        );
        Ok(UpdateReport {
            success: true,
            updated,
        })
    }

    fn write_target(&self, body: &Map<String, Value>) -> Result<SheetRef, SheetError> {
        let write = &self.config.write;
        let override_text = |key: &str| {
            if !write.allow_target_override {
                return None;
            }
            body_field(body, key)
                .map(json_text)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let spreadsheet_id = override_text(SPREADSHEET_ID_KEY)
            .or_else(|| write.spreadsheet_id.clone())
            .ok_or_else(|| SheetError::input("no target spreadsheet: set spreadsheetId or [write].spreadsheet_id"))?;
        let sheet_name = override_text(SHEET_NAME_KEY).unwrap_or_else(|| write.sheet_name.clone());
        Ok(SheetRef::new(spreadsheet_id, sheet_name))
    }

    async fn write_table(&self, target: &SheetRef, token: &BearerToken) -> Result<Table, SheetError> {
        let source = TableSource::Api {
            sheet: target.clone(),
            range: None,
        };
        let table = self.store.read_table(&source, Some(token)).await?;
        if table.is_empty() {
            return Err(SheetError::not_found("sheet empty or not found"));
        }
        Ok(table)
    }
}

/// Sheet row number of the data row at `index` (header is row 1).
fn row_number(index: usize) -> Result<u32, SheetError> {
    index
        .checked_add(2)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| SheetError::encoding("row index out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reserved_keys_ignore_case() {
        assert!(is_reserved("spreadsheetid"));
        assert!(is_reserved(" SheetName "));
        assert!(is_reserved("FINDBY"));
        assert!(!is_reserved("name"));
    }

    #[test]
    fn body_field_is_case_insensitive() {
        let body = json!({"FindBy": {"a": 1}, "x": 2});
        let body = body.as_object().unwrap();
        assert_eq!(body_field(body, FIND_BY_KEY), Some(&json!({"a": 1})));
        assert_eq!(body_field(body, "missing"), None);
    }

    #[test]
    fn cell_text_tags_containers() {
        assert_eq!(cell_text(&json!("Ann")), "Ann");
        assert_eq!(cell_text(&json!(31)), "31");
        assert_eq!(cell_text(&json!(true)), "true");
        assert_eq!(cell_text(&Value::Null), "");
        assert_eq!(cell_text(&json!(["a", "b"])), "[arr] a; b");
        assert_eq!(cell_text(&json!({"k": "v"})), "[obj] k: v");
    }

    #[test]
    fn row_numbers_skip_header() {
        assert_eq!(row_number(0).unwrap(), 2);
        assert_eq!(row_number(9).unwrap(), 11);
    }
}
