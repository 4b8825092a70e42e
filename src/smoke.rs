//! End-to-end walkthrough against a running emulator
//!
//! Creates (or truncates) a table, writes one row of every supported cell
//! type plus two marker rows, then reads everything back and checks it.

use std::collections::BTreeMap;
use std::fmt::Debug;

use chrono::{NaiveDate, NaiveDateTime};

use crate::client::{Client, ReadRowsQuery};
use crate::error::{BigcellError, Result};
use crate::model::{prefix_row_set, ColumnFamily, GcRule};

/// Default project used by the walkthrough and the CLI
pub const DEFAULT_PROJECT_ID: &str = "some_random_project_id";

/// Default instance used by the walkthrough and the CLI
pub const DEFAULT_INSTANCE_ID: &str = "some_random_instance_id";

/// Default table used by the walkthrough
pub const DEFAULT_TABLE_ID: &str = "some_random_table_id";

const FAMILY: &str = "W";

fn check<T: PartialEq + Debug>(what: &str, actual: T, expected: T) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(BigcellError::Verification(format!(
            "{}: expected {:?}, got {:?}",
            what, expected, actual
        )))
    }
}

fn new_year_2022() -> Result<NaiveDateTime> {
    NaiveDate::from_ymd_opt(2022, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| BigcellError::Verification("invalid reference date".to_string()))
}

/// Run the walkthrough on `table_id`
pub fn run(client: &Client, table_id: &str) -> Result<()> {
    let table = client.table(table_id);

    tracing::info!("Creating the {} table", table_id);
    if !table.exists()? {
        let families = BTreeMap::from([(
            FAMILY.to_string(),
            ColumnFamily::new(Some(GcRule::max_versions(1))),
        )]);
        table.create(families)?;
    } else {
        table.truncate()?;
        tracing::info!("Table {} already exists, truncated it", table_id);
    }

    tracing::info!("Adding rows");
    let reference_time = new_year_2022()?;

    // Rows must have at least one cell
    table
        .direct_row("123#1")
        .set_value(FAMILY, "col_bool", &false)?
        .commit()?;

    let mut row = table.direct_row("123#2");
    row.set_value(FAMILY, "col_bool", &true)?
        .set_value(FAMILY, "col_int", &1i64)?
        .set_value(FAMILY, "col_str", &"str".to_string())?
        .set_value(FAMILY, "col_float", &1.0f64)?
        .set_value(FAMILY, "col_dict", &bson::doc! { "a": "b" })?
        .set_value(FAMILY, "col_list", &vec!["a".to_string(), "b".to_string()])?
        .set_value(FAMILY, "col_timestamp", &reference_time)?;
    row.commit()?;

    table
        .direct_row("124#1")
        .set_value(FAMILY, "col_bool", &false)?
        .commit()?;

    tracing::info!("Reading rows back");
    let rows = table.read_rows(&ReadRowsQuery::all())?;
    check("rows in table", rows.len(), 3)?;

    let rows = table.read_rows(&ReadRowsQuery::rows(prefix_row_set("123")))?;
    let keys: Vec<String> = rows
        .iter()
        .map(|row| String::from_utf8_lossy(&row.key).into_owned())
        .collect();
    check("keys with prefix 123", keys, vec!["123#1".to_string(), "123#2".to_string()])?;

    check("row 124#1 exists", table.read_row("124#1", None)?.is_some(), true)?;
    check("row 125#1 exists", table.read_row("125#1", None)?.is_some(), false)?;

    let row = table
        .read_row("123#2", None)?
        .ok_or_else(|| BigcellError::Verification("row 123#2 is missing".to_string()))?;
    check("col_bool", row.decode::<bool>(FAMILY, b"col_bool")?, true)?;
    check("col_int", row.decode::<i64>(FAMILY, b"col_int")?, 1)?;
    check("col_str", row.decode::<String>(FAMILY, b"col_str")?, "str".to_string())?;
    check("col_float", row.decode::<f64>(FAMILY, b"col_float")?, 1.0)?;
    check(
        "col_dict",
        row.decode::<bson::Document>(FAMILY, b"col_dict")?,
        bson::doc! { "a": "b" },
    )?;
    check(
        "col_list",
        row.decode::<Vec<String>>(FAMILY, b"col_list")?,
        vec!["a".to_string(), "b".to_string()],
    )?;
    check(
        "col_timestamp",
        row.decode::<NaiveDateTime>(FAMILY, b"col_timestamp")?,
        reference_time,
    )?;

    tracing::info!("Walkthrough passed on {}", table_id);
    Ok(())
}
