//! CSV file adapter
//!
//! Reads raw transaction exports, writes the enriched table, and reads the
//! enriched table back for the dashboard.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

use csv::StringRecord;

use crate::domain::result::{Error, Result};
use crate::domain::{
    clean_amount, parse_timestamp, SpendRow, Transaction, TransactionTable, REQUIRED_COLUMNS,
};

/// Column dropped on read: a per-row identifier with no analytical meaning
const ID_COLUMN: &str = "id";

/// Columns the dashboard needs from the enriched table
const ENRICHED_COLUMNS: [&str; 4] = ["created", "amount", "category", "description"];

/// Read a raw transaction export from disk
pub fn read_export(path: &Path) -> Result<TransactionTable> {
    let reader = csv::Reader::from_path(path)?;
    read_export_from(reader)
}

/// Read a raw transaction export from any reader
pub fn read_export_from<R: Read>(mut reader: csv::Reader<R>) -> Result<TransactionTable> {
    let headers = reader.headers()?.clone();
    let index = column_index(&headers);

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !index.contains_key(**c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(Error::MissingColumns(missing));
    }

    let columns: Vec<String> = headers
        .iter()
        .filter(|h| *h != ID_COLUMN && *h != "created")
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        // Header is line 1
        let line = i + 2;

        let cell = |name: &str| record.get(index[name]).unwrap_or("");
        let optional = |name: &str| {
            let v = cell(name);
            if v.is_empty() {
                None
            } else {
                Some(v.to_string())
            }
        };
        let amount = |name: &str| {
            clean_amount(cell(name)).ok_or_else(|| Error::InvalidAmount {
                column: name.to_string(),
                row: line,
                value: cell(name).to_string(),
            })
        };

        let mut tx = Transaction::new(parse_timestamp(cell("created"))?, amount("amount")?, cell("category"));
        tx.local_amount = amount("local_amount")?;
        tx.description = optional("description");
        tx.address = optional("address");

        for name in &columns {
            if !REQUIRED_COLUMNS.contains(&name.as_str()) {
                tx.extra.insert(name.clone(), cell(name).to_string());
            }
        }

        rows.push(tx);
    }

    Ok(TransactionTable::new(columns, rows))
}

/// Write the enriched table, replacing any existing file
pub fn write_enriched(table: &TransactionTable, path: &Path) -> Result<()> {
    let writer = csv::Writer::from_path(path)?;
    write_enriched_to(table, writer)
}

/// Write the enriched table to any writer
pub fn write_enriched_to<W: Write>(table: &TransactionTable, mut writer: csv::Writer<W>) -> Result<()> {
    let header = table.output_columns();
    writer.write_record(&header)?;
    for row in &table.rows {
        writer.write_record(header.iter().map(|c| row.cell(c)))?;
    }
    writer.flush()?;
    Ok(())
}

/// Read the enriched table for the dashboard
pub fn read_enriched(path: &Path) -> Result<Vec<SpendRow>> {
    let reader = csv::Reader::from_path(path)?;
    read_enriched_from(reader)
}

/// Read the enriched table from any reader
pub fn read_enriched_from<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<SpendRow>> {
    let headers = reader.headers()?.clone();
    let index = column_index(&headers);

    let missing: Vec<String> = ENRICHED_COLUMNS
        .iter()
        .filter(|c| !index.contains_key(**c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(Error::MissingColumns(missing));
    }

    let mut rows = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        let line = i + 2;

        let cell = |name: &str| {
            index
                .get(name)
                .and_then(|&idx| record.get(idx))
                .unwrap_or("")
        };
        let coordinate = |name: &str| cell(name).trim().parse::<f64>().ok();

        let amount = clean_amount(cell("amount")).ok_or_else(|| Error::InvalidAmount {
            column: "amount".to_string(),
            row: line,
            value: cell("amount").to_string(),
        })?;

        let mut row = SpendRow::new(
            parse_timestamp(cell("created"))?,
            amount,
            cell("category"),
            cell("description"),
        );
        row.lat = coordinate("lat");
        row.long = coordinate("long");
        rows.push(row);
    }

    Ok(rows)
}

fn column_index(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_string(), i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "\
id,created,amount,currency,local_amount,local_currency,category,emoji,description,address,notes
tx_01,2017-08-12T10:23:45Z,\"-1,234.50\",GBP,\"-1,234.50\",GBP,holidays,,Airline,\"1 Main St, Crawley RH6 0NP\",
tx_02,2017-08-13T08:00:00Z,-3.20,GBP,-3.20,GBP,eating_out,,,Online,lunch
";

    fn reader(data: &str) -> csv::Reader<&[u8]> {
        csv::Reader::from_reader(data.as_bytes())
    }

    #[test]
    fn test_read_export() {
        let table = read_export_from(reader(EXPORT)).unwrap();
        assert_eq!(table.len(), 2);
        assert!(!table.columns.contains(&"id".to_string()));
        assert!(!table.columns.contains(&"created".to_string()));

        let first = &table.rows[0];
        assert_eq!(first.amount, -1234.50);
        assert_eq!(first.local_amount, -1234.50);
        assert_eq!(first.category, "holidays");
        assert_eq!(first.address.as_deref(), Some("1 Main St, Crawley RH6 0NP"));
        assert_eq!(first.extra.get("currency").map(String::as_str), Some("GBP"));

        let second = &table.rows[1];
        assert_eq!(second.description, None);
        assert_eq!(second.extra.get("notes").map(String::as_str), Some("lunch"));
    }

    #[test]
    fn test_missing_columns_fail() {
        let err = read_export_from(reader("id,created,amount\n1,2017-08-12,3\n")).unwrap_err();
        match err {
            Error::MissingColumns(cols) => {
                assert_eq!(
                    cols,
                    vec!["local_amount", "category", "description", "address"]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_numeric_amount_fails() {
        let data = "\
id,created,amount,local_amount,category,description,address
tx_01,2017-08-12,\"1,2x\",1,general,,
";
        let err = read_export_from(reader(data)).unwrap_err();
        match err {
            Error::InvalidAmount { column, row, value } => {
                assert_eq!(column, "amount");
                assert_eq!(row, 2);
                assert_eq!(value, "1,2x");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_timestamp_fails() {
        let data = "\
id,created,amount,local_amount,category,description,address
tx_01,not-a-date,1,1,general,,
";
        assert!(matches!(
            read_export_from(reader(data)),
            Err(Error::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_write_enriched_layout() {
        let mut table = read_export_from(reader(EXPORT)).unwrap();
        table.compute_cumsum();
        table.fill_descriptions();
        table.extract_postcodes();

        let mut out = Vec::new();
        write_enriched_to(&table, csv::Writer::from_writer(&mut out)).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next(),
            Some("created,amount,currency,local_amount,local_currency,category,emoji,description,address,notes,cumsum,uk_postcode,lat,long")
        );
        assert_eq!(
            lines.next(),
            Some("2017-08-12 10:23:45,-1234.5,GBP,-1234.5,GBP,holidays,,Airline,\"1 Main St, Crawley RH6 0NP\",,-1234.5,RH6 0NP,,")
        );
        assert_eq!(
            lines.next(),
            Some("2017-08-13 08:00:00,-3.2,GBP,-3.2,GBP,eating_out,,eating_out,Online,lunch,-1237.7,,,")
        );
    }

    #[test]
    fn test_read_enriched() {
        let data = "\
created,amount,category,description,address,cumsum,uk_postcode,lat,long
2017-08-12 10:23:45,-12.5,groceries,Tesco,\"London SW1A 2AA\",-12.5,SW1A 2AA,51.5,-0.12
2017-08-13 08:00:00,100,monzo,Top up,,87.5,,,
";
        let rows = read_enriched_from(reader(data)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].lat, Some(51.5));
        assert_eq!(rows[0].long, Some(-0.12));
        assert_eq!(rows[1].lat, None);
        assert_eq!(rows[1].category, "monzo");
    }

    #[test]
    fn test_read_enriched_requires_columns() {
        let err = read_enriched_from(reader("created,amount\n2017-08-12,1\n")).unwrap_err();
        assert!(matches!(err, Error::MissingColumns(_)));
    }
}
