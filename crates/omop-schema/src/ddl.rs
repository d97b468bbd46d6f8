#![deny(unsafe_code)]

//! Tolerant parser for the CDM DDL: extracts table names, column order,
//! column types, and NOT NULL flags from `CREATE TABLE` statements.
//!
//! The DDL is treated as a schema description, not as executable SQL;
//! anything that is not a column definition (constraints, indexes, other
//! statements) is skipped.

const CONSTRAINT_KEYWORDS: [&str; 5] = ["PRIMARY", "FOREIGN", "CONSTRAINT", "UNIQUE", "CHECK"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdlColumn {
    pub name: String,
    pub sql_type: String,
    pub not_null: bool,
}

impl DdlColumn {
    /// Integer-like or decimal-like SQL type.
    pub fn is_numeric(&self) -> bool {
        let ty = self.sql_type.to_ascii_uppercase();
        [
            "INT", "INTEGER", "BIGINT", "SMALLINT", "NUMERIC", "DECIMAL", "FLOAT", "REAL",
            "DOUBLE",
        ]
        .iter()
        .any(|prefix| ty.starts_with(prefix))
    }

    /// Datetime-like SQL type (`TIMESTAMP`, `DATETIME`).
    pub fn is_datetime(&self) -> bool {
        let ty = self.sql_type.to_ascii_uppercase();
        ty.starts_with("TIMESTAMP") || ty.starts_with("DATETIME")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdlTable {
    pub name: String,
    pub columns: Vec<DdlColumn>,
}

/// Parse every `CREATE TABLE` statement in `text`.
pub fn parse_ddl(text: &str) -> Result<Vec<DdlTable>, String> {
    let stripped = strip_line_comments(text);
    let upper = stripped.to_ascii_uppercase();
    let mut tables = Vec::new();
    let mut cursor = 0;
    while let Some(offset) = upper[cursor..].find("CREATE TABLE") {
        let start = cursor + offset + "CREATE TABLE".len();
        let (table, next) = parse_create_table(&stripped, start)?;
        if !table.columns.is_empty() {
            tables.push(table);
        }
        cursor = next;
    }
    if tables.is_empty() {
        return Err("no CREATE TABLE statements found".to_string());
    }
    Ok(tables)
}

fn strip_line_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let line = match line.find("--") {
            Some(pos) => &line[..pos],
            None => line,
        };
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn parse_create_table(text: &str, start: usize) -> Result<(DdlTable, usize), String> {
    let rest = &text[start..];
    let open = rest
        .find('(')
        .ok_or_else(|| "CREATE TABLE without column list".to_string())?;
    let name = normalize_table_name(&rest[..open]);
    if name.is_empty() {
        return Err("CREATE TABLE without a table name".to_string());
    }

    let body_start = open + 1;
    let mut depth = 1usize;
    let mut body_end = None;
    for (i, ch) in rest[body_start..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    body_end = Some(body_start + i);
                    break;
                }
            }
            _ => {}
        }
    }
    let body_end =
        body_end.ok_or_else(|| format!("unterminated column list for table '{name}'"))?;
    let body = &rest[body_start..body_end];

    let mut columns = Vec::new();
    for entry in split_top_level(body) {
        if let Some(column) = parse_column(&entry) {
            columns.push(column);
        }
    }
    Ok((DdlTable { name, columns }, start + body_end + 1))
}

fn normalize_table_name(raw: &str) -> String {
    let raw = raw.trim();
    let raw = raw
        .strip_prefix("IF NOT EXISTS")
        .or_else(|| raw.strip_prefix("if not exists"))
        .unwrap_or(raw)
        .trim();
    // Qualified names keep only the last segment: `cdm.person` -> `person`.
    let last = raw.rsplit('.').next().unwrap_or(raw);
    last.trim_matches(|c: char| c == '"' || c == '`' || c.is_whitespace())
        .to_ascii_lowercase()
}

fn split_top_level(body: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in body.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => {
                entries.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        entries.push(current);
    }
    entries
}

fn parse_column(entry: &str) -> Option<DdlColumn> {
    let entry = entry.trim();
    let mut tokens = entry.split_whitespace();
    let name = tokens.next()?;
    let first_upper = name.to_ascii_uppercase();
    if CONSTRAINT_KEYWORDS.contains(&first_upper.as_str()) {
        return None;
    }
    let sql_type = tokens.next()?.to_string();
    let not_null = entry.to_ascii_uppercase().contains("NOT NULL");
    Some(DdlColumn {
        name: name
            .trim_matches(|c: char| c == '"' || c == '`')
            .to_ascii_lowercase(),
        sql_type,
        not_null,
    })
}
