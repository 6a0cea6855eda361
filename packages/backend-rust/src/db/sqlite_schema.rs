pub const SQLITE_SCHEMA_SQL: &str = include_str!("../../sql/sqlite_schema.sql");

/// Bumped whenever `sqlite_schema.sql` changes shape.
pub const SQLITE_SCHEMA_VERSION: &str = "1";

/// Splits a script on top-level `;`, ignoring ones inside quoted text.
pub fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;

    for ch in sql.chars() {
        match ch {
            '\'' if !in_double_quote => in_single_quote = !in_single_quote,
            '"' if !in_single_quote => in_double_quote = !in_double_quote,
            ';' if !in_single_quote && !in_double_quote => {
                push_statement(&mut statements, &current);
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }

    push_statement(&mut statements, &current);
    statements
}

fn push_statement(statements: &mut Vec<String>, raw: &str) {
    let body = raw
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");
    let body = body.trim();
    if !body.is_empty() {
        statements.push(body.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_ignores_quoted_semicolons() {
        let sql = r#"
            -- header
            CREATE TABLE "a;b" ("x" TEXT DEFAULT ';');
            INSERT INTO "a;b" VALUES ('1;2');
        "#;
        let statements = split_sql_statements(sql);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE"));
        assert!(statements[1].ends_with("('1;2')"));
    }

    #[test]
    fn test_split_drops_comment_only_chunks() {
        let statements = split_sql_statements("-- nothing here\n;\n-- still nothing");
        assert!(statements.is_empty());
    }

    #[test]
    fn test_bundled_schema_creates_every_table() {
        let statements = split_sql_statements(SQLITE_SCHEMA_SQL);
        for table in [
            "_db_metadata",
            "subjects",
            "domains",
            "archetypes",
            "problems",
            "user_archetypes",
            "attempts",
            "rating_events",
            "sessions",
        ] {
            let needle = format!(r#"CREATE TABLE IF NOT EXISTS "{table}""#);
            assert!(
                statements.iter().any(|s| s.starts_with(&needle)),
                "missing {table}"
            );
        }
    }
}
