//! Statement safety verification.
//!
//! Candidate statements from the external translator are parsed and walked
//! conservatively: exactly one plain SELECT over the target table, every
//! identifier resolved against the known column schema. Any construct the
//! walker does not recognize fails verification — the caller falls back to
//! the rule translator, it never guesses.

use sqlparser::ast::{
    Expr, FunctionArg, FunctionArgExpr, FunctionArguments, GroupByExpr, ObjectName, Query, Select,
    SelectItem, SetExpr, Statement, TableFactor, TableWithJoins,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use flatlake_commons::{ColumnSchema, FlatLakeError, Result, TableName};

/// Verify that `sql` is a single read-only SELECT over `table` whose
/// identifiers all resolve in `schema`.
///
/// Rejections are reported as `InvalidSql`; callers treat that as a fallback
/// signal, not a user-facing error.
pub fn verify_select(sql: &str, table: &TableName, schema: &ColumnSchema) -> Result<()> {
    let statements = Parser::parse_sql(&GenericDialect {}, sql)
        .map_err(|e| FlatLakeError::invalid_sql(format!("parse failed: {}", e)))?;

    let statement = match statements.as_slice() {
        [single] => single,
        _ => {
            return Err(FlatLakeError::invalid_sql(format!(
                "expected exactly one statement, found {}",
                statements.len()
            )))
        }
    };

    let query = match statement {
        Statement::Query(query) => query,
        other => {
            return Err(FlatLakeError::invalid_sql(format!(
                "only SELECT statements are allowed, found {}",
                statement_kind(other)
            )))
        }
    };

    verify_query(query, table, schema)
}

/// Table names referenced by a statement's FROM clauses, joins included.
///
/// Used by the store layer to confirm a statement only touches tables the
/// tenant actually owns before handing it to the engine.
pub fn referenced_tables(sql: &str) -> Result<Vec<TableName>> {
    let statements = Parser::parse_sql(&GenericDialect {}, sql)
        .map_err(|e| FlatLakeError::invalid_sql(format!("parse failed: {}", e)))?;

    let mut tables = Vec::new();
    for statement in &statements {
        let query = match statement {
            Statement::Query(query) => query,
            other => {
                return Err(FlatLakeError::invalid_sql(format!(
                    "only SELECT statements are allowed, found {}",
                    statement_kind(other)
                )))
            }
        };
        collect_body_tables(query.body.as_ref(), &mut tables)?;
    }
    Ok(tables)
}

fn collect_body_tables(body: &SetExpr, tables: &mut Vec<TableName>) -> Result<()> {
    match body {
        SetExpr::Select(select) => {
            for TableWithJoins { relation, joins } in &select.from {
                collect_table_name(relation, tables)?;
                for join in joins {
                    collect_table_name(&join.relation, tables)?;
                }
            }
            Ok(())
        }
        SetExpr::Query(query) => collect_body_tables(query.body.as_ref(), tables),
        SetExpr::SetOperation { left, right, .. } => {
            collect_body_tables(left, tables)?;
            collect_body_tables(right, tables)
        }
        _ => Ok(()),
    }
}

/// Escape a literal value for embedding in a statement: single-quoted with
/// internal quotes doubled.
pub fn escape_literal(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('\'');
    for c in raw.chars() {
        if c == '\'' {
            out.push('\'');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

/// Render a verified column name as a SQL identifier.
///
/// Bare when it is already a plain lowercase identifier (the engine folds
/// unquoted identifiers to lowercase); double-quoted otherwise, with
/// embedded quotes doubled.
pub fn quote_ident(name: &str) -> String {
    let bare = !name.is_empty()
        && name
            .chars()
            .next()
            .map(|c| c.is_ascii_lowercase() || c == '_')
            .unwrap_or(false)
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if bare {
        name.to_string()
    } else {
        let mut out = String::with_capacity(name.len() + 2);
        out.push('"');
        for c in name.chars() {
            if c == '"' {
                out.push('"');
            }
            out.push(c);
        }
        out.push('"');
        out
    }
}

fn verify_query(query: &Query, table: &TableName, schema: &ColumnSchema) -> Result<()> {
    if query.with.is_some() {
        return Err(FlatLakeError::invalid_sql("WITH clauses are not allowed"));
    }
    if !query.locks.is_empty() || query.for_clause.is_some() {
        return Err(FlatLakeError::invalid_sql("locking clauses are not allowed"));
    }

    let select = match query.body.as_ref() {
        SetExpr::Select(select) => select,
        _ => {
            return Err(FlatLakeError::invalid_sql(
                "set operations and non-SELECT bodies are not allowed",
            ))
        }
    };

    verify_select_body(select, table, schema)?;

    if let Some(order_by) = &query.order_by {
        for order_expr in &order_by.exprs {
            verify_expr(&order_expr.expr, table, schema)?;
        }
    }
    if let Some(limit) = &query.limit {
        verify_expr(limit, table, schema)?;
    }
    Ok(())
}

fn verify_select_body(select: &Select, table: &TableName, schema: &ColumnSchema) -> Result<()> {
    if select.into.is_some() {
        return Err(FlatLakeError::invalid_sql("SELECT INTO is not allowed"));
    }

    match select.from.as_slice() {
        [TableWithJoins { relation, joins }] => {
            if !joins.is_empty() {
                return Err(FlatLakeError::invalid_sql("joins are not allowed"));
            }
            verify_table_factor(relation, table)?;
        }
        [] => return Err(FlatLakeError::invalid_sql("statement has no FROM clause")),
        _ => return Err(FlatLakeError::invalid_sql("multiple tables are not allowed")),
    }

    for item in &select.projection {
        match item {
            SelectItem::Wildcard(_) => {}
            SelectItem::QualifiedWildcard(name, _) => verify_qualifier(name, table)?,
            SelectItem::UnnamedExpr(expr) => verify_expr(expr, table, schema)?,
            SelectItem::ExprWithAlias { expr, .. } => verify_expr(expr, table, schema)?,
        }
    }

    if let Some(selection) = &select.selection {
        verify_expr(selection, table, schema)?;
    }
    match &select.group_by {
        GroupByExpr::Expressions(exprs, _) => {
            for expr in exprs {
                verify_expr(expr, table, schema)?;
            }
        }
        GroupByExpr::All(_) => {
            return Err(FlatLakeError::invalid_sql("GROUP BY ALL is not allowed"))
        }
    }
    if let Some(having) = &select.having {
        verify_expr(having, table, schema)?;
    }
    Ok(())
}

fn verify_table_factor(relation: &TableFactor, table: &TableName) -> Result<()> {
    match relation {
        TableFactor::Table { name, .. } => verify_qualifier(name, table),
        _ => Err(FlatLakeError::invalid_sql(
            "only plain table references are allowed",
        )),
    }
}

fn verify_qualifier(name: &ObjectName, table: &TableName) -> Result<()> {
    match name.0.as_slice() {
        [ident] if ident.value.eq_ignore_ascii_case(table.as_str()) => Ok(()),
        _ => Err(FlatLakeError::invalid_sql(format!(
            "statement references '{}', expected '{}'",
            name, table
        ))),
    }
}

fn collect_table_name(relation: &TableFactor, out: &mut Vec<TableName>) -> Result<()> {
    match relation {
        TableFactor::Table { name, .. } => match name.0.as_slice() {
            [ident] => {
                let table = TableName::try_new(&ident.value)
                    .map_err(|e| FlatLakeError::invalid_sql(e.to_string()))?;
                if !out.contains(&table) {
                    out.push(table);
                }
                Ok(())
            }
            _ => Err(FlatLakeError::invalid_sql(format!(
                "qualified table reference '{}' is not allowed",
                name
            ))),
        },
        _ => Err(FlatLakeError::invalid_sql(
            "only plain table references are allowed",
        )),
    }
}

/// Walk an expression, resolving every identifier against the schema.
/// Unrecognized expression forms are rejected wholesale.
fn verify_expr(expr: &Expr, table: &TableName, schema: &ColumnSchema) -> Result<()> {
    match expr {
        Expr::Identifier(ident) => verify_column(&ident.value, schema),
        Expr::CompoundIdentifier(parts) => match parts.as_slice() {
            [qualifier, column] => {
                if !qualifier.value.eq_ignore_ascii_case(table.as_str()) {
                    return Err(FlatLakeError::invalid_sql(format!(
                        "unknown qualifier '{}'",
                        qualifier.value
                    )));
                }
                verify_column(&column.value, schema)
            }
            _ => Err(FlatLakeError::invalid_sql(
                "deeply qualified identifiers are not allowed",
            )),
        },
        Expr::Value(_) => Ok(()),
        Expr::BinaryOp { left, right, .. } => {
            verify_expr(left, table, schema)?;
            verify_expr(right, table, schema)
        }
        Expr::UnaryOp { expr, .. } => verify_expr(expr, table, schema),
        Expr::Nested(inner) => verify_expr(inner, table, schema),
        Expr::IsNull(inner) | Expr::IsNotNull(inner) => verify_expr(inner, table, schema),
        Expr::Between {
            expr, low, high, ..
        } => {
            verify_expr(expr, table, schema)?;
            verify_expr(low, table, schema)?;
            verify_expr(high, table, schema)
        }
        Expr::InList { expr, list, .. } => {
            verify_expr(expr, table, schema)?;
            for item in list {
                verify_expr(item, table, schema)?;
            }
            Ok(())
        }
        Expr::Like { expr, pattern, .. } | Expr::ILike { expr, pattern, .. } => {
            verify_expr(expr, table, schema)?;
            verify_expr(pattern, table, schema)
        }
        Expr::Cast { expr, .. } => verify_expr(expr, table, schema),
        Expr::Function(function) => {
            verify_function_args(&function.args, table, schema)
        }
        other => Err(FlatLakeError::invalid_sql(format!(
            "unsupported expression: {}",
            other
        ))),
    }
}

fn verify_function_args(
    args: &FunctionArguments,
    table: &TableName,
    schema: &ColumnSchema,
) -> Result<()> {
    match args {
        FunctionArguments::None => Ok(()),
        FunctionArguments::Subquery(_) => {
            Err(FlatLakeError::invalid_sql("subqueries are not allowed"))
        }
        FunctionArguments::List(list) => {
            for arg in &list.args {
                let arg_expr = match arg {
                    FunctionArg::Named { arg, .. } => arg,
                    FunctionArg::Unnamed(arg) => arg,
                };
                match arg_expr {
                    FunctionArgExpr::Expr(expr) => verify_expr(expr, table, schema)?,
                    FunctionArgExpr::Wildcard => {}
                    FunctionArgExpr::QualifiedWildcard(name) => verify_qualifier(name, table)?,
                }
            }
            Ok(())
        }
    }
}

fn verify_column(name: &str, schema: &ColumnSchema) -> Result<()> {
    if schema.contains(name) {
        Ok(())
    } else {
        Err(FlatLakeError::invalid_sql(format!(
            "unknown column '{}'",
            name
        )))
    }
}

fn statement_kind(statement: &Statement) -> String {
    statement
        .to_string()
        .split_whitespace()
        .next()
        .unwrap_or("unknown")
        .to_string()
}
