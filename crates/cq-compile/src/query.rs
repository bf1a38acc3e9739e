//! Host-side query assembly around a compiled condition.
//!
//! ```text
//! SELECT * FROM T WHERE <main>
//! SELECT * FROM T JOIN (SELECT <sub-select> FROM T) AS S ON <aggregate-join> WHERE <main>
//! ```
//!
//! Membership conditions (`IN ...` roots) only form a valid statement as a
//! count query; use [`assemble_exists`] or [`assemble_query`] for them.

use crate::condition::CompiledCondition;

const SELECT_ALL: &str = "SELECT *";
const SELECT_COUNT: &str = "SELECT VALUE COUNT(1)";

/// Full select statement for a compiled condition.
pub fn assemble_select(condition: &CompiledCondition) -> String {
    assemble(SELECT_ALL, condition, condition.text())
}

/// Count query used for membership ("contains") checks.
pub fn assemble_exists(condition: &CompiledCondition) -> String {
    assemble(SELECT_COUNT, condition, condition.text())
}

/// The statement to run: a count query for membership conditions, a
/// select otherwise.
pub fn assemble_query(condition: &CompiledCondition) -> String {
    assemble(projection(condition), condition, condition.text())
}

pub(crate) fn projection(condition: &CompiledCondition) -> &'static str {
    if condition.is_membership() {
        SELECT_COUNT
    } else {
        SELECT_ALL
    }
}

pub(crate) fn assemble(projection: &str, condition: &CompiledCondition, text: &str) -> String {
    let table = condition.table();
    let join = condition.join();

    let mut query = format!("{} FROM {}", projection, table);
    if join.is_rewritten() {
        query.push_str(&format!(
            " JOIN (SELECT {} FROM {}) AS {} ON {}",
            join.sub_select_text(),
            table,
            join.alias,
            join.aggregate_join_text()
        ));
    }
    if !text.is_empty() {
        query.push_str(" WHERE ");
        query.push_str(text);
    }
    query
}
