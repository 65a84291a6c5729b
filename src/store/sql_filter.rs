use sqlx::{Postgres, QueryBuilder};

use crate::logic::{Clause, Filter, Page};

/// Append `filter` as a `WHERE` clause over a table with a `body JSONB` and a
/// `created_at` column. Nothing is appended for the empty filter.
pub fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    for (index, clause) in filter.clauses().iter().enumerate() {
        builder.push(if index == 0 { " WHERE " } else { " AND " });
        push_clause(builder, clause);
    }
}

fn push_clause(builder: &mut QueryBuilder<'_, Postgres>, clause: &Clause) {
    match clause {
        Clause::OneOf { field, values } => {
            builder
                .push("(body->>")
                .push_bind(field.key())
                .push(") = ANY(")
                .push_bind(values.clone())
                .push(")");
        }
        Clause::PersonNamed { field, names } => {
            builder
                .push("EXISTS (SELECT 1 FROM jsonb_array_elements(COALESCE(body->")
                .push_bind(field.key())
                .push(", '[]'::jsonb)) AS person WHERE lower(person->>'family_name') = ANY(")
                .push_bind(names.clone())
                .push(") OR lower(concat_ws(' ', person->>'given_name', person->>'family_name')) = ANY(")
                .push_bind(names.clone())
                .push("))");
        }
        Clause::CreatedWithin { from, to } => {
            builder.push("(TRUE");
            if let Some(from) = from {
                builder.push(" AND created_at >= ").push_bind(*from);
            }
            if let Some(to) = to {
                builder.push(" AND created_at <= ").push_bind(*to);
            }
            builder.push(")");
        }
        Clause::VisibleTo { collabs } => {
            builder
                .push("((body->>'private')::boolean IS NOT TRUE OR (body->>'app_id') = ANY(")
                .push_bind(collabs.clone())
                .push("))");
        }
    }
}

/// Append ordering and pagination. Ties on `created_at` are broken by id.
pub fn push_page(builder: &mut QueryBuilder<'_, Postgres>, page: Page, newest_first: bool) {
    if newest_first {
        builder.push(" ORDER BY created_at DESC, id ASC");
    } else {
        builder.push(" ORDER BY created_at ASC, id ASC");
    }
    builder
        .push(" LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());
}
