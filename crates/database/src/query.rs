//! Paging and sorting for list endpoints.
//!
//! Query strings carry `page`, `limit` and `sort`. Sort keys are the JSON
//! field names; each repository maps them onto SQL expressions through a
//! whitelist so user input never reaches the `ORDER BY` clause verbatim.

use serde::{Deserialize, Serialize};

use crate::types::{DatabaseError, DatabaseResult};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 25;
pub const MAX_LIMIT: u32 = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort: Option<String>,
}

/// Sortable fields of one table: `(json name, sql expression)`.
pub type SortFields = &'static [(&'static str, &'static str)];

#[derive(Debug, Clone, PartialEq)]
pub struct ListParams {
    pub page: u32,
    pub limit: u32,
    pub order_by: String,
}

impl ListParams {
    /// Resolve a raw query against the sortable fields of a table.
    ///
    /// `default_order` is used when the query carries no sort key.
    pub fn resolve(
        query: &ListQuery,
        fields: SortFields,
        default_order: &str,
    ) -> DatabaseResult<Self> {
        let page = query.page.unwrap_or(DEFAULT_PAGE).max(1);
        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

        let mut clauses = Vec::new();
        if let Some(sort) = query.sort.as_deref() {
            for key in sort.split(',').map(str::trim).filter(|k| !k.is_empty()) {
                let (name, direction) = match key.strip_prefix('-') {
                    Some(name) => (name, "DESC"),
                    None => (key, "ASC"),
                };
                let column = fields
                    .iter()
                    .find(|(field, _)| *field == name)
                    .map(|(_, column)| *column)
                    .ok_or_else(|| {
                        DatabaseError::validation(format!("Cannot sort by `{name}`"))
                    })?;
                clauses.push(format!("{column} {direction}"));
            }
        }

        let order_by = if clauses.is_empty() {
            default_order.to_string()
        } else {
            clauses.join(", ")
        };

        Ok(Self {
            page,
            limit,
            order_by,
        })
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageRef {
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        let end = params.offset() + i64::from(params.limit);
        let next = params
            .page
            .checked_add(1)
            .filter(|_| end < total)
            .map(|page| PageRef {
                page,
                limit: params.limit,
            });
        let prev = (params.page > 1).then_some(PageRef {
            page: params.page - 1,
            limit: params.limit,
        });
        Self {
            items,
            total,
            pagination: Pagination { next, prev },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: SortFields = &[("name", "p.name"), ("createdAt", "p.created_at")];

    fn query(page: Option<u32>, limit: Option<u32>, sort: Option<&str>) -> ListQuery {
        ListQuery {
            page,
            limit,
            sort: sort.map(str::to_string),
        }
    }

    #[test]
    fn defaults_apply_when_query_is_empty() {
        let params = ListParams::resolve(&ListQuery::default(), FIELDS, "p.id DESC").unwrap();
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, 25);
        assert_eq!(params.order_by, "p.id DESC");
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn limit_is_clamped() {
        let params = ListParams::resolve(&query(Some(0), Some(1000), None), FIELDS, "p.id").unwrap();
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, MAX_LIMIT);
    }

    #[test]
    fn sort_keys_map_to_columns() {
        let params =
            ListParams::resolve(&query(None, None, Some("-createdAt,name")), FIELDS, "p.id")
                .unwrap();
        assert_eq!(params.order_by, "p.created_at DESC, p.name ASC");
    }

    #[test]
    fn unknown_sort_key_is_rejected() {
        let err = ListParams::resolve(&query(None, None, Some("password")), FIELDS, "p.id")
            .unwrap_err();
        assert!(matches!(err, DatabaseError::ValidationError(_)));
    }

    #[test]
    fn pagination_links_follow_position() {
        let params = ListParams::resolve(&query(Some(2), Some(10), None), FIELDS, "p.id").unwrap();
        let page = Page::new(vec![(); 10], 35, &params);
        assert_eq!(page.pagination.next, Some(PageRef { page: 3, limit: 10 }));
        assert_eq!(page.pagination.prev, Some(PageRef { page: 1, limit: 10 }));

        let last = ListParams::resolve(&query(Some(4), Some(10), None), FIELDS, "p.id").unwrap();
        let page = Page::new(vec![(); 5], 35, &last);
        assert!(page.pagination.next.is_none());
    }

    #[test]
    fn last_representable_page_has_no_next_link() {
        let params =
            ListParams::resolve(&query(Some(u32::MAX), Some(MAX_LIMIT), None), FIELDS, "p.id")
                .unwrap();
        assert_eq!(params.offset(), i64::from(u32::MAX - 1) * i64::from(MAX_LIMIT));

        let page = Page::new(Vec::<()>::new(), i64::MAX, &params);
        assert!(page.pagination.next.is_none());
        assert_eq!(
            page.pagination.prev,
            Some(PageRef {
                page: u32::MAX - 1,
                limit: MAX_LIMIT
            })
        );
    }
}
