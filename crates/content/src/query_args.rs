//! Query argument vocabulary
//!
//! Keys a caller may put in a query bundle and keys a provider may return in
//! its response extras. The gateway transports both without interpreting
//! them; [`QueryArgs`] is a typed read view for provider implementations.

use r_droid_intent::{Bundle, Value};

pub const QUERY_ARG_LIMIT: &str = "android:query-arg-limit";
pub const QUERY_ARG_OFFSET: &str = "android:query-arg-offset";
pub const QUERY_ARG_SORT_COLUMNS: &str = "android:query-arg-sort-columns";
pub const QUERY_ARG_SORT_DIRECTION: &str = "android:query-arg-sort-direction";
pub const QUERY_ARG_SORT_COLLATION: &str = "android:query-arg-sort-collation";
pub const QUERY_ARG_SQL_SELECTION: &str = "android:query-arg-sql-selection";
pub const QUERY_ARG_SQL_SELECTION_ARGS: &str = "android:query-arg-sql-selection-args";
pub const QUERY_ARG_SQL_SORT_ORDER: &str = "android:query-arg-sql-sort-order";

pub const QUERY_SORT_DIRECTION_ASCENDING: i32 = 0;
pub const QUERY_SORT_DIRECTION_DESCENDING: i32 = 1;

/// Response extra listing the query argument keys the provider applied
pub const EXTRA_HONORED_ARGS: &str = "android.content.extra.HONORED_ARGS";
pub const EXTRA_TOTAL_COUNT: &str = "android.content.extra.TOTAL_COUNT";
pub const EXTRA_SIZE: &str = "android.content.extra.SIZE";
pub const EXTRA_REFRESH_SUPPORTED: &str = "android.content.extra.REFRESH_SUPPORTED";

/// Sort direction carried by [`QUERY_ARG_SORT_DIRECTION`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Bundle of the legacy SQL-style arguments; absent values are left out
pub fn create_sql_query_bundle(
    selection: Option<&str>,
    selection_args: Option<&[String]>,
    sort_order: Option<&str>,
) -> Bundle {
    let mut bundle = Bundle::new();
    if let Some(selection) = selection {
        bundle.put(QUERY_ARG_SQL_SELECTION, selection);
    }
    if let Some(args) = selection_args {
        bundle.put(QUERY_ARG_SQL_SELECTION_ARGS, Value::StrList(args.to_vec()));
    }
    if let Some(sort_order) = sort_order {
        bundle.put(QUERY_ARG_SQL_SORT_ORDER, sort_order);
    }
    bundle
}

/// Typed view over a query bundle
#[derive(Debug, Clone, Copy)]
pub struct QueryArgs<'a> {
    bundle: &'a Bundle,
}

impl<'a> QueryArgs<'a> {
    pub fn new(bundle: &'a Bundle) -> Self {
        Self { bundle }
    }

    pub fn limit(&self) -> Option<usize> {
        self.non_negative(QUERY_ARG_LIMIT)
    }

    pub fn offset(&self) -> Option<usize> {
        self.non_negative(QUERY_ARG_OFFSET)
    }

    pub fn sort_columns(&self) -> Option<&'a [String]> {
        self.bundle.get_str_list(QUERY_ARG_SORT_COLUMNS)
    }

    pub fn sort_direction(&self) -> Option<SortDirection> {
        match self.bundle.get_int(QUERY_ARG_SORT_DIRECTION)? {
            QUERY_SORT_DIRECTION_ASCENDING => Some(SortDirection::Ascending),
            QUERY_SORT_DIRECTION_DESCENDING => Some(SortDirection::Descending),
            _ => None,
        }
    }

    pub fn sort_collation(&self) -> Option<i32> {
        self.bundle.get_int(QUERY_ARG_SORT_COLLATION)
    }

    pub fn sql_selection(&self) -> Option<&'a str> {
        self.bundle.get_str(QUERY_ARG_SQL_SELECTION)
    }

    pub fn sql_selection_args(&self) -> Option<&'a [String]> {
        self.bundle.get_str_list(QUERY_ARG_SQL_SELECTION_ARGS)
    }

    pub fn sql_sort_order(&self) -> Option<&'a str> {
        self.bundle.get_str(QUERY_ARG_SQL_SORT_ORDER)
    }

    fn non_negative(&self, key: &str) -> Option<usize> {
        let value = match self.bundle.get(key)? {
            Value::Int(v) => i64::from(*v),
            Value::Long(v) => *v,
            _ => return None,
        };
        usize::try_from(value).ok()
    }
}

/// Build the `EXTRA_HONORED_ARGS` response entry
pub fn honored_args_extra(keys: &[&str]) -> Bundle {
    Bundle::new().with(
        EXTRA_HONORED_ARGS,
        Value::StrList(keys.iter().map(|k| k.to_string()).collect()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_bundle_skips_absent_values() {
        let bundle = create_sql_query_bundle(Some("title = ?"), Some(&["x".to_string()]), None);
        assert_eq!(bundle.len(), 2);

        let args = QueryArgs::new(&bundle);
        assert_eq!(args.sql_selection(), Some("title = ?"));
        assert_eq!(args.sql_selection_args().unwrap(), ["x".to_string()]);
        assert_eq!(args.sql_sort_order(), None);
    }

    #[test]
    fn test_paging_and_sort() {
        let bundle = Bundle::new()
            .with(QUERY_ARG_LIMIT, 10)
            .with(QUERY_ARG_OFFSET, 20i64)
            .with(QUERY_ARG_SORT_DIRECTION, QUERY_SORT_DIRECTION_DESCENDING)
            .with(QUERY_ARG_SORT_COLUMNS, Value::StrList(vec!["title".into()]));
        let args = QueryArgs::new(&bundle);

        assert_eq!(args.limit(), Some(10));
        assert_eq!(args.offset(), Some(20));
        assert_eq!(args.sort_direction(), Some(SortDirection::Descending));
        assert_eq!(args.sort_columns().unwrap(), ["title".to_string()]);
    }

    #[test]
    fn test_negative_limit_ignored() {
        let bundle = Bundle::new().with(QUERY_ARG_LIMIT, -1);
        assert_eq!(QueryArgs::new(&bundle).limit(), None);
    }
}
