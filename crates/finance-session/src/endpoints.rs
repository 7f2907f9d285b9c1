//! Typed helpers for the finance resources
//!
//! Operation payloads come back in more than one shape depending on the API
//! version: the category may be a nested object, a bare string, or one of four
//! flat field spellings. `normalize_category_title` is the one place that
//! resolves them.

use std::collections::BTreeMap;
use std::fmt;

use finance_auth::{BALANCE_ENDPOINT, CATEGORIES_ENDPOINT, DateInterval, OPERATIONS_ENDPOINT, PeriodFilter};
use serde::{Deserialize, Serialize};

use crate::client::{ApiClient, RequestOutcome};

/// Label for operations whose category cannot be resolved.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Response of `GET /balance`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BalanceResponse {
    #[serde(default)]
    pub balance: Option<f64>,
}

pub async fn fetch_balance(client: &ApiClient) -> RequestOutcome<BalanceResponse> {
    client.get(BALANCE_ENDPOINT).await
}

/// `/operations`, with `period` when a filter is given and the date bounds
/// only for a complete interval.
pub fn operations_path(filter: Option<PeriodFilter>, interval: &DateInterval) -> String {
    let Some(filter) = filter else {
        return OPERATIONS_ENDPOINT.to_owned();
    };

    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("period", filter.as_str());
    if filter == PeriodFilter::Interval && interval.is_complete() {
        if let (Some(from), Some(to)) = (&interval.from, &interval.to) {
            query.append_pair("dateFrom", from);
            query.append_pair("dateTo", to);
        }
    }
    format!("{OPERATIONS_ENDPOINT}?{}", query.finish())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Income,
    Expense,
}

impl CategoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKind::Income => "income",
            CategoryKind::Expense => "expense",
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `/categories/{kind}` or `/categories/{kind}/{id}`.
pub fn category_path(kind: CategoryKind, id: Option<&str>) -> String {
    match id {
        Some(id) => format!("{CATEGORIES_ENDPOINT}/{kind}/{id}"),
        None => format!("{CATEGORIES_ENDPOINT}/{kind}"),
    }
}

/// A category as listed by `/categories/{kind}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Category {
    pub id: serde_json::Value,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Category {
    pub fn display_title(&self) -> Option<&str> {
        non_empty(self.title.as_deref()).or(non_empty(self.name.as_deref()))
    }
}

/// Money amounts arrive as numbers or numeric strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Number(f64),
    Text(String),
}

impl Amount {
    /// Numeric value; unparsable text counts as zero.
    pub fn value(&self) -> f64 {
        match self {
            Amount::Number(n) => *n,
            Amount::Text(s) => s.trim().parse().unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Income,
    Expense,
    #[serde(other)]
    Unknown,
}

/// The nested `category` field: an object or a bare title.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CategoryRef {
    Object {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
    Text(String),
}

/// One income or expense record.
#[derive(Debug, Clone, Deserialize)]
pub struct Operation {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(rename = "type")]
    pub kind: OperationKind,
    pub amount: Amount,
    #[serde(default)]
    pub category: Option<CategoryRef>,
    #[serde(default)]
    pub category_title: Option<String>,
    #[serde(default, rename = "categoryTitle")]
    pub category_title_camel: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default, rename = "categoryName")]
    pub category_name_camel: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Resolve an operation's category title.
///
/// Priority, first non-empty wins:
/// 1. `category.title` (nested object)
/// 2. `category.name` (nested object)
/// 3. `category` as a plain string
/// 4. `category_title`
/// 5. `categoryTitle`
/// 6. `category_name`
/// 7. `categoryName`
pub fn normalize_category_title(operation: &Operation) -> Option<&str> {
    let nested = match &operation.category {
        Some(CategoryRef::Object { title, name }) => {
            non_empty(title.as_deref()).or(non_empty(name.as_deref()))
        }
        Some(CategoryRef::Text(text)) => non_empty(Some(text.as_str())),
        None => None,
    };

    nested
        .or(non_empty(operation.category_title.as_deref()))
        .or(non_empty(operation.category_title_camel.as_deref()))
        .or(non_empty(operation.category_name.as_deref()))
        .or(non_empty(operation.category_name_camel.as_deref()))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// Per-category sums, split by direction. Feeds the overview charts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryTotals {
    pub income: BTreeMap<String, f64>,
    pub expense: BTreeMap<String, f64>,
}

pub fn totals_by_category(operations: &[Operation]) -> CategoryTotals {
    let mut totals = CategoryTotals::default();
    for operation in operations {
        let title = normalize_category_title(operation).unwrap_or(UNCATEGORIZED);
        let bucket = match operation.kind {
            OperationKind::Income => &mut totals.income,
            OperationKind::Expense => &mut totals.expense,
            OperationKind::Unknown => continue,
        };
        *bucket.entry(title.to_owned()).or_default() += operation.amount.value();
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn op(value: serde_json::Value) -> Operation {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn operations_path_variants() {
        let none = DateInterval::default();
        assert_eq!(operations_path(None, &none), "/operations");
        assert_eq!(
            operations_path(Some(PeriodFilter::Week), &none),
            "/operations?period=week"
        );
        assert_eq!(
            operations_path(Some(PeriodFilter::Interval), &none),
            "/operations?period=interval"
        );
        assert_eq!(
            operations_path(
                Some(PeriodFilter::Interval),
                &DateInterval::new("2024-01-01", "2024-02-01")
            ),
            "/operations?period=interval&dateFrom=2024-01-01&dateTo=2024-02-01"
        );
        // Bounds are ignored for non-interval filters
        assert_eq!(
            operations_path(
                Some(PeriodFilter::Month),
                &DateInterval::new("2024-01-01", "2024-02-01")
            ),
            "/operations?period=month"
        );
    }

    #[test]
    fn category_paths() {
        assert_eq!(category_path(CategoryKind::Income, None), "/categories/income");
        assert_eq!(
            category_path(CategoryKind::Expense, Some("12")),
            "/categories/expense/12"
        );
    }

    #[test]
    fn category_title_priority_order() {
        let nested = op(json!({
            "type": "income", "amount": 1,
            "category": {"title": "Salary", "name": "ignored"},
            "category_title": "flat"
        }));
        assert_eq!(normalize_category_title(&nested), Some("Salary"));

        let nested_name = op(json!({
            "type": "income", "amount": 1,
            "category": {"name": "Bonus"}
        }));
        assert_eq!(normalize_category_title(&nested_name), Some("Bonus"));

        let text = op(json!({"type": "expense", "amount": 1, "category": "Food"}));
        assert_eq!(normalize_category_title(&text), Some("Food"));

        let flat = op(json!({
            "type": "expense", "amount": 1,
            "categoryTitle": "camel", "category_name": "snake_name"
        }));
        assert_eq!(normalize_category_title(&flat), Some("camel"));

        let last = op(json!({"type": "expense", "amount": 1, "categoryName": "Rent"}));
        assert_eq!(normalize_category_title(&last), Some("Rent"));

        let empty_nested = op(json!({
            "type": "expense", "amount": 1,
            "category": {"title": ""}, "category_title": "Fallback"
        }));
        assert_eq!(normalize_category_title(&empty_nested), Some("Fallback"));

        let nothing = op(json!({"type": "expense", "amount": 1}));
        assert_eq!(normalize_category_title(&nothing), None);
    }

    #[test]
    fn totals_group_by_title_and_direction() {
        let ops = vec![
            op(json!({"type": "income", "amount": 100, "category": "Salary"})),
            op(json!({"type": "income", "amount": "50.5", "category_title": "Salary"})),
            op(json!({"type": "expense", "amount": 20, "categoryName": "Food"})),
            op(json!({"type": "expense", "amount": "abc"})),
            op(json!({"type": "transfer", "amount": 999, "category": "Ignored"})),
        ];
        let totals = totals_by_category(&ops);
        assert_eq!(totals.income.get("Salary"), Some(&150.5));
        assert_eq!(totals.expense.get("Food"), Some(&20.0));
        assert_eq!(totals.expense.get(UNCATEGORIZED), Some(&0.0));
        assert!(!totals.income.contains_key("Ignored"));
    }

    #[test]
    fn category_display_title_falls_back_to_name() {
        let c: Category = serde_json::from_value(json!({"id": 1, "name": "Gifts"})).unwrap();
        assert_eq!(c.display_title(), Some("Gifts"));
    }
}
