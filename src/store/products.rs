//! Product queries and the batch upsert engine used by the CSV import.
//!
//! `sku_normalized` is derived (lowercased `sku`) and carries the unique
//! index; every write path goes through it, never sets it independently.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::QueryBuilder;
use std::collections::HashMap;

use crate::store::db::Db;

const PRODUCT_COLS: &str = "id, sku, sku_normalized, name, description, active";

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: i64,
    pub sku: String,
    #[serde(skip_serializing)]
    pub sku_normalized: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct ProductCreate {
    pub sku: String,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// Partial update: only fields present in the request body overwrite.
/// `sku` is deliberately absent so the normalized key stays derived-only.
#[derive(Debug, Default, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub active: Option<bool>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.active.is_none()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    #[serde(default)]
    pub skip: i64,
    pub limit: Option<i64>,
    pub sku: Option<String>,
    pub name: Option<String>,
    pub active: Option<bool>,
}

/// One normalized CSV row headed for the catalog.
#[derive(Debug, Clone)]
pub struct ProductRow {
    pub sku: String,
    pub sku_normalized: String,
    pub name: String,
    pub description: String,
    pub active: bool,
}

/// Seam between the import pipeline and the catalog store, so pipelines are
/// testable against an in-memory double.
#[async_trait]
pub trait CatalogWriter: Send + Sync {
    async fn upsert_batch(&self, rows: &[ProductRow]) -> Result<()>;
}

/// Collapse duplicate normalized SKUs within one batch, keeping the last
/// occurrence (file order wins). A single INSERT .. ON CONFLICT statement
/// cannot touch the same key twice.
fn dedupe_rows(rows: &[ProductRow]) -> Vec<&ProductRow> {
    let mut latest: HashMap<&str, &ProductRow> = HashMap::new();
    for r in rows {
        latest.insert(r.sku_normalized.as_str(), r);
    }
    latest.into_values().collect()
}

/// Build the filtered listing statement. Empty filter strings are ignored,
/// the same as absent ones.
fn build_list_query(query: &ProductQuery) -> QueryBuilder<'static, sqlx::Postgres> {
    let mut qb: QueryBuilder<'static, sqlx::Postgres> =
        QueryBuilder::new(format!("SELECT {PRODUCT_COLS} FROM products WHERE TRUE"));
    if let Some(sku) = query.sku.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND sku_normalized = ").push_bind(sku.to_lowercase());
    }
    if let Some(name) = query.name.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND name ILIKE ").push_bind(format!("%{name}%"));
    }
    if let Some(active) = query.active {
        qb.push(" AND active = ").push_bind(active);
    }
    qb.push(" ORDER BY id OFFSET ")
        .push_bind(query.skip.max(0))
        .push(" LIMIT ")
        .push_bind(query.limit.unwrap_or(50));
    qb
}

#[async_trait]
impl CatalogWriter for Db {
    async fn upsert_batch(&self, rows: &[ProductRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let uniques = dedupe_rows(rows);

        let mut qb: QueryBuilder<'_, sqlx::Postgres> = QueryBuilder::new(
            "INSERT INTO products (sku, sku_normalized, name, description, active) ",
        );
        qb.push_values(&uniques, |mut b, r| {
            b.push_bind(&r.sku)
                .push_bind(&r.sku_normalized)
                .push_bind(&r.name)
                .push_bind(&r.description)
                .push_bind(r.active);
        });
        qb.push(
            " ON CONFLICT (sku_normalized)
              DO UPDATE SET sku = EXCLUDED.sku,
                            name = EXCLUDED.name,
                            description = EXCLUDED.description,
                            active = EXCLUDED.active",
        );
        qb.build().execute(&self.pool).await?;
        Ok(())
    }
}

impl Db {
    /// Insert a product, deriving `sku_normalized` server-side.
    /// Returns None when the normalized SKU is already taken.
    pub async fn create_product(&self, item: &ProductCreate) -> Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            "INSERT INTO products (sku, sku_normalized, name, description, active)
             VALUES ($1, lower($1), $2, $3, $4)
             ON CONFLICT (sku_normalized) DO NOTHING
             RETURNING id, sku, sku_normalized, name, description, active",
        )
        .bind(&item.sku)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    pub async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>> {
        let mut qb = build_list_query(query);
        let rows = qb.build_query_as::<Product>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    pub async fn get_product(&self, id: i64) -> Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    /// Apply a partial update; fields absent from the patch are untouched.
    pub async fn update_product(&self, id: i64, patch: &ProductPatch) -> Result<Option<Product>> {
        if patch.is_empty() {
            return self.get_product(id).await;
        }

        let mut qb: QueryBuilder<'_, sqlx::Postgres> = QueryBuilder::new("UPDATE products SET ");
        let mut sep = qb.separated(", ");
        if let Some(name) = &patch.name {
            sep.push("name = ").push_bind_unseparated(name);
        }
        if let Some(description) = &patch.description {
            sep.push("description = ").push_bind_unseparated(description);
        }
        if let Some(active) = patch.active {
            sep.push("active = ").push_bind_unseparated(active);
        }
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(format!(" RETURNING {PRODUCT_COLS}"));

        let product = qb
            .build_query_as::<Product>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    pub async fn delete_product(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_all_products(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM products").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(sku: &str, name: &str) -> ProductRow {
        ProductRow {
            sku: sku.to_string(),
            sku_normalized: sku.to_lowercase(),
            name: name.to_string(),
            description: String::new(),
            active: true,
        }
    }

    #[test]
    fn dedupe_keeps_last_occurrence_per_key() {
        let rows = vec![row("ABC-1", "first"), row("xyz-9", "other"), row("abc-1", "second")];
        let uniques = dedupe_rows(&rows);
        assert_eq!(uniques.len(), 2);

        let abc = uniques
            .iter()
            .find(|r| r.sku_normalized == "abc-1")
            .unwrap();
        assert_eq!(abc.name, "second");
        assert_eq!(abc.sku, "abc-1");
    }

    #[test]
    fn dedupe_is_noop_for_distinct_keys() {
        let rows = vec![row("a-1", ""), row("b-2", ""), row("c-3", "")];
        assert_eq!(dedupe_rows(&rows).len(), 3);
    }

    #[test]
    fn product_create_defaults_active_true() {
        let item: ProductCreate = serde_json::from_str(r#"{"sku": "ABC-1"}"#).unwrap();
        assert!(item.active);
        assert!(item.name.is_none());
    }

    #[test]
    fn empty_filter_strings_are_ignored() {
        let query = ProductQuery {
            sku: Some(String::new()),
            name: Some(String::new()),
            ..Default::default()
        };
        let mut qb = build_list_query(&query);
        let sql = qb.sql();
        assert!(!sql.contains("sku_normalized ="));
        assert!(!sql.contains("ILIKE"));
    }

    #[test]
    fn present_filters_are_bound() {
        let query = ProductQuery {
            sku: Some("ABC-1".to_string()),
            active: Some(true),
            ..Default::default()
        };
        let mut qb = build_list_query(&query);
        let sql = qb.sql();
        assert!(sql.contains("sku_normalized = $1"));
        assert!(sql.contains("active = $2"));
    }

    #[test]
    fn patch_with_no_fields_is_empty() {
        let patch: ProductPatch = serde_json::from_str("{}").unwrap();
        assert!(patch.is_empty());

        let patch: ProductPatch = serde_json::from_str(r#"{"active": false}"#).unwrap();
        assert!(!patch.is_empty());
        assert_eq!(patch.active, Some(false));
        assert!(patch.name.is_none());
    }
}
