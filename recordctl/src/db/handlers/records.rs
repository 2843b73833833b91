//! PostgreSQL repository for personal records.

use crate::db::{
    errors::Result,
    handlers::repository::{RecordFilter, RecordStore},
    models::records::RecordDBResponse,
};
use crate::query::{SearchFilter, SortField};
use crate::types::RecordId;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;

const SELECT_RECORDS: &str = "SELECT id::BIGINT AS id, first_name, last_name, email, gender, ip_address FROM personaldata";

pub struct Records {
    pool: PgPool,
}

impl Records {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RecordStore for Records {
    #[instrument(skip(self, search), fields(search = search.term()), err)]
    async fn count(&self, search: &SearchFilter) -> Result<u64> {
        let mut query = count_query(search);
        let total = query.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        Ok(u64::try_from(total).unwrap_or(0))
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip, sort = %filter.order.field), err)]
    async fn fetch(&self, filter: &RecordFilter) -> Result<Vec<RecordDBResponse>> {
        let mut query = fetch_query(filter);
        tracing::debug!("Executing SQL: {}", query.sql());

        let records = query.build_query_as::<RecordDBResponse>().fetch_all(&self.pool).await?;
        tracing::debug!("Retrieved {} records", records.len());

        Ok(records)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&self, id: RecordId) -> Result<Option<RecordDBResponse>> {
        let mut query = QueryBuilder::<Postgres>::new(SELECT_RECORDS);
        query.push(" WHERE id = ");
        query.push_bind(id);

        let record = query.build_query_as::<RecordDBResponse>().fetch_optional(&self.pool).await?;

        Ok(record)
    }
}

/// `SELECT COUNT(*)` over the rows matching `search`
pub(crate) fn count_query(search: &SearchFilter) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new("SELECT COUNT(*) FROM personaldata WHERE 1=1");
    push_search(&mut query, search);
    query
}

/// Filtered, ordered, paginated select
pub(crate) fn fetch_query(filter: &RecordFilter) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(SELECT_RECORDS);
    query.push(" WHERE 1=1");
    push_search(&mut query, &filter.search);

    // Column and direction come from closed enums, never from request text
    query.push(" ORDER BY ");
    query.push(filter.order.field.column());
    query.push(" ");
    query.push(filter.order.direction.as_sql());
    if let Some(tie_break) = filter.order.tie_break() {
        query.push(", ");
        query.push(tie_break.column());
        query.push(" ");
        query.push(filter.order.direction.as_sql());
    }

    query.push(" LIMIT ");
    query.push_bind(to_sql_bound(filter.limit));
    query.push(" OFFSET ");
    query.push_bind(to_sql_bound(filter.skip));

    query
}

fn push_search(query: &mut QueryBuilder<'static, Postgres>, search: &SearchFilter) {
    if search.is_match_all() {
        return;
    }

    let pattern = search.like_pattern();
    query.push(" AND (");
    for (i, field) in SortField::SEARCHABLE.into_iter().enumerate() {
        if i > 0 {
            query.push(" OR ");
        }
        query.push(field.column());
        query.push(" ILIKE ");
        query.push_bind(pattern.clone());
    }
    query.push(")");
}

/// PostgreSQL has no unsigned bigint; anything past `i64::MAX` is already "everything".
fn to_sql_bound(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{SortDirection, SortOrder};
    use crate::test_utils::sample_records;

    #[test]
    fn test_count_query_without_search() {
        let query = count_query(&SearchFilter::default());
        assert_eq!(query.sql(), "SELECT COUNT(*) FROM personaldata WHERE 1=1");
    }

    #[test]
    fn test_count_query_searches_every_text_column() {
        let query = count_query(&SearchFilter::new("gmail"));
        assert_eq!(
            query.sql(),
            "SELECT COUNT(*) FROM personaldata WHERE 1=1 AND (first_name ILIKE $1 OR last_name ILIKE $2 \
             OR email ILIKE $3 OR gender ILIKE $4 OR ip_address ILIKE $5)"
        );
    }

    #[test]
    fn test_fetch_query_default_order() {
        let query = fetch_query(&RecordFilter::new(20, 10));
        assert_eq!(
            query.sql(),
            format!("{SELECT_RECORDS} WHERE 1=1 ORDER BY id DESC LIMIT $1 OFFSET $2")
        );
    }

    #[test]
    fn test_fetch_query_adds_id_tie_break() {
        let filter = RecordFilter::new(0, 10)
            .with_search(SearchFilter::new("jane"))
            .with_order(SortOrder::new(SortField::LastName, SortDirection::Asc));
        let query = fetch_query(&filter);
        assert_eq!(
            query.sql(),
            format!(
                "{SELECT_RECORDS} WHERE 1=1 AND (first_name ILIKE $1 OR last_name ILIKE $2 OR email ILIKE $3 \
                 OR gender ILIKE $4 OR ip_address ILIKE $5) ORDER BY last_name ASC, id ASC LIMIT $6 OFFSET $7"
            )
        );
    }

    #[test]
    fn test_sql_bound_saturates() {
        assert_eq!(to_sql_bound(10), 10);
        assert_eq!(to_sql_bound(u64::MAX), i64::MAX);
    }

    async fn seeded_store(pool: &PgPool, records: &[RecordDBResponse]) -> Records {
        sqlx::query(
            "CREATE TABLE personaldata (
                id INTEGER PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                email TEXT NOT NULL,
                gender TEXT NOT NULL,
                ip_address TEXT NOT NULL
            )",
        )
        .execute(pool)
        .await
        .expect("Failed to create personaldata table");

        if !records.is_empty() {
            let mut insert =
                QueryBuilder::<Postgres>::new("INSERT INTO personaldata (id, first_name, last_name, email, gender, ip_address) ");
            insert.push_values(records, |mut row, record| {
                row.push_bind(i32::try_from(record.id).expect("test ids fit in INTEGER"))
                    .push_bind(record.first_name.clone())
                    .push_bind(record.last_name.clone())
                    .push_bind(record.email.clone())
                    .push_bind(record.gender.clone())
                    .push_bind(record.ip_address.clone());
            });
            insert.build().execute(pool).await.expect("Failed to seed personaldata");
        }

        Records::new(pool.clone())
    }

    fn ids(records: &[RecordDBResponse]) -> Vec<RecordId> {
        records.iter().map(|r| r.id).collect()
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_last_partial_page(pool: PgPool) {
        let store = seeded_store(&pool, &sample_records(25)).await;

        assert_eq!(store.count(&SearchFilter::default()).await.unwrap(), 25);

        let filter = RecordFilter::new(20, 10).with_order(SortOrder::new(SortField::Id, SortDirection::Asc));
        let page = store.fetch(&filter).await.unwrap();
        assert_eq!(ids(&page), vec![21, 22, 23, 24, 25]);

        let beyond = store.fetch(&RecordFilter::new(100, 10)).await.unwrap();
        assert!(beyond.is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_default_order_is_id_desc(pool: PgPool) {
        let store = seeded_store(&pool, &sample_records(12)).await;

        let page = store.fetch(&RecordFilter::new(0, 3)).await.unwrap();
        assert_eq!(ids(&page), vec![12, 11, 10]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_search_is_case_insensitive(pool: PgPool) {
        let mut records = sample_records(30);
        records.push(RecordDBResponse {
            id: 31,
            email: "Someone@GMail.COM".to_string(),
            ..records[0].clone()
        });
        let store = seeded_store(&pool, &records).await;

        let search = SearchFilter::new("gmail");
        assert_eq!(store.count(&search).await.unwrap(), 11);

        let matches = store.fetch(&RecordFilter::new(0, 50).with_search(search)).await.unwrap();
        assert_eq!(matches.len(), 11);
        assert!(matches.iter().all(|r| r.email.to_lowercase().contains("gmail")));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_search_wildcards_match_literally(pool: PgPool) {
        let mut records = sample_records(2);
        records[0].first_name = "50%_off".to_string();
        // Would match `%50%_off%` if the wildcards were left unescaped
        records[1].first_name = "50abcoff".to_string();
        let store = seeded_store(&pool, &records).await;

        let search = SearchFilter::new("50%_off");
        assert_eq!(store.count(&search).await.unwrap(), 1);

        let matches = store.fetch(&RecordFilter::new(0, 10).with_search(search)).await.unwrap();
        assert_eq!(ids(&matches), vec![1]);

        assert_eq!(store.count(&SearchFilter::new("\\")).await.unwrap(), 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_ties_are_broken_by_id(pool: PgPool) {
        let store = seeded_store(&pool, &sample_records(12)).await;

        let asc = RecordFilter::new(0, 6).with_order(SortOrder::new(SortField::Gender, SortDirection::Asc));
        assert_eq!(ids(&store.fetch(&asc).await.unwrap()), vec![2, 4, 6, 8, 10, 12]);

        let desc = RecordFilter::new(0, 6).with_order(SortOrder::new(SortField::Gender, SortDirection::Desc));
        assert_eq!(ids(&store.fetch(&desc).await.unwrap()), vec![11, 9, 7, 5, 3, 1]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_by_id(pool: PgPool) {
        let records = sample_records(3);
        let store = seeded_store(&pool, &records).await;

        assert_eq!(store.get_by_id(2).await.unwrap(), Some(records[1].clone()));
        assert_eq!(store.get_by_id(999).await.unwrap(), None);
        assert_eq!(store.get_by_id(i64::MAX).await.unwrap(), None);
    }
}
