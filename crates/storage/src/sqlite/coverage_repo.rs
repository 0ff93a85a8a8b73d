use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, parse_mood, parse_pronoun, parse_tense, ser, u32_from_i64};
use crate::repository::{
    CoverageBinRecord, CoverageQuery, CoverageRepository, StorageError, sort_bins,
};

#[async_trait::async_trait]
impl CoverageRepository for SqliteRepository {
    async fn coverage_bins(
        &self,
        query: &CoverageQuery,
    ) -> Result<Vec<CoverageBinRecord>, StorageError> {
        let mut sql = String::from(
            r"
                SELECT pronoun, tense, mood, COUNT(*) AS question_count
                FROM guesses
                WHERE 1 = 1
            ",
        );

        let mut bind_index = 1;
        let moods: Vec<&'static str> = query
            .moods
            .iter()
            .flatten()
            .map(|m| m.as_str())
            .collect();
        if query.moods.is_some() {
            if moods.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders: Vec<String> = (0..moods.len())
                .map(|i| format!("?{}", bind_index + i))
                .collect();
            sql.push_str(" AND mood IN (");
            sql.push_str(&placeholders.join(", "));
            sql.push(')');
            bind_index += moods.len();
        }
        if query.created_from.is_some() {
            sql.push_str(" AND created_at >= ?");
            sql.push_str(&bind_index.to_string());
            bind_index += 1;
        }
        if query.created_until.is_some() {
            sql.push_str(" AND created_at <= ?");
            sql.push_str(&bind_index.to_string());
            bind_index += 1;
        }
        sql.push_str(" GROUP BY pronoun, tense, mood");
        sql.push_str(" HAVING COUNT(*) >= ?");
        sql.push_str(&bind_index.to_string());

        let mut q = sqlx::query(&sql);
        for mood in &moods {
            q = q.bind(*mood);
        }
        if let Some(from) = query.created_from {
            q = q.bind(from);
        }
        if let Some(until) = query.created_until {
            q = q.bind(until);
        }
        q = q.bind(i64::from(query.min_questions));

        let rows = q.fetch_all(&self.pool).await.map_err(conn)?;
        let mut bins = rows
            .iter()
            .map(|row| {
                Ok(CoverageBinRecord {
                    pronoun: parse_pronoun(&row.try_get::<String, _>("pronoun").map_err(ser)?)?,
                    tense: parse_tense(&row.try_get::<String, _>("tense").map_err(ser)?)?,
                    mood: parse_mood(&row.try_get::<String, _>("mood").map_err(ser)?)?,
                    question_count: u32_from_i64(
                        "question_count",
                        row.try_get::<i64, _>("question_count").map_err(ser)?,
                    )?,
                })
            })
            .collect::<Result<Vec<_>, StorageError>>()?;
        sort_bins(&mut bins);
        Ok(bins)
    }
}
