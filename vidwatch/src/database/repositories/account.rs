//! Account repository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::warn;

use crate::database::models::AccountDbModel;
use crate::domain::Account;
use crate::scheduler::AccountSource;
use crate::{Error, Result};

/// Account repository trait.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Insert an account and return it with its assigned id.
    async fn create_account(&self, account: &Account) -> Result<Account>;
    async fn get_account(&self, id: i64) -> Result<Account>;
    async fn list_accounts(&self) -> Result<Vec<AccountDbModel>>;
    /// Delete an account. Returns `false` when no row matched.
    async fn delete_account(&self, id: i64) -> Result<bool>;
}

/// SQLx implementation of AccountRepository.
#[derive(Clone)]
pub struct SqlxAccountRepository {
    pool: SqlitePool,
}

impl SqlxAccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for SqlxAccountRepository {
    async fn create_account(&self, account: &Account) -> Result<Account> {
        let row = AccountDbModel::from_domain(account);
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (platform, url, account_id, guild_id, discord_channel_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.platform)
        .bind(&row.url)
        .bind(&row.account_id)
        .bind(&row.guild_id)
        .bind(&row.discord_channel_id)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;

        let mut created = account.clone();
        created.id = result.last_insert_rowid();
        Ok(created)
    }

    async fn get_account(&self, id: i64) -> Result<Account> {
        sqlx::query_as::<_, AccountDbModel>("SELECT * FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::not_found("Account", id.to_string()))?
            .try_into()
    }

    async fn list_accounts(&self) -> Result<Vec<AccountDbModel>> {
        let rows = sqlx::query_as::<_, AccountDbModel>("SELECT * FROM accounts ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn delete_account(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AccountSource for SqlxAccountRepository {
    async fn list(&self) -> Result<Vec<Account>> {
        let rows = self.list_accounts().await?;
        let mut accounts = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id;
            match Account::try_from(row) {
                Ok(account) => accounts.push(account),
                Err(e) => warn!(account_id = id, error = %e, "Skipping unusable account row"),
            }
        }
        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{init_pool, run_migrations};
    use crate::domain::Platform;

    async fn setup() -> SqlxAccountRepository {
        let pool = init_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqlxAccountRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_get_delete() {
        let repo = setup().await;
        let account = Account::new(Platform::YouTube, "https://www.youtube.com/@x", "chan")
            .with_canonical_id(Some("UC123".to_string()));

        let created = repo.create_account(&account).await.unwrap();
        assert!(created.id > 0);

        let fetched = repo.get_account(created.id).await.unwrap();
        assert_eq!(fetched, created);

        assert!(repo.delete_account(created.id).await.unwrap());
        assert!(!repo.delete_account(created.id).await.unwrap());
        assert!(matches!(
            repo.get_account(created.id).await,
            Err(Error::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_preserves_insertion_order() {
        let repo = setup().await;
        for url in ["a", "b", "c"] {
            repo.create_account(&Account::new(Platform::TikTok, url, "chan"))
                .await
                .unwrap();
        }

        let urls: Vec<String> = AccountSource::list(&repo)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.source_url)
            .collect();
        assert_eq!(urls, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_list_skips_unknown_platform_rows() {
        let repo = setup().await;
        repo.create_account(&Account::new(Platform::Facebook, "fb", "chan"))
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO accounts (platform, url, discord_channel_id, created_at) VALUES ('vine', 'v', 'chan', 0)",
        )
        .execute(&repo.pool)
        .await
        .unwrap();

        let accounts = AccountSource::list(&repo).await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].platform, Platform::Facebook);
    }
}
