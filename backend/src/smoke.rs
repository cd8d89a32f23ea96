//! End-to-end check of a running server: register, login, create, list,
//! update, delete, then confirm the item is gone. Stops at the first failure.

use common::{utils::find_item_by_id, Credentials, Item, ItemPayload};
use figment::{
    providers::{Env, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::client::{ApiClient, ClientError, Registration};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmokeConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

impl Default for SmokeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/api".to_string(),
            username: "testuser_rs".to_string(),
            password: "testpassword".to_string(),
        }
    }
}

impl SmokeConfig {
    /// Defaults overlaid with `SMOKE_BASE_URL`, `SMOKE_USERNAME`, `SMOKE_PASSWORD`.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(SmokeConfig::default()))
            .merge(Env::prefixed("SMOKE_"))
            .extract()
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmokeReport {
    /// False when the user already existed from an earlier run.
    pub registered: bool,
    pub item_id: i64,
    pub updated: Item,
}

pub async fn run(
    client: &mut ApiClient,
    credentials: &Credentials,
) -> Result<SmokeReport, ClientError> {
    tracing::info!("1. Registering user {}", credentials.username);
    let registered = match client.register(credentials).await? {
        Registration::Created(user) => {
            tracing::info!("User '{}' registered with id {}", user.username, user.id);
            true
        }
        Registration::AlreadyExists => {
            tracing::info!("User '{}' already exists, proceeding", credentials.username);
            false
        }
    };

    tracing::info!("2. Logging in");
    client.login(credentials).await?;

    tracing::info!("3. Creating an item");
    let new_item = ItemPayload {
        name: "Test Item from Script".to_string(),
        description: "This is a test.".to_string(),
        quantity: 50,
    };
    let created = client.create_item(&new_item).await?;
    tracing::info!("Created item {:?}", created);

    tracing::info!("4. Listing items");
    let items = client.list_items().await?;
    if find_item_by_id(&items, created.id).is_none() {
        return Err(ClientError::Check(format!(
            "item {} missing from list of {} items",
            created.id,
            items.len()
        )));
    }

    tracing::info!("5. Updating item {}", created.id);
    let replacement = ItemPayload {
        name: "Updated Test Item".to_string(),
        description: "This item has been updated.".to_string(),
        quantity: 75,
    };
    let updated = client.update_item(created.id, &replacement).await?;
    check_fields(&updated, &replacement)?;
    match client.get_item(created.id).await? {
        Some(stored) => check_fields(&stored, &replacement)?,
        None => {
            return Err(ClientError::Check(format!(
                "item {} vanished after update",
                created.id
            )))
        }
    }

    tracing::info!("6. Deleting item {}", created.id);
    client.delete_item(created.id).await?;
    if client.get_item(created.id).await?.is_some() {
        return Err(ClientError::Check(format!(
            "item {} still retrievable after delete",
            created.id
        )));
    }

    tracing::info!("Smoke run finished");
    Ok(SmokeReport {
        registered,
        item_id: created.id,
        updated,
    })
}

fn check_fields(item: &Item, expected: &ItemPayload) -> Result<(), ClientError> {
    if item.name == expected.name
        && item.description == expected.description
        && item.quantity == expected.quantity
    {
        Ok(())
    } else {
        Err(ClientError::Check(format!(
            "item {} is {:?}, expected {:?}",
            item.id, item, expected
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_reads_smoke_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SMOKE_BASE_URL", "http://inventory.test/api");
            jail.set_env("SMOKE_USERNAME", "ci_user");
            let config = SmokeConfig::load()?;
            assert_eq!(config.base_url, "http://inventory.test/api");
            assert_eq!(config.username, "ci_user");
            assert_eq!(config.password, "testpassword");
            Ok(())
        });
    }

    #[test]
    fn field_check_reports_mismatch() {
        let item = Item {
            id: 1,
            name: "Widget".into(),
            description: String::new(),
            quantity: 3,
        };
        let same = ItemPayload {
            name: "Widget".into(),
            description: String::new(),
            quantity: 3,
        };
        assert!(check_fields(&item, &same).is_ok());

        let different = ItemPayload {
            quantity: 4,
            ..same
        };
        assert!(matches!(
            check_fields(&item, &different),
            Err(ClientError::Check(_))
        ));
    }
}
