use mongodb::{
    bson::{doc, Document},
    Client, Database, IndexModel,
    options::ClientOptions,
};
use std::time::Duration;

use crate::{error::AlertError, services::alerts_service::ALERTS_COLLECTION};

pub async fn connect(uri: &str, db_name: &str) -> Result<Database, AlertError> {
    let mut opts = ClientOptions::parse(uri).await?;
    // fail reads fast instead of hanging the caller for the driver default of 30s
    opts.server_selection_timeout = Some(Duration::from_secs(3));
    opts.app_name = Some("market-alerts".to_string());

    let client = Client::with_options(opts)?;
    Ok(client.database(db_name))
}

pub async fn ensure_indexes(db: &Database) -> Result<(), AlertError> {
    // alerts: list by owner, newest first
    let col = db.collection::<Document>(ALERTS_COLLECTION);
    let model = IndexModel::builder()
        .keys(doc! { "user_id": 1, "created_at": -1 })
        .build();

    col.create_index(model, None).await?;

    Ok(())
}
