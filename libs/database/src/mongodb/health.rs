use mongodb::{Client, bson::doc};

/// `ping` against the `admin` database; needs no privileges.
pub async fn check_health(client: &Client) -> Result<(), mongodb::error::Error> {
    client
        .database("admin")
        .run_command(doc! { "ping": 1 })
        .await
        .map(|_| ())
}
